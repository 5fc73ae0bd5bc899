//! Request and response types for all mw-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use chrono::{DateTime, NaiveDate, Utc};
use mw_schemas::{AlertSeverity, AlertStatus, ConnectorHealth, SyncMode, SyncStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Error envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// /v1/meta/suppliers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppliersResponse {
    pub suppliers: Vec<String>,
}

// ---------------------------------------------------------------------------
// /v1/integrations/suppliers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorCredentials {
    /// Raw credential as submitted; masked to an opaque handle before it
    /// ever reaches the store.
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConnectorRequest {
    pub supplier_name: String,
    pub auth_type: String,
    pub credentials: ConnectorCredentials,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_minutes: i32,
}

fn default_poll_interval() -> i32 {
    1440
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorResponse {
    pub id: Uuid,
    pub supplier_name: String,
    pub health: ConnectorHealth,
    pub poll_interval_minutes: i32,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_sync_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorListResponse {
    pub items: Vec<ConnectorResponse>,
}

// ---------------------------------------------------------------------------
// /v1/sync/run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRunRequest {
    pub connector_id: Uuid,
    #[serde(default = "default_sync_mode")]
    pub mode: SyncMode,
}

fn default_sync_mode() -> SyncMode {
    SyncMode::Incremental
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRunResponse {
    pub job_id: Uuid,
    pub status: SyncStatus,
    pub processed_orders: u64,
    pub processed_inventory_rows: u64,
    pub assessed_orders: u64,
    pub generated_alerts: u64,
}

// ---------------------------------------------------------------------------
// /v1/alerts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertView {
    pub id: Uuid,
    pub order_line_id: Uuid,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub message: String,
    pub recommendations: Value,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAlertsResponse {
    pub items: Vec<AlertView>,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertListQuery {
    pub status: Option<String>,
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertActionResponse {
    pub alert_id: Uuid,
    pub status: AlertStatus,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// /v1/dashboard/summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummaryResponse {
    /// "active" when every connector is healthy, "degraded" when any is,
    /// "pending" before the first successful sync.
    pub sync_health: String,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub red_count: i64,
    pub yellow_count: i64,
    pub green_count: i64,
    pub open_alerts: i64,
}

// ---------------------------------------------------------------------------
// /v1/orders/{id}
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskHistoryPoint {
    pub assessed_at: DateTime<Utc>,
    pub risk_score: f64,
    pub risk_status: String,
    pub confidence: f64,
    pub reason_codes: Vec<String>,
    pub estimated_delay_days: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetailResponse {
    pub order_line_id: Uuid,
    pub supplier_order_id: String,
    pub supplier_sku: String,
    pub material_name: String,
    pub project_id: Option<String>,
    pub qty_ordered: f64,
    pub qty_delivered: f64,
    pub eta_date: Option<NaiveDate>,
    pub impact_date: Option<NaiveDate>,
    pub status: String,
    pub risk_history: Vec<RiskHistoryPoint>,
    pub alerts: Vec<AlertView>,
}
