//! mw-schemas
//!
//! Shared wire and domain types for the supplier sync pipeline.
//!
//! This crate holds **only** plain data: payload row structs as delivered by
//! a supplier feed, the lifecycle/status enums persisted to the store, and
//! the resolved request context handed in by the HTTP layer. No IO, no
//! validation logic, no scoring; those live in the engine crates.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Connector health as persisted on `supplier_connectors.health`.
///
/// Mutated only by the sync runner at job completion/failure (plus the
/// initial `PendingValidation` at registration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorHealth {
    PendingValidation,
    Active,
    Degraded,
}

impl ConnectorHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorHealth::PendingValidation => "pending_validation",
            ConnectorHealth::Active => "active",
            ConnectorHealth::Degraded => "degraded",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "pending_validation" => Ok(ConnectorHealth::PendingValidation),
            // Legacy rows written before the rename carry "healthy".
            "active" | "healthy" => Ok(ConnectorHealth::Active),
            "degraded" => Ok(ConnectorHealth::Degraded),
            other => Err(ParseEnumError::new("ConnectorHealth", other)),
        }
    }
}

/// Order-line lifecycle status. Lines are never deleted, only
/// status-transitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    PartiallyDelivered,
    Delivered,
    Delayed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::PartiallyDelivered => "partially_delivered",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Delayed => "delayed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "open" => Ok(OrderStatus::Open),
            "partially_delivered" => Ok(OrderStatus::PartiallyDelivered),
            "delivered" => Ok(OrderStatus::Delivered),
            "delayed" => Ok(OrderStatus::Delayed),
            other => Err(ParseEnumError::new("OrderStatus", other)),
        }
    }

    /// Closed lines (delivered/delayed) are history; only open and
    /// partially delivered lines are re-scored each cycle.
    pub fn is_scoreable(&self) -> bool {
        matches!(self, OrderStatus::Open | OrderStatus::PartiallyDelivered)
    }
}

/// Delay-risk classification tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Green,
    Yellow,
    Red,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Green => "green",
            RiskTier::Yellow => "yellow",
            RiskTier::Red => "red",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "green" => Ok(RiskTier::Green),
            "yellow" => Ok(RiskTier::Yellow),
            "red" => Ok(RiskTier::Red),
            other => Err(ParseEnumError::new("RiskTier", other)),
        }
    }

    /// Escalation ordering: green(0) < yellow(1) < red(2).
    pub fn rank(&self) -> u8 {
        match self {
            RiskTier::Green => 0,
            RiskTier::Yellow => 1,
            RiskTier::Red => 2,
        }
    }
}

/// Sync run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Incremental,
    Full,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Incremental => "incremental",
            SyncMode::Full => "full",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "incremental" => Ok(SyncMode::Incremental),
            "full" => Ok(SyncMode::Full),
            other => Err(ParseEnumError::new("SyncMode", other)),
        }
    }
}

/// Sync run lifecycle: queued → running → (success | retrying → running …
/// → failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Queued,
    Running,
    Retrying,
    Success,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Queued => "queued",
            SyncStatus::Running => "running",
            SyncStatus::Retrying => "retrying",
            SyncStatus::Success => "success",
            SyncStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "queued" => Ok(SyncStatus::Queued),
            "running" => Ok(SyncStatus::Running),
            "retrying" => Ok(SyncStatus::Retrying),
            "success" => Ok(SyncStatus::Success),
            "failed" => Ok(SyncStatus::Failed),
            other => Err(ParseEnumError::new("SyncStatus", other)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Success | SyncStatus::Failed)
    }
}

/// Alert severity derived from the risk transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "low" => Ok(AlertSeverity::Low),
            "medium" => Ok(AlertSeverity::Medium),
            "high" => Ok(AlertSeverity::High),
            other => Err(ParseEnumError::new("AlertSeverity", other)),
        }
    }
}

/// Alert lifecycle: open → acknowledged | resolved (operator action; the
/// pipeline only ever creates `Open` alerts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Open,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Open => "open",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "open" => Ok(AlertStatus::Open),
            "acknowledged" => Ok(AlertStatus::Acknowledged),
            "resolved" => Ok(AlertStatus::Resolved),
            other => Err(ParseEnumError::new("AlertStatus", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// ParseEnumError
// ---------------------------------------------------------------------------

/// A persisted string did not match any variant of the named enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub type_name: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(type_name: &'static str, value: &str) -> Self {
        Self {
            type_name,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} value: {}", self.type_name, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

// ---------------------------------------------------------------------------
// Feed payload rows
// ---------------------------------------------------------------------------

/// One inventory observation as delivered by a supplier feed, prior to
/// validation. Quantities stay `f64` end to end; suppliers report
/// fractional units for bulk materials (cubic yards, tons).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub supplier_sku: String,
    pub qty_available: f64,
    pub source_timestamp: DateTime<Utc>,
}

/// One purchase-order line as delivered by a supplier feed.
///
/// The three trailing signals (late rate, ETA volatility, lead-time trend)
/// are carried on the row when the supplier reports them; scoring
/// substitutes neutral defaults when they are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub supplier_order_id: String,
    pub supplier_sku: String,
    pub material_name: String,
    pub project_id: Option<String>,
    pub qty_ordered: f64,
    pub qty_delivered: f64,
    pub eta_date: Option<NaiveDate>,
    pub impact_date: Option<NaiveDate>,
    pub status: Option<OrderStatus>,
    pub historical_late_rate: Option<f64>,
    pub eta_volatility_days: Option<f64>,
    pub lead_time_trend_days: Option<f64>,
    pub source_timestamp: DateTime<Utc>,
}

/// Snapshot payload for one connector: inventory rows plus order rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierPayload {
    pub inventory: Vec<InventoryRecord>,
    pub orders: Vec<OrderRecord>,
}

impl SupplierPayload {
    pub fn empty() -> Self {
        Self {
            inventory: Vec::new(),
            orders: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request context
// ---------------------------------------------------------------------------

/// Actor roles accepted on inbound requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Pm,
    Coordinator,
    Readonly,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Pm => "pm",
            Role::Coordinator => "coordinator",
            Role::Readonly => "readonly",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "owner" => Ok(Role::Owner),
            "pm" => Ok(Role::Pm),
            "coordinator" => Ok(Role::Coordinator),
            "readonly" => Ok(Role::Readonly),
            other => Err(ParseEnumError::new("Role", other)),
        }
    }
}

/// Resolved `(tenant, actor, role)` triple. Extraction from request
/// metadata happens at the HTTP boundary; the core only ever sees this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub tenant_id: String,
    pub actor_id: String,
    pub role: Role,
}

// ---------------------------------------------------------------------------
// Sync result
// ---------------------------------------------------------------------------

/// Caller-facing result of one sync job invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRunResult {
    pub job_id: Uuid,
    pub status: SyncStatus,
    pub processed_orders: u64,
    pub processed_inventory_rows: u64,
    pub assessed_orders: u64,
    pub generated_alerts: u64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_tier_rank_is_strictly_increasing() {
        assert!(RiskTier::Green.rank() < RiskTier::Yellow.rank());
        assert!(RiskTier::Yellow.rank() < RiskTier::Red.rank());
    }

    #[test]
    fn status_round_trips_through_str() {
        for st in [
            SyncStatus::Queued,
            SyncStatus::Running,
            SyncStatus::Retrying,
            SyncStatus::Success,
            SyncStatus::Failed,
        ] {
            assert_eq!(SyncStatus::parse(st.as_str()).unwrap(), st);
        }
        for st in [
            OrderStatus::Open,
            OrderStatus::PartiallyDelivered,
            OrderStatus::Delivered,
            OrderStatus::Delayed,
        ] {
            assert_eq!(OrderStatus::parse(st.as_str()).unwrap(), st);
        }
    }

    #[test]
    fn legacy_healthy_parses_as_active() {
        assert_eq!(
            ConnectorHealth::parse("healthy").unwrap(),
            ConnectorHealth::Active
        );
    }

    #[test]
    fn unknown_enum_value_is_an_error() {
        let err = RiskTier::parse("purple").unwrap_err();
        assert_eq!(err.to_string(), "invalid RiskTier value: purple");
    }

    #[test]
    fn only_open_and_partial_are_scoreable() {
        assert!(OrderStatus::Open.is_scoreable());
        assert!(OrderStatus::PartiallyDelivered.is_scoreable());
        assert!(!OrderStatus::Delivered.is_scoreable());
        assert!(!OrderStatus::Delayed.is_scoreable());
    }

    #[test]
    fn payload_serde_snake_case_statuses() {
        let json = serde_json::to_string(&OrderStatus::PartiallyDelivered).unwrap();
        assert_eq!(json, "\"partially_delivered\"");
    }
}
