//! Axum router and all HTTP handlers for mw-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and
//! attaches middleware layers. All handlers are `pub(crate)` so the
//! scenario tests in `tests/` can compose the router directly.
//!
//! Everything here is thin CRUD glue: header-resolved context in, store
//! reads/writes or a runner invocation, JSON out. The pipeline logic lives
//! in the engine crates.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use mw_feed::supplier_supported;
use mw_runtime::{ensure_admittable, run_sync, SyncError};
use mw_schemas::{AlertSeverity, AlertStatus, Role};
use tracing::info;
use uuid::Uuid;

use crate::{
    api_types::{
        AlertActionResponse, AlertListQuery, AlertView, ConnectorListResponse, ConnectorResponse,
        CreateConnectorRequest, DashboardSummaryResponse, ErrorResponse, HealthResponse,
        ListAlertsResponse, OrderDetailResponse, RiskHistoryPoint, SuppliersResponse,
        SyncRunRequest, SyncRunResponse,
    },
    auth::{context_from_headers, require_roles},
    state::AppState,
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/meta/suppliers", get(list_suppliers))
        .route(
            "/v1/integrations/suppliers",
            post(create_connector).get(list_connectors),
        )
        .route("/v1/sync/run", post(trigger_sync))
        .route("/v1/dashboard/summary", get(dashboard_summary))
        .route("/v1/orders/:id", get(order_detail))
        .route("/v1/alerts", get(list_alerts))
        .route("/v1/alerts/:id/acknowledge", post(acknowledge_alert))
        .route("/v1/alerts/:id/resolve", post(resolve_alert))
        .with_state(state)
}

fn internal_error(err: anyhow::Error) -> Response {
    tracing::error!(error = %err, "handler failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "internal error".to_string(),
        }),
    )
        .into_response()
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("{what} not found"),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/meta/suppliers
// ---------------------------------------------------------------------------

pub(crate) async fn list_suppliers() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(SuppliersResponse {
            suppliers: mw_feed::SUPPORTED_SUPPLIERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/integrations/suppliers
// ---------------------------------------------------------------------------

fn connector_view(row: &mw_db::ConnectorRow) -> ConnectorResponse {
    ConnectorResponse {
        id: row.connector_id,
        supplier_name: row.supplier_name.clone(),
        health: row.health,
        poll_interval_minutes: row.poll_interval_minutes,
        last_sync_at: row.last_sync_at,
        last_sync_error: row.last_sync_error.clone(),
        created_at: row.created_at,
    }
}

pub(crate) async fn create_connector(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateConnectorRequest>,
) -> Response {
    let ctx = match context_from_headers(&headers) {
        Ok(ctx) => ctx,
        Err(refusal) => return refusal.into_response(),
    };

    if !supplier_supported(&req.supplier_name) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("supplier {} is not supported", req.supplier_name),
            }),
        )
            .into_response();
    }

    match mw_db::connector_by_tenant_supplier(&st.pool, &ctx.tenant_id, &req.supplier_name).await {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: "connector already exists for this supplier".to_string(),
                }),
            )
                .into_response();
        }
        Ok(None) => {}
        Err(err) => return internal_error(err),
    }

    // The raw credential is swapped for an opaque handle before anything is
    // persisted; only a secret manager would hold the real value.
    let connector = mw_db::NewConnector {
        connector_id: Uuid::new_v4(),
        tenant_id: ctx.tenant_id.clone(),
        supplier_name: req.supplier_name.clone(),
        auth_type: req.auth_type.clone(),
        secret_ref: format!("secret://{}", Uuid::new_v4()),
        poll_interval_minutes: req.poll_interval_minutes,
    };

    if let Err(err) = mw_db::insert_connector(&st.pool, &connector).await {
        return internal_error(err);
    }

    info!(
        tenant = %ctx.tenant_id,
        supplier = %req.supplier_name,
        "connector registered"
    );

    match mw_db::connector_by_id(&st.pool, connector.connector_id).await {
        Ok(Some(row)) => (StatusCode::CREATED, Json(connector_view(&row))).into_response(),
        Ok(None) => not_found("connector"),
        Err(err) => internal_error(err),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/integrations/suppliers
// ---------------------------------------------------------------------------

pub(crate) async fn list_connectors(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let ctx = match context_from_headers(&headers) {
        Ok(ctx) => ctx,
        Err(refusal) => return refusal.into_response(),
    };

    match mw_db::list_connectors(&st.pool, &ctx.tenant_id).await {
        Ok(rows) => (
            StatusCode::OK,
            Json(ConnectorListResponse {
                items: rows.iter().map(connector_view).collect(),
            }),
        )
            .into_response(),
        Err(err) => internal_error(err),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/sync/run
// ---------------------------------------------------------------------------

pub(crate) async fn trigger_sync(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SyncRunRequest>,
) -> Response {
    let ctx = match context_from_headers(&headers) {
        Ok(ctx) => ctx,
        Err(refusal) => return refusal.into_response(),
    };

    let connector = match mw_db::connector_by_id(&st.pool, req.connector_id).await {
        Ok(Some(row)) if row.tenant_id == ctx.tenant_id => row,
        Ok(_) => return not_found("connector"),
        Err(err) => return internal_error(err),
    };

    if let Err(SyncError::RateLimited { retry_after_secs }) =
        ensure_admittable(&connector, Utc::now(), &st.policies.sync)
    {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse {
                error: format!("manual sync is rate-limited; retry in {retry_after_secs}s"),
            }),
        )
            .into_response();
    }

    match run_sync(
        &st.pool,
        &st.policies,
        st.feed.as_ref(),
        connector.connector_id,
        req.mode,
    )
    .await
    {
        Ok(result) => (
            StatusCode::OK,
            Json(SyncRunResponse {
                job_id: result.job_id,
                status: result.status,
                processed_orders: result.processed_orders,
                processed_inventory_rows: result.processed_inventory_rows,
                assessed_orders: result.assessed_orders,
                generated_alerts: result.generated_alerts,
            }),
        )
            .into_response(),
        Err(SyncError::Lookup(what)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse { error: what }),
        )
            .into_response(),
        Err(err @ SyncError::Failed { .. }) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
            .into_response(),
        Err(SyncError::RateLimited { retry_after_secs }) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse {
                error: format!("manual sync is rate-limited; retry in {retry_after_secs}s"),
            }),
        )
            .into_response(),
        Err(SyncError::Store(err)) => internal_error(err),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/dashboard/summary
// ---------------------------------------------------------------------------

pub(crate) async fn dashboard_summary(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let ctx = match context_from_headers(&headers) {
        Ok(ctx) => ctx,
        Err(refusal) => return refusal.into_response(),
    };

    let connectors = match mw_db::list_connectors(&st.pool, &ctx.tenant_id).await {
        Ok(rows) => rows,
        Err(err) => return internal_error(err),
    };

    let sync_health = if connectors
        .iter()
        .any(|c| c.health == mw_schemas::ConnectorHealth::Degraded)
    {
        "degraded"
    } else if connectors
        .iter()
        .any(|c| c.health == mw_schemas::ConnectorHealth::Active)
    {
        "active"
    } else {
        "pending"
    };
    let last_sync_at = connectors.iter().filter_map(|c| c.last_sync_at).max();

    let counts = match mw_db::latest_tier_counts(&st.pool, &ctx.tenant_id).await {
        Ok(counts) => counts,
        Err(err) => return internal_error(err),
    };
    let open_alerts = match mw_db::open_alert_count(&st.pool, &ctx.tenant_id).await {
        Ok(n) => n,
        Err(err) => return internal_error(err),
    };

    (
        StatusCode::OK,
        Json(DashboardSummaryResponse {
            sync_health: sync_health.to_string(),
            last_sync_at,
            red_count: counts.red,
            yellow_count: counts.yellow,
            green_count: counts.green,
            open_alerts,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/orders/{id}
// ---------------------------------------------------------------------------

fn alert_view(row: &mw_db::AlertRow) -> AlertView {
    AlertView {
        id: row.alert_id,
        order_line_id: row.order_line_id,
        severity: row.severity,
        status: row.status,
        message: row.message.clone(),
        recommendations: row.recommendations.clone(),
        created_at: row.created_at,
        acknowledged_at: row.acknowledged_at,
        resolved_at: row.resolved_at,
    }
}

pub(crate) async fn order_detail(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_line_id): Path<Uuid>,
) -> Response {
    let ctx = match context_from_headers(&headers) {
        Ok(ctx) => ctx,
        Err(refusal) => return refusal.into_response(),
    };

    let line = match mw_db::order_line_by_id(&st.pool, order_line_id).await {
        Ok(Some(row)) if row.tenant_id == ctx.tenant_id => row,
        Ok(_) => return not_found("order"),
        Err(err) => return internal_error(err),
    };

    let history = match mw_db::assessment_history(&st.pool, line.order_line_id).await {
        Ok(rows) => rows,
        Err(err) => return internal_error(err),
    };
    let alerts = match mw_db::alerts_for_order_line(&st.pool, &ctx.tenant_id, line.order_line_id)
        .await
    {
        Ok(rows) => rows,
        Err(err) => return internal_error(err),
    };

    (
        StatusCode::OK,
        Json(OrderDetailResponse {
            order_line_id: line.order_line_id,
            supplier_order_id: line.supplier_order_id,
            supplier_sku: line.supplier_sku,
            material_name: line.material_name,
            project_id: line.project_id,
            qty_ordered: line.qty_ordered,
            qty_delivered: line.qty_delivered,
            eta_date: line.eta_date,
            impact_date: line.impact_date,
            status: line.status.as_str().to_string(),
            risk_history: history
                .iter()
                .map(|a| RiskHistoryPoint {
                    assessed_at: a.assessed_at,
                    risk_score: a.risk_score,
                    risk_status: a.risk_status.as_str().to_string(),
                    confidence: a.confidence,
                    reason_codes: a.reason_codes.clone(),
                    estimated_delay_days: a.estimated_delay_days,
                })
                .collect(),
            alerts: alerts.iter().map(alert_view).collect(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/alerts
// ---------------------------------------------------------------------------

pub(crate) async fn list_alerts(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AlertListQuery>,
) -> Response {
    let ctx = match context_from_headers(&headers) {
        Ok(ctx) => ctx,
        Err(refusal) => return refusal.into_response(),
    };

    let status = match query.status.as_deref().map(AlertStatus::parse).transpose() {
        Ok(s) => s,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response();
        }
    };
    let severity = match query
        .severity
        .as_deref()
        .map(AlertSeverity::parse)
        .transpose()
    {
        Ok(s) => s,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response();
        }
    };

    match mw_db::list_alerts(&st.pool, &ctx.tenant_id, status, severity, 200).await {
        Ok(rows) => (
            StatusCode::OK,
            Json(ListAlertsResponse {
                total: rows.len(),
                items: rows.iter().map(alert_view).collect(),
            }),
        )
            .into_response(),
        Err(err) => internal_error(err),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/alerts/{id}/acknowledge  /v1/alerts/{id}/resolve
// ---------------------------------------------------------------------------

async fn transition_alert(
    st: &AppState,
    headers: &HeaderMap,
    alert_id: Uuid,
    target: AlertStatus,
    allowed: &[Role],
) -> Response {
    let ctx = match context_from_headers(headers) {
        Ok(ctx) => ctx,
        Err(refusal) => return refusal.into_response(),
    };
    if let Err(refusal) = require_roles(&ctx, allowed) {
        return refusal.into_response();
    }

    let now = Utc::now();
    match mw_db::set_alert_status(&st.pool, &ctx.tenant_id, alert_id, target, now).await {
        Ok(Some(row)) => (
            StatusCode::OK,
            Json(AlertActionResponse {
                alert_id: row.alert_id,
                status: row.status,
                updated_at: now,
            }),
        )
            .into_response(),
        Ok(None) => not_found("alert"),
        Err(err) => internal_error(err),
    }
}

pub(crate) async fn acknowledge_alert(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(alert_id): Path<Uuid>,
) -> Response {
    transition_alert(
        &st,
        &headers,
        alert_id,
        AlertStatus::Acknowledged,
        &[Role::Owner, Role::Pm, Role::Coordinator],
    )
    .await
}

pub(crate) async fn resolve_alert(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(alert_id): Path<Uuid>,
) -> Response {
    transition_alert(
        &st,
        &headers,
        alert_id,
        AlertStatus::Resolved,
        &[Role::Owner, Role::Pm],
    )
    .await
}
