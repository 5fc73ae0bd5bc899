use anyhow::{anyhow, Context};
use chrono::{DateTime, Duration, Utc};
use mw_alerts::{build_alert, proposed_severity, AlertContext};
use mw_config::Policies;
use mw_db::{
    insert_alert, insert_assessment, insert_inventory_snapshot, latest_assessment,
    latest_inventory, order_line_by_natural_key, upsert_order_line, ConnectorRow, NewAlertRow,
    NewAssessment, NewInventorySnapshot, OrderLineRow, OrderLineUpsert, SyncMetrics,
};
use mw_feed::{FeedRequest, SupplierFeed};
use mw_reconcile::{content_hash, derive_status, upsert_verdict, validate_payload};
use mw_risk::ScoreInput;
use mw_schemas::SupplierPayload;
use sqlx::{Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AttemptError, ReconcileError};

/// One full attempt: fetch → validate → reconcile → score → alert.
///
/// Runs entirely on the supplied transaction; the caller commits on `Ok`
/// and rolls back on `Err`, so an attempt either lands whole or not at all.
pub(crate) async fn run_attempt(
    tx: &mut Transaction<'_, Postgres>,
    connector: &ConnectorRow,
    feed: &dyn SupplierFeed,
    policies: &Policies,
    now: DateTime<Utc>,
) -> Result<SyncMetrics, AttemptError> {
    let req = FeedRequest {
        supplier_name: connector.supplier_name.clone(),
        connector_id: connector.connector_id.to_string(),
        now,
    };
    let payload = feed
        .fetch(&req)
        .map_err(|e| AttemptError::Transient(anyhow!(e)))?;

    let affected = reconcile(tx, connector, feed.name(), &payload, now).await?;

    let mut metrics = SyncMetrics {
        processed_orders: affected.len() as i64,
        processed_inventory_rows: payload.inventory.len() as i64,
        ..SyncMetrics::default()
    };

    for line in &affected {
        if !line.status.is_scoreable() {
            continue;
        }
        let alerted = score_and_decide(tx, connector, policies, line, now).await?;
        metrics.assessed_orders += 1;
        if alerted {
            metrics.generated_alerts += 1;
        }
    }

    Ok(metrics)
}

/// Reconcile one validated payload into persisted state.
///
/// Every inventory row is appended as a new snapshot; every order row is
/// upserted by natural key. Fails with [`ReconcileError::Validation`] on
/// any malformed or future-dated record before a single write happens.
/// Returns the order lines touched this cycle, in payload order.
pub async fn reconcile(
    tx: &mut Transaction<'_, Postgres>,
    connector: &ConnectorRow,
    source: &str,
    payload: &SupplierPayload,
    now: DateTime<Utc>,
) -> Result<Vec<OrderLineRow>, ReconcileError> {
    validate_payload(payload, now).map_err(ReconcileError::Validation)?;
    append_inventory(tx, connector, source, payload, now).await?;
    upsert_orders(tx, connector, payload, now).await
}

/// Persist every inventory row as a fresh snapshot. Append-only, no dedup.
async fn append_inventory(
    tx: &mut Transaction<'_, Postgres>,
    connector: &ConnectorRow,
    feed_name: &str,
    payload: &SupplierPayload,
    now: DateTime<Utc>,
) -> Result<(), ReconcileError> {
    for record in &payload.inventory {
        let snapshot = NewInventorySnapshot {
            snapshot_id: Uuid::new_v4(),
            connector_id: connector.connector_id,
            supplier_sku: record.supplier_sku.clone(),
            qty_available: record.qty_available,
            captured_at: now,
            source_timestamp: record.source_timestamp,
            raw_payload_ref: Some(format!(
                "{feed_name}://{}/{}",
                connector.supplier_name, record.supplier_sku
            )),
        };
        insert_inventory_snapshot(&mut **tx, &snapshot).await?;
    }
    Ok(())
}

/// Upsert each order row by natural key, in payload order.
///
/// Unchanged rows (same content hash, same source timestamp) skip the write
/// entirely but still join the affected set: risk is re-derived every cycle
/// because inventory and staleness may have moved underneath the line.
async fn upsert_orders(
    tx: &mut Transaction<'_, Postgres>,
    connector: &ConnectorRow,
    payload: &SupplierPayload,
    now: DateTime<Utc>,
) -> Result<Vec<OrderLineRow>, ReconcileError> {
    let mut affected = Vec::with_capacity(payload.orders.len());

    for record in &payload.orders {
        let incoming_hash = content_hash(record);
        let existing = order_line_by_natural_key(
            &mut **tx,
            &connector.tenant_id,
            &record.supplier_order_id,
            &record.supplier_sku,
        )
        .await?;

        let verdict = upsert_verdict(
            existing
                .as_ref()
                .map(|row| (row.source_hash.as_str(), row.source_timestamp)),
            &incoming_hash,
            record.source_timestamp,
        );

        if !verdict.writes() {
            debug!(
                order = %record.supplier_order_id,
                sku = %record.supplier_sku,
                "order line unchanged; re-scoring only"
            );
            affected.push(existing.context("unchanged verdict without a persisted row")?);
            continue;
        }

        let upsert = OrderLineUpsert {
            order_line_id: Uuid::new_v4(),
            tenant_id: connector.tenant_id.clone(),
            connector_id: connector.connector_id,
            project_id: record.project_id.clone(),
            supplier_order_id: record.supplier_order_id.clone(),
            supplier_sku: record.supplier_sku.clone(),
            material_name: record.material_name.clone(),
            qty_ordered: record.qty_ordered,
            qty_delivered: record.qty_delivered,
            eta_date: record.eta_date,
            impact_date: record.impact_date,
            status: derive_status(record),
            historical_late_rate: record.historical_late_rate,
            eta_volatility_days: record.eta_volatility_days,
            lead_time_trend_days: record.lead_time_trend_days,
            source_timestamp: record.source_timestamp,
            source_hash: incoming_hash,
            last_synced_at: now,
        };
        let (row, _inserted) = upsert_order_line(&mut **tx, &upsert).await?;
        affected.push(row);
    }

    Ok(affected)
}

/// Score one line, persist the assessment, and run the alert decision.
/// Returns whether an alert was created.
async fn score_and_decide(
    tx: &mut Transaction<'_, Postgres>,
    connector: &ConnectorRow,
    policies: &Policies,
    line: &OrderLineRow,
    now: DateTime<Utc>,
) -> Result<bool, AttemptError> {
    // Previous tier must be read before this cycle's assessment lands.
    let previous = latest_assessment(&mut **tx, line.order_line_id).await?;
    let inventory =
        latest_inventory(&mut **tx, connector.connector_id, &line.supplier_sku).await?;

    let input = ScoreInput {
        qty_ordered: line.qty_ordered,
        qty_delivered: line.qty_delivered,
        qty_available: inventory.as_ref().map(|i| i.qty_available),
        eta_date: line.eta_date,
        impact_date: line.impact_date,
        historical_late_rate: line.historical_late_rate,
        eta_volatility_days: line.eta_volatility_days,
        lead_time_trend_days: line.lead_time_trend_days,
        inventory_source_timestamp: inventory.as_ref().map(|i| i.source_timestamp),
    };
    let assessment = mw_risk::score(&policies.risk, &input, now);

    insert_assessment(
        &mut **tx,
        &NewAssessment {
            assessment_id: Uuid::new_v4(),
            order_line_id: line.order_line_id,
            risk_score: assessment.score,
            risk_status: assessment.tier,
            confidence: assessment.confidence,
            reason_codes: assessment.reason_code_strings(),
            estimated_delay_days: assessment.estimated_delay_days as i32,
            stale_data: assessment.stale_data,
            assessed_at: now,
        },
    )
    .await?;

    let previous_tier = previous.map(|p| p.risk_status);
    let Some(severity) = proposed_severity(previous_tier, &assessment) else {
        return Ok(false);
    };

    let since = now - Duration::hours(policies.alerts.cooldown_hours);
    let cooling_down = mw_db::recent_alert_exists(
        &mut **tx,
        &connector.tenant_id,
        line.order_line_id,
        severity,
        since,
    )
    .await?;
    if cooling_down {
        debug!(
            order = %line.supplier_order_id,
            severity = severity.as_str(),
            "alert suppressed by cooldown"
        );
        return Ok(false);
    }

    let ctx = AlertContext {
        material_name: line.material_name.clone(),
        supplier_order_id: line.supplier_order_id.clone(),
        impact_date: line.impact_date.or(line.eta_date),
    };
    let alert = build_alert(&ctx, &assessment, severity);

    insert_alert(
        &mut **tx,
        &NewAlertRow {
            alert_id: Uuid::new_v4(),
            tenant_id: connector.tenant_id.clone(),
            order_line_id: line.order_line_id,
            severity: alert.severity,
            message: alert.message,
            recommendations: serde_json::to_value(&alert.recommendations)
                .context("recommendations to json failed")?,
            created_at: now,
        },
    )
    .await?;

    Ok(true)
}
