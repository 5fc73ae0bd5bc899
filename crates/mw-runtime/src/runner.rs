use chrono::Utc;
use mw_config::Policies;
use mw_db::{
    connector_by_id, insert_sync_run, mark_connector_active, mark_connector_degraded,
    mark_run_failed, mark_run_retrying, mark_run_running, mark_run_success, NewSyncRun,
};
use mw_feed::SupplierFeed;
use mw_schemas::{SyncMode, SyncRunResult, SyncStatus};
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::attempt::run_attempt;
use crate::SyncError;

/// Backoff before retry `attempt + 1`, after `attempt` failed:
/// `base * 2^(attempt-1)` seconds.
pub fn backoff_delay_secs(backoff_base_secs: f64, attempt: u32) -> f64 {
    backoff_base_secs * 2f64.powi(attempt.saturating_sub(1) as i32)
}

/// Run one sync job for a connector to completion.
///
/// State machine: queued → running → (success | retrying → running … →
/// failed). Each attempt re-fetches the payload and runs in its own
/// transaction; the run/connector status rows commit outside that scope so
/// a rolled-back attempt still leaves an audit trail.
///
/// Fails with [`SyncError::Failed`] only after exhausting the attempt cap;
/// [`SyncError::Lookup`] when the connector (or the run row, mid-flight)
/// has vanished; that is immediately fatal, retrying cannot help.
pub async fn run_sync(
    pool: &PgPool,
    policies: &Policies,
    feed: &dyn SupplierFeed,
    connector_id: Uuid,
    mode: SyncMode,
) -> Result<SyncRunResult, SyncError> {
    let started_at = Utc::now();

    let connector = connector_by_id(pool, connector_id)
        .await
        .map_err(SyncError::Store)?
        .ok_or_else(|| SyncError::Lookup(format!("connector {connector_id} not found")))?;

    let run_id = Uuid::new_v4();
    insert_sync_run(
        pool,
        &NewSyncRun {
            run_id,
            connector_id,
            mode,
            policy_hash: policies.policy_hash().ok(),
            started_at,
        },
    )
    .await
    .map_err(SyncError::Store)?;

    info!(
        %run_id,
        connector = %connector.supplier_name,
        mode = mode.as_str(),
        "sync job queued"
    );

    let max_attempts = policies.sync.max_attempts;
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        // The connector row is re-read every attempt: it vanishing
        // mid-run is a lookup failure, not something to retry through.
        let connector = connector_by_id(pool, connector_id)
            .await
            .map_err(SyncError::Store)?
            .ok_or_else(|| {
                SyncError::Lookup(format!("connector {connector_id} vanished mid-run"))
            })?;

        mark_run_running(pool, run_id, attempt as i32)
            .await
            .map_err(SyncError::Store)?;

        let now = Utc::now();
        let mut tx = pool.begin().await.map_err(|e| {
            SyncError::Store(anyhow::Error::new(e).context("begin attempt transaction"))
        })?;

        match run_attempt(&mut tx, &connector, feed, policies, now).await {
            Ok(metrics) => {
                tx.commit().await.map_err(|e| {
                    SyncError::Store(anyhow::Error::new(e).context("commit attempt"))
                })?;

                mark_run_success(pool, run_id, metrics, Utc::now())
                    .await
                    .map_err(SyncError::Store)?;
                mark_connector_active(pool, connector_id, now)
                    .await
                    .map_err(SyncError::Store)?;

                info!(
                    %run_id,
                    attempt,
                    processed_orders = metrics.processed_orders,
                    assessed_orders = metrics.assessed_orders,
                    generated_alerts = metrics.generated_alerts,
                    "sync job succeeded"
                );

                return Ok(SyncRunResult {
                    job_id: run_id,
                    status: SyncStatus::Success,
                    processed_orders: metrics.processed_orders as u64,
                    processed_inventory_rows: metrics.processed_inventory_rows as u64,
                    assessed_orders: metrics.assessed_orders as u64,
                    generated_alerts: metrics.generated_alerts as u64,
                });
            }
            Err(attempt_err) => {
                // Roll the attempt's writes back before recording anything:
                // a retried attempt must start from clean persisted state.
                let _ = tx.rollback().await;
                last_error = attempt_err.to_string();

                if attempt < max_attempts {
                    warn!(%run_id, attempt, error = %last_error, "sync attempt failed; retrying");
                    mark_run_retrying(pool, run_id, attempt as i32, &last_error)
                        .await
                        .map_err(SyncError::Store)?;

                    let delay = backoff_delay_secs(policies.sync.backoff_base_secs, attempt);
                    tokio::time::sleep(std::time::Duration::from_secs_f64(delay)).await;
                } else {
                    error!(%run_id, attempt, error = %last_error, "sync job failed terminally");
                    mark_run_failed(pool, run_id, &last_error, Utc::now())
                        .await
                        .map_err(SyncError::Store)?;
                    mark_connector_degraded(pool, connector_id, &last_error, Utc::now())
                        .await
                        .map_err(SyncError::Store)?;

                    return Err(SyncError::Failed {
                        last_error,
                        attempts: max_attempts,
                    });
                }
            }
        }
    }

    // Unreachable while max_attempts >= 1 (policy-validated).
    Err(SyncError::Failed {
        last_error,
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay_secs(0.25, 1), 0.25);
        assert_eq!(backoff_delay_secs(0.25, 2), 0.5);
        assert_eq!(backoff_delay_secs(0.25, 3), 1.0);
    }

    #[test]
    fn backoff_attempt_zero_clamps_to_base() {
        assert_eq!(backoff_delay_secs(0.25, 0), 0.25);
    }
}
