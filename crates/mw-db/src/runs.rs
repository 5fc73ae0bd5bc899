use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use mw_schemas::{SyncMode, SyncStatus};
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewSyncRun {
    pub run_id: Uuid,
    pub connector_id: Uuid,
    pub mode: SyncMode,
    pub policy_hash: Option<String>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncMetrics {
    pub processed_orders: i64,
    pub processed_inventory_rows: i64,
    pub assessed_orders: i64,
    pub generated_alerts: i64,
}

#[derive(Debug, Clone)]
pub struct SyncRunRow {
    pub run_id: Uuid,
    pub connector_id: Uuid,
    pub mode: SyncMode,
    pub status: SyncStatus,
    pub attempts: i32,
    pub error: Option<String>,
    pub policy_hash: Option<String>,
    pub metrics: SyncMetrics,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

fn map_run(row: &PgRow) -> Result<SyncRunRow> {
    Ok(SyncRunRow {
        run_id: row.try_get("run_id")?,
        connector_id: row.try_get("connector_id")?,
        mode: SyncMode::parse(&row.try_get::<String, _>("mode")?)?,
        status: SyncStatus::parse(&row.try_get::<String, _>("status")?)?,
        attempts: row.try_get("attempts")?,
        error: row.try_get("error")?,
        policy_hash: row.try_get("policy_hash")?,
        metrics: SyncMetrics {
            processed_orders: row.try_get("processed_orders")?,
            processed_inventory_rows: row.try_get("processed_inventory_rows")?,
            assessed_orders: row.try_get("assessed_orders")?,
            generated_alerts: row.try_get("generated_alerts")?,
        },
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

const RUN_COLUMNS: &str = r#"
    run_id, connector_id, mode, status, attempts, error, policy_hash,
    processed_orders, processed_inventory_rows, assessed_orders,
    generated_alerts, started_at, completed_at
"#;

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert a queued run row. The runner owns every subsequent transition.
pub async fn insert_sync_run(ex: impl PgExecutor<'_>, run: &NewSyncRun) -> Result<()> {
    sqlx::query(
        r#"
        insert into sync_runs (run_id, connector_id, mode, status, policy_hash, started_at)
        values ($1, $2, $3, 'queued', $4, $5)
        "#,
    )
    .bind(run.run_id)
    .bind(run.connector_id)
    .bind(run.mode.as_str())
    .bind(&run.policy_hash)
    .bind(run.started_at)
    .execute(ex)
    .await
    .context("insert_sync_run failed")?;
    Ok(())
}

pub async fn sync_run_by_id(ex: impl PgExecutor<'_>, run_id: Uuid) -> Result<Option<SyncRunRow>> {
    let row = sqlx::query(&format!(
        "select {RUN_COLUMNS} from sync_runs where run_id = $1"
    ))
    .bind(run_id)
    .fetch_optional(ex)
    .await
    .context("sync_run_by_id failed")?;

    row.as_ref().map(map_run).transpose()
}

/// queued/retrying -> running, stamping the attempt counter.
pub async fn mark_run_running(ex: impl PgExecutor<'_>, run_id: Uuid, attempt: i32) -> Result<()> {
    let res = sqlx::query(
        r#"
        update sync_runs
        set status = 'running', attempts = $2
        where run_id = $1 and status in ('queued', 'retrying')
        "#,
    )
    .bind(run_id)
    .bind(attempt)
    .execute(ex)
    .await
    .context("mark_run_running failed")?;

    if res.rows_affected() == 0 {
        return Err(anyhow!("mark_run_running invalid state for run {run_id}"));
    }
    Ok(())
}

/// running -> retrying, recording the attempt's error.
pub async fn mark_run_retrying(
    ex: impl PgExecutor<'_>,
    run_id: Uuid,
    attempt: i32,
    error: &str,
) -> Result<()> {
    let res = sqlx::query(
        r#"
        update sync_runs
        set status = 'retrying', attempts = $2, error = $3
        where run_id = $1 and status = 'running'
        "#,
    )
    .bind(run_id)
    .bind(attempt)
    .bind(error)
    .execute(ex)
    .await
    .context("mark_run_retrying failed")?;

    if res.rows_affected() == 0 {
        return Err(anyhow!("mark_run_retrying invalid state for run {run_id}"));
    }
    Ok(())
}

/// running -> success with recorded metrics. Terminal.
pub async fn mark_run_success(
    ex: impl PgExecutor<'_>,
    run_id: Uuid,
    metrics: SyncMetrics,
    completed_at: DateTime<Utc>,
) -> Result<()> {
    let res = sqlx::query(
        r#"
        update sync_runs
        set status = 'success',
            error = null,
            processed_orders = $2,
            processed_inventory_rows = $3,
            assessed_orders = $4,
            generated_alerts = $5,
            completed_at = $6
        where run_id = $1 and status = 'running'
        "#,
    )
    .bind(run_id)
    .bind(metrics.processed_orders)
    .bind(metrics.processed_inventory_rows)
    .bind(metrics.assessed_orders)
    .bind(metrics.generated_alerts)
    .bind(completed_at)
    .execute(ex)
    .await
    .context("mark_run_success failed")?;

    if res.rows_affected() == 0 {
        return Err(anyhow!("mark_run_success invalid state for run {run_id}"));
    }
    Ok(())
}

/// running -> failed with the last error. Terminal; failure is surfaced,
/// never silently swallowed.
pub async fn mark_run_failed(
    ex: impl PgExecutor<'_>,
    run_id: Uuid,
    error: &str,
    completed_at: DateTime<Utc>,
) -> Result<()> {
    let res = sqlx::query(
        r#"
        update sync_runs
        set status = 'failed', error = $2, completed_at = $3
        where run_id = $1 and status in ('running', 'queued')
        "#,
    )
    .bind(run_id)
    .bind(error)
    .bind(completed_at)
    .execute(ex)
    .await
    .context("mark_run_failed failed")?;

    if res.rows_affected() == 0 {
        return Err(anyhow!("mark_run_failed invalid state for run {run_id}"));
    }
    Ok(())
}
