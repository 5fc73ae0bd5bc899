use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use mw_schemas::{AlertSeverity, AlertStatus, RiskTier};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};
use uuid::Uuid;

pub const MODEL_VERSION: &str = "heuristic_v1";

// ---------------------------------------------------------------------------
// Risk assessments (append-only)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub assessment_id: Uuid,
    pub order_line_id: Uuid,
    pub risk_score: f64,
    pub risk_status: RiskTier,
    pub confidence: f64,
    /// Sorted, deduplicated reason-code strings.
    pub reason_codes: Vec<String>,
    pub estimated_delay_days: i32,
    pub stale_data: bool,
    pub assessed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AssessmentRow {
    pub assessment_id: Uuid,
    pub order_line_id: Uuid,
    pub model_version: String,
    pub risk_score: f64,
    pub risk_status: RiskTier,
    pub confidence: f64,
    pub reason_codes: Vec<String>,
    pub estimated_delay_days: i32,
    pub stale_data: bool,
    pub assessed_at: DateTime<Utc>,
}

fn map_assessment(row: &PgRow) -> Result<AssessmentRow> {
    let codes: Value = row.try_get("reason_codes")?;
    let reason_codes = codes
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(AssessmentRow {
        assessment_id: row.try_get("assessment_id")?,
        order_line_id: row.try_get("order_line_id")?,
        model_version: row.try_get("model_version")?,
        risk_score: row.try_get("risk_score")?,
        risk_status: RiskTier::parse(&row.try_get::<String, _>("risk_status")?)?,
        confidence: row.try_get("confidence")?,
        reason_codes,
        estimated_delay_days: row.try_get("estimated_delay_days")?,
        stale_data: row.try_get("stale_data")?,
        assessed_at: row.try_get("assessed_at")?,
    })
}

/// Append one assessment row. Never mutated afterwards.
pub async fn insert_assessment(ex: impl PgExecutor<'_>, a: &NewAssessment) -> Result<()> {
    sqlx::query(
        r#"
        insert into risk_assessments (
          assessment_id, order_line_id, model_version, risk_score, risk_status,
          confidence, reason_codes, estimated_delay_days, stale_data, assessed_at
        ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(a.assessment_id)
    .bind(a.order_line_id)
    .bind(MODEL_VERSION)
    .bind(a.risk_score)
    .bind(a.risk_status.as_str())
    .bind(a.confidence)
    .bind(serde_json::to_value(&a.reason_codes).context("reason codes to json failed")?)
    .bind(a.estimated_delay_days)
    .bind(a.stale_data)
    .bind(a.assessed_at)
    .execute(ex)
    .await
    .context("insert_assessment failed")?;
    Ok(())
}

/// Current assessment = max by assessed_at for the line.
pub async fn latest_assessment(
    ex: impl PgExecutor<'_>,
    order_line_id: Uuid,
) -> Result<Option<AssessmentRow>> {
    let row = sqlx::query(
        r#"
        select assessment_id, order_line_id, model_version, risk_score,
               risk_status, confidence, reason_codes, estimated_delay_days,
               stale_data, assessed_at
        from risk_assessments
        where order_line_id = $1
        order by assessed_at desc
        limit 1
        "#,
    )
    .bind(order_line_id)
    .fetch_optional(ex)
    .await
    .context("latest_assessment failed")?;

    row.as_ref().map(map_assessment).transpose()
}

/// Full assessment history for a line, newest first.
pub async fn assessment_history(
    ex: impl PgExecutor<'_>,
    order_line_id: Uuid,
) -> Result<Vec<AssessmentRow>> {
    let rows = sqlx::query(
        r#"
        select assessment_id, order_line_id, model_version, risk_score,
               risk_status, confidence, reason_codes, estimated_delay_days,
               stale_data, assessed_at
        from risk_assessments
        where order_line_id = $1
        order by assessed_at desc
        "#,
    )
    .bind(order_line_id)
    .fetch_all(ex)
    .await
    .context("assessment_history failed")?;

    rows.iter().map(map_assessment).collect()
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewAlertRow {
    pub alert_id: Uuid,
    pub tenant_id: String,
    pub order_line_id: Uuid,
    pub severity: AlertSeverity,
    pub message: String,
    pub recommendations: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AlertRow {
    pub alert_id: Uuid,
    pub tenant_id: String,
    pub order_line_id: Uuid,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub message: String,
    pub recommendations: Value,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

fn map_alert(row: &PgRow) -> Result<AlertRow> {
    Ok(AlertRow {
        alert_id: row.try_get("alert_id")?,
        tenant_id: row.try_get("tenant_id")?,
        order_line_id: row.try_get("order_line_id")?,
        severity: AlertSeverity::parse(&row.try_get::<String, _>("severity")?)?,
        status: AlertStatus::parse(&row.try_get::<String, _>("status")?)?,
        message: row.try_get("message")?,
        recommendations: row.try_get("recommendations")?,
        created_at: row.try_get("created_at")?,
        acknowledged_at: row.try_get("acknowledged_at")?,
        resolved_at: row.try_get("resolved_at")?,
    })
}

const ALERT_COLUMNS: &str = r#"
    alert_id, tenant_id, order_line_id, severity, status, message,
    recommendations, created_at, acknowledged_at, resolved_at
"#;

/// Insert exactly one alert row (status = open).
pub async fn insert_alert(ex: impl PgExecutor<'_>, a: &NewAlertRow) -> Result<()> {
    sqlx::query(
        r#"
        insert into alerts (
          alert_id, tenant_id, order_line_id, severity, status, message,
          recommendations, created_at
        ) values ($1, $2, $3, $4, 'open', $5, $6, $7)
        "#,
    )
    .bind(a.alert_id)
    .bind(&a.tenant_id)
    .bind(a.order_line_id)
    .bind(a.severity.as_str())
    .bind(&a.message)
    .bind(&a.recommendations)
    .bind(a.created_at)
    .execute(ex)
    .await
    .context("insert_alert failed")?;
    Ok(())
}

/// Cooldown probe: does an alert of this severity exist for this line
/// within the window? Scoped by tenant + line + severity + recency.
pub async fn recent_alert_exists(
    ex: impl PgExecutor<'_>,
    tenant_id: &str,
    order_line_id: Uuid,
    severity: AlertSeverity,
    since: DateTime<Utc>,
) -> Result<bool> {
    let (exists,): (bool,) = sqlx::query_as(
        r#"
        select exists (
            select 1 from alerts
            where tenant_id = $1
              and order_line_id = $2
              and severity = $3
              and created_at >= $4
        )
        "#,
    )
    .bind(tenant_id)
    .bind(order_line_id)
    .bind(severity.as_str())
    .bind(since)
    .fetch_one(ex)
    .await
    .context("recent_alert_exists failed")?;
    Ok(exists)
}

/// List a tenant's alerts, optionally filtered, newest first.
pub async fn list_alerts(
    ex: impl PgExecutor<'_>,
    tenant_id: &str,
    status: Option<AlertStatus>,
    severity: Option<AlertSeverity>,
    limit: i64,
) -> Result<Vec<AlertRow>> {
    let rows = sqlx::query(&format!(
        "select {ALERT_COLUMNS} from alerts \
         where tenant_id = $1 \
           and ($2::text is null or status = $2) \
           and ($3::text is null or severity = $3) \
         order by created_at desc \
         limit $4"
    ))
    .bind(tenant_id)
    .bind(status.map(|s| s.as_str()))
    .bind(severity.map(|s| s.as_str()))
    .bind(limit)
    .fetch_all(ex)
    .await
    .context("list_alerts failed")?;

    rows.iter().map(map_alert).collect()
}

pub async fn alerts_for_order_line(
    ex: impl PgExecutor<'_>,
    tenant_id: &str,
    order_line_id: Uuid,
) -> Result<Vec<AlertRow>> {
    let rows = sqlx::query(&format!(
        "select {ALERT_COLUMNS} from alerts \
         where tenant_id = $1 and order_line_id = $2 \
         order by created_at desc"
    ))
    .bind(tenant_id)
    .bind(order_line_id)
    .fetch_all(ex)
    .await
    .context("alerts_for_order_line failed")?;

    rows.iter().map(map_alert).collect()
}

/// Operator transition: open → acknowledged | resolved. Returns the updated
/// row, or `None` when the alert does not exist under this tenant.
pub async fn set_alert_status(
    ex: impl PgExecutor<'_>,
    tenant_id: &str,
    alert_id: Uuid,
    status: AlertStatus,
    at: DateTime<Utc>,
) -> Result<Option<AlertRow>> {
    let row = sqlx::query(&format!(
        r#"
        update alerts
        set status = $3,
            acknowledged_at = case when $3 = 'acknowledged' then $4 else acknowledged_at end,
            resolved_at = case when $3 = 'resolved' then $4 else resolved_at end
        where tenant_id = $1 and alert_id = $2
        returning {ALERT_COLUMNS}
        "#
    ))
    .bind(tenant_id)
    .bind(alert_id)
    .bind(status.as_str())
    .bind(at)
    .fetch_optional(ex)
    .await
    .context("set_alert_status failed")?;

    row.as_ref().map(map_alert).transpose()
}

// ---------------------------------------------------------------------------
// Dashboard summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct TierCounts {
    pub red: i64,
    pub yellow: i64,
    pub green: i64,
}

/// Tier counts over the *latest* assessment per scoreable order line.
pub async fn latest_tier_counts(ex: impl PgExecutor<'_>, tenant_id: &str) -> Result<TierCounts> {
    let rows = sqlx::query(
        r#"
        select latest.risk_status as risk_status, count(*)::bigint as n
        from (
            select distinct on (ra.order_line_id)
                   ra.order_line_id, ra.risk_status
            from risk_assessments ra
            join order_lines ol on ol.order_line_id = ra.order_line_id
            where ol.tenant_id = $1
              and ol.status in ('open', 'partially_delivered')
            order by ra.order_line_id, ra.assessed_at desc
        ) latest
        group by latest.risk_status
        "#,
    )
    .bind(tenant_id)
    .fetch_all(ex)
    .await
    .context("latest_tier_counts failed")?;

    let mut counts = TierCounts::default();
    for row in rows {
        let status: String = row.try_get("risk_status")?;
        let n: i64 = row.try_get("n")?;
        match RiskTier::parse(&status)? {
            RiskTier::Red => counts.red = n,
            RiskTier::Yellow => counts.yellow = n,
            RiskTier::Green => counts.green = n,
        }
    }
    Ok(counts)
}

pub async fn open_alert_count(ex: impl PgExecutor<'_>, tenant_id: &str) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as(
        "select count(*)::bigint from alerts where tenant_id = $1 and status = 'open'",
    )
    .bind(tenant_id)
    .fetch_one(ex)
    .await
    .context("open_alert_count failed")?;
    Ok(n)
}
