use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use mw_schemas::ConnectorHealth;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewConnector {
    pub connector_id: Uuid,
    pub tenant_id: String,
    pub supplier_name: String,
    pub auth_type: String,
    /// Opaque credential handle; raw secrets never reach the store.
    pub secret_ref: String,
    pub poll_interval_minutes: i32,
}

#[derive(Debug, Clone)]
pub struct ConnectorRow {
    pub connector_id: Uuid,
    pub tenant_id: String,
    pub supplier_name: String,
    pub auth_type: String,
    pub secret_ref: String,
    pub health: ConnectorHealth,
    pub poll_interval_minutes: i32,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_sync_error: Option<String>,
    pub stale_since: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn map_connector(row: &PgRow) -> Result<ConnectorRow> {
    Ok(ConnectorRow {
        connector_id: row.try_get("connector_id")?,
        tenant_id: row.try_get("tenant_id")?,
        supplier_name: row.try_get("supplier_name")?,
        auth_type: row.try_get("auth_type")?,
        secret_ref: row.try_get("secret_ref")?,
        health: ConnectorHealth::parse(&row.try_get::<String, _>("health")?)?,
        poll_interval_minutes: row.try_get("poll_interval_minutes")?,
        last_sync_at: row.try_get("last_sync_at")?,
        last_sync_error: row.try_get("last_sync_error")?,
        stale_since: row.try_get("stale_since")?,
        created_at: row.try_get("created_at")?,
    })
}

const CONNECTOR_COLUMNS: &str = r#"
    connector_id, tenant_id, supplier_name, auth_type, secret_ref, health,
    poll_interval_minutes, last_sync_at, last_sync_error, stale_since, created_at
"#;

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert a freshly registered connector (health = pending_validation).
pub async fn insert_connector(ex: impl PgExecutor<'_>, c: &NewConnector) -> Result<()> {
    sqlx::query(
        r#"
        insert into supplier_connectors (
          connector_id, tenant_id, supplier_name, auth_type, secret_ref,
          health, poll_interval_minutes
        ) values ($1, $2, $3, $4, $5, 'pending_validation', $6)
        "#,
    )
    .bind(c.connector_id)
    .bind(&c.tenant_id)
    .bind(&c.supplier_name)
    .bind(&c.auth_type)
    .bind(&c.secret_ref)
    .bind(c.poll_interval_minutes)
    .execute(ex)
    .await
    .context("insert_connector failed")?;
    Ok(())
}

pub async fn connector_by_id(
    ex: impl PgExecutor<'_>,
    connector_id: Uuid,
) -> Result<Option<ConnectorRow>> {
    let row = sqlx::query(&format!(
        "select {CONNECTOR_COLUMNS} from supplier_connectors where connector_id = $1"
    ))
    .bind(connector_id)
    .fetch_optional(ex)
    .await
    .context("connector_by_id failed")?;

    row.as_ref().map(map_connector).transpose()
}

pub async fn connector_by_tenant_supplier(
    ex: impl PgExecutor<'_>,
    tenant_id: &str,
    supplier_name: &str,
) -> Result<Option<ConnectorRow>> {
    let row = sqlx::query(&format!(
        "select {CONNECTOR_COLUMNS} from supplier_connectors \
         where tenant_id = $1 and supplier_name = $2"
    ))
    .bind(tenant_id)
    .bind(supplier_name)
    .fetch_optional(ex)
    .await
    .context("connector_by_tenant_supplier failed")?;

    row.as_ref().map(map_connector).transpose()
}

pub async fn list_connectors(
    ex: impl PgExecutor<'_>,
    tenant_id: &str,
) -> Result<Vec<ConnectorRow>> {
    let rows = sqlx::query(&format!(
        "select {CONNECTOR_COLUMNS} from supplier_connectors \
         where tenant_id = $1 order by created_at desc"
    ))
    .bind(tenant_id)
    .fetch_all(ex)
    .await
    .context("list_connectors failed")?;

    rows.iter().map(map_connector).collect()
}

/// Successful sync: connector is active, error and staleness cleared.
pub async fn mark_connector_active(
    ex: impl PgExecutor<'_>,
    connector_id: Uuid,
    synced_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        update supplier_connectors
        set health = 'active',
            last_sync_at = $2,
            last_sync_error = null,
            stale_since = null
        where connector_id = $1
        "#,
    )
    .bind(connector_id)
    .bind(synced_at)
    .execute(ex)
    .await
    .context("mark_connector_active failed")?;
    Ok(())
}

/// Terminal sync failure: degraded, with the last error and a stale-since
/// marker so dashboards can surface data age without crashing reads.
pub async fn mark_connector_degraded(
    ex: impl PgExecutor<'_>,
    connector_id: Uuid,
    error: &str,
    failed_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        update supplier_connectors
        set health = 'degraded',
            last_sync_error = $2,
            stale_since = coalesce(stale_since, $3)
        where connector_id = $1
        "#,
    )
    .bind(connector_id)
    .bind(error)
    .bind(failed_at)
    .execute(ex)
    .await
    .context("mark_connector_degraded failed")?;
    Ok(())
}
