use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use mw_schemas::OrderStatus;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Inventory snapshots (append-only)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewInventorySnapshot {
    pub snapshot_id: Uuid,
    pub connector_id: Uuid,
    pub supplier_sku: String,
    pub qty_available: f64,
    pub captured_at: DateTime<Utc>,
    pub source_timestamp: DateTime<Utc>,
    pub raw_payload_ref: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InventoryRow {
    pub snapshot_id: Uuid,
    pub connector_id: Uuid,
    pub supplier_sku: String,
    pub qty_available: f64,
    pub captured_at: DateTime<Utc>,
    pub source_timestamp: DateTime<Utc>,
}

/// Append one snapshot row. No dedup by design; each sync cycle records
/// what it observed, and "current" is resolved at read time.
pub async fn insert_inventory_snapshot(
    ex: impl PgExecutor<'_>,
    s: &NewInventorySnapshot,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into inventory_snapshots (
          snapshot_id, connector_id, supplier_sku, qty_available,
          captured_at, source_timestamp, raw_payload_ref
        ) values ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(s.snapshot_id)
    .bind(s.connector_id)
    .bind(&s.supplier_sku)
    .bind(s.qty_available)
    .bind(s.captured_at)
    .bind(s.source_timestamp)
    .bind(&s.raw_payload_ref)
    .execute(ex)
    .await
    .context("insert_inventory_snapshot failed")?;
    Ok(())
}

/// Most recent observation by source timestamp for a (connector, SKU).
pub async fn latest_inventory(
    ex: impl PgExecutor<'_>,
    connector_id: Uuid,
    supplier_sku: &str,
) -> Result<Option<InventoryRow>> {
    let row = sqlx::query(
        r#"
        select snapshot_id, connector_id, supplier_sku, qty_available,
               captured_at, source_timestamp
        from inventory_snapshots
        where connector_id = $1 and supplier_sku = $2
        order by source_timestamp desc
        limit 1
        "#,
    )
    .bind(connector_id)
    .bind(supplier_sku)
    .fetch_optional(ex)
    .await
    .context("latest_inventory failed")?;

    row.map(|r| {
        Ok(InventoryRow {
            snapshot_id: r.try_get("snapshot_id")?,
            connector_id: r.try_get("connector_id")?,
            supplier_sku: r.try_get("supplier_sku")?,
            qty_available: r.try_get("qty_available")?,
            captured_at: r.try_get("captured_at")?,
            source_timestamp: r.try_get("source_timestamp")?,
        })
    })
    .transpose()
}

// ---------------------------------------------------------------------------
// Order lines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct OrderLineUpsert {
    pub order_line_id: Uuid,
    pub tenant_id: String,
    pub connector_id: Uuid,
    pub project_id: Option<String>,
    pub supplier_order_id: String,
    pub supplier_sku: String,
    pub material_name: String,
    pub qty_ordered: f64,
    pub qty_delivered: f64,
    pub eta_date: Option<NaiveDate>,
    pub impact_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub historical_late_rate: Option<f64>,
    pub eta_volatility_days: Option<f64>,
    pub lead_time_trend_days: Option<f64>,
    pub source_timestamp: DateTime<Utc>,
    pub source_hash: String,
    pub last_synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OrderLineRow {
    pub order_line_id: Uuid,
    pub tenant_id: String,
    pub connector_id: Uuid,
    pub project_id: Option<String>,
    pub supplier_order_id: String,
    pub supplier_sku: String,
    pub material_name: String,
    pub qty_ordered: f64,
    pub qty_delivered: f64,
    pub eta_date: Option<NaiveDate>,
    pub impact_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub historical_late_rate: Option<f64>,
    pub eta_volatility_days: Option<f64>,
    pub lead_time_trend_days: Option<f64>,
    pub source_timestamp: DateTime<Utc>,
    pub source_hash: String,
    pub last_synced_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn map_order_line(row: &PgRow) -> Result<OrderLineRow> {
    Ok(OrderLineRow {
        order_line_id: row.try_get("order_line_id")?,
        tenant_id: row.try_get("tenant_id")?,
        connector_id: row.try_get("connector_id")?,
        project_id: row.try_get("project_id")?,
        supplier_order_id: row.try_get("supplier_order_id")?,
        supplier_sku: row.try_get("supplier_sku")?,
        material_name: row.try_get("material_name")?,
        qty_ordered: row.try_get("qty_ordered")?,
        qty_delivered: row.try_get("qty_delivered")?,
        eta_date: row.try_get("eta_date")?,
        impact_date: row.try_get("impact_date")?,
        status: OrderStatus::parse(&row.try_get::<String, _>("status")?)?,
        historical_late_rate: row.try_get("historical_late_rate")?,
        eta_volatility_days: row.try_get("eta_volatility_days")?,
        lead_time_trend_days: row.try_get("lead_time_trend_days")?,
        source_timestamp: row.try_get("source_timestamp")?,
        source_hash: row.try_get("source_hash")?,
        last_synced_at: row.try_get("last_synced_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const ORDER_LINE_COLUMNS: &str = r#"
    order_line_id, tenant_id, connector_id, project_id, supplier_order_id,
    supplier_sku, material_name, qty_ordered, qty_delivered, eta_date,
    impact_date, status, historical_late_rate, eta_volatility_days,
    lead_time_trend_days, source_timestamp, source_hash, last_synced_at,
    created_at, updated_at
"#;

/// Point lookup by the natural key `(tenant, supplier_order_id, sku)`.
pub async fn order_line_by_natural_key(
    ex: impl PgExecutor<'_>,
    tenant_id: &str,
    supplier_order_id: &str,
    supplier_sku: &str,
) -> Result<Option<OrderLineRow>> {
    let row = sqlx::query(&format!(
        "select {ORDER_LINE_COLUMNS} from order_lines \
         where tenant_id = $1 and supplier_order_id = $2 and supplier_sku = $3"
    ))
    .bind(tenant_id)
    .bind(supplier_order_id)
    .bind(supplier_sku)
    .fetch_optional(ex)
    .await
    .context("order_line_by_natural_key failed")?;

    row.as_ref().map(map_order_line).transpose()
}

pub async fn order_line_by_id(
    ex: impl PgExecutor<'_>,
    order_line_id: Uuid,
) -> Result<Option<OrderLineRow>> {
    let row = sqlx::query(&format!(
        "select {ORDER_LINE_COLUMNS} from order_lines where order_line_id = $1"
    ))
    .bind(order_line_id)
    .fetch_optional(ex)
    .await
    .context("order_line_by_id failed")?;

    row.as_ref().map(map_order_line).transpose()
}

/// Transactional upsert keyed on the natural key; this is the idempotence
/// boundary under retry or overlapping syncs. `order_line_id` is only used
/// on insert; an existing row keeps its identity. Returns the row as
/// persisted plus whether it was inserted (`xmax = 0` is true on insert).
pub async fn upsert_order_line(
    ex: impl PgExecutor<'_>,
    u: &OrderLineUpsert,
) -> Result<(OrderLineRow, bool)> {
    let row = sqlx::query(&format!(
        r#"
        insert into order_lines (
          order_line_id, tenant_id, connector_id, project_id, supplier_order_id,
          supplier_sku, material_name, qty_ordered, qty_delivered, eta_date,
          impact_date, status, historical_late_rate, eta_volatility_days,
          lead_time_trend_days, source_timestamp, source_hash, last_synced_at
        ) values ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18)
        on conflict (tenant_id, supplier_order_id, supplier_sku) do update set
          project_id = excluded.project_id,
          material_name = excluded.material_name,
          qty_ordered = excluded.qty_ordered,
          qty_delivered = excluded.qty_delivered,
          eta_date = excluded.eta_date,
          impact_date = excluded.impact_date,
          status = excluded.status,
          historical_late_rate = excluded.historical_late_rate,
          eta_volatility_days = excluded.eta_volatility_days,
          lead_time_trend_days = excluded.lead_time_trend_days,
          source_timestamp = excluded.source_timestamp,
          source_hash = excluded.source_hash,
          last_synced_at = excluded.last_synced_at,
          updated_at = now()
        returning {ORDER_LINE_COLUMNS}, (xmax = 0) as inserted
        "#
    ))
    .bind(u.order_line_id)
    .bind(&u.tenant_id)
    .bind(u.connector_id)
    .bind(&u.project_id)
    .bind(&u.supplier_order_id)
    .bind(&u.supplier_sku)
    .bind(&u.material_name)
    .bind(u.qty_ordered)
    .bind(u.qty_delivered)
    .bind(u.eta_date)
    .bind(u.impact_date)
    .bind(u.status.as_str())
    .bind(u.historical_late_rate)
    .bind(u.eta_volatility_days)
    .bind(u.lead_time_trend_days)
    .bind(u.source_timestamp)
    .bind(&u.source_hash)
    .bind(u.last_synced_at)
    .fetch_one(ex)
    .await
    .context("upsert_order_line failed")?;

    let inserted: bool = row.try_get("inserted")?;
    Ok((map_order_line(&row)?, inserted))
}

/// Closed peer orders for the same (tenant, connector, SKU), excluding the
/// line itself. Read surface for order detail; not a scoring input.
pub async fn peer_history(
    ex: impl PgExecutor<'_>,
    tenant_id: &str,
    connector_id: Uuid,
    supplier_sku: &str,
    exclude_order_line_id: Uuid,
) -> Result<Vec<OrderLineRow>> {
    let rows = sqlx::query(&format!(
        "select {ORDER_LINE_COLUMNS} from order_lines \
         where tenant_id = $1 and connector_id = $2 and supplier_sku = $3 \
           and status in ('delivered', 'delayed') \
           and order_line_id <> $4 \
         order by updated_at desc"
    ))
    .bind(tenant_id)
    .bind(connector_id)
    .bind(supplier_sku)
    .bind(exclude_order_line_id)
    .fetch_all(ex)
    .await
    .context("peer_history failed")?;

    rows.iter().map(map_order_line).collect()
}
