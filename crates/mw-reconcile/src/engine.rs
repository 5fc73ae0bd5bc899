use chrono::{DateTime, Duration, Utc};
use mw_schemas::{InventoryRecord, OrderRecord, OrderStatus, SupplierPayload};
use sha2::{Digest, Sha256};

use crate::{UpsertVerdict, ValidationError};

/// Source timestamps may run ahead of our clock by at most this much.
/// Anything further out is a malformed feed, not clock skew.
pub const MAX_FUTURE_SKEW_HOURS: i64 = 24;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn check_future(
    record_kind: &'static str,
    source_timestamp: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    let limit = now + Duration::hours(MAX_FUTURE_SKEW_HOURS);
    if source_timestamp > limit {
        return Err(ValidationError::FutureTimestamp {
            record_kind,
            source_timestamp,
            limit,
        });
    }
    Ok(())
}

fn check_qty(
    record_kind: &'static str,
    field: &'static str,
    value: f64,
    require_positive: bool,
) -> Result<(), ValidationError> {
    let bad = !value.is_finite() || value < 0.0 || (require_positive && value <= 0.0);
    if bad {
        return Err(ValidationError::BadQuantity {
            record_kind,
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn check_non_empty(
    record_kind: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { record_kind, field });
    }
    Ok(())
}

pub fn validate_inventory_record(
    record: &InventoryRecord,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    check_non_empty("inventory", "supplier_sku", &record.supplier_sku)?;
    check_qty("inventory", "qty_available", record.qty_available, false)?;
    check_future("inventory", record.source_timestamp, now)?;
    Ok(())
}

pub fn validate_order_record(
    record: &OrderRecord,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    check_non_empty("order", "supplier_order_id", &record.supplier_order_id)?;
    check_non_empty("order", "supplier_sku", &record.supplier_sku)?;
    check_qty("order", "qty_ordered", record.qty_ordered, true)?;
    check_qty("order", "qty_delivered", record.qty_delivered, false)?;
    check_future("order", record.source_timestamp, now)?;
    Ok(())
}

/// Validate every record in the payload. First failure wins; the whole
/// attempt fails; there is no per-record skip path.
pub fn validate_payload(payload: &SupplierPayload, now: DateTime<Utc>) -> Result<(), ValidationError> {
    for record in &payload.inventory {
        validate_inventory_record(record, now)?;
    }
    for record in &payload.orders {
        validate_order_record(record, now)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Content hash
// ---------------------------------------------------------------------------

/// Stable sha256 hex over the canonicalized source record.
///
/// serde_json's map type is a BTreeMap in this workspace, so serializing
/// the record's JSON value yields sorted keys; the same record always
/// hashes identically regardless of how the feed ordered its fields.
pub fn content_hash(record: &OrderRecord) -> String {
    // Serialization of a closed struct cannot fail; fall back to an empty
    // object is unreachable but keeps this function total.
    let value = serde_json::to_value(record).unwrap_or_else(|_| serde_json::json!({}));
    let canonical = value.to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Change detection
// ---------------------------------------------------------------------------

/// Decide what the store must do for an incoming order record, given the
/// persisted row's (content hash, source timestamp) if one exists.
pub fn upsert_verdict(
    existing: Option<(&str, DateTime<Utc>)>,
    incoming_hash: &str,
    incoming_source_timestamp: DateTime<Utc>,
) -> UpsertVerdict {
    match existing {
        None => UpsertVerdict::Insert,
        Some((hash, source_timestamp)) => {
            if hash == incoming_hash && source_timestamp == incoming_source_timestamp {
                UpsertVerdict::Unchanged
            } else {
                UpsertVerdict::Update
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Status defaulting
// ---------------------------------------------------------------------------

/// Lifecycle status for an upserted line. An explicit source status wins;
/// otherwise it is derived from the delivered balance.
pub fn derive_status(record: &OrderRecord) -> OrderStatus {
    if let Some(status) = record.status {
        return status;
    }
    if record.qty_delivered >= record.qty_ordered {
        OrderStatus::Delivered
    } else if record.qty_delivered > 0.0 {
        OrderStatus::PartiallyDelivered
    } else {
        OrderStatus::Open
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn order_record() -> OrderRecord {
        OrderRecord {
            supplier_order_id: "ML-SO-1".to_string(),
            supplier_sku: "LBR_2X4_8".to_string(),
            material_name: "Stud Lumber 2x4x8".to_string(),
            project_id: Some("P-1001".to_string()),
            qty_ordered: 150.0,
            qty_delivered: 30.0,
            eta_date: Some(now().date_naive()),
            impact_date: None,
            status: None,
            historical_late_rate: Some(0.2),
            eta_volatility_days: Some(1.5),
            lead_time_trend_days: Some(0.0),
            source_timestamp: now() - Duration::hours(2),
        }
    }

    fn inventory_record() -> InventoryRecord {
        InventoryRecord {
            supplier_sku: "LBR_2X4_8".to_string(),
            qty_available: 120.0,
            source_timestamp: now() - Duration::hours(2),
        }
    }

    #[test]
    fn valid_payload_passes() {
        let payload = SupplierPayload {
            inventory: vec![inventory_record()],
            orders: vec![order_record()],
        };
        validate_payload(&payload, now()).unwrap();
    }

    #[test]
    fn empty_sku_is_rejected() {
        let mut record = inventory_record();
        record.supplier_sku = "  ".to_string();
        let err = validate_inventory_record(&record, now()).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyField { field: "supplier_sku", .. }));
    }

    #[test]
    fn far_future_timestamp_is_rejected() {
        let mut record = order_record();
        record.source_timestamp = now() + Duration::hours(25);
        let err = validate_order_record(&record, now()).unwrap_err();
        assert!(matches!(err, ValidationError::FutureTimestamp { .. }));
    }

    #[test]
    fn timestamp_just_inside_skew_is_accepted() {
        let mut record = order_record();
        record.source_timestamp = now() + Duration::hours(23);
        validate_order_record(&record, now()).unwrap();
    }

    #[test]
    fn nan_quantity_is_rejected() {
        let mut record = order_record();
        record.qty_delivered = f64::NAN;
        assert!(validate_order_record(&record, now()).is_err());
    }

    #[test]
    fn zero_qty_ordered_is_rejected() {
        let mut record = order_record();
        record.qty_ordered = 0.0;
        assert!(validate_order_record(&record, now()).is_err());
    }

    #[test]
    fn one_bad_record_fails_the_whole_payload() {
        let mut bad = order_record();
        bad.supplier_order_id = String::new();
        let payload = SupplierPayload {
            inventory: vec![inventory_record()],
            orders: vec![order_record(), bad],
        };
        assert!(validate_payload(&payload, now()).is_err());
    }

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(content_hash(&order_record()), content_hash(&order_record()));
    }

    #[test]
    fn content_hash_changes_with_any_field() {
        let mut changed = order_record();
        changed.qty_delivered = 31.0;
        assert_ne!(content_hash(&order_record()), content_hash(&changed));
    }

    #[test]
    fn verdicts_cover_insert_update_unchanged() {
        let record = order_record();
        let hash = content_hash(&record);

        assert_eq!(
            upsert_verdict(None, &hash, record.source_timestamp),
            UpsertVerdict::Insert
        );
        assert_eq!(
            upsert_verdict(
                Some((hash.as_str(), record.source_timestamp)),
                &hash,
                record.source_timestamp
            ),
            UpsertVerdict::Unchanged
        );
        // Same content re-sent with a newer source timestamp is an update,
        // not a no-op: the row's freshness fields must advance.
        assert_eq!(
            upsert_verdict(
                Some((hash.as_str(), record.source_timestamp)),
                &hash,
                record.source_timestamp + Duration::hours(1)
            ),
            UpsertVerdict::Update
        );
        assert_eq!(
            upsert_verdict(
                Some(("someotherhash", record.source_timestamp)),
                &hash,
                record.source_timestamp
            ),
            UpsertVerdict::Update
        );
    }

    #[test]
    fn unchanged_verdict_does_not_write() {
        assert!(!UpsertVerdict::Unchanged.writes());
        assert!(UpsertVerdict::Insert.writes());
        assert!(UpsertVerdict::Update.writes());
    }

    #[test]
    fn status_derivation_from_quantities() {
        let mut record = order_record();
        record.status = None;

        record.qty_delivered = 0.0;
        assert_eq!(derive_status(&record), OrderStatus::Open);

        record.qty_delivered = 30.0;
        assert_eq!(derive_status(&record), OrderStatus::PartiallyDelivered);

        record.qty_delivered = 150.0;
        assert_eq!(derive_status(&record), OrderStatus::Delivered);

        record.qty_delivered = 200.0;
        assert_eq!(derive_status(&record), OrderStatus::Delivered);
    }

    #[test]
    fn explicit_status_wins_over_derivation() {
        let mut record = order_record();
        record.status = Some(OrderStatus::Delayed);
        record.qty_delivered = 150.0;
        assert_eq!(derive_status(&record), OrderStatus::Delayed);
    }
}
