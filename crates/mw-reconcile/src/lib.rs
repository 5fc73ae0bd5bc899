//! mw-reconcile
//!
//! Reconciliation logic for supplier payloads.
//!
//! Architectural decisions:
//! - Validation is fatal per attempt, not per-record-skippable: one
//!   malformed or future-dated record fails the whole sync attempt
//! - Change detection via a stable content hash over the canonicalized
//!   source record (sorted keys)
//! - Unchanged records (same hash AND same source timestamp) skip the
//!   write but still join the affected set; risk is re-derived every
//!   cycle because inventory and staleness may have shifted
//! - Deterministic, pure logic. No IO. The store half lives in `mw-db`.

mod engine;
mod types;

pub use engine::{
    content_hash, derive_status, upsert_verdict, validate_inventory_record, validate_order_record,
    validate_payload, MAX_FUTURE_SKEW_HOURS,
};
pub use types::*;
