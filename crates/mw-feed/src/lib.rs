//! mw-feed
//!
//! Supplier payload source boundary.
//!
//! This crate defines **only** the feed trait, its error type, and the
//! deterministic synthetic feed used by the reference deployment. No DB
//! logic, no validation (that is the reconciliation boundary), no scoring.
//!
//! A real integration would call a supplier API here; the synthetic feed
//! derives its stream from `(supplier, connector, day)` so the same
//! connector produces the identical payload all day; which is what makes
//! retried attempts and repeated manual syncs reconcile idempotently.

mod provider;
mod synthetic;

pub use provider::{FeedError, FeedRequest, SupplierFeed};
pub use synthetic::{supplier_supported, SyntheticFeed, SUPPORTED_SUPPLIERS};
