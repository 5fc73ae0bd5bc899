//! mw-runtime
//!
//! Sync job runner.
//!
//! Architectural decisions:
//! - One job per invocation, run as a single blocking unit of work; no
//!   internal parallelism
//! - Every attempt's writes happen in one transaction; a failure rolls the
//!   attempt back before it is recorded, so a retry starts from clean state
//! - Bounded attempts with exponential backoff; each retry re-fetches the
//!   payload from the top (no mid-attempt resumption)
//! - Terminal failure marks the job failed AND the connector degraded;
//!   surfaced, never swallowed
//! - Admission control is a coarse minimum-interval check, not a lock; the
//!   natural-key upsert in the store is the true idempotence boundary

mod admission;
mod attempt;
mod error;
mod runner;

pub use admission::ensure_admittable;
pub use attempt::reconcile;
pub use error::{ReconcileError, SyncError};
pub use runner::{backoff_delay_secs, run_sync};
