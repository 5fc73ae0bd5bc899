//! Shared runtime state for mw-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum; this module owns
//! nothing async itself. No module-level database handles; the pool is
//! constructed in `main.rs` and threaded through here explicitly.

use std::sync::Arc;

use mw_config::Policies;
use mw_feed::SupplierFeed;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub policies: Policies,
    /// Payload source used by sync triggers. Pluggable so tests can inject
    /// fixed feeds; the deployment default is the synthetic feed.
    pub feed: Arc<dyn SupplierFeed>,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(pool: PgPool, policies: Policies, feed: Arc<dyn SupplierFeed>) -> Self {
        Self {
            pool,
            policies,
            feed,
            build: BuildInfo {
                service: "mw-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}
