use std::fmt;

// ---------------------------------------------------------------------------
// SyncError
// ---------------------------------------------------------------------------

/// Caller-facing failure taxonomy for a sync invocation.
#[derive(Debug)]
pub enum SyncError {
    /// Admission rejection: a manual trigger arrived inside the minimum
    /// interval. Never produced by the attempt loop itself.
    RateLimited { retry_after_secs: i64 },
    /// The referenced connector or job vanished. Immediately fatal; no
    /// retry can make a missing row reappear.
    Lookup(String),
    /// All attempts exhausted. Carries the last attempt's error verbatim;
    /// the same text recorded on the sync_runs row.
    Failed { last_error: String, attempts: u32 },
    /// The store itself failed outside an attempt scope (e.g. the run row
    /// could not be created). Nothing was partially applied.
    Store(anyhow::Error),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::RateLimited { retry_after_secs } => {
                write!(f, "sync rate-limited; retry in {retry_after_secs}s")
            }
            SyncError::Lookup(what) => write!(f, "lookup failed: {what}"),
            SyncError::Failed {
                last_error,
                attempts,
            } => {
                write!(f, "sync failed after {attempts} attempt(s): {last_error}")
            }
            SyncError::Store(err) => write!(f, "store error: {err}"),
        }
    }
}

impl std::error::Error for SyncError {}

// ---------------------------------------------------------------------------
// ReconcileError
// ---------------------------------------------------------------------------

/// Failure of one reconciliation pass.
#[derive(Debug)]
pub enum ReconcileError {
    /// A malformed or future-dated source record. Fatal for the whole
    /// attempt; no per-record skip.
    Validation(mw_reconcile::ValidationError),
    /// The store rejected a read or write.
    Store(anyhow::Error),
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::Validation(e) => write!(f, "validation error: {e}"),
            ReconcileError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for ReconcileError {}

impl From<anyhow::Error> for ReconcileError {
    fn from(e: anyhow::Error) -> Self {
        ReconcileError::Store(e)
    }
}

// ---------------------------------------------------------------------------
// AttemptError (internal)
// ---------------------------------------------------------------------------

/// What one attempt died of. Validation and transient failures retry the
/// same way (whole attempt, fresh payload); the split exists so the error
/// text names the class.
#[derive(Debug)]
pub(crate) enum AttemptError {
    Validation(mw_reconcile::ValidationError),
    Transient(anyhow::Error),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Validation(e) => write!(f, "validation error: {e}"),
            AttemptError::Transient(e) => write!(f, "{e}"),
        }
    }
}

impl From<anyhow::Error> for AttemptError {
    fn from(e: anyhow::Error) -> Self {
        AttemptError::Transient(e)
    }
}

impl From<ReconcileError> for AttemptError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::Validation(v) => AttemptError::Validation(v),
            ReconcileError::Store(s) => AttemptError::Transient(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_display_names_the_wait() {
        let e = SyncError::RateLimited {
            retry_after_secs: 17,
        };
        assert_eq!(e.to_string(), "sync rate-limited; retry in 17s");
    }

    #[test]
    fn failed_display_carries_attempts_and_error() {
        let e = SyncError::Failed {
            last_error: "feed api error: boom".to_string(),
            attempts: 3,
        };
        assert_eq!(
            e.to_string(),
            "sync failed after 3 attempt(s): feed api error: boom"
        );
    }
}
