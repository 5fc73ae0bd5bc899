use std::fmt;

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// A source record failed validation. Fatal for the whole sync attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required string field was empty.
    EmptyField {
        record_kind: &'static str,
        field: &'static str,
    },
    /// A quantity was NaN, infinite, or negative where it must not be.
    BadQuantity {
        record_kind: &'static str,
        field: &'static str,
        value: String,
    },
    /// A source timestamp claims to be further in the future than the
    /// allowed clock skew.
    FutureTimestamp {
        record_kind: &'static str,
        source_timestamp: DateTime<Utc>,
        limit: DateTime<Utc>,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField { record_kind, field } => {
                write!(f, "{record_kind} record missing required field: {field}")
            }
            ValidationError::BadQuantity {
                record_kind,
                field,
                value,
            } => {
                write!(f, "{record_kind} record has invalid {field}: {value}")
            }
            ValidationError::FutureTimestamp {
                record_kind,
                source_timestamp,
                limit,
            } => {
                write!(
                    f,
                    "{record_kind} record source_timestamp {source_timestamp} is beyond the \
                     future-skew limit {limit}"
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// UpsertVerdict
// ---------------------------------------------------------------------------

/// What the store should do with an incoming order record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertVerdict {
    /// No row exists under the natural key.
    Insert,
    /// A row exists and the source content changed.
    Update,
    /// Same content hash and same source timestamp: idempotent no-op.
    /// The line still joins the affected set for re-scoring.
    Unchanged,
}

impl UpsertVerdict {
    /// Whether the verdict requires a write.
    pub fn writes(&self) -> bool {
        !matches!(self, UpsertVerdict::Unchanged)
    }
}
