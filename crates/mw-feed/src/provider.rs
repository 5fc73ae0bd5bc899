use std::fmt;

use chrono::{DateTime, Utc};
use mw_schemas::SupplierPayload;

// ---------------------------------------------------------------------------
// Fetch request
// ---------------------------------------------------------------------------

/// Parameters for one payload fetch.
///
/// `connector_id` travels as a plain string so this boundary does not
/// depend on the store's id type. `now` is supplied by the caller so
/// implementations stay deterministic and testable; the synthetic feed
/// derives every timestamp from it.
#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub supplier_name: String,
    pub connector_id: String,
    pub now: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a [`SupplierFeed`] implementation may return.
#[derive(Debug)]
pub enum FeedError {
    /// Network or transport failure.
    Transport(String),
    /// The upstream API returned an application-level error.
    Api { code: Option<i64>, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// A required configuration value (e.g. credential handle) is missing
    /// or invalid.
    Config(String),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Transport(msg) => write!(f, "transport error: {msg}"),
            FeedError::Api {
                code: Some(c),
                message,
            } => write!(f, "feed api error code={c}: {message}"),
            FeedError::Api {
                code: None,
                message,
            } => write!(f, "feed api error: {message}"),
            FeedError::Decode(msg) => write!(f, "decode error: {msg}"),
            FeedError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for FeedError {}

// ---------------------------------------------------------------------------
// Feed trait
// ---------------------------------------------------------------------------

/// Upstream supplier data contract.
///
/// Implementations must be object-safe so callers can hold a
/// `Box<dyn SupplierFeed>` without knowing the concrete type, and
/// `Send + Sync` so one instance can serve tasks across the runtime.
pub trait SupplierFeed: Send + Sync {
    /// Human-readable name identifying this feed (e.g. `"synthetic"`).
    fn name(&self) -> &'static str;

    /// Fetch the current inventory + order snapshot for one connector.
    ///
    /// Returns rows in upstream order; reconciliation owns validation and
    /// ordering guarantees downstream.
    fn fetch(&self, req: &FeedRequest) -> Result<SupplierPayload, FeedError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Minimal in-process mock that satisfies the trait for use in tests.
    struct MockFeed {
        payload: SupplierPayload,
    }

    impl SupplierFeed for MockFeed {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn fetch(&self, _req: &FeedRequest) -> Result<SupplierPayload, FeedError> {
            Ok(self.payload.clone())
        }
    }

    #[test]
    fn mock_feed_returns_configured_payload() {
        let feed: Box<dyn SupplierFeed> = Box::new(MockFeed {
            payload: SupplierPayload::empty(),
        });
        let req = FeedRequest {
            supplier_name: "MetroLumber".to_string(),
            connector_id: "c-1".to_string(),
            now: Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap(),
        };
        let payload = feed.fetch(&req).unwrap();
        assert!(payload.inventory.is_empty());
        assert!(payload.orders.is_empty());
    }

    #[test]
    fn feed_error_display_api_with_code() {
        let err = FeedError::Api {
            code: Some(429),
            message: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "feed api error code=429: rate limited");
    }

    #[test]
    fn feed_error_display_transport() {
        let err = FeedError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "transport error: connection refused");
    }

    #[test]
    fn feed_is_object_safe_via_box() {
        // Compile-time proof: trait object can be constructed.
        let _f: Box<dyn SupplierFeed> = Box::new(MockFeed {
            payload: SupplierPayload::empty(),
        });
    }
}
