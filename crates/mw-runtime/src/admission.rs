use chrono::{DateTime, Utc};
use mw_config::SyncPolicy;
use mw_db::ConnectorRow;

use crate::SyncError;

/// Coarse admission check for manual triggers: reject when the connector
/// synced within the minimum interval. This is rate limiting, not mutual
/// exclusion; overlapping jobs that slip past it are rendered harmless by
/// the transactional natural-key upsert.
pub fn ensure_admittable(
    connector: &ConnectorRow,
    now: DateTime<Utc>,
    policy: &SyncPolicy,
) -> Result<(), SyncError> {
    let Some(last) = connector.last_sync_at else {
        return Ok(());
    };
    let elapsed = (now - last).num_seconds();
    if elapsed < policy.min_manual_interval_secs {
        return Err(SyncError::RateLimited {
            retry_after_secs: policy.min_manual_interval_secs - elapsed,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use mw_schemas::ConnectorHealth;
    use uuid::Uuid;

    fn connector(last_sync_at: Option<DateTime<Utc>>) -> ConnectorRow {
        ConnectorRow {
            connector_id: Uuid::new_v4(),
            tenant_id: "t1".to_string(),
            supplier_name: "MetroLumber".to_string(),
            auth_type: "api_key".to_string(),
            secret_ref: "secret://handle".to_string(),
            health: ConnectorHealth::Active,
            poll_interval_minutes: 1440,
            last_sync_at,
            last_sync_error: None,
            stale_since: None,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn never_synced_connector_is_admittable() {
        let policy = SyncPolicy::sane_defaults();
        ensure_admittable(&connector(None), now(), &policy).unwrap();
    }

    #[test]
    fn recent_sync_is_rejected_with_remaining_wait() {
        let policy = SyncPolicy::sane_defaults();
        let c = connector(Some(now() - Duration::seconds(10)));
        match ensure_admittable(&c, now(), &policy) {
            Err(SyncError::RateLimited { retry_after_secs }) => {
                assert_eq!(retry_after_secs, 20);
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn sync_at_exactly_the_interval_is_admittable() {
        let policy = SyncPolicy::sane_defaults();
        let c = connector(Some(now() - Duration::seconds(30)));
        ensure_admittable(&c, now(), &policy).unwrap();
    }

    #[test]
    fn old_sync_is_admittable() {
        let policy = SyncPolicy::sane_defaults();
        let c = connector(Some(now() - Duration::hours(2)));
        ensure_admittable(&c, now(), &policy).unwrap();
    }
}
