//! An order line that is short on stock, past its ETA, backed by a stale
//! inventory observation, and sourced from a chronically late supplier must
//! come out red with the full set of explanatory codes.

use chrono::{Duration, TimeZone, Utc};
use mw_config::RiskPolicy;
use mw_risk::{score, ReasonCode, ScoreInput};
use mw_schemas::RiskTier;

#[test]
fn overdue_stale_low_stock_line_scores_red() {
    let now = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
    let input = ScoreInput {
        qty_ordered: 120.0,
        qty_delivered: 10.0,
        qty_available: Some(5.0),
        eta_date: Some(now.date_naive() - Duration::days(1)),
        impact_date: Some(now.date_naive() + Duration::days(2)),
        historical_late_rate: Some(0.7),
        eta_volatility_days: None,
        lead_time_trend_days: None,
        inventory_source_timestamp: Some(now - Duration::hours(72)),
    };

    let a = score(&RiskPolicy::sane_defaults(), &input, now);

    assert_eq!(a.tier, RiskTier::Red);
    assert!(a.score >= 0.70, "expected red-range score, got {}", a.score);
    assert!(a.stale_data);
    assert!(a.high_priority);

    for code in [
        ReasonCode::LowStock,
        ReasonCode::EtaPassed,
        ReasonCode::StaleData,
    ] {
        assert!(
            a.reason_codes.contains(&code),
            "missing {:?} in {:?}",
            code,
            a.reason_codes
        );
    }

    // The first recommended action is the overdue-ETA contingency; the alert
    // message embeds it, so the ordering is load-bearing.
    assert_eq!(
        a.recommended_actions[0].title,
        "Trigger contingency procurement"
    );
}
