use chrono::{DateTime, Duration, Utc};
use mw_config::RiskPolicy;
use mw_schemas::RiskTier;

use crate::{actions_for, Assessment, ReasonCode, ScoreInput};
use crate::{
    CONFIDENCE_BASE, CONFIDENCE_CEILING, CONFIDENCE_CLEAN_BONUS, CONFIDENCE_FLOOR,
    CONFIDENCE_FULLY_DELIVERED, CONFIDENCE_MISSING_HISTORY_PENALTY, CONFIDENCE_STALE_PENALTY,
    DELAY_PIVOT, DELAY_SCALE_DAYS, ETA_PASSED_PENALTY, ETA_VOLATILITY_THRESHOLD, GREEN_THRESHOLD,
    HIGH_LATE_RATE_THRESHOLD, LEAD_DRIFT_THRESHOLD, LEAD_TREND_WINDOW_DAYS, NEUTRAL_LATE_RATE,
    NEUTRAL_VOLATILITY, RED_THRESHOLD, SCORE_CEILING, STALE_PENALTY, STALE_YELLOW_FLOOR,
    VOLATILITY_WINDOW_DAYS,
};

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Map a final score to its tier. Boundaries are exact:
/// `< 0.35` green, `[0.35, 0.70)` yellow, `>= 0.70` red.
pub fn tier_for_score(score: f64) -> RiskTier {
    if score < GREEN_THRESHOLD {
        RiskTier::Green
    } else if score < RED_THRESHOLD {
        RiskTier::Yellow
    } else {
        RiskTier::Red
    }
}

fn push_code_once(codes: &mut Vec<ReasonCode>, c: ReasonCode) {
    if !codes.contains(&c) {
        codes.push(c);
    }
}

/// Score one order line.
///
/// Pure and total: every input combination yields an [`Assessment`].
/// Deterministic given identical inputs and `now`.
pub fn score(policy: &RiskPolicy, input: &ScoreInput, now: DateTime<Utc>) -> Assessment {
    let remaining = (input.qty_ordered - input.qty_delivered).max(0.0);

    // Fully delivered: nothing left to be late. Short-circuit to the
    // sentinel before any component math.
    if remaining <= 0.0 {
        let reason_codes = vec![ReasonCode::FullyDelivered];
        let recommended_actions = actions_for(&reason_codes);
        return Assessment {
            score: 0.0,
            tier: RiskTier::Green,
            confidence: CONFIDENCE_FULLY_DELIVERED,
            reason_codes,
            estimated_delay_days: 0,
            stale_data: false,
            high_priority: false,
            recommended_actions,
        };
    }

    let mut codes: Vec<ReasonCode> = Vec::new();

    // 1) Inventory coverage. A missed lookup means zero known stock.
    let qty_available = input.qty_available.unwrap_or(0.0);
    let coverage = qty_available / remaining;
    let stock = clamp(1.0 - coverage, 0.0, 1.0);
    if stock > policy.low_stock_threshold {
        push_code_once(&mut codes, ReasonCode::LowStock);
    }

    // 2) Historical late rate; neutral default when the supplier reports
    //    no history.
    let missing_history = input.historical_late_rate.is_none();
    let late_rate = clamp(
        input.historical_late_rate.unwrap_or(NEUTRAL_LATE_RATE),
        0.0,
        1.0,
    );
    if late_rate >= HIGH_LATE_RATE_THRESHOLD {
        push_code_once(&mut codes, ReasonCode::HighLateRate);
    }

    // 3) ETA volatility, normalized days-over-window.
    let volatility = match input.eta_volatility_days {
        Some(days) => clamp(days.max(0.0) / VOLATILITY_WINDOW_DAYS, 0.0, 1.0),
        None => NEUTRAL_VOLATILITY,
    };
    if volatility >= ETA_VOLATILITY_THRESHOLD {
        push_code_once(&mut codes, ReasonCode::EtaVolatility);
    }

    // 4) Lead-time drift, only upward drift counts.
    let lead_trend = match input.lead_time_trend_days {
        Some(days) => clamp(days.max(0.0) / LEAD_TREND_WINDOW_DAYS, 0.0, 1.0),
        None => 0.0,
    };
    if lead_trend >= LEAD_DRIFT_THRESHOLD {
        push_code_once(&mut codes, ReasonCode::LeadTimeDrift);
    }

    let mut score = policy.weight_stock * stock
        + policy.weight_late_rate * late_rate
        + policy.weight_volatility * volatility
        + policy.weight_lead_trend * lead_trend;

    // Deadline pressure: an ETA strictly in the past is a flat penalty.
    let today = now.date_naive();
    if let Some(eta) = input.eta_date {
        if eta < today {
            score += ETA_PASSED_PENALTY;
            push_code_once(&mut codes, ReasonCode::EtaPassed);
        }
    }

    // Staleness: old inventory, or no inventory observation at all.
    let stale_data = match input.inventory_source_timestamp {
        Some(ts) => {
            let age_hours = (now - ts).num_seconds() as f64 / 3600.0;
            age_hours > policy.stale_threshold_hours as f64
        }
        None => true,
    };
    if stale_data {
        score += STALE_PENALTY;
        push_code_once(&mut codes, ReasonCode::StaleData);
    }

    if missing_history {
        push_code_once(&mut codes, ReasonCode::NoHistory);
    }
    if input.qty_delivered > 0.0 {
        push_code_once(&mut codes, ReasonCode::PartialDelivery);
    }

    score = clamp(score, 0.0, SCORE_CEILING);
    let mut tier = tier_for_score(score);

    // Stale data must never present as fully healthy.
    if stale_data && tier == RiskTier::Green {
        score = score.max(STALE_YELLOW_FLOOR);
        tier = RiskTier::Yellow;
    }

    let clean = codes.is_empty();
    if clean {
        codes.push(ReasonCode::HeuristicBaseline);
    }

    let mut confidence = CONFIDENCE_BASE;
    if missing_history {
        confidence -= CONFIDENCE_MISSING_HISTORY_PENALTY;
    }
    if stale_data {
        confidence -= CONFIDENCE_STALE_PENALTY;
    }
    if clean {
        confidence += CONFIDENCE_CLEAN_BONUS;
    }
    confidence = clamp(confidence, CONFIDENCE_FLOOR, CONFIDENCE_CEILING);

    let estimated_delay_days = ((score - DELAY_PIVOT).max(0.0) * DELAY_SCALE_DAYS).round() as i64;

    let high_priority = tier == RiskTier::Red
        && input
            .impact_date
            .or(input.eta_date)
            .map(|d| d <= today + Duration::days(policy.high_priority_impact_days))
            .unwrap_or(false);

    // Deterministic output: dedup happened on insert, sort by code string.
    codes.sort_by_key(|c| c.code());
    let recommended_actions = actions_for(&codes);

    Assessment {
        score,
        tier,
        confidence,
        reason_codes: codes,
        estimated_delay_days,
        stale_data,
        high_priority,
        recommended_actions,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy() -> RiskPolicy {
        RiskPolicy::sane_defaults()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn healthy_input() -> ScoreInput {
        ScoreInput {
            qty_ordered: 100.0,
            qty_delivered: 0.0,
            qty_available: Some(500.0),
            eta_date: Some(now().date_naive() + Duration::days(10)),
            impact_date: None,
            historical_late_rate: Some(0.0),
            eta_volatility_days: Some(0.0),
            lead_time_trend_days: Some(0.0),
            inventory_source_timestamp: Some(now() - Duration::hours(2)),
        }
    }

    #[test]
    fn tier_boundaries_are_exact() {
        assert_eq!(tier_for_score(0.349), RiskTier::Green);
        assert_eq!(tier_for_score(0.35), RiskTier::Yellow);
        assert_eq!(tier_for_score(0.699), RiskTier::Yellow);
        assert_eq!(tier_for_score(0.70), RiskTier::Red);
    }

    #[test]
    fn fully_delivered_short_circuits() {
        let mut input = healthy_input();
        input.qty_delivered = 100.0;
        // Even hostile signals must not matter once the line is delivered.
        input.qty_available = Some(0.0);
        input.historical_late_rate = Some(1.0);
        input.inventory_source_timestamp = None;

        let a = score(&policy(), &input, now());
        assert_eq!(a.score, 0.0);
        assert_eq!(a.tier, RiskTier::Green);
        assert_eq!(a.confidence, 0.99);
        assert_eq!(a.reason_codes, vec![ReasonCode::FullyDelivered]);
        assert_eq!(a.estimated_delay_days, 0);
        assert!(!a.stale_data);
    }

    #[test]
    fn over_delivered_also_hits_sentinel() {
        let mut input = healthy_input();
        input.qty_delivered = 120.0;
        let a = score(&policy(), &input, now());
        assert_eq!(a.reason_codes, vec![ReasonCode::FullyDelivered]);
    }

    #[test]
    fn healthy_line_is_green_with_baseline_code() {
        let a = score(&policy(), &healthy_input(), now());
        assert_eq!(a.tier, RiskTier::Green);
        assert_eq!(a.reason_codes, vec![ReasonCode::HeuristicBaseline]);
        // clean bonus: 0.9 + 0.05 = 0.95 at the ceiling
        assert!((a.confidence - 0.95).abs() < 1e-12);
    }

    #[test]
    fn missing_inventory_counts_as_stale_and_floors_to_yellow() {
        let mut input = healthy_input();
        input.qty_available = None;
        input.inventory_source_timestamp = None;
        let a = score(&policy(), &input, now());
        assert!(a.stale_data);
        assert_ne!(a.tier, RiskTier::Green);
        assert!(a.reason_codes.contains(&ReasonCode::StaleData));
    }

    #[test]
    fn stale_green_is_forced_to_yellow_floor() {
        let mut input = healthy_input();
        // Plenty of stock but a 72h-old observation: base score stays green,
        // the floor must lift it.
        input.inventory_source_timestamp = Some(now() - Duration::hours(72));
        let a = score(&policy(), &input, now());
        assert_eq!(a.tier, RiskTier::Yellow);
        assert!(a.score >= STALE_YELLOW_FLOOR);
        assert!(a.reason_codes.contains(&ReasonCode::StaleData));
    }

    #[test]
    fn missing_history_uses_neutral_default_and_costs_confidence() {
        let mut input = healthy_input();
        input.historical_late_rate = None;
        let a = score(&policy(), &input, now());
        assert!(a.reason_codes.contains(&ReasonCode::NoHistory));
        // neutral 0.5 late rate trips HIGH_LATE_RATE at the 0.45 threshold
        assert!(a.reason_codes.contains(&ReasonCode::HighLateRate));
        assert!((a.confidence - 0.7).abs() < 1e-12);
    }

    #[test]
    fn eta_passed_adds_penalty_and_code() {
        let mut input = healthy_input();
        input.eta_date = Some(now().date_naive() - Duration::days(1));
        let a = score(&policy(), &input, now());
        assert!(a.reason_codes.contains(&ReasonCode::EtaPassed));
        assert!(a.score >= ETA_PASSED_PENALTY);
    }

    #[test]
    fn eta_today_is_not_passed() {
        let mut input = healthy_input();
        input.eta_date = Some(now().date_naive());
        let a = score(&policy(), &input, now());
        assert!(!a.reason_codes.contains(&ReasonCode::EtaPassed));
    }

    #[test]
    fn partial_delivery_with_balance_adds_code() {
        let mut input = healthy_input();
        input.qty_delivered = 40.0;
        let a = score(&policy(), &input, now());
        assert!(a.reason_codes.contains(&ReasonCode::PartialDelivery));
    }

    #[test]
    fn score_never_reaches_one() {
        let input = ScoreInput {
            qty_ordered: 1000.0,
            qty_delivered: 1.0,
            qty_available: Some(0.0),
            eta_date: Some(now().date_naive() - Duration::days(30)),
            impact_date: Some(now().date_naive()),
            historical_late_rate: Some(1.0),
            eta_volatility_days: Some(100.0),
            lead_time_trend_days: Some(100.0),
            inventory_source_timestamp: None,
        };
        let a = score(&policy(), &input, now());
        assert!(a.score <= SCORE_CEILING);
        assert_eq!(a.tier, RiskTier::Red);
    }

    #[test]
    fn reason_codes_are_sorted_and_unique() {
        let mut input = healthy_input();
        input.qty_available = Some(0.0);
        input.qty_delivered = 10.0;
        input.eta_date = Some(now().date_naive() - Duration::days(2));
        input.inventory_source_timestamp = Some(now() - Duration::hours(80));
        let a = score(&policy(), &input, now());

        let strings = a.reason_code_strings();
        let mut sorted = strings.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(strings, sorted);
    }

    #[test]
    fn high_priority_requires_red_and_near_impact() {
        let mut input = healthy_input();
        input.qty_available = Some(0.0);
        input.historical_late_rate = Some(1.0);
        input.eta_date = Some(now().date_naive() - Duration::days(1));
        input.impact_date = Some(now().date_naive() + Duration::days(3));
        let a = score(&policy(), &input, now());
        assert_eq!(a.tier, RiskTier::Red);
        assert!(a.high_priority);

        input.impact_date = Some(now().date_naive() + Duration::days(30));
        input.eta_date = Some(now().date_naive() + Duration::days(30));
        let b = score(&policy(), &input, now());
        assert!(!b.high_priority);
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let input = healthy_input();
        let a = score(&policy(), &input, now());
        let b = score(&policy(), &input, now());
        assert_eq!(a, b);
    }

    #[test]
    fn delay_estimate_grows_with_score() {
        let mut risky = healthy_input();
        risky.qty_available = Some(0.0);
        risky.historical_late_rate = Some(1.0);
        let high = score(&policy(), &risky, now());
        let low = score(&policy(), &healthy_input(), now());
        assert!(high.estimated_delay_days > low.estimated_delay_days);
        assert!(low.estimated_delay_days >= 0);
    }
}
