use mw_risk::Assessment;
use mw_schemas::{AlertSeverity, RiskTier};

use crate::{AlertContext, NewAlert};

// ---------------------------------------------------------------------------
// Trigger rule
// ---------------------------------------------------------------------------

/// Decide whether a `previous → current` tier transition is alert-eligible.
///
/// - green current: never
/// - no previous assessment: always (first sighting of elevated risk)
/// - same tier repeated: only red, and only while high-priority (urgent
///   unresolved risk keeps escalating)
/// - otherwise: only escalations (`rank(current) >= rank(previous)`)
pub fn should_trigger(
    previous: Option<RiskTier>,
    current: RiskTier,
    high_priority: bool,
) -> bool {
    if current == RiskTier::Green {
        return false;
    }
    match previous {
        None => true,
        Some(prev) if prev == current => current == RiskTier::Red && high_priority,
        Some(prev) => current.rank() >= prev.rank(),
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Severity for an alert-eligible tier. Total over
/// {yellow, red} × {urgent, not-urgent}: red+urgent ⇒ high, red ⇒ medium,
/// yellow ⇒ low.
pub fn severity_for(tier: RiskTier, high_priority: bool) -> AlertSeverity {
    match tier {
        RiskTier::Red if high_priority => AlertSeverity::High,
        RiskTier::Red => AlertSeverity::Medium,
        _ => AlertSeverity::Low,
    }
}

/// The severity this transition would alert at, or `None` when no alert is
/// warranted. The caller checks the cooldown for the returned severity
/// before building the alert; the cooldown query is scoped per
/// (tenant, order line, severity), never global.
pub fn proposed_severity(previous: Option<RiskTier>, assessment: &Assessment) -> Option<AlertSeverity> {
    if !should_trigger(previous, assessment.tier, assessment.high_priority) {
        return None;
    }
    Some(severity_for(assessment.tier, assessment.high_priority))
}

// ---------------------------------------------------------------------------
// Message composition
// ---------------------------------------------------------------------------

/// Deterministic alert text: material, order id, tier, score, top reason
/// codes, first recommended action, impact date.
pub fn compose_message(ctx: &AlertContext, assessment: &Assessment) -> String {
    let reasons = assessment
        .reason_codes
        .iter()
        .take(3)
        .map(|c| c.code())
        .collect::<Vec<_>>()
        .join(", ");

    let next_step = assessment
        .recommended_actions
        .first()
        .map(|a| a.action.as_str())
        .unwrap_or("Review this line with procurement.");

    let impact = ctx
        .impact_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        "{material} ({order}): risk is {tier} ({score:.2}) due to {reasons}. \
         Next step: {next_step} Impact date: {impact}.",
        material = ctx.material_name,
        order = ctx.supplier_order_id,
        tier = assessment.tier.as_str().to_uppercase(),
        score = assessment.score,
        reasons = reasons,
        next_step = next_step,
        impact = impact,
    )
}

/// Build the alert row for a transition that passed the trigger rule and
/// the cooldown check.
pub fn build_alert(
    ctx: &AlertContext,
    assessment: &Assessment,
    severity: AlertSeverity,
) -> NewAlert {
    NewAlert {
        severity,
        message: compose_message(ctx, assessment),
        recommendations: assessment.recommended_actions.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use mw_config::RiskPolicy;
    use mw_risk::{score, ScoreInput};

    fn assessment_with_tier(target: RiskTier) -> Assessment {
        // Drive the real engine rather than hand-assembling fields, so the
        // alert tests stay honest against scoring changes.
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let mut input = ScoreInput {
            qty_ordered: 100.0,
            qty_delivered: 0.0,
            qty_available: Some(500.0),
            eta_date: Some(now.date_naive() + Duration::days(10)),
            impact_date: None,
            historical_late_rate: Some(0.0),
            eta_volatility_days: Some(0.0),
            lead_time_trend_days: Some(0.0),
            inventory_source_timestamp: Some(now - Duration::hours(2)),
        };
        match target {
            RiskTier::Green => {}
            RiskTier::Yellow => {
                input.qty_available = Some(50.0);
                input.historical_late_rate = Some(0.5);
            }
            RiskTier::Red => {
                input.qty_available = Some(0.0);
                input.historical_late_rate = Some(1.0);
                input.eta_date = Some(now.date_naive() - Duration::days(1));
                input.impact_date = Some(now.date_naive() + Duration::days(2));
            }
        }
        let a = score(&RiskPolicy::sane_defaults(), &input, now);
        assert_eq!(a.tier, target, "fixture did not land on {target:?}");
        a
    }

    fn ctx() -> AlertContext {
        AlertContext {
            material_name: "Stud Lumber 2x4x8".to_string(),
            supplier_order_id: "ML-SO-1".to_string(),
            impact_date: None,
        }
    }

    #[test]
    fn green_never_triggers() {
        assert!(!should_trigger(None, RiskTier::Green, false));
        assert!(!should_trigger(Some(RiskTier::Red), RiskTier::Green, true));
        assert!(!should_trigger(Some(RiskTier::Yellow), RiskTier::Green, false));
    }

    #[test]
    fn first_sighting_of_elevated_risk_triggers() {
        assert!(should_trigger(None, RiskTier::Yellow, false));
        assert!(should_trigger(None, RiskTier::Red, false));
    }

    #[test]
    fn escalation_triggers_deescalation_does_not() {
        assert!(should_trigger(Some(RiskTier::Green), RiskTier::Red, false));
        assert!(should_trigger(Some(RiskTier::Green), RiskTier::Yellow, false));
        assert!(should_trigger(Some(RiskTier::Yellow), RiskTier::Red, false));
        assert!(!should_trigger(Some(RiskTier::Red), RiskTier::Yellow, false));
    }

    #[test]
    fn repeat_red_only_when_high_priority() {
        assert!(!should_trigger(Some(RiskTier::Red), RiskTier::Red, false));
        assert!(should_trigger(Some(RiskTier::Red), RiskTier::Red, true));
        // Repeat yellow never re-alerts, urgent or not.
        assert!(!should_trigger(Some(RiskTier::Yellow), RiskTier::Yellow, true));
    }

    #[test]
    fn severity_mapping_is_total() {
        assert_eq!(severity_for(RiskTier::Red, true), AlertSeverity::High);
        assert_eq!(severity_for(RiskTier::Red, false), AlertSeverity::Medium);
        assert_eq!(severity_for(RiskTier::Yellow, true), AlertSeverity::Low);
        assert_eq!(severity_for(RiskTier::Yellow, false), AlertSeverity::Low);
    }

    #[test]
    fn proposed_severity_end_to_end() {
        let red = assessment_with_tier(RiskTier::Red);
        assert_eq!(proposed_severity(None, &red), Some(AlertSeverity::High));
        assert_eq!(
            proposed_severity(Some(RiskTier::Green), &red),
            Some(AlertSeverity::High)
        );

        let green = assessment_with_tier(RiskTier::Green);
        assert_eq!(proposed_severity(Some(RiskTier::Yellow), &green), None);

        let yellow = assessment_with_tier(RiskTier::Yellow);
        assert_eq!(
            proposed_severity(None, &yellow),
            Some(AlertSeverity::Low)
        );
        assert_eq!(proposed_severity(Some(RiskTier::Yellow), &yellow), None);
    }

    #[test]
    fn message_is_deterministic_and_embeds_facts() {
        let red = assessment_with_tier(RiskTier::Red);
        let a = compose_message(&ctx(), &red);
        let b = compose_message(&ctx(), &red);
        assert_eq!(a, b);
        assert!(a.contains("Stud Lumber 2x4x8"));
        assert!(a.contains("ML-SO-1"));
        assert!(a.contains("RED"));
        assert!(a.contains("Impact date: unknown."));
    }

    #[test]
    fn message_embeds_first_recommended_action() {
        let red = assessment_with_tier(RiskTier::Red);
        let msg = compose_message(&ctx(), &red);
        let first = &red.recommended_actions[0];
        assert!(msg.contains(&first.action));
    }

    #[test]
    fn build_alert_carries_recommendations() {
        let red = assessment_with_tier(RiskTier::Red);
        let alert = build_alert(&ctx(), &red, AlertSeverity::High);
        assert_eq!(alert.severity, AlertSeverity::High);
        assert_eq!(alert.recommendations, red.recommended_actions);
    }
}
