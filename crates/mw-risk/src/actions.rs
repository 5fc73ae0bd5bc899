use serde::{Deserialize, Serialize};

use crate::ReasonCode;

// ---------------------------------------------------------------------------
// RecommendedAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    Low,
    Medium,
    High,
}

/// One canned recovery action. Text is fixed per reason code so alert
/// messages stay deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedAction {
    pub title: String,
    pub action: String,
    pub priority: ActionPriority,
}

impl RecommendedAction {
    fn new(title: &str, action: &str, priority: ActionPriority) -> Self {
        Self {
            title: title.to_string(),
            action: action.to_string(),
            priority,
        }
    }
}

/// Fixed iteration order: highest-leverage interventions first. The output
/// ordering is part of the contract (alert messages embed the first entry).
const ACTION_ORDER: &[ReasonCode] = &[
    ReasonCode::EtaPassed,
    ReasonCode::LowStock,
    ReasonCode::HighLateRate,
    ReasonCode::PartialDelivery,
    ReasonCode::EtaVolatility,
    ReasonCode::LeadTimeDrift,
    ReasonCode::StaleData,
];

/// Derive recommended actions from a reason-code set.
///
/// Total over all inputs: when no code maps to an action (e.g. only
/// `NO_HISTORY` fired) a generic monitoring fallback is returned, never an
/// empty list.
pub fn actions_for(reason_codes: &[ReasonCode]) -> Vec<RecommendedAction> {
    let mut out: Vec<RecommendedAction> = Vec::new();
    for code in ACTION_ORDER {
        if !reason_codes.contains(code) {
            continue;
        }
        match code {
            ReasonCode::EtaPassed => out.push(RecommendedAction::new(
                "Trigger contingency procurement",
                "Trigger contingency procurement for immediate replacement of the overdue quantity.",
                ActionPriority::High,
            )),
            ReasonCode::LowStock => out.push(RecommendedAction::new(
                "Source alternate supplier",
                "Request quote from a backup distributor and split the reorder for the remaining quantity.",
                ActionPriority::High,
            )),
            ReasonCode::HighLateRate => out.push(RecommendedAction::new(
                "Escalate with supplier",
                "Escalate with the supplier and request a firm ship confirmation.",
                ActionPriority::High,
            )),
            ReasonCode::PartialDelivery => out.push(RecommendedAction::new(
                "Close remaining quantity gap",
                "Create a split order for the undelivered quantity to avoid full-project blockage.",
                ActionPriority::High,
            )),
            ReasonCode::EtaVolatility | ReasonCode::LeadTimeDrift => {
                // One resequencing action covers both schedule-drift codes.
                let action = RecommendedAction::new(
                    "Resequence dependent work",
                    "Re-sequence crew tasks to protect the near-term schedule and advance unaffected tasks.",
                    ActionPriority::Medium,
                );
                if !out.contains(&action) {
                    out.push(action);
                }
            }
            ReasonCode::StaleData => out.push(RecommendedAction::new(
                "Refresh connector data",
                "Run a connector sync now and confirm the ETA with the supplier rep before final decisions.",
                ActionPriority::Medium,
            )),
            _ => {}
        }
    }

    if out.is_empty() {
        out.push(RecommendedAction::new(
            "Continue monitoring",
            "Continue monitoring daily inventory and ETA trends.",
            ActionPriority::Low,
        ));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eta_passed_outranks_low_stock() {
        let actions = actions_for(&[ReasonCode::LowStock, ReasonCode::EtaPassed]);
        assert_eq!(actions[0].title, "Trigger contingency procurement");
        assert_eq!(actions[1].title, "Source alternate supplier");
    }

    #[test]
    fn volatility_and_drift_share_one_action() {
        let actions = actions_for(&[ReasonCode::EtaVolatility, ReasonCode::LeadTimeDrift]);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].title, "Resequence dependent work");
    }

    #[test]
    fn unmapped_codes_fall_back_to_monitoring() {
        let actions = actions_for(&[ReasonCode::NoHistory]);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].priority, ActionPriority::Low);
    }

    #[test]
    fn empty_input_falls_back_to_monitoring() {
        let actions = actions_for(&[]);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].title, "Continue monitoring");
    }

    #[test]
    fn order_is_independent_of_input_order() {
        let a = actions_for(&[ReasonCode::StaleData, ReasonCode::EtaPassed]);
        let b = actions_for(&[ReasonCode::EtaPassed, ReasonCode::StaleData]);
        assert_eq!(a, b);
    }
}
