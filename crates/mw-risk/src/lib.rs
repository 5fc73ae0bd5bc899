//! mw-risk
//!
//! Delay-risk scoring engine.
//!
//! Architectural decisions:
//! - Pure function of (order-line signals, matched inventory, clock); no IO
//! - Deterministic given identical inputs and `now`
//! - Never fails: missing signals substitute neutral defaults and cost
//!   confidence instead of erroring
//! - Fully delivered lines short-circuit to the green sentinel
//! - Stale inventory can never present as green (post-hoc yellow floor)
//! - Reason codes are deduplicated and sorted; recommended actions derive
//!   from them through a fixed lookup table

mod actions;
mod engine;
mod types;

pub use actions::{actions_for, ActionPriority, RecommendedAction};
pub use engine::{score, tier_for_score};
pub use types::*;
