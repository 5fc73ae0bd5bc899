//! mw-alerts
//!
//! Alert decision engine.
//!
//! Architectural decisions:
//! - Pure state machine over consecutive risk tiers (previous → current);
//!   no IO; the cooldown lookup happens in the store and its verdict is
//!   an input here
//! - Green never alerts; repeat red alerts only when high-priority
//! - Severity mapping is total over {yellow, red} × {urgent, not-urgent}
//! - Message composition is deterministic text, not free-form
//! - The engine only ever *creates* alerts; acknowledge/resolve are
//!   operator actions outside this crate

mod engine;
mod types;

pub use engine::{build_alert, compose_message, proposed_severity, severity_for, should_trigger};
pub use types::*;
