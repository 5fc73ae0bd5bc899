use chrono::NaiveDate;
use mw_risk::RecommendedAction;
use mw_schemas::AlertSeverity;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AlertContext
// ---------------------------------------------------------------------------

/// The order-line facts the message composer embeds. Everything else the
/// decision needs comes from the assessment itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertContext {
    pub material_name: String,
    pub supplier_order_id: String,
    pub impact_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// NewAlert
// ---------------------------------------------------------------------------

/// An alert the runner should insert. Exactly one row per decision; the
/// engine never mutates existing alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    pub severity: AlertSeverity,
    pub message: String,
    pub recommendations: Vec<RecommendedAction>,
}
