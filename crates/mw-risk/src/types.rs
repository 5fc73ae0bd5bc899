use chrono::{DateTime, NaiveDate, Utc};
use mw_schemas::RiskTier;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Scoring contract constants
// ---------------------------------------------------------------------------

/// Scores below this are green.
pub const GREEN_THRESHOLD: f64 = 0.35;
/// Scores at or above this are red; [GREEN_THRESHOLD, RED_THRESHOLD) is yellow.
pub const RED_THRESHOLD: f64 = 0.70;
/// Final scores are capped below 1.0; this is a heuristic, not a certainty.
pub const SCORE_CEILING: f64 = 0.99;
/// Stale data forcing the yellow floor bumps the score to at least this.
pub const STALE_YELLOW_FLOOR: f64 = 0.36;

/// Flat penalty when the ETA date has already passed.
pub const ETA_PASSED_PENALTY: f64 = 0.2;
/// Flat penalty when the matched inventory is stale (or absent).
pub const STALE_PENALTY: f64 = 0.1;

/// Neutral late rate substituted when the supplier reports no history.
pub const NEUTRAL_LATE_RATE: f64 = 0.5;
/// Neutral normalized volatility substituted when the signal is absent.
pub const NEUTRAL_VOLATILITY: f64 = 0.4;

/// ETA volatility (days) is normalized against this window.
pub const VOLATILITY_WINDOW_DAYS: f64 = 7.0;
/// Lead-time trend (days) is normalized against this window.
pub const LEAD_TREND_WINDOW_DAYS: f64 = 14.0;

/// Component thresholds that emit their reason code.
pub const HIGH_LATE_RATE_THRESHOLD: f64 = 0.45;
pub const ETA_VOLATILITY_THRESHOLD: f64 = 0.50;
pub const LEAD_DRIFT_THRESHOLD: f64 = 0.40;

/// Confidence policy.
pub const CONFIDENCE_BASE: f64 = 0.9;
pub const CONFIDENCE_MISSING_HISTORY_PENALTY: f64 = 0.2;
pub const CONFIDENCE_STALE_PENALTY: f64 = 0.15;
pub const CONFIDENCE_CLEAN_BONUS: f64 = 0.05;
pub const CONFIDENCE_FLOOR: f64 = 0.2;
pub const CONFIDENCE_CEILING: f64 = 0.95;
/// Fully delivered lines report this fixed confidence.
pub const CONFIDENCE_FULLY_DELIVERED: f64 = 0.99;

/// Estimated delay: `round(max(0, (score - DELAY_PIVOT) * DELAY_SCALE_DAYS))`.
pub const DELAY_PIVOT: f64 = 0.3;
pub const DELAY_SCALE_DAYS: f64 = 14.0;

// ---------------------------------------------------------------------------
// ReasonCode
// ---------------------------------------------------------------------------

/// Machine-readable tags explaining a risk contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    FullyDelivered,
    LowStock,
    HighLateRate,
    EtaVolatility,
    LeadTimeDrift,
    EtaPassed,
    StaleData,
    NoHistory,
    PartialDelivery,
    HeuristicBaseline,
}

impl ReasonCode {
    pub fn code(&self) -> &'static str {
        match self {
            ReasonCode::FullyDelivered => "FULLY_DELIVERED",
            ReasonCode::LowStock => "LOW_STOCK",
            ReasonCode::HighLateRate => "HIGH_LATE_RATE",
            ReasonCode::EtaVolatility => "ETA_VOLATILITY",
            ReasonCode::LeadTimeDrift => "LEAD_TIME_DRIFT",
            ReasonCode::EtaPassed => "ETA_PASSED",
            ReasonCode::StaleData => "STALE_DATA",
            ReasonCode::NoHistory => "NO_HISTORY",
            ReasonCode::PartialDelivery => "PARTIAL_DELIVERY",
            ReasonCode::HeuristicBaseline => "HEURISTIC_BASELINE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FULLY_DELIVERED" => Some(ReasonCode::FullyDelivered),
            "LOW_STOCK" => Some(ReasonCode::LowStock),
            "HIGH_LATE_RATE" => Some(ReasonCode::HighLateRate),
            "ETA_VOLATILITY" => Some(ReasonCode::EtaVolatility),
            "LEAD_TIME_DRIFT" => Some(ReasonCode::LeadTimeDrift),
            "ETA_PASSED" => Some(ReasonCode::EtaPassed),
            "STALE_DATA" => Some(ReasonCode::StaleData),
            "NO_HISTORY" => Some(ReasonCode::NoHistory),
            "PARTIAL_DELIVERY" => Some(ReasonCode::PartialDelivery),
            "HEURISTIC_BASELINE" => Some(ReasonCode::HeuristicBaseline),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ScoreInput
// ---------------------------------------------------------------------------

/// Everything the engine reads about one order line.
///
/// `qty_available`/`inventory_source_timestamp` come from the most recent
/// inventory snapshot for the (connector, SKU); both are `None` when the
/// lookup missed, which counts as stale data.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreInput {
    pub qty_ordered: f64,
    pub qty_delivered: f64,
    pub qty_available: Option<f64>,
    pub eta_date: Option<NaiveDate>,
    pub impact_date: Option<NaiveDate>,
    pub historical_late_rate: Option<f64>,
    pub eta_volatility_days: Option<f64>,
    pub lead_time_trend_days: Option<f64>,
    pub inventory_source_timestamp: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Assessment
// ---------------------------------------------------------------------------

/// Engine output for one order line, one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Clamped to [0, 0.99].
    pub score: f64,
    pub tier: RiskTier,
    /// Clamped to [0.2, 0.95] (0.99 for the fully-delivered sentinel).
    pub confidence: f64,
    /// Deduplicated, sorted by code string; never empty.
    pub reason_codes: Vec<ReasonCode>,
    pub estimated_delay_days: i64,
    pub stale_data: bool,
    /// Red risk with impact (or ETA) inside the near-term window.
    pub high_priority: bool,
    pub recommended_actions: Vec<crate::RecommendedAction>,
}

impl Assessment {
    /// Reason codes as their wire strings, preserving the sorted order.
    pub fn reason_code_strings(&self) -> Vec<String> {
        self.reason_codes
            .iter()
            .map(|c| c.code().to_string())
            .collect()
    }
}
