//! mw-config
//!
//! Policy configuration for the supplier sync pipeline.
//!
//! All tunables that are *policy* (scoring weights, alert cooldown, retry
//! caps) live here as typed structs with `sane_defaults()`. Tier cut-offs
//! (0.35 / 0.70) are NOT configurable; they are part of the scoring
//! contract and live as constants in `mw-risk`.
//!
//! Policies load from a single YAML document, are canonicalized to JSON and
//! hashed (sha256) so a sync run can record exactly which policy revision
//! produced its assessments.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

/// Known secret-like prefixes. Policy files must reference secrets by
/// opaque handle (`secret://…`), never by literal value; loading aborts
/// with CONFIG_SECRET_DETECTED if any leaf string looks like a credential.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // Stripe / OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
];

// ---------------------------------------------------------------------------
// RiskPolicy
// ---------------------------------------------------------------------------

/// Scoring weights and freshness thresholds.
///
/// The four weights are a documented policy and must sum to 1.0; `validate`
/// enforces this so a hand-edited YAML cannot silently skew the blend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskPolicy {
    /// Weight of the inventory-coverage component.
    pub weight_stock: f64,
    /// Weight of the historical late-rate component.
    pub weight_late_rate: f64,
    /// Weight of the ETA-volatility component.
    pub weight_volatility: f64,
    /// Weight of the lead-time-trend component.
    pub weight_lead_trend: f64,
    /// Stock component above this emits LOW_STOCK.
    pub low_stock_threshold: f64,
    /// Inventory older than this is stale (penalty + yellow floor).
    pub stale_threshold_hours: i64,
    /// Red risk with impact inside this window is "high priority".
    pub high_priority_impact_days: i64,
}

impl RiskPolicy {
    pub fn sane_defaults() -> Self {
        Self {
            weight_stock: 0.45,
            weight_late_rate: 0.25,
            weight_volatility: 0.20,
            weight_lead_trend: 0.10,
            low_stock_threshold: 0.15,
            stale_threshold_hours: 48,
            high_priority_impact_days: 7,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let sum = self.weight_stock
            + self.weight_late_rate
            + self.weight_volatility
            + self.weight_lead_trend;
        if (sum - 1.0).abs() > 1e-9 {
            bail!("risk weights must sum to 1.0, got {sum}");
        }
        if !(0.0..=1.0).contains(&self.low_stock_threshold) {
            bail!(
                "low_stock_threshold must be within [0,1], got {}",
                self.low_stock_threshold
            );
        }
        if self.stale_threshold_hours <= 0 {
            bail!("stale_threshold_hours must be > 0");
        }
        if self.high_priority_impact_days < 0 {
            bail!("high_priority_impact_days must be >= 0");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AlertPolicy
// ---------------------------------------------------------------------------

/// Alert suppression policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertPolicy {
    /// Minimum hours between alerts of the same severity for one order line.
    pub cooldown_hours: i64,
}

impl AlertPolicy {
    pub fn sane_defaults() -> Self {
        Self { cooldown_hours: 12 }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cooldown_hours <= 0 {
            bail!("cooldown_hours must be > 0");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SyncPolicy
// ---------------------------------------------------------------------------

/// Retry and admission policy for the sync runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncPolicy {
    /// Attempt cap per job (first try included).
    pub max_attempts: u32,
    /// Backoff before retry N is `backoff_base_secs * 2^(N-1)`.
    pub backoff_base_secs: f64,
    /// Manual triggers within this many seconds of the connector's last
    /// sync are rejected (admission control, not a lock).
    pub min_manual_interval_secs: i64,
}

impl SyncPolicy {
    pub fn sane_defaults() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_secs: 0.25,
            min_manual_interval_secs: 30,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            bail!("max_attempts must be >= 1");
        }
        if self.backoff_base_secs < 0.0 {
            bail!("backoff_base_secs must be >= 0");
        }
        if self.min_manual_interval_secs < 0 {
            bail!("min_manual_interval_secs must be >= 0");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Policies aggregate
// ---------------------------------------------------------------------------

/// Full policy set handed to the runner and daemon at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Policies {
    pub risk: RiskPolicy,
    pub alerts: AlertPolicy,
    pub sync: SyncPolicy,
}

impl Default for Policies {
    fn default() -> Self {
        Self::sane_defaults()
    }
}

impl Policies {
    pub fn sane_defaults() -> Self {
        Self {
            risk: RiskPolicy::sane_defaults(),
            alerts: AlertPolicy::sane_defaults(),
            sync: SyncPolicy::sane_defaults(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.risk.validate()?;
        self.alerts.validate()?;
        self.sync.validate()?;
        Ok(())
    }

    /// Canonical JSON rendering used for hashing.
    pub fn canonical_json(&self) -> Result<String> {
        let v = serde_json::to_value(self).context("policy serialize failed")?;
        canonicalize_json(&v)
    }

    /// Stable sha256 over the canonical JSON. Recorded per sync run.
    pub fn policy_hash(&self) -> Result<String> {
        Ok(sha256_hex(self.canonical_json()?.as_bytes()))
    }
}

/// Loaded policy set plus its provenance hash.
#[derive(Debug, Clone)]
pub struct LoadedPolicies {
    pub policies: Policies,
    pub policy_hash: String,
}

/// Load policies from a YAML file. Missing sections fall back to
/// `sane_defaults()` per the `default` serde attribute on [`Policies`].
pub fn load_yaml(path: &str) -> Result<LoadedPolicies> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read policy yaml: {path}"))?;
    load_yaml_from_str(&raw)
}

pub fn load_yaml_from_str(raw: &str) -> Result<LoadedPolicies> {
    let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
    let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;

    enforce_no_secret_literals(&v_json)?;

    let policies: Policies =
        serde_json::from_value(v_json).context("policy document did not match schema")?;
    policies.validate()?;

    let policy_hash = policies.policy_hash()?;
    Ok(LoadedPolicies {
        policies,
        policy_hash,
    })
}

// ---------------------------------------------------------------------------
// Canonicalization + hashing
// ---------------------------------------------------------------------------

fn canonicalize_json(v: &Value) -> Result<String> {
    // serde_json's Map is a BTreeMap by default (preserve_order is not
    // enabled anywhere in this workspace), so key ordering is already
    // deterministic; serialize compact.
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    match v {
        Value::Object(map) => {
            for vv in map.values() {
                enforce_no_secret_literals(vv)?;
            }
        }
        Value::Array(arr) => {
            for vv in arr {
                enforce_no_secret_literals(vv)?;
            }
        }
        Value::String(s) => {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED value=REDACTED");
            }
        }
        _ => {}
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_and_weights_sum_to_one() {
        let p = Policies::sane_defaults();
        p.validate().unwrap();
        let sum = p.risk.weight_stock
            + p.risk.weight_late_rate
            + p.risk.weight_volatility
            + p.risk.weight_lead_trend;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn policy_hash_is_stable_across_calls() {
        let p = Policies::sane_defaults();
        assert_eq!(p.policy_hash().unwrap(), p.policy_hash().unwrap());
    }

    #[test]
    fn policy_hash_changes_when_a_weight_changes() {
        let a = Policies::sane_defaults();
        let mut b = Policies::sane_defaults();
        b.risk.weight_stock = 0.50;
        b.risk.weight_late_rate = 0.20;
        assert_ne!(a.policy_hash().unwrap(), b.policy_hash().unwrap());
    }

    #[test]
    fn skewed_weights_fail_validation() {
        let mut p = Policies::sane_defaults();
        p.risk.weight_stock = 0.9;
        assert!(p.validate().is_err());
    }

    #[test]
    fn yaml_partial_document_fills_defaults() {
        let loaded = load_yaml_from_str("alerts:\n  cooldown_hours: 6\n").unwrap();
        assert_eq!(loaded.policies.alerts.cooldown_hours, 6);
        assert_eq!(loaded.policies.sync.max_attempts, 3);
        assert_eq!(loaded.policies.risk.weight_stock, 0.45);
    }

    #[test]
    fn yaml_with_secret_literal_is_rejected() {
        let raw = "risk:\n  weight_stock: 0.45\n  weight_late_rate: 0.25\n  weight_volatility: 0.20\n  weight_lead_trend: 0.10\n  low_stock_threshold: \"sk_live_abcdef123456\"\n  stale_threshold_hours: 48\n  high_priority_impact_days: 7\n";
        let err = load_yaml_from_str(raw).unwrap_err();
        assert!(err.to_string().contains("CONFIG_SECRET_DETECTED"));
    }

    #[test]
    fn empty_yaml_loads_pure_defaults() {
        let loaded = load_yaml_from_str("{}").unwrap();
        assert_eq!(loaded.policies, Policies::sane_defaults());
    }
}
