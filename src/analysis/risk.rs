//! Score-to-tier risk classification.
//!
//! Scores come from the backend's normalized isolation-forest output, where a
//! LOWER score means a MORE anomalous event. The direction is kept as-is.

use serde::{Deserialize, Serialize};

use crate::model::AnomalyRecord;

/// Scores strictly below this are High risk.
pub const HIGH_RISK_BELOW: f64 = 0.3;
/// Scores strictly below this (and not High) are Medium risk.
pub const MEDIUM_RISK_BELOW: f64 = 0.6;

/// Discrete risk tier used for colouring the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    High,
    Medium,
    Low,
}

impl RiskTier {
    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::High => "HIGH",
            RiskTier::Medium => "MEDIUM",
            RiskTier::Low => "LOW",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Map a score to its tier. Total over every `f64`: out-of-range values use
/// the same thresholds, and NaN lands in `Low` (NaN scores are rejected during
/// record validation, so this arm is unreachable for validated records).
pub fn classify(score: f64) -> RiskTier {
    if score < HIGH_RISK_BELOW {
        RiskTier::High
    } else if score < MEDIUM_RISK_BELOW {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

/// Width of the risk bar, `(1 - score) * 100` clamped to `[0, 100]`.
pub fn fill_percentage(score: f64) -> f64 {
    ((1.0 - score) * 100.0).clamp(0.0, 100.0)
}

/// A record paired with its tier, as handed to the table renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRecord {
    #[serde(flatten)]
    pub record: AnomalyRecord,
    pub tier: RiskTier,
}

impl ClassifiedRecord {
    pub fn new(record: AnomalyRecord) -> Self {
        let tier = classify(record.score);
        Self { record, tier }
    }

    pub fn fill_percentage(&self) -> f64 {
        fill_percentage(self.record.score)
    }
}

/// Table ordering. Sorting is stable, so ties keep backend order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Backend order.
    #[default]
    Received,
    /// Riskiest (lowest score) first.
    Score,
    /// Newest first.
    Time,
    /// By user id.
    User,
}

pub fn sort_rows(rows: &mut [ClassifiedRecord], key: SortKey) {
    match key {
        SortKey::Received => {}
        SortKey::Score => rows.sort_by(|a, b| a.record.score.total_cmp(&b.record.score)),
        SortKey::Time => rows.sort_by(|a, b| b.record.timestamp.cmp(&a.record.timestamp)),
        SortKey::User => rows.sort_by(|a, b| a.record.user_id.cmp(&b.record.user_id)),
    }
}
