//! Threshold alert rule over the progress store.
//!
//! Stateless: the status is recomputed from the current entries on every
//! call. Categories without a rule never contribute a reason.

use crate::category::Category;
use crate::progress::ProgressEntry;
use serde::{Deserialize, Serialize};

/// Separator between reasons when several rules fire.
pub const REASON_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertRule {
    pub category: Category,
    /// Fires when progress is greater than or equal to this value.
    pub threshold: u8,
    pub reason: String,
}

impl AlertRule {
    pub fn new(category: Category, threshold: u8, reason: &str) -> Self {
        Self {
            category,
            threshold,
            reason: reason.to_string(),
        }
    }

    pub fn fires(&self, entry: &ProgressEntry) -> bool {
        entry.title == self.category && entry.progress >= self.threshold
    }
}

pub fn default_rules() -> Vec<AlertRule> {
    vec![
        AlertRule::new(
            Category::FederalAgencyCapture,
            80,
            "Federal agency capture exceeds safe threshold.",
        ),
        AlertRule::new(
            Category::JudicialDefiance,
            70,
            "Unconstitutional judicial defiance observed.",
        ),
        AlertRule::new(
            Category::SuppressionOfDissent,
            75,
            "Active suppression of dissent detected.",
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertStatus {
    pub triggered: bool,
    pub reason: String,
}

/// Evaluate `rules` in order against `entries`.
pub fn evaluate(rules: &[AlertRule], entries: &[ProgressEntry]) -> AlertStatus {
    let reasons: Vec<&str> = rules
        .iter()
        .filter(|rule| entries.iter().any(|entry| rule.fires(entry)))
        .map(|rule| rule.reason.as_str())
        .collect();

    AlertStatus {
        triggered: !reasons.is_empty(),
        reason: reasons.join(REASON_SEPARATOR),
    }
}
