// 🚨 Alerting Policy - flags unusually high category spend
//
// A category is flagged when its amount is strictly greater than
// `multiplier × mean` of the categories with a positive amount.

use crate::totals::CategoryTotals;
use crate::view::AlertRow;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MULTIPLIER: f64 = 3.0;
pub const NO_ALERTS_NOTICE: &str = "No unusual spending detected";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertPolicy {
    pub multiplier: f64,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        AlertPolicy {
            multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

/// Categories flagged for one set of totals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertSet {
    pub threshold: Option<f64>,
    pub categories: Vec<String>,
}

impl AlertSet {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// One warning per flagged category, or the single "no unusual spending" notice
    pub fn rows(&self) -> Vec<AlertRow> {
        if self.categories.is_empty() {
            return vec![AlertRow::Notice(NO_ALERTS_NOTICE.to_string())];
        }

        self.categories
            .iter()
            .map(|c| AlertRow::Warning(format!("High spending detected in {}", c)))
            .collect()
    }
}

impl AlertPolicy {
    pub fn new(multiplier: f64) -> Self {
        AlertPolicy { multiplier }
    }

    pub fn evaluate(&self, totals: &CategoryTotals) -> AlertSet {
        let Some(mean) = totals.nonzero_mean() else {
            return AlertSet::default();
        };

        let threshold = mean * self.multiplier;
        let categories = totals
            .positive()
            .into_iter()
            .filter(|(_, amount)| *amount > threshold)
            .map(|(category, _)| category.to_string())
            .collect();

        AlertSet {
            threshold: Some(threshold),
            categories,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
