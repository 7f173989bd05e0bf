// 🧮 Category Totals - per-category spend returned for one processed batch
//
// Invariant: every amount is finite and non-negative. Anything else is
// rejected at construction, including when deserializing a response.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TotalsError {
    #[error("invalid amount {amount} for category '{category}'")]
    InvalidAmount { category: String, amount: f64 },
}

// ============================================================================
// CATEGORY TOTALS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct CategoryTotals {
    amounts: BTreeMap<String, f64>,
}

impl CategoryTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(category, amount)` pairs, validating each amount
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, TotalsError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut totals = Self::new();
        for (category, amount) in pairs {
            totals.insert(category, amount)?;
        }
        Ok(totals)
    }

    /// Set a category's amount, replacing any previous value
    pub fn insert(&mut self, category: impl Into<String>, amount: f64) -> Result<(), TotalsError> {
        let category = category.into();
        validate(&category, amount)?;
        self.amounts.insert(category, amount);
        Ok(())
    }

    /// Add to a category's running amount
    pub fn add(&mut self, category: impl Into<String>, amount: f64) -> Result<(), TotalsError> {
        let category = category.into();
        validate(&category, amount)?;
        *self.amounts.entry(category).or_insert(0.0) += amount;
        Ok(())
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.amounts.get(category).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.amounts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    /// Sum of all amounts
    pub fn total(&self) -> f64 {
        self.amounts.values().sum()
    }

    /// Categories with a positive amount, largest first (ties by name)
    pub fn positive(&self) -> Vec<(&str, f64)> {
        let mut entries: Vec<(&str, f64)> = self.iter().filter(|(_, amount)| *amount > 0.0).collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// Mean over categories with a positive amount, `None` when there are none
    pub fn nonzero_mean(&self) -> Option<f64> {
        let positive: Vec<f64> = self.amounts.values().copied().filter(|v| *v > 0.0).collect();
        if positive.is_empty() {
            return None;
        }
        Some(positive.iter().sum::<f64>() / positive.len() as f64)
    }
}

fn validate(category: &str, amount: f64) -> Result<(), TotalsError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(TotalsError::InvalidAmount {
            category: category.to_string(),
            amount,
        })
    }
}

impl TryFrom<BTreeMap<String, f64>> for CategoryTotals {
    type Error = TotalsError;

    fn try_from(amounts: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        for (category, amount) in &amounts {
            validate(category, *amount)?;
        }
        Ok(CategoryTotals { amounts })
    }
}

impl From<CategoryTotals> for BTreeMap<String, f64> {
    fn from(totals: CategoryTotals) -> Self {
        totals.amounts
    }
}

// ============================================================================
// TESTS
// ============================================================================
