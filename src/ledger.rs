// 📒 Expense Ledger - folds extracted line items into category totals
//
// The category set is fixed. Labels outside it are booked under `other`.

use crate::client::Expense;
use crate::totals::CategoryTotals;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Groceries,
    Dining,
    Utilities,
    Shopping,
    Entertainment,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 6] = [
        ExpenseCategory::Groceries,
        ExpenseCategory::Dining,
        ExpenseCategory::Utilities,
        ExpenseCategory::Shopping,
        ExpenseCategory::Entertainment,
        ExpenseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Groceries => "groceries",
            ExpenseCategory::Dining => "dining",
            ExpenseCategory::Utilities => "utilities",
            ExpenseCategory::Shopping => "shopping",
            ExpenseCategory::Entertainment => "entertainment",
            ExpenseCategory::Other => "other",
        }
    }

    /// Case-insensitive lookup; anything unknown is `Other`
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == label)
            .unwrap_or(ExpenseCategory::Other)
    }

    /// Slash-separated list for prompts and help text
    pub fn names() -> String {
        Self::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>().join("/")
    }
}

/// Totals for every category, starting at zero
pub fn tally(expenses: &[Expense]) -> CategoryTotals {
    let mut totals = CategoryTotals::new();
    for category in ExpenseCategory::ALL {
        // zero is always valid
        let _ = totals.insert(category.as_str(), 0.0);
    }

    for expense in expenses {
        let category = ExpenseCategory::from_label(&expense.category);
        if let Err(e) = totals.add(category.as_str(), expense.amount) {
            tracing::warn!("Skipping '{}': {}", expense.description, e);
        }
    }

    totals
}
