use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub amount: f64,
    pub category: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewExpense {
    #[serde(default)]
    pub title: String,
    pub amount: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl NewExpense {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title is required".to_string());
        }
        if self.category.trim().is_empty() {
            return Err("Category is required".to_string());
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err("Amount must be a non-negative number".to_string());
        }

        Ok(())
    }
}

pub fn totals_by_category(expenses: &[Expense]) -> BTreeMap<String, f64> {
    expenses.iter().fold(BTreeMap::new(), |mut totals, expense| {
        *totals.entry(expense.category.clone()).or_insert(0.0) += expense.amount;
        totals
    })
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub income: f64,
    pub total_expense: f64,
    pub savings: f64,
    /// Two decimals, or null when no income was given.
    pub savings_rate: Option<String>,
    pub score: &'static str,
}

impl MonthlySummary {
    pub fn compute(income: f64, total_expense: f64) -> Self {
        let savings = income - total_expense;
        let rate = (income > 0.0).then(|| savings / income * 100.0);

        let score = match rate {
            Some(rate) if rate >= 20.0 => "Great",
            Some(rate) if rate >= 10.0 => "Good",
            _ => "Needs Improvement",
        };

        Self {
            income,
            total_expense,
            savings,
            savings_rate: rate.map(|rate| format!("{:.2}", rate)),
            score,
        }
    }
}
