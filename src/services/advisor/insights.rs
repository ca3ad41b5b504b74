use std::collections::BTreeMap;
use std::fmt::Write;

use crate::models::advice::InsightMetrics;

const ESSENTIAL_CATEGORIES: [&str; 5] = ["food", "housing", "utilities", "transport", "healthcare"];

/// Categories with a dedicated recommendation once they pass the given share
/// of income.
const CATEGORY_LIMITS: [(&str, f64, &str); 3] = [
    (
        "food",
        0.15,
        "🍽️ Food expenses seem high. Try meal planning and cooking at home more often.",
    ),
    (
        "entertainment",
        0.10,
        "🎬 Entertainment spending is above recommended 10%. Look for free or low-cost activities.",
    ),
    (
        "transport",
        0.15,
        "🚗 Transportation costs are high. Consider carpooling, public transport, or remote work options.",
    ),
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InsightError {
    #[error("Valid monthly income is required")]
    InvalidIncome,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InsightReport {
    pub analysis: String,
    pub alerts: Vec<String>,
    pub recommendations: Vec<String>,
    pub metrics: InsightMetrics,
}

/// Builds the monthly analysis for `income` against per-category spend.
pub fn analyze(
    income: f64,
    spend: &BTreeMap<String, f64>,
) -> Result<InsightReport, InsightError> {
    if !income.is_finite() || income <= 0.0 {
        return Err(InsightError::InvalidIncome);
    }

    let total: f64 = spend.values().sum();
    let savings = income - total;
    let savings_rate = savings / income * 100.0;

    let mut ranked: Vec<(&String, f64)> = spend.iter().map(|(k, v)| (k, *v)).collect();
    // Stable sort keeps name order between equal amounts.
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut alerts = Vec::new();
    let mut recommendations = Vec::new();

    if savings_rate < 10.0 {
        alerts.push("⚠️ Low savings rate! Aim for at least 20% of income.".to_string());
        recommendations.push(
            "Try to reduce discretionary spending and increase your savings rate to 20%."
                .to_string(),
        );
    } else if savings_rate > 30.0 {
        recommendations.push(
            "🎉 Excellent savings rate! Consider investing the surplus for long-term growth."
                .to_string(),
        );
    }

    for (category, share, recommendation) in CATEGORY_LIMITS {
        if spent_on(spend, category) > income * share {
            recommendations.push(recommendation.to_string());
        }
    }

    let essential: f64 = spend
        .iter()
        .filter(|(category, _)| {
            let category = category.to_lowercase();
            ESSENTIAL_CATEGORIES
                .iter()
                .any(|essential| category.contains(essential))
        })
        .map(|(_, amount)| amount)
        .sum();
    let essential_percentage = essential / income * 100.0;

    if essential_percentage > 60.0 {
        alerts.push(
            "⚠️ Essential expenses exceed 60% of income. Review necessity of each expense."
                .to_string(),
        );
    }

    let score = health_score(savings_rate, essential_percentage);

    let mut analysis = String::from("📊 **Monthly Financial Analysis**\n\n");
    let _ = writeln!(analysis, "💰 **Income**: ₹{}", format_amount(income));
    let _ = writeln!(analysis, "💸 **Total Expenses**: ₹{}", format_amount(total));
    let _ = writeln!(
        analysis,
        "💡 **Savings**: ₹{} ({:.1}%)\n",
        format_amount(savings),
        savings_rate
    );
    analysis.push_str("🔍 **Top Spending Categories:**\n");
    for (index, (category, amount)) in ranked.iter().take(3).enumerate() {
        let percentage = if total > 0.0 { amount / total * 100.0 } else { 0.0 };
        let _ = writeln!(
            analysis,
            "{}. {}: ₹{} ({:.1}%)",
            index + 1,
            category,
            format_amount(*amount),
            percentage
        );
    }
    let _ = writeln!(analysis, "\n📈 **Financial Health Score**: {}/100", score);

    Ok(InsightReport {
        analysis,
        alerts,
        recommendations,
        metrics: InsightMetrics {
            savings_rate: format!("{:.1}", savings_rate),
            total_expenses: total,
            income,
            health_score: score,
        },
    })
}

pub fn health_score(savings_rate: f64, essential_percentage: f64) -> u32 {
    let mut score: i32 = 50;

    score += if savings_rate >= 20.0 {
        30
    } else if savings_rate >= 10.0 {
        20
    } else if savings_rate >= 5.0 {
        10
    } else {
        0
    };

    score += if essential_percentage <= 50.0 {
        20
    } else if essential_percentage <= 60.0 {
        10
    } else {
        -10
    };

    score.clamp(0, 100) as u32
}

fn spent_on(spend: &BTreeMap<String, f64>, label: &str) -> f64 {
    spend
        .iter()
        .filter(|(category, _)| category.eq_ignore_ascii_case(label))
        .map(|(_, amount)| amount)
        .sum()
}

/// Thousands separators with at most two decimals, trailing zeros dropped.
pub fn format_amount(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::new();
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if fraction > 0 {
        let fraction = format!("{:02}", fraction);
        grouped.push('.');
        grouped.push_str(fraction.trim_end_matches('0'));
    }

    if amount < 0.0 && cents > 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
