//! Text form of an expense-analysis request, as typed by clients that talk to
//! the chat endpoints directly.

use std::collections::BTreeMap;
use std::fmt::Write;

use anyhow::{anyhow, Context};
use regex::Regex;

#[derive(Debug, PartialEq)]
pub struct ParsedPrompt {
    pub income: f64,
    pub spend: BTreeMap<String, f64>,
}

pub fn is_expense_analysis(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("monthly income") && message.contains("spent the following")
}

pub fn format_prompt(income: f64, spend: &BTreeMap<String, f64>) -> String {
    let mut prompt = format!(
        "User has ₹{} monthly income and spent the following last month:\n",
        income
    );
    for (category, amount) in spend {
        let _ = writeln!(prompt, "- ₹{:.2} on {}", amount, category);
    }
    prompt.push_str("\nWhat financial insights and improvements can you suggest?");
    prompt
}

/// Recovers income and per-category spend. Repeated categories are summed.
pub fn parse_prompt(text: &str) -> anyhow::Result<ParsedPrompt> {
    let income_re = Regex::new(r"₹([\d,]*\d(?:\.\d+)?)")?;
    let spend_re = Regex::new(r"₹([\d,.]+)\s+on\s+(.+)")?;

    let income_line = text
        .lines()
        .find(|line| line.to_lowercase().contains("monthly income"))
        .ok_or_else(|| anyhow!("no monthly income line"))?;
    let income = income_re
        .captures(income_line)
        .and_then(|captures| captures.get(1))
        .ok_or_else(|| anyhow!("no amount on the monthly income line"))
        .and_then(|amount| parse_amount(amount.as_str()))?;

    let mut spend = BTreeMap::new();
    for line in text.lines() {
        let Some(captures) = spend_re.captures(line) else {
            continue;
        };
        let amount = parse_amount(&captures[1])?;
        let category = captures[2].trim().to_string();
        *spend.entry(category).or_insert(0.0) += amount;
    }

    Ok(ParsedPrompt { income, spend })
}

fn parse_amount(raw: &str) -> anyhow::Result<f64> {
    raw.replace(',', "")
        .trim_end_matches('.')
        .parse()
        .with_context(|| format!("invalid amount {}", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_prompt_parses_back() {
        let spend: BTreeMap<String, f64> = [("food".to_string(), 8000.0), ("rent".to_string(), 15000.5)]
            .into_iter()
            .collect();
        let prompt = format_prompt(50000.0, &spend);

        assert!(prompt.starts_with("User has ₹50000 monthly income"));
        assert!(prompt.contains("- ₹15000.50 on rent\n"));
        assert!(is_expense_analysis(&prompt));
        assert_eq!(
            parse_prompt(&prompt).unwrap(),
            ParsedPrompt {
                income: 50000.0,
                spend
            }
        );
    }

    #[test]
    fn hand_written_prompt() {
        let text = "My monthly income is ₹1,20,000 and I spent the following:\n\
                    ₹2,500 on Food\n\
                    ₹1,000.75 on movies \n\
                    ₹500 on Food";
        let parsed = parse_prompt(text).unwrap();

        assert_eq!(parsed.income, 120000.0);
        assert_eq!(parsed.spend["Food"], 3000.0);
        assert_eq!(parsed.spend["movies"], 1000.75);
    }

    #[test]
    fn detection_needs_both_phrases() {
        assert!(is_expense_analysis("Monthly Income of 5, Spent The Following"));
        assert!(!is_expense_analysis("what is a good monthly income?"));
    }

    #[test]
    fn missing_income_is_an_error() {
        assert!(parse_prompt("I spent the following:\n₹10 on tea").is_err());
        assert!(parse_prompt("monthly income unknown").is_err());
    }
}
