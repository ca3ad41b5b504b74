use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Months, Utc};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};

use super::expenses::ExpenseRequest;
use super::gamification::GamificationRequest;
use super::{call, RequestHandler, Service, ServiceError};
use crate::{
    models::{
        advice::AdvisorReply,
        expenses,
        gamification::{AI_CHAT_POINTS, AI_INSIGHTS_POINTS},
    },
    repositories::assistant::{AssistantApi, AssistantError},
};

pub mod insights;
pub mod knowledge;
pub mod prompt;

use knowledge::ResponsePicker;

const LOCAL_SOURCE: &str = "production-local-ai";
const TOPIC_SUGGESTIONS: [&str; 3] = [
    "Would you like more specific advice about this topic?",
    "Do you have questions about implementing this strategy?",
    "Would you like to know about related financial concepts?",
];
const GENERAL_SUGGESTIONS: [&str; 3] = [
    "Try asking about: budgeting, saving, debt payoff, investing, or credit scores",
    "Be specific about your financial situation for better advice",
    "I can help with both beginner and advanced financial strategies",
];
const NO_DATA_RECOMMENDATIONS: [&str; 3] = [
    "Add your daily expenses to get detailed financial analysis",
    "Track expenses in categories like food, transport, entertainment, etc.",
    "Come back after a week of expense tracking for insights",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssistantMode {
    /// Hosted `gpt2` model.
    HuggingFace,
    /// Hosted `distilgpt2` model.
    HuggingFaceAlt,
    OpenAi,
    Enhanced,
    Simple,
    Test,
    Production,
}

impl FromStr for AssistantMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ask" => Ok(AssistantMode::HuggingFace),
            "ask2" => Ok(AssistantMode::HuggingFaceAlt),
            "openai" => Ok(AssistantMode::OpenAi),
            "enhanced" => Ok(AssistantMode::Enhanced),
            "simple" => Ok(AssistantMode::Simple),
            "test" => Ok(AssistantMode::Test),
            "production" => Ok(AssistantMode::Production),
            _ => Err(()),
        }
    }
}

pub enum AdvisorRequest {
    /// `user_id` is absent on the unauthenticated debug route.
    Ask {
        mode: AssistantMode,
        message: Option<String>,
        user_id: Option<String>,
        response: oneshot::Sender<Result<AdvisorReply, ServiceError>>,
    },
    Insights {
        user_id: String,
        income: Option<f64>,
        response: oneshot::Sender<Result<AdvisorReply, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct AdvisorRequestHandler {
    assistant: AssistantApi,
    picker: Arc<dyn ResponsePicker>,
    expense_channel: mpsc::Sender<ExpenseRequest>,
    gamification_channel: mpsc::Sender<GamificationRequest>,
}

impl AdvisorRequestHandler {
    pub fn new(
        assistant: AssistantApi,
        picker: Arc<dyn ResponsePicker>,
        expense_channel: mpsc::Sender<ExpenseRequest>,
        gamification_channel: mpsc::Sender<GamificationRequest>,
    ) -> Self {
        AdvisorRequestHandler {
            assistant,
            picker,
            expense_channel,
            gamification_channel,
        }
    }

    async fn ask(
        &self,
        mode: AssistantMode,
        message: Option<String>,
        user_id: Option<String>,
    ) -> Result<AdvisorReply, ServiceError> {
        let message = message
            .filter(|message| !message.trim().is_empty())
            .ok_or_else(|| ServiceError::Validation(knowledge::EmptyMessage.to_string()))?;

        match mode {
            AssistantMode::HuggingFace => self.ask_huggingface(&message, user_id.as_deref()).await,
            AssistantMode::HuggingFaceAlt => self.ask_huggingface_alt(&message).await,
            AssistantMode::OpenAi => self.ask_openai(&message).await,
            AssistantMode::Enhanced => {
                let advice = self.classify(&knowledge::ENHANCED, &message)?;
                Ok(AdvisorReply {
                    source: Some("enhanced-local-ai"),
                    confidence: Some("high"),
                    ..AdvisorReply::text(advice.response)
                })
            }
            AssistantMode::Simple => {
                let advice = self.classify(&knowledge::SIMPLE, &message)?;
                Ok(AdvisorReply {
                    source: Some("rule-based-assistant"),
                    ..AdvisorReply::text(advice.response)
                })
            }
            AssistantMode::Test => {
                let advice = self.classify(&knowledge::TIPS, &message)?;
                Ok(AdvisorReply {
                    source: Some("test-mode"),
                    ..AdvisorReply::text(format!("Regarding \"{}\": {}", message, advice.response))
                })
            }
            AssistantMode::Production => self.ask_production(&message, user_id.as_deref()).await,
        }
    }

    fn classify(
        &self,
        base: &knowledge::KnowledgeBase,
        message: &str,
    ) -> Result<knowledge::Advice, ServiceError> {
        base.classify(message, self.picker.as_ref())
            .map_err(|e| ServiceError::Validation(e.to_string()))
    }

    async fn ask_production(
        &self,
        message: &str,
        user_id: Option<&str>,
    ) -> Result<AdvisorReply, ServiceError> {
        if prompt::is_expense_analysis(message) {
            let parsed = prompt::parse_prompt(message).map_err(|e| {
                log::debug!("Could not parse expense analysis prompt: {:#}", e);
                ServiceError::Validation(insights::InsightError::InvalidIncome.to_string())
            })?;
            let report = insights::analyze(parsed.income, &parsed.spend)
                .map_err(|e| ServiceError::Validation(e.to_string()))?;

            return Ok(AdvisorReply {
                category: Some("expense-analysis".to_string()),
                source: Some(LOCAL_SOURCE),
                confidence: Some("high"),
                recommendations: Some(report.recommendations),
                alerts: Some(report.alerts),
                ..AdvisorReply::text(report.analysis)
            });
        }

        let advice = self.classify(&knowledge::PRODUCTION, message)?;

        if let Some(user_id) = user_id {
            self.award_points(user_id, AI_CHAT_POINTS, "AI chat").await;
        }

        let suggestions = if advice.category == knowledge::GENERAL {
            GENERAL_SUGGESTIONS
        } else {
            TOPIC_SUGGESTIONS
        };

        Ok(AdvisorReply {
            category: Some(advice.category.to_string()),
            source: Some(LOCAL_SOURCE),
            confidence: Some("high"),
            suggestions: Some(suggestions.to_vec()),
            ..AdvisorReply::text(advice.response)
        })
    }

    async fn ask_huggingface(
        &self,
        message: &str,
        user_id: Option<&str>,
    ) -> Result<AdvisorReply, ServiceError> {
        let generated = self
            .assistant
            .huggingface(
                "gpt2",
                format!("Q: {}\nA:", message),
                json!({ "max_length": 100, "temperature": 0.7, "return_full_text": false }),
            )
            .await
            .map_err(|e| match e {
                AssistantError::NotConfigured => not_configured("Hugging Face"),
                AssistantError::ModelNotFound(details) => upstream(
                    "Hugging Face model not found",
                    format!(
                        "The specified model endpoint does not exist or is not available: {}",
                        details
                    ),
                ),
                AssistantError::Unauthorized => upstream(
                    "Hugging Face authentication error",
                    "Invalid or missing API key".to_string(),
                ),
                AssistantError::Request(details) => upstream("Hugging Face error", details),
            })?;

        if let Some(user_id) = user_id {
            self.award_points(user_id, AI_CHAT_POINTS, "AI chat").await;
        }

        Ok(AdvisorReply::text(
            generated.unwrap_or_else(|| "No clear response generated.".to_string()),
        ))
    }

    async fn ask_huggingface_alt(&self, message: &str) -> Result<AdvisorReply, ServiceError> {
        let generated = self
            .assistant
            .huggingface(
                "distilgpt2",
                format!("Financial advice: {}. Answer:", message),
                json!({ "max_length": 100, "temperature": 0.8, "do_sample": true }),
            )
            .await
            .map_err(|e| match e {
                AssistantError::NotConfigured => not_configured("Hugging Face"),
                other => upstream("Alternative Hugging Face error", other.to_string()),
            })?;

        Ok(AdvisorReply::text(
            generated.unwrap_or_else(|| "No response generated.".to_string()),
        ))
    }

    async fn ask_openai(&self, message: &str) -> Result<AdvisorReply, ServiceError> {
        let reply = self
            .assistant
            .openai_chat(message)
            .await
            .map_err(|e| match e {
                AssistantError::NotConfigured => not_configured("OpenAI"),
                other => upstream("OpenAI error", other.to_string()),
            })?;

        Ok(AdvisorReply {
            source: Some("openai"),
            ..AdvisorReply::text(reply)
        })
    }

    async fn insights(
        &self,
        user_id: &str,
        income: Option<f64>,
    ) -> Result<AdvisorReply, ServiceError> {
        let income = income
            .filter(|income| income.is_finite() && *income > 0.0)
            .ok_or_else(|| ServiceError::Validation(insights::InsightError::InvalidIncome.to_string()))?;

        let now = Utc::now();
        let since = now.checked_sub_months(Months::new(1)).unwrap_or(now);
        let recent = call(&self.expense_channel, "Expense", |response| {
            ExpenseRequest::ListExpensesSince {
                user_id: user_id.to_string(),
                since,
                response,
            }
        })
        .await?;

        if recent.is_empty() {
            return Ok(AdvisorReply {
                category: Some("no-data".to_string()),
                recommendations: Some(
                    NO_DATA_RECOMMENDATIONS.iter().map(|r| r.to_string()).collect(),
                ),
                ..AdvisorReply::text(
                    "No expenses found for the last month. Start tracking your expenses to get personalized AI insights!",
                )
            });
        }

        let breakdown = expenses::totals_by_category(&recent);
        let report = insights::analyze(income, &breakdown)
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        self.award_points(user_id, AI_INSIGHTS_POINTS, "AI insights")
            .await;

        Ok(AdvisorReply {
            category: Some("expense-analysis".to_string()),
            source: Some(LOCAL_SOURCE),
            confidence: Some("high"),
            recommendations: Some(report.recommendations),
            alerts: Some(report.alerts),
            metrics: Some(report.metrics),
            expense_breakdown: Some(breakdown),
            total_tracked_expenses: Some(recent.len()),
            ..AdvisorReply::text(report.analysis)
        })
    }

    /// Failures are logged and never reach the caller.
    async fn award_points(&self, user_id: &str, points: i64, reason: &str) {
        let award = call(&self.gamification_channel, "Gamification", |response| {
            GamificationRequest::AwardPoints {
                user_id: user_id.to_string(),
                points,
                reason: reason.to_string(),
                response,
            }
        })
        .await;

        if let Err(e) = award {
            log::warn!("Could not award {} points to {}: {}", reason, user_id, e);
        }
    }
}

fn upstream(message: &str, details: String) -> ServiceError {
    ServiceError::Upstream {
        message: message.to_string(),
        details,
    }
}

fn not_configured(provider: &str) -> ServiceError {
    upstream(
        &format!("{} API key not configured", provider),
        "API key not configured".to_string(),
    )
}

#[async_trait]
impl RequestHandler<AdvisorRequest> for AdvisorRequestHandler {
    async fn handle_request(&self, request: AdvisorRequest) {
        match request {
            AdvisorRequest::Ask {
                mode,
                message,
                user_id,
                response,
            } => {
                let reply = self.ask(mode, message, user_id).await;
                if let Err(ServiceError::Upstream { message, details }) = &reply {
                    log::error!("{:?} assistant failed: {} ({})", mode, message, details);
                }
                let _ = response.send(reply);
            }
            AdvisorRequest::Insights {
                user_id,
                income,
                response,
            } => {
                let reply = self.insights(&user_id, income).await;
                let _ = response.send(reply);
            }
        }
    }
}

pub struct AdvisorService;

impl AdvisorService {
    pub fn new() -> Self {
        AdvisorService {}
    }
}

#[async_trait]
impl Service<AdvisorRequest, AdvisorRequestHandler> for AdvisorService {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_segments_map_to_modes() {
        assert_eq!("ask".parse::<AssistantMode>(), Ok(AssistantMode::HuggingFace));
        assert_eq!("ask2".parse::<AssistantMode>(), Ok(AssistantMode::HuggingFaceAlt));
        assert_eq!("production".parse::<AssistantMode>(), Ok(AssistantMode::Production));
        assert_eq!("insights".parse::<AssistantMode>(), Err(()));
    }
}
