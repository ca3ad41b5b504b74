use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::settings;

const ADVISOR_SYSTEM_PROMPT: &str = "You are a helpful financial advisor. Provide practical, actionable advice for personal finance, budgeting, saving, and investing.";

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("API key not configured")]
    NotConfigured,
    #[error("model not found: {0}")]
    ModelNotFound(String),
    #[error("invalid or missing API key")]
    Unauthorized,
    #[error("{0}")]
    Request(String),
}

impl From<reqwest::Error> for AssistantError {
    fn from(e: reqwest::Error) -> Self {
        AssistantError::Request(e.to_string())
    }
}

#[derive(Deserialize)]
struct GeneratedText {
    generated_text: Option<String>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

/// Client for the hosted text-generation APIs behind the `ask`, `ask2` and
/// `openai` assistants.
#[derive(Clone)]
pub struct AssistantApi {
    client: reqwest::Client,
    huggingface_url: String,
    huggingface_api_key: Option<String>,
    openai_url: String,
    openai_api_key: Option<String>,
    openai_model: String,
}

impl AssistantApi {
    pub fn new(settings: &settings::Assistant) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            huggingface_url: settings.huggingface_url.trim_end_matches('/').to_string(),
            huggingface_api_key: settings.huggingface_api_key.clone(),
            openai_url: settings.openai_url.clone(),
            openai_api_key: settings.openai_api_key.clone(),
            openai_model: settings.openai_model.clone(),
        })
    }

    /// Runs a text-generation model and returns its first generation, if any.
    pub async fn huggingface(
        &self,
        model: &str,
        inputs: String,
        parameters: serde_json::Value,
    ) -> Result<Option<String>, AssistantError> {
        let api_key = self
            .huggingface_api_key
            .as_deref()
            .ok_or(AssistantError::NotConfigured)?;

        let response = self
            .client
            .post(format!("{}/{}", self.huggingface_url, model))
            .bearer_auth(api_key)
            .json(&json!({ "inputs": inputs, "parameters": parameters }))
            .send()
            .await?;

        let response = check_status(response).await?;
        let generations: Vec<GeneratedText> = response.json().await?;
        log::debug!("Hugging Face {} returned {} generations.", model, generations.len());

        Ok(generations
            .into_iter()
            .next()
            .and_then(|generation| generation.generated_text))
    }

    pub async fn openai_chat(&self, message: &str) -> Result<String, AssistantError> {
        let api_key = self
            .openai_api_key
            .as_deref()
            .ok_or(AssistantError::NotConfigured)?;

        let messages = [
            ChatMessage {
                role: "system",
                content: ADVISOR_SYSTEM_PROMPT,
            },
            ChatMessage {
                role: "user",
                content: message,
            },
        ];

        let response = self
            .client
            .post(&self.openai_url)
            .bearer_auth(api_key)
            .json(&json!({
                "model": self.openai_model,
                "messages": messages,
                "max_tokens": 150,
                "temperature": 0.7,
            }))
            .send()
            .await?;

        let response = check_status(response).await?;
        let completion: ChatCompletion = response.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AssistantError::Request("completion had no choices".to_string()))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AssistantError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    log::warn!("Assistant API answered {}: {}", status, body);

    match status {
        StatusCode::NOT_FOUND => Err(AssistantError::ModelNotFound(body)),
        StatusCode::UNAUTHORIZED => Err(AssistantError::Unauthorized),
        _ => Err(AssistantError::Request(format!("{}: {}", status, body))),
    }
}
