use async_trait::async_trait;
use serde_json::Value;
use surfcast_models::chat::ChatMessage;
use surfcast_models::config::ModelConfig;
use tracing::{debug, warn};

use crate::error::AgentError;

/// Output token cap for every advice request.
pub const MAX_TOKENS: u32 = 512;

/// Reply used when the model output carries no usable text.
pub const NO_RESPONSE: &str = "No response generated.";

/// The shapes a language model reply can take.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    /// A bare string.
    Text(String),
    /// An object carrying a `response` string.
    Response(String),
    /// A list of outputs. Only the first element is consulted.
    Batch(Vec<ModelOutput>),
    /// Anything else, including null.
    Unrecognized,
}

impl ModelOutput {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => ModelOutput::Text(text),
            Value::Array(items) => {
                ModelOutput::Batch(items.into_iter().map(ModelOutput::from_value).collect())
            }
            Value::Object(mut fields) => match fields.remove("response") {
                Some(Value::String(text)) => ModelOutput::Response(text),
                _ => ModelOutput::Unrecognized,
            },
            _ => ModelOutput::Unrecognized,
        }
    }
}

impl From<Value> for ModelOutput {
    fn from(value: Value) -> Self {
        ModelOutput::from_value(value)
    }
}

/// Plain reply text. Never fails; unusable shapes yield [`NO_RESPONSE`].
pub fn extract_text(output: ModelOutput) -> String {
    match output {
        ModelOutput::Text(text) | ModelOutput::Response(text) => text,
        ModelOutput::Batch(items) => match items.into_iter().next() {
            Some(ModelOutput::Response(text)) => text,
            _ => NO_RESPONSE.to_string(),
        },
        ModelOutput::Unrecognized => NO_RESPONSE.to_string(),
    }
}

/// Chat-completion style language model. Mockable for testing.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn run(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<ModelOutput, AgentError>;
}

/// Language model served by the Workers AI REST API.
#[derive(Clone)]
pub struct WorkersAiModel {
    http: reqwest::Client,
    config: ModelConfig,
}

impl WorkersAiModel {
    pub fn new(http: reqwest::Client, config: ModelConfig) -> Self {
        Self { http, config }
    }

    /// Inference endpoint for `model_id` under the configured account.
    pub fn run_url(&self, model_id: &str) -> Result<String, AgentError> {
        let account_id = non_blank(&self.config.account_id)
            .ok_or_else(|| AgentError::Model("Missing model account_id".to_string()))?;
        Ok(format!(
            "{}/accounts/{account_id}/ai/run/{model_id}",
            self.config.base_url.trim_end_matches('/')
        ))
    }
}

#[async_trait]
impl LanguageModel for WorkersAiModel {
    async fn run(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<ModelOutput, AgentError> {
        let url = self.run_url(model_id)?;
        let token = non_blank(&self.config.api_token)
            .ok_or_else(|| AgentError::Model("Missing model api_token".to_string()))?;

        debug!(model = %model_id, messages = messages.len(), "Invoking language model");

        let body = serde_json::json!({
            "messages": messages,
            "max_tokens": max_tokens,
        });
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), model = %model_id, "Language model request failed");
            return Err(AgentError::Model(format!(
                "{model_id} returned {}: {text}",
                status.as_u16()
            )));
        }

        let envelope: Value = response.json().await?;
        Ok(ModelOutput::from_value(
            envelope.get("result").cloned().unwrap_or(Value::Null),
        ))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
