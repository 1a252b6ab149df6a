use std::sync::Arc;

use surfcast_context::prompts::fallback_prompt;
use surfcast_context::{ContentClient, ContextBuilder, ForecastClient, PromptCache};
use surfcast_models::chat::{AdviceResult, ChatMessage};
use surfcast_models::config::{resolve_chat_model, ConnectionSnapshot};
use tracing::{error, info};

use crate::error::AgentError;
use crate::model::{extract_text, LanguageModel, MAX_TOKENS};
use crate::steps::StepRunner;

/// Step name for system prompt construction.
pub const BUILD_CONTEXT_STEP: &str = "build-surf-context";
/// Step name for the model call.
pub const INVOKE_MODEL_STEP: &str = "invoke-ai";

/// Turns a chat history into a surf recommendation.
pub struct Advisor {
    context: ContextBuilder,
    model: Arc<dyn LanguageModel>,
    model_id: String,
}

impl Advisor {
    /// `chat_model` falls back to the default model when absent or blank.
    pub fn new(
        context: ContextBuilder,
        model: Arc<dyn LanguageModel>,
        chat_model: Option<&str>,
    ) -> Self {
        Self {
            context,
            model,
            model_id: resolve_chat_model(chat_model),
        }
    }

    /// Rebuild an advisor from a serialized connection snapshot, wiring the
    /// real provider clients.
    pub fn from_snapshot(
        snapshot: &ConnectionSnapshot,
        chat_model: Option<&str>,
        http: reqwest::Client,
        cache: Arc<PromptCache>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        let context = ContextBuilder::new(
            Arc::new(ContentClient::new(http.clone(), snapshot.content.clone())),
            Arc::new(ForecastClient::new(http, snapshot.forecast.clone())),
            cache,
            snapshot.context.clone(),
        );
        Self::new(context, model, chat_model)
    }

    /// The live context prompt, or the fallback prompt carrying the failure
    /// reason. Never fails.
    pub async fn resolve_system_prompt(&self) -> String {
        match self.context.system_prompt().await {
            Ok(prompt) => prompt,
            Err(e) => {
                error!(error = %e, "Surf context generation failed, using fallback prompt");
                fallback_prompt(&e.to_string())
            }
        }
    }

    /// Generate advice with every step run once.
    pub async fn generate_advice(
        &self,
        history: &[ChatMessage],
    ) -> Result<AdviceResult, AgentError> {
        self.generate_advice_in(history, &StepRunner::inline()).await
    }

    /// Generate advice, running the context and model steps through `steps`.
    pub async fn generate_advice_in(
        &self,
        history: &[ChatMessage],
        steps: &StepRunner,
    ) -> Result<AdviceResult, AgentError> {
        let system_prompt = steps
            .run(BUILD_CONTEXT_STEP, move || async move {
                Ok(self.resolve_system_prompt().await)
            })
            .await?;

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(system_prompt.clone()));
        messages.extend_from_slice(history);

        let model = &self.model;
        let model_id = self.model_id.as_str();
        let messages = messages.as_slice();
        let output = steps
            .run(INVOKE_MODEL_STEP, move || {
                model.run(model_id, messages, MAX_TOKENS)
            })
            .await?;

        info!(
            model = %self.model_id,
            prompt_length = system_prompt.len(),
            history = history.len(),
            "Surf advice generated"
        );

        Ok(AdviceResult {
            response_text: extract_text(output),
            model_id: self.model_id.clone(),
            system_prompt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelOutput, NO_RESPONSE};
    use crate::test_support::{advisor_with, sample_spot, ScriptedModel, StaticForecasts, StaticSpots};
    use serde_json::json;
    use surfcast_models::chat::Role;
    use surfcast_models::config::DEFAULT_CHAT_MODEL;

    #[tokio::test]
    async fn prepends_system_prompt_to_history() {
        let model = Arc::new(ScriptedModel::replying(json!({"response": "Surf Bells at 7am"})));
        let advisor = advisor_with(
            StaticSpots::new(vec![sample_spot("bells", "Bells Beach")]),
            StaticForecasts::empty(),
            model.clone(),
            Some("@cf/test/model"),
        );

        let history = vec![
            ChatMessage::user("Where tomorrow morning?"),
            ChatMessage::assistant("Which region?"),
            ChatMessage::user("Victoria"),
        ];
        let result = advisor.generate_advice(&history).await.unwrap();

        assert_eq!(result.response_text, "Surf Bells at 7am");
        assert_eq!(result.model_id, "@cf/test/model");
        assert!(result.system_prompt.contains("Bells Beach"));

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        let (model_id, sent) = &calls[0];
        assert_eq!(model_id, "@cf/test/model");
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].role, Role::System);
        assert_eq!(sent[0].content, result.system_prompt);
        assert_eq!(&sent[1..], history.as_slice());
    }

    #[tokio::test]
    async fn context_failure_uses_fallback_prompt() {
        let model = Arc::new(ScriptedModel::replying(json!("Generic advice")));
        let advisor = advisor_with(
            StaticSpots::new(vec![]),
            StaticForecasts::empty(),
            model,
            None,
        );

        let result = advisor
            .generate_advice(&[ChatMessage::user("Any waves?")])
            .await
            .unwrap();

        assert_eq!(result.model_id, DEFAULT_CHAT_MODEL);
        assert!(result
            .system_prompt
            .contains("Surf data is currently unavailable"));
        assert!(result.system_prompt.contains("No surf spots"));
        assert_eq!(result.response_text, "Generic advice");
    }

    #[tokio::test]
    async fn unusable_model_output_yields_placeholder() {
        let advisor = advisor_with(
            StaticSpots::new(vec![sample_spot("bells", "Bells Beach")]),
            StaticForecasts::empty(),
            Arc::new(ScriptedModel::new(vec![], ModelOutput::Unrecognized)),
            Some("   "),
        );
        let result = advisor.generate_advice(&[]).await.unwrap();
        assert_eq!(result.response_text, NO_RESPONSE);
        assert_eq!(result.model_id, DEFAULT_CHAT_MODEL);
    }

    #[tokio::test]
    async fn model_step_is_retried_by_step_runner() {
        let model = Arc::new(ScriptedModel::failing_then(2, json!({"response": "ok"})));
        let advisor = advisor_with(
            StaticSpots::new(vec![sample_spot("bells", "Bells Beach")]),
            StaticForecasts::empty(),
            model.clone(),
            None,
        );

        let inline = advisor.generate_advice(&[]).await;
        assert!(matches!(inline, Err(AgentError::Model(_))));

        let steps = StepRunner::new(crate::steps::RetryPolicy {
            max_attempts: 2,
            initial_backoff: std::time::Duration::from_millis(1),
            max_backoff: std::time::Duration::from_millis(1),
        });
        let result = advisor.generate_advice_in(&[], &steps).await.unwrap();
        assert_eq!(result.response_text, "ok");
        assert_eq!(model.calls().len(), 3);
    }
}
