use std::sync::Arc;
use std::time::Duration;

use surfcast_models::chat::{AdviceResult, ChatMessage};
use surfcast_models::config::{ConnectionSnapshot, WorkflowConfig};
use surfcast_models::workflow::{WorkflowHandle, WorkflowParams, WorkflowState};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::advisor::Advisor;
use crate::engine::WorkflowEngine;
use crate::error::AgentError;

/// Runs advice generation on the durable engine when one is available,
/// falling back to inline generation otherwise.
pub struct WorkflowRunner {
    engine: Option<Arc<dyn WorkflowEngine>>,
    advisor: Arc<Advisor>,
    chat_model: Option<String>,
    snapshot: ConnectionSnapshot,
    poll_interval: Duration,
    max_wait: Duration,
}

impl WorkflowRunner {
    /// An inline-only runner. Attach an engine with [`WorkflowRunner::with_engine`].
    pub fn new(
        advisor: Arc<Advisor>,
        snapshot: ConnectionSnapshot,
        chat_model: Option<String>,
    ) -> Self {
        let defaults = WorkflowConfig::default();
        Self {
            engine: None,
            advisor,
            chat_model,
            snapshot,
            poll_interval: Duration::from_millis(defaults.poll_interval_ms),
            max_wait: Duration::from_secs(defaults.max_wait_seconds),
        }
    }

    pub fn with_engine(mut self, engine: Arc<dyn WorkflowEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_polling(mut self, poll_interval: Duration, max_wait: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.max_wait = max_wait;
        self
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// Produce advice for `messages`.
    ///
    /// Any engine failure (submission, polling, an errored or terminated
    /// job, a job without output, or the poll deadline) falls back to inline
    /// generation. Cancellation returns [`AgentError::Cancelled`] without
    /// falling back.
    pub async fn execute(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> Result<AdviceResult, AgentError> {
        let Some(engine) = &self.engine else {
            warn!("Workflow engine unavailable; generating advice inline");
            return self.inline(messages, cancel).await;
        };

        let params = WorkflowParams {
            messages: messages.to_vec(),
            chat_model: self.chat_model.clone(),
            snapshot: self.snapshot.clone(),
        };

        match self.run_durable(engine.as_ref(), params, cancel).await {
            Ok(result) => Ok(result),
            Err(AgentError::Cancelled) => {
                info!("Request cancelled while waiting on workflow");
                Err(AgentError::Cancelled)
            }
            Err(e) => {
                error!(error = %e, "Workflow execution failed, falling back to inline generation");
                self.inline(messages, cancel).await
            }
        }
    }

    async fn inline(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> Result<AdviceResult, AgentError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Cancelled),
            result = self.advisor.generate_advice(messages) => result,
        }
    }

    async fn run_durable(
        &self,
        engine: &dyn WorkflowEngine,
        params: WorkflowParams,
        cancel: &CancellationToken,
    ) -> Result<AdviceResult, AgentError> {
        let handle = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AgentError::Cancelled),
            handle = engine.submit(params) => handle?,
        };
        info!(handle = %handle, "Workflow submitted");

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Cancelled),
            polled = tokio::time::timeout(self.max_wait, self.wait_for_completion(engine, &handle)) => {
                polled.unwrap_or(Err(AgentError::DeadlineExceeded(self.max_wait)))
            }
        };

        if matches!(
            outcome,
            Err(AgentError::Cancelled) | Err(AgentError::DeadlineExceeded(_))
        ) {
            if let Err(e) = engine.terminate(&handle).await {
                warn!(handle = %handle, error = %e, "Failed to terminate abandoned workflow");
            }
        }
        outcome
    }

    async fn wait_for_completion(
        &self,
        engine: &dyn WorkflowEngine,
        handle: &WorkflowHandle,
    ) -> Result<AdviceResult, AgentError> {
        loop {
            let status = engine.status(handle).await?;
            match status.state {
                WorkflowState::Complete => return status.output.ok_or(AgentError::NoOutput),
                WorkflowState::Errored | WorkflowState::Terminated => {
                    return Err(AgentError::WorkflowFailed(
                        status.error.unwrap_or_else(|| "Workflow failed.".to_string()),
                    ));
                }
                state => debug!(handle = %handle, ?state, "Workflow still in flight"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        advisor_with, sample_spot, ScriptedEngine, ScriptedModel, StaticForecasts, StaticSpots,
    };
    use serde_json::json;
    use surfcast_models::workflow::WorkflowStatus;

    fn advisor(reply: &str) -> (Arc<ScriptedModel>, Arc<Advisor>) {
        let model = Arc::new(ScriptedModel::replying(json!({ "response": reply })));
        let advisor = advisor_with(
            StaticSpots::new(vec![sample_spot("bells", "Bells Beach")]),
            StaticForecasts::empty(),
            model.clone(),
            None,
        );
        (model, Arc::new(advisor))
    }

    fn durable_result() -> AdviceResult {
        AdviceResult {
            response_text: "from engine".to_string(),
            model_id: "@cf/engine/model".to_string(),
            system_prompt: "engine prompt".to_string(),
        }
    }

    fn runner(advisor: Arc<Advisor>, engine: Arc<ScriptedEngine>) -> WorkflowRunner {
        WorkflowRunner::new(advisor, ConnectionSnapshot::default(), Some("@cf/x".to_string()))
            .with_engine(engine)
            .with_polling(Duration::from_millis(1), Duration::from_secs(5))
    }

    fn history() -> Vec<ChatMessage> {
        vec![ChatMessage::user("Saturday dawn?")]
    }

    #[tokio::test]
    async fn no_engine_runs_inline() {
        let (model, advisor) = advisor("inline reply");
        let runner = WorkflowRunner::new(advisor, ConnectionSnapshot::default(), None);
        assert!(!runner.has_engine());

        let result = runner
            .execute(&history(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.response_text, "inline reply");
        assert!(!result.system_prompt.is_empty());
        assert!(!result.model_id.is_empty());
        assert_eq!(model.calls().len(), 1);
    }

    #[tokio::test]
    async fn polls_until_complete() {
        let (model, advisor) = advisor("inline reply");
        let engine = Arc::new(ScriptedEngine::new(vec![
            WorkflowStatus::pending(WorkflowState::Queued),
            WorkflowStatus::pending(WorkflowState::Running),
            WorkflowStatus::pending(WorkflowState::Unknown),
            WorkflowStatus::complete(durable_result()),
        ]));

        let result = runner(advisor, engine.clone())
            .execute(&history(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result, durable_result());
        assert_eq!(engine.polls(), 4);
        assert!(model.calls().is_empty());

        let submitted = engine.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].messages, history());
        assert_eq!(submitted[0].chat_model.as_deref(), Some("@cf/x"));
    }

    #[tokio::test]
    async fn errored_job_falls_back_inline() {
        let (model, advisor) = advisor("inline reply");
        let engine = Arc::new(ScriptedEngine::new(vec![WorkflowStatus::failed(
            WorkflowState::Errored,
            "step exhausted retries",
        )]));

        let result = runner(advisor, engine)
            .execute(&history(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.response_text, "inline reply");
        assert_eq!(model.calls().len(), 1);
    }

    #[tokio::test]
    async fn poll_failure_falls_back_inline() {
        let (model, advisor) = advisor("inline reply");
        let engine = Arc::new(ScriptedEngine::new(vec![]));

        let result = runner(advisor, engine.clone())
            .execute(&history(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.response_text, "inline reply");
        assert_eq!(engine.submitted().len(), 1);
        assert_eq!(engine.polls(), 1);
        assert_eq!(model.calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_job_reports_engine_error_text() {
        let (_, advisor) = advisor("inline reply");
        let handle = WorkflowHandle("scripted-1".to_string());

        let engine = Arc::new(ScriptedEngine::new(vec![
            WorkflowStatus::pending(WorkflowState::Running),
            WorkflowStatus::failed(WorkflowState::Errored, "step exhausted retries"),
        ]));
        let result = runner(advisor.clone(), engine.clone())
            .wait_for_completion(engine.as_ref(), &handle)
            .await;
        match result {
            Err(AgentError::WorkflowFailed(reason)) => {
                assert_eq!(reason, "step exhausted retries")
            }
            other => panic!("expected workflow failure, got {other:?}"),
        }

        let engine = Arc::new(ScriptedEngine::new(vec![WorkflowStatus::pending(
            WorkflowState::Terminated,
        )]));
        let result = runner(advisor, engine.clone())
            .wait_for_completion(engine.as_ref(), &handle)
            .await;
        assert!(matches!(
            result,
            Err(AgentError::WorkflowFailed(reason)) if reason == "Workflow failed."
        ));
    }

    #[tokio::test]
    async fn complete_without_output_falls_back_inline() {
        let (_, advisor) = advisor("inline reply");
        let engine = Arc::new(ScriptedEngine::new(vec![WorkflowStatus::pending(
            WorkflowState::Complete,
        )]));

        let result = runner(advisor, engine)
            .execute(&history(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.response_text, "inline reply");
    }

    #[tokio::test]
    async fn submit_failure_falls_back_inline() {
        let (_, advisor) = advisor("inline reply");
        let engine = Arc::new(ScriptedEngine::rejecting());

        let result = runner(advisor, engine.clone())
            .execute(&history(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.response_text, "inline reply");
        assert_eq!(engine.polls(), 0);
    }

    #[tokio::test]
    async fn deadline_falls_back_and_terminates_job() {
        let (_, advisor) = advisor("inline reply");
        let engine = Arc::new(ScriptedEngine::new(vec![WorkflowStatus::pending(
            WorkflowState::Waiting,
        )]));

        let result = runner(advisor, engine.clone())
            .with_polling(Duration::from_millis(1), Duration::from_millis(30))
            .execute(&history(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.response_text, "inline reply");
        assert_eq!(engine.terminated().len(), 1);
    }

    #[tokio::test]
    async fn cancellation_skips_fallback() {
        let (model, advisor) = advisor("inline reply");
        let engine = Arc::new(ScriptedEngine::new(vec![WorkflowStatus::pending(
            WorkflowState::Running,
        )]));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = runner(advisor, engine.clone())
            .execute(&history(), &cancel)
            .await;
        assert!(matches!(result, Err(AgentError::Cancelled)));
        assert!(model.calls().is_empty());
        assert_eq!(engine.terminated().len(), 1);
    }
}
