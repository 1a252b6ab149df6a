//! Surfcast - surf recommendation chat orchestration.
//!
//! Builds a surf context prompt from spot metadata and forecasts, hands it
//! with the chat history to a language model, and runs the whole thing on a
//! durable workflow engine with an inline fallback.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use surfcast::models::{ChatMessage, SurfcastConfig};
//! use surfcast::agents::{Advisor, WorkflowRunner};
//! use surfcast::context::{ContextBuilder, PromptCache};
//! ```

pub use surfcast_agents as agents;
pub use surfcast_context as context;
pub use surfcast_models as models;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use surfcast_agents::{
    Advisor, AdvisorFactory, LanguageModel, LocalWorkflowEngine, RetryPolicy, StepRunner,
    WorkersAiModel, WorkflowRunner,
};
use surfcast_context::PromptCache;
use surfcast_models::chat::ChatRequest;
use surfcast_models::config::SurfcastConfig;
use surfcast_models::workflow::WorkflowParams;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Reply sent whenever advice could not be produced.
pub const APOLOGY: &str = "Sorry, the surf assistant ran into an issue generating a recommendation. Please try again shortly.";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Caller mistakes. Everything else degrades to [`APOLOGY`].
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("messages array is required")]
    MissingMessages,
}

/// Read and parse a TOML configuration file.
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<SurfcastConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Build a runner from configuration. The in-process engine is attached
/// unless `workflow.enabled` is false.
pub fn build_runner(config: &SurfcastConfig) -> anyhow::Result<WorkflowRunner> {
    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;
    let model: Arc<dyn LanguageModel> =
        Arc::new(WorkersAiModel::new(http.clone(), config.model.clone()));
    let cache = Arc::new(PromptCache::with_system_clock());
    let snapshot = config.snapshot();
    let chat_model = config.model.trimmed_chat_model();

    let advisor = Arc::new(Advisor::from_snapshot(
        &snapshot,
        chat_model.as_deref(),
        http.clone(),
        cache.clone(),
        model.clone(),
    ));

    let runner = WorkflowRunner::new(advisor, snapshot, chat_model).with_polling(
        Duration::from_millis(config.workflow.poll_interval_ms),
        Duration::from_secs(config.workflow.max_wait_seconds),
    );

    if !config.workflow.enabled {
        info!("Workflow engine disabled; advice will be generated inline");
        return Ok(runner);
    }

    // Jobs rebuild their advisor from the snapshot they carry.
    let factory: AdvisorFactory = Arc::new(move |params: &WorkflowParams| {
        Advisor::from_snapshot(
            &params.snapshot,
            params.chat_model.as_deref(),
            http.clone(),
            cache.clone(),
            model.clone(),
        )
    });
    let steps = StepRunner::new(RetryPolicy::attempts(config.workflow.max_step_attempts));
    Ok(runner.with_engine(Arc::new(LocalWorkflowEngine::new(factory, steps))))
}

/// Answer one chat request body.
pub async fn respond(runner: &WorkflowRunner, body: &str) -> Result<String, RequestError> {
    respond_until(runner, body, &CancellationToken::new()).await
}

/// Like [`respond`], abandoning the work once `cancel` fires.
pub async fn respond_until(
    runner: &WorkflowRunner,
    body: &str,
    cancel: &CancellationToken,
) -> Result<String, RequestError> {
    let request: ChatRequest = serde_json::from_str(body)?;
    if request.messages.is_empty() {
        return Err(RequestError::MissingMessages);
    }

    match runner.execute(&request.messages, cancel).await {
        Ok(result) => Ok(result.response_text),
        Err(e) => {
            error!(error = %e, "Surf advisor failed");
            Ok(APOLOGY.to_string())
        }
    }
}
