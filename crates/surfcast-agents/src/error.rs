use std::time::Duration;

use surfcast_context::ContextError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Language model error: {0}")]
    Model(String),

    #[error("Workflow submission failed: {0}")]
    Submit(String),

    #[error("Workflow status poll failed: {0}")]
    Poll(String),

    #[error("Workflow failed: {0}")]
    WorkflowFailed(String),

    #[error("Workflow completed without output")]
    NoOutput,

    #[error("Workflow did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Request cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Surf context error: {0}")]
    Context(#[from] ContextError),
}
