use serde::{Deserialize, Serialize};

use crate::chat::{AdviceResult, ChatMessage};
use crate::config::ConnectionSnapshot;

/// Job parameters handed to the durable engine.
///
/// The engine runs jobs in an isolated context, so everything the advisor
/// needs travels inside `snapshot`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowParams {
    pub messages: Vec<ChatMessage>,
    pub chat_model: Option<String>,
    pub snapshot: ConnectionSnapshot,
}

/// Opaque identifier of a submitted job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct WorkflowHandle(pub String);

impl std::fmt::Display for WorkflowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state reported by the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    Queued,
    Running,
    Paused,
    Waiting,
    Complete,
    Errored,
    Terminated,
    /// Any state this client does not recognize. Treated as still in flight.
    #[serde(other)]
    Unknown,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::Complete | WorkflowState::Errored | WorkflowState::Terminated
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowStatus {
    pub state: WorkflowState,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub output: Option<AdviceResult>,
}

impl WorkflowStatus {
    pub fn pending(state: WorkflowState) -> Self {
        Self {
            state,
            error: None,
            output: None,
        }
    }

    pub fn complete(output: AdviceResult) -> Self {
        Self {
            state: WorkflowState::Complete,
            error: None,
            output: Some(output),
        }
    }

    pub fn failed(state: WorkflowState, error: impl Into<String>) -> Self {
        Self {
            state,
            error: Some(error.into()),
            output: None,
        }
    }
}
