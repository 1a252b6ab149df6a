pub mod advisor;
pub mod engine;
pub mod error;
pub mod model;
pub mod runner;
pub mod steps;

pub mod test_support;

pub use advisor::Advisor;
pub use engine::{AdvisorFactory, LocalWorkflowEngine, WorkflowEngine};
pub use error::AgentError;
pub use model::{extract_text, LanguageModel, ModelOutput, WorkersAiModel, MAX_TOKENS};
pub use runner::WorkflowRunner;
pub use steps::{RetryPolicy, StepRunner};
