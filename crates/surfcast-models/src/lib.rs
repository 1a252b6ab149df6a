pub mod chat;
pub mod config;
pub mod context;
mod de;
pub mod forecast;
pub mod spot;
pub mod workflow;

pub use chat::{AdviceResult, ChatMessage, ChatRequest, Role};
pub use config::{
    ConnectionSnapshot, ContentConfig, ContextConfig, ForecastConfig, ModelConfig,
    SurfcastConfig, WorkflowConfig,
};
pub use context::SurfContextPayload;
pub use forecast::{Quality, RawForecastRow, SimplifiedForecastPoint};
pub use spot::{SpotMetadata, SurfSpotContext};
pub use workflow::{WorkflowHandle, WorkflowParams, WorkflowState, WorkflowStatus};
