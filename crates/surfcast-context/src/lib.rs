pub mod builder;
pub mod cache;
pub mod clock;
pub mod error;
pub mod normalizer;
pub mod prompts;
pub mod sources;

pub use builder::{ContextBuilder, MAX_POINTS_PER_SPOT};
pub use cache::{CachedPrompt, PromptCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ContextError;
pub use sources::{ContentClient, ForecastClient, ForecastSource, SpotSource};
