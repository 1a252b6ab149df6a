//! Read-only clients for the two upstream providers.
//!
//! Each fetch issues exactly one request and never retries; retrying is the
//! workflow engine's job.

pub mod content;
pub mod forecast;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use surfcast_models::forecast::RawForecastRow;
use surfcast_models::spot::SpotMetadata;

use crate::error::ContextError;

pub use content::ContentClient;
pub use forecast::ForecastClient;

/// Source of spot metadata. Mockable for testing.
#[async_trait]
pub trait SpotSource: Send + Sync {
    async fn fetch_spots(&self) -> Result<Vec<SpotMetadata>, ContextError>;
}

/// Source of forecast rows. Mockable for testing.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Rows for `spot_ids` with forecast times in `[start, end]`, ordered by time.
    async fn fetch_forecasts(
        &self,
        spot_ids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawForecastRow>, ContextError>;
}

/// Read a failed response body without letting a second failure mask the first.
pub(crate) async fn read_error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "<body unreadable>".to_string())
}

pub(crate) fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
