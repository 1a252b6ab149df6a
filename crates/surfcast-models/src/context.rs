use serde::{Deserialize, Serialize};

use crate::spot::SurfSpotContext;

/// Full context for one cache generation. One payload renders to one prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SurfContextPayload {
    /// RFC 3339 with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`.
    pub generated_at_utc: String,
    pub forecast_horizon_hours: u32,
    pub spots: Vec<SurfSpotContext>,
}
