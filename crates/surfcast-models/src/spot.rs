use serde::{Deserialize, Serialize};

use crate::de::{lenient_document_id, lenient_string_list, lenient_text};
use crate::forecast::SimplifiedForecastPoint;

pub const UNNAMED_SPOT: &str = "Unnamed spot";
pub const UNKNOWN_REGION: &str = "Unknown region";
pub const NO_DESCRIPTION: &str = "No description provided.";
pub const NOT_RATED: &str = "Not rated";
pub const NO_CROWD_DATA: &str = "No crowd data";
pub const NO_TIDE_PREFERENCE: &str = "No tide preference recorded";
pub const WATER_QUALITY_UNSPECIFIED: &str = "Not specified";

/// Static descriptive record for a surf spot, as stored by the content provider.
///
/// Blank or mistyped text fields decode as `None`; list fields keep only
/// their non-blank strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SpotMetadata {
    #[serde(rename = "_id", default, deserialize_with = "lenient_document_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub difficulty: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub crowd: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub type_of_break: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub ideal_wind: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub ideal_swell_direction: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub swell_size: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub tide_guide: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub hazards: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub seabed: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub water_quality: Option<String>,
}

impl SpotMetadata {
    pub fn with_id(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }
}

/// Spot metadata joined with its bounded, time-ordered forecast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SurfSpotContext {
    pub id: String,
    pub name: String,
    pub region: String,
    pub description: String,
    pub difficulty: String,
    pub crowd: String,
    pub type_of_break: Vec<String>,
    pub ideal_wind: Vec<String>,
    pub ideal_swell_direction: Vec<String>,
    pub swell_size: Vec<String>,
    pub tide_guide: String,
    pub hazards: Vec<String>,
    pub seabed: Vec<String>,
    pub ideal_water_quality: String,
    pub forecast: Vec<SimplifiedForecastPoint>,
    pub forecast_count: usize,
    pub forecast_start_utc: Option<String>,
    pub forecast_end_utc: Option<String>,
}

fn or_fallback(value: &Option<String>, fallback: &str) -> String {
    value.clone().unwrap_or_else(|| fallback.to_string())
}

impl SurfSpotContext {
    /// Join a spot with its already sorted and downsampled forecast, filling
    /// absent text fields with their fallbacks.
    pub fn new(spot: &SpotMetadata, forecast: Vec<SimplifiedForecastPoint>) -> Self {
        let forecast_start_utc = forecast.first().map(|p| p.time_utc.clone());
        let forecast_end_utc = forecast.last().map(|p| p.time_utc.clone());

        Self {
            id: spot.id.clone(),
            name: or_fallback(&spot.name, UNNAMED_SPOT),
            region: or_fallback(&spot.region, UNKNOWN_REGION),
            description: or_fallback(&spot.description, NO_DESCRIPTION),
            difficulty: or_fallback(&spot.difficulty, NOT_RATED),
            crowd: or_fallback(&spot.crowd, NO_CROWD_DATA),
            type_of_break: spot.type_of_break.clone(),
            ideal_wind: spot.ideal_wind.clone(),
            ideal_swell_direction: spot.ideal_swell_direction.clone(),
            swell_size: spot.swell_size.clone(),
            tide_guide: or_fallback(&spot.tide_guide, NO_TIDE_PREFERENCE),
            hazards: spot.hazards.clone(),
            seabed: spot.seabed.clone(),
            ideal_water_quality: or_fallback(&spot.water_quality, WATER_QUALITY_UNSPECIFIED),
            forecast_count: forecast.len(),
            forecast_start_utc,
            forecast_end_utc,
            forecast,
        }
    }
}
