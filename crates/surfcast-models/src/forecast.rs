use serde::{Deserialize, Serialize};

use crate::de::{lenient_id, lenient_number};

/// One timestamped row from the forecast provider, as received.
///
/// Numeric fields that are missing or not numbers decode as `None` independently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RawForecastRow {
    #[serde(default, deserialize_with = "lenient_id")]
    pub spot_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub forecast_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub swell_height: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub swell_period: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub swell_direction: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub wave_height: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub wind_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub wind_direction: Option<f64>,
}

impl RawForecastRow {
    /// A row with only the identifying fields set.
    pub fn at(spot_id: &str, forecast_time: &str) -> Self {
        Self {
            spot_id: Some(spot_id.to_string()),
            forecast_time: Some(forecast_time.to_string()),
            ..Self::default()
        }
    }
}

/// Categorical rating of a forecast point's surf conditions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Quality {
    Good,
    Fair,
    Poor,
}

/// Display-ready projection of a [`RawForecastRow`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimplifiedForecastPoint {
    /// Timestamp string exactly as the provider sent it.
    pub time_utc: String,
    /// Human-readable rendering, e.g. `Mon, Jan 1, 03:00 AM`.
    pub time_local: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub swell_height_m: Option<f64>,
    pub swell_period_s: Option<f64>,
    pub swell_direction_deg: Option<i32>,
    pub swell_direction_text: Option<String>,
    pub wave_height_m: Option<f64>,
    pub wind_speed_kph: Option<f64>,
    pub wind_direction_deg: Option<i32>,
    pub wind_direction_text: Option<String>,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_numeric_fields_decode_as_none() {
        let row: RawForecastRow = serde_json::from_value(serde_json::json!({
            "spot_id": "a",
            "forecast_time": "2024-01-01T00:00:00Z",
            "swell_height": "1.5",
            "swell_period": null,
            "swell_direction": 180,
            "wind_speed": true,
        }))
        .unwrap();

        assert_eq!(row.spot_id.as_deref(), Some("a"));
        assert_eq!(row.swell_height, None);
        assert_eq!(row.swell_period, None);
        assert_eq!(row.swell_direction, Some(180.0));
        assert_eq!(row.wave_height, None);
        assert_eq!(row.wind_speed, None);
    }

    #[test]
    fn empty_spot_id_decodes_as_none() {
        let row: RawForecastRow =
            serde_json::from_value(serde_json::json!({"spot_id": "", "forecast_time": "x"}))
                .unwrap();
        assert!(row.spot_id.is_none());
    }

    #[test]
    fn point_serializes_camel_case() {
        let point = SimplifiedForecastPoint {
            time_utc: "2024-01-01T00:00:00Z".to_string(),
            time_local: "Mon, Jan 1, 12:00 AM".to_string(),
            timestamp: 1_704_067_200_000,
            swell_height_m: Some(1.54),
            swell_period_s: Some(10.4),
            swell_direction_deg: Some(203),
            swell_direction_text: Some("SSW".to_string()),
            wave_height_m: None,
            wind_speed_kph: None,
            wind_direction_deg: None,
            wind_direction_text: None,
            quality: Quality::Good,
        };
        let value = serde_json::to_value(&point).unwrap();
        assert_eq!(value["swellHeightM"], serde_json::json!(1.54));
        assert_eq!(value["swellDirectionDeg"], serde_json::json!(203));
        assert_eq!(value["quality"], "GOOD");
        assert!(value["waveHeightM"].is_null());
    }
}
