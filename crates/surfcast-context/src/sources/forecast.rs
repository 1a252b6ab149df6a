use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use surfcast_models::config::ForecastConfig;
use surfcast_models::forecast::RawForecastRow;
use tracing::{debug, warn};

use super::{read_error_body, required, ForecastSource};
use crate::error::ContextError;

pub const FORECAST_COLUMNS: [&str; 8] = [
    "spot_id",
    "forecast_time",
    "swell_height",
    "swell_period",
    "swell_direction",
    "wave_height",
    "wind_speed",
    "wind_direction",
];

/// Client for the forecast time-series provider.
#[derive(Clone)]
pub struct ForecastClient {
    http: reqwest::Client,
    config: ForecastConfig,
}

impl ForecastClient {
    pub fn new(http: reqwest::Client, config: ForecastConfig) -> Self {
        Self { http, config }
    }

    fn endpoint(&self) -> Result<(String, &str), ContextError> {
        let (Some(base_url), Some(api_key)) = (
            required(&self.config.base_url),
            required(&self.config.api_key),
        ) else {
            return Err(ContextError::Config(
                "Missing forecast provider configuration (base_url, api_key)".to_string(),
            ));
        };
        let base = base_url.trim_end_matches('/');
        Ok((format!("{base}/rest/v1/forecast_points"), api_key))
    }
}

/// Query parameters: column selection, spot membership, inclusive time
/// window and ascending time order.
pub fn forecast_query(
    spot_ids: &[String],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<(&'static str, String)> {
    let quoted: Vec<String> = spot_ids.iter().map(|id| format!("\"{id}\"")).collect();
    vec![
        ("select", FORECAST_COLUMNS.join(",")),
        ("spot_id", format!("in.({})", quoted.join(","))),
        (
            "forecast_time",
            format!("gte.{}", start.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ),
        (
            "forecast_time",
            format!("lte.{}", end.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ),
        ("order", "forecast_time".to_string()),
    ]
}

#[async_trait]
impl ForecastSource for ForecastClient {
    async fn fetch_forecasts(
        &self,
        spot_ids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawForecastRow>, ContextError> {
        let (url, api_key) = self.endpoint()?;
        if spot_ids.is_empty() {
            return Ok(Vec::new());
        }
        debug!(spots = spot_ids.len(), %start, %end, "Fetching forecasts");

        let response = self
            .http
            .get(&url)
            .query(&forecast_query(spot_ids, start, end))
            .header("apikey", api_key)
            .bearer_auth(api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            warn!(status = status.as_u16(), "Forecast provider request failed");
            return Err(ContextError::Upstream {
                source_name: "forecasts",
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await?;
        Ok(parse_forecast_response(body))
    }
}

/// Decode the row list. Non-array bodies and non-object rows are skipped.
pub fn parse_forecast_response(body: serde_json::Value) -> Vec<RawForecastRow> {
    match body {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}
