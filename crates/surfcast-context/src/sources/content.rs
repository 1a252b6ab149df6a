use async_trait::async_trait;
use surfcast_models::config::ContentConfig;
use surfcast_models::spot::SpotMetadata;
use tracing::{debug, warn};

use super::{read_error_body, required, SpotSource};
use crate::error::ContextError;

/// Structured query selecting every surf spot document and the fields the
/// context needs.
pub const SPOT_QUERY: &str = r#"*[_type == "surfSpot"]{
  _id,
  name,
  description,
  region,
  difficulty,
  crowd,
  typeOfBreak,
  idealWind,
  idealSwellDirection,
  swellSize,
  tideGuide,
  hazards,
  seabed,
  waterQuality
}"#;

/// Client for the content provider holding spot metadata.
#[derive(Clone)]
pub struct ContentClient {
    http: reqwest::Client,
    config: ContentConfig,
}

impl ContentClient {
    pub fn new(http: reqwest::Client, config: ContentConfig) -> Self {
        Self { http, config }
    }

    /// Query endpoint for the configured project and dataset.
    pub fn query_url(&self) -> Result<String, ContextError> {
        let (Some(project_id), Some(dataset)) = (
            required(&self.config.project_id),
            required(&self.config.dataset),
        ) else {
            return Err(ContextError::Config(
                "Missing content provider configuration (project_id, dataset)".to_string(),
            ));
        };

        let host = match required(&self.config.api_host) {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => format!("https://{project_id}.apicdn.sanity.io"),
        };
        Ok(format!(
            "{host}/{}/data/query/{dataset}",
            self.config.resolved_api_version()
        ))
    }
}

#[async_trait]
impl SpotSource for ContentClient {
    async fn fetch_spots(&self) -> Result<Vec<SpotMetadata>, ContextError> {
        let url = self.query_url()?;
        debug!(url = %url, "Fetching surf spots");

        let mut request = self.http.get(&url).query(&[("query", SPOT_QUERY)]);
        if let Some(token) = required(&self.config.token) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            warn!(status = status.as_u16(), "Content provider request failed");
            return Err(ContextError::Upstream {
                source_name: "surf spots",
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await?;
        Ok(parse_spot_response(body))
    }
}

/// Extract the `result` list. A body without one is an empty list, not an
/// error. Documents that are not objects or carry no usable `_id` are skipped.
pub fn parse_spot_response(body: serde_json::Value) -> Vec<SpotMetadata> {
    let items = match body {
        serde_json::Value::Object(mut fields) => match fields.remove("result") {
            Some(serde_json::Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    let total = items.len();
    let spots: Vec<SpotMetadata> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<SpotMetadata>(item).ok())
        .filter(|spot| !spot.id.is_empty())
        .collect();
    if spots.len() < total {
        warn!(
            skipped = total - spots.len(),
            "Skipped malformed surf spot documents"
        );
    }
    spots
}
