use serde::{Deserialize, Serialize};

pub const DEFAULT_CHAT_MODEL: &str = "@cf/meta/llama-3.3-70b-instruct-fp8-fast";
pub const DEFAULT_MODEL_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
pub const DEFAULT_CONTENT_API_VERSION: &str = "2023-06-06";
pub const DEFAULT_FORECAST_LOOKAHEAD_HOURS: u32 = 168;
pub const DEFAULT_CONTEXT_TTL_MINUTES: u32 = 30;

/// Top-level configuration. Every section and field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SurfcastConfig {
    pub model: ModelConfig,
    pub content: ContentConfig,
    pub forecast: ForecastConfig,
    pub context: ContextConfig,
    pub workflow: WorkflowConfig,
}

impl SurfcastConfig {
    /// Copy of every connection setting the advisor needs when it runs
    /// outside this process.
    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            content: self.content.clone(),
            forecast: self.forecast.clone(),
            context: self.context.clone(),
        }
    }
}

/// Language model selection and credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier. Blank or absent selects [`DEFAULT_CHAT_MODEL`].
    pub chat_model: Option<String>,
    pub account_id: Option<String>,
    pub api_token: Option<String>,
    pub base_url: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            chat_model: None,
            account_id: None,
            api_token: None,
            base_url: DEFAULT_MODEL_BASE_URL.to_string(),
        }
    }
}

impl ModelConfig {
    /// The configured model id with surrounding whitespace removed, if any.
    pub fn trimmed_chat_model(&self) -> Option<String> {
        non_blank(&self.chat_model)
    }
}

/// Resolve a model identifier, falling back to [`DEFAULT_CHAT_MODEL`].
pub fn resolve_chat_model(configured: Option<&str>) -> String {
    configured
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_CHAT_MODEL)
        .to_string()
}

/// Spot metadata (content provider) connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ContentConfig {
    pub project_id: Option<String>,
    pub dataset: Option<String>,
    pub api_version: Option<String>,
    pub token: Option<String>,
    /// Replaces the `https://{project_id}.apicdn.sanity.io` CDN host, e.g. for a proxy.
    pub api_host: Option<String>,
}

impl ContentConfig {
    /// API version with a leading `v`, defaulting to [`DEFAULT_CONTENT_API_VERSION`].
    pub fn resolved_api_version(&self) -> String {
        let version =
            non_blank(&self.api_version).unwrap_or_else(|| DEFAULT_CONTENT_API_VERSION.to_string());
        if version.starts_with('v') {
            version
        } else {
            format!("v{version}")
        }
    }
}

/// Forecast time-series provider connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ForecastConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

/// Context window and cache lifetime.
///
/// Stored as signed integers so that zero or negative values in the file
/// resolve to the defaults instead of failing to parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ContextConfig {
    pub lookahead_hours: Option<i64>,
    pub ttl_minutes: Option<i64>,
}

impl ContextConfig {
    pub fn resolved_lookahead_hours(&self) -> u32 {
        positive_or(self.lookahead_hours, DEFAULT_FORECAST_LOOKAHEAD_HOURS)
    }

    pub fn resolved_ttl_minutes(&self) -> u32 {
        positive_or(self.ttl_minutes, DEFAULT_CONTEXT_TTL_MINUTES)
    }
}

/// Durable workflow engine usage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    /// When false, advice is always generated inline.
    pub enabled: bool,
    pub poll_interval_ms: u64,
    /// Upper bound on the time spent polling one job before falling back inline.
    pub max_wait_seconds: u64,
    /// Attempts per named step inside the engine.
    pub max_step_attempts: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 200,
            max_wait_seconds: 60,
            max_step_attempts: 3,
        }
    }
}

/// Serializable copy of the connection configuration carried by a workflow job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ConnectionSnapshot {
    pub content: ContentConfig,
    pub forecast: ForecastConfig,
    pub context: ContextConfig,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn positive_or(value: Option<i64>, default: u32) -> u32 {
    match value {
        Some(v) if v > 0 => u32::try_from(v).unwrap_or(default),
        _ => default,
    }
}
