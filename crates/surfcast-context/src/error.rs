use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to fetch {source_name}: {status} {body}")]
    Upstream {
        source_name: &'static str,
        status: u16,
        body: String,
    },

    #[error("No surf spots returned from the content provider")]
    NoSpots,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
