//! Widget-side errors

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WidgetError {
    #[error("apiEndpoint is required")]
    MissingApiEndpoint,

    #[error("Invalid apiEndpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Auto-init enabled but data-api-endpoint not found")]
    AutoInitMissingEndpoint,

    /// A submission arrived while a response is still in flight
    #[error("A response is already in progress")]
    Busy,

    #[error("Relay returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    /// The relay reported a failure inside the stream
    #[error("{0}")]
    Stream(String),
}

impl From<reqwest::Error> for WidgetError {
    fn from(e: reqwest::Error) -> Self {
        WidgetError::Transport(e.to_string())
    }
}
