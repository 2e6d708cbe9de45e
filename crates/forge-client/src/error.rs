//! Error types for forge-client

use thiserror::Error;

/// Errors returned by the hosting provider client
#[derive(Error, Debug)]
pub enum ForgeError {
    /// No API token available
    #[error("missing API token: {0} is not set")]
    MissingToken(String),

    /// Provider answered with a status other than created / already exists
    #[error("provider API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Transport-level failure (DNS, TLS, connection)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body was not the expected JSON
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ForgeError {
    fn from(err: reqwest::Error) -> Self {
        ForgeError::Http(err.to_string())
    }
}
