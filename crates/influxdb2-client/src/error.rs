//! InfluxDB client error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid server URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Non-2xx answer; `code` and `message` come from the InfluxDB error body.
    #[error("{code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
