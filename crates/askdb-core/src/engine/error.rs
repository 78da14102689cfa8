//! Reasoning engine error types
//!
//! Engine failures are fatal to the current query: they propagate to the
//! query caller instead of being folded into the transcript.

use thiserror::Error;

/// Errors that can occur during a reasoning-engine submission
#[derive(Error, Debug)]
pub enum EngineError {
    /// API request failed
    #[error("{provider} API error: {message}")]
    Api { provider: String, message: String },

    /// Response could not be mapped to a block sequence
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    /// Submission exceeded the configured time bound
    #[error("Reasoning engine timed out")]
    Timeout,

    /// Submission was cancelled by the caller
    #[error("Request cancelled")]
    Cancelled,

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl EngineError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
