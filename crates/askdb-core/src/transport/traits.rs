//! Tool transport trait definition

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::types::ToolDescriptor;

/// Tool transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Tool call failed: {0}")]
    CallFailed(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Connection closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Result of one forwarded tool call
///
/// The payload is opaque to the transport; `is_error` carries the
/// tool-side failure flag unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeOutput {
    /// The tool's raw result content
    pub content: String,
    /// Whether the tool side reported a failure
    pub is_error: bool,
}

impl InvokeOutput {
    /// Create a successful output
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// Create a tool-side failure output
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Conduit to the tool-execution side
///
/// A transport failure out of [`invoke`](ToolTransport::invoke) is a typed
/// error, never a panic; the session loop folds it into an error outcome so
/// the reasoning engine can self-correct on its next turn.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// List the tools advertised by the tool-execution side
    async fn list_tools(&self) -> TransportResult<Vec<ToolDescriptor>>;

    /// Execute one named tool call
    async fn invoke(&self, name: &str, arguments: Value) -> TransportResult<InvokeOutput>;

    /// Tear down the connection (idempotent)
    async fn shutdown(&self) -> TransportResult<()>;
}
