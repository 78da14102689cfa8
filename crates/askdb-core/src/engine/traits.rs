//! Reasoning engine trait definition

use async_trait::async_trait;

use crate::types::{CancellationToken, ContentBlock, ToolDescriptor, Turn};

use super::error::EngineResult;

/// Options for one reasoning-engine submission
#[derive(Debug, Clone)]
pub struct RespondOptions {
    /// Model identifier, optionally provider-prefixed (e.g. "anthropic/claude-3-5-sonnet-20241022")
    pub model: String,
    /// Maximum output size bound
    pub max_tokens: u32,
    /// Temperature for response generation
    pub temperature: Option<f32>,
}

impl RespondOptions {
    /// Create options for a model with default bounds
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: 4096,
            temperature: None,
        }
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }
}

/// Reasoning engine trait
///
/// One call is one turn: the full transcript and the tool catalog go in,
/// an ordered block sequence comes out. The engine never executes tools
/// itself; tool calls in the response are dispatched by the session loop.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Get the engine name (e.g. "genai", "scripted")
    fn name(&self) -> &str;

    /// Produce the next response for the given transcript
    async fn respond(
        &self,
        turns: &[Turn],
        tools: &[ToolDescriptor],
        options: &RespondOptions,
        cancel: CancellationToken,
    ) -> EngineResult<Vec<ContentBlock>>;
}
