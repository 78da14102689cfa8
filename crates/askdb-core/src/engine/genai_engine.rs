//! GenaiEngine - reasoning engine backed by the genai crate
//!
//! genai handles the provider protocols (OpenAI, Anthropic, Gemini, etc.),
//! SSE parsing, and tool calling. API keys resolve through genai's standard
//! environment lookup (e.g. ANTHROPIC_API_KEY).

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;

use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, ChatRequest, ChatStreamEvent,
    MessageContent as GenaiContent, Tool as GenaiTool, ToolCall as GenaiToolCall,
};
use genai::Client;

use crate::logging::Logger;
use crate::types::{CancellationToken, ContentBlock, Role, ToolCall, ToolDescriptor, Turn, TurnContent};

use super::error::{EngineError, EngineResult};
use super::traits::{ReasoningEngine, RespondOptions};

/// Reasoning engine backed by a genai-supported LLM provider
pub struct GenaiEngine {
    client: Client,
    logger: Arc<dyn Logger>,
}

impl GenaiEngine {
    /// Create a new engine with genai's default client
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            client: Client::default(),
            logger,
        }
    }

    /// Extract the model name from a provider-prefixed model string
    /// (e.g. "anthropic/claude-3-5-sonnet-20241022" -> "claude-3-5-sonnet-20241022")
    pub fn extract_model_name(model: &str) -> &str {
        model.split('/').nth(1).unwrap_or(model)
    }
}

#[async_trait]
impl ReasoningEngine for GenaiEngine {
    fn name(&self) -> &str {
        "genai"
    }

    async fn respond(
        &self,
        turns: &[Turn],
        tools: &[ToolDescriptor],
        options: &RespondOptions,
        cancel: CancellationToken,
    ) -> EngineResult<Vec<ContentBlock>> {
        let model_name = Self::extract_model_name(&options.model);
        self.logger.info(&format!(
            "[GenaiEngine] Submitting {} turns to model: {}",
            turns.len(),
            model_name
        ));

        let mut chat_req = ChatRequest::new(to_genai_messages(turns));
        if !tools.is_empty() {
            chat_req = chat_req.with_tools(to_genai_tools(tools));
        }
        let genai_options = to_genai_options(options);

        let chat_stream = self
            .client
            .exec_chat_stream(model_name, chat_req, Some(&genai_options))
            .await
            .map_err(|e| EngineError::api("genai", e.to_string()))?;

        // Fold the stream into one ordered block sequence: accumulated text
        // first, then tool calls in captured order.
        let mut stream = Box::pin(chat_stream.stream);
        let mut text = String::new();
        let mut calls: Vec<ToolCall> = Vec::new();

        while let Some(event) = stream.next().await {
            if cancel.is_cancelled() {
                self.logger.info("[GenaiEngine] Stream cancelled");
                return Err(EngineError::Cancelled);
            }

            match event.map_err(|e| EngineError::api("genai", e.to_string()))? {
                ChatStreamEvent::Chunk(chunk) => {
                    text.push_str(&chunk.content);
                }
                ChatStreamEvent::End(end) => {
                    if let Some(tool_calls) = end.captured_tool_calls() {
                        for tc in tool_calls.iter() {
                            calls.push(from_genai_tool_call(tc));
                        }
                    }
                }
                // Start, partial tool-call deltas, reasoning chunks
                _ => {}
            }
        }

        self.logger.debug(&format!(
            "[GenaiEngine] Response: {} text chars, {} tool calls",
            text.len(),
            calls.len()
        ));

        let mut blocks = Vec::new();
        if !text.trim().is_empty() {
            blocks.push(ContentBlock::text(text));
        }
        blocks.extend(calls.into_iter().map(ContentBlock::from));

        if blocks.is_empty() {
            return Err(EngineError::invalid_response("genai", "empty response"));
        }
        Ok(blocks)
    }
}

// ============================================================================
// Conversion: transcript -> genai
// ============================================================================

/// Convert a transcript to genai messages
///
/// genai's request shape is text-first, so structured turns are rendered
/// textually when resubmitted. Tool-result turns travel back under the user
/// role, matching the message layout the engine produced them against.
fn to_genai_messages(turns: &[Turn]) -> Vec<GenaiMessage> {
    turns.iter().map(to_genai_message).collect()
}

fn to_genai_message(turn: &Turn) -> GenaiMessage {
    let content = GenaiContent::from(render_content(&turn.content));
    match turn.role {
        Role::User | Role::ToolResult => GenaiMessage::user(content),
        Role::Assistant => GenaiMessage::assistant(content),
    }
}

fn render_content(content: &TurnContent) -> String {
    match content {
        TurnContent::Text(text) => text.clone(),
        TurnContent::Blocks(blocks) => blocks
            .iter()
            .map(render_block)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn render_block(block: &ContentBlock) -> String {
    match block {
        ContentBlock::Text { text } => text.clone(),
        ContentBlock::ToolCall { id, name, input } => {
            format!("[Tool call {} ({})]: {}", name, id, input)
        }
        ContentBlock::ToolOutcome {
            call_id,
            content,
            is_error,
        } => {
            if *is_error {
                format!("[Tool error for {}]: {}", call_id, content)
            } else {
                format!("[Tool result for {}]: {}", call_id, content)
            }
        }
    }
}

// ============================================================================
// Conversion: tool catalog -> genai
// ============================================================================

fn to_genai_tool(tool: &ToolDescriptor) -> GenaiTool {
    let mut genai_tool = GenaiTool::new(&tool.name).with_description(&tool.description);
    if let Some(schema) = &tool.input_schema {
        genai_tool = genai_tool.with_schema(schema.clone());
    }
    genai_tool
}

fn to_genai_tools(tools: &[ToolDescriptor]) -> Vec<GenaiTool> {
    tools.iter().map(to_genai_tool).collect()
}

fn to_genai_options(options: &RespondOptions) -> GenaiOptions {
    let mut genai_opts = GenaiOptions::default()
        .with_max_tokens(options.max_tokens)
        .with_capture_tool_calls(true);

    if let Some(temp) = options.temperature {
        genai_opts = genai_opts.with_temperature(temp as f64);
    }

    genai_opts
}

// ============================================================================
// Conversion: genai -> transcript
// ============================================================================

fn from_genai_tool_call(tc: &GenaiToolCall) -> ToolCall {
    ToolCall {
        id: tc.call_id.clone(),
        name: tc.fn_name.clone(),
        input: tc.fn_arguments.clone(),
    }
}
