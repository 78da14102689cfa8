//! Conversation transcript types
//!
//! A query transcript is an ordered sequence of [`Turn`]s. Turns are never
//! mutated after they are appended; corrections show up as new turns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::tool::{ToolCall, ToolOutcome};

/// Attribution of one transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Assistant,
    ToolResult,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::ToolResult => write!(f, "tool-result"),
        }
    }
}

/// One entry in the conversation transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced this turn
    pub role: Role,
    /// The content of the turn (plain text or structured blocks)
    pub content: TurnContent,
}

impl Turn {
    /// Create a user turn with plain text content
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Text(text.into()),
        }
    }

    /// Create an assistant turn from a block sequence
    pub fn assistant(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::Blocks(blocks),
        }
    }

    /// Create a tool-result turn from one round of outcomes
    pub fn tool_results(outcomes: Vec<ToolOutcome>) -> Self {
        Self {
            role: Role::ToolResult,
            content: TurnContent::Blocks(
                outcomes.into_iter().map(ContentBlock::from).collect(),
            ),
        }
    }

    /// Get the text content if this is a plain text turn
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            TurnContent::Text(s) => Some(s),
            TurnContent::Blocks(_) => None,
        }
    }

    /// Get the block sequence if this is a structured turn
    pub fn blocks(&self) -> Option<&[ContentBlock]> {
        match &self.content {
            TurnContent::Text(_) => None,
            TurnContent::Blocks(blocks) => Some(blocks),
        }
    }

    /// Tool calls requested by this turn, in emitted order
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.blocks()
            .into_iter()
            .flatten()
            .filter_map(|block| match block {
                ContentBlock::ToolCall { id, name, input } => {
                    Some(ToolCall::new(id.clone(), name.clone(), input.clone()))
                }
                _ => None,
            })
            .collect()
    }
}

/// Turn content - either plain text or an ordered block sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    /// Plain text content (user turns)
    Text(String),
    /// Structured content (assistant and tool-result turns)
    Blocks(Vec<ContentBlock>),
}

impl From<String> for TurnContent {
    fn from(s: String) -> Self {
        TurnContent::Text(s)
    }
}

impl From<Vec<ContentBlock>> for TurnContent {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        TurnContent::Blocks(blocks)
    }
}

/// A single semantic unit within a turn's content
///
/// Closed set: adding a block kind is a compile-time-checked decision at
/// every consumption site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content
    Text {
        text: String,
    },
    /// Tool call requested by the reasoning engine
    ToolCall {
        id: String,
        name: String,
        input: Value,
    },
    /// Outcome answering a previous tool call
    ToolOutcome {
        #[serde(rename = "tool_call_id")]
        call_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    /// Create a text block
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Create a tool call block
    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        ContentBlock::ToolCall {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Check if this is a tool call block
    pub fn is_tool_call(&self) -> bool {
        matches!(self, ContentBlock::ToolCall { .. })
    }

    /// Get the text content if this is a text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

impl From<ToolCall> for ContentBlock {
    fn from(call: ToolCall) -> Self {
        ContentBlock::ToolCall {
            id: call.id,
            name: call.name,
            input: call.input,
        }
    }
}

impl From<ToolOutcome> for ContentBlock {
    fn from(outcome: ToolOutcome) -> Self {
        ContentBlock::ToolOutcome {
            call_id: outcome.call_id,
            content: outcome.content,
            is_error: outcome.is_error,
        }
    }
}
