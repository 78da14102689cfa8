//! Core types for the conversation transcript and tool catalog
//!
//! This module contains all the shared types used across the session loop,
//! the reasoning engine, and the tool transport.

mod turn;
mod tool;
mod cancellation;

pub use turn::{Turn, Role, TurnContent, ContentBlock};
pub use tool::{ToolDescriptor, ToolCall, ToolOutcome};
pub use cancellation::CancellationToken;
