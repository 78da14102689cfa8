//! AskDB Core
//!
//! The conversation loop and tool dispatch behind a natural-language
//! database agent: a reasoning engine decides, turn by turn, whether to
//! call a tool or answer; the session executes requested tools through an
//! MCP transport and feeds the outcomes back until a terminal answer
//! emerges.
//!
//! Tool failures are folded into the transcript (`is_error` outcomes)
//! rather than aborting the query, so the engine can self-correct on its
//! next turn. Engine failures and connection-establishment failures are
//! fatal and propagate to the caller.
//!
//! ```rust,ignore
//! use askdb_core::{Session, Settings, CancellationToken, ConsoleLogger};
//! use std::sync::Arc;
//!
//! let logger = Arc::new(ConsoleLogger::new());
//! let mut session = Session::start(Settings::load()?, logger).await?;
//!
//! // Returns the full transcript in transport-safe form
//! let messages = session.answer("List counties", CancellationToken::new()).await?;
//!
//! session.shutdown().await?;
//! ```

pub mod types;
pub mod logging;
pub mod config;
pub mod engine;
pub mod transport;
pub mod agent;
pub mod wire;

// Re-export commonly used types
pub use types::{
    Turn, Role, TurnContent, ContentBlock,
    ToolDescriptor, ToolCall, ToolOutcome,
    CancellationToken,
};

pub use logging::{Logger, ConsoleLogger, NoOpLogger};

pub use config::{Settings, SettingsError};

pub use engine::{
    ReasoningEngine, RespondOptions, EngineError, EngineResult,
    GenaiEngine, ScriptedEngine, ScriptStep,
};

pub use transport::{ToolTransport, InvokeOutput, TransportError, TransportResult, McpTransport};

pub use agent::{Session, SessionError, SessionResult};

pub use wire::{WireError, WireResult};
