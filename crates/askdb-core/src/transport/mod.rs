//! Tool transport
//!
//! The transport is a pure conduit: it takes a (name, arguments) pair to
//! the tool-execution side and brings back a result payload or a typed
//! failure. [`ToolTransport`] is the seam the session loop is tested
//! against; [`McpTransport`] is the production implementation speaking MCP
//! over stdio to a spawned child process, using the official rmcp SDK.

mod traits;
mod mcp;

pub use traits::{ToolTransport, InvokeOutput, TransportError, TransportResult};
pub use mcp::McpTransport;
