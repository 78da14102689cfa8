//! MCP transport using the official rmcp SDK
//!
//! Spawns the tool-execution process as a child and speaks MCP to it over
//! stdio. The connection is established once at startup and torn down
//! exactly once at shutdown.

use std::ffi::OsStr;
use std::sync::Arc;

use async_trait::async_trait;
use rmcp::{
    ServiceExt,
    model::{
        CallToolRequestParams, ClientCapabilities, ClientInfo, Implementation, RawContent,
        Tool as McpTool,
    },
    service::RunningService,
    transport::TokioChildProcess,
    RoleClient,
};
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::logging::Logger;
use crate::types::ToolDescriptor;

use super::traits::{InvokeOutput, ToolTransport, TransportError, TransportResult};

/// MCP client over a spawned child process
pub struct McpTransport {
    /// The running rmcp service; taken out exactly once on shutdown
    client: Mutex<Option<RunningService<RoleClient, ClientInfo>>>,
    /// Logger
    logger: Arc<dyn Logger>,
}

impl McpTransport {
    /// Spawn the tool-execution process and perform the MCP handshake
    pub async fn spawn<I, S>(
        command: &str,
        args: I,
        logger: Arc<dyn Logger>,
    ) -> TransportResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        logger.info(&format!("[McpTransport] Spawning tool server: {}", command));

        let mut cmd = Command::new(command);
        cmd.args(args);

        let transport = TokioChildProcess::new(cmd)
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        let client_info = ClientInfo {
            meta: None,
            protocol_version: Default::default(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "askdb-core".to_string(),
                title: Some("AskDB Core".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                website_url: None,
                icons: None,
            },
        };

        let client = client_info
            .serve(transport)
            .await
            .map_err(|e| TransportError::InitializationFailed(e.to_string()))?;

        logger.info("[McpTransport] Connected and initialized successfully");

        Ok(Self {
            client: Mutex::new(Some(client)),
            logger,
        })
    }

    /// Get server info, if the connection is still live
    pub async fn server_info(&self) -> Option<Implementation> {
        let guard = self.client.lock().await;
        guard
            .as_ref()
            .and_then(|client| client.peer_info().map(|info| info.server_info.clone()))
    }
}

#[async_trait]
impl ToolTransport for McpTransport {
    async fn list_tools(&self) -> TransportResult<Vec<ToolDescriptor>> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or(TransportError::Closed)?;

        let result = client
            .list_tools(Default::default())
            .await
            .map_err(|e| TransportError::Protocol(e.to_string()))?;

        self.logger.info(&format!(
            "[McpTransport] Listed {} tools",
            result.tools.len()
        ));

        Ok(result.tools.into_iter().map(descriptor_from_mcp).collect())
    }

    async fn invoke(&self, name: &str, arguments: Value) -> TransportResult<InvokeOutput> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or(TransportError::Closed)?;

        self.logger.info(&format!("[McpTransport] Calling tool: {}", name));

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        };

        let result = client
            .call_tool(params)
            .await
            .map_err(|e| TransportError::CallFailed(e.to_string()))?;

        // Flatten the MCP text content blocks into one payload string;
        // non-text content is not produced by the tool side.
        let content = result
            .content
            .iter()
            .filter_map(|c| match &c.raw {
                RawContent::Text(t) => Some(t.text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(InvokeOutput {
            content,
            is_error: result.is_error.unwrap_or(false),
        })
    }

    async fn shutdown(&self) -> TransportResult<()> {
        let client = self.client.lock().await.take();
        match client {
            Some(client) => {
                self.logger.info("[McpTransport] Closing connection");
                client
                    .cancel()
                    .await
                    .map_err(|e| TransportError::Protocol(e.to_string()))?;
                Ok(())
            }
            // Already closed
            None => Ok(()),
        }
    }
}

/// Map an advertised MCP tool to a catalog descriptor
fn descriptor_from_mcp(tool: McpTool) -> ToolDescriptor {
    ToolDescriptor {
        name: tool.name.to_string(),
        description: tool.description.map(|s| s.to_string()).unwrap_or_default(),
        // input_schema is Arc<JsonObject>, convert to Value
        input_schema: serde_json::to_value(tool.input_schema.as_ref()).ok(),
    }
}
