//! Session: the query orchestration loop
//!
//! One query is one call to [`Session::run_query`]: append the user turn,
//! submit the transcript to the reasoning engine, dispatch any requested
//! tool calls in emitted order, append the outcomes, and repeat until the
//! engine answers without calling a tool.
//!
//! Tool failures are folded into the transcript as `is_error` outcomes so
//! the engine can self-correct on its next turn; engine failures are fatal
//! to the query. `run_query` takes `&mut self`, so one session serves one
//! query at a time by construction.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::config::Settings;
use crate::engine::{EngineError, EngineResult, GenaiEngine, ReasoningEngine, RespondOptions};
use crate::logging::Logger;
use crate::transport::{McpTransport, ToolTransport, TransportError};
use crate::types::{CancellationToken, ContentBlock, ToolCall, ToolDescriptor, ToolOutcome, Turn};
use crate::wire;

use super::args::normalize_arguments;

/// Errors that fail a whole query
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reasoning-engine failure (timeout, service error, malformed output)
    #[error("Reasoning engine failed: {0}")]
    Engine(#[from] EngineError),

    /// Transport failure outside a tool round (connection establishment)
    #[error("Tool transport failed: {0}")]
    Transport(#[from] TransportError),

    /// The query was cancelled by the caller
    #[error("Query cancelled")]
    Cancelled,

    /// The engine kept calling tools past the configured round bound
    #[error("No terminal answer after {limit} rounds")]
    RoundLimit { limit: u32 },

    /// The finished transcript could not be encoded for handoff
    #[error(transparent)]
    Wire(#[from] wire::WireError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// One conversation endpoint: transport connection, tool catalog, settings
pub struct Session {
    engine: Arc<dyn ReasoningEngine>,
    transport: Arc<dyn ToolTransport>,
    /// Advertised tools, fetched once at connect; read-only afterwards
    tools: Vec<ToolDescriptor>,
    settings: Settings,
    logger: Arc<dyn Logger>,
}

impl Session {
    /// Establish a session over an already-built engine and transport
    ///
    /// Fetches the tool catalog before accepting any query; a listing
    /// failure means no session exists.
    pub async fn connect(
        engine: Arc<dyn ReasoningEngine>,
        transport: Arc<dyn ToolTransport>,
        settings: Settings,
        logger: Arc<dyn Logger>,
    ) -> SessionResult<Self> {
        let tools = transport.list_tools().await?;
        if tools.is_empty() {
            logger.warn("[Session] Tool-execution side advertised no tools");
        }
        logger.info(&format!(
            "[Session] Connected. Available tools: {:?}",
            tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>()
        ));

        Ok(Self {
            engine,
            transport,
            tools,
            settings,
            logger,
        })
    }

    /// Spawn the configured tool server and connect with the genai engine
    pub async fn start(settings: Settings, logger: Arc<dyn Logger>) -> SessionResult<Self> {
        let transport = McpTransport::spawn(
            &settings.server_command,
            &settings.server_args,
            Arc::clone(&logger),
        )
        .await?;
        let engine = GenaiEngine::new(Arc::clone(&logger));
        Self::connect(Arc::new(engine), Arc::new(transport), settings, logger).await
    }

    /// The advertised tool catalog
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Drive one natural-language question to a terminal answer
    ///
    /// Returns the full transcript, whose last turn is the engine's
    /// no-tool-call answer. A failed query returns an error, not a partial
    /// transcript.
    pub async fn run_query(
        &mut self,
        question: &str,
        cancel: CancellationToken,
    ) -> SessionResult<Vec<Turn>> {
        self.logger
            .info(&format!("[Session] New query: {}", question));
        let mut transcript = vec![Turn::user(question)];

        for round in 0..self.settings.max_rounds {
            let blocks = self.next_response(&transcript, &cancel).await?;
            let turn = Turn::assistant(blocks);
            let calls = turn.tool_calls();
            transcript.push(turn);

            if calls.is_empty() {
                self.logger.info(&format!(
                    "[Session] Terminal answer after {} round(s)",
                    round + 1
                ));
                return Ok(transcript);
            }

            self.logger.info(&format!(
                "[Session] Round {}: {} tool call(s)",
                round + 1,
                calls.len()
            ));

            let mut outcomes = Vec::with_capacity(calls.len());
            for call in &calls {
                outcomes.push(self.dispatch(call, &cancel).await?);
            }
            transcript.push(Turn::tool_results(outcomes));
        }

        Err(SessionError::RoundLimit {
            limit: self.settings.max_rounds,
        })
    }

    /// Caller-facing entry point: run the query and hand back the
    /// transcript in its transport-safe representation
    pub async fn answer(
        &mut self,
        question: &str,
        cancel: CancellationToken,
    ) -> SessionResult<Value> {
        let transcript = self.run_query(question, cancel).await?;
        Ok(wire::to_value(&transcript)?)
    }

    /// Tear down the transport connection
    pub async fn shutdown(self) -> SessionResult<()> {
        self.logger.info("[Session] Shutting down");
        self.transport.shutdown().await?;
        Ok(())
    }

    /// Submit the transcript and classify the result
    async fn next_response(
        &self,
        transcript: &[Turn],
        cancel: &CancellationToken,
    ) -> SessionResult<Vec<ContentBlock>> {
        let options = RespondOptions {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        let respond = self
            .engine
            .respond(transcript, &self.tools, &options, cancel.clone());

        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            result = bounded(self.settings.engine_timeout(), respond) => result,
        };

        match result {
            Ok(blocks) => Ok(blocks),
            Err(EngineError::Cancelled) => Err(SessionError::Cancelled),
            Err(e) => Err(SessionError::Engine(e)),
        }
    }

    /// Execute one tool call and fold any failure into an error outcome
    ///
    /// Only cancellation escapes as an error; the partial round is
    /// discarded with it, so no unanswered tool call ever survives.
    async fn dispatch(
        &self,
        call: &ToolCall,
        cancel: &CancellationToken,
    ) -> SessionResult<ToolOutcome> {
        if cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }

        // Defensive check: the engine may only call advertised tools.
        if !self.tools.iter().any(|t| t.name == call.name) {
            self.logger.warn(&format!(
                "[Session] Reasoning engine requested unknown tool: {}",
                call.name
            ));
            return Ok(ToolOutcome::error(
                call.id.as_str(),
                format!("Unknown tool: {}", call.name),
            ));
        }

        self.logger.info(&format!(
            "[Session] Executing tool: {} with args: {}",
            call.name, call.input
        ));
        let arguments = normalize_arguments(call.input.clone());
        let invoke = self.transport.invoke(&call.name, arguments);

        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            result = async {
                match self.settings.tool_timeout() {
                    Some(limit) => tokio::time::timeout(limit, invoke).await.unwrap_or_else(|_| {
                        Err(TransportError::CallFailed(format!(
                            "timed out after {}s",
                            limit.as_secs()
                        )))
                    }),
                    None => invoke.await,
                }
            } => result,
        };

        Ok(match result {
            Ok(output) => ToolOutcome {
                call_id: call.id.clone(),
                content: output.content,
                is_error: output.is_error,
            },
            Err(e) => {
                self.logger.error(&format!(
                    "[Session] Tool call {} failed: {}",
                    call.name, e
                ));
                ToolOutcome::error(call.id.as_str(), format!("Error executing tool: {}", e))
            }
        })
    }
}

/// Apply an optional time bound to an engine submission
async fn bounded<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = EngineResult<T>>,
) -> EngineResult<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or(Err(EngineError::Timeout)),
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ScriptStep, ScriptedEngine};
    use crate::logging::NoOpLogger;
    use crate::transport::{InvokeOutput, TransportResult};
    use crate::types::Role;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};

    /// In-memory transport with scripted per-tool outcomes
    #[derive(Default)]
    struct FakeTransport {
        tools: Vec<ToolDescriptor>,
        responses: Mutex<HashMap<String, VecDeque<Result<InvokeOutput, String>>>>,
        delays_ms: HashMap<String, u64>,
        calls: Mutex<Vec<(String, Value)>>,
        fail_listing: bool,
        cancel_after_invoke: Option<CancellationToken>,
    }

    impl FakeTransport {
        fn with_tools(names: &[&str]) -> Self {
            Self {
                tools: names
                    .iter()
                    .map(|n| ToolDescriptor::new(*n, "test tool"))
                    .collect(),
                ..Default::default()
            }
        }

        fn respond(self, name: &str, output: InvokeOutput) -> Self {
            self.responses
                .lock()
                .entry(name.to_string())
                .or_default()
                .push_back(Ok(output));
            self
        }

        fn fail(self, name: &str, message: &str) -> Self {
            self.responses
                .lock()
                .entry(name.to_string())
                .or_default()
                .push_back(Err(message.to_string()));
            self
        }

        fn delay(mut self, name: &str, ms: u64) -> Self {
            self.delays_ms.insert(name.to_string(), ms);
            self
        }

        fn call_names(&self) -> Vec<String> {
            self.calls.lock().iter().map(|(n, _)| n.clone()).collect()
        }
    }

    #[async_trait]
    impl ToolTransport for FakeTransport {
        async fn list_tools(&self) -> TransportResult<Vec<ToolDescriptor>> {
            if self.fail_listing {
                return Err(TransportError::ConnectionFailed("no server".into()));
            }
            Ok(self.tools.clone())
        }

        async fn invoke(&self, name: &str, arguments: Value) -> TransportResult<InvokeOutput> {
            self.calls.lock().push((name.to_string(), arguments));
            if let Some(ms) = self.delays_ms.get(name) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            if let Some(cancel) = &self.cancel_after_invoke {
                cancel.cancel();
            }
            let next = self.responses.lock().get_mut(name).and_then(VecDeque::pop_front);
            match next {
                Some(Ok(output)) => Ok(output),
                Some(Err(message)) => Err(TransportError::CallFailed(message)),
                None => Ok(InvokeOutput::success("{}")),
            }
        }

        async fn shutdown(&self) -> TransportResult<()> {
            Ok(())
        }
    }

    async fn session(engine: ScriptedEngine, transport: FakeTransport) -> Session {
        session_with(engine, transport, Settings::default()).await
    }

    async fn session_with(
        engine: ScriptedEngine,
        transport: FakeTransport,
        settings: Settings,
    ) -> Session {
        Session::connect(
            Arc::new(engine),
            Arc::new(transport),
            settings,
            Arc::new(NoOpLogger),
        )
        .await
        .expect("connect should succeed")
    }

    #[tokio::test]
    async fn test_single_tool_round() {
        let engine = ScriptedEngine::new([
            ScriptStep::Respond(vec![ContentBlock::tool_call(
                "call_1",
                "lookup_counties",
                json!({}),
            )]),
            ScriptStep::text("King and Clark"),
        ]);
        let transport = FakeTransport::with_tools(&["lookup_counties"])
            .respond("lookup_counties", InvokeOutput::success("{\"data\": [\"King\",\"Clark\"]}"));

        let mut session = session(engine, transport).await;
        let transcript = session
            .run_query("List counties", CancellationToken::new())
            .await
            .unwrap();

        let roles: Vec<Role> = transcript.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            [Role::User, Role::Assistant, Role::ToolResult, Role::Assistant]
        );

        let outcomes = transcript[2].blocks().unwrap();
        assert_eq!(
            outcomes[0],
            ContentBlock::from(ToolOutcome::success("call_1", "{\"data\": [\"King\",\"Clark\"]}"))
        );
        assert_eq!(
            transcript[3].blocks().unwrap()[0].as_text(),
            Some("King and Clark")
        );
    }

    #[tokio::test]
    async fn test_termination_without_tools() {
        let mut session = session(
            ScriptedEngine::final_text("No data needed."),
            FakeTransport::with_tools(&["lookup_counties"]),
        )
        .await;

        let transcript = session
            .run_query("Hello", CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_tool_failure_recovery() {
        // First round fails at the tool side; the engine corrects itself.
        let engine = ScriptedEngine::new([
            ScriptStep::Respond(vec![ContentBlock::tool_call(
                "call_1",
                "run_sqlite_query",
                json!({"sql_dict": {"sql_query": "SELECT Foo FROM King"}}),
            )]),
            ScriptStep::Respond(vec![ContentBlock::tool_call(
                "call_2",
                "run_sqlite_query",
                json!({"sql_dict": {"sql_query": "SELECT Make FROM King"}}),
            )]),
            ScriptStep::text("TESLA"),
        ]);
        let transport = FakeTransport::with_tools(&["run_sqlite_query"])
            .fail("run_sqlite_query", "no such column: Foo")
            .respond("run_sqlite_query", InvokeOutput::success("{\"data\": [{\"Make\": \"TESLA\"}]}"));

        let mut session = session(engine, transport).await;
        let transcript = session
            .run_query("Which makes are in King?", CancellationToken::new())
            .await
            .unwrap();

        // Two tool rounds before termination
        assert_eq!(transcript.len(), 6);
        match &transcript[2].blocks().unwrap()[0] {
            ContentBlock::ToolOutcome {
                call_id,
                content,
                is_error,
            } => {
                assert_eq!(call_id, "call_1");
                assert!(is_error);
                assert!(content.contains("no such column: Foo"));
            }
            other => panic!("expected an outcome block, got {:?}", other),
        }
        match &transcript[4].blocks().unwrap()[0] {
            ContentBlock::ToolOutcome { is_error, .. } => assert!(!is_error),
            other => panic!("expected an outcome block, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcome_order_matches_call_order() {
        // The slow first call must not let later outcomes overtake it.
        let engine = ScriptedEngine::new([
            ScriptStep::Respond(vec![
                ContentBlock::tool_call("a", "slow", json!({})),
                ContentBlock::tool_call("b", "fast", json!({})),
                ContentBlock::tool_call("c", "fast", json!({})),
            ]),
            ScriptStep::text("done"),
        ]);
        let transport = FakeTransport::with_tools(&["slow", "fast"])
            .delay("slow", 500)
            .respond("slow", InvokeOutput::success("s"))
            .respond("fast", InvokeOutput::success("f1"))
            .respond("fast", InvokeOutput::success("f2"));

        let mut session = session(engine, transport).await;
        let transcript = session
            .run_query("order test", CancellationToken::new())
            .await
            .unwrap();

        let ids: Vec<&str> = transcript[2]
            .blocks()
            .unwrap()
            .iter()
            .map(|block| match block {
                ContentBlock::ToolOutcome { call_id, .. } => call_id.as_str(),
                other => panic!("expected an outcome block, got {:?}", other),
            })
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_rejected_without_dispatch() {
        let engine = ScriptedEngine::new([
            ScriptStep::Respond(vec![ContentBlock::tool_call("call_1", "bogus", json!({}))]),
            ScriptStep::text("ok"),
        ]);
        let transport = Arc::new(FakeTransport::with_tools(&["lookup_counties"]));

        let mut session = Session::connect(
            Arc::new(engine),
            Arc::clone(&transport) as Arc<dyn ToolTransport>,
            Settings::default(),
            Arc::new(NoOpLogger),
        )
        .await
        .unwrap();

        let transcript = session
            .run_query("q", CancellationToken::new())
            .await
            .unwrap();

        match &transcript[2].blocks().unwrap()[0] {
            ContentBlock::ToolOutcome {
                content, is_error, ..
            } => {
                assert!(is_error);
                assert!(content.contains("Unknown tool"));
            }
            other => panic!("expected an outcome block, got {:?}", other),
        }
        // The transport never saw the call
        assert!(transport.call_names().is_empty());
    }

    #[tokio::test]
    async fn test_arguments_are_normalized_before_dispatch() {
        let engine = ScriptedEngine::new([
            ScriptStep::Respond(vec![ContentBlock::tool_call(
                "call_1",
                "create_sql",
                json!({"question": "q", "ner_dict": "{\"table\": \"King\"}"}),
            )]),
            ScriptStep::text("done"),
        ]);
        let transport = Arc::new(FakeTransport::with_tools(&["create_sql"]));

        let mut session = Session::connect(
            Arc::new(engine),
            Arc::clone(&transport) as Arc<dyn ToolTransport>,
            Settings::default(),
            Arc::new(NoOpLogger),
        )
        .await
        .unwrap();
        session.run_query("q", CancellationToken::new()).await.unwrap();

        let calls = transport.calls.lock();
        assert_eq!(calls.len(), 1);
        // The serialized object arrived at the transport in structural form
        assert_eq!(calls[0].1["ner_dict"]["table"], "King");
    }

    #[tokio::test]
    async fn test_round_limit_fails_the_query() {
        let looping = || {
            ScriptStep::Respond(vec![ContentBlock::tool_call(
                "call",
                "lookup_counties",
                json!({}),
            )])
        };
        let engine = ScriptedEngine::new([looping(), looping(), looping()]);
        let mut settings = Settings::default();
        settings.max_rounds = 2;

        let mut session = session_with(
            engine,
            FakeTransport::with_tools(&["lookup_counties"]),
            settings,
        )
        .await;

        let err = session
            .run_query("loop forever", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::RoundLimit { limit: 2 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_timeout_fails_the_query() {
        let engine = ScriptedEngine::new([ScriptStep::Hang]);
        let mut settings = Settings::default();
        settings.engine_timeout_secs = Some(1);

        let mut session = session_with(
            engine,
            FakeTransport::with_tools(&["lookup_counties"]),
            settings,
        )
        .await;

        let err = session
            .run_query("q", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Engine(EngineError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_cancellation_fails_the_query() {
        let engine = ScriptedEngine::new([ScriptStep::Hang]);
        let mut session = session(engine, FakeTransport::with_tools(&["lookup_counties"])).await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = session.run_query("q", cancel).await.unwrap_err();
        assert!(matches!(err, SessionError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancellation_mid_round_discards_the_partial_round() {
        let cancel = CancellationToken::new();
        let engine = ScriptedEngine::new([ScriptStep::Respond(vec![
            ContentBlock::tool_call("a", "lookup_counties", json!({})),
            ContentBlock::tool_call("b", "lookup_counties", json!({})),
        ])]);
        let transport = Arc::new(FakeTransport {
            tools: vec![ToolDescriptor::new("lookup_counties", "test tool")],
            cancel_after_invoke: Some(cancel.clone()),
            ..Default::default()
        });

        let mut session = Session::connect(
            Arc::new(engine),
            Arc::clone(&transport) as Arc<dyn ToolTransport>,
            Settings::default(),
            Arc::new(NoOpLogger),
        )
        .await
        .unwrap();

        let err = session.run_query("q", cancel).await.unwrap_err();
        assert!(matches!(err, SessionError::Cancelled));
        // The second call of the round was never dispatched
        assert_eq!(transport.call_names(), ["lookup_counties"]);
    }

    #[tokio::test]
    async fn test_connect_fails_without_tool_listing() {
        let transport = FakeTransport {
            fail_listing: true,
            ..Default::default()
        };
        let result = Session::connect(
            Arc::new(ScriptedEngine::final_text("unused")),
            Arc::new(transport),
            Settings::default(),
            Arc::new(NoOpLogger),
        )
        .await;
        assert!(matches!(result, Err(SessionError::Transport(_))));
    }

    #[tokio::test]
    async fn test_answer_returns_wire_form() {
        let mut session = session(
            ScriptedEngine::final_text("King and Clark"),
            FakeTransport::with_tools(&["lookup_counties"]),
        )
        .await;

        let value = session
            .answer("List counties", CancellationToken::new())
            .await
            .unwrap();
        let turns = value.as_array().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0]["role"], "user");
        assert_eq!(turns[1]["role"], "assistant");
    }
}
