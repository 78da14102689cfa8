//! Scripted reasoning engine for testing
//!
//! Replays a queue of scripted steps, one per submission, without network
//! dependencies. Exported so embedders can drive the session loop in their
//! own tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::types::{CancellationToken, ContentBlock, ToolDescriptor, Turn};

use super::error::{EngineError, EngineResult};
use super::traits::{ReasoningEngine, RespondOptions};

/// One scripted engine step
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Return this block sequence
    Respond(Vec<ContentBlock>),
    /// Fail the submission with this message
    Fail(String),
    /// Never return (until cancelled); for timeout tests
    Hang,
}

impl ScriptStep {
    /// A text-only response step
    pub fn text(text: impl Into<String>) -> Self {
        ScriptStep::Respond(vec![ContentBlock::text(text)])
    }
}

/// Reasoning engine that replays a scripted step queue
///
/// Each submission pops the next step. An exhausted script fails the
/// submission, which keeps a runaway loop from spinning silently.
pub struct ScriptedEngine {
    steps: Mutex<VecDeque<ScriptStep>>,
}

impl ScriptedEngine {
    /// Create an engine from a step sequence
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
        }
    }

    /// Create an engine that answers every query with one fixed text turn
    pub fn final_text(text: impl Into<String>) -> Self {
        Self::new([ScriptStep::text(text)])
    }

    /// Append a step to the script
    pub fn push(&self, step: ScriptStep) {
        self.steps.lock().push_back(step);
    }

    /// Number of steps left in the script
    pub fn remaining(&self) -> usize {
        self.steps.lock().len()
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn respond(
        &self,
        _turns: &[Turn],
        _tools: &[ToolDescriptor],
        _options: &RespondOptions,
        cancel: CancellationToken,
    ) -> EngineResult<Vec<ContentBlock>> {
        let step = self.steps.lock().pop_front();
        match step {
            Some(ScriptStep::Respond(blocks)) => Ok(blocks),
            Some(ScriptStep::Fail(message)) => Err(EngineError::api("scripted", message)),
            Some(ScriptStep::Hang) => {
                cancel.cancelled().await;
                Err(EngineError::Cancelled)
            }
            None => Err(EngineError::invalid_response("scripted", "script exhausted")),
        }
    }
}
