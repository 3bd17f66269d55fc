use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;

use superagent_core::error::{Result, SuperAgentError};
use superagent_core::traits::Agent;
use superagent_core::types::{AgentExecutionResult, ExecutionContext};

/// Shared record of `(agent_id, input)` for every invocation, in call order.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<(String, Value)>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, agent_id: &str, input: &Value) {
        if let Ok(mut calls) = self.0.lock() {
            calls.push((agent_id.to_string(), input.clone()));
        }
    }

    pub fn agent_ids(&self) -> Vec<String> {
        self.0
            .lock()
            .map(|c| c.iter().map(|(id, _)| id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn input_of(&self, agent_id: &str) -> Option<Value> {
        self.0
            .lock()
            .ok()?
            .iter()
            .find(|(id, _)| id == agent_id)
            .map(|(_, input)| input.clone())
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
enum Behavior {
    /// Output `{"agent": <agent_id>, "received": <input>}`.
    Echo { tokens: u64, cost: f64 },
    Output { output: Value, tokens: u64, cost: f64 },
    /// Return this result verbatim.
    Result(AgentExecutionResult),
    Fail(String),
    Fault(String),
    Panic,
    Sleep(Duration),
}

/// Scripted agent for engine tests.
#[derive(Clone)]
pub struct MockAgent {
    agent_type: String,
    behavior: Behavior,
    calls: CallLog,
}

impl MockAgent {
    fn with(agent_type: &str, behavior: Behavior) -> Self {
        Self {
            agent_type: agent_type.to_string(),
            behavior,
            calls: CallLog::new(),
        }
    }

    pub fn echo(agent_type: &str) -> Self {
        Self::with(agent_type, Behavior::Echo { tokens: 10, cost: 0.001 })
    }

    pub fn echo_metered(agent_type: &str, tokens: u64, cost: f64) -> Self {
        Self::with(agent_type, Behavior::Echo { tokens, cost })
    }

    pub fn output(agent_type: &str, output: Value, tokens: u64, cost: f64) -> Self {
        Self::with(agent_type, Behavior::Output { output, tokens, cost })
    }

    /// Hand back `result` as-is, however inconsistent.
    pub fn returning(agent_type: &str, result: AgentExecutionResult) -> Self {
        Self::with(agent_type, Behavior::Result(result))
    }

    /// Reports `success = false`.
    pub fn failing(agent_type: &str, error: &str) -> Self {
        Self::with(agent_type, Behavior::Fail(error.to_string()))
    }

    /// Returns `Err` from `execute`.
    pub fn faulty(agent_type: &str, detail: &str) -> Self {
        Self::with(agent_type, Behavior::Fault(detail.to_string()))
    }

    pub fn panicking(agent_type: &str) -> Self {
        Self::with(agent_type, Behavior::Panic)
    }

    /// Sleeps, honouring cancellation, then echoes.
    pub fn slow(agent_type: &str, delay: Duration) -> Self {
        Self::with(agent_type, Behavior::Sleep(delay))
    }

    /// Share a call log across several mocks.
    pub fn with_calls(mut self, calls: CallLog) -> Self {
        self.calls = calls;
        self
    }

    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }
}

impl Agent for MockAgent {
    fn agent_type(&self) -> &str {
        &self.agent_type
    }

    fn execute(
        &self,
        input: Value,
        ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<AgentExecutionResult>> {
        Box::pin(async move {
            self.calls.push(&ctx.agent_id, &input);
            let echo = |input: Value| serde_json::json!({ "agent": ctx.agent_id, "received": input });
            match &self.behavior {
                Behavior::Echo { tokens, cost } => {
                    Ok(AgentExecutionResult::success(echo(input), *tokens, *cost))
                }
                Behavior::Output { output, tokens, cost } => {
                    Ok(AgentExecutionResult::success(output.clone(), *tokens, *cost))
                }
                Behavior::Result(result) => Ok(result.clone()),
                Behavior::Fail(error) => Ok(AgentExecutionResult::failure(error.clone())),
                Behavior::Fault(detail) => Err(SuperAgentError::Database(detail.clone())),
                Behavior::Panic => panic!("mock agent panicked"),
                Behavior::Sleep(delay) => {
                    tokio::select! {
                        _ = tokio::time::sleep(*delay) => {
                            Ok(AgentExecutionResult::success(echo(input), 1, 0.0))
                        }
                        _ = ctx.cancel.cancelled() => Err(SuperAgentError::Cancelled),
                    }
                }
            }
        })
    }
}
