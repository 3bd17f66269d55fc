use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use superagent_agents::registry::{AgentRegistry, RegisteredAgent};
use superagent_core::config::{EngineConfig, InputPolicy};
use superagent_core::error::{Result, SuperAgentError};
use superagent_core::event::EventBus;
use superagent_core::execution::{AgentRunRecord, ExecutionRecord};
use superagent_core::types::{AgentExecutionResult, EngineEvent, ExecutionContext};
use superagent_core::workflow::{AgentInstance, WorkflowGraph};

use crate::planner::{predecessors, ExecutionPlanner, SequentialPlanner};

/// Reported in place of faults raised inside an agent; the cause is logged.
pub const INTERNAL_AGENT_ERROR: &str = "Internal error while executing agent";

/// Drives one workflow run from `running` to a terminal status.
///
/// Agents run strictly one after another in the planner's order. The first
/// agent that reports `success = false` (or fails config validation, times
/// out, or faults) stops the run and marks it failed; results gathered so
/// far stay on the record.
pub struct ExecutionEngine {
    registry: Arc<AgentRegistry>,
    planner: Arc<dyn ExecutionPlanner>,
    event_bus: Arc<EventBus>,
    agent_timeout: Option<Duration>,
    input_policy: InputPolicy,
}

impl ExecutionEngine {
    pub fn new(registry: Arc<AgentRegistry>, event_bus: Arc<EventBus>) -> Self {
        Self {
            registry,
            planner: Arc::new(SequentialPlanner),
            event_bus,
            agent_timeout: None,
            input_policy: InputPolicy::default(),
        }
    }

    pub fn from_config(
        registry: Arc<AgentRegistry>,
        event_bus: Arc<EventBus>,
        config: &EngineConfig,
    ) -> Self {
        Self::new(registry, event_bus)
            .with_agent_timeout(config.agent_timeout_secs.map(Duration::from_secs))
            .with_input_policy(config.input_policy)
    }

    pub fn with_planner(mut self, planner: Arc<dyn ExecutionPlanner>) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_agent_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.agent_timeout = timeout;
        self
    }

    pub fn with_input_policy(mut self, policy: InputPolicy) -> Self {
        self.input_policy = policy;
        self
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn planner(&self) -> &Arc<dyn ExecutionPlanner> {
        &self.planner
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Check a graph before it is stored: registered agent types, known
    /// edge endpoints, no cycles. Agent configs are validated per run.
    pub fn validate(&self, graph: &WorkflowGraph) -> Result<()> {
        if graph.name.trim().is_empty() {
            return Err(SuperAgentError::InvalidGraph("workflow name is empty".into()));
        }
        if let Some(node) = graph
            .agents
            .iter()
            .find(|a| !self.registry.contains(&a.agent_type))
        {
            return Err(SuperAgentError::UnknownAgentType(node.agent_type.clone()));
        }
        self.planner.plan(graph).map(|_| ())
    }

    /// Run `graph` against `input`, moving `record` to a terminal status.
    ///
    /// A failed run is not an error: it leaves `record` in `failed`. `Err`
    /// only signals that `record` was not in `running` to begin with.
    pub async fn run(
        &self,
        graph: &WorkflowGraph,
        record: &mut ExecutionRecord,
        input: Value,
        cancel: CancellationToken,
    ) -> Result<()> {
        if record.is_terminal() {
            return Err(SuperAgentError::InvalidTransition {
                id: record.id.to_string(),
                from: record.status.to_string(),
                to: "running".into(),
            });
        }

        info!(execution_id = %record.id, workflow = %graph.name, "Starting workflow execution");

        let plan = match self.planner.plan(graph) {
            Ok(plan) => plan,
            Err(e) => return self.finish_failed(record, e.to_string()),
        };

        // Resolve every agent type up front so an unknown type fails the run
        // before anything executes.
        let mut resolved: Vec<(&AgentInstance, RegisteredAgent)> = Vec::with_capacity(plan.order.len());
        for &i in &plan.order {
            let node = &graph.agents[i];
            match self.registry.resolve(&node.agent_type) {
                Ok(entry) => resolved.push((node, entry)),
                Err(e) => return self.finish_failed(record, format!("{}: {}", node.label(), e)),
            }
        }

        let names: Vec<String> = resolved.iter().map(|(n, _)| n.name.clone()).collect();
        info!(execution_id = %record.id, "Execution order: {}", names.join(" → "));
        self.event_bus.publish(EngineEvent::ExecutionStarted {
            execution_id: record.id.clone(),
            workflow_id: graph.id.clone(),
            workflow_name: graph.name.clone(),
            order: names,
        });

        let preds = predecessors(graph);
        let mut outputs: Vec<Option<Value>> = vec![None; graph.agents.len()];
        let mut last_output = input.clone();

        for (step, &i) in plan.order.iter().enumerate() {
            let (node, entry) = &resolved[step];

            if cancel.is_cancelled() {
                warn!(execution_id = %record.id, agent_id = %node.id, "Execution cancelled");
                return self.finish_failed(record, SuperAgentError::Cancelled.to_string());
            }

            let node_input = match self.input_policy {
                InputPolicy::PreviousOutput => {
                    if step == 0 {
                        input.clone()
                    } else {
                        let prev = plan.order[step - 1];
                        let raw = outputs[prev].clone().unwrap_or(Value::Null);
                        map_edge(graph, prev, i, raw)
                    }
                }
                InputPolicy::MergePredecessors => match preds[i].as_slice() {
                    [] => input.clone(),
                    [p] => map_edge(graph, *p, i, outputs[*p].clone().unwrap_or(Value::Null)),
                    many => {
                        let mut merged = Map::new();
                        for &p in many {
                            let raw = outputs[p].clone().unwrap_or(Value::Null);
                            merged.insert(graph.agents[p].id.clone(), map_edge(graph, p, i, raw));
                        }
                        Value::Object(merged)
                    }
                },
            };

            self.event_bus.publish(EngineEvent::AgentStarted {
                execution_id: record.id.clone(),
                agent_id: node.id.clone(),
                agent_name: node.name.clone(),
                agent_type: node.agent_type.clone(),
            });
            info!(execution_id = %record.id, agent_id = %node.id, "Executing agent: {}", node.name);

            let agent = match entry.instantiate(&node.config) {
                Ok(agent) => agent,
                Err(e) => {
                    let message = format!("{}: {}", node.label(), e);
                    self.event_bus.publish(EngineEvent::AgentFailed {
                        execution_id: record.id.clone(),
                        agent_id: node.id.clone(),
                        error: e.to_string(),
                    });
                    return self.finish_failed(record, message);
                }
            };

            let ctx = ExecutionContext {
                execution_id: record.id.clone(),
                workflow_id: graph.id.clone(),
                agent_id: node.id.clone(),
                org_id: record.org_id.clone(),
                cancel: cancel.clone(),
            };

            let started_at = Utc::now();
            let clock = Instant::now();
            let mut result = self
                .invoke(node, agent.execute(node_input.clone(), ctx), &cancel)
                .await;
            result.latency_ms = clock.elapsed().as_millis() as u64;
            // `error` is set exactly when the agent failed.
            if result.success {
                result.error = None;
            } else if result.error.is_none() {
                result.error = Some("Agent reported failure".to_string());
            }

            let success = result.success;
            let agent_error = result.error.clone();
            let output = result.output.clone();
            record.push_result(AgentRunRecord {
                agent_id: node.id.clone(),
                agent_name: node.name.clone(),
                agent_type: node.agent_type.clone(),
                input: node_input,
                started_at,
                completed_at: Utc::now(),
                result,
            });

            if !success {
                let error = agent_error.unwrap_or_default();
                error!(execution_id = %record.id, agent_id = %node.id, error = %error, "Agent execution failed, stopping workflow");
                self.event_bus.publish(EngineEvent::AgentFailed {
                    execution_id: record.id.clone(),
                    agent_id: node.id.clone(),
                    error: error.clone(),
                });
                return self.finish_failed(record, format!("{}: {}", node.label(), error));
            }

            if let Some(run) = record.agent_results.last() {
                debug!(
                    execution_id = %record.id,
                    agent_id = %node.id,
                    tokens = run.result.tokens_used,
                    latency_ms = run.result.latency_ms,
                    "Agent completed"
                );
                self.event_bus.publish(EngineEvent::AgentCompleted {
                    execution_id: record.id.clone(),
                    agent_id: node.id.clone(),
                    tokens_used: run.result.tokens_used,
                    cost: run.result.cost,
                    latency_ms: run.result.latency_ms,
                });
            }
            last_output = output.clone();
            outputs[i] = Some(output);
        }

        record.complete(last_output)?;
        info!(
            execution_id = %record.id,
            tokens = record.tokens_used,
            "Workflow completed successfully"
        );
        self.event_bus.publish(EngineEvent::ExecutionCompleted {
            execution_id: record.id.clone(),
            tokens_used: record.tokens_used,
            cost: record.cost,
            duration_seconds: record.duration_seconds.unwrap_or(0.0),
        });
        Ok(())
    }

    /// Await one agent call, converting faults, panics, timeouts and
    /// cancellation into failed results.
    async fn invoke(
        &self,
        node: &AgentInstance,
        call: futures::future::BoxFuture<'_, Result<AgentExecutionResult>>,
        cancel: &CancellationToken,
    ) -> AgentExecutionResult {
        let guarded = AssertUnwindSafe(call).catch_unwind();
        let bounded = async {
            match self.agent_timeout {
                Some(limit) => match tokio::time::timeout(limit, guarded).await {
                    Ok(outcome) => outcome,
                    Err(_) => Ok(Err(SuperAgentError::AgentTimeout {
                        agent: node.id.clone(),
                        timeout_secs: limit.as_secs(),
                    })),
                },
                None => guarded.await,
            }
        };

        let outcome = tokio::select! {
            outcome = bounded => outcome,
            _ = cancel.cancelled() => Ok(Err(SuperAgentError::Cancelled)),
        };

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e @ (SuperAgentError::AgentTimeout { .. } | SuperAgentError::Cancelled))) => {
                warn!(agent_id = %node.id, error = %e, "Agent did not finish");
                AgentExecutionResult::failure(e.to_string())
            }
            Ok(Err(e)) => {
                error!(agent_id = %node.id, agent_type = %node.agent_type, error = %e, "Agent raised an error");
                AgentExecutionResult::failure(INTERNAL_AGENT_ERROR)
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_default();
                error!(agent_id = %node.id, agent_type = %node.agent_type, panic = %detail, "Agent panicked");
                AgentExecutionResult::failure(INTERNAL_AGENT_ERROR)
            }
        }
    }

    fn finish_failed(&self, record: &mut ExecutionRecord, error: String) -> Result<()> {
        error!(execution_id = %record.id, error = %error, "Workflow execution failed");
        record.fail(error.clone())?;
        self.event_bus.publish(EngineEvent::ExecutionFailed {
            execution_id: record.id.clone(),
            error,
        });
        Ok(())
    }
}

/// Apply the `data_mapping` of the edge `source -> target`, if any.
fn map_edge(graph: &WorkflowGraph, source: usize, target: usize, output: Value) -> Value {
    let (s, t) = (&graph.agents[source].id, &graph.agents[target].id);
    let mapping = graph
        .edges
        .iter()
        .filter(|e| &e.source == s && &e.target == t)
        .find_map(|e| e.data_mapping.as_ref());
    let Some(mapping) = mapping else {
        return output;
    };

    let mut mapped = Map::new();
    for (target_key, source_key) in mapping {
        let value = if source_key.starts_with('/') {
            output.pointer(source_key)
        } else {
            output.get(source_key)
        };
        mapped.insert(target_key.clone(), value.cloned().unwrap_or(Value::Null));
    }
    Value::Object(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use superagent_agents::registry::AgentFactory;
    use superagent_core::traits::Agent;
    use superagent_core::types::ExecutionStatus;
    use superagent_core::workflow::Edge;
    use superagent_test_utils::{
        chain, mock_definition, node, node_with_config, strict_definition, workflow, CallLog,
        MockAgent,
    };

    fn factory(agent: MockAgent) -> AgentFactory {
        Arc::new(move |_: &Value| Ok(Arc::new(agent.clone()) as Arc<dyn Agent>))
    }

    struct Harness {
        registry: AgentRegistry,
        calls: CallLog,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                registry: AgentRegistry::new(),
                calls: CallLog::new(),
            }
        }

        fn add(mut self, agent: MockAgent) -> Self {
            let agent = agent.with_calls(self.calls.clone());
            let def = mock_definition(agent.agent_type());
            self.registry.register(def, factory(agent));
            self
        }

        fn add_strict(mut self, agent: MockAgent) -> Self {
            let agent = agent.with_calls(self.calls.clone());
            let def = strict_definition(agent.agent_type());
            self.registry.register(def, factory(agent));
            self
        }

        fn engine(self) -> (ExecutionEngine, CallLog) {
            let engine = ExecutionEngine::new(Arc::new(self.registry), Arc::new(EventBus::default()));
            (engine, self.calls)
        }
    }

    async fn run(engine: &ExecutionEngine, graph: &WorkflowGraph, input: Value) -> ExecutionRecord {
        let mut record = ExecutionRecord::start(&graph.id, input.to_string(), None);
        engine
            .run(graph, &mut record, input, CancellationToken::new())
            .await
            .unwrap();
        record
    }

    #[tokio::test]
    async fn test_chain_threads_outputs() {
        let (engine, calls) = Harness::new().add(MockAgent::echo("echo")).engine();
        let g = chain("wf", vec![node("a", "echo"), node("b", "echo"), node("c", "echo")]);
        let rec = run(&engine, &g, json!("start")).await;

        assert_eq!(rec.status, ExecutionStatus::Completed);
        assert_eq!(calls.agent_ids(), vec!["a", "b", "c"]);
        assert_eq!(calls.input_of("a").unwrap(), json!("start"));
        assert_eq!(calls.input_of("b").unwrap(), rec.result_for("a").unwrap().result.output);
        assert_eq!(rec.output.as_ref(), Some(&rec.result_for("c").unwrap().result.output));
        assert!(rec.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_single_node_receives_raw_input() {
        let (engine, calls) = Harness::new().add(MockAgent::echo("echo")).engine();
        let g = workflow("wf", vec![node("only", "echo")], &[]);
        let rec = run(&engine, &g, json!("ping")).await;
        assert_eq!(rec.agent_results.len(), 1);
        assert_eq!(calls.input_of("only").unwrap(), json!("ping"));
        assert_eq!(rec.agent_results[0].input, json!("ping"));
    }

    #[tokio::test]
    async fn test_fail_fast_keeps_k_results() {
        let (engine, calls) = Harness::new()
            .add(MockAgent::echo("echo"))
            .add(MockAgent::failing("broken", "CRM unavailable"))
            .engine();
        let g = chain(
            "wf",
            vec![node("a", "echo"), node("b", "broken"), node("c", "echo")],
        );
        let rec = run(&engine, &g, json!("go")).await;

        assert_eq!(rec.status, ExecutionStatus::Failed);
        assert_eq!(rec.agent_results.len(), 2);
        assert_eq!(calls.agent_ids(), vec!["a", "b"]);
        assert_eq!(rec.error.as_deref(), Some("B (b): CRM unavailable"));
        assert!(rec.output.is_none());
    }

    #[tokio::test]
    async fn test_metrics_are_additive() {
        let (engine, _) = Harness::new()
            .add(MockAgent::echo_metered("big", 500, 0.02))
            .add(MockAgent::echo_metered("small", 250, 0.01))
            .add(MockAgent::failing("broken", "nope"))
            .engine();

        let ok = chain("wf", vec![node("a", "big"), node("b", "small")]);
        let rec = run(&engine, &ok, json!("x")).await;
        assert_eq!(rec.tokens_used, 750);
        assert!((rec.cost - 0.03).abs() < 1e-9);
        let latency: u64 = rec.agent_results.iter().map(|r| r.result.latency_ms).sum();
        assert_eq!(rec.latency_ms, latency);

        let partial = chain("wf", vec![node("a", "big"), node("b", "broken")]);
        let rec = run(&engine, &partial, json!("x")).await;
        let tokens: u64 = rec.agent_results.iter().map(|r| r.result.tokens_used).sum();
        assert_eq!(rec.tokens_used, tokens);
        assert_eq!(rec.tokens_used, 500);
    }

    #[tokio::test]
    async fn test_config_error_mid_chain() {
        let (engine, calls) = Harness::new()
            .add(MockAgent::echo("lookup"))
            .add_strict(MockAgent::echo("send"))
            .engine();
        let g = chain(
            "wf",
            vec![node("sales", "lookup"), node_with_config("email", "send", json!({"limit": 3}))],
        );
        let rec = run(&engine, &g, json!("Find Q4 deals")).await;

        assert_eq!(rec.status, ExecutionStatus::Failed);
        assert_eq!(rec.agent_results.len(), 1);
        assert_eq!(calls.agent_ids(), vec!["sales"]);
        let error = rec.error.unwrap();
        assert!(error.contains("EMAIL (email)"));
        assert!(error.contains("template"));
    }

    #[tokio::test]
    async fn test_inconsistent_results_are_normalized() {
        let mut noisy = AgentExecutionResult::success(json!({"ok": true}), 5, 0.0);
        noisy.error = Some("stale warning".into());
        let mut silent = AgentExecutionResult::failure("x");
        silent.error = None;

        let (engine, _) = Harness::new()
            .add(MockAgent::returning("noisy", noisy))
            .add(MockAgent::returning("silent", silent))
            .engine();
        let g = chain("wf", vec![node("a", "noisy"), node("b", "silent")]);
        let rec = run(&engine, &g, json!("go")).await;

        let a = &rec.result_for("a").unwrap().result;
        assert!(a.success);
        assert!(a.error.is_none());

        let b = &rec.result_for("b").unwrap().result;
        assert!(!b.success);
        assert_eq!(b.error.as_deref(), Some("Agent reported failure"));
        assert_eq!(rec.error.as_deref(), Some("B (b): Agent reported failure"));
        for run in &rec.agent_results {
            assert_eq!(run.result.error.is_some(), !run.result.success);
        }
    }

    #[tokio::test]
    async fn test_unknown_type_fails_before_any_agent() {
        let (engine, calls) = Harness::new().add(MockAgent::echo("echo")).engine();
        let g = chain("wf", vec![node("a", "echo"), node("b", "does_not_exist")]);
        let rec = run(&engine, &g, json!("go")).await;

        assert_eq!(rec.status, ExecutionStatus::Failed);
        assert!(rec.agent_results.is_empty());
        assert!(calls.is_empty());
        assert!(rec.error.unwrap().contains("Unknown agent type: does_not_exist"));
    }

    #[tokio::test]
    async fn test_cycle_fails_without_running() {
        let (engine, calls) = Harness::new().add(MockAgent::echo("echo")).engine();
        let g = workflow(
            "wf",
            vec![node("a", "echo"), node("b", "echo")],
            &[("a", "b"), ("b", "a")],
        );
        let rec = run(&engine, &g, json!("go")).await;
        assert_eq!(rec.status, ExecutionStatus::Failed);
        assert!(rec.error.unwrap().contains("cycle"));
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn test_fault_is_reported_generically() {
        let (engine, _) = Harness::new()
            .add(MockAgent::faulty("faulty", "secret connection string"))
            .engine();
        let g = workflow("wf", vec![node("a", "faulty")], &[]);
        let rec = run(&engine, &g, json!("go")).await;

        assert_eq!(rec.status, ExecutionStatus::Failed);
        assert_eq!(rec.agent_results.len(), 1);
        let error = rec.error.unwrap();
        assert!(error.ends_with(INTERNAL_AGENT_ERROR));
        assert!(!error.contains("secret"));
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let (engine, _) = Harness::new()
            .add(MockAgent::echo("echo"))
            .add(MockAgent::panicking("boom"))
            .engine();
        let g = chain("wf", vec![node("a", "echo"), node("b", "boom")]);
        let rec = run(&engine, &g, json!("go")).await;
        assert_eq!(rec.status, ExecutionStatus::Failed);
        assert_eq!(rec.agent_results.len(), 2);
        assert_eq!(
            rec.agent_results[1].result.error.as_deref(),
            Some(INTERNAL_AGENT_ERROR)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_agent_timeout() {
        let (engine, _) = Harness::new()
            .add(MockAgent::slow("slow", Duration::from_secs(60)))
            .engine();
        let engine = engine.with_agent_timeout(Some(Duration::from_secs(1)));
        let g = workflow("wf", vec![node("a", "slow")], &[]);
        let rec = run(&engine, &g, json!("go")).await;
        assert_eq!(rec.status, ExecutionStatus::Failed);
        assert!(rec.error.unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let (engine, calls) = Harness::new().add(MockAgent::echo("echo")).engine();
        let g = workflow("wf", vec![node("a", "echo")], &[]);
        let mut rec = ExecutionRecord::start("wf", "go".into(), None);
        let cancel = CancellationToken::new();
        cancel.cancel();
        engine.run(&g, &mut rec, json!("go"), cancel).await.unwrap();
        assert_eq!(rec.status, ExecutionStatus::Failed);
        assert_eq!(rec.error.as_deref(), Some("Execution cancelled"));
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn test_merge_predecessors_policy() {
        let (engine, calls) = Harness::new().add(MockAgent::echo("echo")).engine();
        let engine = engine.with_input_policy(InputPolicy::MergePredecessors);
        let g = workflow(
            "wf",
            vec![node("left", "echo"), node("right", "echo"), node("join", "echo")],
            &[("left", "join"), ("right", "join")],
        );
        let rec = run(&engine, &g, json!("seed")).await;
        assert_eq!(rec.status, ExecutionStatus::Completed);

        // Both sources see the request input; the join sees a keyed map.
        assert_eq!(calls.input_of("right").unwrap(), json!("seed"));
        let joined = calls.input_of("join").unwrap();
        assert_eq!(joined["left"]["agent"], "left");
        assert_eq!(joined["right"]["agent"], "right");
    }

    #[tokio::test]
    async fn test_previous_output_policy_on_branches() {
        let (engine, calls) = Harness::new().add(MockAgent::echo("echo")).engine();
        let g = workflow(
            "wf",
            vec![node("left", "echo"), node("right", "echo"), node("join", "echo")],
            &[("left", "join"), ("right", "join")],
        );
        run(&engine, &g, json!("seed")).await;
        // right is second in order, so it is fed left's output
        assert_eq!(calls.input_of("right").unwrap()["agent"], "left");
        assert_eq!(calls.input_of("join").unwrap()["agent"], "right");
    }

    #[tokio::test]
    async fn test_data_mapping_projects_output() {
        let (engine, calls) = Harness::new()
            .add(MockAgent::output("src", json!({"deals": [1, 2], "count": 2}), 1, 0.0))
            .add(MockAgent::echo("echo"))
            .engine();
        let mut g = chain("wf", vec![node("a", "src"), node("b", "echo")]);
        g.edges = vec![Edge {
            data_mapping: Some([("records".to_string(), "deals".to_string())].into()),
            ..Edge::new("a", "b")
        }];
        run(&engine, &g, json!("go")).await;
        assert_eq!(calls.input_of("b").unwrap(), json!({"records": [1, 2]}));
    }

    #[tokio::test]
    async fn test_empty_workflow_completes_with_input() {
        let (engine, _) = Harness::new().engine();
        let g = workflow("wf", vec![], &[]);
        let rec = run(&engine, &g, json!("nothing")).await;
        assert_eq!(rec.status, ExecutionStatus::Completed);
        assert_eq!(rec.output, Some(json!("nothing")));
    }

    #[tokio::test]
    async fn test_terminal_record_rejected() {
        let (engine, _) = Harness::new().add(MockAgent::echo("echo")).engine();
        let g = workflow("wf", vec![node("a", "echo")], &[]);
        let mut rec = ExecutionRecord::start("wf", "go".into(), None);
        rec.fail("already").unwrap();
        let err = engine
            .run(&g, &mut rec, json!("go"), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SuperAgentError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_events_published_in_order() {
        let (engine, _) = Harness::new().add(MockAgent::echo("echo")).engine();
        let mut rx = engine.event_bus().subscribe();
        let g = workflow("wf", vec![node("a", "echo")], &[]);
        run(&engine, &g, json!("go")).await;

        let kinds: Vec<&'static str> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| match e {
                EngineEvent::ExecutionStarted { .. } => "started",
                EngineEvent::AgentStarted { .. } => "agent_started",
                EngineEvent::AgentCompleted { .. } => "agent_completed",
                EngineEvent::AgentFailed { .. } => "agent_failed",
                EngineEvent::ExecutionCompleted { .. } => "completed",
                EngineEvent::ExecutionFailed { .. } => "failed",
            })
            .collect();
        assert_eq!(kinds, vec!["started", "agent_started", "agent_completed", "completed"]);
    }

    #[test]
    fn test_validate_before_save() {
        let (engine, _) = Harness::new().add(MockAgent::echo("echo")).engine();
        let ok = chain("wf", vec![node("a", "echo"), node("b", "echo")]);
        assert!(engine.validate(&ok).is_ok());

        let unknown = chain("wf", vec![node("a", "echo"), node("b", "fax")]);
        assert!(matches!(
            engine.validate(&unknown),
            Err(SuperAgentError::UnknownAgentType(t)) if t == "fax"
        ));

        let cyclic = workflow("wf", vec![node("a", "echo"), node("b", "echo")], &[("a", "b"), ("b", "a")]);
        assert!(matches!(engine.validate(&cyclic), Err(SuperAgentError::CyclicGraph(_))));
    }
}
