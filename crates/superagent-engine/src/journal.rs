use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use superagent_core::event::EventBus;
use superagent_core::execution::{ExecutionLogEntry, LogLevel};
use superagent_core::traits::ExecutionStore;
use superagent_core::types::EngineEvent;

const WORKFLOW_COMPONENT: &str = "workflow";
const MAX_BATCH: usize = 256;

/// Persists engine events as per-execution log lines.
///
/// Reads a lossless feed from the EventBus and appends one entry per event
/// to the execution store, where they are served by the logs endpoint.
pub struct ExecutionJournal {
    store: Arc<dyn ExecutionStore>,
}

impl ExecutionJournal {
    pub fn new(store: Arc<dyn ExecutionStore>) -> Self {
        Self { store }
    }

    /// Subscribe to `event_bus` and return the journal task.
    ///
    /// The feed is taken before this returns, so every event published
    /// afterwards is recorded. The task exits when every handle to the bus is
    /// dropped, or when `cancel` fires, after writing what is already queued.
    pub fn run(
        self,
        event_bus: &EventBus,
        cancel: CancellationToken,
    ) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = event_bus.subscribe_unbounded();
        async move {
            info!("Execution journal started");
            let mut batch = Vec::new();

            loop {
                let event = tokio::select! {
                    biased;
                    event = rx.recv() => event,
                    _ = cancel.cancelled() => {
                        debug!("Execution journal cancelled, draining");
                        rx.close();
                        while let Ok(event) = rx.try_recv() {
                            batch.push(Self::entry_for(&event));
                        }
                        self.flush(&mut batch).await;
                        return;
                    }
                };
                let Some(event) = event else {
                    debug!("EventBus dropped, execution journal stopping");
                    return;
                };

                batch.push(Self::entry_for(&event));
                while batch.len() < MAX_BATCH {
                    match rx.try_recv() {
                        Ok(event) => batch.push(Self::entry_for(&event)),
                        Err(_) => break,
                    }
                }
                self.flush(&mut batch).await;
            }
        }
    }

    async fn flush(&self, batch: &mut Vec<ExecutionLogEntry>) {
        if batch.is_empty() {
            return;
        }
        if let Err(e) = self.store.append_logs(batch.as_slice()).await {
            error!(entries = batch.len(), error = %e, "Failed to persist execution logs");
        }
        batch.clear();
    }

    /// Persist a single event.
    pub async fn record(&self, event: &EngineEvent) {
        let entry = Self::entry_for(event);
        if let Err(e) = self.store.append_logs(std::slice::from_ref(&entry)).await {
            error!(execution_id = %entry.execution_id, error = %e, "Failed to persist execution log");
        }
    }

    fn entry_for(event: &EngineEvent) -> ExecutionLogEntry {
        let (level, component, message) = match event {
            EngineEvent::ExecutionStarted { workflow_name, order, .. } => (
                LogLevel::Info,
                WORKFLOW_COMPONENT.to_string(),
                format!(
                    "Starting workflow execution: {workflow_name}. Execution order: {}",
                    order.join(" → ")
                ),
            ),
            EngineEvent::AgentStarted { agent_id, agent_name, agent_type, .. } => (
                LogLevel::Info,
                agent_id.clone(),
                format!("Executing agent: {agent_name} ({agent_type})"),
            ),
            EngineEvent::AgentCompleted { agent_id, tokens_used, cost, latency_ms, .. } => (
                LogLevel::Info,
                agent_id.clone(),
                format!("Agent completed. Tokens: {tokens_used}, Cost: ${cost:.4}, Latency: {latency_ms}ms"),
            ),
            EngineEvent::AgentFailed { agent_id, error, .. } => (
                LogLevel::Error,
                agent_id.clone(),
                format!("Agent execution failed: {error}"),
            ),
            EngineEvent::ExecutionCompleted { tokens_used, cost, duration_seconds, .. } => (
                LogLevel::Info,
                WORKFLOW_COMPONENT.to_string(),
                format!(
                    "Workflow completed successfully. Total tokens: {tokens_used}, Cost: ${cost:.4}, Duration: {duration_seconds:.3}s"
                ),
            ),
            EngineEvent::ExecutionFailed { error, .. } => (
                LogLevel::Error,
                WORKFLOW_COMPONENT.to_string(),
                format!("Workflow execution failed: {error}"),
            ),
        };

        ExecutionLogEntry {
            timestamp: Utc::now(),
            execution_id: event.execution_id().clone(),
            level,
            component,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use superagent_core::execution::LogFilter;
    use superagent_core::types::ExecutionId;
    use superagent_store::SqliteStore;

    #[tokio::test]
    async fn test_events_become_filterable_logs() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let journal = ExecutionJournal::new(store.clone());
        let id = ExecutionId::from_str("exec_journal");

        journal
            .record(&EngineEvent::ExecutionStarted {
                execution_id: id.clone(),
                workflow_id: "wf".into(),
                workflow_name: "Q4 Outreach".into(),
                order: vec!["Sales".into(), "Email".into()],
            })
            .await;
        journal
            .record(&EngineEvent::AgentFailed {
                execution_id: id.clone(),
                agent_id: "email".into(),
                error: "No recipients found in input data".into(),
            })
            .await;

        let all = store.load_logs(&id, &LogFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].message.contains("Sales → Email"));

        let errors = store
            .load_logs(&id, &LogFilter { level: Some(LogLevel::Error), agent_id: None })
            .await
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].component, "email");
    }

    #[tokio::test]
    async fn test_cancel_drains_queued_events() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let bus = EventBus::default();
        let cancel = CancellationToken::new();
        let task = ExecutionJournal::new(store.clone()).run(&bus, cancel.clone());

        let id = ExecutionId::from_str("exec_loop");
        for _ in 0..3 {
            bus.publish(EngineEvent::ExecutionFailed {
                execution_id: id.clone(),
                error: "cancelled".into(),
            });
        }
        cancel.cancel();
        tokio::spawn(task).await.unwrap();

        let logs = store.load_logs(&id, &LogFilter::default()).await.unwrap();
        assert_eq!(logs.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_events_lost_under_concurrent_load() {
        use serde_json::{json, Value};
        use superagent_agents::registry::{AgentFactory, AgentRegistry};
        use superagent_core::execution::ExecutionRequest;
        use superagent_core::traits::{Agent, WorkflowStore};
        use superagent_test_utils::{chain, mock_definition, node, MockAgent};

        use crate::{ExecutionEngine, ExecutionService};

        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store
            .save_workflow(&chain("wf_load", vec![node("a", "echo")]))
            .await
            .unwrap();

        let mut registry = AgentRegistry::new();
        let echo = MockAgent::echo("echo");
        let factory: AgentFactory =
            Arc::new(move |_: &Value| Ok(Arc::new(echo.clone()) as Arc<dyn Agent>));
        registry.register(mock_definition("echo"), factory);

        // A tiny broadcast buffer lags any lossy subscriber immediately.
        let bus = Arc::new(EventBus::new(4));
        let journal = tokio::spawn(
            ExecutionJournal::new(store.clone()).run(&bus, CancellationToken::new()),
        );
        let engine = Arc::new(ExecutionEngine::new(Arc::new(registry), bus.clone()));
        let svc = ExecutionService::new(engine, store.clone(), store.clone());
        drop(bus);

        let runs: Vec<_> = (0..200)
            .map(|i| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    svc.execute(ExecutionRequest::new("wf_load", json!(i)), None)
                        .await
                        .unwrap()
                })
            })
            .collect();
        let mut ids = Vec::new();
        for run in runs {
            ids.push(run.await.unwrap().id);
        }

        // Dropping the last bus handle ends the journal once it has caught up.
        drop(svc);
        journal.await.unwrap();

        for id in &ids {
            let logs = store.load_logs(id, &LogFilter::default()).await.unwrap();
            assert_eq!(logs.len(), 4, "execution {id}");
        }
    }
}
