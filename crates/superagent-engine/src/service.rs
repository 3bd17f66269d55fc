use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use superagent_agents::catalog::{ExampleRun, ExampleRunReport, ExampleWorkflow};
use superagent_core::error::{Result, SuperAgentError};
use superagent_core::execution::{ExecutionRecord, ExecutionRequest};
use superagent_core::traits::{ExecutionStore, WorkflowStore};
use superagent_core::types::ExecutionId;
use superagent_core::workflow::WorkflowGraph;

use crate::engine::ExecutionEngine;

/// Entry point for running stored workflows.
///
/// Loads the graph, persists a `running` record, drives the engine, then
/// writes the terminal record together with the workflow rollup.
#[derive(Clone)]
pub struct ExecutionService {
    engine: Arc<ExecutionEngine>,
    workflows: Arc<dyn WorkflowStore>,
    executions: Arc<dyn ExecutionStore>,
    shutdown: CancellationToken,
    in_flight: Arc<Mutex<HashMap<ExecutionId, CancellationToken>>>,
}

impl ExecutionService {
    pub fn new(
        engine: Arc<ExecutionEngine>,
        workflows: Arc<dyn WorkflowStore>,
        executions: Arc<dyn ExecutionStore>,
    ) -> Self {
        Self {
            engine,
            workflows,
            executions,
            shutdown: CancellationToken::new(),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Cancel in-flight runs when `shutdown` fires.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    /// Start a run in the background and return the `running` record.
    ///
    /// Poll the execution store for the terminal record.
    pub async fn start(
        &self,
        request: ExecutionRequest,
        org_id: Option<String>,
    ) -> Result<ExecutionRecord> {
        let (graph, record, cancel) = self.prepare(&request, org_id).await?;
        let snapshot = record.clone();
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.drive(graph, record, request, cancel).await {
                error!(error = %e, "Background execution could not be finalized");
            }
        });
        Ok(snapshot)
    }

    /// Run to completion and return the terminal record.
    ///
    /// A workflow that ran and failed is `Ok` with status `failed`. `Err`
    /// means the run could not be started or persisted.
    pub async fn execute(
        &self,
        request: ExecutionRequest,
        org_id: Option<String>,
    ) -> Result<ExecutionRecord> {
        let (graph, record, cancel) = self.prepare(&request, org_id).await?;
        self.drive(graph, record, request, cancel).await
    }

    /// Request cancellation of an in-flight run. Returns false if unknown.
    pub fn cancel(&self, id: &ExecutionId) -> bool {
        match self.in_flight.lock() {
            Ok(map) => match map.get(id) {
                Some(token) => {
                    token.cancel();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().map(|m| m.len()).unwrap_or(0)
    }

    async fn prepare(
        &self,
        request: &ExecutionRequest,
        org_id: Option<String>,
    ) -> Result<(WorkflowGraph, ExecutionRecord, CancellationToken)> {
        let graph = self
            .workflows
            .get_workflow(&request.workflow_id)
            .await?
            .ok_or_else(|| SuperAgentError::WorkflowNotFound(request.workflow_id.clone()))?;

        let record = ExecutionRecord::start(&graph.id, request.input_text(), org_id);
        self.executions.create_execution(&record).await?;

        let cancel = self.shutdown.child_token();
        if let Ok(mut map) = self.in_flight.lock() {
            map.insert(record.id.clone(), cancel.clone());
        }
        info!(execution_id = %record.id, workflow_id = %graph.id, "Execution created");
        Ok((graph, record, cancel))
    }

    async fn drive(
        &self,
        graph: WorkflowGraph,
        mut record: ExecutionRecord,
        request: ExecutionRequest,
        cancel: CancellationToken,
    ) -> Result<ExecutionRecord> {
        let outcome = self
            .engine
            .run(&graph, &mut record, request.input, cancel)
            .await;

        if let Ok(mut map) = self.in_flight.lock() {
            map.remove(&record.id);
        }
        outcome?;
        self.finalize(record).await
    }

    /// Write the terminal record. One retry, then a bare `failed` record so
    /// the row does not stay `running`.
    async fn finalize(&self, record: ExecutionRecord) -> Result<ExecutionRecord> {
        let first = match self.persist(&record).await {
            Ok(()) => return Ok(record),
            Err(e) => e,
        };
        warn!(execution_id = %record.id, error = %first, "Failed to persist execution result, retrying");

        let second = match self.persist(&record).await {
            Ok(()) => return Ok(record),
            Err(e) => e,
        };
        error!(execution_id = %record.id, error = %second, "Retry failed, recording execution as failed");

        let fallback =
            record.persistence_fallback(format!("Failed to persist execution result: {second}"));
        match self.persist(&fallback).await {
            Ok(()) => Ok(fallback),
            Err(e) => {
                error!(execution_id = %record.id, error = %e, "Execution left in running state");
                Err(second)
            }
        }
    }

    async fn persist(&self, record: &ExecutionRecord) -> Result<()> {
        if !self.executions.update_execution(record).await? {
            warn!(execution_id = %record.id, "Execution already finalized, rollup skipped");
        }
        Ok(())
    }

    /// Store each example as a new workflow and run it on its sample input.
    ///
    /// Examples run one at a time; a failure to start one is reported in its
    /// entry and does not stop the rest.
    pub async fn run_examples(
        &self,
        examples: &[ExampleWorkflow],
        org_id: Option<String>,
    ) -> ExampleRunReport {
        let mut results = Vec::with_capacity(examples.len());
        for example in examples {
            let graph = example.to_workflow(example.name, org_id.clone());
            let mut run = ExampleRun {
                example_id: example.id.to_string(),
                example_name: example.name.to_string(),
                category: example.category.to_string(),
                workflow_id: Some(graph.id.clone()),
                execution_id: None,
                status: "error".to_string(),
                tokens_used: 0,
                cost: 0.0,
                duration_seconds: None,
                error: None,
            };

            let outcome = async {
                self.engine.validate(&graph)?;
                self.workflows.save_workflow(&graph).await?;
                let input = Value::String(example.sample_input.to_string());
                self.execute(ExecutionRequest::new(&graph.id, input), org_id.clone())
                    .await
            }
            .await;

            match outcome {
                Ok(record) => {
                    run.execution_id = Some(record.id.to_string());
                    run.status = record.status.to_string();
                    run.tokens_used = record.tokens_used;
                    run.cost = record.cost;
                    run.duration_seconds = record.duration_seconds;
                    run.error = record.error;
                }
                Err(e) => {
                    warn!(example = example.id, error = %e, "Example could not be run");
                    run.error = Some(e.to_string());
                }
            }
            results.push(run);
        }
        ExampleRunReport::new(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::BoxFuture;
    use serde_json::json;
    use superagent_agents::registry::{AgentFactory, AgentRegistry};
    use superagent_core::event::EventBus;
    use superagent_core::execution::{ExecutionFilter, ExecutionLogEntry, LogFilter};
    use superagent_core::traits::Agent;
    use superagent_core::types::ExecutionStatus;
    use superagent_store::SqliteStore;
    use superagent_test_utils::{chain, mock_definition, node, MockAgent};

    fn registry() -> AgentRegistry {
        let mut registry = AgentRegistry::new();
        for agent in [MockAgent::echo("echo"), MockAgent::failing("broken", "boom")] {
            let def = mock_definition(agent.agent_type());
            let factory: AgentFactory =
                Arc::new(move |_: &Value| Ok(Arc::new(agent.clone()) as Arc<dyn Agent>));
            registry.register(def, factory);
        }
        registry
    }

    async fn service() -> (ExecutionService, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let engine = Arc::new(ExecutionEngine::new(
            Arc::new(registry()),
            Arc::new(EventBus::default()),
        ));
        let svc = ExecutionService::new(engine, store.clone(), store.clone());
        (svc, store)
    }

    #[tokio::test]
    async fn test_execute_persists_and_rolls_up() {
        let (svc, store) = service().await;
        let wf = chain("wf_ok", vec![node("a", "echo"), node("b", "echo")]);
        store.save_workflow(&wf).await.unwrap();

        let rec = svc
            .execute(ExecutionRequest::new("wf_ok", json!("hi")), None)
            .await
            .unwrap();
        assert_eq!(rec.status, ExecutionStatus::Completed);

        let stored = store.get_execution(&rec.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ExecutionStatus::Completed);
        assert_eq!(stored.agent_results.len(), 2);

        let stats = store.workflow_stats("wf_ok").await.unwrap().unwrap();
        assert_eq!((stats.execution_count, stats.success_count, stats.failure_count), (1, 1, 0));
        assert_eq!(svc.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failed_run_is_not_an_error() {
        let (svc, store) = service().await;
        let wf = chain("wf_bad", vec![node("a", "echo"), node("b", "broken")]);
        store.save_workflow(&wf).await.unwrap();

        let rec = svc
            .execute(ExecutionRequest::new("wf_bad", json!("hi")), Some("org_1".into()))
            .await
            .unwrap();
        assert_eq!(rec.status, ExecutionStatus::Failed);
        assert_eq!(rec.org_id.as_deref(), Some("org_1"));

        let stats = store.workflow_stats("wf_bad").await.unwrap().unwrap();
        assert_eq!((stats.execution_count, stats.success_count, stats.failure_count), (1, 0, 1));
    }

    #[tokio::test]
    async fn test_unknown_workflow_is_an_error() {
        let (svc, _) = service().await;
        let err = svc
            .execute(ExecutionRequest::new("wf_missing", json!("hi")), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SuperAgentError::WorkflowNotFound(_)));
    }

    #[tokio::test]
    async fn test_start_returns_running_then_finishes() {
        let (svc, store) = service().await;
        let wf = chain("wf_bg", vec![node("a", "echo")]);
        store.save_workflow(&wf).await.unwrap();

        let rec = svc
            .start(ExecutionRequest::new("wf_bg", json!({"q": 1})), None)
            .await
            .unwrap();
        assert_eq!(rec.status, ExecutionStatus::Running);
        assert_eq!(rec.input, r#"{"q":1}"#);

        let mut status = ExecutionStatus::Running;
        for _ in 0..100 {
            status = store.get_execution(&rec.id).await.unwrap().unwrap().status;
            if status.is_terminal() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(status, ExecutionStatus::Completed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_rollup_consistency() {
        let (svc, store) = service().await;
        store
            .save_workflow(&chain("wf_ok", vec![node("a", "echo")]))
            .await
            .unwrap();
        store
            .save_workflow(&chain("wf_bad", vec![node("a", "broken")]))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let svc = svc.clone();
            let wf = if i % 4 == 0 { "wf_bad" } else { "wf_ok" };
            handles.push(tokio::spawn(async move {
                svc.execute(ExecutionRequest::new(wf, json!(i)), None).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let ok = store.workflow_stats("wf_ok").await.unwrap().unwrap();
        assert_eq!(ok.execution_count, 15);
        assert_eq!(ok.success_count + ok.failure_count, 15);
        let bad = store.workflow_stats("wf_bad").await.unwrap().unwrap();
        assert_eq!(bad.execution_count, 5);
        assert_eq!(bad.failure_count, 5);

        let listed = store
            .list_executions(&ExecutionFilter::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 20);
    }

    #[tokio::test]
    async fn test_finalize_is_idempotent() {
        let (svc, store) = service().await;
        store
            .save_workflow(&chain("wf_once", vec![node("a", "echo")]))
            .await
            .unwrap();
        let rec = svc
            .execute(ExecutionRequest::new("wf_once", json!("x")), None)
            .await
            .unwrap();

        // A retried finalize must not count twice.
        assert!(!store.update_execution(&rec).await.unwrap());
        let stats = store.workflow_stats("wf_once").await.unwrap().unwrap();
        assert_eq!(stats.execution_count, 1);
    }

    /// Fails the first `failures` terminal writes, then delegates.
    struct FlakyStore {
        inner: Arc<SqliteStore>,
        failures: AtomicUsize,
    }

    impl ExecutionStore for FlakyStore {
        fn create_execution(&self, record: &ExecutionRecord) -> BoxFuture<'_, Result<()>> {
            self.inner.create_execution(record)
        }

        fn update_execution(&self, record: &ExecutionRecord) -> BoxFuture<'_, Result<bool>> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Box::pin(async { Err(SuperAgentError::Database("disk I/O error".into())) });
            }
            self.inner.update_execution(record)
        }

        fn get_execution(&self, id: &ExecutionId) -> BoxFuture<'_, Result<Option<ExecutionRecord>>> {
            self.inner.get_execution(id)
        }

        fn list_executions(
            &self,
            filter: &ExecutionFilter,
        ) -> BoxFuture<'_, Result<Vec<ExecutionRecord>>> {
            self.inner.list_executions(filter)
        }

        fn delete_execution(&self, id: &ExecutionId) -> BoxFuture<'_, Result<bool>> {
            self.inner.delete_execution(id)
        }

        fn append_logs(&self, entries: &[ExecutionLogEntry]) -> BoxFuture<'_, Result<()>> {
            self.inner.append_logs(entries)
        }

        fn load_logs(
            &self,
            id: &ExecutionId,
            filter: &LogFilter,
        ) -> BoxFuture<'_, Result<Vec<ExecutionLogEntry>>> {
            self.inner.load_logs(id, filter)
        }
    }

    async fn flaky_service(failures: usize) -> (ExecutionService, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store
            .save_workflow(&chain("wf_flaky", vec![node("a", "echo")]))
            .await
            .unwrap();
        let flaky = Arc::new(FlakyStore {
            inner: store.clone(),
            failures: AtomicUsize::new(failures),
        });
        let engine = Arc::new(ExecutionEngine::new(
            Arc::new(registry()),
            Arc::new(EventBus::default()),
        ));
        (ExecutionService::new(engine, store.clone(), flaky), store)
    }

    #[tokio::test]
    async fn test_finalize_retries_once() {
        let (svc, store) = flaky_service(1).await;
        let rec = svc
            .execute(ExecutionRequest::new("wf_flaky", json!("hi")), None)
            .await
            .unwrap();
        assert_eq!(rec.status, ExecutionStatus::Completed);

        let stored = store.get_execution(&rec.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ExecutionStatus::Completed);
        assert_eq!(stored.agent_results.len(), 1);
    }

    #[tokio::test]
    async fn test_finalize_falls_back_to_failed() {
        let (svc, store) = flaky_service(2).await;
        let rec = svc
            .execute(ExecutionRequest::new("wf_flaky", json!("hi")), None)
            .await
            .unwrap();
        assert_eq!(rec.status, ExecutionStatus::Failed);

        let stored = store.get_execution(&rec.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ExecutionStatus::Failed);
        assert!(stored
            .error
            .as_deref()
            .unwrap()
            .starts_with("Failed to persist execution result:"));
        assert!(stored.agent_results.is_empty());

        let stats = store.workflow_stats("wf_flaky").await.unwrap().unwrap();
        assert_eq!((stats.execution_count, stats.failure_count), (1, 1));
    }

    #[tokio::test]
    async fn test_finalize_gives_up_after_fallback() {
        let (svc, store) = flaky_service(3).await;
        let err = svc
            .execute(ExecutionRequest::new("wf_flaky", json!("hi")), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SuperAgentError::Database(_)));
        assert_eq!(svc.in_flight(), 0);

        let listed = store.list_executions(&ExecutionFilter::default()).await.unwrap();
        assert_eq!(listed[0].status, ExecutionStatus::Running);
    }

    #[tokio::test]
    async fn test_run_examples_reports_each() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let engine = Arc::new(ExecutionEngine::new(
            Arc::new(AgentRegistry::with_builtins()),
            Arc::new(EventBus::default()),
        ));
        let svc = ExecutionService::new(engine, store.clone(), store.clone());

        let examples = superagent_agents::catalog::examples();
        let report = svc.run_examples(&examples, Some("org_demo".into())).await;

        assert_eq!(report.summary.total_examples, examples.len());
        assert_eq!(report.summary.successful, examples.len(), "{:?}", report.results);
        assert_eq!(report.summary.failed, 0);
        assert_eq!(
            report.summary.total_tokens,
            report.results.iter().map(|r| r.tokens_used).sum::<u64>()
        );
        assert!(report.results.iter().all(|r| r.execution_id.is_some()));

        let stored = store.list_workflows(Some("org_demo")).await.unwrap();
        assert_eq!(stored.len(), examples.len());
    }
}
