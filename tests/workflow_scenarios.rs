use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use superagent_agents::AgentRegistry;
use superagent_core::event::EventBus;
use superagent_core::execution::{ExecutionRecord, ExecutionRequest, LogFilter, LogLevel};
use superagent_core::traits::{ExecutionStore, WorkflowStore};
use superagent_core::types::ExecutionStatus;
use superagent_core::workflow::WorkflowGraph;
use superagent_engine::{ExecutionEngine, ExecutionJournal, ExecutionService};
use superagent_store::SqliteStore;
use superagent_test_utils::{chain, node, node_with_config, temp_dir};

struct Setup {
    store: Arc<SqliteStore>,
    service: ExecutionService,
    shutdown: CancellationToken,
    _dir: tempfile::TempDir,
}

fn setup() -> Setup {
    let dir = temp_dir();
    let store = Arc::new(SqliteStore::open(&dir.path().join("superagent.db")).expect("open db"));
    let bus = Arc::new(EventBus::default());
    let engine = Arc::new(ExecutionEngine::new(
        Arc::new(AgentRegistry::with_builtins()),
        bus.clone(),
    ));
    let shutdown = CancellationToken::new();
    tokio::spawn(ExecutionJournal::new(store.clone()).run(&bus, shutdown.clone()));

    let service = ExecutionService::new(engine, store.clone(), store.clone())
        .with_shutdown(shutdown.clone());
    Setup {
        store,
        service,
        shutdown,
        _dir: dir,
    }
}

async fn run(setup: &Setup, graph: &WorkflowGraph, input: &str) -> ExecutionRecord {
    setup.store.save_workflow(graph).await.expect("save workflow");
    setup
        .service
        .execute(ExecutionRequest::new(&graph.id, json!(input)), None)
        .await
        .expect("execute")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_q4_outreach_happy_path() {
    let setup = setup();
    let graph = chain(
        "wf_q4",
        vec![
            node("sales", "sales_intelligence"),
            node_with_config("email", "email_outreach", json!({"email_template": "follow_up"})),
        ],
    );

    let rec = run(&setup, &graph, "Find Q4 deals").await;

    assert_eq!(rec.status, ExecutionStatus::Completed);
    assert_eq!(rec.input, "Find Q4 deals");
    assert_eq!(rec.agent_results.len(), 2);
    assert!(rec.agent_results.iter().all(|r| r.result.success));
    assert_eq!(
        rec.tokens_used,
        rec.agent_results.iter().map(|r| r.result.tokens_used).sum::<u64>()
    );
    assert!(rec.duration_seconds.is_some());
    assert!(rec.error.is_none());

    let deals = &rec.result_for("sales").unwrap().result.output["deals"];
    assert_eq!(rec.result_for("email").unwrap().input["deals"], *deals);

    let stats = setup.store.workflow_stats("wf_q4").await.unwrap().unwrap();
    assert_eq!((stats.execution_count, stats.success_count), (1, 1));
    assert_eq!(stats.success_rate, 100.0);

    setup.shutdown.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_mid_chain_config_failure() {
    let setup = setup();
    let graph = chain(
        "wf_cfg",
        vec![
            node("sales", "sales_intelligence"),
            node_with_config("email", "email_outreach", json!({"email_template": "newsletter"})),
            node_with_config("notify", "slack", json!({"channel": "#sales"})),
        ],
    );

    let rec = run(&setup, &graph, "Find Q4 deals").await;

    assert_eq!(rec.status, ExecutionStatus::Failed);
    assert_eq!(rec.agent_results.len(), 1);
    let error = rec.error.as_deref().unwrap();
    assert!(error.starts_with("EMAIL (email):"), "{error}");
    assert!(error.contains("email_template"), "{error}");

    let stats = setup.store.workflow_stats("wf_cfg").await.unwrap().unwrap();
    assert_eq!((stats.execution_count, stats.failure_count), (1, 1));

    setup.shutdown.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_agent_type_runs_nothing() {
    let setup = setup();
    let graph = chain(
        "wf_unknown",
        vec![node("sales", "sales_intelligence"), node("fax", "fax_machine")],
    );

    let rec = run(&setup, &graph, "Find Q4 deals").await;

    assert_eq!(rec.status, ExecutionStatus::Failed);
    assert!(rec.agent_results.is_empty());
    assert!(rec.error.as_deref().unwrap().contains("fax_machine"));

    setup.shutdown.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_single_node_ping_is_journaled() {
    let setup = setup();
    let graph = chain(
        "wf_ping",
        vec![node_with_config("notify", "slack", json!({"channel": "#general"}))],
    );

    let rec = run(&setup, &graph, "ping").await;
    assert_eq!(rec.status, ExecutionStatus::Completed);
    assert_eq!(rec.agent_results.len(), 1);
    assert_eq!(rec.agent_results[0].input, json!("ping"));

    // The journal persists events asynchronously.
    let mut logs = Vec::new();
    for _ in 0..100 {
        logs = setup.store.load_logs(&rec.id, &LogFilter::default()).await.unwrap();
        if logs.len() >= 4 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(logs.len(), 4);
    assert_eq!(logs[0].component, "workflow");
    assert!(logs[0].message.contains("NOTIFY"));
    assert!(logs.iter().all(|l| l.level == LogLevel::Info));

    let agent_logs = setup
        .store
        .load_logs(
            &rec.id,
            &LogFilter {
                level: None,
                agent_id: Some("notify".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(agent_logs.len(), 2);

    setup.shutdown.cancel();
}
