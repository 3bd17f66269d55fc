use std::io::{self, BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use superagent_agents::{catalog, AgentRegistry};
use superagent_core::config::AppConfig;
use superagent_core::event::EventBus;
use superagent_core::execution::{ExecutionFilter, ExecutionRequest, LogFilter, LogLevel};
use superagent_core::traits::{ExecutionStore, WorkflowStore};
use superagent_core::types::{EngineEvent, ExecutionId, ExecutionStatus};
use superagent_core::workflow::WorkflowGraph;
use superagent_engine::{ExecutionEngine, ExecutionJournal, ExecutionService};
use superagent_gateway::{AppState, GatewayServer};
use superagent_store::SqliteStore;

#[derive(Parser)]
#[command(name = "superagent", version, about = "Sequential multi-agent workflow engine")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "superagent.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve,
    /// Import a workflow file and run it once
    Run {
        /// Workflow definition (JSON)
        workflow: PathBuf,
        /// Input for the first agent (read from stdin when omitted)
        #[arg(trailing_var_arg = true)]
        input: Vec<String>,
    },
    /// List registered agent types
    Agents,
    /// Manage stored workflows
    Workflow {
        #[command(subcommand)]
        action: WorkflowAction,
    },
    /// Inspect past executions
    Execution {
        #[command(subcommand)]
        action: ExecutionAction,
    },
    /// Browse and run the bundled example workflows
    Examples {
        #[command(subcommand)]
        action: ExampleAction,
    },
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum WorkflowAction {
    /// Validate and store a workflow definition (JSON)
    Import {
        file: PathBuf,
    },
    /// List stored workflows
    List {
        /// Only workflows owned by this tenant
        #[arg(long)]
        org: Option<String>,
    },
    /// Print a workflow as JSON
    Show {
        id: String,
    },
    /// Show run counters and success rate
    Stats {
        id: String,
    },
}

#[derive(Subcommand)]
enum ExampleAction {
    /// List example workflows
    List,
    /// Print an example as JSON
    Show {
        id: String,
    },
    /// Store a copy of an example as a new workflow
    Create {
        id: String,
        #[arg(long)]
        org: Option<String>,
    },
    /// Store and run every example on its sample input
    RunAll {
        #[arg(long)]
        org: Option<String>,
    },
}

#[derive(Subcommand)]
enum ExecutionAction {
    /// List executions, newest first
    List {
        #[arg(long)]
        workflow: Option<String>,
        /// Only executions started under this tenant
        #[arg(long)]
        org: Option<String>,
        /// pending, running, completed or failed
        #[arg(long)]
        status: Option<ExecutionStatus>,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Print an execution record as JSON
    Show {
        id: String,
    },
    /// Print the persisted log of an execution
    Logs {
        id: String,
        /// INFO, WARNING or ERROR
        #[arg(long)]
        level: Option<String>,
        /// Only lines from this agent id
        #[arg(long)]
        agent: Option<String>,
    },
}

/// Everything needed to run workflows: store, registry, engine, journal.
struct Runtime {
    store: Arc<SqliteStore>,
    registry: Arc<AgentRegistry>,
    event_bus: Arc<EventBus>,
    service: ExecutionService,
    shutdown: CancellationToken,
    journal: Option<JoinHandle<()>>,
}

impl Runtime {
    fn start(config: &AppConfig, store: Arc<SqliteStore>) -> Self {
        let registry = Arc::new(AgentRegistry::with_builtins());
        let event_bus = Arc::new(EventBus::new(config.engine.event_capacity));
        let engine = Arc::new(ExecutionEngine::from_config(
            registry.clone(),
            event_bus.clone(),
            &config.engine,
        ));
        let shutdown = CancellationToken::new();
        let service = ExecutionService::new(engine, store.clone(), store.clone())
            .with_shutdown(shutdown.clone());

        let journal = config.journal.enabled.then(|| {
            let journal = ExecutionJournal::new(store.clone());
            tokio::spawn(journal.run(&event_bus, shutdown.clone()))
        });

        info!(agents = registry.len(), "Runtime ready");
        Self {
            store,
            registry,
            event_bus,
            service,
            shutdown,
            journal,
        }
    }

    /// Drop every event sender so the journal drains and exits, then wait for it.
    async fn finish(self) {
        let Runtime {
            event_bus,
            service,
            journal,
            ..
        } = self;
        drop(service);
        drop(event_bus);
        if let Some(handle) = journal {
            if let Err(e) = handle.await {
                warn!(error = %e, "Execution journal task failed");
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("superagent=info,warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    // Handle completions before config loading
    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "superagent", &mut io::stdout());
        return Ok(());
    }

    let config = AppConfig::load_or_default(&cli.config)?;

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Completions { .. } => {}
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Agents => {
            let registry = AgentRegistry::with_builtins();
            for def in registry.list_all() {
                println!(
                    "{:<20} {:<24} {}",
                    def.agent_type, def.name, def.description
                );
            }
        }
        Commands::Serve => {
            let runtime = Runtime::start(&config, open_store(&config)?);
            let state = AppState {
                registry: runtime.registry.clone(),
                service: runtime.service.clone(),
                workflows: runtime.store.clone(),
                executions: runtime.store.clone(),
            };
            let server = GatewayServer::new(config.gateway.clone(), state);

            // Graceful shutdown on Ctrl-C
            let cancel = runtime.shutdown.clone();
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Shutting down gateway...");
                cancel.cancel();
            });

            server.run(runtime.shutdown.clone()).await?;
            runtime.finish().await;
        }
        Commands::Run { workflow, input } => {
            let graph = read_workflow(&workflow)?;
            let runtime = Runtime::start(&config, open_store(&config)?);
            runtime.service.engine().validate(&graph)?;
            runtime.store.save_workflow(&graph).await?;

            let input = if input.is_empty() { read_stdin() } else { input.join(" ") };
            let progress = tokio::spawn(print_progress(runtime.event_bus.subscribe()));

            let record = runtime
                .service
                .execute(ExecutionRequest::new(&graph.id, input.into()), None)
                .await?;
            runtime.finish().await;
            progress.await.ok();

            println!("{}", serde_json::to_string_pretty(&record)?);
            if record.status == ExecutionStatus::Failed {
                anyhow::bail!(
                    "Execution {} failed: {}",
                    record.id,
                    record.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        Commands::Workflow { action } => {
            let store = open_store(&config)?;
            workflow_command(&store, action).await?;
        }
        Commands::Execution { action } => {
            let store = open_store(&config)?;
            execution_command(&store, action).await?;
        }
        Commands::Examples { action } => {
            examples_command(&config, action).await?;
        }
    }

    Ok(())
}

fn open_store(config: &AppConfig) -> anyhow::Result<Arc<SqliteStore>> {
    let path = config.database_path();
    let store = SqliteStore::open(&path)
        .with_context(|| format!("opening database {}", path.display()))?;
    Ok(Arc::new(store))
}

fn read_workflow(path: &Path) -> anyhow::Result<WorkflowGraph> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading workflow {}", path.display()))?;
    let graph: WorkflowGraph = serde_json::from_str(&content)
        .with_context(|| format!("parsing workflow {}", path.display()))?;
    Ok(graph)
}

fn read_stdin() -> String {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return String::new();
    }
    stdin
        .lock()
        .lines()
        .map_while(|l| l.ok())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print agent progress to stderr until the bus closes.
async fn print_progress(mut rx: broadcast::Receiver<EngineEvent>) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "Progress display fell behind");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        match event {
            EngineEvent::ExecutionStarted { order, .. } => {
                eprintln!("Execution order: {}", order.join(" → "));
            }
            EngineEvent::AgentStarted { agent_name, agent_type, .. } => {
                eprintln!("▶ {agent_name} ({agent_type})");
            }
            EngineEvent::AgentCompleted { agent_id, tokens_used, cost, latency_ms, .. } => {
                eprintln!("  ✓ {agent_id}: {tokens_used} tokens, ${cost:.4}, {latency_ms}ms");
            }
            EngineEvent::AgentFailed { agent_id, error, .. } => {
                eprintln!("  ✗ {agent_id}: {error}");
            }
            EngineEvent::ExecutionCompleted { duration_seconds, .. } => {
                eprintln!("Completed in {duration_seconds:.3}s");
            }
            EngineEvent::ExecutionFailed { .. } => {}
        }
    }
}

async fn examples_command(config: &AppConfig, action: ExampleAction) -> anyhow::Result<()> {
    match action {
        ExampleAction::List => {
            for example in catalog::examples() {
                println!(
                    "{:<28} {:<10} agents={} {}",
                    example.id,
                    example.category,
                    example.agents.len(),
                    example.name
                );
            }
        }
        ExampleAction::Show { id } => {
            let example = catalog::find(&id).with_context(|| format!("example not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&example)?);
        }
        ExampleAction::Create { id, org } => {
            let example = catalog::find(&id).with_context(|| format!("example not found: {id}"))?;
            let graph = example.instantiate(org);
            let store = open_store(config)?;
            store.save_workflow(&graph).await?;
            println!("Created workflow {} from {}", graph.id, example.id);
            println!("Sample input: {}", example.sample_input);
        }
        ExampleAction::RunAll { org } => {
            let runtime = Runtime::start(config, open_store(config)?);
            let report = runtime
                .service
                .run_examples(&catalog::examples(), org)
                .await;
            runtime.finish().await;

            for run in &report.results {
                println!(
                    "{:<28} {:<9} tokens={} cost=${:.4}{}",
                    run.example_id,
                    run.status,
                    run.tokens_used,
                    run.cost,
                    run.error
                        .as_deref()
                        .map(|e| format!(" error={e}"))
                        .unwrap_or_default()
                );
            }
            let summary = &report.summary;
            println!(
                "{} examples: {} succeeded, {} failed, {} tokens, ${:.4}",
                summary.total_examples,
                summary.successful,
                summary.failed,
                summary.total_tokens,
                summary.total_cost
            );
            if summary.failed > 0 {
                anyhow::bail!("{} example(s) failed", summary.failed);
            }
        }
    }
    Ok(())
}

async fn workflow_command(store: &SqliteStore, action: WorkflowAction) -> anyhow::Result<()> {
    match action {
        WorkflowAction::Import { file } => {
            let graph = read_workflow(&file)?;
            let registry = Arc::new(AgentRegistry::with_builtins());
            ExecutionEngine::new(registry, Arc::new(EventBus::default())).validate(&graph)?;
            store.save_workflow(&graph).await?;
            println!("Imported workflow {} ({} agents)", graph.id, graph.agents.len());
        }
        WorkflowAction::List { org } => {
            let workflows = store.list_workflows(org.as_deref()).await?;
            if workflows.is_empty() {
                println!("No workflows stored.");
            }
            for wf in workflows {
                println!(
                    "{:<16} {:<32} agents={} runs={}",
                    wf.id,
                    wf.name,
                    wf.agents.len(),
                    wf.execution_count
                );
            }
        }
        WorkflowAction::Show { id } => {
            let wf = store
                .get_workflow(&id)
                .await?
                .with_context(|| format!("workflow not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&wf)?);
        }
        WorkflowAction::Stats { id } => {
            let stats = store
                .workflow_stats(&id)
                .await?
                .with_context(|| format!("workflow not found: {id}"))?;
            println!("Workflow:     {}", stats.workflow_id);
            println!("Executions:   {}", stats.execution_count);
            println!("Successes:    {}", stats.success_count);
            println!("Failures:     {}", stats.failure_count);
            println!("Success rate: {:.2}%", stats.success_rate);
        }
    }
    Ok(())
}

async fn execution_command(store: &SqliteStore, action: ExecutionAction) -> anyhow::Result<()> {
    match action {
        ExecutionAction::List { workflow, org, status, limit } => {
            let filter = ExecutionFilter {
                workflow_id: workflow,
                org_id: org,
                status,
                limit: Some(limit),
                offset: None,
            };
            for rec in store.list_executions(&filter).await? {
                println!(
                    "{:<14} {:<9} {:<16} {} tokens={} cost=${:.4}",
                    rec.id,
                    rec.status,
                    rec.workflow_id,
                    rec.created_at.format("%Y-%m-%d %H:%M:%S"),
                    rec.tokens_used,
                    rec.cost
                );
            }
        }
        ExecutionAction::Show { id } => {
            let rec = store
                .get_execution(&ExecutionId::from_str(&id))
                .await?
                .with_context(|| format!("execution not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&rec)?);
        }
        ExecutionAction::Logs { id, level, agent } => {
            let filter = LogFilter {
                level: level
                    .as_deref()
                    .map(str::parse::<LogLevel>)
                    .transpose()
                    .map_err(anyhow::Error::msg)?,
                agent_id: agent,
            };
            for entry in store.load_logs(&ExecutionId::from_str(&id), &filter).await? {
                println!(
                    "{} {:<7} [{}] {}",
                    entry.timestamp.format("%H:%M:%S%.3f"),
                    entry.level.as_str(),
                    entry.component,
                    entry.message
                );
            }
        }
    }
    Ok(())
}
