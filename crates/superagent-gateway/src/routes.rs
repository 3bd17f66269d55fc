use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use superagent_core::execution::{
    ExecutionFilter, ExecutionLogEntry, ExecutionMetrics, ExecutionRecord, ExecutionRequest,
    LogFilter, LogLevel,
};
use superagent_core::types::{new_workflow_id, ExecutionId, ExecutionStatus};
use superagent_core::workflow::{AgentInstance, Edge, WorkflowGraph, WorkflowStats};
use superagent_agents::catalog::{self, ExampleRunReport};
use superagent_core::SuperAgentError;

use crate::error::ApiError;
use crate::middleware::OrgId;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

// GET /api/health
pub async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ── Agents ──────────────────────────────────────────────────────

// GET /api/agents
pub async fn list_agents(State(state): State<Arc<AppState>>) -> Json<Value> {
    let defs = state.registry.list_all();
    let agents: Vec<_> = defs.iter().map(|d| d.as_ref()).collect();
    Json(serde_json::json!({ "agents": agents }))
}

// GET /api/agents/{agent_type}/schema
pub async fn agent_schema(
    State(state): State<Arc<AppState>>,
    Path(agent_type): Path<String>,
) -> ApiResult<Json<Value>> {
    let schema = state
        .registry
        .config_schema(&agent_type)
        .map_err(|e| ApiError::not_found(e.to_string()))?;
    Ok(Json(serde_json::json!({
        "agent_type": agent_type,
        "schema": schema,
    })))
}

// ── Workflows ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct WorkflowBody {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub agents: Vec<AgentInstance>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

async fn load_workflow(state: &AppState, org: &OrgId, id: &str) -> ApiResult<WorkflowGraph> {
    state
        .workflows
        .get_workflow(id)
        .await?
        .filter(|wf| org.can_see(wf.org_id.as_deref()))
        .ok_or_else(|| SuperAgentError::WorkflowNotFound(id.to_string()).into())
}

// POST /api/workflows
pub async fn create_workflow(
    State(state): State<Arc<AppState>>,
    org: OrgId,
    Json(body): Json<WorkflowBody>,
) -> ApiResult<(StatusCode, Json<WorkflowGraph>)> {
    let id = body.id.unwrap_or_else(new_workflow_id);
    if state.workflows.get_workflow(&id).await?.is_some() {
        return Err(ApiError::bad_request(format!("Workflow already exists: {id}")));
    }

    let mut graph = WorkflowGraph::new(&id, &body.name, body.agents, body.edges);
    graph.description = body.description;
    graph.org_id = org.0;
    state.service.engine().validate(&graph)?;

    state.workflows.save_workflow(&graph).await?;
    info!(workflow_id = %graph.id, agents = graph.agents.len(), "Workflow created");
    Ok((StatusCode::CREATED, Json(graph)))
}

// GET /api/workflows
pub async fn list_workflows(
    State(state): State<Arc<AppState>>,
    org: OrgId,
) -> ApiResult<Json<Value>> {
    let workflows = state.workflows.list_workflows(org.0.as_deref()).await?;
    Ok(Json(serde_json::json!({ "workflows": workflows })))
}

// GET /api/workflows/{id}
pub async fn get_workflow(
    State(state): State<Arc<AppState>>,
    org: OrgId,
    Path(id): Path<String>,
) -> ApiResult<Json<WorkflowGraph>> {
    Ok(Json(load_workflow(&state, &org, &id).await?))
}

// PUT /api/workflows/{id}
pub async fn update_workflow(
    State(state): State<Arc<AppState>>,
    org: OrgId,
    Path(id): Path<String>,
    Json(body): Json<WorkflowBody>,
) -> ApiResult<Json<WorkflowGraph>> {
    let mut graph = load_workflow(&state, &org, &id).await?;
    graph.name = body.name;
    graph.description = body.description;
    graph.agents = body.agents;
    graph.edges = body.edges;
    graph.updated_at = Utc::now();
    state.service.engine().validate(&graph)?;

    state.workflows.save_workflow(&graph).await?;
    info!(workflow_id = %graph.id, "Workflow updated");
    Ok(Json(graph))
}

// DELETE /api/workflows/{id}
pub async fn delete_workflow(
    State(state): State<Arc<AppState>>,
    org: OrgId,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    load_workflow(&state, &org, &id).await?;
    state.workflows.delete_workflow(&id).await?;
    info!(workflow_id = %id, "Workflow deleted");
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/workflows/{id}/stats
pub async fn workflow_stats(
    State(state): State<Arc<AppState>>,
    org: OrgId,
    Path(id): Path<String>,
) -> ApiResult<Json<WorkflowStats>> {
    load_workflow(&state, &org, &id).await?;
    let stats = state
        .workflows
        .workflow_stats(&id)
        .await?
        .ok_or(SuperAgentError::WorkflowNotFound(id))?;
    Ok(Json(stats))
}

// ── Executions ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ExecuteQuery {
    #[serde(default)]
    pub wait: bool,
}

// POST /api/executions?wait=true
pub async fn create_execution(
    State(state): State<Arc<AppState>>,
    org: OrgId,
    Query(q): Query<ExecuteQuery>,
    Json(request): Json<ExecutionRequest>,
) -> ApiResult<(StatusCode, Json<ExecutionRecord>)> {
    load_workflow(&state, &org, &request.workflow_id).await?;

    if q.wait {
        let record = state.service.execute(request, org.0).await?;
        Ok((StatusCode::OK, Json(record)))
    } else {
        let record = state.service.start(request, org.0).await?;
        Ok((StatusCode::ACCEPTED, Json(record)))
    }
}

#[derive(Deserialize)]
pub struct ExecutionListQuery {
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

// GET /api/executions?workflow_id&status&limit&offset
pub async fn list_executions(
    State(state): State<Arc<AppState>>,
    org: OrgId,
    Query(q): Query<ExecutionListQuery>,
) -> ApiResult<Json<Value>> {
    let status = q
        .status
        .as_deref()
        .map(str::parse::<ExecutionStatus>)
        .transpose()
        .map_err(ApiError::bad_request)?;

    let filter = ExecutionFilter {
        workflow_id: q.workflow_id,
        status,
        limit: Some(q.limit),
        offset: Some(q.offset),
        org_id: org.0,
    };
    let executions = state.executions.list_executions(&filter).await?;
    Ok(Json(serde_json::json!({ "executions": executions })))
}

async fn load_execution(state: &AppState, org: &OrgId, id: &str) -> ApiResult<ExecutionRecord> {
    state
        .executions
        .get_execution(&ExecutionId::from_str(id))
        .await?
        .filter(|rec| org.can_see(rec.org_id.as_deref()))
        .ok_or_else(|| SuperAgentError::ExecutionNotFound(id.to_string()).into())
}

// GET /api/executions/{id}
pub async fn get_execution(
    State(state): State<Arc<AppState>>,
    org: OrgId,
    Path(id): Path<String>,
) -> ApiResult<Json<ExecutionRecord>> {
    Ok(Json(load_execution(&state, &org, &id).await?))
}

// GET /api/executions/{id}/metrics
pub async fn execution_metrics(
    State(state): State<Arc<AppState>>,
    org: OrgId,
    Path(id): Path<String>,
) -> ApiResult<Json<ExecutionMetrics>> {
    Ok(Json(load_execution(&state, &org, &id).await?.metrics()))
}

#[derive(Deserialize)]
pub struct LogQuery {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
}

// GET /api/executions/{id}/logs?level&agent_id
pub async fn execution_logs(
    State(state): State<Arc<AppState>>,
    org: OrgId,
    Path(id): Path<String>,
    Query(q): Query<LogQuery>,
) -> ApiResult<Json<Value>> {
    let record = load_execution(&state, &org, &id).await?;
    let filter = LogFilter {
        level: q
            .level
            .as_deref()
            .map(str::parse::<LogLevel>)
            .transpose()
            .map_err(ApiError::bad_request)?,
        agent_id: q.agent_id,
    };
    let logs: Vec<ExecutionLogEntry> = state.executions.load_logs(&record.id, &filter).await?;
    Ok(Json(serde_json::json!({
        "execution_id": record.id,
        "logs": logs,
    })))
}

// DELETE /api/executions/{id}
pub async fn delete_execution(
    State(state): State<Arc<AppState>>,
    org: OrgId,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = load_execution(&state, &org, &id).await?.id;
    if state.service.cancel(&id) {
        info!(execution_id = %id, "In-flight execution cancelled");
    }
    if state.executions.delete_execution(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(SuperAgentError::ExecutionNotFound(id.to_string()).into())
    }
}

// ── Examples ────────────────────────────────────────────────────

fn load_example(id: &str) -> ApiResult<catalog::ExampleWorkflow> {
    catalog::find(id).ok_or_else(|| ApiError::not_found(format!("Example not found: {id}")))
}

// GET /api/examples
pub async fn list_examples() -> Json<Value> {
    let examples = catalog::examples();
    Json(serde_json::json!({
        "count": examples.len(),
        "examples": examples,
    }))
}

// GET /api/examples/{id}
pub async fn get_example(Path(id): Path<String>) -> ApiResult<Json<catalog::ExampleWorkflow>> {
    Ok(Json(load_example(&id)?))
}

// POST /api/examples/{id}/instantiate
pub async fn instantiate_example(
    State(state): State<Arc<AppState>>,
    org: OrgId,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let example = load_example(&id)?;
    let graph = example.instantiate(org.0);
    state.service.engine().validate(&graph)?;
    state.workflows.save_workflow(&graph).await?;
    info!(example = example.id, workflow_id = %graph.id, "Example instantiated");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "workflow_id": graph.id,
            "message": format!("Created workflow from example: {}", example.name),
            "sample_input": example.sample_input,
            "workflow": graph,
        })),
    ))
}

// POST /api/examples/run-all
pub async fn run_all_examples(
    State(state): State<Arc<AppState>>,
    org: OrgId,
) -> Json<ExampleRunReport> {
    let report = state.service.run_examples(&catalog::examples(), org.0).await;
    info!(
        successful = report.summary.successful,
        failed = report.summary.failed,
        "Example run complete"
    );
    Json(report)
}
