use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::BoxFuture;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

use superagent_core::error::{Result, SuperAgentError};
use superagent_core::execution::{
    AgentRunRecord, ExecutionFilter, ExecutionLogEntry, ExecutionRecord, LogFilter,
};
use superagent_core::traits::{ExecutionStore, WorkflowStore};
use superagent_core::types::{ExecutionId, ExecutionStatus, RunOutcome};
use superagent_core::workflow::{AgentInstance, Edge, WorkflowGraph, WorkflowStats};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS workflows (
        id TEXT PRIMARY KEY,
        org_id TEXT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        agents TEXT NOT NULL,
        edges TEXT NOT NULL,
        execution_count INTEGER NOT NULL DEFAULT 0,
        success_count INTEGER NOT NULL DEFAULT 0,
        failure_count INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS executions (
        id TEXT PRIMARY KEY,
        workflow_id TEXT NOT NULL,
        org_id TEXT,
        status TEXT NOT NULL,
        input TEXT NOT NULL,
        output TEXT,
        error TEXT,
        agent_results TEXT NOT NULL DEFAULT '[]',
        tokens_used INTEGER NOT NULL DEFAULT 0,
        cost REAL NOT NULL DEFAULT 0,
        latency_ms INTEGER NOT NULL DEFAULT 0,
        duration_seconds REAL,
        created_at TEXT NOT NULL,
        started_at TEXT,
        completed_at TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_executions_workflow
        ON executions(workflow_id, created_at);

    CREATE TABLE IF NOT EXISTS execution_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        execution_id TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        level TEXT NOT NULL,
        component TEXT NOT NULL,
        message TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_execution_logs_exec
        ON execution_logs(execution_id, id);
";

const EXECUTION_COLUMNS: &str = "id, workflow_id, org_id, status, input, output, error, \
     agent_results, tokens_used, cost, latency_ms, duration_seconds, created_at, started_at, \
     completed_at";

const WORKFLOW_COLUMNS: &str = "id, org_id, name, description, agents, edges, \
     execution_count, success_count, failure_count, created_at, updated_at";

/// SQLite-backed store for workflows, execution records, and execution logs.
///
/// Implements both [`WorkflowStore`] and [`ExecutionStore`] over a single
/// connection, so a terminal execution write and its workflow rollup can
/// share one transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SuperAgentError::Database(format!("Failed to create db directory: {}", e))
            })?;
        }

        let conn = Connection::open(path).map_err(db)?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(db)?;
        conn.execute_batch(SCHEMA).map_err(db)?;

        debug!(path = %path.display(), "SQLite store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db)?;
        conn.execute_batch(SCHEMA).map_err(db)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SuperAgentError::Database(e.to_string()))
    }
}

fn db(e: rusqlite::Error) -> SuperAgentError {
    SuperAgentError::Database(e.to_string())
}

fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SuperAgentError::Database(format!("bad timestamp '{s}': {e}")))
}

fn parse_optional_timestamp(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_timestamp).transpose()
}

fn bump_counters(conn: &Connection, workflow_id: &str, outcome: RunOutcome) -> Result<()> {
    let (success, failure) = match outcome {
        RunOutcome::Success => (1i64, 0i64),
        RunOutcome::Failure => (0, 1),
    };
    conn.execute(
        "UPDATE workflows SET
            execution_count = execution_count + 1,
            success_count = success_count + ?2,
            failure_count = failure_count + ?3
         WHERE id = ?1",
        params![workflow_id, success, failure],
    )
    .map_err(db)?;
    Ok(())
}

// ── Row decoding ──

struct WorkflowRow {
    id: String,
    org_id: Option<String>,
    name: String,
    description: String,
    agents: String,
    edges: String,
    execution_count: i64,
    success_count: i64,
    failure_count: i64,
    created_at: String,
    updated_at: String,
}

impl WorkflowRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            org_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            agents: row.get(4)?,
            edges: row.get(5)?,
            execution_count: row.get(6)?,
            success_count: row.get(7)?,
            failure_count: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn decode(self) -> Result<WorkflowGraph> {
        let agents: Vec<AgentInstance> = serde_json::from_str(&self.agents)?;
        let edges: Vec<Edge> = serde_json::from_str(&self.edges)?;
        Ok(WorkflowGraph {
            id: self.id,
            name: self.name,
            description: self.description,
            agents,
            edges,
            org_id: self.org_id,
            execution_count: self.execution_count.max(0) as u64,
            success_count: self.success_count.max(0) as u64,
            failure_count: self.failure_count.max(0) as u64,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

struct ExecutionRow {
    id: String,
    workflow_id: String,
    org_id: Option<String>,
    status: String,
    input: String,
    output: Option<String>,
    error: Option<String>,
    agent_results: String,
    tokens_used: i64,
    cost: f64,
    latency_ms: i64,
    duration_seconds: Option<f64>,
    created_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
}

impl ExecutionRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            workflow_id: row.get(1)?,
            org_id: row.get(2)?,
            status: row.get(3)?,
            input: row.get(4)?,
            output: row.get(5)?,
            error: row.get(6)?,
            agent_results: row.get(7)?,
            tokens_used: row.get(8)?,
            cost: row.get(9)?,
            latency_ms: row.get(10)?,
            duration_seconds: row.get(11)?,
            created_at: row.get(12)?,
            started_at: row.get(13)?,
            completed_at: row.get(14)?,
        })
    }

    fn decode(self) -> Result<ExecutionRecord> {
        let status: ExecutionStatus = self.status.parse().map_err(SuperAgentError::Database)?;
        let output = self
            .output
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let agent_results: Vec<AgentRunRecord> = serde_json::from_str(&self.agent_results)?;
        Ok(ExecutionRecord {
            id: ExecutionId::from_str(&self.id),
            workflow_id: self.workflow_id,
            org_id: self.org_id,
            status,
            input: self.input,
            output,
            agent_results,
            tokens_used: self.tokens_used.max(0) as u64,
            cost: self.cost,
            latency_ms: self.latency_ms.max(0) as u64,
            duration_seconds: self.duration_seconds,
            error: self.error,
            created_at: parse_timestamp(&self.created_at)?,
            started_at: parse_optional_timestamp(self.started_at)?,
            completed_at: parse_optional_timestamp(self.completed_at)?,
        })
    }
}

// ── Workflows ──

impl WorkflowStore for SqliteStore {
    fn save_workflow(&self, workflow: &WorkflowGraph) -> BoxFuture<'_, Result<()>> {
        let encoded = serde_json::to_string(&workflow.agents)
            .and_then(|agents| Ok((agents, serde_json::to_string(&workflow.edges)?)));
        let id = workflow.id.clone();
        let org_id = workflow.org_id.clone();
        let name = workflow.name.clone();
        let description = workflow.description.clone();
        let created_at = timestamp(&workflow.created_at);
        let updated_at = timestamp(&workflow.updated_at);

        Box::pin(async move {
            let (agents, edges) = encoded?;
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO workflows (id, org_id, name, description, agents, edges, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                    org_id = excluded.org_id,
                    name = excluded.name,
                    description = excluded.description,
                    agents = excluded.agents,
                    edges = excluded.edges,
                    updated_at = excluded.updated_at",
                params![id, org_id, name, description, agents, edges, created_at, updated_at],
            )
            .map_err(db)?;
            debug!(workflow_id = %id, "Workflow saved");
            Ok(())
        })
    }

    fn get_workflow(&self, id: &str) -> BoxFuture<'_, Result<Option<WorkflowGraph>>> {
        let id = id.to_string();

        Box::pin(async move {
            let conn = self.lock()?;
            let row = conn
                .query_row(
                    &format!("SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = ?1"),
                    params![id],
                    WorkflowRow::read,
                )
                .optional()
                .map_err(db)?;
            row.map(WorkflowRow::decode).transpose()
        })
    }

    fn list_workflows(&self, org_id: Option<&str>) -> BoxFuture<'_, Result<Vec<WorkflowGraph>>> {
        let org_id = org_id.map(String::from);

        Box::pin(async move {
            let conn = self.lock()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {WORKFLOW_COLUMNS} FROM workflows
                     WHERE (?1 IS NULL OR org_id = ?1)
                     ORDER BY created_at ASC, rowid ASC"
                ))
                .map_err(db)?;
            let rows = stmt
                .query_map(params![org_id], WorkflowRow::read)
                .map_err(db)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db)?;
            rows.into_iter().map(WorkflowRow::decode).collect()
        })
    }

    fn delete_workflow(&self, id: &str) -> BoxFuture<'_, Result<bool>> {
        let id = id.to_string();

        Box::pin(async move {
            let mut conn = self.lock()?;
            let tx = conn.transaction().map_err(db)?;
            tx.execute(
                "DELETE FROM execution_logs WHERE execution_id IN
                    (SELECT id FROM executions WHERE workflow_id = ?1)",
                params![id],
            )
            .map_err(db)?;
            let executions = tx
                .execute("DELETE FROM executions WHERE workflow_id = ?1", params![id])
                .map_err(db)?;
            let deleted = tx
                .execute("DELETE FROM workflows WHERE id = ?1", params![id])
                .map_err(db)?;
            tx.commit().map_err(db)?;

            if deleted > 0 {
                debug!(workflow_id = %id, executions, "Workflow deleted");
            }
            Ok(deleted > 0)
        })
    }

    fn workflow_stats(&self, id: &str) -> BoxFuture<'_, Result<Option<WorkflowStats>>> {
        let id = id.to_string();

        Box::pin(async move {
            let conn = self.lock()?;
            let counters = conn
                .query_row(
                    "SELECT execution_count, success_count, failure_count FROM workflows WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?)),
                )
                .optional()
                .map_err(db)?;

            Ok(counters.map(|(executions, successes, failures)| {
                WorkflowStats::from_counters(
                    &id,
                    executions.max(0) as u64,
                    successes.max(0) as u64,
                    failures.max(0) as u64,
                )
            }))
        })
    }

    fn increment_workflow_stats(
        &self,
        workflow_id: &str,
        outcome: RunOutcome,
    ) -> BoxFuture<'_, Result<()>> {
        let workflow_id = workflow_id.to_string();

        Box::pin(async move {
            let conn = self.lock()?;
            bump_counters(&conn, &workflow_id, outcome)
        })
    }
}

// ── Executions ──

impl ExecutionStore for SqliteStore {
    fn create_execution(&self, record: &ExecutionRecord) -> BoxFuture<'_, Result<()>> {
        let record = record.clone();

        Box::pin(async move {
            let output = record.output.as_ref().map(|v| v.to_string());
            let agent_results = serde_json::to_string(&record.agent_results)?;
            let conn = self.lock()?;
            conn.execute(
                &format!(
                    "INSERT INTO executions ({EXECUTION_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
                ),
                params![
                    record.id.as_str(),
                    record.workflow_id,
                    record.org_id,
                    record.status.as_str(),
                    record.input,
                    output,
                    record.error,
                    agent_results,
                    record.tokens_used as i64,
                    record.cost,
                    record.latency_ms as i64,
                    record.duration_seconds,
                    timestamp(&record.created_at),
                    record.started_at.as_ref().map(timestamp),
                    record.completed_at.as_ref().map(timestamp),
                ],
            )
            .map_err(db)?;
            Ok(())
        })
    }

    fn update_execution(&self, record: &ExecutionRecord) -> BoxFuture<'_, Result<bool>> {
        let record = record.clone();

        Box::pin(async move {
            let output = record.output.as_ref().map(|v| v.to_string());
            let agent_results = serde_json::to_string(&record.agent_results)?;

            let mut conn = self.lock()?;
            let tx = conn.transaction().map_err(db)?;
            let changed = tx
                .execute(
                    "UPDATE executions SET
                        status = ?2, output = ?3, error = ?4, agent_results = ?5,
                        tokens_used = ?6, cost = ?7, latency_ms = ?8, duration_seconds = ?9,
                        started_at = ?10, completed_at = ?11
                     WHERE id = ?1 AND status NOT IN ('completed', 'failed')",
                    params![
                        record.id.as_str(),
                        record.status.as_str(),
                        output,
                        record.error,
                        agent_results,
                        record.tokens_used as i64,
                        record.cost,
                        record.latency_ms as i64,
                        record.duration_seconds,
                        record.started_at.as_ref().map(timestamp),
                        record.completed_at.as_ref().map(timestamp),
                    ],
                )
                .map_err(db)?;

            if changed == 1 {
                if let Some(outcome) = RunOutcome::from_status(record.status) {
                    bump_counters(&tx, &record.workflow_id, outcome)?;
                }
            }
            tx.commit().map_err(db)?;

            debug!(
                execution_id = %record.id,
                status = %record.status,
                applied = changed == 1,
                "Execution updated"
            );
            Ok(changed == 1)
        })
    }

    fn get_execution(&self, id: &ExecutionId) -> BoxFuture<'_, Result<Option<ExecutionRecord>>> {
        let id = id.as_str().to_string();

        Box::pin(async move {
            let conn = self.lock()?;
            let row = conn
                .query_row(
                    &format!("SELECT {EXECUTION_COLUMNS} FROM executions WHERE id = ?1"),
                    params![id],
                    ExecutionRow::read,
                )
                .optional()
                .map_err(db)?;
            row.map(ExecutionRow::decode).transpose()
        })
    }

    fn list_executions(
        &self,
        filter: &ExecutionFilter,
    ) -> BoxFuture<'_, Result<Vec<ExecutionRecord>>> {
        let workflow_id = filter.workflow_id.clone();
        let org_id = filter.org_id.clone();
        let status = filter.status.map(|s| s.as_str());
        // SQLite treats a negative LIMIT as unbounded.
        let limit = filter.limit.map_or(-1, |l| l as i64);
        let offset = filter.offset.unwrap_or(0) as i64;

        Box::pin(async move {
            let conn = self.lock()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {EXECUTION_COLUMNS} FROM executions
                     WHERE (?1 IS NULL OR workflow_id = ?1)
                       AND (?2 IS NULL OR status = ?2)
                       AND (?5 IS NULL OR org_id = ?5)
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ?3 OFFSET ?4"
                ))
                .map_err(db)?;
            let rows = stmt
                .query_map(
                    params![workflow_id, status, limit, offset, org_id],
                    ExecutionRow::read,
                )
                .map_err(db)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db)?;
            rows.into_iter().map(ExecutionRow::decode).collect()
        })
    }

    fn delete_execution(&self, id: &ExecutionId) -> BoxFuture<'_, Result<bool>> {
        let id = id.as_str().to_string();

        Box::pin(async move {
            let mut conn = self.lock()?;
            let tx = conn.transaction().map_err(db)?;
            tx.execute(
                "DELETE FROM execution_logs WHERE execution_id = ?1",
                params![id],
            )
            .map_err(db)?;
            let deleted = tx
                .execute("DELETE FROM executions WHERE id = ?1", params![id])
                .map_err(db)?;
            tx.commit().map_err(db)?;
            Ok(deleted > 0)
        })
    }

    fn append_logs(&self, entries: &[ExecutionLogEntry]) -> BoxFuture<'_, Result<()>> {
        let entries: Vec<_> = entries
            .iter()
            .map(|e| {
                (
                    e.execution_id.as_str().to_string(),
                    timestamp(&e.timestamp),
                    e.level.as_str(),
                    e.component.clone(),
                    e.message.clone(),
                )
            })
            .collect();

        Box::pin(async move {
            let conn = self.lock()?;
            for (execution_id, ts, level, component, message) in &entries {
                conn.execute(
                    "INSERT INTO execution_logs (execution_id, timestamp, level, component, message)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![execution_id, ts, level, component, message],
                )
                .map_err(db)?;
            }
            Ok(())
        })
    }

    fn load_logs(
        &self,
        id: &ExecutionId,
        filter: &LogFilter,
    ) -> BoxFuture<'_, Result<Vec<ExecutionLogEntry>>> {
        let id = id.clone();
        let level = filter.level.map(|l| l.as_str());
        let component = filter.agent_id.clone();

        Box::pin(async move {
            let conn = self.lock()?;
            let mut stmt = conn
                .prepare(
                    "SELECT timestamp, level, component, message FROM execution_logs
                     WHERE execution_id = ?1
                       AND (?2 IS NULL OR level = ?2)
                       AND (?3 IS NULL OR component = ?3)
                     ORDER BY id ASC",
                )
                .map_err(db)?;
            let rows = stmt
                .query_map(params![id.as_str(), level, component], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })
                .map_err(db)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db)?;

            rows.into_iter()
                .map(|(ts, level, component, message)| {
                    Ok(ExecutionLogEntry {
                        timestamp: parse_timestamp(&ts)?,
                        execution_id: id.clone(),
                        level: level.parse().map_err(SuperAgentError::Database)?,
                        component,
                        message,
                    })
                })
                .collect()
        })
    }
}
