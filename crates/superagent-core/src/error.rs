use thiserror::Error;

#[derive(Debug, Error)]
pub enum SuperAgentError {
    // Registry errors
    #[error("Unknown agent type: {0}")]
    UnknownAgentType(String),

    // Agent errors
    #[error("Invalid config for agent {agent}: {message}")]
    InvalidConfig { agent: String, message: String },

    #[error("Agent timeout after {timeout_secs}s: {agent}")]
    AgentTimeout { agent: String, timeout_secs: u64 },

    #[error("Execution cancelled")]
    Cancelled,

    // Graph errors
    #[error("Workflow graph contains a cycle involving: {}", .0.join(", "))]
    CyclicGraph(Vec<String>),

    #[error("Invalid workflow graph: {0}")]
    InvalidGraph(String),

    // Lookup errors
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("Execution not found: {0}")]
    ExecutionNotFound(String),

    #[error("Invalid status transition for execution {id}: {from} -> {to}")]
    InvalidTransition { id: String, from: String, to: String },

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Storage errors
    #[error("Database error: {0}")]
    Database(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SuperAgentError {
    /// True for errors caused by a bad request rather than a fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownAgentType(_)
                | Self::InvalidConfig { .. }
                | Self::CyclicGraph(_)
                | Self::InvalidGraph(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::WorkflowNotFound(_) | Self::ExecutionNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, SuperAgentError>;
