use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use superagent_core::config::GatewayConfig;

use crate::routes;
use crate::state::AppState;

/// Build the REST router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        // Agent catalog
        .route("/api/agents", get(routes::list_agents))
        .route("/api/agents/{agent_type}/schema", get(routes::agent_schema))
        // Workflows
        .route(
            "/api/workflows",
            get(routes::list_workflows).post(routes::create_workflow),
        )
        .route(
            "/api/workflows/{id}",
            get(routes::get_workflow)
                .put(routes::update_workflow)
                .delete(routes::delete_workflow),
        )
        .route("/api/workflows/{id}/stats", get(routes::workflow_stats))
        // Executions
        .route(
            "/api/executions",
            get(routes::list_executions).post(routes::create_execution),
        )
        .route(
            "/api/executions/{id}",
            get(routes::get_execution).delete(routes::delete_execution),
        )
        .route("/api/executions/{id}/metrics", get(routes::execution_metrics))
        .route("/api/executions/{id}/logs", get(routes::execution_logs))
        // Example workflows
        .route("/api/examples", get(routes::list_examples))
        .route("/api/examples/run-all", post(routes::run_all_examples))
        .route("/api/examples/{id}", get(routes::get_example))
        .route(
            "/api/examples/{id}/instantiate",
            post(routes::instantiate_example),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// HTTP gateway server built on axum.
pub struct GatewayServer {
    config: GatewayConfig,
    state: Arc<AppState>,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// Run the gateway server until the cancellation token is triggered.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let app = router(self.state.clone());

        let listener = TcpListener::bind(&self.config.bind).await?;
        info!(bind = %self.config.bind, "Gateway listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Gateway shut down");
        Ok(())
    }
}
