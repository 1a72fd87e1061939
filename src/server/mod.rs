use axum::{
    Router,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    config::Config,
    error::Result,
    router::{RouteTable, RouteTableFactory},
};

pub mod error_handling;
pub mod routes;

/// Shared request state: the route table is read-only once serving starts
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<RouteTable>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(table: RouteTable) -> Self {
        Self {
            table: Arc::new(table),
            started_at: Utc::now(),
        }
    }
}

/// HTTP surface for a route table.
///
/// Every registered path `P` answers `POST /P/invoke`, `POST /P/batch`
/// and `GET /P/input_schema`.
pub fn app(table: RouteTable) -> Router {
    Router::new()
        .route("/health", get(routes::health_check))
        .route(
            "/{*path}",
            post(routes::post_route).get(routes::get_route),
        )
        .with_state(AppState::new(table))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub struct ChainServer {
    config: Config,
}

impl ChainServer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn start(&self) -> Result<()> {
        // Configuration errors abort here, before anything is bound
        let table = RouteTableFactory::from_config(&self.config)?;
        info!("Serving {} route(s): {}", table.len(), table.paths().join(", "));

        let app = app(table);

        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = TcpListener::bind(&addr).await?;

        info!("chainserve listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("chainserve stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
