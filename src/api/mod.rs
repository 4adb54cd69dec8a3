//! HTTP API for submitting queries.
//!
//! ## Endpoints
//!
//! - `POST /api/query` - Answer a query and return its transcript
//! - `GET /api/health` - Health check

pub mod routes;
pub mod types;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::agent::Agent;
use crate::config::Config;

pub use routes::AppState;

/// Build the agent from `config` and serve the API until shutdown.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let agent = Agent::from_config(&config)?;
    let tool_names = agent
        .tools()
        .list_tools()
        .into_iter()
        .map(|t| t.name)
        .collect::<Vec<_>>();
    tracing::info!("Registered tools: {}", tool_names.join(", "));

    let state = Arc::new(AppState::new(agent));
    let app = routes::routes()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
