use axum::routing::{get, post};
use axum::Router;
use tracing_subscriber::EnvFilter;

use repo_assistant::api;
use repo_assistant::config::Config;
use repo_assistant::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!(
        "LLM provider: {} ({})",
        config.llm.provider,
        config.llm.base_url
    );

    let state = AppState::new(config.clone())?;
    if state.store.count() > 0 {
        tracing::info!("Loaded {} existing file summaries", state.store.count());
    }

    let app = Router::new()
        .route("/api/ingest", post(api::ingest::ingest))
        .route("/api/status", get(api::ingest::status))
        .route("/api/query", post(api::query::query))
        .route("/api/stats", get(api::query::stats))
        .route("/api/tools/search_code", post(api::tools::search_code))
        .route("/api/tools/file_content", post(api::tools::file_content))
        .route("/api/tools/structure", post(api::tools::structure))
        .route(
            "/api/tools/explain_function",
            post(api::tools::explain_function),
        )
        .route("/api/tools/explain_class", post(api::tools::explain_class))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
