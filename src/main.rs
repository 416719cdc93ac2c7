use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use manipulation_factory::{
    api, auth,
    config::{ContentConfig, GameConfig, ServerConfig},
    content::ContentService,
    llm,
    state::AppState,
    watcher,
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "manipulation_factory=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Manipulation Factory...");

    let auth_config = Arc::new(auth::AuthConfig::from_env());
    let game_config = GameConfig::from_env();
    let server_config = ServerConfig::from_env();

    let llm_config = llm::LlmConfig::from_env();
    let llm_manager = match llm_config.build_manager() {
        Ok(manager) => {
            tracing::info!(
                "LLM providers initialized: {}",
                manager.provider_names().join(", ")
            );
            Some(Arc::new(manager))
        }
        Err(e) => {
            tracing::warn!("{}. Rounds will use canned content.", e);
            None
        }
    };
    let content = ContentService::new(llm_manager, ContentConfig::from_env(&llm_config));

    let static_dir = server_config.static_dir.clone();
    let tick_interval = server_config.tick_interval;
    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));

    let state = Arc::new(AppState::with_config(game_config, server_config, content));

    // Closes guessing and reveal screens once their time is up
    watcher::spawn_phase_watcher(state.clone(), tick_interval);

    let app = api::router(state, auth_config)
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
