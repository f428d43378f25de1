//! Cardwise HTTP server

use cardwise::api::{create_router, AppState};
use cardwise::config::AppConfig;
use cardwise::engine::CardEngine;
use cardwise::interaction_log::InteractionLog;
use cardwise::llm::{LlmConfig, ProviderRegistry};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardwise=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::load()?;

    let registry = ProviderRegistry::new(&config.models, LlmConfig::from_env());
    tracing::info!(
        providers = ?registry.providers_info().iter().map(|p| p.name).collect::<Vec<_>>(),
        default = %registry.default_provider(),
        "Provider registry initialized"
    );

    let log = InteractionLog::new(&config.logging);
    if let Some(path) = log.path() {
        tracing::info!(path = %path.display(), "Interaction log enabled");
    }

    let state = AppState::new(CardEngine::new(registry, log));

    // Create router
    let cors = if config.server.cors_origin == "*" {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(config.server.cors_origin.parse::<axum::http::HeaderValue>()?)
    }
    .allow_methods(Any)
    .allow_headers(Any);

    let app = create_router(state)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.server.addr();
    tracing::info!("Cardwise server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
