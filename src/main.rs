mod config;
mod error;
mod llm;
mod render;
mod routes;
mod services;
mod state;

use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is normal outside development.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env()?;

    if config.settings.endpoint.is_empty() || config.settings.api_key.is_empty() {
        tracing::warn!("LLM endpoint or key not configured; requests must supply their own");
    }

    let llm = Arc::new(llm::CompletionClient::new(config.timeouts)?);
    let engine = render::engine_from_config(&config);
    tracing::info!(engine = engine.name(), settings = ?config.settings, "diagram engine ready");

    let state = state::AppState::new(config.settings.clone(), llm, engine);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    tracing::info!(port = config.port, "diagramgen listening");
    axum::serve(listener, app).await?;
    Ok(())
}
