//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! JSON API for the diagram generator plus a health probe. CORS is open so
//! any front end can call it; every request is traced.

pub mod diagram;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/diagram", get(diagram::current))
        .route("/api/diagram/generate", post(diagram::generate))
        .route("/api/diagram/update", post(diagram::update))
        .route("/api/demos", get(diagram::demos))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
