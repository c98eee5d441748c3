//! Diagram generation routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::config::{Settings, parse_retries};
use crate::error::ErrorCode;
use crate::services::diagram::{self, RenderRequest, RenderResult};
use crate::services::prompts::{ARCHITECTURE_SYSTEM_PROMPT, DEFAULT_SYSTEM_PROMPT, DEMOS, Demo};
use crate::state::AppState;

/// Retry count as a form sends it: a number, the raw text field, or
/// anything else a client puts there. Every shape resolves to a count.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RetriesInput {
    Number(i64),
    Fraction(f64),
    Text(String),
    Other(IgnoredAny),
}

impl RetriesInput {
    /// Zero means "use the default" downstream.
    fn resolve(&self) -> u32 {
        match self {
            Self::Number(n) => u32::try_from(*n).unwrap_or(0),
            Self::Fraction(f) => parse_retries(&f.to_string()),
            Self::Text(raw) => parse_retries(raw),
            Self::Other(_) => 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    /// Non-blank literal text skips the LLM, as on `update`.
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub prompt: String,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub retries: Option<RetriesInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
    #[serde(default)]
    pub code: String,
    pub retries: Option<RetriesInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramResponse {
    pub svg: String,
    pub code: String,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_box: Option<String>,
}

/// Current slot contents; `target` is the slot id the SVG was rendered for.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotResponse {
    pub target: String,
    pub svg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_box: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemosResponse {
    pub system: &'static str,
    pub default_system: &'static str,
    pub demos: &'static [Demo],
}

/// `POST /api/diagram/generate`: ask the LLM for a diagram and render it.
pub async fn generate(State(state): State<AppState>, Json(body): Json<GenerateBody>) -> Response {
    let settings = state.settings.with_overrides(
        body.endpoint.as_deref(),
        body.api_key.as_deref(),
        body.retries.as_ref().map(RetriesInput::resolve),
    );
    let request = RenderRequest::from_inputs(&body.code, &body.system, &body.prompt);
    run(&state, &request, &settings).await
}

/// `POST /api/diagram/update`: render caller-edited diagram text as-is.
pub async fn update(State(state): State<AppState>, Json(body): Json<UpdateBody>) -> Response {
    let settings = state
        .settings
        .with_overrides(None, None, body.retries.as_ref().map(RetriesInput::resolve));
    let request = RenderRequest::Literal(body.code);
    run(&state, &request, &settings).await
}

/// `GET /api/demos`: starter system instruction and demo prompts.
pub async fn demos() -> Json<DemosResponse> {
    Json(DemosResponse { system: ARCHITECTURE_SYSTEM_PROMPT, default_system: DEFAULT_SYSTEM_PROMPT, demos: &DEMOS })
}

/// `GET /api/diagram`: the artifact currently shown in the slot.
pub async fn current(State(state): State<AppState>) -> Response {
    let Ok(slot) = state.slot.try_lock() else {
        return busy();
    };
    match slot.contents() {
        Some(artifact) => {
            let body = SlotResponse {
                target: artifact.target_id().to_owned(),
                svg: artifact.markup().to_owned(),
                view_box: artifact.root().view_box.clone(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no diagram rendered yet", "code": "E_RENDER_NONE" })),
        )
            .into_response(),
    }
}

async fn run(state: &AppState, request: &RenderRequest, settings: &Settings) -> Response {
    let Ok(mut slot) = state.slot.try_lock() else {
        return busy();
    };

    let result = diagram::render_diagram(state.llm.as_ref(), state.engine.as_ref(), &mut slot, request, settings).await;
    to_response(&result)
}

fn busy() -> Response {
    info!("diagram: rejected, render already in progress");
    (
        StatusCode::CONFLICT,
        Json(json!({ "error": "a render is already in progress", "code": "E_RENDER_BUSY" })),
    )
        .into_response()
}

fn to_response(result: &RenderResult) -> Response {
    if let Some(artifact) = result.artifact() {
        let body = DiagramResponse {
            svg: artifact.markup().to_owned(),
            code: result.source_text.clone(),
            attempts: result.attempts,
            view_box: artifact.root().view_box.clone(),
        };
        return (StatusCode::OK, Json(body)).into_response();
    }
    let (error, code) = result.error().map_or_else(
        || ("render failed".to_owned(), "E_RENDER_ENGINE"),
        |e| (e.to_string(), e.error_code()),
    );
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": error, "code": code, "attempts": result.attempts })),
    )
        .into_response()
}

#[cfg(test)]
#[path = "diagram_test.rs"]
mod tests;
