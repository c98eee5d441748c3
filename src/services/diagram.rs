//! Diagram service: diagram text → rendered SVG, with bounded retries.
//!
//! DESIGN
//! ======
//! One cycle is: acquire text (literal, or ask the LLM), clear the slot,
//! render into it. Any failure, including empty text from an unconfigured
//! or failing LLM, takes the same path: log, wait the fixed backoff, run
//! the whole cycle again. Prompt mode regenerates the text every attempt.
//! After the last attempt fails the result carries the last render error
//! and no artifact; the slot is left empty.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::Settings;
use crate::error::ErrorCode;
use crate::llm::{self, ChatCompletion, Message};
use crate::render::{Artifact, RenderEngine, RenderError, RenderSlot};
use crate::services::prompts::system_or_default;

// =============================================================================
// TYPES
// =============================================================================

/// Where the diagram text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderRequest {
    /// Render this text as-is; the LLM is never called.
    Literal(String),
    /// Ask the LLM for fresh text every attempt.
    Prompt { system: String, prompt: String },
}

impl RenderRequest {
    /// Pick the mode from raw form inputs: non-blank literal text wins.
    #[must_use]
    pub fn from_inputs(code: &str, system: &str, prompt: &str) -> Self {
        if code.trim().is_empty() {
            Self::Prompt { system: system.to_owned(), prompt: prompt.to_owned() }
        } else {
            Self::Literal(code.to_owned())
        }
    }

    fn mode(&self) -> &'static str {
        match self {
            Self::Literal(_) => "literal",
            Self::Prompt { .. } => "prompt",
        }
    }
}

/// Outcome of [`render_diagram`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
    /// Text that produced the artifact; empty on failure.
    pub source_text: String,
    /// Attempts made, always at least 1.
    pub attempts: u32,
    pub outcome: Result<Artifact, RenderError>,
}

impl RenderResult {
    #[must_use]
    pub fn artifact(&self) -> Option<&Artifact> {
        self.outcome.as_ref().ok()
    }

    #[must_use]
    pub fn error(&self) -> Option<&RenderError> {
        self.outcome.as_ref().err()
    }
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

/// Produce an artifact for `request` into `slot`, retrying up to
/// `settings.retries` times (at least once).
///
/// Never fails outright: exhaustion is reported through
/// [`RenderResult::outcome`].
pub async fn render_diagram(
    llm: &dyn ChatCompletion,
    engine: &dyn RenderEngine,
    slot: &mut RenderSlot,
    request: &RenderRequest,
    settings: &Settings,
) -> RenderResult {
    let max_attempts = settings.retries.max(1);
    let mut remaining = max_attempts;
    let mut attempt = 0;

    info!(
        mode = request.mode(),
        max_attempts,
        engine = engine.name(),
        slot = %slot.id(),
        "diagram: render started"
    );

    loop {
        attempt += 1;
        let text = acquire_text(llm, request, settings).await;

        slot.clear();
        match engine.render(slot.id(), &text).await {
            Ok(markup) => {
                let artifact = Artifact::new(slot.id(), markup);
                slot.fill(artifact.clone());
                info!(attempt, chars = text.len(), "diagram: render ok");
                return RenderResult { source_text: text, attempts: attempt, outcome: Ok(artifact) };
            }
            Err(e) => {
                remaining -= 1;
                if remaining == 0 {
                    error!(attempts = attempt, error = %e, code = e.error_code(), "diagram: retries exhausted");
                    return RenderResult { source_text: String::new(), attempts: attempt, outcome: Err(e) };
                }
                warn!(attempt, remaining, error = %e, code = e.error_code(), "diagram: render failed, retrying");
                backoff(settings.backoff).await;
            }
        }
    }
}

async fn acquire_text(llm: &dyn ChatCompletion, request: &RenderRequest, settings: &Settings) -> String {
    match request {
        RenderRequest::Literal(text) => text.clone(),
        RenderRequest::Prompt { prompt, .. } if prompt.trim().is_empty() => String::new(),
        RenderRequest::Prompt { system, prompt } => {
            let messages = [Message::system(system_or_default(system)), Message::user(prompt)];
            llm::produce_text(llm, &settings.endpoint, &settings.api_key, &messages, settings.temperature).await
        }
    }
}

async fn backoff(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
#[path = "diagram_test.rs"]
mod tests;
