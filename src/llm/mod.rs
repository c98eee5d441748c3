//! LLM: chat-completion client and the text-producer boundary.
//!
//! DESIGN
//! ======
//! `CompletionClient` talks HTTP and returns typed `LlmError`s. Callers that
//! only need "text or nothing" go through [`produce_text`], which turns
//! missing configuration into a silent no-op and folds every failure into
//! empty text after logging it. Downstream, empty text fails to render and
//! rides the normal retry path, so there is a single failure path.

pub mod completion;
pub mod types;

use tracing::{debug, warn};

pub use completion::CompletionClient;
pub use types::{ChatCompletion, Message};

use crate::error::ErrorCode;

/// Default sampling temperature for diagram generation.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Ask the completion service for text, never failing.
///
/// Returns empty text without touching the network when `messages` is empty
/// or `endpoint`/`api_key` is blank. Request, status, and shape failures are
/// logged and also yield empty text, so callers must read empty as
/// "no usable output".
pub async fn produce_text(
    llm: &dyn ChatCompletion,
    endpoint: &str,
    api_key: &str,
    messages: &[Message],
    temperature: f32,
) -> String {
    if messages.is_empty() || endpoint.trim().is_empty() || api_key.trim().is_empty() {
        debug!(
            messages = messages.len(),
            has_endpoint = !endpoint.trim().is_empty(),
            has_api_key = !api_key.trim().is_empty(),
            "llm: completion skipped, not configured"
        );
        return String::new();
    }

    match llm.complete(endpoint, api_key, messages, temperature).await {
        Ok(text) => {
            debug!(chars = text.len(), "llm: completion ok");
            text
        }
        Err(e) => {
            warn!(error = %e, code = e.error_code(), "llm: completion failed");
            String::new()
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

// =============================================================================
// TEST HELPERS
// =============================================================================
