//! Chat-completion HTTP client.
//!
//! Speaks the Azure-style deployment API: the caller hands over the full
//! endpoint URL, authentication rides in an `api-key` header, and the reply
//! text lives at `choices[0].message.content`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{ChatCompletion, LlmError, Message};
use crate::config::LlmTimeouts;

pub struct CompletionClient {
    http: reqwest::Client,
}

impl CompletionClient {
    /// Build a client with the given request/connect timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::HttpClientBuild`] if the TLS backend fails to initialize.
    pub fn new(timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http })
    }

    async fn send_json(&self, endpoint: &str, api_key: &str, body: &impl Serialize) -> Result<String, LlmError> {
        let response = self
            .http
            .post(endpoint)
            .header("api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
        if !status.is_success() {
            return Err(LlmError::ApiResponse { status: status.as_u16(), body: text });
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl ChatCompletion for CompletionClient {
    async fn complete(
        &self,
        endpoint: &str,
        api_key: &str,
        messages: &[Message],
        temperature: f32,
    ) -> Result<String, LlmError> {
        let body = CompletionRequest { messages, temperature };
        let text = self.send_json(endpoint, api_key, &body).await?;
        parse_completion_response(&text)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct CompletionRequest<'a> {
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Extract `choices[0].message.content` from a completion response body.
pub(crate) fn parse_completion_response(json_text: &str) -> Result<String, LlmError> {
    let resp: CompletionResponse = serde_json::from_str(json_text).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let Some(choice) = resp.choices.into_iter().next() else {
        return Err(LlmError::ApiParse("missing choices[0]".to_string()));
    };
    choice
        .message
        .content
        .ok_or_else(|| LlmError::ApiParse("choices[0].message.content is null".to_string()))
}

#[cfg(test)]
#[path = "completion_test.rs"]
mod tests;
