//! Service configuration parsed from environment variables.
//!
//! `Settings` is the per-call record the orchestrator consumes. `AppConfig`
//! wraps it with process-level knobs (port, timeouts, render engine).

use std::fmt;
use std::time::Duration;

use crate::error::ErrorCode;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 100;
pub const DEFAULT_TEMPERATURE: f32 = crate::llm::DEFAULT_TEMPERATURE;
pub const DEFAULT_API_KEY_ENV: &str = "LLM_API_KEY";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MMDC_PATH: &str = "mmdc";
pub const DEFAULT_MMDC_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown RENDER_ENGINE: {0} (expected 'mmdc' or 'builtin')")]
    UnknownEngine(String),
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownEngine(_) => "E_CONFIG_ENGINE",
        }
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Inputs for one generate-and-render cycle.
#[derive(Clone, PartialEq)]
pub struct Settings {
    /// Full completion URL. Blank disables generation.
    pub endpoint: String,
    /// Sent as the `api-key` header. Blank disables generation.
    pub api_key: String,
    /// Maximum attempts per cycle.
    pub retries: u32,
    /// Fixed delay between failed attempts.
    pub backoff: Duration,
    pub temperature: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            retries: DEFAULT_RETRIES,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .field("retries", &self.retries)
            .field("backoff", &self.backoff)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Settings {
    /// Overlay caller-supplied values; `None` keeps the current value.
    #[must_use]
    pub fn with_overrides(&self, endpoint: Option<&str>, api_key: Option<&str>, retries: Option<u32>) -> Self {
        let mut next = self.clone();
        if let Some(endpoint) = endpoint {
            endpoint.trim().clone_into(&mut next.endpoint);
        }
        if let Some(api_key) = api_key {
            api_key.trim().clone_into(&mut next.api_key);
        }
        if let Some(retries) = retries {
            next.retries = if retries == 0 { DEFAULT_RETRIES } else { retries };
        }
        next
    }
}

/// Parse a retry count typed by a user.
///
/// Reads the leading digits, so `"2.5"` is 2 and `"3 tries"` is 3.
/// Non-numeric, negative, zero, and out-of-range input fall back to
/// [`DEFAULT_RETRIES`].
#[must_use]
pub fn parse_retries(raw: &str) -> u32 {
    let raw = raw.trim();
    let raw = raw.strip_prefix('+').unwrap_or(raw);
    let end = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    match raw[..end].parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => DEFAULT_RETRIES,
    }
}

// =============================================================================
// APP CONFIG
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Which render engine backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Mermaid CLI child process; renders every diagram type.
    Mmdc,
    /// In-process sequence diagram renderer.
    Builtin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmdcConfig {
    pub path: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub settings: Settings,
    pub timeouts: LlmTimeouts,
    pub engine: EngineKind,
    pub mmdc: MmdcConfig,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional, with defaults:
    /// - `PORT`: 3000
    /// - `LLM_ENDPOINT`: empty (generation disabled)
    /// - `LLM_API_KEY_ENV`: names the env var holding the key, default `LLM_API_KEY`
    /// - `LLM_TEMPERATURE`: 0.1
    /// - `LLM_REQUEST_TIMEOUT_SECS`: 120
    /// - `LLM_CONNECT_TIMEOUT_SECS`: 10
    /// - `RENDER_RETRIES`: 3 (non-numeric or zero falls back to 3)
    /// - `RENDER_BACKOFF_MS`: 100
    /// - `RENDER_ENGINE`: `mmdc` (default) or `builtin`
    /// - `MMDC_PATH`: `mmdc`
    /// - `MMDC_TIMEOUT_SECS`: 30
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownEngine`] for an unrecognized `RENDER_ENGINE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownEngine`] for an unrecognized `RENDER_ENGINE`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let parse_or = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        let key_var = lookup("LLM_API_KEY_ENV").unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());
        let settings = Settings {
            endpoint: lookup("LLM_ENDPOINT")
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            api_key: lookup(&key_var)
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            retries: lookup("RENDER_RETRIES").map_or(DEFAULT_RETRIES, |v| parse_retries(&v)),
            backoff: Duration::from_millis(parse_or("RENDER_BACKOFF_MS", DEFAULT_BACKOFF_MS)),
            temperature: lookup("LLM_TEMPERATURE")
                .and_then(|v| v.trim().parse::<f32>().ok())
                .filter(|t| t.is_finite() && *t >= 0.0)
                .unwrap_or(DEFAULT_TEMPERATURE),
        };

        let engine = parse_engine(lookup("RENDER_ENGINE").as_deref())?;
        let port = lookup("PORT")
            .and_then(|v| v.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            port,
            settings,
            timeouts: LlmTimeouts {
                request_secs: parse_or("LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS),
                connect_secs: parse_or("LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS),
            },
            engine,
            mmdc: MmdcConfig {
                path: lookup("MMDC_PATH").unwrap_or_else(|| DEFAULT_MMDC_PATH.to_string()),
                timeout: Duration::from_secs(parse_or("MMDC_TIMEOUT_SECS", DEFAULT_MMDC_TIMEOUT_SECS)),
            },
        })
    }
}

fn parse_engine(raw: Option<&str>) -> Result<EngineKind, ConfigError> {
    match raw.map(str::trim).unwrap_or("mmdc") {
        "mmdc" => Ok(EngineKind::Mmdc),
        "builtin" => Ok(EngineKind::Builtin),
        other => Err(ConfigError::UnknownEngine(other.to_string())),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
