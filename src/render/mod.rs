//! Render engines turning Mermaid text into SVG markup.
//!
//! DESIGN
//! ======
//! The orchestrator only sees the [`RenderEngine`] trait. Two engines exist:
//! [`mmdc::MmdcEngine`] shells out to the Mermaid CLI and handles every
//! diagram type; [`sequence::BuiltinEngine`] parses and lays out sequence
//! diagrams in-process. Engines are pure functions of their input: the
//! [`RenderSlot`] they target is owned and updated by the caller.

pub mod mmdc;
pub mod sequence;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{AppConfig, EngineKind};
use crate::error::ErrorCode;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("diagram text is empty")]
    Empty,
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("unsupported diagram type: {0}")]
    UnsupportedDiagram(String),
    #[error("render engine failed: {0}")]
    Engine(String),
    #[error("render timed out after {0:?}")]
    Timeout(Duration),
}

impl ErrorCode for RenderError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "E_RENDER_EMPTY",
            Self::Parse { .. } => "E_RENDER_PARSE",
            Self::UnsupportedDiagram(_) => "E_RENDER_UNSUPPORTED",
            Self::Engine(_) => "E_RENDER_ENGINE",
            Self::Timeout(_) => "E_RENDER_TIMEOUT",
        }
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Converts diagram text into SVG markup whose root element carries `target_id`.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Render `diagram`. Empty text must fail rather than produce an artifact.
    async fn render(&self, target_id: &str, diagram: &str) -> Result<String, RenderError>;
}

/// Build the engine selected by config.
#[must_use]
pub fn engine_from_config(config: &AppConfig) -> Arc<dyn RenderEngine> {
    match config.engine {
        EngineKind::Mmdc => Arc::new(mmdc::MmdcEngine::new(config.mmdc.clone())),
        EngineKind::Builtin => Arc::new(sequence::BuiltinEngine),
    }
}

// =============================================================================
// SLOT + ARTIFACT
// =============================================================================

/// The single display target a cycle writes into.
///
/// Holding `&mut RenderSlot` is what makes a cycle exclusive; the HTTP layer
/// guards the shared slot with a mutex.
#[derive(Debug, Clone)]
pub struct RenderSlot {
    id: String,
    contents: Option<Artifact>,
}

impl RenderSlot {
    /// A fresh, empty slot with a unique id.
    #[must_use]
    pub fn new() -> Self {
        Self::named(format!("diagram-{}", uuid::Uuid::new_v4().simple()))
    }

    #[must_use]
    pub fn named(id: impl Into<String>) -> Self {
        Self { id: id.into(), contents: None }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The artifact shown, if the last cycle succeeded.
    #[must_use]
    pub fn contents(&self) -> Option<&Artifact> {
        self.contents.as_ref()
    }

    pub(crate) fn clear(&mut self) {
        self.contents = None;
    }

    pub(crate) fn fill(&mut self, artifact: Artifact) {
        self.contents = Some(artifact);
    }
}

impl Default for RenderSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Rendered SVG bound to the slot id it was produced for.
#[derive(Debug, Clone)]
pub struct Artifact {
    target_id: String,
    markup: String,
    root: OnceLock<SvgRoot>,
}

/// Sizing attributes of the `<svg>` root element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SvgRoot {
    pub width: Option<String>,
    pub height: Option<String>,
    pub view_box: Option<String>,
}

impl Artifact {
    #[must_use]
    pub fn new(target_id: impl Into<String>, markup: impl Into<String>) -> Self {
        Self { target_id: target_id.into(), markup: markup.into(), root: OnceLock::new() }
    }

    #[must_use]
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    #[must_use]
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Root element attributes, parsed on first access.
    pub fn root(&self) -> &SvgRoot {
        self.root.get_or_init(|| parse_svg_root(&self.markup))
    }
}

impl PartialEq for Artifact {
    fn eq(&self, other: &Self) -> bool {
        self.target_id == other.target_id && self.markup == other.markup
    }
}

impl Eq for Artifact {}

/// Read width/height/viewBox from the first `<svg ...>` tag.
fn parse_svg_root(markup: &str) -> SvgRoot {
    let Some(start) = markup.find("<svg") else {
        return SvgRoot::default();
    };
    let tag = &markup[start..];
    let tag = tag.find('>').map_or(tag, |end| &tag[..end]);
    SvgRoot {
        width: attribute(tag, "width"),
        height: attribute(tag, "height"),
        view_box: attribute(tag, "viewBox"),
    }
}

fn attribute(tag: &str, name: &str) -> Option<String> {
    let mut rest = tag;
    while let Some(idx) = rest.find(name) {
        let before = rest[..idx].chars().next_back();
        let after = &rest[idx + name.len()..];
        if before.is_some_and(char::is_whitespace) {
            if let Some(value) = after.trim_start().strip_prefix('=') {
                let value = value.trim_start();
                let quote = value.chars().next()?;
                if quote == '"' || quote == '\'' {
                    let body = &value[1..];
                    return body.find(quote).map(|end| body[..end].to_owned());
                }
            }
        }
        rest = after;
    }
    None
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
