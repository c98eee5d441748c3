//! In-process renderer for Mermaid sequence diagrams.
//!
//! Parses `sequenceDiagram` syntax into an AST and lays it out as standalone
//! SVG. Other Mermaid diagram types are rejected with
//! [`RenderError::UnsupportedDiagram`].

pub mod ast;
pub mod parse;
pub mod svg;

use async_trait::async_trait;

pub use parse::parse;
pub use svg::render_svg;

use super::{RenderEngine, RenderError};

/// Engine backed by [`parse`] + [`render_svg`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinEngine;

#[async_trait]
impl RenderEngine for BuiltinEngine {
    fn name(&self) -> &'static str {
        "builtin"
    }

    async fn render(&self, target_id: &str, diagram: &str) -> Result<String, RenderError> {
        let parsed = parse(diagram)?;
        Ok(render_svg(&parsed, target_id))
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
