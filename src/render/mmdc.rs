//! Mermaid CLI (`mmdc`) render engine.
//!
//! Diagram text goes in on stdin and SVG comes back on stdout, so no temp
//! files are involved. The child is killed if the render times out or the
//! future is dropped.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{RenderEngine, RenderError};
use crate::config::MmdcConfig;

pub struct MmdcEngine {
    config: MmdcConfig,
}

impl MmdcEngine {
    #[must_use]
    pub fn new(config: MmdcConfig) -> Self {
        Self { config }
    }

    fn command(&self, target_id: &str) -> Command {
        let mut cmd = Command::new(&self.config.path);
        cmd.args(["--input", "-", "--output", "-", "--outputFormat", "svg", "--svgId", target_id, "--quiet"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, target_id: &str, diagram: &str) -> Result<std::process::Output, RenderError> {
        let mut child = self
            .command(target_id)
            .spawn()
            .map_err(|e| RenderError::Engine(format!("failed to spawn '{}': {e}", self.config.path)))?;

        let stdin = child.stdin.take();
        let write = async move {
            if let Some(mut stdin) = stdin {
                // A child that exits early closes the pipe; its exit status says why.
                let _ = stdin.write_all(diagram.as_bytes()).await;
            }
        };
        let ((), output) = tokio::join!(write, child.wait_with_output());
        output.map_err(|e| RenderError::Engine(format!("failed to wait for '{}': {e}", self.config.path)))
    }
}

#[async_trait]
impl RenderEngine for MmdcEngine {
    fn name(&self) -> &'static str {
        "mmdc"
    }

    async fn render(&self, target_id: &str, diagram: &str) -> Result<String, RenderError> {
        if diagram.trim().is_empty() {
            return Err(RenderError::Empty);
        }

        let output = tokio::time::timeout(self.config.timeout, self.run(target_id, diagram))
            .await
            .map_err(|_| RenderError::Timeout(self.config.timeout))??;

        debug!(
            status = ?output.status.code(),
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "mmdc: exited"
        );

        if !output.status.success() {
            return Err(parse_mmdc_stderr(&String::from_utf8_lossy(&output.stderr)));
        }

        let svg = String::from_utf8_lossy(&output.stdout).into_owned();
        if !svg.contains("<svg") {
            return Err(RenderError::Engine("mmdc produced no svg output".into()));
        }
        Ok(svg)
    }
}

/// Classify mmdc's stderr into a render error.
///
/// Mermaid reports syntax errors as `Parse error on line N:` followed by the
/// offending source excerpt and an `Expecting ...` line.
pub(crate) fn parse_mmdc_stderr(stderr: &str) -> RenderError {
    const MARKER: &str = "Parse error on line ";

    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("at "))
        .collect();

    let line_no = stderr.find(MARKER).and_then(|idx| {
        let digits: String = stderr[idx + MARKER.len()..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse::<usize>().ok()
    });

    if let Some(line) = line_no {
        let message = lines
            .iter()
            .find(|l| l.starts_with("Expecting"))
            .or_else(|| lines.iter().find(|l| l.contains(MARKER)))
            .map_or_else(|| "syntax error".to_owned(), |l| (*l).to_owned());
        return RenderError::Parse { line, message };
    }

    if let Some(detail) = lines.iter().find(|l| l.contains("No diagram type detected")) {
        return RenderError::Parse { line: 1, message: (*detail).to_owned() };
    }

    match lines.first() {
        Some(first) => RenderError::Engine((*first).to_owned()),
        None => RenderError::Engine("mmdc exited with an error and no output".into()),
    }
}

#[cfg(test)]
#[path = "mmdc_test.rs"]
mod tests;
