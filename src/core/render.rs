//! Renderer module
//!
//! Renders command output rows to jsonl, json or plain text

use serde::Serialize;
use std::io::Write;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Jsonl,
    Json,
    Text,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jsonl" => Ok(OutputFormat::Jsonl),
            "json" => Ok(OutputFormat::Json),
            "text" | "txt" => Ok(OutputFormat::Text),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// A record that can be printed by the renderer
pub trait Row: Serialize {
    /// Human-readable single-line form
    fn to_text(&self) -> String;
}

/// Render configuration combining format and options
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderConfig {
    pub format: OutputFormat,
    pub pretty: bool,
}

impl RenderConfig {
    /// Create a new render config with pretty option
    pub fn with_pretty(format: OutputFormat, pretty: bool) -> Self {
        Self { format, pretty }
    }
}

/// Renderer for output rows
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    /// Create a new renderer with render config
    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render rows to a string
    pub fn render<T: Row>(&self, rows: &[T]) -> String {
        match self.config.format {
            OutputFormat::Jsonl => self.render_jsonl(rows),
            OutputFormat::Json => self.render_json(rows),
            OutputFormat::Text => rows
                .iter()
                .map(Row::to_text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Render to a writer, with a trailing newline when anything was rendered
    pub fn render_to<T: Row, W: Write>(&self, rows: &[T], mut writer: W) -> std::io::Result<()> {
        let output = self.render(rows);
        if output.is_empty() {
            return Ok(());
        }
        writeln!(writer, "{}", output)
    }

    /// Render as JSON Lines (one JSON object per line)
    fn render_jsonl<T: Row>(&self, rows: &[T]) -> String {
        rows.iter()
            .filter_map(|row| {
                if self.config.pretty {
                    serde_json::to_string_pretty(row).ok()
                } else {
                    serde_json::to_string(row).ok()
                }
            })
            .collect::<Vec<_>>()
            .join(if self.config.pretty { "\n\n" } else { "\n" })
    }

    /// Render as a single JSON array
    fn render_json<T: Row>(&self, rows: &[T]) -> String {
        if self.config.pretty {
            serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string())
        } else {
            serde_json::to_string(rows).unwrap_or_else(|_| "[]".to_string())
        }
    }
}
