use crate::formatters::markdown::MarkdownNote;
use crate::{Result, VaultclipError};
use serde::Serialize;

/// Complete JSON output structure
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    pub title: &'a str,
    pub source: JsonSource<'a>,
    /// Markdown body without the title and source header
    pub body: &'a str,
    /// The full rendered note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Where the note was clipped from
#[derive(Debug, Clone, Serialize)]
pub struct JsonSource<'a> {
    pub host: &'a str,
    pub url: &'a str,
}

/// Configuration for JSON output
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    /// Include the rendered note text
    pub include_note: bool,
    /// Pretty print JSON output
    pub pretty: bool,
}

/// Serialize a note as JSON
pub fn convert_to_json(note: &MarkdownNote, config: &JsonConfig) -> Result<String> {
    let output = JsonOutput {
        title: &note.title,
        source: JsonSource { host: &note.source_host, url: &note.source_url },
        body: &note.body,
        note: config.include_note.then(|| note.render()),
    };

    let json = if config.pretty { serde_json::to_string_pretty(&output) } else { serde_json::to_string(&output) };

    json.map_err(|e| VaultclipError::HtmlParseError(format!("JSON serialization failed: {}", e)))
}

/// JSON formatter with configurable options
pub struct JsonFormatter {
    config: JsonConfig,
}

impl JsonFormatter {
    pub fn new(config: JsonConfig) -> Self {
        Self { config }
    }

    pub fn format(&self, note: &MarkdownNote) -> Result<String> {
        convert_to_json(note, &self.config)
    }
}
