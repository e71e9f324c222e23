//! Record export helpers shared by every client.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::models::{Note, Payload, Photo, Record};

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// Payload-specific parts of a Markdown export.
pub trait MarkdownExport {
    /// Extra frontmatter entries; list values render as YAML sequences.
    fn frontmatter(&self) -> Vec<(&'static str, FrontmatterValue)>;

    fn markdown_body(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontmatterValue {
    Text(String),
    List(Vec<String>),
}

/// Serializable record representation used in JSON exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord<P> {
    pub id: i64,
    pub remote_id: Option<String>,
    pub created_at: i64,
    pub favorite: bool,
    #[serde(flatten)]
    pub fields: P,
}

#[must_use]
pub fn record_to_export_item<P: Clone>(record: &Record<P>) -> ExportRecord<P> {
    ExportRecord {
        id: record.id.get(),
        remote_id: record.remote_id.as_ref().map(ToString::to_string),
        created_at: record.created_at,
        favorite: record.favorite,
        fields: record.payload.clone(),
    }
}

/// Render records as pretty-printed JSON.
pub fn render_json_export<P: Payload>(records: &[Record<P>]) -> serde_json::Result<String> {
    let items = records
        .iter()
        .map(record_to_export_item)
        .collect::<Vec<_>>();
    serde_json::to_string_pretty(&items)
}

/// Render records in Markdown with frontmatter blocks.
#[must_use]
pub fn render_markdown_export<P: Payload + MarkdownExport>(records: &[Record<P>]) -> String {
    let mut output = String::new();

    for (index, record) in records.iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }

        let _ = writeln!(output, "---");
        let _ = writeln!(output, "id: {}", record.id);
        if let Some(remote_id) = &record.remote_id {
            let _ = writeln!(output, "remote_id: {remote_id}");
        }
        let _ = writeln!(output, "family: {}", P::FAMILY);
        let _ = writeln!(output, "created_at: {}", record.created_at);
        let _ = writeln!(output, "favorite: {}", record.favorite);
        for (key, value) in record.payload.frontmatter() {
            match value {
                FrontmatterValue::Text(text) => {
                    let _ = writeln!(output, "{key}: {text}");
                }
                FrontmatterValue::List(items) => {
                    let _ = writeln!(output, "{key}:");
                    for item in items {
                        let _ = writeln!(output, "  - {item}");
                    }
                }
            }
        }
        let _ = writeln!(output, "---");
        let _ = writeln!(output);
        output.push_str(record.payload.markdown_body().trim_end());
        output.push('\n');
    }

    output
}

/// Render records based on selected export format.
pub fn render_export<P: Payload + MarkdownExport>(
    records: &[Record<P>],
    format: ExportFormat,
) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => render_json_export(records),
        ExportFormat::Markdown => Ok(render_markdown_export(records)),
    }
}

/// Build a deterministic default file name for export flows.
#[must_use]
pub fn suggested_export_file_name(family: &str, format: ExportFormat, timestamp_ms: i64) -> String {
    format!("pixnote-{family}-export-{timestamp_ms}.{}", format.extension())
}

impl MarkdownExport for Note {
    fn frontmatter(&self) -> Vec<(&'static str, FrontmatterValue)> {
        let mut tags = self.tags();
        tags.sort();

        let mut entries = Vec::new();
        if !self.title.trim().is_empty() {
            entries.push(("title", FrontmatterValue::Text(self.title.trim().to_string())));
        }
        if let Some(photo) = &self.photo_ref {
            entries.push(("photo", FrontmatterValue::Text(photo.to_string())));
        }
        entries.push(("tags", FrontmatterValue::List(tags)));
        entries
    }

    fn markdown_body(&self) -> String {
        self.content.clone()
    }
}

impl MarkdownExport for Photo {
    fn frontmatter(&self) -> Vec<(&'static str, FrontmatterValue)> {
        vec![
            ("media", FrontmatterValue::Text(self.media_ref.clone())),
            (
                "labels",
                FrontmatterValue::List(
                    self.labels
                        .iter()
                        .map(|label| format!("{} ({:.2})", label.text, label.confidence))
                        .collect(),
                ),
            ),
        ]
    }

    fn markdown_body(&self) -> String {
        let mut body = String::new();
        if !self.title.trim().is_empty() {
            let _ = writeln!(body, "# {}", self.title.trim());
        }
        if let Some(description) = &self.description {
            let _ = writeln!(body, "\n{description}");
        }
        if let Some(text) = &self.recognized_text {
            let _ = writeln!(body, "\n```text\n{text}\n```");
        }
        body.trim_start().to_string()
    }
}
