use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use chrono::Utc;
use pixnote_core::models::{ImageLabel, Payload, Record, RecordId};
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct RecordListItem<P> {
    pub id: i64,
    pub remote_id: Option<String>,
    pub summary: String,
    pub created_at: i64,
    pub relative_time: String,
    pub favorite: bool,
    pub pending: bool,
    pub fields: P,
}

pub fn record_to_list_item<P: Payload>(record: &Record<P>) -> RecordListItem<P> {
    let now_ms = Utc::now().timestamp_millis();
    RecordListItem {
        id: record.id.get(),
        remote_id: record.remote_id.as_ref().map(ToString::to_string),
        summary: record_preview(record, 80),
        created_at: record.created_at,
        relative_time: format_relative_time(record.created_at, now_ms),
        favorite: record.favorite,
        pending: !record.is_synced(),
        fields: record.payload.clone(),
    }
}

pub fn format_record_lines<P: Payload>(records: &[Record<P>]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    records
        .iter()
        .map(|record| {
            let id = record.id.to_string();
            let marker = match (record.favorite, record.is_synced()) {
                (true, _) => "*",
                (false, false) => "+",
                (false, true) => " ",
            };
            let preview = record_preview(record, 40);
            let relative_time = format_relative_time(record.created_at, now_ms);
            format!("{id:>6} {marker} {preview:<40}  {relative_time}")
        })
        .collect()
}

/// Print records as pretty JSON or as aligned lines.
pub fn print_records<P: Payload>(records: &[Record<P>], as_json: bool) -> Result<(), CliError> {
    if as_json {
        let json_items = records
            .iter()
            .map(record_to_list_item)
            .collect::<Vec<RecordListItem<P>>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_record_lines(records) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn record_preview<P: Payload>(record: &Record<P>, max_chars: usize) -> String {
    let summary = record.payload.summary();
    let collapsed = summary.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn resolve_note_content(content_parts: &[String]) -> Result<String, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(content);
    }

    if let Some(content) = read_piped_stdin()? {
        return Ok(content);
    }

    Err(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_search_query(query: &str) -> Result<String, CliError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptySearchQuery)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn parse_record_id(id: &str) -> Result<RecordId, CliError> {
    id.parse::<RecordId>()
        .map_err(|_| CliError::InvalidRecordId(id.trim().to_string()))
}

/// Parse `TEXT` or `TEXT:CONFIDENCE`; a bare label gets full confidence.
pub fn parse_label(raw: &str) -> Result<ImageLabel, CliError> {
    let invalid = || CliError::InvalidLabel(raw.to_string());
    let (text, confidence) = match raw.rsplit_once(':') {
        Some((text, confidence)) => {
            let confidence = confidence.trim().parse::<f32>().map_err(|_| invalid())?;
            if !(0.0..=1.0).contains(&confidence) {
                return Err(invalid());
            }
            (text, confidence)
        }
        None => (raw, 1.0),
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(invalid());
    }
    Ok(ImageLabel::new(text, confidence))
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match cli_db_path.or_else(|| env::var_os("PIXNOTE_DB_PATH").map(PathBuf::from)) {
        Some(path) => Ok(path),
        None => default_db_path(),
    }
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("pixnote").join("pixnote.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".into()))
}

pub fn resolve_config_path(cli_config_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match cli_config_path.or_else(|| env::var_os("PIXNOTE_CONFIG").map(PathBuf::from)) {
        Some(path) => Ok(path),
        None => default_config_path(),
    }
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join("pixnote").join("config.json"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI config directory".into()))
}
