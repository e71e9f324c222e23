//! Small text and time helpers shared by config, remote and CLI code.

/// Longest error body carried into an error message.
const MAX_ERROR_TEXT_CHARS: usize = 180;

/// Trim `value`; `None` when absent or blank.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

/// Whether `value` has an `http`/`https` scheme (any case) and a non-empty rest.
pub fn is_http_url(value: &str) -> bool {
    let lowered = value.trim_start().to_ascii_lowercase();
    ["http://", "https://"].iter().any(|scheme| {
        lowered
            .strip_prefix(scheme)
            .is_some_and(|rest| !rest.trim().is_empty())
    })
}

/// Collapse whitespace runs and cap the length, for response bodies quoted in errors.
pub fn compact_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_ERROR_TEXT_CHARS)
        .collect()
}

/// Milliseconds since the Unix epoch, the unit of every `created_at`.
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
