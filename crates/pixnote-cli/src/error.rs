use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] pixnote_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No note content provided")]
    EmptyContent,
    #[error("Search query cannot be empty")]
    EmptySearchQuery,
    #[error("Invalid record id: {0}")]
    InvalidRecordId(String),
    #[error("Invalid label '{0}': expected TEXT or TEXT:CONFIDENCE")]
    InvalidLabel(String),
    #[error("Tag filters only apply to notes")]
    TagRequiresNotes,
    #[error("Nothing to change")]
    NothingToEdit,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Remote source is not configured. Run `pixnote config set --api-url <URL>` or set PIXNOTE_API_URL."
    )]
    RemoteNotConfigured,
}
