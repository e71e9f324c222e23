//! Data models for pixnote

mod note;
mod photo;
mod record;

pub use note::{extract_tags, Note};
pub use photo::{ImageLabel, Photo};
pub use record::{Payload, Record, RecordId, RemoteId};
