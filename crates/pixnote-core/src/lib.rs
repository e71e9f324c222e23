//! pixnote-core - Core library for pixnote
//!
//! Photo and note records mirrored from a cloud document store into a local
//! SQLite cache, paginated, searched, favorited and kept consistent across
//! views through a per-family event bus.

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod export;
pub mod feed;
pub mod models;
pub mod remote;
pub mod search;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Note, Photo, Record, RecordId, RemoteId};
