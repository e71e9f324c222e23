pub mod common;
pub mod completions;
pub mod config;
pub mod delete;
pub mod export;
pub mod favorite;
pub mod list;
pub mod note;
pub mod photo;
pub mod search;
pub mod sync;
