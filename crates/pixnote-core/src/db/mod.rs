//! Local mirror storage for pixnote

mod connection;
mod locks;
mod migrations;
mod mirror;

pub use connection::{Database, SharedDatabase};
pub use mirror::{MirrorStore, Snapshot, Snapshots};
