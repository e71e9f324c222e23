//! Reconciliation between the local mirror and a remote source.
//!
//! A [`SyncCoordinator`] owns the pagination state and the reactive
//! projection of one entity family. Presentation code only ever sees
//! [`ListStream`]s and calls coordinator operations; it never touches the
//! mirror or the remote directly.

mod coordinator;
mod projection;

pub use coordinator::{EventListener, Page, SyncCoordinator, SyncOptions, DEFAULT_PAGE_SIZE};
pub use projection::{ListState, ListStream, LoadStatus};
