#![allow(dead_code)]

use std::sync::Arc;

use pixnote_core::db::{Database, MirrorStore};
use pixnote_core::events::EventBus;
use pixnote_core::models::{Note, Payload};
use pixnote_core::remote::MemoryRemote;
use pixnote_core::sync::{SyncCoordinator, SyncOptions};

pub type NoteCoordinator = SyncCoordinator<Note, MemoryRemote<Note>>;

/// One family wired the way the composition root does it.
pub struct Harness<P: Payload> {
    pub remote: Arc<MemoryRemote<P>>,
    pub mirror: MirrorStore<P>,
    pub bus: EventBus<P>,
    pub coordinator: SyncCoordinator<P, MemoryRemote<P>>,
}

impl<P: Payload> Harness<P> {
    pub async fn new(page_size: usize) -> Self {
        let db = Database::open_in_memory().unwrap().into_shared();
        let mirror = MirrorStore::open(db).await.unwrap();
        let remote = Arc::new(MemoryRemote::new());
        let bus = EventBus::default();
        let coordinator = SyncCoordinator::new(
            Arc::clone(&remote),
            mirror.clone(),
            bus.clone(),
            SyncOptions::default().with_page_size(page_size),
        );
        Self {
            remote,
            mirror,
            bus,
            coordinator,
        }
    }

    /// A second view over the same mirror, remote and bus.
    pub fn second_view(&self) -> SyncCoordinator<P, MemoryRemote<P>> {
        SyncCoordinator::new(
            Arc::clone(&self.remote),
            self.mirror.clone(),
            self.bus.clone(),
            SyncOptions::default().with_page_size(self.coordinator.page_size()),
        )
    }
}

/// `count` notes with distinct, increasing timestamps.
pub fn notes(count: i64) -> Vec<(Note, i64)> {
    (1..=count)
        .map(|i| (Note::new(format!("note {i}"), format!("body {i}")), i * 1_000))
        .collect()
}
