//! The coordinator's read model: an ordered record list plus load status.

use std::sync::Arc;

use crate::events::Event;
use crate::feed::Feed;
use crate::models::{Payload, Record, RecordId};

/// Reactive stream of list states; one per list view.
pub type ListStream<P> = Feed<ListState<P>>;

/// Progress of the paginated load behind a projection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Ready {
        /// The remote has no further pages.
        exhausted: bool,
    },
    /// Last load failed; already loaded records are kept.
    Failed(String),
}

impl LoadStatus {
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Ready { exhausted: true })
    }
}

/// Snapshot of one list view.
#[derive(Debug, Clone, PartialEq)]
pub struct ListState<P> {
    pub records: Arc<Vec<Record<P>>>,
    pub status: LoadStatus,
}

impl<P> Default for ListState<P> {
    fn default() -> Self {
        Self {
            records: Arc::new(Vec::new()),
            status: LoadStatus::Idle,
        }
    }
}

impl<P: Payload> ListState<P> {
    pub fn new(records: Vec<Record<P>>, status: LoadStatus) -> Self {
        Self {
            records: Arc::new(records),
            status,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: RecordId) -> Option<&Record<P>> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.get(id).is_some()
    }

    /// Patch the list from a bus event; returns whether anything changed.
    ///
    /// Applying the same event twice is a no-op the second time.
    pub fn apply(&mut self, event: &Event<P>) -> bool {
        match event {
            Event::Created(record) => {
                if self.contains(record.id) {
                    return false;
                }
                self.insert_sorted(record.clone());
                true
            }
            Event::Updated(record) => self.replace(record),
            Event::Deleted(id) => self.remove(*id),
            Event::Favorited(id, favorite) => {
                let Some(index) = self.position(*id) else {
                    return false;
                };
                if self.records[index].favorite == *favorite {
                    return false;
                }
                Arc::make_mut(&mut self.records)[index].favorite = *favorite;
                true
            }
        }
    }

    /// Swap in a newer version of a listed record.
    pub(crate) fn replace(&mut self, record: &Record<P>) -> bool {
        let Some(index) = self.position(record.id) else {
            return false;
        };
        if self.records[index] == *record {
            return false;
        }
        Arc::make_mut(&mut self.records)[index] = record.clone();
        true
    }

    pub(crate) fn remove(&mut self, id: RecordId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        Arc::make_mut(&mut self.records).remove(index);
        true
    }

    /// Insert keeping newest-first order (ties: higher id first).
    pub(crate) fn insert_sorted(&mut self, record: Record<P>) {
        let key = (record.created_at, record.id);
        let index = self
            .records
            .iter()
            .position(|existing| (existing.created_at, existing.id) < key)
            .unwrap_or(self.records.len());
        Arc::make_mut(&mut self.records).insert(index, record);
    }

    fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|record| record.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Note;
    use pretty_assertions::assert_eq;

    fn record(id: i64, created_at: i64) -> Record<Note> {
        Record {
            id: RecordId::new(id),
            remote_id: None,
            payload: Note::new(format!("n{id}"), ""),
            created_at,
            favorite: false,
        }
    }

    fn ids(state: &ListState<Note>) -> Vec<i64> {
        state.records.iter().map(|record| record.id.get()).collect()
    }

    #[test]
    fn created_inserts_in_order_once() {
        let mut state = ListState::new(vec![record(1, 30), record(2, 10)], LoadStatus::Idle);
        assert!(state.apply(&Event::Created(record(3, 20))));
        assert!(!state.apply(&Event::Created(record(3, 20))));
        assert_eq!(ids(&state), vec![1, 3, 2]);

        assert!(state.apply(&Event::Created(record(4, 99))));
        assert!(state.apply(&Event::Created(record(5, 1))));
        assert_eq!(ids(&state), vec![4, 1, 3, 2, 5]);
    }

    #[test]
    fn deleted_and_favorited_are_idempotent() {
        let mut state = ListState::new(vec![record(1, 2), record(2, 1)], LoadStatus::Idle);

        assert!(state.apply(&Event::Favorited(RecordId::new(2), true)));
        assert!(!state.apply(&Event::Favorited(RecordId::new(2), true)));
        assert!(state.get(RecordId::new(2)).unwrap().favorite);

        assert!(state.apply(&Event::Deleted(RecordId::new(1))));
        assert!(!state.apply(&Event::Deleted(RecordId::new(1))));
        assert_eq!(ids(&state), vec![2]);
    }

    #[test]
    fn events_for_unknown_records_are_ignored() {
        let mut state = ListState::<Note>::default();
        assert!(!state.apply(&Event::Updated(record(9, 1))));
        assert!(!state.apply(&Event::Favorited(RecordId::new(9), true)));
        assert!(state.is_empty());
    }

    #[test]
    fn updated_replaces_payload() {
        let mut state = ListState::new(vec![record(1, 1)], LoadStatus::Idle);
        let mut edited = record(1, 1);
        edited.payload.content = "edited".into();
        assert!(state.apply(&Event::Updated(edited.clone())));
        assert_eq!(state.get(RecordId::new(1)), Some(&edited));
    }

    #[test]
    fn patching_does_not_touch_shared_snapshots() {
        let mut state = ListState::new(vec![record(1, 1)], LoadStatus::Idle);
        let published = state.clone();
        state.apply(&Event::Deleted(RecordId::new(1)));
        assert_eq!(published.len(), 1);
        assert!(state.is_empty());
    }
}
