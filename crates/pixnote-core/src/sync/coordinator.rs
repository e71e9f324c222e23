//! Sync coordinator: reconciles one family's mirror with its remote source.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

use super::projection::{ListState, ListStream, LoadStatus};
use crate::db::MirrorStore;
use crate::error::{Error, Result};
use crate::events::{Event, EventBus};
use crate::feed::Feed;
use crate::models::{Payload, Record, RecordId, RemoteId};
use crate::remote::{Cursor, RemoteDraft, RemoteFields, RemoteSource};
use crate::search::TextQuery;
use crate::util::unix_millis_now;

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub page_size: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SyncOptions {
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

/// A fetched page, mirrored locally.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<P> {
    /// Records with their local ids, newest first
    pub records: Vec<Record<P>>,
    /// Continuation for the following page; `None` on the final page
    pub next: Option<Cursor>,
}

/// Background task applying bus events to a coordinator's projection.
///
/// Dropping the listener stops the task.
#[derive(Debug)]
pub struct EventListener {
    handle: JoinHandle<()>,
}

impl EventListener {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Exposes one reactive list of family `P` plus the operations that change it.
///
/// Cheap to clone; clones share the projection and scan position. Record
/// writes are serialized through the mirror, across every view of the family.
pub struct SyncCoordinator<P: Payload, R> {
    inner: Arc<Inner<P, R>>,
}

struct Inner<P: Payload, R> {
    remote: Arc<R>,
    mirror: MirrorStore<P>,
    bus: EventBus<P>,
    page_size: usize,
    projection: watch::Sender<ListState<P>>,
    scan: Mutex<ScanState>,
    generation: watch::Sender<u64>,
    fetch_gate: AsyncMutex<()>,
}

#[derive(Debug, Default)]
struct ScanState {
    cursor: Option<Cursor>,
    exhausted: bool,
    seen: HashSet<RemoteId>,
}

impl<P: Payload, R> Clone for SyncCoordinator<P, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: Payload, R> std::fmt::Debug for SyncCoordinator<P, R> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SyncCoordinator")
            .field("family", &P::FAMILY)
            .field("page_size", &self.inner.page_size)
            .field("generation", &*self.inner.generation.borrow())
            .finish_non_exhaustive()
    }
}

impl<P: Payload, R: RemoteSource<P>> SyncCoordinator<P, R> {
    /// The projection starts from the mirror's cached contents.
    pub fn new(
        remote: Arc<R>,
        mirror: MirrorStore<P>,
        bus: EventBus<P>,
        options: SyncOptions,
    ) -> Self {
        let cached = ListState::new(mirror.list_all(), LoadStatus::Idle);
        let (projection, _) = watch::channel(cached);
        let (generation, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                remote,
                mirror,
                bus,
                page_size: options.page_size.max(1),
                projection,
                scan: Mutex::new(ScanState::default()),
                generation,
                fetch_gate: AsyncMutex::new(()),
            }),
        }
    }

    pub fn page_size(&self) -> usize {
        self.inner.page_size
    }

    /// Current projection value.
    pub fn state(&self) -> ListState<P> {
        self.inner.projection.borrow().clone()
    }

    /// Fetch one page after `cursor` and mirror it.
    ///
    /// Does not touch the projection; retrying with the same cursor yields
    /// the same page on an unchanged remote.
    pub async fn fetch_page(&self, cursor: Option<&Cursor>, page_size: usize) -> Result<Page<P>> {
        if page_size == 0 {
            return Err(Error::InvalidInput("page size must be positive".into()));
        }
        let page = self.inner.remote.get_page(cursor, page_size).await?;
        let records = self.inner.mirror.upsert_remote(&page.records).await?;
        tracing::debug!(
            family = P::FAMILY,
            count = records.len(),
            last = page.next.is_none(),
            "Fetched page"
        );
        Ok(Page {
            records,
            next: page.next,
        })
    }

    /// Append the next page of the current scan to the projection.
    ///
    /// Returns how many records the page added. A call that finds another
    /// fetch in flight waits for it and returns `0`.
    pub async fn load_next(&self) -> Result<usize> {
        let _gate = if let Ok(gate) = self.inner.fetch_gate.try_lock() {
            gate
        } else {
            drop(self.inner.fetch_gate.lock().await);
            return Ok(0);
        };

        let (cursor, generation) = {
            let scan = self.scan();
            if scan.exhausted {
                return Ok(0);
            }
            (scan.cursor.clone(), *self.inner.generation.borrow())
        };

        self.set_status(LoadStatus::Loading);
        match self.append_page(cursor, generation).await {
            Ok(added) => Ok(added),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(error) => {
                tracing::warn!(family = P::FAMILY, %error, "Page load failed");
                self.set_status(LoadStatus::Failed(error.to_string()));
                Err(error)
            }
        }
    }

    /// Restart pagination from the first page and replace the projection.
    ///
    /// Cancels any in-flight `load_next` or earlier `refresh`. When the
    /// first page is also the last, synced records missing from it are
    /// pruned from the mirror and announced as deleted.
    pub async fn refresh(&self) -> Result<usize> {
        let mut generation = 0;
        self.inner.generation.send_modify(|current| {
            *current += 1;
            generation = *current;
        });

        let _gate = self.inner.fetch_gate.lock().await;
        self.ensure_current(generation)?;
        *self.scan() = ScanState::default();

        self.set_status(LoadStatus::Loading);
        match self.replace_with_first_page(generation).await {
            Ok(count) => Ok(count),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(error) => {
                tracing::warn!(family = P::FAMILY, %error, "Refresh failed");
                self.set_status(LoadStatus::Failed(error.to_string()));
                Err(error)
            }
        }
    }

    /// The unfiltered list stream.
    pub fn observe(&self) -> ListStream<P> {
        Feed::new(self.inner.projection.subscribe())
    }

    /// Case-insensitive substring filter over the loaded projection.
    ///
    /// Empty or whitespace-only queries give the same stream as [`Self::observe`].
    pub fn search(&self, query: &str) -> ListStream<P> {
        let Some(query) = TextQuery::parse(query) else {
            return self.observe();
        };
        Feed::with_view(self.inner.projection.subscribe(), move |state: &ListState<P>| {
            ListState {
                records: Arc::new(
                    state
                        .records
                        .iter()
                        .filter(|record| query.matches(&record.payload))
                        .cloned()
                        .collect(),
                ),
                status: state.status.clone(),
            }
        })
    }

    /// Apply `transform` locally, then write it to the remote.
    ///
    /// `id`, `remote_id` and `created_at` are not mutable. On remote failure
    /// the local change is reverted and the remote error returned. A record
    /// deleted while the remote write is in flight stays deleted.
    ///
    /// Dropping the future after the local write leaves the edit in the
    /// mirror unsynced. [`Self::push_pending`] only retries records without a
    /// remote id, so for a synced record the next [`Self::refresh`] that
    /// covers it restores the remote version.
    pub async fn mutate<F>(&self, id: RecordId, transform: F) -> Result<Record<P>>
    where
        F: FnOnce(&mut Record<P>) + Send,
    {
        let _lock = self.inner.mirror.lock_record(id).await;
        let previous = self.require(id).await?;

        let mut next = previous.clone();
        transform(&mut next);
        next.id = previous.id;
        next.remote_id.clone_from(&previous.remote_id);
        next.created_at = previous.created_at;
        if next == previous {
            return Ok(previous);
        }
        next.payload.validate()?;

        let local = self
            .inner
            .mirror
            .update(&next)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} record {id}", P::FAMILY)))?;
        self.patch(|state| state.replace(&local));

        let synced = match self.write_remote(&local).await {
            Ok(synced) => synced,
            Err(error) => {
                self.roll_back(&previous, &error).await;
                return Err(error);
            }
        };

        if synced.favorite != previous.favorite {
            self.inner
                .bus
                .publish(Event::Favorited(synced.id, synced.favorite));
        }
        if synced.payload != previous.payload || synced.remote_id != previous.remote_id {
            self.inner.bus.publish(Event::Updated(synced.clone()));
        }
        Ok(synced)
    }

    pub async fn toggle_favorite(&self, id: RecordId) -> Result<Record<P>> {
        self.mutate(id, |record| record.favorite = !record.favorite)
            .await
    }

    pub async fn set_favorite(&self, id: RecordId, favorite: bool) -> Result<Record<P>> {
        self.mutate(id, move |record| record.favorite = favorite)
            .await
    }

    /// Delete remotely, then locally, then announce `Deleted(id)`.
    ///
    /// A remote failure leaves the record in place.
    pub async fn delete(&self, id: RecordId) -> Result<()> {
        let _lock = self.inner.mirror.lock_record(id).await;
        let record = self.require(id).await?;

        if let Some(remote_id) = &record.remote_id {
            match self.inner.remote.delete(remote_id).await {
                Ok(()) => {}
                Err(Error::NotFound(_)) => {
                    tracing::debug!(family = P::FAMILY, %remote_id, "Remote document already gone");
                }
                Err(error) => return Err(error),
            }
        }

        self.inner.mirror.delete_by_id(id).await?;
        self.patch(|state| state.remove(id));
        self.inner.bus.publish(Event::Deleted(id));
        tracing::debug!(family = P::FAMILY, %id, "Deleted record");
        Ok(())
    }

    /// Store `payload` locally right away and try to create it remotely.
    ///
    /// A failed remote create is not an error: the record stays pending
    /// (`remote_id == None`) until [`Self::push_pending`] succeeds.
    pub async fn create(&self, payload: P) -> Result<Record<P>> {
        payload.validate()?;
        let record = self
            .inner
            .mirror
            .insert_local(&payload, unix_millis_now(), false)
            .await?;
        let _lock = self.inner.mirror.lock_record(record.id).await;

        self.patch(|state| {
            if state.contains(record.id) {
                return false;
            }
            state.insert_sorted(record.clone());
            true
        });
        self.inner.bus.publish(Event::Created(record.clone()));

        match self.create_remote(&record).await {
            Ok(synced) => {
                self.patch(|state| state.replace(&synced));
                self.inner.bus.publish(Event::Updated(synced.clone()));
                Ok(synced)
            }
            Err(error) => {
                tracing::warn!(family = P::FAMILY, id = %record.id, %error, "Record kept pending");
                Ok(record)
            }
        }
    }

    /// Create every pending record remotely, oldest first.
    ///
    /// Stops at the first failure.
    pub async fn push_pending(&self) -> Result<usize> {
        let pending = self.inner.mirror.list_pending().await?;
        let mut pushed = 0;
        for candidate in pending {
            let _lock = self.inner.mirror.lock_record(candidate.id).await;
            let Some(record) = self.inner.mirror.get_by_id(candidate.id).await? else {
                continue;
            };
            if record.is_synced() {
                continue;
            }

            let synced = self.create_remote(&record).await?;
            self.patch(|state| state.replace(&synced));
            self.inner.bus.publish(Event::Updated(synced));
            pushed += 1;
        }

        if pushed > 0 {
            tracing::info!(family = P::FAMILY, pushed, "Pushed pending records");
        }
        Ok(pushed)
    }

    /// Server-side substring search on `field`, mirroring the results.
    ///
    /// Falls back to the mirror when the remote cannot search.
    pub async fn search_remote(&self, field: &str, query: &str) -> Result<Vec<Record<P>>> {
        let Some(parsed) = TextQuery::parse(query) else {
            return Err(Error::InvalidInput("search query cannot be empty".into()));
        };

        match self
            .inner
            .remote
            .query_by_substring(field, query.trim())
            .await
        {
            Ok(found) => self.inner.mirror.upsert_remote(&found).await,
            Err(Error::Unsupported(reason)) => {
                tracing::debug!(family = P::FAMILY, %reason, "Falling back to mirror search");
                let mut matches = self
                    .inner
                    .mirror
                    .search_by_substring(Some(field), parsed.as_str());
                Ok(Vec::clone(&matches.current()))
            }
            Err(error) => Err(error),
        }
    }

    /// Keep this projection in step with events from other views of the family.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn attach_events(&self) -> EventListener {
        let mut subscription = self.inner.bus.subscribe();
        let inner = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                let Some(inner) = Weak::upgrade(&inner) else {
                    break;
                };
                inner
                    .projection
                    .send_if_modified(|state| state.apply(&event));
            }
        });
        EventListener { handle }
    }

    async fn append_page(&self, cursor: Option<Cursor>, generation: u64) -> Result<usize> {
        let page = self
            .cancellable(
                generation,
                self.inner.remote.get_page(cursor.as_ref(), self.inner.page_size),
            )
            .await?;
        self.ensure_current(generation)?;
        let stored = self.inner.mirror.upsert_remote(&page.records).await?;

        let exhausted = page.next.is_none();
        let fresh = {
            let mut scan = self.scan();
            scan.cursor = page.next;
            scan.exhausted = exhausted;
            stored
                .into_iter()
                .filter(|record| {
                    record
                        .remote_id
                        .as_ref()
                        .map_or(true, |remote_id| scan.seen.insert(remote_id.clone()))
                })
                .collect::<Vec<_>>()
        };

        let added = fresh.len();
        self.inner.projection.send_modify(|state| {
            for record in fresh {
                if state.contains(record.id) {
                    state.replace(&record);
                } else {
                    Arc::make_mut(&mut state.records).push(record);
                }
            }
            state.status = LoadStatus::Ready { exhausted };
        });
        tracing::debug!(family = P::FAMILY, added, exhausted, "Loaded next page");
        Ok(added)
    }

    async fn replace_with_first_page(&self, generation: u64) -> Result<usize> {
        let known = self.inner.mirror.synced_remote_ids();
        let page = self
            .cancellable(generation, self.inner.remote.get_page(None, self.inner.page_size))
            .await?;
        self.ensure_current(generation)?;
        let stored = self.inner.mirror.upsert_remote(&page.records).await?;

        let exhausted = page.next.is_none();
        let pruned = if exhausted {
            let keep = page
                .records
                .iter()
                .map(|record| record.remote_id.clone())
                .collect::<HashSet<_>>();
            self.inner.mirror.prune_synced(known, keep).await?
        } else {
            Vec::new()
        };
        let pending = self.inner.mirror.list_pending().await?;

        let mut state = ListState::new(Vec::new(), LoadStatus::Ready { exhausted });
        {
            let mut scan = self.scan();
            scan.cursor = page.next;
            scan.exhausted = exhausted;
            let records = Arc::make_mut(&mut state.records);
            for record in stored {
                if let Some(remote_id) = &record.remote_id {
                    if !scan.seen.insert(remote_id.clone()) {
                        continue;
                    }
                }
                records.push(record);
            }
        }
        for record in pending {
            state.insert_sorted(record);
        }

        let count = state.len();
        self.inner.projection.send_replace(state);
        for id in pruned {
            self.inner.bus.publish(Event::Deleted(id));
        }
        tracing::info!(family = P::FAMILY, count, exhausted, "Refreshed");
        Ok(count)
    }

    async fn write_remote(&self, record: &Record<P>) -> Result<Record<P>> {
        match &record.remote_id {
            Some(remote_id) => {
                self.inner
                    .remote
                    .update(remote_id, &RemoteFields::from_record(record))
                    .await?;
                Ok(record.clone())
            }
            None => {
                let synced = self.create_remote(record).await?;
                self.patch(|state| state.replace(&synced));
                Ok(synced)
            }
        }
    }

    async fn create_remote(&self, record: &Record<P>) -> Result<Record<P>> {
        let remote_id = self
            .inner
            .remote
            .create(&RemoteDraft::from_record(record))
            .await?;
        self.inner.mirror.assign_remote_id(record.id, &remote_id).await
    }

    async fn roll_back(&self, previous: &Record<P>, cause: &Error) {
        match self.inner.mirror.update(previous).await {
            Ok(Some(restored)) => {
                self.patch(|state| state.replace(&restored));
                tracing::warn!(family = P::FAMILY, id = %previous.id, error = %cause, "Rolled back local change");
            }
            Ok(None) => {
                self.patch(|state| state.remove(previous.id));
                tracing::debug!(family = P::FAMILY, id = %previous.id, error = %cause, "Record gone, nothing to roll back");
            }
            Err(error) => {
                tracing::error!(
                    family = P::FAMILY,
                    id = %previous.id,
                    %error,
                    "Failed to roll back local change"
                );
            }
        }
    }

    async fn require(&self, id: RecordId) -> Result<Record<P>> {
        self.inner
            .mirror
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} record {id}", P::FAMILY)))
    }

    async fn cancellable<T>(
        &self,
        generation: u64,
        operation: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let mut changes = self.inner.generation.subscribe();
        if *changes.borrow_and_update() != generation {
            return Err(Error::Cancelled);
        }
        tokio::select! {
            result = operation => result,
            _ = changes.changed() => {
                tracing::debug!(family = P::FAMILY, generation, "Fetch superseded");
                Err(Error::Cancelled)
            }
        }
    }

    fn ensure_current(&self, generation: u64) -> Result<()> {
        if *self.inner.generation.borrow() == generation {
            Ok(())
        } else {
            Err(Error::Cancelled)
        }
    }

    fn set_status(&self, status: LoadStatus) {
        self.patch(|state| {
            if state.status == status {
                return false;
            }
            state.status = status;
            true
        });
    }

    fn patch(&self, modify: impl FnOnce(&mut ListState<P>) -> bool) {
        self.inner.projection.send_if_modified(modify);
    }

    fn scan(&self) -> MutexGuard<'_, ScanState> {
        self.inner.scan.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::Note;
    use crate::remote::MemoryRemote;
    use pretty_assertions::assert_eq;

    async fn setup(page_size: usize) -> (SyncCoordinator<Note, MemoryRemote<Note>>, Arc<MemoryRemote<Note>>) {
        let db = Database::open_in_memory().unwrap().into_shared();
        let mirror = MirrorStore::open(db).await.unwrap();
        let remote = Arc::new(MemoryRemote::new());
        let coordinator = SyncCoordinator::new(
            Arc::clone(&remote),
            mirror,
            EventBus::default(),
            SyncOptions::default().with_page_size(page_size),
        );
        (coordinator, remote)
    }

    #[tokio::test]
    async fn load_next_walks_the_scan_until_exhausted() {
        let (coordinator, remote) = setup(2).await;
        remote.seed((1..=3).map(|i| (Note::new(format!("n{i}"), ""), i)));

        assert_eq!(coordinator.load_next().await.unwrap(), 2);
        assert_eq!(coordinator.load_next().await.unwrap(), 1);
        assert!(coordinator.state().status.is_exhausted());

        let requests = remote.page_requests();
        assert_eq!(coordinator.load_next().await.unwrap(), 0);
        assert_eq!(remote.page_requests(), requests);
        assert_eq!(coordinator.state().len(), 3);
    }

    #[tokio::test]
    async fn failed_load_keeps_loaded_records() {
        let (coordinator, remote) = setup(1).await;
        remote.seed([(Note::new("a", ""), 1), (Note::new("b", ""), 2)]);
        coordinator.load_next().await.unwrap();

        remote.set_offline(true);
        assert!(matches!(coordinator.load_next().await, Err(Error::Network(_))));
        let state = coordinator.state();
        assert_eq!(state.len(), 1);
        assert!(matches!(state.status, LoadStatus::Failed(_)));
    }

    #[tokio::test]
    async fn mutate_cannot_rewrite_identity_fields() {
        let (coordinator, _remote) = setup(10).await;
        let created = coordinator.create(Note::new("t", "c")).await.unwrap();

        let updated = coordinator
            .mutate(created.id, |record| {
                record.id = RecordId::new(999);
                record.created_at = 0;
                record.remote_id = None;
                record.payload.content = "changed".into();
            })
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.remote_id, created.remote_id);
        assert_eq!(updated.payload.content, "changed");
    }

    #[tokio::test]
    async fn mutate_rejects_invalid_payload_before_writing() {
        let (coordinator, _remote) = setup(10).await;
        let created = coordinator.create(Note::new("t", "c")).await.unwrap();
        let result = coordinator
            .mutate(created.id, |record| {
                record.payload.title.clear();
                record.payload.content.clear();
            })
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(coordinator.state().get(created.id), Some(&created));
    }

    #[tokio::test]
    async fn operations_on_unknown_ids_are_not_found() {
        let (coordinator, _remote) = setup(10).await;
        let missing = RecordId::new(404);
        assert!(matches!(coordinator.toggle_favorite(missing).await, Err(Error::NotFound(_))));
        assert!(matches!(coordinator.delete(missing).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn fetch_page_rejects_zero_page_size() {
        let (coordinator, _remote) = setup(10).await;
        assert!(matches!(
            coordinator.fetch_page(None, 0).await,
            Err(Error::InvalidInput(_))
        ));
    }
}
