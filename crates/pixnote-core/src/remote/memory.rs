//! In-process remote source with fault injection.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use uuid::Uuid;

use super::{Cursor, RemoteDraft, RemoteFields, RemotePage, RemoteRecord, RemoteSource};
use crate::error::{Error, Result};
use crate::models::{Payload, RemoteId};
use crate::search::TextQuery;

/// Failure injected into the next write on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Network,
    Conflict,
}

impl Fault {
    fn into_error(self, remote_id: &RemoteId) -> Error {
        match self {
            Self::Network => Error::Network(format!("injected failure writing {remote_id}")),
            Self::Conflict => Error::Conflict(format!("{remote_id} changed remotely")),
        }
    }
}

/// Document store kept in memory.
///
/// Stands in for the cloud store in tests and offline demos.
pub struct MemoryRemote<P> {
    state: Mutex<MemoryState<P>>,
}

struct MemoryState<P> {
    documents: HashMap<RemoteId, RemoteRecord<P>>,
    offline: bool,
    searchable: bool,
    latency: Duration,
    update_faults: HashMap<RemoteId, Fault>,
    delete_faults: HashMap<RemoteId, Fault>,
    page_requests: usize,
}

impl<P: Payload> Default for MemoryRemote<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Payload> MemoryRemote<P> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                documents: HashMap::new(),
                offline: false,
                searchable: true,
                latency: Duration::ZERO,
                update_faults: HashMap::new(),
                delete_faults: HashMap::new(),
                page_requests: 0,
            }),
        }
    }

    /// Insert documents directly, bypassing fault injection.
    pub fn seed(&self, documents: impl IntoIterator<Item = (P, i64)>) -> Vec<RemoteId> {
        let mut state = self.lock();
        documents
            .into_iter()
            .map(|(payload, created_at)| {
                let remote_id = new_remote_id();
                state.documents.insert(
                    remote_id.clone(),
                    RemoteRecord {
                        remote_id: remote_id.clone(),
                        payload,
                        created_at,
                        favorite: false,
                    },
                );
                remote_id
            })
            .collect()
    }

    pub fn insert(&self, record: RemoteRecord<P>) {
        self.lock()
            .documents
            .insert(record.remote_id.clone(), record);
    }

    pub fn get(&self, remote_id: &RemoteId) -> Option<RemoteRecord<P>> {
        self.lock().documents.get(remote_id).cloned()
    }

    /// Remove a document as another client would.
    pub fn remove(&self, remote_id: &RemoteId) -> Option<RemoteRecord<P>> {
        self.lock().documents.remove(remote_id)
    }

    pub fn len(&self) -> usize {
        self.lock().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every call fail with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Toggle support for server-side substring queries.
    pub fn set_searchable(&self, searchable: bool) {
        self.lock().searchable = searchable;
    }

    /// Delay applied before every call.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    pub fn fail_next_update(&self, remote_id: &RemoteId, fault: Fault) {
        self.lock().update_faults.insert(remote_id.clone(), fault);
    }

    pub fn fail_next_delete(&self, remote_id: &RemoteId, fault: Fault) {
        self.lock().delete_faults.insert(remote_id.clone(), fault);
    }

    /// Number of `get_page` calls served so far.
    pub fn page_requests(&self) -> usize {
        self.lock().page_requests
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState<P>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn pause(&self) {
        let latency = self.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

impl<P> MemoryState<P> {
    fn check_online(&self) -> Result<()> {
        if self.offline {
            Err(Error::Network("remote unreachable".into()))
        } else {
            Ok(())
        }
    }
}

impl<P: Payload> RemoteSource<P> for MemoryRemote<P> {
    async fn create(&self, draft: &RemoteDraft<P>) -> Result<RemoteId> {
        self.pause().await;
        let mut state = self.lock();
        state.check_online()?;

        let remote_id = new_remote_id();
        state.documents.insert(
            remote_id.clone(),
            RemoteRecord {
                remote_id: remote_id.clone(),
                payload: draft.payload.clone(),
                created_at: draft.created_at,
                favorite: draft.favorite,
            },
        );
        Ok(remote_id)
    }

    async fn get_page(&self, cursor: Option<&Cursor>, page_size: usize) -> Result<RemotePage<P>> {
        self.pause().await;
        let mut state = self.lock();
        state.page_requests += 1;
        state.check_online()?;

        if page_size == 0 {
            return Err(Error::InvalidInput("page size must be positive".into()));
        }
        let position = cursor
            .map(|cursor| {
                cursor
                    .position()
                    .ok_or_else(|| Error::InvalidInput(format!("malformed cursor {}", cursor.as_token())))
            })
            .transpose()?;

        let mut documents = state
            .documents
            .values()
            .filter(|doc| {
                position.as_ref().map_or(true, |(created_at, remote_id)| {
                    (doc.created_at, &doc.remote_id) < (*created_at, remote_id)
                })
            })
            .collect::<Vec<_>>();
        documents.sort_by(|a, b| (b.created_at, &b.remote_id).cmp(&(a.created_at, &a.remote_id)));

        let has_more = documents.len() > page_size;
        let records = documents
            .into_iter()
            .take(page_size)
            .cloned()
            .collect::<Vec<_>>();
        let next = if has_more {
            records
                .last()
                .map(|last| Cursor::after(last.created_at, &last.remote_id))
        } else {
            None
        };

        Ok(RemotePage { records, next })
    }

    async fn update(&self, remote_id: &RemoteId, fields: &RemoteFields<P>) -> Result<()> {
        self.pause().await;
        let mut state = self.lock();
        state.check_online()?;
        if let Some(fault) = state.update_faults.remove(remote_id) {
            return Err(fault.into_error(remote_id));
        }

        let document = state
            .documents
            .get_mut(remote_id)
            .ok_or_else(|| Error::NotFound(format!("remote document {remote_id}")))?;
        document.payload = fields.payload.clone();
        document.favorite = fields.favorite;
        Ok(())
    }

    async fn delete(&self, remote_id: &RemoteId) -> Result<()> {
        self.pause().await;
        let mut state = self.lock();
        state.check_online()?;
        if let Some(fault) = state.delete_faults.remove(remote_id) {
            return Err(fault.into_error(remote_id));
        }

        state
            .documents
            .remove(remote_id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("remote document {remote_id}")))
    }

    async fn query_by_substring(&self, field: &str, text: &str) -> Result<Vec<RemoteRecord<P>>> {
        self.pause().await;
        let state = self.lock();
        state.check_online()?;
        if !state.searchable {
            return Err(Error::Unsupported(format!(
                "substring query on {}.{field}",
                P::FAMILY
            )));
        }

        let Some(query) = TextQuery::parse(text) else {
            return Ok(Vec::new());
        };
        let mut matches = state
            .documents
            .values()
            .filter(|doc| query.matches_field(&doc.payload, field))
            .cloned()
            .collect::<Vec<_>>();
        matches.sort_by(|a, b| (b.created_at, &b.remote_id).cmp(&(a.created_at, &a.remote_id)));
        Ok(matches)
    }
}

fn new_remote_id() -> RemoteId {
    RemoteId::new(Uuid::now_v7().to_string())
}
