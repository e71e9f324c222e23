//! Remote source contract: the network document store of record.

mod http;
mod memory;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Payload, Record, RemoteId};

pub use http::HttpRemote;
pub use memory::{Fault, MemoryRemote};

/// Opaque pagination continuation token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a token handed out by a remote source.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_token(&self) -> &str {
        &self.0
    }

    /// Cursor positioned after the given record in newest-first order.
    pub fn after(created_at: i64, remote_id: &RemoteId) -> Self {
        Self(format!("{created_at}:{remote_id}"))
    }

    /// Decode a cursor built by [`Cursor::after`].
    pub fn position(&self) -> Option<(i64, RemoteId)> {
        let (created_at, remote_id) = self.0.split_once(':')?;
        if remote_id.is_empty() {
            return None;
        }
        Some((created_at.parse().ok()?, RemoteId::new(remote_id)))
    }
}

/// A document as stored remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord<P> {
    pub remote_id: RemoteId,
    pub payload: P,
    pub created_at: i64,
    pub favorite: bool,
}

/// One page of a newest-first scan.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePage<P> {
    pub records: Vec<RemoteRecord<P>>,
    /// `None` on the final page
    pub next: Option<Cursor>,
}

/// Fields sent when a record is created remotely.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDraft<P> {
    pub payload: P,
    pub created_at: i64,
    pub favorite: bool,
}

impl<P: Clone> RemoteDraft<P> {
    pub fn from_record(record: &Record<P>) -> Self {
        Self {
            payload: record.payload.clone(),
            created_at: record.created_at,
            favorite: record.favorite,
        }
    }
}

/// Mutable fields sent on update.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFields<P> {
    pub payload: P,
    pub favorite: bool,
}

impl<P: Clone> RemoteFields<P> {
    pub fn from_record(record: &Record<P>) -> Self {
        Self {
            payload: record.payload.clone(),
            favorite: record.favorite,
        }
    }
}

/// Document store holding family `P`.
///
/// No transactional guarantees across documents. Pages are ordered by
/// `created_at` descending, ties broken by remote id descending.
pub trait RemoteSource<P: Payload>: Send + Sync + 'static {
    /// Create a document and return its remote id.
    fn create(&self, draft: &RemoteDraft<P>) -> impl Future<Output = Result<RemoteId>> + Send;

    /// Fetch the page following `cursor` (the first page when `None`).
    fn get_page(
        &self,
        cursor: Option<&Cursor>,
        page_size: usize,
    ) -> impl Future<Output = Result<RemotePage<P>>> + Send;

    fn update(
        &self,
        remote_id: &RemoteId,
        fields: &RemoteFields<P>,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete(&self, remote_id: &RemoteId) -> impl Future<Output = Result<()>> + Send;

    /// Best-effort server-side substring search on one field.
    fn query_by_substring(
        &self,
        field: &str,
        text: &str,
    ) -> impl Future<Output = Result<Vec<RemoteRecord<P>>>> + Send {
        let _ = text;
        let operation = format!("substring query on {}.{field}", P::FAMILY);
        async move { Err(Error::Unsupported(operation)) }
    }
}
