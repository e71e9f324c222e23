//! Local mirror store: the on-device cache of one entity family.
//!
//! `SQLite` work runs on the blocking pool. Every write publishes a fresh,
//! complete snapshot of the family while the database lock is still held,
//! so subscribers observe snapshots in write order and never see a
//! half-applied page.

use std::collections::HashSet;
use std::sync::{Arc, MutexGuard, PoisonError};

use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::watch;

use super::connection::{Database, SharedDatabase};
use super::locks::{KeyGuard, KeyedLocks};
use crate::error::{Error, Result};
use crate::feed::Feed;
use crate::models::{Payload, Record, RecordId, RemoteId};
use crate::remote::RemoteRecord;
use crate::search::TextQuery;

/// Full family contents, newest first.
pub type Snapshot<P> = Arc<Vec<Record<P>>>;

/// Reactive stream of mirror snapshots.
pub type Snapshots<P> = Feed<Snapshot<P>>;

const SELECT_COLUMNS: &str = "id, remote_id, payload, created_at, favorite";

/// Cloneable handle to the mirror of family `P`.
///
/// Construct one per family per process and share clones of it; two stores
/// of the same family would each publish their own, partial view of writes
/// and hand out independent record locks.
pub struct MirrorStore<P: Payload> {
    inner: Arc<MirrorInner<P>>,
}

struct MirrorInner<P> {
    db: SharedDatabase,
    snapshots: watch::Sender<Snapshot<P>>,
    record_locks: KeyedLocks<RecordId>,
}

impl<P> MirrorInner<P> {
    fn database(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: Payload> Clone for MirrorStore<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: Payload> MirrorStore<P> {
    /// Attach to a shared database and load the current family snapshot.
    pub async fn open(db: SharedDatabase) -> Result<Self> {
        let initial = {
            let db = Arc::clone(&db);
            run_blocking(move || {
                let guard = db.lock().unwrap_or_else(PoisonError::into_inner);
                load_family::<P>(guard.connection())
            })
            .await?
        };
        let (snapshots, _) = watch::channel(Arc::new(initial));
        Ok(Self {
            inner: Arc::new(MirrorInner {
                db,
                snapshots,
                record_locks: KeyedLocks::new(),
            }),
        })
    }

    /// Exclusive access to one record, shared by every clone of this store.
    ///
    /// Store methods never take it themselves; hold it around a
    /// read-modify-write of the record.
    pub(crate) async fn lock_record(&self, id: RecordId) -> KeyGuard<RecordId> {
        self.inner.record_locks.lock(id).await
    }

    /// Insert a record that has not reached the remote source yet.
    pub async fn insert_local(
        &self,
        payload: &P,
        created_at: i64,
        favorite: bool,
    ) -> Result<Record<P>> {
        let json = serde_json::to_string(payload)?;
        let id = self
            .write(move |conn| {
                conn.execute(
                    "INSERT INTO records (family, remote_id, payload, created_at, favorite)
                     VALUES (?1, NULL, ?2, ?3, ?4)",
                    params![P::FAMILY, json, created_at, favorite],
                )?;
                Ok(RecordId::new(conn.last_insert_rowid()))
            })
            .await?;

        tracing::debug!(family = P::FAMILY, %id, "Inserted pending record");
        Ok(Record {
            id,
            remote_id: None,
            payload: payload.clone(),
            created_at,
            favorite,
        })
    }

    /// Write `record` back under its id.
    ///
    /// When the row no longer exists the record is stored under a fresh id
    /// (keyed by its remote id when it has one); ids are never resurrected.
    /// Sync code uses [`Self::update`], which never recreates a row.
    pub async fn upsert(&self, record: &Record<P>) -> Result<Record<P>> {
        let json = serde_json::to_string(&record.payload)?;
        let remote_id = record.remote_id.as_ref().map(|remote_id| remote_id.as_str().to_string());
        let (id, created_at, favorite) = (record.id, record.created_at, record.favorite);
        let (stored_id, stored_at) = self
            .write(move |conn| {
                let updated = conn
                    .query_row(
                        "UPDATE records SET remote_id = ?1, payload = ?2, favorite = ?3
                         WHERE id = ?4 AND family = ?5
                         RETURNING id, created_at",
                        params![remote_id, json, favorite, id.get(), P::FAMILY],
                        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
                    )
                    .optional()?;
                if let Some(stored) = updated {
                    return Ok(stored);
                }
                let inserted = match &remote_id {
                    Some(remote_id) => {
                        upsert_row::<P>(conn, remote_id, &json, created_at, favorite)?
                    }
                    None => {
                        conn.execute(
                            "INSERT INTO records (family, remote_id, payload, created_at, favorite)
                             VALUES (?1, NULL, ?2, ?3, ?4)",
                            params![P::FAMILY, json, created_at, favorite],
                        )?;
                        (conn.last_insert_rowid(), created_at)
                    }
                };
                Ok(inserted)
            })
            .await?;

        Ok(Record {
            id: RecordId::new(stored_id),
            remote_id: record.remote_id.clone(),
            payload: record.payload.clone(),
            created_at: stored_at,
            favorite,
        })
    }

    /// Overwrite the payload and favorite flag of an existing row.
    ///
    /// Returns `None` when the row is gone: a deleted record is never
    /// recreated. The remote id only changes through [`Self::assign_remote_id`].
    pub async fn update(&self, record: &Record<P>) -> Result<Option<Record<P>>> {
        let json = serde_json::to_string(&record.payload)?;
        let (id, favorite) = (record.id, record.favorite);
        let raw = self
            .write(move |conn| {
                Ok(conn
                    .query_row(
                        &format!(
                            "UPDATE records SET payload = ?1, favorite = ?2
                             WHERE id = ?3 AND family = ?4
                             RETURNING {SELECT_COLUMNS}"
                        ),
                        params![json, favorite, id.get(), P::FAMILY],
                        RawRow::from_row,
                    )
                    .optional()?)
            })
            .await?;
        raw.map(RawRow::into_record).transpose()
    }

    /// Mirror a fetched page in one transaction, keyed by remote id.
    ///
    /// Returns the stored records in input order with their local ids.
    pub async fn upsert_remote(&self, records: &[RemoteRecord<P>]) -> Result<Vec<Record<P>>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let rows = records
            .iter()
            .map(|record| Ok((record.clone(), serde_json::to_string(&record.payload)?)))
            .collect::<Result<Vec<_>>>()?;

        let stored = self
            .write(move |conn| {
                let tx = conn.transaction()?;
                let mut stored = Vec::with_capacity(rows.len());
                for (remote, json) in rows {
                    let (id, created_at) = upsert_row::<P>(
                        &tx,
                        remote.remote_id.as_str(),
                        &json,
                        remote.created_at,
                        remote.favorite,
                    )?;
                    stored.push(Record {
                        id: RecordId::new(id),
                        remote_id: Some(remote.remote_id),
                        payload: remote.payload,
                        created_at,
                        favorite: remote.favorite,
                    });
                }
                tx.commit()?;
                Ok(stored)
            })
            .await?;

        tracing::debug!(family = P::FAMILY, count = stored.len(), "Mirrored remote records");
        Ok(stored)
    }

    /// Record the remote id of a record after its first successful sync.
    pub async fn assign_remote_id(&self, id: RecordId, remote_id: &RemoteId) -> Result<Record<P>> {
        let remote = remote_id.as_str().to_string();
        let raw = self
            .write(move |conn| {
                Ok(conn
                    .query_row(
                        &format!(
                            "UPDATE records SET remote_id = ?1 WHERE id = ?2 AND family = ?3
                             RETURNING {SELECT_COLUMNS}"
                        ),
                        params![remote, id.get(), P::FAMILY],
                        RawRow::from_row,
                    )
                    .optional()?)
            })
            .await?;

        raw.ok_or_else(|| Error::NotFound(format!("{} record {id}", P::FAMILY)))?
            .into_record()
    }

    /// Point lookup by local id.
    pub async fn get_by_id(&self, id: RecordId) -> Result<Option<Record<P>>> {
        let raw = self
            .read(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {SELECT_COLUMNS} FROM records WHERE id = ?1 AND family = ?2"),
                        params![id.get(), P::FAMILY],
                        RawRow::from_row,
                    )
                    .optional()?)
            })
            .await?;
        raw.map(RawRow::into_record).transpose()
    }

    /// Delete by local id; returns whether a row was removed.
    pub async fn delete_by_id(&self, id: RecordId) -> Result<bool> {
        let removed = self
            .write(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM records WHERE id = ?1 AND family = ?2",
                    params![id.get(), P::FAMILY],
                )?)
            })
            .await?;
        Ok(removed > 0)
    }

    /// Current family contents, newest first.
    pub fn list_all(&self) -> Vec<Record<P>> {
        Vec::clone(&self.inner.snapshots.borrow())
    }

    /// Remote ids of every synced record in the current snapshot.
    pub fn synced_remote_ids(&self) -> HashSet<RemoteId> {
        self.inner
            .snapshots
            .borrow()
            .iter()
            .filter_map(|record| record.remote_id.clone())
            .collect()
    }

    /// Records still waiting for their first sync, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<Record<P>>> {
        let rows = self
            .read(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM records
                     WHERE family = ?1 AND remote_id IS NULL
                     ORDER BY created_at ASC, id ASC"
                ))?;
                let rows = stmt
                    .query_map(params![P::FAMILY], RawRow::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;
        rows.into_iter().map(RawRow::into_record).collect()
    }

    /// Drop synced rows whose remote id is in `known` but not in `keep`.
    ///
    /// `keep` must be the complete remote family and `known` the remote ids
    /// mirrored before it was read, so rows synced while the read was in
    /// flight survive. Pending rows are untouched.
    pub async fn prune_synced(
        &self,
        known: HashSet<RemoteId>,
        keep: HashSet<RemoteId>,
    ) -> Result<Vec<RecordId>> {
        let stale = self
            .write(move |conn| {
                let tx = conn.transaction()?;
                let mut stmt = tx.prepare(
                    "SELECT id, remote_id FROM records
                     WHERE family = ?1 AND remote_id IS NOT NULL",
                )?;
                let synced = stmt
                    .query_map(params![P::FAMILY], |row| {
                        Ok((row.get::<_, i64>(0)?, RemoteId::new(row.get::<_, String>(1)?)))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                drop(stmt);
                let mut stale = Vec::new();
                for (id, remote_id) in synced {
                    if known.contains(&remote_id) && !keep.contains(&remote_id) {
                        tx.execute(
                            "DELETE FROM records WHERE id = ?1 AND family = ?2",
                            params![id, P::FAMILY],
                        )?;
                        stale.push(RecordId::new(id));
                    }
                }
                tx.commit()?;
                Ok(stale)
            })
            .await?;

        if !stale.is_empty() {
            tracing::info!(family = P::FAMILY, count = stale.len(), "Pruned records removed remotely");
        }
        Ok(stale)
    }

    /// Reactive stream of the whole family.
    pub fn observe_all(&self) -> Snapshots<P> {
        Feed::new(self.inner.snapshots.subscribe())
    }

    /// Reactive stream of records whose `field` (any field when `None`)
    /// contains `text`, case-insensitively. Empty text yields `observe_all()`.
    pub fn search_by_substring(&self, field: Option<&str>, text: &str) -> Snapshots<P> {
        let Some(query) = TextQuery::parse(text) else {
            return self.observe_all();
        };
        let field = field.map(str::to_string);
        Feed::with_view(self.inner.snapshots.subscribe(), move |snapshot: &Snapshot<P>| {
            Arc::new(
                snapshot
                    .iter()
                    .filter(|record| match &field {
                        Some(field) => query.matches_field(&record.payload, field),
                        None => query.matches(&record.payload),
                    })
                    .cloned()
                    .collect(),
            )
        })
    }

    async fn read<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        run_blocking(move || op(inner.database().connection())).await
    }

    /// Run a write and publish the resulting snapshot under the same lock.
    async fn write<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        run_blocking(move || {
            let mut db = inner.database();
            let value = op(db.connection_mut())?;
            let snapshot = load_family::<P>(db.connection())?;
            inner.snapshots.send_replace(Arc::new(snapshot));
            drop(db);
            Ok(value)
        })
        .await
    }
}

/// Run `SQLite` work off the async workers.
async fn run_blocking<T, F>(op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(op).await?
}

fn upsert_row<P: Payload>(
    conn: &Connection,
    remote_id: &str,
    json: &str,
    created_at: i64,
    favorite: bool,
) -> rusqlite::Result<(i64, i64)> {
    conn.query_row(
        "INSERT INTO records (family, remote_id, payload, created_at, favorite)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (family, remote_id) DO UPDATE
             SET payload = excluded.payload, favorite = excluded.favorite
         RETURNING id, created_at",
        params![P::FAMILY, remote_id, json, created_at, favorite],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
}

fn load_family<P: Payload>(conn: &Connection) -> Result<Vec<Record<P>>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {SELECT_COLUMNS} FROM records
         WHERE family = ?1
         ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt
        .query_map(params![P::FAMILY], RawRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(RawRow::into_record).collect()
}

struct RawRow {
    id: i64,
    remote_id: Option<String>,
    payload: String,
    created_at: i64,
    favorite: bool,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            remote_id: row.get(1)?,
            payload: row.get(2)?,
            created_at: row.get(3)?,
            favorite: row.get(4)?,
        })
    }

    fn into_record<P: Payload>(self) -> Result<Record<P>> {
        Ok(Record {
            id: RecordId::new(self.id),
            remote_id: self.remote_id.map(RemoteId::new),
            payload: serde_json::from_str(&self.payload)?,
            created_at: self.created_at,
            favorite: self.favorite,
        })
    }
}
