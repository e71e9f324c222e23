//! Opened local mirror plus, when configured, the remote-backed coordinators.

use std::path::Path;
use std::sync::Arc;

use pixnote_core::config::ClientConfig;
use pixnote_core::db::{Database, MirrorStore, SharedDatabase};
use pixnote_core::events::EventBus;
use pixnote_core::models::{Note, Payload, Photo, Record, RecordId};
use pixnote_core::remote::{HttpRemote, RemoteSource};
use pixnote_core::sync::SyncCoordinator;
use pixnote_core::util::unix_millis_now;

use crate::error::CliError;

/// One record family: its mirror and an optional coordinator.
pub struct Collection<P: Payload, R> {
    pub mirror: MirrorStore<P>,
    coordinator: Option<SyncCoordinator<P, R>>,
}

impl<P: Payload, R: RemoteSource<P>> Collection<P, R> {
    pub async fn open(
        db: SharedDatabase,
        remote: Option<Arc<R>>,
        config: &ClientConfig,
    ) -> Result<Self, CliError> {
        let mirror = MirrorStore::open(db).await?;
        let coordinator = remote.map(|remote| {
            SyncCoordinator::new(
                remote,
                mirror.clone(),
                EventBus::default(),
                config.sync_options(),
            )
        });
        Ok(Self {
            mirror,
            coordinator,
        })
    }

    pub fn coordinator(&self) -> Result<&SyncCoordinator<P, R>, CliError> {
        self.coordinator
            .as_ref()
            .ok_or(CliError::RemoteNotConfigured)
    }

    /// Create through the coordinator, or store a pending record when offline.
    pub async fn create(&self, payload: P) -> Result<Record<P>, CliError> {
        if let Some(coordinator) = &self.coordinator {
            return Ok(coordinator.create(payload).await?);
        }
        payload.validate()?;
        Ok(self
            .mirror
            .insert_local(&payload, unix_millis_now(), false)
            .await?)
    }

    /// Delete through the coordinator; without one only pending records can go.
    pub async fn delete(&self, id: RecordId) -> Result<(), CliError> {
        if let Some(coordinator) = &self.coordinator {
            return Ok(coordinator.delete(id).await?);
        }
        let record = self
            .mirror
            .get_by_id(id)
            .await?
            .ok_or_else(|| pixnote_core::Error::NotFound(format!("record {id}")))?;
        if record.is_synced() {
            return Err(CliError::RemoteNotConfigured);
        }
        self.mirror.delete_by_id(id).await?;
        Ok(())
    }
}

pub struct App {
    pub photos: Collection<Photo, HttpRemote<Photo>>,
    pub notes: Collection<Note, HttpRemote<Note>>,
}

impl App {
    pub async fn open(db_path: &Path, config: &ClientConfig) -> Result<Self, CliError> {
        let db = Database::open(db_path)?.into_shared();

        let (photo_remote, note_remote) = match config.api_base_url.as_deref() {
            Some(url) => {
                tracing::debug!("Using remote source at {url}");
                let token = config.api_token.clone();
                (
                    Some(Arc::new(HttpRemote::new(
                        url,
                        token.clone(),
                        config.request_timeout(),
                    )?)),
                    Some(Arc::new(HttpRemote::new(
                        url,
                        token,
                        config.request_timeout(),
                    )?)),
                )
            }
            None => (None, None),
        };

        let photos = Collection::open(Arc::clone(&db), photo_remote, config).await?;
        let notes = Collection::open(db, note_remote, config).await?;
        Ok(Self {
            photos,
            notes,
        })
    }
}
