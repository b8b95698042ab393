//! Album downloader: cache-or-fetch for the compiled document of an album.
//!
//! The adapter's bulk download is told exactly where to write: an
//! album-qualified staging path from the [`ArtifactStore`]. When it
//! finishes, that file is promoted to `pdf/<album_id>.pdf`. Concurrent
//! downloads of different albums therefore never see each other's output.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::client::{AlbumId, ClientError, DownloadOptions, RemoteClient};
use crate::error::ServiceError;
use crate::inflight::{InFlightKey, InFlightRegistry, OperationKind};
use crate::store::{ArtifactKind, ArtifactStore};
use crate::workers::WorkerPool;

/// Resolves an album to its compiled document on disk.
#[derive(Clone)]
pub struct AlbumDownloader {
    client: Arc<dyn RemoteClient>,
    store: ArtifactStore,
    registry: Arc<InFlightRegistry>,
    workers: WorkerPool,
}

impl std::fmt::Debug for AlbumDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlbumDownloader")
            .field("store", &self.store)
            .field("registry", &self.registry)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl AlbumDownloader {
    /// Creates a downloader sharing `registry` with the rest of the engine.
    #[must_use]
    pub fn new(
        client: Arc<dyn RemoteClient>,
        store: ArtifactStore,
        registry: Arc<InFlightRegistry>,
        workers: WorkerPool,
    ) -> Self {
        Self {
            client,
            store,
            registry,
            workers,
        }
    }

    /// Returns the canonical document path, producing it first if needed.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Busy`] if a full download of this album is running
    /// - [`ServiceError::DownloadFailed`] if the adapter fails, the worker
    ///   task dies, or no document was produced
    #[instrument(skip(self), fields(album_id = %album_id))]
    pub async fn resolve_document(&self, album_id: &AlbumId) -> Result<PathBuf, ServiceError> {
        let document_path = self.store.path_for(album_id, ArtifactKind::Document);
        if self.store.exists(&document_path).await {
            debug!(path = %document_path.display(), "document cache hit");
            return Ok(document_path);
        }

        let key = InFlightKey::new(album_id.clone(), OperationKind::FullDownload);
        let Some(guard) = self.registry.acquire_owned(key) else {
            info!("full download already in flight");
            return Err(ServiceError::busy(album_id, OperationKind::FullDownload));
        };

        // The guard travels with the job: the key stays held until the
        // worker is done, even if this request is dropped meanwhile.
        let job = produce_document(
            Arc::clone(&self.client),
            self.store.clone(),
            album_id.clone(),
            document_path,
        );
        let outcome = self
            .workers
            .run(async move {
                let _guard = guard;
                job.await
            })
            .await
            .unwrap_or_else(|worker_error| {
                Err(ServiceError::download_failed(
                    format!("album {album_id}"),
                    ClientError::remote(worker_error.to_string()),
                ))
            });

        match outcome {
            Ok(path) => {
                info!(path = %path.display(), "document stored");
                Ok(path)
            }
            Err(error) => {
                warn!(error = %error, "document download failed");
                Err(error)
            }
        }
    }
}

/// Bulk download into the staging path, then promote. Runs on a pool worker.
async fn produce_document(
    client: Arc<dyn RemoteClient>,
    store: ArtifactStore,
    album_id: AlbumId,
    document_path: PathBuf,
) -> Result<PathBuf, ServiceError> {
    let target = format!("album {album_id}");
    let staging = store.staging_path_for(&album_id, ArtifactKind::Document);

    // A leftover from an earlier crashed run must not pass as fresh output.
    store.discard(&staging).await;
    store
        .prepare_parent(&staging)
        .await
        .map_err(|e| ServiceError::download_failed(target.clone(), ClientError::io(&staging, e)))?;

    let options = DownloadOptions::new(staging.clone());
    debug!(staging = %staging.display(), "starting bulk download");
    if let Err(error) = client.download_album(&album_id, &options).await {
        store.discard(&staging).await;
        return Err(ServiceError::download_failed(target, error));
    }

    if !store.exists(&staging).await {
        return Err(ServiceError::download_failed(
            target,
            ClientError::remote("bulk download reported success but no document was produced"),
        ));
    }

    store
        .promote(&staging, &document_path)
        .await
        .map_err(|e| ServiceError::download_failed(target, ClientError::io(&document_path, e)))?;
    Ok(document_path)
}
