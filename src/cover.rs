//! Cover resolver: cache-or-fetch for an album's representative image.
//!
//! Every caller-facing operation that shows an album goes through
//! [`CoverResolver::resolve_cover`] or [`CoverResolver::resolve_cover_of`].
//! Both share one fetch path; nothing else fetches covers.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::client::{Album, AlbumId, ClientError, RemoteClient};
use crate::error::ServiceError;
use crate::inflight::{InFlightKey, InFlightRegistry, OperationKind};
use crate::store::{ArtifactKind, ArtifactStore};

/// Resolves the cover image of an album to a local file.
#[derive(Clone)]
pub struct CoverResolver {
    client: Arc<dyn RemoteClient>,
    store: ArtifactStore,
    registry: Arc<InFlightRegistry>,
}

impl std::fmt::Debug for CoverResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverResolver")
            .field("store", &self.store)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl CoverResolver {
    /// Creates a resolver sharing `registry` with the rest of the engine.
    #[must_use]
    pub fn new(
        client: Arc<dyn RemoteClient>,
        store: ArtifactStore,
        registry: Arc<InFlightRegistry>,
    ) -> Self {
        Self {
            client,
            store,
            registry,
        }
    }

    /// Returns the cached cover path, fetching it first if needed.
    ///
    /// A cache hit returns immediately without touching the registry or
    /// the remote service.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Busy`] if a cover fetch for this album is running
    /// - [`ServiceError::NotFound`] if the album does not exist remotely
    /// - [`ServiceError::EmptyContent`] if it has no photo or no image
    /// - [`ServiceError::DownloadFailed`] for any adapter or I/O failure
    #[instrument(skip(self), fields(album_id = %album_id))]
    pub async fn resolve_cover(&self, album_id: &AlbumId) -> Result<PathBuf, ServiceError> {
        self.resolve(album_id, None).await
    }

    /// Same as [`Self::resolve_cover`], for a caller that already holds the
    /// album detail. On a miss the album is not looked up a second time.
    ///
    /// # Errors
    ///
    /// Same as [`Self::resolve_cover`], except `NotFound`.
    #[instrument(skip(self, album), fields(album_id = %album_id))]
    pub async fn resolve_cover_of(
        &self,
        album_id: &AlbumId,
        album: &Album,
    ) -> Result<PathBuf, ServiceError> {
        self.resolve(album_id, Some(album)).await
    }

    async fn resolve(
        &self,
        album_id: &AlbumId,
        known: Option<&Album>,
    ) -> Result<PathBuf, ServiceError> {
        let cover_path = self.store.path_for(album_id, ArtifactKind::Cover);
        if self.store.exists(&cover_path).await {
            debug!(path = %cover_path.display(), "cover cache hit");
            return Ok(cover_path);
        }

        let key = InFlightKey::new(album_id.clone(), OperationKind::CoverFetch);
        let Some(_guard) = self.registry.acquire(key) else {
            info!("cover fetch already in flight");
            return Err(ServiceError::busy(album_id, OperationKind::CoverFetch));
        };

        match self.fetch_cover(album_id, known, cover_path).await {
            Ok(path) => {
                info!(path = %path.display(), "cover stored");
                Ok(path)
            }
            Err(error) => {
                warn!(error = %error, "cover fetch failed");
                Err(error)
            }
        }
    }

    async fn fetch_cover(
        &self,
        album_id: &AlbumId,
        known: Option<&Album>,
        cover_path: PathBuf,
    ) -> Result<PathBuf, ServiceError> {
        let target = format!("cover of album {album_id}");

        let fetched;
        let album = match known {
            Some(album) => album,
            None => {
                fetched = self
                    .client
                    .get_album_detail(album_id)
                    .await
                    .map_err(|e| ServiceError::download_failed(target.clone(), e))?
                    .ok_or_else(|| ServiceError::not_found(album_id))?;
                &fetched
            }
        };

        let first_photo = album
            .first_photo()
            .ok_or_else(|| ServiceError::empty_content(album_id, "album has no photos"))?;

        let images = self
            .client
            .get_photo_detail(&first_photo.id, true)
            .await
            .map_err(|e| ServiceError::download_failed(target.clone(), e))?;
        let image = images
            .first()
            .ok_or_else(|| ServiceError::empty_content(album_id, "first photo has no images"))?;

        let staging = self.store.staging_path_for(album_id, ArtifactKind::Cover);
        self.store
            .prepare_parent(&staging)
            .await
            .map_err(|e| ServiceError::download_failed(target.clone(), ClientError::io(&staging, e)))?;

        if let Err(error) = self.client.download_by_image_detail(image, &staging).await {
            self.store.discard(&staging).await;
            return Err(ServiceError::download_failed(target, error));
        }

        if let Err(error) = self.store.promote(&staging, &cover_path).await {
            self.store.discard(&staging).await;
            return Err(ServiceError::download_failed(
                target,
                ClientError::io(&cover_path, error),
            ));
        }
        Ok(cover_path)
    }
}
