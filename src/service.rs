//! Caller-facing operations.
//!
//! [`AlbumService`] wires the selector, cover resolver and album downloader
//! around one shared [`InFlightRegistry`] and returns either an
//! [`AlbumSummary`] or a typed [`ServiceError`]. Raw ids arrive as text and
//! are validated here, before any remote call or filesystem access.

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::{StreamExt, TryStreamExt, stream};
use tracing::{debug, info, instrument};

use crate::client::{Album, AlbumId, ClientError, RemoteClient};
use crate::cover::CoverResolver;
use crate::document::AlbumDownloader;
use crate::error::ServiceError;
use crate::inflight::InFlightRegistry;
use crate::selector::{DEFAULT_KEYWORD_MAX_PAGES, PaginatedSelector, SelectQuery, Selection};
use crate::store::ArtifactStore;
use crate::workers::{DEFAULT_WORKERS, WorkerError, WorkerPool};

/// Photo listings requested at once while counting an album's pages.
pub const PAGE_COUNT_LOOKUPS: usize = 4;

/// Tunables for an [`AlbumService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Maximum concurrent bulk downloads.
    pub download_workers: usize,
    /// Keyword search page cap.
    pub keyword_max_pages: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            download_workers: DEFAULT_WORKERS,
            keyword_max_pages: DEFAULT_KEYWORD_MAX_PAGES,
        }
    }
}

/// Everything a caller needs to present one album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumSummary {
    /// Album identifier.
    pub album_id: AlbumId,
    /// Display title.
    pub title: String,
    /// Tags in remote order.
    pub tags: Vec<String>,
    /// Publication date, when the remote reports one.
    pub pub_date: Option<String>,
    /// Total images across all photos.
    pub page_count: usize,
    /// Local path of the cached cover.
    pub cover_path: PathBuf,
    /// Total works by the author, set only for author selections.
    pub author_total: Option<usize>,
}

/// Resolution, caching and dedup engine behind every caller-facing operation.
#[derive(Clone)]
pub struct AlbumService {
    client: Arc<dyn RemoteClient>,
    store: ArtifactStore,
    registry: Arc<InFlightRegistry>,
    covers: CoverResolver,
    documents: AlbumDownloader,
    selector: PaginatedSelector,
}

impl std::fmt::Debug for AlbumService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlbumService")
            .field("store", &self.store)
            .field("registry", &self.registry)
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

impl AlbumService {
    /// Creates a service with its own in-flight registry.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::InvalidSize`] if `options.download_workers` is
    /// outside the allowed range.
    pub fn new(
        client: Arc<dyn RemoteClient>,
        store: ArtifactStore,
        options: ServiceOptions,
    ) -> Result<Self, WorkerError> {
        Self::with_registry(client, store, Arc::new(InFlightRegistry::default()), options)
    }

    /// Creates a service around an existing registry.
    ///
    /// Services sharing a registry also share dedup: a cover fetch started
    /// through one is reported busy through the other.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::InvalidSize`] if `options.download_workers` is
    /// outside the allowed range.
    pub fn with_registry(
        client: Arc<dyn RemoteClient>,
        store: ArtifactStore,
        registry: Arc<InFlightRegistry>,
        options: ServiceOptions,
    ) -> Result<Self, WorkerError> {
        let workers = WorkerPool::new(options.download_workers)?;
        let covers = CoverResolver::new(Arc::clone(&client), store.clone(), Arc::clone(&registry));
        let documents = AlbumDownloader::new(
            Arc::clone(&client),
            store.clone(),
            Arc::clone(&registry),
            workers,
        );
        let selector =
            PaginatedSelector::with_keyword_max_pages(Arc::clone(&client), options.keyword_max_pages);

        Ok(Self {
            client,
            store,
            registry,
            covers,
            documents,
            selector,
        })
    }

    /// Returns the artifact store.
    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Returns the shared in-flight registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<InFlightRegistry> {
        &self.registry
    }

    /// Looks an album up by id and makes sure its cover is cached.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidAlbumId`] for an unusable id
    /// - [`ServiceError::NotFound`] if the album does not exist
    /// - any error of [`CoverResolver::resolve_cover`]
    /// - [`ServiceError::DownloadFailed`] if a lookup fails
    #[instrument(skip(self))]
    pub async fn resolve_by_id(&self, raw_id: &str) -> Result<AlbumSummary, ServiceError> {
        let album_id = AlbumId::parse(raw_id)?;
        self.summarize(&album_id, None).await
    }

    /// Returns the local path of the album's compiled document.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidAlbumId`] for an unusable id
    /// - any error of [`AlbumDownloader::resolve_document`]
    #[instrument(skip(self))]
    pub async fn resolve_document(&self, raw_id: &str) -> Result<PathBuf, ServiceError> {
        let album_id = AlbumId::parse(raw_id)?;
        self.documents.resolve_document(&album_id).await
    }

    /// Selects the `ordinal`-th keyword search result and summarizes it.
    ///
    /// # Errors
    ///
    /// Any error of [`PaginatedSelector::select_nth`] or [`Self::resolve_by_id`].
    #[instrument(skip(self))]
    pub async fn select_nth_by_keyword(
        &self,
        keywords: &[String],
        ordinal: i64,
    ) -> Result<AlbumSummary, ServiceError> {
        let query = SelectQuery::keyword(keywords.iter().cloned());
        let selection = self.selector.select_nth(&query, ordinal).await?;
        self.summarize_selection(selection, false).await
    }

    /// Selects the author's `ordinal`-th work, newest first, and summarizes it.
    ///
    /// The summary's `author_total` carries the author's total work count.
    ///
    /// # Errors
    ///
    /// Any error of [`PaginatedSelector::select_nth`] or [`Self::resolve_by_id`].
    #[instrument(skip(self))]
    pub async fn select_nth_by_author(
        &self,
        author: &str,
        ordinal: i64,
    ) -> Result<AlbumSummary, ServiceError> {
        let query = SelectQuery::author(author.split_whitespace());
        let selection = self.selector.select_nth(&query, ordinal).await?;
        self.summarize_selection(selection, true).await
    }

    /// Picks a random album from the monthly ranking and summarizes it.
    ///
    /// # Errors
    ///
    /// Any error of [`PaginatedSelector::select_random`] or [`Self::resolve_by_id`].
    #[instrument(skip(self))]
    pub async fn recommend_random(&self) -> Result<AlbumSummary, ServiceError> {
        let selection = self.selector.select_random().await?;
        self.summarize_selection(selection, false).await
    }

    async fn summarize_selection(
        &self,
        selection: Selection,
        with_author_total: bool,
    ) -> Result<AlbumSummary, ServiceError> {
        debug!(album_id = %selection.album_id, title = %selection.title, "selected");
        let author_total = if with_author_total {
            selection.total
        } else {
            None
        };
        self.summarize(&selection.album_id, author_total).await
    }

    async fn summarize(
        &self,
        album_id: &AlbumId,
        author_total: Option<usize>,
    ) -> Result<AlbumSummary, ServiceError> {
        let album = self
            .client
            .get_album_detail(album_id)
            .await
            .map_err(|e| ServiceError::download_failed(format!("album {album_id}"), e))?
            .ok_or_else(|| ServiceError::not_found(album_id))?;

        let cover_path = self.covers.resolve_cover_of(album_id, &album).await?;
        let page_count = self.count_pages(&album).await?;
        info!(album_id = %album_id, page_count, "album resolved");

        Ok(AlbumSummary {
            album_id: album_id.clone(),
            title: album.title,
            tags: album.tags,
            pub_date: album.pub_date,
            page_count,
            cover_path,
            author_total,
        })
    }

    async fn count_pages(&self, album: &Album) -> Result<usize, ServiceError> {
        stream::iter(&album.photos)
            .map(|photo| self.client.get_photo_detail(&photo.id, false))
            .buffered(PAGE_COUNT_LOOKUPS)
            .try_fold(0, |pages, images| async move {
                Ok::<_, ClientError>(pages + images.len())
            })
            .await
            .map_err(|e| ServiceError::download_failed(format!("page count of album {}", album.id), e))
    }
}
