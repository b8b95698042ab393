//! Scripted in-memory `RemoteClient` for engine tests.
//!
//! Every trait method bumps a counter, listings are served from page
//! fixtures, and downloads can be held open until the test releases them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use albumcache_core::client::{
    Album, AlbumId, ClientError, DownloadOptions, Image, Photo, RemoteClient, SearchEntry,
    SearchOrder, SearchPage,
};
use async_trait::async_trait;
use tokio::sync::Notify;

/// One `search_site` request as seen by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCall {
    pub query: String,
    pub page: usize,
    pub order: Option<SearchOrder>,
}

/// Holds downloads open until released.
#[derive(Debug, Default)]
pub struct DownloadGate {
    entered: Notify,
    release: Notify,
}

impl DownloadGate {
    /// Waits until a download reached the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Lets one held download continue.
    pub fn release_one(&self) {
        self.release.notify_one();
    }
}

#[derive(Default)]
pub struct FakeRemote {
    albums: HashMap<String, Album>,
    photos: HashMap<String, Vec<Image>>,
    search_pages: Vec<SearchPage>,
    ranking: SearchPage,
    gate: Option<Arc<DownloadGate>>,
    download_delay: Option<Duration>,
    lookup_delay: Option<Duration>,
    fail_image_downloads: bool,
    fail_album_downloads: bool,
    skip_document_output: bool,

    pub album_calls: AtomicUsize,
    pub photo_calls: AtomicUsize,
    photo_lookups_running: AtomicUsize,
    pub peak_photo_lookups: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub ranking_calls: AtomicUsize,
    pub image_downloads: AtomicUsize,
    pub album_downloads: AtomicUsize,
    album_downloads_running: AtomicUsize,
    pub peak_album_downloads: AtomicUsize,
    pub search_log: Mutex<Vec<SearchCall>>,
    pub photo_log: Mutex<Vec<(String, bool)>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an album whose photos hold the given number of images each.
    pub fn with_album(mut self, id: &str, title: &str, tags: &[&str], images_per_photo: &[usize]) -> Self {
        let mut photos = Vec::new();
        for (index, count) in images_per_photo.iter().enumerate() {
            let photo_id = format!("{id}-p{}", index + 1);
            let images = (1..=*count)
                .map(|n| Image::new(format!("https://img.test/{photo_id}/{n:05}.jpg")))
                .collect();
            self.photos.insert(photo_id.clone(), images);
            photos.push(Photo::new(photo_id));
        }
        self.albums.insert(
            id.to_string(),
            Album {
                id: AlbumId::parse(id).unwrap(),
                title: title.to_string(),
                tags: tags.iter().map(ToString::to_string).collect(),
                pub_date: Some("2024-05-01".to_string()),
                photos,
            },
        );
        self
    }

    /// Adds albums with one single-image photo for every id.
    pub fn with_simple_albums<I: IntoIterator<Item = String>>(mut self, ids: I) -> Self {
        for id in ids {
            let title = format!("title {id}");
            self = self.with_album(&id, &title, &["tag"], &[1]);
        }
        self
    }

    pub fn with_search_pages(mut self, pages: Vec<SearchPage>) -> Self {
        self.search_pages = pages;
        self
    }

    pub fn with_ranking(mut self, page: SearchPage) -> Self {
        self.ranking = page;
        self
    }

    pub fn with_gate(mut self, gate: Arc<DownloadGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_download_delay(mut self, delay: Duration) -> Self {
        self.download_delay = Some(delay);
        self
    }

    /// Photo lookups take this long, so overlapping ones can be observed.
    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = Some(delay);
        self
    }

    pub fn failing_image_downloads(mut self) -> Self {
        self.fail_image_downloads = true;
        self
    }

    pub fn failing_album_downloads(mut self) -> Self {
        self.fail_album_downloads = true;
        self
    }

    /// Bulk downloads report success without writing anything.
    pub fn without_document_output(mut self) -> Self {
        self.skip_document_output = true;
        self
    }

    pub fn total_calls(&self) -> usize {
        [
            &self.album_calls,
            &self.photo_calls,
            &self.search_calls,
            &self.ranking_calls,
            &self.image_downloads,
            &self.album_downloads,
        ]
        .iter()
        .map(|counter| counter.load(Ordering::SeqCst))
        .sum()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> Vec<SearchCall> {
        self.search_log.lock().unwrap().clone()
    }

    async fn hold(&self) {
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if let Some(delay) = self.download_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn get_album_detail(&self, album_id: &AlbumId) -> Result<Option<Album>, ClientError> {
        self.album_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.albums.get(album_id.as_str()).cloned())
    }

    async fn get_photo_detail(
        &self,
        photo_id: &str,
        force_resolve: bool,
    ) -> Result<Vec<Image>, ClientError> {
        self.photo_calls.fetch_add(1, Ordering::SeqCst);
        self.photo_log
            .lock()
            .unwrap()
            .push((photo_id.to_string(), force_resolve));
        let running = self.photo_lookups_running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_photo_lookups.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
        self.photo_lookups_running.fetch_sub(1, Ordering::SeqCst);
        Ok(self.photos.get(photo_id).cloned().unwrap_or_default())
    }

    async fn search_site(
        &self,
        query: &str,
        page: usize,
        order_by: Option<SearchOrder>,
    ) -> Result<SearchPage, ClientError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.search_log.lock().unwrap().push(SearchCall {
            query: query.to_string(),
            page,
            order: order_by,
        });
        let total = self.search_pages.first().map_or(0, |first| first.total);
        Ok(self
            .search_pages
            .get(page.saturating_sub(1))
            .cloned()
            .unwrap_or(SearchPage {
                entries: Vec::new(),
                total,
                page_size: 0,
            }))
    }

    async fn month_ranking(&self, _page: usize) -> Result<SearchPage, ClientError> {
        self.ranking_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.ranking.clone())
    }

    async fn download_by_image_detail(
        &self,
        image: &Image,
        dest_path: &Path,
    ) -> Result<(), ClientError> {
        self.image_downloads.fetch_add(1, Ordering::SeqCst);
        self.hold().await;
        if self.fail_image_downloads {
            // Leave a partial file behind, like an interrupted stream would.
            tokio::fs::write(dest_path, b"partial").await.unwrap();
            return Err(ClientError::http_status(image.url.clone(), 503));
        }
        tokio::fs::write(dest_path, image.url.as_bytes())
            .await
            .map_err(|e| ClientError::io(dest_path, e))
    }

    async fn download_album(
        &self,
        album_id: &AlbumId,
        options: &DownloadOptions,
    ) -> Result<(), ClientError> {
        self.album_downloads.fetch_add(1, Ordering::SeqCst);
        let running = self.album_downloads_running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_album_downloads.fetch_max(running, Ordering::SeqCst);
        self.hold().await;
        self.album_downloads_running.fetch_sub(1, Ordering::SeqCst);

        if self.fail_album_downloads {
            return Err(ClientError::remote(format!("bulk download of {album_id} failed")));
        }
        if self.skip_document_output {
            return Ok(());
        }
        tokio::fs::write(
            &options.output_path,
            format!("%PDF-1.7 album {album_id}").as_bytes(),
        )
        .await
        .map_err(|e| ClientError::io(&options.output_path, e))
    }
}

/// Builds `count` entries with ids `start`, `start + 1`, ...
pub fn entries(start: usize, count: usize) -> Vec<SearchEntry> {
    (start..start + count)
        .map(|n| SearchEntry::new(AlbumId::parse(&n.to_string()).unwrap(), format!("title {n}")))
        .collect()
}

/// Splits `total` sequential entries (ids from 1) into pages of `page_size`.
pub fn paged_fixture(total: usize, page_size: usize) -> Vec<SearchPage> {
    let mut pages = Vec::new();
    let mut start = 1;
    while start <= total {
        let count = page_size.min(total - start + 1);
        pages.push(SearchPage {
            entries: entries(start, count),
            total,
            page_size,
        });
        start += count;
    }
    pages
}

/// Concatenated album ids of all fixture pages, in order.
pub fn flatten_ids(pages: &[SearchPage]) -> Vec<String> {
    pages
        .iter()
        .flat_map(|page| page.entries.iter().map(|entry| entry.album_id.to_string()))
        .collect()
}
