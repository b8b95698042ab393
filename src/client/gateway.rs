//! reqwest-backed [`RemoteClient`] talking to a JSON gateway.
//!
//! The gateway fronts the remote content service and exposes one route per
//! adapter operation:
//!
//! | Operation | Route |
//! |---|---|
//! | album detail | `GET albums/{id}` (404 = absent) |
//! | photo detail | `GET photos/{id}?resolve={bool}` |
//! | site search | `GET search?q={query}&page={n}[&order=latest]` |
//! | monthly ranking | `GET ranking/month?page={n}` |
//! | image download | `GET {image.url}` |
//! | album document | `GET albums/{id}/document` |

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{
    Album, AlbumId, ClientError, DownloadOptions, Image, Photo, RemoteClient, SearchEntry,
    SearchOrder, SearchPage,
};

/// Default HTTP connect timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default HTTP read timeout (5 minutes, bulk documents can be large).
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 300;

/// JSON gateway client.
///
/// Created once and shared; the inner reqwest client pools connections.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: Url,
}

impl GatewayClient {
    /// Creates a client for `base_url` with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if `base_url` is not an absolute
    /// http(s) URL, or [`ClientError::Network`] if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeouts(
            base_url,
            DEFAULT_CONNECT_TIMEOUT_SECS,
            DEFAULT_READ_TIMEOUT_SECS,
        )
    }

    /// Creates a client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Same as [`GatewayClient::new`].
    #[instrument(level = "debug")]
    pub fn with_timeouts(
        base_url: &str,
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, ClientError> {
        let base_url = normalize_base_url(base_url)?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(default_user_agent())
            .build()
            .map_err(|e| ClientError::network(base_url.as_str(), e))?;
        debug!(base_url = %base_url, "gateway client ready");
        Ok(Self { client, base_url })
    }

    /// Returns the normalized gateway base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn route(&self, relative: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(relative)
            .map_err(|_| ClientError::invalid_url(format!("{}{relative}", self.base_url)))
    }

    fn listing_route(&self, relative: &str, pairs: &[(&str, String)]) -> Result<Url, ClientError> {
        let mut url = self.route(relative)?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in pairs {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn send(&self, url: &Url) -> Result<reqwest::Response, ClientError> {
        self.client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ClientError::network(url.as_str(), e))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ClientError> {
        let response = self.send(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::http_status(url.as_str(), status.as_u16()));
        }
        decode_body(url, response).await
    }

    async fn fetch_page(&self, url: &Url) -> Result<SearchPage, ClientError> {
        let raw: RawSearchPage = self.get_json(url).await?;
        Ok(raw.into_page(url))
    }

    #[instrument(level = "debug", skip(self, url, dest_path), fields(url = %url, dest = %dest_path.display()))]
    async fn download_to(&self, url: &Url, dest_path: &Path) -> Result<(), ClientError> {
        let response = self.send(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::http_status(url.as_str(), status.as_u16()));
        }

        let mut file = File::create(dest_path)
            .await
            .map_err(|e| ClientError::io(dest_path, e))?;
        let result = stream_to_file(&mut file, response, url.as_str(), dest_path).await;
        if result.is_err() {
            debug!(path = %dest_path.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(dest_path).await;
        }
        let bytes = result?;
        info!(path = %dest_path.display(), bytes, "download complete");
        Ok(())
    }
}

#[async_trait]
impl RemoteClient for GatewayClient {
    #[instrument(skip(self), fields(album_id = %album_id))]
    async fn get_album_detail(&self, album_id: &AlbumId) -> Result<Option<Album>, ClientError> {
        let url = self.route(&format!(
            "albums/{}",
            urlencoding::encode(album_id.as_str())
        ))?;
        let response = self.send(&url).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("album not found on gateway");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ClientError::http_status(url.as_str(), status.as_u16()));
        }
        let raw: RawAlbum = decode_body(&url, response).await?;
        raw.into_album(&url).map(Some)
    }

    #[instrument(skip(self))]
    async fn get_photo_detail(
        &self,
        photo_id: &str,
        force_resolve: bool,
    ) -> Result<Vec<Image>, ClientError> {
        let url = self.listing_route(
            &format!("photos/{}", urlencoding::encode(photo_id)),
            &[("resolve", force_resolve.to_string())],
        )?;
        let raw: Vec<RawImage> = self.get_json(&url).await?;
        Ok(raw
            .into_iter()
            .map(|image| Image {
                url: image.url,
                file_name: image.file_name,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn search_site(
        &self,
        query: &str,
        page: usize,
        order_by: Option<SearchOrder>,
    ) -> Result<SearchPage, ClientError> {
        let mut pairs = vec![("q", query.to_string()), ("page", page.to_string())];
        if let Some(order) = order_by {
            pairs.push(("order", order.as_str().to_string()));
        }
        let url = self.listing_route("search", &pairs)?;
        self.fetch_page(&url).await
    }

    #[instrument(skip(self))]
    async fn month_ranking(&self, page: usize) -> Result<SearchPage, ClientError> {
        let url = self.listing_route("ranking/month", &[("page", page.to_string())])?;
        self.fetch_page(&url).await
    }

    async fn download_by_image_detail(
        &self,
        image: &Image,
        dest_path: &Path,
    ) -> Result<(), ClientError> {
        let url = match Url::parse(&image.url) {
            Ok(url) => url,
            Err(_) => self.route(&image.url)?,
        };
        self.download_to(&url, dest_path).await
    }

    async fn download_album(
        &self,
        album_id: &AlbumId,
        options: &DownloadOptions,
    ) -> Result<(), ClientError> {
        let url = self.route(&format!(
            "albums/{}/document",
            urlencoding::encode(album_id.as_str())
        ))?;
        self.download_to(&url, &options.output_path).await
    }
}

fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("albumcache/{version}")
}

/// Parses the gateway base URL and guarantees a trailing slash so relative
/// routes join underneath it instead of replacing its last segment.
fn normalize_base_url(raw: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(raw.trim()).map_err(|_| ClientError::invalid_url(raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::invalid_url(raw));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn decode_body<T: DeserializeOwned>(
    url: &Url,
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let body = response
        .bytes()
        .await
        .map_err(|e| ClientError::network(url.as_str(), e))?;
    serde_json::from_slice(&body).map_err(|e| ClientError::decode(url.as_str(), e.to_string()))
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, ClientError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| ClientError::network(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| ClientError::io(file_path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| ClientError::io(file_path, e))?;

    Ok(bytes_written)
}

/// Ids arrive as JSON numbers or strings depending on the endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawAlbum {
    id: RawId,
    title: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    pub_date: Option<String>,
    #[serde(default)]
    photos: Vec<RawPhoto>,
}

impl RawAlbum {
    fn into_album(self, url: &Url) -> Result<Album, ClientError> {
        let id = AlbumId::parse(&self.id.into_string())
            .map_err(|e| ClientError::decode(url.as_str(), e.to_string()))?;
        Ok(Album {
            id,
            title: self.title,
            tags: self.tags,
            pub_date: self.pub_date.filter(|date| !date.trim().is_empty()),
            photos: self
                .photos
                .into_iter()
                .map(|photo| Photo::new(photo.id.into_string()))
                .collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawPhoto {
    id: RawId,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    url: String,
    #[serde(default)]
    file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSearchPage {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    page_size: Option<usize>,
    #[serde(default)]
    items: Vec<RawSearchItem>,
}

impl RawSearchPage {
    /// Entries whose id cannot be used as a cache key are skipped; the rest
    /// of the listing stays usable.
    fn into_page(self, url: &Url) -> SearchPage {
        let listed = self.items.len();
        let entries: Vec<SearchEntry> = self
            .items
            .into_iter()
            .filter_map(|item| {
                let raw_id = item.id.into_string();
                match AlbumId::parse(&raw_id) {
                    Ok(id) => Some(SearchEntry::new(id, item.title)),
                    Err(_) => {
                        warn!(url = %url, id = %raw_id, "skipping listing entry with unusable id");
                        None
                    }
                }
            })
            .collect();
        let page_size = self.page_size.unwrap_or(listed);
        SearchPage {
            entries,
            total: self.total,
            page_size,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSearchItem {
    id: RawId,
    #[serde(default)]
    title: String,
}
