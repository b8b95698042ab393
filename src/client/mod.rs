//! Remote client adapter for the album content service.
//!
//! The engine never talks to the remote service directly. Everything it
//! needs goes through the [`RemoteClient`] trait, so tests can swap in a
//! scripted fake and deployments can pick a transport.
//!
//! # Architecture
//!
//! - [`RemoteClient`] - Async trait covering lookup, listing and transfer
//! - [`GatewayClient`] - reqwest implementation talking to a JSON gateway
//! - [`ClientError`] - Transport, decode and filesystem failures
//!
//! # Example
//!
//! ```no_run
//! use albumcache_core::client::{GatewayClient, RemoteClient};
//! use albumcache_core::AlbumId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GatewayClient::new("http://127.0.0.1:8080/")?;
//! let album = client.get_album_detail(&AlbumId::parse("350234")?).await?;
//! if let Some(album) = album {
//!     println!("{}: {} photo(s)", album.title, album.photos.len());
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod gateway;
mod model;

pub use error::ClientError;
pub use gateway::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS, GatewayClient};
pub use model::{
    Album, AlbumId, DownloadOptions, Image, Photo, SearchEntry, SearchOrder, SearchPage,
};

use std::path::Path;

use async_trait::async_trait;

/// Capability the engine consumes from the remote content service.
///
/// Implementations own their own timeouts; a timeout surfaces as an
/// ordinary [`ClientError`].
///
/// # Object Safety
///
/// This trait uses `async_trait` so the engine can hold an
/// `Arc<dyn RemoteClient>` and hand it to worker tasks.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Fetches album metadata. `Ok(None)` means the id does not exist remotely.
    async fn get_album_detail(&self, album_id: &AlbumId) -> Result<Option<Album>, ClientError>;

    /// Lists the images of one photo.
    ///
    /// `force_resolve` asks for full-resolution image locations rather than
    /// a cheap count-only listing.
    async fn get_photo_detail(
        &self,
        photo_id: &str,
        force_resolve: bool,
    ) -> Result<Vec<Image>, ClientError>;

    /// Fetches one page (1-based) of a site search.
    async fn search_site(
        &self,
        query: &str,
        page: usize,
        order_by: Option<SearchOrder>,
    ) -> Result<SearchPage, ClientError>;

    /// Fetches one page (1-based) of the current monthly ranking.
    async fn month_ranking(&self, page: usize) -> Result<SearchPage, ClientError>;

    /// Downloads a single image to `dest_path`.
    async fn download_by_image_detail(
        &self,
        image: &Image,
        dest_path: &Path,
    ) -> Result<(), ClientError>;

    /// Downloads a whole album and writes the compiled document to
    /// `options.output_path`.
    async fn download_album(
        &self,
        album_id: &AlbumId,
        options: &DownloadOptions,
    ) -> Result<(), ClientError>;
}
