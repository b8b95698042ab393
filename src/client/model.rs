//! Data returned by the remote content service.
//!
//! These are per-request snapshots. Nothing here is cached in memory; only
//! the derived artifacts written by the store outlive a request.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ServiceError;

/// Opaque album identifier, validated so it can be used as a path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlbumId(String);

impl AlbumId {
    /// Validates and wraps a raw album id.
    ///
    /// Surrounding whitespace is trimmed. Ids that are empty, or that could
    /// address anything outside their own cache slot, are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidAlbumId`] for empty ids, ids containing
    /// a path separator, and the special names `.` and `..`.
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed == "."
            || trimmed == ".."
            || trimmed.contains(['/', '\\'])
            || trimmed.chars().any(char::is_control)
        {
            return Err(ServiceError::invalid_album_id(raw));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlbumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AlbumId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for AlbumId {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A remotely hosted multi-page document collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    /// Album identifier.
    pub id: AlbumId,
    /// Display title.
    pub title: String,
    /// Tags in remote order.
    pub tags: Vec<String>,
    /// Publication date as reported by the remote, when known.
    pub pub_date: Option<String>,
    /// Sub-collections in remote order; the first one holds the cover.
    pub photos: Vec<Photo>,
}

impl Album {
    /// Returns the photo holding the album cover.
    #[must_use]
    pub fn first_photo(&self) -> Option<&Photo> {
        self.photos.first()
    }
}

/// Reference to a sub-collection of images within an album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    /// Photo identifier.
    pub id: String,
}

impl Photo {
    /// Creates a photo reference.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A single page belonging to a photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Where the image bytes can be fetched.
    pub url: String,
    /// Remote file name, if the service reports one.
    pub file_name: Option<String>,
}

impl Image {
    /// Creates an image entry with no file name.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: None,
        }
    }
}

/// One `(album id, title)` pair from a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEntry {
    /// Album identifier.
    pub album_id: AlbumId,
    /// Album title as shown in the listing.
    pub title: String,
}

impl SearchEntry {
    /// Creates a listing entry.
    #[must_use]
    pub fn new(album_id: AlbumId, title: impl Into<String>) -> Self {
        Self {
            album_id,
            title: title.into(),
        }
    }
}

/// One page of a keyword search, author search or ranking listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPage {
    /// Entries on this page, in remote order.
    pub entries: Vec<SearchEntry>,
    /// Total number of matches across all pages.
    pub total: usize,
    /// Number of entries the remote puts on a full page.
    pub page_size: usize,
}

impl SearchPage {
    /// Builds a page whose page size is its own entry count.
    #[must_use]
    pub fn from_entries(entries: Vec<SearchEntry>, total: usize) -> Self {
        let page_size = entries.len();
        Self {
            entries,
            total,
            page_size,
        }
    }

    /// Returns true when the page carries no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result ordering requested from the remote listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrder {
    /// Most recently published first.
    Latest,
}

impl SearchOrder {
    /// Returns the wire label for this ordering.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
        }
    }
}

/// Options for a bulk album download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Album-qualified location the compiled document must be written to.
    pub output_path: PathBuf,
}

impl DownloadOptions {
    /// Creates options targeting `output_path`.
    #[must_use]
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }
}
