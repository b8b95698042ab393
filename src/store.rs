//! Filesystem artifact store.
//!
//! Maps `(album id, artifact kind)` to a fixed location under a base
//! directory. File existence is the whole cache state: no index, no
//! checksums, no expiry.
//!
//! ```text
//! <base>/picture/<album_id>/00001.jpg     cover
//! <base>/pdf/<album_id>.pdf               compiled document
//! ```
//!
//! Adapters never write canonical paths directly. They write an
//! album-qualified staging path, and [`ArtifactStore::promote`] renames the
//! finished file into place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::client::AlbumId;

const COVER_DIR: &str = "picture";
const COVER_FILE_NAME: &str = "00001.jpg";
const DOCUMENT_DIR: &str = "pdf";
const DOCUMENT_STAGING_DIR: &str = ".incoming";
const STAGING_SUFFIX: &str = ".part";

/// Kind of derived artifact kept for an album.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// First image of the first photo.
    Cover,
    /// Compiled multi-page document.
    Document,
}

impl ArtifactKind {
    /// Returns a short label for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Document => "document",
        }
    }
}

/// Deterministic layout of cached artifacts under one base directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    base_dir: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at `base_dir`. No I/O happens here.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Canonical location for an artifact. Pure.
    #[must_use]
    pub fn path_for(&self, album_id: &AlbumId, kind: ArtifactKind) -> PathBuf {
        match kind {
            ArtifactKind::Cover => self
                .base_dir
                .join(COVER_DIR)
                .join(album_id.as_str())
                .join(COVER_FILE_NAME),
            ArtifactKind::Document => self
                .base_dir
                .join(DOCUMENT_DIR)
                .join(format!("{album_id}.pdf")),
        }
    }

    /// Album-qualified location an adapter writes to before promotion. Pure.
    ///
    /// Two albums never share a staging path, so concurrent downloads of
    /// different albums cannot pick up each other's output.
    #[must_use]
    pub fn staging_path_for(&self, album_id: &AlbumId, kind: ArtifactKind) -> PathBuf {
        match kind {
            ArtifactKind::Cover => self
                .base_dir
                .join(COVER_DIR)
                .join(album_id.as_str())
                .join(format!("{COVER_FILE_NAME}{STAGING_SUFFIX}")),
            ArtifactKind::Document => self
                .base_dir
                .join(DOCUMENT_DIR)
                .join(DOCUMENT_STAGING_DIR)
                .join(format!("{album_id}.pdf")),
        }
    }

    /// Cache-hit test.
    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    /// Creates the parent directories of `path`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the directories cannot be created.
    pub async fn prepare_parent(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Moves a finished artifact into its canonical location, replacing
    /// whatever was there.
    ///
    /// Staging and canonical paths share a base directory, so this is a
    /// single rename on one filesystem.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the destination directory cannot
    /// be created or the rename fails.
    #[instrument(level = "debug", skip(self, tmp_path, final_path), fields(tmp = %tmp_path.display(), dest = %final_path.display()))]
    pub async fn promote(&self, tmp_path: &Path, final_path: &Path) -> std::io::Result<()> {
        self.prepare_parent(final_path).await?;
        tokio::fs::rename(tmp_path, final_path).await?;
        debug!("artifact promoted");
        Ok(())
    }

    /// Removes a staging file, ignoring one that does not exist.
    pub async fn discard(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "discarded staging file"),
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => {
                debug!(path = %path.display(), error = %error, "could not discard staging file");
            }
        }
    }
}
