//! Error taxonomy for album resolution.
//!
//! Every failure a caller-facing operation can produce is one of these
//! variants. None of them are fatal to the process; callers turn them into
//! a message at the request boundary. Messages follow the project's
//! What/Why/Fix layout with a trailing `Suggestion:` line.

use thiserror::Error;

use crate::client::ClientError;
use crate::inflight::OperationKind;

/// Errors returned by the cover resolver, album downloader, selector and service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The album id does not resolve on the remote service.
    #[error("album {album_id} not found\n  Suggestion: Check the album id and try again")]
    NotFound {
        /// The id that did not resolve.
        album_id: String,
    },

    /// The album exists but has no usable photo/image content.
    #[error("album {album_id} has no usable content: {reason}\n  Suggestion: The album may be empty or still being processed remotely")]
    EmptyContent {
        /// The album that was empty.
        album_id: String,
        /// What was missing.
        reason: &'static str,
    },

    /// An equivalent operation is already running for this key.
    #[error("{operation} already in progress for album {album_id}\n  Suggestion: Wait for the running request to finish, then ask again")]
    Busy {
        /// The album being worked on.
        album_id: String,
        /// Which operation is running.
        operation: OperationKind,
    },

    /// The adapter failed while fetching or transferring data.
    #[error("download failed for {target}: {source}\n  Suggestion: Check connectivity to the remote service and retry")]
    DownloadFailed {
        /// What was being fetched (an album id, a search page, ...).
        target: String,
        /// The underlying adapter failure.
        #[source]
        source: ClientError,
    },

    /// Fewer results exist than the requested ordinal.
    #[error("{}", insufficient_results_message(.found, .total))]
    InsufficientResults {
        /// How many entries were collected.
        found: usize,
        /// Total matches reported by the remote, when known.
        total: Option<usize>,
    },

    /// The ordinal is zero, negative or not an integer.
    #[error("invalid ordinal '{input}': must be an integer >= 1\n  Suggestion: Use 1 for the first result")]
    InvalidOrdinal {
        /// The rejected input.
        input: String,
    },

    /// A keyword or author query has nothing to search for.
    #[error("{kind} query is empty\n  Suggestion: Give at least one non-blank search word")]
    EmptyQuery {
        /// Which query kind was empty (`keyword` or `author`).
        kind: &'static str,
    },

    /// The album id cannot be used as a cache key.
    #[error("invalid album id '{input}'\n  Suggestion: Album ids must be non-empty and must not contain path separators")]
    InvalidAlbumId {
        /// The rejected input.
        input: String,
    },
}

impl ServiceError {
    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found(album_id: impl ToString) -> Self {
        Self::NotFound {
            album_id: album_id.to_string(),
        }
    }

    /// Creates an `EmptyContent` error.
    #[must_use]
    pub fn empty_content(album_id: impl ToString, reason: &'static str) -> Self {
        Self::EmptyContent {
            album_id: album_id.to_string(),
            reason,
        }
    }

    /// Creates a `Busy` error.
    #[must_use]
    pub fn busy(album_id: impl ToString, operation: OperationKind) -> Self {
        Self::Busy {
            album_id: album_id.to_string(),
            operation,
        }
    }

    /// Wraps an adapter failure.
    #[must_use]
    pub fn download_failed(target: impl Into<String>, source: ClientError) -> Self {
        Self::DownloadFailed {
            target: target.into(),
            source,
        }
    }

    /// Creates an `InsufficientResults` error.
    #[must_use]
    pub fn insufficient_results(found: usize, total: Option<usize>) -> Self {
        Self::InsufficientResults { found, total }
    }

    /// Creates an `InvalidOrdinal` error.
    #[must_use]
    pub fn invalid_ordinal(input: impl ToString) -> Self {
        Self::InvalidOrdinal {
            input: input.to_string(),
        }
    }

    /// Creates an `EmptyQuery` error.
    #[must_use]
    pub fn empty_query(kind: &'static str) -> Self {
        Self::EmptyQuery { kind }
    }

    /// Creates an `InvalidAlbumId` error.
    #[must_use]
    pub fn invalid_album_id(input: &str) -> Self {
        Self::InvalidAlbumId {
            input: input.to_string(),
        }
    }

    /// Returns true when re-issuing the same request later can succeed.
    ///
    /// Only `Busy` qualifies; nothing in the engine retries automatically.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn insufficient_results_message(found: &usize, total: &Option<usize>) -> String {
    match total {
        Some(total) => format!(
            "only {found} result(s) retrieved out of {total} reported\n  Suggestion: Pick an ordinal between 1 and {found}"
        ),
        None => format!(
            "only {found} result(s) found\n  Suggestion: Pick an ordinal between 1 and {found}, or refine the search"
        ),
    }
}
