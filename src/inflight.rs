//! In-flight registry: at most one running operation per album and kind.
//!
//! The registry is not a queue. A second request for a key that is already
//! held is turned away immediately, and the caller decides whether to ask
//! again later.
//!
//! # Example
//!
//! ```
//! use albumcache_core::inflight::{InFlightKey, InFlightRegistry, OperationKind};
//! use albumcache_core::AlbumId;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = InFlightRegistry::new();
//! let key = InFlightKey::new(AlbumId::parse("5")?, OperationKind::FullDownload);
//!
//! let guard = registry.acquire(key.clone()).expect("first acquire wins");
//! assert!(registry.acquire(key.clone()).is_none());
//!
//! drop(guard);
//! assert!(!registry.is_held(&key));
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use dashmap::DashSet;
use tracing::{debug, trace};

use crate::client::AlbumId;

/// Which guarded operation an in-flight key belongs to.
///
/// The two kinds are disjoint namespaces: a cover fetch never blocks a full
/// download of the same album, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Fetching the representative cover image.
    CoverFetch,
    /// Producing the compiled document for the whole album.
    FullDownload,
}

impl OperationKind {
    /// Returns a short human-readable label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CoverFetch => "cover fetch",
            Self::FullDownload => "full download",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(album id, operation kind)` pair used to deduplicate concurrent work.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InFlightKey {
    /// The album being worked on.
    pub album_id: AlbumId,
    /// The operation running for it.
    pub operation: OperationKind,
}

impl InFlightKey {
    /// Creates a key.
    #[must_use]
    pub fn new(album_id: AlbumId, operation: OperationKind) -> Self {
        Self {
            album_id,
            operation,
        }
    }
}

/// Concurrent set of keys whose operation is currently running.
///
/// Owned by the engine instance (usually behind an `Arc`) and injected into
/// the cover resolver and album downloader, so tests can pre-seed it.
///
/// # Thread Safety
///
/// Acquisition is a single atomic insert-if-absent on a [`DashSet`]; there is
/// no window between checking and marking a key.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    held: DashSet<InFlightKey>,
}

impl InFlightRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` as held. Returns false without blocking if it already was.
    pub fn try_acquire(&self, key: InFlightKey) -> bool {
        let acquired = self.held.insert(key);
        trace!(acquired, "in-flight try_acquire");
        acquired
    }

    /// Clears the mark for `key`, whether or not it was held.
    pub fn release(&self, key: &InFlightKey) {
        if self.held.remove(key).is_some() {
            trace!(album_id = %key.album_id, operation = %key.operation, "in-flight key released");
        }
    }

    /// Scoped acquisition: the returned guard releases `key` when dropped.
    ///
    /// Dropping happens on every exit path of the guarded operation,
    /// including early returns, panics and a dropped future.
    #[must_use]
    pub fn acquire(&self, key: InFlightKey) -> Option<InFlightGuard<'_>> {
        if self.try_acquire(key.clone()) {
            debug!(album_id = %key.album_id, operation = %key.operation, "in-flight key acquired");
            Some(InFlightGuard {
                registry: self,
                key,
            })
        } else {
            None
        }
    }

    /// Like [`Self::acquire`], but the guard owns a handle on the registry
    /// and can be moved into a spawned task.
    ///
    /// The key then stays held until that task finishes, even if the request
    /// that started it is dropped.
    #[must_use]
    pub fn acquire_owned(self: &Arc<Self>, key: InFlightKey) -> Option<OwnedInFlightGuard> {
        if self.try_acquire(key.clone()) {
            debug!(album_id = %key.album_id, operation = %key.operation, "in-flight key acquired (owned)");
            Some(OwnedInFlightGuard {
                registry: Arc::clone(self),
                key,
            })
        } else {
            None
        }
    }

    /// Returns true if `key` is currently held.
    #[must_use]
    pub fn is_held(&self, key: &InFlightKey) -> bool {
        self.held.contains(key)
    }

    /// Returns the number of held keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.held.len()
    }

    /// Returns true if nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

/// Releases its key on drop.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    registry: &'a InFlightRegistry,
    key: InFlightKey,
}

impl InFlightGuard<'_> {
    /// Returns the key this guard holds.
    #[must_use]
    pub fn key(&self) -> &InFlightKey {
        &self.key
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}

/// [`InFlightGuard`] that keeps the registry alive; `Send + 'static`.
#[derive(Debug)]
pub struct OwnedInFlightGuard {
    registry: Arc<InFlightRegistry>,
    key: InFlightKey,
}

impl OwnedInFlightGuard {
    /// Returns the key this guard holds.
    #[must_use]
    pub fn key(&self) -> &InFlightKey {
        &self.key
    }
}

impl Drop for OwnedInFlightGuard {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}
