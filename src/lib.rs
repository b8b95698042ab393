//! Album Cache Core Library
//!
//! This library resolves identifiers of remotely hosted albums into locally
//! cached artifacts (a cover image and a compiled document). It keeps a
//! shared remote service from seeing redundant concurrent fetches, and it
//! turns paginated search and ranking listings into ordinal-addressable
//! selections.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`client`] - Remote client trait, data model and HTTP gateway adapter
//! - [`store`] - Deterministic on-disk layout of cached artifacts
//! - [`inflight`] - At-most-one-operation-per-key registry
//! - [`cover`] - Cache-or-fetch for album covers
//! - [`workers`] - Bounded worker pool for bulk downloads
//! - [`document`] - Cache-or-fetch for compiled album documents
//! - [`selector`] - Ordinal selection over paginated listings
//! - [`service`] - Caller-facing operations
//! - [`error`] - Error taxonomy

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod cover;
pub mod document;
pub mod error;
pub mod inflight;
pub mod selector;
pub mod service;
pub mod store;
pub mod workers;

// Re-export commonly used types
pub use client::{
    Album, AlbumId, ClientError, DownloadOptions, GatewayClient, Image, Photo, RemoteClient,
    SearchEntry, SearchOrder, SearchPage,
};
pub use cover::CoverResolver;
pub use document::AlbumDownloader;
pub use error::ServiceError;
pub use inflight::{
    InFlightGuard, InFlightKey, InFlightRegistry, OperationKind, OwnedInFlightGuard,
};
pub use selector::{
    DEFAULT_KEYWORD_MAX_PAGES, Ordinal, PaginatedSelector, SelectQuery, Selection, parse_ordinal,
    pick_random,
};
pub use service::{AlbumService, AlbumSummary, PAGE_COUNT_LOOKUPS, ServiceOptions};
pub use store::{ArtifactKind, ArtifactStore};
pub use workers::{DEFAULT_WORKERS, WorkerError, WorkerPool};
