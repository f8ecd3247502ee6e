//! PartyShow Cache - Local photo store
//!
//! A flat directory holding one file per displayable remote photo, keyed by
//! file name.
//!
//! ## Guarantees
//!
//! - If a name is listed, its bytes are complete. Writes go to a hidden
//!   `.partial` file in the same directory that is renamed into place only after the writer
//!   succeeded, and is removed on failure or cancellation.
//! - `save` and `delete` of the same name are serialized; distinct names
//!   proceed independently.
//!
//! ## Key Components
//!
//! - [`LocalCacheStore`] - The store itself
//! - [`CachedBlob`] - Handle to a cached file
//! - [`CacheError`] / [`SaveError`] - Error types for cache operations

pub mod store;

use std::path::PathBuf;

pub use store::{is_managed, BlobSink, CachedBlob, LocalCacheStore};

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache directory could not be created or opened
    #[error("Cache directory unavailable: {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file operation inside the cache failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of [`LocalCacheStore::save`]
///
/// Either the caller-supplied writer failed (`Writer`) or the cache itself
/// could not create, flush or commit the file (`Cache`). In both cases the
/// partial file is gone by the time this is returned.
#[derive(Debug, thiserror::Error)]
pub enum SaveError<E>
where
    E: std::error::Error + 'static,
{
    #[error("{0}")]
    Cache(#[from] CacheError),

    #[error("Writer failed: {0}")]
    Writer(#[source] E),
}
