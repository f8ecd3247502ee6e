//! Remote store port (driven/secondary port)
//!
//! This module defines the interface the sync engine uses to read a single
//! flat remote folder: a full listing, a cursor-based change log with a
//! long-poll notification, and streaming download.
//!
//! ## Design Notes
//!
//! - Unlike most adapter errors, remote failures are classified here
//!   ([`RemoteError`]) because the engine's recovery depends on the kind:
//!   auth failures stop the watch loop, cursor resets force a full listing,
//!   and everything else is retried.
//! - Uses `#[async_trait]` for async trait methods.
//! - The DTOs are port-level; nested folders are filtered out by adapters.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWrite;

use crate::domain::newtypes::{Cursor, FileName, RemotePath};

// ============================================================================
// DTOs
// ============================================================================

/// A single remote file at a point in time
///
/// Superseded by a new entry with the same name when the file is edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// File name, unique within the folder
    pub name: FileName,
    /// Provider path used for download (lower-cased on Dropbox)
    pub path: String,
    /// Provider revision of this version of the file
    pub revision: Option<String>,
    /// Provider content hash, if reported
    pub content_hash: Option<String>,
    /// Size in bytes, if reported
    pub size: Option<u64>,
}

/// Full listing of the watched folder
#[derive(Debug, Clone)]
pub struct FolderListing {
    /// Cursor positioned right after this listing
    pub cursor: Cursor,
    /// Every file directly in the folder
    pub entries: Vec<RemoteEntry>,
}

/// A single change from the change log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderChange {
    /// A file appeared or was edited
    Added(RemoteEntry),
    /// A file was removed
    Deleted { name: FileName, path: String },
}

/// One batch of changes since a cursor
#[derive(Debug, Clone)]
pub struct FolderDelta {
    /// Cursor positioned after this batch
    pub cursor: Cursor,
    /// Changes in the order the remote reported them
    pub changes: Vec<FolderChange>,
}

/// Outcome of a long-poll request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongpollResult {
    /// Whether changes are pending behind the cursor
    pub changed: bool,
    /// Delay the remote asks for before the next long-poll
    pub backoff: Option<Duration>,
}

// ============================================================================
// RemoteError
// ============================================================================

/// Classified failure of a remote store call
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Access credential missing, invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The cursor is too old and the folder must be listed again
    #[error("Cursor reset required")]
    CursorReset,

    /// The requested path no longer exists
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the remote
    #[error("Too many requests (retry after {retry_after:?})")]
    TooManyRequests { retry_after: Duration },

    /// Connection failure or timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Remote-side failure (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Writing downloaded bytes to the local sink failed
    #[error("Write to local sink failed: {0}")]
    Sink(String),

    /// Unexpected response shape or status
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Whether retrying the same call later may succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteError::Network(_)
                | RemoteError::ServerError(_)
                | RemoteError::TooManyRequests { .. }
        )
    }
}

impl From<std::io::Error> for RemoteError {
    fn from(e: std::io::Error) -> Self {
        RemoteError::Sink(e.to_string())
    }
}

// ============================================================================
// IRemoteStore trait
// ============================================================================

/// Port trait for the remote content store
///
/// ## Implementation Notes
///
/// - `list_folder` and `list_folder_continue` follow pagination internally
///   and return one logical result.
/// - Entries for nested folders are dropped; only files are reported.
/// - `list_folder_continue` must map a stale cursor to
///   [`RemoteError::CursorReset`].
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Lists every file directly inside `path`
    ///
    /// # Arguments
    /// * `path` - The watched folder
    ///
    /// # Returns
    /// The files plus a cursor positioned after the listing
    async fn list_folder(&self, path: &RemotePath) -> Result<FolderListing, RemoteError>;

    /// Blocks until changes are pending behind `cursor` or `timeout` elapses
    ///
    /// # Arguments
    /// * `cursor` - Cursor from a listing or a previous batch
    /// * `timeout` - Server-side wait bound
    async fn list_folder_longpoll(
        &self,
        cursor: &Cursor,
        timeout: Duration,
    ) -> Result<LongpollResult, RemoteError>;

    /// Fetches the changes since `cursor`
    ///
    /// # Returns
    /// The batch of changes and the cursor positioned after it
    async fn list_folder_continue(&self, cursor: &Cursor) -> Result<FolderDelta, RemoteError>;

    /// Streams the content of `entry` into `sink`
    ///
    /// # Returns
    /// Number of bytes written
    async fn download(
        &self,
        entry: &RemoteEntry,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, RemoteError>;
}
