//! PartyShow Sync - Folder synchronization and slideshow sequencing
//!
//! Provides:
//! - Full and cursor-based delta reconciliation of the local photo cache
//! - A supervised long-poll watch loop with fixed-delay recovery
//! - A single-owner playlist sequencer fed by an ordered event channel
//!
//! ## Modules
//!
//! - [`engine`] - `full_sync`, `poll_once`, `apply_delta`
//! - [`watcher`] - The watch loop driving the engine
//! - [`sequencer`] - Playlist owner task and its command handle
//!
//! ## Data flow
//!
//! ```text
//! WatchLoop ──► SyncEngine ──► mpsc<SyncEvent> ──► Sequencer ──► watch<SlideshowState>
//!                   │                                  │
//!                   └──────── LocalCacheStore ◄────────┘
//! ```

pub mod engine;
pub mod sequencer;
pub mod watcher;

use partyshow_cache::{CacheError, SaveError};
use partyshow_core::ports::RemoteError;
use serde::Serialize;
use thiserror::Error;

pub use engine::{PollOutcome, SyncEngine, SyncResult};
pub use sequencer::{Sequencer, SequencerError, SequencerHandle, SlideshowState};
pub use watcher::{SyncStatus, WatchLoop};

/// Errors that can occur during synchronization operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The remote store rejected the access credential
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Network, timeout, rate-limit or remote server failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The change cursor is stale; a full sync is required
    #[error("Change cursor was reset by the remote store")]
    CursorReset,

    /// The operation was called in a state that does not allow it
    #[error("Precondition failed: {0}")]
    PreconditionFailed(&'static str),

    /// The local cache could not be written
    #[error("Cache error: {0}")]
    Cache(String),

    /// Anything else, e.g. a malformed remote response
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of a [`SyncError`] for recovery decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Not retried; a new credential is needed
    Auth,
    /// Retried after a fixed delay
    Transport,
    /// Handled by a full sync; not shown as an error
    CursorInvalid,
    /// Programming or sequencing error
    Precondition,
    /// Local storage failure
    Cache,
    /// Anything else
    Other,
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Unauthorized(_) => ErrorKind::Auth,
            SyncError::Transport(_) => ErrorKind::Transport,
            SyncError::CursorReset => ErrorKind::CursorInvalid,
            SyncError::PreconditionFailed(_) => ErrorKind::Precondition,
            SyncError::Cache(_) => ErrorKind::Cache,
            SyncError::Other(_) => ErrorKind::Other,
        }
    }

    pub fn is_auth(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }

    /// Short message suitable for an on-screen status line
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Auth => "Dropbox sign-in expired; please authenticate again".to_string(),
            ErrorKind::Transport => "Cannot reach Dropbox; retrying".to_string(),
            ErrorKind::CursorInvalid => "Resynchronizing photos".to_string(),
            ErrorKind::Cache => format!("Cannot store photos locally: {self}"),
            ErrorKind::Precondition | ErrorKind::Other => format!("Sync failed: {self}"),
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::Unauthorized(msg) => SyncError::Unauthorized(msg),
            RemoteError::CursorReset => SyncError::CursorReset,
            RemoteError::Network(_)
            | RemoteError::ServerError(_)
            | RemoteError::TooManyRequests { .. } => SyncError::Transport(e.to_string()),
            RemoteError::Sink(msg) => SyncError::Cache(msg),
            RemoteError::NotFound(_) | RemoteError::InvalidResponse(_) => {
                SyncError::Other(e.to_string())
            }
        }
    }
}

impl From<CacheError> for SyncError {
    fn from(e: CacheError) -> Self {
        SyncError::Cache(e.to_string())
    }
}

impl From<SaveError<RemoteError>> for SyncError {
    fn from(e: SaveError<RemoteError>) -> Self {
        match e {
            SaveError::Cache(e) => e.into(),
            SaveError::Writer(e) => e.into(),
        }
    }
}
