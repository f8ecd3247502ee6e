//! PartyShow Dropbox - Dropbox API v2 client
//!
//! Provides async client for:
//! - Listing a flat folder with cursor capture
//! - Long-polling and continuing the folder change log
//! - Streaming file downloads
//!
//! ## Modules
//!
//! - [`client`] - HTTP client, status mapping and downloads
//! - [`folder`] - `list_folder`, `list_folder/continue` and `list_folder/longpoll`
//! - [`provider`] - [`IRemoteStore`](partyshow_core::ports::IRemoteStore) adapter

pub mod client;
pub mod folder;
pub mod provider;

use std::time::Duration;

use partyshow_core::ports::RemoteError;
use thiserror::Error;

pub use client::DropboxClient;
pub use provider::DropboxRemoteStore;

/// Errors that can occur when communicating with the Dropbox API
#[derive(Debug, Error)]
pub enum DropboxError {
    /// Access token is missing, invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The folder cursor is too old; list the folder again
    #[error("Cursor reset required")]
    CursorReset,

    /// The requested path does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Endpoint-specific error (HTTP 409) not covered above
    #[error("API error: {0}")]
    ApiError(String),

    /// Rate limit exceeded; retry after the specified duration
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration to wait before retrying
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Writing downloaded bytes failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request argument could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<DropboxError> for RemoteError {
    fn from(e: DropboxError) -> Self {
        match e {
            DropboxError::Unauthorized(msg) => RemoteError::Unauthorized(msg),
            DropboxError::CursorReset => RemoteError::CursorReset,
            DropboxError::NotFound(msg) => RemoteError::NotFound(msg),
            DropboxError::TooManyRequests { retry_after } => {
                RemoteError::TooManyRequests { retry_after }
            }
            DropboxError::ServerError(msg) => RemoteError::ServerError(msg),
            DropboxError::NetworkError(e) if e.is_decode() => {
                RemoteError::InvalidResponse(e.to_string())
            }
            DropboxError::NetworkError(e) => RemoteError::Network(e.to_string()),
            DropboxError::Io(e) => RemoteError::Sink(e.to_string()),
            DropboxError::ApiError(msg) => RemoteError::InvalidResponse(format!("API error: {msg}")),
            DropboxError::Serialization(e) => RemoteError::InvalidResponse(e.to_string()),
            DropboxError::InvalidResponse(msg) => RemoteError::InvalidResponse(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            RemoteError::from(DropboxError::Unauthorized("expired_access_token/".into())),
            RemoteError::Unauthorized("expired_access_token/".into())
        );
        assert_eq!(
            RemoteError::from(DropboxError::CursorReset),
            RemoteError::CursorReset
        );
        assert!(RemoteError::from(DropboxError::ServerError("503".into())).is_transient());
        assert!(!RemoteError::from(DropboxError::ApiError("path/malformed_path/".into()))
            .is_transient());

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert!(matches!(
            RemoteError::from(DropboxError::Io(io)),
            RemoteError::Sink(_)
        ));
    }
}
