//! Dropbox API v2 client
//!
//! Provides a typed HTTP client for the three Dropbox API hosts:
//! - `api` for RPC endpoints (JSON in, JSON out)
//! - `content` for downloads (argument in the `Dropbox-API-Arg` header)
//! - `notify` for long-polling (no authentication)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use partyshow_dropbox::{client::DropboxClient, folder};
//! use partyshow_core::domain::RemotePath;
//!
//! # async fn example() -> Result<(), partyshow_dropbox::DropboxError> {
//! let client = DropboxClient::new("access-token-here");
//! let listing = folder::list_folder(&client, &"/PartyPhotos".parse().unwrap()).await?;
//! println!("{} photos", listing.entries.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{header::HeaderMap, Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::DropboxError;

const API_URL: &str = "https://api.dropboxapi.com";
const CONTENT_URL: &str = "https://content.dropboxapi.com";
const NOTIFY_URL: &str = "https://notify.dropboxapi.com";

/// Default retry-after duration when header is missing (30 seconds)
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Timeout for RPC calls
const RPC_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for a single download
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

// ============================================================================
// Dropbox API wire types
// ============================================================================

/// Error body returned with 4xx statuses
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error_summary: Option<String>,
}

/// Argument of `/2/files/download`
#[derive(Debug, Serialize)]
struct DownloadArg<'a> {
    path: &'a str,
}

// ============================================================================
// DropboxClient
// ============================================================================

/// HTTP client for Dropbox API v2 calls
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct DropboxClient {
    client: Client,
    api_url: String,
    content_url: String,
    notify_url: String,
    access_token: String,
}

impl DropboxClient {
    /// Creates a new DropboxClient with the given access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: API_URL.to_string(),
            content_url: CONTENT_URL.to_string(),
            notify_url: NOTIFY_URL.to_string(),
            access_token: access_token.into(),
        }
    }

    /// Creates a client that sends every request to `base_url` (useful for testing)
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::new(),
            api_url: base_url.clone(),
            content_url: base_url.clone(),
            notify_url: base_url,
            access_token: access_token.into(),
        }
    }

    /// Updates the access token (e.g., after re-authentication)
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
        debug!("Updated DropboxClient access token");
    }

    /// Returns a reference to the current access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Calls an RPC endpoint on the API host
    ///
    /// # Arguments
    /// * `endpoint` - Path such as `/2/files/list_folder`
    /// * `body` - JSON request argument
    pub async fn rpc<B, T>(&self, endpoint: &str, body: &B) -> Result<T, DropboxError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.api_url, endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .timeout(RPC_TIMEOUT)
            .json(body)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Builds an unauthenticated request to the notify host
    ///
    /// Long-poll endpoints reject an `Authorization` header.
    pub(crate) fn notify_request(&self, endpoint: &str) -> RequestBuilder {
        let url = format!("{}{}", self.notify_url, endpoint);
        self.client.post(url)
    }

    /// Streams the file at `path` into `sink`
    ///
    /// `path` may be a lower-cased path or a `rev:` reference.
    ///
    /// # Returns
    /// Number of bytes written
    pub async fn download_to(
        &self,
        path: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, DropboxError> {
        let arg = escape_header_json(&serde_json::to_string(&DownloadArg { path })?);
        let url = format!("{}/2/files/download", self.content_url);
        debug!(path, "Downloading file");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("Dropbox-API-Arg", arg)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await?;
        let response = check_status(response).await?;

        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        debug!(path, bytes = written, "Download complete");
        Ok(written)
    }
}

// ============================================================================
// Status mapping
// ============================================================================

/// Maps a non-success response to a [`DropboxError`]
///
/// - 401 → `Unauthorized`
/// - 409 with a `reset` summary → `CursorReset`
/// - 409 with a `not_found` summary → `NotFound`
/// - other 409 → `ApiError`
/// - 429 → `TooManyRequests` (honouring `Retry-After`)
/// - 5xx → `ServerError`
pub async fn check_status(response: Response) -> Result<Response, DropboxError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = retry_after_from(response.headers());
    let body = response.text().await.unwrap_or_default();
    let summary = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.error_summary)
        .unwrap_or_else(|| body.clone());

    let err = match status {
        StatusCode::UNAUTHORIZED => DropboxError::Unauthorized(summary),
        StatusCode::CONFLICT if summary.starts_with("reset") => DropboxError::CursorReset,
        StatusCode::CONFLICT if summary.contains("not_found") => DropboxError::NotFound(summary),
        StatusCode::CONFLICT => DropboxError::ApiError(summary),
        StatusCode::TOO_MANY_REQUESTS => DropboxError::TooManyRequests { retry_after },
        s if s.is_server_error() => DropboxError::ServerError(format!("HTTP {s}: {summary}")),
        s => DropboxError::InvalidResponse(format!("HTTP {s}: {summary}")),
    };
    debug!(status = %status, error = %err, "Dropbox request failed");
    Err(err)
}

fn retry_after_from(headers: &HeaderMap) -> Duration {
    headers
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

/// Parses a Retry-After header value (integer seconds or HTTP-date)
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target > now {
            if let Some(secs) = (target - now)
                .num_seconds()
                .try_into()
                .ok()
                .filter(|&s: &u64| s <= 3600)
            {
                return Duration::from_secs(secs);
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}

/// Escapes every non-ASCII character (and DEL) as `\uXXXX`
///
/// HTTP header values must be ASCII, so JSON placed in `Dropbox-API-Arg`
/// has to escape names such as `写真.jpg`. Characters outside the BMP
/// become UTF-16 surrogate pairs.
pub fn escape_header_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() && c != '\u{7f}' {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}
