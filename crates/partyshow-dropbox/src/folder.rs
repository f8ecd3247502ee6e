//! Folder listing and change log
//!
//! ## Flow
//!
//! 1. `list_folder(path)` returns every file plus a cursor
//! 2. `longpoll(cursor)` blocks until something changed behind the cursor
//! 3. `list_folder_continue(cursor)` returns the changes and a new cursor
//!
//! Both listing calls follow `has_more` internally, so callers always get
//! one logical page. Folder entries are dropped: the watched folder is flat.

use std::time::Duration;

use partyshow_core::{
    domain::{Cursor, FileName, RemotePath},
    ports::{FolderChange, FolderDelta, FolderListing, LongpollResult, RemoteEntry},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    client::{check_status, DropboxClient},
    DropboxError,
};

const LIST_FOLDER: &str = "/2/files/list_folder";
const LIST_FOLDER_CONTINUE: &str = "/2/files/list_folder/continue";
const LIST_FOLDER_LONGPOLL: &str = "/2/files/list_folder/longpoll";

/// Dropbox adds up to 90 seconds of random jitter to long-poll timeouts.
const LONGPOLL_JITTER: Duration = Duration::from_secs(90);

// ============================================================================
// Dropbox API wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ListFolderArg<'a> {
    path: &'a str,
    recursive: bool,
    include_deleted: bool,
}

#[derive(Debug, Serialize)]
struct CursorArg<'a> {
    cursor: &'a str,
}

#[derive(Debug, Serialize)]
struct LongpollArg<'a> {
    cursor: &'a str,
    timeout: u64,
}

/// One page of `list_folder` or `list_folder/continue`
#[derive(Debug, Deserialize)]
pub struct ListFolderResult {
    pub entries: Vec<Metadata>,
    pub cursor: String,
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
struct LongpollResponse {
    changes: bool,
    backoff: Option<u64>,
}

/// Entry metadata, tagged by `.tag`
#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum Metadata {
    File(FileMetadata),
    Folder(FolderMetadata),
    Deleted(DeletedMetadata),
}

#[derive(Debug, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub path_lower: Option<String>,
    pub rev: Option<String>,
    pub content_hash: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct FolderMetadata {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeletedMetadata {
    pub name: String,
    pub path_lower: Option<String>,
}

// ============================================================================
// MetadataParser
// ============================================================================

/// Converts Dropbox metadata into port-level changes
pub struct MetadataParser;

impl MetadataParser {
    /// Parse one entry; `None` for folders and unusable names
    pub fn parse_entry(entry: Metadata) -> Option<FolderChange> {
        match entry {
            Metadata::File(file) => {
                let name = Self::parse_name(file.name)?;
                Some(FolderChange::Added(RemoteEntry {
                    path: file
                        .path_lower
                        .unwrap_or_else(|| format!("/{}", name.as_str().to_lowercase())),
                    name,
                    revision: file.rev,
                    content_hash: file.content_hash,
                    size: file.size,
                }))
            }
            Metadata::Deleted(deleted) => {
                let name = Self::parse_name(deleted.name)?;
                Some(FolderChange::Deleted {
                    path: deleted.path_lower.unwrap_or_default(),
                    name,
                })
            }
            Metadata::Folder(folder) => {
                debug!(name = %folder.name, "Skipping nested folder");
                None
            }
        }
    }

    /// Parse a page into its changes, preserving order
    pub fn parse_page(entries: Vec<Metadata>) -> Vec<FolderChange> {
        entries.into_iter().filter_map(Self::parse_entry).collect()
    }

    fn parse_name(raw: String) -> Option<FileName> {
        match FileName::new(raw) {
            Ok(name) => Some(name),
            Err(e) => {
                warn!(error = %e, "Skipping entry with unusable name");
                None
            }
        }
    }

    fn parse_cursor(raw: String) -> Result<Cursor, DropboxError> {
        Cursor::new(raw).map_err(|e| DropboxError::InvalidResponse(e.to_string()))
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Lists every file directly inside `path`
#[instrument(skip(client), fields(path = %path))]
pub async fn list_folder(
    client: &DropboxClient,
    path: &RemotePath,
) -> Result<FolderListing, DropboxError> {
    let arg = ListFolderArg {
        path: path.as_str(),
        recursive: false,
        include_deleted: false,
    };
    let mut page: ListFolderResult = client.rpc(LIST_FOLDER, &arg).await?;
    let mut changes = MetadataParser::parse_page(std::mem::take(&mut page.entries));
    let mut pages = 1u32;

    while page.has_more {
        let cursor = std::mem::take(&mut page.cursor);
        page = client
            .rpc(LIST_FOLDER_CONTINUE, &CursorArg { cursor: &cursor })
            .await?;
        changes.extend(MetadataParser::parse_page(std::mem::take(&mut page.entries)));
        pages += 1;
    }

    let entries: Vec<RemoteEntry> = changes
        .into_iter()
        .filter_map(|change| match change {
            FolderChange::Added(entry) => Some(entry),
            FolderChange::Deleted { .. } => None,
        })
        .collect();

    info!(files = entries.len(), pages, "Listed remote folder");
    Ok(FolderListing {
        cursor: MetadataParser::parse_cursor(page.cursor)?,
        entries,
    })
}

/// Fetches all changes since `cursor`
///
/// A stale cursor surfaces as [`DropboxError::CursorReset`].
#[instrument(skip_all)]
pub async fn list_folder_continue(
    client: &DropboxClient,
    cursor: &Cursor,
) -> Result<FolderDelta, DropboxError> {
    let mut changes = Vec::new();
    let mut next = cursor.as_str().to_string();

    loop {
        let page: ListFolderResult = client
            .rpc(LIST_FOLDER_CONTINUE, &CursorArg { cursor: &next })
            .await?;
        changes.extend(MetadataParser::parse_page(page.entries));
        next = page.cursor;
        if !page.has_more {
            break;
        }
    }

    debug!(changes = changes.len(), "Fetched folder changes");
    Ok(FolderDelta {
        cursor: MetadataParser::parse_cursor(next)?,
        changes,
    })
}

/// Waits up to `timeout` for changes behind `cursor`
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs()))]
pub async fn longpoll(
    client: &DropboxClient,
    cursor: &Cursor,
    timeout: Duration,
) -> Result<LongpollResult, DropboxError> {
    let response = client
        .notify_request(LIST_FOLDER_LONGPOLL)
        .timeout(timeout + LONGPOLL_JITTER)
        .json(&LongpollArg {
            cursor: cursor.as_str(),
            timeout: timeout.as_secs(),
        })
        .send()
        .await?;
    let body: LongpollResponse = check_status(response).await?.json().await?;

    debug!(changes = body.changes, backoff = ?body.backoff, "Long-poll returned");
    Ok(LongpollResult {
        changed: body.changes,
        backoff: body.backoff.map(Duration::from_secs),
    })
}
