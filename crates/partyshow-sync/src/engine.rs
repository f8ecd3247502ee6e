//! Folder synchronization engine
//!
//! The [`SyncEngine`] keeps the local photo cache an exact mirror of the
//! displayable files in one remote folder and reports what changed as
//! [`SyncEvent`]s.
//!
//! ## Sync Flow
//!
//! 1. **Full sync**: list the folder, delete stale cached photos, download
//!    the missing ones, then store the listing cursor
//! 2. **Poll**: long-poll the cursor until the remote reports a change
//! 3. **Delta**: fetch the changes behind the cursor, apply them in order,
//!    then advance the cursor
//!
//! ## Cursor rules
//!
//! The cursor is only stored after every change it covers has been applied
//! to the cache. Any failure clears it, so the next cycle starts with a full
//! sync that repairs whatever was left half done.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::{Duration, Instant},
};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use partyshow_cache::{CachedBlob, LocalCacheStore, SaveError};
use partyshow_core::{
    config::Config,
    domain::{
        Cursor, DomainError, FileName, FilenameClassifier, RemotePath, SyncEvent, SyncProgress,
    },
    ports::{FolderChange, IRemoteStore, RemoteEntry, RemoteError},
};

use crate::SyncError;

// ============================================================================
// Results
// ============================================================================

/// Summary of a completed reconciliation
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    /// Events to forward to the sequencer, in order
    pub events: Vec<SyncEvent>,
    /// Number of photos downloaded into the cache
    pub files_downloaded: u32,
    /// Number of photos removed from the cache
    pub files_deleted: u32,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Outcome of one long-poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Changes are waiting behind the cursor
    Changed { backoff: Option<Duration> },
    /// The poll timed out without changes
    Unchanged { backoff: Option<Duration> },
}

impl PollOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, PollOutcome::Changed { .. })
    }

    /// Delay the remote asked for before the next poll
    pub fn backoff(&self) -> Option<Duration> {
        match self {
            PollOutcome::Changed { backoff } | PollOutcome::Unchanged { backoff } => *backoff,
        }
    }
}

/// Progress callback used by [`SyncEngine::full_sync`]
pub type ProgressFn<'a> = &'a (dyn Fn(SyncProgress) + Send + Sync);

/// Ignores progress updates
pub fn no_progress(_: SyncProgress) {}

// ============================================================================
// SyncEngine
// ============================================================================

/// Reconciles one remote folder into the local cache
pub struct SyncEngine {
    remote: Arc<dyn IRemoteStore>,
    cache: Arc<LocalCacheStore>,
    classifier: FilenameClassifier,
    root: RemotePath,
    longpoll_timeout: Duration,
    /// Held for the whole of a full sync or delta application, so at most
    /// one reconciliation mutates the cache at a time.
    cursor: Mutex<Option<Cursor>>,
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn IRemoteStore>,
        cache: Arc<LocalCacheStore>,
        classifier: FilenameClassifier,
        root: RemotePath,
        longpoll_timeout: Duration,
    ) -> Self {
        Self {
            remote,
            cache,
            classifier,
            root,
            longpoll_timeout,
            cursor: Mutex::new(None),
        }
    }

    /// Creates an engine from the `remote`, `classifier` and `sync` sections
    pub fn from_config(
        remote: Arc<dyn IRemoteStore>,
        cache: Arc<LocalCacheStore>,
        config: &Config,
    ) -> Result<Self, DomainError> {
        let root: RemotePath = config.remote.folder_path.parse()?;
        Ok(Self::new(
            remote,
            cache,
            FilenameClassifier::from_config(&config.classifier),
            root,
            Duration::from_secs(config.sync.longpoll_timeout_secs),
        ))
    }

    pub fn cache(&self) -> &Arc<LocalCacheStore> {
        &self.cache
    }

    pub fn root(&self) -> &RemotePath {
        &self.root
    }

    pub async fn has_cursor(&self) -> bool {
        self.cursor.lock().await.is_some()
    }

    /// Current cursor, if a reconciliation has completed since the last failure
    pub async fn cursor(&self) -> Option<Cursor> {
        self.cursor.lock().await.clone()
    }

    /// Forgets the cursor so the next cycle performs a full sync
    pub async fn reset_cursor(&self) {
        *self.cursor.lock().await = None;
    }

    /// A name is mirrored only when the cache manages its extension and the
    /// classifier considers it final.
    pub fn is_publishable(&self, name: &FileName) -> bool {
        self.cache.manages(name) && self.classifier.is_final(name)
    }

    // ------------------------------------------------------------------------
    // Full sync
    // ------------------------------------------------------------------------

    /// Makes the cache match the remote folder exactly
    ///
    /// Emits a single [`SyncEvent::FileListReplaced`] with every cached
    /// displayable name, sorted. Files that vanish between listing and
    /// download are skipped; any other failure aborts with the cursor
    /// cleared.
    #[instrument(skip_all, fields(root = %self.root))]
    pub async fn full_sync(&self, progress: ProgressFn<'_>) -> Result<SyncResult, SyncError> {
        let started = Instant::now();
        let mut cursor = self.cursor.lock().await;
        *cursor = None;

        progress(SyncProgress::Listing);
        let listing = self.remote.list_folder(&self.root).await?;

        let remote: BTreeMap<FileName, RemoteEntry> = listing
            .entries
            .into_iter()
            .filter(|entry| {
                let keep = self.is_publishable(&entry.name);
                if !keep {
                    debug!(name = %entry.name, "Ignoring non-displayable remote file");
                }
                keep
            })
            .map(|entry| (entry.name.clone(), entry))
            .collect();
        let local = self.cache.list().await;

        let mut files_deleted = 0u32;
        for name in local.iter().filter(|name| !remote.contains_key(*name)) {
            if self.cache.delete(name).await {
                debug!(%name, "Removed stale photo from cache");
                files_deleted += 1;
            }
        }

        let missing: Vec<&RemoteEntry> = remote
            .values()
            .filter(|entry| !local.contains(&entry.name))
            .collect();
        let total = missing.len();
        if total > 0 {
            progress(SyncProgress::Downloading { done: 0, total });
        }

        let mut vanished = BTreeSet::new();
        let mut files_downloaded = 0u32;
        for (done, entry) in missing.into_iter().enumerate() {
            match self.download(entry).await {
                Ok(_) => files_downloaded += 1,
                Err(SaveError::Writer(RemoteError::NotFound(reason))) => {
                    warn!(name = %entry.name, %reason, "Photo vanished before download, skipping");
                    vanished.insert(entry.name.clone());
                }
                Err(e) => return Err(e.into()),
            }
            progress(SyncProgress::Downloading {
                done: done + 1,
                total,
            });
        }

        let names: Vec<FileName> = remote
            .into_keys()
            .filter(|name| !vanished.contains(name))
            .collect();
        *cursor = Some(listing.cursor);

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            photos = names.len(),
            downloaded = files_downloaded,
            deleted = files_deleted,
            duration_ms,
            "Full sync completed"
        );

        Ok(SyncResult {
            events: vec![SyncEvent::FileListReplaced { names }],
            files_downloaded,
            files_deleted,
            duration_ms,
        })
    }

    // ------------------------------------------------------------------------
    // Long-poll
    // ------------------------------------------------------------------------

    /// Waits for the remote to report changes behind the current cursor
    ///
    /// The cursor lock is not held while waiting. A failure clears the
    /// cursor unless a concurrent reconciliation already replaced it.
    #[instrument(skip_all, fields(timeout_secs = self.longpoll_timeout.as_secs()))]
    pub async fn poll_once(&self) -> Result<PollOutcome, SyncError> {
        let cursor = self.cursor().await.ok_or(SyncError::PreconditionFailed(
            "long-poll requires a cursor from a completed sync",
        ))?;

        match self
            .remote
            .list_folder_longpoll(&cursor, self.longpoll_timeout)
            .await
        {
            Ok(result) if result.changed => Ok(PollOutcome::Changed {
                backoff: result.backoff,
            }),
            Ok(result) => Ok(PollOutcome::Unchanged {
                backoff: result.backoff,
            }),
            Err(e) => {
                let mut current = self.cursor.lock().await;
                if current.as_ref() == Some(&cursor) {
                    *current = None;
                }
                Err(e.into())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Delta
    // ------------------------------------------------------------------------

    /// Applies every change behind the cursor to the cache
    ///
    /// Returns [`SyncError::CursorReset`] when the remote no longer accepts
    /// the cursor; the caller should run a full sync next.
    #[instrument(skip_all, fields(root = %self.root))]
    pub async fn apply_delta(&self) -> Result<SyncResult, SyncError> {
        let started = Instant::now();
        let mut cursor = self.cursor.lock().await;
        let current = cursor.clone().ok_or(SyncError::PreconditionFailed(
            "delta requires a cursor from a completed sync",
        ))?;

        let delta = match self.remote.list_folder_continue(&current).await {
            Ok(delta) => delta,
            Err(RemoteError::CursorReset) => {
                info!("Change cursor was reset by the remote; full sync required");
                *cursor = None;
                return Err(SyncError::CursorReset);
            }
            Err(e) => {
                *cursor = None;
                return Err(e.into());
            }
        };

        let applied = self.apply_changes(delta.changes).await;
        match applied {
            Ok((events, files_downloaded, files_deleted)) => {
                *cursor = Some(delta.cursor);
                let duration_ms = started.elapsed().as_millis() as u64;
                info!(
                    events = events.len(),
                    downloaded = files_downloaded,
                    deleted = files_deleted,
                    duration_ms,
                    "Applied folder changes"
                );
                Ok(SyncResult {
                    events,
                    files_downloaded,
                    files_deleted,
                    duration_ms,
                })
            }
            Err(e) => {
                *cursor = None;
                Err(e)
            }
        }
    }

    /// Applies `changes` in order and derives the events to emit
    ///
    /// A deletion in a batch that also adds a displayable name is treated as
    /// one half of a rename and is not announced. A name added and deleted
    /// within the same batch produces no event at all.
    async fn apply_changes(
        &self,
        changes: Vec<FolderChange>,
    ) -> Result<(Vec<SyncEvent>, u32, u32), SyncError> {
        let has_final_addition = changes.iter().any(|change| {
            matches!(change, FolderChange::Added(entry) if self.is_publishable(&entry.name))
        });

        let mut events = Vec::new();
        let mut added = BTreeSet::new();
        let mut files_downloaded = 0u32;
        let mut files_deleted = 0u32;

        for change in changes {
            match change {
                FolderChange::Added(entry) => {
                    if !self.is_publishable(&entry.name) {
                        debug!(name = %entry.name, "Ignoring non-displayable addition");
                        continue;
                    }
                    match self.download(&entry).await {
                        Ok(_) => {
                            files_downloaded += 1;
                            added.insert(entry.name);
                        }
                        Err(SaveError::Writer(RemoteError::NotFound(reason))) => {
                            warn!(name = %entry.name, %reason, "Photo vanished before download, skipping");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                FolderChange::Deleted { name, .. } => {
                    if self.cache.try_delete(&name).await? {
                        files_deleted += 1;
                    }
                    if added.remove(&name) {
                        debug!(%name, "Photo added and removed within one batch");
                        continue;
                    }
                    if self.is_publishable(&name) {
                        events.push(SyncEvent::FileDeleted {
                            name,
                            announce: !has_final_addition,
                        });
                    }
                }
            }
        }

        if !added.is_empty() {
            events.push(SyncEvent::FilesAdded {
                names: added.into_iter().collect(),
            });
        }
        Ok((events, files_downloaded, files_deleted))
    }

    async fn download(&self, entry: &RemoteEntry) -> Result<CachedBlob, SaveError<RemoteError>> {
        let remote = &self.remote;
        self.cache
            .save(&entry.name, |mut sink| async move {
                remote.download(entry, &mut sink).await?;
                Ok::<_, RemoteError>(sink)
            })
            .await
    }
}
