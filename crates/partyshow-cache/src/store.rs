//! Flat on-disk photo store keyed by file name.

use std::{
    collections::BTreeSet,
    future::Future,
    io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use partyshow_core::{config::CacheConfig, domain::FileName};
use serde::Serialize;
use tokio::{
    fs::File,
    io::{AsyncWriteExt, BufWriter},
    sync::{Mutex, OwnedMutexGuard},
};
use tracing::{debug, info, instrument, warn};

use crate::{CacheError, SaveError};

const PARTIAL_SUFFIX: &str = ".partial";

/// Sink handed to a `save` writer; bound to the in-progress file
pub type BlobSink = BufWriter<File>;

/// Handle to a complete cached file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedBlob {
    pub name: FileName,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Whether `name` is not hidden and ends in one of `extensions`
///
/// Extensions compare case-insensitively and may be given with a leading dot.
pub fn is_managed<S: AsRef<str>>(name: &FileName, extensions: &[S]) -> bool {
    if name.as_str().starts_with('.') {
        return false;
    }
    name.extension()
        .map(|ext| {
            extensions
                .iter()
                .any(|managed| managed.as_ref().trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Manages cached photos on disk.
///
/// Files live directly under the root: `{root}/{name}`. In-progress writes
/// use `{root}/.{pid}-{seq}.partial`, which is never listed. The partial name
/// does not grow with `name`, so any name the filesystem accepts can be saved.
pub struct LocalCacheStore {
    root: PathBuf,
    /// Lower-cased managed extensions, without dots.
    extensions: Vec<String>,
    /// Per-name locks; an entry lives only while someone holds or waits on it.
    locks: DashMap<FileName, Arc<Mutex<()>>>,
    next_partial: AtomicU64,
}

impl LocalCacheStore {
    /// Open the store at `root`, creating the directory if needed.
    ///
    /// Leftover partial files from an interrupted run are removed.
    pub fn open<S: AsRef<str>>(root: PathBuf, extensions: &[S]) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&root).map_err(|source| CacheError::Unavailable {
            path: root.clone(),
            source,
        })?;

        let store = Self {
            extensions: extensions
                .iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            root,
            locks: DashMap::new(),
            next_partial: AtomicU64::new(0),
        };

        let swept = store.sweep_partials()?;
        if swept > 0 {
            info!(root = %store.root.display(), swept, "Removed stale partial files");
        }
        Ok(store)
    }

    /// Open the store described by the `cache` config section.
    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        Self::open(config.dir.clone(), &config.extensions)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `name` has a managed extension and is not a hidden file.
    pub fn manages(&self, name: &FileName) -> bool {
        is_managed(name, &self.extensions)
    }

    /// Final on-disk location for `name`.
    pub fn path_for(&self, name: &FileName) -> PathBuf {
        self.root.join(name.as_str())
    }

    fn partial_path(&self) -> PathBuf {
        let seq = self.next_partial.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!(".{}-{seq}{PARTIAL_SUFFIX}", std::process::id()))
    }

    async fn lock_name(&self, name: &FileName) -> NameGuard<'_> {
        let lock = Arc::clone(
            &*self
                .locks
                .entry(name.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        );
        NameGuard {
            locks: &self.locks,
            name: name.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Names of all cached files with a managed extension.
    ///
    /// An unavailable directory lists as empty.
    pub async fn list(&self) -> BTreeSet<FileName> {
        match self.scan().await {
            Ok(names) => names,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Cache directory unavailable");
                BTreeSet::new()
            }
        }
    }

    async fn scan(&self) -> io::Result<BTreeSet<FileName>> {
        let mut names = BTreeSet::new();
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Ok(raw) = entry.file_name().into_string() else {
                continue;
            };
            if let Ok(name) = FileName::new(raw) {
                if self.manages(&name) {
                    names.insert(name);
                }
            }
        }
        Ok(names)
    }

    /// Handle to `name` if it is cached.
    pub async fn get(&self, name: &FileName) -> Option<CachedBlob> {
        let path = self.path_for(name);
        let metadata = tokio::fs::metadata(&path).await.ok()?;
        if !metadata.is_file() {
            return None;
        }
        Some(CachedBlob {
            name: name.clone(),
            size_bytes: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            path,
        })
    }

    /// Remove `name`. Returns whether a file was actually removed.
    ///
    /// Best effort: a failed removal is logged and reported as `false`.
    pub async fn delete(&self, name: &FileName) -> bool {
        match self.try_delete(name).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(%name, error = %e, "Failed to remove cached file");
                false
            }
        }
    }

    /// Remove `name`, telling an absent file (`Ok(false)`) apart from a
    /// removal that failed.
    #[instrument(skip(self), fields(name = %name))]
    pub async fn try_delete(&self, name: &FileName) -> Result<bool, CacheError> {
        let _guard = self.lock_name(name).await;

        match tokio::fs::remove_file(self.path_for(name)).await {
            Ok(()) => {
                debug!("Removed from cache");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::from(e)),
        }
    }

    /// Store `name` with bytes produced by `writer`.
    ///
    /// `writer` receives a sink bound to a hidden partial file and must hand
    /// it back on success. The file becomes visible under `name` only after
    /// the writer returned `Ok` and the bytes were flushed to disk. On any
    /// failure, or if this future is dropped, the partial file is removed
    /// and a previously cached version of `name` is left untouched.
    #[instrument(skip(self, writer), fields(name = %name))]
    pub async fn save<F, Fut, E>(
        &self,
        name: &FileName,
        writer: F,
    ) -> Result<CachedBlob, SaveError<E>>
    where
        F: FnOnce(BlobSink) -> Fut,
        Fut: Future<Output = Result<BlobSink, E>>,
        E: std::error::Error + 'static,
    {
        let _guard = self.lock_name(name).await;

        let target = self.path_for(name);
        let mut partial = PartialFile::new(self.partial_path());

        let file = File::create(partial.path())
            .await
            .map_err(CacheError::from)?;

        let mut sink = writer(BufWriter::new(file)).await.map_err(|e| {
            warn!(error = %e, "Writer failed, discarding partial file");
            SaveError::Writer(e)
        })?;

        sink.flush().await.map_err(CacheError::from)?;
        let file = sink.into_inner();
        file.sync_all().await.map_err(CacheError::from)?;
        drop(file);

        tokio::fs::rename(partial.path(), &target)
            .await
            .map_err(CacheError::from)?;
        partial.disarm();

        let metadata = tokio::fs::metadata(&target)
            .await
            .map_err(CacheError::from)?;
        debug!(size_bytes = metadata.len(), "Saved to cache");

        Ok(CachedBlob {
            name: name.clone(),
            size_bytes: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            path: target,
        })
    }

    /// Total size in bytes of all listed files.
    pub async fn total_size(&self) -> u64 {
        let mut total = 0u64;
        for name in self.list().await {
            if let Some(blob) = self.get(&name).await {
                total += blob.size_bytes;
            }
        }
        total
    }

    fn sweep_partials(&self) -> Result<usize, CacheError> {
        let mut swept = 0;
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if file_name.starts_with('.') && file_name.ends_with(PARTIAL_SUFFIX) {
                std::fs::remove_file(entry.path())?;
                swept += 1;
            }
        }
        Ok(swept)
    }
}

/// Holds the lock for one name; the map entry is dropped with the last user.
struct NameGuard<'a> {
    locks: &'a DashMap<FileName, Arc<Mutex<()>>>,
    name: FileName,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for NameGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.name, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Removes the partial file on drop unless the save was committed.
struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed partial file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove partial file"),
        }
    }
}
