//! Shared fixtures for sync integration tests
//!
//! [`FakeRemote`] is an in-memory folder with a change log. Cursors are
//! `c<n>` where `n` is the number of log entries they cover.

#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashSet},
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use partyshow_cache::LocalCacheStore;
use partyshow_core::{
    domain::{Cursor, FileName, FilenameClassifier, RemotePath},
    ports::{
        FolderChange, FolderDelta, FolderListing, IRemoteStore, LongpollResult, RemoteEntry,
        RemoteError,
    },
};
use partyshow_sync::SyncEngine;
use tempfile::TempDir;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Notify,
};

pub const FOLDER: &str = "/PartyPhotos";

pub fn name(s: &str) -> FileName {
    s.parse().expect("valid file name")
}

pub fn names(list: &[&str]) -> Vec<FileName> {
    list.iter().map(|s| name(s)).collect()
}

#[derive(Default)]
struct FakeState {
    files: BTreeMap<FileName, (Vec<u8>, u64)>,
    log: Vec<FolderChange>,
    next_rev: u64,
    failing_downloads: HashSet<FileName>,
    vanishing_downloads: HashSet<FileName>,
    fail_listing: u32,
    hold_listing: bool,
    reset: bool,
    unauthorized: bool,
    downloads: u32,
}

/// In-memory remote folder
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
    changed: Notify,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn entry(name: &FileName, rev: u64, size: usize) -> RemoteEntry {
        RemoteEntry {
            name: name.clone(),
            path: format!("{}/{}", FOLDER.to_lowercase(), name.as_str().to_lowercase()),
            revision: Some(format!("{rev:08x}")),
            content_hash: None,
            size: Some(size as u64),
        }
    }

    pub fn add(&self, file: &str, bytes: &[u8]) {
        let mut state = self.state.lock().unwrap();
        state.next_rev += 1;
        let rev = state.next_rev;
        let file = name(file);
        state.log.push(FolderChange::Added(Self::entry(&file, rev, bytes.len())));
        state.files.insert(file, (bytes.to_vec(), rev));
        drop(state);
        self.changed.notify_waiters();
    }

    pub fn remove(&self, file: &str) {
        let mut state = self.state.lock().unwrap();
        let file = name(file);
        state.files.remove(&file);
        state.log.push(FolderChange::Deleted {
            path: format!("{}/{}", FOLDER.to_lowercase(), file.as_str().to_lowercase()),
            name: file,
        });
        drop(state);
        self.changed.notify_waiters();
    }

    /// Logs the deletion of `from` and the addition of `to` in one batch
    pub fn rename(&self, from: &str, to: &str) {
        let bytes = {
            let state = self.state.lock().unwrap();
            state.files.get(&name(from)).map(|(b, _)| b.clone()).unwrap_or_default()
        };
        self.remove(from);
        self.add(to, &bytes);
    }

    pub fn fail_download(&self, file: &str, fail: bool) {
        let mut state = self.state.lock().unwrap();
        if fail {
            state.failing_downloads.insert(name(file));
        } else {
            state.failing_downloads.remove(&name(file));
        }
    }

    /// Makes downloads of `file` report it as already deleted
    pub fn vanish_on_download(&self, file: &str) {
        self.state.lock().unwrap().vanishing_downloads.insert(name(file));
    }

    /// Fails the next `count` listings with a network error
    pub fn fail_listings(&self, count: u32) {
        self.state.lock().unwrap().fail_listing = count;
    }

    /// While held, listings wait until released
    pub fn hold_listings(&self, hold: bool) {
        self.state.lock().unwrap().hold_listing = hold;
        self.changed.notify_waiters();
    }

    /// Invalidates every cursor issued so far
    pub fn reset_cursors(&self) {
        self.state.lock().unwrap().reset = true;
        self.changed.notify_waiters();
    }

    pub fn set_unauthorized(&self, unauthorized: bool) {
        self.state.lock().unwrap().unauthorized = unauthorized;
        self.changed.notify_waiters();
    }

    pub fn downloads(&self) -> u32 {
        self.state.lock().unwrap().downloads
    }

    fn cursor_at(position: usize) -> Cursor {
        Cursor::new(format!("c{position}")).unwrap()
    }

    fn position(&self, cursor: &Cursor) -> Result<usize, RemoteError> {
        let state = self.state.lock().unwrap();
        if state.unauthorized {
            return Err(RemoteError::Unauthorized("expired_access_token/".into()));
        }
        if state.reset {
            return Err(RemoteError::CursorReset);
        }
        cursor
            .as_str()
            .strip_prefix('c')
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| RemoteError::InvalidResponse(format!("bad cursor {cursor}")))
    }
}

#[async_trait::async_trait]
impl IRemoteStore for FakeRemote {
    async fn list_folder(&self, path: &RemotePath) -> Result<FolderListing, RemoteError> {
        loop {
            let released = self.changed.notified();
            if !self.state.lock().unwrap().hold_listing {
                break;
            }
            released.await;
        }

        let mut state = self.state.lock().unwrap();
        if state.unauthorized {
            return Err(RemoteError::Unauthorized("invalid_access_token/".into()));
        }
        if state.fail_listing > 0 {
            state.fail_listing -= 1;
            return Err(RemoteError::Network("connection refused".into()));
        }
        assert_eq!(path.as_str(), FOLDER);
        state.reset = false;
        Ok(FolderListing {
            cursor: Self::cursor_at(state.log.len()),
            entries: state
                .files
                .iter()
                .map(|(file, (bytes, rev))| Self::entry(file, *rev, bytes.len()))
                .collect(),
        })
    }

    async fn list_folder_longpoll(
        &self,
        cursor: &Cursor,
        timeout: Duration,
    ) -> Result<LongpollResult, RemoteError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.changed.notified();
            let position = self.position(cursor)?;
            if self.state.lock().unwrap().log.len() > position {
                return Ok(LongpollResult {
                    changed: true,
                    backoff: None,
                });
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(LongpollResult {
                    changed: false,
                    backoff: None,
                });
            }
        }
    }

    async fn list_folder_continue(&self, cursor: &Cursor) -> Result<FolderDelta, RemoteError> {
        let position = self.position(cursor)?;
        let state = self.state.lock().unwrap();
        Ok(FolderDelta {
            cursor: Self::cursor_at(state.log.len()),
            changes: state.log[position..].to_vec(),
        })
    }

    async fn download(
        &self,
        entry: &RemoteEntry,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, RemoteError> {
        let bytes = {
            let mut state = self.state.lock().unwrap();
            if state.unauthorized {
                return Err(RemoteError::Unauthorized("expired_access_token/".into()));
            }
            if state.failing_downloads.contains(&entry.name) {
                return Err(RemoteError::Network("connection reset by peer".into()));
            }
            if state.vanishing_downloads.contains(&entry.name) {
                return Err(RemoteError::NotFound("path/not_found/".into()));
            }
            state.downloads += 1;
            match state.files.get(&entry.name) {
                Some((bytes, _)) => bytes.clone(),
                None => return Err(RemoteError::NotFound("path/not_found/".into())),
            }
        };
        sink.write_all(&bytes).await?;
        Ok(bytes.len() as u64)
    }
}

/// Cache managing jpg and png files in a fresh temp dir
pub fn cache() -> (TempDir, Arc<LocalCacheStore>) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = LocalCacheStore::open(dir.path().to_path_buf(), &["jpg", "png"])
        .expect("Failed to open LocalCacheStore");
    (dir, Arc::new(store))
}

pub fn engine(remote: Arc<FakeRemote>, cache: Arc<LocalCacheStore>) -> Arc<SyncEngine> {
    Arc::new(SyncEngine::new(
        remote,
        cache,
        FilenameClassifier::new(false),
        FOLDER.parse().unwrap(),
        Duration::from_millis(200),
    ))
}

/// Names of every entry in `dir`, including hidden ones
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut entries: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    entries
}

/// Writes `bytes` into the cache under `file`
pub async fn seed(cache: &LocalCacheStore, file: &str, bytes: &'static [u8]) {
    cache
        .save(&name(file), |mut sink| async move {
            sink.write_all(bytes).await?;
            Ok::<_, std::io::Error>(sink)
        })
        .await
        .expect("seed save");
}
