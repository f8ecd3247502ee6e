//! DropboxRemoteStore - IRemoteStore implementation for the Dropbox API
//!
//! Wraps the [`DropboxClient`] and delegates to the folder and client
//! modules to fulfil the [`IRemoteStore`] port contract.
//!
//! ## Design Notes
//!
//! - The client sits behind a `tokio::sync::RwLock` so the access token can
//!   be swapped after re-authentication while `IRemoteStore` methods take
//!   `&self`. Each call clones the client and releases the lock before any
//!   network I/O, so a long-poll never blocks a token swap.
//! - Downloads address the exact revision that was listed when one is known.

use std::time::Duration;

use tokio::{io::AsyncWrite, sync::RwLock};
use tracing::debug;

use partyshow_core::{
    domain::{Cursor, RemotePath},
    ports::{FolderDelta, FolderListing, IRemoteStore, LongpollResult, RemoteEntry, RemoteError},
};

use crate::{client::DropboxClient, folder};

/// Dropbox-backed remote store
pub struct DropboxRemoteStore {
    client: RwLock<DropboxClient>,
}

impl DropboxRemoteStore {
    pub fn new(client: DropboxClient) -> Self {
        Self {
            client: RwLock::new(client),
        }
    }

    /// Replace the access token used by subsequent calls
    pub async fn set_access_token(&self, token: impl Into<String>) {
        self.client.write().await.set_access_token(token);
    }

    async fn client(&self) -> DropboxClient {
        self.client.read().await.clone()
    }
}

/// Download argument for `entry`: the listed revision if known, else its path
fn download_path(entry: &RemoteEntry) -> String {
    match &entry.revision {
        Some(rev) => format!("rev:{rev}"),
        None => entry.path.clone(),
    }
}

#[async_trait::async_trait]
impl IRemoteStore for DropboxRemoteStore {
    async fn list_folder(&self, path: &RemotePath) -> Result<FolderListing, RemoteError> {
        let client = self.client().await;
        Ok(folder::list_folder(&client, path).await?)
    }

    async fn list_folder_longpoll(
        &self,
        cursor: &Cursor,
        timeout: Duration,
    ) -> Result<LongpollResult, RemoteError> {
        let client = self.client().await;
        Ok(folder::longpoll(&client, cursor, timeout).await?)
    }

    async fn list_folder_continue(&self, cursor: &Cursor) -> Result<FolderDelta, RemoteError> {
        let client = self.client().await;
        Ok(folder::list_folder_continue(&client, cursor).await?)
    }

    async fn download(
        &self,
        entry: &RemoteEntry,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, RemoteError> {
        let client = self.client().await;
        let path = download_path(entry);
        debug!(name = %entry.name, %path, "Fetching photo");
        Ok(client.download_to(&path, sink).await?)
    }
}
