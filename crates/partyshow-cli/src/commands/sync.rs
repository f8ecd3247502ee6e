//! Sync command - Mirror the shared folder into the local cache
//!
//! Provides the `partyshow sync` CLI command which:
//! 1. Loads and validates configuration
//! 2. Resolves the Dropbox access token
//! 3. Creates the Dropbox store, the cache and the SyncEngine
//! 4. Runs one full sync and displays progress and a summary

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use partyshow_cache::LocalCacheStore;
use partyshow_core::{config::ACCESS_TOKEN_ENV, domain::SyncEvent, domain::SyncProgress};
use partyshow_dropbox::{client::DropboxClient, provider::DropboxRemoteStore};
use partyshow_sync::SyncEngine;
use tracing::info;

use super::CommandContext;

/// One-shot full sync
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// List photo names after syncing
    #[arg(long)]
    pub list: bool,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config();

        let errors = config.validate();
        if !errors.is_empty() {
            for e in &errors {
                formatter.error(&e.to_string());
            }
            bail!("invalid configuration in {}", ctx.config_path.display());
        }

        let Some(token) = config.auth.resolve_token() else {
            formatter.error(&format!(
                "No Dropbox access token. Set {ACCESS_TOKEN_ENV} or auth.token_file in {}.",
                ctx.config_path.display()
            ));
            bail!("no access token configured");
        };

        let cache = Arc::new(
            LocalCacheStore::from_config(&config.cache).context("Failed to open photo cache")?,
        );
        let store = Arc::new(DropboxRemoteStore::new(DropboxClient::new(token)));
        let engine = SyncEngine::from_config(store, cache.clone(), &config)
            .context("Invalid remote folder path")?;

        info!(folder = %engine.root(), cache = %cache.root().display(), "Starting sync");
        if !ctx.is_json() {
            formatter.success(&format!(
                "Syncing {} into {}",
                engine.root(),
                cache.root().display()
            ));
        }

        let progress = |p: SyncProgress| match p {
            SyncProgress::Listing => formatter.info("Listing remote folder..."),
            SyncProgress::Downloading { done, total } => formatter.progress(done, total),
            SyncProgress::Resyncing => {}
        };

        let result = match engine.full_sync(&progress).await {
            Ok(result) => result,
            Err(e) => {
                formatter.error(&e.user_message());
                return Err(e).context("Sync failed");
            }
        };

        let names: Vec<String> = result
            .events
            .iter()
            .flat_map(|event| match event {
                SyncEvent::FileListReplaced { names } => names.clone(),
                _ => Vec::new(),
            })
            .map(String::from)
            .collect();

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "photos": names.len(),
                "files_downloaded": result.files_downloaded,
                "files_deleted": result.files_deleted,
                "duration_ms": result.duration_ms,
                "names": names,
            }));
        } else {
            formatter.success(&format!(
                "Sync complete: {} photo(s), {} downloaded, {} removed ({} ms)",
                names.len(),
                result.files_downloaded,
                result.files_deleted,
                result.duration_ms
            ));
            if self.list {
                for name in &names {
                    formatter.info(name);
                }
            }
        }

        Ok(())
    }
}
