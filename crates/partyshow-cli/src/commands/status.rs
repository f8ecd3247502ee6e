//! Status command - Show the local photo cache
//!
//! Lists every cached photo with its uploader and size. Works offline and
//! without a daemon running.

use anyhow::{Context, Result};
use clap::Args;
use partyshow_cache::LocalCacheStore;
use partyshow_core::domain::FilenameClassifier;

use super::CommandContext;
use crate::output::human_size;

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config();
        let classifier = FilenameClassifier::from_config(&config.classifier);

        let cache =
            LocalCacheStore::from_config(&config.cache).context("Failed to open photo cache")?;

        let mut photos = Vec::new();
        for name in cache.list().await {
            let Some(blob) = cache.get(&name).await else {
                continue;
            };
            let uploader = classifier.classify(&name).uploader;
            photos.push((blob, uploader));
        }
        let total_bytes: u64 = photos.iter().map(|(blob, _)| blob.size_bytes).sum();
        let has_token = config.auth.resolve_token().is_some();

        if ctx.is_json() {
            let entries: Vec<serde_json::Value> = photos
                .iter()
                .map(|(blob, uploader)| {
                    serde_json::json!({
                        "name": blob.name,
                        "uploader": uploader,
                        "size_bytes": blob.size_bytes,
                        "modified": blob.modified,
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({
                "remote_folder": config.remote.folder_path,
                "cache_dir": cache.root().display().to_string(),
                "photo_count": photos.len(),
                "total_bytes": total_bytes,
                "access_token_configured": has_token,
                "photos": entries,
            }));
            return Ok(());
        }

        formatter.success("PartyShow status");
        formatter.info(&format!("Remote folder: {}", config.remote.folder_path));
        formatter.info(&format!("Cache:         {}", cache.root().display()));
        formatter.info(&format!(
            "Photos:        {} ({})",
            photos.len(),
            human_size(total_bytes)
        ));
        if !has_token {
            formatter.warn("No Dropbox access token configured");
        }

        if !photos.is_empty() {
            formatter.info("");
            for (blob, uploader) in &photos {
                let modified = blob
                    .modified
                    .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                formatter.info(&format!(
                    "{:<40} {:<16} {:>10}  {}",
                    blob.name.as_str(),
                    uploader.as_deref().unwrap_or("-"),
                    human_size(blob.size_bytes),
                    modified
                ));
            }
        }

        Ok(())
    }
}
