//! PartyShow Daemon - Shared-folder slideshow service
//!
//! This binary runs as a user service and handles:
//! - Mirroring the shared Dropbox folder into the local photo cache
//! - Sequencing the cached photos into a slideshow
//! - Waiting for a fresh access token when the current one is rejected
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! ```text
//! WatchLoop ──mpsc<SyncEvent>──► Sequencer ──watch/broadcast──► presenter
//!     │
//!     └── watch<SyncStatus> ────────────────────────────────────► presenter
//! ```
//!
//! Every task shares one `CancellationToken` that is triggered on receipt of
//! SIGTERM or SIGINT.

use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use partyshow_cache::LocalCacheStore;
use partyshow_core::{config::Config, domain::FilenameClassifier};
use partyshow_dropbox::{client::DropboxClient, provider::DropboxRemoteStore};
use partyshow_sync::{Sequencer, SequencerHandle, SyncEngine, SyncStatus, WatchLoop};
use tokio::sync::{broadcast::error::RecvError, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// How often the credential source is re-read while waiting for auth
const AUTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Sync events buffered between the watch loop and the sequencer
const EVENT_CAPACITY: usize = 64;

// ============================================================================
// DaemonService
// ============================================================================

/// Owns the configuration and the shutdown token shared by every task
struct DaemonService {
    config: Config,
    shutdown: CancellationToken,
    auth_check_interval: Duration,
}

impl DaemonService {
    fn new(config: Config, shutdown: CancellationToken) -> Self {
        Self {
            config,
            shutdown,
            auth_check_interval: AUTH_CHECK_INTERVAL,
        }
    }

    /// Runs the sync session until shutdown
    async fn run(&self) -> Result<()> {
        let status = Arc::new(watch::channel(SyncStatus::Idle).0);

        let Some(mut token) = self.initial_token(&status).await else {
            info!("Shutdown requested before a credential was available");
            return Ok(());
        };

        let cache = Arc::new(
            LocalCacheStore::from_config(&self.config.cache).context("Failed to open photo cache")?,
        );
        info!(cache_dir = %cache.root().display(), "Photo cache ready");

        let store = Arc::new(DropboxRemoteStore::new(DropboxClient::new(token.clone())));
        let engine = Arc::new(
            SyncEngine::from_config(store.clone(), cache.clone(), &self.config)
                .context("Invalid remote folder path")?,
        );

        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        let (sequencer, handle) = Sequencer::new(
            cache,
            FilenameClassifier::from_config(&self.config.classifier),
            Duration::from_secs(self.config.slideshow.interval_secs),
            events_rx,
        );
        let sequencer_task = tokio::spawn(sequencer.run(self.shutdown.clone()));
        let presenter_task = tokio::spawn(present(
            handle,
            status.subscribe(),
            self.shutdown.clone(),
        ));

        let retry_delay = Duration::from_secs(self.config.sync.retry_delay_secs);
        loop {
            let watcher = WatchLoop::new(
                engine.clone(),
                events_tx.clone(),
                status.clone(),
                retry_delay,
                self.shutdown.clone(),
            );

            match watcher.run().await {
                Ok(()) => break,
                Err(e) => {
                    warn!(error = %e, "Access token rejected");
                    status.send_replace(SyncStatus::WaitingForAuth);

                    let Some(fresh) = self.wait_for_auth(Some(&token)).await else {
                        break;
                    };
                    store.set_access_token(fresh.clone()).await;
                    engine.reset_cursor().await;
                    token = fresh;
                    info!("New access token found, restarting sync");
                }
            }
        }

        self.shutdown.cancel();
        drop(events_tx);
        if let Err(e) = sequencer_task.await {
            error!(error = %e, "Sequencer task failed");
        }
        if let Err(e) = presenter_task.await {
            error!(error = %e, "Presenter task failed");
        }
        Ok(())
    }

    async fn initial_token(&self, status: &watch::Sender<SyncStatus>) -> Option<String> {
        if let Some(token) = self.config.auth.resolve_token() {
            return Some(token);
        }
        status.send_replace(SyncStatus::WaitingForAuth);
        self.wait_for_auth(None).await
    }

    /// Waits until the credential source yields a token other than `rejected`
    ///
    /// Returns `None` on shutdown.
    async fn wait_for_auth(&self, rejected: Option<&str>) -> Option<String> {
        info!(
            env = partyshow_core::config::ACCESS_TOKEN_ENV,
            "Waiting for a Dropbox access token"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.auth_check_interval) => {
                    match self.config.auth.resolve_token() {
                        Some(token) if Some(token.as_str()) != rejected => return Some(token),
                        _ => {}
                    }
                }
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received while waiting for auth");
                    return None;
                }
            }
        }
    }
}

// ============================================================================
// Presentation
// ============================================================================

/// Logs what a display would show: the current photo, notices and status
async fn present(
    handle: SequencerHandle,
    mut status: watch::Receiver<SyncStatus>,
    shutdown: CancellationToken,
) {
    let mut state = handle.watch_state();
    let mut notices = handle.subscribe_notices();
    let mut showing = None;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = state.borrow_and_update().clone();
                if current.current != showing {
                    match (&current.current, current.position) {
                        (Some(name), Some((position, total))) => {
                            info!(photo = %name, position, total, "Now showing");
                        }
                        _ => info!("No photos to show"),
                    }
                    showing = current.current;
                }
            }
            notice = notices.recv() => match notice {
                Ok(notice) => info!(notice = %notice, "Notice"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Presenter fell behind on notices"),
                Err(RecvError::Closed) => break,
            },
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                info!(status = %current, "Sync status");
            }
        }
    }
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = Config::default_path();
    let config = Config::load_or_default(&config_path);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!(config_path = %config_path.display(), "PartyShow daemon starting (partyshowd)");

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!(field = %e.field, message = %e.message, "Invalid configuration");
        }
        bail!("configuration has {} error(s)", errors.len());
    }

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, shutdown_token);
    let result = service.run().await;

    match &result {
        Ok(()) => info!("PartyShow daemon shut down gracefully"),
        Err(e) => error!(error = %e, "PartyShow daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
