//! Watch loop - keeps the cache in step with the remote folder
//!
//! ```text
//!          ┌──────────── no cursor ────────────┐
//!          ▼                                   │
//!     full_sync ──ok──► poll_once ──changed──► apply_delta
//!          │                │                      │
//!          └──── error ─────┴──── error ───────────┘
//!                   │
//!            sleep(retry_delay)
//! ```
//!
//! Every await point is raced against the shutdown token. Authentication
//! failures end the loop with [`SyncError::Unauthorized`] so the owner can
//! wait for a new credential; every other error is retried after a fixed
//! delay.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use partyshow_core::domain::{SyncEvent, SyncProgress};

use crate::{engine::SyncEngine, SyncError};

/// What the watch loop is doing, for status displays
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    /// Not started yet
    Idle,
    /// Listing the remote folder
    Syncing,
    /// Downloading missing photos
    Downloading { done: usize, total: usize },
    /// Up to date, waiting for changes
    Watching { since: DateTime<Utc> },
    /// The cursor was rejected; a full sync follows
    Resyncing,
    /// The last cycle failed and will be retried
    Error { message: String },
    /// The credential was rejected
    WaitingForAuth,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Idle => write!(f, "Idle"),
            SyncStatus::Syncing => write!(f, "Syncing"),
            SyncStatus::Downloading { done, total } => {
                write!(f, "Downloading ({done}/{total})")
            }
            SyncStatus::Watching { since } => {
                write!(f, "Watching for changes since {}", since.format("%H:%M:%S"))
            }
            SyncStatus::Resyncing => write!(f, "Resynchronizing"),
            SyncStatus::Error { message } => write!(f, "Error: {message}"),
            SyncStatus::WaitingForAuth => write!(f, "Waiting for authentication"),
        }
    }
}

/// Drives a [`SyncEngine`] until shutdown or an authentication failure
pub struct WatchLoop {
    engine: Arc<SyncEngine>,
    events: mpsc::Sender<SyncEvent>,
    status: Arc<watch::Sender<SyncStatus>>,
    retry_delay: Duration,
    shutdown: CancellationToken,
}

impl WatchLoop {
    pub fn new(
        engine: Arc<SyncEngine>,
        events: mpsc::Sender<SyncEvent>,
        status: Arc<watch::Sender<SyncStatus>>,
        retry_delay: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            engine,
            events,
            status,
            retry_delay,
            shutdown,
        }
    }

    /// Runs until the shutdown token fires (`Ok`) or the credential is
    /// rejected (`Err(SyncError::Unauthorized)`)
    pub async fn run(&self) -> Result<(), SyncError> {
        info!(retry_delay_secs = self.retry_delay.as_secs(), "Watch loop started");
        // Set when the remote rejected the cursor; the next full sync is
        // reported as a re-sync until it succeeds.
        let mut resyncing = false;

        while !self.shutdown.is_cancelled() {
            if !self.engine.has_cursor().await {
                let progress = |p: SyncProgress| match p {
                    SyncProgress::Listing if resyncing => self.on_progress(SyncProgress::Resyncing),
                    p => self.on_progress(p),
                };

                let synced = tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    r = self.engine.full_sync(&progress) => r,
                };
                match synced {
                    Ok(result) => {
                        resyncing = false;
                        self.publish(result.events).await;
                    }
                    Err(e) if e.is_auth() => return Err(e),
                    Err(e) => {
                        self.report_failure(&e);
                        if !self.pause(self.retry_delay).await {
                            break;
                        }
                        continue;
                    }
                }
            }

            self.mark_watching();
            let polled = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                r = self.engine.poll_once() => r,
            };
            let outcome = match polled {
                Ok(outcome) => outcome,
                Err(SyncError::CursorReset) => {
                    resyncing = true;
                    self.set_status(SyncStatus::Resyncing);
                    continue;
                }
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    self.report_failure(&e);
                    if !self.pause(self.retry_delay).await {
                        break;
                    }
                    continue;
                }
            };

            if outcome.is_changed() {
                let applied = tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    r = self.engine.apply_delta() => r,
                };
                match applied {
                    Ok(result) => self.publish(result.events).await,
                    Err(SyncError::CursorReset) => {
                        resyncing = true;
                        self.set_status(SyncStatus::Resyncing);
                        continue;
                    }
                    Err(e) if e.is_auth() => return Err(e),
                    Err(e) => {
                        self.report_failure(&e);
                        if !self.pause(self.retry_delay).await {
                            break;
                        }
                        continue;
                    }
                }
            }

            if let Some(backoff) = outcome.backoff() {
                debug!(backoff_secs = backoff.as_secs(), "Remote asked to back off");
                if !self.pause(backoff).await {
                    break;
                }
            }
        }

        info!("Watch loop stopped");
        Ok(())
    }

    fn on_progress(&self, progress: SyncProgress) {
        match progress {
            SyncProgress::Listing => self.set_status(SyncStatus::Syncing),
            SyncProgress::Downloading { done, total } => {
                self.set_status(SyncStatus::Downloading { done, total })
            }
            SyncProgress::Resyncing => self.set_status(SyncStatus::Resyncing),
        }
    }

    async fn publish(&self, events: Vec<SyncEvent>) {
        for event in events {
            if self.events.send(event).await.is_err() {
                warn!("Event consumer has stopped; dropping sync events");
                return;
            }
        }
    }

    fn report_failure(&self, error: &SyncError) {
        warn!(
            kind = ?error.kind(),
            error = %error,
            retry_in_secs = self.retry_delay.as_secs(),
            "Sync cycle failed"
        );
        self.set_status(SyncStatus::Error {
            message: error.user_message(),
        });
    }

    fn set_status(&self, status: SyncStatus) {
        self.status.send_replace(status);
    }

    /// Enters `Watching`, keeping the original `since` if already there
    fn mark_watching(&self) {
        self.status.send_if_modified(|status| {
            if matches!(status, SyncStatus::Watching { .. }) {
                false
            } else {
                *status = SyncStatus::Watching { since: Utc::now() };
                true
            }
        });
    }

    /// Sleeps for `delay`; returns false if shutdown was requested first
    async fn pause(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}
