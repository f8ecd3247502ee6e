//! Slideshow sequencer
//!
//! A single task owns the [`Playlist`]. Sync events, the advance timer and
//! commands from [`SequencerHandle`]s are all handled by that task, so the
//! playlist never needs a lock.
//!
//! ## Outputs
//!
//! - `watch<SlideshowState>`: the photo to show right now
//! - `broadcast<Notice>`: "Bob posted a new photo", "Removed x.jpg"
//!
//! A cached file can disappear between being added and being shown. When
//! that happens the name is removed exactly as if it had been deleted
//! remotely, and whatever photo the playlist re-anchors on is shown.

use std::{path::PathBuf, sync::Arc, time::Duration};

use serde::Serialize;
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use partyshow_cache::LocalCacheStore;
use partyshow_core::domain::{
    FileName, FilenameClassifier, Notice, Playlist, PlaylistState, SyncEvent,
};

/// Capacity of the command channel
const COMMAND_CAPACITY: usize = 16;

/// Notices kept for slow subscribers before they start lagging
const NOTICE_CAPACITY: usize = 32;

/// Shortest accepted advance period
const MIN_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SequencerError {
    #[error("Sequencer task has stopped")]
    Stopped,

    #[error("Sequencer response lost")]
    ResponseLost,
}

/// What the display should show
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideshowState {
    pub state: PlaylistState,
    /// Name of the photo on screen
    pub current: Option<FileName>,
    /// Cached file backing `current`
    pub path: Option<PathBuf>,
    /// 1-based position and playlist length
    pub position: Option<(usize, usize)>,
    /// Playlist order
    pub names: Vec<FileName>,
}

impl SlideshowState {
    pub fn empty() -> Self {
        Self {
            state: PlaylistState::Empty,
            current: None,
            path: None,
            position: None,
            names: Vec::new(),
        }
    }
}

/// Requests handled by the sequencer task
#[derive(Debug)]
pub enum SequencerCommand {
    /// Move to the next photo now
    Advance {
        reply: oneshot::Sender<Option<FileName>>,
    },
    /// Return the current state
    Snapshot {
        reply: oneshot::Sender<SlideshowState>,
    },
}

// ============================================================================
// SequencerHandle
// ============================================================================

/// Cloneable handle for talking to a running [`Sequencer`]
#[derive(Debug, Clone)]
pub struct SequencerHandle {
    tx: mpsc::Sender<SequencerCommand>,
    state: watch::Receiver<SlideshowState>,
    notices: broadcast::Sender<Notice>,
}

impl SequencerHandle {
    /// Advances immediately and returns the photo now shown
    pub async fn advance(&self) -> Result<Option<FileName>, SequencerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SequencerCommand::Advance { reply })
            .await
            .map_err(|_| SequencerError::Stopped)?;
        rx.await.map_err(|_| SequencerError::ResponseLost)
    }

    pub async fn snapshot(&self) -> Result<SlideshowState, SequencerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SequencerCommand::Snapshot { reply })
            .await
            .map_err(|_| SequencerError::Stopped)?;
        rx.await.map_err(|_| SequencerError::ResponseLost)
    }

    /// Receiver that observes every published state
    pub fn watch_state(&self) -> watch::Receiver<SlideshowState> {
        self.state.clone()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }
}

// ============================================================================
// Sequencer
// ============================================================================

/// Owner of the playlist
pub struct Sequencer {
    playlist: Playlist,
    cache: Arc<LocalCacheStore>,
    classifier: FilenameClassifier,
    interval: Duration,
    events: mpsc::Receiver<SyncEvent>,
    commands: mpsc::Receiver<SequencerCommand>,
    state: watch::Sender<SlideshowState>,
    notices: broadcast::Sender<Notice>,
}

impl Sequencer {
    /// Creates the sequencer and a handle to it
    ///
    /// # Arguments
    /// * `events` - Ordered sync events from a single watch loop
    /// * `interval` - Time each photo stays on screen
    pub fn new(
        cache: Arc<LocalCacheStore>,
        classifier: FilenameClassifier,
        interval: Duration,
        events: mpsc::Receiver<SyncEvent>,
    ) -> (Self, SequencerHandle) {
        let (tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        let (state, state_rx) = watch::channel(SlideshowState::empty());
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        let handle = SequencerHandle {
            tx,
            state: state_rx,
            notices: notices.clone(),
        };
        let sequencer = Self {
            playlist: Playlist::new(),
            cache,
            classifier,
            interval: interval.max(MIN_INTERVAL),
            events,
            commands,
            state,
            notices,
        };
        (sequencer, handle)
    }

    /// Processes events, ticks and commands until shutdown or until every
    /// event sender is dropped
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "Sequencer started");
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Events before commands, so a snapshot reflects every
                // event queued ahead of it.
                biased;
                _ = shutdown.cancelled() => break,
                event = self.events.recv() => match event {
                    Some(event) => {
                        if self.apply(event).await {
                            ticker.reset();
                        }
                    }
                    None => {
                        debug!("All event senders dropped");
                        break;
                    }
                },
                Some(command) = self.commands.recv() => match command {
                    SequencerCommand::Advance { reply } => {
                        let shown = self.advance().await;
                        ticker.reset();
                        let _ = reply.send(shown);
                    }
                    SequencerCommand::Snapshot { reply } => {
                        let _ = reply.send(self.snapshot());
                    }
                },
                _ = ticker.tick() => {
                    self.advance().await;
                }
            }
        }

        info!("Sequencer stopped");
    }

    /// Applies one event; returns true when the advance timer should restart
    async fn apply(&mut self, event: SyncEvent) -> bool {
        match event {
            SyncEvent::FileListReplaced { names } => {
                self.playlist.replace(names);
                debug!(photos = self.playlist.len(), "Playlist replaced");
                self.show_current().await;
                true
            }
            SyncEvent::FilesAdded { names } => {
                let was_empty = self.playlist.is_empty();
                let inserted = self.playlist.insert_added(names);
                if let Some(last) = inserted.last() {
                    let uploader = self.classifier.classify(last).uploader;
                    self.notify(Notice::PhotoAdded {
                        name: last.clone(),
                        uploader,
                    });
                }
                debug!(inserted = inserted.len(), photos = self.playlist.len(), "Photos added");
                self.show_current().await;
                was_empty && !inserted.is_empty()
            }
            SyncEvent::FileDeleted { name, announce } => {
                if self.playlist.remove(&name) {
                    debug!(%name, announce, "Photo removed from playlist");
                    if announce {
                        self.notify(Notice::PhotoRemoved { name });
                    }
                    self.show_current().await;
                }
                false
            }
        }
    }

    async fn advance(&mut self) -> Option<FileName> {
        self.playlist.advance()?;
        self.show_current().await
    }

    /// Publishes the current photo, dropping names whose cached file is gone
    async fn show_current(&mut self) -> Option<FileName> {
        loop {
            let Some(name) = self.playlist.current().cloned() else {
                self.state.send_replace(self.snapshot());
                return None;
            };
            if self.cache.get(&name).await.is_some() {
                self.state.send_replace(self.snapshot());
                return Some(name);
            }
            warn!(%name, "Cached photo is missing, removing from playlist");
            self.playlist.remove(&name);
        }
    }

    fn snapshot(&self) -> SlideshowState {
        let current = self.playlist.current().cloned();
        SlideshowState {
            state: self.playlist.state(),
            path: current.as_ref().map(|name| self.cache.path_for(name)),
            current,
            position: self.playlist.position(),
            names: self.playlist.names().to_vec(),
        }
    }

    fn notify(&self, notice: Notice) {
        debug!(notice = %notice, "Publishing notice");
        // Fails only when nobody is subscribed.
        let _ = self.notices.send(notice);
    }
}
