//! Domain types and business logic
//!
//! This module contains the core domain types for PartyShow:
//! - Newtypes for validated names, paths and cursors
//! - The filename classifier (final vs transient uploads)
//! - The playlist state machine driving the slideshow
//! - Sync events exchanged between the engine and the sequencer
//! - Domain-specific error types

pub mod classifier;
pub mod errors;
pub mod events;
pub mod newtypes;
pub mod playlist;

// Re-export commonly used types
pub use classifier::{ClassifiedName, FilenameClassifier, NameKind};
pub use errors::DomainError;
pub use events::{Notice, SyncEvent, SyncProgress};
pub use newtypes::*;
pub use playlist::{Playlist, PlaylistState};
