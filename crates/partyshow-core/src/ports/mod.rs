//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - Remote content store (Dropbox) listing, change log and download

pub mod remote_store;

pub use remote_store::{
    FolderChange, FolderDelta, FolderListing, IRemoteStore, LongpollResult, RemoteEntry,
    RemoteError,
};
