//! PartyShow Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `FileName`, `Cursor`, `RemotePath`, `SyncEvent`
//! - **Filename classifier** - final vs transient upload names, uploader extraction
//! - **Playlist** - the ordered slideshow sequence and its state machine
//! - **Port definitions** - `IRemoteStore`, the remote content store boundary
//!
//! # Architecture
//!
//! The domain module contains pure logic with no I/O. Ports define the
//! trait interfaces that adapter crates (Dropbox, local cache) implement.

pub mod config;
pub mod domain;
pub mod ports;
