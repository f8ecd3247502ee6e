//! Playlist state machine
//!
//! ## States
//!
//! ```text
//!            replace(non-empty) / insert_added
//!   Empty  ------------------------------------>  Playing
//!          <------------------------------------
//!            replace(empty) / remove(last name)
//! ```
//!
//! `advance()` only moves the position inside **Playing**.
//!
//! ## Ordering
//!
//! A full replacement is sorted lexicographically. Names added later are
//! sorted among themselves and spliced in right after the current photo so
//! they are shown next instead of after the whole backlog.

use std::collections::BTreeSet;

use serde::Serialize;

use super::newtypes::FileName;

/// Whether there is anything to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistState {
    /// No displayable content
    Empty,
    /// At least one photo; advanced periodically
    Playing,
}

/// Ordered, duplicate-free slideshow sequence with a current position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    names: Vec<FileName>,
    current: usize,
}

impl Playlist {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> PlaylistState {
        if self.names.is_empty() {
            PlaylistState::Empty
        } else {
            PlaylistState::Playing
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> &[FileName] {
        &self.names
    }

    #[must_use]
    pub fn contains(&self, name: &FileName) -> bool {
        self.names.contains(name)
    }

    /// Index of the current photo, `None` when empty
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        (!self.names.is_empty()).then_some(self.current)
    }

    #[must_use]
    pub fn current(&self) -> Option<&FileName> {
        self.names.get(self.current)
    }

    /// `(1-based position, length)` for an on-screen counter
    #[must_use]
    pub fn position(&self) -> Option<(usize, usize)> {
        self.current_index().map(|idx| (idx + 1, self.names.len()))
    }

    /// Replace the whole list, sorted and deduplicated, and rewind to the start
    pub fn replace(&mut self, names: impl IntoIterator<Item = FileName>) {
        let unique: BTreeSet<FileName> = names.into_iter().collect();
        self.names = unique.into_iter().collect();
        self.current = 0;
    }

    /// Insert names that are not yet present right after the current photo
    ///
    /// Returns the names actually inserted, sorted. Names already in the
    /// list (e.g. an edited photo re-downloaded under the same name) are
    /// skipped.
    pub fn insert_added(&mut self, names: impl IntoIterator<Item = FileName>) -> Vec<FileName> {
        let fresh: Vec<FileName> = names
            .into_iter()
            .filter(|name| !self.names.contains(name))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if fresh.is_empty() {
            return fresh;
        }

        if self.names.is_empty() {
            self.names = fresh.clone();
            self.current = 0;
        } else {
            let at = self.current + 1;
            self.names.splice(at..at, fresh.iter().cloned());
        }
        fresh
    }

    /// Remove `name` if present
    ///
    /// If the current photo was removed, or the position fell off the end,
    /// the position is re-anchored to the start. Returns whether the name
    /// was present.
    pub fn remove(&mut self, name: &FileName) -> bool {
        let Some(idx) = self.names.iter().position(|n| n == name) else {
            return false;
        };

        self.names.remove(idx);
        if idx == self.current || self.current >= self.names.len() {
            self.current = 0;
        }
        true
    }

    /// Move to the next photo, wrapping around, and return it
    ///
    /// No-op returning `None` when empty.
    pub fn advance(&mut self) -> Option<&FileName> {
        if self.names.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.names.len();
        self.names.get(self.current)
    }
}
