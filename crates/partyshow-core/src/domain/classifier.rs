//! Filename classifier
//!
//! Upload clients encode metadata in the file name. This module is the only
//! place that parses it; everything else asks the classifier.
//!
//! ## Rules
//!
//! All rules look at the *stem*, the name with its final extension removed.
//!
//! - **Transient**: the stem contains `" - "` immediately followed by a
//!   `YYYYMMDD_HHMMSS` timestamp (not followed by a further digit). These are
//!   in-progress upload artifacts that the remote renames moments later.
//! - **Duplicate** (opt-in): the stem ends with a copy suffix such as `" (1)"`.
//! - **Final**: everything else.
//!
//! The uploader of a final name is the text after the *first* space of the
//! stem, trimmed. `"20240101_100000 Bob Smith.jpg"` yields `"Bob Smith"`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::newtypes::FileName;
use crate::config::ClassifierConfig;

static TRANSIENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" - \d{8}_\d{6}(?:\D|$)").expect("transient pattern is valid"));

static DUPLICATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s\(\d+\)$").expect("duplicate pattern is valid"));

/// What kind of upload a name represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameKind {
    /// A completed, displayable upload
    Final,
    /// An in-progress upload artifact awaiting rename
    Transient,
    /// A copy suffix such as `" (1)"`, excluded by configuration
    Duplicate,
}

/// Result of classifying a single name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedName {
    pub kind: NameKind,
    /// Display name of the uploader; only ever set for final names
    pub uploader: Option<String>,
}

impl ClassifiedName {
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.kind == NameKind::Final
    }
}

/// Classifies remote file names as final or not and extracts the uploader
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameClassifier {
    exclude_duplicates: bool,
}

impl FilenameClassifier {
    #[must_use]
    pub fn new(exclude_duplicates: bool) -> Self {
        Self { exclude_duplicates }
    }

    #[must_use]
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.exclude_duplicates)
    }

    /// Classify `name`
    #[must_use]
    pub fn classify(&self, name: &FileName) -> ClassifiedName {
        let stem = name.stem();

        if TRANSIENT_PATTERN.is_match(stem) {
            return ClassifiedName {
                kind: NameKind::Transient,
                uploader: None,
            };
        }

        if self.exclude_duplicates && DUPLICATE_PATTERN.is_match(stem) {
            return ClassifiedName {
                kind: NameKind::Duplicate,
                uploader: None,
            };
        }

        ClassifiedName {
            kind: NameKind::Final,
            uploader: uploader_from_stem(stem),
        }
    }

    /// Shorthand for `classify(name).is_final()`
    #[must_use]
    pub fn is_final(&self, name: &FileName) -> bool {
        self.classify(name).is_final()
    }
}

fn uploader_from_stem(stem: &str) -> Option<String> {
    let (_, tail) = stem.split_once(' ')?;
    let tail = tail.trim();
    if tail.is_empty() {
        None
    } else {
        Some(tail.to_string())
    }
}
