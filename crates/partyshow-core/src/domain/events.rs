//! Events exchanged between the sync engine, the sequencer and presentation

use serde::Serialize;

use super::newtypes::FileName;

/// Change to the set of displayable photos, in emission order
///
/// Produced by the sync engine, consumed by exactly one sequencer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// Full reconciliation finished; `names` is the complete sorted set
    FileListReplaced { names: Vec<FileName> },
    /// New final names from one delta batch, sorted
    FilesAdded { names: Vec<FileName> },
    /// A displayable photo was removed
    ///
    /// `announce` is false when the deletion is half of a rename seen in the
    /// same batch; the playlist is still updated but no notice is shown.
    FileDeleted { name: FileName, announce: bool },
}

/// Progress of a reconciliation, for a brief on-screen indication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum SyncProgress {
    /// Listing the remote folder
    Listing,
    /// `done` of `total` downloads finished
    Downloading { done: usize, total: usize },
    /// The change cursor was rejected and a full listing follows
    Resyncing,
}

/// User-facing notification derived from sync events
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// A new photo was posted
    PhotoAdded {
        name: FileName,
        uploader: Option<String>,
    },
    /// A photo was removed from the folder
    PhotoRemoved { name: FileName },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::PhotoAdded {
                uploader: Some(uploader),
                ..
            } => write!(f, "{uploader} posted a new photo"),
            Notice::PhotoAdded { uploader: None, .. } => write!(f, "A new photo was posted"),
            Notice::PhotoRemoved { name } => write!(f, "Removed {name}"),
        }
    }
}
