use std::collections::HashSet;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::ids::RevisionId;

/// Bookkeeping node for one revision. `FullText` and `Delta` are created by
/// the recorder during collection; `CheckedOut` only arises during the
/// output pass, once a `Delta` has been checked out but is still referenced
/// by something else.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextRecord {
    FullText { id: RevisionId, refcount: u32 },
    Delta { id: RevisionId, refcount: u32, pred_id: RevisionId },
    CheckedOut { id: RevisionId, refcount: u32 },
}

impl TextRecord {
    pub fn id(&self) -> RevisionId {
        match *self {
            TextRecord::FullText { id, .. } => id,
            TextRecord::Delta { id, .. } => id,
            TextRecord::CheckedOut { id, .. } => id,
        }
    }

    pub fn refcount(&self) -> u32 {
        match *self {
            TextRecord::FullText { refcount, .. } => refcount,
            TextRecord::Delta { refcount, .. } => refcount,
            TextRecord::CheckedOut { refcount, .. } => refcount,
        }
    }

    pub(crate) fn with_refcount(self, refcount: u32) -> Self {
        match self {
            TextRecord::FullText { id, .. } => TextRecord::FullText { id, refcount },
            TextRecord::Delta { id, pred_id, .. } => TextRecord::Delta { id, refcount, pred_id },
            TextRecord::CheckedOut { id, .. } => TextRecord::CheckedOut { id, refcount },
        }
    }
}

/// On-disk tagged-sum form of a [`TextRecord`], persisted as part of a
/// `TextRecordDatabase` snapshot. Serialization does not carry the backing
/// store references — those are rebound by the caller after load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum SerializedRecord {
    FullText { id: u64, refcount: u32 },
    Delta { id: u64, refcount: u32, pred_id: u64 },
    CheckedOut { id: u64, refcount: u32 },
}

impl From<TextRecord> for SerializedRecord {
    fn from(record: TextRecord) -> Self {
        match record {
            TextRecord::FullText { id, refcount } => {
                SerializedRecord::FullText { id: id.0, refcount }
            }
            TextRecord::Delta { id, refcount, pred_id } => {
                SerializedRecord::Delta { id: id.0, refcount, pred_id: pred_id.0 }
            }
            TextRecord::CheckedOut { id, refcount } => {
                SerializedRecord::CheckedOut { id: id.0, refcount }
            }
        }
    }
}

impl From<SerializedRecord> for TextRecord {
    fn from(record: SerializedRecord) -> Self {
        match record {
            SerializedRecord::FullText { id, refcount } => {
                TextRecord::FullText { id: RevisionId(id), refcount }
            }
            SerializedRecord::Delta { id, refcount, pred_id } => {
                TextRecord::Delta { id: RevisionId(id), refcount, pred_id: RevisionId(pred_id) }
            }
            SerializedRecord::CheckedOut { id, refcount } => {
                TextRecord::CheckedOut { id: RevisionId(id), refcount }
            }
        }
    }
}

/// The downstream pipeline's view of which revisions of one file are still
/// wanted, and which of those carry content (as opposed to a pure deletion).
/// Stands in for the out-of-scope project/symbol model during
/// `recompute_refcounts`.
#[derive(Default, Debug, Clone)]
pub struct FileItems {
    content_bearing: HashSet<RevisionId>,
}

impl FileItems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_content_bearing(&mut self, id: RevisionId) -> &mut Self {
        self.content_bearing.insert(id);
        self
    }

    pub fn is_content_bearing(&self, id: RevisionId) -> bool {
        self.content_bearing.contains(&id)
    }
}
