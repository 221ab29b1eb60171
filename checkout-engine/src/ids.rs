use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};

/// Opaque identifier for one historical revision of one file. Stable across
/// passes; carries no information about the revision's place in the CVS
/// revision-number tree (that modeling lives in the out-of-scope project
/// layer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
pub struct RevisionId(pub u64);

impl RevisionId {
    /// Big-endian key bytes used by DeltaStore and TreeStore, where lexical
    /// key ordering matching numeric ordering is convenient but not required.
    pub fn key_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// CheckoutStore keys revisions by their lowercase hex rendering, per the
    /// external artifact contract.
    pub fn hex_key(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex_key())
    }
}

/// Opaque identifier for one CVS file, used as the TreeStore key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
pub struct FileId(pub u64);

impl FileId {
    pub fn key_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
