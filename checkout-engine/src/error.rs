use thiserror::Error;

use crate::ids::RevisionId;

/// Structured cause carried by [`Error`]. Mirrors the `ErrorKind` convention
/// used by `near-chain`'s `error.rs`: one variant per distinguishable failure,
/// each embedding the id that was involved so a caller can log or match on it
/// without string parsing.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("malformed RCS delta for revision {revision:?}: {reason}")]
    MalformedDelta { revision: Option<RevisionId>, reason: String },

    #[error("discard requested for revision {revision} with nonzero refcount {refcount}")]
    DiscardNonzeroRefcount { revision: RevisionId, refcount: u32 },

    #[error("decrement requested for revision {revision} already at refcount zero")]
    DecrementBelowZero { revision: RevisionId },

    #[error("duplicate text record inserted for revision {revision}")]
    DuplicateRecord { revision: RevisionId },

    #[error("replace requested for revision {revision} with no existing text record")]
    MissingRecordForReplace { revision: RevisionId },

    #[error("no base revision recorded for branch revision {revision}")]
    MissingBaseRevision { revision: RevisionId },

    #[error("revision {revision} missing from backing store")]
    StoreMissing { revision: RevisionId },

    #[error("file {file} missing from TreeStore")]
    FileMissing { file: crate::ids::FileId },

    #[error("operation unsupported by this store binding: {0}")]
    BackingUnsupported(String),

    #[error("column family {name} missing from an opened database")]
    MissingColumnFamily { name: &'static str },

    #[error(transparent)]
    StoreIo(#[from] std::io::Error),

    #[error(transparent)]
    Rocks(#[from] rocksdb::Error),
}

/// Crate-wide error type. A thin wrapper over [`ErrorKind`], following the
/// `RpcBlockError`/`near-chain` `Error` convention of deriving entirely via
/// `thiserror` rather than hand-rolling `Display`/`std::error::Error`.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
}

impl Error {
    pub fn malformed(revision: Option<RevisionId>, reason: impl Into<String>) -> Self {
        ErrorKind::MalformedDelta { revision, reason: reason.into() }.into()
    }

    pub fn backing_unsupported(what: impl Into<String>) -> Self {
        ErrorKind::BackingUnsupported(what.into()).into()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { kind }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        ErrorKind::Rocks(err).into()
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        ErrorKind::StoreIo(err).into()
    }
}
