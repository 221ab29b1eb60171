use std::sync::Arc;

use crate::database::{Column, Database, MemoryDatabase};
use crate::error::{Error, ErrorKind};
use crate::ids::{FileId, RevisionId};

/// Persistent, indexed mapping `rev_id -> bytes` holding fulltext (for seed
/// revisions) and RCS delta text. Backing column: `rcs-deltas`.
#[derive(Clone)]
pub struct DeltaStore {
    db: Arc<dyn Database>,
}

impl DeltaStore {
    /// Binds to a column inside an already-opened database; use
    /// [`crate::config::CheckoutConfig`] to open one for a given pass rather
    /// than constructing a `Database` directly.
    pub fn bind(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub fn in_memory() -> Self {
        Self { db: Arc::new(MemoryDatabase::new()) }
    }

    pub fn get(&self, id: RevisionId) -> Result<Vec<u8>, Error> {
        self.db
            .get(Column::RcsDeltas, &id.key_bytes())?
            .ok_or(ErrorKind::StoreMissing { revision: id }.into())
    }

    pub fn put(&self, id: RevisionId, bytes: &[u8]) -> Result<(), Error> {
        self.db.put(Column::RcsDeltas, &id.key_bytes(), bytes)
    }

    pub fn delete(&self, id: RevisionId) -> Result<(), Error> {
        self.db.delete(Column::RcsDeltas, &id.key_bytes())
    }
}

/// Persistent mapping `rev_id -> bytes` holding materialized fulltexts of
/// revisions still referenced. Backing column: `cvs-checkout`. Keyed by the
/// lowercase hex rendering of the revision id, per the external contract.
#[derive(Clone)]
pub struct CheckoutStore {
    db: Arc<dyn Database>,
}

impl CheckoutStore {
    pub fn bind(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub fn in_memory() -> Self {
        Self { db: Arc::new(MemoryDatabase::new()) }
    }

    pub fn get(&self, id: RevisionId) -> Result<Vec<u8>, Error> {
        self.db
            .get(Column::CvsCheckout, id.hex_key().as_bytes())?
            .ok_or(ErrorKind::StoreMissing { revision: id }.into())
    }

    pub fn put(&self, id: RevisionId, bytes: &[u8]) -> Result<(), Error> {
        self.db.put(Column::CvsCheckout, id.hex_key().as_bytes(), bytes)
    }

    pub fn delete(&self, id: RevisionId) -> Result<(), Error> {
        self.db.delete(Column::CvsCheckout, id.hex_key().as_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.db.iter(Column::CvsCheckout).next().is_none()
    }
}

/// Persistent mapping `file_id -> TextRecordDatabase-snapshot` carrying
/// per-file bookkeeping across passes. Two logical uses share this type:
/// the unfiltered tree built by the collect pass (`Column::RcsTrees`) and the
/// filtered copy the filter pass builds from it (`Column::RcsTreesFiltered`).
#[derive(Clone)]
pub struct TreeStore {
    db: Arc<dyn Database>,
    column: Column,
}

impl TreeStore {
    pub fn bind(db: Arc<dyn Database>, column: Column) -> Self {
        Self { db, column }
    }

    pub fn in_memory(column: Column) -> Self {
        Self { db: Arc::new(MemoryDatabase::new()), column }
    }

    pub fn get(&self, file: FileId) -> Result<Option<Vec<u8>>, Error> {
        self.db.get(self.column, &file.key_bytes())
    }

    pub fn put(&self, file: FileId, bytes: &[u8]) -> Result<(), Error> {
        self.db.put(self.column, &file.key_bytes(), bytes)
    }

    pub fn file_ids(&self) -> Vec<FileId> {
        self.db
            .iter(self.column)
            .map(|(key, _)| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&key[..8]);
                FileId(u64::from_be_bytes(buf))
            })
            .collect()
    }
}
