//! Per-pass database configuration: where the three persistent artifacts
//! live and which column subset each pass opens them with. Collect, filter
//! and output each get exactly the columns they touch, inside one shared
//! `rocksdb::DB` at `root` (mirroring `core/store`'s single-database,
//! multiple-column-family layout rather than one file per artifact).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::database::{Column, Database, OpenMode, RocksDatabase};
use crate::error::Error;
use crate::store::{CheckoutStore, DeltaStore, TreeStore};

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    root: PathBuf,
}

impl CheckoutConfig {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    /// Collect pass: `rcs-deltas` and `rcs-trees`, both read-write, created
    /// fresh (the pass builds both from scratch out of the RCS parser feed).
    pub fn open_for_collect(&self) -> Result<(DeltaStore, TreeStore), Error> {
        let columns = [Column::RcsDeltas, Column::RcsTrees];
        let db = self.open(OpenMode::New, &columns)?;
        Ok((DeltaStore::bind(db.clone()), TreeStore::bind(db, Column::RcsTrees)))
    }

    /// Filter pass: `rcs-trees` (read by convention only — nothing in this
    /// pass calls `put` on it) plus `rcs-trees-filtered`, whose column family
    /// is created fresh the first time this pass runs against a given root.
    pub fn open_for_filter(&self) -> Result<(TreeStore, TreeStore), Error> {
        let columns = [Column::RcsTrees, Column::RcsTreesFiltered];
        let db = self.open(OpenMode::Existing, &columns)?;
        Ok((
            TreeStore::bind(db.clone(), Column::RcsTrees),
            TreeStore::bind(db, Column::RcsTreesFiltered),
        ))
    }

    /// Output pass: `rcs-deltas` and `rcs-trees-filtered`, both read by
    /// convention only, plus `cvs-checkout` read-write (its column family is
    /// created the first time this pass runs). All three are opened
    /// through the same read-write `rocksdb::DB` handle — RocksDB has no way
    /// to mix a read-only and a writable column family in one handle — with
    /// read-only access to the first two enforced one layer up, by
    /// [`crate::backing::ReadOnlyDeltaBacking`].
    pub fn open_for_output(&self) -> Result<(DeltaStore, TreeStore, CheckoutStore), Error> {
        let columns = [Column::RcsDeltas, Column::RcsTreesFiltered, Column::CvsCheckout];
        let db = self.open(OpenMode::Existing, &columns)?;
        Ok((
            DeltaStore::bind(db.clone()),
            TreeStore::bind(db.clone(), Column::RcsTreesFiltered),
            CheckoutStore::bind(db),
        ))
    }

    fn open(&self, mode: OpenMode, columns: &[Column]) -> Result<Arc<dyn Database>, Error> {
        Ok(Arc::new(RocksDatabase::open(&self.root, mode, columns)?))
    }
}
