//! Filter pass: loads each file's collected bookkeeping, recomputes
//! refcounts against a pruned view of what the downstream pipeline still
//! wants (excluded symbols/branches removed upstream), and persists the
//! survivors to a second, filtered TreeStore. Bookkeeping-only: no delta
//! bytes are ever read or freed on disk here, a deliberate inefficiency
//! traded for pass isolation.

use borsh::{BorshDeserialize, BorshSerialize};
use tracing::info;

use crate::backing::{NullCheckoutBacking, NullDeltaBacking};
use crate::error::{Error, ErrorKind};
use crate::ids::FileId;
use crate::record::{FileItems, SerializedRecord};
use crate::record_db::TextRecordDatabase;
use crate::store::TreeStore;

pub struct RevisionExcluder {
    source: TreeStore,
    filtered: TreeStore,
}

impl RevisionExcluder {
    pub fn new(source: TreeStore, filtered: TreeStore) -> Self {
        Self { source, filtered }
    }

    /// Loads `file`'s snapshot, recomputes refcounts against `file_items`
    /// (already pruned of excluded symbols/branches by the caller), frees
    /// whatever that drops to zero, and writes the result to the filtered
    /// TreeStore.
    #[tracing::instrument(name = "filter", skip_all, fields(file = %file))]
    pub fn exclude_file(&self, file: FileId, file_items: &FileItems) -> Result<(), Error> {
        let bytes = self
            .source
            .get(file)?
            .ok_or(ErrorKind::FileMissing { file })?;
        let records: Vec<SerializedRecord> = BorshDeserialize::try_from_slice(&bytes)?;

        let mut db = TextRecordDatabase::from_snapshot(
            records,
            Box::new(NullDeltaBacking),
            Box::new(NullCheckoutBacking),
        );
        let before = db.len();
        db.recompute_refcounts(file_items);
        let freed = db.free_unused()?;
        info!(file = %file, before, freed, "filtered file");

        let snapshot = db.to_snapshot();
        let out = snapshot.try_to_vec()?;
        self.filtered.put(file, &out)
    }

    /// Copies a file's snapshot through to the filtered TreeStore verbatim,
    /// for files the exclusion policy does not touch at all.
    #[tracing::instrument(name = "filter", skip_all, fields(file = %file))]
    pub fn copy_through(&self, file: FileId) -> Result<(), Error> {
        let bytes = self
            .source
            .get(file)?
            .ok_or(ErrorKind::FileMissing { file })?;
        self.filtered.put(file, &bytes)
    }
}
