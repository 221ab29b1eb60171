//! Output pass: lazily loads each file's filtered bookkeeping into a single
//! long-lived [`TextRecordDatabase`], services checkouts against the
//! read-only `DeltaStore` and read-write `CheckoutStore`, and applies the
//! keyword substitution hook to whatever comes back.

use std::collections::HashSet;
use std::sync::Arc;

use borsh::BorshDeserialize;
use tracing::warn;

use crate::backing::{ReadOnlyDeltaBacking, ReadWriteCheckoutBacking};
use crate::error::{Error, ErrorKind};
use crate::ids::{FileId, RevisionId};
use crate::keyword::{FileMode, KeywordExpander, RevisionMetadata};
use crate::record::SerializedRecord;
use crate::record_db::TextRecordDatabase;
use crate::store::{CheckoutStore, DeltaStore, TreeStore};

/// Names one revision together with the file it belongs to, so the reader
/// can tell whether that file's bookkeeping has already been loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RevisionHandle {
    pub file: FileId,
    pub id: RevisionId,
}

pub struct RevisionReader {
    tree_store_filtered: TreeStore,
    text_record_db: TextRecordDatabase,
    loaded_files: HashSet<FileId>,
}

impl RevisionReader {
    pub fn new(delta_store: Arc<DeltaStore>, checkout_store: Arc<CheckoutStore>, tree_store_filtered: TreeStore) -> Self {
        Self {
            tree_store_filtered,
            text_record_db: TextRecordDatabase::new(
                Box::new(ReadOnlyDeltaBacking(delta_store)),
                Box::new(ReadWriteCheckoutBacking(checkout_store)),
            ),
            loaded_files: HashSet::new(),
        }
    }

    fn ensure_loaded(&mut self, file: FileId) -> Result<(), Error> {
        if self.loaded_files.contains(&file) {
            return Ok(());
        }
        let bytes = self
            .tree_store_filtered
            .get(file)?
            .ok_or(ErrorKind::FileMissing { file })?;
        let records: Vec<SerializedRecord> = BorshDeserialize::try_from_slice(&bytes)?;
        for record in records {
            self.text_record_db.add(record.into())?;
        }
        self.loaded_files.insert(file);
        Ok(())
    }

    /// Checks out `rev`'s fulltext and applies keyword substitution unless
    /// the file is binary (`b`) or verbatim (`o`) mode, or the caller asked
    /// for suppression — matching `co -kb`/`co -ko`/`co -kv`.
    #[tracing::instrument(name = "output", skip_all, fields(file = %rev.file, revision = %rev.id))]
    pub fn get_content_stream(
        &mut self,
        rev: RevisionHandle,
        suppress_keyword_substitution: bool,
        file_mode: FileMode,
        metadata: &RevisionMetadata,
    ) -> Result<Vec<u8>, Error> {
        self.ensure_loaded(rev.file)?;
        let text = self.text_record_db.checkout(rev.id)?;

        if file_mode == FileMode::Binary {
            return Ok(text);
        }

        let mode = if suppress_keyword_substitution { FileMode::NameOnly } else { file_mode };
        let expander = KeywordExpander::new(mode);
        Ok(expander.substitute(&text, metadata))
    }

    /// Honors the refcount budget for a revision the pipeline decided not
    /// to emit, without materializing its content.
    pub fn skip_content(&mut self, rev: RevisionHandle) -> Result<(), Error> {
        self.ensure_loaded(rev.file)?;
        let remaining = self.text_record_db.decrement_refcount(rev.id)?;
        if remaining == 0 {
            self.text_record_db.discard(vec![rev.id])?;
        }
        Ok(())
    }

    /// Diagnostic check at the end of the output pass: any record left with
    /// a nonzero refcount indicates a caller requested fewer revisions than
    /// the refcount bookkeeping expected.
    pub fn finish(self) {
        self.text_record_db.log_leftovers();
        if !self.text_record_db.is_empty() {
            warn!(leftover = self.text_record_db.len(), "output pass finished with leftover text records");
        }
    }
}
