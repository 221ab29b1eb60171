//! Collection pass: consumes parser events for one CVS file (out of scope:
//! the RCS file parser itself) and builds that file's [`TextRecordDatabase`],
//! writing fulltext/delta bytes to the real `DeltaStore` as it goes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use borsh::BorshSerialize;
use tracing::{info, warn};

use crate::backing::{NullCheckoutBacking, RealDeltaBacking};
use crate::error::Error;
use crate::ids::{FileId, RevisionId};
use crate::rcs::RcsStream;
use crate::record::{FileItems, TextRecord};
use crate::record_db::TextRecordDatabase;
use crate::store::{DeltaStore, TreeStore};

/// Builds one file's bookkeeping graph from a stream of parser events, in
/// the order the RCS file parser naturally emits them: `set_head_revision`,
/// then interleaved `define_revision`/`set_revision_info` calls.
pub struct RevisionRecorder {
    file_id: FileId,
    text_record_db: TextRecordDatabase,
    head_revision: Option<RevisionId>,
    revision_1_1: Option<RevisionId>,
    base_revisions: HashMap<RevisionId, RevisionId>,
    seen: HashSet<RevisionId>,
    stream: Option<RcsStream>,
    stream_revision: Option<RevisionId>,
}

impl RevisionRecorder {
    pub fn new(file_id: FileId, delta_store: Arc<DeltaStore>) -> Self {
        Self {
            file_id,
            text_record_db: TextRecordDatabase::new(
                Box::new(RealDeltaBacking(delta_store)),
                Box::new(NullCheckoutBacking),
            ),
            head_revision: None,
            revision_1_1: None,
            base_revisions: HashMap::new(),
            seen: HashSet::new(),
            stream: None,
            stream_revision: None,
        }
    }

    pub fn set_head_revision(&mut self, rev: RevisionId) {
        self.head_revision = Some(rev);
    }

    /// `next` and `branches` mirror the RCS revision tree's own forward
    /// links. `is_trunk` distinguishes a trunk revision with no `next` (the
    /// chain's root, `1.1`) from a branch tip, since `RevisionId` itself
    /// carries no structural information about where a revision sits in the
    /// CVS revision-number tree — that modeling lives in the out-of-scope
    /// parser/project layer, so the caller must tell us here.
    pub fn define_revision(&mut self, rev: RevisionId, next: Option<RevisionId>, branches: &[RevisionId], is_trunk: bool) {
        for &branch_root in branches {
            self.base_revisions.insert(branch_root, rev);
        }
        if let Some(next) = next {
            self.base_revisions.insert(next, rev);
        } else if is_trunk {
            self.revision_1_1 = Some(rev);
        }
    }

    /// `log` is accepted and ignored: commit-log modeling belongs to the
    /// out-of-scope project/symbol layer, not to this bookkeeping core.
    pub fn set_revision_info(
        &mut self,
        rev: RevisionId,
        _log: &str,
        text: Vec<u8>,
        is_trunk: bool,
    ) -> Result<(), Error> {
        if !self.seen.insert(rev) {
            // Corrupt RCS files occasionally repeat the 1.1 deltatext block.
            warn!(revision = %rev, "ignoring duplicate set_revision_info");
            return Ok(());
        }

        if is_trunk {
            self.record_trunk(rev, text)
        } else {
            self.record_branch(rev, text)
        }
    }

    fn record_trunk(&mut self, rev: RevisionId, text: Vec<u8>) -> Result<(), Error> {
        if self.stream.is_none() {
            // First trunk revision seen is the head: its text is fulltext,
            // not a delta, and seeds the running stream.
            self.stream_revision = Some(rev);
            self.stream = Some(RcsStream::new(text.clone()));
            if Some(rev) == self.revision_1_1 {
                // Single-revision file: head and 1.1 coincide.
                self.emit_fulltext(rev, text)?;
                self.stream = None;
                self.stream_revision = None;
            }
            return Ok(());
        }

        let stream = self.stream.as_ref().expect("trunk stream seeded above");
        let prior_revision = self.stream_revision.expect("stream_revision set with stream");

        let reverse_delta = stream
            .invert_diff(&text)
            .map_err(|reason| Error::malformed(Some(rev), reason))?;
        let advanced = stream
            .apply_diff(&text)
            .map_err(|reason| Error::malformed(Some(rev), reason))?;

        self.emit_delta(prior_revision, rev, reverse_delta)?;

        self.stream = Some(advanced);
        self.stream_revision = Some(rev);

        if Some(rev) == self.revision_1_1 {
            let content = self.stream.as_ref().expect("just set").get_text();
            self.emit_fulltext(rev, content)?;
            self.stream = None;
            self.stream_revision = None;
        }

        Ok(())
    }

    fn record_branch(&mut self, rev: RevisionId, text: Vec<u8>) -> Result<(), Error> {
        let pred_id = *self
            .base_revisions
            .get(&rev)
            .ok_or_else(|| Error::from(crate::error::ErrorKind::MissingBaseRevision { revision: rev }))?;
        self.emit_delta(rev, pred_id, text)
    }

    fn emit_fulltext(&mut self, id: RevisionId, bytes: Vec<u8>) -> Result<(), Error> {
        self.text_record_db.add(TextRecord::FullText { id, refcount: 0 })?;
        self.text_record_db.write_delta_bytes(id, &bytes)?;
        info!(revision = %id, file = %self.file_id, "recorded fulltext");
        Ok(())
    }

    fn emit_delta(&mut self, id: RevisionId, pred_id: RevisionId, bytes: Vec<u8>) -> Result<(), Error> {
        self.text_record_db.add(TextRecord::Delta { id, refcount: 0, pred_id })?;
        self.text_record_db.write_delta_bytes(id, &bytes)?;
        Ok(())
    }

    /// Finalizes the file: prunes the graph down to what `file_items` still
    /// wants and persists the surviving records to the TreeStore.
    #[tracing::instrument(name = "collect", skip_all, fields(file = %self.file_id))]
    pub fn finish(mut self, file_items: &FileItems, tree_store: &TreeStore) -> Result<(), Error> {
        self.text_record_db.recompute_refcounts(file_items);
        self.text_record_db.free_unused()?;
        let snapshot = self.text_record_db.to_snapshot();
        let bytes = snapshot.try_to_vec()?;
        tree_store.put(self.file_id, &bytes)
    }
}
