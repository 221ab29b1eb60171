//! `TextRecordDatabase`: the in-memory bookkeeping graph that tracks, for one
//! file, which revisions exist as records, how they depend on each other,
//! and how many live references each one has. Backed by a [`DeltaBacking`]
//! and a [`CheckoutBacking`] whose concrete behavior changes per pass (see
//! `backing.rs`), so the graph logic itself never has to know which pass is
//! running.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::backing::{CheckoutBacking, DeltaBacking};
use crate::error::{Error, ErrorKind};
use crate::ids::RevisionId;
use crate::rcs::RcsStream;
use crate::record::{FileItems, SerializedRecord, TextRecord};

/// Bookkeeping graph for one file's revisions. Does not own the backing
/// stores directly; it is rebound to a fresh pair of [`DeltaBacking`] /
/// [`CheckoutBacking`] implementations at the start of each pass.
pub struct TextRecordDatabase {
    records: HashMap<RevisionId, TextRecord>,
    delta_backing: Box<dyn DeltaBacking>,
    checkout_backing: Box<dyn CheckoutBacking>,
}

impl TextRecordDatabase {
    pub fn new(
        delta_backing: Box<dyn DeltaBacking>,
        checkout_backing: Box<dyn CheckoutBacking>,
    ) -> Self {
        Self { records: HashMap::new(), delta_backing, checkout_backing }
    }

    /// Rebinds this graph's backings without disturbing the record map.
    /// Used when moving the same in-memory graph from one pass to the next.
    pub fn rebind(
        &mut self,
        delta_backing: Box<dyn DeltaBacking>,
        checkout_backing: Box<dyn CheckoutBacking>,
    ) {
        self.delta_backing = delta_backing;
        self.checkout_backing = checkout_backing;
    }

    pub fn contains(&self, id: RevisionId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn get(&self, id: RevisionId) -> Option<&TextRecord> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = RevisionId> + '_ {
        self.records.keys().copied()
    }

    /// Inserts a brand-new record. Fails if one already exists for this id.
    pub fn add(&mut self, record: TextRecord) -> Result<(), Error> {
        let id = record.id();
        if self.records.insert(id, record).is_some() {
            return Err(ErrorKind::DuplicateRecord { revision: id }.into());
        }
        Ok(())
    }

    /// Writes delta/fulltext bytes for `id` through this graph's current
    /// delta backing. Used by the recorder immediately after `add`, per the
    /// "write a record" contract: `text_record_db.add(record)` paired with
    /// `delta_db[record.id] = bytes`.
    pub fn write_delta_bytes(&self, id: RevisionId, bytes: &[u8]) -> Result<(), Error> {
        self.delta_backing.write(id, bytes)
    }

    /// Replaces an existing record in place, preserving its current refcount.
    /// Used by the recorder when a revision initially recorded as a `Delta`
    /// turns out to be the designated head and must become a `FullText`.
    pub fn replace(&mut self, id: RevisionId, build: impl FnOnce(u32) -> TextRecord) -> Result<(), Error> {
        let refcount = self
            .records
            .get(&id)
            .ok_or_else(|| Error::from(ErrorKind::MissingRecordForReplace { revision: id }))?
            .refcount();
        self.records.insert(id, build(refcount));
        Ok(())
    }

    fn record(&self, id: RevisionId) -> &TextRecord {
        self.records.get(&id).unwrap_or_else(|| panic!("no text record for revision {}", id))
    }

    /// Bumps the refcount of whatever record(s) a given record directly
    /// depends on: a `Delta`'s predecessor. `FullText` and `CheckedOut`
    /// records have no dependency to bump.
    pub fn increment_dependency_refcounts(&mut self, id: RevisionId) {
        if let TextRecord::Delta { pred_id, .. } = *self.record(id) {
            self.bump_refcount(pred_id, 1);
        }
    }

    fn bump_refcount(&mut self, id: RevisionId, delta: i64) {
        let record = *self.record(id);
        let refcount = record.refcount() as i64 + delta;
        debug_assert!(refcount >= 0, "refcount underflow for revision {}", id);
        self.records.insert(id, record.with_refcount(refcount as u32));
    }

    /// Drops one reference to `id`. Returns the record's refcount after the
    /// decrement. Does not discard or free on reaching zero; callers decide
    /// what zero means for their pass.
    pub fn decrement_refcount(&mut self, id: RevisionId) -> Result<u32, Error> {
        let record = *self.record(id);
        if record.refcount() == 0 {
            return Err(ErrorKind::DecrementBelowZero { revision: id }.into());
        }
        let next = record.refcount() - 1;
        self.records.insert(id, record.with_refcount(next));
        Ok(next)
    }

    /// Reconstructs the fulltext of `id` and materializes it into the
    /// CheckoutStore, transitioning the record as appropriate for its kind.
    /// Dispatches per-variant by matching on a cloned snapshot of the small
    /// enum, which sidesteps holding a live borrow of `&TextRecord` across
    /// the recursive call into the predecessor's own `checkout`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn checkout(&mut self, id: RevisionId) -> Result<Vec<u8>, Error> {
        match *self.record(id) {
            TextRecord::FullText { .. } => self.checkout_fulltext(id),
            TextRecord::Delta { pred_id, .. } => self.checkout_delta(id, pred_id),
            TextRecord::CheckedOut { .. } => self.checkout_checked_out(id),
        }
    }

    /// A fulltext never gets cached into CheckoutStore: re-reading it later
    /// is just another direct `delta_backing.read`, with no diff chain to
    /// amortize, so there is nothing worth caching.
    fn checkout_fulltext(&mut self, id: RevisionId) -> Result<Vec<u8>, Error> {
        let bytes = self.delta_backing.read(id)?;
        let remaining = self.decrement_refcount(id)?;
        if remaining == 0 {
            self.free(id)?;
        }
        trace!(revision = %id, "checked out fulltext record");
        Ok(bytes)
    }

    fn checkout_delta(&mut self, id: RevisionId, pred_id: RevisionId) -> Result<Vec<u8>, Error> {
        // This recursive call is the predecessor's *only* decrement for this
        // dependency edge: whichever variant `pred_id` currently is, its own
        // `checkout_*` decrements its refcount by exactly one before
        // returning. Nothing here decrements `pred_id` a second time.
        let pred_text = self.checkout(pred_id)?;

        let diff_bytes = self.delta_backing.read(id)?;
        let stream = RcsStream::new(pred_text);
        let text = stream
            .apply_diff(&diff_bytes)
            .map_err(|reason| Error::malformed(Some(id), reason))?
            .into_text();

        // This record's own refcount is consumed directly by this checkout,
        // independent of decrement_refcount/discard/free: a delta that goes
        // to zero here is not freed, its DeltaStore bytes are left alone by
        // the read-only output-pass binding.
        let record = *self.record(id);
        let refcount = record.refcount();
        if refcount == 0 {
            return Err(ErrorKind::DecrementBelowZero { revision: id }.into());
        }
        let remaining = refcount - 1;
        if remaining == 0 {
            // Never needed again: do not cache it into CheckoutStore.
            self.records.remove(&id);
        } else {
            self.checkout_backing.write(id, text.clone())?;
            self.records.insert(id, TextRecord::CheckedOut { id, refcount: remaining });
        }

        trace!(revision = %id, predecessor = %pred_id, "checked out delta record");
        Ok(text)
    }

    fn checkout_checked_out(&mut self, id: RevisionId) -> Result<Vec<u8>, Error> {
        let bytes = self.checkout_backing.read(id)?;
        let remaining = self.decrement_refcount(id)?;
        if remaining == 0 {
            self.free(id)?;
        }
        trace!(revision = %id, "reused already checked-out record");
        Ok(bytes)
    }

    /// Frees a record whose refcount has reached zero: drops its DeltaStore
    /// bytes (where the current binding supports that) and removes its
    /// bookkeeping entry. Delegates predecessor cleanup to the caller via
    /// `discard`, rather than recursing here.
    pub fn free(&mut self, id: RevisionId) -> Result<(), Error> {
        let record = *self.record(id);
        if record.refcount() != 0 {
            return Err(ErrorKind::DiscardNonzeroRefcount {
                revision: id,
                refcount: record.refcount(),
            }
            .into());
        }
        match record {
            TextRecord::FullText { .. } | TextRecord::Delta { .. } => {
                self.delta_backing.delete(id)?;
            }
            TextRecord::CheckedOut { .. } => {
                self.checkout_backing.delete(id)?;
            }
        }
        self.records.remove(&id);
        trace!(revision = %id, "freed text record");
        Ok(())
    }

    /// Iteratively discards a worklist of revisions whose refcount has
    /// reached zero, cascading to each one's predecessor. Implemented as an
    /// explicit stack rather than recursion: a long trunk chain would
    /// otherwise blow the call stack on discard exactly as it would on
    /// checkout, so the cascade is modeled as a work queue instead.
    pub fn discard(&mut self, ids: Vec<RevisionId>) -> Result<(), Error> {
        let mut pending = ids;
        while let Some(id) = pending.pop() {
            if !self.records.contains_key(&id) {
                continue;
            }
            let record = *self.record(id);
            if record.refcount() != 0 {
                return Err(ErrorKind::DiscardNonzeroRefcount {
                    revision: id,
                    refcount: record.refcount(),
                }
                .into());
            }
            let pred_id = match record {
                TextRecord::Delta { pred_id, .. } => Some(pred_id),
                _ => None,
            };
            self.free(id)?;
            if let Some(pred_id) = pred_id {
                if self.records.contains_key(&pred_id) {
                    let remaining = self.decrement_refcount(pred_id)?;
                    if remaining == 0 {
                        pending.push(pred_id);
                    }
                }
            }
        }
        Ok(())
    }

    /// Recomputes every record's refcount from scratch given the current
    /// wanted set. Each record starts at 1 if directly wanted, 0 otherwise;
    /// a `Delta` then contributes exactly one unit to its predecessor *iff*
    /// its own final refcount is nonzero — checking out a `Delta` invokes
    /// its predecessor's `checkout` exactly once no matter how many times
    /// the delta itself is subsequently read (later reads hit the cached
    /// `CheckedOut` record instead). Used by the recorder at the end of
    /// collection and by the excluder after pruning.
    ///
    /// A record's own refcount depends on its dependents' refcounts, which
    /// must therefore be finalized first: this walks the dependency forest
    /// bottom-up (dependents before predecessors) via a worklist rather
    /// than recursion, tracking how many not-yet-processed dependents each
    /// id still has and only enqueuing a predecessor once all of its
    /// dependents have contributed.
    pub fn recompute_refcounts(&mut self, wanted: &FileItems) {
        let ids: Vec<RevisionId> = self.records.keys().copied().collect();

        for &id in &ids {
            let want = if wanted.is_content_bearing(id) { 1 } else { 0 };
            let record = *self.record(id);
            self.records.insert(id, record.with_refcount(want));
        }

        let mut pending_dependents: HashMap<RevisionId, u32> =
            ids.iter().map(|&id| (id, 0)).collect();
        for &id in &ids {
            if let TextRecord::Delta { pred_id, .. } = *self.record(id) {
                *pending_dependents.get_mut(&pred_id).expect("pred is a recorded id") += 1;
            }
        }

        let mut ready: Vec<RevisionId> =
            ids.iter().copied().filter(|id| pending_dependents[id] == 0).collect();
        while let Some(id) = ready.pop() {
            let record = *self.record(id);
            if let TextRecord::Delta { pred_id, .. } = record {
                if record.refcount() > 0 {
                    self.bump_refcount(pred_id, 1);
                }
                let remaining = pending_dependents.get_mut(&pred_id).expect("pred is a recorded id");
                *remaining -= 1;
                if *remaining == 0 {
                    ready.push(pred_id);
                }
            }
        }
    }

    /// Frees every record left at refcount zero after a `recompute_refcounts`
    /// pass. Returns the number of records freed.
    ///
    /// Calls `free` directly rather than `discard`: `recompute_refcounts`
    /// already computed every record's true final refcount in one bottom-up
    /// sweep, so a record at zero here never held a reservation on its
    /// predecessor to begin with (that reservation is only ever placed when
    /// the dependent's own refcount is nonzero) — there is nothing left to
    /// give back, and no further cascading is needed.
    pub fn free_unused(&mut self) -> Result<usize, Error> {
        let zeroed: Vec<RevisionId> = self
            .records
            .iter()
            .filter(|(_, record)| record.refcount() == 0)
            .map(|(id, _)| *id)
            .collect();
        let freed = zeroed.len();
        for id in zeroed {
            self.free(id)?;
        }
        Ok(freed)
    }

    /// Logs every record still present with a nonzero refcount. Diagnostic
    /// aid for callers that expect the graph to have fully drained by the
    /// time a pass finishes.
    pub fn log_leftovers(&self) {
        for record in self.records.values() {
            if record.refcount() > 0 {
                debug!(revision = %record.id(), refcount = record.refcount(), "leftover text record");
            }
        }
    }

    /// Serializes the bookkeeping graph to the tagged-sum form persisted in
    /// the TreeStore. Backing store bindings are not part of the snapshot.
    pub fn to_snapshot(&self) -> Vec<SerializedRecord> {
        let mut records: Vec<SerializedRecord> =
            self.records.values().map(|record| (*record).into()).collect();
        records.sort_by_key(|record| match record {
            SerializedRecord::FullText { id, .. } => *id,
            SerializedRecord::Delta { id, .. } => *id,
            SerializedRecord::CheckedOut { id, .. } => *id,
        });
        records
    }

    /// Rebuilds a fresh graph from a snapshot, binding it to the given
    /// backings. Used at the start of the filter and output passes.
    pub fn from_snapshot(
        records: Vec<SerializedRecord>,
        delta_backing: Box<dyn DeltaBacking>,
        checkout_backing: Box<dyn CheckoutBacking>,
    ) -> Self {
        let mut db = Self::new(delta_backing, checkout_backing);
        for record in records {
            db.records.insert(record.clone().into_text_id(), record.into());
        }
        db
    }

    /// Replaces this graph's record map with the contents of a snapshot,
    /// keeping the current backing bindings. Used by the output pass to
    /// lazily import one file's graph into the single long-lived database.
    pub fn import_snapshot(&mut self, records: Vec<SerializedRecord>) {
        self.records.clear();
        for record in records {
            self.records.insert(record.into_text_id(), record.into());
        }
    }
}

impl SerializedRecord {
    fn into_text_id(self) -> RevisionId {
        match self {
            SerializedRecord::FullText { id, .. } => RevisionId(id),
            SerializedRecord::Delta { id, .. } => RevisionId(id),
            SerializedRecord::CheckedOut { id, .. } => RevisionId(id),
        }
    }
}
