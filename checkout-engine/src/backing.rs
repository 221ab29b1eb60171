//! Wrappers that give a [`TextRecordDatabase`](crate::record_db::TextRecordDatabase)
//! pass-specific read/write/delete semantics over the real [`DeltaStore`] and
//! [`CheckoutStore`], instead of threading an open-mode flag through every
//! call site: per-column behavior wired in at construction time rather than
//! checked as a runtime branch on every call.

use std::sync::Arc;

use crate::error::Error;
use crate::ids::RevisionId;
use crate::store::{CheckoutStore, DeltaStore};

pub trait DeltaBacking: Send + Sync {
    fn read(&self, id: RevisionId) -> Result<Vec<u8>, Error>;
    fn write(&self, id: RevisionId, bytes: &[u8]) -> Result<(), Error>;
    fn delete(&self, id: RevisionId) -> Result<(), Error>;
}

pub trait CheckoutBacking: Send + Sync {
    fn read(&self, id: RevisionId) -> Result<Vec<u8>, Error>;
    fn write(&self, id: RevisionId, bytes: Vec<u8>) -> Result<(), Error>;
    fn delete(&self, id: RevisionId) -> Result<(), Error>;
}

/// Collect pass: full read/write/delete against the real DeltaStore. The
/// recorder writes new fulltext/delta bytes here directly; `free_unused`
/// deletes entries for discarded records.
pub struct RealDeltaBacking(pub Arc<DeltaStore>);

impl DeltaBacking for RealDeltaBacking {
    fn read(&self, id: RevisionId) -> Result<Vec<u8>, Error> {
        self.0.get(id)
    }
    fn write(&self, id: RevisionId, bytes: &[u8]) -> Result<(), Error> {
        self.0.put(id, bytes)
    }
    fn delete(&self, id: RevisionId) -> Result<(), Error> {
        self.0.delete(id)
    }
}

/// Output pass: the real DeltaStore, opened read-only. Deletion requests
/// happen on the happy path (a `Delta` consumed to extinction still calls
/// `free`) but must not fail or touch the read-only store, so they are
/// silently dropped.
pub struct ReadOnlyDeltaBacking(pub Arc<DeltaStore>);

impl DeltaBacking for ReadOnlyDeltaBacking {
    fn read(&self, id: RevisionId) -> Result<Vec<u8>, Error> {
        self.0.get(id)
    }
    fn write(&self, _id: RevisionId, _bytes: &[u8]) -> Result<(), Error> {
        Err(Error::backing_unsupported("write against a read-only DeltaStore binding"))
    }
    fn delete(&self, _id: RevisionId) -> Result<(), Error> {
        Ok(())
    }
}

/// Filter pass: bookkeeping-only. No delta bytes are ever loaded or freed on
/// disk here — a deliberate trade-off documented as a known inefficiency.
pub struct NullDeltaBacking;

impl DeltaBacking for NullDeltaBacking {
    fn read(&self, id: RevisionId) -> Result<Vec<u8>, Error> {
        Err(Error::backing_unsupported(format!("read against null delta backing for {}", id)))
    }
    fn write(&self, _id: RevisionId, _bytes: &[u8]) -> Result<(), Error> {
        Err(Error::backing_unsupported("write against null delta backing"))
    }
    fn delete(&self, _id: RevisionId) -> Result<(), Error> {
        Ok(())
    }
}

/// Collect and filter passes: no checkouts ever happen, so this backing
/// should never be touched; any call indicates a programming error upstream.
pub struct NullCheckoutBacking;

impl CheckoutBacking for NullCheckoutBacking {
    fn read(&self, id: RevisionId) -> Result<Vec<u8>, Error> {
        Err(Error::backing_unsupported(format!("read against null checkout backing for {}", id)))
    }
    fn write(&self, id: RevisionId, _bytes: Vec<u8>) -> Result<(), Error> {
        Err(Error::backing_unsupported(format!("write against null checkout backing for {}", id)))
    }
    fn delete(&self, _id: RevisionId) -> Result<(), Error> {
        Ok(())
    }
}

/// Output pass: full read/write/delete against the real CheckoutStore.
pub struct ReadWriteCheckoutBacking(pub Arc<CheckoutStore>);

impl CheckoutBacking for ReadWriteCheckoutBacking {
    fn read(&self, id: RevisionId) -> Result<Vec<u8>, Error> {
        self.0.get(id)
    }
    fn write(&self, id: RevisionId, bytes: Vec<u8>) -> Result<(), Error> {
        self.0.put(id, &bytes)
    }
    fn delete(&self, id: RevisionId) -> Result<(), Error> {
        self.0.delete(id)
    }
}
