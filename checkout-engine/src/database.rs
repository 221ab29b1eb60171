use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, DB};

use crate::error::{Error, ErrorKind};

/// One on-disk column family. `RcsTrees` and `RcsTreesFiltered` share a
/// schema (file id -> per-file bookkeeping snapshot) but are kept in
/// separate columns so the filter pass can hold both the source tree and the
/// filtered copy it is building open at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    RcsDeltas,
    RcsTrees,
    RcsTreesFiltered,
    CvsCheckout,
}

impl Column {
    fn name(&self) -> &'static str {
        match self {
            Column::RcsDeltas => "rcs-deltas",
            Column::RcsTrees => "rcs-trees",
            Column::RcsTreesFiltered => "rcs-trees-filtered",
            Column::CvsCheckout => "cvs-checkout",
        }
    }
}

/// How a backing store was opened. `New` creates (truncating any prior
/// contents); `Existing` opens a database that must already be present.
///
/// Both modes open the underlying `rocksdb::DB` read-write regardless of
/// which columns a pass logically treats as read-only: RocksDB's
/// `open_for_read_only` handle can't also hold a writable column, and the
/// output pass needs `cvs-checkout` writable alongside `rcs-deltas` and
/// `rcs-trees-filtered` read-only in the same handle. Per-pass read-only
/// enforcement instead happens one layer up, in the `backing` module's
/// wrapper types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    New,
    Existing,
}

/// Flat key/value contract each on-disk artifact is built on, parameterized
/// by column so one storage engine handle can back all of them. The storage
/// engine behind it (we use `rocksdb`) is an external collaborator referenced
/// only through this trait, so tests can swap in an in-memory stand-in
/// without touching any of the call sites above it.
pub trait Database: Send + Sync {
    fn get(&self, col: Column, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;
    fn put(&self, col: Column, key: &[u8], value: &[u8]) -> Result<(), Error>;
    fn delete(&self, col: Column, key: &[u8]) -> Result<(), Error>;
    fn iter<'a>(&'a self, col: Column) -> Box<dyn Iterator<Item = (Box<[u8]>, Box<[u8]>)> + 'a>;
}

/// Single `rocksdb::DB` handle shared by every column it was opened with,
/// mirroring `core/store`'s single-database-multiple-column-family layout
/// rather than one file per artifact. Column family handles are resolved
/// once at open time and cached as raw pointers, the same trick
/// `core/store::RocksDB` uses: the pointee lives exactly as long as `db`
/// does, and a resolved `rocksdb::ColumnFamily` handle is safe to share
/// across threads.
pub struct RocksDatabase {
    db: DB,
    cfs: HashMap<Column, *const ColumnFamily>,
}

// `DB` is already Send+Sync; the raw pointers in `cfs` point into `db` and
// are never invalidated or mutated after open, so sharing them is sound.
unsafe impl Send for RocksDatabase {}
unsafe impl Sync for RocksDatabase {}

impl RocksDatabase {
    /// Opens a database exposing exactly `columns`, creating any column
    /// family that doesn't yet exist. Callers pass the per-pass column
    /// subset (see `CheckoutConfig`) so a pass never holds a handle to a
    /// column it has no business touching.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode, columns: &[Column]) -> Result<Self, Error> {
        let path = path.as_ref();
        if mode == OpenMode::New && path.exists() {
            std::fs::remove_dir_all(path)?;
        }

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors =
            columns.iter().map(|col| ColumnFamilyDescriptor::new(col.name(), Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        let mut cfs = HashMap::with_capacity(columns.len());
        for col in columns {
            let handle = db
                .cf_handle(col.name())
                .ok_or(ErrorKind::MissingColumnFamily { name: col.name() })?;
            cfs.insert(*col, handle as *const ColumnFamily);
        }

        Ok(Self { db, cfs })
    }

    fn cf(&self, col: Column) -> Result<&ColumnFamily, Error> {
        self.cfs
            .get(&col)
            .map(|ptr| unsafe { &**ptr })
            .ok_or(ErrorKind::MissingColumnFamily { name: col.name() }.into())
    }
}

impl Database for RocksDatabase {
    fn get(&self, col: Column, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.db.get_cf(self.cf(col)?, key)?)
    }

    fn put(&self, col: Column, key: &[u8], value: &[u8]) -> Result<(), Error> {
        Ok(self.db.put_cf(self.cf(col)?, key, value)?)
    }

    fn delete(&self, col: Column, key: &[u8]) -> Result<(), Error> {
        Ok(self.db.delete_cf(self.cf(col)?, key)?)
    }

    fn iter<'a>(&'a self, col: Column) -> Box<dyn Iterator<Item = (Box<[u8]>, Box<[u8]>)> + 'a> {
        match self.cf(col) {
            Ok(cf) => Box::new(self.db.iterator_cf(cf, IteratorMode::Start)),
            Err(_) => Box::new(std::iter::empty()),
        }
    }
}

/// In-memory `Database` standing in for `RocksDatabase` in unit tests, one
/// table per column so cross-column isolation (e.g. `RcsTrees` vs.
/// `RcsTreesFiltered`) is preserved the same way it is on disk.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: RwLock<HashMap<Column, HashMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Database for MemoryDatabase {
    fn get(&self, col: Column, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.tables.read().unwrap().get(&col).and_then(|table| table.get(key).cloned()))
    }

    fn put(&self, col: Column, key: &[u8], value: &[u8]) -> Result<(), Error> {
        self.tables.write().unwrap().entry(col).or_default().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, col: Column, key: &[u8]) -> Result<(), Error> {
        if let Some(table) = self.tables.write().unwrap().get_mut(&col) {
            table.remove(key);
        }
        Ok(())
    }

    fn iter<'a>(&'a self, col: Column) -> Box<dyn Iterator<Item = (Box<[u8]>, Box<[u8]>)> + 'a> {
        let snapshot: Vec<_> = self
            .tables
            .read()
            .unwrap()
            .get(&col)
            .map(|table| {
                table
                    .iter()
                    .map(|(k, v)| (k.clone().into_boxed_slice(), v.clone().into_boxed_slice()))
                    .collect()
            })
            .unwrap_or_default();
        Box::new(snapshot.into_iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rocks_database_roundtrips_through_a_real_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkout-engine-db");

        {
            let db = RocksDatabase::open(&path, OpenMode::New, &[Column::RcsDeltas]).unwrap();
            db.put(Column::RcsDeltas, b"1.1", b"fulltext bytes").unwrap();
            db.put(Column::RcsDeltas, b"1.2", b"delta bytes").unwrap();
            db.delete(Column::RcsDeltas, b"1.2").unwrap();
        }

        let db = RocksDatabase::open(&path, OpenMode::Existing, &[Column::RcsDeltas]).unwrap();
        assert_eq!(db.get(Column::RcsDeltas, b"1.1").unwrap(), Some(b"fulltext bytes".to_vec()));
        assert_eq!(db.get(Column::RcsDeltas, b"1.2").unwrap(), None);
    }

    #[test]
    fn open_new_truncates_an_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkout-engine-db");

        let first = RocksDatabase::open(&path, OpenMode::New, &[Column::RcsDeltas]).unwrap();
        first.put(Column::RcsDeltas, b"stale", b"left over from a prior run").unwrap();
        drop(first);

        let second = RocksDatabase::open(&path, OpenMode::New, &[Column::RcsDeltas]).unwrap();
        assert_eq!(second.get(Column::RcsDeltas, b"stale").unwrap(), None);
    }

    #[test]
    fn columns_stay_isolated_in_the_same_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkout-engine-db");
        let columns = [Column::RcsDeltas, Column::RcsTrees, Column::RcsTreesFiltered, Column::CvsCheckout];

        let db = RocksDatabase::open(&path, OpenMode::New, &columns).unwrap();
        db.put(Column::RcsTrees, b"k", b"source").unwrap();
        db.put(Column::RcsTreesFiltered, b"k", b"filtered").unwrap();

        assert_eq!(db.get(Column::RcsTrees, b"k").unwrap(), Some(b"source".to_vec()));
        assert_eq!(db.get(Column::RcsTreesFiltered, b"k").unwrap(), Some(b"filtered".to_vec()));
        assert_eq!(db.get(Column::CvsCheckout, b"k").unwrap(), None);
    }
}
