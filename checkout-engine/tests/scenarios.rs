//! End-to-end scenarios exercising the three-pass pipeline (collect →
//! filter → output) against in-memory stores.

use std::sync::Arc;

use checkout_engine::database::Column;
use checkout_engine::keyword::{FileMode, RevisionMetadata};
use checkout_engine::{FileId, FileItems, RevisionExcluder, RevisionHandle, RevisionId, RevisionReader, RevisionRecorder};
use checkout_engine::store::{CheckoutStore, DeltaStore, TreeStore};
use chrono::{TimeZone, Utc};

fn metadata(revision: &str) -> RevisionMetadata {
    RevisionMetadata {
        revision: revision.to_string(),
        rcs_basename: "file.c,v".to_string(),
        source_path: "/cvsroot/module/file.c,v".to_string(),
        author: "jdoe".to_string(),
        state: "Exp".to_string(),
        timestamp: Utc.ymd(2004, 1, 1).and_hms(0, 0, 0),
    }
}

struct Pipeline {
    delta_store: Arc<DeltaStore>,
    checkout_store: Arc<CheckoutStore>,
    tree_store: TreeStore,
    tree_store_filtered: TreeStore,
}

impl Pipeline {
    fn new() -> Self {
        checkout_engine::init_tracing();
        Self {
            delta_store: Arc::new(DeltaStore::in_memory()),
            checkout_store: Arc::new(CheckoutStore::in_memory()),
            tree_store: TreeStore::in_memory(Column::RcsTrees),
            tree_store_filtered: TreeStore::in_memory(Column::RcsTreesFiltered),
        }
    }

    fn recorder(&self, file: FileId) -> RevisionRecorder {
        RevisionRecorder::new(file, self.delta_store.clone())
    }

    fn pass_through(&self, file: FileId) {
        let excluder = RevisionExcluder::new(self.tree_store.clone(), self.tree_store_filtered.clone());
        excluder.copy_through(file).unwrap();
    }

    fn exclude(&self, file: FileId, file_items: &FileItems) {
        let excluder = RevisionExcluder::new(self.tree_store.clone(), self.tree_store_filtered.clone());
        excluder.exclude_file(file, file_items).unwrap();
    }

    fn reader(&self) -> RevisionReader {
        RevisionReader::new(self.delta_store.clone(), self.checkout_store.clone(), self.tree_store_filtered.clone())
    }
}

fn wanted_all(revs: &[RevisionId]) -> FileItems {
    let mut items = FileItems::new();
    for &rev in revs {
        items.add_content_bearing(rev);
    }
    items
}

/// S1 — single trunk file, three revisions, consumed in natural order.
#[test]
fn s1_single_trunk_file_three_revisions_in_order() {
    let pipeline = Pipeline::new();
    let file = FileId(1);
    let (r11, r12, r13) = (RevisionId(11), RevisionId(12), RevisionId(13));

    let mut recorder = pipeline.recorder(file);
    recorder.set_head_revision(r13);
    recorder.define_revision(r13, Some(r12), &[], true);
    recorder.define_revision(r12, Some(r11), &[], true);
    recorder.define_revision(r11, None, &[], true);

    recorder.set_revision_info(r13, "", b"c\n".to_vec(), true).unwrap();
    recorder.set_revision_info(r12, "", b"d1 1\na1 1\nb\n".to_vec(), true).unwrap();
    recorder.set_revision_info(r11, "", b"d1 1\na1 1\na\n".to_vec(), true).unwrap();

    recorder.finish(&wanted_all(&[r11, r12, r13]), &pipeline.tree_store).unwrap();
    pipeline.pass_through(file);

    let mut reader = pipeline.reader();
    let meta = metadata("1.1");
    let a = reader.get_content_stream(RevisionHandle { file, id: r11 }, true, FileMode::Binary, &meta).unwrap();
    let b = reader.get_content_stream(RevisionHandle { file, id: r12 }, true, FileMode::Binary, &meta).unwrap();
    let c = reader.get_content_stream(RevisionHandle { file, id: r13 }, true, FileMode::Binary, &meta).unwrap();

    assert_eq!(a, b"a\n".to_vec());
    assert_eq!(b, b"b\n".to_vec());
    assert_eq!(c, b"c\n".to_vec());
    reader.finish();
}

/// S2 — out-of-order consumption: request the head first, then its
/// ancestors; the intermediate fulltexts travel through CheckoutStore.
#[test]
fn s2_out_of_order_consumption_materializes_then_drains_checkout_store() {
    let pipeline = Pipeline::new();
    let file = FileId(2);
    let (r11, r12, r13) = (RevisionId(21), RevisionId(22), RevisionId(23));

    let mut recorder = pipeline.recorder(file);
    recorder.set_head_revision(r13);
    recorder.define_revision(r13, Some(r12), &[], true);
    recorder.define_revision(r12, Some(r11), &[], true);
    recorder.define_revision(r11, None, &[], true);
    recorder.set_revision_info(r13, "", b"c\n".to_vec(), true).unwrap();
    recorder.set_revision_info(r12, "", b"d1 1\na1 1\nb\n".to_vec(), true).unwrap();
    recorder.set_revision_info(r11, "", b"d1 1\na1 1\na\n".to_vec(), true).unwrap();
    recorder.finish(&wanted_all(&[r11, r12, r13]), &pipeline.tree_store).unwrap();
    pipeline.pass_through(file);

    let mut reader = pipeline.reader();
    let meta = metadata("1.3");
    let c = reader.get_content_stream(RevisionHandle { file, id: r13 }, true, FileMode::Binary, &meta).unwrap();
    assert_eq!(c, b"c\n".to_vec());
    // 1.2 still has an unfulfilled downstream request, so it was cached; 1.3
    // was consumed to extinction by this very call and was never cached,
    // and 1.1's fulltext is never cached (re-reading it costs nothing).
    assert!(!pipeline.checkout_store.is_empty());

    let a = reader.get_content_stream(RevisionHandle { file, id: r11 }, true, FileMode::Binary, &meta).unwrap();
    let b = reader.get_content_stream(RevisionHandle { file, id: r12 }, true, FileMode::Binary, &meta).unwrap();
    assert_eq!(a, b"a\n".to_vec());
    assert_eq!(b, b"b\n".to_vec());

    reader.finish();
    assert!(pipeline.checkout_store.is_empty());
}

/// S3 — branch file: trunk 1.1 fulltext, branch 1.1.2.1 a forward delta
/// that appends one line after the trunk's single line.
#[test]
fn s3_branch_file_reconstructs_trunk_and_branch_tip() {
    let pipeline = Pipeline::new();
    let file = FileId(3);
    let trunk = RevisionId(31);
    let branch_tip = RevisionId(32);

    let mut recorder = pipeline.recorder(file);
    recorder.set_head_revision(trunk);
    recorder.define_revision(trunk, None, &[branch_tip], true);
    recorder.set_revision_info(trunk, "", b"x\n".to_vec(), true).unwrap();
    recorder.set_revision_info(branch_tip, "", b"a1 1\ny\n".to_vec(), false).unwrap();

    recorder.finish(&wanted_all(&[trunk, branch_tip]), &pipeline.tree_store).unwrap();
    pipeline.pass_through(file);

    let mut reader = pipeline.reader();
    let meta = metadata("1.1");
    let trunk_text = reader.get_content_stream(RevisionHandle { file, id: trunk }, true, FileMode::Binary, &meta).unwrap();
    let branch_text =
        reader.get_content_stream(RevisionHandle { file, id: branch_tip }, true, FileMode::Binary, &meta).unwrap();

    assert_eq!(trunk_text, b"x\n".to_vec());
    assert_eq!(branch_text, b"x\ny\n".to_vec());
    reader.finish();
}

/// S4 — excluded branch: filter pass drops the branch tip; DeltaStore keeps
/// its bytes (filter-pass policy never touches DeltaStore).
#[test]
fn s4_excluded_branch_drops_bookkeeping_not_delta_bytes() {
    let pipeline = Pipeline::new();
    let file = FileId(4);
    let trunk = RevisionId(41);
    let branch_tip = RevisionId(42);

    let mut recorder = pipeline.recorder(file);
    recorder.set_head_revision(trunk);
    recorder.define_revision(trunk, None, &[branch_tip], true);
    recorder.set_revision_info(trunk, "", b"x\n".to_vec(), true).unwrap();
    recorder.set_revision_info(branch_tip, "", b"a1 1\ny\n".to_vec(), false).unwrap();
    recorder.finish(&wanted_all(&[trunk, branch_tip]), &pipeline.tree_store).unwrap();

    // Filter pass: branch tip is excluded, only trunk remains wanted.
    pipeline.exclude(file, &wanted_all(&[trunk]));

    assert!(pipeline.delta_store.get(branch_tip).is_ok(), "excluding bookkeeping must not touch DeltaStore");

    let mut reader = pipeline.reader();
    let meta = metadata("1.1");
    let trunk_text = reader.get_content_stream(RevisionHandle { file, id: trunk }, true, FileMode::Binary, &meta).unwrap();
    assert_eq!(trunk_text, b"x\n".to_vec());
    reader.finish();
}

/// S5 — skip_content honors the refcount budget without checking content out.
#[test]
fn s5_skip_content_then_checkout_remaining_chain() {
    let pipeline = Pipeline::new();
    let file = FileId(5);
    let (r11, r12, r13) = (RevisionId(51), RevisionId(52), RevisionId(53));

    let mut recorder = pipeline.recorder(file);
    recorder.set_head_revision(r13);
    recorder.define_revision(r13, Some(r12), &[], true);
    recorder.define_revision(r12, Some(r11), &[], true);
    recorder.define_revision(r11, None, &[], true);
    recorder.set_revision_info(r13, "", b"c\n".to_vec(), true).unwrap();
    recorder.set_revision_info(r12, "", b"d1 1\na1 1\nb\n".to_vec(), true).unwrap();
    recorder.set_revision_info(r11, "", b"d1 1\na1 1\na\n".to_vec(), true).unwrap();
    // 1.1 is never independently requested below (only reached as an
    // ancestor dependency), so it is not itself content-bearing-wanted.
    recorder.finish(&wanted_all(&[r12, r13]), &pipeline.tree_store).unwrap();
    pipeline.pass_through(file);

    let mut reader = pipeline.reader();
    reader.skip_content(RevisionHandle { file, id: r12 }).unwrap();
    let meta = metadata("1.3");
    let c = reader.get_content_stream(RevisionHandle { file, id: r13 }, true, FileMode::Binary, &meta).unwrap();
    assert_eq!(c, b"c\n".to_vec());
    reader.finish();
}

/// S6 — a repeated deltatext block for the same revision is ignored.
#[test]
fn s6_duplicate_deltatext_block_is_ignored() {
    let pipeline = Pipeline::new();
    let file = FileId(6);
    let rev = RevisionId(61);

    let mut recorder = pipeline.recorder(file);
    recorder.set_head_revision(rev);
    recorder.define_revision(rev, None, &[], true);
    recorder.set_revision_info(rev, "", b"only\n".to_vec(), true).unwrap();
    recorder.set_revision_info(rev, "", b"corrupt-duplicate\n".to_vec(), true).unwrap();
    recorder.finish(&wanted_all(&[rev]), &pipeline.tree_store).unwrap();
    pipeline.pass_through(file);

    let mut reader = pipeline.reader();
    let meta = metadata("1.1");
    let text = reader.get_content_stream(RevisionHandle { file, id: rev }, true, FileMode::Binary, &meta).unwrap();
    assert_eq!(text, b"only\n".to_vec());
    reader.finish();
}
