//! In-process checkout engine for reconstructing CVS revision fulltexts
//! from RCS-style deltas, as used by the CVS-to-{SVN,git} conversion
//! pipeline. Spawning `co`/`cvs` per revision is O(N^2) for a file with N
//! revisions; this crate reconstructs fulltexts incrementally with a
//! reference-counted cache of intermediate materialized texts so each
//! delta is applied exactly once.

pub mod backing;
pub mod config;
pub mod database;
pub mod error;
pub mod excluder;
pub mod ids;
pub mod keyword;
pub mod rcs;
pub mod record;
pub mod record_db;
pub mod recorder;
pub mod reader;
pub mod store;
pub mod telemetry;

pub use config::CheckoutConfig;
pub use error::{Error, ErrorKind};
pub use ids::{FileId, RevisionId};
pub use rcs::RcsStream;
pub use record::{FileItems, TextRecord};
pub use record_db::TextRecordDatabase;
pub use recorder::RevisionRecorder;
pub use excluder::RevisionExcluder;
pub use reader::{RevisionHandle, RevisionReader};
pub use telemetry::init_tracing;
