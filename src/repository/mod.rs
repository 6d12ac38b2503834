//! Repository layer.
//!
//! Collection-level persistence over a [`Backend`](crate::interfaces::Backend):
//! whole-snapshot reads and writes plus the append-only request log.

pub mod log_writer;
pub mod reader;
pub mod snapshot;
pub mod writer;

pub use log_writer::{LogEntry, LogWriter};
pub use reader::SnapshotReader;
pub use snapshot::{CollectionData, Record, Snapshot};
pub use writer::{SnapshotWriter, WriteOutcome};
