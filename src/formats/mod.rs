//! File formats consumed and produced around the tracking engine.
//!
//! - `SampleFileParser` - Read per-object samples from CSV
//! - `EventTableWriter` - Write per-event track feature tables
//! - `LineageDump` / `full_tracks` - Full-lineage dumps and edge tables

mod event_table;
mod lineage_dump;
mod sample_file;

pub use event_table::EventTableWriter;
pub use lineage_dump::{full_tracks, write_edge_table, write_full_tracks, LineageDump, NodeDump};
pub use sample_file::SampleFileParser;
