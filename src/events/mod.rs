//! Event detection on lineage graphs.
//!
//! An event is a configured `(from, to)` class transition between a node and
//! its single successor, accepted only if the track around it satisfies the
//! backward and forward range, degree and class constraints.

mod config;
mod record;
mod searcher;

pub use config::{EventSearchConfig, UNTIL_TRACK_END};
pub use record::EventRecord;
pub use searcher::{EventSearcher, SearchResult};
