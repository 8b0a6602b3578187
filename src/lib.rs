//! # celltrack-rs - Cell Lineage Tracking Engine
//!
//! Builds a directed lineage graph of segmented cell objects across the
//! frames of a time-lapse recording, then searches that graph for class
//! transition motifs (e.g. the onset of mitosis) with validated context.
//!
//! ## Features
//!
//! - Nearest-neighbour correspondence with split/merge resolution
//! - Gap bridging over frames without segmented objects
//! - Forward/backward event search under degree, range and class constraints
//! - Per-track feature tables and full-lineage dumps
//! - One worker thread per position with cooperative cancellation
//!
//! ## Example
//!
//! ```rust,ignore
//! use celltrack_rs::{ObjectSample, Tracker, TrackerConfig, EventSearcher, EventSearchConfig};
//!
//! let mut tracker = Tracker::new(TrackerConfig::new(25.0))?;
//! for (frame, samples) in frames {
//!     tracker.track_next_frame(frame, samples)?;
//! }
//!
//! let mut events = EventSearchConfig::default();
//! events.label_transitions = vec![(1, 2)];
//! let result = EventSearcher::new(events)?.search(tracker.graph());
//! ```

// Public modules
pub mod config;
pub mod events;
pub mod formats;
pub mod gap;
pub mod graph;
pub mod matching;
pub mod position;
pub mod sample;
pub mod stats;
pub mod tracker;

// Re-exports for convenience
pub use config::PipelineConfig;
pub use events::{EventRecord, EventSearchConfig, EventSearcher, SearchResult};
pub use gap::GapBridger;
pub use graph::{EdgeId, FrameIndex, LineageGraph, NodeId};
pub use matching::CorrespondenceResolver;
pub use position::{run_positions, PositionOutcome, PositionRunner};
pub use sample::ObjectSample;
pub use stats::{SearchStats, TrackingStats};
pub use tracker::{FrameResolution, Tracker, TrackerConfig};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use crate::graph::NodeId;
    use thiserror::Error;

    /// Errors that can occur while building or searching a lineage graph.
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Duplicate node: {0}")]
        DuplicateNode(NodeId),

        #[error("Unknown node: {0}")]
        UnknownNode(NodeId),

        #[error("Invalid edge {head} -> {tail}: tail frame must be later than head frame")]
        InvalidEdge { head: NodeId, tail: NodeId },

        #[error("Feature shape mismatch at frame {frame}, object {object_id}: expected {expected} features, got {got}")]
        FeatureShape {
            frame: i32,
            object_id: i32,
            expected: usize,
            got: usize,
        },

        #[error("Invalid sample: {0}")]
        InvalidSample(String),

        #[error("Frame {frame} is not later than the last tracked frame {last}")]
        NonMonotonicFrame { frame: i32, last: i32 },

        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Processing of position '{position}' aborted before frame {frame}")]
        Aborted { position: String, frame: i32 },

        #[error("Worker for position '{0}' panicked")]
        WorkerPanicked(String),

        #[error("Parse error: {0}")]
        Parse(String),

        #[error("IO error: {0}")]
        IoError(#[from] std::io::Error),

        #[error("JSON error: {0}")]
        Json(#[from] serde_json::Error),
    }

    /// Result type for celltrack operations
    pub type Result<T> = std::result::Result<T, Error>;
}
