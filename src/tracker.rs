//! Frame-by-frame lineage graph construction.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::gap::GapBridger;
use crate::graph::{FrameIndex, LineageGraph, NodeId};
use crate::matching::CorrespondenceResolver;
use crate::stats::TrackingStats;
use crate::{Error, ObjectSample, Result};

/// Configuration for the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Exclusive upper bound on the centroid distance of a correspondence.
    pub max_object_distance: f64,

    /// Nearest children considered as split candidates per parent.
    pub max_split_objects: usize,

    /// Frames to look back over empty frames (values below 1 act as 1).
    pub max_tracking_gap: i32,
}

impl TrackerConfig {
    /// Create a new tracker configuration.
    ///
    /// # Arguments
    /// * `max_object_distance` - Maximum centroid distance between linked objects
    pub fn new(max_object_distance: f64) -> Self {
        Self {
            max_object_distance,
            max_split_objects: 3,
            max_tracking_gap: 5,
        }
    }

    /// Check the configuration for values the tracker cannot work with.
    pub fn validate(&self) -> Result<()> {
        CorrespondenceResolver::new(self.max_object_distance, self.max_split_objects).map(|_| ())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new(50.0)
    }
}

/// Outcome of ingesting one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameResolution {
    /// Frame the new objects were linked against, if any.
    pub previous_frame: Option<i32>,

    /// Number of edges committed into the graph.
    pub edges_committed: usize,
}

impl FrameResolution {
    fn unlinked() -> Self {
        Self {
            previous_frame: None,
            edges_committed: 0,
        }
    }

    /// Whether the frame was resolved against a preceding frame.
    pub fn is_linked(&self) -> bool {
        self.previous_frame.is_some()
    }
}

/// Lineage tracker.
///
/// Consumes object samples one frame at a time, in strictly increasing frame
/// order, and extends a lineage graph with the resolved correspondences.
#[derive(Debug, Clone)]
pub struct Tracker {
    /// Tracker configuration.
    pub config: TrackerConfig,

    graph: LineageGraph,
    frame_index: FrameIndex,
    resolver: CorrespondenceResolver,
    bridger: GapBridger,
    stats: TrackingStats,
    last_frame: Option<i32>,
}

impl Tracker {
    /// Create a new tracker with the given configuration.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        let resolver =
            CorrespondenceResolver::new(config.max_object_distance, config.max_split_objects)?;
        let bridger = GapBridger::new(config.max_tracking_gap);

        Ok(Self {
            config,
            graph: LineageGraph::new(),
            frame_index: FrameIndex::new(),
            resolver,
            bridger,
            stats: TrackingStats::default(),
            last_frame: None,
        })
    }

    /// Ingest the objects of the next frame.
    ///
    /// Every sample becomes a node. An empty frame is remembered as a gap
    /// and not registered in the frame index. If no occupied frame lies
    /// within the gap window the frame stays unlinked, which is the normal
    /// case for the first frame of a recording.
    ///
    /// # Arguments
    /// * `frame` - Frame index, strictly greater than the previous call's
    /// * `samples` - Objects of this frame, in segmentation order
    pub fn track_next_frame(
        &mut self,
        frame: i32,
        samples: Vec<ObjectSample>,
    ) -> Result<FrameResolution> {
        if let Some(last) = self.last_frame {
            if frame <= last {
                return Err(Error::NonMonotonicFrame { frame, last });
            }
        }
        if let Some(stray) = samples.iter().find(|s| s.frame != frame) {
            return Err(Error::InvalidSample(format!(
                "object {} of frame {} passed with frame {}",
                stray.object_id, stray.frame, frame
            )));
        }
        let mut seen = HashSet::with_capacity(samples.len());
        if let Some(repeated) = samples.iter().find(|s| !seen.insert(s.object_id)) {
            return Err(Error::DuplicateNode(NodeId::of(repeated)));
        }

        self.last_frame = Some(frame);
        self.stats.frames += 1;

        if samples.is_empty() {
            self.stats.empty_frames += 1;
            debug!(frame, "empty frame");
            return Ok(FrameResolution::unlinked());
        }

        let mut object_ids = Vec::with_capacity(samples.len());
        for sample in samples {
            object_ids.push(sample.object_id);
            self.graph.add_node(NodeId::of(&sample), sample)?;
        }
        self.stats.nodes += object_ids.len();
        self.frame_index.insert(frame, object_ids);

        let Some(previous) = self.bridger.closest_preceding_frame(&self.frame_index, frame) else {
            self.stats.unlinked_frames += 1;
            debug!(frame, "no preceding frame within tracking gap");
            return Ok(FrameResolution::unlinked());
        };

        if frame - previous > 1 {
            self.stats.bridged_gaps += 1;
        }

        let resolution =
            self.resolver.connect(&mut self.graph, &self.frame_index, previous, frame)?;
        self.stats.record_resolution(&resolution);

        Ok(FrameResolution {
            previous_frame: Some(previous),
            edges_committed: resolution.len(),
        })
    }

    /// Lineage graph built so far.
    pub fn graph(&self) -> &LineageGraph {
        &self.graph
    }

    /// Occupied frames ingested so far.
    pub fn frame_index(&self) -> &FrameIndex {
        &self.frame_index
    }

    pub fn stats(&self) -> &TrackingStats {
        &self.stats
    }

    /// Last frame passed to `track_next_frame`.
    pub fn last_frame(&self) -> Option<i32> {
        self.last_frame
    }

    /// Take the graph, frame index and counters out of the tracker.
    pub fn into_parts(self) -> (LineageGraph, FrameIndex, TrackingStats) {
        (self.graph, self.frame_index, self.stats)
    }
}
