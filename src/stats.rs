//! Per-run counters for tracking and event search.

use serde::{Deserialize, Serialize};

use crate::matching::{LinkKind, Resolution};

/// Counters accumulated while ingesting frames into one lineage graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingStats {
    /// Frames passed to the tracker, including empty ones.
    pub frames: usize,
    /// Frames without any object.
    pub empty_frames: usize,
    /// Occupied frames for which no preceding frame was found.
    pub unlinked_frames: usize,
    /// Frames linked to a predecessor more than one frame back.
    pub bridged_gaps: usize,
    pub nodes: usize,
    pub move_edges: usize,
    pub merge_edges: usize,
    pub fallback_edges: usize,
    /// Parents linked to more than one child.
    pub split_parents: usize,
}

impl TrackingStats {
    /// Total number of committed edges.
    pub fn edges(&self) -> usize {
        self.move_edges + self.merge_edges + self.fallback_edges
    }

    pub(crate) fn record_resolution(&mut self, resolution: &Resolution) {
        self.move_edges += resolution.count(LinkKind::Move);
        self.merge_edges += resolution.count(LinkKind::Merge);
        self.fallback_edges += resolution.count(LinkKind::Fallback);
        self.split_parents += resolution.split_parents();
    }
}

/// Counters accumulated by one event search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Nodes visited by the traversal.
    pub visited: usize,
    /// Nodes whose outgoing transition matched a configured motif.
    pub candidates: usize,
    pub backward_rejected: usize,
    pub forward_rejected: usize,
    pub events: usize,
}
