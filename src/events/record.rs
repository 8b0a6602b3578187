//! Event records produced by the search.

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

/// A matched transition motif with its validated surrounding track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Transition source node.
    pub event_node_id: NodeId,

    /// First node with more than one successor on the forward walk, if any.
    pub split_node_id: Option<NodeId>,

    /// Track paths ordered by frame; one per accepted daughter branch after a split.
    pub tracks: Vec<Vec<NodeId>>,

    /// Configured `backward_range + forward_range`.
    pub duration: i32,
}

impl EventRecord {
    /// First node of the track (the earliest backward node).
    pub fn start_node_id(&self) -> Option<NodeId> {
        self.tracks.first().and_then(|t| t.first()).copied()
    }

    pub fn is_split(&self) -> bool {
        self.split_node_id.is_some()
    }

    /// Track paths keyed by their start id.
    ///
    /// Keys are `<start>` for unsplit tracks and `<start>_<branch>` for each
    /// branch of a split track.
    pub fn track_variants(&self) -> Vec<(String, &[NodeId])> {
        let Some(start) = self.start_node_id() else {
            return Vec::new();
        };

        self.tracks
            .iter()
            .enumerate()
            .map(|(i, track)| {
                let key = if self.is_split() {
                    format!("{}_{}", start, i)
                } else {
                    start.to_string()
                };
                (key, track.as_slice())
            })
            .collect()
    }
}
