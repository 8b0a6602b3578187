//! Lineage graph over `(frame, object_id)` nodes.
//!
//! This module provides:
//! - `NodeId` - composite node key rendered as `"<frame>_<object_id>"`
//! - `LineageGraph` - directed multigraph owning one `ObjectSample` per node
//! - `FrameIndex` - ordered frame -> object id mapping of occupied frames

mod frame_index;

pub use frame_index::FrameIndex;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, ObjectSample, Result};

/// Node identifier: an object in a frame.
///
/// Ordering is by frame first, then object id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    pub frame: i32,
    pub object_id: i32,
}

impl NodeId {
    pub fn new(frame: i32, object_id: i32) -> Self {
        Self { frame, object_id }
    }

    /// Node id of the given sample.
    pub fn of(sample: &ObjectSample) -> Self {
        Self::new(sample.frame, sample.object_id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.frame, self.object_id)
    }
}

impl FromStr for NodeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (frame, object_id) = s
            .split_once('_')
            .ok_or_else(|| Error::Parse(format!("malformed node id '{}'", s)))?;

        let frame = frame
            .parse()
            .map_err(|_| Error::Parse(format!("malformed frame in node id '{}'", s)))?;
        let object_id = object_id
            .parse()
            .map_err(|_| Error::Parse(format!("malformed object id in node id '{}'", s)))?;

        Ok(Self::new(frame, object_id))
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Handle to an edge of a `LineageGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(usize);

impl EdgeId {
    /// Position of the edge in insertion order.
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Arc {
    head: NodeId,
    tail: NodeId,
}

#[derive(Debug, Clone)]
struct NodeEntry {
    sample: ObjectSample,
    out_arcs: Vec<EdgeId>,
    in_arcs: Vec<EdgeId>,
}

/// Directed graph of object correspondences across frames.
///
/// Edges always point from an earlier frame to a strictly later one, so the
/// graph can never contain a cycle. Nodes iterate in `NodeId` order and arcs
/// of a node in insertion order, which keeps every traversal deterministic.
#[derive(Debug, Clone, Default)]
pub struct LineageGraph {
    nodes: BTreeMap<NodeId, NodeEntry>,
    arcs: Vec<Arc>,
}

impl LineageGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node owning `sample`.
    ///
    /// Fails with `DuplicateNode` if the id is already present.
    pub fn add_node(&mut self, node_id: NodeId, sample: ObjectSample) -> Result<()> {
        if self.nodes.contains_key(&node_id) {
            return Err(Error::DuplicateNode(node_id));
        }
        if NodeId::of(&sample) != node_id {
            return Err(Error::InvalidSample(format!(
                "sample {} attached to node {}",
                NodeId::of(&sample),
                node_id
            )));
        }

        self.nodes.insert(
            node_id,
            NodeEntry {
                sample,
                out_arcs: Vec::new(),
                in_arcs: Vec::new(),
            },
        );
        Ok(())
    }

    /// Add a node keyed by the sample's own frame and object id.
    pub fn add_sample(&mut self, sample: ObjectSample) -> Result<NodeId> {
        let node_id = NodeId::of(&sample);
        self.add_node(node_id, sample)?;
        Ok(node_id)
    }

    /// Add a directed edge `head -> tail`.
    ///
    /// Fails with `UnknownNode` if an endpoint is missing and with
    /// `InvalidEdge` unless `tail` lies in a later frame than `head`.
    pub fn add_edge(&mut self, head: NodeId, tail: NodeId) -> Result<EdgeId> {
        if !self.nodes.contains_key(&head) {
            return Err(Error::UnknownNode(head));
        }
        if !self.nodes.contains_key(&tail) {
            return Err(Error::UnknownNode(tail));
        }
        if tail.frame <= head.frame {
            return Err(Error::InvalidEdge { head, tail });
        }

        let edge = EdgeId(self.arcs.len());
        self.arcs.push(Arc { head, tail });

        if let Some(entry) = self.nodes.get_mut(&head) {
            entry.out_arcs.push(edge);
        }
        if let Some(entry) = self.nodes.get_mut(&tail) {
            entry.in_arcs.push(edge);
        }

        Ok(edge)
    }

    /// Whether the node exists.
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Sample owned by the node.
    pub fn node_data(&self, node_id: &NodeId) -> Result<&ObjectSample> {
        self.nodes
            .get(node_id)
            .map(|entry| &entry.sample)
            .ok_or(Error::UnknownNode(*node_id))
    }

    /// Class label of the node's sample (`None` for unknown or unclassified nodes).
    pub fn label(&self, node_id: &NodeId) -> Option<i32> {
        self.nodes.get(node_id).and_then(|entry| entry.sample.class_label)
    }

    /// Number of outgoing edges (0 for unknown nodes).
    pub fn out_degree(&self, node_id: &NodeId) -> usize {
        self.out_arcs(node_id).len()
    }

    /// Number of incoming edges (0 for unknown nodes).
    pub fn in_degree(&self, node_id: &NodeId) -> usize {
        self.in_arcs(node_id).len()
    }

    /// Outgoing edges in insertion order.
    pub fn out_arcs(&self, node_id: &NodeId) -> &[EdgeId] {
        self.nodes
            .get(node_id)
            .map(|entry| entry.out_arcs.as_slice())
            .unwrap_or(&[])
    }

    /// Incoming edges in insertion order.
    pub fn in_arcs(&self, node_id: &NodeId) -> &[EdgeId] {
        self.nodes
            .get(node_id)
            .map(|entry| entry.in_arcs.as_slice())
            .unwrap_or(&[])
    }

    /// Source node of an edge.
    pub fn head(&self, edge: EdgeId) -> NodeId {
        self.arcs[edge.0].head
    }

    /// Target node of an edge.
    pub fn tail(&self, edge: EdgeId) -> NodeId {
        self.arcs[edge.0].tail
    }

    /// Targets of the node's outgoing edges.
    pub fn successors(&self, node_id: &NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.out_arcs(node_id).iter().map(move |&e| self.tail(e))
    }

    /// Sources of the node's incoming edges.
    pub fn predecessors(&self, node_id: &NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.in_arcs(node_id).iter().map(move |&e| self.head(e))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids, ordered by frame then object id.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// All nodes with their samples, ordered by frame then object id.
    pub fn samples(&self) -> impl Iterator<Item = (NodeId, &ObjectSample)> + '_ {
        self.nodes.iter().map(|(id, entry)| (*id, &entry.sample))
    }

    /// All edges as `(head, tail)` pairs in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.arcs.iter().map(|arc| (arc.head, arc.tail))
    }

    /// Nodes without predecessors (track starts), in node order.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, entry)| entry.in_arcs.is_empty())
            .map(|(id, _)| *id)
    }

    /// Class labels along a node path.
    ///
    /// This is the per-track observation sequence handed to the HMM
    /// error-correction stage.
    pub fn label_sequence(&self, path: &[NodeId]) -> Result<Vec<Option<i32>>> {
        path.iter()
            .map(|id| self.node_data(id).map(|s| s.class_label))
            .collect()
    }
}
