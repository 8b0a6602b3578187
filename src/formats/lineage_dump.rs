//! Full-lineage dumps for rendering and downstream analysis.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::graph::{LineageGraph, NodeId};
use crate::{Error, ObjectSample, Result};

/// Every root-to-leaf path of the graph.
///
/// Paths sharing a prefix (a track that splits) each carry their own copy
/// of it. Roots are taken in node order and successors in arc order.
pub fn full_tracks(graph: &LineageGraph) -> Vec<Vec<NodeId>> {
    let mut tracks = Vec::new();

    for root in graph.roots() {
        let mut stack = vec![vec![root]];
        while let Some(path) = stack.pop() {
            let Some(&last) = path.last() else {
                continue;
            };
            let successors: Vec<NodeId> = graph.successors(&last).collect();
            if successors.is_empty() {
                tracks.push(path);
                continue;
            }
            for next in successors.into_iter().rev() {
                let mut branch = path.clone();
                branch.push(next);
                stack.push(branch);
            }
        }
    }

    tracks
}

/// One node of a lineage dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDump {
    pub id: NodeId,
    pub sample: ObjectSample,
}

/// Serializable snapshot of a lineage graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineageDump {
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<(NodeId, NodeId)>,
}

impl LineageDump {
    /// Snapshot `graph`.
    pub fn from_graph(graph: &LineageGraph) -> Self {
        Self {
            nodes: graph
                .samples()
                .map(|(id, sample)| NodeDump {
                    id,
                    sample: sample.clone(),
                })
                .collect(),
            edges: graph.edges().collect(),
        }
    }

    /// Rebuild a graph from the snapshot.
    pub fn to_graph(&self) -> Result<LineageGraph> {
        let mut graph = LineageGraph::new();
        for node in &self.nodes {
            graph.add_node(node.id, node.sample.clone())?;
        }
        for &(head, tail) in &self.edges {
            graph.add_edge(head, tail)?;
        }
        Ok(graph)
    }

    /// Write the snapshot as JSON.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a snapshot written by `write_json`.
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::IoError(std::io::Error::new(
                e.kind(),
                format!("failed to open lineage dump '{}': {}", path.display(), e),
            ))
        })?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

/// Write the edges of `graph` as a `head\ttail` table.
pub fn write_edge_table<P: AsRef<Path>>(graph: &LineageGraph, path: P) -> Result<()> {
    let mut writer = BufWriter::new(create(path.as_ref())?);
    writeln!(writer, "head\ttail")?;
    for (head, tail) in graph.edges() {
        writeln!(writer, "{}\t{}", head, tail)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write every full track, one line of tab-separated node ids per track.
pub fn write_full_tracks<P: AsRef<Path>>(graph: &LineageGraph, path: P) -> Result<usize> {
    let tracks = full_tracks(graph);
    let mut writer = BufWriter::new(create(path.as_ref())?);
    for track in &tracks {
        let line: Vec<String> = track.iter().map(NodeId::to_string).collect();
        writeln!(writer, "{}", line.join("\t"))?;
    }
    writer.flush()?;
    Ok(tracks.len())
}

fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| {
        Error::IoError(std::io::Error::new(
            e.kind(),
            format!("failed to create '{}': {}", path.display(), e),
        ))
    })
}
