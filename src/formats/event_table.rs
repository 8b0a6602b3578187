//! Per-event feature table writer.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::graph::{LineageGraph, NodeId};
use crate::{Error, EventRecord, Result};

/// Writes one tab-separated feature table per event track.
///
/// Each table is named `<start_id>.tsv` and holds one row per node of the
/// track with columns:
/// `frame, object_id, node_id, centroid_x, centroid_y, class_label, min_x, min_y, max_x, max_y, feature_0..`
pub struct EventTableWriter {
    output_dir: PathBuf,
    precision: usize,
}

impl EventTableWriter {
    /// Create a writer, creating `output_dir` if needed.
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir).map_err(|e| {
            Error::IoError(std::io::Error::new(
                e.kind(),
                format!("failed to create event table folder: {}", e),
            ))
        })?;

        Ok(Self {
            output_dir,
            precision: 4,
        })
    }

    /// Number of decimals written for floating point values.
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every track variant of every event; returns the files written.
    ///
    /// Tables are named after the track start. Events whose tracks start on
    /// the same node (e.g. several transitions on one track with an
    /// unbounded backward range) get the event node appended:
    /// `<start>_<event_node>`.
    pub fn write_events(
        &self,
        graph: &LineageGraph,
        events: &[EventRecord],
    ) -> Result<Vec<PathBuf>> {
        let mut used: HashSet<String> = HashSet::new();
        let mut written = Vec::new();

        for event in events {
            let variants = event.track_variants();
            let clash = variants.iter().any(|(key, _)| used.contains(key));

            for (key, track) in variants {
                let key = if clash {
                    format!("{}_{}", key, event.event_node_id)
                } else {
                    key
                };
                if !used.insert(key.clone()) {
                    return Err(Error::IoError(std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        format!("event table '{}' already written", key),
                    )));
                }
                written.push(self.write_track(graph, &key, track)?);
            }
        }

        Ok(written)
    }

    /// Write one track to `<start_id>.tsv`.
    pub fn write_track(
        &self,
        graph: &LineageGraph,
        start_id: &str,
        track: &[NodeId],
    ) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("{}.tsv", start_id));
        let file = File::create(&path).map_err(|e| {
            Error::IoError(std::io::Error::new(
                e.kind(),
                format!("failed to create event table '{}': {}", path.display(), e),
            ))
        })?;
        let mut writer = BufWriter::new(file);

        let num_features = match track.first() {
            Some(first) => graph.node_data(first)?.num_features(),
            None => 0,
        };

        let mut header = vec![
            "frame".to_string(),
            "object_id".to_string(),
            "node_id".to_string(),
            "centroid_x".to_string(),
            "centroid_y".to_string(),
            "class_label".to_string(),
            "min_x".to_string(),
            "min_y".to_string(),
            "max_x".to_string(),
            "max_y".to_string(),
        ];
        header.extend((0..num_features).map(|i| format!("feature_{}", i)));
        writeln!(writer, "{}", header.join("\t"))?;

        let p = self.precision;
        for node in track {
            let sample = graph.node_data(node)?;
            let bb = &sample.bounding_box;
            let label = sample.class_label.map(|l| l.to_string()).unwrap_or_default();

            write!(
                writer,
                "{}\t{}\t{}\t{:.p$}\t{:.p$}\t{}\t{:.p$}\t{:.p$}\t{:.p$}\t{:.p$}",
                sample.frame,
                sample.object_id,
                node,
                sample.centroid.x,
                sample.centroid.y,
                label,
                bb.min_x,
                bb.min_y,
                bb.max_x,
                bb.max_y,
            )?;
            for value in sample.features.iter() {
                write!(writer, "\t{:.p$}", value)?;
            }
            writeln!(writer)?;
        }

        writer.flush()?;
        Ok(path)
    }
}
