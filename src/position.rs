//! Per-position orchestration.
//!
//! Each position (field of view) owns an independent tracker and lineage
//! graph. Positions run on their own worker threads and share nothing but a
//! cancellation flag that is checked between frames.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::{error, info};

use crate::config::PipelineConfig;
use crate::events::{EventRecord, EventSearcher};
use crate::graph::{FrameIndex, LineageGraph, NodeId};
use crate::sample::validate_feature_shape;
use crate::stats::{SearchStats, TrackingStats};
use crate::tracker::Tracker;
use crate::{Error, ObjectSample, Result};

/// Everything produced for one position.
#[derive(Debug, Clone)]
pub struct PositionOutcome {
    pub position: String,
    pub graph: LineageGraph,
    pub frame_index: FrameIndex,
    pub events: Vec<EventRecord>,
    /// First-visit node order per track root.
    pub visits: BTreeMap<NodeId, Vec<NodeId>>,
    pub tracking_stats: TrackingStats,
    pub search_stats: SearchStats,
}

/// Runs tracking and event search for one position.
#[derive(Debug, Clone)]
pub struct PositionRunner {
    position: String,
    config: PipelineConfig,
}

impl PositionRunner {
    pub fn new(position: impl Into<String>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            position: position.into(),
            config,
        })
    }

    pub fn position(&self) -> &str {
        &self.position
    }

    /// Track all frames, then search the finished graph for events.
    ///
    /// Feature shapes are validated before the first frame is ingested. The
    /// abort flag is polled before every frame; once set, the partial graph
    /// is dropped and `Error::Aborted` is returned.
    pub fn run(
        &self,
        frames: Vec<(i32, Vec<ObjectSample>)>,
        abort: &AtomicBool,
    ) -> Result<PositionOutcome> {
        validate_feature_shape(frames.iter().map(|(_, s)| s.as_slice()))?;

        let mut tracker = Tracker::new(self.config.tracker.clone())?;
        for (frame, samples) in frames {
            if abort.load(Ordering::Relaxed) {
                return Err(Error::Aborted {
                    position: self.position.clone(),
                    frame,
                });
            }
            tracker.track_next_frame(frame, samples)?;
        }

        let (graph, frame_index, tracking_stats) = tracker.into_parts();
        let search = EventSearcher::new(self.config.events.clone())?.search(&graph);

        info!(
            position = %self.position,
            frames = tracking_stats.frames,
            nodes = tracking_stats.nodes,
            edges = tracking_stats.edges(),
            events = search.events.len(),
            "position finished"
        );

        Ok(PositionOutcome {
            position: self.position.clone(),
            graph,
            frame_index,
            events: search.events,
            visits: search.visits,
            tracking_stats,
            search_stats: search.stats,
        })
    }
}

/// Input for one position: its id and its frames in increasing order.
pub type PositionJob = (String, Vec<(i32, Vec<ObjectSample>)>);

/// Run every position on its own worker thread.
///
/// A failing position is logged and reported in its slot while the others
/// keep running. Results are returned in input order.
pub fn run_positions(
    jobs: Vec<PositionJob>,
    config: &PipelineConfig,
    abort: &AtomicBool,
) -> Vec<(String, Result<PositionOutcome>)> {
    thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|(position, frames)| {
                let handle = scope.spawn({
                    let position = position.clone();
                    move || {
                        PositionRunner::new(position, config.clone())
                            .and_then(|runner| runner.run(frames, abort))
                    }
                });
                (position, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(position, handle)| {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(Error::WorkerPanicked(position.clone())));
                if let Err(e) = &result {
                    error!(position = %position, error = %e, "position failed");
                }
                (position, result)
            })
            .collect()
    })
}
