//! Transition motif search over a lineage graph.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info};

use super::{EventRecord, EventSearchConfig, UNTIL_TRACK_END};
use crate::graph::{LineageGraph, NodeId};
use crate::stats::SearchStats;
use crate::Result;

/// Outcome of a single step of a forward or backward walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Range satisfied, the walk ends successfully on this node.
    Done,
    /// Topology or class constraint violated.
    Reject,
    /// Keep walking.
    Continue,
}

/// Forward walk that passed: the unbranched part plus accepted daughter branches.
#[derive(Debug, Clone)]
struct ForwardTrack {
    trunk: Vec<NodeId>,
    split: Option<(NodeId, Vec<Vec<NodeId>>)>,
}

/// Everything produced by one search.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    /// Accepted events in traversal order.
    pub events: Vec<EventRecord>,

    /// Nodes in first-visit order, keyed by the root the traversal started from.
    pub visits: BTreeMap<NodeId, Vec<NodeId>>,

    pub stats: SearchStats,
}

/// Searches a lineage graph for configured class transitions.
#[derive(Debug, Clone)]
pub struct EventSearcher {
    config: EventSearchConfig,
}

impl EventSearcher {
    /// Create a searcher, validating the configuration.
    pub fn new(config: EventSearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EventSearchConfig {
        &self.config
    }

    /// Traverse the whole graph depth-first from every root.
    ///
    /// Every node with exactly one predecessor and one successor is tested
    /// against the transition list; on a match the backward and forward
    /// walks decide whether an event is recorded. Nodes reachable through
    /// several paths are visited once.
    pub fn search(&self, graph: &LineageGraph) -> SearchResult {
        let mut result = SearchResult::default();
        let mut visited: HashSet<NodeId> = HashSet::with_capacity(graph.node_count());

        for root in graph.roots() {
            let mut order = Vec::new();
            let mut stack = vec![root];

            while let Some(node) = stack.pop() {
                if !visited.insert(node) {
                    continue;
                }
                order.push(node);
                result.stats.visited += 1;

                if let Some(event) = self.visit(graph, node, &mut result.stats) {
                    result.events.push(event);
                }

                // Reverse so the first arc is expanded first.
                let successors: Vec<NodeId> = graph.successors(&node).collect();
                stack.extend(successors.into_iter().rev().filter(|n| !visited.contains(n)));
            }

            result.visits.insert(root, order);
        }

        result.stats.events = result.events.len();
        info!(
            visited = result.stats.visited,
            candidates = result.stats.candidates,
            events = result.stats.events,
            "event search finished"
        );

        result
    }

    /// Test one node for a transition and validate its context.
    fn visit(
        &self,
        graph: &LineageGraph,
        node: NodeId,
        stats: &mut SearchStats,
    ) -> Option<EventRecord> {
        if graph.in_degree(&node) != 1 || graph.out_degree(&node) != 1 {
            return None;
        }
        let next = graph.successors(&node).next()?;
        let (from, to) = (graph.label(&node)?, graph.label(&next)?);
        if !self.config.is_transition(from, to) {
            return None;
        }

        stats.candidates += 1;

        let Some(mut backward) = self.backward_check(graph, node) else {
            stats.backward_rejected += 1;
            debug!(node = %node, "transition rejected by backward check");
            return None;
        };
        let Some(forward) = self.forward_check(graph, next) else {
            stats.forward_rejected += 1;
            debug!(node = %node, "transition rejected by forward check");
            return None;
        };

        backward.reverse();
        backward.extend(forward.trunk);

        let (split_node_id, tracks) = match forward.split {
            Some((split, branches)) => {
                let tracks = branches
                    .into_iter()
                    .map(|branch| {
                        let mut track = backward.clone();
                        track.extend(branch);
                        track
                    })
                    .collect();
                (Some(split), tracks)
            }
            None => (None, vec![backward]),
        };

        debug!(node = %node, split = split_node_id.is_some(), "event found");

        Some(EventRecord {
            event_node_id: node,
            split_node_id,
            tracks,
            duration: self.config.duration(),
        })
    }

    /// Whether a walk that reached `depth` on a node with no further
    /// neighbours in walking direction (`at_end`) is complete.
    fn range_reached(range: i32, range_min: bool, depth: i32, at_end: bool) -> bool {
        if range == UNTIL_TRACK_END {
            return at_end;
        }
        if range_min {
            depth >= range && at_end
        } else {
            depth >= range
        }
    }

    fn label_allowed(&self, graph: &LineageGraph, node: &NodeId, forward: bool) -> bool {
        let labels = if forward {
            &self.config.forward_labels
        } else {
            &self.config.backward_labels
        };
        labels.is_empty() || graph.label(node).map_or(false, |l| labels.contains(&l))
    }

    fn forward_step(&self, graph: &LineageGraph, node: &NodeId, depth: i32) -> Step {
        let out_degree = graph.out_degree(node);
        let in_degree = graph.in_degree(node);
        let cfg = &self.config;

        if Self::range_reached(cfg.forward_range, cfg.forward_range_min, depth, out_degree == 0) {
            return Step::Done;
        }
        if in_degree > cfg.max_in_degree || out_degree > cfg.max_out_degree || out_degree == 0 {
            return Step::Reject;
        }
        if depth <= cfg.forward_check as i32 && !self.label_allowed(graph, node, true) {
            return Step::Reject;
        }
        Step::Continue
    }

    fn backward_step(&self, graph: &LineageGraph, node: &NodeId, depth: i32) -> Step {
        let out_degree = graph.out_degree(node);
        let in_degree = graph.in_degree(node);
        let cfg = &self.config;

        if Self::range_reached(cfg.backward_range, cfg.backward_range_min, depth, in_degree == 0) {
            return Step::Done;
        }
        if out_degree != 1 || in_degree != 1 {
            return Step::Reject;
        }
        if depth >= 1
            && depth <= cfg.backward_check as i32
            && !self.label_allowed(graph, node, false)
        {
            return Step::Reject;
        }
        Step::Continue
    }

    /// Walk backward from the event node; returns nodes from the event node back.
    fn backward_check(&self, graph: &LineageGraph, event: NodeId) -> Option<Vec<NodeId>> {
        let mut nodes = Vec::new();
        let mut node = event;
        let mut depth = 0;

        loop {
            nodes.push(node);
            match self.backward_step(graph, &node, depth) {
                Step::Done => return Some(nodes),
                Step::Reject => return None,
                Step::Continue => {}
            }
            node = graph.predecessors(&node).next()?;
            depth += 1;
        }
    }

    /// Walk forward from the transition target.
    ///
    /// The first node with several successors forks the walk: every daughter
    /// is walked on its own and the split passes if any (one-daughter mode)
    /// or all daughters pass.
    fn forward_check(&self, graph: &LineageGraph, target: NodeId) -> Option<ForwardTrack> {
        let mut trunk = Vec::new();
        let mut node = target;
        let mut depth = 1;

        loop {
            trunk.push(node);
            match self.forward_step(graph, &node, depth) {
                Step::Done => return Some(ForwardTrack { trunk, split: None }),
                Step::Reject => return None,
                Step::Continue => {}
            }

            if graph.out_degree(&node) > 1 {
                let mut passed = Vec::new();
                let mut all_passed = true;
                for daughter in graph.successors(&node) {
                    match self.forward_branch(graph, daughter, depth + 1) {
                        Some(branch) => passed.push(branch),
                        None => all_passed = false,
                    }
                }

                let accepted = if self.config.allow_one_daughter_cell {
                    !passed.is_empty()
                } else {
                    all_passed
                };
                return accepted.then(|| ForwardTrack {
                    trunk,
                    split: Some((node, passed)),
                });
            }

            node = graph.successors(&node).next()?;
            depth += 1;
        }
    }

    /// Walk one daughter branch; later splits follow the first successor.
    fn forward_branch(
        &self,
        graph: &LineageGraph,
        start: NodeId,
        start_depth: i32,
    ) -> Option<Vec<NodeId>> {
        let mut nodes = Vec::new();
        let mut node = start;
        let mut depth = start_depth;

        loop {
            nodes.push(node);
            match self.forward_step(graph, &node, depth) {
                Step::Done => return Some(nodes),
                Step::Reject => return None,
                Step::Continue => {}
            }
            node = graph.successors(&node).next()?;
            depth += 1;
        }
    }
}
