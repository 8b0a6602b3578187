//! Frame-to-frame correspondence resolution.
//!
//! Objects of the preceding occupied frame are linked to objects of the
//! current frame by nearest-neighbour proposals under a distance threshold.
//! Ambiguous proposals (one child reachable from several parents) are
//! resolved per child so that no parent is committed as both an ambiguous
//! split source and a merge source by the same call.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::graph::{FrameIndex, LineageGraph, NodeId};
use crate::{Error, Result};

/// A proposed correspondence to another node at a given centroid distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub distance: f64,
    pub node: NodeId,
}

/// Order by distance, ties broken by the lower object id.
fn by_distance(a: &Candidate, b: &Candidate) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.node.object_id.cmp(&b.node.object_id))
}

/// Distance-filtered proposals between two frames.
#[derive(Debug, Clone, Default)]
pub struct CandidateMaps {
    /// Children reachable from each parent, nearest first, truncated to `max_split_objects`.
    pub splits: BTreeMap<NodeId, Vec<Candidate>>,
    /// Parents reaching each child, in parent frame order.
    pub merges: BTreeMap<NodeId, Vec<Candidate>>,
}

/// Rule an edge was committed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// The child had a single candidate parent.
    Move,
    /// The child had several parents; this one was not itself splitting.
    Merge,
    /// No other rule applied; the closest parent was taken.
    Fallback,
}

/// A resolved `parent -> child` correspondence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub head: NodeId,
    pub tail: NodeId,
    pub kind: LinkKind,
}

/// Links committed between two frames.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub links: Vec<Link>,
}

impl Resolution {
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn count(&self, kind: LinkKind) -> usize {
        self.links.iter().filter(|l| l.kind == kind).count()
    }

    /// Number of parents linked to more than one child.
    pub fn split_parents(&self) -> usize {
        let mut children: BTreeMap<NodeId, usize> = BTreeMap::new();
        for link in &self.links {
            *children.entry(link.head).or_insert(0) += 1;
        }
        children.values().filter(|&&n| n > 1).count()
    }
}

/// Nearest-neighbour correspondence resolver with split/merge handling.
#[derive(Debug, Clone)]
pub struct CorrespondenceResolver {
    max_object_distance: f64,
    max_split_objects: usize,
}

impl CorrespondenceResolver {
    /// Create a resolver.
    ///
    /// # Arguments
    /// * `max_object_distance` - Exclusive centroid distance bound for proposals
    /// * `max_split_objects` - Nearest children considered per parent
    pub fn new(max_object_distance: f64, max_split_objects: usize) -> Result<Self> {
        if !(max_object_distance.is_finite() && max_object_distance > 0.0) {
            return Err(Error::InvalidConfig(
                "max_object_distance must be a positive finite number".to_string(),
            ));
        }
        if max_split_objects == 0 {
            return Err(Error::InvalidConfig(
                "max_split_objects must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            max_object_distance,
            max_split_objects,
        })
    }

    pub fn max_object_distance(&self) -> f64 {
        self.max_object_distance
    }

    pub fn max_split_objects(&self) -> usize {
        self.max_split_objects
    }

    /// Build the split/merge proposal maps between `previous` and `current`.
    ///
    /// For every parent, children strictly closer than `max_object_distance`
    /// are sorted by distance and only the nearest `max_split_objects` are
    /// kept. Both maps are built from that truncated set.
    pub fn propose(
        &self,
        graph: &LineageGraph,
        index: &FrameIndex,
        previous: i32,
        current: i32,
    ) -> Result<CandidateMaps> {
        let mut maps = CandidateMaps::default();

        for &parent_id in index.objects(previous) {
            let parent = NodeId::new(previous, parent_id);
            let parent_sample = graph.node_data(&parent)?;

            let mut nearest = Vec::new();
            for &child_id in index.objects(current) {
                let child = NodeId::new(current, child_id);
                let distance = parent_sample.centroid_distance(graph.node_data(&child)?);
                if distance < self.max_object_distance {
                    nearest.push(Candidate { distance, node: child });
                }
            }

            nearest.sort_by(by_distance);
            nearest.truncate(self.max_split_objects);

            for candidate in &nearest {
                maps.merges.entry(candidate.node).or_default().push(Candidate {
                    distance: candidate.distance,
                    node: parent,
                });
            }
            if !nearest.is_empty() {
                maps.splits.insert(parent, nearest);
            }
        }

        Ok(maps)
    }

    /// Resolve proposals into links, visiting children in `child_order`.
    ///
    /// Each child is decided on its own:
    /// - one candidate parent: commit it;
    /// - several: commit every parent whose only split candidate is this child;
    /// - if nothing was committed, commit the closest parent (lowest object id on ties).
    pub fn resolve(&self, maps: &CandidateMaps, child_order: &[NodeId]) -> Resolution {
        let mut resolution = Resolution::default();

        for child in child_order {
            let Some(parents) = maps.merges.get(child) else {
                continue;
            };

            if let [only] = parents.as_slice() {
                resolution.links.push(Link {
                    head: only.node,
                    tail: *child,
                    kind: LinkKind::Move,
                });
                continue;
            }

            let before = resolution.links.len();
            for parent in parents {
                let unambiguous = maps
                    .splits
                    .get(&parent.node)
                    .map_or(false, |children| children.len() == 1);
                if unambiguous {
                    resolution.links.push(Link {
                        head: parent.node,
                        tail: *child,
                        kind: LinkKind::Merge,
                    });
                }
            }

            if resolution.links.len() == before {
                if let Some(closest) = parents.iter().min_by(|a, b| by_distance(a, b)) {
                    resolution.links.push(Link {
                        head: closest.node,
                        tail: *child,
                        kind: LinkKind::Fallback,
                    });
                }
            }
        }

        resolution
    }

    /// Propose, resolve and commit edges from frame `previous` to frame `current`.
    pub fn connect(
        &self,
        graph: &mut LineageGraph,
        index: &FrameIndex,
        previous: i32,
        current: i32,
    ) -> Result<Resolution> {
        let maps = self.propose(graph, index, previous, current)?;
        let child_order: Vec<NodeId> = index
            .objects(current)
            .iter()
            .map(|&id| NodeId::new(current, id))
            .collect();

        let resolution = self.resolve(&maps, &child_order);
        for link in &resolution.links {
            graph.add_edge(link.head, link.tail)?;
        }

        debug!(
            previous,
            current,
            edges = resolution.len(),
            merges = resolution.count(LinkKind::Merge),
            fallbacks = resolution.count(LinkKind::Fallback),
            "resolved frame correspondences"
        );

        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectSample;
    use std::collections::BTreeSet;

    /// Build a two-frame graph; frame 0 is P and frame 1 is T.
    fn setup(prev: &[(i32, f64, f64)], cur: &[(i32, f64, f64)]) -> (LineageGraph, FrameIndex) {
        let mut graph = LineageGraph::new();
        let mut index = FrameIndex::new();
        for (frame, objects) in [(0, prev), (1, cur)] {
            for &(id, x, y) in objects {
                graph.add_sample(ObjectSample::at(frame, id, x, y).unwrap()).unwrap();
            }
            index.insert(frame, objects.iter().map(|o| o.0).collect());
        }
        (graph, index)
    }

    fn edge_set(graph: &LineageGraph) -> BTreeSet<(NodeId, NodeId)> {
        graph.edges().collect()
    }

    fn n(frame: i32, id: i32) -> NodeId {
        NodeId::new(frame, id)
    }

    // ===== Configuration =====

    #[test]
    fn test_resolver_invalid_config() {
        assert!(CorrespondenceResolver::new(0.0, 1).is_err());
        assert!(CorrespondenceResolver::new(-1.0, 1).is_err());
        assert!(CorrespondenceResolver::new(f64::NAN, 1).is_err());
        assert!(CorrespondenceResolver::new(5.0, 0).is_err());
        assert!(CorrespondenceResolver::new(5.0, 1).is_ok());
    }

    // ===== Simple moves =====

    #[test]
    fn test_closest_pairing() {
        let (mut graph, index) = setup(
            &[(1, 0.0, 0.0), (2, 100.0, 100.0)],
            &[(1, 1.0, 1.0), (2, 99.0, 99.0)],
        );
        let resolver = CorrespondenceResolver::new(5.0, 3).unwrap();
        let res = resolver.connect(&mut graph, &index, 0, 1).unwrap();

        assert_eq!(res.count(LinkKind::Move), 2);
        assert_eq!(
            edge_set(&graph),
            BTreeSet::from([(n(0, 1), n(1, 1)), (n(0, 2), n(1, 2))])
        );
    }

    #[test]
    fn test_distance_threshold_is_exclusive() {
        let (mut graph, index) = setup(&[(1, 0.0, 0.0)], &[(1, 3.0, 4.0)]);
        let resolver = CorrespondenceResolver::new(5.0, 3).unwrap();
        let res = resolver.connect(&mut graph, &index, 0, 1).unwrap();

        assert!(res.is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    // ===== Splits =====

    #[test]
    fn test_split_single_parent() {
        let (mut graph, index) = setup(&[(1, 0.0, 0.0)], &[(1, 1.0, 0.0), (2, 0.0, 1.0)]);
        let resolver = CorrespondenceResolver::new(5.0, 2).unwrap();
        let res = resolver.connect(&mut graph, &index, 0, 1).unwrap();

        assert_eq!(
            edge_set(&graph),
            BTreeSet::from([(n(0, 1), n(1, 1)), (n(0, 1), n(1, 2))])
        );
        assert_eq!(res.split_parents(), 1);
        assert_eq!(graph.out_degree(&n(0, 1)), 2);
    }

    #[test]
    fn test_split_cap_keeps_nearest() {
        let (mut graph, index) = setup(
            &[(1, 0.0, 0.0)],
            &[(1, 3.0, 0.0), (2, 1.0, 0.0), (3, 2.0, 0.0)],
        );
        let resolver = CorrespondenceResolver::new(5.0, 2).unwrap();
        resolver.connect(&mut graph, &index, 0, 1).unwrap();

        assert_eq!(
            edge_set(&graph),
            BTreeSet::from([(n(0, 1), n(1, 2)), (n(0, 1), n(1, 3))])
        );
    }

    #[test]
    fn test_split_cap_tie_prefers_lower_object_id() {
        let (graph, index) = setup(
            &[(1, 0.0, 0.0)],
            &[(3, 0.0, 1.0), (2, 1.0, 0.0), (1, -1.0, 0.0)],
        );
        let resolver = CorrespondenceResolver::new(5.0, 2).unwrap();
        let maps = resolver.propose(&graph, &index, 0, 1).unwrap();

        let kept: Vec<NodeId> = maps.splits[&n(0, 1)].iter().map(|c| c.node).collect();
        assert_eq!(kept, vec![n(1, 1), n(1, 2)]);
        assert!(!maps.merges.contains_key(&n(1, 3)));
    }

    // ===== Merges =====

    #[test]
    fn test_merge_two_parents() {
        let (mut graph, index) = setup(&[(1, 0.0, 0.0), (2, 0.0, 1.0)], &[(1, 0.0, 0.5)]);
        let resolver = CorrespondenceResolver::new(5.0, 3).unwrap();
        let res = resolver.connect(&mut graph, &index, 0, 1).unwrap();

        assert_eq!(res.count(LinkKind::Merge), 2);
        assert_eq!(
            edge_set(&graph),
            BTreeSet::from([(n(0, 1), n(1, 1)), (n(0, 2), n(1, 1))])
        );
        assert_eq!(graph.in_degree(&n(1, 1)), 2);
    }

    #[test]
    fn test_merge_skips_splitting_parent() {
        // P.1 reaches T.1 and T.2, P.2 reaches only T.1.
        let (mut graph, index) = setup(
            &[(1, 0.0, 0.0), (2, -3.0, 0.0)],
            &[(1, -1.0, 0.0), (2, 2.0, 0.0)],
        );
        let resolver = CorrespondenceResolver::new(4.0, 3).unwrap();
        let res = resolver.connect(&mut graph, &index, 0, 1).unwrap();

        // T.1 merges only from the unambiguous P.2; T.2 has P.1 as sole parent.
        assert_eq!(
            edge_set(&graph),
            BTreeSet::from([(n(0, 2), n(1, 1)), (n(0, 1), n(1, 2))])
        );
        assert_eq!(res.count(LinkKind::Merge), 1);
        assert_eq!(res.count(LinkKind::Move), 1);
    }

    #[test]
    fn test_fallback_takes_closest_parent() {
        // Both parents reach both children, so no merge rule applies.
        let (mut graph, index) = setup(
            &[(1, 0.0, 0.0), (2, 3.0, 0.0)],
            &[(1, 1.5, 0.0), (2, 4.0, 0.0)],
        );
        let resolver = CorrespondenceResolver::new(5.0, 3).unwrap();
        let res = resolver.connect(&mut graph, &index, 0, 1).unwrap();

        // T.1 is equidistant from both parents: the lower object id wins.
        assert_eq!(
            edge_set(&graph),
            BTreeSet::from([(n(0, 1), n(1, 1)), (n(0, 2), n(1, 2))])
        );
        assert_eq!(res.count(LinkKind::Fallback), 2);
    }

    #[test]
    fn test_no_node_is_both_split_and_merge() {
        let (mut graph, index) = setup(
            &[(1, 0.0, 0.0), (2, 2.0, 0.0), (3, 10.0, 0.0)],
            &[(1, 1.0, 0.0), (2, 3.0, 0.0), (3, 10.0, 1.0), (4, 11.0, 0.0)],
        );
        let resolver = CorrespondenceResolver::new(3.0, 3).unwrap();
        let res = resolver.connect(&mut graph, &index, 0, 1).unwrap();

        for link in res.links.iter().filter(|l| l.kind == LinkKind::Merge) {
            assert_eq!(graph.out_degree(&link.head), 1, "merge parent {} also splits", link.head);
        }
    }

    // ===== Determinism / ordering =====

    #[test]
    fn test_resolution_is_deterministic() {
        let prev = [(1, 0.0, 0.0), (2, 2.0, 0.0), (3, 4.0, 1.0), (4, 9.0, 9.0)];
        let cur = [(1, 1.0, 0.0), (2, 3.0, 0.5), (3, 4.0, 0.0), (4, 9.0, 8.0), (5, 8.0, 9.0)];
        let resolver = CorrespondenceResolver::new(3.0, 2).unwrap();

        let (mut g1, i1) = setup(&prev, &cur);
        let (mut g2, i2) = setup(&prev, &cur);
        resolver.connect(&mut g1, &i1, 0, 1).unwrap();
        resolver.connect(&mut g2, &i2, 0, 1).unwrap();

        assert_eq!(g1.edges().collect::<Vec<_>>(), g2.edges().collect::<Vec<_>>());
    }

    #[test]
    fn test_children_committed_in_frame_order() {
        let (mut graph, index) = setup(&[(1, 0.0, 0.0)], &[(7, 1.0, 0.0), (3, 0.0, 1.0)]);
        let resolver = CorrespondenceResolver::new(5.0, 2).unwrap();
        resolver.connect(&mut graph, &index, 0, 1).unwrap();

        let tails: Vec<NodeId> = graph.edges().map(|(_, t)| t).collect();
        assert_eq!(tails, vec![n(1, 7), n(1, 3)]);
    }

    #[test]
    fn test_unknown_frame_objects_error() {
        let (mut graph, mut index) = setup(&[(1, 0.0, 0.0)], &[(1, 1.0, 0.0)]);
        index.insert(1, vec![1, 9]);
        let resolver = CorrespondenceResolver::new(5.0, 2).unwrap();
        assert!(matches!(
            resolver.connect(&mut graph, &index, 0, 1),
            Err(Error::UnknownNode(_))
        ));
    }
}
