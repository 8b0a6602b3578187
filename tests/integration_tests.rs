//! Integration tests for celltrack-rs.
//!
//! These tests verify complete tracking and event search workflows across
//! multiple modules.

use std::fs;
use std::sync::atomic::AtomicBool;

use celltrack_rs::formats::{full_tracks, EventTableWriter, LineageDump, SampleFileParser};
use celltrack_rs::{
    run_positions, EventSearchConfig, EventSearcher, GapBridger, NodeId, ObjectSample,
    PipelineConfig, PositionRunner, Tracker, TrackerConfig,
};

fn n(frame: i32, id: i32) -> NodeId {
    NodeId::new(frame, id)
}

fn samples(frame: i32, objects: &[(i32, f64, f64)]) -> Vec<ObjectSample> {
    objects
        .iter()
        .map(|&(id, x, y)| ObjectSample::at(frame, id, x, y).unwrap())
        .collect()
}

fn labelled(frame: i32, objects: &[(i32, f64, f64, i32)]) -> Vec<ObjectSample> {
    objects
        .iter()
        .map(|&(id, x, y, label)| {
            ObjectSample::at(frame, id, x, y)
                .unwrap()
                .with_class_label(label)
        })
        .collect()
}

fn tracker(max_object_distance: f64, max_split_objects: usize, max_tracking_gap: i32) -> Tracker {
    let mut config = TrackerConfig::new(max_object_distance);
    config.max_split_objects = max_split_objects;
    config.max_tracking_gap = max_tracking_gap;
    Tracker::new(config).expect("Failed to create tracker")
}

/// One cell over frames 0-4 that divides at frame 5; frame 6 is empty and
/// the daughters reappear at frame 7.
fn mitosis_frames() -> Vec<(i32, Vec<ObjectSample>)> {
    vec![
        (0, labelled(0, &[(1, 0.0, 0.0, 1)])),
        (1, labelled(1, &[(1, 0.0, 0.0, 1)])),
        (2, labelled(2, &[(1, 0.0, 0.0, 1)])),
        (3, labelled(3, &[(1, 0.0, 0.0, 2)])),
        (4, labelled(4, &[(1, 0.0, 0.0, 2)])),
        (5, labelled(5, &[(1, -5.0, 0.0, 3), (2, 5.0, 0.0, 3)])),
        (6, Vec::new()),
        (7, labelled(7, &[(1, -5.0, 0.0, 3), (2, 5.0, 0.0, 3)])),
    ]
}

fn mitosis_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.tracker.max_object_distance = 8.0;
    config.events.label_transitions = vec![(1, 2)];
    config.events.backward_range = 2;
    config.events.forward_range = 3;
    config
}

// =============================================================================
// Correspondence scenarios
// =============================================================================

#[test]
fn test_integration_closest_pairing() {
    let mut tracker = tracker(5.0, 3, 1);
    tracker.track_next_frame(0, samples(0, &[(1, 0.0, 0.0), (2, 100.0, 100.0)])).unwrap();
    tracker.track_next_frame(1, samples(1, &[(1, 1.0, 1.0), (2, 99.0, 99.0)])).unwrap();

    let edges: Vec<_> = tracker.graph().edges().collect();
    assert_eq!(edges, vec![(n(0, 1), n(1, 1)), (n(0, 2), n(1, 2))]);
}

#[test]
fn test_integration_split() {
    let mut tracker = tracker(5.0, 2, 1);
    tracker.track_next_frame(0, samples(0, &[(1, 0.0, 0.0)])).unwrap();
    tracker.track_next_frame(1, samples(1, &[(1, 1.0, 0.0), (2, 0.0, 1.0)])).unwrap();

    let graph = tracker.graph();
    assert_eq!(graph.out_degree(&n(0, 1)), 2);
    assert_eq!(graph.successors(&n(0, 1)).collect::<Vec<_>>(), vec![n(1, 1), n(1, 2)]);
    assert_eq!(tracker.stats().split_parents, 1);
}

#[test]
fn test_integration_merge() {
    let mut tracker = tracker(5.0, 2, 1);
    tracker.track_next_frame(0, samples(0, &[(1, 0.0, 0.0), (2, 0.0, 1.0)])).unwrap();
    tracker.track_next_frame(1, samples(1, &[(1, 0.0, 0.5)])).unwrap();

    let graph = tracker.graph();
    assert_eq!(graph.in_degree(&n(1, 1)), 2);
    assert_eq!(graph.predecessors(&n(1, 1)).collect::<Vec<_>>(), vec![n(0, 1), n(0, 2)]);
    assert_eq!(tracker.stats().merge_edges, 2);
}

#[test]
fn test_integration_gap_bridging() {
    let mut tracker = tracker(5.0, 3, 3);
    tracker.track_next_frame(1, samples(1, &[(1, 0.0, 0.0)])).unwrap();
    tracker.track_next_frame(2, samples(2, &[(1, 0.0, 0.0)])).unwrap();
    tracker.track_next_frame(3, Vec::new()).unwrap();

    let bridger = GapBridger::new(3);
    assert_eq!(bridger.closest_preceding_frame(tracker.frame_index(), 4), Some(2));

    let res = tracker.track_next_frame(4, samples(4, &[(1, 0.0, 0.0)])).unwrap();
    assert_eq!(res.previous_frame, Some(2));
    assert!(tracker.graph().successors(&n(2, 1)).any(|s| s == n(4, 1)));
    assert_eq!(tracker.stats().bridged_gaps, 1);
}

#[test]
fn test_integration_gap_too_wide() {
    let mut tracker = tracker(5.0, 3, 2);
    tracker.track_next_frame(0, samples(0, &[(1, 0.0, 0.0)])).unwrap();
    for frame in 1..3 {
        tracker.track_next_frame(frame, Vec::new()).unwrap();
    }
    let res = tracker.track_next_frame(3, samples(3, &[(1, 0.0, 0.0)])).unwrap();

    assert!(!res.is_linked());
    assert_eq!(tracker.graph().edge_count(), 0);
    assert_eq!(tracker.graph().roots().count(), 2);
}

// =============================================================================
// Event search scenarios
// =============================================================================

#[test]
fn test_integration_event_search_chain() {
    let labels = [1, 1, 1, 4, 6, 1, 1, 1, 1, 1];
    let mut tracker = tracker(5.0, 3, 1);
    for (frame, &label) in labels.iter().enumerate() {
        let frame = frame as i32;
        tracker
            .track_next_frame(frame, labelled(frame, &[(1, frame as f64, 0.0, label)]))
            .unwrap();
    }

    let mut config = EventSearchConfig::default();
    config.label_transitions = vec![(4, 6)];
    config.backward_range = 2;
    config.forward_range = 2;

    let result = EventSearcher::new(config).unwrap().search(tracker.graph());
    assert_eq!(result.events.len(), 1);

    let event = &result.events[0];
    assert_eq!(event.event_node_id, n(3, 1));
    assert_eq!(event.split_node_id, None);
    assert_eq!(event.duration, 4);

    let frames: Vec<i32> = event.tracks[0].iter().map(|id| id.frame).collect();
    assert_eq!(frames, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_integration_mitosis_pipeline() {
    let runner = PositionRunner::new("A01", mitosis_config()).unwrap();
    let outcome = runner.run(mitosis_frames(), &AtomicBool::new(false)).unwrap();

    let stats = &outcome.tracking_stats;
    assert_eq!(stats.frames, 8);
    assert_eq!(stats.empty_frames, 1);
    assert_eq!(stats.unlinked_frames, 1);
    assert_eq!(stats.bridged_gaps, 1);
    assert_eq!(stats.nodes, 9);
    assert_eq!(stats.move_edges, 8);
    assert_eq!(stats.split_parents, 1);
    assert!(!outcome.frame_index.contains(6));

    assert_eq!(outcome.events.len(), 1);
    let event = &outcome.events[0];
    assert_eq!(event.event_node_id, n(2, 1));
    assert_eq!(event.split_node_id, Some(n(4, 1)));
    assert_eq!(event.tracks.len(), 2);
    assert_eq!(event.tracks[0].last(), Some(&n(5, 1)));
    assert_eq!(event.tracks[1].last(), Some(&n(5, 2)));
    assert_eq!(event.start_node_id(), Some(n(0, 1)));

    let tracks = full_tracks(&outcome.graph);
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].last(), Some(&n(7, 1)));
    assert_eq!(tracks[1].last(), Some(&n(7, 2)));
}

#[test]
fn test_integration_edges_point_forward() {
    let runner = PositionRunner::new("A01", mitosis_config()).unwrap();
    let outcome = runner.run(mitosis_frames(), &AtomicBool::new(false)).unwrap();

    for (head, tail) in outcome.graph.edges() {
        assert!(head.frame < tail.frame, "edge {} -> {} does not point forward", head, tail);
        assert!(outcome.graph.contains(&head));
        assert!(outcome.graph.contains(&tail));
    }
}

#[test]
fn test_integration_deterministic_runs() {
    let config = mitosis_config();
    let first = PositionRunner::new("A01", config.clone())
        .unwrap()
        .run(mitosis_frames(), &AtomicBool::new(false))
        .unwrap();
    let second = PositionRunner::new("A01", config)
        .unwrap()
        .run(mitosis_frames(), &AtomicBool::new(false))
        .unwrap();

    assert_eq!(first.graph.edges().collect::<Vec<_>>(), second.graph.edges().collect::<Vec<_>>());
    assert_eq!(first.events, second.events);
    assert_eq!(first.visits, second.visits);
    assert_eq!(first.search_stats, second.search_stats);
}

// =============================================================================
// File round trip
// =============================================================================

#[test]
fn test_integration_sample_file_to_event_tables() {
    let dir = tempfile::tempdir().unwrap();

    let mut csv = String::from(
        "frame,object_id,centroid_x,centroid_y,min_x,min_y,max_x,max_y,class_label,area\n",
    );
    for (frame, objects) in mitosis_frames() {
        if objects.is_empty() {
            csv.push_str(&format!("{},-1,,,,,,,\n", frame));
        }
        for s in objects {
            let label = s.class_label.map(|l| l.to_string()).unwrap_or_default();
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{}\n",
                s.frame,
                s.object_id,
                s.centroid.x,
                s.centroid.y,
                s.centroid.x - 2.0,
                s.centroid.y - 2.0,
                s.centroid.x + 2.0,
                s.centroid.y + 2.0,
                label,
                16.0
            ));
        }
    }
    let sample_path = dir.path().join("samples.csv");
    fs::write(&sample_path, csv).unwrap();

    let parser = SampleFileParser::new(&sample_path).unwrap();
    assert_eq!(parser.num_frames(), 8);
    assert_eq!(parser.num_features(), Some(1));

    let runner = PositionRunner::new("B03", mitosis_config()).unwrap();
    let outcome = runner.run(parser.into_frames(), &AtomicBool::new(false)).unwrap();
    assert_eq!(outcome.events.len(), 1);

    let writer = EventTableWriter::new(dir.path().join("events")).unwrap();
    let written = writer.write_events(&outcome.graph, &outcome.events).unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["0_1_0.tsv", "0_1_1.tsv"]);

    let table = fs::read_to_string(&written[1]).unwrap();
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), 7);
    assert!(lines[0].ends_with("feature_0"));
    assert!(lines[6].starts_with("5\t2\t5_2\t5.0000\t0.0000\t3\t"));

    let dump_path = dir.path().join("lineage.json");
    LineageDump::from_graph(&outcome.graph).write_json(&dump_path).unwrap();
    let rebuilt = LineageDump::read_json(&dump_path).unwrap().to_graph().unwrap();
    assert_eq!(rebuilt.node_count(), outcome.graph.node_count());
    assert_eq!(rebuilt.edges().collect::<Vec<_>>(), outcome.graph.edges().collect::<Vec<_>>());
}

#[test]
fn test_integration_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.json");
    fs::write(&path, mitosis_config().to_json_string().unwrap()).unwrap();

    let config = PipelineConfig::from_file(&path).unwrap();
    assert_eq!(config, mitosis_config());
}

// =============================================================================
// Multiple positions
// =============================================================================

#[test]
fn test_integration_run_positions() {
    let jobs = vec![
        ("A01".to_string(), mitosis_frames()),
        ("A02".to_string(), mitosis_frames()),
    ];
    let results = run_positions(jobs, &mitosis_config(), &AtomicBool::new(false));

    assert_eq!(results.len(), 2);
    for (position, result) in &results {
        let outcome = result.as_ref().unwrap();
        assert_eq!(&outcome.position, position);
        assert_eq!(outcome.events.len(), 1);
    }
}

#[test]
fn test_integration_run_positions_aborted() {
    let jobs = vec![("A01".to_string(), mitosis_frames())];
    let results = run_positions(jobs, &mitosis_config(), &AtomicBool::new(true));

    assert!(matches!(results[0].1, Err(celltrack_rs::Error::Aborted { frame: 0, .. })));
}
