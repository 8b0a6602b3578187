//! Event search configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Range value meaning "walk until the track ends".
pub const UNTIL_TRACK_END: i32 = -1;

/// Configuration of the transition motif search.
///
/// Depths are counted in frames-steps from the event node: the backward walk
/// starts on the event node at depth 0, the forward walk starts on the
/// transition target at depth 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSearchConfig {
    /// Maximum in-degree tolerated on the forward walk.
    pub max_in_degree: usize,

    /// Maximum out-degree tolerated on the forward walk.
    pub max_out_degree: usize,

    /// Forward depth to reach, or `-1` for the natural track end.
    pub forward_range: i32,

    /// Backward depth to reach, or `-1` for the track start.
    pub backward_range: i32,

    /// Treat `forward_range` as a minimum and continue to the track end.
    pub forward_range_min: bool,

    /// Treat `backward_range` as a minimum and continue to the track start.
    pub backward_range_min: bool,

    /// Classes allowed within the forward check window (empty: any).
    pub forward_labels: BTreeSet<i32>,

    /// Classes allowed within the backward check window (empty: any).
    pub backward_labels: BTreeSet<i32>,

    /// Forward depths `1..=forward_check` are label-filtered.
    pub forward_check: usize,

    /// Backward depths `1..=backward_check` are label-filtered.
    pub backward_check: usize,

    /// `(from, to)` class pairs marking an event.
    pub label_transitions: Vec<(i32, i32)>,

    /// Accept a split when at least one daughter passes the forward check,
    /// instead of requiring all of them to.
    pub allow_one_daughter_cell: bool,
}

impl EventSearchConfig {
    /// Check range values.
    pub fn validate(&self) -> Result<()> {
        if self.forward_range < UNTIL_TRACK_END {
            return Err(Error::InvalidConfig(format!(
                "forward_range must be >= -1, got {}",
                self.forward_range
            )));
        }
        if self.backward_range < UNTIL_TRACK_END {
            return Err(Error::InvalidConfig(format!(
                "backward_range must be >= -1, got {}",
                self.backward_range
            )));
        }
        Ok(())
    }

    /// Nominal track length in frame steps.
    pub fn duration(&self) -> i32 {
        self.backward_range + self.forward_range
    }

    /// Whether `(from, to)` is a configured transition.
    pub fn is_transition(&self, from: i32, to: i32) -> bool {
        self.label_transitions.iter().any(|&(a, b)| a == from && b == to)
    }
}

impl Default for EventSearchConfig {
    fn default() -> Self {
        Self {
            max_in_degree: 1,
            max_out_degree: 2,
            forward_range: 5,
            backward_range: 5,
            forward_range_min: false,
            backward_range_min: false,
            forward_labels: BTreeSet::new(),
            backward_labels: BTreeSet::new(),
            forward_check: 0,
            backward_check: 0,
            label_transitions: Vec::new(),
            allow_one_daughter_cell: true,
        }
    }
}
