//! Bridging of frames without segmented objects.

use crate::graph::FrameIndex;

/// Finds the frame a newly ingested frame should be linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapBridger {
    max_tracking_gap: i32,
}

impl GapBridger {
    /// Create a bridger. Values below 1 are raised to 1.
    pub fn new(max_tracking_gap: i32) -> Self {
        Self {
            max_tracking_gap: max_tracking_gap.max(1),
        }
    }

    /// Effective gap bound (always >= 1).
    pub fn max_tracking_gap(&self) -> i32 {
        self.max_tracking_gap
    }

    /// Closest occupied frame before `frame`, at most `max_tracking_gap` frames back.
    ///
    /// The walk never goes below the first frame of the recording. Returns
    /// `None` at the start of the recording or when every frame inside the
    /// window is empty.
    pub fn closest_preceding_frame(&self, index: &FrameIndex, frame: i32) -> Option<i32> {
        let start = index.first_frame()?;
        if frame <= start {
            return None;
        }

        let lowest = frame.saturating_sub(self.max_tracking_gap).max(start);
        index.last_occupied_in(lowest..frame)
    }
}

impl Default for GapBridger {
    fn default() -> Self {
        Self::new(1)
    }
}
