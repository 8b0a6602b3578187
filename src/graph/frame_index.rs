//! Ordered index of occupied frames.

use std::collections::BTreeMap;
use std::ops::Range;

/// Mapping from frame number to the object ids present in that frame.
///
/// Only frames that contained at least one object are registered; a frame
/// missing from the index is a gap.
#[derive(Debug, Clone, Default)]
pub struct FrameIndex {
    frames: BTreeMap<i32, Vec<i32>>,
}

impl FrameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the object ids of a frame, replacing any previous entry.
    pub fn insert(&mut self, frame: i32, object_ids: Vec<i32>) {
        self.frames.insert(frame, object_ids);
    }

    pub fn contains(&self, frame: i32) -> bool {
        self.frames.contains_key(&frame)
    }

    /// Object ids of a frame in segmentation order.
    pub fn objects(&self, frame: i32) -> &[i32] {
        self.frames.get(&frame).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Start of the recording: the first occupied frame.
    pub fn first_frame(&self) -> Option<i32> {
        self.frames.keys().next().copied()
    }

    pub fn last_frame(&self) -> Option<i32> {
        self.frames.keys().next_back().copied()
    }

    /// Latest occupied frame within `frames`, if any.
    pub fn last_occupied_in(&self, frames: Range<i32>) -> Option<i32> {
        if frames.is_empty() {
            return None;
        }
        self.frames.range(frames).next_back().map(|(frame, _)| *frame)
    }

    /// Occupied frames in increasing order.
    pub fn frames(&self) -> impl Iterator<Item = i32> + '_ {
        self.frames.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
