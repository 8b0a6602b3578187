//! Per-frame object samples fed to the tracker.

use nalgebra::{DVector, Point2};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Object id reserved for "no object in this frame".
pub const NO_OBJECT: i32 = -1;

/// Axis-aligned bounding box of a segmented object (inclusive pixel bounds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Degenerate box around a single point.
    pub fn around(point: &Point2<f64>) -> Self {
        Self::new(point.x, point.y, point.x, point.y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// One segmented object in one frame.
///
/// Produced by the segmentation/feature-extraction stage and owned by the
/// lineage graph node it is attached to. Samples are never mutated once
/// they enter the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSample {
    /// Frame the object was segmented in.
    pub frame: i32,

    /// Object label, unique within its frame.
    pub object_id: i32,

    /// Object centre in image coordinates.
    pub centroid: Point2<f64>,

    /// Feature vector, fixed length for a whole run.
    pub features: DVector<f64>,

    /// Bounding box of the object's segmentation mask.
    pub bounding_box: BoundingBox,

    /// Class predicted by the classifier, if the object was classified.
    pub class_label: Option<i32>,
}

impl ObjectSample {
    /// Create a new sample.
    ///
    /// # Arguments
    /// * `frame` - Frame index
    /// * `object_id` - Object label within the frame (`-1` is reserved)
    /// * `centroid` - Object centre
    /// * `features` - Feature vector
    /// * `bounding_box` - Bounding box of the object
    pub fn new(
        frame: i32,
        object_id: i32,
        centroid: Point2<f64>,
        features: DVector<f64>,
        bounding_box: BoundingBox,
    ) -> Result<Self> {
        if object_id == NO_OBJECT {
            return Err(Error::InvalidSample(format!(
                "object id {} is reserved (frame {})",
                NO_OBJECT, frame
            )));
        }
        if !centroid.x.is_finite() || !centroid.y.is_finite() {
            return Err(Error::InvalidSample(format!(
                "non-finite centroid for object {} in frame {}",
                object_id, frame
            )));
        }

        Ok(Self {
            frame,
            object_id,
            centroid,
            features,
            bounding_box,
            class_label: None,
        })
    }

    /// Create a sample with only a centroid (empty features, point bounding box).
    pub fn at(frame: i32, object_id: i32, x: f64, y: f64) -> Result<Self> {
        let centroid = Point2::new(x, y);
        Self::new(
            frame,
            object_id,
            centroid,
            DVector::zeros(0),
            BoundingBox::around(&centroid),
        )
    }

    /// Attach a predicted class label.
    pub fn with_class_label(mut self, label: i32) -> Self {
        self.class_label = Some(label);
        self
    }

    /// Number of features in this sample.
    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    /// Euclidean distance between the centroids of two samples.
    pub fn centroid_distance(&self, other: &ObjectSample) -> f64 {
        nalgebra::distance(&self.centroid, &other.centroid)
    }
}

/// Check that every sample in every frame carries the same number of features.
///
/// The expected length is taken from the first sample seen. Must be run
/// before any frame is ingested.
pub fn validate_feature_shape<'a, I>(frames: I) -> Result<Option<usize>>
where
    I: IntoIterator<Item = &'a [ObjectSample]>,
{
    let mut expected: Option<usize> = None;

    for samples in frames {
        for sample in samples {
            match expected {
                None => expected = Some(sample.num_features()),
                Some(n) if n != sample.num_features() => {
                    return Err(Error::FeatureShape {
                        frame: sample.frame,
                        object_id: sample.object_id,
                        expected: n,
                        got: sample.num_features(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    Ok(expected)
}
