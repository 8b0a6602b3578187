//! Object sample file parser.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nalgebra::{DVector, Point2};

use crate::sample::{validate_feature_shape, BoundingBox, NO_OBJECT};
use crate::{Error, ObjectSample, Result};

/// Number of fixed columns before the feature values.
const FIXED_COLUMNS: usize = 9;

/// Parser for per-object sample files.
///
/// Reads comma-separated rows:
/// `frame,object_id,centroid_x,centroid_y,min_x,min_y,max_x,max_y,class_label,feature...`
///
/// An empty `class_label` means the object is unclassified. A row with
/// `object_id == -1` declares a frame that was processed but contained no
/// objects. Lines starting with `#` and a leading header line are skipped.
#[derive(Debug, Clone, Default)]
pub struct SampleFileParser {
    frames: BTreeMap<i32, Vec<ObjectSample>>,
    num_features: Option<usize>,
}

impl SampleFileParser {
    /// Parse the file at `file_path`.
    pub fn new<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let file = File::open(&file_path).map_err(|e| {
            Error::IoError(std::io::Error::new(
                e.kind(),
                format!("failed to open sample file: {}", e),
            ))
        })?;

        Self::from_reader(BufReader::new(file))
    }

    /// Parse samples from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut frames: BTreeMap<i32, Vec<ObjectSample>> = BTreeMap::new();

        for (line_no, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line_no == 0 && line.starts_with("frame") {
                continue;
            }

            let parts: Vec<&str> = line.split(',').map(str::trim).collect();
            if parts.len() < FIXED_COLUMNS {
                return Err(Error::Parse(format!(
                    "line {}: expected at least {} columns, got {}",
                    line_no + 1,
                    FIXED_COLUMNS,
                    parts.len()
                )));
            }

            let frame: i32 = parse_field(parts[0], "frame", line_no)?;
            let object_id: i32 = parse_field(parts[1], "object_id", line_no)?;

            let samples = frames.entry(frame).or_default();
            if object_id == NO_OBJECT {
                continue;
            }

            let centroid = Point2::new(
                parse_field(parts[2], "centroid_x", line_no)?,
                parse_field(parts[3], "centroid_y", line_no)?,
            );
            let bounding_box = BoundingBox::new(
                parse_field(parts[4], "min_x", line_no)?,
                parse_field(parts[5], "min_y", line_no)?,
                parse_field(parts[6], "max_x", line_no)?,
                parse_field(parts[7], "max_y", line_no)?,
            );
            let features = parts[FIXED_COLUMNS..]
                .iter()
                .map(|v| parse_field::<f64>(v, "feature", line_no))
                .collect::<Result<Vec<_>>>()?;

            let mut sample = ObjectSample::new(
                frame,
                object_id,
                centroid,
                DVector::from_vec(features),
                bounding_box,
            )?;
            if !parts[8].is_empty() {
                sample = sample.with_class_label(parse_field(parts[8], "class_label", line_no)?);
            }

            samples.push(sample);
        }

        let num_features = validate_feature_shape(frames.values().map(Vec::as_slice))?;

        Ok(Self { frames, num_features })
    }

    /// Feature vector length shared by all samples (`None` if there are none).
    pub fn num_features(&self) -> Option<usize> {
        self.num_features
    }

    /// Number of frames declared in the file, including empty ones.
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Samples of one frame.
    pub fn samples(&self, frame: i32) -> &[ObjectSample] {
        self.frames.get(&frame).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Frames with their samples, in increasing frame order.
    pub fn frames(&self) -> impl Iterator<Item = (i32, &[ObjectSample])> + '_ {
        self.frames.iter().map(|(f, s)| (*f, s.as_slice()))
    }

    /// Consume the parser, yielding owned frames in increasing order.
    pub fn into_frames(self) -> Vec<(i32, Vec<ObjectSample>)> {
        self.frames.into_iter().collect()
    }
}

fn parse_field<T: std::str::FromStr>(value: &str, name: &str, line_no: usize) -> Result<T> {
    value.parse().map_err(|_| {
        Error::Parse(format!(
            "line {}: invalid {} value '{}'",
            line_no + 1,
            name,
            value
        ))
    })
}
