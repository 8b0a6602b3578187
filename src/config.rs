//! Pipeline configuration loading.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::events::EventSearchConfig;
use crate::tracker::TrackerConfig;
use crate::{Error, Result};

/// Tracking and event search settings for one run.
///
/// ```json
/// {
///   "tracker": { "max_object_distance": 30.0, "max_split_objects": 2, "max_tracking_gap": 3 },
///   "events": { "label_transitions": [[1, 2]], "backward_range": 4, "forward_range": 8 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tracker: TrackerConfig,
    pub events: EventSearchConfig,
}

impl PipelineConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            Error::IoError(std::io::Error::new(
                e.kind(),
                format!("failed to read configuration '{}': {}", path.display(), e),
            ))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.tracker.validate()?;
        self.events.validate()
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
