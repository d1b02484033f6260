//! # Engine Configuration
//!
//! Construction-time settings for the engine, loaded from JSON. Every field
//! has a default, so an empty object (or no file at all) is a valid config.
//!
//! ```json
//! {
//!     "generator": { "seed": 7, "frequency": 0.5 },
//!     "region": { "min": [-1, -2, -1], "max": [1, -1, 1] }
//! }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use cgmath::Point3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading or validating an [`EngineConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Terrain noise parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Seed for the gradient noise permutation.
    pub seed: u32,
    /// Height in voxels over which the density bias ramps from 0 at
    /// `y = -vertical_bias_depth` down to -1 at `y = 0`.
    pub vertical_bias_depth: f64,
    /// Multiplier applied to noise sample positions.
    pub frequency: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            vertical_bias_depth: 8.0,
            frequency: 1.0,
        }
    }
}

/// Stage worker behaviour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How long a stage worker sleeps when its queue is empty.
    pub idle_sleep_ms: u64,
    /// Requeues of one chunk after which it's reported as stalled. 0 disables reporting.
    pub stall_threshold: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            idle_sleep_ms: 50,
            stall_threshold: 1_000,
        }
    }
}

/// Camera projection parameters used to build the view frustum.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Inclusive box of chunk coordinates loaded at start-up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadRegion {
    pub min: [i32; 3],
    pub max: [i32; 3],
}

impl Default for LoadRegion {
    fn default() -> Self {
        Self {
            min: [-3, -5, -3],
            max: [3, -1, 3],
        }
    }
}

impl LoadRegion {
    /// Every chunk coordinate in the box, x fastest then y then z.
    pub fn coords(&self) -> impl Iterator<Item = Point3<i32>> {
        let [min_x, min_y, min_z] = self.min;
        let [max_x, max_y, max_z] = self.max;
        (min_z..=max_z).flat_map(move |z| {
            (min_y..=max_y).flat_map(move |y| (min_x..=max_x).map(move |x| Point3::new(x, y, z)))
        })
    }

    /// Number of chunks in the box.
    pub fn len(&self) -> usize {
        (0..3)
            .map(|axis| (self.max[axis] - self.min[axis] + 1).max(0) as usize)
            .product()
    }

    /// Whether the box contains no chunks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Top-level engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub generator: GeneratorConfig,
    pub pipeline: PipelineConfig,
    pub view: ViewConfig,
    pub region: LoadRegion,
}

impl EngineConfig {
    /// Parses and validates a config from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine can't run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let generator = &self.generator;
        if !(generator.frequency.is_finite() && generator.frequency > 0.0) {
            return Err(invalid("generator.frequency", "must be a positive number"));
        }
        if !(generator.vertical_bias_depth.is_finite() && generator.vertical_bias_depth > 0.0) {
            return Err(invalid(
                "generator.vertical_bias_depth",
                "must be a positive number",
            ));
        }

        if self.pipeline.idle_sleep_ms == 0 {
            return Err(invalid("pipeline.idle_sleep_ms", "must be at least 1"));
        }

        let view = &self.view;
        if !(view.fov_degrees > 0.0 && view.fov_degrees < 180.0) {
            return Err(invalid("view.fov_degrees", "must lie strictly between 0 and 180"));
        }
        if !(view.aspect.is_finite() && view.aspect > 0.0) {
            return Err(invalid("view.aspect", "must be a positive number"));
        }
        if !(view.near > 0.0 && view.near < view.far) {
            return Err(invalid(
                "view.near",
                format!("must satisfy 0 < near < far (near {}, far {})", view.near, view.far),
            ));
        }

        let region = &self.region;
        if (0..3).any(|axis| region.min[axis] > region.max[axis]) {
            return Err(invalid(
                "region",
                format!("min {:?} exceeds max {:?}", region.min, region.max),
            ));
        }

        Ok(())
    }
}
