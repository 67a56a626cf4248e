//! Typed scene configuration.
//!
//! The JSON document describes the camera the input frames were
//! rendered with, the frame resolution, and the per-frame entries:
//!
//! ```json
//! {
//!   "camera": { "projection": "fisheye_equisolid",
//!               "focal_length": 10.5, "sensor_width": 36.0, "fov": 3.14159 },
//!   "resolution": [1920, 1080],
//!   "frames": [ { "name": "shot_010" } ]
//! }
//! ```
//!
//! The config is parsed once into an immutable [`SceneConfig`] and
//! derived documents are built as new values; nothing mutates a shared
//! dictionary in place. Keys this tool does not understand are
//! preserved through flattened maps so a round trip keeps them.

use std::path::{Path, PathBuf};

use relens_pipeline::{LensError, LensModel};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One scene description document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Camera the frames were captured through.
    pub camera: CameraConfig,
    /// Frame resolution, `[width, height]`.
    pub resolution: [u32; 2],
    /// Named frame entries.
    #[serde(default)]
    pub frames: Vec<FrameEntry>,
    /// Keys this tool does not interpret, preserved on round trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Camera description, tagged by projection model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "projection", rename_all = "snake_case")]
pub enum CameraConfig {
    /// Planar perspective projection.
    Rectilinear {
        focal_length: f64,
        sensor_width: f64,
    },
    /// Equisolid-angle fisheye.
    FisheyeEquisolid {
        focal_length: f64,
        sensor_width: f64,
        fov: f64,
    },
    /// Equidistant fisheye.
    FisheyeEquidistant { fov: f64, sensor_width: f64 },
}

/// One named frame entry; unknown keys ride along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEntry {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Configuration errors; all of these are startup-fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config file is not valid JSON or misses required keys.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Config file could not be written.
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Camera parameters describe an invalid lens.
    #[error(transparent)]
    Lens(#[from] LensError),
}

impl SceneConfig {
    /// Pixel aspect of the configured resolution
    /// (`height / width`), which fixes the derived sensor height.
    #[must_use]
    pub fn aspect(&self) -> f64 {
        f64::from(self.resolution[1]) / f64::from(self.resolution[0])
    }

    /// Build the input [`LensModel`] from the camera description.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Lens`] when the parameters violate a lens
    /// invariant (non-positive sensor, fov outside (0, 2π), ...).
    pub fn input_lens(&self) -> Result<LensModel, ConfigError> {
        let aspect = self.aspect();
        let lens = match self.camera {
            CameraConfig::Rectilinear {
                focal_length,
                sensor_width,
            } => LensModel::rectilinear(focal_length, sensor_width, aspect)?,
            CameraConfig::FisheyeEquisolid {
                focal_length,
                sensor_width,
                fov,
            } => LensModel::fisheye_equisolid(focal_length, sensor_width, fov, aspect)?,
            CameraConfig::FisheyeEquidistant { fov, sensor_width } => {
                LensModel::fisheye_equidistant(fov, sensor_width, aspect)?
            }
        };
        Ok(lens)
    }

    /// A new document with the camera replaced by `lens` and the
    /// resolution scaled (truncated towards zero). `self` is untouched.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn with_output(&self, lens: &LensModel, scale: f64) -> Self {
        let camera = match *lens {
            LensModel::Rectilinear {
                focal_length,
                sensor,
            } => CameraConfig::Rectilinear {
                focal_length,
                sensor_width: sensor.width,
            },
            LensModel::FisheyeEquisolid {
                focal_length,
                fov,
                sensor,
            } => CameraConfig::FisheyeEquisolid {
                focal_length,
                sensor_width: sensor.width,
                fov,
            },
            LensModel::FisheyeEquidistant { fov, sensor } => CameraConfig::FisheyeEquidistant {
                fov,
                sensor_width: sensor.width,
            },
        };
        Self {
            camera,
            resolution: [
                (f64::from(self.resolution[0]) * scale) as u32,
                (f64::from(self.resolution[1]) * scale) as u32,
            ],
            frames: self.frames.clone(),
            extra: self.extra.clone(),
        }
    }

    /// Keep only frames whose name starts with `prefix` and ends with
    /// `suffix`; names shorter than either affix are dropped.
    #[must_use]
    pub fn retain_frames(mut self, prefix: &str, suffix: &str) -> Self {
        self.frames
            .retain(|frame| crate::discover::matches_affixes(&frame.name, prefix, suffix));
        self
    }
}

/// Read and parse a scene configuration.
///
/// # Errors
///
/// [`ConfigError::Read`] / [`ConfigError::Parse`] on unreadable or
/// malformed content; both are startup-fatal to the caller.
pub fn read_scene_config(path: &Path) -> Result<SceneConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.into(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.into(),
        source,
    })
}

/// Write a scene configuration as pretty-printed JSON.
///
/// # Errors
///
/// [`ConfigError::Write`] when the file cannot be written.
pub fn write_scene_config(config: &SceneConfig, path: &Path) -> Result<(), ConfigError> {
    // SceneConfig always serializes; only the filesystem can fail here.
    let text = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Parse {
        path: path.into(),
        source,
    })?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.into(),
        source,
    })
}
