//! Camera lens projection models.
//!
//! A [`LensModel`] maps between sensor-plane coordinates and viewing
//! rays. Sensor coordinates are in millimeters with the origin at the
//! optical center, +x right and +y up; rays are unit vectors in camera
//! space with the camera looking along −z.
//!
//! Per model, with θ the angle between a ray and the optical axis:
//!
//! ```text
//! rectilinear          r = f·tan(θ)        (planar projection at distance f)
//! fisheye equisolid    r = 2·f·sin(θ/2)    valid for θ ≤ fov/2
//! fisheye equidistant  r = f·θ             f chosen so r = sensor_width/2
//!                                          at θ = fov/2
//! ```
//!
//! A coordinate or ray outside a model's valid domain is *out of
//! frame*: a normal `None` return, never an error.

use nalgebra::Vector3;

/// Full-frame sensor width in millimeters, used when a lens spec does
/// not carry its own (the equidistant tuple is a bare fov).
pub const DEFAULT_SENSOR_WIDTH: f64 = 36.0;

/// Physical sensor extent in millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSize {
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent, derived from the width and the pixel aspect of
    /// the resolution it images.
    pub height: f64,
}

/// A point on the sensor plane, millimeters from the optical center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorCoord {
    /// Horizontal offset, +x right.
    pub x: f64,
    /// Vertical offset, +y up.
    pub y: f64,
}

/// Geometric projection model of a camera lens.
///
/// Built once from configuration before any job is submitted and
/// read-only afterwards, so concurrent unsynchronized reads are safe.
/// Every consumption site matches exhaustively; adding a model variant
/// is a compile-time sweep of all of them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LensModel {
    /// Planar (perspective) projection.
    Rectilinear {
        /// Focal length in millimeters.
        focal_length: f64,
        /// Sensor extent.
        sensor: SensorSize,
    },
    /// Equisolid-angle fisheye, `r = 2·f·sin(θ/2)`.
    FisheyeEquisolid {
        /// Focal length in millimeters.
        focal_length: f64,
        /// Total angular field of view in radians.
        fov: f64,
        /// Sensor extent.
        sensor: SensorSize,
    },
    /// Equidistant fisheye, `r = f·θ`; the focal length is implied by
    /// the field of view reaching the sensor edge.
    FisheyeEquidistant {
        /// Total angular field of view in radians.
        fov: f64,
        /// Sensor extent.
        sensor: SensorSize,
    },
}

/// Invalid lens parameters, rejected at construction.
#[derive(Debug, thiserror::Error)]
pub enum LensError {
    /// Sensor dimensions must be strictly positive.
    #[error("sensor dimensions must be positive, got {width}x{height} mm")]
    InvalidSensor { width: f64, height: f64 },

    /// Focal length must be strictly positive.
    #[error("focal length must be positive, got {0} mm")]
    InvalidFocalLength(f64),

    /// Field of view must lie in (0, 2π) radians.
    #[error("field of view must lie in (0, 2\u{3c0}) radians, got {0}")]
    InvalidFov(f64),
}

impl LensModel {
    /// Rectilinear lens. `aspect` is `resolution_height / resolution_width`
    /// and fixes the derived sensor height.
    ///
    /// # Errors
    ///
    /// [`LensError`] when the focal length or sensor extent is not
    /// strictly positive.
    pub fn rectilinear(
        focal_length: f64,
        sensor_width: f64,
        aspect: f64,
    ) -> Result<Self, LensError> {
        Ok(Self::Rectilinear {
            focal_length: positive_focal(focal_length)?,
            sensor: derive_sensor(sensor_width, aspect)?,
        })
    }

    /// Equisolid fisheye lens.
    ///
    /// # Errors
    ///
    /// [`LensError`] when the focal length or sensor extent is not
    /// strictly positive, or the fov falls outside (0, 2π).
    pub fn fisheye_equisolid(
        focal_length: f64,
        sensor_width: f64,
        fov: f64,
        aspect: f64,
    ) -> Result<Self, LensError> {
        Ok(Self::FisheyeEquisolid {
            focal_length: positive_focal(focal_length)?,
            fov: valid_fov(fov)?,
            sensor: derive_sensor(sensor_width, aspect)?,
        })
    }

    /// Equidistant fisheye lens; the focal length is derived so the
    /// image circle reaches the sensor half-width at `fov / 2`.
    ///
    /// # Errors
    ///
    /// [`LensError`] when the sensor extent is not strictly positive or
    /// the fov falls outside (0, 2π).
    pub fn fisheye_equidistant(
        fov: f64,
        sensor_width: f64,
        aspect: f64,
    ) -> Result<Self, LensError> {
        Ok(Self::FisheyeEquidistant {
            fov: valid_fov(fov)?,
            sensor: derive_sensor(sensor_width, aspect)?,
        })
    }

    /// Sensor extent of this lens.
    #[must_use]
    pub const fn sensor(&self) -> SensorSize {
        match *self {
            Self::Rectilinear { sensor, .. }
            | Self::FisheyeEquisolid { sensor, .. }
            | Self::FisheyeEquidistant { sensor, .. } => sensor,
        }
    }

    /// Map a sensor-plane coordinate to the unit viewing ray that
    /// exposes it. `None` when the coordinate is out of frame for this
    /// model.
    #[must_use]
    pub fn unproject(&self, coord: SensorCoord) -> Option<Vector3<f64>> {
        match *self {
            Self::Rectilinear {
                focal_length,
                sensor,
            } => {
                if outside_sensor(coord, sensor) {
                    return None;
                }
                Some(Vector3::new(coord.x, coord.y, -focal_length).normalize())
            }
            Self::FisheyeEquisolid { focal_length, fov, .. } => {
                let r = coord.x.hypot(coord.y);
                let half_sine = r / (2.0 * focal_length);
                if half_sine > 1.0 {
                    return None;
                }
                let theta = 2.0 * half_sine.asin();
                (theta <= fov / 2.0).then(|| ray_at(theta, coord))
            }
            Self::FisheyeEquidistant { fov, sensor } => {
                let theta = coord.x.hypot(coord.y) / equidistant_focal(fov, sensor);
                (theta <= fov / 2.0).then(|| ray_at(theta, coord))
            }
        }
    }

    /// Map a viewing ray to the sensor-plane coordinate it exposes.
    /// `None` when the ray is out of frame for this model.
    #[must_use]
    pub fn project(&self, ray: Vector3<f64>) -> Option<SensorCoord> {
        match *self {
            Self::Rectilinear {
                focal_length,
                sensor,
            } => {
                // z >= 0 points at or behind the camera plane.
                if ray.z >= 0.0 {
                    return None;
                }
                let scale = -(focal_length / ray.z);
                let coord = SensorCoord {
                    x: ray.x * scale,
                    y: ray.y * scale,
                };
                (!outside_sensor(coord, sensor)).then_some(coord)
            }
            Self::FisheyeEquisolid { focal_length, fov, .. } => {
                let theta = axis_angle(ray)?;
                (theta <= fov / 2.0)
                    .then(|| radial_coord(ray, 2.0 * focal_length * (theta / 2.0).sin()))
            }
            Self::FisheyeEquidistant { fov, sensor } => {
                let theta = axis_angle(ray)?;
                (theta <= fov / 2.0)
                    .then(|| radial_coord(ray, equidistant_focal(fov, sensor) * theta))
            }
        }
    }
}

fn positive_focal(focal_length: f64) -> Result<f64, LensError> {
    if focal_length > 0.0 {
        Ok(focal_length)
    } else {
        Err(LensError::InvalidFocalLength(focal_length))
    }
}

fn valid_fov(fov: f64) -> Result<f64, LensError> {
    if fov > 0.0 && fov < std::f64::consts::TAU {
        Ok(fov)
    } else {
        Err(LensError::InvalidFov(fov))
    }
}

fn derive_sensor(width: f64, aspect: f64) -> Result<SensorSize, LensError> {
    let height = width * aspect;
    if width > 0.0 && height > 0.0 {
        Ok(SensorSize { width, height })
    } else {
        Err(LensError::InvalidSensor { width, height })
    }
}

const fn equidistant_focal(fov: f64, sensor: SensorSize) -> f64 {
    // r = f·θ reaches width/2 at θ = fov/2.
    sensor.width / fov
}

fn outside_sensor(coord: SensorCoord, sensor: SensorSize) -> bool {
    coord.x.abs() > sensor.width / 2.0 || coord.y.abs() > sensor.height / 2.0
}

/// Unit ray at polar angle `theta` from the −z axis, with azimuth taken
/// from the sensor coordinate.
fn ray_at(theta: f64, coord: SensorCoord) -> Vector3<f64> {
    let r = coord.x.hypot(coord.y);
    if r < f64::EPSILON {
        return Vector3::new(0.0, 0.0, -1.0);
    }
    let (sin_t, cos_t) = theta.sin_cos();
    Vector3::new(sin_t * coord.x / r, sin_t * coord.y / r, -cos_t)
}

/// Angle between a ray and the −z optical axis. `None` for a degenerate
/// zero-length ray.
fn axis_angle(ray: Vector3<f64>) -> Option<f64> {
    let norm = ray.norm();
    if norm < f64::EPSILON {
        return None;
    }
    Some((-ray.z / norm).clamp(-1.0, 1.0).acos())
}

/// Sensor coordinate at radius `r` from the center, sharing the ray's
/// azimuth.
fn radial_coord(ray: Vector3<f64>, r: f64) -> SensorCoord {
    let planar = ray.x.hypot(ray.y);
    if planar < f64::EPSILON {
        return SensorCoord { x: 0.0, y: 0.0 };
    }
    SensorCoord {
        x: ray.x / planar * r,
        y: ray.y / planar * r,
    }
}

// ---------------------------------------------------------------------------
// Lens-spec strings
// ---------------------------------------------------------------------------

/// Malformed output-lens tuple, fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum LensSpecError {
    /// Wrong number of comma-separated fields.
    #[error("expected `{expected}`, got `{got}`")]
    Malformed {
        expected: &'static str,
        got: String,
    },

    /// A field did not parse as a number.
    #[error("invalid number `{field}` in `{spec}`: {source}")]
    InvalidNumber {
        field: String,
        spec: String,
        source: std::num::ParseFloatError,
    },
}

/// Parse a rectilinear output spec: `focal_length,sensor_width`.
///
/// # Errors
///
/// [`LensSpecError`] on a missing separator or non-numeric field.
pub fn parse_rectilinear_spec(spec: &str) -> Result<(f64, f64), LensSpecError> {
    let (focal, width) = spec
        .split_once(',')
        .ok_or_else(|| malformed("focal_length,sensor_width", spec))?;
    Ok((parse_field(focal, spec)?, parse_field(width, spec)?))
}

/// Parse an equisolid output spec: `focal_length,sensor_width,fov`.
///
/// # Errors
///
/// [`LensSpecError`] on missing separators or a non-numeric field.
pub fn parse_equisolid_spec(spec: &str) -> Result<(f64, f64, f64), LensSpecError> {
    let expected = "focal_length,sensor_width,fov";
    let (focal, rest) = spec.split_once(',').ok_or_else(|| malformed(expected, spec))?;
    let (width, fov) = rest.split_once(',').ok_or_else(|| malformed(expected, spec))?;
    Ok((
        parse_field(focal, spec)?,
        parse_field(width, spec)?,
        parse_field(fov, spec)?,
    ))
}

/// Parse an equidistant output spec: a bare `fov` value.
///
/// # Errors
///
/// [`LensSpecError`] when the value is not a number.
pub fn parse_equidistant_spec(spec: &str) -> Result<f64, LensSpecError> {
    parse_field(spec, spec)
}

fn malformed(expected: &'static str, got: &str) -> LensSpecError {
    LensSpecError::Malformed {
        expected,
        got: got.to_owned(),
    }
}

fn parse_field(field: &str, spec: &str) -> Result<f64, LensSpecError> {
    field
        .trim()
        .parse()
        .map_err(|source| LensSpecError::InvalidNumber {
            field: field.trim().to_owned(),
            spec: spec.to_owned(),
            source,
        })
}
