//! Supersampled lens-to-lens reprojection.
//!
//! Every output pixel is covered by an n×n sub-pixel grid. Each
//! sub-sample walks the full mapping chain:
//!
//! ```text
//! output pixel → sensor mm → unproject → ray → project → sensor mm → input pixel
//! ```
//!
//! Sub-samples that leave either lens's valid domain, or land outside
//! the input frame, are dropped and the remainder renormalized; a pixel
//! with no contributing sub-samples stays zero. Raising the grid size
//! box-filters the output, which is what you want when downscaling.
//!
//! When the two lens models and the dimensions agree, the mapping is
//! the identity and the buffer is copied directly.

use crate::lens::{LensModel, SensorCoord};
use crate::types::{Image, PipelineError, RowOrder};
use std::fmt;

/// Point-sampling method for input lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMethod {
    /// Value of the nearest input pixel.
    Nearest,
    /// Weighted blend of the 4 enclosing pixels.
    Bilinear,
    /// 4×4 Catmull-Rom cubic convolution.
    #[default]
    Bicubic,
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("nearest"),
            Self::Bilinear => f.write_str("bilinear"),
            Self::Bicubic => f.write_str("bicubic"),
        }
    }
}

/// Re-render `input` as seen through `output_lens` at the requested
/// size, averaging a `samples × samples` sub-pixel grid per output
/// pixel.
///
/// The output inherits the input's channel count and row order.
///
/// # Errors
///
/// [`PipelineError::GeometryMismatch`] when the requested output size
/// is empty. Out-of-frame mappings are not errors.
pub fn reproject(
    input: &Image,
    output_lens: LensModel,
    out_width: u32,
    out_height: u32,
    samples: u32,
    method: InterpolationMethod,
) -> Result<Image, PipelineError> {
    if output_lens == input.lens && out_width == input.width && out_height == input.height {
        // Identity mapping: a direct copy is bit-identical to the
        // general path and skips the per-pixel lens math.
        return Image::from_samples(
            input.width,
            input.height,
            input.channels,
            input.row_order,
            output_lens,
            input.samples().to_vec(),
        );
    }
    reproject_general(input, output_lens, out_width, out_height, samples, method)
}

/// The general supersampling path, without the identity fast path.
pub(crate) fn reproject_general(
    input: &Image,
    output_lens: LensModel,
    out_width: u32,
    out_height: u32,
    samples: u32,
    method: InterpolationMethod,
) -> Result<Image, PipelineError> {
    let mut output = Image::zeroed(
        out_width,
        out_height,
        input.channels,
        input.row_order,
        output_lens,
    )?;

    let samples = samples.max(1);
    let out_sensor = output_lens.sensor();
    let in_sensor = input.lens.sensor();
    let channels = input.channels as usize;
    let sub_step = 1.0 / f64::from(samples);

    let mut accum = vec![0.0f64; channels];
    for oy in 0..out_height {
        for ox in 0..out_width {
            accum.fill(0.0);
            let mut hits = 0u32;

            for sy in 0..samples {
                for sx in 0..samples {
                    let u = (f64::from(ox) + (f64::from(sx) + 0.5) * sub_step)
                        / f64::from(out_width);
                    let v = (f64::from(oy) + (f64::from(sy) + 0.5) * sub_step)
                        / f64::from(out_height);
                    let coord = SensorCoord {
                        x: (u - 0.5) * out_sensor.width,
                        y: v_to_mm(v, out_sensor.height, output.row_order),
                    };

                    let Some(ray) = output_lens.unproject(coord) else {
                        continue;
                    };
                    let Some(hit) = input.lens.project(ray) else {
                        continue;
                    };

                    let iu = hit.x / in_sensor.width + 0.5;
                    let iv = mm_to_v(hit.y, in_sensor.height, input.row_order);
                    if !(0.0..=1.0).contains(&iu) || !(0.0..=1.0).contains(&iv) {
                        continue;
                    }

                    let px = iu * f64::from(input.width) - 0.5;
                    let py = iv * f64::from(input.height) - 0.5;
                    point_sample(&mut accum, input, px, py, method);
                    hits += 1;
                }
            }

            if hits > 0 {
                let inv = 1.0 / f64::from(hits);
                let base = output.index(ox, oy, 0);
                let dst = &mut output.samples_mut()[base..base + channels];
                for (slot, sum) in dst.iter_mut().zip(&accum) {
                    #[allow(clippy::cast_possible_truncation)]
                    {
                        *slot = (sum * inv) as f32;
                    }
                }
            }
        }
    }

    Ok(output)
}

/// Sensor-plane y (mm) of a normalized buffer-row coordinate `v` ∈ [0, 1].
fn v_to_mm(v: f64, sensor_height: f64, order: RowOrder) -> f64 {
    match order {
        RowOrder::TopFirst => (0.5 - v) * sensor_height,
        RowOrder::BottomFirst => (v - 0.5) * sensor_height,
    }
}

/// Normalized buffer-row coordinate of a sensor-plane y (mm).
fn mm_to_v(y_mm: f64, sensor_height: f64, order: RowOrder) -> f64 {
    match order {
        RowOrder::TopFirst => 0.5 - y_mm / sensor_height,
        RowOrder::BottomFirst => 0.5 + y_mm / sensor_height,
    }
}

/// Accumulate one point sample at continuous buffer coordinates
/// `(px, py)` (pixel centers at integers) into `accum`, one slot per
/// channel. Border pixels are clamped to the image edge.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn point_sample(accum: &mut [f64], input: &Image, px: f64, py: f64, method: InterpolationMethod) {
    match method {
        InterpolationMethod::Nearest => {
            let x = px.round() as i64;
            let y = py.round() as i64;
            for (channel, slot) in accum.iter_mut().enumerate() {
                *slot += fetch(input, x, y, channel as u32);
            }
        }
        InterpolationMethod::Bilinear => {
            let x0 = px.floor() as i64;
            let y0 = py.floor() as i64;
            let fx = px - px.floor();
            let fy = py - py.floor();
            for (channel, slot) in accum.iter_mut().enumerate() {
                let channel = channel as u32;
                let top = fetch(input, x0, y0, channel) * (1.0 - fx)
                    + fetch(input, x0 + 1, y0, channel) * fx;
                let bottom = fetch(input, x0, y0 + 1, channel) * (1.0 - fx)
                    + fetch(input, x0 + 1, y0 + 1, channel) * fx;
                *slot += top * (1.0 - fy) + bottom * fy;
            }
        }
        InterpolationMethod::Bicubic => {
            let x0 = px.floor() as i64;
            let y0 = py.floor() as i64;
            let wx = catmull_rom_weights(px - px.floor());
            let wy = catmull_rom_weights(py - py.floor());
            for (channel, slot) in accum.iter_mut().enumerate() {
                let channel = channel as u32;
                let mut value = 0.0;
                for (j, wyj) in wy.iter().enumerate() {
                    let mut row = 0.0;
                    for (i, wxi) in wx.iter().enumerate() {
                        row += fetch(input, x0 + i as i64 - 1, y0 + j as i64 - 1, channel) * wxi;
                    }
                    value += row * wyj;
                }
                *slot += value;
            }
        }
    }
}

/// Edge-clamped pixel fetch at buffer coordinates.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn fetch(input: &Image, x: i64, y: i64, channel: u32) -> f64 {
    let x = x.clamp(0, i64::from(input.width) - 1) as u32;
    let y = y.clamp(0, i64::from(input.height) - 1) as u32;
    f64::from(input.sample(x, y, channel))
}

/// Catmull-Rom convolution weights for taps at offsets −1, 0, +1, +2
/// around the sample position, with `t` the fractional offset from the
/// second tap. At `t = 0` the weights collapse to `[0, 1, 0, 0]`, so
/// sampling exactly at a pixel center reproduces the stored value.
fn catmull_rom_weights(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}
