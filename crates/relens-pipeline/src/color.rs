//! Exposure scaling and tone compression.
//!
//! The tone curve lives behind the [`ToneOperator`] trait so it can be
//! swapped without touching the pipeline; [`Reinhard`] is the shipped
//! operator:
//!
//! ```text
//! L' = L · (1 + L / wp²) / (1 + L)
//! ```
//!
//! which is the identity at `wp = 1` and compresses highlights towards
//! the white point otherwise. Grading touches color channels only; an
//! auxiliary plane (depth) riding in channel 4 passes through untouched.

use crate::types::Image;

/// Luminance-in, luminance-out tone curve.
pub trait ToneOperator {
    /// Compress one (exposure-scaled) sample.
    fn apply(&self, luminance: f32) -> f32;
}

/// Reinhard tone operator with a configurable white point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reinhard {
    /// Brightness that maps to full white.
    pub white_point: f32,
}

impl ToneOperator for Reinhard {
    fn apply(&self, luminance: f32) -> f32 {
        luminance * (1.0 + luminance / (self.white_point * self.white_point))
            / (1.0 + luminance)
    }
}

/// Exposure / tonemap parameters of one batch run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorGrade {
    /// Derive the exposure multiplier from image statistics instead of
    /// using `exposure`.
    pub auto_exposure: bool,
    /// Linear exposure multiplier.
    pub exposure: f32,
    /// Reinhard white point.
    pub white_point: f32,
}

impl Default for ColorGrade {
    fn default() -> Self {
        Self {
            auto_exposure: false,
            exposure: 1.0,
            white_point: 1.0,
        }
    }
}

/// Multiply every color sample by `exposure`, then tonemap with the
/// given white point. Skipped entirely when both parameters are
/// neutral (1, 1).
pub fn post_process(image: &mut Image, exposure: f32, white_point: f32) {
    if (exposure - 1.0).abs() < f32::EPSILON && (white_point - 1.0).abs() < f32::EPSILON {
        return;
    }
    apply_grade(image, exposure, &Reinhard { white_point });
}

/// Derive an exposure multiplier from the image's luminance statistics,
/// then grade exactly as [`post_process`] would.
///
/// The multiplier maps the log-average luminance onto the standard
/// middle-gray key, so it depends only on pixel content — never on
/// execution order or thread count.
pub fn auto_exposure(image: &mut Image, white_point: f32) {
    let exposure = auto_exposure_multiplier(image);
    apply_grade(image, exposure, &Reinhard { white_point });
}

/// Middle-gray key the log-average luminance is mapped onto.
const KEY: f32 = 0.18;

/// Guards `ln` against zero and keeps black frames from exploding the
/// multiplier.
const LUMINANCE_FLOOR: f32 = 1e-4;

fn apply_grade(image: &mut Image, exposure: f32, tone: &dyn ToneOperator) {
    let stride = image.channels as usize;
    let graded = color_channels(stride);
    for pixel in image.samples_mut().chunks_mut(stride) {
        for sample in &mut pixel[..graded] {
            *sample = tone.apply(*sample * exposure);
        }
    }
}

/// Number of leading channels that carry color.
const fn color_channels(stride: usize) -> usize {
    if stride < 3 { stride } else { 3 }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn auto_exposure_multiplier(image: &Image) -> f32 {
    let stride = image.channels as usize;
    let mut log_sum = 0.0f64;
    let mut count = 0u64;
    for pixel in image.samples().chunks(stride) {
        let l = luminance(pixel).max(0.0) + LUMINANCE_FLOOR;
        log_sum += f64::from(l.ln());
        count += 1;
    }
    let log_average = (log_sum / count as f64).exp() as f32;
    KEY / log_average
}

/// Rec. 709 luma for color pixels; the sole channel for grayscale.
fn luminance(pixel: &[f32]) -> f32 {
    if pixel.len() >= 3 {
        0.2126f32.mul_add(pixel[0], 0.7152f32.mul_add(pixel[1], 0.0722 * pixel[2]))
    } else {
        pixel[0]
    }
}
