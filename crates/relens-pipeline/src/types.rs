//! Shared types for the relens reprojection pipeline.

use crate::color::ColorGrade;
use crate::lens::LensModel;
use crate::resample::InterpolationMethod;

/// Vertical layout of rows in a sample buffer.
///
/// PNG decoders hand out rows top-first; some float formats store the
/// bottom scanline first. The resampler honors either order, so buffers
/// are never flipped in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// Buffer row 0 is the top image row.
    TopFirst,
    /// Buffer row 0 is the bottom image row.
    BottomFirst,
}

/// A decoded frame: a flat `f32` sample buffer plus the lens model it
/// was captured through.
///
/// Samples are interleaved per pixel (`channels` values each), row by
/// row in `row_order`. The buffer is exclusively owned; a job that
/// allocates an `Image` releases it on every exit path, normal or
/// failing, without any explicit cleanup.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Samples per pixel (3 for color-only sources, 4 when an auxiliary
    /// plane rides along).
    pub channels: u32,
    /// Vertical layout of the buffer rows.
    pub row_order: RowOrder,
    /// Lens model the frame was (or is to be) captured through.
    pub lens: LensModel,
    data: Vec<f32>,
}

impl Image {
    /// Wrap an existing sample buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::GeometryMismatch`] when the buffer
    /// length disagrees with `width * height * channels` — the one
    /// fatal pipeline condition (a programming error, not bad input).
    pub fn from_samples(
        width: u32,
        height: u32,
        channels: u32,
        row_order: RowOrder,
        lens: LensModel,
        data: Vec<f32>,
    ) -> Result<Self, PipelineError> {
        let expected = width as usize * height as usize * channels as usize;
        if expected == 0 || data.len() != expected {
            return Err(PipelineError::GeometryMismatch {
                width,
                height,
                channels,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            row_order,
            lens,
            data,
        })
    }

    /// Allocate a zero-filled frame.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::GeometryMismatch`] when any dimension
    /// is zero.
    pub fn zeroed(
        width: u32,
        height: u32,
        channels: u32,
        row_order: RowOrder,
        lens: LensModel,
    ) -> Result<Self, PipelineError> {
        let len = width as usize * height as usize * channels as usize;
        Self::from_samples(width, height, channels, row_order, lens, vec![0.0; len])
    }

    /// Flat index of a sample at buffer coordinates `(x, y)`.
    #[must_use]
    pub fn index(&self, x: u32, y: u32, channel: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels as usize
            + channel as usize
    }

    /// Sample value at buffer coordinates `(x, y)`.
    #[must_use]
    pub fn sample(&self, x: u32, y: u32, channel: u32) -> f32 {
        self.data[self.index(x, y, channel)]
    }

    /// The full sample buffer.
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    /// Mutable access to the full sample buffer.
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the image and returns the underlying buffer.
    #[must_use]
    pub fn into_samples(self) -> Vec<f32> {
        self.data
    }
}

/// Immutable per-run pipeline parameters, fixed before any job starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    /// Lens model the output should appear captured through.
    pub output_lens: LensModel,
    /// Output size as a fraction of the input size; final dimensions
    /// are truncated towards zero.
    pub scale: f64,
    /// Sub-samples per output pixel axis. Raise together with
    /// downscaling to box-filter away aliasing.
    pub samples: u32,
    /// Point-sampling method for input lookups.
    pub interpolation: InterpolationMethod,
    /// Exposure / tonemap parameters.
    pub color: ColorGrade,
}

impl RenderConfig {
    /// Output dimensions for an input of `width x height`, truncated
    /// towards zero. `None` when scaling collapses either axis.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn output_dimensions(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        let out_w = (f64::from(width) * self.scale) as u32;
        let out_h = (f64::from(height) * self.scale) as u32;
        (out_w > 0 && out_h > 0).then_some((out_w, out_h))
    }
}

/// Errors that can occur during pipeline processing.
///
/// Out-of-frame lookups are *not* errors — they are a defined
/// zero-contribution policy inside the resampler.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Sample buffer length disagrees with the stated geometry.
    #[error(
        "sample buffer holds {actual} values but geometry \
         {width}x{height}x{channels} requires {expected}"
    )]
    GeometryMismatch {
        width: u32,
        height: u32,
        channels: u32,
        expected: usize,
        actual: usize,
    },

    /// The requested scale truncates the output to zero pixels.
    #[error("scale {scale} collapses a {width}x{height} input to an empty output")]
    EmptyOutput { width: u32, height: u32, scale: f64 },
}
