//! relens-pipeline: Pure lens reprojection pipeline (sans-IO).
//!
//! Re-renders an image captured through one camera lens model as if it
//! had been captured through another, then applies exposure/tonemap
//! color grading:
//!
//! lens mapping -> supersampled resampling -> color grade.
//!
//! This crate has **no I/O dependencies** — it operates on in-memory
//! sample buffers and returns structured data. All filesystem
//! interaction lives in `relens-io`; batch scheduling lives in
//! `relens-batch`.

pub mod color;
pub mod lens;
pub mod resample;
pub mod types;

pub use color::{ColorGrade, Reinhard, ToneOperator};
pub use lens::{LensError, LensModel, LensSpecError, SensorCoord, SensorSize};
pub use resample::InterpolationMethod;
pub use types::{Image, PipelineError, RenderConfig, RowOrder};

/// Run the full reprojection pipeline on one decoded frame.
///
/// # Pipeline steps
///
/// 1. Resample through the input→output lens pair (a direct copy when
///    the mapping is the identity)
/// 2. Exposure / tonemap color grade (auto-derived or fixed)
///
/// # Errors
///
/// Returns [`PipelineError::EmptyOutput`] when `config.scale` truncates
/// the output to zero pixels, and [`PipelineError::GeometryMismatch`]
/// when the input buffer disagrees with its stated geometry.
/// Out-of-frame regions are not errors; they come back zero.
pub fn process(input: &Image, config: &RenderConfig) -> Result<Image, PipelineError> {
    let (out_width, out_height) = config
        .output_dimensions(input.width, input.height)
        .ok_or(PipelineError::EmptyOutput {
            width: input.width,
            height: input.height,
            scale: config.scale,
        })?;

    let mut output = resample::reproject(
        input,
        config.output_lens,
        out_width,
        out_height,
        config.samples,
        config.interpolation,
    )?;

    if config.color.auto_exposure {
        color::auto_exposure(&mut output, config.color.white_point);
    } else {
        color::post_process(&mut output, config.color.exposure, config.color.white_point);
    }

    Ok(output)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lens() -> LensModel {
        LensModel::rectilinear(50.0, 36.0, 1.0).unwrap()
    }

    fn config(scale: f64) -> RenderConfig {
        RenderConfig {
            output_lens: lens(),
            scale,
            samples: 1,
            interpolation: InterpolationMethod::Bilinear,
            color: ColorGrade::default(),
        }
    }

    fn checker(width: u32, height: u32) -> Image {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 0.2 } else { 0.8 };
                data.extend_from_slice(&[v, v, v]);
            }
        }
        Image::from_samples(width, height, 3, RowOrder::TopFirst, lens(), data).unwrap()
    }

    #[test]
    fn identity_process_copies_the_buffer() {
        let input = checker(10, 10);
        let output = process(&input, &config(1.0)).unwrap();
        assert_eq!(output.samples(), input.samples());
    }

    #[test]
    fn downscale_halves_dimensions() {
        let input = checker(10, 8);
        let output = process(&input, &config(0.5)).unwrap();
        assert_eq!((output.width, output.height), (5, 4));
        assert_eq!(output.channels, 3);
    }

    #[test]
    fn collapsing_scale_is_rejected() {
        let input = checker(10, 10);
        let result = process(&input, &config(0.01));
        assert!(matches!(result, Err(PipelineError::EmptyOutput { .. })));
    }

    #[test]
    fn grade_applies_after_identity_resample() {
        let input = checker(6, 6);
        let mut cfg = config(1.0);
        cfg.color.exposure = 2.0;
        let output = process(&input, &cfg).unwrap();
        for (got, want) in output.samples().iter().zip(input.samples()) {
            assert!(
                (got - want * 2.0).abs() < 1e-6,
                "grade should double {want}, got {got}",
            );
        }
    }
}
