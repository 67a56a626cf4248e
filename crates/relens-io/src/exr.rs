//! OpenEXR codec: 32-bit float, color plus auxiliary plane.
//!
//! EXR carries the samples unclamped. Sources decode to four channels
//! (RGB + the auxiliary plane in channel 4); on save the channel count
//! picks between RGB and RGBA storage so a color-only frame does not
//! grow a bogus plane.

use std::path::Path;

use image::{DynamicImage, Rgb32FImage, Rgba32FImage};
use relens_pipeline::{Image, LensModel, RowOrder};

use crate::png::{color_at, source_row};
use crate::IoError;

/// Decode an EXR into a 4-channel float image.
///
/// # Errors
///
/// [`IoError::Decode`] on unreadable or corrupt content.
pub fn load_exr(path: &Path, lens: LensModel) -> Result<Image, IoError> {
    let decoded = image::open(path).map_err(|source| IoError::Decode {
        path: path.into(),
        source,
    })?;
    let rgba = decoded.to_rgba32f();
    let (width, height) = rgba.dimensions();
    let data = rgba.into_raw();
    Ok(Image::from_samples(
        width,
        height,
        4,
        RowOrder::TopFirst,
        lens,
        data,
    )?)
}

/// Encode an EXR, keeping float precision and the auxiliary plane when
/// the image carries one.
///
/// # Errors
///
/// [`IoError::Encode`] when the file cannot be written.
pub fn save_exr(image: &Image, path: &Path) -> Result<(), IoError> {
    let encode_error = |source| IoError::Encode {
        path: path.into(),
        source,
    };

    if image.channels == 4 {
        let mut rgba = Rgba32FImage::new(image.width, image.height);
        for (x, y, pixel) in rgba.enumerate_pixels_mut() {
            let src_y = source_row(image, y);
            pixel.0 = [
                image.sample(x, src_y, 0),
                image.sample(x, src_y, 1),
                image.sample(x, src_y, 2),
                image.sample(x, src_y, 3),
            ];
        }
        DynamicImage::ImageRgba32F(rgba).save(path).map_err(encode_error)
    } else {
        let mut rgb = Rgb32FImage::new(image.width, image.height);
        for (x, y, pixel) in rgb.enumerate_pixels_mut() {
            let src_y = source_row(image, y);
            pixel.0 = color_at(image, x, src_y);
        }
        DynamicImage::ImageRgb32F(rgb).save(path).map_err(encode_error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lens() -> LensModel {
        LensModel::rectilinear(50.0, 36.0, 1.0).unwrap()
    }

    #[test]
    fn round_trip_keeps_floats_and_aux_plane() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depth.exr");

        // Color well outside [0,1] plus a depth-like aux value.
        let data = vec![
            1.5, 0.25, 3.0, 42.5, //
            0.0, 0.125, 0.5, 7.25, //
        ];
        let source =
            Image::from_samples(2, 1, 4, RowOrder::TopFirst, lens(), data.clone()).unwrap();
        save_exr(&source, &path).unwrap();

        let loaded = load_exr(&path, lens()).unwrap();
        assert_eq!((loaded.width, loaded.height, loaded.channels), (2, 1, 4));
        for (got, want) in loaded.samples().iter().zip(&data) {
            assert!(
                (got - want).abs() < 1e-6,
                "float sample drifted: {got} vs {want}",
            );
        }
    }

    #[test]
    fn color_only_frames_reload_with_opaque_aux() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("color.exr");

        let source = Image::from_samples(
            1,
            1,
            3,
            RowOrder::TopFirst,
            lens(),
            vec![0.1, 0.2, 0.3],
        )
        .unwrap();
        save_exr(&source, &path).unwrap();

        let loaded = load_exr(&path, lens()).unwrap();
        assert_eq!(loaded.channels, 4);
        assert!((loaded.sample(0, 0, 0) - 0.1).abs() < 1e-6);
        assert!((loaded.sample(0, 0, 3) - 1.0).abs() < 1e-6, "RGB promotes to opaque alpha");
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let result = load_exr(Path::new("/nonexistent/missing.exr"), lens());
        assert!(matches!(result, Err(IoError::Decode { .. })));
    }
}
