//! PNG codec: 8-bit, color only.
//!
//! PNG stores the three color channels; an auxiliary plane (channel 4)
//! is dropped on save. Samples map linearly between `u8` and `f32`
//! (`v / 255`), with out-of-range floats clamped on the way back.

use std::path::Path;

use image::{Rgb, RgbImage};
use relens_pipeline::{Image, LensModel, RowOrder};

use crate::IoError;

/// Decode a PNG into a 3-channel float image.
///
/// # Errors
///
/// [`IoError::Decode`] on unreadable or corrupt content.
pub fn load_png(path: &Path, lens: LensModel) -> Result<Image, IoError> {
    let decoded = image::open(path).map_err(|source| IoError::Decode {
        path: path.into(),
        source,
    })?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    let data = rgb
        .as_raw()
        .iter()
        .map(|&byte| f32::from(byte) / 255.0)
        .collect();
    Ok(Image::from_samples(
        width,
        height,
        3,
        RowOrder::TopFirst,
        lens,
        data,
    )?)
}

/// Encode the color channels as an 8-bit PNG.
///
/// # Errors
///
/// [`IoError::Encode`] when the file cannot be written.
pub fn save_png(image: &Image, path: &Path) -> Result<(), IoError> {
    let mut rgb = RgbImage::new(image.width, image.height);
    for (x, y, pixel) in rgb.enumerate_pixels_mut() {
        let src_y = source_row(image, y);
        let color = color_at(image, x, src_y);
        *pixel = Rgb(color.map(quantize));
    }
    rgb.save(path).map_err(|source| IoError::Encode {
        path: path.into(),
        source,
    })
}

/// Buffer row holding the image row that is `y` from the top.
pub(crate) fn source_row(image: &Image, y: u32) -> u32 {
    match image.row_order {
        RowOrder::TopFirst => y,
        RowOrder::BottomFirst => image.height - 1 - y,
    }
}

/// First three channels at `(x, y)`, replicating grayscale sources.
pub(crate) fn color_at(image: &Image, x: u32, y: u32) -> [f32; 3] {
    if image.channels >= 3 {
        [
            image.sample(x, y, 0),
            image.sample(x, y, 1),
            image.sample(x, y, 2),
        ]
    } else {
        let v = image.sample(x, y, 0);
        [v, v, v]
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantize(sample: f32) -> u8 {
    (sample.clamp(0.0, 1.0) * 255.0).round() as u8
}
