//! relens-io: the filesystem boundary for relens.
//!
//! Everything that touches disk lives here: the PNG and EXR codecs,
//! the JSON scene configuration, and input discovery. The pipeline
//! crate stays sans-IO; this crate converts between its in-memory
//! [`Image`] buffers and bytes on disk.

pub mod config;
pub mod discover;
pub mod exr;
pub mod png;

pub use config::{ConfigError, SceneConfig, read_scene_config, write_scene_config};
pub use discover::{discover_inputs, matches_affixes};

use std::path::{Path, PathBuf};

use relens_pipeline::{Image, LensModel};

/// On-disk storage format of one output request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// 8-bit color-only storage.
    Png,
    /// 32-bit float storage, color plus the auxiliary plane.
    Exr,
}

impl OutputFormat {
    /// File extension for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Exr => "exr",
        }
    }
}

/// Errors at the filesystem boundary. All of these are per-job
/// recoverable: the batch layer logs them and moves on.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Directory or file read failed.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Image decode failed (corrupt or truncated content).
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    /// Image encode or write failed.
    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },

    /// The path's extension is not a recognized image format.
    #[error("unsupported image format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// Decoded dimensions disagree with the assembled buffer.
    #[error(transparent)]
    Pipeline(#[from] relens_pipeline::PipelineError),
}

/// Load an image by extension, attaching the lens model it was
/// captured through.
///
/// # Errors
///
/// [`IoError::UnsupportedFormat`] for anything but `.png`/`.exr`,
/// otherwise the codec's decode error.
pub fn load_image(path: &Path, lens: LensModel) -> Result<Image, IoError> {
    match recognized_extension(path) {
        Some(OutputFormat::Png) => png::load_png(path, lens),
        Some(OutputFormat::Exr) => exr::load_exr(path, lens),
        None => Err(IoError::UnsupportedFormat { path: path.into() }),
    }
}

/// Save an image in the requested format.
///
/// # Errors
///
/// The codec's encode error.
pub fn save_image(image: &Image, path: &Path, format: OutputFormat) -> Result<(), IoError> {
    match format {
        OutputFormat::Png => png::save_png(image, path),
        OutputFormat::Exr => exr::save_exr(image, path),
    }
}

/// The [`OutputFormat`] matching a path's extension, if recognized.
#[must_use]
pub fn recognized_extension(path: &Path) -> Option<OutputFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => Some(OutputFormat::Png),
        Some("exr") => Some(OutputFormat::Exr),
        _ => None,
    }
}
