//! Image backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the five operations every backend must
//! support: identify, read_orientation, optimize, crop, and resize. The
//! geometry is decided in [`operations`](super::operations); a backend only
//! moves pixels between files.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate decoders/encoders and `kamadak-exif`.

use super::params::{CropBox, CropParams, OptimizeParams, ResizeParams};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a recognized image: {}", .0.display())]
    Unreadable(PathBuf),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("Crop region {region} exceeds source {width}x{height}")]
    OutOfBounds {
        region: CropBox,
        width: u32,
        height: u32,
    },
    #[error("Invalid output filename: {0}")]
    InvalidFilename(String),
}

/// Container types a cover image may use.
///
/// The numeric [`code`](Self::code) is what gets stored in the cover's
/// `type` column, so the values must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
}

impl ImageKind {
    pub const ALL: [ImageKind; 3] = [ImageKind::Jpeg, ImageKind::Png, ImageKind::Gif];

    /// Stable numeric type code (GIF = 1, JPEG = 2, PNG = 3).
    pub fn code(self) -> u8 {
        match self {
            ImageKind::Gif => 1,
            ImageKind::Jpeg => 2,
            ImageKind::Png => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|k| i64::from(k.code()) == code)
    }

    pub fn media_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
        }
    }

    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
        }
    }

    /// Whether `ext` (case-insensitive, no dot) is a valid extension for this kind.
    pub fn matches_extension(self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        match self {
            ImageKind::Jpeg => matches!(ext.as_str(), "jpg" | "jpeg" | "jpe"),
            ImageKind::Png => ext == "png",
            ImageKind::Gif => ext == "gif",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpeg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of an identify operation: container type plus pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub kind: ImageKind,
}

impl ImageInfo {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Trait for image processing backends.
///
/// Every method works on files: sources are read from disk and outputs are
/// written to the path named in the params, encoded with the params' kind.
pub trait ImageBackend {
    /// Read container type and dimensions from the header only.
    fn identify(&self, path: &Path) -> Result<ImageInfo, ImagingError>;

    /// Raw EXIF orientation value, if the file carries a readable one.
    ///
    /// Never fails: missing or corrupt metadata is `None`.
    fn read_orientation(&self, path: &Path) -> Option<u16>;

    /// Rotate and re-encode a file in place.
    fn optimize(&self, params: &OptimizeParams) -> Result<(), ImagingError>;

    /// Copy a region of the source into a new file.
    fn crop(&self, params: &CropParams) -> Result<(), ImagingError>;

    /// Scale the whole source to exact dimensions.
    fn resize(&self, params: &ResizeParams) -> Result<(), ImagingError>;
}
