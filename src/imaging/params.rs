//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides the geometry and output names) and the
//! [`backend`](super::backend) (which does the actual pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 90). Clamped on construction.
//! - [`CropBox`]: A pixel region of the source image.
//! - [`SquareCropRequest`] / [`CropRequest`]: Caller-supplied crop hints, all optional.
//! - [`OptimizeParams`], [`CropParams`], [`ResizeParams`]: Full specification of one backend call.

use super::backend::ImageKind;
use super::orientation::Rotation;
use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
///
/// Only JPEG output is lossy; PNG and GIF ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// A rectangular region of a source image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl CropBox {
    /// True when the box is non-empty and lies entirely inside `width`x`height`.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && u64::from(self.left) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.top) + u64::from(self.height) <= u64::from(height)
    }
}

impl fmt::Display for CropBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.left, self.top
        )
    }
}

/// Optional caller box for a square crop. Used only when all three are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SquareCropRequest {
    pub left: Option<u32>,
    pub top: Option<u32>,
    pub width: Option<u32>,
}

/// Target size and optional position for an aspect crop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CropRequest {
    pub left: Option<u32>,
    pub top: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl CropRequest {
    /// Centered crop matching the `width:height` aspect.
    pub fn aspect(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    /// Target `(width, height)` when both are set and non-zero.
    pub fn target(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}

/// Whether an aspect crop is centered or positioned by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CropMode {
    #[default]
    Auto,
    Manual,
}

/// Parameters for an in-place rotate + re-encode.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeParams {
    pub path: PathBuf,
    pub kind: ImageKind,
    pub rotation: Rotation,
    pub quality: Quality,
}

/// Parameters for copying a region of the source into a new file.
#[derive(Debug, Clone, PartialEq)]
pub struct CropParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub kind: ImageKind,
    pub region: CropBox,
    pub quality: Quality,
}

/// Parameters for a simple resize operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}
