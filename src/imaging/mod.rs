//! Image processing over the `image` crate codecs.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Inspect** | `ImageReader::into_dimensions` (header only) |
//! | **Orientation** | `kamadak-exif` |
//! | **Square / aspect crop** | `DynamicImage::crop_imm` |
//! | **Resize** | Lanczos3 `resize_exact` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop and resize geometry (unit testable)
//! - **Orientation**: EXIF orientation → [`Rotation`] mapping
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod orientation;
mod params;
pub mod rust_backend;

pub use backend::{ImageBackend, ImageInfo, ImageKind, ImagingError};
pub use calculations::{
    aspect_box_size, aspect_crop_box, centered_box, resize_dimensions, square_crop_box,
};
pub use operations::{
    ImageRef, crop, crop_square, exif_rotation, inspect, optimize, plan_crop, plan_resize,
    plan_square, resize,
};
pub use orientation::Rotation;
pub use params::{
    CropBox, CropMode, CropParams, CropRequest, OptimizeParams, Quality, ResizeParams,
    SquareCropRequest,
};
pub use rust_backend::RustBackend;
