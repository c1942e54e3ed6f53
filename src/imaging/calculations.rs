//! Pure calculation functions for crop and resize geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Integer division truncates, so every derived side rounds down.

use super::backend::ImagingError;
use super::params::{CropBox, CropMode, CropRequest, SquareCropRequest};

/// Side of the largest square that fits the source.
pub fn square_side(source: (u32, u32)) -> u32 {
    source.0.min(source.1)
}

/// Box of `size` centered in `source`. Offsets round down.
pub fn centered_box(source: (u32, u32), size: (u32, u32)) -> CropBox {
    CropBox {
        left: source.0.saturating_sub(size.0) / 2,
        top: source.1.saturating_sub(size.1) / 2,
        width: size.0,
        height: size.1,
    }
}

/// The caller's square box, if fully specified and inside the source.
pub fn custom_square_box(source: (u32, u32), request: &SquareCropRequest) -> Option<CropBox> {
    let region = CropBox {
        left: request.left?,
        top: request.top?,
        width: request.width?,
        height: request.width?,
    };
    region.fits_within(source.0, source.1).then_some(region)
}

/// Square crop region: the caller's box when valid, else the centered square.
///
/// # Examples
/// ```
/// # use coverkit::imaging::{square_crop_box, CropBox, SquareCropRequest};
/// // 800x600 landscape → 600px square starting 100px in
/// let region = square_crop_box((800, 600), &SquareCropRequest::default());
/// assert_eq!(region, CropBox { left: 100, top: 0, width: 600, height: 600 });
/// ```
pub fn square_crop_box(source: (u32, u32), request: &SquareCropRequest) -> CropBox {
    custom_square_box(source, request).unwrap_or_else(|| {
        let side = square_side(source);
        centered_box(source, (side, side))
    })
}

/// Largest box with the target aspect that fits the source.
///
/// Tries the full source height first; when the matching width would
/// overflow the source, uses the full width instead. Without a target the
/// result is the largest square.
pub fn aspect_box_size(source: (u32, u32), target: Option<(u32, u32)>) -> (u32, u32) {
    let (src_w, src_h) = source;

    match target {
        Some((tgt_w, tgt_h)) => {
            let possible_w = u64::from(src_h) * u64::from(tgt_w) / u64::from(tgt_h);
            if possible_w <= u64::from(src_w) {
                (possible_w as u32, src_h)
            } else {
                let h = u64::from(src_w) * u64::from(tgt_h) / u64::from(tgt_w);
                (src_w, h as u32)
            }
        }
        None => {
            let side = square_side(source);
            (side, side)
        }
    }
}

/// Aspect crop region for a request.
///
/// [`CropMode::Auto`] centers the largest matching box. [`CropMode::Manual`]
/// places a box of `min(largest, target)` per axis at the caller's
/// left/top and fails if that leaves the source.
pub fn aspect_crop_box(
    source: (u32, u32),
    request: &CropRequest,
    mode: CropMode,
) -> Result<CropBox, ImagingError> {
    let target = request.target();
    let (max_w, max_h) = aspect_box_size(source, target);
    if max_w == 0 || max_h == 0 {
        return Err(ImagingError::InvalidGeometry(format!(
            "no {}x{} region fits in {}x{}",
            request.width.unwrap_or(0),
            request.height.unwrap_or(0),
            source.0,
            source.1
        )));
    }

    let region = match mode {
        CropMode::Auto => centered_box(source, (max_w, max_h)),
        CropMode::Manual => {
            let (Some(left), Some(top)) = (request.left, request.top) else {
                return Err(ImagingError::InvalidGeometry(
                    "manual crop requires left and top".to_string(),
                ));
            };
            let (width, height) = match target {
                Some((tgt_w, tgt_h)) => (tgt_w.min(max_w), tgt_h.min(max_h)),
                None => (max_w, max_h),
            };
            CropBox {
                left,
                top,
                width,
                height,
            }
        }
    };

    if !region.fits_within(source.0, source.1) {
        return Err(ImagingError::OutOfBounds {
            region,
            width: source.0,
            height: source.1,
        });
    }
    Ok(region)
}

/// Output dimensions for a resize to `width`, keeping the aspect ratio.
///
/// Height is `floor(src_h * width / src_w)`; a zero on either side is an error.
pub fn resize_dimensions(source: (u32, u32), width: u32) -> Result<(u32, u32), ImagingError> {
    let (src_w, src_h) = source;
    if width == 0 || src_w == 0 {
        return Err(ImagingError::InvalidGeometry(format!(
            "cannot resize {src_w}x{src_h} to width {width}"
        )));
    }
    let height = u64::from(src_h) * u64::from(width) / u64::from(src_w);
    match u32::try_from(height) {
        Ok(height) if height > 0 => Ok((width, height)),
        _ => Err(ImagingError::InvalidGeometry(format!(
            "resizing {src_w}x{src_h} to width {width} gives height {height}"
        ))),
    }
}
