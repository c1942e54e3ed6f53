//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::with_guessed_format` + `into_dimensions` (header only) |
//! | Orientation | `kamadak-exif` container reader, `Orientation` tag |
//! | Decode (JPEG, PNG, GIF) | `image` crate decoders |
//! | Rotate | `DynamicImage::rotate90` / `rotate180` / `rotate270` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode | `JpegEncoder` (quality), PNG and GIF via `DynamicImage::write_to` |
//!
//! Outputs are encoded into a temporary file in the destination directory
//! and renamed over the target only once encoding succeeded, so a failed
//! operation leaves no partial file behind.

use super::backend::{ImageBackend, ImageInfo, ImageKind, ImagingError};
use super::orientation::Rotation;
use super::params::{CropParams, OptimizeParams, Quality, ResizeParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Seek, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn kind_of(format: ImageFormat) -> Option<ImageKind> {
    match format {
        ImageFormat::Jpeg => Some(ImageKind::Jpeg),
        ImageFormat::Png => Some(ImageKind::Png),
        ImageFormat::Gif => Some(ImageKind::Gif),
        _ => None,
    }
}

/// Open a file and sniff its container from the leading bytes.
fn open_reader(path: &Path) -> Result<(ImageReader<BufReader<File>>, ImageKind), ImagingError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| ImagingError::Unreadable(path.to_path_buf()))?;
    let kind = kind_of(format)
        .ok_or_else(|| ImagingError::UnsupportedFormat(format!("{format:?}")))?;
    Ok((reader, kind))
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, ImagingError> {
    let (reader, _) = open_reader(path)?;
    reader
        .decode()
        .map_err(|e| ImagingError::Decode(format!("{}: {}", path.display(), e)))
}

fn rotate(img: DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::None => img,
        Rotation::Clockwise90 => img.rotate90(),
        Rotation::CounterClockwise90 => img.rotate270(),
        Rotation::Half => img.rotate180(),
    }
}

/// Encode `img` as `kind`.
///
/// JPEG has no alpha channel, so the image is flattened to RGB first; PNG
/// keeps whatever channels it has and GIF is written from RGBA.
fn encode<W: Write + Seek>(
    img: &DynamicImage,
    kind: ImageKind,
    quality: Quality,
    writer: &mut W,
) -> Result<(), ImagingError> {
    let result = match kind {
        ImageKind::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            // Quality is clamped to 1..=100
            let encoder = JpegEncoder::new_with_quality(writer, quality.value() as u8);
            rgb.write_with_encoder(encoder)
        }
        ImageKind::Png => img.write_to(writer, ImageFormat::Png),
        ImageKind::Gif => DynamicImage::ImageRgba8(img.to_rgba8()).write_to(writer, ImageFormat::Gif),
    };
    result.map_err(|e| ImagingError::Encode(format!("{kind}: {e}")))
}

/// Encode to a sibling temp file, then atomically move it onto `path`.
///
/// Temp files are created owner-only, so the output takes the permissions
/// of `mode_from` (the source image) before it is moved into place.
fn save_image(
    img: &DynamicImage,
    kind: ImageKind,
    quality: Quality,
    path: &Path,
    mode_from: &Path,
) -> Result<(), ImagingError> {
    let permissions = fs::metadata(mode_from)?.permissions();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        encode(img, kind, quality, &mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().set_permissions(permissions)?;
    tmp.persist(path).map_err(|e| ImagingError::Io(e.error))?;
    debug!(path = %path.display(), %kind, width = img.width(), height = img.height(), "wrote image");
    Ok(())
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<ImageInfo, ImagingError> {
        let (reader, kind) = open_reader(path)?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| ImagingError::Decode(format!("{}: {}", path.display(), e)))?;
        Ok(ImageInfo {
            width,
            height,
            kind,
        })
    }

    fn read_orientation(&self, path: &Path) -> Option<u16> {
        let file = File::open(path).ok()?;
        let exif = match exif::Reader::new().read_from_container(&mut BufReader::new(file)) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable EXIF");
                return None;
            }
        };
        let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
        field
            .value
            .get_uint(0)
            .and_then(|v| u16::try_from(v).ok())
    }

    fn optimize(&self, params: &OptimizeParams) -> Result<(), ImagingError> {
        let img = rotate(load_image(&params.path)?, params.rotation);
        save_image(&img, params.kind, params.quality, &params.path, &params.path)
    }

    fn crop(&self, params: &CropParams) -> Result<(), ImagingError> {
        let img = load_image(&params.source)?;
        let region = params.region;
        if !region.fits_within(img.width(), img.height()) {
            return Err(ImagingError::OutOfBounds {
                region,
                width: img.width(),
                height: img.height(),
            });
        }
        let cropped = img.crop_imm(region.left, region.top, region.width, region.height);
        save_image(
            &cropped,
            params.kind,
            params.quality,
            &params.output,
            &params.source,
        )
    }

    fn resize(&self, params: &ResizeParams) -> Result<(), ImagingError> {
        if params.width == 0 || params.height == 0 {
            return Err(ImagingError::InvalidGeometry(format!(
                "cannot resize to {}x{}",
                params.width, params.height
            )));
        }
        let img = load_image(&params.source)?;
        let resized = img.resize_exact(params.width, params.height, FilterType::Lanczos3);
        save_image(
            &resized,
            params.kind,
            params.quality,
            &params.output,
            &params.source,
        )
    }
}
