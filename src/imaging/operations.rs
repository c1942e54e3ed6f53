//! High-level image operations.
//!
//! These functions combine calculations with backend execution. They take
//! an [`ImageRef`] and caller hints, compute the geometry and output name,
//! and call the backend. `plan_*` variants stop before the backend call so
//! the decisions can be tested without touching pixels.

use super::backend::{ImageBackend, ImageInfo, ImageKind, ImagingError};
use super::calculations::{aspect_crop_box, custom_square_box, resize_dimensions, square_crop_box};
use super::orientation::Rotation;
use super::params::{
    CropMode, CropParams, CropRequest, OptimizeParams, Quality, ResizeParams, SquareCropRequest,
};
use crate::naming::{checked_output_name, crop_name, resize_name, split_source, square_name};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ImagingError>;

/// An identified source image on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    pub path: PathBuf,
    pub dir: PathBuf,
    pub stem: String,
    /// Extension as written on the source, without the dot.
    pub ext: String,
    pub info: ImageInfo,
}

impl ImageRef {
    /// Identify `path` and split it into the parts derived names need.
    pub fn open(backend: &impl ImageBackend, path: &Path) -> Result<Self> {
        let info = backend.identify(path)?;
        let name = split_source(path);
        Ok(Self {
            path: path.to_path_buf(),
            dir: name.dir,
            stem: name.stem,
            ext: name.ext,
            info,
        })
    }

    /// Reference to a file a planned operation produces, without reading it.
    pub fn planned(path: &Path, info: ImageInfo) -> Self {
        let name = split_source(path);
        Self {
            path: path.to_path_buf(),
            dir: name.dir,
            stem: name.stem,
            ext: name.ext,
            info,
        }
    }

    /// Extension for derived files: the source's own when it fits the
    /// detected codec, otherwise the codec's canonical one.
    pub fn output_ext(&self) -> &str {
        if self.info.kind.matches_extension(&self.ext) {
            &self.ext
        } else {
            self.info.kind.extension()
        }
    }

    fn output_path(&self, new_filename: Option<&str>, default_name: String) -> Result<PathBuf> {
        let name = match new_filename.filter(|n| !n.is_empty()) {
            Some(name) => checked_output_name(name, self.info.kind)?,
            None => default_name,
        };
        Ok(self.dir.join(name))
    }
}

/// Inspect an image from its container header.
pub fn inspect(backend: &impl ImageBackend, path: &Path) -> Result<ImageInfo> {
    backend.identify(path)
}

/// Rotation implied by the image's EXIF orientation. Never fails.
///
/// GIF has no EXIF, so its metadata is not read at all.
pub fn exif_rotation(backend: &impl ImageBackend, image: &ImageRef) -> Rotation {
    if image.info.kind == ImageKind::Gif {
        return Rotation::None;
    }
    Rotation::from_exif_orientation(backend.read_orientation(&image.path))
}

/// Rotate (if needed) and re-encode the image in place.
///
/// `rotation: None` means "use the EXIF orientation". The re-encoded file
/// carries no EXIF, so optimizing twice does not rotate twice. `image.info`
/// is refreshed afterwards. Returns the rotation that was applied.
pub fn optimize(
    backend: &impl ImageBackend,
    image: &mut ImageRef,
    quality: Quality,
    rotation: Option<Rotation>,
) -> Result<Rotation> {
    let rotation = rotation.unwrap_or_else(|| exif_rotation(backend, image));

    backend.optimize(&OptimizeParams {
        path: image.path.clone(),
        kind: image.info.kind,
        rotation,
        quality,
    })?;
    image.info = backend.identify(&image.path)?;

    info!(path = %image.path.display(), %rotation, "optimized image");
    Ok(rotation)
}

/// Plan a square crop without executing it.
pub fn plan_square(
    image: &ImageRef,
    request: &SquareCropRequest,
    quality: Quality,
    new_filename: Option<&str>,
) -> Result<CropParams> {
    let source = image.info.dimensions();
    if source.0 == 0 || source.1 == 0 {
        return Err(ImagingError::InvalidGeometry(format!(
            "{} has no pixels",
            image.path.display()
        )));
    }
    let region = square_crop_box(source, request);
    if *request != SquareCropRequest::default() && custom_square_box(source, request).is_none() {
        debug!(?request, %region, "custom square box rejected, using centered square");
    }

    let output = image.output_path(
        new_filename,
        square_name(&image.stem, region.width, image.output_ext()),
    )?;
    Ok(CropParams {
        source: image.path.clone(),
        output,
        kind: image.info.kind,
        region,
        quality,
    })
}

/// Crop the largest (or caller-positioned) square and write it.
///
/// A caller box that is incomplete or leaves the source is ignored in
/// favour of the centered square. Returns the output path.
pub fn crop_square(
    backend: &impl ImageBackend,
    image: &ImageRef,
    request: &SquareCropRequest,
    quality: Quality,
    new_filename: Option<&str>,
) -> Result<PathBuf> {
    let params = plan_square(image, request, quality, new_filename)?;
    backend.crop(&params)?;
    info!(output = %params.output.display(), region = %params.region, "square crop written");
    Ok(params.output)
}

/// Plan an aspect crop without executing it.
pub fn plan_crop(
    image: &ImageRef,
    request: &CropRequest,
    mode: CropMode,
    quality: Quality,
    new_filename: Option<&str>,
) -> Result<CropParams> {
    let region = aspect_crop_box(image.info.dimensions(), request, mode)?;
    let output = image.output_path(
        new_filename,
        crop_name(&image.stem, region.width, region.height, image.output_ext()),
    )?;
    Ok(CropParams {
        source: image.path.clone(),
        output,
        kind: image.info.kind,
        region,
        quality,
    })
}

/// Crop a box matching the requested aspect and write it.
///
/// Returns the output path.
pub fn crop(
    backend: &impl ImageBackend,
    image: &ImageRef,
    request: &CropRequest,
    mode: CropMode,
    quality: Quality,
    new_filename: Option<&str>,
) -> Result<PathBuf> {
    let params = plan_crop(image, request, mode, quality, new_filename)?;
    backend.crop(&params)?;
    info!(output = %params.output.display(), region = %params.region, "crop written");
    Ok(params.output)
}

/// Plan a resize without executing it.
pub fn plan_resize(
    image: &ImageRef,
    width: u32,
    quality: Quality,
    new_filename: Option<&str>,
) -> Result<ResizeParams> {
    let (width, height) = resize_dimensions(image.info.dimensions(), width)?;
    let output = image.output_path(
        new_filename,
        resize_name(&image.stem, width, image.output_ext()),
    )?;
    Ok(ResizeParams {
        source: image.path.clone(),
        output,
        kind: image.info.kind,
        width,
        height,
        quality,
    })
}

/// Scale the image to `width`, keeping its aspect ratio.
///
/// Returns the output path.
pub fn resize(
    backend: &impl ImageBackend,
    image: &ImageRef,
    width: u32,
    quality: Quality,
    new_filename: Option<&str>,
) -> Result<PathBuf> {
    let params = plan_resize(image, width, quality, new_filename)?;
    backend.resize(&params)?;
    info!(
        output = %params.output.display(),
        width = params.width,
        height = params.height,
        "resize written"
    );
    Ok(params.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::params::CropBox;

    fn open(backend: &MockBackend, path: &str) -> ImageRef {
        ImageRef::open(backend, Path::new(path)).unwrap()
    }

    #[test]
    fn open_splits_path() {
        let backend = MockBackend::with_info(800, 600, ImageKind::Jpeg);
        let image = open(&backend, "/covers/holiday.JPG");

        assert_eq!(image.dir, PathBuf::from("/covers"));
        assert_eq!(image.stem, "holiday");
        assert_eq!(image.ext, "JPG");
        assert_eq!(image.output_ext(), "JPG");
    }

    #[test]
    fn open_unreadable_fails() {
        let backend = MockBackend::new();
        assert!(ImageRef::open(&backend, Path::new("/covers/missing.jpg")).is_err());
    }

    #[test]
    fn planned_ref_touches_nothing() {
        let info = ImageInfo {
            width: 1200,
            height: 675,
            kind: ImageKind::Jpeg,
        };
        let image = ImageRef::planned(Path::new("/covers/a_1200x675.jpg"), info);
        assert_eq!(image.stem, "a_1200x675");
        assert_eq!(image.info, info);

        let params = plan_resize(&image, 600, Quality::default(), None).unwrap();
        assert_eq!(params.output, PathBuf::from("/covers/a_600.jpg"));
        assert_eq!(params.height, 337);
    }

    #[test]
    fn output_ext_follows_detected_codec() {
        let backend = MockBackend::with_info(10, 10, ImageKind::Png);
        assert_eq!(open(&backend, "/covers/mislabeled.jpg").output_ext(), "png");
        assert_eq!(open(&backend, "/covers/noext").output_ext(), "png");
    }

    #[test]
    fn inspect_calls_backend() {
        let backend = MockBackend::with_info(1920, 1080, ImageKind::Gif);
        let info = inspect(&backend, Path::new("/a.gif")).unwrap();
        assert_eq!(info.dimensions(), (1920, 1080));
        assert_eq!(info.kind, ImageKind::Gif);
    }

    // =========================================================================
    // optimize
    // =========================================================================

    #[test]
    fn optimize_uses_exif_rotation_by_default() {
        let backend = MockBackend::with_info(400, 300, ImageKind::Jpeg).with_orientation(6);
        let mut image = open(&backend, "/covers/a.jpg");

        let applied = optimize(&backend, &mut image, Quality::new(80), None).unwrap();
        assert_eq!(applied, Rotation::Clockwise90);

        let ops = backend.get_operations();
        assert!(ops.iter().any(|op| matches!(
            op,
            RecordedOp::Optimize {
                rotation: Rotation::Clockwise90,
                quality: 80,
                ..
            }
        )));
    }

    #[test]
    fn optimize_explicit_rotation_skips_exif() {
        let backend = MockBackend::with_info(400, 300, ImageKind::Jpeg).with_orientation(6);
        let mut image = open(&backend, "/covers/a.jpg");

        let applied = optimize(&backend, &mut image, Quality::default(), Some(Rotation::Half))
            .unwrap();
        assert_eq!(applied, Rotation::Half);
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::ReadOrientation(_)))
        );
    }

    #[test]
    fn gif_orientation_is_never_read() {
        let backend = MockBackend::with_info(64, 48, ImageKind::Gif).with_orientation(6);
        let mut image = open(&backend, "/covers/a.gif");

        let applied = optimize(&backend, &mut image, Quality::default(), None).unwrap();
        assert_eq!(applied, Rotation::None);
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::ReadOrientation(_)))
        );
    }

    #[test]
    fn optimize_without_exif_is_no_rotation() {
        let backend = MockBackend::with_info(400, 300, ImageKind::Png);
        let mut image = open(&backend, "/covers/a.png");

        let applied = optimize(&backend, &mut image, Quality::default(), None).unwrap();
        assert_eq!(applied, Rotation::None);
    }

    // =========================================================================
    // crop_square
    // =========================================================================

    #[test]
    fn crop_square_default_name_and_region() {
        let backend = MockBackend::with_info(800, 600, ImageKind::Jpeg);
        let image = open(&backend, "/covers/a.jpg");

        let output = crop_square(
            &backend,
            &image,
            &SquareCropRequest::default(),
            Quality::default(),
            None,
        )
        .unwrap();
        assert_eq!(output, PathBuf::from("/covers/a_square600.jpg"));

        let ops = backend.get_operations();
        assert!(matches!(
            ops.last(),
            Some(RecordedOp::Crop {
                region: CropBox {
                    left: 100,
                    top: 0,
                    width: 600,
                    height: 600
                },
                quality: 90,
                ..
            })
        ));
    }

    #[test]
    fn crop_square_custom_box_names_by_its_width() {
        let backend = MockBackend::with_info(800, 600, ImageKind::Png);
        let image = open(&backend, "/covers/a.png");
        let request = SquareCropRequest {
            left: Some(0),
            top: Some(0),
            width: Some(250),
        };

        let output =
            crop_square(&backend, &image, &request, Quality::default(), None).unwrap();
        assert_eq!(output, PathBuf::from("/covers/a_square250.png"));
    }

    #[test]
    fn crop_square_out_of_bounds_box_falls_back() {
        let backend = MockBackend::with_info(800, 600, ImageKind::Png);
        let image = open(&backend, "/covers/a.png");
        let request = SquareCropRequest {
            left: Some(0),
            top: Some(100),
            width: Some(600),
        };

        let params = plan_square(&image, &request, Quality::default(), None).unwrap();
        assert_eq!(params.region.width, 600);
        assert_eq!((params.region.left, params.region.top), (100, 0));
    }

    #[test]
    fn crop_square_supplied_name_stays_in_source_dir() {
        let backend = MockBackend::with_info(100, 100, ImageKind::Gif);
        let image = open(&backend, "/covers/a.gif");

        let params = plan_square(
            &image,
            &SquareCropRequest::default(),
            Quality::default(),
            Some("avatar"),
        )
        .unwrap();
        assert_eq!(params.output, PathBuf::from("/covers/avatar.gif"));
    }

    #[test]
    fn crop_square_rejects_mismatched_name() {
        let backend = MockBackend::with_info(100, 100, ImageKind::Gif);
        let image = open(&backend, "/covers/a.gif");

        let result = crop_square(
            &backend,
            &image,
            &SquareCropRequest::default(),
            Quality::default(),
            Some("avatar.jpg"),
        );
        assert!(matches!(result, Err(ImagingError::InvalidFilename(_))));
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::Crop { .. }))
        );
    }

    #[test]
    fn crop_square_backend_failure_propagates() {
        let backend = MockBackend::with_info(100, 100, ImageKind::Jpeg).failing_writes();
        let image = open(&backend, "/covers/a.jpg");

        let result = crop_square(
            &backend,
            &image,
            &SquareCropRequest::default(),
            Quality::default(),
            None,
        );
        assert!(matches!(result, Err(ImagingError::Encode(_))));
    }

    // =========================================================================
    // crop
    // =========================================================================

    #[test]
    fn crop_auto_names_by_region() {
        let backend = MockBackend::with_info(1600, 900, ImageKind::Jpeg);
        let image = open(&backend, "/covers/a.jpeg");

        let output = crop(
            &backend,
            &image,
            &CropRequest::aspect(4, 3),
            CropMode::Auto,
            Quality::default(),
            None,
        )
        .unwrap();
        assert_eq!(output, PathBuf::from("/covers/a_1200x900.jpeg"));
    }

    #[test]
    fn crop_manual_out_of_bounds_fails() {
        let backend = MockBackend::with_info(300, 300, ImageKind::Png);
        let image = open(&backend, "/covers/a.png");
        let request = CropRequest {
            left: Some(200),
            top: Some(200),
            width: Some(200),
            height: Some(200),
        };

        let result = crop(
            &backend,
            &image,
            &request,
            CropMode::Manual,
            Quality::default(),
            None,
        );
        assert!(matches!(result, Err(ImagingError::OutOfBounds { .. })));
    }

    #[test]
    fn crop_without_target_is_square() {
        let backend = MockBackend::with_info(640, 480, ImageKind::Png);
        let image = open(&backend, "/covers/a.png");

        let params = plan_crop(
            &image,
            &CropRequest::default(),
            CropMode::Auto,
            Quality::default(),
            None,
        )
        .unwrap();
        assert_eq!(params.output, PathBuf::from("/covers/a_480x480.png"));
    }

    // =========================================================================
    // resize
    // =========================================================================

    #[test]
    fn resize_computes_height_and_name() {
        let backend = MockBackend::with_info(2000, 1500, ImageKind::Jpeg);
        let image = open(&backend, "/covers/a_1200x900.jpg");

        let output = resize(&backend, &image, 1000, Quality::new(75), None).unwrap();
        assert_eq!(output, PathBuf::from("/covers/a_1000.jpg"));

        let ops = backend.get_operations();
        assert!(matches!(
            ops.last(),
            Some(RecordedOp::Resize {
                width: 1000,
                height: 750,
                quality: 75,
                ..
            })
        ));
    }

    #[test]
    fn resize_to_zero_fails_before_backend() {
        let backend = MockBackend::with_info(100, 100, ImageKind::Jpeg);
        let image = open(&backend, "/covers/a.jpg");

        assert!(resize(&backend, &image, 0, Quality::default(), None).is_err());
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::Resize { .. }))
        );
    }
}
