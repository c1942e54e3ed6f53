//! Upload processing: from a raw uploaded file to a stored cover record.
//!
//! ```text
//! upload ──► validate ──► move into storage ──► optimize ──► derivatives ──► Cover
//!            fields/key    {file_id}.{ext}      EXIF-rotate   square, crop,
//!            type/size                          re-encode     resized crops
//! ```
//!
//! Every failure maps onto one [`CoverError`] kind so callers can report a
//! stable error code. A failure after the upload was moved rolls back: the
//! derivatives written so far are removed and the upload goes back where it
//! arrived. Nothing is persisted here; the returned [`Cover`] is handed to
//! whatever data mapper stores it.

use crate::config::CoverConfig;
use crate::cover::{Cover, CoverError, SizeVariant, verify_secret_key};
use crate::imaging::{
    CropMode, CropRequest, ImageBackend, ImageInfo, ImageRef, ImagingError, SquareCropRequest,
    optimize, plan_crop, plan_resize, plan_square,
};
use crate::naming::strip_root;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Everything known about an upload when it arrives.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// Where the uploaded file currently lives.
    pub upload: PathBuf,
    /// Directory the cover and its derivatives are stored in.
    pub storage_dir: PathBuf,
    /// Storage root; the cover's `dir` is recorded relative to it.
    pub root: Option<PathBuf>,
    pub file_id: String,
    pub host: String,
    pub hide: bool,
    /// Secret key presented by the uploader, checked when given.
    pub key: Option<String>,
}

/// A processed upload.
#[derive(Debug, Clone)]
pub struct ProcessedCover {
    /// Record ready to persist.
    pub cover: Cover,
    /// Stored, optimized cover file.
    pub path: PathBuf,
    /// Derivatives written next to it, in generation order.
    pub variants: Vec<SizeVariant>,
}

impl ProcessedCover {
    pub fn variant_paths(&self) -> Vec<PathBuf> {
        let dir = self.path.parent().unwrap_or(Path::new(""));
        self.variants.iter().map(|v| dir.join(&v.name)).collect()
    }
}

/// Validate, store, optimize and derive an uploaded cover.
pub fn process_upload(
    backend: &impl ImageBackend,
    request: &UploadRequest,
    config: &CoverConfig,
) -> Result<ProcessedCover, CoverError> {
    check_fields(request)?;

    if request
        .key
        .as_deref()
        .is_some_and(|key| !verify_secret_key(&request.file_id, key))
    {
        return Err(CoverError::SecretKey);
    }

    if !request.upload.is_file() {
        return Err(CoverError::NotFound(request.upload.clone()));
    }
    let info = backend.identify(&request.upload).map_err(CoverError::Type)?;
    check_upload(&request.upload, info, config)?;

    let (stored, moved) = store_upload(request, info)?;
    let mut variants = Vec::new();
    let cover = match finish_upload(backend, request, config, info, &stored, &mut variants) {
        Ok(cover) => cover,
        Err(e) => {
            roll_back(request, &stored, moved, &variants);
            return Err(e);
        }
    };

    info!(
        file_id = %cover.file_id,
        path = %stored.display(),
        variants = variants.len(),
        "processed cover"
    );
    Ok(ProcessedCover {
        cover,
        path: stored,
        variants,
    })
}

/// Everything after the upload is in storage. Derivatives are recorded in
/// `variants` as soon as they are written.
fn finish_upload(
    backend: &impl ImageBackend,
    request: &UploadRequest,
    config: &CoverConfig,
    info: ImageInfo,
    stored: &Path,
    variants: &mut Vec<SizeVariant>,
) -> Result<Cover, CoverError> {
    let mut image = ImageRef::open(backend, stored).map_err(CoverError::Optimize)?;
    optimize(backend, &mut image, config.quality(), None).map_err(CoverError::Optimize)?;

    write_derivatives(backend, &image, &request.file_id, config, variants)
        .map_err(CoverError::Crop)?;

    let bytes = fs::read(stored).map_err(|e| CoverError::Optimize(ImagingError::Io(e)))?;
    let dir = match &request.root {
        Some(root) => strip_root(root, &request.storage_dir),
        None => request.storage_dir.clone(),
    };

    let mut cover = Cover {
        id: None,
        file_id: request.file_id.clone(),
        media_type: info.kind.media_type().to_string(),
        type_code: i64::from(info.kind.code()),
        host: request.host.clone(),
        dir: dir.to_string_lossy().into_owned(),
        name: request.file_id.clone(),
        ext: info.kind.extension().to_string(),
        size: bytes.len() as f64,
        hash: format!("{:x}", Sha256::digest(&bytes)),
        sizes: String::new(),
        time: chrono::Utc::now().timestamp(),
        hide: request.hide,
        resize_status: true,
    };
    cover
        .set_size_variants(variants.as_slice())
        .map_err(|e| CoverError::Crop(ImagingError::Encode(e.to_string())))?;
    Ok(cover)
}

/// Undo a half-processed upload: remove the derivatives written so far and
/// put the upload back where it arrived. An upload that was already in
/// storage stays.
fn roll_back(request: &UploadRequest, stored: &Path, moved: bool, variants: &[SizeVariant]) {
    let dir = stored.parent().unwrap_or(Path::new(""));
    for variant in variants {
        let path = dir.join(&variant.name);
        if let Err(e) = fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "could not remove derivative");
        }
    }
    if !moved {
        return;
    }
    if let Err(e) = move_file(stored, &request.upload) {
        warn!(path = %stored.display(), error = %e, "could not restore upload, removing it");
        if let Err(e) = fs::remove_file(stored) {
            warn!(path = %stored.display(), error = %e, "could not remove stored upload");
        }
    }
    debug!(upload = %request.upload.display(), "upload rolled back");
}

fn check_fields(request: &UploadRequest) -> Result<(), CoverError> {
    let mut missing = Vec::new();
    if request.file_id.trim().is_empty() {
        missing.push("file_id");
    }
    if request.host.trim().is_empty() {
        missing.push("host");
    }
    if !missing.is_empty() {
        return Err(CoverError::RequiredFields(missing.join(", ")));
    }

    // file_id becomes a filename inside the storage dir
    let id = request.file_id.as_str();
    if id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(CoverError::RequiredFields(format!(
            "file_id `{id}` is not a plain name"
        )));
    }
    Ok(())
}

fn check_upload(path: &Path, info: ImageInfo, config: &CoverConfig) -> Result<(), CoverError> {
    if !config.upload.allowed_types.contains(&info.kind) {
        return Err(CoverError::AllowTypes(info.kind));
    }
    let size = fs::metadata(path).map_err(CoverError::FailUpload)?.len();
    if size < config.upload.min_size {
        return Err(CoverError::MinSize {
            size,
            min: config.upload.min_size,
        });
    }
    if size > config.upload.max_size {
        return Err(CoverError::MaxSize {
            size,
            max: config.upload.max_size,
        });
    }
    debug!(path = %path.display(), kind = %info.kind, size, "upload accepted");
    Ok(())
}

/// Move the upload to `{storage_dir}/{file_id}.{ext}`.
///
/// Returns the stored path and whether the file was moved to get there.
fn store_upload(request: &UploadRequest, info: ImageInfo) -> Result<(PathBuf, bool), CoverError> {
    fs::create_dir_all(&request.storage_dir).map_err(CoverError::FailUpload)?;
    let target = request
        .storage_dir
        .join(format!("{}.{}", request.file_id, info.kind.extension()));
    if target == request.upload {
        return Ok((target, false));
    }

    move_file(&request.upload, &target).map_err(CoverError::FailMove)?;
    debug!(from = %request.upload.display(), to = %target.display(), "upload stored");
    Ok((target, true))
}

fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Err(e) = fs::rename(from, to) {
        // Different filesystem: fall back to copy + remove
        debug!(error = %e, "rename failed, copying");
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}

fn write_derivatives(
    backend: &impl ImageBackend,
    image: &ImageRef,
    file_id: &str,
    config: &CoverConfig,
    variants: &mut Vec<SizeVariant>,
) -> Result<(), ImagingError> {
    let quality = config.quality();
    let ext = image.output_ext().to_string();

    if config.derivatives.square {
        let params = plan_square(image, &SquareCropRequest::default(), quality, None)?;
        backend.crop(&params)?;
        variants.push(variant(
            "square",
            &params.output,
            params.region.width,
            params.region.height,
        ));
    }

    let [aspect_w, aspect_h] = config.derivatives.aspect_ratio;
    let params = plan_crop(
        image,
        &CropRequest::aspect(aspect_w, aspect_h),
        CropMode::Auto,
        quality,
        None,
    )?;
    backend.crop(&params)?;
    variants.push(variant(
        "crop",
        &params.output,
        params.region.width,
        params.region.height,
    ));

    let cropped = ImageRef::planned(
        &params.output,
        ImageInfo {
            width: params.region.width,
            height: params.region.height,
            kind: image.info.kind,
        },
    );
    for &width in &config.derivatives.widths {
        if width > cropped.info.width {
            debug!(width, crop_width = cropped.info.width, "skipping width wider than crop");
            continue;
        }
        let name = format!("{file_id}_{width}.{ext}");
        let params = plan_resize(&cropped, width, quality, Some(&name))?;
        backend.resize(&params)?;
        variants.push(variant(
            &width.to_string(),
            &params.output,
            params.width,
            params.height,
        ));
    }

    Ok(())
}

fn variant(label: &str, output: &Path, width: u32, height: u32) -> SizeVariant {
    SizeVariant {
        label: label.to_string(),
        name: output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        width,
        height,
    }
}
