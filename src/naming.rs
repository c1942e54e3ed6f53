//! Filename conventions for derived images.
//!
//! Every derivative is written next to its source, named after the source
//! stem plus a suffix describing the operation:
//!
//! | Operation | Pattern | `cover.jpg` example |
//! |---|---|---|
//! | Square crop | `{stem}_square{side}.{ext}` | `cover_square600.jpg` |
//! | Aspect crop | `{stem}_{w}x{h}.{ext}` | `cover_800x450.jpg` |
//! | Resize | `{prefix}_{w}.{ext}` | `cover_480.jpg` |
//!
//! For resizes, `prefix` is the stem up to its first underscore, so resizing
//! `cover_800x450.jpg` produces `cover_480.jpg` rather than stacking suffixes.

use crate::imaging::{ImageKind, ImagingError};
use std::path::{Path, PathBuf};

/// A source path split into the parts derived names are built from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceName {
    /// Containing directory (empty for a bare filename).
    pub dir: PathBuf,
    /// Filename without its last extension.
    pub stem: String,
    /// Last extension without the dot, as written. Empty if none.
    pub ext: String,
}

/// Split a path into directory, stem and extension.
///
/// - `"/covers/a.b.jpg"` → dir="/covers", stem="a.b", ext="jpg"
/// - `"upload"` → dir="", stem="upload", ext=""
pub fn split_source(path: &Path) -> SourceName {
    SourceName {
        dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        stem: path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        ext: path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

pub fn square_name(stem: &str, side: u32, ext: &str) -> String {
    format!("{stem}_square{side}.{ext}")
}

pub fn crop_name(stem: &str, width: u32, height: u32, ext: &str) -> String {
    format!("{stem}_{width}x{height}.{ext}")
}

pub fn resize_name(stem: &str, width: u32, ext: &str) -> String {
    let prefix = stem.split('_').next().unwrap_or(stem);
    format!("{prefix}_{width}.{ext}")
}

/// Validate a caller-supplied output filename for a `kind` image.
///
/// The name must be a bare filename (outputs stay in the source directory).
/// A missing extension gets the canonical one appended; an extension for a
/// different codec is rejected.
pub fn checked_output_name(name: &str, kind: ImageKind) -> Result<String, ImagingError> {
    let path = Path::new(name);
    let is_bare = path.file_name().is_some_and(|f| f == path.as_os_str());
    if !is_bare || name.contains(['/', '\\']) {
        return Err(ImagingError::InvalidFilename(format!(
            "{name}: must not contain a directory"
        )));
    }
    match path.extension().and_then(|e| e.to_str()) {
        None => Ok(format!("{name}.{}", kind.extension())),
        Some(ext) if kind.matches_extension(ext) => Ok(name.to_string()),
        Some(ext) => Err(ImagingError::InvalidFilename(format!(
            "{name}: .{ext} does not match {kind} output"
        ))),
    }
}

/// Path relative to a storage root; unchanged if it is not under the root.
pub fn strip_root(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}
