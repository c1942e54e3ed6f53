//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>` or `String`)
//! for testability and, where useful, a `print_*` wrapper that writes to
//! stdout. Format functions are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Info
//!
//! ```text
//! cover.jpg
//!     Type: jpeg (image/jpeg, code 2)
//!     Size: 1600x1200
//!     EXIF rotation: -90°
//! ```
//!
//! ## Process
//!
//! ```text
//! abc → covers/abc/abc.jpg
//!     square: abc_square1200.jpg (1200x1200)
//!     crop: abc_1600x900.jpg (1600x900)
//!     480: abc_480.jpg (480x270)
//!     Hash: 3f2a…
//! ```

use crate::cover::{Cover, CoverError, SizeVariant};
use crate::imaging::{ImageInfo, ImageRef, Rotation};
use crate::process::ProcessedCover;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn variant_line(variant: &SizeVariant) -> String {
    format!(
        "{}{}: {} ({}x{})",
        indent(1),
        variant.label,
        variant.name,
        variant.width,
        variant.height
    )
}

fn info_lines(info: &ImageInfo) -> Vec<String> {
    vec![
        format!(
            "{}Type: {} ({}, code {})",
            indent(1),
            info.kind,
            info.kind.media_type(),
            info.kind.code()
        ),
        format!("{}Size: {}x{}", indent(1), info.width, info.height),
    ]
}

// ============================================================================
// Single-image commands
// ============================================================================

pub fn format_info(image: &ImageRef, rotation: Rotation) -> Vec<String> {
    let mut lines = vec![file_label(&image.path)];
    lines.extend(info_lines(&image.info));
    if !rotation.is_none() {
        lines.push(format!("{}EXIF rotation: {}", indent(1), rotation));
    }
    lines
}

pub fn print_info(image: &ImageRef, rotation: Rotation) {
    for line in format_info(image, rotation) {
        println!("{}", line);
    }
}

/// Result of an in-place optimize.
pub fn format_optimized(image: &ImageRef, rotation: Rotation) -> Vec<String> {
    let mut lines = vec![format!("Optimized: {}", image.path.display())];
    if !rotation.is_none() {
        lines.push(format!("{}Rotated: {}", indent(1), rotation));
    }
    lines.extend(info_lines(&image.info));
    lines
}

pub fn print_optimized(image: &ImageRef, rotation: Rotation) {
    for line in format_optimized(image, rotation) {
        println!("{}", line);
    }
}

/// One derivative written by `square`, `crop` or `resize`.
pub fn format_written(output: &Path, info: &ImageInfo) -> String {
    format!("Wrote: {} ({}x{})", output.display(), info.width, info.height)
}

// ============================================================================
// Upload processing
// ============================================================================

pub fn format_processed(processed: &ProcessedCover) -> Vec<String> {
    let cover = &processed.cover;
    let mut lines = vec![format!(
        "{} → {}",
        cover.file_id,
        Path::new(&cover.dir).join(cover.file_name()).display()
    )];
    lines.extend(processed.variants.iter().map(variant_line));
    lines.push(format!("{}Hash: {}", indent(1), cover.hash));
    lines
}

/// The cover as its persisted row, pretty-printed JSON.
pub fn format_cover_row(cover: &Cover) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&cover.to_row())
}

/// Upload failures carry their stable code.
pub fn format_cover_error(error: &CoverError) -> String {
    format!("error {}: {}", error.code(), error)
}
