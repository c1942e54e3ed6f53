//! Cover processing configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user `config.toml` only needs the keys it overrides.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [images]
//! quality = 90                      # JPEG quality (1-100)
//!
//! [upload]
//! allowed_types = ["jpeg", "png", "gif"]
//! min_size = 1                      # Smallest accepted upload, in bytes
//! max_size = 10485760               # Largest accepted upload, in bytes
//!
//! [derivatives]
//! square = true                     # Produce a centered square crop
//! aspect_ratio = [16, 9]            # Cover crop aspect (width, height)
//! widths = [480, 960, 1440]         # Resized widths of the cover crop
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{ImageKind, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoverConfig {
    /// Encoding settings shared by every operation.
    pub images: ImagesConfig,
    /// Bounds an upload must meet before any processing.
    pub upload: UploadConfig,
    /// Which derivatives to generate from an accepted upload.
    pub derivatives: DerivativesConfig,
}

impl CoverConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.images.quality) {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.upload.allowed_types.is_empty() {
            return Err(ConfigError::Validation(
                "upload.allowed_types must not be empty".into(),
            ));
        }
        if self.upload.min_size > self.upload.max_size {
            return Err(ConfigError::Validation(
                "upload.min_size must not exceed upload.max_size".into(),
            ));
        }
        if self.derivatives.aspect_ratio.contains(&0) {
            return Err(ConfigError::Validation(
                "derivatives.aspect_ratio values must be non-zero".into(),
            ));
        }
        if self.derivatives.widths.contains(&0) {
            return Err(ConfigError::Validation(
                "derivatives.widths must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.images.quality)
    }
}

/// Encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// JPEG encoding quality (1 = worst, 100 = best). PNG and GIF are lossless.
    pub quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self { quality: 90 }
    }
}

/// Upload acceptance bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Container types accepted as covers.
    pub allowed_types: Vec<ImageKind>,
    /// Minimum file size in bytes.
    pub min_size: u64,
    /// Maximum file size in bytes.
    pub max_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_types: ImageKind::ALL.to_vec(),
            min_size: 1,
            max_size: 10 * 1024 * 1024,
        }
    }
}

/// Derivative generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DerivativesConfig {
    /// Produce a centered square crop alongside the cover crop.
    pub square: bool,
    /// Cover crop aspect ratio as `[width, height]`.
    pub aspect_ratio: [u32; 2],
    /// Widths to resize the cover crop to. Widths larger than the crop are skipped.
    pub widths: Vec<u32>,
}

impl Default for DerivativesConfig {
    fn default() -> Self {
        Self {
            square: true,
            aspect_ratio: [16, 9],
            widths: vec![480, 960, 1440],
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(CoverConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<CoverConfig, ConfigError> {
    let merged = match load_raw_config(dir)? {
        Some(overlay) => merge_toml(stock_defaults_value()?, overlay),
        None => stock_defaults_value()?,
    };
    let config: CoverConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# coverkit configuration
# ======================
# Every key is optional; omitted keys keep the values shown here.

[images]
# JPEG encoding quality, 1 (smallest) to 100 (best).
# PNG and GIF outputs are lossless and ignore it.
quality = 90

[upload]
# Container types accepted as covers: "jpeg", "png", "gif".
allowed_types = ["jpeg", "png", "gif"]
# Accepted upload size range, in bytes.
min_size = 1
max_size = 10485760

[derivatives]
# Write a centered square crop (<file_id>_square<side>.<ext>).
square = true
# Aspect ratio of the cover crop (<file_id>_<w>x<h>.<ext>), as [width, height].
aspect_ratio = [16, 9]
# Widths the cover crop is resized to (<file_id>_<width>.<ext>).
# Widths larger than the crop itself are skipped.
widths = [480, 960, 1440]
"##
}
