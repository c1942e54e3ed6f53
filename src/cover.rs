//! The cover entity: a stored cover image described as one flat table row.
//!
//! Persistence belongs to an external data mapper. This module only supplies
//! what such a mapper needs:
//!
//! - [`TABLE`]: table name
//! - [`COLUMNS`]: every column with the scalar type its values are cast to
//! - [`FILLABLE`]: columns open to mass assignment (everything but `id`)
//!
//! Untyped attributes (a decoded request body, a database row) become a typed
//! [`Cover`] through [`Cover::from_row`] or [`Cover::fill`]; each value is cast
//! according to [`COLUMNS`] and rejected if it cannot be.
//!
//! ## Column types
//!
//! | Column | Type | Rust field |
//! |---|---|---|
//! | `id` | integer | `Option<i64>` (unset until persisted) |
//! | `file_id`, `media_type`, `host`, `dir`, `name`, `ext`, `hash`, `sizes` | string | `String` |
//! | `type` | integer | `type_code: i64` (see [`ImageKind::code`]) |
//! | `size` | double | `f64` (bytes) |
//! | `time` | integer | `i64` (unix seconds) |
//! | `hide`, `resize_status` | integer | `bool` (stored as 0/1) |

use crate::imaging::{ImageKind, ImagingError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use thiserror::Error;

/// Table the data mapper stores covers in.
pub const TABLE: &str = "cover";

/// Salt mixed into upload secret keys.
pub const SALT: &str = "cover";

/// Scalar type a column's values are cast to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Double,
    String,
}

/// Every column and its cast.
pub const COLUMNS: &[(&str, FieldKind)] = &[
    ("id", FieldKind::Integer),
    ("file_id", FieldKind::String),
    ("media_type", FieldKind::String),
    ("type", FieldKind::Integer),
    ("host", FieldKind::String),
    ("dir", FieldKind::String),
    ("name", FieldKind::String),
    ("ext", FieldKind::String),
    ("size", FieldKind::Double),
    ("hash", FieldKind::String),
    ("sizes", FieldKind::String),
    ("time", FieldKind::Integer),
    ("hide", FieldKind::Integer),
    ("resize_status", FieldKind::Integer),
];

/// Columns that may be mass-assigned.
pub const FILLABLE: &[&str] = &[
    "file_id",
    "media_type",
    "type",
    "host",
    "dir",
    "name",
    "ext",
    "size",
    "hash",
    "sizes",
    "time",
    "hide",
    "resize_status",
];

pub fn column_kind(column: &str) -> Option<FieldKind> {
    COLUMNS
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, kind)| *kind)
}

pub fn is_fillable(column: &str) -> bool {
    FILLABLE.contains(&column)
}

#[derive(Error, Debug)]
pub enum FieldError {
    #[error("Unknown column `{0}`")]
    UnknownField(String),
    #[error("Column `{0}` is not fillable")]
    NotFillable(String),
    #[error("Column `{field}` expects {expected:?}, got {value}")]
    Cast {
        field: String,
        expected: FieldKind,
        value: Value,
    },
    #[error("Malformed size variants: {0}")]
    Sizes(#[from] serde_json::Error),
}

/// Domain errors surfaced to whoever handles an upload.
///
/// Each kind has a stable numeric [`code`](Self::code) for API responses.
#[derive(Error, Debug)]
pub enum CoverError {
    #[error("Required fields missing: {0}")]
    RequiredFields(String),
    #[error("Secret key does not match")]
    SecretKey,
    #[error("Not a supported image: {0}")]
    Type(#[source] ImagingError),
    #[error("Upload not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Upload failed: {0}")]
    FailUpload(#[source] std::io::Error),
    #[error("Could not move upload into storage: {0}")]
    FailMove(#[source] std::io::Error),
    #[error("File is {size} bytes, below the {min} byte minimum")]
    MinSize { size: u64, min: u64 },
    #[error("File is {size} bytes, above the {max} byte maximum")]
    MaxSize { size: u64, max: u64 },
    #[error("{0} images are not allowed")]
    AllowTypes(ImageKind),
    #[error("Optimizing failed: {0}")]
    Optimize(#[source] ImagingError),
    #[error("Cropping failed: {0}")]
    Crop(#[source] ImagingError),
}

impl CoverError {
    pub fn code(&self) -> u32 {
        match self {
            CoverError::RequiredFields(_) => 1,
            CoverError::SecretKey => 2,
            CoverError::Type(_) => 3,
            CoverError::NotFound(_) => 4,
            CoverError::FailUpload(_) => 5,
            CoverError::FailMove(_) => 6,
            CoverError::MinSize { .. } => 7,
            CoverError::MaxSize { .. } => 8,
            CoverError::AllowTypes(_) => 9,
            CoverError::Optimize(_) => 10,
            CoverError::Crop(_) => 11,
        }
    }
}

// Casts follow the loose typing of a database row or decoded request body:
// integers accept integral numbers, numeric strings and booleans; doubles
// accept numbers and numeric strings; strings accept strings and numbers.

fn cast_error(field: &str, expected: FieldKind, value: &Value) -> FieldError {
    FieldError::Cast {
        field: field.to_string(),
        expected,
        value: value.clone(),
    }
}

fn cast_integer(field: &str, value: &Value) -> Result<i64, FieldError> {
    let cast = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    };
    cast.ok_or_else(|| cast_error(field, FieldKind::Integer, value))
}

fn cast_double(field: &str, value: &Value) -> Result<f64, FieldError> {
    let cast = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    };
    cast.ok_or_else(|| cast_error(field, FieldKind::Double, value))
}

fn cast_string(field: &str, value: &Value) -> Result<String, FieldError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(cast_error(field, FieldKind::String, value)),
    }
}

/// One generated derivative, as recorded in the `sizes` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeVariant {
    /// `square`, `crop`, or the resized width.
    pub label: String,
    /// Filename within the cover's directory.
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// A stored cover image record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cover {
    pub id: Option<i64>,
    pub file_id: String,
    pub media_type: String,
    /// Codec type code, stored in the `type` column.
    pub type_code: i64,
    pub host: String,
    pub dir: String,
    pub name: String,
    pub ext: String,
    pub size: f64,
    pub hash: String,
    pub sizes: String,
    pub time: i64,
    pub hide: bool,
    pub resize_status: bool,
}

impl Cover {
    /// Build a cover from a full row. Any column may be present, `id` included.
    pub fn from_row(attributes: &Map<String, Value>) -> Result<Self, FieldError> {
        let mut cover = Cover::default();
        for (column, value) in attributes {
            cover.set(column, value)?;
        }
        Ok(cover)
    }

    /// Mass-assign fillable columns. Stops at the first invalid attribute;
    /// the record is left unchanged in that case.
    pub fn fill(&mut self, attributes: &Map<String, Value>) -> Result<(), FieldError> {
        let mut next = self.clone();
        for (column, value) in attributes {
            if column_kind(column).is_none() {
                return Err(FieldError::UnknownField(column.clone()));
            }
            if !is_fillable(column) {
                return Err(FieldError::NotFillable(column.clone()));
            }
            next.set(column, value)?;
        }
        *self = next;
        Ok(())
    }

    fn set(&mut self, column: &str, value: &Value) -> Result<(), FieldError> {
        if column == "id" && value.is_null() {
            self.id = None;
            return Ok(());
        }
        match column {
            "id" => self.id = Some(cast_integer(column, value)?),
            "file_id" => self.file_id = cast_string(column, value)?,
            "media_type" => self.media_type = cast_string(column, value)?,
            "type" => self.type_code = cast_integer(column, value)?,
            "host" => self.host = cast_string(column, value)?,
            "dir" => self.dir = cast_string(column, value)?,
            "name" => self.name = cast_string(column, value)?,
            "ext" => self.ext = cast_string(column, value)?,
            "size" => self.size = cast_double(column, value)?,
            "hash" => self.hash = cast_string(column, value)?,
            "sizes" => self.sizes = cast_string(column, value)?,
            "time" => self.time = cast_integer(column, value)?,
            "hide" => self.hide = cast_integer(column, value)? != 0,
            "resize_status" => self.resize_status = cast_integer(column, value)? != 0,
            _ => return Err(FieldError::UnknownField(column.to_string())),
        }
        Ok(())
    }

    /// The record as column → scalar pairs, flags as 0/1. `id` is omitted
    /// while unset.
    pub fn to_row(&self) -> Map<String, Value> {
        let mut row = Map::new();
        if let Some(id) = self.id {
            row.insert("id".into(), id.into());
        }
        row.insert("file_id".into(), self.file_id.clone().into());
        row.insert("media_type".into(), self.media_type.clone().into());
        row.insert("type".into(), self.type_code.into());
        row.insert("host".into(), self.host.clone().into());
        row.insert("dir".into(), self.dir.clone().into());
        row.insert("name".into(), self.name.clone().into());
        row.insert("ext".into(), self.ext.clone().into());
        row.insert(
            "size".into(),
            Number::from_f64(self.size).map_or(Value::Null, Value::Number),
        );
        row.insert("hash".into(), self.hash.clone().into());
        row.insert("sizes".into(), self.sizes.clone().into());
        row.insert("time".into(), self.time.into());
        row.insert("hide".into(), i64::from(self.hide).into());
        row.insert("resize_status".into(), i64::from(self.resize_status).into());
        row
    }

    pub fn kind(&self) -> Option<ImageKind> {
        ImageKind::from_code(self.type_code)
    }

    /// Stored filename, `{name}.{ext}`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.ext)
    }

    pub fn size_variants(&self) -> Result<Vec<SizeVariant>, FieldError> {
        if self.sizes.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&self.sizes)?)
    }

    pub fn set_size_variants(&mut self, variants: &[SizeVariant]) -> Result<(), FieldError> {
        self.sizes = serde_json::to_string(variants)?;
        Ok(())
    }
}

/// Secret key an uploader must present for `file_id`: SHA-256 hex of
/// `SALT + file_id`.
pub fn secret_key(file_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(SALT.as_bytes());
    hasher.update(file_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn verify_secret_key(file_id: &str, key: &str) -> bool {
    secret_key(file_id).eq_ignore_ascii_case(key.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    // =========================================================================
    // Static metadata
    // =========================================================================

    #[test]
    fn every_fillable_column_has_a_cast() {
        for column in FILLABLE {
            assert!(column_kind(column).is_some(), "{column} missing from COLUMNS");
        }
    }

    #[test]
    fn id_is_the_only_guarded_column() {
        let guarded: Vec<&str> = COLUMNS
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| !is_fillable(name))
            .collect();
        assert_eq!(guarded, vec!["id"]);
    }

    #[test]
    fn size_is_a_double() {
        assert_eq!(column_kind("size"), Some(FieldKind::Double));
        assert_eq!(column_kind("missing"), None);
    }

    // =========================================================================
    // Casting
    // =========================================================================

    #[test]
    fn from_row_casts_loose_values() {
        let cover = Cover::from_row(&attrs(json!({
            "id": "42",
            "file_id": 1001,
            "type": 2,
            "size": "2048.5",
            "time": 1_700_000_000,
            "hide": true,
            "resize_status": "0",
        })))
        .unwrap();

        assert_eq!(cover.id, Some(42));
        assert_eq!(cover.file_id, "1001");
        assert_eq!(cover.kind(), Some(ImageKind::Jpeg));
        assert_eq!(cover.size, 2048.5);
        assert_eq!(cover.time, 1_700_000_000);
        assert!(cover.hide);
        assert!(!cover.resize_status);
    }

    #[test]
    fn integral_float_casts_to_integer() {
        let cover = Cover::from_row(&attrs(json!({ "time": 12.0 }))).unwrap();
        assert_eq!(cover.time, 12);
    }

    #[test]
    fn fractional_float_is_not_an_integer() {
        let err = Cover::from_row(&attrs(json!({ "time": 12.5 }))).unwrap_err();
        assert!(matches!(
            err,
            FieldError::Cast {
                expected: FieldKind::Integer,
                ..
            }
        ));
    }

    #[test]
    fn object_is_not_a_string() {
        let err = Cover::from_row(&attrs(json!({ "host": { "a": 1 } }))).unwrap_err();
        assert!(matches!(err, FieldError::Cast { field, .. } if field == "host"));
    }

    #[test]
    fn non_numeric_strings_are_rejected_not_zeroed() {
        let err = Cover::from_row(&attrs(json!({ "time": "soon" }))).unwrap_err();
        assert!(matches!(
            err,
            FieldError::Cast {
                expected: FieldKind::Integer,
                ..
            }
        ));
        let err = Cover::from_row(&attrs(json!({ "size": "big" }))).unwrap_err();
        assert!(matches!(
            err,
            FieldError::Cast {
                expected: FieldKind::Double,
                ..
            }
        ));
    }

    #[test]
    fn cast_errors_name_the_column_type() {
        for (column, kind) in COLUMNS {
            let mut row = Map::new();
            row.insert(column.to_string(), json!([1]));
            let err = Cover::from_row(&row).unwrap_err();
            assert!(
                matches!(&err, FieldError::Cast { field, expected, .. }
                    if field == column && expected == kind),
                "{column}: {err}"
            );
        }
    }

    #[test]
    fn null_id_means_unsaved() {
        let cover = Cover::from_row(&attrs(json!({ "id": null }))).unwrap();
        assert_eq!(cover.id, None);
    }

    #[test]
    fn unknown_column_is_rejected() {
        let err = Cover::from_row(&attrs(json!({ "owner": "x" }))).unwrap_err();
        assert!(matches!(err, FieldError::UnknownField(c) if c == "owner"));
    }

    // =========================================================================
    // Mass assignment
    // =========================================================================

    #[test]
    fn fill_assigns_fillable_columns() {
        let mut cover = Cover::default();
        cover
            .fill(&attrs(json!({ "host": "cdn1", "hide": 1 })))
            .unwrap();
        assert_eq!(cover.host, "cdn1");
        assert!(cover.hide);
    }

    #[test]
    fn fill_refuses_id() {
        let mut cover = Cover::default();
        let err = cover.fill(&attrs(json!({ "id": 9 }))).unwrap_err();
        assert!(matches!(err, FieldError::NotFillable(c) if c == "id"));
    }

    #[test]
    fn failed_fill_leaves_record_untouched() {
        let mut cover = Cover {
            host: "cdn1".into(),
            ..Cover::default()
        };
        let result = cover.fill(&attrs(json!({ "host": "cdn2", "size": "big" })));
        assert!(result.is_err());
        assert_eq!(cover.host, "cdn1");
    }

    #[test]
    fn to_row_roundtrips_through_from_row() {
        let cover = Cover {
            id: Some(7),
            file_id: "abc".into(),
            media_type: "image/png".into(),
            type_code: 3,
            host: "cdn1".into(),
            dir: "covers/abc".into(),
            name: "abc".into(),
            ext: "png".into(),
            size: 1234.0,
            hash: "ff".into(),
            sizes: "[]".into(),
            time: 99,
            hide: true,
            resize_status: true,
        };
        let row = cover.to_row();
        assert_eq!(row["hide"], json!(1));
        assert_eq!(row["type"], json!(3));
        assert_eq!(Cover::from_row(&row).unwrap(), cover);
    }

    #[test]
    fn to_row_omits_unset_id() {
        assert!(!Cover::default().to_row().contains_key("id"));
    }

    // =========================================================================
    // Size variants and keys
    // =========================================================================

    #[test]
    fn size_variants_roundtrip() {
        let mut cover = Cover::default();
        assert!(cover.size_variants().unwrap().is_empty());

        let variants = vec![SizeVariant {
            label: "480".into(),
            name: "abc_480.jpg".into(),
            width: 480,
            height: 270,
        }];
        cover.set_size_variants(&variants).unwrap();
        assert_eq!(cover.size_variants().unwrap(), variants);
    }

    #[test]
    fn malformed_sizes_is_error() {
        let cover = Cover {
            sizes: "{not json".into(),
            ..Cover::default()
        };
        assert!(matches!(cover.size_variants(), Err(FieldError::Sizes(_))));
    }

    #[test]
    fn secret_key_is_salted_sha256() {
        let key = secret_key("abc");
        assert_eq!(key.len(), 64);
        assert_ne!(key, secret_key("abd"));
        assert!(verify_secret_key("abc", &key.to_uppercase()));
        assert!(!verify_secret_key("abc", "deadbeef"));
    }

    #[test]
    fn error_codes_are_stable() {
        let io = || std::io::Error::other("x");
        let img = || ImagingError::Decode("x".into());
        let codes: Vec<u32> = [
            CoverError::RequiredFields("host".into()),
            CoverError::SecretKey,
            CoverError::Type(img()),
            CoverError::NotFound(PathBuf::from("/x")),
            CoverError::FailUpload(io()),
            CoverError::FailMove(io()),
            CoverError::MinSize { size: 0, min: 1 },
            CoverError::MaxSize { size: 2, max: 1 },
            CoverError::AllowTypes(ImageKind::Gif),
            CoverError::Optimize(img()),
            CoverError::Crop(img()),
        ]
        .iter()
        .map(CoverError::code)
        .collect();
        assert_eq!(codes, (1..=11).collect::<Vec<_>>());
    }
}
