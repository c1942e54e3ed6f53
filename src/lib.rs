//! # coverkit
//!
//! Cover image handling for a media upload service: inspect an uploaded
//! image, straighten it from its EXIF orientation, cut the square, aspect and
//! resized derivatives a front end needs, and describe the result as a flat
//! `cover` table row.
//!
//! # Pipeline
//!
//! ```text
//! upload  ──►  identify  ──►  store + optimize  ──►  derivatives  ──►  Cover row
//!              (header)       (auto-rotate,          (square, aspect
//!                              re-encode)             crop, widths)
//! ```
//!
//! Every step is also available on its own, both as library functions in
//! [`imaging`] and as `coverkit` subcommands.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Inspect, orientation, square/aspect crop and resize over the `image` crate |
//! | [`naming`] | Derived filename rules (`_square600`, `_800x450`, `_480`) |
//! | [`cover`] | The `Cover` entity, its column cast table and the upload error catalog |
//! | [`process`] | Upload pipeline producing a stored cover and its derivatives |
//! | [`config`] | `config.toml` loading, validation and merging over stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Geometry Apart From Pixels
//!
//! Crop boxes and resize dimensions are pure functions of the source size and
//! the request. The [`imaging::ImageBackend`] trait only moves pixels between
//! files, so every geometric decision is unit tested against a mock backend
//! without encoding a single image.
//!
//! ## Same Codec In, Same Codec Out
//!
//! A derivative is always encoded with the codec detected in its source, and
//! its extension is derived from that codec. A `.jpg` that is really a PNG
//! produces `.png` derivatives.
//!
//! ## No Partial Files
//!
//! Every write goes to a temporary file in the destination directory and is
//! renamed into place once encoding succeeded.

pub mod config;
pub mod cover;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod process;

#[cfg(test)]
pub(crate) mod test_helpers;
