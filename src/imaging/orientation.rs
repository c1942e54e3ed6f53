//! EXIF orientation to rotation mapping.
//!
//! Cameras record how they were held in the EXIF `Orientation` tag
//! (values 1–8). Only the three pure rotations are corrected:
//!
//! | Orientation | Rotation | Degrees (counter-clockwise positive) |
//! |---|---|---|
//! | 3 | [`Rotation::Half`] | 180 |
//! | 6 | [`Rotation::Clockwise90`] | -90 |
//! | 8 | [`Rotation::CounterClockwise90`] | 90 |
//!
//! Every other value, mirrored orientations included, means no rotation.

use std::fmt;

/// Rotation applied to pixels before re-encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    CounterClockwise90,
    Half,
}

impl Rotation {
    /// Map a raw EXIF orientation value to a rotation.
    pub fn from_exif_orientation(value: Option<u16>) -> Self {
        match value {
            Some(3) => Rotation::Half,
            Some(6) => Rotation::Clockwise90,
            Some(8) => Rotation::CounterClockwise90,
            _ => Rotation::None,
        }
    }

    /// Parse an angle in degrees, counter-clockwise positive.
    ///
    /// Any multiple of 90 is accepted and normalized (`270` is `-90`).
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::None),
            90 => Some(Rotation::CounterClockwise90),
            180 => Some(Rotation::Half),
            270 => Some(Rotation::Clockwise90),
            _ => None,
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => -90,
            Rotation::CounterClockwise90 => 90,
            Rotation::Half => 180,
        }
    }

    pub fn is_none(self) -> bool {
        self == Rotation::None
    }

    /// Whether the rotation exchanges width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Clockwise90 | Rotation::CounterClockwise90)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}
