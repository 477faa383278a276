//! Target units for the pixels-per-unit conversion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Millimetres per centimetre.
pub const MM_PER_CM: f64 = 10.0;

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Viewing distance assumed for visual-angle conversion when none was measured.
/// At 57 cm one centimetre on screen subtends roughly one degree.
pub const DEFAULT_VIEWING_DISTANCE_MM: f64 = 570.0;

/// Unit that calibrated sizes are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// No conversion, raw pixels are used downstream.
    None,
    /// Centimetres
    #[default]
    Cm,
    /// Inches
    Inch,
    /// Degrees of visual angle
    Deg,
}

/// Error returned when a unit name is not recognised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown unit: {0}")]
pub struct ParseUnitError(pub String);

impl Unit {
    /// All units, in the order the host offers them.
    pub const ALL: [Unit; 4] = [Unit::None, Unit::Cm, Unit::Inch, Unit::Deg];

    /// Canonical lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::None => "none",
            Unit::Cm => "cm",
            Unit::Inch => "inch",
            Unit::Deg => "deg",
        }
    }

    /// Whether a calibration in this unit converts pixels at all.
    pub fn converts(&self) -> bool {
        !matches!(self, Unit::None)
    }

    /// Pixels per one unit, given the measured pixel density.
    ///
    /// `viewing_distance_mm` only matters for [`Unit::Deg`].
    pub fn pixels_per_unit(&self, px_per_mm: f64, viewing_distance_mm: f64) -> f64 {
        match self {
            Unit::None => 1.0,
            Unit::Cm => px_per_mm * MM_PER_CM,
            Unit::Inch => px_per_mm * MM_PER_INCH,
            Unit::Deg => pixels_per_degree(px_per_mm, viewing_distance_mm),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "px" => Ok(Unit::None),
            "cm" => Ok(Unit::Cm),
            "inch" | "in" => Ok(Unit::Inch),
            "deg" | "degree" | "degrees" => Ok(Unit::Deg),
            _ => Err(ParseUnitError(s.to_string())),
        }
    }
}

/// Pixels spanning one degree of visual angle, centred on the line of sight.
pub fn pixels_per_degree(px_per_mm: f64, viewing_distance_mm: f64) -> f64 {
    px_per_mm * 2.0 * viewing_distance_mm * 0.5_f64.to_radians().tan()
}

/// Dots per inch for a pixel density given in pixels per millimetre.
pub fn dpi_from_px_per_mm(px_per_mm: f64) -> f64 {
    px_per_mm * MM_PER_INCH
}
