//! Screen calibration by resizing a box to a known reference object.

mod calibrator;
mod session;
mod unit;

pub use calibrator::{
    CalibrationConfig, CalibrationController, CalibrationError, CalibrationResult,
    DEFAULT_INITIAL_SIZE_PX, DEFAULT_PIXELS_PER_UNIT, MIN_BOX_SIZE_PX,
};
pub use session::{BoxSize, CalibrationSession, SessionState};
pub use unit::{
    dpi_from_px_per_mm, pixels_per_degree, ParseUnitError, Unit, DEFAULT_VIEWING_DISTANCE_MM,
    MM_PER_CM, MM_PER_INCH,
};
