//! Interactive resize session state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::calibrator::CalibrationResult;
use super::unit::{dpi_from_px_per_mm, Unit};

/// On-screen box size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSize {
    pub width: f64,
    pub height: f64,
}

impl BoxSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    /// Size rounded to whole pixels, as a host would lay it out.
    pub fn rounded(&self) -> (u32, u32) {
        (self.width.round() as u32, self.height.round() as u32)
    }
}

/// Lifecycle of a calibration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// Box drawn, no resize input yet.
    #[default]
    Created,
    /// At least one resize event applied.
    Resizing,
    /// Result computed; terminal.
    Finalized,
}

/// Pointer press that a drag is measured against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DragGesture {
    pub(crate) origin_x: f64,
    pub(crate) press_width: f64,
}

/// One participant's resize task.
///
/// Created by [`CalibrationController::start`](super::CalibrationController::start)
/// and mutated only through the controller.
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    pub(crate) id: Uuid,
    pub(crate) unit: Unit,
    pub(crate) reference_width_mm: f64,
    pub(crate) reference_height_mm: f64,
    pub(crate) viewing_distance_mm: f64,
    pub(crate) min_size_px: f64,
    pub(crate) initial_box_size_px: BoxSize,
    pub(crate) current_box_size_px: BoxSize,
    pub(crate) state: SessionState,
    pub(crate) resize_events: u32,
    pub(crate) drag: Option<DragGesture>,
    pub(crate) result: Option<CalibrationResult>,
}

impl CalibrationSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn reference_width_mm(&self) -> f64 {
        self.reference_width_mm
    }

    pub fn reference_height_mm(&self) -> f64 {
        self.reference_height_mm
    }

    pub fn viewing_distance_mm(&self) -> f64 {
        self.viewing_distance_mm
    }

    pub fn initial_box_size_px(&self) -> BoxSize {
        self.initial_box_size_px
    }

    pub fn current_box_size_px(&self) -> BoxSize {
        self.current_box_size_px
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of resize events applied so far.
    pub fn resize_events(&self) -> u32 {
        self.resize_events
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Cached result, present once the session is finalized.
    pub fn result(&self) -> Option<&CalibrationResult> {
        self.result.as_ref()
    }

    /// Aspect ratio of the reference object (width / height).
    pub fn aspect_ratio(&self) -> f64 {
        self.reference_width_mm / self.reference_height_mm
    }

    /// Smallest width that keeps both sides at or above the clamp floor.
    pub fn min_width_px(&self) -> f64 {
        self.min_size_px.max(self.min_size_px * self.aspect_ratio())
    }

    /// Pixels per millimetre along the primary (width) axis.
    pub fn px_per_mm(&self) -> f64 {
        self.current_box_size_px.width / self.reference_width_mm
    }

    /// Running DPI estimate shown while the participant is still resizing.
    ///
    /// Averages the width- and height-based estimates.
    pub fn live_dpi(&self) -> f64 {
        let by_width = dpi_from_px_per_mm(self.current_box_size_px.width / self.reference_width_mm);
        let by_height =
            dpi_from_px_per_mm(self.current_box_size_px.height / self.reference_height_mm);
        (by_width + by_height) / 2.0
    }

    /// Box size for a given width, honouring aspect ratio and floor.
    pub(crate) fn box_for_width(&self, width: f64) -> BoxSize {
        let width = width.max(self.min_width_px());
        BoxSize::new(width, width / self.aspect_ratio())
    }

    /// Apply a new width as one resize event.
    pub(crate) fn apply_width(&mut self, width: f64) -> BoxSize {
        self.current_box_size_px = self.box_for_width(width);
        self.resize_events += 1;
        self.state = SessionState::Resizing;
        self.current_box_size_px
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn session(width_mm: f64, height_mm: f64) -> CalibrationSession {
        let aspect = width_mm / height_mm;
        let initial = BoxSize::new(250.0, 250.0 / aspect);
        CalibrationSession {
            id: Uuid::new_v4(),
            unit: Unit::Cm,
            reference_width_mm: width_mm,
            reference_height_mm: height_mm,
            viewing_distance_mm: 570.0,
            min_size_px: 1.0,
            initial_box_size_px: initial,
            current_box_size_px: initial,
            state: SessionState::Created,
            resize_events: 0,
            drag: None,
            result: None,
        }
    }

    #[test]
    fn test_box_size_rounded() {
        assert_eq!(BoxSize::new(249.6, 157.4).rounded(), (250, 157));
    }

    #[test]
    fn test_min_width_respects_height_floor() {
        let wide = session(100.0, 10.0);
        assert_relative_eq!(wide.min_width_px(), 10.0);
        let tall = session(10.0, 100.0);
        assert_relative_eq!(tall.min_width_px(), 1.0);
    }

    #[test]
    fn test_apply_width_marks_resizing() {
        let mut s = session(85.6, 53.98);
        let size = s.apply_width(300.0);
        assert_eq!(s.state(), SessionState::Resizing);
        assert_eq!(s.resize_events(), 1);
        assert_relative_eq!(size.aspect_ratio(), 85.6 / 53.98, epsilon = 1e-12);
    }

    #[test]
    fn test_live_dpi_matches_width_dpi_when_aspect_kept() {
        let mut s = session(85.6, 53.98);
        s.apply_width(85.6 * 4.0);
        assert_relative_eq!(s.live_dpi(), 4.0 * 25.4, epsilon = 1e-9);
    }
}
