//! Full virtual chinrest procedure: resize, optional blind spot, canvas fit.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::blindspot::{
    BlindspotConfig, BlindspotMeasurement, BlindspotPhase, BlindspotTask, KeyboardState,
    ResponseListener, SPACE,
};
use crate::calibration::{
    CalibrationConfig, CalibrationController, CalibrationError, CalibrationResult,
    CalibrationSession, Unit,
};
use crate::config::get_messages;
use crate::display::{fit_canvas, CanvasFit, CanvasFitRequest, DisplayCommand, DisplaySurface, NullDisplay};
use crate::store::{self, keys, VarValue, VariableStore};

/// Configuration for the full procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureConfig {
    /// Resize calibration settings
    pub calibration: CalibrationConfig,
    /// Run the blind spot task after resizing
    pub use_perceived_distance: bool,
    /// Blind spot task settings
    pub blindspot: BlindspotConfig,
    /// Page x of the blind spot container
    pub blindspot_container_left: f64,
    /// Width of the blind spot container
    pub blindspot_container_width: f64,
    /// Intrinsic experiment canvas width
    pub canvas_width_px: f64,
    /// Intrinsic experiment canvas height
    pub canvas_height_px: f64,
    /// Physical width the canvas should span without a distance measurement
    pub canvas_width_mm: f64,
    /// Viewing distance the experiment was designed for
    pub development_distance_mm: f64,
    /// Usable screen width
    pub available_width_px: f64,
    /// Usable screen height
    pub available_height_px: f64,
}

impl Default for ProcedureConfig {
    fn default() -> Self {
        Self {
            calibration: CalibrationConfig::default(),
            use_perceived_distance: false,
            blindspot: BlindspotConfig::default(),
            blindspot_container_left: 0.0,
            blindspot_container_width: 900.0,
            canvas_width_px: 1024.0,
            canvas_height_px: 768.0,
            canvas_width_mm: 300.0,
            development_distance_mm: 500.0,
            available_width_px: 1920.0,
            available_height_px: 1080.0,
        }
    }
}

impl ProcedureConfig {
    pub fn with_calibration(mut self, calibration: CalibrationConfig) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn with_perceived_distance(mut self, enabled: bool) -> Self {
        self.use_perceived_distance = enabled;
        self
    }

    pub fn with_blindspot(mut self, blindspot: BlindspotConfig) -> Self {
        self.blindspot = blindspot;
        self
    }

    pub fn with_canvas(mut self, width_px: f64, height_px: f64, width_mm: f64) -> Self {
        self.canvas_width_px = width_px;
        self.canvas_height_px = height_px;
        self.canvas_width_mm = width_mm;
        self
    }

    pub fn with_development_distance(mut self, distance_mm: f64) -> Self {
        self.development_distance_mm = distance_mm;
        self
    }

    pub fn with_available_screen(mut self, width_px: f64, height_px: f64) -> Self {
        self.available_width_px = width_px;
        self.available_height_px = height_px;
        self
    }

    /// Check everything the procedure needs after the box is confirmed.
    ///
    /// [`ChinrestProcedure::start`] calls this before opening the session.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        self.calibration.validate()?;

        let mut positive = vec![
            ("canvas width", self.canvas_width_px),
            ("canvas height", self.canvas_height_px),
            ("canvas physical width", self.canvas_width_mm),
            ("available width", self.available_width_px),
            ("available height", self.available_height_px),
        ];
        if self.use_perceived_distance {
            positive.push(("development distance", self.development_distance_mm));
            positive.push(("blind spot container width", self.blindspot_container_width));
        }
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CalibrationError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if self.use_perceived_distance {
            self.blindspot.validate()?;
            if !self.blindspot_container_left.is_finite() {
                return Err(CalibrationError::InvalidConfig(format!(
                    "blind spot container left must be finite, got {}",
                    self.blindspot_container_left
                )));
            }
            if self.blindspot_container_width <= self.blindspot.marker_size_px {
                return Err(CalibrationError::InvalidConfig(format!(
                    "blind spot container of {}px cannot hold {}px markers",
                    self.blindspot_container_width, self.blindspot.marker_size_px
                )));
            }
        }
        Ok(())
    }

    /// Read calibration settings and the canvas size from the host store.
    pub fn from_store<S: VariableStore + ?Sized>(vars: &S) -> Result<Self, CalibrationError> {
        let defaults = Self::default();
        Ok(Self {
            calibration: CalibrationConfig::from_store(vars)?,
            canvas_width_px: store::read_number(vars, keys::WIDTH)?
                .unwrap_or(defaults.canvas_width_px),
            canvas_height_px: store::read_number(vars, keys::HEIGHT)?
                .unwrap_or(defaults.canvas_height_px),
            ..defaults
        })
    }
}

/// Phase of the procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcedurePhase {
    Resizing,
    Blindspot,
    Complete,
}

/// Everything the procedure measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChinrestReport {
    pub result: CalibrationResult,
    pub blindspot: Option<BlindspotMeasurement>,
    pub canvas: CanvasFit,
}

impl ChinrestReport {
    pub fn scaling_factor(&self) -> f64 {
        self.canvas.scaling_factor
    }

    pub fn squeeze(&self) -> f64 {
        self.canvas.squeeze
    }

    pub fn view_distance_mm(&self) -> Option<f64> {
        self.blindspot.as_ref().map(|m| m.view_distance_mm)
    }

    /// Publish all measured values to the host variable store.
    pub fn write_to<S: VariableStore + ?Sized>(&self, vars: &mut S) {
        self.result.write_to(vars);
        vars.set(keys::PX2MM, VarValue::Number(self.result.px_per_mm));
        vars.set(keys::CALCULATED_DPI, VarValue::Number(self.result.dpi));
        vars.set(keys::SCALING_FACTOR, VarValue::Number(self.scaling_factor()));
        vars.set(keys::SQUEEZE, VarValue::Number(self.squeeze()));
        if let Some(distance) = self.view_distance_mm() {
            vars.set(keys::VIEW_DISTANCE, VarValue::Number(distance));
        }
    }
}

/// Runs the resize task, then optionally the blind spot task, then fits the
/// canvas. Input events are fed in by the host.
#[derive(Debug)]
pub struct ChinrestProcedure<D: DisplaySurface = NullDisplay> {
    config: ProcedureConfig,
    controller: CalibrationController<D>,
    session: CalibrationSession,
    phase: ProcedurePhase,
    keyboard: KeyboardState,
    listener: Option<ResponseListener>,
    task: Option<BlindspotTask>,
    report: Option<ChinrestReport>,
}

impl<D: DisplaySurface> ChinrestProcedure<D> {
    /// Validate the configuration and start the resize task.
    pub fn start(config: ProcedureConfig, display: D) -> Result<Self, CalibrationError> {
        config.validate()?;

        let mut controller = CalibrationController::with_display(display);
        let session = controller.start(&config.calibration)?;

        Ok(Self {
            config,
            controller,
            session,
            phase: ProcedurePhase::Resizing,
            keyboard: KeyboardState::new(),
            listener: None,
            task: None,
            report: None,
        })
    }

    pub fn phase(&self) -> ProcedurePhase {
        self.phase
    }

    pub fn config(&self) -> &ProcedureConfig {
        &self.config
    }

    pub fn session(&self) -> &CalibrationSession {
        &self.session
    }

    pub fn display(&self) -> &D {
        self.controller.display()
    }

    pub fn blindspot(&self) -> Option<&BlindspotTask> {
        self.task.as_ref()
    }

    pub fn report(&self) -> Option<&ChinrestReport> {
        self.report.as_ref()
    }

    /// Incremental resize of the box.
    pub fn resize_by(&mut self, delta_px: f64) {
        if self.phase == ProcedurePhase::Resizing {
            self.controller.on_resize_delta(&mut self.session, delta_px);
        }
    }

    pub fn begin_drag(&mut self, pointer_x: f64) {
        if self.phase == ProcedurePhase::Resizing {
            self.controller.begin_drag(&mut self.session, pointer_x);
        }
    }

    pub fn drag_to(&mut self, pointer_x: f64) {
        if self.phase == ProcedurePhase::Resizing {
            self.controller.drag_to(&mut self.session, pointer_x);
        }
    }

    pub fn end_drag(&mut self) {
        self.controller.end_drag(&mut self.session);
    }

    /// The participant confirmed the box size.
    ///
    /// Fails with [`CalibrationError::SessionNotResized`] if the box was never
    /// resized; the procedure stays in the resize phase so the participant
    /// can retry.
    pub fn finish_resizing(&mut self) -> Result<ProcedurePhase, CalibrationError> {
        if self.phase != ProcedurePhase::Resizing {
            return Ok(self.phase);
        }

        let result = self.controller.finalize(&mut self.session)?;
        self.controller.display_mut().apply(DisplayCommand::HideInstructions);

        if !self.config.use_perceived_distance {
            self.complete(None)?;
            return Ok(self.phase);
        }

        let mut task = BlindspotTask::new(self.config.blindspot.clone(), result.px_per_mm)?;
        let (ball_left, square_left) = task.reset(
            self.config.blindspot_container_left,
            self.config.blindspot_container_width,
        );

        let display = self.controller.display_mut();
        display.apply(DisplayCommand::ShowInstructions(
            get_messages(&self.config.calibration.lang).blindspot_instructions(),
        ));
        display.apply(DisplayCommand::PlaceBlindspotMarkers {
            ball_left,
            square_left,
        });
        display.apply(DisplayCommand::ShowRemaining(task.reps_remaining()));

        tracing::info!(
            "Blind spot task started with {} repetitions",
            task.reps_remaining()
        );
        self.task = Some(task);
        self.listener = Some(ResponseListener::new([SPACE]));
        self.phase = ProcedurePhase::Blindspot;
        Ok(self.phase)
    }

    /// A key was pressed; `rt` is the time since the current prompt appeared.
    pub fn key_down(&mut self, key: &str, rt: Duration) -> Result<ProcedurePhase, CalibrationError> {
        let accepted = match self.listener.as_mut() {
            Some(listener) => self.keyboard.press(key, rt, listener).is_some(),
            None => {
                self.keyboard.hold(key);
                false
            }
        };
        if !accepted || self.phase != ProcedurePhase::Blindspot {
            return Ok(self.phase);
        }

        let Some(task) = self.task.as_mut() else {
            return Ok(self.phase);
        };
        let display = self.controller.display_mut();

        match task.phase() {
            BlindspotPhase::WaitingForStart => {
                task.start();
                self.listener = Some(ResponseListener::new([SPACE]));
            }
            BlindspotPhase::Moving => {
                task.record();
                display.apply(DisplayCommand::ShowRemaining(task.reps_remaining()));
                if task.phase() == BlindspotPhase::Finished {
                    let measurement = task.measurement()?;
                    self.listener = None;
                    self.keyboard.clear();
                    self.complete(Some(measurement))?;
                } else {
                    display.apply(DisplayCommand::PlaceBlindspotMarkers {
                        ball_left: task.ball_left(),
                        square_left: task.square_left(),
                    });
                    self.listener = Some(ResponseListener::new([SPACE]));
                }
            }
            BlindspotPhase::Finished => {}
        }
        Ok(self.phase)
    }

    /// A key was released.
    pub fn key_up(&mut self, key: &str) {
        self.keyboard.release(key);
    }

    /// Host animation frame; moves the blind spot ball.
    pub fn animation_frame(&mut self) {
        if self.phase != ProcedurePhase::Blindspot {
            return;
        }
        if let Some(left) = self.task.as_mut().and_then(|task| task.tick()) {
            self.controller
                .display_mut()
                .apply(DisplayCommand::MoveBall { left });
        }
    }

    /// Publish the report to the host store.
    pub fn publish<S: VariableStore + ?Sized>(&self, vars: &mut S) -> Result<(), CalibrationError> {
        let report = self.report.as_ref().ok_or_else(|| {
            CalibrationError::InvalidConfig("procedure has not completed".to_string())
        })?;
        report.write_to(vars);
        Ok(())
    }

    fn complete(&mut self, measurement: Option<BlindspotMeasurement>) -> Result<(), CalibrationError> {
        let base = self
            .session
            .result()
            .cloned()
            .ok_or(CalibrationError::SessionNotResized)?;

        let result = match &measurement {
            Some(m) if base.unit == Unit::Deg => base.with_viewing_distance(m.view_distance_mm),
            _ => base,
        };
        let scaling_factor = measurement
            .as_ref()
            .map(|m| m.scaling_factor(self.config.development_distance_mm));

        let canvas = fit_canvas(&CanvasFitRequest {
            canvas_width_px: self.config.canvas_width_px,
            canvas_height_px: self.config.canvas_height_px,
            canvas_width_mm: self.config.canvas_width_mm,
            dpi: result.dpi,
            scaling_factor,
            available_width_px: self.config.available_width_px,
            available_height_px: self.config.available_height_px,
        })?;
        self.controller.display_mut().apply(DisplayCommand::ResizeCanvas {
            width: canvas.width,
            height: canvas.height,
        });

        tracing::info!(
            "Chinrest complete: {:.4} px/{}, scaling {:.4}, squeeze {:.4}{}",
            result.pixels_per_unit,
            result.unit,
            canvas.scaling_factor,
            canvas.squeeze,
            measurement
                .as_ref()
                .map(|m| format!(", view distance {:.1}mm", m.view_distance_mm))
                .unwrap_or_default()
        );

        self.report = Some(ChinrestReport {
            result,
            blindspot: measurement,
            canvas,
        });
        self.phase = ProcedurePhase::Complete;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::CommandLog;
    use crate::store::MemoryStore;
    use approx::assert_relative_eq;

    const RT: Duration = Duration::from_millis(400);

    fn tap_space<D: DisplaySurface>(procedure: &mut ChinrestProcedure<D>) -> ProcedurePhase {
        let phase = procedure.key_down(SPACE, RT).unwrap();
        procedure.key_up(SPACE);
        phase
    }

    fn run_blindspot<D: DisplaySurface>(procedure: &mut ChinrestProcedure<D>, frames: usize) {
        while procedure.phase() == ProcedurePhase::Blindspot {
            tap_space(procedure);
            for _ in 0..frames {
                procedure.animation_frame();
            }
            tap_space(procedure);
        }
    }

    #[test]
    fn test_resize_only_procedure() {
        let config = ProcedureConfig::default();
        let mut procedure = ChinrestProcedure::start(config, CommandLog::default()).unwrap();
        assert_eq!(procedure.phase(), ProcedurePhase::Resizing);

        procedure.begin_drag(100.0);
        procedure.drag_to(150.0);
        procedure.end_drag();
        assert_eq!(procedure.finish_resizing().unwrap(), ProcedurePhase::Complete);

        let report = procedure.report().unwrap();
        assert_relative_eq!(report.result.pixels_per_unit, 300.0 / 8.56, epsilon = 1e-9);
        assert!(report.blindspot.is_none());
        assert_relative_eq!(
            report.scaling_factor(),
            1024.0 / (300.0 * report.result.dpi / 25.4).round()
        );
        assert!(matches!(
            procedure.display().last(),
            Some(DisplayCommand::ResizeCanvas { .. })
        ));
    }

    #[test]
    fn test_finish_without_resize_can_retry() {
        let mut procedure = ChinrestProcedure::start(ProcedureConfig::default(), NullDisplay).unwrap();
        assert!(matches!(
            procedure.finish_resizing(),
            Err(CalibrationError::SessionNotResized)
        ));
        assert_eq!(procedure.phase(), ProcedurePhase::Resizing);

        procedure.resize_by(20.0);
        assert_eq!(procedure.finish_resizing().unwrap(), ProcedurePhase::Complete);
    }

    #[test]
    fn test_blindspot_procedure() {
        let config = ProcedureConfig::default()
            .with_perceived_distance(true)
            .with_development_distance(500.0);
        let mut procedure = ChinrestProcedure::start(config, CommandLog::default()).unwrap();
        procedure.resize_by(50.0);
        assert_eq!(procedure.finish_resizing().unwrap(), ProcedurePhase::Blindspot);

        // keys other than space are ignored
        procedure.key_down("a", RT).unwrap();
        procedure.key_up("a");
        assert_eq!(
            procedure.blindspot().unwrap().phase(),
            BlindspotPhase::WaitingForStart
        );

        run_blindspot(&mut procedure, 50);
        assert_eq!(procedure.phase(), ProcedurePhase::Complete);

        let report = procedure.report().unwrap();
        let measurement = report.blindspot.as_ref().unwrap();
        let px_per_mm = 300.0 / 85.6;
        assert_eq!(measurement.ball_positions, vec![654.5; 5]);
        assert_relative_eq!(
            measurement.ball_square_distance_mm,
            (885.0 - 654.5) / px_per_mm,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            report.scaling_factor(),
            measurement.view_distance_mm / 500.0,
            epsilon = 1e-12
        );

        let remaining: Vec<u32> = procedure
            .display()
            .commands()
            .iter()
            .filter_map(|c| match c {
                DisplayCommand::ShowRemaining(n) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(remaining, vec![5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_held_space_does_not_double_record() {
        let config = ProcedureConfig::default().with_perceived_distance(true);
        let mut procedure = ChinrestProcedure::start(config, NullDisplay).unwrap();
        procedure.resize_by(50.0);
        procedure.finish_resizing().unwrap();

        procedure.key_down(SPACE, RT).unwrap();
        // auto-repeat without release
        procedure.key_down(SPACE, RT).unwrap();
        let task = procedure.blindspot().unwrap();
        assert_eq!(task.phase(), BlindspotPhase::Moving);
        assert_eq!(task.reps_remaining(), 5);
    }

    #[test]
    fn test_deg_uses_measured_distance() {
        let calibration = CalibrationConfig::default().with_unit(Unit::Deg);
        let config = ProcedureConfig::default()
            .with_calibration(calibration)
            .with_perceived_distance(true);
        let mut procedure = ChinrestProcedure::start(config, NullDisplay).unwrap();
        procedure.resize_by(50.0);
        procedure.finish_resizing().unwrap();
        run_blindspot(&mut procedure, 40);

        let report = procedure.report().unwrap();
        let distance = report.view_distance_mm().unwrap();
        assert_eq!(report.result.viewing_distance_mm, distance);
        assert_relative_eq!(
            report.result.pixels_per_unit,
            crate::calibration::pixels_per_degree(report.result.px_per_mm, distance),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_publish() {
        let mut vars = MemoryStore::new();
        store::seed_defaults(&mut vars);
        vars.set(keys::WIDTH, VarValue::Number(800.0));
        vars.set(keys::HEIGHT, VarValue::Number(600.0));

        let config = ProcedureConfig::from_store(&vars).unwrap().with_perceived_distance(true);
        assert_eq!(config.canvas_width_px, 800.0);

        let mut procedure = ChinrestProcedure::start(config, NullDisplay).unwrap();
        assert!(procedure.publish(&mut vars).is_err());

        procedure.resize_by(50.0);
        procedure.finish_resizing().unwrap();
        run_blindspot(&mut procedure, 50);
        procedure.publish(&mut vars).unwrap();

        let report = procedure.report().unwrap();
        let number = |key: &str| vars.get(key).and_then(|v| v.as_number());
        assert_eq!(number(keys::PIXELS_PER_UNIT), Some(report.result.pixels_per_unit));
        assert_eq!(number(keys::PX2MM), Some(report.result.px_per_mm));
        assert_eq!(number(keys::CALCULATED_DPI), Some(report.result.dpi));
        assert_eq!(number(keys::SCALING_FACTOR), Some(report.scaling_factor()));
        assert_eq!(number(keys::SQUEEZE), Some(report.squeeze()));
        assert_eq!(number(keys::VIEW_DISTANCE), report.view_distance_mm());
    }

    #[test]
    fn test_rejects_bad_development_distance() {
        let config = ProcedureConfig::default()
            .with_perceived_distance(true)
            .with_development_distance(0.0);
        assert!(ChinrestProcedure::start(config, NullDisplay).is_err());
    }

    #[test]
    fn test_bad_canvas_rejected_at_start() {
        let mut vars = MemoryStore::new();
        store::seed_defaults(&mut vars);
        vars.set(keys::WIDTH, VarValue::Number(0.0));

        let config = ProcedureConfig::from_store(&vars).unwrap();
        assert!(matches!(
            ChinrestProcedure::start(config, NullDisplay),
            Err(CalibrationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_bad_blindspot_rejected_at_start() {
        let config = ProcedureConfig::default()
            .with_perceived_distance(true)
            .with_blindspot(BlindspotConfig::default().with_repetitions(0));
        assert!(matches!(
            ChinrestProcedure::start(config, NullDisplay),
            Err(CalibrationError::InvalidConfig(_))
        ));

        // unused blind spot settings do not matter without the task
        let config = ProcedureConfig::default()
            .with_blindspot(BlindspotConfig::default().with_repetitions(0));
        let mut procedure = ChinrestProcedure::start(config, NullDisplay).unwrap();
        procedure.resize_by(10.0);
        assert_eq!(procedure.finish_resizing().unwrap(), ProcedurePhase::Complete);
    }

    #[test]
    fn test_tiny_canvas_still_completes() {
        let config = ProcedureConfig::default().with_canvas(1024.0, 768.0, 0.001);
        let mut procedure = ChinrestProcedure::start(config, NullDisplay).unwrap();
        procedure.resize_by(50.0);
        assert_eq!(procedure.finish_resizing().unwrap(), ProcedurePhase::Complete);
        assert_eq!(procedure.report().unwrap().canvas.width, 1.0);
    }
}
