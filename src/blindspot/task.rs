//! Blind spot viewing-distance estimation.
//!
//! With the right eye covered, the participant fixates a square while a ball
//! moves leftwards from its right. The ball vanishes when it crosses the
//! optic disc, which sits at a roughly constant angle from the fixation
//! point. The on-screen distance between square and ball at that moment,
//! converted to millimetres, gives the viewing distance by trigonometry.

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationError;

/// Blind spot task configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BlindspotConfig {
    /// Measurements to average
    pub repetitions: u32,
    /// Angle between fixation and the blind spot
    pub angle_deg: f64,
    /// Ball movement per animation frame (leftwards)
    pub ball_step_px: f64,
    /// Side length of ball and square
    pub marker_size_px: f64,
    /// Ball start position as a fraction of the square position
    pub ball_start_fraction: f64,
}

impl Default for BlindspotConfig {
    fn default() -> Self {
        Self {
            repetitions: 5,
            angle_deg: 13.5,
            ball_step_px: 2.0,
            marker_size_px: 30.0,
            ball_start_fraction: 0.85,
        }
    }
}

impl BlindspotConfig {
    pub fn with_repetitions(mut self, repetitions: u32) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn with_angle(mut self, angle_deg: f64) -> Self {
        self.angle_deg = angle_deg;
        self
    }

    pub fn with_ball_step(mut self, step_px: f64) -> Self {
        self.ball_step_px = step_px;
        self
    }

    /// Check the settings before any task is created.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.repetitions == 0 {
            return Err(CalibrationError::InvalidConfig(
                "blind spot task needs at least one repetition".to_string(),
            ));
        }
        if !(self.angle_deg > 0.0 && self.angle_deg < 90.0) {
            return Err(CalibrationError::InvalidConfig(format!(
                "blind spot angle must be within (0, 90) degrees, got {}",
                self.angle_deg
            )));
        }
        if !(self.ball_step_px.is_finite() && self.ball_step_px > 0.0) {
            return Err(CalibrationError::InvalidConfig(format!(
                "ball step must be positive, got {}",
                self.ball_step_px
            )));
        }
        if !(self.marker_size_px.is_finite() && self.marker_size_px > 0.0) {
            return Err(CalibrationError::InvalidConfig(format!(
                "marker size must be positive, got {}",
                self.marker_size_px
            )));
        }
        // ball must start left of the square
        if !(self.ball_start_fraction > 0.0 && self.ball_start_fraction < 1.0) {
            return Err(CalibrationError::InvalidConfig(format!(
                "ball start fraction must be within (0, 1), got {}",
                self.ball_start_fraction
            )));
        }
        Ok(())
    }
}

/// Where the task currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlindspotPhase {
    /// Markers placed, waiting for the participant to start the ball.
    WaitingForStart,
    /// Ball is moving.
    Moving,
    /// All repetitions recorded.
    Finished,
}

/// Result of a finished blind spot task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlindspotMeasurement {
    /// Ball centre at each press
    pub ball_positions: Vec<f64>,
    pub avg_ball_pos: f64,
    /// Square centre
    pub square_pos: f64,
    pub ball_square_distance_mm: f64,
    pub view_distance_mm: f64,
}

impl BlindspotMeasurement {
    /// Ratio of the measured viewing distance to the distance the
    /// experiment was designed for.
    pub fn scaling_factor(&self, development_distance_mm: f64) -> f64 {
        self.view_distance_mm / development_distance_mm
    }
}

/// State of one blind spot task.
#[derive(Debug, Clone)]
pub struct BlindspotTask {
    config: BlindspotConfig,
    px_per_mm: f64,
    container_left: f64,
    container_width: f64,
    ball_left: f64,
    square_left: f64,
    square_pos: f64,
    ball_positions: Vec<f64>,
    reps_remaining: u32,
    phase: BlindspotPhase,
}

impl BlindspotTask {
    /// Create a task for a display with the given pixel density.
    pub fn new(config: BlindspotConfig, px_per_mm: f64) -> Result<Self, CalibrationError> {
        if !px_per_mm.is_finite() || px_per_mm <= 0.0 {
            return Err(CalibrationError::InvalidConfig(format!(
                "pixel density must be positive, got {}",
                px_per_mm
            )));
        }
        config.validate()?;

        let reps_remaining = config.repetitions;
        Ok(Self {
            config,
            px_per_mm,
            container_left: 0.0,
            container_width: 0.0,
            ball_left: 0.0,
            square_left: 0.0,
            square_pos: 0.0,
            ball_positions: Vec::new(),
            reps_remaining,
            phase: BlindspotPhase::WaitingForStart,
        })
    }

    /// Place the markers inside a container and wait for a start.
    ///
    /// Returns the ball and square left edges relative to the container.
    pub fn reset(&mut self, container_left: f64, container_width: f64) -> (f64, f64) {
        self.container_left = container_left;
        self.container_width = container_width;
        self.place_markers()
    }

    fn place_markers(&mut self) -> (f64, f64) {
        self.square_left = self.container_width - self.config.marker_size_px;
        self.ball_left = self.square_left * self.config.ball_start_fraction;
        self.square_pos = round_to(self.center_of(self.square_left), 2);
        self.phase = BlindspotPhase::WaitingForStart;
        (self.ball_left, self.square_left)
    }

    /// Start the ball moving.
    pub fn start(&mut self) -> bool {
        if self.phase != BlindspotPhase::WaitingForStart {
            return false;
        }
        self.phase = BlindspotPhase::Moving;
        true
    }

    /// Advance one animation frame; returns the new ball left edge.
    pub fn tick(&mut self) -> Option<f64> {
        if self.phase != BlindspotPhase::Moving {
            return None;
        }
        self.ball_left -= self.config.ball_step_px;
        Some(self.ball_left)
    }

    /// Record the ball position where it vanished.
    ///
    /// Returns the recorded ball centre. Markers are placed again for the
    /// next repetition unless this was the last one.
    pub fn record(&mut self) -> Option<f64> {
        if self.phase != BlindspotPhase::Moving {
            return None;
        }

        let x = round_to(self.center_of(self.ball_left), 2);
        self.ball_positions.push(x);
        self.reps_remaining = self.reps_remaining.saturating_sub(1);
        tracing::debug!(
            "Blind spot at x={:.2}, {} repetitions remaining",
            x,
            self.reps_remaining
        );

        if self.reps_remaining == 0 {
            self.phase = BlindspotPhase::Finished;
        } else {
            self.place_markers();
        }
        Some(x)
    }

    pub fn phase(&self) -> BlindspotPhase {
        self.phase
    }

    pub fn reps_remaining(&self) -> u32 {
        self.reps_remaining
    }

    pub fn ball_left(&self) -> f64 {
        self.ball_left
    }

    pub fn square_left(&self) -> f64 {
        self.square_left
    }

    /// Square centre in page coordinates.
    pub fn square_pos(&self) -> f64 {
        self.square_pos
    }

    /// Ball centre in page coordinates.
    pub fn ball_center(&self) -> f64 {
        self.center_of(self.ball_left)
    }

    /// Viewing distance from all recorded repetitions.
    pub fn measurement(&self) -> Result<BlindspotMeasurement, CalibrationError> {
        if self.phase != BlindspotPhase::Finished {
            return Err(CalibrationError::Blindspot(format!(
                "{} repetitions still outstanding",
                self.reps_remaining
            )));
        }

        let sum: f64 = self.ball_positions.iter().sum();
        let avg_ball_pos = round_to(sum / self.ball_positions.len() as f64, 2);
        let ball_square_distance_mm = (self.square_pos - avg_ball_pos) / self.px_per_mm;
        let view_distance_mm = ball_square_distance_mm / self.config.angle_deg.to_radians().tan();

        Ok(BlindspotMeasurement {
            ball_positions: self.ball_positions.clone(),
            avg_ball_pos,
            square_pos: self.square_pos,
            ball_square_distance_mm,
            view_distance_mm,
        })
    }

    fn center_of(&self, left: f64) -> f64 {
        self.container_left + left + self.config.marker_size_px / 2.0
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reset_places_markers() {
        let mut task = BlindspotTask::new(BlindspotConfig::default(), 4.0).unwrap();
        let (ball, square) = task.reset(100.0, 900.0);
        assert_eq!(square, 870.0);
        assert_relative_eq!(ball, 739.5);
        assert_eq!(task.square_pos(), 985.0);
        assert_eq!(task.phase(), BlindspotPhase::WaitingForStart);
    }

    #[test]
    fn test_tick_only_while_moving() {
        let mut task = BlindspotTask::new(BlindspotConfig::default(), 4.0).unwrap();
        task.reset(0.0, 900.0);
        assert_eq!(task.tick(), None);
        assert_eq!(task.record(), None);

        assert!(task.start());
        assert!(!task.start());
        assert_relative_eq!(task.tick().unwrap(), 737.5);
    }

    #[test]
    fn test_full_measurement() {
        let mut task = BlindspotTask::new(BlindspotConfig::default(), 4.0).unwrap();
        task.reset(0.0, 900.0);

        for rep in 0..5 {
            assert_eq!(task.reps_remaining(), 5 - rep);
            task.start();
            for _ in 0..50 {
                task.tick();
            }
            assert_eq!(task.record(), Some(654.5));
        }
        assert_eq!(task.phase(), BlindspotPhase::Finished);

        let m = task.measurement().unwrap();
        assert_eq!(m.ball_positions.len(), 5);
        assert_eq!(m.avg_ball_pos, 654.5);
        assert_eq!(m.square_pos, 885.0);
        assert_relative_eq!(m.ball_square_distance_mm, 57.625);
        assert_relative_eq!(
            m.view_distance_mm,
            57.625 / 13.5_f64.to_radians().tan(),
            epsilon = 1e-9
        );
        assert!((m.view_distance_mm - 240.0).abs() < 0.1);
        assert_relative_eq!(m.scaling_factor(m.view_distance_mm / 2.0), 2.0);
    }

    #[test]
    fn test_measurement_before_finish_fails() {
        let mut task = BlindspotTask::new(BlindspotConfig::default().with_repetitions(2), 4.0).unwrap();
        task.reset(0.0, 900.0);
        task.start();
        task.record();
        assert!(matches!(
            task.measurement(),
            Err(CalibrationError::Blindspot(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_setup() {
        assert!(BlindspotTask::new(BlindspotConfig::default(), 0.0).is_err());
        assert!(BlindspotTask::new(BlindspotConfig::default().with_repetitions(0), 4.0).is_err());
        assert!(BlindspotTask::new(BlindspotConfig::default().with_angle(90.0), 4.0).is_err());
    }

    #[test]
    fn test_config_validate() {
        assert!(BlindspotConfig::default().validate().is_ok());
        assert!(BlindspotConfig::default().with_repetitions(0).validate().is_err());
        assert!(BlindspotConfig::default().with_ball_step(0.0).validate().is_err());

        let late_start = BlindspotConfig {
            ball_start_fraction: 1.2,
            ..BlindspotConfig::default()
        };
        assert!(late_start.validate().is_err());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.005_1, 2), 1.01);
        assert_eq!(round_to(-2.344, 2), -2.34);
    }
}
