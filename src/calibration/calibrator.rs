//! Resize calibration: configuration, controller and result.
//!
//! The participant holds a reference object of known size (a credit card by
//! default) against the screen and resizes a box until it matches. The box
//! width in pixels over the reference width in millimetres gives the pixel
//! density, which is then expressed in the session's [`Unit`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::session::{BoxSize, CalibrationSession, DragGesture, SessionState};
use super::unit::{dpi_from_px_per_mm, Unit, DEFAULT_VIEWING_DISTANCE_MM};
use crate::config::{get_messages, CREDIT_CARD_HEIGHT_MM, CREDIT_CARD_WIDTH_MM};
use crate::display::{DisplayCommand, DisplaySurface, NullDisplay};
use crate::store::{self, keys, StoreError, VarValue, VariableStore};

/// Default size of the longer box side in pixels.
pub const DEFAULT_INITIAL_SIZE_PX: f64 = 250.0;

/// Default pixels-per-unit the host uses before any calibration.
pub const DEFAULT_PIXELS_PER_UNIT: f64 = 100.0;

/// Default clamp floor for either box side.
pub const MIN_BOX_SIZE_PX: f64 = 1.0;

/// Calibration errors.
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Invalid calibration config: {0}")]
    InvalidConfig(String),
    #[error("Session has not been resized yet")]
    SessionNotResized,
    #[error("Blind spot task error: {0}")]
    Blindspot(String),
    #[error("Variable store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration for a resize calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationConfig {
    /// Unit the result is expressed in
    pub unit: Unit,
    /// Physical width of the reference object
    pub reference_width_mm: f64,
    /// Physical height of the reference object
    pub reference_height_mm: f64,
    /// Initial length of the longer box side
    pub initial_size_px: f64,
    /// Viewing distance for `deg` when nothing was measured
    pub viewing_distance_mm: f64,
    /// Clamp floor for both box sides
    pub min_size_px: f64,
    /// Pixels-per-unit the host falls back to without a calibration
    pub default_pixels_per_unit: f64,
    /// Language for participant instructions ("cn" or "en")
    pub lang: String,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            unit: Unit::Cm,
            reference_width_mm: CREDIT_CARD_WIDTH_MM,
            reference_height_mm: CREDIT_CARD_HEIGHT_MM,
            initial_size_px: DEFAULT_INITIAL_SIZE_PX,
            viewing_distance_mm: DEFAULT_VIEWING_DISTANCE_MM,
            min_size_px: MIN_BOX_SIZE_PX,
            default_pixels_per_unit: DEFAULT_PIXELS_PER_UNIT,
            lang: "en".to_string(),
        }
    }
}

impl CalibrationConfig {
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_reference(mut self, width_mm: f64, height_mm: f64) -> Self {
        self.reference_width_mm = width_mm;
        self.reference_height_mm = height_mm;
        self
    }

    pub fn with_initial_size(mut self, size_px: f64) -> Self {
        self.initial_size_px = size_px;
        self
    }

    pub fn with_viewing_distance(mut self, distance_mm: f64) -> Self {
        self.viewing_distance_mm = distance_mm;
        self
    }

    pub fn with_min_size(mut self, size_px: f64) -> Self {
        self.min_size_px = size_px;
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Check that every dimension is positive and finite.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        let checks = [
            ("reference width", self.reference_width_mm),
            ("reference height", self.reference_height_mm),
            ("initial size", self.initial_size_px),
            ("viewing distance", self.viewing_distance_mm),
            ("minimum size", self.min_size_px),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(CalibrationError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Aspect ratio of the reference object (width / height).
    pub fn aspect_ratio(&self) -> f64 {
        self.reference_width_mm / self.reference_height_mm
    }

    /// Read the configuration from the host variable store.
    ///
    /// Missing keys fall back to the defaults; present keys with unusable
    /// values are rejected.
    pub fn from_store<S: VariableStore + ?Sized>(store: &S) -> Result<Self, CalibrationError> {
        let defaults = Self::default();

        let allowed = match store.get(keys::ALLOWED_RESIZE_UNITS) {
            Some(value) => parse_allowed_units(&value)?,
            None => Unit::ALL.to_vec(),
        };

        let unit = match store::read_text(store, keys::RESIZE_UNIT)? {
            Some(name) => name
                .parse::<Unit>()
                .map_err(|e| CalibrationError::InvalidConfig(e.to_string()))?,
            None => defaults.unit,
        };
        if !allowed.contains(&unit) {
            return Err(CalibrationError::InvalidConfig(format!(
                "unit '{}' is not in {}",
                unit,
                keys::ALLOWED_RESIZE_UNITS
            )));
        }

        let config = Self {
            unit,
            reference_width_mm: store::read_number(store, keys::ITEM_WIDTH)?
                .unwrap_or(defaults.reference_width_mm),
            reference_height_mm: store::read_number(store, keys::ITEM_HEIGHT)?
                .unwrap_or(defaults.reference_height_mm),
            initial_size_px: store::read_number(store, keys::ITEM_INIT)?
                .unwrap_or(defaults.initial_size_px),
            default_pixels_per_unit: store::read_number(store, keys::PIXELS_PER_UNIT)?
                .unwrap_or(defaults.default_pixels_per_unit),
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_allowed_units(value: &VarValue) -> Result<Vec<Unit>, CalibrationError> {
    let names: Vec<String> = match value {
        VarValue::List(items) => items.clone(),
        VarValue::Text(text) => text.split(',').map(|s| s.to_string()).collect(),
        VarValue::Number(_) => {
            return Err(CalibrationError::InvalidConfig(format!(
                "{} must be a list of unit names",
                keys::ALLOWED_RESIZE_UNITS
            )))
        }
    };
    names
        .iter()
        .filter(|name| !name.trim().is_empty())
        .map(|name| {
            name.parse::<Unit>()
                .map_err(|e| CalibrationError::InvalidConfig(e.to_string()))
        })
        .collect()
}

/// Outcome of a finalized session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Session that produced this result
    pub session_id: Uuid,
    /// Unit of `pixels_per_unit`
    pub unit: Unit,
    /// Pixels per one unit; 1.0 for [`Unit::None`]
    pub pixels_per_unit: f64,
    /// Measured pixel density along the width axis
    pub px_per_mm: f64,
    /// Measured dots per inch
    pub dpi: f64,
    /// Box size the participant confirmed
    pub box_size_px: BoxSize,
    /// Viewing distance used for `deg`
    pub viewing_distance_mm: f64,
    /// Completion timestamp (RFC 3339)
    pub completed_at: String,
}

impl CalibrationResult {
    fn from_session(session: &CalibrationSession) -> Self {
        let px_per_mm = session.px_per_mm();
        Self {
            session_id: session.id,
            unit: session.unit,
            pixels_per_unit: session
                .unit
                .pixels_per_unit(px_per_mm, session.viewing_distance_mm),
            px_per_mm,
            dpi: dpi_from_px_per_mm(px_per_mm),
            box_size_px: session.current_box_size_px,
            viewing_distance_mm: session.viewing_distance_mm,
            completed_at: Utc::now().to_rfc3339(),
        }
    }

    /// Copy of this result for a different viewing distance.
    ///
    /// Only `deg` results change their ratio.
    pub fn with_viewing_distance(&self, distance_mm: f64) -> Self {
        Self {
            pixels_per_unit: self.unit.pixels_per_unit(self.px_per_mm, distance_mm),
            viewing_distance_mm: distance_mm,
            ..self.clone()
        }
    }

    /// Convert a size in the result's unit to pixels.
    pub fn to_pixels(&self, amount: f64) -> f64 {
        amount * self.pixels_per_unit
    }

    /// Convert a size in pixels to the result's unit.
    pub fn from_pixels(&self, pixels: f64) -> f64 {
        pixels / self.pixels_per_unit
    }

    /// Publish the ratio and its unit to the host variable store.
    pub fn write_to<S: VariableStore + ?Sized>(&self, store: &mut S) {
        store.set(keys::PIXELS_PER_UNIT, VarValue::Number(self.pixels_per_unit));
        store.set(keys::RESIZE_UNIT, VarValue::from(self.unit));
    }
}

/// Drives the resize interaction and computes the final ratio.
///
/// Every change to the box is mirrored to the display surface as a
/// [`DisplayCommand`].
///
/// # Example
/// ```rust
/// use virtual_chinrest::{CalibrationConfig, CalibrationController, Unit};
///
/// let mut controller = CalibrationController::new();
/// let config = CalibrationConfig::default().with_unit(Unit::Cm);
/// let mut session = controller.start(&config).unwrap();
/// controller.on_resize_delta(&mut session, 50.0);
/// let result = controller.finalize(&mut session).unwrap();
/// assert!((result.pixels_per_unit - 300.0 / 8.56).abs() < 1e-9);
/// ```
#[derive(Debug)]
pub struct CalibrationController<D: DisplaySurface = NullDisplay> {
    display: D,
}

impl Default for CalibrationController<NullDisplay> {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationController<NullDisplay> {
    /// Create a controller that discards display commands.
    pub fn new() -> Self {
        Self {
            display: NullDisplay,
        }
    }
}

impl<D: DisplaySurface> CalibrationController<D> {
    /// Create a controller drawing to the given surface.
    pub fn with_display(display: D) -> Self {
        Self { display }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn into_display(self) -> D {
        self.display
    }

    /// Start a session and draw the initial box.
    ///
    /// The longer side of the box equals `initial_size_px`; the other side
    /// follows the reference aspect ratio.
    pub fn start(&mut self, config: &CalibrationConfig) -> Result<CalibrationSession, CalibrationError> {
        config.validate()?;

        let aspect = config.aspect_ratio();
        let mut session = CalibrationSession {
            id: Uuid::new_v4(),
            unit: config.unit,
            reference_width_mm: config.reference_width_mm,
            reference_height_mm: config.reference_height_mm,
            viewing_distance_mm: config.viewing_distance_mm,
            min_size_px: config.min_size_px,
            initial_box_size_px: BoxSize::new(0.0, 0.0),
            current_box_size_px: BoxSize::new(0.0, 0.0),
            state: SessionState::Created,
            resize_events: 0,
            drag: None,
            result: None,
        };

        // aspect < 1 means the box is taller than wide
        let initial_width = if aspect < 1.0 {
            config.initial_size_px * aspect
        } else {
            config.initial_size_px
        };
        let initial = session.box_for_width(initial_width);
        session.initial_box_size_px = initial;
        session.current_box_size_px = initial;

        tracing::info!(
            "Calibration session {} started: unit={}, reference={}x{}mm, box={:.1}x{:.1}px, default pixels_per_unit={}",
            session.id,
            config.unit,
            config.reference_width_mm,
            config.reference_height_mm,
            initial.width,
            initial.height,
            config.default_pixels_per_unit
        );

        let messages = get_messages(&config.lang);
        self.display.apply(DisplayCommand::ShowInstructions(
            messages.resize_instructions.to_string(),
        ));
        self.display.apply(DisplayCommand::DrawBox(initial));

        Ok(session)
    }

    /// Apply an incremental horizontal resize.
    ///
    /// Height follows the aspect ratio and neither side drops below the
    /// clamp floor. Ignored on finalized sessions and for non-finite deltas.
    pub fn on_resize_delta(&mut self, session: &mut CalibrationSession, delta_px: f64) {
        if !self.accepts_input(session) {
            return;
        }
        if !delta_px.is_finite() {
            tracing::warn!("Ignoring non-finite resize delta: {}", delta_px);
            return;
        }

        let width = session.current_box_size_px.width + delta_px;
        if !width.is_finite() {
            tracing::warn!("Ignoring resize delta {} that overflows the box width", delta_px);
            return;
        }
        let size = session.apply_width(width);
        tracing::debug!(
            "Resize delta {:+.1}px -> {:.1}x{:.1}px",
            delta_px,
            size.width,
            size.height
        );
        self.display.apply(DisplayCommand::ResizeBox(size));
    }

    /// Pointer pressed on the drag handle at `pointer_x`.
    pub fn begin_drag(&mut self, session: &mut CalibrationSession, pointer_x: f64) {
        if !self.accepts_input(session) || !pointer_x.is_finite() {
            return;
        }
        session.drag = Some(DragGesture {
            origin_x: pointer_x,
            press_width: session.current_box_size_px.width,
        });
    }

    /// Pointer moved to `pointer_x` while pressed.
    ///
    /// The width is measured from the press position, so repeated moves do
    /// not accumulate error. Moves without a press are ignored.
    pub fn drag_to(&mut self, session: &mut CalibrationSession, pointer_x: f64) {
        if !self.accepts_input(session) || !pointer_x.is_finite() {
            return;
        }
        let Some(drag) = session.drag else {
            return;
        };

        let width = drag.press_width + (pointer_x - drag.origin_x);
        if !width.is_finite() {
            tracing::warn!("Ignoring drag to {} that overflows the box width", pointer_x);
            return;
        }
        let size = session.apply_width(width);
        self.display.apply(DisplayCommand::ResizeBox(size));
    }

    /// Pointer released.
    pub fn end_drag(&mut self, session: &mut CalibrationSession) {
        session.drag = None;
    }

    /// Compute the result and close the session.
    ///
    /// Calling this again on a finalized session returns the cached result.
    pub fn finalize(&mut self, session: &mut CalibrationSession) -> Result<CalibrationResult, CalibrationError> {
        if let Some(result) = &session.result {
            return Ok(result.clone());
        }
        if session.unit.converts() && session.resize_events == 0 {
            return Err(CalibrationError::SessionNotResized);
        }

        session.drag = None;
        let result = CalibrationResult::from_session(session);
        session.state = SessionState::Finalized;
        session.result = Some(result.clone());

        tracing::info!(
            "Calibration session {} finalized: {:.4} px/{}, {:.2} dpi after {} resize events",
            session.id,
            result.pixels_per_unit,
            result.unit,
            result.dpi,
            session.resize_events
        );

        Ok(result)
    }

    fn accepts_input(&self, session: &CalibrationSession) -> bool {
        if session.state == SessionState::Finalized {
            tracing::warn!("Ignoring resize input on finalized session {}", session.id);
            return false;
        }
        true
    }
}
