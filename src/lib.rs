// Copyright 2025 ModerRAS
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Virtual Chinrest
//!
//! Screen calibration for browser- and desktop-based experiments.
//!
//! A participant holds a reference object of known size (a credit card by
//! default) against the screen and resizes a box until it matches. From the
//! final box size this crate computes how many pixels make up a centimetre,
//! an inch or a degree of visual angle. An optional blind spot task
//! estimates the viewing distance, which scales the experiment canvas.
//!
//! Rendering and input handling belong to the host application: it feeds
//! input events in and carries out the [`DisplayCommand`]s issued back.
//!
//! ## Resize Calibration
//!
//! ```rust
//! use virtual_chinrest::{CalibrationConfig, CalibrationController, Unit};
//!
//! let mut controller = CalibrationController::new();
//! let config = CalibrationConfig::default()
//!     .with_unit(Unit::Cm)
//!     .with_reference(85.60, 53.98)
//!     .with_initial_size(250.0);
//!
//! let mut session = controller.start(&config)?;
//! controller.on_resize_delta(&mut session, 50.0);
//! let result = controller.finalize(&mut session)?;
//!
//! println!("{:.2} px/cm", result.pixels_per_unit);
//! # Ok::<(), virtual_chinrest::CalibrationError>(())
//! ```
//!
//! ## Full Procedure With Host Variables
//!
//! ```rust
//! use std::time::Duration;
//! use virtual_chinrest::store::{seed_defaults, MemoryStore};
//! use virtual_chinrest::{ChinrestProcedure, NullDisplay, ProcedureConfig, ProcedurePhase, SPACE};
//!
//! let mut vars = MemoryStore::new();
//! seed_defaults(&mut vars);
//!
//! let config = ProcedureConfig::from_store(&vars)?.with_perceived_distance(true);
//! let mut procedure = ChinrestProcedure::start(config, NullDisplay)?;
//! procedure.resize_by(50.0);
//! procedure.finish_resizing()?;
//!
//! while procedure.phase() == ProcedurePhase::Blindspot {
//!     procedure.key_down(SPACE, Duration::from_millis(500))?;
//!     procedure.key_up(SPACE);
//!     for _ in 0..60 {
//!         procedure.animation_frame();
//!     }
//!     procedure.key_down(SPACE, Duration::from_millis(500))?;
//!     procedure.key_up(SPACE);
//! }
//!
//! procedure.publish(&mut vars)?;
//! # Ok::<(), virtual_chinrest::CalibrationError>(())
//! ```

pub mod blindspot;
pub mod calibration;
pub mod config;
pub mod display;
pub mod procedure;
pub mod settings;
pub mod store;

pub use blindspot::{BlindspotConfig, BlindspotMeasurement, BlindspotTask, SPACE};
pub use calibration::{
    BoxSize, CalibrationConfig, CalibrationController, CalibrationError, CalibrationResult,
    CalibrationSession, SessionState, Unit,
};
pub use display::{CommandLog, DisplayCommand, DisplaySurface, NullDisplay};
pub use procedure::{ChinrestProcedure, ChinrestReport, ProcedureConfig, ProcedurePhase};
pub use settings::AppSettings;
pub use store::{JsonFileStore, MemoryStore, VarValue, VariableStore};
