//! End-to-end calibration procedure driven by host input events.

mod chinrest;

pub use chinrest::{ChinrestProcedure, ChinrestReport, ProcedureConfig, ProcedurePhase};
