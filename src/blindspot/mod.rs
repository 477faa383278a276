//! Blind spot task for estimating the participant's viewing distance.

mod keys;
mod task;

pub use keys::{KeyResponse, KeyboardState, ResponseListener, SPACE};
pub use task::{BlindspotConfig, BlindspotMeasurement, BlindspotPhase, BlindspotTask};
