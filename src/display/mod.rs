//! Display surface the host renders calibration commands on.

mod canvas;
mod surface;

pub use canvas::{fit_canvas, CanvasFit, CanvasFitRequest};
pub use surface::{CommandLog, DisplayCommand, DisplaySurface, NullDisplay};
