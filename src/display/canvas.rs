//! Fitting the experiment canvas to the calibrated display.

use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationError, MM_PER_INCH};

/// Inputs for [`fit_canvas`].
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasFitRequest {
    /// Intrinsic canvas width (experiment `width`)
    pub canvas_width_px: f64,
    /// Intrinsic canvas height (experiment `height`)
    pub canvas_height_px: f64,
    /// Physical width the canvas should span
    pub canvas_width_mm: f64,
    /// Measured display density
    pub dpi: f64,
    /// Scaling factor from a viewing distance measurement, if any
    pub scaling_factor: Option<f64>,
    /// Usable screen width
    pub available_width_px: f64,
    /// Usable screen height
    pub available_height_px: f64,
}

/// On-screen canvas size and the factors derived with it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasFit {
    pub width: f64,
    pub height: f64,
    pub scaling_factor: f64,
    /// Requested width over available width, before clamping
    pub squeeze: f64,
    /// Whether the size was reduced to fit the screen
    pub clamped: bool,
}

/// Compute the displayed canvas size.
///
/// Without a scaling factor the canvas spans `canvas_width_mm` physically and
/// the scaling factor is derived from that. With one, both intrinsic sides are
/// scaled by it. A canvas larger than the screen is shrunk to the available
/// height, keeping its aspect ratio.
pub fn fit_canvas(request: &CanvasFitRequest) -> Result<CanvasFit, CalibrationError> {
    let positive = [
        ("canvas width", request.canvas_width_px),
        ("canvas height", request.canvas_height_px),
        ("available width", request.available_width_px),
        ("available height", request.available_height_px),
    ];
    for (name, value) in positive {
        if !value.is_finite() || value <= 0.0 {
            return Err(CalibrationError::InvalidConfig(format!(
                "{} must be positive, got {}",
                name, value
            )));
        }
    }

    let aspect = request.canvas_width_px / request.canvas_height_px;

    let (mut width, mut height, scaling_factor) = match request.scaling_factor {
        Some(factor) if factor.is_finite() && factor > 0.0 => (
            (request.canvas_width_px * factor).round(),
            (request.canvas_height_px * factor).round(),
            factor,
        ),
        Some(factor) => {
            return Err(CalibrationError::InvalidConfig(format!(
                "scaling factor must be positive, got {}",
                factor
            )))
        }
        None => {
            let size = request.canvas_width_mm * request.dpi;
            if !size.is_finite() || size <= 0.0 {
                return Err(CalibrationError::InvalidConfig(format!(
                    "canvas of {}mm at {} dpi has no width",
                    request.canvas_width_mm, request.dpi
                )));
            }
            // never round below one pixel
            let width = (size / MM_PER_INCH).round().max(1.0);
            (width, width / aspect, request.canvas_width_px / width)
        }
    };

    let squeeze = width / request.available_width_px;

    let clamped = height > request.available_height_px || width > request.available_width_px;
    if clamped {
        height = request.available_height_px;
        width = height * aspect;
    }

    tracing::debug!(
        "Canvas fit {:.0}x{:.0}px (scaling {:.4}, squeeze {:.4}, clamped {})",
        width,
        height,
        scaling_factor,
        squeeze,
        clamped
    );

    Ok(CanvasFit {
        width,
        height,
        scaling_factor,
        squeeze,
        clamped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn request(scaling_factor: Option<f64>, available: (f64, f64)) -> CanvasFitRequest {
        CanvasFitRequest {
            canvas_width_px: 1024.0,
            canvas_height_px: 768.0,
            canvas_width_mm: 300.0,
            dpi: 96.0,
            scaling_factor,
            available_width_px: available.0,
            available_height_px: available.1,
        }
    }

    #[test]
    fn test_fit_from_dpi() {
        let fit = fit_canvas(&request(None, (1920.0, 1080.0))).unwrap();
        assert_eq!(fit.width, 1134.0);
        assert_relative_eq!(fit.height, 850.5);
        assert_relative_eq!(fit.scaling_factor, 1024.0 / 1134.0);
        assert_relative_eq!(fit.squeeze, 1134.0 / 1920.0);
        assert!(!fit.clamped);
    }

    #[test]
    fn test_fit_from_dpi_clamped() {
        let fit = fit_canvas(&request(None, (1000.0, 700.0))).unwrap();
        assert!(fit.clamped);
        assert_eq!(fit.height, 700.0);
        assert_relative_eq!(fit.width, 700.0 * 4.0 / 3.0);
        // squeeze is taken before clamping
        assert_relative_eq!(fit.squeeze, 1.134);
    }

    #[test]
    fn test_fit_from_scaling_factor() {
        let fit = fit_canvas(&request(Some(1.5), (1920.0, 1080.0))).unwrap();
        assert!(fit.clamped);
        assert_eq!(fit.height, 1080.0);
        assert_relative_eq!(fit.width, 1440.0);
        assert_relative_eq!(fit.squeeze, 0.8);
        assert_eq!(fit.scaling_factor, 1.5);

        let small = fit_canvas(&request(Some(0.5), (1920.0, 1080.0))).unwrap();
        assert!(!small.clamped);
        assert_eq!((small.width, small.height), (512.0, 384.0));
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        assert!(fit_canvas(&request(Some(0.0), (1920.0, 1080.0))).is_err());
        assert!(fit_canvas(&request(None, (0.0, 1080.0))).is_err());

        let mut no_dpi = request(None, (1920.0, 1080.0));
        no_dpi.dpi = 0.0;
        assert!(fit_canvas(&no_dpi).is_err());
    }
}
