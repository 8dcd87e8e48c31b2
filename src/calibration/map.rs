//! Frequency-to-height calibration map
//!
//! One map exists per sensor drive current. It is fitted from calibration
//! sweep points, verified to be strictly monotonic so its inverse is well
//! defined, and persisted through the versioned codec in
//! [`super::codec`].

use log::debug;

use crate::constants::{
    BISECTION_MAX_ITERATIONS, BISECTION_TOLERANCE, CALIBRATION_FIT_DEGREE, CALIBRATION_VERSION,
    MONOTONIC_CHECK_SAMPLES, MONOTONIC_EPSILON,
};
use crate::error::{DomainKind, EddyError, Result};

use super::polyfit::{polyfit, polyval};

/// Fitted mapping between raw sensor frequency and physical height at one
/// drive current.
///
/// The polynomial lives in a normalized variable over the calibration
/// frequency span; the raw span is megahertz wide and would make a
/// power-basis fit hopelessly ill-conditioned.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationMap {
    pub(crate) drive_current: u8,
    pub(crate) version: u32,
    /// Power-basis coefficients in the normalized frequency variable.
    pub(crate) coeffs: Vec<f64>,
    pub(crate) freq_min: f64,
    pub(crate) freq_max: f64,
    pub(crate) height_min: f64,
    pub(crate) height_max: f64,
}

impl CalibrationMap {
    /// Fit a map from `(frequency, height)` calibration points.
    ///
    /// Fails if the points are too few or degenerate, or if the fitted
    /// curve is not strictly monotonic across the frequency span. A
    /// non-monotonic curve has no usable inverse and must be refused
    /// here, not discovered during probing.
    pub fn fit(drive_current: u8, points: &[(f64, f64)]) -> Result<Self> {
        Self::fit_with_degree(drive_current, points, CALIBRATION_FIT_DEGREE)
    }

    pub fn fit_with_degree(drive_current: u8, points: &[(f64, f64)], degree: usize) -> Result<Self> {
        if points.len() < degree + 2 {
            return Err(EddyError::Fit(format!(
                "need at least {} calibration points for a degree-{} map, have {}",
                degree + 2,
                degree,
                points.len()
            )));
        }

        let freq_min = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let freq_max = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        if !(freq_max - freq_min).is_finite() || freq_max <= freq_min {
            return Err(EddyError::Fit(
                "calibration points span no frequency range".to_string(),
            ));
        }

        let xs: Vec<f64> = points
            .iter()
            .map(|p| normalize(p.0, freq_min, freq_max))
            .collect();
        let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
        let coeffs = polyfit(&xs, &ys, degree)?;

        let max_residual = xs
            .iter()
            .zip(&ys)
            .map(|(&x, &y)| (polyval(&coeffs, x) - y).abs())
            .fold(0.0, f64::max);
        debug!(
            "calibration fit dc={} degree={} points={} max_residual={:.6}",
            drive_current,
            degree,
            points.len(),
            max_residual
        );

        let map = Self {
            drive_current,
            version: CALIBRATION_VERSION,
            coeffs,
            freq_min,
            freq_max,
            height_min: 0.0,
            height_max: 0.0,
        };
        map.with_verified_height_range()
    }

    /// Dense monotonicity sweep; derives the valid height range from the
    /// curve endpoints once the sweep passes.
    fn with_verified_height_range(mut self) -> Result<Self> {
        let n = MONOTONIC_CHECK_SAMPLES;
        let mut prev = self.eval(self.freq_min);
        let first = prev;
        let mut direction = 0.0f64;
        for i in 1..n {
            let f = self.freq_min + (self.freq_max - self.freq_min) * i as f64 / (n - 1) as f64;
            let h = self.eval(f);
            let step = h - prev;
            if step.abs() <= MONOTONIC_EPSILON {
                return Err(EddyError::Fit(format!(
                    "fitted curve is flat near frequency {:.1}",
                    f
                )));
            }
            if direction == 0.0 {
                direction = step.signum();
            } else if step.signum() != direction {
                return Err(EddyError::Fit(format!(
                    "fitted curve is not monotonic near frequency {:.1}",
                    f
                )));
            }
            prev = h;
        }
        self.height_min = first.min(prev);
        self.height_max = first.max(prev);
        Ok(self)
    }

    /// Height for a raw sensor frequency.
    pub fn height_at(&self, frequency: f64) -> Result<f64> {
        if frequency < self.freq_min || frequency > self.freq_max {
            return Err(EddyError::OutOfDomain {
                kind: DomainKind::Frequency,
                value: frequency,
                low: self.freq_min,
                high: self.freq_max,
            });
        }
        Ok(self.eval(frequency))
    }

    /// Sensor frequency expected at a physical height.
    ///
    /// The polynomial is not analytically invertible, but the fit
    /// guarantees monotonicity, so bisection over the frequency span
    /// converges unconditionally.
    pub fn frequency_at(&self, height: f64) -> Result<f64> {
        if height < self.height_min || height > self.height_max {
            return Err(EddyError::OutOfDomain {
                kind: DomainKind::Height,
                value: height,
                low: self.height_min,
                high: self.height_max,
            });
        }

        let increasing = self.eval(self.freq_max) > self.eval(self.freq_min);
        let mut lo = self.freq_min;
        let mut hi = self.freq_max;
        for _ in 0..BISECTION_MAX_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            let h = self.eval(mid);
            if (h - height).abs() < f64::EPSILON || hi - lo < BISECTION_TOLERANCE {
                return Ok(mid);
            }
            if (h < height) == increasing {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Ok(0.5 * (lo + hi))
    }

    fn eval(&self, frequency: f64) -> f64 {
        polyval(
            &self.coeffs,
            normalize(frequency, self.freq_min, self.freq_max),
        )
    }

    pub fn drive_current(&self) -> u8 {
        self.drive_current
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn frequency_range(&self) -> (f64, f64) {
        (self.freq_min, self.freq_max)
    }

    pub fn height_range(&self) -> (f64, f64) {
        (self.height_min, self.height_max)
    }
}

fn normalize(frequency: f64, freq_min: f64, freq_max: f64) -> f64 {
    2.0 * (frequency - freq_min) / (freq_max - freq_min) - 1.0
}
