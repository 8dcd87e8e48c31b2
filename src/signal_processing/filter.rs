use crate::config::{FilterConfig, TapMode};
use crate::constants::WMA_WINDOW;
use crate::error::Result;

use super::butterworth::BandpassFilter;
use super::wma::WmaDerivative;

/// Common trait for sample filters
///
/// Implemented by the moving-average filters and BandpassFilter.
pub trait SampleFilter {
    /// Process a single sample through the filter
    fn process(&mut self, sample: f64) -> f64;

    /// Process a buffer of samples in-place
    fn process_buffer(&mut self, buffer: &mut [f64]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }
}

/// Tap detection filter selected by configuration.
///
/// The mode set is closed, so dispatch is a tagged variant rather than
/// string matching in the pipeline. Both variants produce a signal that
/// rises during the approach ramp and falls once contact flattens it,
/// which is what the detector's drop-from-peak logic needs.
pub enum TapFilter {
    Wma(WmaDerivative),
    Butter(BandpassFilter),
}

impl TapFilter {
    /// Build the filter a validated [`FilterConfig`] asks for.
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        match config.mode {
            TapMode::Wma => Ok(TapFilter::Wma(WmaDerivative::new(WMA_WINDOW))),
            TapMode::Butter => Ok(TapFilter::Butter(BandpassFilter::from_config(config)?)),
        }
    }
}

impl SampleFilter for TapFilter {
    fn process(&mut self, sample: f64) -> f64 {
        match self {
            TapFilter::Wma(f) => f.process(sample),
            TapFilter::Butter(f) => f.process(sample),
        }
    }
}
