use crate::config::FilterConfig;
use crate::error::Result;

#[cfg(feature = "filter-design")]
use crate::error::EddyError;
#[cfg(feature = "filter-design")]
use iir_filters::filter::{DirectForm2Transposed, Filter};
#[cfg(feature = "filter-design")]
use iir_filters::filter_design::{FilterType, butter};
#[cfg(feature = "filter-design")]
use iir_filters::sos::zpk2sos;

#[cfg(not(feature = "filter-design"))]
use crate::constants::DEFAULT_BUTTER_SOS;

/// Whether runtime Butterworth design is compiled in.
///
/// Without it, only the default cutoffs and order at the nominal sensor
/// rate are usable, served from precomputed coefficients.
pub fn butter_design_available() -> bool {
    cfg!(feature = "filter-design")
}

/// Butterworth band-pass filter for tap signal extraction
///
/// Suppresses both the slow frequency ramp of the approach move and
/// high-frequency sensor noise, leaving the transient caused by nozzle
/// contact. Stateful across samples within one trace; create a fresh
/// filter per tap attempt.
pub struct BandpassFilter {
    #[cfg(feature = "filter-design")]
    filter: DirectForm2Transposed,
    #[cfg(not(feature = "filter-design"))]
    filter: SosCascade,
}

impl BandpassFilter {
    /// Build the band-pass a validated [`FilterConfig`] describes.
    ///
    /// [`FilterConfig::new`] has already rejected parameter sets this
    /// build cannot satisfy, so failures here are design-routine errors
    /// only.
    #[cfg(feature = "filter-design")]
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        let zpk = butter(
            config.order,
            FilterType::BandPass(config.lowcut, config.highcut),
            config.sample_rate,
        )
        .map_err(|e| EddyError::FilterDesign(format!("{:?}", e)))?;

        let sos = zpk2sos(&zpk, None).map_err(|e| EddyError::FilterDesign(format!("{:?}", e)))?;

        Ok(Self {
            filter: DirectForm2Transposed::new(&sos),
        })
    }

    #[cfg(not(feature = "filter-design"))]
    pub fn from_config(_config: &FilterConfig) -> Result<Self> {
        // Config validation only lets default parameters through when the
        // design capability is absent.
        Ok(Self {
            filter: SosCascade::new(&DEFAULT_BUTTER_SOS),
        })
    }

    /// Filter single sample
    pub fn process(&mut self, sample: f64) -> f64 {
        self.filter.filter(sample)
    }

    /// Filter entire buffer in-place
    pub fn process_buffer(&mut self, buffer: &mut [f64]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }
}

impl super::filter::SampleFilter for BandpassFilter {
    fn process(&mut self, sample: f64) -> f64 {
        BandpassFilter::process(self, sample)
    }
}

/// Cascade of second-order sections in direct form II transposed,
/// running the precomputed default design.
#[cfg(not(feature = "filter-design"))]
struct SosCascade {
    sections: Vec<[f64; 6]>,
    state: Vec<[f64; 2]>,
}

#[cfg(not(feature = "filter-design"))]
impl SosCascade {
    fn new(sections: &[[f64; 6]]) -> Self {
        Self {
            sections: sections.to_vec(),
            state: vec![[0.0; 2]; sections.len()],
        }
    }

    fn filter(&mut self, sample: f64) -> f64 {
        let mut x = sample;
        for (section, state) in self.sections.iter().zip(self.state.iter_mut()) {
            let [b0, b1, b2, _a0, a1, a2] = *section;
            let y = b0 * x + state[0];
            state[0] = b1 * x - a1 * y + state[1];
            state[1] = b2 * x - a2 * y;
            x = y;
        }
        x
    }
}
