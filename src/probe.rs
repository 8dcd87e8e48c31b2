//! High-level probing orchestration.
//!
//! `EddyProbe` ties a profile's parameters and calibration maps to the
//! per-attempt filter/detector pipeline and the multi-sample validator.
//! Physical motion stays with the external collaborator, which hands in
//! one raw trace and move context per attempt.

use crate::calibration::CalibrationMap;
use crate::constants::WMA_WINDOW;
use crate::error::{EddyError, Result};
use crate::profile::Profile;
use crate::signal_processing::{TapFilter, WeightedMovingAverage};
use crate::tap::{TapDetector, TapMove, TapResult, TapTrace, TapValidator};

pub struct EddyProbe {
    profile: Profile,
    sample_rate: f64,
}

impl EddyProbe {
    /// Bind a profile to a sensor conversion rate.
    ///
    /// Fails fast if the profile's filter parameters cannot be realized
    /// at this rate.
    pub fn new(profile: Profile, sample_rate: f64) -> Result<Self> {
        profile.params.filter_config(sample_rate)?;
        Ok(Self {
            profile,
            sample_rate,
        })
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn map_for(&self, drive_current: u8) -> Result<&CalibrationMap> {
        self.profile
            .calibration_for(drive_current)
            .ok_or(EddyError::NotCalibrated { drive_current })
    }

    /// Calibrated height for a single raw frequency reading.
    pub fn height_at_frequency(&self, drive_current: u8, frequency: f64) -> Result<f64> {
        self.map_for(drive_current)?.height_at(frequency)
    }

    /// Expected raw frequency at a physical height.
    pub fn frequency_at_height(&self, drive_current: u8, height: f64) -> Result<f64> {
        self.map_for(drive_current)?.frequency_at(height)
    }

    /// Steady-state height query: smooth a batch of raw readings and map
    /// the result. Used for standard (non-tap) probing at the regular
    /// drive current.
    pub fn smoothed_height(&self, readings: &[f64]) -> Result<f64> {
        if readings.is_empty() {
            return Err(EddyError::BadTrace("no readings to average".to_string()));
        }
        let map = self.map_for(self.profile.params.reg_drive_current)?;
        let mut wma = WeightedMovingAverage::new(WMA_WINDOW);
        let mut smoothed = 0.0;
        for &reading in readings {
            smoothed = wma.add(reading);
        }
        map.height_at(smoothed)
    }

    /// Run a full tap sequence.
    ///
    /// `attempt_source` performs one physical probing move per call and
    /// returns its raw trace plus move context; it is called once per
    /// attempt the validator requests, up to `tap_max_samples`. Each
    /// attempt gets a fresh filter so no state bleeds between moves.
    pub fn tap<F>(&self, mut attempt_source: F) -> Result<TapResult>
    where
        F: FnMut(usize) -> Result<(TapTrace, TapMove)>,
    {
        let filter_config = self.profile.params.filter_config(self.sample_rate)?;
        let detector = TapDetector::from_config(&filter_config, self.profile.params.tap_adjust_z);

        TapValidator::run(&self.profile.params, |index| {
            let (trace, tap_move) = attempt_source(index)?;
            let mut filter = TapFilter::from_config(&filter_config)?;
            let attempt = detector.detect_trace(&trace, &mut filter, &tap_move)?;
            Ok(attempt.z_offset)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeParams;
    use crate::constants::NOMINAL_SAMPLE_RATE;
    use approx::assert_relative_eq;

    fn probe_with_map() -> EddyProbe {
        let points: Vec<(f64, f64)> = (0..30)
            .map(|i| {
                let h = 0.2 + i as f64 * 0.12;
                (3_400_000.0 - 150_000.0 * (h / (h + 1.0)), h)
            })
            .collect();
        let map = CalibrationMap::fit(0, &points).unwrap();
        let mut profile = Profile::with_params("default", ProbeParams::default()).unwrap();
        profile.set_calibration(map);
        EddyProbe::new(profile, NOMINAL_SAMPLE_RATE).unwrap()
    }

    #[test]
    fn test_uncalibrated_drive_current() {
        let probe = probe_with_map();
        let err = probe.height_at_frequency(7, 3_350_000.0).unwrap_err();
        assert!(matches!(
            err,
            EddyError::NotCalibrated { drive_current: 7 }
        ));
    }

    #[test]
    fn test_smoothed_height_matches_map() {
        let probe = probe_with_map();
        let freq = probe.frequency_at_height(0, 1.5).unwrap();
        let readings = vec![freq; 40];
        let height = probe.smoothed_height(&readings).unwrap();
        assert_relative_eq!(height, 1.5, epsilon = 1e-3);
    }

    #[test]
    fn test_smoothed_height_empty_batch() {
        let probe = probe_with_map();
        assert!(matches!(
            probe.smoothed_height(&[]),
            Err(EddyError::BadTrace(_))
        ));
    }
}
