//! Synthetic sensor traces for exercising the calibration and tap
//! pipelines without hardware.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::tap::{Sample, TapMove, TapTrace};

/// Idealized inductive sensor: oscillation frequency rises as the coil
/// approaches the bed, following base + gain / (distance + softness).
///
/// The nonlinearity matters. Sensitivity near contact is more than an
/// order of magnitude higher than at the top of a probing move, which is
/// what lets a drop-from-peak detector pick the contact collapse out of
/// the approach signal.
#[derive(Clone, Debug)]
pub struct SensorModel {
    /// Trace sample rate, Hz.
    pub sample_rate: f64,
    /// Frequency with the coil infinitely far from the bed.
    pub base_frequency: f64,
    /// Scale of the proximity response, Hz * mm.
    pub response_gain: f64,
    /// Softening term keeping the response finite at zero distance, mm.
    pub response_softness: f64,
    /// Height of the coil above the nozzle tip, mm.
    pub coil_offset: f64,
    /// Nozzle height at which the bed stops the toolhead, mm.
    pub contact_z: f64,
    /// Standard deviation of additive Gaussian reading noise, Hz.
    pub noise_std: f64,
}

impl Default for SensorModel {
    fn default() -> Self {
        Self {
            sample_rate: 250.0,
            base_frequency: 3.3e6,
            response_gain: 120_000.0,
            response_softness: 0.25,
            coil_offset: 0.5,
            contact_z: 0.0,
            noise_std: 10.0,
        }
    }
}

impl SensorModel {
    /// Noise-free frequency with the nozzle at height `z` above the bed.
    ///
    /// Below `contact_z` the nozzle is resting on the bed and the coil
    /// stops moving, so the reading plateaus.
    pub fn frequency_at_height(&self, z: f64) -> f64 {
        let distance = z.max(self.contact_z) + self.coil_offset + self.response_softness;
        self.base_frequency + self.response_gain / distance
    }
}

/// Generate a raw trace covering a tap move.
///
/// Sampling begins `lead_time` seconds before the move starts, with the
/// toolhead already descending at the move's speed. The lead warms the
/// detection filter on a smooth ramp so the first in-window samples are
/// already settled.
pub fn generate_tap_trace(model: &SensorModel, mv: &TapMove, lead_time: f64, seed: u64) -> TapTrace {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let normal = Normal::new(0.0, model.noise_std).unwrap();
    let dt = 1.0 / model.sample_rate;
    let trace_start = mv.start_time - lead_time;
    let count = ((mv.end_time() - trace_start) / dt) as usize + 1;

    let mut samples = Vec::with_capacity(count);
    for i in 0..count {
        let time = trace_start + i as f64 * dt;
        // Unclamped above start_z: before the move the toolhead is still
        // approaching from higher up.
        let z = mv.start_z - mv.speed * (time - mv.start_time);
        let value = model.frequency_at_height(z) + normal.sample(&mut rng);
        samples.push(Sample::new(time, value));
    }
    TapTrace::new(samples).unwrap()
}

/// Noise-free (frequency, height) pairs over a height sweep, for feeding
/// a calibration fit. `count` must be at least two.
pub fn generate_calibration_points(
    model: &SensorModel,
    height_lo: f64,
    height_hi: f64,
    count: usize,
) -> Vec<(f64, f64)> {
    debug_assert!(count >= 2);
    (0..count)
        .map(|i| {
            let h = height_lo + (height_hi - height_lo) * i as f64 / (count - 1) as f64;
            (model.frequency_at_height(h), h)
        })
        .collect()
}

/// Noisy readings with the toolhead parked at a fixed height.
pub fn generate_steady_readings(model: &SensorModel, z: f64, count: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let normal = Normal::new(0.0, model.noise_std).unwrap();
    (0..count)
        .map(|_| model.frequency_at_height(z) + normal.sample(&mut rng))
        .collect()
}
