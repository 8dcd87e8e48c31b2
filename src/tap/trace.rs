//! Sample traces and move context for tap attempts.

use crate::error::{EddyError, Result};
use crate::signal_processing::SampleFilter;

/// One time-stamped raw sensor reading. Times are host clock seconds,
/// values are raw oscillator frequency counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }
}

/// Raw reading trace for one tap attempt.
///
/// Construction enforces the strict time ordering the detector depends
/// on; an out-of-order batch from the transport is rejected here rather
/// than producing a bogus crossing time downstream.
#[derive(Debug, Clone)]
pub struct TapTrace {
    samples: Vec<Sample>,
}

impl TapTrace {
    pub fn new(samples: Vec<Sample>) -> Result<Self> {
        if samples.is_empty() {
            return Err(EddyError::BadTrace("empty sample trace".to_string()));
        }
        for pair in samples.windows(2) {
            if pair[1].time <= pair[0].time {
                return Err(EddyError::BadTrace(format!(
                    "sample times not strictly increasing at t={}",
                    pair[1].time
                )));
            }
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Run the trace through a filter, preserving timestamps.
    ///
    /// The first reading is subtracted as a static offset first; raw
    /// counts sit in the megahertz range and only the variation carries
    /// information.
    pub fn filtered<F: SampleFilter>(&self, filter: &mut F) -> Vec<Sample> {
        let offset = self.samples[0].value;
        self.samples
            .iter()
            .map(|s| Sample::new(s.time, filter.process(s.value - offset)))
            .collect()
    }
}

/// Constant-speed downward probing move owned by the motion collaborator.
///
/// The core never commands motion; it only uses the move's linear
/// time-to-height relation to turn a detected crossing time into a Z
/// value.
#[derive(Debug, Clone, Copy)]
pub struct TapMove {
    pub start_z: f64,
    pub target_z: f64,
    /// Downward speed, mm/s (positive).
    pub speed: f64,
    pub start_time: f64,
}

impl TapMove {
    pub fn new(start_z: f64, target_z: f64, speed: f64, start_time: f64) -> Result<Self> {
        if speed <= 0.0 {
            return Err(EddyError::Config(format!(
                "tap move speed must be positive, got {}",
                speed
            )));
        }
        if target_z >= start_z {
            return Err(EddyError::Config(format!(
                "tap move target Z ({}) must be below start Z ({})",
                target_z, start_z
            )));
        }
        Ok(Self {
            start_z,
            target_z,
            speed,
            start_time,
        })
    }

    /// Toolhead Z at a given time, clamped to the move's span.
    pub fn z_at(&self, time: f64) -> f64 {
        let z = self.start_z - self.speed * (time - self.start_time);
        z.clamp(self.target_z, self.start_z)
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + (self.start_z - self.target_z) / self.speed
    }
}
