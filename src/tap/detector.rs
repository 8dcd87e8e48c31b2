//! Tap event detection on a filtered sample stream.

use log::debug;

use crate::config::FilterConfig;
use crate::error::{EddyError, Result};
use crate::signal_processing::TapFilter;

use super::trace::{Sample, TapMove, TapTrace};

/// Outcome of one tap attempt.
///
/// Ephemeral: produced per probing move, consumed by the validator.
#[derive(Debug, Clone, Copy)]
pub struct TapAttempt {
    /// Time the filtered signal started its final descent (detection
    /// window start).
    pub detect_start_time: f64,
    /// Time the drop from the descent peak reached the threshold.
    pub crossing_time: f64,
    /// Interpolated contact instant actually reported.
    pub reported_time: f64,
    /// Candidate Z offset, including the static adjustment.
    pub z_offset: f64,
}

/// Threshold-crossing detector for tap events.
///
/// The filtered signal rises while the toolhead approaches and collapses
/// once the nozzle lands. Detection tracks the latest local peak (the
/// reference is overwritten on every rising sample) and fires the first
/// time the drop from that peak reaches the threshold; the descent start
/// gives the detection window origin for `time_position` interpolation.
/// Measuring from the local peak rather than an all-time maximum lets an
/// oscillating signal dip and recover without accumulating a stale drop.
pub struct TapDetector {
    threshold: f64,
    time_position: f64,
    adjust_z: f64,
}

impl TapDetector {
    pub fn from_config(config: &FilterConfig, adjust_z: f64) -> Self {
        Self {
            threshold: config.tap_threshold,
            time_position: config.time_position,
            adjust_z,
        }
    }

    /// Filter a raw trace and detect the tap in it.
    pub fn detect_trace(
        &self,
        trace: &TapTrace,
        filter: &mut TapFilter,
        mv: &TapMove,
    ) -> Result<TapAttempt> {
        let filtered = trace.filtered(filter);
        self.detect(&filtered, mv)
    }

    /// Detect the first qualifying crossing in an already filtered stream.
    ///
    /// Only samples inside the move's time window count; a collapse after
    /// the move reached its target Z is the move stopping, not contact.
    pub fn detect(&self, filtered: &[Sample], mv: &TapMove) -> Result<TapAttempt> {
        let mut last_time = f64::NEG_INFINITY;
        let mut last_value: Option<f64> = None;
        let mut peak: Option<Sample> = None;

        for &sample in filtered {
            if sample.time <= last_time {
                return Err(EddyError::BadTrace(format!(
                    "filtered samples not strictly increasing at t={}",
                    sample.time
                )));
            }
            last_time = sample.time;

            if sample.time < mv.start_time {
                continue;
            }
            if sample.time > mv.end_time() {
                break;
            }

            match last_value {
                None => peak = Some(sample),
                Some(last) if sample.value > last => peak = Some(sample),
                Some(last) if sample.value < last => {
                    if let Some(p) = peak {
                        if p.value - sample.value >= self.threshold {
                            return Ok(self.report(p.time, sample.time, mv));
                        }
                    }
                }
                // Equal values neither move the reference nor change the
                // drop already measured.
                Some(_) => {}
            }
            last_value = Some(sample.value);
        }

        Err(EddyError::NoContactDetected)
    }

    fn report(&self, detect_start_time: f64, crossing_time: f64, mv: &TapMove) -> TapAttempt {
        let reported_time =
            detect_start_time + self.time_position * (crossing_time - detect_start_time);
        let z_offset = mv.z_at(reported_time) + self.adjust_z;
        debug!(
            "tap crossing: start={:.4} cross={:.4} reported={:.4} z={:.4}",
            detect_start_time, crossing_time, reported_time, z_offset
        );
        TapAttempt {
            detect_start_time,
            crossing_time,
            reported_time,
            z_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn detector(threshold: f64, time_position: f64) -> TapDetector {
        TapDetector {
            threshold,
            time_position,
            adjust_z: 0.0,
        }
    }

    fn test_move() -> TapMove {
        TapMove::new(3.0, -0.25, 3.0, 0.0).unwrap()
    }

    /// Rises to 50 at t=0.5, then falls at 400 units/s.
    fn rise_fall_stream() -> Vec<Sample> {
        (0..280)
            .map(|i| {
                let t = i as f64 * 0.004;
                let v = if t < 0.5 {
                    100.0 * t
                } else {
                    50.0 - 400.0 * (t - 0.5)
                };
                Sample::new(t, v)
            })
            .collect()
    }

    #[test]
    fn test_crossing_detection() {
        let attempt = detector(30.0, 1.0)
            .detect(&rise_fall_stream(), &test_move())
            .unwrap();

        // Descent starts at the last rising sample (~0.5s); the drop
        // reaches 30 units 75ms later.
        assert_relative_eq!(attempt.detect_start_time, 0.5, epsilon = 0.005);
        assert_relative_eq!(attempt.crossing_time, 0.575, epsilon = 0.005);
    }

    #[test]
    fn test_time_position_boundaries() {
        let mv = test_move();
        let stream = rise_fall_stream();

        let at_start = detector(30.0, 0.0).detect(&stream, &mv).unwrap();
        assert_relative_eq!(at_start.reported_time, at_start.detect_start_time);
        assert_relative_eq!(at_start.z_offset, mv.z_at(at_start.detect_start_time));

        let at_cross = detector(30.0, 1.0).detect(&stream, &mv).unwrap();
        assert_relative_eq!(at_cross.reported_time, at_cross.crossing_time);
        assert_relative_eq!(at_cross.z_offset, mv.z_at(at_cross.crossing_time));
    }

    #[test]
    fn test_time_position_monotonic() {
        let mv = test_move();
        let stream = rise_fall_stream();
        let mut prev_z = f64::INFINITY;
        for tp in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let z = detector(30.0, tp).detect(&stream, &mv).unwrap().z_offset;
            assert!(z < prev_z, "z not decreasing at time_position {}", tp);
            prev_z = z;
        }
    }

    #[test]
    fn test_no_contact() {
        // Signal only rises; the move ends without a qualifying drop.
        let stream: Vec<Sample> = (0..280)
            .map(|i| Sample::new(i as f64 * 0.004, i as f64))
            .collect();
        let err = detector(30.0, 0.3)
            .detect(&stream, &test_move())
            .unwrap_err();
        assert!(matches!(err, EddyError::NoContactDetected));
    }

    #[test]
    fn test_drop_after_move_end_ignored() {
        // Collapse at t=1.2s, after the move bottoms out at ~1.083s.
        let stream: Vec<Sample> = (0..400)
            .map(|i| {
                let t = i as f64 * 0.004;
                let v = if t < 1.2 { 40.0 * t } else { 48.0 - 500.0 * (t - 1.2) };
                Sample::new(t, v)
            })
            .collect();
        let err = detector(30.0, 0.3)
            .detect(&stream, &test_move())
            .unwrap_err();
        assert!(matches!(err, EddyError::NoContactDetected));
    }

    #[test]
    fn test_first_crossing_wins() {
        // Two collapses; only the first is reported.
        let stream: Vec<Sample> = (0..280)
            .map(|i| {
                let t = i as f64 * 0.004;
                let v = if t < 0.3 {
                    200.0 * t
                } else if t < 0.4 {
                    60.0 - 600.0 * (t - 0.3)
                } else if t < 0.7 {
                    200.0 * (t - 0.4)
                } else {
                    60.0 - 600.0 * (t - 0.7)
                };
                Sample::new(t, v)
            })
            .collect();
        let attempt = detector(30.0, 1.0)
            .detect(&stream, &test_move())
            .unwrap();
        assert!(attempt.crossing_time < 0.4);
    }

    fn short_stream(values: &[f64]) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample::new(0.1 + i as f64 * 0.004, v))
            .collect()
    }

    #[test]
    fn test_reference_resets_after_dip_and_recovery() {
        // Dip from 300 to 100, recover to 200, then fall to 40: the drop
        // is measured from the recovered local peak (160), not from the
        // earlier maximum (260), so no contact is reported.
        let stream = short_stream(&[0.0, 150.0, 300.0, 100.0, 200.0, 40.0]);
        let err = detector(250.0, 0.3)
            .detect(&stream, &test_move())
            .unwrap_err();
        assert!(matches!(err, EddyError::NoContactDetected));
    }

    #[test]
    fn test_crossing_measured_from_local_peak() {
        // Same dip, but the recovery reaches 280 and the final fall drops
        // 270: that clears the threshold, anchored at the local peak.
        let stream = short_stream(&[0.0, 150.0, 300.0, 100.0, 280.0, 10.0]);
        let attempt = detector(250.0, 1.0)
            .detect(&stream, &test_move())
            .unwrap();
        assert_relative_eq!(attempt.detect_start_time, stream[4].time);
        assert_relative_eq!(attempt.crossing_time, stream[5].time);
    }

    #[test]
    fn test_unordered_stream_rejected() {
        let stream = vec![
            Sample::new(0.0, 1.0),
            Sample::new(0.1, 2.0),
            Sample::new(0.05, 3.0),
        ];
        let err = detector(30.0, 0.3)
            .detect(&stream, &test_move())
            .unwrap_err();
        assert!(matches!(err, EddyError::BadTrace(_)));
    }

    #[test]
    fn test_adjust_z_applied() {
        let mv = test_move();
        let stream = rise_fall_stream();
        let base = detector(30.0, 0.3).detect(&stream, &mv).unwrap().z_offset;
        let mut det = detector(30.0, 0.3);
        det.adjust_z = 0.05;
        let adjusted = det.detect(&stream, &mv).unwrap().z_offset;
        assert_relative_eq!(adjusted, base + 0.05, epsilon = 1e-12);
    }
}
