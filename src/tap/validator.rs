//! Multi-sample consensus validation of tap offsets.

use log::{debug, warn};
use rolling_stats::Stats;
use serde::Serialize;

use crate::config::ProbeParams;
use crate::error::{EddyError, Result};

/// Accepted outcome of a tap sequence.
#[derive(Debug, Clone, Serialize)]
pub struct TapResult {
    /// Consensus Z offset: mean of the accepted sample subset.
    pub z_offset: f64,
    /// Standard deviation of the accepted subset.
    pub stddev: f64,
    /// Indices (into `samples`) of the subset that was accepted.
    pub sample_indices: Vec<usize>,
    /// All successful attempt offsets, in collection order.
    pub samples: Vec<f64>,
}

/// What the validator wants next.
#[derive(Debug)]
pub enum Verdict {
    Accepted(TapResult),
    /// No qualifying subset yet; another attempt is allowed.
    NeedMore,
    /// Attempt budget spent without a qualifying subset.
    Exhausted,
}

/// Consensus validator over repeated tap attempts.
///
/// Collects candidate offsets and searches every size-`tap_samples`
/// combination for one whose standard deviation is within
/// `tap_samples_stddev`. Among qualifying subsets the one with the lowest
/// mean wins: a spurious early trigger reads high, so the low consensus is
/// the trustworthy one. Evaluating combinations instead of a running
/// window lets one outlier attempt survive without discarding the session.
pub struct TapValidator {
    required: usize,
    max_samples: usize,
    stddev_limit: f64,
    offsets: Vec<f64>,
    attempts: usize,
}

impl TapValidator {
    pub fn new(params: &ProbeParams) -> Self {
        Self {
            required: params.tap_samples,
            max_samples: params.tap_max_samples,
            stddev_limit: params.tap_samples_stddev,
            offsets: Vec::new(),
            attempts: 0,
        }
    }

    /// Record a successful attempt's candidate Z offset.
    pub fn record_success(&mut self, z_offset: f64) {
        self.attempts += 1;
        self.offsets.push(z_offset);
    }

    /// Record a failed attempt (no contact, abort). It still consumes
    /// attempt budget.
    pub fn record_failure(&mut self) {
        self.attempts += 1;
    }

    pub fn samples(&self) -> &[f64] {
        &self.offsets
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Search the collected offsets for an acceptable consensus.
    pub fn evaluate(&self) -> Verdict {
        if self.offsets.len() >= self.required {
            let mut best: Option<(Vec<usize>, f64, f64)> = None;
            let mut indices: Vec<usize> = (0..self.required).collect();
            loop {
                let (mean, stddev) = self.subset_stats(&indices);
                if stddev <= self.stddev_limit {
                    let better = match &best {
                        None => true,
                        Some((_, best_mean, best_stddev)) => {
                            mean < *best_mean || (mean == *best_mean && stddev < *best_stddev)
                        }
                    };
                    if better {
                        best = Some((indices.clone(), mean, stddev));
                    }
                }
                if !next_combination(&mut indices, self.offsets.len()) {
                    break;
                }
            }
            if let Some((sample_indices, mean, stddev)) = best {
                return Verdict::Accepted(TapResult {
                    z_offset: mean,
                    stddev,
                    sample_indices,
                    samples: self.offsets.clone(),
                });
            }
        }

        if self.attempts < self.max_samples {
            Verdict::NeedMore
        } else {
            Verdict::Exhausted
        }
    }

    /// Drive a whole tap sequence through an attempt callback.
    ///
    /// The callback owns the physical move and returns the candidate
    /// offset for one attempt. `NoContactDetected` and `Aborted` count as
    /// failed attempts and the sequence continues; any other error is
    /// fatal immediately.
    pub fn run<F>(params: &ProbeParams, mut attempt: F) -> Result<TapResult>
    where
        F: FnMut(usize) -> Result<f64>,
    {
        let mut validator = Self::new(params);
        let mut last_failure: Option<EddyError> = None;

        loop {
            match validator.evaluate() {
                Verdict::Accepted(result) => {
                    debug!(
                        "tap accepted: z={:.4} stddev={:.4} subset={:?} of {:?}",
                        result.z_offset, result.stddev, result.sample_indices, result.samples
                    );
                    return Ok(result);
                }
                Verdict::Exhausted => {
                    return Err(if validator.offsets.is_empty() {
                        last_failure.unwrap_or(EddyError::NoContactDetected)
                    } else {
                        EddyError::InconsistentSamples {
                            samples: validator.offsets.clone(),
                        }
                    });
                }
                Verdict::NeedMore => {
                    let index = validator.attempts;
                    match attempt(index) {
                        Ok(z_offset) => {
                            debug!("tap attempt {}: z={:.4}", index, z_offset);
                            validator.record_success(z_offset);
                        }
                        Err(e @ (EddyError::NoContactDetected | EddyError::Aborted(_))) => {
                            warn!("tap attempt {} failed: {}", index, e);
                            last_failure = Some(e);
                            validator.record_failure();
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }

    fn subset_stats(&self, indices: &[usize]) -> (f64, f64) {
        if indices.len() < 2 {
            return (self.offsets[indices[0]], 0.0);
        }
        let mut stats: Stats<f64> = Stats::new();
        for &i in indices {
            stats.update(self.offsets[i]);
        }
        (stats.mean, stats.std_dev)
    }
}

/// Advance `indices` to the next k-combination of `0..n` in
/// lexicographic order. Returns false after the last one.
fn next_combination(indices: &mut [usize], n: usize) -> bool {
    let k = indices.len();
    let mut i = k;
    while i > 0 {
        i -= 1;
        if indices[i] != i + n - k {
            indices[i] += 1;
            for j in (i + 1)..k {
                indices[j] = indices[j - 1] + 1;
            }
            return true;
        }
    }
    false
}
