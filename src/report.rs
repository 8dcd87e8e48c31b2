//! Outbound report rendering.
//!
//! The host side consumes probing outcomes as JSON; these structs are the
//! stable shape of that interface.

use serde::Serialize;

use crate::error::EddyError;
use crate::tap::TapResult;

/// Outcome of a tap sequence, accepted or not.
#[derive(Debug, Clone, Serialize)]
pub struct TapReport {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_offset: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stddev: Option<f64>,
    /// All collected attempt offsets, also on failure, for diagnosis.
    pub samples: Vec<f64>,
    pub sample_indices: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl TapReport {
    pub fn from_outcome(outcome: &Result<TapResult, EddyError>) -> Self {
        match outcome {
            Ok(result) => Self {
                accepted: true,
                z_offset: Some(result.z_offset),
                stddev: Some(result.stddev),
                samples: result.samples.clone(),
                sample_indices: result.sample_indices.clone(),
                failure: None,
            },
            Err(e) => Self {
                accepted: false,
                z_offset: None,
                stddev: None,
                samples: match e {
                    EddyError::InconsistentSamples { samples } => samples.clone(),
                    _ => Vec::new(),
                },
                sample_indices: Vec::new(),
                failure: Some(e.to_string()),
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Steady-state height query result.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HeightReport {
    pub drive_current: u8,
    pub frequency: f64,
    pub height: f64,
}

impl HeightReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_report() {
        let outcome = Ok(TapResult {
            z_offset: 0.9997,
            stddev: 0.0015,
            sample_indices: vec![0, 2, 4],
            samples: vec![1.000, 1.002, 0.998, 1.500, 1.001],
        });
        let report = TapReport::from_outcome(&outcome);
        assert!(report.accepted);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"accepted\":true"));
        assert!(json.contains("\"z_offset\":0.9997"));
    }

    #[test]
    fn test_rejected_report_keeps_samples() {
        let outcome = Err(EddyError::InconsistentSamples {
            samples: vec![1.0, 1.3, 1.6],
        });
        let report = TapReport::from_outcome(&outcome);
        assert!(!report.accepted);
        assert_eq!(report.samples, vec![1.0, 1.3, 1.6]);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"failure\""));
        assert!(!json.contains("\"z_offset\""));
    }
}
