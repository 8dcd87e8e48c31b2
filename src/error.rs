use thiserror::Error;

#[derive(Error, Debug)]
pub enum EddyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Filter design failed: {0}")]
    FilterDesign(String),

    #[error("Calibration fit failed: {0}")]
    Fit(String),

    #[error("Invalid calibration data: {0}")]
    InvalidCalibration(String),

    #[error("{kind} {value:.3} outside calibrated range {low:.3}..{high:.3}")]
    OutOfDomain {
        kind: DomainKind,
        value: f64,
        low: f64,
        high: f64,
    },

    #[error("No calibration for drive current {drive_current}; run calibration first")]
    NotCalibrated { drive_current: u8 },

    #[error("No contact detected before reaching target Z")]
    NoContactDetected,

    #[error("Inconsistent tap samples after {} attempts: {samples:?}", samples.len())]
    InconsistentSamples { samples: Vec<f64> },

    #[error("Bad sample trace: {0}")]
    BadTrace(String),

    #[error("Probing move aborted: {0}")]
    Aborted(String),
}

/// Which axis of the calibration map an out-of-range query was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainKind {
    Frequency,
    Height,
}

impl std::fmt::Display for DomainKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainKind::Frequency => write!(f, "frequency"),
            DomainKind::Height => write!(f, "height"),
        }
    }
}

pub type Result<T> = std::result::Result<T, EddyError>;
