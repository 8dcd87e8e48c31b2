pub mod calibration;
pub mod config;
pub mod constants;
pub mod error;
pub mod probe;
pub mod profile;
pub mod report;
pub mod signal_processing;
pub mod tap;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use config::{FilterConfig, ProbeParams, RawConfig, TapMode};
pub use error::{EddyError, Result};
pub use probe::EddyProbe;
pub use profile::{Profile, ProfileStore};
