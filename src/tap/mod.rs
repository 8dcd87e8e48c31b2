pub mod detector;
pub mod trace;
pub mod validator;

pub use detector::{TapAttempt, TapDetector};
pub use trace::{Sample, TapMove, TapTrace};
pub use validator::{TapResult, TapValidator, Verdict};
