//! Numeric constants for signal processing and calibration stability
//!
//! These constants define thresholds, epsilon values, and the precomputed
//! default filter used throughout the probing pipeline.

/// Schema version of persisted calibration blobs. Any stored map tagged
/// with a different version is discarded wholesale at load time.
pub const CALIBRATION_VERSION: u32 = 5;

/// Nominal sensor conversion rate in samples per second. The precomputed
/// default band-pass coefficients are only valid at this rate.
pub const NOMINAL_SAMPLE_RATE: f64 = 250.0;

/// Default Butterworth band-pass parameters. Configurations matching these
/// can be served from [`DEFAULT_BUTTER_SOS`] without the `filter-design`
/// capability.
pub const DEFAULT_BUTTER_LOWCUT: f64 = 5.0;
pub const DEFAULT_BUTTER_HIGHCUT: f64 = 25.0;
pub const DEFAULT_BUTTER_ORDER: u32 = 2;

/// Second-order sections (b0, b1, b2, a0, a1, a2) for the default
/// order-2 Butterworth band-pass (5..25 Hz) at [`NOMINAL_SAMPLE_RATE`],
/// bilinear-transformed from the analog prototype with prewarped cutoffs.
pub const DEFAULT_BUTTER_SOS: [[f64; 6]; 2] = [
    [
        4.613_180_209_331_290_6e-2,
        0.0,
        -4.613_180_209_331_290_6e-2,
        1.0,
        -1.329_776_718_468_270_9,
        5.693_902_189_294_330_9e-1,
    ],
    [
        1.0,
        0.0,
        -1.0,
        1.0,
        -1.845_000_600_983_778_5,
        8.637_525_213_328_743_9e-1,
    ],
];

/// Window length of the weighted moving average filter. Matches the
/// frequency averaging window used by the sensor firmware.
pub const WMA_WINDOW: usize = 16;

/// Polynomial degree used for calibration fits. High enough to track the
/// sensor's nonlinear frequency response, low enough not to chase noise.
pub const CALIBRATION_FIT_DEGREE: usize = 3;

/// Number of evenly spaced points used to verify monotonicity of a fitted
/// calibration curve and to tabulate it for the bisection inverse.
pub const MONOTONIC_CHECK_SAMPLES: usize = 200;

/// Minimum separation between successive tabulated curve values for the
/// curve to count as strictly monotonic. Guards against flat spots that
/// would make the inverse ill-defined.
pub const MONOTONIC_EPSILON: f64 = 1e-12;

/// Convergence tolerance (in frequency units) for the bisection inverse.
pub const BISECTION_TOLERANCE: f64 = 1e-6;

/// Maximum bisection iterations before the inverse gives up. With the
/// domain widths seen in practice this bound is never reached.
pub const BISECTION_MAX_ITERATIONS: usize = 100;
