pub mod butterworth;
pub mod filter;
pub mod wma;

pub use butterworth::{BandpassFilter, butter_design_available};
pub use filter::{SampleFilter, TapFilter};
pub use wma::{WeightedMovingAverage, WmaDerivative};
