pub mod codec;
pub mod map;
pub mod polyfit;

pub use map::CalibrationMap;
pub use polyfit::{polyfit, polyval};
