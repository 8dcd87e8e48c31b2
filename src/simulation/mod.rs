mod sensor;

pub use sensor::{
    SensorModel, generate_calibration_points, generate_steady_readings, generate_tap_trace,
};
