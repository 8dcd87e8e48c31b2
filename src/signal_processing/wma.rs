use super::filter::SampleFilter;

/// Weighted moving average filter for raw sensor readings
///
/// Computes a linearly weighted mean over the last N values, with weights
/// increasing toward the most recent sample. Purely causal, needs no
/// design step, and is the fallback when the band-pass capability is
/// unavailable.
pub struct WeightedMovingAverage {
    buffer: Vec<f64>,
    index: usize,
    count: usize,
}

impl WeightedMovingAverage {
    /// Create a new filter with the given window length
    ///
    /// # Arguments
    /// * `window_size` - Number of samples to average (larger = smoother but slower response)
    pub fn new(window_size: usize) -> Self {
        assert!(window_size >= 1);
        Self {
            buffer: vec![0.0; window_size],
            index: 0,
            count: 0,
        }
    }

    /// Add a value and return the updated weighted average
    ///
    /// Before the window fills, the average covers only the samples seen
    /// so far.
    pub fn add(&mut self, value: f64) -> f64 {
        self.buffer[self.index] = value;
        self.index = (self.index + 1) % self.buffer.len();
        self.count = (self.count + 1).min(self.buffer.len());
        self.average()
    }

    /// Current weighted average without adding a new value
    pub fn average(&self) -> f64 {
        let len = self.buffer.len();
        // Oldest sample in the window sits right after the write index.
        let start = (self.index + len - self.count) % len;
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for i in 0..self.count {
            let weight = (i + 1) as f64;
            weighted_sum += weight * self.buffer[(start + i) % len];
            weight_total += weight;
        }
        weighted_sum / weight_total
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
        self.count = 0;
    }
}

impl SampleFilter for WeightedMovingAverage {
    fn process(&mut self, sample: f64) -> f64 {
        self.add(sample)
    }
}

/// Weighted moving average of first differences.
///
/// This is the wma-mode tap detection signal: it tracks the raw reading's
/// slope, so it rises while the sensor frequency ramps toward the bed and
/// collapses when contact stops the ramp. A plain average of the readings
/// would keep rising through contact and never show a drop.
pub struct WmaDerivative {
    wma: WeightedMovingAverage,
    last: Option<f64>,
}

impl WmaDerivative {
    pub fn new(window_size: usize) -> Self {
        Self {
            wma: WeightedMovingAverage::new(window_size),
            last: None,
        }
    }
}

impl SampleFilter for WmaDerivative {
    fn process(&mut self, sample: f64) -> f64 {
        let diff = match self.last {
            Some(last) => sample - last,
            None => 0.0,
        };
        self.last = Some(sample);
        self.wma.add(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_partial_window() {
        let mut wma = WeightedMovingAverage::new(4);
        assert_relative_eq!(wma.add(1.0), 1.0);
        // weights 1,2 over (1, 2)
        assert_relative_eq!(wma.add(2.0), (1.0 + 4.0) / 3.0);
    }

    #[test]
    fn test_weights_favor_recent() {
        let mut wma = WeightedMovingAverage::new(3);
        wma.add(0.0);
        wma.add(0.0);
        let out = wma.add(6.0);
        // weights 1,2,3 -> (0 + 0 + 18) / 6
        assert_relative_eq!(out, 3.0);
    }

    #[test]
    fn test_window_slides() {
        let mut wma = WeightedMovingAverage::new(2);
        wma.add(1.0);
        wma.add(2.0);
        // window now (2, 3) with weights 1, 2
        assert_relative_eq!(wma.add(3.0), (2.0 + 6.0) / 3.0);
    }

    #[test]
    fn test_constant_input() {
        let mut wma = WeightedMovingAverage::new(8);
        let mut last = 0.0;
        for _ in 0..20 {
            last = wma.add(5.5);
        }
        assert_relative_eq!(last, 5.5);
    }

    #[test]
    fn test_reset() {
        let mut wma = WeightedMovingAverage::new(3);
        wma.add(10.0);
        wma.reset();
        assert_relative_eq!(wma.add(2.0), 2.0);
    }

    #[test]
    fn test_derivative_tracks_slope() {
        let mut d = WmaDerivative::new(4);
        let mut out = 0.0;
        // Ramp with slope 3 per sample
        for i in 0..20 {
            out = d.process(3.0 * i as f64);
        }
        assert_relative_eq!(out, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_derivative_collapses_on_plateau() {
        let mut d = WmaDerivative::new(4);
        for i in 0..20 {
            d.process(3.0 * i as f64);
        }
        let mut out = f64::INFINITY;
        for _ in 0..20 {
            out = d.process(57.0); // ramp stops
        }
        assert_relative_eq!(out, 0.0, epsilon = 1e-9);
    }
}
