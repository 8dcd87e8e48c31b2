//! Probing configuration.
//!
//! Parameters arrive from the external configuration loader as a flat
//! key/value set ([`RawConfig`]) and are converted into strongly typed,
//! exhaustively validated structs at load time. A bound violation is a
//! [`EddyError::Config`] at construction, never a runtime surprise.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_BUTTER_HIGHCUT, DEFAULT_BUTTER_LOWCUT, DEFAULT_BUTTER_ORDER, NOMINAL_SAMPLE_RATE,
};
use crate::error::{EddyError, Result};
use crate::signal_processing::butter_design_available;

/// Tap detection filtering mode.
///
/// `Wma` is a causal weighted moving average and works everywhere; `Butter`
/// is a Butterworth band-pass and, for non-default parameters, requires the
/// `filter-design` capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapMode {
    Wma,
    Butter,
}

impl TapMode {
    /// Default detection threshold for this mode. The two filters produce
    /// outputs on very different scales, so the threshold default follows
    /// the mode when not explicitly configured.
    pub fn default_threshold(&self) -> f64 {
        match self {
            TapMode::Wma => 1000.0,
            TapMode::Butter => 250.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TapMode::Wma => "wma",
            TapMode::Butter => "butter",
        }
    }
}

impl fmt::Display for TapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TapMode {
    type Err = EddyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "wma" => Ok(TapMode::Wma),
            "butter" => Ok(TapMode::Butter),
            other => Err(EddyError::Config(format!(
                "tap_mode must be one of 'wma', 'butter', got '{}'",
                other
            ))),
        }
    }
}

/// Validated filter configuration for one tap attempt.
///
/// Immutable once constructed; [`FilterConfig::new`] rejects invalid cutoff
/// ordering and non-default Butterworth parameters when the design
/// capability is absent, so filter construction itself cannot fail on
/// these grounds later.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub mode: TapMode,
    pub lowcut: f64,
    pub highcut: f64,
    pub order: u32,
    pub tap_threshold: f64,
    pub time_position: f64,
    pub sample_rate: f64,
}

impl FilterConfig {
    pub fn new(
        mode: TapMode,
        lowcut: f64,
        highcut: f64,
        order: u32,
        tap_threshold: f64,
        time_position: f64,
        sample_rate: f64,
    ) -> Result<Self> {
        let config = Self {
            mode,
            lowcut,
            highcut,
            order,
            tap_threshold,
            time_position,
            sample_rate,
        };
        config.validate()?;
        Ok(config)
    }

    /// True when the Butterworth parameters match the shipped defaults,
    /// for which precomputed coefficients exist.
    pub fn is_default_butter(&self) -> bool {
        self.lowcut == DEFAULT_BUTTER_LOWCUT
            && self.highcut == DEFAULT_BUTTER_HIGHCUT
            && self.order == DEFAULT_BUTTER_ORDER
            && self.sample_rate == NOMINAL_SAMPLE_RATE
    }

    fn validate(&self) -> Result<()> {
        if self.sample_rate <= 0.0 {
            return Err(EddyError::Config(format!(
                "sample_rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.time_position) {
            return Err(EddyError::Config(format!(
                "tap_time_position must be within 0.0..=1.0, got {}",
                self.time_position
            )));
        }
        // Butterworth parameter bounds hold regardless of the selected
        // mode; a profile that later switches to butter must not discover
        // a bad band only then.
        if self.lowcut <= 0.0 {
            return Err(EddyError::Config(format!(
                "tap_butter_lowcut must be positive, got {}",
                self.lowcut
            )));
        }
        if self.highcut <= self.lowcut {
            return Err(EddyError::Config(format!(
                "tap_butter_highcut ({}) must be greater than tap_butter_lowcut ({})",
                self.highcut, self.lowcut
            )));
        }
        if self.highcut >= self.sample_rate / 2.0 {
            return Err(EddyError::Config(format!(
                "tap_butter_highcut ({}) must be below the Nyquist rate ({})",
                self.highcut,
                self.sample_rate / 2.0
            )));
        }
        if self.order < 1 {
            return Err(EddyError::Config(
                "tap_butter_order must be at least 1".to_string(),
            ));
        }
        if self.mode == TapMode::Butter
            && !self.is_default_butter()
            && !butter_design_available()
        {
            return Err(EddyError::Config(
                "butter mode with custom filter parameters requires the \
                 filter-design capability, which is not available; \
                 enable it, use the default parameters, or use wma mode"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Full parameter bundle for one probing profile.
///
/// Field meanings and defaults track the operator-facing configuration
/// keys; see [`ProbeParams::from_raw`] for the load path.
#[derive(Debug, Clone)]
pub struct ProbeParams {
    /// Speed for standard (non-tap) homing moves, mm/s.
    pub probe_speed: f64,
    /// Toolhead lift speed between attempts, mm/s.
    pub lift_speed: f64,
    /// XY travel speed, mm/s (calibration moves only).
    pub move_speed: f64,
    /// Sensor drive current for standard homing (0..=31).
    pub reg_drive_current: u8,
    /// Sensor drive current for tap operations (0..=31); 0 means
    /// "use reg_drive_current".
    pub tap_drive_current: u8,
    /// Z height at which a tap move starts, mm.
    pub tap_start_z: f64,
    /// Lowest Z the toolhead may reach on a failed tap, mm.
    pub tap_target_z: f64,
    /// Downward speed of the tap move, mm/s.
    pub tap_speed: f64,
    /// Static adjustment added to every computed tap offset, mm.
    pub tap_adjust_z: f64,
    pub tap_mode: TapMode,
    /// Detection threshold on the filtered signal; scale depends on mode.
    pub tap_threshold: f64,
    /// Attempts to collect before the first consensus check.
    pub tap_samples: usize,
    /// Hard bound on attempts before the sequence fails.
    pub tap_max_samples: usize,
    /// Acceptance bound on the stddev of the best sample subset, mm.
    pub tap_samples_stddev: f64,
    /// Where between detection start (0.0) and threshold crossing (1.0)
    /// the reported contact instant is placed.
    pub tap_time_position: f64,
    pub tap_butter_lowcut: f64,
    pub tap_butter_highcut: f64,
    pub tap_butter_order: u32,
}

impl Default for ProbeParams {
    fn default() -> Self {
        Self {
            probe_speed: 5.0,
            lift_speed: 10.0,
            move_speed: 50.0,
            reg_drive_current: 0,
            tap_drive_current: 0,
            tap_start_z: 3.0,
            tap_target_z: -0.250,
            tap_speed: 3.0,
            tap_adjust_z: 0.0,
            tap_mode: TapMode::Butter,
            tap_threshold: TapMode::Butter.default_threshold(),
            tap_samples: 3,
            tap_max_samples: 5,
            tap_samples_stddev: 0.020,
            tap_time_position: 0.3,
            tap_butter_lowcut: DEFAULT_BUTTER_LOWCUT,
            tap_butter_highcut: DEFAULT_BUTTER_HIGHCUT,
            tap_butter_order: DEFAULT_BUTTER_ORDER,
        }
    }
}

impl ProbeParams {
    /// Build parameters from a flat key/value set, starting from defaults.
    ///
    /// Unknown keys are ignored here; the loader owns unknown-key
    /// diagnostics. Every bound is checked before returning.
    pub fn from_raw(raw: &RawConfig) -> Result<Self> {
        let mut params = Self::default();

        if let Some(v) = raw.get_f64("probe_speed")? {
            params.probe_speed = v;
        }
        if let Some(v) = raw.get_f64("lift_speed")? {
            params.lift_speed = v;
        }
        if let Some(v) = raw.get_f64("move_speed")? {
            params.move_speed = v;
        }
        if let Some(v) = raw.get_u32("reg_drive_current")? {
            params.reg_drive_current = drive_current_from("reg_drive_current", v)?;
        }
        if let Some(v) = raw.get_u32("tap_drive_current")? {
            params.tap_drive_current = drive_current_from("tap_drive_current", v)?;
        }
        if let Some(v) = raw.get_f64("tap_start_z")? {
            params.tap_start_z = v;
        }
        if let Some(v) = raw.get_f64("tap_target_z")? {
            params.tap_target_z = v;
        }
        if let Some(v) = raw.get_f64("tap_speed")? {
            params.tap_speed = v;
        }
        if let Some(v) = raw.get_f64("tap_adjust_z")? {
            params.tap_adjust_z = v;
        }
        if let Some(v) = raw.get_str("tap_mode") {
            params.tap_mode = v.parse()?;
        }
        // Threshold default follows the selected mode.
        params.tap_threshold = match raw.get_f64("tap_threshold")? {
            Some(v) => v,
            None => params.tap_mode.default_threshold(),
        };
        if let Some(v) = raw.get_usize("tap_samples")? {
            params.tap_samples = v;
        }
        if let Some(v) = raw.get_usize("tap_max_samples")? {
            params.tap_max_samples = v;
        }
        if let Some(v) = raw.get_f64("tap_samples_stddev")? {
            params.tap_samples_stddev = v;
        }
        if let Some(v) = raw.get_f64("tap_time_position")? {
            params.tap_time_position = v;
        }
        if let Some(v) = raw.get_f64("tap_butter_lowcut")? {
            params.tap_butter_lowcut = v;
        }
        if let Some(v) = raw.get_f64("tap_butter_highcut")? {
            params.tap_butter_highcut = v;
        }
        if let Some(v) = raw.get_u32("tap_butter_order")? {
            params.tap_butter_order = v;
        }

        params.validate()?;
        Ok(params)
    }

    /// Drive current actually used for tap operations.
    pub fn tap_current(&self) -> u8 {
        if self.tap_drive_current != 0 {
            self.tap_drive_current
        } else {
            self.reg_drive_current
        }
    }

    pub fn is_default_butter_config(&self) -> bool {
        self.tap_butter_lowcut == DEFAULT_BUTTER_LOWCUT
            && self.tap_butter_highcut == DEFAULT_BUTTER_HIGHCUT
            && self.tap_butter_order == DEFAULT_BUTTER_ORDER
    }

    /// Filter configuration for tap detection at the given sensor rate.
    pub fn filter_config(&self, sample_rate: f64) -> Result<FilterConfig> {
        FilterConfig::new(
            self.tap_mode,
            self.tap_butter_lowcut,
            self.tap_butter_highcut,
            self.tap_butter_order,
            self.tap_threshold,
            self.tap_time_position,
            sample_rate,
        )
    }

    /// Check every bound. Called by [`ProbeParams::from_raw`]; callers that
    /// build parameters programmatically should call it themselves.
    pub fn validate(&self) -> Result<()> {
        require_positive("probe_speed", self.probe_speed)?;
        require_positive("lift_speed", self.lift_speed)?;
        require_positive("move_speed", self.move_speed)?;
        require_positive("tap_start_z", self.tap_start_z)?;
        require_positive("tap_speed", self.tap_speed)?;
        require_positive("tap_samples_stddev", self.tap_samples_stddev)?;
        if self.tap_target_z >= self.tap_start_z {
            return Err(EddyError::Config(format!(
                "tap_target_z ({}) must be below tap_start_z ({})",
                self.tap_target_z, self.tap_start_z
            )));
        }
        if self.tap_samples < 1 {
            return Err(EddyError::Config(
                "tap_samples must be at least 1".to_string(),
            ));
        }
        if self.tap_max_samples < self.tap_samples {
            return Err(EddyError::Config(format!(
                "tap_max_samples ({}) must be at least tap_samples ({})",
                self.tap_max_samples, self.tap_samples
            )));
        }
        if !(0.0..=1.0).contains(&self.tap_time_position) {
            return Err(EddyError::Config(format!(
                "tap_time_position must be within 0.0..=1.0, got {}",
                self.tap_time_position
            )));
        }
        // Full filter validation, including the design-capability check.
        self.filter_config(NOMINAL_SAMPLE_RATE)?;
        Ok(())
    }
}

fn require_positive(key: &str, value: f64) -> Result<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(EddyError::Config(format!(
            "{} must be positive, got {}",
            key, value
        )))
    }
}

fn drive_current_from(key: &str, value: u32) -> Result<u8> {
    if value > 31 {
        return Err(EddyError::Config(format!(
            "{} must be within 0..=31, got {}",
            key, value
        )));
    }
    Ok(value as u8)
}

/// Flat key/value parameter view, as delivered by the external
/// configuration loader. Parsing failures surface as [`EddyError::Config`];
/// bounds are enforced by the typed structs built from it.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    values: BTreeMap<String, String>,
}

impl RawConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        self.parse_value(key)
    }

    pub fn get_u32(&self, key: &str) -> Result<Option<u32>> {
        self.parse_value(key)
    }

    pub fn get_usize(&self, key: &str) -> Result<Option<usize>> {
        self.parse_value(key)
    }

    /// Whitespace- or comma-separated list of integers.
    pub fn get_u32_list(&self, key: &str) -> Result<Vec<u32>> {
        let Some(s) = self.get_str(key) else {
            return Ok(Vec::new());
        };
        s.split([',', ' ', '\t'])
            .filter(|tok| !tok.is_empty())
            .map(|tok| {
                tok.parse().map_err(|_| {
                    EddyError::Config(format!("can't parse '{}' in {} as integer", tok, key))
                })
            })
            .collect()
    }

    fn parse_value<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(s) => s.trim().parse().map(Some).map_err(|_| {
                EddyError::Config(format!("can't parse {}='{}' as a number", key, s))
            }),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ProbeParams::default().validate().is_ok());
    }

    #[test]
    fn test_mode_dependent_threshold_default() {
        let raw: RawConfig = [("tap_mode", "wma")].into_iter().collect();
        let params = ProbeParams::from_raw(&raw).unwrap();
        assert_eq!(params.tap_threshold, 1000.0);

        let raw: RawConfig = [("tap_mode", "butter")].into_iter().collect();
        let params = ProbeParams::from_raw(&raw).unwrap();
        assert_eq!(params.tap_threshold, 250.0);
    }

    #[test]
    fn test_inverted_butter_cutoffs_rejected() {
        let raw: RawConfig = [
            ("tap_butter_lowcut", "5.0"),
            ("tap_butter_highcut", "3.0"),
        ]
        .into_iter()
        .collect();
        let err = ProbeParams::from_raw(&raw).unwrap_err();
        assert!(matches!(err, EddyError::Config(_)), "got {:?}", err);
    }

    #[test]
    fn test_inverted_cutoffs_rejected_in_wma_mode() {
        // The band bounds are checked at load even when the butter filter
        // is not the selected mode.
        let raw: RawConfig = [
            ("tap_mode", "wma"),
            ("tap_butter_lowcut", "5.0"),
            ("tap_butter_highcut", "3.0"),
        ]
        .into_iter()
        .collect();
        let err = ProbeParams::from_raw(&raw).unwrap_err();
        assert!(matches!(err, EddyError::Config(_)), "got {:?}", err);
    }

    #[test]
    fn test_max_samples_below_samples_rejected() {
        let raw: RawConfig = [("tap_samples", "4"), ("tap_max_samples", "3")]
            .into_iter()
            .collect();
        assert!(ProbeParams::from_raw(&raw).is_err());
    }

    #[test]
    fn test_time_position_bounds() {
        let raw: RawConfig = [("tap_time_position", "1.5")].into_iter().collect();
        assert!(ProbeParams::from_raw(&raw).is_err());

        let raw: RawConfig = [("tap_time_position", "0.0")].into_iter().collect();
        assert!(ProbeParams::from_raw(&raw).is_ok());
    }

    #[test]
    fn test_bad_mode_choice() {
        let raw: RawConfig = [("tap_mode", "kalman")].into_iter().collect();
        assert!(ProbeParams::from_raw(&raw).is_err());
    }

    #[test]
    fn test_unparseable_number() {
        let raw: RawConfig = [("tap_speed", "fast")].into_iter().collect();
        assert!(ProbeParams::from_raw(&raw).is_err());
    }

    #[test]
    fn test_tap_current_fallback() {
        let mut params = ProbeParams::default();
        params.reg_drive_current = 15;
        assert_eq!(params.tap_current(), 15);
        params.tap_drive_current = 16;
        assert_eq!(params.tap_current(), 16);
    }

    #[test]
    fn test_drive_current_range() {
        let raw: RawConfig = [("reg_drive_current", "32")].into_iter().collect();
        assert!(ProbeParams::from_raw(&raw).is_err());
    }
}
