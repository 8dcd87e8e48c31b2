//! Named probing profiles and their calibration maps.
//!
//! A profile bundles the probing parameters with one calibration map per
//! calibrated drive current. Profiles are created at configuration load,
//! mutated only by explicit recalibration, and never destroyed during a
//! session. The name `"default"` is reserved for the base profile.

use std::collections::HashMap;

use log::warn;

use crate::calibration::{CalibrationMap, codec};
use crate::config::{ProbeParams, RawConfig};
use crate::constants::CALIBRATION_VERSION;
use crate::error::{EddyError, Result};

pub const DEFAULT_PROFILE_NAME: &str = "default";

/// One named parameter bundle plus its per-drive-current calibration.
#[derive(Debug, Clone)]
pub struct Profile {
    name: String,
    pub params: ProbeParams,
    calibration: HashMap<u8, CalibrationMap>,
    calibration_invalid: bool,
}

impl Profile {
    /// Load a profile from flat configuration values.
    ///
    /// Calibration blobs tagged with a stale schema version are discarded
    /// wholesale; the profile then reports `calibration_invalid` so the
    /// operator can be told to recalibrate instead of silently probing
    /// with nothing.
    pub fn load(name: impl Into<String>, raw: &RawConfig) -> Result<Self> {
        let mut profile = Self {
            name: name.into(),
            params: ProbeParams::from_raw(raw)?,
            calibration: HashMap::new(),
            calibration_invalid: false,
        };
        profile.load_calibration(raw)?;
        Ok(profile)
    }

    pub fn with_params(name: impl Into<String>, params: ProbeParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            name: name.into(),
            params,
            calibration: HashMap::new(),
            calibration_invalid: false,
        })
    }

    fn load_calibration(&mut self, raw: &RawConfig) -> Result<()> {
        let drive_currents = raw.get_u32_list("calibrated_drive_currents")?;
        let version = raw.get_u32("calibration_version")?;

        let version_ok = match version {
            Some(v) => v == CALIBRATION_VERSION,
            // Blobs present without a version tag predate version
            // tagging: equally stale.
            None => drive_currents.is_empty(),
        };
        if !version_ok {
            warn!(
                "profile '{}': stored calibration schema is stale, discarding {} map(s); recalibration required",
                self.name,
                drive_currents.len()
            );
            self.calibration_invalid = true;
            return Ok(());
        }

        for dc in drive_currents {
            let key = format!("calibration_{}", dc);
            let Some(blob) = raw.get_str(&key) else {
                warn!("profile '{}': missing {}", self.name, key);
                self.calibration_invalid = true;
                continue;
            };
            match codec::deserialize(blob, CALIBRATION_VERSION) {
                Ok(map) => {
                    if map.drive_current() as u32 != dc {
                        warn!(
                            "profile '{}': {} holds data for drive current {}",
                            self.name,
                            key,
                            map.drive_current()
                        );
                        self.calibration_invalid = true;
                        continue;
                    }
                    self.calibration.insert(map.drive_current(), map);
                }
                Err(e) => {
                    warn!("profile '{}': discarding {}: {}", self.name, key, e);
                    self.calibration_invalid = true;
                }
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calibration map for a drive current, if valid stored data existed.
    pub fn calibration_for(&self, drive_current: u8) -> Option<&CalibrationMap> {
        self.calibration.get(&drive_current)
    }

    /// True when stored calibration data had to be discarded at load.
    pub fn calibration_invalid(&self) -> bool {
        self.calibration_invalid
    }

    pub fn calibrated_drive_currents(&self) -> Vec<u8> {
        let mut currents: Vec<u8> = self.calibration.keys().copied().collect();
        currents.sort_unstable();
        currents
    }

    /// Install a freshly fitted map, replacing any previous one for the
    /// same drive current. This is the recalibration path; it must not
    /// run concurrently with a probing sequence.
    pub fn set_calibration(&mut self, map: CalibrationMap) {
        self.calibration_invalid = false;
        self.calibration.insert(map.drive_current(), map);
    }

    /// Key/value pairs to hand back to the configuration store so the
    /// calibration survives a restart.
    pub fn persisted_calibration(&self) -> Vec<(String, String)> {
        let currents = self.calibrated_drive_currents();
        if currents.is_empty() {
            return Vec::new();
        }
        let mut values = vec![
            (
                "calibration_version".to_string(),
                CALIBRATION_VERSION.to_string(),
            ),
            (
                "calibrated_drive_currents".to_string(),
                currents
                    .iter()
                    .map(u8::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        ];
        for dc in currents {
            values.push((
                format!("calibration_{}", dc),
                codec::serialize(&self.calibration[&dc]),
            ));
        }
        values
    }
}

/// All profiles known to one session: the base profile plus named
/// overrides. Read-only during probing; only recalibration mutates it.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    base: Profile,
    overrides: HashMap<String, Profile>,
}

impl ProfileStore {
    /// Load the base (default) profile.
    pub fn load(raw: &RawConfig) -> Result<Self> {
        Ok(Self {
            base: Profile::load(DEFAULT_PROFILE_NAME, raw)?,
            overrides: HashMap::new(),
        })
    }

    /// Load a named override profile. The base profile's name is
    /// reserved and may not be overridden.
    pub fn add_profile(&mut self, name: &str, raw: &RawConfig) -> Result<()> {
        if name == DEFAULT_PROFILE_NAME {
            return Err(EddyError::Config(format!(
                "the profile name '{}' is reserved; base values belong in the main section",
                DEFAULT_PROFILE_NAME
            )));
        }
        let profile = Profile::load(name, raw)?;
        self.overrides.insert(name.to_string(), profile);
        Ok(())
    }

    /// Look up a profile; `None` or `"default"` means the base profile.
    pub fn get(&self, name: Option<&str>) -> Option<&Profile> {
        match name {
            None | Some(DEFAULT_PROFILE_NAME) => Some(&self.base),
            Some(other) => self.overrides.get(other),
        }
    }

    pub fn get_mut(&mut self, name: Option<&str>) -> Option<&mut Profile> {
        match name {
            None | Some(DEFAULT_PROFILE_NAME) => Some(&mut self.base),
            Some(other) => self.overrides.get_mut(other),
        }
    }

    pub fn base(&self) -> &Profile {
        &self.base
    }

    pub fn profile_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.overrides.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
