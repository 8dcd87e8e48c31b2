//! Versioned calibration blob codec
//!
//! Calibration maps persist as a single text value in the host
//! configuration store, so the layout must be explicit and stable:
//!
//! ```text
//! <version>|dc:<n>|freq:<min>,<max>|height:<min>,<max>|coeffs:<c0>,<c1>,...
//! ```
//!
//! Floats are written in Rust's shortest round-trip form, so
//! `deserialize(serialize(m)) == m` holds exactly. Any version mismatch
//! or missing field invalidates the whole blob; there is no field-level
//! migration.

use crate::error::{EddyError, Result};

use super::map::CalibrationMap;

pub fn serialize(map: &CalibrationMap) -> String {
    let coeffs: Vec<String> = map.coeffs.iter().map(f64::to_string).collect();
    format!(
        "{}|dc:{}|freq:{},{}|height:{},{}|coeffs:{}",
        map.version,
        map.drive_current,
        map.freq_min,
        map.freq_max,
        map.height_min,
        map.height_max,
        coeffs.join(",")
    )
}

pub fn deserialize(blob: &str, expected_version: u32) -> Result<CalibrationMap> {
    let mut fields = blob.trim().split('|');

    let version: u32 = fields
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EddyError::InvalidCalibration("empty blob".to_string()))?
        .parse()
        .map_err(|_| EddyError::InvalidCalibration("unreadable version tag".to_string()))?;
    if version != expected_version {
        return Err(EddyError::InvalidCalibration(format!(
            "stored version {} does not match current version {}",
            version, expected_version
        )));
    }

    let mut dc = None;
    let mut freq = None;
    let mut height = None;
    let mut coeffs = None;
    for field in fields {
        let (key, value) = field
            .split_once(':')
            .ok_or_else(|| EddyError::InvalidCalibration(format!("malformed field '{}'", field)))?;
        match key {
            "dc" => {
                dc = Some(value.parse::<u8>().map_err(|_| {
                    EddyError::InvalidCalibration(format!("bad drive current '{}'", value))
                })?)
            }
            "freq" => freq = Some(parse_pair(key, value)?),
            "height" => height = Some(parse_pair(key, value)?),
            "coeffs" => coeffs = Some(parse_floats(key, value)?),
            // Unknown fields are a layout change, which version gating
            // should have caught; treat them as corruption.
            other => {
                return Err(EddyError::InvalidCalibration(format!(
                    "unknown field '{}'",
                    other
                )));
            }
        }
    }

    let drive_current =
        dc.ok_or_else(|| EddyError::InvalidCalibration("missing field 'dc'".to_string()))?;
    let (freq_min, freq_max) =
        freq.ok_or_else(|| EddyError::InvalidCalibration("missing field 'freq'".to_string()))?;
    let (height_min, height_max) =
        height.ok_or_else(|| EddyError::InvalidCalibration("missing field 'height'".to_string()))?;
    let coeffs =
        coeffs.ok_or_else(|| EddyError::InvalidCalibration("missing field 'coeffs'".to_string()))?;

    if coeffs.is_empty() {
        return Err(EddyError::InvalidCalibration(
            "empty coefficient list".to_string(),
        ));
    }
    if freq_max <= freq_min {
        return Err(EddyError::InvalidCalibration(format!(
            "inverted frequency range {}..{}",
            freq_min, freq_max
        )));
    }

    Ok(CalibrationMap {
        drive_current,
        version,
        coeffs,
        freq_min,
        freq_max,
        height_min,
        height_max,
    })
}

fn parse_floats(key: &str, value: &str) -> Result<Vec<f64>> {
    value
        .split(',')
        .map(|tok| {
            tok.parse::<f64>().map_err(|_| {
                EddyError::InvalidCalibration(format!("bad number '{}' in field '{}'", tok, key))
            })
        })
        .collect()
}

fn parse_pair(key: &str, value: &str) -> Result<(f64, f64)> {
    let floats = parse_floats(key, value)?;
    match floats.as_slice() {
        [a, b] => Ok((*a, *b)),
        _ => Err(EddyError::InvalidCalibration(format!(
            "field '{}' must hold exactly two numbers",
            key
        ))),
    }
}
