//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::time::Duration;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [sampling] section
    if let Some(section) = ini.section(Some("sampling")) {
        let gate = &mut config.engine.gate;
        let s = Section::new("sampling", section);
        s.positive("max_horizontal_accuracy", &mut gate.max_horizontal_accuracy_m)?;
        s.non_negative("fast_speed", &mut gate.fast_speed_mps)?;
        s.non_negative("fast_displacement", &mut gate.fast_displacement_m)?;
        s.non_negative("moderate_speed", &mut gate.moderate_speed_mps)?;
        s.non_negative("moderate_displacement", &mut gate.moderate_displacement_m)?;
        s.seconds("fast_interval", &mut gate.fast_interval)?;
        s.seconds("moderate_interval", &mut gate.moderate_interval)?;
        s.seconds("stationary_interval", &mut gate.stationary_interval)?;
    }

    // [mode] section
    if let Some(section) = ini.section(Some("mode")) {
        let controller = &mut config.engine.controller;
        let s = Section::new("mode", section);
        s.non_negative("stationary_speed", &mut controller.stationary_speed_mps)?;
        s.non_negative("stationary_displacement", &mut controller.stationary_displacement_m)?;
        s.positive("geofence_radius", &mut controller.geofence_radius_m)?;
        s.seconds("activity_window", &mut controller.activity_window)?;
    }

    // [clustering] section
    if let Some(section) = ini.section(Some("clustering")) {
        let clustering = &mut config.engine.clustering;
        let s = Section::new("clustering", section);
        s.positive("place_distance_threshold", &mut clustering.place_distance_threshold_m)?;
        s.seconds("minimum_place_duration", &mut clustering.minimum_place_duration)?;
    }

    // [geocode] section
    if let Some(section) = ini.section(Some("geocode")) {
        let s = Section::new("geocode", section);
        s.non_negative("cache_radius", &mut config.engine.geocode.cache_radius_m)?;
        s.count("cache_capacity", &mut config.engine.geocode.cache_capacity)?;
        s.seconds("sweep_pacing", &mut config.engine.sweeper.pacing)?;
        s.count("sweep_batch_limit", &mut config.engine.sweeper.batch_limit)?;
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

/// One INI section with typed, validated accessors.
///
/// Each accessor leaves the target untouched when the key is absent.
struct Section<'a> {
    name: &'static str,
    properties: &'a Properties,
}

impl<'a> Section<'a> {
    fn new(name: &'static str, properties: &'a Properties) -> Self {
        Self { name, properties }
    }

    fn invalid(&self, key: &str, value: &str, reason: &str) -> ConfigFileError {
        ConfigFileError::InvalidValue {
            section: self.name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn number(&self, key: &str, reason: &str) -> Result<Option<(f64, &'a str)>, ConfigFileError> {
        let Some(v) = self.properties.get(key) else {
            return Ok(None);
        };
        match v.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Some((n, v))),
            _ => Err(self.invalid(key, v, reason)),
        }
    }

    fn positive(&self, key: &str, target: &mut f64) -> Result<(), ConfigFileError> {
        const REASON: &str = "must be a positive number (meters)";
        if let Some((n, v)) = self.number(key, REASON)? {
            if n <= 0.0 {
                return Err(self.invalid(key, v, REASON));
            }
            *target = n;
        }
        Ok(())
    }

    fn non_negative(&self, key: &str, target: &mut f64) -> Result<(), ConfigFileError> {
        const REASON: &str = "must be a non-negative number";
        if let Some((n, v)) = self.number(key, REASON)? {
            if n < 0.0 {
                return Err(self.invalid(key, v, REASON));
            }
            *target = n;
        }
        Ok(())
    }

    fn seconds(&self, key: &str, target: &mut Duration) -> Result<(), ConfigFileError> {
        const REASON: &str = "must be a non-negative number of seconds";
        if let Some((n, v)) = self.number(key, REASON)? {
            if n < 0.0 {
                return Err(self.invalid(key, v, REASON));
            }
            *target = Duration::from_secs_f64(n);
        }
        Ok(())
    }

    fn count(&self, key: &str, target: &mut usize) -> Result<(), ConfigFileError> {
        if let Some(v) = self.properties.get(key) {
            *target = v
                .trim()
                .parse()
                .map_err(|_| self.invalid(key, v, "must be a non-negative integer"))?;
        }
        Ok(())
    }
}

/// Expand a leading `~` to the home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
