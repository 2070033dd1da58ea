//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;
use std::time::Duration;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let gate = &config.engine.gate;
    let controller = &config.engine.controller;
    let clustering = &config.engine.clustering;
    let geocode = &config.engine.geocode;
    let sweeper = &config.engine.sweeper;

    format!(
        r#"[sampling]
; Fixes with horizontal accuracy worse than this are dropped (meters)
max_horizontal_accuracy = {}
; Minimum interval between accepted samples, chosen by speed (m/s) or
; displacement from the last accepted sample (meters):
;   faster than fast_speed or farther than fast_displacement         -> fast_interval
;   faster than moderate_speed or farther than moderate_displacement -> moderate_interval
;   otherwise                                                        -> stationary_interval
fast_speed = {}
fast_displacement = {}
fast_interval = {}
moderate_speed = {}
moderate_displacement = {}
moderate_interval = {}
stationary_interval = {}

[mode]
; A sample at or below both limits counts as stationary
stationary_speed = {}
stationary_displacement = {}
; Radius of the stay-region armed when switching to low-power mode (meters)
geofence_radius = {}
; Length of the activity classification window (seconds)
activity_window = {}

[clustering]
; Samples closer than this to the open place join it (meters)
place_distance_threshold = {}
; Stays shorter than this are discarded (seconds)
minimum_place_duration = {}

[geocode]
; Cached addresses are reused within this distance (meters)
cache_radius = {}
; Maximum number of cached addresses
cache_capacity = {}
; Pause between provider calls when re-resolving places (seconds)
sweep_pacing = {}
; Maximum places examined per re-resolution sweep
sweep_batch_limit = {}

[logging]
directory = {}
file = {}
"#,
        gate.max_horizontal_accuracy_m,
        gate.fast_speed_mps,
        gate.fast_displacement_m,
        secs(gate.fast_interval),
        gate.moderate_speed_mps,
        gate.moderate_displacement_m,
        secs(gate.moderate_interval),
        secs(gate.stationary_interval),
        controller.stationary_speed_mps,
        controller.stationary_displacement_m,
        controller.geofence_radius_m,
        secs(controller.activity_window),
        clustering.place_distance_threshold_m,
        secs(clustering.minimum_place_duration),
        geocode.cache_radius_m,
        geocode.cache_capacity,
        secs(sweeper.pacing),
        sweeper.batch_limit,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

fn secs(duration: Duration) -> f64 {
    duration.as_secs_f64()
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
