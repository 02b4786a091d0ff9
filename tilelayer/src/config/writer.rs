//! INI serialization: [`ConfigFile`] → commented `config.ini` text.

use std::fmt::Write;
use std::path::Path;

use super::settings::ConfigFile;
use super::size::format_size;

pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let definitions = config
        .layers
        .definitions
        .as_deref()
        .map(path_to_string)
        .unwrap_or_default();
    let log_directory = config
        .logging
        .directory
        .as_deref()
        .map(path_to_string)
        .unwrap_or_default();

    let mut out = format!(
        r#"[cache]
; Decoded image cache per layer (default: {default_cache})
; Supports: KB, MB, GB suffixes (e.g., 64MB, 1GB)
image_cache_size = {image_cache_size}
; Seconds a released decode buffer stays available for reuse
buffer_grace_secs = {buffer_grace_secs}
; Seconds between sweeps of idle decode buffers
sweep_interval_secs = {sweep_interval_secs}

[layers]
; JSON file with the layer definitions
; Example: definitions = ~/.tilelayer/layers.json
definitions = {definitions}

[logging]
; Log directory (default: ~/.tilelayer)
directory = {log_directory}
file = {log_file}

[zoom]
; Maximum zoom per layer id, lowers the layer's own maximum
; Example: osm = 12
"#,
        default_cache = format_size(super::settings::DEFAULT_IMAGE_CACHE_SIZE),
        image_cache_size = format_size(config.cache.image_cache_size),
        buffer_grace_secs = config.cache.buffer_grace_secs,
        sweep_interval_secs = config.cache.sweep_interval_secs,
        definitions = definitions,
        log_directory = log_directory,
        log_file = config.logging.file,
    );

    for (layer, zoom) in &config.zoom.overrides {
        // String formatting cannot fail
        let _ = writeln!(out, "{} = {}", layer, zoom);
    }
    out
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
