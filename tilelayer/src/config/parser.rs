//! INI parsing: `Ini` → [`ConfigFile`].
//!
//! The single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::parse_size;
use crate::coord::MAX_ZOOM;

/// Overlay the values found in `ini` on the defaults.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [cache]
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("image_cache_size") {
            config.cache.image_cache_size =
                parse_size(v).map_err(|_| invalid("cache", "image_cache_size", v, SIZE_HINT))?;
        }
        if let Some(secs) = parse_number::<u64>(section, "cache", "buffer_grace_secs")? {
            config.cache.buffer_grace_secs = secs;
        }
        if let Some(secs) = parse_number::<u64>(section, "cache", "sweep_interval_secs")? {
            if secs == 0 {
                return Err(invalid(
                    "cache",
                    "sweep_interval_secs",
                    "0",
                    "must be at least 1 second",
                ));
            }
            config.cache.sweep_interval_secs = secs;
        }
    }

    // [layers]
    if let Some(section) = ini.section(Some("layers")) {
        config.layers.definitions = non_empty(section, "definitions").map(expand_tilde);
    }

    // [zoom]: every key is a layer id
    if let Some(section) = ini.section(Some("zoom")) {
        for (layer, v) in section.iter() {
            let zoom: u32 = v
                .trim()
                .parse()
                .map_err(|_| invalid("zoom", layer, v, "expected a zoom level"))?;
            if zoom > MAX_ZOOM {
                return Err(invalid(
                    "zoom",
                    layer,
                    v,
                    &format!("must be at most {}", MAX_ZOOM),
                ));
            }
            config.zoom.overrides.insert(layer.to_string(), zoom);
        }
    }

    // [logging]
    if let Some(section) = ini.section(Some("logging")) {
        config.logging.directory = non_empty(section, "directory").map(expand_tilde);
        if let Some(file) = non_empty(section, "file") {
            config.logging.file = file.to_string();
        }
    }

    Ok(config)
}

const SIZE_HINT: &str = "expected format like '256MB', '1GB', or '512KB'";

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigFileError> {
    section
        .get(key)
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| invalid(section_name, key, v, "expected a whole number"))
        })
        .transpose()
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");
        std::fs::write(&path, content).unwrap();
        ConfigFile::load_from(&path)
    }

    #[test]
    fn test_full_file() {
        let config = load(
            r#"
[cache]
image_cache_size = 32MB
buffer_grace_secs = 5
sweep_interval_secs = 2

[layers]
definitions = /srv/tiles/layers.json

[zoom]
osm = 11
blue_marble = 5

[logging]
file = engine.log
"#,
        )
        .unwrap();

        assert_eq!(config.cache.image_cache_size, 32 * 1024 * 1024);
        assert_eq!(config.cache.buffer_grace_secs, 5);
        assert_eq!(config.cache.sweep_interval_secs, 2);
        assert_eq!(
            config.layers.definitions,
            Some(PathBuf::from("/srv/tiles/layers.json"))
        );
        assert_eq!(config.max_zoom_override("osm"), Some(11));
        assert_eq!(config.max_zoom_override("blue_marble"), Some(5));
        assert_eq!(config.logging.file, "engine.log");
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = load("[zoom]\nosm = 3\n").unwrap();
        assert_eq!(config.cache, ConfigFile::default().cache);
        assert_eq!(config.max_zoom_override("osm"), Some(3));
    }

    #[test]
    fn test_invalid_cache_size() {
        let err = load("[cache]\nimage_cache_size = lots\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue {
                section, key, value, ..
            } => {
                assert_eq!(section, "cache");
                assert_eq!(key, "image_cache_size");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        assert!(matches!(
            load("[cache]\nsweep_interval_secs = 0\n"),
            Err(ConfigFileError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_zoom_out_of_range() {
        assert!(matches!(
            load("[zoom]\nosm = 40\n"),
            Err(ConfigFileError::InvalidValue { .. })
        ));
        assert!(matches!(
            load("[zoom]\nosm = high\n"),
            Err(ConfigFileError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/layers.json"), home.join("layers.json"));
        }
    }
}
