//! User configuration file (`~/.tilelayer/config.ini`).
//!
//! [`ConfigFile`] holds every user setting with defaults. Loading a missing
//! file yields the defaults; invalid values are reported as
//! [`ConfigFileError::InvalidValue`] naming the offending section and key.
//!
//! ```ini
//! [cache]
//! image_cache_size = 256MB
//! buffer_grace_secs = 30
//! sweep_interval_secs = 10
//!
//! [layers]
//! definitions = ~/.tilelayer/layers.json
//!
//! [zoom]
//! osm = 12
//! ```

mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    CacheSettings, ConfigFile, LayerSettings, LoggingSettings, ZoomSettings,
    DEFAULT_BUFFER_GRACE_SECS, DEFAULT_IMAGE_CACHE_SIZE, DEFAULT_SWEEP_INTERVAL_SECS,
};
pub use size::{format_size, parse_size, SizeParseError};
