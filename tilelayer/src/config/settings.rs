//! Settings structs and their defaults.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::imagery::{
    BufferPool, DEFAULT_GRACE_PERIOD, DEFAULT_IMAGE_CACHE_BYTES, DEFAULT_SWEEP_INTERVAL,
};
use crate::layer::LayerConfig;
use crate::logging::DEFAULT_LOG_FILE;

pub const DEFAULT_IMAGE_CACHE_SIZE: usize = DEFAULT_IMAGE_CACHE_BYTES as usize;
pub const DEFAULT_BUFFER_GRACE_SECS: u64 = DEFAULT_GRACE_PERIOD.as_secs();
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = DEFAULT_SWEEP_INTERVAL.as_secs();

/// All user settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub layers: LayerSettings,
    pub zoom: ZoomSettings,
    pub logging: LoggingSettings,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Decoded image cache per layer, in bytes.
    pub image_cache_size: usize,
    /// How long released decode buffers stay pooled.
    pub buffer_grace_secs: u64,
    /// How often idle buffers are swept.
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            image_cache_size: DEFAULT_IMAGE_CACHE_SIZE,
            buffer_grace_secs: DEFAULT_BUFFER_GRACE_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl CacheSettings {
    pub fn buffer_grace_period(&self) -> Duration {
        Duration::from_secs(self.buffer_grace_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Per-layer image cache size as the resolver expects it.
    pub fn image_cache_bytes(&self) -> u64 {
        self.image_cache_size as u64
    }

    /// Create a decode buffer pool with these settings and start its sweeper.
    ///
    /// Must be called from within a tokio runtime. The sweeper stops when
    /// `cancel` fires.
    pub fn spawn_buffer_pool(&self, cancel: CancellationToken) -> (Arc<BufferPool>, JoinHandle<()>) {
        let pool = Arc::new(BufferPool::new(self.buffer_grace_period()));
        let sweeper = pool.spawn_sweeper(self.sweep_interval(), cancel);
        (pool, sweeper)
    }
}

/// `[layers]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerSettings {
    /// JSON file listing the layer definitions.
    pub definitions: Option<PathBuf>,
}

/// `[zoom]` section: per-layer maximum zoom overrides keyed by layer id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoomSettings {
    pub overrides: BTreeMap<String, u32>,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log directory. Defaults to the config directory.
    pub directory: Option<PathBuf>,
    pub file: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: None,
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl ConfigFile {
    /// The user's maximum zoom override for a layer.
    pub fn max_zoom_override(&self, layer_id: &str) -> Option<u32> {
        self.zoom.overrides.get(layer_id).copied()
    }

    /// Apply the user's zoom override, if any, to a layer configuration.
    pub fn apply_to(&self, layer: &mut LayerConfig) {
        if let Some(max_zoom) = self.max_zoom_override(&layer.id) {
            layer.max_zoom_user_override = Some(max_zoom);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileProjection;

    #[test]
    fn test_defaults_match_engine() {
        let config = ConfigFile::default();
        assert_eq!(config.cache.image_cache_size as u64, DEFAULT_IMAGE_CACHE_BYTES);
        assert_eq!(config.cache.buffer_grace_period(), DEFAULT_GRACE_PERIOD);
        assert_eq!(config.cache.sweep_interval(), DEFAULT_SWEEP_INTERVAL);
        assert!(config.layers.definitions.is_none());
        assert_eq!(config.logging.file, "tilelayer.log");
    }

    #[tokio::test]
    async fn test_spawn_buffer_pool_uses_grace_period() {
        let settings = CacheSettings {
            buffer_grace_secs: 5,
            ..CacheSettings::default()
        };
        let cancel = CancellationToken::new();
        let (pool, sweeper) = settings.spawn_buffer_pool(cancel.clone());
        assert_eq!(pool.grace_period(), Duration::from_secs(5));

        cancel.cancel();
        sweeper.await.unwrap();
    }

    #[test]
    fn test_apply_zoom_override() {
        let mut config = ConfigFile::default();
        config.zoom.overrides.insert("osm".into(), 6);

        let mut osm = LayerConfig::new("osm", TileProjection::WebMercator, 12);
        config.apply_to(&mut osm);
        assert_eq!(osm.effective_max_zoom(), 6);

        let mut other = LayerConfig::new("topo", TileProjection::WebMercator, 12);
        config.apply_to(&mut other);
        assert_eq!(other.max_zoom_user_override, None);
    }
}
