//! Async tile image resolver with an in-memory image cache.

use std::sync::Arc;

use moka::future::Cache as MokaCache;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::coord::TileKey;
use crate::divider::TileMatrixSet;

use super::decode::{ImageDecoder, TileImage};
use super::registry::{RegistryQuery, TileRegistry};

/// Default size of a layer's decoded image cache (64 MB).
pub const DEFAULT_IMAGE_CACHE_BYTES: u64 = 64 * 1024 * 1024;

/// Where a layer's tiles live in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub source: String,
    pub family: String,
    pub layer: String,
}

impl ImageSource {
    pub fn new(source: impl Into<String>, family: impl Into<String>, layer: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            family: family.into(),
            layer: layer.into(),
        }
    }

    /// Registry query for one tile.
    pub fn query(&self, key: &TileKey) -> RegistryQuery {
        RegistryQuery {
            source: self.source.clone(),
            family: self.family.clone(),
            layer: self.layer.clone(),
            tile_id: key.id(),
        }
    }
}

/// Resolves tile keys to decoded images for one layer.
///
/// Resolution never fails from the caller's point of view: a missing tile,
/// a registry error, a decode error or a cancellation all yield `None`, and
/// the tile simply renders without imagery. Each cause is logged at its own
/// level (`debug!` for cancellation and interruption, `warn!` for decode
/// failures, `error!` for registry failures).
pub struct ImageResolver {
    source: ImageSource,
    registry: Arc<dyn TileRegistry>,
    decoder: Arc<dyn ImageDecoder>,
    cache: MokaCache<String, Arc<TileImage>>,
    matrix: Option<TileMatrixSet>,
}

impl ImageResolver {
    /// Create a resolver.
    ///
    /// # Arguments
    ///
    /// * `source` - Registry coordinates of the layer
    /// * `registry` - Backing tile store
    /// * `decoder` - Stream decoder
    /// * `cache_bytes` - Maximum decoded pixel bytes kept in memory
    pub fn new(
        source: ImageSource,
        registry: Arc<dyn TileRegistry>,
        decoder: Arc<dyn ImageDecoder>,
        cache_bytes: u64,
    ) -> Self {
        let cache = MokaCache::builder()
            .weigher(|_key: &String, image: &Arc<TileImage>| -> u32 {
                image.byte_len().min(u32::MAX as usize) as u32
            })
            .max_capacity(cache_bytes)
            .build();

        Self {
            source,
            registry,
            decoder,
            cache,
            matrix: None,
        }
    }

    /// Look partial matrix cells up under the whole cell they were cut from.
    pub fn with_matrix(mut self, matrix: TileMatrixSet) -> Self {
        self.matrix = Some(matrix);
        self
    }

    pub fn source(&self) -> &ImageSource {
        &self.source
    }

    /// Key whose registry entry holds the imagery for `key`.
    pub fn image_key(&self, key: &TileKey) -> TileKey {
        match &self.matrix {
            Some(matrix) => matrix.image_cell(key).unwrap_or(*key),
            None => *key,
        }
    }

    /// Resolve a tile's image.
    ///
    /// Returns immediately on a cache hit. Otherwise queries the registry,
    /// decodes the stream and caches the result. Cancelling `cancel` while
    /// the registry call is pending abandons it.
    pub async fn resolve(&self, key: &TileKey, cancel: &CancellationToken) -> Option<Arc<TileImage>> {
        let image_key = self.image_key(key);
        let tile_id = image_key.id();
        if let Some(hit) = self.cache.get(&tile_id).await {
            trace!(tile = %tile_id, "Image cache hit");
            return Some(hit);
        }

        let query = self.source.query(&image_key);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(tile = %tile_id, "Image resolution cancelled");
                return None;
            }
            result = self.registry.query(&query) => result,
        };

        let stream = match result {
            Ok(Some(stream)) => stream,
            Ok(None) => {
                debug!(tile = %tile_id, layer = %self.source.layer, "No image in registry");
                return None;
            }
            Err(e) if e.is_interruption() => {
                debug!(tile = %tile_id, "Image read interrupted");
                return None;
            }
            Err(e) => {
                error!(tile = %tile_id, layer = %self.source.layer, error = %e, "Image registry lookup failed");
                return None;
            }
        };

        // Decoding is CPU bound; keep it off the async workers.
        let decoder = Arc::clone(&self.decoder);
        match tokio::task::spawn_blocking(move || decoder.decode(stream)).await {
            Ok(Ok(image)) => {
                let image = Arc::new(image);
                self.cache.insert(tile_id, Arc::clone(&image)).await;
                Some(image)
            }
            Ok(Err(e)) => {
                warn!(tile = %tile_id, error = %e, "Failed to decode tile image");
                None
            }
            Err(e) => {
                warn!(tile = %tile_id, error = %e, "Tile image decode task failed");
                None
            }
        }
    }

    /// Drop every cached image for this layer.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }

    /// Number of cached images.
    pub fn cached_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Returns true if the tile's image is cached.
    pub fn is_cached(&self, key: &TileKey) -> bool {
        self.cache.contains_key(&self.image_key(key).id())
    }
}

impl std::fmt::Debug for ImageResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageResolver")
            .field("source", &self.source)
            .field("cached", &self.cache.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::mercator_key;
    use crate::imagery::buffer_pool::BufferPool;
    use crate::imagery::decode::tests::png_bytes;
    use crate::imagery::decode::RasterDecoder;
    use crate::imagery::registry::tests::{Script, ScriptedRegistry};
    use crate::divider::{Divider, MatrixDivider, TileMatrix};
    use crate::imagery::registry::MemoryRegistry;
    use bytes::Bytes;
    use std::time::Duration;

    fn source() -> ImageSource {
        ImageSource::new("osm", "xyz", "roads")
    }

    fn resolver(registry: Arc<dyn TileRegistry>) -> ImageResolver {
        let decoder = Arc::new(RasterDecoder::new(BufferPool::shared()));
        ImageResolver::new(source(), registry, decoder, DEFAULT_IMAGE_CACHE_BYTES)
    }

    #[tokio::test]
    async fn test_resolves_and_caches() {
        let key = mercator_key(1, 0, 1, false).unwrap();
        let registry = Arc::new(MemoryRegistry::new());
        registry.insert(source().query(&key), png_bytes(2, 2, [1, 2, 3, 255]));

        let resolver = resolver(registry.clone());
        let cancel = CancellationToken::new();
        let image = resolver.resolve(&key, &cancel).await.unwrap();
        assert_eq!((image.width, image.height), (2, 2));

        resolver.cache.run_pending_tasks().await;
        assert!(resolver.is_cached(&key));

        let again = resolver.resolve(&key, &cancel).await.unwrap();
        assert!(Arc::ptr_eq(&image, &again));
    }

    #[tokio::test]
    async fn test_missing_tile_is_none() {
        let resolver = resolver(Arc::new(MemoryRegistry::new()));
        let key = mercator_key(0, 0, 0, false).unwrap();
        assert!(resolver.resolve(&key, &CancellationToken::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_registry_failure_is_none() {
        let resolver = resolver(Arc::new(ScriptedRegistry::new(Script::Fail)));
        let key = mercator_key(0, 0, 0, false).unwrap();
        assert!(resolver.resolve(&key, &CancellationToken::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_interruption_is_none() {
        let resolver = resolver(Arc::new(ScriptedRegistry::new(Script::Interrupt)));
        let key = mercator_key(0, 0, 0, false).unwrap();
        assert!(resolver.resolve(&key, &CancellationToken::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_decode_failure_is_none_and_not_cached() {
        let registry = ScriptedRegistry::new(Script::Return(Some(Bytes::from_static(b"junk"))));
        let resolver = resolver(Arc::new(registry));
        let key = mercator_key(0, 0, 0, false).unwrap();
        assert!(resolver.resolve(&key, &CancellationToken::new()).await.is_none());
        resolver.cache.run_pending_tasks().await;
        assert_eq!(resolver.cached_count(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_abandons_pending_query() {
        let registry = Arc::new(ScriptedRegistry::new(Script::Delay(
            Duration::from_secs(60),
            Some(png_bytes(1, 1, [0, 0, 0, 255])),
        )));
        let resolver = resolver(registry.clone());
        let key = mercator_key(0, 0, 0, false).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), resolver.resolve(&key, &cancel))
            .await
            .expect("cancelled resolve must return promptly");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_partial_matrix_cells_share_the_cell_image() {
        let set = TileMatrixSet {
            projection: crate::coord::TileProjection::Wgs84,
            extent: crate::geo::GeoBoundingBox::world(),
            levels: vec![
                TileMatrix {
                    zoom: 0,
                    matrix_width: 2,
                    matrix_height: 2,
                },
                TileMatrix {
                    zoom: 1,
                    matrix_width: 3,
                    matrix_height: 3,
                },
            ],
        };
        let cell = set.key(1, 0, 1).unwrap();
        let registry = Arc::new(MemoryRegistry::new());
        registry.insert(source().query(&cell), png_bytes(2, 2, [7, 7, 7, 255]));
        let resolver = resolver(registry).with_matrix(set.clone());

        let divider = MatrixDivider::new(set.clone(), 1);
        let west_half = divider.divide(&set.key(0, 0, 0).unwrap()).unwrap().keys()[1];
        let east_half = divider.divide(&set.key(0, 0, 1).unwrap()).unwrap().keys()[0];
        assert_eq!(resolver.image_key(&west_half), cell);

        let cancel = CancellationToken::new();
        let first = resolver.resolve(&west_half, &cancel).await.unwrap();
        resolver.cache.run_pending_tasks().await;
        assert!(resolver.is_cached(&east_half));
        let second = resolver.resolve(&east_half, &cancel).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_decode_runs_off_the_async_worker() {
        struct ThreadRecorder {
            inner: RasterDecoder,
            thread: parking_lot::Mutex<Option<std::thread::ThreadId>>,
        }

        impl ImageDecoder for ThreadRecorder {
            fn decode(&self, stream: Bytes) -> Result<TileImage, crate::imagery::DecodeError> {
                *self.thread.lock() = Some(std::thread::current().id());
                self.inner.decode(stream)
            }
        }

        let key = mercator_key(0, 0, 0, false).unwrap();
        let registry = Arc::new(MemoryRegistry::new());
        registry.insert(source().query(&key), png_bytes(1, 1, [3, 3, 3, 255]));
        let decoder = Arc::new(ThreadRecorder {
            inner: RasterDecoder::new(BufferPool::shared()),
            thread: parking_lot::Mutex::new(None),
        });
        let resolver = ImageResolver::new(source(), registry, decoder.clone(), DEFAULT_IMAGE_CACHE_BYTES);

        assert!(resolver.resolve(&key, &CancellationToken::new()).await.is_some());
        let decoded_on = (*decoder.thread.lock()).expect("decoder ran");
        assert_ne!(decoded_on, std::thread::current().id());
    }

    #[tokio::test]
    async fn test_invalidate_clears_cache() {
        let key = mercator_key(0, 0, 0, false).unwrap();
        let registry = Arc::new(ScriptedRegistry::new(Script::Return(Some(png_bytes(
            1,
            1,
            [9, 9, 9, 255],
        )))));
        let resolver = resolver(registry.clone());
        let cancel = CancellationToken::new();

        resolver.resolve(&key, &cancel).await.unwrap();
        resolver.invalidate();
        assert!(!resolver.is_cached(&key));

        resolver.resolve(&key, &cancel).await.unwrap();
        assert_eq!(registry.calls(), 2);
    }
}
