//! Per-tile image state.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::activity::RequestObserver;
use crate::coord::TileKey;
use crate::imagery::{ImageResolver, TileImage};

/// Resolution state of a tile's image.
#[derive(Debug, Clone)]
pub enum ImageState {
    /// Nothing requested yet.
    Unresolved,
    /// A resolution is running.
    InFlight,
    /// The image is available.
    Resolved(Arc<TileImage>),
    /// Resolution finished without an image.
    Failed,
}

impl ImageState {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ImageState::Resolved(_))
    }
}

struct HandleState {
    state: ImageState,
    generation: u64,
}

/// Lazily populated image slot of a tile node.
///
/// State moves `Unresolved -> InFlight -> Resolved | Failed`. A cancelled
/// or dropped request falls back to `Unresolved`. [`ImageHandle::invalidate`]
/// resets any state and bumps a generation counter: a resolution that
/// completes after an invalidation belongs to an older generation and its
/// result is discarded.
pub struct ImageHandle {
    key: TileKey,
    inner: Mutex<HandleState>,
}

impl ImageHandle {
    pub fn new(key: TileKey) -> Self {
        Self {
            key,
            inner: Mutex::new(HandleState {
                state: ImageState::Unresolved,
                generation: 0,
            }),
        }
    }

    /// Key used for the cache lookup.
    pub fn key(&self) -> &TileKey {
        &self.key
    }

    pub fn state(&self) -> ImageState {
        self.inner.lock().state.clone()
    }

    /// The resolved image, if any.
    pub fn image(&self) -> Option<Arc<TileImage>> {
        match &self.inner.lock().state {
            ImageState::Resolved(image) => Some(Arc::clone(image)),
            _ => None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Reset to `Unresolved` and orphan any in-flight resolution.
    pub fn invalidate(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.state = ImageState::Unresolved;
    }

    /// Resolve the image through `resolver`.
    ///
    /// Only an `Unresolved` handle issues a request; a resolved handle
    /// returns its image and an in-flight or failed handle returns `None`.
    /// When a request is issued, `observer` sees exactly one
    /// `request_started` and one `request_completed`, even if the future is
    /// dropped before it finishes. A cancelled or dropped resolution returns
    /// the handle to `Unresolved` so it can be retried.
    pub async fn resolve(
        &self,
        resolver: &ImageResolver,
        observer: Option<&dyn RequestObserver>,
        cancel: &CancellationToken,
    ) -> Option<Arc<TileImage>> {
        let generation = {
            let mut inner = self.inner.lock();
            match &inner.state {
                ImageState::Resolved(image) => return Some(Arc::clone(image)),
                ImageState::InFlight | ImageState::Failed => return None,
                ImageState::Unresolved => {}
            }
            inner.state = ImageState::InFlight;
            inner.generation
        };

        let request = InFlightRequest::start(self, observer, generation);
        let result = resolver.resolve(&self.key, cancel).await;
        request.finish(result, cancel.is_cancelled())
    }
}

/// One issued request. Reports completion and releases `InFlight` when
/// dropped, so an aborted task cannot leave the tracker or the handle stuck.
struct InFlightRequest<'a> {
    handle: &'a ImageHandle,
    observer: Option<&'a dyn RequestObserver>,
    generation: u64,
    finished: bool,
}

impl<'a> InFlightRequest<'a> {
    fn start(handle: &'a ImageHandle, observer: Option<&'a dyn RequestObserver>, generation: u64) -> Self {
        if let Some(observer) = observer {
            observer.request_started();
        }
        Self {
            handle,
            observer,
            generation,
            finished: false,
        }
    }

    fn finish(mut self, result: Option<Arc<TileImage>>, cancelled: bool) -> Option<Arc<TileImage>> {
        self.finished = true;
        let handle = self.handle;
        let key = &handle.key;
        let mut inner = handle.inner.lock();
        if inner.generation != self.generation {
            debug!(tile = %key, "Discarding image for evicted tile");
            return None;
        }
        inner.state = match &result {
            Some(image) => ImageState::Resolved(Arc::clone(image)),
            None if cancelled => ImageState::Unresolved,
            None => ImageState::Failed,
        };
        trace!(tile = %key, state = ?inner.state, "Image resolution finished");
        result
    }
}

impl Drop for InFlightRequest<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let mut inner = self.handle.inner.lock();
            if inner.generation == self.generation && matches!(inner.state, ImageState::InFlight) {
                inner.state = ImageState::Unresolved;
            }
            debug!(tile = %self.handle.key, "Image request dropped before completion");
        }
        if let Some(observer) = self.observer {
            observer.request_completed();
        }
    }
}

impl std::fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ImageHandle")
            .field("key", &self.key)
            .field("state", &inner.state)
            .field("generation", &inner.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivitySink, LoggingActivitySink, QueryTracker};
    use crate::coord::mercator_key;
    use crate::imagery::{
        png_bytes, BufferPool, ImageSource, RasterDecoder, Script, ScriptedRegistry, TileRegistry,
        DEFAULT_IMAGE_CACHE_BYTES,
    };
    use std::time::Duration;

    fn resolver(script: Script) -> Arc<ImageResolver> {
        let registry: Arc<dyn TileRegistry> = Arc::new(ScriptedRegistry::new(script));
        Arc::new(ImageResolver::new(
            ImageSource::new("osm", "xyz", "roads"),
            registry,
            Arc::new(RasterDecoder::new(BufferPool::shared())),
            DEFAULT_IMAGE_CACHE_BYTES,
        ))
    }

    fn tracker() -> QueryTracker {
        let sink: Arc<dyn ActivitySink> = Arc::new(LoggingActivitySink);
        QueryTracker::new("Roads", sink)
    }

    fn handle() -> ImageHandle {
        ImageHandle::new(mercator_key(0, 0, 0, false).unwrap())
    }

    #[tokio::test]
    async fn test_resolve_success() {
        let resolver = resolver(Script::Return(Some(png_bytes(1, 1, [1, 1, 1, 255]))));
        let tracker = tracker();
        let handle = handle();

        let image = handle
            .resolve(&resolver, Some(&tracker), &CancellationToken::new())
            .await;
        assert!(image.is_some());
        assert!(handle.state().is_resolved());
        assert_eq!(tracker.count(), 0);
        assert!(!tracker.is_active());
    }

    #[tokio::test]
    async fn test_missing_image_fails_and_does_not_retry() {
        let registry = Arc::new(ScriptedRegistry::new(Script::Return(None)));
        let dyn_registry: Arc<dyn TileRegistry> = registry.clone();
        let resolver = ImageResolver::new(
            ImageSource::new("osm", "xyz", "roads"),
            dyn_registry,
            Arc::new(RasterDecoder::new(BufferPool::shared())),
            DEFAULT_IMAGE_CACHE_BYTES,
        );
        let handle = handle();
        let cancel = CancellationToken::new();

        assert!(handle.resolve(&resolver, None, &cancel).await.is_none());
        assert!(matches!(handle.state(), ImageState::Failed));
        assert!(handle.resolve(&resolver, None, &cancel).await.is_none());
        assert_eq!(registry.calls(), 1);

        handle.invalidate();
        assert!(matches!(handle.state(), ImageState::Unresolved));
        handle.resolve(&resolver, None, &cancel).await;
        assert_eq!(registry.calls(), 2);
    }

    #[tokio::test]
    async fn test_late_result_after_invalidate_is_discarded() {
        let resolver = resolver(Script::Delay(
            Duration::from_millis(50),
            Some(png_bytes(1, 1, [5, 5, 5, 255])),
        ));
        let handle = Arc::new(handle());
        let tracker = Arc::new(tracker());

        let task = {
            let handle = Arc::clone(&handle);
            let resolver = Arc::clone(&resolver);
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move {
                handle
                    .resolve(&resolver, Some(&*tracker), &CancellationToken::new())
                    .await
            })
        };

        // Let the request start, then evict.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(matches!(handle.state(), ImageState::InFlight));
        assert_eq!(tracker.count(), 1);
        handle.invalidate();

        assert!(task.await.unwrap().is_none());
        assert!(matches!(handle.state(), ImageState::Unresolved));
        assert_eq!(tracker.count(), 0);
    }

    #[tokio::test]
    async fn test_aborted_resolve_releases_tracker_and_handle() {
        let resolver = resolver(Script::Delay(
            Duration::from_millis(200),
            Some(png_bytes(1, 1, [8, 8, 8, 255])),
        ));
        let handle = Arc::new(handle());
        let tracker = Arc::new(tracker());

        let task = {
            let handle = Arc::clone(&handle);
            let resolver = Arc::clone(&resolver);
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move {
                handle
                    .resolve(&resolver, Some(&*tracker), &CancellationToken::new())
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(tracker.count(), 1);
        assert!(tracker.is_active());

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert_eq!(tracker.count(), 0);
        assert!(!tracker.is_active());
        assert!(matches!(handle.state(), ImageState::Unresolved));

        // The tile can be requested again.
        let retry = handle
            .resolve(&resolver, Some(&*tracker), &CancellationToken::new())
            .await;
        assert!(retry.is_some());
        assert_eq!(tracker.count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_returns_to_unresolved() {
        let resolver = resolver(Script::Delay(Duration::from_secs(60), None));
        let handle = handle();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(handle.resolve(&resolver, None, &cancel).await.is_none());
        assert!(matches!(handle.state(), ImageState::Unresolved));
    }
}
