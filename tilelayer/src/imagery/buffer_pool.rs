//! Shared byte-buffer pool.
//!
//! Decoding a tile copies the registry stream into a scratch buffer. Tiles
//! of one layer tend to be the same size, so buffers are pooled by requested
//! capacity and handed back out instead of being reallocated. Released
//! buffers are not freed straight away; a background sweep reclaims them
//! once they have been idle for the grace period.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Default time a released buffer may sit idle before it is reclaimed.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Default interval between background sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

struct IdleBuffer {
    buffer: Vec<u8>,
    released_at: Instant,
}

/// Pool of reusable byte buffers keyed by requested capacity.
///
/// Shared by every layer through an `Arc<BufferPool>` created once by the
/// application.
pub struct BufferPool {
    idle: Mutex<HashMap<usize, Vec<IdleBuffer>>>,
    grace_period: Duration,
}

impl BufferPool {
    /// Create a pool that keeps idle buffers for `grace_period`.
    pub fn new(grace_period: Duration) -> Self {
        Self {
            idle: Mutex::new(HashMap::new()),
            grace_period,
        }
    }

    /// Create a pool with the default grace period behind a shared handle.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new(DEFAULT_GRACE_PERIOD))
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Take a cleared buffer with at least `capacity` bytes of capacity.
    ///
    /// The buffer returns to the pool when the guard is dropped.
    pub fn acquire(self: &Arc<Self>, capacity: usize) -> PooledBuffer {
        let reused = self
            .idle
            .lock()
            .get_mut(&capacity)
            .and_then(|stack| stack.pop());

        let buffer = match reused {
            Some(idle) => {
                trace!(capacity, "Reusing pooled buffer");
                idle.buffer
            }
            None => Vec::with_capacity(capacity),
        };

        PooledBuffer {
            buffer,
            capacity,
            pool: Arc::clone(self),
        }
    }

    fn release(&self, capacity: usize, mut buffer: Vec<u8>) {
        buffer.clear();
        self.idle
            .lock()
            .entry(capacity)
            .or_default()
            .push(IdleBuffer {
                buffer,
                released_at: Instant::now(),
            });
    }

    /// Drop every buffer idle since before `now - grace_period`.
    ///
    /// Returns the number of buffers reclaimed.
    pub fn sweep_idle(&self, now: Instant) -> usize {
        let mut idle = self.idle.lock();
        let mut reclaimed = 0;
        idle.retain(|_, stack| {
            let before = stack.len();
            stack.retain(|b| now.saturating_duration_since(b.released_at) < self.grace_period);
            reclaimed += before - stack.len();
            !stack.is_empty()
        });
        if reclaimed > 0 {
            debug!(reclaimed, "Reclaimed idle buffers");
        }
        reclaimed
    }

    /// Number of buffers waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().values().map(Vec::len).sum()
    }

    /// Capacity held by idle buffers, in bytes.
    pub fn idle_bytes(&self) -> usize {
        self.idle
            .lock()
            .values()
            .flat_map(|stack| stack.iter().map(|b| b.buffer.capacity()))
            .sum()
    }

    /// Run [`BufferPool::sweep_idle`] every `interval` until `cancel` fires.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Buffer pool sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        pool.sweep_idle(Instant::now());
                        tokio::task::yield_now().await;
                    }
                }
            }
        })
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_PERIOD)
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("grace_period", &self.grace_period)
            .field("idle_count", &self.idle_count())
            .finish()
    }
}

/// A buffer on loan from a [`BufferPool`].
pub struct PooledBuffer {
    buffer: Vec<u8>,
    capacity: usize,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let buffer = std::mem::take(&mut self.buffer);
        self.pool.release(self.capacity, buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_released_buffer_is_reused() {
        let pool = BufferPool::shared();
        let ptr = {
            let mut buf = pool.acquire(1024);
            buf.extend_from_slice(b"hello");
            buf.as_ptr()
        };
        assert_eq!(pool.idle_count(), 1);

        let buf = pool.acquire(1024);
        assert_eq!(buf.as_ptr(), ptr);
        assert!(buf.is_empty());
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_keyed_by_capacity() {
        let pool = BufferPool::shared();
        drop(pool.acquire(1024));
        let other = pool.acquire(2048);
        assert!(other.capacity() >= 2048);
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_sweep_respects_grace_period() {
        let pool = Arc::new(BufferPool::new(Duration::from_secs(30)));
        drop(pool.acquire(64));
        drop(pool.acquire(128));
        assert_eq!(pool.idle_count(), 2);
        assert!(pool.idle_bytes() >= 192);

        assert_eq!(pool.sweep_idle(Instant::now()), 0);
        assert_eq!(pool.idle_count(), 2);

        let later = Instant::now() + Duration::from_secs(31);
        assert_eq!(pool.sweep_idle(later), 2);
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn test_sweeper_reclaims_and_stops() {
        let pool = Arc::new(BufferPool::new(Duration::ZERO));
        drop(pool.acquire(256));

        let cancel = CancellationToken::new();
        let handle = pool.spawn_sweeper(Duration::from_millis(10), cancel.clone());

        tokio::time::timeout(Duration::from_secs(2), async {
            while pool.idle_count() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("sweeper should reclaim idle buffer");

        cancel.cancel();
        handle.await.unwrap();
    }
}
