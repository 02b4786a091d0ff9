//! Async image resolution and caching
//!
//! Fills tiles with imagery without blocking the tile tree:
//!
//! - [`TileRegistry`] is the external key/value store holding raw tile bytes.
//! - [`ImageDecoder`] turns a registry stream into a [`TileImage`];
//!   [`RasterDecoder`] delegates to the `image` crate.
//! - [`ImageResolver`] ties the two together for one layer and keeps decoded
//!   images in a size-bounded `moka` cache.
//! - [`BufferPool`] is the process-wide scratch buffer pool used while
//!   decoding, swept in the background.

mod buffer_pool;
mod decode;
mod registry;
mod resolver;

pub use buffer_pool::{BufferPool, PooledBuffer, DEFAULT_GRACE_PERIOD, DEFAULT_SWEEP_INTERVAL};
pub use decode::{DecodeError, ImageDecoder, RasterDecoder, TileImage};
pub use registry::{BoxFuture, MemoryRegistry, RegistryError, RegistryQuery, TileRegistry};
pub use resolver::{ImageResolver, ImageSource, DEFAULT_IMAGE_CACHE_BYTES};

#[cfg(test)]
pub(crate) use decode::tests::png_bytes;
#[cfg(test)]
pub(crate) use registry::tests::{Script, ScriptedRegistry};
