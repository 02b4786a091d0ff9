//! Decoding registry streams into renderer-ready images.

use std::io;
use std::sync::Arc;

use bytes::{Buf, Bytes};
use thiserror::Error;

use super::buffer_pool::BufferPool;

/// Errors that can occur while decoding a tile image.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The registry returned an empty stream.
    #[error("Empty image stream")]
    Empty,

    /// Reading the stream failed.
    #[error("Failed to read image stream: {0}")]
    Io(#[from] io::Error),

    /// The bytes are not a supported image.
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// A decoded tile image in 8-bit RGBA.
#[derive(Clone, PartialEq, Eq)]
pub struct TileImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TileImage {
    /// Size of the pixel data in bytes.
    pub fn byte_len(&self) -> usize {
        self.rgba.len()
    }
}

impl std::fmt::Debug for TileImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

/// Turns an opaque registry stream into a [`TileImage`].
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, stream: Bytes) -> Result<TileImage, DecodeError>;
}

/// Decodes any raster format the `image` crate recognises.
///
/// The stream is copied through a scratch buffer from the shared
/// [`BufferPool`]; capacities are rounded up to a power of two so tiles of
/// similar size share buffers.
#[derive(Debug, Clone)]
pub struct RasterDecoder {
    buffers: Arc<BufferPool>,
}

impl RasterDecoder {
    pub fn new(buffers: Arc<BufferPool>) -> Self {
        Self { buffers }
    }
}

impl ImageDecoder for RasterDecoder {
    fn decode(&self, stream: Bytes) -> Result<TileImage, DecodeError> {
        if stream.is_empty() {
            return Err(DecodeError::Empty);
        }

        let capacity = stream.len().next_power_of_two();
        let mut buffer = self.buffers.acquire(capacity);
        io::copy(&mut stream.reader(), &mut *buffer)?;

        let rgba = image::load_from_memory(&buffer)?.to_rgba8();
        Ok(TileImage {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        })
    }
}
