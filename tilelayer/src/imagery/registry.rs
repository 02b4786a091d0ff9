//! External tile registry interface.
//!
//! The registry is the key/value store that holds raw tile bytes (a web tile
//! server, a packaged tile database, a local cache). This crate only consumes
//! it: a query names the source, the tile family and the layer, and matches
//! the tile by its `"<zoom>_<row>_<column>"` key.

use std::io;

use bytes::Bytes;
use dashmap::DashMap;
use futures::future::FutureExt;
use thiserror::Error;

pub use futures::future::BoxFuture;

/// Errors a registry lookup can report.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The blocking read was interrupted, usually because the request was
    /// abandoned. Not a failure.
    #[error("Registry read interrupted")]
    Interrupted,

    /// I/O failure talking to the backing store.
    #[error("Registry I/O error: {0}")]
    Io(#[from] io::Error),

    /// Any other backend failure.
    #[error("Registry error: {0}")]
    Backend(String),
}

impl RegistryError {
    /// Returns true for interruptions, including I/O errors of kind
    /// [`io::ErrorKind::Interrupted`].
    pub fn is_interruption(&self) -> bool {
        match self {
            RegistryError::Interrupted => true,
            RegistryError::Io(e) => e.kind() == io::ErrorKind::Interrupted,
            RegistryError::Backend(_) => false,
        }
    }
}

/// A point lookup against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryQuery {
    /// Server or package identity.
    pub source: String,
    /// Tile family identifier.
    pub family: String,
    /// Layer name within the family.
    pub layer: String,
    /// Tile key string, `"<zoom>_<row>_<column>"`.
    pub tile_id: String,
}

/// Key/value store holding raw tile bytes.
pub trait TileRegistry: Send + Sync {
    /// Look up zero or one byte stream for the query.
    fn query<'a>(&'a self, query: &'a RegistryQuery) -> BoxFuture<'a, Result<Option<Bytes>, RegistryError>>;
}

/// In-memory registry, used by tests and offline tools.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    entries: DashMap<RegistryQuery, Bytes>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store bytes for a query, replacing any previous entry.
    pub fn insert(&self, query: RegistryQuery, data: Bytes) {
        self.entries.insert(query, data);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TileRegistry for MemoryRegistry {
    fn query<'a>(&'a self, query: &'a RegistryQuery) -> BoxFuture<'a, Result<Option<Bytes>, RegistryError>> {
        async move { Ok(self.entries.get(query).map(|e| e.value().clone())) }.boxed()
    }
}
