//! Layers
//!
//! A layer is one imagery source shown on the map: its [`LayerConfig`]
//! describes projection, zoom range and footprint; the [`GeometryBuilder`]
//! turns that into a forest of top-level tiles; the [`LayerManager`] owns
//! each layer's forest and drives it through activation, rebuilds and
//! teardown while publishing changes to the renderer.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tilelayer::coord::TileProjection;
//! use tilelayer::layer::{LayerConfig, LayerManager, LayerState, LoggingPublisher};
//!
//! let manager = Arc::new(LayerManager::new(Arc::new(LoggingPublisher)));
//! let config = LayerConfig::new("osm", TileProjection::WebMercator, 4).with_min_zoom(1);
//!
//! assert_eq!(manager.activate(config).unwrap(), LayerState::Pending);
//! manager.open_engine();
//! assert_eq!(manager.geometry("osm").unwrap().published.len(), 4);
//! ```

mod builder;
mod config;
mod manager;

pub use builder::{GeometryBuilder, LayerGeometry};
pub use config::LayerConfig;
pub use manager::{
    GeometryPublisher, LayerEvent, LayerManager, LayerState, LoggingPublisher, RenderProperties,
};

use thiserror::Error;

use crate::coord::CoordError;
use crate::divider::DividerError;
use crate::geo::GeoError;
use crate::tile::TileError;

/// Errors from layer configuration and lifecycle operations.
#[derive(Debug, Error)]
pub enum LayerError {
    #[error("Invalid configuration for layer '{layer}': {reason}")]
    InvalidConfig { layer: String, reason: String },

    #[error("Unknown layer '{0}'")]
    UnknownLayer(String),

    #[error("Layer '{0}' is not active")]
    NotActive(String),

    #[error("Layer '{layer}' has no tile {tile}")]
    UnknownTile { layer: String, tile: String },

    #[error("Layer '{0}' has no image source")]
    NoImageSource(String),

    #[error("Tile coordinate error: {0}")]
    Coord(#[from] CoordError),

    #[error("Geographic error: {0}")]
    Geo(#[from] GeoError),

    #[error("Divider error: {0}")]
    Divider(#[from] DividerError),

    #[error("Tile error: {0}")]
    Tile(#[from] TileError),

    #[error("Failed to read layer file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse layer file: {0}")]
    Json(#[from] serde_json::Error),
}
