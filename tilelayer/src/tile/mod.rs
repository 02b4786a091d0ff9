//! Tile node tree
//!
//! A layer's imagery is a forest of [`TileNode`] quad-trees. Top-level nodes
//! come from the layer's geometry builder; everything below is created on
//! demand by [`TileNode::divide`]. Each node carries an [`ImageHandle`]
//! whose image is resolved lazily and off the render path.

mod handle;
mod node;

pub use handle::{ImageHandle, ImageState};
pub use node::TileNode;

use thiserror::Error;

use crate::divider::DividerError;

/// Errors that can occur while growing the tile tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TileError {
    /// The node is at the layer's maximum depth.
    #[error("Tile {tile} is at maximum depth and cannot be divided")]
    Terminal { tile: String },

    /// The divider rejected the tile.
    #[error("Failed to divide tile: {0}")]
    Divide(#[from] DividerError),
}
