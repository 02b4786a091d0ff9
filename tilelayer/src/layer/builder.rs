//! Top-level tile construction for a layer.

use std::sync::Arc;

use tracing::debug;

use crate::activity::RequestObserver;
use crate::coord::{mercator_key, TileKey, TileProjection};
use crate::divider::Divider;
use crate::geo::GeoBoundingBox;
use crate::tile::TileNode;

use super::config::LayerConfig;
use super::LayerError;

/// A layer's tile forest: the roots that own the trees, and the nodes
/// currently handed to the renderer.
#[derive(Debug, Clone, Default)]
pub struct LayerGeometry {
    pub roots: Vec<Arc<TileNode>>,
    pub published: Vec<Arc<TileNode>>,
}

impl LayerGeometry {
    /// Node anywhere in the forest with the given identity.
    pub fn find(&self, zoom: u32, row: u32, column: u32) -> Option<Arc<TileNode>> {
        self.roots.iter().find_map(|root| root.find(zoom, row, column))
    }

    pub fn is_published(&self, node: &Arc<TileNode>) -> bool {
        self.published.iter().any(|p| Arc::ptr_eq(p, node))
    }
}

/// Builds the initial geometry of a layer.
pub struct GeometryBuilder<'a> {
    config: &'a LayerConfig,
    divider: Arc<dyn Divider>,
    observer: Option<Arc<dyn RequestObserver>>,
}

impl<'a> GeometryBuilder<'a> {
    pub fn new(config: &'a LayerConfig, divider: Arc<dyn Divider>) -> Self {
        Self {
            config,
            divider,
            observer: None,
        }
    }

    /// Report image requests of every built node to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Keys of the layer's top-level tiles, footprint filtered.
    ///
    /// - Web Mercator: every tile at zoom `log4(top_level_count)`.
    /// - WGS84: `top_level_count` equal columns spanning the globe at zoom 0.
    /// - Tile matrix: every cell of the first matrix level.
    pub fn top_level_keys(&self) -> Result<Vec<TileKey>, LayerError> {
        let config = self.config;
        config.validate()?;

        let keys = match (&config.matrix, config.projection) {
            (Some(matrix), _) => {
                let level = matrix.first_level().ok_or_else(|| LayerError::InvalidConfig {
                    layer: config.id.clone(),
                    reason: "matrix has no levels".into(),
                })?;
                let mut keys = Vec::with_capacity((level.matrix_width * level.matrix_height) as usize);
                for row in 0..level.matrix_height {
                    for column in 0..level.matrix_width {
                        keys.push(matrix.key(level.zoom, row, column)?);
                    }
                }
                keys
            }
            (None, TileProjection::WebMercator) => {
                let zoom = config.root_zoom();
                let n = 1u32 << zoom;
                let mut keys = Vec::with_capacity((n * n) as usize);
                for row in 0..n {
                    for column in 0..n {
                        keys.push(mercator_key(zoom, row, column, config.is_tms)?);
                    }
                }
                keys
            }
            (None, TileProjection::Wgs84) => {
                let count = config.top_level_count;
                let width = 360.0 / count as f64;
                (0..count)
                    .map(|column| -> Result<TileKey, LayerError> {
                        let west = -180.0 + column as f64 * width;
                        let east = if column + 1 == count { 180.0 } else { west + width };
                        let bounds = GeoBoundingBox::from_edges(-90.0, west, 90.0, east)?;
                        Ok(TileKey::new(0, 0, column, bounds))
                    })
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(keys
            .into_iter()
            .filter(|key| config.in_footprint(key.bounds()))
            .collect())
    }

    /// Build the root nodes and pre-subdivide them down to the layer's
    /// minimum zoom.
    pub fn build(&self) -> Result<LayerGeometry, LayerError> {
        let mut geometry = LayerGeometry::default();
        for key in self.top_level_keys()? {
            let divider = self
                .divider
                .can_divide(key.zoom())
                .then(|| Arc::clone(&self.divider));
            let root = TileNode::new_root(key, divider, self.observer.clone());

            let leaves = root.subdivide_to(self.config.min_zoom)?;
            geometry
                .published
                .extend(leaves.into_iter().filter(|n| self.config.in_footprint(n.key().bounds())));
            geometry.roots.push(root);
        }

        debug!(
            layer = %self.config.id,
            roots = geometry.roots.len(),
            published = geometry.published.len(),
            "Built layer geometry"
        );
        Ok(geometry)
    }
}
