//! Per-layer divider registry.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::coord::TileProjection;

use super::Divider;

type DividerKey = (String, TileProjection);

/// Shares one divider instance per `(layer, projection)` pair.
///
/// Lookups are lock-free for readers; creation runs at most once per key.
#[derive(Debug, Default)]
pub struct DividerRegistry {
    dividers: DashMap<DividerKey, Arc<dyn Divider>>,
}

impl DividerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the divider for a layer, creating it with `create` on first use.
    ///
    /// # Errors
    ///
    /// Propagates the error from `create`; nothing is registered in that case.
    pub fn get_or_try_insert<E>(
        &self,
        layer_id: &str,
        projection: TileProjection,
        create: impl FnOnce() -> Result<Arc<dyn Divider>, E>,
    ) -> Result<Arc<dyn Divider>, E> {
        let key = (layer_id.to_string(), projection);
        if let Some(existing) = self.dividers.get(&key) {
            return Ok(Arc::clone(existing.value()));
        }
        let entry = self.dividers.entry(key).or_try_insert_with(|| {
            debug!(layer = layer_id, %projection, "Creating divider");
            create()
        })?;
        Ok(Arc::clone(entry.value()))
    }

    /// Registered divider for a layer, if any.
    pub fn get(&self, layer_id: &str, projection: TileProjection) -> Option<Arc<dyn Divider>> {
        self.dividers
            .get(&(layer_id.to_string(), projection))
            .map(|d| Arc::clone(d.value()))
    }

    /// Drop every divider registered for `layer_id`.
    pub fn remove_layer(&self, layer_id: &str) -> usize {
        let before = self.dividers.len();
        self.dividers.retain(|(id, _), _| id != layer_id);
        before - self.dividers.len()
    }

    pub fn len(&self) -> usize {
        self.dividers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dividers.is_empty()
    }
}
