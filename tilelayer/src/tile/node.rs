//! Lazy quad-tree of tiles.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::activity::RequestObserver;
use crate::coord::TileKey;
use crate::divider::Divider;
use crate::imagery::{ImageResolver, TileImage};

use super::handle::ImageHandle;
use super::TileError;

/// One tile of a layer's pyramid.
///
/// Children are created on demand by [`TileNode::divide`] through the
/// layer's shared [`Divider`]. Parents own their children; children hold a
/// weak reference back, so dropping a layer's roots frees the whole tree.
pub struct TileNode {
    key: TileKey,
    parent: Weak<TileNode>,
    depth: u32,
    children: Mutex<Option<[Arc<TileNode>; 4]>>,
    divider: Option<Arc<dyn Divider>>,
    observer: Option<Arc<dyn RequestObserver>>,
    image: ImageHandle,
}

impl TileNode {
    /// Create a top-level node.
    ///
    /// # Arguments
    ///
    /// * `key` - Tile identity and bounds
    /// * `divider` - Layer divider, `None` for a node that never subdivides
    /// * `observer` - Receives the image requests of this node and all of its
    ///   descendants
    pub fn new_root(
        key: TileKey,
        divider: Option<Arc<dyn Divider>>,
        observer: Option<Arc<dyn RequestObserver>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            key,
            parent: Weak::new(),
            depth: 0,
            children: Mutex::new(None),
            divider,
            observer,
            image: ImageHandle::new(key),
        })
    }

    pub fn key(&self) -> &TileKey {
        &self.key
    }

    /// The parent node, if this is not a root and the parent is still alive.
    pub fn parent(&self) -> Option<Arc<TileNode>> {
        self.parent.upgrade()
    }

    /// Generations below the root this node was created at.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn children(&self) -> Option<[Arc<TileNode>; 4]> {
        self.children.lock().clone()
    }

    pub fn is_divided(&self) -> bool {
        self.children.lock().is_some()
    }

    /// Returns true if this node can never be divided.
    pub fn is_terminal(&self) -> bool {
        self.divider.is_none()
    }

    pub fn divider(&self) -> Option<&Arc<dyn Divider>> {
        self.divider.as_ref()
    }

    pub fn image(&self) -> &ImageHandle {
        &self.image
    }

    /// Create this node's four children.
    ///
    /// Children share this node's divider unless they are at the divider's
    /// maximum zoom, in which case they are terminal. They inherit this
    /// node's request observer. Calling `divide` again returns the same
    /// children.
    ///
    /// # Errors
    ///
    /// [`TileError::Terminal`] for terminal nodes and [`TileError::Divide`]
    /// when the divider rejects the tile. The tree is unchanged on error.
    pub fn divide(self: &Arc<Self>) -> Result<[Arc<TileNode>; 4], TileError> {
        let mut children = self.children.lock();
        if let Some(existing) = children.as_ref() {
            return Ok(existing.clone());
        }

        let divider = self.divider.as_ref().ok_or(TileError::Terminal {
            tile: self.key.id(),
        })?;
        let division = divider.divide(&self.key)?;

        let made = division.keys().map(|key| {
            let child_divider = divider
                .can_divide(key.zoom())
                .then(|| Arc::clone(divider));
            Arc::new(TileNode {
                key,
                parent: Arc::downgrade(self),
                depth: self.depth + 1,
                children: Mutex::new(None),
                divider: child_divider,
                observer: self.observer.clone(),
                image: ImageHandle::new(key),
            })
        });

        trace!(tile = %self.key, zoom = division.zoom, "Divided tile");
        *children = Some(made.clone());
        Ok(made)
    }

    /// Discard this node's children and evict their images.
    ///
    /// Returns the removed children.
    pub fn collapse(&self) -> Option<[Arc<TileNode>; 4]> {
        let removed = self.children.lock().take();
        if let Some(children) = &removed {
            for child in children {
                child.evict();
            }
        }
        removed
    }

    /// Invalidate the images of this node and all descendants.
    pub fn evict(&self) {
        self.image.invalidate();
        if let Some(children) = self.children() {
            for child in &children {
                child.evict();
            }
        }
    }

    /// Undivided descendants of this node (the node itself if undivided),
    /// depth first.
    pub fn leaves(self: &Arc<Self>) -> Vec<Arc<TileNode>> {
        let mut leaves = Vec::new();
        let mut stack = vec![Arc::clone(self)];
        while let Some(node) = stack.pop() {
            match node.children() {
                Some(children) => stack.extend(children.into_iter().rev()),
                None => leaves.push(node),
            }
        }
        leaves
    }

    /// Divide repeatedly until every leaf is at `zoom` or terminal.
    ///
    /// Returns the resulting leaves.
    pub fn subdivide_to(self: &Arc<Self>, zoom: u32) -> Result<Vec<Arc<TileNode>>, TileError> {
        if self.key.zoom() >= zoom || self.is_terminal() {
            return Ok(vec![Arc::clone(self)]);
        }
        let mut leaves = Vec::with_capacity(4);
        for child in self.divide()? {
            leaves.extend(child.subdivide_to(zoom)?);
        }
        Ok(leaves)
    }

    /// Find a descendant (or this node) by `(zoom, row, column)`.
    pub fn find(self: &Arc<Self>, zoom: u32, row: u32, column: u32) -> Option<Arc<TileNode>> {
        if self.key.same_tile(zoom, row, column) {
            return Some(Arc::clone(self));
        }
        if zoom <= self.key.zoom() {
            return None;
        }
        self.children()?
            .iter()
            .find_map(|child| child.find(zoom, row, column))
    }

    /// Resolve this node's image, reporting to the node's observer.
    pub async fn resolve_image(
        &self,
        resolver: &ImageResolver,
        cancel: &CancellationToken,
    ) -> Option<Arc<TileImage>> {
        self.image
            .resolve(resolver, self.observer.as_deref(), cancel)
            .await
    }

    /// Resolve this node's image on a background task.
    ///
    /// The tree never waits on the returned handle; the image shows up in
    /// [`TileNode::image`] once resolved.
    pub fn spawn_resolve(
        self: &Arc<Self>,
        resolver: Arc<ImageResolver>,
        cancel: CancellationToken,
    ) -> JoinHandle<Option<Arc<TileImage>>> {
        let node = Arc::clone(self);
        tokio::spawn(async move { node.resolve_image(&resolver, &cancel).await })
    }
}

impl std::fmt::Debug for TileNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileNode")
            .field("key", &self.key)
            .field("depth", &self.depth)
            .field("divided", &self.is_divided())
            .field("terminal", &self.is_terminal())
            .finish()
    }
}
