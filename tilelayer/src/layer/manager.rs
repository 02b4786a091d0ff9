//! Layer activation lifecycle.
//!
//! The [`LayerManager`] owns every layer's tile forest and drives each layer
//! through `Inactive -> Pending -> Active -> Inactive`. Layers activated
//! before the rendering engine is open wait in `Pending` and are built by
//! [`LayerManager::open_engine`].

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::activity::{ActivitySink, LoggingActivitySink, QueryTracker, RequestObserver};
use crate::constraint::{
    ConstraintPool, Constraints, MapProjection, MutableConstraints, TimeConstraint,
};
use crate::divider::DividerRegistry;
use crate::geo::ModelPosition;
use crate::imagery::{ImageDecoder, ImageResolver, ImageSource, TileImage, TileRegistry};
use crate::tile::TileNode;
use crate::timespan::TimeSpan;

use super::builder::{GeometryBuilder, LayerGeometry};
use super::config::LayerConfig;
use super::LayerError;

/// Lifecycle state of one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerState {
    /// Not built. Also the state of layers the manager has never seen.
    Inactive,
    /// Activation requested before the engine opened.
    Pending,
    /// Geometry built and published.
    Active,
}

/// Display properties shared with the renderer.
///
/// Changing them never rebuilds geometry.
#[derive(Debug)]
pub struct RenderProperties {
    visible: AtomicBool,
    opacity: AtomicU32,
    z_order: AtomicI32,
}

impl Default for RenderProperties {
    fn default() -> Self {
        Self {
            visible: AtomicBool::new(true),
            opacity: AtomicU32::new(1.0f32.to_bits()),
            z_order: AtomicI32::new(0),
        }
    }
}

impl RenderProperties {
    pub fn visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    /// Returns true if the value changed.
    pub fn set_visible(&self, visible: bool) -> bool {
        self.visible.swap(visible, Ordering::Relaxed) != visible
    }

    pub fn opacity(&self) -> f32 {
        f32::from_bits(self.opacity.load(Ordering::Relaxed))
    }

    /// Set the opacity, clamped to `[0, 1]`. NaN is treated as 0.
    ///
    /// Returns true if the value changed.
    pub fn set_opacity(&self, opacity: f32) -> bool {
        let opacity = if opacity.is_nan() {
            0.0
        } else {
            opacity.clamp(0.0, 1.0)
        };
        self.opacity.swap(opacity.to_bits(), Ordering::Relaxed) != opacity.to_bits()
    }

    pub fn z_order(&self) -> i32 {
        self.z_order.load(Ordering::Relaxed)
    }

    /// Returns true if the value changed.
    pub fn set_z_order(&self, z_order: i32) -> bool {
        self.z_order.swap(z_order, Ordering::Relaxed) != z_order
    }
}

/// Receives geometry changes. Implemented by the renderer.
pub trait GeometryPublisher: Send + Sync {
    /// Tiles of `layer` were added to or removed from the scene.
    fn publish(&self, layer: &str, added: &[Arc<TileNode>], removed: &[Arc<TileNode>]);

    /// A render property of `layer` changed.
    fn render_properties_changed(&self, _layer: &str, _properties: &RenderProperties) {}
}

/// Publisher that only logs. Used when no renderer is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPublisher;

impl GeometryPublisher for LoggingPublisher {
    fn publish(&self, layer: &str, added: &[Arc<TileNode>], removed: &[Arc<TileNode>]) {
        debug!(
            layer,
            added = added.len(),
            removed = removed.len(),
            "Geometry published"
        );
    }
}

/// Lifecycle requests consumed by [`LayerManager::start`].
#[derive(Debug, Clone)]
pub enum LayerEvent {
    Activate(Box<LayerConfig>),
    Deactivate(String),
    MaxZoomChanged { layer: String, max_zoom: Option<u32> },
    Visibility { layer: String, visible: bool },
    Opacity { layer: String, opacity: f32 },
    ZOrder { layer: String, z_order: i32 },
    EngineOpened,
}

#[derive(Clone)]
struct ImageServices {
    registry: Arc<dyn TileRegistry>,
    decoder: Arc<dyn ImageDecoder>,
    cache_bytes: u64,
}

struct LayerEntry {
    state: LayerState,
    config: LayerConfig,
    geometry: LayerGeometry,
    render: Arc<RenderProperties>,
    tracker: Arc<QueryTracker>,
    resolver: Option<Arc<ImageResolver>>,
    constraints: Arc<MutableConstraints>,
    max_zoom_rx: Option<watch::Receiver<Option<u32>>>,
    watcher: Option<JoinHandle<()>>,
}

/// Owns the geometry of every layer and publishes changes to the renderer.
pub struct LayerManager {
    layers: Mutex<HashMap<String, LayerEntry>>,
    engine_open: AtomicBool,
    dividers: DividerRegistry,
    constraint_pool: Arc<ConstraintPool>,
    publisher: Arc<dyn GeometryPublisher>,
    activity_sink: Arc<dyn ActivitySink>,
    images: Option<ImageServices>,
}

impl LayerManager {
    pub fn new(publisher: Arc<dyn GeometryPublisher>) -> Self {
        Self {
            layers: Mutex::new(HashMap::new()),
            engine_open: AtomicBool::new(false),
            dividers: DividerRegistry::new(),
            constraint_pool: ConstraintPool::shared(),
            publisher,
            activity_sink: Arc::new(LoggingActivitySink),
            images: None,
        }
    }

    /// Report download activity to `sink` instead of the log.
    pub fn with_activity_sink(mut self, sink: Arc<dyn ActivitySink>) -> Self {
        self.activity_sink = sink;
        self
    }

    /// Intern layer time constraints in an application-wide pool.
    pub fn with_constraint_pool(mut self, pool: Arc<ConstraintPool>) -> Self {
        self.constraint_pool = pool;
        self
    }

    /// Give every layer an image resolver backed by `registry`.
    ///
    /// # Arguments
    ///
    /// * `registry` - Raw tile store shared by all layers
    /// * `decoder` - Decoder for registry byte streams
    /// * `cache_bytes` - Per-layer decoded image cache size
    pub fn with_images(
        mut self,
        registry: Arc<dyn TileRegistry>,
        decoder: Arc<dyn ImageDecoder>,
        cache_bytes: u64,
    ) -> Self {
        self.images = Some(ImageServices {
            registry,
            decoder,
            cache_bytes,
        });
        self
    }

    pub fn is_engine_open(&self) -> bool {
        self.engine_open.load(Ordering::Acquire)
    }

    /// Mark the rendering engine open and build every pending layer.
    ///
    /// Returns the number of layers activated. Calling it again is a no-op.
    pub fn open_engine(self: &Arc<Self>) -> usize {
        if self.engine_open.swap(true, Ordering::AcqRel) {
            return 0;
        }

        let pending: Vec<LayerConfig> = self
            .layers
            .lock()
            .values()
            .filter(|entry| entry.state == LayerState::Pending)
            .map(|entry| entry.config.clone())
            .collect();

        info!(pending = pending.len(), "Engine opened");

        let mut activated = 0;
        for config in pending {
            let id = config.id.clone();
            match self.activate(config) {
                Ok(LayerState::Active) => activated += 1,
                Ok(_) => {}
                Err(e) => warn!(layer = %id, error = %e, "Failed to activate pending layer"),
            }
        }
        activated
    }

    /// Activate a layer.
    ///
    /// Before the engine is open the layer is queued as `Pending`. An already
    /// active layer is left untouched.
    ///
    /// # Errors
    ///
    /// Configuration errors and divider failures. The layer is left
    /// `Inactive` when building fails.
    pub fn activate(self: &Arc<Self>, config: LayerConfig) -> Result<LayerState, LayerError> {
        config.validate()?;
        let id = config.id.clone();

        let added = {
            let mut layers = self.layers.lock();
            let entry = match layers.entry(id.clone()) {
                Entry::Occupied(occupied) => {
                    let entry = occupied.into_mut();
                    if entry.state == LayerState::Active {
                        debug!(layer = %id, "Layer already active");
                        return Ok(LayerState::Active);
                    }
                    self.reconfigure(entry, config);
                    entry
                }
                Entry::Vacant(vacant) => vacant.insert(self.new_entry(config)),
            };

            if !self.is_engine_open() {
                entry.state = LayerState::Pending;
                debug!(layer = %id, "Engine not open, layer queued");
                return Ok(LayerState::Pending);
            }

            if let Err(e) = self.build(entry) {
                entry.state = LayerState::Inactive;
                return Err(e);
            }
            entry.geometry.published.clone()
        };

        info!(layer = %id, tiles = added.len(), "Layer activated");
        self.publisher.publish(&id, &added, &[]);
        Ok(LayerState::Active)
    }

    /// Deactivate a layer: unpublish its tiles, evict its tree, drop its
    /// image cache and divider, and stop its max-zoom watcher.
    ///
    /// Returns the state the layer was in.
    pub fn deactivate(&self, id: &str) -> Result<LayerState, LayerError> {
        let (removed, resolver) = {
            let mut layers = self.layers.lock();
            let entry = layers
                .get_mut(id)
                .ok_or_else(|| LayerError::UnknownLayer(id.to_string()))?;

            match entry.state {
                LayerState::Inactive => return Ok(LayerState::Inactive),
                LayerState::Pending => {
                    entry.state = LayerState::Inactive;
                    return Ok(LayerState::Pending);
                }
                LayerState::Active => {}
            }

            if let Some(watcher) = entry.watcher.take() {
                watcher.abort();
            }
            let geometry = std::mem::take(&mut entry.geometry);
            for root in &geometry.roots {
                root.evict();
            }
            entry.state = LayerState::Inactive;
            (geometry.published, entry.resolver.clone())
        };

        self.dividers.remove_layer(id);
        if let Some(resolver) = resolver {
            resolver.invalidate();
        }

        info!(layer = %id, tiles = removed.len(), "Layer deactivated");
        self.publisher.publish(id, &[], &removed);
        Ok(LayerState::Active)
    }

    /// Change a layer's maximum zoom override.
    ///
    /// An active layer is deactivated and rebuilt from scratch; a pending or
    /// inactive layer picks the value up on its next activation.
    ///
    /// # Errors
    ///
    /// [`LayerError::InvalidConfig`] if the override conflicts with the
    /// layer's minimum zoom. The layer is unchanged in that case.
    pub fn set_max_zoom_override(
        self: &Arc<Self>,
        id: &str,
        max_zoom: Option<u32>,
    ) -> Result<LayerState, LayerError> {
        let (config, state) = {
            let mut layers = self.layers.lock();
            let entry = layers
                .get_mut(id)
                .ok_or_else(|| LayerError::UnknownLayer(id.to_string()))?;
            if entry.config.max_zoom_user_override == max_zoom {
                return Ok(entry.state);
            }

            let mut config = entry.config.clone();
            config.max_zoom_user_override = max_zoom;
            config.validate()?;
            entry.config = config.clone();
            (config, entry.state)
        };

        info!(layer = %id, ?max_zoom, "Max zoom override changed");
        match state {
            LayerState::Active => {
                self.deactivate(id)?;
                self.activate(config)
            }
            other => Ok(other),
        }
    }

    /// Follow a layer's max-zoom preference.
    ///
    /// Once attached, the channel is authoritative: its current value is
    /// applied immediately and every later change rebuilds the layer. The
    /// watcher runs while the layer is active and needs a tokio runtime.
    pub fn observe_max_zoom(
        self: &Arc<Self>,
        id: &str,
        rx: watch::Receiver<Option<u32>>,
    ) -> Result<LayerState, LayerError> {
        let current = *rx.borrow();
        {
            let mut layers = self.layers.lock();
            let entry = layers
                .get_mut(id)
                .ok_or_else(|| LayerError::UnknownLayer(id.to_string()))?;
            if let Some(watcher) = entry.watcher.take() {
                watcher.abort();
            }
            if entry.state == LayerState::Active {
                entry.watcher = self.spawn_watcher(id.to_string(), rx.clone());
            }
            entry.max_zoom_rx = Some(rx);
        }
        self.set_max_zoom_override(id, current)
    }

    /// Show or hide a layer.
    pub fn set_visibility(&self, id: &str, visible: bool) -> Result<(), LayerError> {
        self.update_render(id, |render| render.set_visible(visible))
    }

    pub fn set_opacity(&self, id: &str, opacity: f32) -> Result<(), LayerError> {
        self.update_render(id, |render| render.set_opacity(opacity))
    }

    pub fn set_z_order(&self, id: &str, z_order: i32) -> Result<(), LayerError> {
        self.update_render(id, |render| render.set_z_order(z_order))
    }

    /// Subdivide a tile of an active layer and publish the change.
    ///
    /// A published tile is replaced by its children (footprint filtered).
    /// Dividing an already divided tile returns the existing children and
    /// publishes nothing.
    pub fn divide_tile(
        &self,
        id: &str,
        zoom: u32,
        row: u32,
        column: u32,
    ) -> Result<[Arc<TileNode>; 4], LayerError> {
        let (children, added, removed) = {
            let mut layers = self.layers.lock();
            let entry = active_entry(&mut layers, id)?;
            let node = find_node(entry, id, zoom, row, column)?;

            if let Some(children) = node.children() {
                return Ok(children);
            }
            let children = node.divide()?;

            if entry.geometry.is_published(&node) {
                let config = &entry.config;
                let added: Vec<Arc<TileNode>> = children
                    .iter()
                    .filter(|child| config.in_footprint(child.key().bounds()))
                    .cloned()
                    .collect();
                let published = &mut entry.geometry.published;
                published.retain(|p| !Arc::ptr_eq(p, &node));
                published.extend(added.iter().cloned());
                (children, added, vec![node])
            } else {
                (children, Vec::new(), Vec::new())
            }
        };

        if !added.is_empty() || !removed.is_empty() {
            self.publisher.publish(id, &added, &removed);
        }
        Ok(children)
    }

    /// Undo subdivision below a tile.
    ///
    /// Published descendants are replaced by the tile itself. Returns false
    /// if the tile was not divided.
    pub fn collapse_tile(
        &self,
        id: &str,
        zoom: u32,
        row: u32,
        column: u32,
    ) -> Result<bool, LayerError> {
        let (added, removed) = {
            let mut layers = self.layers.lock();
            let entry = active_entry(&mut layers, id)?;
            let node = find_node(entry, id, zoom, row, column)?;
            if !node.is_divided() {
                return Ok(false);
            }

            let published = &mut entry.geometry.published;
            let removed: Vec<Arc<TileNode>> = published
                .iter()
                .filter(|p| descends_from(p, &node))
                .cloned()
                .collect();
            published.retain(|p| !descends_from(p, &node));
            node.collapse();

            let added = if !removed.is_empty() && entry.config.in_footprint(node.key().bounds()) {
                published.push(Arc::clone(&node));
                vec![node]
            } else {
                Vec::new()
            };
            (added, removed)
        };

        if !added.is_empty() || !removed.is_empty() {
            self.publisher.publish(id, &added, &removed);
        }
        Ok(true)
    }

    /// Resolve the image of a tile on a background task.
    ///
    /// # Errors
    ///
    /// [`LayerError::NoImageSource`] if the manager has no tile registry.
    pub fn request_image(
        &self,
        id: &str,
        zoom: u32,
        row: u32,
        column: u32,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<Option<Arc<TileImage>>>, LayerError> {
        let (node, resolver) = {
            let mut layers = self.layers.lock();
            let entry = active_entry(&mut layers, id)?;
            let node = find_node(entry, id, zoom, row, column)?;
            let resolver = entry
                .resolver
                .clone()
                .ok_or_else(|| LayerError::NoImageSource(id.to_string()))?;
            (node, resolver)
        };
        Ok(node.spawn_resolve(resolver, cancel))
    }

    /// Published tiles of a layer that pass its visibility gates.
    ///
    /// Empty when the layer is inactive or hidden, when `time` fails the
    /// layer's time constraint, or when the viewer is outside the layer's
    /// altitude range.
    pub fn visible_tiles(
        &self,
        id: &str,
        time: &TimeSpan,
        viewer: &ModelPosition,
        projection: &dyn MapProjection,
    ) -> Vec<Arc<TileNode>> {
        let layers = self.layers.lock();
        let Some(entry) = layers.get(id) else {
            return Vec::new();
        };
        if entry.state != LayerState::Active || !entry.render.visible() {
            return Vec::new();
        }

        let constraints = entry.constraints.snapshot();
        if !constraints.check_time(time) || !constraints.check_viewer(viewer, projection) {
            return Vec::new();
        }
        entry.geometry.published.clone()
    }

    pub fn state(&self, id: &str) -> LayerState {
        self.layers
            .lock()
            .get(id)
            .map_or(LayerState::Inactive, |entry| entry.state)
    }

    pub fn config(&self, id: &str) -> Option<LayerConfig> {
        self.layers.lock().get(id).map(|entry| entry.config.clone())
    }

    /// Snapshot of a layer's geometry. Empty unless the layer is active.
    pub fn geometry(&self, id: &str) -> Option<LayerGeometry> {
        self.layers.lock().get(id).map(|entry| entry.geometry.clone())
    }

    pub fn render_properties(&self, id: &str) -> Option<Arc<RenderProperties>> {
        self.layers
            .lock()
            .get(id)
            .map(|entry| Arc::clone(&entry.render))
    }

    pub fn tracker(&self, id: &str) -> Option<Arc<QueryTracker>> {
        self.layers
            .lock()
            .get(id)
            .map(|entry| Arc::clone(&entry.tracker))
    }

    pub fn resolver(&self, id: &str) -> Option<Arc<ImageResolver>> {
        self.layers
            .lock()
            .get(id)
            .and_then(|entry| entry.resolver.clone())
    }

    /// The layer's editable constraints.
    pub fn constraints(&self, id: &str) -> Option<Arc<MutableConstraints>> {
        self.layers
            .lock()
            .get(id)
            .map(|entry| Arc::clone(&entry.constraints))
    }

    /// Ids of every layer the manager knows, sorted.
    pub fn layer_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.layers.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Start consuming lifecycle events.
    ///
    /// The task ends when every sender is dropped.
    pub fn start(self: Arc<Self>, mut rx: mpsc::Receiver<LayerEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            debug!("Layer manager started");

            while let Some(event) = rx.recv().await {
                if let Err(e) = self.process_event(event) {
                    warn!(error = %e, "Layer event failed");
                }
            }

            debug!("Layer manager stopped (channel closed)");
        })
    }

    fn process_event(self: &Arc<Self>, event: LayerEvent) -> Result<(), LayerError> {
        match event {
            LayerEvent::Activate(config) => self.activate(*config).map(drop),
            LayerEvent::Deactivate(layer) => self.deactivate(&layer).map(drop),
            LayerEvent::MaxZoomChanged { layer, max_zoom } => {
                self.set_max_zoom_override(&layer, max_zoom).map(drop)
            }
            LayerEvent::Visibility { layer, visible } => self.set_visibility(&layer, visible),
            LayerEvent::Opacity { layer, opacity } => self.set_opacity(&layer, opacity),
            LayerEvent::ZOrder { layer, z_order } => self.set_z_order(&layer, z_order),
            LayerEvent::EngineOpened => {
                self.open_engine();
                Ok(())
            }
        }
    }

    fn new_entry(&self, config: LayerConfig) -> LayerEntry {
        LayerEntry {
            state: LayerState::Inactive,
            geometry: LayerGeometry::default(),
            render: Arc::new(RenderProperties::default()),
            tracker: Arc::new(QueryTracker::new(
                config.display_name(),
                Arc::clone(&self.activity_sink),
            )),
            resolver: self.new_resolver(&config),
            constraints: Arc::new(MutableConstraints::new(self.layer_constraints(&config))),
            max_zoom_rx: None,
            watcher: None,
            config,
        }
    }

    /// Apply a new configuration to an inactive or pending entry.
    fn reconfigure(&self, entry: &mut LayerEntry, config: LayerConfig) {
        if entry.config == config {
            return;
        }
        if entry.config.display_name() != config.display_name() {
            entry.tracker = Arc::new(QueryTracker::new(
                config.display_name(),
                Arc::clone(&self.activity_sink),
            ));
        }
        entry.resolver = self.new_resolver(&config);

        let constraints = self.layer_constraints(&config);
        entry.constraints.set_time(constraints.time);
        entry.constraints.set_viewer_position(constraints.viewer_position);
        entry.config = config;
    }

    fn build(self: &Arc<Self>, entry: &mut LayerEntry) -> Result<(), LayerError> {
        let config = &entry.config;
        let divider = self
            .dividers
            .get_or_try_insert(&config.id, config.projection, || config.create_divider())?;
        let observer: Arc<dyn RequestObserver> = entry.tracker.clone();

        entry.geometry = GeometryBuilder::new(config, divider)
            .with_observer(observer)
            .build()?;
        entry.state = LayerState::Active;

        if let Some(rx) = &entry.max_zoom_rx {
            entry.watcher = self.spawn_watcher(config.id.clone(), rx.clone());
        }
        Ok(())
    }

    fn new_resolver(&self, config: &LayerConfig) -> Option<Arc<ImageResolver>> {
        self.images.as_ref().map(|images| {
            let resolver = ImageResolver::new(
                ImageSource::new(&config.source, &config.family, &config.id),
                Arc::clone(&images.registry),
                Arc::clone(&images.decoder),
                images.cache_bytes,
            );
            Arc::new(match &config.matrix {
                Some(matrix) => resolver.with_matrix(matrix.clone()),
                None => resolver,
            })
        })
    }

    fn layer_constraints(&self, config: &LayerConfig) -> Constraints {
        Constraints {
            time: config.time_span.as_ref().map(|span| {
                TimeConstraint::builder_for_span(span).basic(&self.constraint_pool)
            }),
            viewer_position: config.viewer_position,
            location: None,
        }
    }

    fn update_render(
        &self,
        id: &str,
        update: impl FnOnce(&RenderProperties) -> bool,
    ) -> Result<(), LayerError> {
        let render = self
            .render_properties(id)
            .ok_or_else(|| LayerError::UnknownLayer(id.to_string()))?;
        if update(&render) {
            debug!(
                layer = id,
                visible = render.visible(),
                opacity = render.opacity(),
                z_order = render.z_order(),
                "Render properties changed"
            );
            self.publisher.render_properties_changed(id, &render);
        }
        Ok(())
    }

    fn spawn_watcher(
        self: &Arc<Self>,
        id: String,
        mut rx: watch::Receiver<Option<u32>>,
    ) -> Option<JoinHandle<()>> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(layer = %id, "No tokio runtime, max zoom changes will not be observed");
                return None;
            }
        };
        let manager: Weak<Self> = Arc::downgrade(self);

        Some(runtime.spawn(async move {
            while rx.changed().await.is_ok() {
                let max_zoom = *rx.borrow_and_update();
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                if let Err(e) = manager.set_max_zoom_override(&id, max_zoom) {
                    warn!(layer = %id, error = %e, "Failed to apply max zoom override");
                }
            }
        }))
    }
}

impl Drop for LayerManager {
    fn drop(&mut self) {
        for entry in self.layers.get_mut().values_mut() {
            if let Some(watcher) = entry.watcher.take() {
                watcher.abort();
            }
        }
    }
}

impl std::fmt::Debug for LayerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerManager")
            .field("layers", &self.layer_ids())
            .field("engine_open", &self.is_engine_open())
            .field("dividers", &self.dividers.len())
            .finish()
    }
}

fn active_entry<'a>(
    layers: &'a mut HashMap<String, LayerEntry>,
    id: &str,
) -> Result<&'a mut LayerEntry, LayerError> {
    let entry = layers
        .get_mut(id)
        .ok_or_else(|| LayerError::UnknownLayer(id.to_string()))?;
    if entry.state != LayerState::Active {
        return Err(LayerError::NotActive(id.to_string()));
    }
    Ok(entry)
}

fn find_node(
    entry: &LayerEntry,
    id: &str,
    zoom: u32,
    row: u32,
    column: u32,
) -> Result<Arc<TileNode>, LayerError> {
    entry
        .geometry
        .find(zoom, row, column)
        .ok_or_else(|| LayerError::UnknownTile {
            layer: id.to_string(),
            tile: format!("{}_{}_{}", zoom, row, column),
        })
}

fn descends_from(node: &Arc<TileNode>, ancestor: &Arc<TileNode>) -> bool {
    let mut parent = node.parent();
    while let Some(p) = parent {
        if Arc::ptr_eq(&p, ancestor) {
            return true;
        }
        parent = p.parent();
    }
    false
}
