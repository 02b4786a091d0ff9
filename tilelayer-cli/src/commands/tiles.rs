//! `tilelayer tiles` - build a layer's pyramid offline and list its tiles.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use tilelayer::config::ConfigFile;
use tilelayer::coord::TileKey;
use tilelayer::layer::{LayerConfig, LayerEvent, LayerManager, LayerState, LoggingPublisher};
use tokio::sync::mpsc;
use tracing::info;

use super::{format_tile, tile_header};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct TilesArgs {
    /// Layer definition: one JSON layer or a JSON array of layers
    #[arg(long)]
    pub layer: PathBuf,

    /// Layer to build when the file defines several
    #[arg(long)]
    pub id: Option<String>,

    /// Subdivide down to this zoom (default: the layer's minimum zoom)
    #[arg(long)]
    pub zoom: Option<u32>,
}

pub async fn run(args: TilesArgs, config: &ConfigFile) -> Result<(), CliError> {
    let mut layer = select_layer(load_layers(&args.layer)?, args.id.as_deref())?;
    config.apply_to(&mut layer);
    let name = layer.display_name().to_string();

    let keys = build_tiles(layer, args.zoom).await?;

    println!("{}", tile_header());
    for key in &keys {
        println!("{}", format_tile(key));
    }
    println!();
    println!("{} tiles for layer '{}'", keys.len(), name);
    Ok(())
}

/// Activate `layer` through the event loop, subdivide down to `zoom`, and
/// return the published tiles ordered by zoom, row and column.
pub async fn build_tiles(layer: LayerConfig, zoom: Option<u32>) -> Result<Vec<TileKey>, CliError> {
    layer.validate()?;
    let id = layer.id.clone();
    let target = zoom.unwrap_or(layer.min_zoom);
    if target > layer.effective_max_zoom() {
        return Err(CliError::Usage(format!(
            "zoom {} exceeds the maximum zoom {} of layer '{}'",
            target,
            layer.effective_max_zoom(),
            id
        )));
    }

    let manager = Arc::new(LayerManager::new(Arc::new(LoggingPublisher)));
    let (tx, rx) = mpsc::channel(4);
    let events = Arc::clone(&manager).start(rx);
    for event in [LayerEvent::Activate(Box::new(layer)), LayerEvent::EngineOpened] {
        tx.send(event)
            .await
            .map_err(|_| CliError::Usage("layer manager stopped unexpectedly".into()))?;
    }
    drop(tx);
    events
        .await
        .map_err(|e| CliError::Usage(format!("layer manager task failed: {}", e)))?;

    if manager.state(&id) != LayerState::Active {
        return Err(CliError::Usage(format!(
            "layer '{}' failed to activate, see the log for details",
            id
        )));
    }

    loop {
        let geometry = manager.geometry(&id).unwrap_or_default();
        let coarse: Vec<TileKey> = geometry
            .published
            .iter()
            .filter(|node| node.key().zoom() < target && !node.is_terminal())
            .map(|node| *node.key())
            .collect();
        if coarse.is_empty() {
            break;
        }
        for key in coarse {
            manager.divide_tile(&id, key.zoom(), key.row(), key.column())?;
        }
    }

    let mut keys: Vec<TileKey> = manager
        .geometry(&id)
        .unwrap_or_default()
        .published
        .iter()
        .map(|node| *node.key())
        .collect();
    keys.sort_by_key(|k| (k.zoom(), k.row(), k.column()));
    info!(layer = %id, tiles = keys.len(), zoom = target, "Pyramid built");
    Ok(keys)
}

fn load_layers(path: &Path) -> Result<Vec<LayerConfig>, CliError> {
    let text = fs::read_to_string(path).map_err(|error| CliError::FileRead {
        path: path.to_path_buf(),
        error,
    })?;
    Ok(LayerConfig::from_json(&text)?)
}

fn select_layer(layers: Vec<LayerConfig>, id: Option<&str>) -> Result<LayerConfig, CliError> {
    match id {
        Some(id) => layers
            .into_iter()
            .find(|layer| layer.id == id)
            .ok_or_else(|| CliError::Usage(format!("no layer '{}' in the layer file", id))),
        None => {
            let count = layers.len();
            let mut layers = layers.into_iter();
            match (layers.next(), count) {
                (Some(layer), 1) => Ok(layer),
                (None, _) => Err(CliError::Usage("the layer file defines no layers".into())),
                (Some(first), _) => {
                    let ids: Vec<String> = std::iter::once(first).chain(layers).map(|l| l.id).collect();
                    Err(CliError::Usage(format!(
                        "the layer file defines {} layers, choose one with --id ({})",
                        count,
                        ids.join(", ")
                    )))
                }
            }
        }
    }
}
