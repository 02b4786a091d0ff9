//! `tilelayer key` - bounds and children of one tile.

use clap::{Args, ValueEnum};
use tilelayer::coord::{tile_bounds, TileKey, TileProjection, MAX_ZOOM};
use tilelayer::divider::{Divider, WebMercatorDivider, Wgs84Divider};

use super::{format_tile, tile_header};
use crate::error::CliError;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProjectionArg {
    /// Spherical Web Mercator (EPSG:3857)
    WebMercator,
    /// Geographic lat/lon grid (EPSG:4326)
    Wgs84,
}

impl From<ProjectionArg> for TileProjection {
    fn from(arg: ProjectionArg) -> Self {
        match arg {
            ProjectionArg::WebMercator => TileProjection::WebMercator,
            ProjectionArg::Wgs84 => TileProjection::Wgs84,
        }
    }
}

#[derive(Debug, Args)]
pub struct KeyArgs {
    /// Tile id as <zoom>_<row>_<column>
    pub tile: String,

    /// Tiling scheme of the tile
    #[arg(long, value_enum, default_value = "web-mercator")]
    pub projection: ProjectionArg,

    /// Rows are numbered from the south edge
    #[arg(long)]
    pub tms: bool,
}

pub fn run(args: KeyArgs) -> Result<(), CliError> {
    let projection = TileProjection::from(args.projection);
    let (key, children) = describe(&args.tile, projection, args.tms)?;
    let center = key.bounds().center();

    println!("Tile:       {}", key.id());
    println!("Projection: {} ({})", projection, if args.tms { "TMS" } else { "XYZ" });
    println!("Bounds:     {}", key.bounds());
    println!("Center:     {:.6}, {:.6}", center.lat, center.lon);
    println!();

    match children {
        Some(children) => {
            println!("Children:");
            println!("{}", tile_header());
            for child in &children {
                println!("{}", format_tile(child));
            }
        }
        None => println!("No children (maximum zoom)"),
    }
    Ok(())
}

/// Resolve a tile id and the keys of its four children.
fn describe(
    id: &str,
    projection: TileProjection,
    tms: bool,
) -> Result<(TileKey, Option<[TileKey; 4]>), CliError> {
    let (zoom, row, column) = TileKey::parse_id(id)?;
    let key = TileKey::new(zoom, row, column, tile_bounds(projection, zoom, row, column, tms)?);

    let divider: Box<dyn Divider> = match projection {
        TileProjection::WebMercator => Box::new(WebMercatorDivider::new(MAX_ZOOM, tms)),
        TileProjection::Wgs84 => Box::new(Wgs84Divider::new(MAX_ZOOM, tms)),
    };
    let children = if divider.can_divide(zoom) {
        Some(divider.divide(&key)?.keys())
    } else {
        None
    };
    Ok((key, children))
}
