//! TileLayer - multi-resolution tile pyramids for map viewers
//!
//! This library is the tile engine of an interactive map viewer. It turns a
//! layer's top-level extent into an on-demand quad-tree of geographic tiles,
//! resolves each tile's imagery asynchronously from a tile registry, and
//! gates what is rendered through time and viewer-position constraints.
//!
//! # Modules
//!
//! - [`geo`], [`timespan`]: geographic boxes and time spans
//! - [`coord`]: tile identity and slippy-map math
//! - [`divider`]: per-projection child computation
//! - [`tile`]: the lazy tile tree
//! - [`imagery`]: registry lookup, decoding and caching of tile images
//! - [`activity`]: in-flight request tracking per layer
//! - [`constraint`]: visibility constraints and their pool
//! - [`layer`]: layer configuration and activation lifecycle
//! - [`config`], [`logging`]: user configuration file and log setup

pub mod activity;
pub mod config;
pub mod constraint;
pub mod coord;
pub mod divider;
pub mod geo;
pub mod imagery;
pub mod layer;
pub mod logging;
pub mod tile;
pub mod timespan;
