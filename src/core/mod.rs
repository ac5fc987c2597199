//! Core engine types and utilities

pub mod types;
pub mod error;
pub mod logging;
pub mod config;
pub mod camera;
pub mod grid;

pub use types::*;
pub use error::Error;
pub use config::{PoolGrowth, TerrainConfig};
pub use camera::Camera;
pub use grid::{Direction, PageCoord, TileCoord, TileKey};
