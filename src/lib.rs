//! Terrapage - streaming terrain paging with crack-free LOD stitching

pub mod core;
pub mod math;
pub mod scene;
pub mod terrain;
pub mod tile;
pub mod mesh;
pub mod streaming;
pub mod world;

pub use world::{TerrainContext, TerrainWorld};
