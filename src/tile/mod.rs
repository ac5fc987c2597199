//! Tiles and the pooled renderables that draw them

pub mod vertex;
pub mod lod;
pub mod renderable;
pub mod pool;
pub mod tile;

pub use vertex::TerrainVertex;
pub use lod::LodThresholds;
pub use renderable::{Renderable, RenderableId};
pub use pool::RenderableManager;
pub use tile::Tile;
