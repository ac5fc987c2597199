//! Tile index buffers: stitched generation and the shared cache

pub mod stitch;
pub mod index_cache;

pub use stitch::{generate_indices, max_index_count, StitchMask};
pub use index_cache::IndexCache;
