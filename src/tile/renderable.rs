//! Pooled tile mesh.

use std::sync::Arc;

use crate::core::config::TerrainConfig;
use crate::core::grid::{Direction, TileKey};
use crate::core::types::Vec3;
use crate::math::{Aabb, BoundingSphere};
use crate::mesh::StitchMask;
use crate::terrain::HeightStore;

use super::vertex::TerrainVertex;

/// Index of a renderable in its pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderableId(pub u32);

impl RenderableId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Mesh bound to a tile while the tile is loaded.
///
/// Lifecycle: free, then in use but not loaded after `init`, then loaded once
/// its vertices are filled, then free again on release.
#[derive(Debug)]
pub struct Renderable {
    id: RenderableId,
    pub(crate) in_use: bool,
    pub(crate) is_loaded: bool,
    pub(crate) in_frustum: bool,
    /// Waiting in the deferred loading queue
    pub(crate) queued: bool,
    pub(crate) tile: Option<TileKey>,
    pub(crate) render_level: u32,
    pub(crate) neighbors: [Option<RenderableId>; 4],
    pub(crate) index_buffer: Option<Arc<[u32]>>,
    pub(crate) stitch_mask: StitchMask,
    vertices: Vec<TerrainVertex>,
    bounds: Aabb,
    sphere: BoundingSphere,
}

impl Renderable {
    pub(crate) fn new(id: RenderableId) -> Self {
        Self {
            id,
            in_use: false,
            is_loaded: false,
            in_frustum: false,
            queued: false,
            tile: None,
            render_level: 0,
            neighbors: [None; 4],
            index_buffer: None,
            stitch_mask: StitchMask::NONE,
            vertices: Vec::new(),
            bounds: Aabb::default(),
            sphere: BoundingSphere::default(),
        }
    }

    /// Bind to a tile; the renderable is in use but has no geometry yet.
    pub(crate) fn init(&mut self, tile: TileKey, level: u32) {
        self.in_use = true;
        self.is_loaded = false;
        self.in_frustum = false;
        self.queued = false;
        self.tile = Some(tile);
        self.render_level = level;
        self.neighbors = [None; 4];
        self.index_buffer = None;
        self.stitch_mask = StitchMask::NONE;
    }

    /// Return to the free state, keeping the vertex allocation for reuse.
    pub(crate) fn reset(&mut self) {
        self.in_use = false;
        self.is_loaded = false;
        self.in_frustum = false;
        self.queued = false;
        self.tile = None;
        self.neighbors = [None; 4];
        self.index_buffer = None;
        self.stitch_mask = StitchMask::NONE;
        self.vertices.clear();
    }

    /// Sample the tile's heights into the vertex buffer and recompute bounds.
    pub(crate) fn fill_vertices(&mut self, heights: &HeightStore, config: &TerrainConfig) {
        let Some(key) = self.tile else {
            return;
        };
        let t = config.tile_size;
        let side = config.tile_vertices();
        let scale = config.scale();
        let origin = config.page_origin(key.page);
        let page_quads = (config.page_size - 1) as f32;

        self.vertices.clear();
        self.vertices.reserve((side * side) as usize);
        let mut bounds = Aabb::inverted();

        for z in 0..side {
            for x in 0..side {
                let sx = key.tile.x * t + x;
                let sz = key.tile.z * t + z;
                let height = heights.height_at(key.page, sx as i64, sz as i64);
                let position = origin + Vec3::new(sx as f32 * scale.x, height, sz as f32 * scale.z);
                let normal = if config.vertex_normals {
                    heights.normal_at(key.page, sx as i64, sz as i64)
                } else {
                    Vec3::Y
                };
                let uv = [sx as f32 / page_quads, sz as f32 / page_quads];

                bounds.expand(position);
                self.vertices.push(TerrainVertex::new(position, normal, uv));
            }
        }

        self.bounds = bounds;
        self.sphere = BoundingSphere::from_aabb(&bounds);
    }

    pub fn id(&self) -> RenderableId {
        self.id
    }

    pub fn in_use(&self) -> bool {
        self.in_use
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    pub fn in_frustum(&self) -> bool {
        self.in_frustum
    }

    pub fn is_queued(&self) -> bool {
        self.queued
    }

    pub fn tile(&self) -> Option<TileKey> {
        self.tile
    }

    pub fn render_level(&self) -> u32 {
        self.render_level
    }

    pub fn neighbor(&self, dir: Direction) -> Option<RenderableId> {
        self.neighbors[dir.index()]
    }

    pub fn vertices(&self) -> &[TerrainVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> Option<&Arc<[u32]>> {
        self.index_buffer.as_ref()
    }

    pub fn stitch_mask(&self) -> StitchMask {
        self.stitch_mask
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn bounding_sphere(&self) -> &BoundingSphere {
        &self.sphere
    }

    /// Loaded, visible and carrying an index buffer
    pub fn is_drawable(&self) -> bool {
        self.in_use && self.is_loaded && self.in_frustum && self.index_buffer.is_some()
    }
}
