//! Terrain world configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::grid::PageCoord;
use crate::core::types::{Result, Vec2, Vec3};

/// Largest render level the stitch mask can encode (3-bit delta per edge).
pub const MAX_SUPPORTED_RENDER_LEVEL: u32 = 7;

/// How the renderable pool reacts when its free list runs dry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoolGrowth {
    /// Never grow; an empty free list is reported as exhaustion.
    Fixed,
    /// Grow by the current increment, then scale the increment by `factor`.
    Geometric { factor: f32 },
}

impl Default for PoolGrowth {
    fn default() -> Self {
        PoolGrowth::Geometric { factor: 1.1 }
    }
}

/// Full terrain configuration.
///
/// Sizes are in height samples; world units are obtained through `scale`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Samples per page side (2^n + 1).
    pub page_size: u32,
    /// Quads per tile side (power of two).
    pub tile_size: u32,
    /// Pages along X.
    pub world_width: u32,
    /// Pages along Z.
    pub world_height: u32,
    /// World units per sample on X, per height unit on Y (applied to the
    /// normalized 0..1 sample), per sample on Z.
    pub scale: [f32; 3],
    /// Coarsest render level; level `l` samples every `2^l` vertices.
    pub max_render_level: u32,
    /// Pages kept loaded around the camera page.
    pub max_adjacent_pages: u32,
    /// Pages kept preloaded (height data only) around the camera page.
    pub max_preload_pages: u32,
    /// Initial renderable pool size.
    pub num_renderables: usize,
    /// First growth increment of the pool.
    pub num_renderables_increment: usize,
    /// Deferred renderable loads executed per update.
    pub num_renderables_loading: usize,
    /// Squared camera movement needed before streaming is re-evaluated.
    pub camera_threshold: f32,
    /// Inner change-zone margin, in samples.
    pub change_factor: f32,
    /// Distance multiplier for LOD thresholds.
    pub lod_factor: f32,
    /// Compute per-vertex normals instead of using the up vector.
    pub vertex_normals: bool,
    /// Fill tile vertex buffers through the budgeted loading queue.
    pub deferred_renderable_loading: bool,
    /// Pool growth strategy.
    pub pool_growth: PoolGrowth,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            page_size: 257,
            tile_size: 32,
            world_width: 8,
            world_height: 8,
            scale: [1.0, 64.0, 1.0],
            max_render_level: 4,
            max_adjacent_pages: 1,
            max_preload_pages: 2,
            num_renderables: 256,
            num_renderables_increment: 32,
            num_renderables_loading: 16,
            camera_threshold: 4.0,
            change_factor: 8.0,
            lod_factor: 1.5,
            vertex_normals: true,
            deferred_renderable_loading: false,
            pool_growth: PoolGrowth::default(),
        }
    }
}

impl TerrainConfig {
    /// Parse a JSON document; missing fields fall back to defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TerrainConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Check every structural precondition of the paging engine.
    pub fn validate(&self) -> Result<()> {
        if self.world_width == 0 || self.world_height == 0 {
            return Err(Error::Config("world dimensions must be non-zero".into()));
        }
        if self.page_size < 3 || !(self.page_size - 1).is_power_of_two() {
            return Err(Error::Config(format!(
                "page_size must be 2^n+1, got {}",
                self.page_size
            )));
        }
        if !self.tile_size.is_power_of_two() {
            return Err(Error::Config(format!(
                "tile_size must be a power of two, got {}",
                self.tile_size
            )));
        }
        if (self.page_size - 1) % self.tile_size != 0 {
            return Err(Error::Config(format!(
                "page_size - 1 ({}) must be divisible by tile_size ({})",
                self.page_size - 1,
                self.tile_size
            )));
        }
        if self.max_render_level > MAX_SUPPORTED_RENDER_LEVEL {
            return Err(Error::Config(format!(
                "max_render_level {} exceeds {}",
                self.max_render_level, MAX_SUPPORTED_RENDER_LEVEL
            )));
        }
        if (1u32 << self.max_render_level) > self.tile_size {
            return Err(Error::Config(format!(
                "max_render_level {} is too coarse for tile_size {}",
                self.max_render_level, self.tile_size
            )));
        }
        if self.max_preload_pages <= self.max_adjacent_pages {
            return Err(Error::Config(
                "max_preload_pages must be larger than max_adjacent_pages".into(),
            ));
        }
        if self.scale.iter().any(|s| !(*s > 0.0)) {
            return Err(Error::Config("scale components must be positive".into()));
        }
        if self.num_renderables_loading == 0 {
            return Err(Error::Config("num_renderables_loading must be non-zero".into()));
        }
        if let PoolGrowth::Geometric { factor } = self.pool_growth {
            if !(factor >= 1.0) {
                return Err(Error::Config("pool growth factor must be >= 1".into()));
            }
        }
        Ok(())
    }

    pub fn scale(&self) -> Vec3 {
        Vec3::from_array(self.scale)
    }

    /// Tiles per page side
    pub fn num_tiles(&self) -> u32 {
        (self.page_size - 1) / self.tile_size
    }

    /// Vertices per tile side
    pub fn tile_vertices(&self) -> u32 {
        self.tile_size + 1
    }

    /// World-space XZ extent of one page
    pub fn page_extent(&self) -> Vec2 {
        let quads = (self.page_size - 1) as f32;
        Vec2::new(quads * self.scale[0], quads * self.scale[2])
    }

    /// World-space XZ extent of one tile
    pub fn tile_extent(&self) -> Vec2 {
        Vec2::new(
            self.tile_size as f32 * self.scale[0],
            self.tile_size as f32 * self.scale[2],
        )
    }

    /// World-space minimum corner of a page (y = 0)
    pub fn page_origin(&self, page: PageCoord) -> Vec3 {
        let extent = self.page_extent();
        let half_w = (self.world_width / 2) as f32;
        let half_h = (self.world_height / 2) as f32;
        Vec3::new(
            (page.x as f32 - half_w) * extent.x,
            0.0,
            (page.z as f32 - half_h) * extent.y,
        )
    }

    /// Unclamped table index of the page containing a world position
    pub fn page_index_unclamped(&self, pos: Vec3) -> (i64, i64) {
        let extent = self.page_extent();
        let x = (pos.x / extent.x).floor() as i64 + (self.world_width / 2) as i64;
        let z = (pos.z / extent.y).floor() as i64 + (self.world_height / 2) as i64;
        (x, z)
    }

    /// Page containing a world position, resolved to the nearest valid page
    pub fn page_at(&self, pos: Vec3) -> PageCoord {
        let (x, z) = self.page_index_unclamped(pos);
        PageCoord::new(
            x.clamp(0, self.world_width as i64 - 1) as u32,
            z.clamp(0, self.world_height as i64 - 1) as u32,
        )
    }

    pub fn contains_page(&self, page: PageCoord) -> bool {
        page.x < self.world_width && page.z < self.world_height
    }

    pub fn page_count(&self) -> usize {
        self.world_width as usize * self.world_height as usize
    }
}
