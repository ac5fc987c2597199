//! Explicit world context: everything the streaming engine shares, built once
//! per world and passed by reference.

use std::collections::HashSet;

use crate::core::camera::Camera;
use crate::core::config::TerrainConfig;
use crate::core::grid::{PageCoord, TileCoord, TileKey};
use crate::core::types::{Result, Vec3};
use crate::math::BoundingSphere;
use crate::mesh::IndexCache;
use crate::scene::SceneHost;
use crate::streaming::{LoadAction, PageManager, PageState, StreamingStats};
use crate::terrain::{HeightStore, PageDataSource};
use crate::tile::{Renderable, RenderableManager};

/// Shared state of one terrain world.
pub struct TerrainContext {
    pub config: TerrainConfig,
    pub heights: HeightStore,
    pub pool: RenderableManager,
    pub index_cache: IndexCache,
}

impl TerrainContext {
    pub fn new(config: TerrainConfig, source: Box<dyn PageDataSource>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            heights: HeightStore::new(&config, source),
            pool: RenderableManager::new(&config),
            index_cache: IndexCache::new(config.tile_size),
            config,
        })
    }
}

/// Tiles of a page whose vertex grid contains sample `s` along one axis
fn tiles_containing(sample: u32, tile_size: u32, num_tiles: u32) -> impl Iterator<Item = u32> {
    let tile = sample / tile_size;
    let shared = sample % tile_size == 0 && tile > 0;
    (tile < num_tiles)
        .then_some(tile)
        .into_iter()
        .chain(shared.then(|| tile - 1))
}

/// A streaming terrain world bound to a scene host.
pub struct TerrainWorld<H: SceneHost> {
    ctx: TerrainContext,
    pages: PageManager,
    host: H,
}

impl<H: SceneHost> TerrainWorld<H> {
    pub fn new(config: TerrainConfig, source: Box<dyn PageDataSource>, host: H) -> Result<Self> {
        let ctx = TerrainContext::new(config, source)?;
        let pages = PageManager::new(&ctx);
        log::info!(
            "Terrain world {}x{} pages of {} samples, {} tiles per page, {} renderables",
            ctx.config.world_width,
            ctx.config.world_height,
            ctx.config.page_size,
            ctx.config.num_tiles() * ctx.config.num_tiles(),
            ctx.pool.renderables_count()
        );
        Ok(Self { ctx, pages, host })
    }

    /// Advance streaming by one frame.
    pub fn update(&mut self, camera: &Camera) -> Result<Option<LoadAction>> {
        self.pages.update(camera, &mut self.ctx, &mut self.host)
    }

    /// Lower the terrain under `point` by `delta` and refresh affected meshes.
    /// Returns the number of renderables refilled.
    pub fn deform_height(&mut self, point: Vec3, delta: f32) -> usize {
        let samples = self.ctx.heights.deform_height(point, delta);
        let t = self.ctx.config.tile_size;
        let n = self.ctx.config.num_tiles();

        let mut keys = HashSet::new();
        for s in &samples {
            for tx in tiles_containing(s.x, t, n) {
                for tz in tiles_containing(s.z, t, n) {
                    keys.insert(TileKey::new(s.page, TileCoord::new(tx, tz)));
                }
            }
        }

        let mut refreshed = 0;
        for key in keys {
            if let Some((id, _)) = self.pages.grid().tile_binding(key) {
                if self.ctx.pool.reload_vertices(id, &self.ctx.heights, &self.ctx.config) {
                    refreshed += 1;
                }
            }
        }
        refreshed
    }

    pub fn add_new_height(&mut self, volume: BoundingSphere) -> bool {
        self.ctx.heights.add_new_height(volume)
    }

    pub fn remove_new_height(&mut self, volume: &BoundingSphere) -> bool {
        self.ctx.heights.remove_new_height(volume)
    }

    /// Terrain height under a world position
    pub fn height_at(&self, point: Vec3) -> f32 {
        self.ctx.heights.world_height(point)
    }

    /// Renderables to draw this frame
    pub fn visible_renderables(&self) -> impl Iterator<Item = &Renderable> {
        self.ctx.pool.iter().filter(|r| r.is_drawable())
    }

    pub fn page_state(&self, coord: PageCoord) -> Option<PageState> {
        self.pages.page_state(coord)
    }

    pub fn stats(&self) -> StreamingStats {
        self.pages.stats()
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.ctx.config
    }

    pub fn context(&self) -> &TerrainContext {
        &self.ctx
    }

    pub fn pages(&self) -> &PageManager {
        &self.pages
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Unload every page, release all height data and clear the index cache.
    pub fn shutdown(&mut self) {
        self.pages.shutdown(&mut self.ctx, &mut self.host);
    }
}
