//! Renderable pool with growth policy, deferred loading and per-frame LOD.

use std::collections::VecDeque;

use crate::core::camera::Camera;
use crate::core::config::{PoolGrowth, TerrainConfig};
use crate::core::error::Error;
use crate::core::grid::{Direction, TileKey};
use crate::core::types::Result;
use crate::math::Frustum;
use crate::mesh::{IndexCache, StitchMask};
use crate::scene::{SceneHost, SceneNodeId};
use crate::terrain::HeightStore;

use super::lod::LodThresholds;
use super::renderable::{Renderable, RenderableId};

/// Owns every renderable and hands them out to tiles.
///
/// Invariant: `free_count() + loading_count() + active_count() == renderables_count()`.
pub struct RenderableManager {
    renderables: Vec<Renderable>,
    free: Vec<RenderableId>,
    loading: VecDeque<RenderableId>,
    growth: PoolGrowth,
    /// Size of the next growth batch
    increment: f32,
    loads_per_update: usize,
    lod: LodThresholds,
}

impl RenderableManager {
    pub fn new(config: &TerrainConfig) -> Self {
        let mut pool = Self {
            renderables: Vec::with_capacity(config.num_renderables),
            free: Vec::with_capacity(config.num_renderables),
            loading: VecDeque::new(),
            growth: config.pool_growth,
            increment: config.num_renderables_increment.max(1) as f32,
            loads_per_update: config.num_renderables_loading,
            lod: LodThresholds::from_config(config),
        };
        pool.allocate(config.num_renderables);
        pool
    }

    fn allocate(&mut self, count: usize) {
        let start = self.renderables.len();
        for i in start..start + count {
            self.renderables.push(Renderable::new(RenderableId(i as u32)));
        }
        // Hand out low ids first
        self.free.extend((start..start + count).rev().map(|i| RenderableId(i as u32)));
    }

    /// Grow until at least `needed` renderables are free.
    fn grow(&mut self, needed: usize) -> Result<()> {
        let factor = match self.growth {
            PoolGrowth::Fixed => {
                return Err(Error::PoolExhausted {
                    requested: needed,
                    available: self.free.len(),
                });
            }
            PoolGrowth::Geometric { factor } => factor,
        };

        while self.free.len() < needed {
            let batch = (self.increment.round() as usize).max(1);
            self.allocate(batch);
            self.increment *= factor;
            log::info!(
                "Renderable pool grown by {} to {} (next increment {:.0})",
                batch,
                self.renderables.len(),
                self.increment
            );
        }
        Ok(())
    }

    /// Take a free renderable and bind it to `tile`.
    pub fn get_renderable(&mut self, tile: TileKey) -> Result<RenderableId> {
        let mut ids = self.get_renderables(&[tile])?;
        ids.pop().ok_or(Error::PoolExhausted { requested: 1, available: 0 })
    }

    /// Take one renderable per tile, all or nothing.
    pub fn get_renderables(&mut self, tiles: &[TileKey]) -> Result<Vec<RenderableId>> {
        if self.free.len() < tiles.len() {
            self.grow(tiles.len())?;
        }
        let level = self.lod.initial_level();
        let mut ids = Vec::with_capacity(tiles.len());
        for &tile in tiles {
            let Some(id) = self.free.pop() else {
                return Err(Error::PoolExhausted {
                    requested: tiles.len(),
                    available: ids.len(),
                });
            };
            self.renderables[id.index()].init(tile, level);
            ids.push(id);
        }
        Ok(ids)
    }

    /// Return a loaded renderable to the free list. No-op unless in use and loaded.
    pub fn release(&mut self, id: RenderableId) -> bool {
        match self.renderables.get(id.index()) {
            Some(r) if r.in_use && r.is_loaded => {
                self.recycle(id);
                true
            }
            _ => false,
        }
    }

    fn recycle(&mut self, id: RenderableId) {
        self.unlink(id);
        self.renderables[id.index()].reset();
        self.free.push(id);
    }

    /// Fill vertices now and mark the renderable loaded.
    pub fn load_renderable(&mut self, id: RenderableId, heights: &HeightStore, config: &TerrainConfig) {
        let r = &mut self.renderables[id.index()];
        if !r.in_use {
            return;
        }
        r.fill_vertices(heights, config);
        r.is_loaded = true;
    }

    /// Refill the vertices of a loaded renderable after its heights changed.
    pub fn reload_vertices(&mut self, id: RenderableId, heights: &HeightStore, config: &TerrainConfig) -> bool {
        let r = &mut self.renderables[id.index()];
        if !(r.in_use && r.is_loaded) {
            return false;
        }
        r.fill_vertices(heights, config);
        true
    }

    /// Defer the vertex fill to `execute_renderable_loading`.
    pub fn queue_renderable_loading(&mut self, id: RenderableId) {
        let r = &mut self.renderables[id.index()];
        if r.in_use && !r.is_loaded && !r.queued {
            r.queued = true;
            self.loading.push_back(id);
        }
    }

    /// Take a queued renderable out of the loading queue and free it.
    /// Returns false if it was not queued.
    pub fn cancel_renderable_loading(&mut self, id: RenderableId) -> bool {
        match self.renderables.get(id.index()) {
            Some(r) if r.queued => {}
            _ => return false,
        }
        self.loading.retain(|&queued| queued != id);
        self.renderables[id.index()].queued = false;
        self.recycle(id);
        true
    }

    /// Run up to `num_renderables_loading` deferred loads. Returns the number
    /// of renderables loaded.
    ///
    /// `binding` reports which renderable and scene node a tile currently has,
    /// or `None` if the tile is unloaded. A queued renderable whose tile is
    /// gone, or now bound to another renderable, goes back to the free list
    /// without counting against the budget.
    pub fn execute_renderable_loading<F>(
        &mut self,
        heights: &HeightStore,
        config: &TerrainConfig,
        cache: &mut IndexCache,
        host: &mut dyn SceneHost,
        binding: F,
    ) -> usize
    where
        F: Fn(TileKey) -> Option<(RenderableId, SceneNodeId)>,
    {
        let mut executed = 0;
        while executed < self.loads_per_update {
            let Some(id) = self.loading.pop_front() else {
                break;
            };
            self.renderables[id.index()].queued = false;

            let bound = self.renderables[id.index()]
                .tile
                .and_then(&binding)
                .filter(|(bound, _)| *bound == id);
            match bound {
                Some((_, node)) => {
                    self.load_renderable(id, heights, config);
                    host.attach_renderable(node, id);
                    self.refresh_with_neighbors(id, cache);
                    executed += 1;
                }
                None => {
                    log::debug!("Dropping stale renderable load {:?}", id);
                    self.recycle(id);
                }
            }
        }
        executed
    }

    /// Recycle every queued renderable (used on shutdown)
    pub fn cancel_pending_loads(&mut self) {
        while let Some(id) = self.loading.pop_front() {
            self.recycle(id);
        }
    }

    /// Link `a` to `b` in direction `dir` and `b` back to `a`.
    pub fn link(&mut self, a: RenderableId, dir: Direction, b: RenderableId) {
        self.renderables[a.index()].neighbors[dir.index()] = Some(b);
        self.renderables[b.index()].neighbors[dir.opposite().index()] = Some(a);
    }

    /// Clear every link to and from `id`. Returns the former neighbors.
    pub fn unlink(&mut self, id: RenderableId) -> [Option<RenderableId>; 4] {
        let former = std::mem::replace(&mut self.renderables[id.index()].neighbors, [None; 4]);
        for dir in Direction::ALL {
            if let Some(n) = former[dir.index()] {
                let back = &mut self.renderables[n.index()].neighbors[dir.opposite().index()];
                if *back == Some(id) {
                    *back = None;
                }
            }
        }
        former
    }

    /// Edges of `id` that border a loaded, strictly coarser neighbor
    pub fn stitch_mask_for(&self, id: RenderableId) -> StitchMask {
        let r = &self.renderables[id.index()];
        let mut mask = StitchMask::NONE;
        for dir in Direction::ALL {
            let Some(n) = r.neighbors[dir.index()] else {
                continue;
            };
            let n = &self.renderables[n.index()];
            if n.in_use && n.is_loaded && n.render_level > r.render_level {
                mask = mask.with_edge(dir, n.render_level - r.render_level);
            }
        }
        mask
    }

    /// Fetch the index buffer matching the current level and stitch mask.
    pub fn refresh_index_buffer(&mut self, id: RenderableId, cache: &mut IndexCache) {
        let mask = self.stitch_mask_for(id);
        let r = &mut self.renderables[id.index()];
        if !(r.in_use && r.is_loaded) {
            return;
        }
        r.index_buffer = Some(cache.get(r.render_level, mask));
        r.stitch_mask = mask;
    }

    /// Refresh `id` and every loaded neighbor
    pub fn refresh_with_neighbors(&mut self, id: RenderableId, cache: &mut IndexCache) {
        self.refresh_index_buffer(id, cache);
        let neighbors = self.renderables[id.index()].neighbors;
        for n in neighbors.into_iter().flatten() {
            self.refresh_index_buffer(n, cache);
        }
    }

    /// Frustum test and LOD update for one renderable. Returns visibility.
    pub fn notify_current_camera(
        &mut self,
        id: RenderableId,
        camera: &Camera,
        frustum: &Frustum,
        cache: &mut IndexCache,
    ) -> bool {
        let r = &mut self.renderables[id.index()];
        if !(r.in_use && r.is_loaded) {
            return false;
        }
        r.in_frustum = frustum.intersects_sphere(r.bounding_sphere());
        if !r.in_frustum {
            return false;
        }

        let dist_sq = camera.position.distance_squared(r.bounding_sphere().center) * camera.lod_bias;
        let current = r.render_level;
        let has_buffer = r.index_buffer.is_some();
        let stored_mask = r.stitch_mask;

        let level = self.lod.next_level(current, dist_sq);
        if level != current {
            log::trace!("Renderable {:?} level {} -> {}", id, current, level);
            self.renderables[id.index()].render_level = level;
            self.refresh_with_neighbors(id, cache);
        } else if !has_buffer || self.stitch_mask_for(id) != stored_mask {
            self.refresh_index_buffer(id, cache);
        }
        true
    }

    /// Mark a renderable as outside the view without touching its LOD
    pub fn set_out_of_frustum(&mut self, id: RenderableId) {
        if let Some(r) = self.renderables.get_mut(id.index()) {
            r.in_frustum = false;
        }
    }

    pub fn get(&self, id: RenderableId) -> Option<&Renderable> {
        self.renderables.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Renderable> {
        self.renderables.iter()
    }

    pub fn lod(&self) -> &LodThresholds {
        &self.lod
    }

    pub fn renderables_count(&self) -> usize {
        self.renderables.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn loading_count(&self) -> usize {
        self.loading.len()
    }

    /// In use and not waiting in the loading queue
    pub fn active_count(&self) -> usize {
        self.renderables.iter().filter(|r| r.in_use && !r.queued).count()
    }
}
