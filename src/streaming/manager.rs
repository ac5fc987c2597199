//! Page grid controller: decides which pages to stream around the camera and
//! performs at most one page action per update.

use crate::core::camera::Camera;
use crate::core::error::Error;
use crate::core::grid::PageCoord;
use crate::core::types::{Result, Vec3};
use crate::scene::SceneHost;
use crate::world::TerrainContext;

use super::grid::PageGrid;
use super::page::{CameraZone, PageState};
use super::queue::PageQueue;

/// The page action performed by one `process_loading` call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadAction {
    Preloaded(PageCoord),
    Loaded(PageCoord),
    /// Load attempted before the height data was ready; queued for both
    Requeued(PageCoord),
    Unloaded(PageCoord),
    PostUnloaded(PageCoord),
}

/// Running counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamingStats {
    pub updates: u64,
    pub reevaluations: u64,
    pub preloaded: u64,
    pub loaded: u64,
    pub requeued: u64,
    pub unloaded: u64,
    pub post_unloaded: u64,
    /// Queue entries dropped because the page had already changed state
    pub stale: u64,
}

pub struct PageManager {
    grid: PageGrid,
    preload_queue: PageQueue,
    load_queue: PageQueue,
    unload_queue: PageQueue,
    post_unload_queue: PageQueue,
    /// Page under the camera at the last re-evaluation
    current: Option<PageCoord>,
    /// Camera position at the last re-evaluation
    last_camera: Option<Vec3>,
    stats: StreamingStats,
}

impl PageManager {
    pub fn new(ctx: &TerrainContext) -> Self {
        Self {
            grid: PageGrid::new(&ctx.config),
            preload_queue: PageQueue::new(),
            load_queue: PageQueue::new(),
            unload_queue: PageQueue::new(),
            post_unload_queue: PageQueue::new(),
            current: None,
            last_camera: None,
            stats: StreamingStats::default(),
        }
    }

    pub fn grid(&self) -> &PageGrid {
        &self.grid
    }

    pub fn stats(&self) -> StreamingStats {
        self.stats
    }

    pub fn current_page(&self) -> Option<PageCoord> {
        self.current
    }

    pub fn page_state(&self, coord: PageCoord) -> Option<PageState> {
        self.grid.get(coord).map(|p| p.state())
    }

    /// Queue lengths: (preload, load, unload, post-unload)
    pub fn pending(&self) -> (usize, usize, usize, usize) {
        (
            self.preload_queue.len(),
            self.load_queue.len(),
            self.unload_queue.len(),
            self.post_unload_queue.len(),
        )
    }

    /// One frame of streaming: re-evaluate the windows if needed, notify
    /// every page of the camera, run one page action and the deferred
    /// renderable loads.
    pub fn update(
        &mut self,
        camera: &Camera,
        ctx: &mut TerrainContext,
        host: &mut dyn SceneHost,
    ) -> Result<Option<LoadAction>> {
        self.stats.updates += 1;
        let pos = camera.position;

        if self.needs_reevaluation(pos, ctx) {
            self.reevaluate(pos, ctx, host)?;
        }

        let frustum = camera.frustum();
        for page in self.grid.iter() {
            page.notify(camera, &frustum, ctx);
        }

        let action = self.process_loading(ctx, host)?;

        let grid = &self.grid;
        ctx.pool.execute_renderable_loading(
            &ctx.heights,
            &ctx.config,
            &mut ctx.index_cache,
            host,
            |key| grid.tile_binding(key),
        );

        Ok(action)
    }

    fn needs_reevaluation(&self, pos: Vec3, ctx: &TerrainContext) -> bool {
        let (Some(current), Some(last)) = (self.current, self.last_camera) else {
            return true;
        };
        if !self.grid.is_loaded(ctx.config.page_at(pos)) {
            return true;
        }
        if last.distance_squared(pos) <= ctx.config.camera_threshold {
            return false;
        }
        self.grid
            .get(current)
            .is_none_or(|page| page.is_camera_in(pos) != CameraZone::Inside)
    }

    /// Rebuild every queue from the windows around the camera and load the
    /// page under the camera right away.
    fn reevaluate(&mut self, pos: Vec3, ctx: &mut TerrainContext, host: &mut dyn SceneHost) -> Result<()> {
        self.stats.reevaluations += 1;
        self.preload_queue.clear();
        self.load_queue.clear();
        self.unload_queue.clear();
        self.post_unload_queue.clear();

        let under = ctx.config.page_at(pos);
        let (cx, cz) = ctx.config.page_index_unclamped(pos);
        let adjacent = ctx.config.max_adjacent_pages as i64;
        let preload = ctx.config.max_preload_pages as i64;

        for page in self.grid.iter() {
            let coord = page.coord();
            if coord == under {
                continue;
            }
            let ring = (coord.x as i64 - cx).abs().max((coord.z as i64 - cz).abs());
            if ring <= adjacent {
                if !page.is_loaded() {
                    self.load_queue.push(coord);
                }
            } else if ring <= preload {
                if !page.is_preloaded() {
                    self.preload_queue.push(coord);
                }
                if page.is_loaded() {
                    self.unload_queue.push(coord);
                }
            } else {
                if page.is_loaded() {
                    self.unload_queue.push(coord);
                }
                if page.is_preloaded() {
                    self.post_unload_queue.push(coord);
                }
            }
        }

        if !self.grid.is_loaded(under) {
            if let Some(page) = self.grid.get_mut(under) {
                page.preload(&mut ctx.heights)?;
            }
            self.load_page(under, ctx, host, true)?;
            self.stats.loaded += 1;
        }

        log::debug!(
            "Streaming window around {} (index {}, {}): {} preload, {} load, {} unload, {} post-unload",
            under,
            cx,
            cz,
            self.preload_queue.len(),
            self.load_queue.len(),
            self.unload_queue.len(),
            self.post_unload_queue.len()
        );

        self.current = Some(under);
        self.last_camera = Some(pos);
        Ok(())
    }

    /// Load a page and link it to its loaded neighbors. `immediate` skips the
    /// deferred vertex queue.
    fn load_page(
        &mut self,
        coord: PageCoord,
        ctx: &mut TerrainContext,
        host: &mut dyn SceneHost,
        immediate: bool,
    ) -> Result<()> {
        let Some(page) = self.grid.get_mut(coord) else {
            return Err(Error::OutOfWorld(coord));
        };
        if immediate {
            page.load_immediate(ctx, host)?;
        } else {
            page.load(ctx, host)?;
        }
        self.grid.link_tile_neighbors(coord, &mut ctx.pool, &mut ctx.index_cache);
        Ok(())
    }

    fn unload_page(&mut self, coord: PageCoord, ctx: &mut TerrainContext, host: &mut dyn SceneHost) -> bool {
        self.grid.unlink_page(coord);
        self.grid
            .get_mut(coord)
            .is_some_and(|page| page.unload(ctx, host))
    }

    /// Perform at most one page action, in priority order preload, load,
    /// unload, post-unload. Entries that no longer apply are skipped for free.
    pub fn process_loading(
        &mut self,
        ctx: &mut TerrainContext,
        host: &mut dyn SceneHost,
    ) -> Result<Option<LoadAction>> {
        while let Some(coord) = self.preload_queue.pop() {
            let Some(page) = self.grid.get_mut(coord) else {
                continue;
            };
            if page.is_preloaded() {
                self.stats.stale += 1;
                continue;
            }
            page.preload(&mut ctx.heights)?;
            self.stats.preloaded += 1;
            log::debug!("Preloaded page {}", coord);
            return Ok(Some(LoadAction::Preloaded(coord)));
        }

        while let Some(coord) = self.load_queue.pop() {
            if self.grid.is_loaded(coord) {
                self.stats.stale += 1;
                continue;
            }
            return match self.load_page(coord, ctx, host, false) {
                Ok(()) => {
                    self.stats.loaded += 1;
                    Ok(Some(LoadAction::Loaded(coord)))
                }
                Err(e) if e.is_recoverable() => {
                    log::warn!("Page {} not preloaded yet, requeued", coord);
                    self.preload_queue.push(coord);
                    self.load_queue.push(coord);
                    self.stats.requeued += 1;
                    Ok(Some(LoadAction::Requeued(coord)))
                }
                Err(e) => Err(e),
            };
        }

        while let Some(coord) = self.unload_queue.pop() {
            if !self.unload_page(coord, ctx, host) {
                self.stats.stale += 1;
                continue;
            }
            self.stats.unloaded += 1;
            return Ok(Some(LoadAction::Unloaded(coord)));
        }

        while let Some(coord) = self.post_unload_queue.pop() {
            let released = self
                .grid
                .get_mut(coord)
                .is_some_and(|page| page.post_unload(&mut ctx.heights));
            if !released {
                self.stats.stale += 1;
                continue;
            }
            self.stats.post_unloaded += 1;
            log::debug!("Released height data of page {}", coord);
            return Ok(Some(LoadAction::PostUnloaded(coord)));
        }

        Ok(None)
    }

    /// Unload every page, release all height data and drop pending work.
    pub fn shutdown(&mut self, ctx: &mut TerrainContext, host: &mut dyn SceneHost) {
        self.preload_queue.clear();
        self.load_queue.clear();
        self.unload_queue.clear();
        self.post_unload_queue.clear();

        let coords: Vec<PageCoord> = self.grid.iter().map(|p| p.coord()).collect();
        for coord in coords {
            self.unload_page(coord, ctx, host);
            if let Some(page) = self.grid.get_mut(coord) {
                page.post_unload(&mut ctx.heights);
            }
        }
        ctx.pool.cancel_pending_loads();
        ctx.index_cache.clear();
        self.current = None;
        self.last_camera = None;
        log::info!("Terrain streaming shut down");
    }
}
