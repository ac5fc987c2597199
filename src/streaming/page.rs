//! A page: the unit of streaming.
//!
//! Height data is readied by `preload`, geometry is built by `load` and torn
//! down by `unload`, and `post_unload` finally releases the height data.
//! Every transition is idempotent.

use crate::core::camera::Camera;
use crate::core::config::TerrainConfig;
use crate::core::error::Error;
use crate::core::grid::{Direction, PageCoord, TileCoord, TileKey};
use crate::core::types::{Result, Vec3};
use crate::math::{Aabb, Frustum};
use crate::scene::{SceneHost, SceneNodeId};
use crate::terrain::HeightStore;
use crate::tile::{RenderableId, RenderableManager, Tile};
use crate::world::TerrainContext;

/// Streaming state of a page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageState {
    Unloaded,
    /// Height data available, no geometry
    Preloaded,
    /// Height data and tile geometry
    Loaded,
}

/// Where the camera stands relative to a page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraZone {
    /// Within the inner box
    Inside,
    /// Within the page but outside the inner box
    Change,
    Outside,
}

#[derive(Debug)]
pub struct Page {
    coord: PageCoord,
    preloaded: bool,
    loaded: bool,
    /// World footprint, y spanning the nominal height range
    bounds: Aabb,
    /// Footprint shrunk by the change margin
    inner: Aabb,
    /// Loaded neighboring pages
    pub(crate) neighbors: [Option<PageCoord>; 4],
    num_tiles: u32,
    /// Row-major, `z * num_tiles + x`
    tiles: Vec<Tile>,
    node: Option<SceneNodeId>,
}

impl Page {
    pub fn new(coord: PageCoord, config: &TerrainConfig) -> Self {
        let origin = config.page_origin(coord);
        let extent = config.page_extent();
        let bounds = Aabb::new(origin, origin + Vec3::new(extent.x, config.scale[1], extent.y));
        let inner = bounds.shrunk_xz(config.change_factor * config.scale[0]);

        let num_tiles = config.num_tiles();
        let tiles = (0..num_tiles)
            .flat_map(|z| (0..num_tiles).map(move |x| TileCoord::new(x, z)))
            .map(|tile| Tile::new(TileKey::new(coord, tile)))
            .collect();

        Self {
            coord,
            preloaded: false,
            loaded: false,
            bounds,
            inner,
            neighbors: [None; 4],
            num_tiles,
            tiles,
            node: None,
        }
    }

    pub fn coord(&self) -> PageCoord {
        self.coord
    }

    pub fn state(&self) -> PageState {
        if self.loaded {
            PageState::Loaded
        } else if self.preloaded {
            PageState::Preloaded
        } else {
            PageState::Unloaded
        }
    }

    pub fn is_preloaded(&self) -> bool {
        self.preloaded
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn node(&self) -> Option<SceneNodeId> {
        self.node
    }

    pub fn neighbor(&self, dir: Direction) -> Option<PageCoord> {
        self.neighbors[dir.index()]
    }

    pub fn num_tiles(&self) -> u32 {
        self.num_tiles
    }

    pub fn tile(&self, tile: TileCoord) -> Option<&Tile> {
        if tile.x >= self.num_tiles || tile.z >= self.num_tiles {
            return None;
        }
        self.tiles.get((tile.z * self.num_tiles + tile.x) as usize)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Renderables currently bound to this page's tiles
    pub fn renderables(&self) -> impl Iterator<Item = RenderableId> + '_ {
        self.tiles.iter().filter_map(Tile::renderable)
    }

    /// Ready the height data. No-op if already preloaded.
    pub fn preload(&mut self, heights: &mut HeightStore) -> Result<()> {
        if self.preloaded {
            return Ok(());
        }
        heights.preload(self.coord)?;
        self.preloaded = true;
        Ok(())
    }

    /// Build the tile grid, deferring vertex fills when the config asks for it.
    ///
    /// Fails with `PageNotPreloaded` when the height data is missing and with
    /// `PoolExhausted` when the pool cannot supply every tile; in both cases
    /// the page is left unloaded. Links to other pages are made by the grid.
    pub fn load(&mut self, ctx: &mut TerrainContext, host: &mut dyn SceneHost) -> Result<()> {
        let deferred = ctx.config.deferred_renderable_loading;
        self.build(ctx, host, deferred)
    }

    /// Like `load`, but every tile gets its vertices right away. Used for the
    /// page under the camera.
    pub fn load_immediate(&mut self, ctx: &mut TerrainContext, host: &mut dyn SceneHost) -> Result<()> {
        self.build(ctx, host, false)
    }

    fn build(&mut self, ctx: &mut TerrainContext, host: &mut dyn SceneHost, deferred: bool) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        if !self.preloaded {
            return Err(Error::PageNotPreloaded(self.coord));
        }

        host.load_page_material(self.coord)?;
        let node = host.create_node(
            None,
            &format!("page.{}.{}", self.coord.x, self.coord.z),
            self.bounds.min,
        );

        let keys: Vec<TileKey> = self.tiles.iter().map(Tile::key).collect();
        let ids = match ctx.pool.get_renderables(&keys) {
            Ok(ids) => ids,
            Err(e) => {
                host.destroy_node(node);
                host.unload_page_material(self.coord);
                return Err(e);
            }
        };

        let scale = ctx.config.scale();
        let tile_size = ctx.config.tile_size as f32;
        for (tile, &id) in self.tiles.iter_mut().zip(&ids) {
            let coord = tile.key().tile;
            let offset = Vec3::new(coord.x as f32 * tile_size * scale.x, 0.0, coord.z as f32 * tile_size * scale.z);
            let tile_node = host.create_node(
                Some(node),
                &format!("tile.{}.{}", coord.x, coord.z),
                self.bounds.min + offset,
            );
            tile.bind(id, tile_node);

            if deferred {
                ctx.pool.queue_renderable_loading(id);
            } else {
                ctx.pool.load_renderable(id, &ctx.heights, &ctx.config);
                host.attach_renderable(tile_node, id);
            }
        }

        let n = self.num_tiles as usize;
        for z in 0..n {
            for x in 0..n {
                let id = ids[z * n + x];
                if x + 1 < n {
                    ctx.pool.link(id, Direction::East, ids[z * n + x + 1]);
                }
                if z + 1 < n {
                    ctx.pool.link(id, Direction::South, ids[(z + 1) * n + x]);
                }
            }
        }

        self.node = Some(node);
        self.loaded = true;
        log::debug!("Loaded page {} ({} tiles)", self.coord, ids.len());
        Ok(())
    }

    /// Tear down the tile grid and hand every renderable back to the pool.
    ///
    /// Returns false if the page was not loaded. Page-level links are cleared
    /// by the grid.
    pub fn unload(&mut self, ctx: &mut TerrainContext, host: &mut dyn SceneHost) -> bool {
        if !self.loaded {
            return false;
        }

        let mut outside = Vec::new();
        for tile in &mut self.tiles {
            let Some((id, tile_node)) = tile.unbind() else {
                continue;
            };
            outside.extend(ctx.pool.unlink(id).into_iter().flatten());
            host.detach_renderable(tile_node, id);
            if !ctx.pool.release(id) {
                ctx.pool.cancel_renderable_loading(id);
            }
        }
        // Neighbors on other pages lose a stitch partner
        for id in outside {
            ctx.pool.refresh_index_buffer(id, &mut ctx.index_cache);
        }

        if let Some(node) = self.node.take() {
            host.destroy_node(node);
        }
        host.unload_page_material(self.coord);
        self.loaded = false;
        log::debug!("Unloaded page {}", self.coord);
        true
    }

    /// Release the height data of an unloaded page.
    pub fn post_unload(&mut self, heights: &mut HeightStore) -> bool {
        if self.loaded || !self.preloaded {
            return false;
        }
        heights.release(self.coord);
        self.preloaded = false;
        true
    }

    pub fn is_camera_in(&self, pos: Vec3) -> CameraZone {
        if self.inner.contains_xz(pos) {
            CameraZone::Inside
        } else if self.bounds.contains_xz(pos) {
            CameraZone::Change
        } else {
            CameraZone::Outside
        }
    }

    /// Footprint grown to cover every loaded tile mesh
    fn visible_bounds(&self, pool: &RenderableManager) -> Aabb {
        self.renderables()
            .filter_map(|id| pool.get(id))
            .filter(|r| r.is_loaded())
            .fold(self.bounds, |bounds, r| bounds.merged(r.bounds()))
    }

    /// Forward the camera to every tile if the page is in view; otherwise
    /// mark its renderables as out of the frustum.
    pub fn notify(&self, camera: &Camera, frustum: &Frustum, ctx: &mut TerrainContext) {
        if !self.loaded {
            return;
        }
        if frustum.intersects_aabb(&self.visible_bounds(&ctx.pool)) {
            for id in self.renderables() {
                ctx.pool.notify_current_camera(id, camera, frustum, &mut ctx.index_cache);
            }
        } else {
            for id in self.renderables() {
                ctx.pool.set_out_of_frustum(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PoolGrowth;
    use crate::scene::SceneGraph;
    use crate::world::tests::flat_context;

    fn config() -> TerrainConfig {
        TerrainConfig {
            page_size: 33,
            tile_size: 16,
            world_width: 3,
            world_height: 3,
            max_render_level: 2,
            change_factor: 4.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_page_geometry() {
        let page = Page::new(PageCoord::new(0, 1), &config());
        assert_eq!(page.state(), PageState::Unloaded);
        assert_eq!(page.num_tiles(), 2);
        assert_eq!(page.tiles().count(), 4);
        assert_eq!(page.bounds().min, Vec3::new(-32.0, 0.0, 0.0));
        assert_eq!(page.bounds().max.x, 0.0);
        assert_eq!(
            page.tile(TileCoord::new(1, 1)).map(|t| t.key().tile),
            Some(TileCoord::new(1, 1))
        );
        assert!(page.tile(TileCoord::new(2, 0)).is_none());
    }

    #[test]
    fn test_camera_zones() {
        let page = Page::new(PageCoord::new(1, 1), &config());
        assert_eq!(page.is_camera_in(Vec3::new(16.0, 100.0, 16.0)), CameraZone::Inside);
        assert_eq!(page.is_camera_in(Vec3::new(2.0, 0.0, 16.0)), CameraZone::Change);
        assert_eq!(page.is_camera_in(Vec3::new(-2.0, 0.0, 16.0)), CameraZone::Outside);
    }

    #[test]
    fn test_load_requires_preload() {
        let mut ctx = flat_context(config());
        let mut scene = SceneGraph::new();
        let mut page = Page::new(PageCoord::new(1, 1), &ctx.config);

        assert!(matches!(
            page.load(&mut ctx, &mut scene),
            Err(Error::PageNotPreloaded(_))
        ));
        assert_eq!(page.state(), PageState::Unloaded);
    }

    #[test]
    fn test_full_lifecycle() {
        let mut ctx = flat_context(config());
        let mut scene = SceneGraph::new();
        let mut page = Page::new(PageCoord::new(1, 1), &ctx.config);

        page.preload(&mut ctx.heights).expect("preload");
        page.preload(&mut ctx.heights).expect("idempotent");
        assert_eq!(page.state(), PageState::Preloaded);

        page.load(&mut ctx, &mut scene).expect("load");
        page.load(&mut ctx, &mut scene).expect("idempotent");
        assert_eq!(page.state(), PageState::Loaded);
        assert!(scene.is_material_loaded(page.coord()));
        assert_eq!(scene.attached_count(), 4);

        for tile in page.tiles() {
            let r = tile.renderable().and_then(|id| ctx.pool.get(id)).expect("bound");
            assert!(r.in_use() && r.is_loaded());
        }

        // Intra-page links
        let a = page.tile(TileCoord::new(0, 0)).and_then(Tile::renderable).expect("bound");
        let b = page.tile(TileCoord::new(1, 0)).and_then(Tile::renderable).expect("bound");
        let c = page.tile(TileCoord::new(0, 1)).and_then(Tile::renderable).expect("bound");
        let ra = ctx.pool.get(a).expect("exists");
        assert_eq!(ra.neighbor(Direction::East), Some(b));
        assert_eq!(ra.neighbor(Direction::South), Some(c));
        assert_eq!(ctx.pool.get(b).and_then(|r| r.neighbor(Direction::West)), Some(a));

        assert!(!page.post_unload(&mut ctx.heights));

        assert!(page.unload(&mut ctx, &mut scene));
        assert!(!page.unload(&mut ctx, &mut scene));
        assert_eq!(page.state(), PageState::Preloaded);
        assert_eq!(scene.node_count(), 1);
        assert!(!scene.is_material_loaded(page.coord()));
        assert_eq!(ctx.pool.free_count(), ctx.pool.renderables_count());
        assert_eq!(ctx.pool.get(a).and_then(|r| r.neighbor(Direction::East)), None);

        assert!(page.post_unload(&mut ctx.heights));
        assert!(!ctx.heights.is_loaded(page.coord()));
        assert_eq!(page.state(), PageState::Unloaded);
    }

    #[test]
    fn test_exhausted_pool_leaves_page_unloaded() {
        let mut ctx = flat_context(TerrainConfig {
            num_renderables: 3,
            pool_growth: PoolGrowth::Fixed,
            ..config()
        });
        let mut scene = SceneGraph::new();
        let mut page = Page::new(PageCoord::new(1, 1), &ctx.config);
        page.preload(&mut ctx.heights).expect("preload");

        assert!(matches!(
            page.load(&mut ctx, &mut scene),
            Err(Error::PoolExhausted { requested: 4, available: 3 })
        ));
        assert_eq!(page.state(), PageState::Preloaded);
        assert_eq!(scene.node_count(), 1);
        assert_eq!(scene.material_count(), 0);
        assert_eq!(ctx.pool.free_count(), 3);
    }

    #[test]
    fn test_deferred_load_queues_renderables() {
        let mut ctx = flat_context(TerrainConfig {
            deferred_renderable_loading: true,
            ..config()
        });
        let mut scene = SceneGraph::new();
        let mut page = Page::new(PageCoord::new(1, 1), &ctx.config);
        page.preload(&mut ctx.heights).expect("preload");
        page.load(&mut ctx, &mut scene).expect("load");

        assert_eq!(ctx.pool.loading_count(), 4);
        assert_eq!(scene.attached_count(), 0);

        // Unloading before the queue runs hands the renderables straight back
        assert!(page.unload(&mut ctx, &mut scene));
        assert_eq!(ctx.pool.loading_count(), 0);
        assert_eq!(ctx.pool.free_count(), ctx.pool.renderables_count());
    }

    #[test]
    fn test_load_immediate_ignores_deferral() {
        let mut ctx = flat_context(TerrainConfig {
            deferred_renderable_loading: true,
            ..config()
        });
        let mut scene = SceneGraph::new();
        let mut page = Page::new(PageCoord::new(1, 1), &ctx.config);
        page.preload(&mut ctx.heights).expect("preload");
        page.load_immediate(&mut ctx, &mut scene).expect("load");

        assert_eq!(ctx.pool.loading_count(), 0);
        assert_eq!(scene.attached_count(), 4);
        for id in page.renderables() {
            assert!(ctx.pool.get(id).is_some_and(|r| r.is_loaded()));
        }
    }
}
