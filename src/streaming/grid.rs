//! Flat storage of every page in the world plus cross-page linking.

use crate::core::config::TerrainConfig;
use crate::core::grid::{Direction, PageCoord, TileCoord, TileKey};
use crate::mesh::IndexCache;
use crate::scene::SceneNodeId;
use crate::tile::{RenderableId, RenderableManager};

use super::page::Page;

/// All pages, row-major by `z * width + x`.
#[derive(Debug)]
pub struct PageGrid {
    width: u32,
    height: u32,
    pages: Vec<Page>,
}

/// Tile of a page lying on edge `dir`, `i` tiles along that edge
fn edge_tile(num_tiles: u32, dir: Direction, i: u32) -> TileCoord {
    let last = num_tiles - 1;
    match dir {
        Direction::North => TileCoord::new(i, 0),
        Direction::South => TileCoord::new(i, last),
        Direction::East => TileCoord::new(last, i),
        Direction::West => TileCoord::new(0, i),
    }
}

impl PageGrid {
    pub fn new(config: &TerrainConfig) -> Self {
        let pages = (0..config.world_height)
            .flat_map(|z| (0..config.world_width).map(move |x| PageCoord::new(x, z)))
            .map(|coord| Page::new(coord, config))
            .collect();
        Self {
            width: config.world_width,
            height: config.world_height,
            pages,
        }
    }

    fn slot(&self, coord: PageCoord) -> Option<usize> {
        (coord.x < self.width && coord.z < self.height).then(|| (coord.z * self.width + coord.x) as usize)
    }

    pub fn get(&self, coord: PageCoord) -> Option<&Page> {
        self.slot(coord).map(|i| &self.pages[i])
    }

    pub fn get_mut(&mut self, coord: PageCoord) -> Option<&mut Page> {
        self.slot(coord).map(|i| &mut self.pages[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_loaded(&self, coord: PageCoord) -> bool {
        self.get(coord).is_some_and(Page::is_loaded)
    }

    /// Renderable and scene node currently serving a tile, if its page is loaded
    pub fn tile_binding(&self, key: TileKey) -> Option<(RenderableId, SceneNodeId)> {
        self.get(key.page)?.tile(key.tile)?.binding()
    }

    /// Link a freshly loaded page to every loaded neighbor, page and edge
    /// tiles both ways, then refresh the index buffers along the seams.
    pub fn link_tile_neighbors(&mut self, coord: PageCoord, pool: &mut RenderableManager, cache: &mut IndexCache) {
        let Some(slot) = self.slot(coord) else {
            return;
        };
        if !self.pages[slot].is_loaded() {
            return;
        }
        let n = self.pages[slot].num_tiles();

        for dir in Direction::ALL {
            let Some(other) = coord.step(dir, self.width, self.height) else {
                continue;
            };
            let Some(other_slot) = self.slot(other) else {
                continue;
            };
            if !self.pages[other_slot].is_loaded() {
                continue;
            }

            self.pages[slot].neighbors[dir.index()] = Some(other);
            self.pages[other_slot].neighbors[dir.opposite().index()] = Some(coord);

            for i in 0..n {
                let ours = self.pages[slot].tile(edge_tile(n, dir, i)).and_then(|t| t.renderable());
                let theirs = self.pages[other_slot]
                    .tile(edge_tile(n, dir.opposite(), i))
                    .and_then(|t| t.renderable());
                if let (Some(a), Some(b)) = (ours, theirs) {
                    pool.link(a, dir, b);
                }
            }
        }

        let ids: Vec<RenderableId> = self.pages[slot].renderables().collect();
        for id in ids {
            pool.refresh_with_neighbors(id, cache);
        }
    }

    /// Clear the page-level links of `coord` on both sides.
    pub fn unlink_page(&mut self, coord: PageCoord) {
        let Some(slot) = self.slot(coord) else {
            return;
        };
        for dir in Direction::ALL {
            if let Some(other) = self.pages[slot].neighbors[dir.index()].take() {
                if let Some(other_slot) = self.slot(other) {
                    let back = &mut self.pages[other_slot].neighbors[dir.opposite().index()];
                    if *back == Some(coord) {
                        *back = None;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneGraph;
    use crate::world::tests::flat_context;

    fn config() -> TerrainConfig {
        TerrainConfig {
            page_size: 33,
            tile_size: 16,
            world_width: 3,
            world_height: 3,
            max_render_level: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_grid_lookup() {
        let grid = PageGrid::new(&config());
        assert_eq!(grid.iter().count(), 9);
        assert_eq!(grid.get(PageCoord::new(2, 1)).map(Page::coord), Some(PageCoord::new(2, 1)));
        assert!(grid.get(PageCoord::new(3, 0)).is_none());
        assert!(!grid.is_loaded(PageCoord::new(0, 0)));
    }

    #[test]
    fn test_edge_tiles() {
        assert_eq!(edge_tile(4, Direction::North, 2), TileCoord::new(2, 0));
        assert_eq!(edge_tile(4, Direction::South, 2), TileCoord::new(2, 3));
        assert_eq!(edge_tile(4, Direction::East, 1), TileCoord::new(3, 1));
        assert_eq!(edge_tile(4, Direction::West, 1), TileCoord::new(0, 1));
    }

    #[test]
    fn test_link_and_unlink_neighbors() {
        let mut ctx = flat_context(config());
        let mut scene = SceneGraph::new();
        let mut grid = PageGrid::new(&ctx.config);
        let west = PageCoord::new(0, 1);
        let east = PageCoord::new(1, 1);

        for coord in [west, east] {
            let page = grid.get_mut(coord).expect("in grid");
            page.preload(&mut ctx.heights).expect("preload");
            page.load(&mut ctx, &mut scene).expect("load");
            grid.link_tile_neighbors(coord, &mut ctx.pool, &mut ctx.index_cache);
        }

        let page_w = grid.get(west).expect("in grid");
        let page_e = grid.get(east).expect("in grid");
        assert_eq!(page_w.neighbor(Direction::East), Some(east));
        assert_eq!(page_e.neighbor(Direction::West), Some(west));
        assert_eq!(page_e.neighbor(Direction::North), None);

        for i in 0..2 {
            let a = page_w.tile(TileCoord::new(1, i)).and_then(|t| t.renderable()).expect("bound");
            let b = page_e.tile(TileCoord::new(0, i)).and_then(|t| t.renderable()).expect("bound");
            assert_eq!(ctx.pool.get(a).and_then(|r| r.neighbor(Direction::East)), Some(b));
            assert_eq!(ctx.pool.get(b).and_then(|r| r.neighbor(Direction::West)), Some(a));
            assert!(ctx.pool.get(a).and_then(|r| r.indices()).is_some());
        }
        let a = page_w.tile(TileCoord::new(1, 0)).and_then(|t| t.renderable()).expect("bound");

        grid.unlink_page(east);
        grid.get_mut(east).expect("in grid").unload(&mut ctx, &mut scene);

        assert_eq!(grid.get(west).and_then(|p| p.neighbor(Direction::East)), None);
        assert_eq!(grid.get(east).and_then(|p| p.neighbor(Direction::West)), None);
        assert_eq!(ctx.pool.get(a).and_then(|r| r.neighbor(Direction::East)), None);
    }

    #[test]
    fn test_tile_binding() {
        let mut ctx = flat_context(config());
        let mut scene = SceneGraph::new();
        let mut grid = PageGrid::new(&ctx.config);
        let coord = PageCoord::new(1, 1);
        let key = TileKey::new(coord, TileCoord::new(1, 0));
        assert_eq!(grid.tile_binding(key), None);

        let page = grid.get_mut(coord).expect("in grid");
        page.preload(&mut ctx.heights).expect("preload");
        page.load(&mut ctx, &mut scene).expect("load");

        let (id, node) = grid.tile_binding(key).expect("bound");
        assert_eq!(ctx.pool.get(id).and_then(|r| r.tile()), Some(key));
        assert!(scene.get(node).is_some());
    }
}
