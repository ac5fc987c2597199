//! Tile: one cell of a page's tile grid.

use crate::core::grid::{Direction, TileKey};
use crate::scene::SceneNodeId;

use super::pool::RenderableManager;
use super::renderable::RenderableId;

/// A tile owns no geometry; it borrows a renderable from the pool while loaded.
#[derive(Clone, Debug)]
pub struct Tile {
    key: TileKey,
    renderable: Option<RenderableId>,
    node: Option<SceneNodeId>,
    loaded: bool,
}

impl Tile {
    pub fn new(key: TileKey) -> Self {
        Self {
            key,
            renderable: None,
            node: None,
            loaded: false,
        }
    }

    pub(crate) fn bind(&mut self, renderable: RenderableId, node: SceneNodeId) {
        self.renderable = Some(renderable);
        self.node = Some(node);
        self.loaded = true;
    }

    /// Drop the binding; returns what was bound
    pub(crate) fn unbind(&mut self) -> Option<(RenderableId, SceneNodeId)> {
        self.loaded = false;
        self.renderable.take().zip(self.node.take())
    }

    pub fn key(&self) -> TileKey {
        self.key
    }

    pub fn renderable(&self) -> Option<RenderableId> {
        self.renderable
    }

    pub fn node(&self) -> Option<SceneNodeId> {
        self.node
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Renderable and node, only while loaded
    pub fn binding(&self) -> Option<(RenderableId, SceneNodeId)> {
        if self.loaded {
            self.renderable.zip(self.node)
        } else {
            None
        }
    }
    /// Neighboring tile in `dir`, within or across pages.
    ///
    /// Links live on the bound renderables, so this only answers while both
    /// tiles are loaded.
    pub fn neighbor(&self, dir: Direction, pool: &RenderableManager) -> Option<TileKey> {
        let (id, _) = self.binding()?;
        let other = pool.get(id)?.neighbor(dir)?;
        pool.get(other)?.tile()
    }
}
