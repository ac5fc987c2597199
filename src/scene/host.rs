//! Boundary to the host renderer and scene graph.
//!
//! The paging engine never allocates GPU resources itself. It creates scene
//! attachment points, hangs tile renderables off them and asks for page
//! materials through this trait.

use crate::core::grid::PageCoord;
use crate::core::types::{Result, Vec3};
use crate::tile::RenderableId;

use super::node::SceneNodeId;

pub trait SceneHost {
    /// Create a node under `parent` (or under the root) at a world position
    fn create_node(&mut self, parent: Option<SceneNodeId>, name: &str, position: Vec3) -> SceneNodeId;

    /// Destroy a node and everything below it
    fn destroy_node(&mut self, node: SceneNodeId);

    fn attach_renderable(&mut self, node: SceneNodeId, renderable: RenderableId);

    fn detach_renderable(&mut self, node: SceneNodeId, renderable: RenderableId);

    /// Load the material/texture set for a page
    fn load_page_material(&mut self, page: PageCoord) -> Result<()>;

    fn unload_page_material(&mut self, page: PageCoord);
}
