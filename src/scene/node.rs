//! Scene graph node types

use glam::Vec3;

use crate::tile::RenderableId;

/// Unique identifier for a scene graph node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SceneNodeId(pub u64);

/// A single node in the scene graph.
#[derive(Clone, Debug)]
pub struct SceneNode {
    pub id: SceneNodeId,
    pub name: String,
    pub parent: Option<SceneNodeId>,
    pub children: Vec<SceneNodeId>,
    pub position: Vec3,
    /// Renderables drawn at this node
    pub renderables: Vec<RenderableId>,
}

impl SceneNode {
    /// Create a new scene node.
    pub fn new(id: SceneNodeId, name: impl Into<String>, position: Vec3) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            children: Vec::new(),
            position,
            renderables: Vec::new(),
        }
    }
}
