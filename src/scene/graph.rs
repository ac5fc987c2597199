//! Scene graph: in-memory `SceneHost` implementation.
//!
//! Keeps the node hierarchy, renderable attachments and loaded page
//! materials on the CPU. The fly-through binary and the test suite use it in
//! place of a real renderer.

use std::collections::{HashMap, HashSet};

use glam::Vec3;

use crate::core::grid::PageCoord;
use crate::core::types::Result;
use crate::tile::RenderableId;

use super::host::SceneHost;
use super::node::{SceneNode, SceneNodeId};

/// CPU-side scene graph
pub struct SceneGraph {
    nodes: HashMap<SceneNodeId, SceneNode>,
    root: SceneNodeId,
    next_id: u64,
    materials: HashSet<PageCoord>,
}

impl SceneGraph {
    /// Create a new scene graph with a root node.
    pub fn new() -> Self {
        let root_id = SceneNodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root_id, SceneNode::new(root_id, "root", Vec3::ZERO));

        Self {
            nodes,
            root: root_id,
            next_id: 1,
            materials: HashSet::new(),
        }
    }

    /// Get the root node ID.
    pub fn root(&self) -> SceneNodeId {
        self.root
    }

    /// Allocate a fresh node ID.
    fn alloc_id(&mut self) -> SceneNodeId {
        let id = SceneNodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Remove a node and its entire subtree. Cannot remove the root.
    pub fn remove(&mut self, id: SceneNodeId) {
        if id == self.root {
            return;
        }

        // Collect subtree IDs (BFS)
        let mut to_remove = vec![id];
        let mut i = 0;
        while i < to_remove.len() {
            let current = to_remove[i];
            if let Some(node) = self.nodes.get(&current) {
                to_remove.extend_from_slice(&node.children);
            }
            i += 1;
        }

        if let Some(parent_id) = self.nodes.get(&id).and_then(|n| n.parent) {
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                parent.children.retain(|c| *c != id);
            }
        }

        for nid in to_remove {
            self.nodes.remove(&nid);
        }
    }

    /// Get an immutable reference to a node.
    pub fn get(&self, id: SceneNodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    /// Iterate over the children of a node.
    pub fn children(&self, id: SceneNodeId) -> impl Iterator<Item = SceneNodeId> + '_ {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .copied()
    }

    /// Total number of nodes in the graph, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of renderables attached anywhere in the graph
    pub fn attached_count(&self) -> usize {
        self.nodes.values().map(|n| n.renderables.len()).sum()
    }

    pub fn is_material_loaded(&self, page: PageCoord) -> bool {
        self.materials.contains(&page)
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneHost for SceneGraph {
    fn create_node(&mut self, parent: Option<SceneNodeId>, name: &str, position: Vec3) -> SceneNodeId {
        let parent = parent.filter(|p| self.nodes.contains_key(p)).unwrap_or(self.root);
        let id = self.alloc_id();
        let mut node = SceneNode::new(id, name, position);
        node.parent = Some(parent);
        self.nodes.insert(id, node);

        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }
        id
    }

    fn destroy_node(&mut self, node: SceneNodeId) {
        self.remove(node);
    }

    fn attach_renderable(&mut self, node: SceneNodeId, renderable: RenderableId) {
        if let Some(n) = self.nodes.get_mut(&node) {
            if !n.renderables.contains(&renderable) {
                n.renderables.push(renderable);
            }
        }
    }

    fn detach_renderable(&mut self, node: SceneNodeId, renderable: RenderableId) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.renderables.retain(|r| *r != renderable);
        }
    }

    fn load_page_material(&mut self, page: PageCoord) -> Result<()> {
        self.materials.insert(page);
        Ok(())
    }

    fn unload_page_material(&mut self, page: PageCoord) {
        self.materials.remove(&page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_graph_has_root() {
        let graph = SceneGraph::new();
        assert_eq!(graph.node_count(), 1);
        assert!(graph.get(graph.root()).is_some());
    }

    #[test]
    fn test_create_under_root_by_default() {
        let mut graph = SceneGraph::new();
        let page = graph.create_node(None, "page", Vec3::ZERO);
        assert_eq!(graph.get(page).and_then(|n| n.parent), Some(graph.root()));
        assert_eq!(graph.children(graph.root()).collect::<Vec<_>>(), vec![page]);
    }

    #[test]
    fn test_destroy_removes_subtree() {
        let mut graph = SceneGraph::new();
        let page = graph.create_node(None, "page", Vec3::ZERO);
        let tile = graph.create_node(Some(page), "tile", Vec3::ONE);
        graph.attach_renderable(tile, RenderableId(3));
        assert_eq!(graph.attached_count(), 1);

        graph.destroy_node(page);
        assert_eq!(graph.node_count(), 1);
        assert!(graph.get(tile).is_none());
        assert_eq!(graph.attached_count(), 0);
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        graph.remove(root);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut graph = SceneGraph::new();
        let node = graph.create_node(None, "tile", Vec3::ZERO);
        graph.attach_renderable(node, RenderableId(1));
        graph.attach_renderable(node, RenderableId(1));
        assert_eq!(graph.attached_count(), 1);
        graph.detach_renderable(node, RenderableId(1));
        assert_eq!(graph.attached_count(), 0);
    }

    #[test]
    fn test_materials() {
        let mut graph = SceneGraph::new();
        let page = PageCoord::new(1, 2);
        graph.load_page_material(page).expect("in-memory load");
        assert!(graph.is_material_loaded(page));
        graph.unload_page_material(page);
        assert!(!graph.is_material_loaded(page));
    }
}
