//! Scene attachment points for terrain pages and tiles

pub mod host;
pub mod node;
pub mod graph;

pub use host::SceneHost;
pub use node::{SceneNode, SceneNodeId};
pub use graph::SceneGraph;
