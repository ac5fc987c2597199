//! Tile vertex layout.

use bytemuck::{Pod, Zeroable};

use crate::core::types::Vec3;

/// One terrain vertex, laid out for direct upload with `bytemuck::cast_slice`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    /// World-space position
    pub position: [f32; 3],
    /// Unit surface normal
    pub normal: [f32; 3],
    /// Page-relative texture coordinate (0..1 across the page)
    pub uv: [f32; 2],
}

impl TerrainVertex {
    pub fn new(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(std::mem::size_of::<TerrainVertex>(), 32);
        let verts = [TerrainVertex::new(Vec3::new(1.0, 2.0, 3.0), Vec3::Y, [0.5, 0.25])];
        let bytes: &[u8] = bytemuck::cast_slice(&verts);
        assert_eq!(bytes.len(), 32);
        assert_eq!(verts[0].position(), Vec3::new(1.0, 2.0, 3.0));
    }
}
