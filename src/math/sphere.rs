//! Bounding sphere

use crate::core::types::Vec3;
use super::aabb::Aabb;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Smallest sphere centered on the box that encloses it
    pub fn from_aabb(aabb: &Aabb) -> Self {
        Self {
            center: aabb.center(),
            radius: aabb.half_extent().length(),
        }
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        self.center.distance_squared(p) <= self.radius * self.radius
    }

    /// Touching spheres count as intersecting
    pub fn intersects(&self, other: &BoundingSphere) -> bool {
        let r = self.radius + other.radius;
        self.center.distance_squared(other.center) <= r * r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_aabb() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));
        let sphere = BoundingSphere::from_aabb(&aabb);
        assert_eq!(sphere.center, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(sphere.radius, 1.0);
    }

    #[test]
    fn test_intersects() {
        let a = BoundingSphere::new(Vec3::ZERO, 1.0);
        let b = BoundingSphere::new(Vec3::new(1.5, 0.0, 0.0), 1.0);
        let c = BoundingSphere::new(Vec3::new(3.0, 0.0, 0.0), 0.5);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.contains_point(Vec3::new(0.5, 0.5, 0.0)));
    }
}
