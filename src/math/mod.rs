//! Mathematical utilities and data structures

pub mod aabb;
pub mod frustum;
pub mod sphere;

pub use aabb::Aabb;
pub use frustum::{Plane, Frustum};
pub use sphere::BoundingSphere;
