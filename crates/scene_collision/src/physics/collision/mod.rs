//! Collision geometry and narrow-phase tests
//!
//! Shapes are stored in model space on their owning component and
//! transformed to world space when the component moves; every test in
//! [`narrow_phase`] works on the cached world-space form.
//!
//! # Module Organization
//!
//! - [`bounds`] - Axis-aligned bounding boxes
//! - [`primitives`] - Rays, triangles, spheres, oriented boxes, capsules
//! - [`shape`] - Model-space and world-space collision shapes
//! - [`narrow_phase`] - Pairwise overlap tests and segment casts
//! - [`mesh_bvh`] - Per-mesh triangle hierarchy for ray picking

pub mod bounds;
pub mod primitives;
pub mod shape;
pub mod narrow_phase;
pub mod mesh_bvh;

// Re-export commonly used types
pub use bounds::AABB;
pub use primitives::{BoundingSphere, Capsule, OrientedBox, Ray, Triangle};
pub use shape::{CollisionShape, ShapeType, WorldSpaceShape};
pub use narrow_phase::{line_intersect_volume, test_overlap};
pub use mesh_bvh::{BvhHit, BvhNode, MeshBvh};
