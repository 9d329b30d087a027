//! Spatial partitioning data structures
//!
//! Provides the scene-level broad phase: an octree over primitive bounds,
//! the queue of primitives waiting to be (re)inserted, and frustum culling.

mod octree;
mod spatial_query;
mod dynamic_queue;
mod frustum;

pub use octree::{Octree, OctreeConfig, OctreeNode, OctreeStats};
pub use spatial_query::SpatialQuery;
pub use dynamic_queue::{DynamicEntry, DynamicPrimitiveQueue, ReinsertStats};
pub use frustum::{Frustum, Plane};
