//! Physics module for collision detection and overlap tracking
//!
//! Geometry and narrow-phase tests live in [`collision`]; the per-frame
//! begin/end overlap state machine lives in [`overlap_manager`].

pub mod collision;
pub mod overlap_manager;

pub use collision::{
    CollisionShape,
    WorldSpaceShape,
    AABB,
    Ray,
    MeshBvh,
};
pub use overlap_manager::{OverlapManager, OverlapPair, OverlapStats};
