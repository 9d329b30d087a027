//! # Scene Collision
//!
//! Spatial partitioning and overlap tracking for a scene of actors and
//! their collidable primitive components.
//!
//! ## Features
//!
//! - **Mesh BVH**: Per-mesh triangle hierarchy for ray picking
//! - **Narrow Phase**: Sphere, oriented box and capsule overlap tests
//! - **Octree**: Scene broad phase; primitives outside the root wait on a budgeted queue
//! - **Overlap Events**: Begin/end notifications delivered to both components of a pair
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_collision::prelude::*;
//!
//! let mut scene = Scene::new(CollisionConfig::default());
//! let ship = scene.spawn_actor("ship");
//! let rock = scene.spawn_actor("rock");
//!
//! let hull = scene
//!     .add_component(ship, PrimitiveComponent::new(CollisionShape::sphere(1.0)))
//!     .unwrap();
//! scene
//!     .add_component(
//!         rock,
//!         PrimitiveComponent::new(CollisionShape::sphere(1.0))
//!             .with_transform(Transform::from_position(Vec3::new(1.5, 0.0, 0.0))),
//!     )
//!     .unwrap();
//!
//! let mut overlaps = OverlapManager::new();
//! overlaps.on_begin_overlap(|event: &OverlapEvent, _: &mut Scene| {
//!     println!("{:?} touched {:?}", event.actor, event.other_actor);
//! });
//!
//! scene.update_spatial();
//! overlaps.update(&mut scene);
//! assert_eq!(scene.overlapping_components(hull).len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod physics;
pub mod spatial;
pub mod scene;
pub mod events;
pub mod assets;
pub mod input;

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        assets::BvhCache,
        config::{CollisionConfig, Config, ConfigError},
        events::{OverlapEvent, OverlapEventKind, OverlapHandler},
        foundation::{
            collections::{ActorId, ComponentKey},
            math::{Quat, Transform, Vec3},
        },
        input::{PickHit, PickingSystem},
        physics::{
            CollisionShape, MeshBvh, OverlapManager, OverlapPair, OverlapStats, Ray,
            WorldSpaceShape, AABB,
        },
        scene::{Actor, Collidable, ComponentFlags, Mobility, PrimitiveComponent, Scene, SceneError},
        spatial::{Octree, OctreeConfig, SpatialQuery},
    };
}
