//! Scene context: actors, their collidable components and the broad phase
//!
//! The [`Scene`] is the single owner of every component and of the spatial
//! structures indexing them. Components and actors are addressed through
//! generational handles; a handle to something destroyed simply stops
//! resolving.

mod actor;
mod component;
mod level;

pub use actor::Actor;
pub use component::{Collidable, ComponentFlags, Mobility, OverlapInfo, PrimitiveComponent};
pub use level::{Scene, SceneError};
