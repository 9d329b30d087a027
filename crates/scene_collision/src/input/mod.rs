//! Ray picking against scene components and meshes

pub mod picking;

pub use picking::{PickHit, PickingSystem};
