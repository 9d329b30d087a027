//! Abstract spatial query interface for broad-phase collision detection
//!
//! The overlap manager and the picker only talk to the broad phase through
//! this trait, so the partitioning scheme can be swapped without touching
//! them.

use crate::foundation::collections::ComponentKey;
use crate::physics::collision::{Ray, AABB};
use super::octree::Octree;

/// Abstract interface for spatial partitioning used in broad-phase collision detection
pub trait SpatialQuery: Send + Sync {
    /// Insert a primitive by its world bounds; false if it cannot be stored
    fn insert(&mut self, key: ComponentKey, bounds: AABB) -> bool;

    /// Remove a primitive; false if it was not stored
    fn remove(&mut self, key: ComponentKey) -> bool;

    /// Move a primitive to new bounds
    fn update(&mut self, key: ComponentKey, bounds: AABB) -> bool {
        self.remove(key);
        self.insert(key, bounds)
    }

    /// Candidate primitives that may overlap `aabb`
    fn query_aabb(&self, aabb: &AABB) -> Vec<ComponentKey>;

    /// Candidate primitives the ray may hit within `max_distance`
    fn query_ray(&self, ray: &Ray, max_distance: f32) -> Vec<ComponentKey>;

    /// Check whether a primitive is stored
    fn contains(&self, key: ComponentKey) -> bool;

    /// Clear all primitives from the spatial structure
    fn clear(&mut self);

    /// Get the number of primitives in the structure
    fn primitive_count(&self) -> usize;
}

impl SpatialQuery for Octree {
    fn insert(&mut self, key: ComponentKey, bounds: AABB) -> bool {
        Octree::insert(self, key, bounds)
    }

    fn remove(&mut self, key: ComponentKey) -> bool {
        Octree::remove(self, key)
    }

    fn update(&mut self, key: ComponentKey, bounds: AABB) -> bool {
        // Octree::insert already relocates a stored key, and leaves it in
        // place when the new bounds do not fit
        if Octree::insert(self, key, bounds) {
            return true;
        }
        Octree::remove(self, key);
        false
    }

    fn query_aabb(&self, aabb: &AABB) -> Vec<ComponentKey> {
        let mut results = Vec::new();
        Octree::query_aabb(self, aabb, &mut results);
        results
    }

    fn query_ray(&self, ray: &Ray, max_distance: f32) -> Vec<ComponentKey> {
        let mut results = Vec::new();
        Octree::query_ray(self, ray, max_distance, &mut results);
        results
    }

    fn contains(&self, key: ComponentKey) -> bool {
        Octree::contains(self, key)
    }

    fn clear(&mut self) {
        Octree::clear(self);
    }

    fn primitive_count(&self) -> usize {
        self.len()
    }
}
