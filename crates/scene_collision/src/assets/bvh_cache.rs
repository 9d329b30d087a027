//! Mesh BVH cache keyed by mesh path
//!
//! A BVH is built the first time a mesh path is requested and shared after
//! that. BVHs are never updated in place: a changed mesh is invalidated and
//! rebuilt from scratch on the next request.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::config::CollisionConfig;
use crate::foundation::math::Vec3;
use crate::physics::collision::MeshBvh;

/// Shared, lazily built mesh BVHs
#[derive(Debug, Clone)]
pub struct BvhCache {
    entries: HashMap<String, Arc<MeshBvh>>,
    max_leaf_size: usize,
}

impl Default for BvhCache {
    fn default() -> Self {
        Self::from_config(&CollisionConfig::default())
    }
}

impl BvhCache {
    /// Create an empty cache building BVHs with `max_leaf_size` triangles per leaf
    pub fn new(max_leaf_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_leaf_size,
        }
    }

    /// Create an empty cache using the configured leaf size
    pub fn from_config(config: &CollisionConfig) -> Self {
        Self::new(config.bvh_max_leaf_size)
    }

    /// Cached BVH for `path`, if built
    pub fn get(&self, path: &str) -> Option<Arc<MeshBvh>> {
        self.entries.get(path).cloned()
    }

    /// Cached BVH for `path`, building it from `load()` on a miss
    pub fn get_or_build(
        &mut self,
        path: &str,
        load: impl FnOnce() -> (Vec<Vec3>, Vec<u32>),
    ) -> Arc<MeshBvh> {
        match self.try_get_or_build(path, || Ok::<_, std::convert::Infallible>(load())) {
            Ok(bvh) => bvh,
            Err(never) => match never {},
        }
    }

    /// Like [`get_or_build`](Self::get_or_build) for loaders that can fail
    ///
    /// A failed load caches nothing.
    pub fn try_get_or_build<E>(
        &mut self,
        path: &str,
        load: impl FnOnce() -> Result<(Vec<Vec3>, Vec<u32>), E>,
    ) -> Result<Arc<MeshBvh>, E> {
        if let Some(bvh) = self.entries.get(path) {
            return Ok(Arc::clone(bvh));
        }

        let (vertices, indices) = load()?;
        let bvh = Arc::new(MeshBvh::build(&vertices, &indices, self.max_leaf_size));
        debug!("Cached BVH for '{path}' ({} triangles)", bvh.triangle_count());
        self.entries.insert(path.to_string(), Arc::clone(&bvh));
        Ok(bvh)
    }

    /// Forget the BVH for `path`; existing `Arc`s stay valid
    pub fn invalidate(&mut self, path: &str) -> bool {
        self.entries.remove(path).is_some()
    }

    /// Forget every BVH
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached BVHs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
