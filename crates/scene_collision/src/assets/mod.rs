//! Asset-side caches for collision data

pub mod bvh_cache;

pub use bvh_cache::BvhCache;
