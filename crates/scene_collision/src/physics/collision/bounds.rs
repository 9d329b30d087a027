//! Axis-aligned bounding boxes
//!
//! Used for the broad phase (octree regions and query boxes), for BVH node
//! bounds, and as the world-space bounds every collidable reports.

use crate::foundation::math::{component_max, component_min, Vec3, EPSILON};
use super::primitives::Ray;
use serde::{Deserialize, Serialize};

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Inverted box that any `grow` call replaces
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::MAX),
            max: Vec3::repeat(f32::MIN),
        }
    }

    /// Smallest box enclosing every point, `None` for an empty iterator
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut aabb = Self::new(first, first);
        for point in iter {
            aabb.grow_point(point);
        }
        Some(aabb)
    }

    /// True while no point has been added to an `empty()` box
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Index (0 = X, 1 = Y, 2 = Z) of the axis with the largest half-extent
    pub fn longest_axis(&self) -> usize {
        let extents = self.extents();
        if extents.x >= extents.y && extents.x >= extents.z {
            0
        } else if extents.y >= extents.z {
            1
        } else {
            2
        }
    }

    /// Expand to include a point
    pub fn grow_point(&mut self, point: &Vec3) {
        self.min = component_min(&self.min, point);
        self.max = component_max(&self.max, point);
    }

    /// Expand to include another box
    pub fn grow(&mut self, other: &AABB) {
        self.min = component_min(&self.min, &other.min);
        self.max = component_max(&self.max, &other.max);
    }

    /// Box grown by `margin` on every side
    pub fn expanded(&self, margin: f32) -> AABB {
        let margin = Vec3::repeat(margin);
        AABB::new(self.min - margin, self.max + margin)
    }

    /// Check if `other` lies entirely inside this box (touching faces count)
    pub fn contains(&self, other: &AABB) -> bool {
        other.min.x >= self.min.x && other.max.x <= self.max.x &&
        other.min.y >= self.min.y && other.max.y <= self.max.y &&
        other.min.z >= self.min.z && other.max.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Closest point of the box to `point`
    ///
    /// Never panics: an inverted or NaN box yields a meaningless point.
    pub fn closest_point(&self, point: &Vec3) -> Vec3 {
        point.zip_zip_map(&self.min, &self.max, |p, lo, hi| p.max(lo).min(hi))
    }

    /// Slab test returning the entry/exit parameters `(t_min, t_max)` along
    /// `origin + t * direction`, unclamped.
    ///
    /// Axes the direction is parallel to are skipped when the origin lies
    /// inside that slab, which keeps zero-thickness boxes (flat triangles)
    /// hittable.
    pub fn slab_interval(&self, origin: &Vec3, direction: &Vec3) -> Option<(f32, f32)> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if d.abs() < EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let mut t1 = (lo - o) * inv;
            let mut t2 = (hi - o) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }

        Some((t_min, t_max))
    }

    /// Test ray intersection with this AABB using slab method
    /// Returns the distance to the entry point if the ray intersects, None otherwise
    /// (0 when the origin is inside the box)
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let (t_min, t_max) = self.slab_interval(&ray.origin, &ray.direction)?;
        if t_max < 0.0 {
            return None;
        }
        Some(t_min.max(0.0))
    }
}
