//! Primitive collision shapes and intersection algorithms
//!
//! Provides basic geometric primitives (rays, triangles, spheres, oriented
//! boxes, capsules) with the closest-point helpers the narrow phase is
//! built from. All primitives here are in world space.

use crate::foundation::math::{Mat3, Quat, Vec3, EPSILON};
use super::bounds::AABB;

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// The direction of the ray (normalized on construction)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// A triangle for collision detection
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Calculates the centroid (center point) of the triangle
    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Bounds of the three vertices
    pub fn bounds(&self) -> AABB {
        let mut aabb = AABB::new(self.v0, self.v0);
        aabb.grow_point(&self.v1);
        aabb.grow_point(&self.v2);
        aabb
    }

    /// Möller-Trumbore ray-triangle intersection algorithm
    /// Returns (t, u, v) barycentric coordinates if hit, None otherwise
    ///
    /// See: "Fast, Minimum Storage Ray/Triangle Intersection" by Möller & Trumbore
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32, f32)> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(&edge2);
        let a = edge1.dot(&h);

        // Ray parallel to triangle
        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * ray.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        if t >= 0.0 {
            Some((t, u, v))
        } else {
            None
        }
    }
}

/// A sphere in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// The center position of the sphere in world space
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// World-space bounds
    pub fn bounds(&self) -> AABB {
        AABB::from_center_extents(self.center, Vec3::repeat(self.radius))
    }
}

/// An oriented box in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    /// Box center
    pub center: Vec3,
    /// Half size along each local axis
    pub half_extents: Vec3,
    /// Orientation of the local axes
    pub rotation: Quat,
}

impl OrientedBox {
    /// Creates a new oriented box
    pub fn new(center: Vec3, half_extents: Vec3, rotation: Quat) -> Self {
        Self { center, half_extents, rotation }
    }

    /// The three unit local axes expressed in world space
    pub fn axes(&self) -> [Vec3; 3] {
        let m: Mat3 = self.rotation.to_rotation_matrix().into_inner();
        [m.column(0).into_owned(), m.column(1).into_owned(), m.column(2).into_owned()]
    }

    /// World point expressed in the box's local frame (relative to the center)
    pub fn to_local(&self, point: &Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.center)
    }

    /// The box as an AABB in its own local frame
    pub fn local_aabb(&self) -> AABB {
        AABB::from_center_extents(Vec3::zeros(), self.half_extents)
    }

    /// World-space bounds
    pub fn bounds(&self) -> AABB {
        let m = self.rotation.to_rotation_matrix().into_inner().abs();
        AABB::from_center_extents(self.center, m * self.half_extents)
    }
}

/// A capsule in world space: every point within `radius` of a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    /// Center of the core segment
    pub center: Vec3,
    /// Unit direction of the core segment
    pub axis: Vec3,
    /// Half the length of the core segment (excluding the caps)
    pub half_height: f32,
    /// Radius around the segment
    pub radius: f32,
}

impl Capsule {
    /// Creates a capsule whose core segment runs along `axis` through `center`
    pub fn new(center: Vec3, axis: Vec3, half_height: f32, radius: f32) -> Self {
        let axis = if axis.norm_squared() < EPSILON { Vec3::y() } else { axis.normalize() };
        Self { center, axis, half_height: half_height.max(0.0), radius }
    }

    /// Endpoints of the core segment
    pub fn segment(&self) -> (Vec3, Vec3) {
        let offset = self.axis * self.half_height;
        (self.center - offset, self.center + offset)
    }

    /// World-space bounds
    pub fn bounds(&self) -> AABB {
        let (a, b) = self.segment();
        let mut aabb = AABB::new(a, a);
        aabb.grow_point(&b);
        aabb.expanded(self.radius)
    }
}

/// Entry distance of a ray into a sphere (0 if the origin is inside)
pub fn ray_sphere_entry(origin: &Vec3, direction: &Vec3, center: &Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let a = direction.dot(direction);
    if a < EPSILON {
        return None;
    }
    let b = 2.0 * oc.dot(direction);
    let c = oc.dot(&oc) - radius * radius;

    if c <= 0.0 {
        return Some(0.0);
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let t = (-b - discriminant.sqrt()) / (2.0 * a);
    if t >= 0.0 {
        Some(t)
    } else {
        None
    }
}

/// Closest point to `point` on segment `[a, b]`
pub fn closest_point_on_segment(point: &Vec3, a: &Vec3, b: &Vec3) -> Vec3 {
    let ab = b - a;
    let length_sq = ab.norm_squared();
    if length_sq < EPSILON {
        return *a;
    }
    let t = ((point - a).dot(&ab) / length_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest points between segments `[p1, q1]` and `[p2, q2]`
///
/// Returns `(point_on_first, point_on_second)`. Handles degenerate
/// (point-like) and parallel segments.
#[allow(clippy::many_single_char_names)]
pub fn closest_points_between_segments(p1: &Vec3, q1: &Vec3, p2: &Vec3, q2: &Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.dot(&d1);
    let e = d2.dot(&d2);
    let f = d2.dot(&r);

    if a < EPSILON && e < EPSILON {
        return (*p1, *p2);
    }

    let (s, t);
    if a < EPSILON {
        s = 0.0;
        t = (f / e).clamp(0.0, 1.0);
    } else {
        let c = d1.dot(&r);
        if e < EPSILON {
            t = 0.0;
            s = (-c / a).clamp(0.0, 1.0);
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;

            let s_initial = if denom > EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                // Parallel segments: any s works, pick the start
                0.0
            };

            let t_unclamped = (b * s_initial + f) / e;
            if t_unclamped < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t_unclamped > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            } else {
                t = t_unclamped;
                s = s_initial;
            }
        }
    }

    (p1 + d1 * s, p2 + d2 * t)
}
