//! Narrow-phase shape tests
//!
//! Stateless, exact overlap tests between world-space shapes and segment
//! casts against a single shape. Dispatch is an explicit `match` on the pair
//! of shape variants; each pair is routed to one function regardless of
//! argument order, so `test_overlap(a, b) == test_overlap(b, a)`.
//!
//! Touching shapes (distance exactly equal to the sum of radii, or boxes
//! whose projections meet at a single value) count as overlapping.

use std::cmp::Ordering;

use crate::foundation::math::{Vec3, EPSILON};
use super::bounds::AABB;
use super::primitives::{
    closest_point_on_segment, closest_points_between_segments, ray_sphere_entry, BoundingSphere,
    Capsule, OrientedBox,
};
use super::shape::WorldSpaceShape;

/// Test whether two world-space shapes overlap
pub fn test_overlap(a: &WorldSpaceShape, b: &WorldSpaceShape) -> bool {
    use WorldSpaceShape::{Capsule as C, Obb as O, Sphere as S};

    match (a, b) {
        (S(a), S(b)) => sphere_sphere(a, b),
        (S(s), O(o)) | (O(o), S(s)) => sphere_obb(s, o),
        (S(s), C(c)) | (C(c), S(s)) => sphere_capsule(s, c),
        (O(a), O(b)) => {
            let (first, second) = canonical_order(a, b, |o| o.center);
            obb_obb(first, second)
        }
        (O(o), C(c)) | (C(c), O(o)) => obb_capsule(o, c),
        (C(a), C(b)) => {
            let (first, second) = canonical_order(a, b, |c| c.center);
            capsule_capsule(first, second)
        }
    }
}

/// Cast the segment `start -> end` against a shape
///
/// Returns the first point of the shape the segment touches, or `start`
/// itself when the segment begins inside the shape.
pub fn line_intersect_volume(start: &Vec3, end: &Vec3, shape: &WorldSpaceShape) -> Option<Vec3> {
    let direction = end - start;
    let t = match shape {
        WorldSpaceShape::Sphere(sphere) => segment_sphere(start, &direction, sphere),
        WorldSpaceShape::Obb(obb) => segment_obb(start, end, obb),
        WorldSpaceShape::Capsule(capsule) => segment_capsule(start, &direction, capsule),
    }?;
    Some(start + direction * t)
}

/// Same-type pairs are evaluated in a fixed order so floating-point
/// rounding cannot make the result depend on argument order.
fn canonical_order<'a, T>(a: &'a T, b: &'a T, center: impl Fn(&T) -> Vec3) -> (&'a T, &'a T) {
    let (ca, cb) = (center(a), center(b));
    let ordering = ca
        .iter()
        .zip(cb.iter())
        .map(|(x, y)| x.total_cmp(y))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal);

    if ordering == Ordering::Greater {
        (b, a)
    } else {
        (a, b)
    }
}

/// Distance between centers against the sum of radii
pub fn sphere_sphere(a: &BoundingSphere, b: &BoundingSphere) -> bool {
    let radius_sum = a.radius + b.radius;
    (a.center - b.center).norm_squared() <= radius_sum * radius_sum
}

/// Sphere center clamped into box space against the radius
pub fn sphere_obb(sphere: &BoundingSphere, obb: &OrientedBox) -> bool {
    let local = obb.to_local(&sphere.center);
    let clamped = obb.local_aabb().closest_point(&local);
    (local - clamped).norm_squared() <= sphere.radius * sphere.radius
}

/// Closest point on the capsule segment against the radii
pub fn sphere_capsule(sphere: &BoundingSphere, capsule: &Capsule) -> bool {
    let (a, b) = capsule.segment();
    let closest = closest_point_on_segment(&sphere.center, &a, &b);
    let radius_sum = sphere.radius + capsule.radius;
    (sphere.center - closest).norm_squared() <= radius_sum * radius_sum
}

/// Closest points between the two core segments against the radii
pub fn capsule_capsule(a: &Capsule, b: &Capsule) -> bool {
    let (p1, q1) = a.segment();
    let (p2, q2) = b.segment();
    let (c1, c2) = closest_points_between_segments(&p1, &q1, &p2, &q2);
    let radius_sum = a.radius + b.radius;
    (c1 - c2).norm_squared() <= radius_sum * radius_sum
}

/// Separating-axis test over the 15 candidate axes of two boxes
///
/// Returns false on the first separating axis. Edge-pair axes from
/// (near-)parallel edges are skipped: the face axes already cover them.
pub fn obb_obb(a: &OrientedBox, b: &OrientedBox) -> bool {
    let axes_a = a.axes();
    let axes_b = b.axes();
    let t = b.center - a.center;

    let separated_on = |axis: &Vec3| -> bool {
        let ra: f32 = (0..3).map(|i| a.half_extents[i] * axes_a[i].dot(axis).abs()).sum();
        let rb: f32 = (0..3).map(|i| b.half_extents[i] * axes_b[i].dot(axis).abs()).sum();
        t.dot(axis).abs() > ra + rb
    };

    if axes_a.iter().chain(axes_b.iter()).any(|axis| separated_on(axis)) {
        return false;
    }

    for edge_a in &axes_a {
        for edge_b in &axes_b {
            let axis = edge_a.cross(edge_b);
            if axis.norm_squared() < EPSILON {
                continue;
            }
            if separated_on(&axis) {
                return false;
            }
        }
    }

    true
}

/// Capsule segment against the box inflated by the capsule radius
///
/// Works in box space: a segment crossing the box overlaps outright,
/// otherwise the exact segment-to-box distance is compared to the radius.
pub fn obb_capsule(obb: &OrientedBox, capsule: &Capsule) -> bool {
    let (a, b) = capsule.segment();
    let start = obb.to_local(&a);
    let end = obb.to_local(&b);
    let local_box = obb.local_aabb();

    if let Some((t_min, t_max)) = local_box.slab_interval(&start, &(end - start)) {
        if t_max >= 0.0 && t_min <= 1.0 {
            return true;
        }
    }

    segment_box_distance_sq(&start, &end, &local_box) <= capsule.radius * capsule.radius
}

/// Squared distance between segment `start -> end` and an axis-aligned box
///
/// The segment is split where it crosses a slab plane. On each piece every
/// axis is either inside its slab or clamped to one fixed face, so the
/// squared distance is a quadratic in the segment parameter and its
/// minimum on the piece is found in closed form.
fn segment_box_distance_sq(start: &Vec3, end: &Vec3, aabb: &AABB) -> f32 {
    let direction = end - start;
    let distance_sq_at = |t: f32| {
        let point = start + direction * t;
        (point - aabb.closest_point(&point)).norm_squared()
    };

    let mut breaks = [0.0_f32; 8];
    breaks[1] = 1.0;
    let mut count = 2;
    for axis in 0..3 {
        let d = direction[axis];
        if d.abs() < EPSILON {
            continue;
        }
        for bound in [aabb.min[axis], aabb.max[axis]] {
            let t = (bound - start[axis]) / d;
            if t > 0.0 && t < 1.0 {
                breaks[count] = t;
                count += 1;
            }
        }
    }
    let breaks = &mut breaks[..count];
    breaks.sort_unstable_by(f32::total_cmp);

    let mut best = distance_sq_at(0.0).min(distance_sq_at(1.0));
    for piece in breaks.windows(2) {
        let (t0, t1) = (piece[0], piece[1]);
        let mid = start + direction * ((t0 + t1) * 0.5);
        let face = aabb.closest_point(&mid);

        // d/dt of sum over clamped axes of (start + t * direction - face)^2
        let (mut qa, mut qb) = (0.0_f32, 0.0_f32);
        for axis in 0..3 {
            if mid[axis] != face[axis] {
                qa += direction[axis] * direction[axis];
                qb += direction[axis] * (start[axis] - face[axis]);
            }
        }
        // Constant on the piece when no clamped axis moves
        let t = if qa > 0.0 { (-qb / qa).max(t0).min(t1) } else { t0 };
        best = best.min(distance_sq_at(t));
    }
    best
}

fn segment_sphere(start: &Vec3, direction: &Vec3, sphere: &BoundingSphere) -> Option<f32> {
    if (start - sphere.center).norm_squared() <= sphere.radius * sphere.radius {
        return Some(0.0);
    }
    ray_sphere_entry(start, direction, &sphere.center, sphere.radius).filter(|t| *t <= 1.0)
}

fn segment_obb(start: &Vec3, end: &Vec3, obb: &OrientedBox) -> Option<f32> {
    let local_start = obb.to_local(start);
    let local_end = obb.to_local(end);
    let (t_min, t_max) = obb
        .local_aabb()
        .slab_interval(&local_start, &(local_end - local_start))?;

    if t_max < 0.0 || t_min > 1.0 {
        return None;
    }
    Some(t_min.max(0.0))
}

fn segment_capsule(start: &Vec3, direction: &Vec3, capsule: &Capsule) -> Option<f32> {
    let (a, b) = capsule.segment();
    let radius_sq = capsule.radius * capsule.radius;

    if (start - closest_point_on_segment(start, &a, &b)).norm_squared() <= radius_sq {
        return Some(0.0);
    }

    let mut best: Option<f32> = None;
    let mut consider = |t: f32| {
        if (0.0..=1.0).contains(&t) && best.map_or(true, |current| t < current) {
            best = Some(t);
        }
    };

    // Cylindrical body
    let axis = capsule.axis;
    let m = start - a;
    let d_perp = direction - axis * direction.dot(&axis);
    let m_perp = m - axis * m.dot(&axis);
    let qa = d_perp.norm_squared();
    if qa > EPSILON {
        let qb = 2.0 * m_perp.dot(&d_perp);
        let qc = m_perp.norm_squared() - radius_sq;
        let discriminant = qb * qb - 4.0 * qa * qc;
        if discriminant >= 0.0 {
            let t = (-qb - discriminant.sqrt()) / (2.0 * qa);
            let along = (m + direction * t).dot(&axis);
            if (0.0..=2.0 * capsule.half_height).contains(&along) {
                consider(t);
            }
        }
    }

    // Hemispherical caps
    for cap in [a, b] {
        if let Some(t) = ray_sphere_entry(start, direction, &cap, capsule.radius) {
            consider(t);
        }
    }

    best
}
