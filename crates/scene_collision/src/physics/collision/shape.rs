//! High-level collision shape abstractions
//!
//! Shapes are authored in model space ([`CollisionShape`]) and cached in
//! world space ([`WorldSpaceShape`]) by the owning component whenever its
//! transform changes. The narrow phase only ever sees world-space shapes.

use crate::foundation::math::{Transform, Vec3};
use super::bounds::AABB;
use super::primitives::{BoundingSphere, Capsule, OrientedBox};
use serde::{Deserialize, Serialize};

/// Type tag of a collision shape, used for explicit pair dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeType {
    /// Sphere
    Sphere,
    /// Oriented box
    Obb,
    /// Capsule
    Capsule,
}

/// Collision shape types (stored in MODEL SPACE)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CollisionShape {
    /// Sphere around a local offset
    Sphere {
        /// Local-space center offset
        center: Vec3,
        /// Unscaled radius
        radius: f32,
    },
    /// Box around a local offset
    Obb {
        /// Local-space center offset
        center: Vec3,
        /// Unscaled half size along each local axis
        half_extents: Vec3,
    },
    /// Capsule along the local Y axis
    Capsule {
        /// Local-space center offset
        center: Vec3,
        /// Half length of the core segment, excluding the caps
        half_height: f32,
        /// Unscaled radius
        radius: f32,
    },
}

impl CollisionShape {
    /// Creates a spherical collision shape centered on the owner
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { center: Vec3::zeros(), radius }
    }

    /// Creates a box collision shape centered on the owner
    pub fn obb(half_extents: Vec3) -> Self {
        Self::Obb { center: Vec3::zeros(), half_extents }
    }

    /// Creates a Y-aligned capsule centered on the owner
    pub fn capsule(half_height: f32, radius: f32) -> Self {
        Self::Capsule { center: Vec3::zeros(), half_height, radius }
    }

    /// Type tag
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Self::Sphere { .. } => ShapeType::Sphere,
            Self::Obb { .. } => ShapeType::Obb,
            Self::Capsule { .. } => ShapeType::Capsule,
        }
    }

    /// Transform this shape to world space
    ///
    /// Radii scale by the largest scale component so spheres stay spheres
    /// under non-uniform scale; a capsule's length follows the Y scale.
    /// Negative sizes are taken by magnitude.
    pub fn to_world_space(&self, transform: &Transform) -> WorldSpaceShape {
        match *self {
            Self::Sphere { center, radius } => WorldSpaceShape::Sphere(BoundingSphere::new(
                transform.transform_point(&center),
                radius.abs() * transform.max_scale(),
            )),
            Self::Obb { center, half_extents } => WorldSpaceShape::Obb(OrientedBox::new(
                transform.transform_point(&center),
                half_extents.abs().component_mul(&transform.scale.abs()),
                transform.rotation,
            )),
            Self::Capsule { center, half_height, radius } => {
                let radial_scale = transform.scale.x.abs().max(transform.scale.z.abs());
                WorldSpaceShape::Capsule(Capsule::new(
                    transform.transform_point(&center),
                    transform.rotation * Vec3::y(),
                    half_height.abs() * transform.scale.y.abs(),
                    radius.abs() * radial_scale,
                ))
            }
        }
    }
}

/// World-space collision shape, cached by the owning component
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldSpaceShape {
    /// World-space sphere
    Sphere(BoundingSphere),
    /// World-space oriented box
    Obb(OrientedBox),
    /// World-space capsule
    Capsule(Capsule),
}

impl WorldSpaceShape {
    /// Type tag
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Self::Sphere(_) => ShapeType::Sphere,
            Self::Obb(_) => ShapeType::Obb,
            Self::Capsule(_) => ShapeType::Capsule,
        }
    }

    /// Get center position
    pub fn center(&self) -> Vec3 {
        match self {
            Self::Sphere(sphere) => sphere.center,
            Self::Obb(obb) => obb.center,
            Self::Capsule(capsule) => capsule.center,
        }
    }

    /// Tight world-space bounds
    pub fn bounds(&self) -> AABB {
        match self {
            Self::Sphere(sphere) => sphere.bounds(),
            Self::Obb(obb) => obb.bounds(),
            Self::Capsule(capsule) => capsule.bounds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_sphere_world_space_uses_max_scale() {
        let transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0))
            .with_scale(Vec3::new(1.0, 4.0, 2.0));
        let shape = CollisionShape::sphere(1.5).to_world_space(&transform);

        match shape {
            WorldSpaceShape::Sphere(sphere) => {
                assert_relative_eq!(sphere.center, Vec3::new(1.0, 2.0, 3.0));
                assert_relative_eq!(sphere.radius, 6.0);
            }
            other => panic!("expected sphere, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_sizes_are_taken_by_magnitude() {
        let boxed = CollisionShape::obb(Vec3::new(-1.0, 1.0, 1.0)).to_world_space(&Transform::identity());
        let ball = CollisionShape::sphere(-1.0)
            .to_world_space(&Transform::from_position(Vec3::new(1.5, 0.0, 0.0)));

        match boxed {
            WorldSpaceShape::Obb(obb) => assert_eq!(obb.half_extents, Vec3::repeat(1.0)),
            other => panic!("expected box, got {other:?}"),
        }
        assert_relative_eq!(ball.bounds().min.x, 0.5);
        assert!(crate::physics::collision::test_overlap(&ball, &boxed));
        assert!(crate::physics::collision::test_overlap(&boxed, &ball));
    }

    #[test]
    fn test_capsule_follows_rotation() {
        let transform = Transform::from_position_rotation(
            Vec3::zeros(),
            Quat::from_axis_angle(&Vec3::z_axis(), FRAC_PI_2),
        );
        let shape = CollisionShape::capsule(2.0, 0.5).to_world_space(&transform);
        let bounds = shape.bounds();

        assert_eq!(shape.shape_type(), ShapeType::Capsule);
        assert_relative_eq!(bounds.max.x, 2.5, epsilon = 1.0e-5);
        assert_relative_eq!(bounds.max.y, 0.5, epsilon = 1.0e-5);
    }

    #[test]
    fn test_obb_offset_center_is_transformed() {
        let shape = CollisionShape::Obb {
            center: Vec3::new(1.0, 0.0, 0.0),
            half_extents: Vec3::new(0.5, 0.5, 0.5),
        };
        let world = shape.to_world_space(&Transform::from_position(Vec3::new(0.0, 10.0, 0.0)));
        assert_relative_eq!(world.center(), Vec3::new(1.0, 10.0, 0.0));
        assert_eq!(world.shape_type(), ShapeType::Obb);
    }
}
