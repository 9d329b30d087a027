//! Ray picking
//!
//! Scene picking narrows octree and dynamic-primitive candidates along the
//! ray, then casts the ray segment against each candidate's world shape and
//! keeps the nearest hit. Mesh picking transforms the ray into mesh space
//! and asks the mesh BVH, which returns the first hit its best-first
//! traversal finds.

use log::trace;

use crate::foundation::collections::{ActorId, ComponentKey};
use crate::foundation::math::{Transform, Vec3, EPSILON};
use crate::physics::collision::{line_intersect_volume, MeshBvh, Ray};
use crate::scene::{Collidable, ComponentFlags, Scene};

/// Longest segment cast when picking with an unbounded distance
pub const MAX_PICK_DISTANCE: f32 = 10_000.0;

/// Result of a successful pick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// Component that was hit
    pub component: ComponentKey,
    /// Its owner
    pub actor: ActorId,
    /// Distance from the ray origin
    pub distance: f32,
    /// World-space hit location
    pub location: Vec3,
}

/// Picks components along rays and remembers the last selection
#[derive(Debug, Clone, Default)]
pub struct PickingSystem {
    selected: Option<ComponentKey>,
}

impl PickingSystem {
    /// Create a picking system with nothing selected
    pub fn new() -> Self {
        Self::default()
    }

    /// Nearest pickable component hit within `max_distance`, which becomes the selection
    ///
    /// Components without a collision shape are picked by their bounds.
    pub fn pick(&mut self, scene: &Scene, ray: &Ray, max_distance: f32) -> Option<PickHit> {
        let reach = max_distance.min(MAX_PICK_DISTANCE);
        let end = ray.point_at(reach);

        let mut candidates = scene.spatial().query_ray(ray, reach);
        candidates.extend(scene.dynamic_primitives());
        candidates.sort_unstable();
        candidates.dedup();

        let mut closest: Option<PickHit> = None;
        for key in candidates {
            let Some(component) = scene.component(key) else {
                continue;
            };
            let Some(actor) = component.owner() else {
                continue;
            };
            if !component.flags().contains(ComponentFlags::PICKABLE) {
                continue;
            }

            let location = match component.collision_shape() {
                Some(shape) => line_intersect_volume(&ray.origin, &end, shape),
                None => component
                    .calc_bounds()
                    .intersect_ray(ray)
                    .filter(|t| *t <= reach)
                    .map(|t| ray.point_at(t)),
            };
            let Some(location) = location else {
                continue;
            };

            let distance = (location - ray.origin).norm();
            trace!("Pick candidate {key:?} hit at {distance:.3}");
            if closest.map_or(true, |hit| distance < hit.distance) {
                closest = Some(PickHit { component: key, actor, distance, location });
            }
        }

        self.selected = closest.map(|hit| hit.component);
        closest
    }

    /// Currently selected component
    pub fn selected(&self) -> Option<ComponentKey> {
        self.selected
    }

    /// Drop the selection
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// World-space distance along `ray` to a mesh placed at `transform`
    pub fn pick_mesh(bvh: &MeshBvh, transform: &Transform, ray: &Ray) -> Option<f32> {
        let local_direction = transform.inverse_transform_vector(&ray.direction);
        if local_direction.norm_squared() < EPSILON * EPSILON {
            return None;
        }
        let local_ray = Ray::new(transform.inverse_transform_point(&ray.origin), local_direction);

        let local_distance = bvh.intersect_ray(&local_ray)?;
        let world_hit = transform.transform_point(&local_ray.point_at(local_distance));
        Some((world_hit - ray.origin).norm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollisionConfig;
    use crate::foundation::math::Quat;
    use crate::physics::collision::CollisionShape;
    use crate::scene::PrimitiveComponent;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn sphere_at(z: f32) -> PrimitiveComponent {
        PrimitiveComponent::new(CollisionShape::sphere(1.0))
            .with_transform(Transform::from_position(Vec3::new(0.0, 0.0, z)))
    }

    #[test]
    fn test_pick_returns_nearest_hit() {
        let mut scene = Scene::default();
        let near_actor = scene.spawn_actor("near");
        let far_actor = scene.spawn_actor("far");
        let near = scene.add_component(near_actor, sphere_at(-5.0)).unwrap();
        scene.add_component(far_actor, sphere_at(-10.0)).unwrap();

        let mut picking = PickingSystem::new();
        let ray = Ray::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));
        let hit = picking.pick(&scene, &ray, f32::INFINITY).unwrap();

        assert_eq!(hit.component, near);
        assert_eq!(hit.actor, near_actor);
        assert_relative_eq!(hit.distance, 4.0, epsilon = 1.0e-4);
        assert_eq!(picking.selected(), Some(near));
    }

    #[test]
    fn test_pick_respects_distance_and_flags() {
        let mut scene = Scene::default();
        let actor = scene.spawn_actor("target");
        let hidden = scene
            .add_component(actor, sphere_at(-5.0).with_flags(ComponentFlags::GENERATE_OVERLAP_EVENTS))
            .unwrap();
        let far = scene.add_component(actor, sphere_at(-30.0)).unwrap();

        let mut picking = PickingSystem::new();
        let ray = Ray::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));
        assert!(picking.pick(&scene, &ray, 20.0).is_none());
        assert!(picking.selected().is_none());

        let hit = picking.pick(&scene, &ray, 100.0).unwrap();
        assert_ne!(hit.component, hidden);
        assert_eq!(hit.component, far);
    }

    #[test]
    fn test_pick_sees_components_outside_octree() {
        let mut config = CollisionConfig::default();
        config.octree.world_min = Vec3::repeat(-10.0);
        config.octree.world_max = Vec3::repeat(10.0);
        let mut scene = Scene::new(config);
        let actor = scene.spawn_actor("mover");
        let key = scene.add_component(actor, sphere_at(5.0)).unwrap();
        scene.set_transform(key, Transform::from_position(Vec3::new(0.0, 0.0, -30.0))).unwrap();
        assert!(!scene.octree().contains(key));

        let ray = Ray::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));
        let hit = PickingSystem::new().pick(&scene, &ray, 100.0).unwrap();
        assert_eq!(hit.component, key);
        assert_relative_eq!(hit.location, Vec3::new(0.0, 0.0, -29.0), epsilon = 1.0e-4);
    }

    #[test]
    fn test_pick_mesh_through_transform() {
        let vertices = [
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let bvh = MeshBvh::build(&vertices, &[0, 1, 2], 4);

        // Triangle stood up to face +X, scaled x2, placed at x = 10
        let transform = Transform::from_position_rotation(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::from_axis_angle(&Vec3::y_axis(), FRAC_PI_2),
        )
        .with_scale(Vec3::repeat(2.0));

        let ray = Ray::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        let distance = PickingSystem::pick_mesh(&bvh, &transform, &ray).unwrap();
        assert_relative_eq!(distance, 10.0, epsilon = 1.0e-4);

        let miss = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(PickingSystem::pick_mesh(&bvh, &transform, &miss).is_none());
    }
}
