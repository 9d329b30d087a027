//! Collidable primitive components
//!
//! A [`PrimitiveComponent`] carries a model-space collision shape, its
//! owner's transform, and a world-space cache of both the shape and its
//! bounds. The cache is rebuilt whenever the transform changes, so the
//! broad and narrow phase never transform shapes themselves.

use crate::foundation::collections::{ActorId, ComponentKey};
use crate::foundation::math::{Transform, Vec3};
use crate::physics::collision::{CollisionShape, OrientedBox, WorldSpaceShape, AABB};

bitflags::bitflags! {
    /// Per-component behaviour switches
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ComponentFlags: u32 {
        /// Take part in begin/end overlap tracking (both sides of a pair must opt in)
        const GENERATE_OVERLAP_EVENTS = 1 << 0;
        /// Can be hit by scene ray picking
        const PICKABLE = 1 << 1;
    }
}

impl Default for ComponentFlags {
    fn default() -> Self {
        Self::GENERATE_OVERLAP_EVENTS | Self::PICKABLE
    }
}

/// Whether a component is expected to move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mobility {
    /// Never initiates overlap tests; only found as a candidate of a mover
    Static,
    /// Re-tested against its surroundings whenever it is dirty
    #[default]
    Movable,
}

/// Bounds provider and collision shape provider contract
pub trait Collidable {
    /// World-space bounds, called every time broad-phase candidates are gathered
    fn calc_bounds(&self) -> AABB;

    /// Shape already transformed to world space, if the component has one
    fn collision_shape(&self) -> Option<&WorldSpaceShape>;
}

/// One side of a recorded overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapInfo {
    /// The other component
    pub component: ComponentKey,
    /// The other component's owner
    pub actor: ActorId,
}

/// A collidable primitive owned by an actor
#[derive(Debug, Clone)]
pub struct PrimitiveComponent {
    owner: Option<ActorId>,
    transform: Transform,
    shape: Option<CollisionShape>,
    /// Local half extents used for bounds when there is no shape
    fallback_extents: Vec3,
    world_shape: Option<WorldSpaceShape>,
    world_bounds: AABB,
    flags: ComponentFlags,
    mobility: Mobility,
    dirty: bool,
    last_move_stamp: u64,
    overlaps: Vec<OverlapInfo>,
}

impl PrimitiveComponent {
    /// Component with a collision shape at the identity transform
    pub fn new(shape: CollisionShape) -> Self {
        Self::build(Some(shape), Vec3::zeros())
    }

    /// Component without a collision shape
    ///
    /// It occupies a box of `half_extents` in the broad phase but never
    /// overlaps anything in the narrow phase.
    pub fn without_shape(half_extents: Vec3) -> Self {
        Self::build(None, half_extents)
    }

    fn build(shape: Option<CollisionShape>, fallback_extents: Vec3) -> Self {
        let fallback_extents = fallback_extents.abs();
        let mut component = Self {
            owner: None,
            transform: Transform::identity(),
            shape,
            fallback_extents,
            world_shape: None,
            world_bounds: AABB::from_center_extents(Vec3::zeros(), fallback_extents),
            flags: ComponentFlags::default(),
            mobility: Mobility::default(),
            dirty: true,
            last_move_stamp: 0,
            overlaps: Vec::new(),
        };
        component.refresh_world_cache();
        component
    }

    /// Set the initial transform (builder pattern)
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self.refresh_world_cache();
        self
    }

    /// Set mobility (builder pattern)
    pub fn with_mobility(mut self, mobility: Mobility) -> Self {
        self.mobility = mobility;
        self
    }

    /// Replace all flags (builder pattern)
    pub fn with_flags(mut self, flags: ComponentFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Owning actor, set when the component is added to a scene
    pub fn owner(&self) -> Option<ActorId> {
        self.owner
    }

    /// Current world transform
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Model-space shape
    pub fn local_shape(&self) -> Option<&CollisionShape> {
        self.shape.as_ref()
    }

    /// Behaviour flags
    pub fn flags(&self) -> ComponentFlags {
        self.flags
    }

    /// Whether this component opted in to overlap events
    pub fn generates_overlap_events(&self) -> bool {
        self.flags.contains(ComponentFlags::GENERATE_OVERLAP_EVENTS)
    }

    /// Mobility
    pub fn mobility(&self) -> Mobility {
        self.mobility
    }

    /// Set since the last time the overlap manager examined this component
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Sequence number of the latest move
    pub fn last_move_stamp(&self) -> u64 {
        self.last_move_stamp
    }

    /// Components this one currently overlaps
    pub fn overlaps(&self) -> &[OverlapInfo] {
        &self.overlaps
    }

    pub(crate) fn set_owner(&mut self, owner: ActorId) {
        self.owner = Some(owner);
    }

    pub(crate) fn apply_transform(&mut self, transform: Transform, move_stamp: u64) {
        self.transform = transform;
        self.last_move_stamp = move_stamp;
        self.dirty = true;
        self.refresh_world_cache();
    }

    pub(crate) fn stamp_move(&mut self, move_stamp: u64) {
        self.last_move_stamp = move_stamp;
    }

    pub(crate) fn set_mobility(&mut self, mobility: Mobility) {
        self.mobility = mobility;
        self.dirty = true;
    }

    pub(crate) fn set_flag(&mut self, flag: ComponentFlags, enabled: bool) {
        self.flags.set(flag, enabled);
        self.dirty = true;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn add_overlap(&mut self, info: OverlapInfo) {
        if !self.overlaps.contains(&info) {
            self.overlaps.push(info);
        }
    }

    pub(crate) fn remove_overlap(&mut self, other: ComponentKey) {
        self.overlaps.retain(|info| info.component != other);
    }

    fn refresh_world_cache(&mut self) {
        self.world_shape = self.shape.map(|shape| shape.to_world_space(&self.transform));
        self.world_bounds = match &self.world_shape {
            Some(shape) => shape.bounds(),
            None => OrientedBox::new(
                self.transform.position,
                self.fallback_extents.component_mul(&self.transform.scale.abs()),
                self.transform.rotation,
            )
            .bounds(),
        };
    }
}

impl Collidable for PrimitiveComponent {
    fn calc_bounds(&self) -> AABB {
        self.world_bounds
    }

    fn collision_shape(&self) -> Option<&WorldSpaceShape> {
        self.world_shape.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_component_is_dirty_with_cached_shape() {
        let component = PrimitiveComponent::new(CollisionShape::sphere(2.0))
            .with_transform(Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));

        assert!(component.is_dirty());
        assert!(component.generates_overlap_events());
        let bounds = component.calc_bounds();
        assert_relative_eq!(bounds.min, Vec3::new(-1.0, -2.0, -2.0));
        assert_relative_eq!(bounds.max, Vec3::new(3.0, 2.0, 2.0));
    }

    #[test]
    fn test_transform_updates_cache_and_stamp() {
        let mut component = PrimitiveComponent::new(CollisionShape::obb(Vec3::repeat(1.0)));
        component.clear_dirty();
        component.apply_transform(Transform::from_position(Vec3::new(0.0, 5.0, 0.0)), 7);

        assert!(component.is_dirty());
        assert_eq!(component.last_move_stamp(), 7);
        assert_relative_eq!(component.collision_shape().unwrap().center(), Vec3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn test_shapeless_component_uses_fallback_bounds() {
        let component = PrimitiveComponent::without_shape(Vec3::new(1.0, -2.0, 3.0))
            .with_transform(Transform::from_position(Vec3::new(10.0, 0.0, 0.0)));

        assert!(component.collision_shape().is_none());
        let bounds = component.calc_bounds();
        assert_relative_eq!(bounds.center(), Vec3::new(10.0, 0.0, 0.0));
        assert_relative_eq!(bounds.extents(), Vec3::new(1.0, 2.0, 3.0), epsilon = 1.0e-5);
    }

    #[test]
    fn test_flag_changes_mark_dirty() {
        let mut component = PrimitiveComponent::new(CollisionShape::sphere(1.0));
        component.clear_dirty();
        component.set_flag(ComponentFlags::GENERATE_OVERLAP_EVENTS, false);

        assert!(component.is_dirty());
        assert!(!component.generates_overlap_events());
        assert!(component.flags().contains(ComponentFlags::PICKABLE));
    }
}
