//! The scene context object
//!
//! Owns actors, components, the octree and the queue of primitives waiting
//! for (re)insertion. Moving a component relocates it in the octree at
//! once. A primitive whose bounds leave the root is queued instead, and
//! [`Scene::update_spatial`] retries a budgeted number of queued primitives
//! each frame. Until then it is reported by [`Scene::dynamic_primitives`]
//! so overlap and picking queries still see it.

use std::collections::HashSet;

use log::{debug, warn};

use crate::config::CollisionConfig;
use crate::foundation::collections::{ActorId, ActorMap, ComponentKey, ComponentMap};
use crate::foundation::math::Transform;
use crate::physics::collision::AABB;
use crate::spatial::{DynamicPrimitiveQueue, Frustum, Octree, ReinsertStats, SpatialQuery};
use super::actor::Actor;
use super::component::{Collidable, ComponentFlags, Mobility, OverlapInfo, PrimitiveComponent};

/// Errors from scene mutators addressing an object by handle
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The actor handle is stale or was never issued by this scene
    #[error("Actor not found: {0:?}")]
    ActorNotFound(ActorId),

    /// The component handle is stale or was never issued by this scene
    #[error("Component not found: {0:?}")]
    ComponentNotFound(ComponentKey),
}

/// Actors, collidable components and the broad phase indexing them
#[derive(Debug)]
pub struct Scene {
    config: CollisionConfig,
    actors: ActorMap<Actor>,
    components: ComponentMap<PrimitiveComponent>,
    octree: Octree,
    dynamic_queue: DynamicPrimitiveQueue,
    move_counter: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(CollisionConfig::default())
    }
}

impl Scene {
    /// Create an empty scene
    pub fn new(config: CollisionConfig) -> Self {
        Self {
            octree: Octree::new(config.octree.clone()),
            config,
            actors: ActorMap::with_key(),
            components: ComponentMap::with_key(),
            dynamic_queue: DynamicPrimitiveQueue::new(),
            move_counter: 0,
        }
    }

    /// Configuration the scene was created with
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// Create an actor with no components
    pub fn spawn_actor(&mut self, name: impl Into<String>) -> ActorId {
        self.actors.insert(Actor::new(name.into()))
    }

    /// Destroy an actor and every component it owns
    pub fn destroy_actor(&mut self, id: ActorId) -> Result<(), SceneError> {
        let actor = self.actors.remove(id).ok_or(SceneError::ActorNotFound(id))?;
        for key in actor.components() {
            self.remove_component_data(*key);
        }
        debug!("Destroyed actor '{}' ({} components)", actor.name(), actor.components().len());
        Ok(())
    }

    /// Add a component to an actor and register it with the broad phase
    ///
    /// The new component starts dirty so its overlaps are examined on the
    /// next overlap update. Bounds outside the octree's root region put it
    /// on the dynamic queue instead.
    pub fn add_component(
        &mut self,
        actor: ActorId,
        mut component: PrimitiveComponent,
    ) -> Result<ComponentKey, SceneError> {
        let owner = self.actors.get_mut(actor).ok_or(SceneError::ActorNotFound(actor))?;

        self.move_counter += 1;
        let stamp = self.move_counter;
        component.set_owner(actor);
        component.stamp_move(stamp);
        let bounds = component.calc_bounds();

        let key = self.components.insert(component);
        owner.attach(key);

        if !self.octree.insert(key, bounds) {
            warn!("Component {key:?} bounds {bounds:?} exceed the octree root; deferring insertion");
            self.dynamic_queue.push(key, stamp);
        }
        Ok(key)
    }

    /// Destroy a single component
    ///
    /// Other components drop it from their overlap lists without any end
    /// event; stale queue entries are discarded lazily.
    pub fn destroy_component(&mut self, key: ComponentKey) -> Result<(), SceneError> {
        let owner = self
            .components
            .get(key)
            .ok_or(SceneError::ComponentNotFound(key))?
            .owner();
        if let Some(actor) = owner.and_then(|id| self.actors.get_mut(id)) {
            actor.detach(key);
        }
        self.remove_component_data(key);
        Ok(())
    }

    fn remove_component_data(&mut self, key: ComponentKey) {
        let Some(component) = self.components.remove(key) else {
            return;
        };
        self.octree.remove(key);
        for info in component.overlaps() {
            if let Some(other) = self.components.get_mut(info.component) {
                other.remove_overlap(key);
            }
        }
    }

    /// Move a component
    ///
    /// Rebuilds its world-space cache, marks it dirty and relocates it in
    /// the octree. Bounds that no longer fit the root take it out of the
    /// tree and onto the dynamic queue until a budgeted pass succeeds.
    pub fn set_transform(&mut self, key: ComponentKey, transform: Transform) -> Result<(), SceneError> {
        let stamp = self.move_counter + 1;
        let component = self.component_mut(key)?;
        component.apply_transform(transform, stamp);
        let bounds = component.calc_bounds();
        self.move_counter = stamp;

        if !SpatialQuery::update(&mut self.octree, key, bounds) {
            debug!("Component {key:?} moved outside the octree root; deferring insertion");
            self.dynamic_queue.push(key, stamp);
        }
        Ok(())
    }

    /// Change mobility; marks the component dirty
    pub fn set_mobility(&mut self, key: ComponentKey, mobility: Mobility) -> Result<(), SceneError> {
        self.component_mut(key)?.set_mobility(mobility);
        Ok(())
    }

    /// Opt in or out of overlap events; marks the component dirty
    pub fn set_generate_overlap_events(&mut self, key: ComponentKey, enabled: bool) -> Result<(), SceneError> {
        self.component_mut(key)?
            .set_flag(ComponentFlags::GENERATE_OVERLAP_EVENTS, enabled);
        Ok(())
    }

    /// Run one budgeted re-insertion pass over the dynamic queue
    pub fn update_spatial(&mut self) -> ReinsertStats {
        let components = &self.components;
        self.dynamic_queue.process(self.config.reinsert_budget, &mut self.octree, |key| {
            components
                .get(key)
                .map(|component| (component.last_move_stamp(), component.calc_bounds()))
        })
    }

    /// Live components that are waiting for insertion into the octree
    pub fn dynamic_primitives(&self) -> Vec<ComponentKey> {
        let mut seen = HashSet::new();
        self.dynamic_queue
            .entries()
            .filter(|entry| {
                self.components
                    .get(entry.key)
                    .is_some_and(|component| component.last_move_stamp() == entry.move_stamp)
            })
            .filter(|entry| !self.octree.contains(entry.key))
            .filter(|entry| seen.insert(entry.key))
            .map(|entry| entry.key)
            .collect()
    }

    /// Queue entries not yet processed, stale ones included
    pub fn pending_reinsertions(&self) -> usize {
        self.dynamic_queue.len()
    }

    /// Components whose current bounds intersect `query`
    ///
    /// Combines octree candidates with the dynamic primitives and filters
    /// both by their actual bounds.
    pub fn query_aabb(&self, query: &AABB) -> Vec<ComponentKey> {
        let mut candidates = self.spatial().query_aabb(query);
        candidates.extend(self.dynamic_primitives());
        candidates.retain(|key| {
            self.components
                .get(*key)
                .is_some_and(|component| component.calc_bounds().intersects(query))
        });
        candidates.sort_unstable();
        candidates.dedup();
        candidates
    }

    /// Components whose current bounds intersect the view frustum
    pub fn query_frustum(&self, frustum: &Frustum) -> Vec<ComponentKey> {
        let mut candidates = Vec::new();
        self.octree.query_frustum(frustum, &mut candidates);
        candidates.extend(self.dynamic_primitives().into_iter().filter(|key| {
            self.components
                .get(*key)
                .is_some_and(|component| frustum.intersects_aabb(&component.calc_bounds()))
        }));
        candidates.sort_unstable();
        candidates.dedup();
        candidates
    }

    /// Components `key` currently overlaps, empty for a stale handle
    pub fn overlapping_components(&self, key: ComponentKey) -> Vec<ComponentKey> {
        self.components
            .get(key)
            .map(|component| component.overlaps().iter().map(|info| info.component).collect())
            .unwrap_or_default()
    }

    /// Look up a component
    pub fn component(&self, key: ComponentKey) -> Option<&PrimitiveComponent> {
        self.components.get(key)
    }

    /// Look up an actor
    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(id)
    }

    /// Every live component
    pub fn components(&self) -> impl Iterator<Item = (ComponentKey, &PrimitiveComponent)> {
        self.components.iter()
    }

    /// Number of live components
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Number of live actors
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// The broad phase
    pub fn spatial(&self) -> &dyn SpatialQuery {
        &self.octree
    }

    /// The octree itself, for statistics and visualisation
    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    fn component_mut(&mut self, key: ComponentKey) -> Result<&mut PrimitiveComponent, SceneError> {
        self.components.get_mut(key).ok_or_else(|| {
            warn!("Ignoring update of stale component handle {key:?}");
            SceneError::ComponentNotFound(key)
        })
    }

    pub(crate) fn clear_dirty(&mut self, key: ComponentKey) {
        if let Some(component) = self.components.get_mut(key) {
            component.clear_dirty();
        }
    }

    /// Record a bidirectional overlap; false if either side is gone
    pub(crate) fn link_overlap(&mut self, a: ComponentKey, b: ComponentKey) -> bool {
        let owners = self
            .components
            .get(a)
            .and_then(PrimitiveComponent::owner)
            .zip(self.components.get(b).and_then(PrimitiveComponent::owner));
        let Some((actor_a, actor_b)) = owners else {
            return false;
        };
        if let Some(component) = self.components.get_mut(a) {
            component.add_overlap(OverlapInfo { component: b, actor: actor_b });
        }
        if let Some(component) = self.components.get_mut(b) {
            component.add_overlap(OverlapInfo { component: a, actor: actor_a });
        }
        true
    }

    /// Forget a bidirectional overlap on whichever sides are still alive
    pub(crate) fn unlink_overlap(&mut self, a: ComponentKey, b: ComponentKey) {
        if let Some(component) = self.components.get_mut(a) {
            component.remove_overlap(b);
        }
        if let Some(component) = self.components.get_mut(b) {
            component.remove_overlap(a);
        }
    }
}
