//! Per-frame overlap tracking
//!
//! Turns geometric overlap tests into begin/end events. Each frame:
//!
//! 1. Every dirty, non-static component searches for candidates: octree
//!    results around its bounds plus the scene's dynamic primitives.
//! 2. Each candidate pair (once per frame, same-actor pairs and pairs with
//!    a side that has not opted in excluded) is rejected on bounds first,
//!    then tested exactly. A change against the recorded state fires Begin
//!    or End to both components.
//! 3. Every dirty static component re-examines only the partners it is
//!    recorded as overlapping, so moving, turning static and opting out in
//!    any combination still ends its stale overlaps.
//! 4. Dirty flags of every component examined are cleared.
//! 5. Recorded overlaps that were not revisited are ended if one side
//!    searched this frame (it moved away), and kept if neither did.
//! 6. Pairs with a destroyed side are dropped without events.
//!
//! Pair state and per-component overlap lists are updated before handlers
//! run, and both sides are re-resolved after every handler call, so a
//! handler destroying either actor is always safe.

use std::collections::HashSet;

use log::{debug, trace};

use crate::events::{OverlapDispatcher, OverlapEvent, OverlapEventKind, OverlapHandler};
use crate::foundation::collections::ComponentKey;
use crate::scene::{Collidable, Mobility, Scene};
use super::collision::narrow_phase::test_overlap;

/// Unordered pair of components, stored with the smaller key first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlapPair {
    /// Smaller key
    pub first: ComponentKey,
    /// Larger key
    pub second: ComponentKey,
}

impl OverlapPair {
    /// Create a normalized pair (order-independent)
    pub fn new(a: ComponentKey, b: ComponentKey) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// Check whether `key` is one side of the pair
    pub fn contains(&self, key: ComponentKey) -> bool {
        self.first == key || self.second == key
    }
}

/// Counters for one overlap update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlapStats {
    /// Frame number
    pub frame: u64,
    /// Dirty components that searched for candidates
    pub dirty_components: usize,
    /// Distinct candidate pairs considered
    pub candidate_pairs: usize,
    /// Pairs whose bounds intersected and went to the narrow phase
    pub narrow_phase_tests: usize,
    /// Pairs that started overlapping
    pub begin_events: usize,
    /// Pairs that stopped overlapping
    pub end_events: usize,
    /// Pairs dropped because a side was destroyed
    pub dropped_pairs: usize,
}

/// Tracks which component pairs overlap and fires begin/end events
#[derive(Debug, Default)]
pub struct OverlapManager {
    /// Pairs currently overlapping; a pair is absent once it separates
    overlapping: HashSet<OverlapPair>,
    dispatcher: OverlapDispatcher,
    frame: u64,
    /// Components that ran a candidate search this frame
    searched: HashSet<ComponentKey>,
    /// Pairs examined this frame
    processed: HashSet<OverlapPair>,
    stats: OverlapStats,
}

impl OverlapManager {
    /// Create a manager with no recorded overlaps or handlers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for every BeginOverlap
    pub fn on_begin_overlap(&mut self, handler: impl OverlapHandler + 'static) {
        self.dispatcher.register_handler(OverlapEventKind::Begin, handler);
    }

    /// Register a handler for every EndOverlap
    pub fn on_end_overlap(&mut self, handler: impl OverlapHandler + 'static) {
        self.dispatcher.register_handler(OverlapEventKind::End, handler);
    }

    /// Handler registry, for per-component delegates
    pub fn dispatcher_mut(&mut self) -> &mut OverlapDispatcher {
        &mut self.dispatcher
    }

    /// Number of frames run
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Whether the pair is currently recorded as overlapping
    pub fn is_overlapping(&self, a: ComponentKey, b: ComponentKey) -> bool {
        self.overlapping.contains(&OverlapPair::new(a, b))
    }

    /// Number of pairs currently overlapping
    pub fn pair_count(&self) -> usize {
        self.overlapping.len()
    }

    /// Counters of the most recent frame
    pub fn last_stats(&self) -> OverlapStats {
        self.stats
    }

    /// Run one frame of overlap detection
    pub fn update(&mut self, scene: &mut Scene) -> OverlapStats {
        self.frame += 1;
        self.searched.clear();
        self.processed.clear();
        self.stats = OverlapStats { frame: self.frame, ..OverlapStats::default() };

        let dirty: Vec<ComponentKey> = scene
            .components()
            .filter(|(_, component)| component.is_dirty() && component.mobility() != Mobility::Static)
            .map(|(key, _)| key)
            .collect();
        let dynamic = scene.dynamic_primitives();
        let mut checked: HashSet<ComponentKey> = HashSet::new();

        for key in dirty {
            // A handler earlier this frame may have destroyed it
            let Some(component) = scene.component(key) else {
                continue;
            };
            self.searched.insert(key);
            checked.insert(key);
            self.stats.dirty_components += 1;

            if !component.generates_overlap_events() {
                continue;
            }

            let mut candidates = scene.spatial().query_aabb(&component.calc_bounds());
            candidates.extend(dynamic.iter().copied());
            candidates.sort_unstable();
            candidates.dedup();

            for other in candidates {
                if scene.component(key).is_none() {
                    break;
                }
                if let Some(overlapping) = self.examine(scene, key, other) {
                    checked.insert(other);
                    self.apply(scene, OverlapPair::new(key, other), key, overlapping);
                }
            }
        }

        let dirty_static: Vec<ComponentKey> = scene
            .components()
            .filter(|(_, component)| component.is_dirty() && component.mobility() == Mobility::Static)
            .map(|(key, _)| key)
            .collect();
        for key in dirty_static {
            let Some(component) = scene.component(key) else {
                continue;
            };
            checked.insert(key);
            let partners: Vec<ComponentKey> = component.overlaps().iter().map(|info| info.component).collect();

            for other in partners {
                if scene.component(key).is_none() {
                    break;
                }
                if let Some(overlapping) = self.examine(scene, key, other) {
                    self.apply(scene, OverlapPair::new(key, other), key, overlapping);
                }
            }
        }

        for key in &checked {
            scene.clear_dirty(*key);
        }

        self.cleanup_pass(scene);
        self.dispatcher.prune(scene);

        debug!(
            "Overlap frame {}: {} dirty, {} pairs, {} narrow tests, {} begin, {} end, {} dropped, {} overlapping",
            self.stats.frame,
            self.stats.dirty_components,
            self.stats.candidate_pairs,
            self.stats.narrow_phase_tests,
            self.stats.begin_events,
            self.stats.end_events,
            self.stats.dropped_pairs,
            self.overlapping.len()
        );

        self.stats
    }

    /// Decide the overlap state of `(key, other)`
    ///
    /// `None` when the candidate is skipped: itself, same owner, gone, the
    /// pair was already examined this frame, or a side has opted out of a
    /// pair that is not recorded. A recorded pair with an opted-out side
    /// resolves to `Some(false)`.
    fn examine(&mut self, scene: &Scene, key: ComponentKey, other: ComponentKey) -> Option<bool> {
        if other == key {
            return None;
        }
        let a = scene.component(key)?;
        let b = scene.component(other)?;
        if a.owner() == b.owner() {
            return None;
        }
        let pair = OverlapPair::new(key, other);
        let opted_in = a.generates_overlap_events() && b.generates_overlap_events();
        if !opted_in && !self.overlapping.contains(&pair) {
            return None;
        }
        if !self.processed.insert(pair) {
            return None;
        }
        self.stats.candidate_pairs += 1;

        if !opted_in {
            return Some(false);
        }
        if !a.calc_bounds().intersects(&b.calc_bounds()) {
            return Some(false);
        }

        self.stats.narrow_phase_tests += 1;
        let overlapping = match (a.collision_shape(), b.collision_shape()) {
            (Some(shape_a), Some(shape_b)) => test_overlap(shape_a, shape_b),
            // A missing shape never overlaps
            _ => false,
        };
        trace!("Narrow phase {key:?} vs {other:?}: {overlapping}");
        Some(overlapping)
    }

    /// Record the new state of a pair and fire an event on a transition
    fn apply(&mut self, scene: &mut Scene, pair: OverlapPair, initiator: ComponentKey, overlapping: bool) {
        let was_overlapping = self.overlapping.contains(&pair);
        if overlapping == was_overlapping {
            return;
        }

        let other = if pair.first == initiator { pair.second } else { pair.first };
        if overlapping {
            if !scene.link_overlap(initiator, other) {
                return;
            }
            self.overlapping.insert(pair);
            self.stats.begin_events += 1;
            self.fire(scene, OverlapEventKind::Begin, initiator, other);
        } else {
            self.overlapping.remove(&pair);
            scene.unlink_overlap(initiator, other);
            self.stats.end_events += 1;
            self.fire(scene, OverlapEventKind::End, initiator, other);
        }
    }

    /// Deliver `kind` to `a` (about `b`) and then to `b` (about `a`)
    fn fire(&mut self, scene: &mut Scene, kind: OverlapEventKind, a: ComponentKey, b: ComponentKey) {
        let owner = |scene: &Scene, key: ComponentKey| scene.component(key).and_then(|c| c.owner());
        let (Some(actor_a), Some(actor_b)) = (owner(scene, a), owner(scene, b)) else {
            return;
        };
        let event = OverlapEvent {
            kind,
            component: a,
            actor: actor_a,
            other_component: b,
            other_actor: actor_b,
            frame: self.frame,
        };
        debug!("{kind:?}Overlap {a:?} <-> {b:?}");

        self.dispatcher.dispatch(&event, scene);

        // The first handler may have destroyed either side
        if scene.component(a).is_some() && scene.component(b).is_some() {
            self.dispatcher.dispatch(&event.mirrored(), scene);
        }
    }

    /// End or drop recorded overlaps that were not revisited this frame
    ///
    /// Pairs with a destroyed side are dropped silently. Otherwise a pair is
    /// ended when at least one side searched for candidates this frame, and
    /// left alone when neither did. Safe to call more than once per frame:
    /// a second call finds nothing new to end.
    pub fn cleanup_pass(&mut self, scene: &mut Scene) {
        let mut stale: Vec<OverlapPair> = self
            .overlapping
            .iter()
            .filter(|pair| !self.processed.contains(*pair))
            .copied()
            .collect();
        stale.sort_unstable();

        for pair in stale {
            if !self.overlapping.contains(&pair) {
                continue;
            }
            let alive = scene.component(pair.first).is_some() && scene.component(pair.second).is_some();
            if !alive {
                self.overlapping.remove(&pair);
                scene.unlink_overlap(pair.first, pair.second);
                self.stats.dropped_pairs += 1;
                continue;
            }

            let moved_first = self.searched.contains(&pair.first);
            let moved_second = self.searched.contains(&pair.second);
            if !moved_first && !moved_second {
                continue;
            }

            let initiator = if moved_first { pair.first } else { pair.second };
            self.processed.insert(pair);
            self.apply(scene, pair, initiator, false);
        }
    }
}
