//! Frame-by-frame overlap scenarios driven through the public API

use std::cell::RefCell;
use std::rc::Rc;

use scene_collision::prelude::*;

type EventLog = Rc<RefCell<Vec<OverlapEvent>>>;

fn recording_manager() -> (OverlapManager, EventLog) {
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let mut manager = OverlapManager::new();

    let begin = Rc::clone(&log);
    manager.on_begin_overlap(move |event: &OverlapEvent, _: &mut Scene| begin.borrow_mut().push(*event));
    let end = Rc::clone(&log);
    manager.on_end_overlap(move |event: &OverlapEvent, _: &mut Scene| end.borrow_mut().push(*event));

    (manager, log)
}

fn unit_sphere_at(x: f32) -> PrimitiveComponent {
    PrimitiveComponent::new(CollisionShape::sphere(1.0))
        .with_transform(Transform::from_position(Vec3::new(x, 0.0, 0.0)))
}

fn count(log: &EventLog, kind: OverlapEventKind) -> usize {
    log.borrow().iter().filter(|event| event.kind == kind).count()
}

/// Two actors with one unit sphere each, `b` at `x`
fn two_spheres(x: f32) -> (Scene, ComponentKey, ComponentKey) {
    let mut scene = Scene::default();
    let actor_a = scene.spawn_actor("a");
    let actor_b = scene.spawn_actor("b");
    let a = scene.add_component(actor_a, unit_sphere_at(0.0)).unwrap();
    let b = scene.add_component(actor_b, unit_sphere_at(x)).unwrap();
    (scene, a, b)
}

#[test]
fn test_begin_then_end_when_separated() {
    let (mut scene, a, b) = two_spheres(1.5);
    let (mut manager, log) = recording_manager();

    manager.update(&mut scene);
    assert_eq!(count(&log, OverlapEventKind::Begin), 2);
    let receivers: Vec<_> = log.borrow().iter().map(|event| event.component).collect();
    assert!(receivers.contains(&a) && receivers.contains(&b));

    scene.set_transform(b, Transform::from_position(Vec3::new(3.5, 0.0, 0.0))).unwrap();
    scene.update_spatial();
    let stats = manager.update(&mut scene);

    assert_eq!(stats.end_events, 1);
    assert_eq!(count(&log, OverlapEventKind::End), 2);
    assert!(!manager.is_overlapping(a, b));
    assert!(scene.overlapping_components(a).is_empty());
    assert!(scene.overlapping_components(b).is_empty());
}

#[test]
fn test_gradual_separation_fires_one_begin_and_one_end() {
    let (mut scene, a, b) = two_spheres(1.5);
    let (mut manager, log) = recording_manager();

    let mut end_frame = None;
    for step in 0..=20 {
        let x = 1.5 + step as f32 * 0.1;
        scene.set_transform(b, Transform::from_position(Vec3::new(x, 0.0, 0.0))).unwrap();
        scene.update_spatial();
        let stats = manager.update(&mut scene);
        if stats.end_events > 0 {
            assert!(end_frame.is_none(), "pair ended twice");
            end_frame = Some(x);
        }
    }

    assert_eq!(count(&log, OverlapEventKind::Begin), 2);
    assert_eq!(count(&log, OverlapEventKind::End), 2);
    // Touching still counts as overlapping, so the end comes just past 2.0
    let x = end_frame.unwrap();
    assert!(x > 2.0 && x < 2.15, "ended at {x}");
    assert!(!manager.is_overlapping(a, b));
}

#[test]
fn test_stationary_overlap_fires_nothing_more() {
    let (mut scene, _, _) = two_spheres(1.5);
    let (mut manager, log) = recording_manager();

    for _ in 0..5 {
        scene.update_spatial();
        manager.update(&mut scene);
    }
    assert_eq!(log.borrow().len(), 2);
    assert_eq!(manager.pair_count(), 1);
    assert_eq!(manager.frame(), 5);
}

#[test]
fn test_repeated_cleanup_ends_each_pair_once() {
    let (mut scene, a, b) = two_spheres(1.5);
    let (mut manager, log) = recording_manager();
    manager.update(&mut scene);

    scene.set_transform(a, Transform::from_position(Vec3::new(-40.0, 0.0, 0.0))).unwrap();
    manager.update(&mut scene);
    manager.cleanup_pass(&mut scene);
    manager.cleanup_pass(&mut scene);

    assert_eq!(count(&log, OverlapEventKind::End), 2);
    assert!(!manager.is_overlapping(a, b));
}

#[test]
fn test_handler_destroying_actor_is_safe() {
    let mut scene = Scene::default();
    let ship = scene.spawn_actor("ship");
    let rock = scene.spawn_actor("rock");
    let hull = scene.add_component(ship, unit_sphere_at(0.0)).unwrap();
    let stone = scene.add_component(rock, unit_sphere_at(1.0)).unwrap();

    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let mut manager = OverlapManager::new();
    let sink = Rc::clone(&log);
    manager.on_begin_overlap(move |event: &OverlapEvent, scene: &mut Scene| {
        sink.borrow_mut().push(*event);
        scene.destroy_actor(rock).ok();
    });
    let ends = Rc::clone(&log);
    manager.on_end_overlap(move |event: &OverlapEvent, _: &mut Scene| ends.borrow_mut().push(*event));

    manager.update(&mut scene);
    assert_eq!(log.borrow().len(), 1, "mirrored event must not reach a destroyed component");
    assert!(scene.component(stone).is_none());
    assert!(scene.overlapping_components(hull).is_empty());

    let stats = manager.update(&mut scene);
    assert_eq!(stats.dropped_pairs, 1);
    assert_eq!(stats.end_events, 0);
    assert_eq!(manager.pair_count(), 0);
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_destroyed_component_is_dropped_without_end() {
    let (mut scene, a, b) = two_spheres(1.0);
    let (mut manager, log) = recording_manager();
    manager.update(&mut scene);
    assert!(manager.is_overlapping(a, b));

    scene.destroy_component(b).unwrap();
    assert!(scene.overlapping_components(a).is_empty());
    let stats = manager.update(&mut scene);

    assert_eq!(stats.dropped_pairs, 1);
    assert_eq!(count(&log, OverlapEventKind::End), 0);
    assert_eq!(scene.destroy_component(b), Err(SceneError::ComponentNotFound(b)));
}

#[test]
fn test_shapeless_component_never_begins() {
    let mut scene = Scene::default();
    let (mut manager, log) = recording_manager();
    let solid = scene.spawn_actor("solid");
    let ghost = scene.spawn_actor("ghost");
    scene.add_component(solid, unit_sphere_at(0.0)).unwrap();
    scene
        .add_component(ghost, PrimitiveComponent::without_shape(Vec3::repeat(2.0)))
        .unwrap();

    manager.update(&mut scene);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_moving_into_static_component_begins_overlap() {
    let mut scene = Scene::default();
    let (mut manager, log) = recording_manager();
    let wall = scene.spawn_actor("wall");
    let ball = scene.spawn_actor("ball");
    let slab = scene
        .add_component(
            wall,
            PrimitiveComponent::new(CollisionShape::obb(Vec3::new(0.5, 5.0, 5.0)))
                .with_mobility(Mobility::Static),
        )
        .unwrap();
    let mover = scene.add_component(ball, unit_sphere_at(-10.0)).unwrap();

    manager.update(&mut scene);
    assert!(log.borrow().is_empty());

    scene.set_transform(mover, Transform::from_position(Vec3::new(-1.2, 0.0, 0.0))).unwrap();
    manager.update(&mut scene);
    assert!(manager.is_overlapping(slab, mover));
    assert_eq!(count(&log, OverlapEventKind::Begin), 2);
}

#[test]
fn test_static_component_opting_out_ends_overlap() {
    let (mut scene, a, b) = two_spheres(1.5);
    let (mut manager, log) = recording_manager();
    manager.update(&mut scene);
    assert!(manager.is_overlapping(a, b));

    scene.set_mobility(a, Mobility::Static).unwrap();
    manager.update(&mut scene);
    assert!(manager.is_overlapping(a, b));

    scene.set_generate_overlap_events(a, false).unwrap();
    for _ in 0..3 {
        scene.update_spatial();
        manager.update(&mut scene);
    }
    assert!(!manager.is_overlapping(a, b));
    assert_eq!(count(&log, OverlapEventKind::End), 2);
    assert!(scene.overlapping_components(a).is_empty());
    assert!(scene.overlapping_components(b).is_empty());
}

#[test]
fn test_moving_away_and_turning_static_in_one_frame_ends_overlap() {
    let (mut scene, a, b) = two_spheres(1.5);
    let (mut manager, log) = recording_manager();
    manager.update(&mut scene);
    assert!(manager.is_overlapping(a, b));

    scene.set_transform(a, Transform::from_position(Vec3::new(-50.0, 0.0, 0.0))).unwrap();
    scene.set_mobility(a, Mobility::Static).unwrap();
    for _ in 0..3 {
        scene.update_spatial();
        manager.update(&mut scene);
    }
    assert!(!manager.is_overlapping(a, b));
    assert_eq!(count(&log, OverlapEventKind::End), 2);
    assert!(scene.overlapping_components(b).is_empty());
}

#[test]
fn test_octree_tracks_scene_components() {
    let mut scene = Scene::default();
    let actor = scene.spawn_actor("field");
    let keys: Vec<_> = (0..64)
        .map(|i| {
            let position = Vec3::new((i % 8) as f32 * 10.0, (i / 8) as f32 * 10.0, 0.0);
            scene
                .add_component(
                    actor,
                    PrimitiveComponent::new(CollisionShape::sphere(0.5))
                        .with_transform(Transform::from_position(position)),
                )
                .unwrap()
        })
        .collect();

    assert_eq!(scene.octree().len(), 64);
    let hits = scene.query_aabb(&AABB::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(11.0, 1.0, 1.0)));
    assert_eq!(hits.len(), 2);
    assert!(hits.contains(&keys[0]) && hits.contains(&keys[1]));

    scene.destroy_component(keys[0]).unwrap();
    assert!(!scene.spatial().contains(keys[0]));
    let hits = scene.query_aabb(&AABB::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(11.0, 1.0, 1.0)));
    assert_eq!(hits, vec![keys[1]]);

    let stats = scene.octree().stats();
    assert_eq!(stats.primitives, 63);
    assert!(stats.node_count > 1);
}

#[test]
fn test_reinsertion_is_budgeted() {
    let mut scene = Scene::new(CollisionConfig { reinsert_budget: 2, ..CollisionConfig::default() });
    let actor = scene.spawn_actor("swarm");
    let keys: Vec<_> = (0..5)
        .map(|i| scene.add_component(actor, unit_sphere_at(i as f32 * 4.0)).unwrap())
        .collect();

    // Moves inside the root relocate immediately
    for key in &keys {
        scene
            .set_transform(*key, Transform::from_position(Vec3::new(0.0, 20.0, 0.0)))
            .unwrap();
    }
    assert!(scene.dynamic_primitives().is_empty());
    assert_eq!(scene.octree().len(), 5);

    // Outside the root they wait on the queue, retried two per pass
    for key in &keys {
        scene
            .set_transform(*key, Transform::from_position(Vec3::new(2000.0, 0.0, 0.0)))
            .unwrap();
    }
    assert_eq!(scene.dynamic_primitives().len(), 5);
    let blocked = scene.update_spatial();
    assert_eq!(blocked.attempted, 2);
    assert_eq!(blocked.requeued, 2);
    assert_eq!(scene.dynamic_primitives().len(), 5);

    for key in &keys {
        scene
            .set_transform(*key, Transform::from_position(Vec3::new(0.0, -20.0, 0.0)))
            .unwrap();
    }
    assert!(scene.dynamic_primitives().is_empty());
    assert_eq!(scene.octree().len(), 5);

    let stale = scene.update_spatial();
    assert_eq!(stale.attempted, 0);
    assert_eq!(stale.discarded, 5);
    assert_eq!(scene.pending_reinsertions(), 0);
}
