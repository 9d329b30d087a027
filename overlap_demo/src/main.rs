//! Overlap Tracking Demo
//!
//! Headless simulation of ships drifting through an asteroid field:
//! - Ships and static asteroids live in one scene octree
//! - Moved ships are relocated in the octree as they fly
//! - Begin/end overlap events are logged as ships touch asteroids
//! - A ray is cast from the origin each second to pick the nearest object
//! - A fixed camera counts the components inside its view frustum
//!
//! Usage: `overlap_demo [config.toml|config.ron]`

use std::cell::Cell;
use std::rc::Rc;

use log::{info, warn};
use rand::Rng;

use scene_collision::foundation::logging;
use scene_collision::foundation::math::Mat4;
use scene_collision::prelude::*;
use scene_collision::spatial::Frustum;

// Simulation settings
const FIELD_HALF_SIZE: f32 = 50.0;
const NUM_SHIPS: usize = 24;
const NUM_ASTEROIDS: usize = 40;
const SHIP_SPEED: f32 = 6.0;
const SHIP_RADIUS: f32 = 0.8;
const FRAMES: u32 = 600;
const DELTA_TIME: f32 = 1.0 / 60.0;
const CAMERA_FOV: f32 = std::f32::consts::FRAC_PI_3;

#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

struct Ship {
    component: ComponentKey,
    position: Vec3,
    velocity: Vec3,
}

fn load_config() -> Result<CollisionConfig, DemoError> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading collision config from {path}");
            CollisionConfig::load_from_file(&path)?
        }
        None => CollisionConfig {
            octree: OctreeConfig {
                world_min: Vec3::repeat(-FIELD_HALF_SIZE),
                world_max: Vec3::repeat(FIELD_HALF_SIZE),
                ..OctreeConfig::default()
            },
            ..CollisionConfig::default()
        },
    };
    config.validate()?;
    Ok(config)
}

fn random_point(rng: &mut impl Rng, margin: f32) -> Vec3 {
    let half = FIELD_HALF_SIZE - margin;
    Vec3::new(
        rng.gen_range(-half..half),
        rng.gen_range(-half..half),
        rng.gen_range(-half..half),
    )
}

fn populate(scene: &mut Scene, rng: &mut impl Rng) -> Result<Vec<Ship>, DemoError> {
    for i in 0..NUM_ASTEROIDS {
        let actor = scene.spawn_actor(format!("asteroid_{i}"));
        let shape = if i % 3 == 0 {
            CollisionShape::obb(Vec3::new(1.5, 1.0, 2.0))
        } else {
            CollisionShape::sphere(rng.gen_range(1.0..3.0))
        };
        let rotation = Quat::from_axis_angle(&Vec3::y_axis(), rng.gen_range(0.0..std::f32::consts::TAU));
        scene.add_component(
            actor,
            PrimitiveComponent::new(shape)
                .with_transform(Transform::from_position_rotation(random_point(rng, 3.0), rotation))
                .with_mobility(Mobility::Static),
        )?;
    }

    let mut ships = Vec::with_capacity(NUM_SHIPS);
    for i in 0..NUM_SHIPS {
        let actor = scene.spawn_actor(format!("ship_{i}"));
        let position = random_point(rng, SHIP_RADIUS);
        let shape = if i % 2 == 0 {
            CollisionShape::sphere(SHIP_RADIUS)
        } else {
            CollisionShape::capsule(SHIP_RADIUS, SHIP_RADIUS * 0.5)
        };
        let component = scene.add_component(
            actor,
            PrimitiveComponent::new(shape).with_transform(Transform::from_position(position)),
        )?;
        let direction = random_point(rng, 0.0).try_normalize(1.0e-6).unwrap_or_else(Vec3::x);
        ships.push(Ship { component, position, velocity: direction * SHIP_SPEED });
    }
    Ok(ships)
}

/// Advance ships, bouncing them off the field boundary
fn move_ships(scene: &mut Scene, ships: &mut [Ship]) -> Result<(), DemoError> {
    let limit = FIELD_HALF_SIZE - SHIP_RADIUS;
    for ship in ships.iter_mut() {
        ship.position += ship.velocity * DELTA_TIME;
        for axis in 0..3 {
            if ship.position[axis].abs() > limit {
                ship.position[axis] = ship.position[axis].clamp(-limit, limit);
                ship.velocity[axis] = -ship.velocity[axis];
            }
        }
        scene.set_transform(ship.component, Transform::from_position(ship.position))?;
    }
    Ok(())
}

fn run() -> Result<(), DemoError> {
    let config = load_config()?;
    let mut scene = Scene::new(config);
    let mut rng = rand::thread_rng();
    let mut ships = populate(&mut scene, &mut rng)?;

    let begins = Rc::new(Cell::new(0usize));
    let ends = Rc::new(Cell::new(0usize));
    let mut overlaps = OverlapManager::new();
    {
        let begins = Rc::clone(&begins);
        overlaps.on_begin_overlap(move |event: &OverlapEvent, scene: &mut Scene| {
            begins.set(begins.get() + 1);
            let name = |id| scene.actor(id).map_or("<destroyed>", Actor::name);
            info!("Frame {}: {} began touching {}", event.frame, name(event.actor), name(event.other_actor));
        });
    }
    {
        let ends = Rc::clone(&ends);
        overlaps.on_end_overlap(move |_: &OverlapEvent, _: &mut Scene| ends.set(ends.get() + 1));
    }

    // Camera on +Z looking down -Z at the field
    let camera = Frustum::from_matrix(
        &(Mat4::new_perspective(1.0, CAMERA_FOV, 0.1, 4.0 * FIELD_HALF_SIZE)
            * Mat4::new_translation(&Vec3::new(0.0, 0.0, -2.0 * FIELD_HALF_SIZE))),
    );

    let mut picking = PickingSystem::new();
    for frame in 1..=FRAMES {
        move_ships(&mut scene, &mut ships)?;
        let reinsert = scene.update_spatial();
        if reinsert.requeued > 0 {
            warn!("Frame {frame}: {} primitives could not be re-inserted", reinsert.requeued);
        }
        overlaps.update(&mut scene);

        if frame % 60 == 0 {
            let ray = Ray::new(Vec3::zeros(), random_point(&mut rng, 0.0));
            match picking.pick(&scene, &ray, f32::INFINITY) {
                Some(hit) => info!(
                    "Frame {frame}: picked {} at distance {:.2}",
                    scene.actor(hit.actor).map_or("<destroyed>", Actor::name),
                    hit.distance
                ),
                None => info!("Frame {frame}: pick ray hit nothing"),
            }
            info!("Frame {frame}: {} components in view", scene.query_frustum(&camera).len());
        }
    }

    let stats = scene.octree().stats();
    info!(
        "Octree: {} nodes ({} internal), depth {}, {} primitives ({} straddling)",
        stats.node_count, stats.internal_nodes, stats.max_depth, stats.primitives, stats.straddling_primitives
    );
    info!(
        "{} begin / {} end events over {FRAMES} frames, {} pairs still overlapping",
        begins.get(),
        ends.get(),
        overlaps.pair_count()
    );
    Ok(())
}

fn main() {
    logging::init_with_filter("info");

    println!("=== Overlap Tracking Demo ===");
    println!("{NUM_SHIPS} ships drifting through {NUM_ASTEROIDS} asteroids for {FRAMES} frames");
    println!("Set RUST_LOG=debug for per-frame overlap statistics");
    println!();

    if let Err(error) = run() {
        eprintln!("{error}");
        std::process::exit(1);
    }
}
