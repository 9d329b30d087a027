//! Octree spatial partitioning structure
//!
//! Divides the world region into hierarchical octants for broad-phase
//! queries. Nodes live in a flat arena and split lazily: the eight children
//! of a node are created together, contiguously, the first time a primitive
//! descends into one of them.
//!
//! Each primitive is stored exactly once, at the deepest node whose region
//! fully contains its bounds. A primitive straddling a split plane stays at
//! the parent, so queries collect primitives from internal nodes as well as
//! leaves. A reverse lookup maps every stored key to its node for O(1)
//! removal.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::foundation::collections::ComponentKey;
use crate::foundation::math::Vec3;
use crate::physics::collision::{Ray, AABB};
use super::frustum::Frustum;

/// Configuration for octree behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Minimum corner of the root region
    pub world_min: Vec3,

    /// Maximum corner of the root region
    pub world_max: Vec3,

    /// Maximum subdivision depth (root = 0)
    pub max_depth: u32,

    /// Minimum node edge length (prevents excessive subdivision)
    pub min_node_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            world_min: Vec3::repeat(-1024.0),
            world_max: Vec3::repeat(1024.0),
            max_depth: 8,
            min_node_size: 1.0,
        }
    }
}

impl OctreeConfig {
    /// Root region as a box
    pub fn world_bounds(&self) -> AABB {
        AABB::new(self.world_min, self.world_max)
    }
}

/// Single node in the octree arena
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// World-space region of this node
    pub bounds: AABB,

    /// Index of the first of eight consecutive children, `None` for a leaf
    pub first_child: Option<u32>,

    /// Depth in the tree (0 = root)
    pub depth: u32,

    /// Primitives stored at this node
    pub primitives: Vec<ComponentKey>,
}

impl OctreeNode {
    fn new(bounds: AABB, depth: u32) -> Self {
        Self {
            bounds,
            first_child: None,
            depth,
            primitives: Vec::new(),
        }
    }

    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.first_child.is_none()
    }

    /// Indices of the eight children, if any
    pub fn children(&self) -> Option<std::ops::Range<u32>> {
        self.first_child.map(|first| first..first + 8)
    }

    /// Region of child `octant`
    ///
    /// Octant bits: 1 = +X, 2 = +Y, 4 = +Z half.
    fn octant_bounds(&self, octant: usize) -> AABB {
        let center = self.bounds.center();
        let quarter = self.bounds.extents() * 0.5;
        let sign = |bit: usize| if octant & bit != 0 { 1.0 } else { -1.0 };
        let child_center = center + quarter.component_mul(&Vec3::new(sign(1), sign(2), sign(4)));
        AABB::from_center_extents(child_center, quarter)
    }

    /// Octant holding `point` (ties go to the positive half)
    fn octant_for(&self, point: &Vec3) -> usize {
        let center = self.bounds.center();
        usize::from(point.x >= center.x)
            | usize::from(point.y >= center.y) << 1
            | usize::from(point.z >= center.z) << 2
    }
}

/// Summary of the tree shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OctreeStats {
    /// Nodes allocated in the arena
    pub node_count: usize,
    /// Nodes that have been split
    pub internal_nodes: usize,
    /// Deepest node depth reached
    pub max_depth: u32,
    /// Primitives stored in the tree
    pub primitives: usize,
    /// Primitives stored at internal nodes (straddling a split plane)
    pub straddling_primitives: usize,
}

/// Octree spatial partitioning structure
#[derive(Debug, Clone)]
pub struct Octree {
    nodes: Vec<OctreeNode>,

    /// Reverse lookup: key -> (node index, stored bounds)
    locations: HashMap<ComponentKey, (u32, AABB)>,

    config: OctreeConfig,
}

impl Octree {
    /// Create an empty octree covering `config.world_bounds()`
    pub fn new(config: OctreeConfig) -> Self {
        Self {
            nodes: vec![OctreeNode::new(config.world_bounds(), 0)],
            locations: HashMap::new(),
            config,
        }
    }

    /// Configuration this tree was built with
    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// Root region
    pub fn bounds(&self) -> AABB {
        self.nodes[0].bounds
    }

    /// All nodes; index 0 is the root
    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    /// Insert a primitive by its world bounds
    ///
    /// Returns false, leaving the tree unchanged, when the bounds are not
    /// fully inside the root region. Re-inserting a stored key moves it.
    pub fn insert(&mut self, key: ComponentKey, bounds: AABB) -> bool {
        if !self.nodes[0].bounds.contains(&bounds) {
            return false;
        }
        self.remove(key);

        let center = bounds.center();
        let mut index = 0usize;
        loop {
            let node = &self.nodes[index];
            if !self.can_split(node) {
                break;
            }

            let octant = node.octant_for(&center);
            if !node.octant_bounds(octant).contains(&bounds) {
                break;
            }

            let existing_children = node.first_child;
            let first = match existing_children {
                Some(first) => first,
                None => self.split(index),
            };
            index = first as usize + octant;
        }

        self.nodes[index].primitives.push(key);
        self.locations.insert(key, (index as u32, bounds));
        true
    }

    /// Remove a primitive; false if it is not stored
    pub fn remove(&mut self, key: ComponentKey) -> bool {
        let Some((index, _)) = self.locations.remove(&key) else {
            return false;
        };
        let primitives = &mut self.nodes[index as usize].primitives;
        if let Some(position) = primitives.iter().position(|stored| *stored == key) {
            primitives.swap_remove(position);
        }
        true
    }

    /// Check whether a primitive is stored
    pub fn contains(&self, key: ComponentKey) -> bool {
        self.locations.contains_key(&key)
    }

    /// Bounds a primitive was inserted with
    pub fn stored_bounds(&self, key: ComponentKey) -> Option<AABB> {
        self.locations.get(&key).map(|(_, bounds)| *bounds)
    }

    /// Number of stored primitives
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Collect every primitive stored at a node whose region intersects `query`
    ///
    /// The result is a candidate set: primitives at a visited internal node
    /// are returned even if their own bounds miss the query box.
    pub fn query_aabb(&self, query: &AABB, out: &mut Vec<ComponentKey>) {
        self.visit(|node| node.bounds.intersects(query), |node| {
            out.extend_from_slice(&node.primitives);
        });
    }

    /// Collect primitives whose stored bounds the ray enters within `max_distance`
    pub fn query_ray(&self, ray: &Ray, max_distance: f32, out: &mut Vec<ComponentKey>) {
        let hits = |bounds: &AABB| bounds.intersect_ray(ray).is_some_and(|t| t <= max_distance);
        self.visit(|node| hits(&node.bounds), |node| {
            out.extend(node.primitives.iter().copied().filter(|key| {
                self.locations.get(key).is_some_and(|(_, bounds)| hits(bounds))
            }));
        });
    }

    /// Collect primitives whose stored bounds intersect the frustum
    pub fn query_frustum(&self, frustum: &Frustum, out: &mut Vec<ComponentKey>) {
        self.visit(|node| frustum.intersects_aabb(&node.bounds), |node| {
            out.extend(node.primitives.iter().copied().filter(|key| {
                self.locations
                    .get(key)
                    .is_some_and(|(_, bounds)| frustum.intersects_aabb(bounds))
            }));
        });
    }

    /// Remove every primitive and collapse to a single root node
    pub fn clear(&mut self) {
        let root = self.nodes[0].bounds;
        self.nodes.clear();
        self.nodes.push(OctreeNode::new(root, 0));
        self.locations.clear();
    }

    /// Summary of the current tree shape
    pub fn stats(&self) -> OctreeStats {
        self.nodes.iter().fold(OctreeStats::default(), |mut stats, node| {
            stats.node_count += 1;
            stats.max_depth = stats.max_depth.max(node.depth);
            stats.primitives += node.primitives.len();
            if !node.is_leaf() {
                stats.internal_nodes += 1;
                stats.straddling_primitives += node.primitives.len();
            }
            stats
        })
    }

    fn can_split(&self, node: &OctreeNode) -> bool {
        let child_edge = node.bounds.extents().min();
        node.depth < self.config.max_depth && child_edge >= self.config.min_node_size
    }

    /// Create the eight children of `index`, returning the first child index
    fn split(&mut self, index: usize) -> u32 {
        let first = self.nodes.len() as u32;
        let parent = self.nodes[index].clone();
        for octant in 0..8 {
            self.nodes.push(OctreeNode::new(parent.octant_bounds(octant), parent.depth + 1));
        }
        self.nodes[index].first_child = Some(first);
        debug!("Octree split node {index} at depth {} ({} nodes)", parent.depth, self.nodes.len());
        first
    }

    /// Depth-first walk over nodes accepted by `enter`
    fn visit(&self, enter: impl Fn(&OctreeNode) -> bool, mut collect: impl FnMut(&OctreeNode)) {
        let mut stack = vec![0u32];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if !enter(node) {
                continue;
            }
            collect(node);
            if let Some(children) = node.children() {
                stack.extend(children);
            }
        }
    }
}
