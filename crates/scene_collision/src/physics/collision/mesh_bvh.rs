//! Per-mesh triangle bounding volume hierarchy
//!
//! Built once when a static mesh is loaded and immutable afterwards. Nodes
//! live in a single arena and refer to their children by index; leaves
//! refer to a contiguous range of a reordered triangle-index array, so the
//! source vertex/index buffers are never touched.
//!
//! Ray queries use best-first traversal ordered by the ray's entry distance
//! into each node, returning the first triangle hit found. That is usually,
//! but not always, the closest one; [`MeshBvh::intersect_ray_closest`]
//! gives the exact closest hit at the cost of visiting every overlapping
//! leaf.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::{debug, warn};

use crate::foundation::math::Vec3;
use super::bounds::AABB;
use super::primitives::{Ray, Triangle};

/// Sentinel child index for "no child"
pub const INVALID_NODE: u32 = u32::MAX;

/// A single BVH node
#[derive(Debug, Clone, Copy)]
pub struct BvhNode {
    /// Bounds of every triangle in this subtree
    pub bounds: AABB,
    /// Left child index, `INVALID_NODE` for leaves
    pub left: u32,
    /// Right child index, `INVALID_NODE` for leaves
    pub right: u32,
    /// First entry in the triangle-index array (leaves only)
    pub start: u32,
    /// Number of triangles; a node is a leaf iff this is non-zero
    pub count: u32,
}

impl BvhNode {
    /// Check if this node is a leaf
    pub fn is_leaf(&self) -> bool {
        self.count > 0
    }
}

/// Result of a BVH ray query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhHit {
    /// Distance along the ray
    pub distance: f32,
    /// Index of the triangle in the source index buffer (`indices[3 * triangle..]`)
    pub triangle: u32,
}

/// Triangle bounding volume hierarchy for a single mesh
#[derive(Debug, Clone, Default)]
pub struct MeshBvh {
    nodes: Vec<BvhNode>,
    /// Permutation of triangle ids; each leaf owns a contiguous slice
    triangle_indices: Vec<u32>,
    /// Triangles in source order (mesh space)
    triangles: Vec<Triangle>,
}

/// Heap entry for best-first traversal, ordered so the nearest node pops first
#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    distance: f32,
    node: u32,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse so smaller distances win
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl MeshBvh {
    /// Build a BVH over an indexed triangle list
    ///
    /// Triangles referencing out-of-range vertices are dropped with a
    /// warning. Zero usable triangles produce an empty tree for which every
    /// query misses.
    pub fn build(vertices: &[Vec3], indices: &[u32], max_leaf_size: usize) -> Self {
        let max_leaf_size = max_leaf_size.max(1);

        if indices.len() % 3 != 0 {
            warn!(
                "Index buffer length {} is not a multiple of 3; ignoring trailing indices",
                indices.len()
            );
        }

        let mut triangles = Vec::with_capacity(indices.len() / 3);
        let mut triangle_indices = Vec::with_capacity(indices.len() / 3);
        let mut skipped = 0usize;

        for (triangle_id, chunk) in indices.chunks_exact(3).enumerate() {
            let fetch = |i: u32| vertices.get(i as usize).copied();
            match (fetch(chunk[0]), fetch(chunk[1]), fetch(chunk[2])) {
                (Some(v0), Some(v1), Some(v2)) => {
                    triangles.push(Triangle::new(v0, v1, v2));
                    triangle_indices.push(triangle_id as u32);
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!("Skipped {skipped} triangles with out-of-range vertex indices");
        }

        // Triangles that were skipped leave gaps in the source numbering, so
        // keep a dense array addressed by position and remember source ids.
        let source_ids = triangle_indices;
        let mut bvh = Self {
            nodes: Vec::new(),
            triangle_indices: (0..triangles.len() as u32).collect(),
            triangles,
        };

        if bvh.triangles.is_empty() {
            debug!("Built empty mesh BVH (no triangles)");
            return bvh;
        }

        let centroids: Vec<Vec3> = bvh.triangles.iter().map(Triangle::centroid).collect();
        let triangle_bounds: Vec<AABB> = bvh.triangles.iter().map(Triangle::bounds).collect();

        bvh.nodes.reserve(2 * bvh.triangles.len() / max_leaf_size + 1);
        let count = bvh.triangles.len();
        bvh.build_node(0, count, max_leaf_size, &centroids, &triangle_bounds);

        // Swap dense positions for source triangle ids so hits report what
        // the caller's index buffer calls them.
        let remap = |position: u32| source_ids[position as usize];
        let reordered: Vec<Triangle> = bvh
            .triangle_indices
            .iter()
            .map(|&position| bvh.triangles[position as usize])
            .collect();
        bvh.triangle_indices = bvh.triangle_indices.iter().map(|&p| remap(p)).collect();
        bvh.triangles = reordered;

        debug!(
            "Built mesh BVH: {} triangles, {} nodes, depth {}",
            bvh.triangles.len(),
            bvh.nodes.len(),
            bvh.depth()
        );

        bvh
    }

    /// Recursively build the subtree over `triangle_indices[start..end]`,
    /// returning its node index.
    fn build_node(
        &mut self,
        start: usize,
        end: usize,
        max_leaf_size: usize,
        centroids: &[Vec3],
        triangle_bounds: &[AABB],
    ) -> u32 {
        let mut bounds = AABB::empty();
        for &triangle in &self.triangle_indices[start..end] {
            bounds.grow(&triangle_bounds[triangle as usize]);
        }

        let node_index = self.nodes.len() as u32;
        self.nodes.push(BvhNode {
            bounds,
            left: INVALID_NODE,
            right: INVALID_NODE,
            start: 0,
            count: 0,
        });

        let count = end - start;
        if count <= max_leaf_size {
            let node = &mut self.nodes[node_index as usize];
            node.start = start as u32;
            node.count = count as u32;
            return node_index;
        }

        // Median split on the longest axis; select_nth_unstable_by is a
        // linear-time selection, the halves are left unsorted.
        let axis = bounds.longest_axis();
        let mid = start + count / 2;
        self.triangle_indices[start..end].select_nth_unstable_by(count / 2, |a, b| {
            centroids[*a as usize][axis].total_cmp(&centroids[*b as usize][axis])
        });

        let left = self.build_node(start, mid, max_leaf_size, centroids, triangle_bounds);
        let right = self.build_node(mid, end, max_leaf_size, centroids, triangle_bounds);

        let node = &mut self.nodes[node_index as usize];
        node.left = left;
        node.right = right;
        node_index
    }

    /// Best-first ray query returning the first triangle hit found
    ///
    /// Misses immediately when the ray misses the root bounds.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        self.intersect_ray_hit(ray).map(|hit| hit.distance)
    }

    /// [`intersect_ray`](Self::intersect_ray) with the triangle that was hit
    pub fn intersect_ray_hit(&self, ray: &Ray) -> Option<BvhHit> {
        let root = self.nodes.first()?;
        let root_distance = root.bounds.intersect_ray(ray)?;

        let mut queue = BinaryHeap::new();
        queue.push(QueueEntry { distance: root_distance, node: 0 });

        while let Some(QueueEntry { node, .. }) = queue.pop() {
            let node = &self.nodes[node as usize];

            if node.is_leaf() {
                if let Some(hit) = self.nearest_in_leaf(node, ray) {
                    return Some(hit);
                }
                continue;
            }

            for child in [node.left, node.right] {
                if let Some(distance) = self.nodes[child as usize].bounds.intersect_ray(ray) {
                    queue.push(QueueEntry { distance, node: child });
                }
            }
        }

        None
    }

    /// Exhaustive stack traversal returning the globally closest hit
    pub fn intersect_ray_closest(&self, ray: &Ray) -> Option<BvhHit> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut best: Option<BvhHit> = None;
        let mut stack = vec![0u32];

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            let Some(entry) = node.bounds.intersect_ray(ray) else {
                continue;
            };
            if best.is_some_and(|hit| entry > hit.distance) {
                continue;
            }

            if node.is_leaf() {
                let limit = best.map_or(f32::INFINITY, |hit| hit.distance);
                if let Some(hit) = self.nearest_in_leaf(node, ray).filter(|hit| hit.distance < limit) {
                    best = Some(hit);
                }
            } else {
                stack.push(node.left);
                stack.push(node.right);
            }
        }

        best
    }

    fn leaf_hits<'a>(&'a self, node: &BvhNode, ray: &'a Ray) -> impl Iterator<Item = BvhHit> + 'a {
        let range = node.start as usize..(node.start + node.count) as usize;
        range.filter_map(move |slot| {
            self.triangles[slot].intersect_ray(ray).map(|(distance, _, _)| BvhHit {
                distance,
                triangle: self.triangle_indices[slot],
            })
        })
    }

    fn nearest_in_leaf(&self, node: &BvhNode, ray: &Ray) -> Option<BvhHit> {
        self.leaf_hits(node, ray)
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// All nodes; index 0 is the root
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of triangles indexed by the tree
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// True when built from zero usable triangles
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root bounds, `None` for an empty tree
    pub fn bounds(&self) -> Option<AABB> {
        self.nodes.first().map(|node| node.bounds)
    }

    /// Source triangle ids in leaf order
    pub fn triangle_indices(&self) -> &[u32] {
        &self.triangle_indices
    }

    /// Number of levels (0 for an empty tree)
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut max_depth = 0;
        let mut stack = vec![(0u32, 1usize)];
        while let Some((index, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            let node = &self.nodes[index as usize];
            if !node.is_leaf() {
                stack.push((node.left, depth + 1));
                stack.push((node.right, depth + 1));
            }
        }
        max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// A grid of unit quads in the XY plane at z = `z`
    fn grid(size: usize, z: f32) -> (Vec<Vec3>, Vec<u32>) {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for y in 0..=size {
            for x in 0..=size {
                vertices.push(Vec3::new(x as f32, y as f32, z));
            }
        }
        let row = (size + 1) as u32;
        for y in 0..size as u32 {
            for x in 0..size as u32 {
                let i = y * row + x;
                indices.extend_from_slice(&[i, i + 1, i + row]);
                indices.extend_from_slice(&[i + 1, i + row + 1, i + row]);
            }
        }
        (vertices, indices)
    }

    fn check_invariants(bvh: &MeshBvh) {
        let mut seen = vec![false; bvh.triangle_count()];
        for node in bvh.nodes() {
            if node.is_leaf() {
                assert_eq!(node.left, INVALID_NODE);
                assert_eq!(node.right, INVALID_NODE);
                for slot in node.start..node.start + node.count {
                    let triangle = &bvh.triangles[slot as usize];
                    assert!(node.bounds.contains(&triangle.bounds()));
                    seen[slot as usize] = true;
                }
            } else {
                assert_eq!(node.count, 0);
                let left = &bvh.nodes()[node.left as usize];
                let right = &bvh.nodes()[node.right as usize];
                assert!(node.bounds.contains(&left.bounds));
                assert!(node.bounds.contains(&right.bounds));
            }
        }
        assert!(seen.iter().all(|s| *s), "every triangle belongs to exactly one leaf");
    }

    #[test]
    fn test_single_triangle_hit_distance() {
        let vertices = [
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let bvh = MeshBvh::build(&vertices, &[0, 1, 2], 4);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));

        assert_relative_eq!(bvh.intersect_ray(&ray).unwrap(), 5.0, epsilon = 1.0e-5);
        assert_eq!(bvh.node_count(), 1);
    }

    #[test]
    fn test_empty_input_always_misses() {
        let ray = Ray::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));
        let empty = MeshBvh::build(&[], &[], 4);
        assert!(empty.is_empty());
        assert!(empty.intersect_ray(&ray).is_none());
        assert!(empty.intersect_ray_closest(&ray).is_none());
        assert_eq!(empty.depth(), 0);

        let out_of_range = MeshBvh::build(&[Vec3::zeros()], &[0, 1, 2], 4);
        assert!(out_of_range.is_empty());
    }

    #[test]
    fn test_build_invariants_on_grid() {
        let (vertices, indices) = grid(8, 0.0);
        let bvh = MeshBvh::build(&vertices, &indices, 2);

        assert_eq!(bvh.triangle_count(), 128);
        check_invariants(&bvh);
        assert!(bvh.depth() > 1);

        let mut ids = bvh.triangle_indices().to_vec();
        ids.sort_unstable();
        assert_eq!(ids, (0..128).collect::<Vec<u32>>());
    }

    #[test]
    fn test_hits_every_cell_of_grid() {
        let (vertices, indices) = grid(6, -2.0);
        let bvh = MeshBvh::build(&vertices, &indices, 3);

        for y in 0..6 {
            for x in 0..6 {
                let origin = Vec3::new(x as f32 + 0.3, y as f32 + 0.3, 10.0);
                let ray = Ray::new(origin, Vec3::new(0.0, 0.0, -1.0));
                let hit = bvh.intersect_ray_hit(&ray).expect("ray aimed at grid");
                assert_relative_eq!(hit.distance, 12.0, epsilon = 1.0e-4);

                let base = 3 * hit.triangle as usize;
                let triangle = Triangle::new(
                    vertices[indices[base] as usize],
                    vertices[indices[base + 1] as usize],
                    vertices[indices[base + 2] as usize],
                );
                assert!(triangle.intersect_ray(&ray).is_some());
            }
        }
    }

    #[test]
    fn test_miss_outside_root_bounds() {
        let (vertices, indices) = grid(4, 0.0);
        let bvh = MeshBvh::build(&vertices, &indices, 2);
        let ray = Ray::new(Vec3::new(10.0, 10.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(bvh.intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_closest_hit_picks_nearest_layer() {
        let (mut vertices, mut indices) = grid(4, 0.0);
        let (far_vertices, far_indices) = grid(4, -3.0);
        let offset = vertices.len() as u32;
        vertices.extend(far_vertices);
        indices.extend(far_indices.iter().map(|i| i + offset));

        let bvh = MeshBvh::build(&vertices, &indices, 1);
        check_invariants(&bvh);

        let ray = Ray::new(Vec3::new(1.5, 1.5, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let closest = bvh.intersect_ray_closest(&ray).unwrap();
        assert_relative_eq!(closest.distance, 5.0, epsilon = 1.0e-4);

        let first = bvh.intersect_ray(&ray).unwrap();
        assert!(first >= closest.distance);
    }
}
