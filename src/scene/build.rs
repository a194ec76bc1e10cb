//! SAH-based BVH builder.
//!
//! Constructs a flat BVH array from a list of triangles using binned
//! Surface Area Heuristic splits.

use crate::util::{BBox3f, Vec3};

use super::bvh::{Bvh, BvhNode, Triangle};

/// Number of SAH bins for split evaluation.
const NUM_BINS: usize = 12;

/// Cost ratio: traversal vs intersection.
const TRAVERSAL_COST: f32 = 1.0;
const INTERSECT_COST: f32 = 1.0;

/// Maximum triangles per leaf before forcing a split.
const MAX_LEAF_SIZE: usize = 4;

/// SAH bin for evaluating split candidates.
#[derive(Clone, Copy)]
struct Bin {
    bounds: BBox3f,
    count: usize,
}

impl Bin {
    const EMPTY: Self = Self {
        bounds: BBox3f::EMPTY,
        count: 0,
    };
}

/// Pending subtree: node slot plus its `[start, end)` range of indices.
struct Task {
    node_idx: usize,
    start: usize,
    end: usize,
}

/// Build BVH from triangles using SAH.
///
/// Triangles are not modified; `tri_indices` maps into the original slice.
#[tracing::instrument(skip_all, fields(tri_count = triangles.len()))]
pub fn build_bvh(triangles: &[Triangle]) -> Bvh {
    let n = triangles.len();
    if n == 0 {
        return Bvh {
            nodes: vec![BvhNode::EMPTY],
            tri_indices: vec![],
        };
    }

    let centroids: Vec<Vec3> = triangles.iter().map(Triangle::centroid).collect();
    let aabbs: Vec<BBox3f> = triangles.iter().map(Triangle::aabb).collect();

    let mut indices: Vec<usize> = (0..n).collect();
    let mut nodes: Vec<BvhNode> = Vec::with_capacity(2 * n);
    nodes.push(BvhNode::EMPTY);

    // Explicit stack, large meshes would overflow recursion
    let mut stack = vec![Task {
        node_idx: 0,
        start: 0,
        end: n,
    }];

    while let Some(Task { node_idx, start, end }) = stack.pop() {
        let count = end - start;

        let mut node_bounds = BBox3f::EMPTY;
        for &idx in &indices[start..end] {
            node_bounds.expand_by_box(&aabbs[idx]);
        }

        let leaf = BvhNode {
            bounds: node_bounds,
            left_or_first: start as u32,
            count: count as u32,
        };

        if count <= MAX_LEAF_SIZE {
            nodes[node_idx] = leaf;
            continue;
        }

        let mut centroid_bounds = BBox3f::EMPTY;
        for &idx in &indices[start..end] {
            centroid_bounds.expand_by_point(centroids[idx]);
        }

        let split = find_best_split(&indices[start..end], &aabbs, &centroids, &centroid_bounds);

        // Leaf cost normalized the same way as the split cost
        let leaf_cost = count as f32 * INTERSECT_COST * node_bounds.area();
        let Some((axis, split_pos, cost)) = split.filter(|&(_, _, cost)| cost < leaf_cost) else {
            nodes[node_idx] = leaf;
            continue;
        };
        tracing::trace!(node_idx, axis, cost, "split");

        let mid = partition(&mut indices[start..end], |&idx| centroids[idx][axis] < split_pos) + start;
        let mid = if mid == start || mid == end {
            (start + end) / 2
        } else {
            mid
        };

        let left_idx = nodes.len();
        nodes.push(BvhNode::EMPTY);
        nodes.push(BvhNode::EMPTY);

        nodes[node_idx] = BvhNode {
            bounds: node_bounds,
            left_or_first: left_idx as u32,
            count: 0,
        };

        // Right first so the left subtree is built first
        stack.push(Task {
            node_idx: left_idx + 1,
            start: mid,
            end,
        });
        stack.push(Task {
            node_idx: left_idx,
            start,
            end: mid,
        });
    }

    Bvh {
        nodes,
        tri_indices: indices,
    }
}

/// SAH binned split search across all 3 axes.
/// Returns `(axis, split_position, cost)`, or `None` if every axis is degenerate.
fn find_best_split(
    indices: &[usize],
    aabbs: &[BBox3f],
    centroids: &[Vec3],
    centroid_bounds: &BBox3f,
) -> Option<(usize, f32, f32)> {
    let mut best: Option<(usize, f32, f32)> = None;

    for axis in 0..3 {
        let lo = centroid_bounds.min[axis];
        let extent = centroid_bounds.max[axis] - lo;
        if extent < 1e-8 {
            continue;
        }

        let mut bins = [Bin::EMPTY; NUM_BINS];
        let inv_extent = NUM_BINS as f32 / extent;
        for &idx in indices {
            let bin_id = (((centroids[idx][axis] - lo) * inv_extent) as usize).min(NUM_BINS - 1);
            bins[bin_id].bounds.expand_by_box(&aabbs[idx]);
            bins[bin_id].count += 1;
        }

        // Prefix sweep from the left
        let mut left_area = [0.0f32; NUM_BINS - 1];
        let mut left_count = [0usize; NUM_BINS - 1];
        let mut sweep = BBox3f::EMPTY;
        let mut sweep_count = 0;
        for i in 0..NUM_BINS - 1 {
            sweep.expand_by_box(&bins[i].bounds);
            sweep_count += bins[i].count;
            left_area[i] = if sweep.is_empty() { 0.0 } else { sweep.area() };
            left_count[i] = sweep_count;
        }

        // Suffix sweep from the right, evaluating each plane
        sweep = BBox3f::EMPTY;
        sweep_count = 0;
        for i in (1..NUM_BINS).rev() {
            sweep.expand_by_box(&bins[i].bounds);
            sweep_count += bins[i].count;
            let right_area = if sweep.is_empty() { 0.0 } else { sweep.area() };
            let cost = TRAVERSAL_COST
                + INTERSECT_COST
                    * (left_count[i - 1] as f32 * left_area[i - 1] + sweep_count as f32 * right_area);

            if best.map_or(true, |(_, _, c)| cost < c) {
                best = Some((axis, lo + (i as f32 / NUM_BINS as f32) * extent, cost));
            }
        }
    }

    best
}

/// Partition slice in-place. Returns count of elements where predicate is true.
fn partition<T, F>(slice: &mut [T], pred: F) -> usize
where
    F: Fn(&T) -> bool,
{
    let mut left = 0;
    let mut right = slice.len();
    while left < right {
        if pred(&slice[left]) {
            left += 1;
        } else {
            right -= 1;
            slice.swap(left, right);
        }
    }
    left
}
