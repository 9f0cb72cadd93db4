//! Bounding Volume Hierarchy over indexed primitives.
//!
//! Uses Surface Area Heuristic (SAH) for binary construction and a sorted
//! median split for wider trees. Children of an internal node are stored
//! in ascending order along the node's split axis, which is what lets the
//! depth-first walk visit the near side first.

use log::debug;
use vcad_kernel_math::{Aabb3, Point3};

use crate::Ray;

/// Construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BvhParams {
    /// Maximum number of children per internal node (at least 2).
    pub arity: usize,
    /// Maximum number of primitives per leaf (at least 1).
    pub leaf_size: usize,
}

impl Default for BvhParams {
    fn default() -> Self {
        Self {
            arity: 2,
            leaf_size: 1,
        }
    }
}

/// A BVH node - either a leaf holding primitive indices or an internal node.
#[derive(Debug, Clone)]
pub enum BvhNode {
    /// Leaf node containing primitive indices.
    Leaf {
        /// Axis-aligned bounding box of this node.
        aabb: Aabb3,
        /// Caller-side primitive indices.
        items: Vec<usize>,
    },
    /// Internal node.
    Internal {
        /// Axis-aligned bounding box of this node.
        aabb: Aabb3,
        /// Axis the children were split along.
        axis: usize,
        /// Children, ascending along `axis`.
        children: Vec<BvhNode>,
    },
}

impl BvhNode {
    /// Bounding box of this node.
    pub fn aabb(&self) -> &Aabb3 {
        match self {
            BvhNode::Leaf { aabb, .. } | BvhNode::Internal { aabb, .. } => aabb,
        }
    }
}

/// A primitive hit reported by a ray callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimitiveHit {
    /// Ray parameter of the hit.
    pub dist: f64,
    /// Hit location.
    pub co: Point3,
    /// Surface normal at the hit.
    pub no: vcad_kernel_math::Vec3,
}

/// A hit returned by [`Bvh::ray_cast`] and [`Bvh::ray_cast_all`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Primitive index the hit belongs to.
    pub index: usize,
    /// Ray parameter of the hit.
    pub dist: f64,
    /// Hit location.
    pub co: Point3,
    /// Surface normal at the hit.
    pub no: vcad_kernel_math::Vec3,
}

impl RayHit {
    fn new(index: usize, hit: PrimitiveHit) -> Self {
        Self {
            index,
            dist: hit.dist,
            co: hit.co,
            no: hit.no,
        }
    }
}

/// Result of [`Bvh::find_nearest`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    /// Primitive index of the closest primitive.
    pub index: usize,
    /// Closest point on that primitive.
    pub co: Point3,
    /// Squared distance from the query point.
    pub dist_sq: f64,
}

/// Callbacks for [`Bvh::walk_dfs`].
///
/// `Flag` is copied into every child before `parent` sees it, so a
/// callback may clear bits for the remainder of a subtree only.
pub trait BvhWalker {
    /// Per-subtree state handed down the walk.
    type Flag: Copy;

    /// Decide whether to descend into a node; may narrow `flag`.
    fn parent(&mut self, aabb: &Aabb3, flag: &mut Self::Flag) -> bool;

    /// Visit one primitive of a leaf that survived `parent`.
    fn leaf(&mut self, index: usize, flag: &Self::Flag);

    /// Return true to visit the children of a node in ascending order
    /// along `axis`, false for descending.
    fn ascending(&mut self, aabb: &Aabb3, axis: usize) -> bool;
}

/// Bounding Volume Hierarchy over caller-indexed primitives.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    root: Option<BvhNode>,
    len: usize,
}

struct BuildItem {
    index: usize,
    aabb: Aabb3,
    centroid: Point3,
}

impl Bvh {
    /// Build a tree from `(index, aabb)` pairs.
    ///
    /// Indices are opaque to the tree and handed back to callbacks.
    /// Filtering happens on the caller's side by leaving items out.
    pub fn build<I>(items: I, params: BvhParams) -> Self
    where
        I: IntoIterator<Item = (usize, Aabb3)>,
    {
        let params = BvhParams {
            arity: params.arity.max(2),
            leaf_size: params.leaf_size.max(1),
        };
        let mut data: Vec<BuildItem> = items
            .into_iter()
            .map(|(index, aabb)| BuildItem {
                index,
                aabb,
                centroid: aabb.center(),
            })
            .collect();

        let len = data.len();
        let root = if data.is_empty() {
            None
        } else {
            Some(build_node(&mut data, &params))
        };
        debug!("built bvh: {len} primitives, arity {}", params.arity);

        Self { root, len }
    }

    /// True when the tree holds no primitives.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of primitives in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Get a reference to the root node, if any.
    pub fn root(&self) -> Option<&BvhNode> {
        self.root.as_ref()
    }

    /// Bounds of everything in the tree.
    pub fn bounds(&self) -> Option<&Aabb3> {
        self.root.as_ref().map(BvhNode::aabb)
    }

    /// Cast a ray and keep the closest primitive hit with
    /// `dist <= max_dist`.
    pub fn ray_cast<F>(&self, ray: &Ray, max_dist: f64, mut test: F) -> Option<RayHit>
    where
        F: FnMut(usize, &Ray) -> Option<PrimitiveHit>,
    {
        let mut closest: Option<RayHit> = None;
        let mut closest_t = max_dist;
        if let Some(root) = &self.root {
            ray_cast_node(ray, root, &mut test, &mut closest, &mut closest_t);
        }
        closest
    }

    /// Cast a ray and report every primitive hit with `dist <= max_dist`,
    /// in traversal order.
    pub fn ray_cast_all<F>(&self, ray: &Ray, max_dist: f64, mut test: F) -> Vec<RayHit>
    where
        F: FnMut(usize, &Ray) -> Option<PrimitiveHit>,
    {
        let mut hits = Vec::new();
        if let Some(root) = &self.root {
            ray_cast_all_node(ray, root, max_dist, &mut test, &mut hits);
        }
        hits
    }

    /// Find the primitive closest to `point`.
    ///
    /// `closest` maps a primitive index to the point on that primitive
    /// nearest the query.
    pub fn find_nearest<F>(&self, point: &Point3, mut closest: F) -> Option<Nearest>
    where
        F: FnMut(usize, &Point3) -> Point3,
    {
        let mut best: Option<Nearest> = None;
        let mut best_dist_sq = f64::INFINITY;
        if let Some(root) = &self.root {
            nearest_node(point, root, &mut closest, &mut best, &mut best_dist_sq);
        }
        best
    }

    /// Depth-first walk driven by `walker`.
    ///
    /// `parent` is consulted for every node (the root included) before
    /// its children or primitives are visited; `ascending` picks the
    /// child order of internal nodes.
    pub fn walk_dfs<W: BvhWalker>(&self, walker: &mut W, flag: W::Flag) {
        if let Some(root) = &self.root {
            walk_node(root, walker, flag);
        }
    }
}

fn walk_node<W: BvhWalker>(node: &BvhNode, walker: &mut W, mut flag: W::Flag) {
    if !walker.parent(node.aabb(), &mut flag) {
        return;
    }
    match node {
        BvhNode::Leaf { items, .. } => {
            for &index in items {
                walker.leaf(index, &flag);
            }
        }
        BvhNode::Internal {
            aabb,
            axis,
            children,
        } => {
            if walker.ascending(aabb, *axis) {
                for child in children {
                    walk_node(child, walker, flag);
                }
            } else {
                for child in children.iter().rev() {
                    walk_node(child, walker, flag);
                }
            }
        }
    }
}

fn ray_cast_node<F>(
    ray: &Ray,
    node: &BvhNode,
    test: &mut F,
    closest: &mut Option<RayHit>,
    closest_t: &mut f64,
) where
    F: FnMut(usize, &Ray) -> Option<PrimitiveHit>,
{
    let Some((t_min, _)) = ray.intersect_aabb(node.aabb()) else {
        return;
    };
    // Early out if AABB entry is beyond current closest
    if t_min > *closest_t {
        return;
    }

    match node {
        BvhNode::Leaf { items, .. } => {
            for &index in items {
                if let Some(hit) = test(index, ray) {
                    let better = match closest {
                        Some(_) => hit.dist < *closest_t,
                        None => hit.dist <= *closest_t,
                    };
                    if better {
                        *closest_t = hit.dist;
                        *closest = Some(RayHit::new(index, hit));
                    }
                }
            }
        }
        BvhNode::Internal { children, .. } => {
            // Test children in order of AABB entry distance
            let mut order: Vec<(f64, &BvhNode)> = children
                .iter()
                .filter_map(|child| ray.intersect_aabb(child.aabb()).map(|(t, _)| (t, child)))
                .collect();
            order.sort_by(|a, b| a.0.total_cmp(&b.0));
            for (_, child) in order {
                ray_cast_node(ray, child, test, closest, closest_t);
            }
        }
    }
}

fn ray_cast_all_node<F>(
    ray: &Ray,
    node: &BvhNode,
    max_dist: f64,
    test: &mut F,
    hits: &mut Vec<RayHit>,
) where
    F: FnMut(usize, &Ray) -> Option<PrimitiveHit>,
{
    match ray.intersect_aabb(node.aabb()) {
        Some((t_min, _)) if t_min <= max_dist => {}
        _ => return,
    }

    match node {
        BvhNode::Leaf { items, .. } => {
            for &index in items {
                if let Some(hit) = test(index, ray) {
                    if hit.dist <= max_dist {
                        hits.push(RayHit::new(index, hit));
                    }
                }
            }
        }
        BvhNode::Internal { children, .. } => {
            for child in children {
                ray_cast_all_node(ray, child, max_dist, test, hits);
            }
        }
    }
}

fn nearest_node<F>(
    point: &Point3,
    node: &BvhNode,
    closest: &mut F,
    best: &mut Option<Nearest>,
    best_dist_sq: &mut f64,
) where
    F: FnMut(usize, &Point3) -> Point3,
{
    if node.aabb().squared_distance(point) >= *best_dist_sq {
        return;
    }

    match node {
        BvhNode::Leaf { items, .. } => {
            for &index in items {
                let co = closest(index, point);
                let dist_sq = (co - point).norm_squared();
                if dist_sq < *best_dist_sq {
                    *best_dist_sq = dist_sq;
                    *best = Some(Nearest { index, co, dist_sq });
                }
            }
        }
        BvhNode::Internal { children, .. } => {
            let mut order: Vec<(f64, &BvhNode)> = children
                .iter()
                .map(|child| (child.aabb().squared_distance(point), child))
                .collect();
            order.sort_by(|a, b| a.0.total_cmp(&b.0));
            for (_, child) in order {
                nearest_node(point, child, closest, best, best_dist_sq);
            }
        }
    }
}

/// Build a BVH node recursively.
fn build_node(data: &mut [BuildItem], params: &BvhParams) -> BvhNode {
    let mut bounds = Aabb3::empty();
    for item in data.iter() {
        bounds.merge(&item.aabb);
    }

    // Base case: small number of primitives -> leaf
    if data.len() <= params.leaf_size {
        return BvhNode::Leaf {
            aabb: bounds,
            items: data.iter().map(|item| item.index).collect(),
        };
    }

    let (axis, children) = if params.arity == 2 {
        let (best_axis, best_pos) = find_best_split(data, &bounds);
        let mut axis = best_axis;
        let mut mid = partition(data, best_axis, best_pos);

        // Fallback if partition fails: median along the widest centroid spread
        if mid == 0 || mid == data.len() {
            axis = longest_centroid_axis(data);
            sort_along(data, axis);
            mid = data.len() / 2;
        }

        let (left, right) = data.split_at_mut(mid);
        (axis, vec![build_node(left, params), build_node(right, params)])
    } else {
        let axis = longest_centroid_axis(data);
        sort_along(data, axis);
        let chunk = data.len().div_ceil(params.arity);
        let children = data
            .chunks_mut(chunk)
            .map(|part| build_node(part, params))
            .collect();
        (axis, children)
    };

    BvhNode::Internal {
        aabb: bounds,
        axis,
        children,
    }
}

fn sort_along(data: &mut [BuildItem], axis: usize) {
    data.sort_by(|a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));
}

fn longest_centroid_axis(data: &[BuildItem]) -> usize {
    let mut spread = Aabb3::empty();
    for item in data {
        spread.include_point(&item.centroid);
    }
    let e = spread.extent();
    if e.x >= e.y && e.x >= e.z {
        0
    } else if e.y >= e.z {
        1
    } else {
        2
    }
}

/// Find the best split axis and position using SAH.
fn find_best_split(data: &[BuildItem], bounds: &Aabb3) -> (usize, f64) {
    const NUM_BUCKETS: usize = 12;

    let extent = bounds.extent();
    let total_area = surface_area(bounds);

    let mut best_cost = f64::INFINITY;
    let mut best_axis = 0;
    let mut best_pos = 0.0;

    for axis in 0..3 {
        let axis_extent = extent[axis];
        if axis_extent < 1e-10 {
            continue;
        }
        let axis_min = bounds.min[axis];

        let mut bucket_counts = [0usize; NUM_BUCKETS];
        let mut bucket_bounds = [Aabb3::empty(); NUM_BUCKETS];

        for item in data {
            let b = ((item.centroid[axis] - axis_min) / axis_extent * NUM_BUCKETS as f64) as usize;
            let b = b.min(NUM_BUCKETS - 1);
            bucket_counts[b] += 1;
            bucket_bounds[b].merge(&item.aabb);
        }

        for split in 1..NUM_BUCKETS {
            let mut left_count = 0;
            let mut left_bounds = Aabb3::empty();
            for i in 0..split {
                left_count += bucket_counts[i];
                if bucket_counts[i] > 0 {
                    left_bounds.merge(&bucket_bounds[i]);
                }
            }

            let mut right_count = 0;
            let mut right_bounds = Aabb3::empty();
            for i in split..NUM_BUCKETS {
                right_count += bucket_counts[i];
                if bucket_counts[i] > 0 {
                    right_bounds.merge(&bucket_bounds[i]);
                }
            }

            if left_count == 0 || right_count == 0 {
                continue;
            }

            // SAH cost: traversal + P(left) * N_left + P(right) * N_right.
            // Flat sets have zero area; fall back to counts alone.
            let (pl, pr) = if total_area > 0.0 {
                (
                    surface_area(&left_bounds) / total_area,
                    surface_area(&right_bounds) / total_area,
                )
            } else {
                (1.0, 1.0)
            };
            let cost = 0.125 + pl * left_count as f64 + pr * right_count as f64;

            if cost < best_cost {
                best_cost = cost;
                best_axis = axis;
                best_pos = axis_min + (split as f64 / NUM_BUCKETS as f64) * axis_extent;
            }
        }
    }

    (best_axis, best_pos)
}

/// Partition primitives by centroid along an axis.
fn partition(data: &mut [BuildItem], axis: usize, pos: f64) -> usize {
    let mut left = 0;
    let mut right = data.len();

    while left < right {
        if data[left].centroid[axis] < pos {
            left += 1;
        } else {
            right -= 1;
            data.swap(left, right);
        }
    }

    left
}

/// Compute surface area of an AABB.
fn surface_area(aabb: &Aabb3) -> f64 {
    let d = aabb.extent();
    2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
}
