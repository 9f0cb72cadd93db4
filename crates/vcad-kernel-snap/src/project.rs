//! Screen-space projection helpers shared by every nearest-element query.
//!
//! All tests run in an object's local space: the view matrix is folded
//! with the object matrix and the clip planes are pulled into local space
//! once per object, so per-element work is a few dot products.

use bitflags::bitflags;
use vcad_kernel_math::{
    is_in_front_all, isect_aabb_planes, Aabb3, AabbPlaneSide, Mat4, Plane, Point3, Transform,
    Vec2, Vec3,
};

use crate::snap_data::{SnapData, ViewProj};

bitflags! {
    /// Tests still pending for a subtree of a nearest-element walk.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub(crate) struct ClipFlags: u8 {
        /// The subtree may cross a clip plane.
        const ISECT_CLIP_PLANE = 1 << 0;
        /// The subtree may leave the view's depth range.
        const TEST_RANGE_DEPTH = 1 << 1;
    }
}

/// Signed distance of `co` along `ray_dir` from `ray_start`.
pub(crate) fn depth_get(co: &Point3, ray_start: &Point3, ray_dir: &Vec3) -> f64 {
    (co - ray_start).dot(ray_dir)
}

/// Signed distance from a plane to the box corner nearest along its normal.
pub(crate) fn dist_aabb_to_plane(aabb: &Aabb3, plane_co: &Point3, plane_no: &Vec3) -> f64 {
    let (near, _) = aabb.near_far(plane_no);
    depth_get(&near, plane_co, plane_no)
}

/// Segment parameter of the point on `v0 -> v1` closest to the line
/// `ray_orig + t * ray_dir`, unclamped. `None` when the two are parallel.
pub(crate) fn ray_seg_closest_lambda(
    ray_orig: &Point3,
    ray_dir: &Vec3,
    v0: &Point3,
    v1: &Point3,
) -> Option<f64> {
    let seg = v1 - v0;
    let w0 = ray_orig - v0;
    let a = ray_dir.dot(ray_dir);
    let b = ray_dir.dot(&seg);
    let c = seg.dot(&seg);
    let d = ray_dir.dot(&w0);
    let e = seg.dot(&w0);
    let denom = a * c - b * b;
    if denom <= f64::EPSILON * a * c {
        return None;
    }
    Some((a * e - b * d) / denom)
}

/// Point on `v0 -> v1` closest to the ray's line; `v0` when parallel.
pub(crate) fn ray_seg_closest_point(
    ray_orig: &Point3,
    ray_dir: &Vec3,
    v0: &Point3,
    v1: &Point3,
) -> (Point3, Option<f64>) {
    match ray_seg_closest_lambda(ray_orig, ray_dir, v0, v1) {
        Some(lambda) if lambda <= 0.0 => (*v0, Some(lambda)),
        Some(lambda) if lambda >= 1.0 => (*v1, Some(lambda)),
        Some(lambda) => (v0 + (v1 - v0) * lambda, Some(lambda)),
        None => (*v0, None),
    }
}

/// Running best of a nearest-element search.
///
/// Ties in screen distance go to the candidate closer to the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct NearestBest {
    pub dist_px_sq: f64,
    pub depth: f64,
}

impl NearestBest {
    pub(crate) fn new(dist_px: f64) -> Self {
        Self {
            dist_px_sq: dist_px * dist_px,
            depth: f64::INFINITY,
        }
    }

    fn offer(&mut self, dist_sq: f64, depth: f64) -> bool {
        let better = dist_sq < self.dist_px_sq || (dist_sq == self.dist_px_sq && depth <= self.depth);
        if better {
            self.dist_px_sq = dist_sq;
            self.depth = depth;
        }
        better
    }
}

/// Per-object projection state for nearest-element tests.
#[derive(Debug, Clone)]
pub(crate) struct NearestLocal {
    /// View ray origin in local space.
    pub ray_orig: Point3,
    /// View ray direction in local space (not normalized).
    pub ray_dir: Vec3,
    ray_inv_dir: Vec3,
    pmat: Mat4,
    win_half: Vec2,
    mval: Vec2,
    is_persp: bool,
    depth_range: [f64; 2],
    clip_planes: Vec<Plane>,
}

impl NearestLocal {
    /// Local projection state for an object placed at `obmat`.
    ///
    /// `None` for singular matrices, which have no local space.
    pub(crate) fn new(snap: &SnapData, obmat: &Transform) -> Option<Self> {
        let imat = obmat.inverse()?;
        let ray_dir = imat.apply_vec(&snap.ray_dir);
        Some(Self {
            ray_orig: imat.apply_point(&snap.ray_origin),
            ray_inv_dir: ray_dir.map(|c| if c != 0.0 { 1.0 / c } else { f64::MAX }),
            ray_dir,
            pmat: snap.pmat * obmat.matrix,
            win_half: snap.win_half,
            mval: snap.mval,
            is_persp: snap.view_proj == ViewProj::Persp,
            depth_range: snap.depth_range,
            clip_planes: snap
                .clip_planes
                .iter()
                .map(|plane| plane.to_local(obmat))
                .collect(),
        })
    }

    /// Flags a walk starts with.
    pub(crate) fn initial_flag(&self) -> ClipFlags {
        let mut flag = ClipFlags::TEST_RANGE_DEPTH;
        if !self.clip_planes.is_empty() {
            flag |= ClipFlags::ISECT_CLIP_PLANE;
        }
        flag
    }

    #[inline]
    fn row(&self, i: usize, co: &Point3) -> f64 {
        let m = &self.pmat;
        m[(i, 0)] * co.x + m[(i, 1)] * co.y + m[(i, 2)] * co.z + m[(i, 3)]
    }

    /// Depth used for range tests: clip `w` in perspective, clip `z` in
    /// orthographic views.
    #[inline]
    fn depth(&self, co: &Point3) -> f64 {
        if self.is_persp {
            self.row(3, co)
        } else {
            self.row(2, co)
        }
    }

    fn depth_bounds(&self) -> (f64, f64) {
        if self.is_persp {
            (self.depth_range[0], self.depth_range[1])
        } else {
            (-1.0, 1.0)
        }
    }

    fn to_screen(&self, x: f64, y: f64, w: f64) -> Vec2 {
        let (x, y) = if self.is_persp { (x / w, y / w) } else { (x, y) };
        Vec2::new((x + 1.0) * self.win_half.x, (y + 1.0) * self.win_half.y)
    }

    /// Offer a local-space point; true when it became the new best.
    pub(crate) fn snap_point(&self, co: &Point3, flag: ClipFlags, best: &mut NearestBest) -> bool {
        if flag.contains(ClipFlags::ISECT_CLIP_PLANE) && !is_in_front_all(&self.clip_planes, co) {
            return false;
        }

        let depth = self.depth(co);
        if flag.contains(ClipFlags::TEST_RANGE_DEPTH) {
            let (lo, hi) = self.depth_bounds();
            if depth < lo || depth > hi {
                return false;
            }
        }

        let co2d = self.to_screen(self.row(0, co), self.row(1, co), depth);
        let dist_sq = (self.mval - co2d).norm_squared();
        best.offer(dist_sq, depth)
    }

    /// Clip-plane classification of a tree node, narrowing `flag`.
    /// False when the node is entirely clipped away.
    pub(crate) fn test_planes(&self, aabb: &Aabb3, flag: &mut ClipFlags) -> bool {
        if !flag.contains(ClipFlags::ISECT_CLIP_PLANE) {
            return true;
        }
        match isect_aabb_planes(&self.clip_planes, aabb) {
            AabbPlaneSide::Behind => false,
            AabbPlaneSide::InFront => {
                flag.remove(ClipFlags::ISECT_CLIP_PLANE);
                true
            }
            AabbPlaneSide::Intersect => true,
        }
    }

    /// Lower bound of the squared screen distance from the cursor to the
    /// projection of `aabb`.
    ///
    /// Clears [`ClipFlags::TEST_RANGE_DEPTH`] when the box lies inside the
    /// depth range, and records per axis whether the box's min side is the
    /// one nearer the cursor (used to order child visits).
    pub(crate) fn dist_squared_to_projected_aabb(
        &self,
        aabb: &Aabb3,
        flag: &mut ClipFlags,
        axis_closest: &mut [bool; 3],
    ) -> f64 {
        let (near, far) = aabb.near_far(&self.ray_inv_dir);

        if flag.contains(ClipFlags::TEST_RANGE_DEPTH) {
            let depth_near = self.depth(&near);
            let depth_far = self.depth(&far);
            let (lo, hi) = self.depth_bounds();
            if depth_far < lo || depth_near > hi {
                return f64::MAX;
            }
            if lo < depth_near && depth_far < hi {
                flag.remove(ClipFlags::TEST_RANGE_DEPTH);
            }
        }

        let mut tmin = [0.0; 3];
        let mut tmax = [0.0; 3];
        for i in 0..3 {
            tmin[i] = (near[i] - self.ray_orig[i]) * self.ray_inv_dir[i];
            tmax[i] = (far[i] - self.ray_orig[i]) * self.ray_inv_dir[i];
        }

        // exit slab: smallest tmax; entry slab: largest tmin
        let mut exit_axis = 0;
        for i in 1..3 {
            if tmax[i] < tmax[exit_axis] {
                exit_axis = i;
            }
        }
        let mut entry_axis = 0;
        for i in 1..3 {
            if tmin[i] > tmin[entry_axis] {
                entry_axis = i;
            }
        }
        let rtmax = tmax[exit_axis];
        let rtmin = tmin[entry_axis];

        axis_closest[exit_axis] = self.ray_inv_dir[exit_axis] < 0.0;
        axis_closest[entry_axis] = self.ray_inv_dir[entry_axis] >= 0.0;

        if rtmin <= rtmax || entry_axis == exit_axis {
            // the ray crosses the box
            if entry_axis != exit_axis {
                let main = 3 - entry_axis - exit_axis;
                let proj = self.ray_orig[main] + rtmin * self.ray_dir[main];
                axis_closest[main] = proj - aabb.min[main] < aabb.max[main] - proj;
            }
            return 0.0;
        }

        // The box edge closest to the ray runs along the remaining axis,
        // on the exit-slab side of `far` and the entry-slab side of `near`.
        let main = 3 - entry_axis - exit_axis;
        let mut va = Point3::origin();
        va[exit_axis] = far[exit_axis];
        va[entry_axis] = near[entry_axis];
        va[main] = aabb.min[main];
        let scale = aabb.max[main] - aabb.min[main];

        let m = &self.pmat;
        let (xa, ya) = (self.row(0, &va), self.row(1, &va));
        let (xb, yb) = (xa + m[(0, main)] * scale, ya + m[(1, main)] * scale);
        let (wa, wb) = if self.is_persp {
            let wa = self.row(3, &va);
            let wb = wa + m[(3, main)] * scale;
            if wa <= 0.0 || wb <= 0.0 {
                // edge crosses the eye plane; no usable bound
                return 0.0;
            }
            (wa, wb)
        } else {
            (1.0, 1.0)
        };
        let va2d = self.to_screen(xa, ya, wa);
        let vb2d = self.to_screen(xb, yb, wb);

        let edge = vb2d - va2d;
        let lambda = (self.mval - va2d).dot(&edge);
        if lambda == 0.0 {
            return (self.mval - va2d).norm_squared();
        }
        let lambda = lambda / edge.norm_squared();
        if lambda <= 0.0 {
            axis_closest[main] = true;
            (self.mval - va2d).norm_squared()
        } else if lambda >= 1.0 {
            axis_closest[main] = false;
            (self.mval - vb2d).norm_squared()
        } else {
            axis_closest[main] = lambda < 0.5;
            (self.mval - (va2d + edge * lambda)).norm_squared()
        }
    }

    /// Cheap rejection of a whole object from its bounds.
    pub(crate) fn aabb_in_reach(&self, aabb: &Aabb3, dist_px_sq: f64) -> bool {
        let mut flag = self.initial_flag();
        if !self.test_planes(aabb, &mut flag) {
            return false;
        }
        let mut scratch = [true; 3];
        self.dist_squared_to_projected_aabb(aabb, &mut flag, &mut scratch) <= dist_px_sq
    }
}
