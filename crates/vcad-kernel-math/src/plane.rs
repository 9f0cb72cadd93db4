//! Homogeneous half-space planes and the clipping tests built on them.

use crate::{Aabb3, Point3, Transform, Vec3, Vec4};

/// A plane `normal · p + d = 0`.
///
/// Points with a positive signed side are "in front". The normal is not
/// required to be unit length, so sides compare by sign only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Plane normal (not necessarily normalized).
    pub normal: Vec3,
    /// Offset term.
    pub d: f64,
}

impl Plane {
    /// Plane with the given coefficients.
    pub fn new(normal: Vec3, d: f64) -> Self {
        Self { normal, d }
    }

    /// Plane through `point` facing along `normal`.
    pub fn from_point_normal(point: &Point3, normal: &Vec3) -> Self {
        Self {
            normal: *normal,
            d: -normal.dot(&point.coords),
        }
    }

    /// Plane from its homogeneous coefficients `(a, b, c, d)`.
    pub fn from_vec4(v: &Vec4) -> Self {
        Self {
            normal: Vec3::new(v.x, v.y, v.z),
            d: v.w,
        }
    }

    /// Homogeneous coefficients `(a, b, c, d)`.
    pub fn to_vec4(&self) -> Vec4 {
        Vec4::new(self.normal.x, self.normal.y, self.normal.z, self.d)
    }

    /// Signed side of `p`; positive in front.
    pub fn side(&self, p: &Point3) -> f64 {
        self.normal.dot(&p.coords) + self.d
    }

    /// Express this world-space plane in the local space of `obmat`.
    ///
    /// A local point `p` satisfies `local.side(p) == self.side(obmat * p)`.
    pub fn to_local(&self, obmat: &Transform) -> Self {
        Self::from_vec4(&(obmat.matrix.transpose() * self.to_vec4()))
    }
}

/// How an AABB sits relative to a set of planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AabbPlaneSide {
    /// Entirely behind at least one plane.
    Behind,
    /// Straddles at least one plane, behind none.
    Intersect,
    /// In front of every plane.
    InFront,
}

/// Classify `aabb` against every plane in `planes`.
pub fn isect_aabb_planes(planes: &[Plane], aabb: &Aabb3) -> AabbPlaneSide {
    let mut side = AabbPlaneSide::InFront;
    for plane in planes {
        let (near, far) = aabb.near_far(&plane.normal);
        if plane.side(&far) < 0.0 {
            return AabbPlaneSide::Behind;
        }
        if plane.side(&near) < 0.0 {
            side = AabbPlaneSide::Intersect;
        }
    }
    side
}

/// True when `p` is on or in front of every plane.
pub fn is_in_front_all(planes: &[Plane], p: &Point3) -> bool {
    planes.iter().all(|plane| plane.side(p) >= 0.0)
}

/// Clip the segment `p1 -> p2` to the intersection of the planes' front
/// half-spaces. Returns `None` when nothing of the segment survives.
pub fn clip_segment(p1: &Point3, p2: &Point3, planes: &[Plane]) -> Option<(Point3, Point3)> {
    let dp = p2 - p1;
    let mut t1 = 0.0_f64;
    let mut t2 = 1.0_f64;

    for plane in planes {
        let div = dp.dot(&plane.normal);
        let t = -plane.side(p1);
        if div > 0.0 {
            // entering the half-space: raise the lower bound
            if t >= div {
                return None;
            }
            if t > 0.0 {
                let fac = t / div;
                if fac > t1 {
                    if fac > t2 {
                        return None;
                    }
                    t1 = fac;
                }
            }
        } else if div < 0.0 {
            // leaving the half-space: lower the upper bound
            if t > 0.0 {
                return None;
            }
            if t > div {
                let fac = t / div;
                if fac < t2 {
                    if fac < t1 {
                        return None;
                    }
                    t2 = fac;
                }
            }
        } else if t > 0.0 {
            // parallel and behind
            return None;
        }
    }

    Some((p1 + dp * t1, p1 + dp * t2))
}
