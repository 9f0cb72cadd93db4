//! Ray casting in an object's local space.

use vcad_kernel_bvh::intersect::{ray_triangle, tri_normal};
use vcad_kernel_bvh::{PrimitiveHit, Ray};
use vcad_kernel_math::{Aabb3, Point3, Transform, Vec3};

use crate::geometry::SnapGeometry;
use crate::snap_data::SnapData;

/// The query ray expressed in an object's local space.
///
/// Local distances are world distances times `scale`; `len_diff` is how
/// far the start was moved forward by the orthographic correction.
#[derive(Debug, Clone)]
pub(crate) struct RaycastLocal {
    pub ray_start: Point3,
    /// Unit direction.
    pub ray_dir: Vec3,
    pub scale: f64,
    /// Maximum local hit distance.
    pub depth: f64,
    pub len_diff: f64,
}

impl RaycastLocal {
    pub(crate) fn new(snap: &SnapData, obmat: &Transform, ray_depth: f64) -> Option<Self> {
        let imat = obmat.inverse()?;
        let dir = imat.apply_vec(&snap.ray_dir);
        let scale = dir.norm();
        if !(scale > 0.0) {
            return None;
        }
        Some(Self {
            ray_start: imat.apply_point(&snap.ray_start),
            ray_dir: dir / scale,
            scale,
            depth: ray_depth * scale,
            len_diff: 0.0,
        })
    }

    pub(crate) fn ray(&self) -> Ray {
        Ray::new(self.ray_start, self.ray_dir)
    }

    pub(crate) fn hits_aabb(&self, aabb: &Aabb3) -> bool {
        self.ray().intersect_aabb(aabb).is_some()
    }

    /// Move a far-away orthographic start up to the geometry.
    ///
    /// `len_diff` is the local distance from the start to the geometry;
    /// starts closer than `threshold` stay put. Large distances cost
    /// precision in the triangle tests.
    pub(crate) fn correct_ortho_start(&mut self, len_diff: f64, threshold: f64) {
        if len_diff > threshold {
            // stop one world unit short of the geometry
            let len_diff = len_diff - self.scale;
            self.ray_start += self.ray_dir * len_diff;
            self.depth -= len_diff;
            self.len_diff = len_diff;
        } else {
            self.len_diff = 0.0;
        }
    }

    /// World distance from the original start for a local hit distance.
    pub(crate) fn world_depth(&self, local_dist: f64) -> f64 {
        (local_dist + self.len_diff) / self.scale
    }
}

/// Ray test against one triangle of `geom`.
pub(crate) fn tri_hit<G: SnapGeometry>(geom: &G, index: usize, ray: &Ray) -> Option<PrimitiveHit> {
    let [a, b, c] = geom.tri_verts(index).map(|v| geom.vert_co(v));
    let dist = ray_triangle(ray, &a, &b, &c)?;
    let no = tri_normal(&a, &b, &c)?;
    Some(PrimitiveHit {
        dist,
        co: ray.at(dist),
        no,
    })
}

/// Local normal to a unit world normal.
pub(crate) fn world_normal(obmat: &Transform, no: &Vec3) -> Vec3 {
    obmat
        .apply_normal(no)
        .try_normalize(f64::EPSILON)
        .unwrap_or(*no)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SnapElements;
    use vcad_kernel_scene::Mesh;

    fn ray_down(z: f64) -> SnapData {
        SnapData::from_ray(SnapElements::FACE, Point3::new(0.2, 0.2, z), -Vec3::z())
    }

    fn tri() -> Mesh {
        Mesh::from_polygons(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &[vec![0, 1, 2]],
            &[],
        )
        .unwrap()
    }

    #[test]
    fn test_scaled_object_distances() {
        let obmat = Transform::scale(2.0, 2.0, 2.0);
        let local = RaycastLocal::new(&ray_down(10.0), &obmat, 100.0).unwrap();
        assert!((local.scale - 0.5).abs() < 1e-12);
        assert!((local.depth - 50.0).abs() < 1e-12);

        let hit = tri_hit(&tri(), 0, &local.ray()).unwrap();
        assert!((hit.dist - 5.0).abs() < 1e-12);
        assert!((local.world_depth(hit.dist) - 10.0).abs() < 1e-12);
        assert!((hit.no.z.abs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ortho_start_correction() {
        let mut local = RaycastLocal::new(&ray_down(1000.0), &Transform::identity(), f64::INFINITY).unwrap();
        local.correct_ortho_start(1000.0, 400.0);
        assert!((local.ray_start.z - 1.0).abs() < 1e-9);
        assert!((local.len_diff - 999.0).abs() < 1e-9);

        let hit = tri_hit(&tri(), 0, &local.ray()).unwrap();
        assert!((local.world_depth(hit.dist) - 1000.0).abs() < 1e-9);

        let mut near = RaycastLocal::new(&ray_down(10.0), &Transform::identity(), 100.0).unwrap();
        near.correct_ortho_start(10.0, 400.0);
        assert_eq!(near.len_diff, 0.0);
        assert_eq!(near.ray_start.z, 10.0);
    }

    #[test]
    fn test_singular_object_is_skipped() {
        assert!(RaycastLocal::new(&ray_down(1.0), &Transform::scale(1.0, 0.0, 1.0), 1.0).is_none());
    }

    #[test]
    fn test_world_normal_under_scale() {
        let obmat = Transform::scale(1.0, 1.0, 4.0);
        let n = world_normal(&obmat, &Vec3::new(1.0, 0.0, 1.0).normalize());
        assert!((n.norm() - 1.0).abs() < 1e-12);
        assert!(n.x > n.z);
    }
}
