//! Query-wide inputs: the ray, the projection and the clip planes.

use vcad_kernel_math::{clip_segment, Mat4, Plane, Point3, Vec2, Vec3};
use vcad_kernel_scene::{DrawType, View3d};

use crate::hit::SnapElements;
use crate::project::depth_get;

/// How screen distances are measured, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ViewProj {
    /// Plain ray cast, no screen.
    None,
    Ortho,
    Persp,
}

/// Everything a query knows before it looks at any object.
#[derive(Debug, Clone)]
pub(crate) struct SnapData {
    pub snap_to: SnapElements,
    pub mval: Vec2,
    /// Where the view ray originates (the eye for perspective views).
    pub ray_origin: Point3,
    /// Where ray casting starts; the view's near clip point when clipping.
    pub ray_start: Point3,
    /// Unit ray direction.
    pub ray_dir: Vec3,
    pub pmat: Mat4,
    pub win_half: Vec2,
    pub depth_range: [f64; 2],
    pub view_proj: ViewProj,
    /// Cull by draw type and, in mixed queries, by the occlusion plane.
    pub test_occlusion: bool,
    /// World-space planes; points must lie in front of all of them.
    pub clip_planes: Vec<Plane>,
    pub shading: Option<DrawType>,
}

impl SnapData {
    /// A bare ray cast with no view attached. `ray_dir` must be unit length.
    pub(crate) fn from_ray(snap_to: SnapElements, ray_start: Point3, ray_dir: Vec3) -> Self {
        Self {
            snap_to,
            mval: Vec2::zeros(),
            ray_origin: ray_start,
            ray_start,
            ray_dir,
            pmat: Mat4::zeros(),
            win_half: Vec2::zeros(),
            depth_range: [0.0, f64::MAX],
            view_proj: ViewProj::None,
            test_occlusion: false,
            clip_planes: Vec::new(),
            shading: None,
        }
    }

    /// Data for a query under the cursor `mval` of `view`.
    ///
    /// With clip planes on, the ray is clipped to them and the second
    /// value is the remaining ray length. `None` when the planes clip
    /// the whole ray away.
    pub(crate) fn from_view3d(
        view: &View3d,
        snap_to: SnapElements,
        mval: &Vec2,
    ) -> Option<(Self, Option<f64>)> {
        let ray_origin = view.win_to_origin(mval);
        let ray_dir = view.win_to_vector(mval);
        let (clip_start, clip_end) = view.clip_range();
        let mut ray_start = ray_origin + ray_dir * clip_start;

        let mut clipped_depth = None;
        if !view.clip_planes().is_empty() {
            let ray_end = ray_origin + ray_dir * clip_end;
            let (start, end) = clip_segment(&ray_start, &ray_end, view.clip_planes())?;
            clipped_depth = Some(depth_get(&end, &start, &ray_dir));
            ray_start = start;
        }

        let data = Self {
            snap_to,
            mval: *mval,
            ray_origin,
            ray_start,
            ray_dir,
            pmat: *view.persmat(),
            win_half: view.size() * 0.5,
            depth_range: [clip_start, clip_end],
            view_proj: if view.is_persp() {
                ViewProj::Persp
            } else {
                ViewProj::Ortho
            },
            test_occlusion: true,
            clip_planes: view.clip_planes().to_vec(),
            shading: Some(view.shading()),
        };
        Some((data, clipped_depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcad_kernel_math::Transform;

    fn view() -> View3d {
        View3d::orthographic(Transform::identity(), 2.0, Vec2::new(200.0, 200.0), 1000.0).unwrap()
    }

    #[test]
    fn test_view_data_without_clipping() {
        let (data, depth) = SnapData::from_view3d(&view(), SnapElements::VERTEX, &Vec2::new(150.0, 100.0)).unwrap();
        assert!(depth.is_none());
        assert_eq!(data.view_proj, ViewProj::Ortho);
        assert!((data.ray_origin - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-9);
        // ortho rays start half the clip range behind the camera plane
        assert!((data.ray_start - Point3::new(1.0, 0.0, 500.0)).norm() < 1e-9);
        assert_eq!(data.win_half, Vec2::new(100.0, 100.0));
        assert!(data.test_occlusion);
    }

    #[test]
    fn test_view_data_clips_ray() {
        // keep z <= 3
        let clipped = view().with_clip_planes(vec![Plane::new(-Vec3::z(), 3.0)]);
        let (data, depth) = SnapData::from_view3d(&clipped, SnapElements::FACE, &Vec2::new(100.0, 100.0)).unwrap();
        assert!((data.ray_start.z - 3.0).abs() < 1e-9);
        assert!((depth.unwrap() - 503.0).abs() < 1e-9);
    }

    #[test]
    fn test_view_data_fully_clipped() {
        // keep z >= 600, beyond the far clip
        let clipped = view().with_clip_planes(vec![Plane::new(Vec3::z(), -600.0)]);
        assert!(SnapData::from_view3d(&clipped, SnapElements::FACE, &Vec2::new(100.0, 100.0)).is_none());
    }
}
