//! 3D viewport: camera, projection, region size and clipping.
//!
//! Matrices use the column-vector convention of [`Transform`]; clip space
//! follows the usual OpenGL layout, so normalized device coordinates run
//! from -1 to 1 and screen pixels are `(ndc + 1) * size / 2`.

use vcad_kernel_math::{Mat4, Plane, Point3, Transform, Vec2, Vec3, Vec4};

use crate::object::DrawType;
use crate::{Result, SceneError};

/// A 3D viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct View3d {
    size: Vec2,
    view_to_world: Transform,
    persmat: Mat4,
    persinv: Mat4,
    is_persp: bool,
    is_camera_view: bool,
    clip_start: f64,
    clip_end: f64,
    clip_planes: Vec<Plane>,
    shading: DrawType,
}

impl View3d {
    /// Orthographic view.
    ///
    /// `view_to_world` places the camera (looking down its local -Z);
    /// `half_height` is the half extent of the visible area vertically.
    /// Depth is clipped symmetrically to `clip_end / 2` on both sides of
    /// the camera plane.
    pub fn orthographic(
        view_to_world: Transform,
        half_height: f64,
        size: Vec2,
        clip_end: f64,
    ) -> Result<Self> {
        if !(half_height > 0.0 && clip_end > 0.0) {
            return Err(SceneError::InvalidView("ortho extents must be positive"));
        }
        let aspect = aspect(&size)?;
        let half_width = half_height * aspect;

        let mut winmat = Mat4::zeros();
        winmat[(0, 0)] = 1.0 / half_width;
        winmat[(1, 1)] = 1.0 / half_height;
        winmat[(2, 2)] = -2.0 / clip_end;
        winmat[(3, 3)] = 1.0;

        Self::with_winmat(view_to_world, winmat, size, false, -clip_end * 0.5, clip_end * 0.5)
    }

    /// Perspective view with vertical field of view `fov_y` (radians).
    pub fn perspective(
        view_to_world: Transform,
        fov_y: f64,
        size: Vec2,
        clip_start: f64,
        clip_end: f64,
    ) -> Result<Self> {
        if !(clip_start > 0.0 && clip_end > clip_start) {
            return Err(SceneError::InvalidView("clip range must satisfy 0 < start < end"));
        }
        if !(fov_y > 0.0 && fov_y < std::f64::consts::PI) {
            return Err(SceneError::InvalidView("field of view out of range"));
        }
        let aspect = aspect(&size)?;
        let f = 1.0 / (fov_y * 0.5).tan();

        let mut winmat = Mat4::zeros();
        winmat[(0, 0)] = f / aspect;
        winmat[(1, 1)] = f;
        winmat[(2, 2)] = (clip_end + clip_start) / (clip_start - clip_end);
        winmat[(2, 3)] = 2.0 * clip_end * clip_start / (clip_start - clip_end);
        winmat[(3, 2)] = -1.0;

        Self::with_winmat(view_to_world, winmat, size, true, clip_start, clip_end)
    }

    fn with_winmat(
        view_to_world: Transform,
        winmat: Mat4,
        size: Vec2,
        is_persp: bool,
        clip_start: f64,
        clip_end: f64,
    ) -> Result<Self> {
        let viewmat = view_to_world
            .inverse()
            .ok_or(SceneError::InvalidView("camera matrix is singular"))?;
        let persmat = winmat * viewmat.matrix;
        let persinv = persmat
            .try_inverse()
            .ok_or(SceneError::InvalidView("projection is singular"))?;
        Ok(Self {
            size,
            view_to_world,
            persmat,
            persinv,
            is_persp,
            is_camera_view: false,
            clip_start,
            clip_end,
            clip_planes: Vec::new(),
            shading: DrawType::Solid,
        })
    }

    /// Enable clipping against user planes (world space, front side kept).
    pub fn with_clip_planes(mut self, planes: Vec<Plane>) -> Self {
        self.clip_planes = planes;
        self
    }

    /// Set the viewport shading.
    pub fn with_shading(mut self, shading: DrawType) -> Self {
        self.shading = shading;
        self
    }

    /// Mark the view as looking through a scene camera.
    pub fn with_camera_view(mut self, camera_view: bool) -> Self {
        self.is_camera_view = camera_view;
        self
    }

    /// World-to-clip matrix.
    pub fn persmat(&self) -> &Mat4 {
        &self.persmat
    }

    /// Clip-to-world matrix.
    pub fn persinv(&self) -> &Mat4 {
        &self.persinv
    }

    /// Camera placement.
    pub fn view_to_world(&self) -> &Transform {
        &self.view_to_world
    }

    /// True for perspective projection.
    pub fn is_persp(&self) -> bool {
        self.is_persp
    }

    /// Region size in pixels.
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// User clipping planes; empty when clipping is off.
    pub fn clip_planes(&self) -> &[Plane] {
        &self.clip_planes
    }

    /// Viewport shading.
    pub fn shading(&self) -> DrawType {
        self.shading
    }

    /// Near and far distance along the view ray.
    ///
    /// Orthographic views are centered on the camera plane, so their near
    /// value is negative.
    pub fn clip_range(&self) -> (f64, f64) {
        (self.clip_start, self.clip_end)
    }

    /// Normalized device coordinates of a region pixel.
    fn ndc(&self, mval: &Vec2) -> Vec2 {
        Vec2::new(
            2.0 * mval.x / self.size.x - 1.0,
            2.0 * mval.y / self.size.y - 1.0,
        )
    }

    fn unproject(&self, ndc: Vec4) -> Point3 {
        let v = self.persinv * ndc;
        Point3::new(v.x / v.w, v.y / v.w, v.z / v.w)
    }

    /// Where the view ray through `mval` starts.
    ///
    /// Perspective views start at the eye; orthographic views start on
    /// the camera plane below the cursor.
    pub fn win_to_origin(&self, mval: &Vec2) -> Point3 {
        if self.is_persp {
            self.view_to_world.origin()
        } else {
            let ndc = self.ndc(mval);
            let z = if self.is_camera_view { -1.0 } else { 0.0 };
            self.unproject(Vec4::new(ndc.x, ndc.y, z, 1.0))
        }
    }

    /// Unit direction of the view ray through `mval`.
    pub fn win_to_vector(&self, mval: &Vec2) -> Vec3 {
        if self.is_persp {
            let ndc = self.ndc(mval);
            let p = self.unproject(Vec4::new(ndc.x, ndc.y, 0.0, 1.0));
            (p - self.view_to_world.origin()).normalize()
        } else {
            (-self.view_to_world.apply_vec(&Vec3::z())).normalize()
        }
    }

    /// Screen position of a world point; `None` behind a perspective eye.
    pub fn project(&self, p: &Point3) -> Option<Vec2> {
        let clip = self.persmat * Vec4::new(p.x, p.y, p.z, 1.0);
        let (x, y) = if self.is_persp {
            if clip.w <= 0.0 {
                return None;
            }
            (clip.x / clip.w, clip.y / clip.w)
        } else {
            (clip.x, clip.y)
        };
        let half = self.size * 0.5;
        Some(Vec2::new((x + 1.0) * half.x, (y + 1.0) * half.y))
    }
}

fn aspect(size: &Vec2) -> Result<f64> {
    if size.x >= 1.0 && size.y >= 1.0 {
        Ok(size.x / size.y)
    } else {
        Err(SceneError::InvalidView("region must be at least one pixel"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn top_ortho() -> View3d {
        View3d::orthographic(Transform::identity(), 2.0, Vec2::new(200.0, 200.0), 1000.0).unwrap()
    }

    #[test]
    fn test_ortho_project_and_back() {
        let view = top_ortho();
        let s = view.project(&Point3::new(1.0, 0.0, 0.0)).unwrap();
        assert!((s - Vec2::new(150.0, 100.0)).norm() < 1e-9);

        let origin = view.win_to_origin(&s);
        assert!((origin - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-9);
        assert!((view.win_to_vector(&s) - Vec3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
        assert_eq!(view.clip_range(), (-500.0, 500.0));
    }

    #[test]
    fn test_persp_ray_passes_through_projected_point() {
        let cam = Transform::translation(0.0, 0.0, 10.0);
        let view = View3d::perspective(cam, 0.8, Vec2::new(320.0, 240.0), 0.1, 100.0).unwrap();
        let p = Point3::new(1.5, -0.5, 0.0);
        let s = view.project(&p).unwrap();
        let o = view.win_to_origin(&s);
        let d = view.win_to_vector(&s);
        let along = (p - o).dot(&d);
        assert!(((o + d * along) - p).norm() < 1e-9);
        assert!(view.project(&Point3::new(0.0, 0.0, 20.0)).is_none());
    }

    #[test]
    fn test_invalid_views() {
        assert!(View3d::orthographic(Transform::identity(), 0.0, Vec2::new(10.0, 10.0), 1.0).is_err());
        assert!(View3d::perspective(Transform::identity(), 0.8, Vec2::new(10.0, 10.0), 1.0, 0.5).is_err());
        assert!(View3d::orthographic(Transform::scale(0.0, 1.0, 1.0), 1.0, Vec2::new(10.0, 10.0), 1.0).is_err());
        assert!(View3d::orthographic(Transform::identity(), 1.0, Vec2::new(0.0, 10.0), 1.0).is_err());
    }
}
