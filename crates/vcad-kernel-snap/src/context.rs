//! The snap context: cached trees plus the public queries.

use log::{debug, trace};
use vcad_kernel_math::{Plane, Point3, Vec2, Vec3};
use vcad_kernel_scene::{BaseFlags, Object, ObjectId, ObjectMode, SnapScene, View3d};

use crate::cache::{EditMeshFilters, TreeCache};
use crate::error::Result;
use crate::geometry::SnapGeometry;
use crate::hit::{sort_by_depth, HitDepth, SnapElements, SnapHit, SnapMode};
use crate::object::{self, Candidate, FaceSource, SnapState, SnapTarget};
use crate::settings::{SnapObjectParams, SnapSelect, SnapSettings};
use crate::snap_data::SnapData;

/// Ray depth meaning "unbounded".
pub const RAY_DEPTH_MAX: f64 = f64::INFINITY;

/// Snapping state kept across queries.
///
/// Holds the per-object acceleration trees, built on first use and
/// reused until the geometry they were built from changes. A context
/// bound to a viewport answers screen-space queries; a bare context only
/// answers ray casts. Scenes are passed per query and only read.
#[derive(Debug, Default)]
pub struct SnapObjectContext {
    view: Option<View3d>,
    cache: TreeCache,
}

impl SnapObjectContext {
    /// A context for ray casts.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context bound to a viewport.
    pub fn new_view3d(view: View3d) -> Self {
        Self {
            view: Some(view),
            cache: TreeCache::default(),
        }
    }

    /// Replace the default tunables.
    pub fn with_settings(mut self, settings: SnapSettings) -> Result<Self> {
        self.set_settings(settings)?;
        Ok(self)
    }

    /// Current tunables.
    pub fn settings(&self) -> &SnapSettings {
        self.cache.settings()
    }

    /// Validate and replace the tunables. Cached trees are dropped when
    /// their build parameters change.
    pub fn set_settings(&mut self, settings: SnapSettings) -> Result<()> {
        settings.validate()?;
        self.cache.set_settings(settings);
        Ok(())
    }

    /// The bound viewport.
    pub fn view3d(&self) -> Option<&View3d> {
        self.view.as_ref()
    }

    /// Bind (or unbind) a viewport, e.g. after the region was resized.
    pub fn set_view3d(&mut self, view: Option<View3d>) {
        self.view = view;
    }

    /// Restrict which edit-mode elements can be snapped to.
    pub fn set_editmesh_filters(&mut self, filters: EditMeshFilters) {
        self.cache.set_filters(filters);
    }

    /// Drop every cached tree.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Number of objects with cached trees.
    pub fn cached_objects(&self) -> usize {
        self.cache.len()
    }

    /// Cast a ray against the faces of the scene.
    ///
    /// `ray_depth` bounds the search and is updated to the hit distance.
    /// The reported index is that of the original polygon.
    pub fn project_ray<S: SnapScene + ?Sized>(
        &mut self,
        scene: &S,
        params: &SnapObjectParams,
        ray_start: &Point3,
        ray_dir: &Vec3,
        ray_depth: &mut f64,
    ) -> Option<SnapHit> {
        let ray_dir = ray_dir.try_normalize(f64::EPSILON)?;
        let snap = SnapData::from_ray(SnapElements::FACE, *ray_start, ray_dir);
        let mut state = SnapState::new(*ray_depth, 0.0);
        if !self.snap_objects(scene, &snap, params, &mut state, None) {
            return None;
        }
        let mut best = state.best.take()?;
        if let Some(face) = best.face {
            if face.source == FaceSource::Mesh {
                best.index = scene
                    .derived_mesh(best.object)
                    .and_then(|mesh| mesh.orig_poly_index(face.face));
            }
        }
        *ray_depth = state.ray_depth;
        Some(to_hit(best, state.ray_depth, 0.0))
    }

    /// Cast a ray and collect every face hit closer than `ray_depth`
    /// (negative means unbounded), optionally sorted front to back.
    pub fn project_ray_all<S: SnapScene + ?Sized>(
        &mut self,
        scene: &S,
        params: &SnapObjectParams,
        ray_start: &Point3,
        ray_dir: &Vec3,
        ray_depth: f64,
        sort: bool,
    ) -> Vec<HitDepth> {
        let Some(ray_dir) = ray_dir.try_normalize(f64::EPSILON) else {
            return Vec::new();
        };
        let ray_depth = if ray_depth < 0.0 { RAY_DEPTH_MAX } else { ray_depth };
        let snap = SnapData::from_ray(SnapElements::FACE, *ray_start, ray_dir);
        self.collect_hits(scene, &snap, params, ray_depth, sort)
    }

    /// Like [`SnapObjectContext::project_ray_all`], with the view ray
    /// under the cursor `mval`.
    pub fn project_all_view3d<S: SnapScene + ?Sized>(
        &mut self,
        scene: &S,
        params: &SnapObjectParams,
        mval: &Vec2,
        ray_depth: f64,
        sort: bool,
    ) -> Vec<HitDepth> {
        let Some(view) = &self.view else {
            return Vec::new();
        };
        let Some((view_snap, clipped)) = SnapData::from_view3d(view, SnapElements::FACE, mval) else {
            return Vec::new();
        };
        let mut ray_depth = if ray_depth < 0.0 { RAY_DEPTH_MAX } else { ray_depth };
        if let Some(clipped) = clipped {
            ray_depth = ray_depth.min(clipped);
        }
        let snap = SnapData::from_ray(SnapElements::FACE, view_snap.ray_start, view_snap.ray_dir);
        self.collect_hits(scene, &snap, params, ray_depth, sort)
    }

    /// Snap to vertices, edges and faces at once.
    ///
    /// With `use_depth` or face snapping, a ray cast runs first. When it
    /// hits and vertices or edges are wanted too, everything behind the
    /// hit face is clipped away before the vertex/edge search, so hidden
    /// elements cannot win. `dist_px` bounds the screen distance and is
    /// updated on success.
    pub fn project_view3d_mixed<S: SnapScene + ?Sized>(
        &mut self,
        scene: &S,
        snap_to: SnapElements,
        params: &SnapObjectParams,
        mval: &Vec2,
        dist_px: &mut f64,
        use_depth: bool,
    ) -> Option<SnapHit> {
        let view = self.view.as_ref()?;
        let (mut snap, clipped) = SnapData::from_view3d(view, snap_to, mval)?;
        snap.test_occlusion = use_depth;
        let mut state = SnapState::new(clipped.unwrap_or(RAY_DEPTH_MAX), *dist_px);

        let mut face_hit = false;
        if use_depth || snap_to.contains(SnapElements::FACE) {
            snap.snap_to = SnapElements::FACE;
            face_hit = self.snap_objects(scene, &snap, params, &mut state, None);
        }
        let mut is_hit = face_hit && snap_to.contains(SnapElements::FACE);

        let nearest_to = snap_to & (SnapElements::VERTEX | SnapElements::EDGE);
        if !nearest_to.is_empty() {
            if face_hit {
                let plane = state
                    .best
                    .as_ref()
                    .and_then(|hit| self.occlusion_plane(scene, &snap, hit));
                if let Some(plane) = plane {
                    trace!("occlusion plane {:?}", plane);
                    snap.clip_planes.insert(0, plane);
                }
            }
            snap.snap_to = nearest_to;
            if self.snap_objects(scene, &snap, params, &mut state, None) {
                is_hit = true;
            }
        }

        if !is_hit {
            return None;
        }
        let best = state.best.take()?;
        *dist_px = state.dist_px();
        Some(to_hit(best, state.ray_depth, state.dist_px()))
    }

    /// Snap with a single mode.
    ///
    /// `dist_px` bounds vertex and edge snapping, `ray_depth` bounds face
    /// snapping; both are updated on success. Increment and volume modes
    /// are left to the caller and never hit.
    pub fn project_view3d<S: SnapScene + ?Sized>(
        &mut self,
        scene: &S,
        mode: SnapMode,
        params: &SnapObjectParams,
        mval: &Vec2,
        dist_px: &mut f64,
        ray_depth: &mut f64,
    ) -> Option<SnapHit> {
        let snap_to = mode.elements();
        if snap_to.is_empty() {
            return None;
        }
        let view = self.view.as_ref()?;
        let (snap, clipped) = SnapData::from_view3d(view, snap_to, mval)?;
        let depth = clipped.map_or(*ray_depth, |c| c.min(*ray_depth));
        let mut state = SnapState::new(depth, *dist_px);
        if !self.snap_objects(scene, &snap, params, &mut state, None) {
            return None;
        }
        let best = state.best.take()?;
        *dist_px = state.dist_px();
        *ray_depth = state.ray_depth;
        Some(to_hit(best, state.ray_depth, state.dist_px()))
    }

    fn collect_hits<S: SnapScene + ?Sized>(
        &mut self,
        scene: &S,
        snap: &SnapData,
        params: &SnapObjectParams,
        ray_depth: f64,
        sort: bool,
    ) -> Vec<HitDepth> {
        let mut hits = Vec::new();
        let mut state = SnapState::new(ray_depth, 0.0);
        self.snap_objects(scene, snap, params, &mut state, Some(&mut hits));
        if sort {
            sort_by_depth(&mut hits);
        }
        debug!("ray cast collected {} hits", hits.len());
        hits
    }

    /// Run one pass over every eligible object.
    fn snap_objects<S: SnapScene + ?Sized>(
        &mut self,
        scene: &S,
        snap: &SnapData,
        params: &SnapObjectParams,
        state: &mut SnapState,
        mut hits: Option<&mut Vec<HitDepth>>,
    ) -> bool {
        let mut ob_uuid = 0u32;
        let mut found = false;
        let edit_object = scene.edit_object().filter(|_| params.use_object_edit_cage);
        let active = scene.active_object();

        // particle edit flags its base for recalculation, which the loop
        // skips; it is snapped here instead
        let particle_edit = active.filter(|id| {
            scene
                .object(*id)
                .is_some_and(|ob| ob.mode == ObjectMode::ParticleEdit)
        });
        if let Some(id) = particle_edit {
            if let Some(ob) = scene.object(id) {
                let target = SnapTarget {
                    id,
                    object: ob,
                    obmat: &ob.matrix,
                    ob_uuid,
                    use_edit: false,
                };
                ob_uuid += 1;
                found |= object::snap_object(&mut self.cache, scene, snap, &target, state, hits.as_deref_mut());
            }
        }

        for base in scene.bases() {
            if !base.flags.contains(BaseFlags::VISIBLE) || base.flags.contains(BaseFlags::RECALC) {
                continue;
            }
            let skip = match params.snap_select {
                SnapSelect::All => false,
                SnapSelect::NotSelected => base
                    .flags
                    .intersects(BaseFlags::SELECTED | BaseFlags::WAS_SELECTED),
                SnapSelect::NotActive => active == Some(base.object),
            };
            if skip || particle_edit == Some(base.object) {
                continue;
            }
            let Some(ob) = scene.object(base.object) else {
                continue;
            };

            if ob.duplicator {
                for dupli in scene.dupli_instances(base.object) {
                    let Some(dob) = scene.object(dupli.object) else {
                        continue;
                    };
                    let (id, ob_snap, use_edit) = resolve_edit(scene, edit_object, dupli.object, dob);
                    let target = SnapTarget {
                        id,
                        object: ob_snap,
                        obmat: &dupli.matrix,
                        ob_uuid,
                        use_edit,
                    };
                    ob_uuid += 1;
                    found |= object::snap_object(&mut self.cache, scene, snap, &target, state, hits.as_deref_mut());
                }
            }

            let (id, ob_snap, use_edit) = resolve_edit(scene, edit_object, base.object, ob);
            let target = SnapTarget {
                id,
                object: ob_snap,
                obmat: &ob.matrix,
                ob_uuid,
                use_edit,
            };
            ob_uuid += 1;
            found |= object::snap_object(&mut self.cache, scene, snap, &target, state, hits.as_deref_mut());
        }
        found
    }

    /// Plane through the hit face's far side, facing the viewer; points
    /// behind it are occluded by the face.
    fn occlusion_plane<S: SnapScene + ?Sized>(
        &self,
        scene: &S,
        snap: &SnapData,
        hit: &Candidate,
    ) -> Option<Plane> {
        let face = hit.face?;
        let normal = hit.normal?;
        let plane_no = if normal.dot(&snap.ray_dir) > 0.0 {
            -normal
        } else {
            normal
        };
        let verts: Vec<Point3> = match face.source {
            FaceSource::Mesh => {
                let mesh = scene.derived_mesh(hit.object)?;
                mesh.face_verts(face.face).into_iter().map(|v| mesh.vert_co(v)).collect()
            }
            FaceSource::EditMesh => {
                let em = scene.edit_mesh(hit.object)?;
                em.face_verts(face.face).into_iter().map(|v| em.vert_co(v)).collect()
            }
        };

        let local_no = hit.object_matrix.apply_normal_transposed(&plane_no);
        let far = verts
            .iter()
            .min_by(|a, b| a.coords.dot(&local_no).total_cmp(&b.coords.dot(&local_no)))?;
        let mut plane = Plane::from_point_normal(&hit.object_matrix.apply_point(far), &plane_no);
        plane.d += self.cache.settings().occlusion_plane_epsilon;
        Some(plane)
    }
}

/// The object to snap for `id`: the edit object itself, or an instance
/// of the edited mesh, snaps through the edit cage.
fn resolve_edit<'a, S: SnapScene + ?Sized>(
    scene: &'a S,
    edit_object: Option<ObjectId>,
    id: ObjectId,
    ob: &'a Object,
) -> (ObjectId, &'a Object, bool) {
    let Some(edit_id) = edit_object else {
        return (id, ob, false);
    };
    if edit_id == id {
        return (id, ob, true);
    }
    match scene.object(edit_id) {
        Some(edit_ob) if ob.data.mesh_id().is_some() && edit_ob.data.mesh_id() == ob.data.mesh_id() => {
            (edit_id, edit_ob, true)
        }
        _ => (id, ob, false),
    }
}

fn to_hit(best: Candidate, ray_depth: f64, dist_px: f64) -> SnapHit {
    SnapHit {
        location: best.location,
        normal: best.normal,
        element: best.element,
        index: best.index,
        object: best.object,
        object_matrix: best.object_matrix,
        ray_depth,
        dist_px,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use vcad_kernel_math::Transform;
    use vcad_kernel_scene::{
        Armature, DrawType, DupliInstance, EditVert, Mesh, ObjectData, PoseChannel, Scene,
    };

    use crate::hit::SnapElement;
    use crate::settings::TreeSettings;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// 50 px per unit, world origin at pixel (100, 100), looking down -Z.
    fn ortho() -> View3d {
        View3d::orthographic(Transform::identity(), 2.0, Vec2::new(200.0, 200.0), 1000.0).unwrap()
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

    fn add_mesh(scene: &mut Scene, name: &str, mesh: Mesh, matrix: Transform) -> ObjectId {
        let mesh = scene.add_mesh(mesh);
        scene.add_object(Object::new(name, ObjectData::Mesh(mesh), matrix))
    }

    fn add_points(scene: &mut Scene, points: Vec<Point3>) -> ObjectId {
        add_mesh(scene, "points", Mesh::from_points(points), Transform::identity())
    }

    fn snap(
        ctx: &mut SnapObjectContext,
        scene: &Scene,
        mode: SnapMode,
        params: &SnapObjectParams,
        mval: Vec2,
    ) -> Option<SnapHit> {
        let mut dist_px = 5.0;
        let mut ray_depth = RAY_DEPTH_MAX;
        ctx.project_view3d(scene, mode, params, &mval, &mut dist_px, &mut ray_depth)
    }

    #[test]
    fn test_vertex_snap_commits_distance() {
        init();
        let mut scene = Scene::new();
        let id = add_mesh(&mut scene, "tri", tri(), Transform::identity());
        let mut ctx = SnapObjectContext::new_view3d(ortho());

        let mut dist_px = 5.0;
        let mut ray_depth = RAY_DEPTH_MAX;
        let hit = ctx
            .project_view3d(
                &scene,
                SnapMode::Vertex,
                &SnapObjectParams::default(),
                &Vec2::new(150.0, 100.0),
                &mut dist_px,
                &mut ray_depth,
            )
            .unwrap();
        assert_eq!(hit.location, Point3::new(1.0, 0.0, 0.0));
        assert_eq!(hit.element, SnapElement::Vertex);
        assert_eq!(hit.index, Some(1));
        assert_eq!(hit.object, id);
        assert_relative_eq!(dist_px, 0.0, epsilon = 1e-9);
        assert_relative_eq!(hit.ray_depth, 500.0, epsilon = 1e-9);
        assert_eq!(ray_depth, hit.ray_depth);
        assert_eq!(ctx.cached_objects(), 1);
    }

    #[test]
    fn test_miss_leaves_inputs_untouched() {
        let mut scene = Scene::new();
        add_mesh(&mut scene, "tri", tri(), Transform::identity());
        let mut ctx = SnapObjectContext::new_view3d(ortho());

        let mut dist_px = 5.0;
        let mut ray_depth = RAY_DEPTH_MAX;
        let hit = ctx.project_view3d(
            &scene,
            SnapMode::Vertex,
            &SnapObjectParams::default(),
            &Vec2::new(190.0, 190.0),
            &mut dist_px,
            &mut ray_depth,
        );
        assert!(hit.is_none());
        assert_eq!(dist_px, 5.0);
        assert_eq!(ray_depth, RAY_DEPTH_MAX);
    }

    #[test]
    fn test_shrinking_threshold_keeps_the_winner() {
        let mut scene = Scene::new();
        add_mesh(&mut scene, "tri", tri(), Transform::identity());
        let mut ctx = SnapObjectContext::new_view3d(ortho());
        let params = SnapObjectParams::default();
        // 4 px from vertex 1
        let at = Vec2::new(146.0, 100.0);

        for threshold in [40.0, 10.0, 4.5] {
            let mut dist_px = threshold;
            let mut ray_depth = RAY_DEPTH_MAX;
            let hit = ctx
                .project_view3d(&scene, SnapMode::Vertex, &params, &at, &mut dist_px, &mut ray_depth)
                .unwrap();
            assert_eq!(hit.index, Some(1));
            assert_relative_eq!(dist_px, 4.0, epsilon = 1e-9);
        }
        let mut dist_px = 3.5;
        let mut ray_depth = RAY_DEPTH_MAX;
        assert!(ctx
            .project_view3d(&scene, SnapMode::Vertex, &params, &at, &mut dist_px, &mut ray_depth)
            .is_none());
    }

    #[test]
    fn test_modes_without_elements_never_hit() {
        let mut scene = Scene::new();
        add_mesh(&mut scene, "tri", tri(), Transform::identity());
        let mut ctx = SnapObjectContext::new_view3d(ortho());
        let params = SnapObjectParams::default();
        let at_vertex = Vec2::new(150.0, 100.0);
        assert!(snap(&mut ctx, &scene, SnapMode::Increment, &params, at_vertex).is_none());
        assert!(snap(&mut ctx, &scene, SnapMode::Volume, &params, at_vertex).is_none());
        // no viewport, no screen-space queries
        let mut bare = SnapObjectContext::new();
        assert!(snap(&mut bare, &scene, SnapMode::Vertex, &params, at_vertex).is_none());
    }

    #[test]
    fn test_edge_snap() {
        let mut scene = Scene::new();
        add_mesh(&mut scene, "tri", tri(), Transform::identity());
        let mut ctx = SnapObjectContext::new_view3d(ortho());

        let hit = snap(
            &mut ctx,
            &scene,
            SnapMode::Edge,
            &SnapObjectParams::default(),
            Vec2::new(125.0, 97.0),
        )
        .unwrap();
        assert_eq!(hit.element, SnapElement::Edge);
        assert_relative_eq!(hit.location, Point3::new(0.5, 0.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(hit.dist_px, 3.0, epsilon = 1e-9);
        // edges report their direction
        let dir = hit.normal.unwrap();
        assert_relative_eq!(dir.x.abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_face_snap() {
        let mut scene = Scene::new();
        add_mesh(&mut scene, "tri", tri(), Transform::translation(0.0, 0.0, 2.0));
        let mut ctx = SnapObjectContext::new_view3d(ortho());

        let mut dist_px = 5.0;
        let mut ray_depth = RAY_DEPTH_MAX;
        let hit = ctx
            .project_view3d(
                &scene,
                SnapMode::Face,
                &SnapObjectParams::default(),
                &Vec2::new(110.0, 110.0),
                &mut dist_px,
                &mut ray_depth,
            )
            .unwrap();
        assert_eq!(hit.element, SnapElement::Face);
        assert_eq!(hit.index, Some(0));
        assert_relative_eq!(hit.location, Point3::new(0.2, 0.2, 2.0), epsilon = 1e-9);
        assert_relative_eq!(hit.normal.unwrap().z.abs(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(ray_depth, 498.0, epsilon = 1e-6);
    }

    #[test]
    fn test_face_snap_skips_wire_objects() {
        let mut scene = Scene::new();
        let id = add_mesh(&mut scene, "tri", tri(), Transform::identity());
        scene.object_mut(id).unwrap().draw_type = DrawType::Wire;
        let mut ctx = SnapObjectContext::new_view3d(ortho());
        let params = SnapObjectParams::default();

        assert!(snap(&mut ctx, &scene, SnapMode::Face, &params, Vec2::new(110.0, 110.0)).is_none());
        // vertices of wire objects still count
        assert!(snap(&mut ctx, &scene, SnapMode::Vertex, &params, Vec2::new(150.0, 100.0)).is_some());
        // a plain ray cast has no view to draw in
        let mut depth = RAY_DEPTH_MAX;
        let hit = ctx.project_ray(
            &scene,
            &params,
            &Point3::new(0.2, 0.2, 5.0),
            &-Vec3::z(),
            &mut depth,
        );
        assert!(hit.is_some());
    }

    #[test]
    fn test_wireframe_shading_disables_face_snap() {
        let mut scene = Scene::new();
        add_mesh(&mut scene, "tri", tri(), Transform::identity());
        let mut ctx = SnapObjectContext::new_view3d(ortho().with_shading(DrawType::Wire));
        let hit = snap(
            &mut ctx,
            &scene,
            SnapMode::Face,
            &SnapObjectParams::default(),
            Vec2::new(110.0, 110.0),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_project_ray() {
        let mut scene = Scene::new();
        let id = add_mesh(&mut scene, "tri", tri(), Transform::identity());
        let mut ctx = SnapObjectContext::new();
        let params = SnapObjectParams::default();

        let mut depth = RAY_DEPTH_MAX;
        let hit = ctx
            .project_ray(
                &scene,
                &params,
                &Point3::new(0.2, 0.2, 5.0),
                &Vec3::new(0.0, 0.0, -2.0),
                &mut depth,
            )
            .unwrap();
        assert_eq!(hit.object, id);
        assert_eq!(hit.dist_px, 0.0);
        assert_relative_eq!(depth, 5.0, epsilon = 1e-9);
        assert_relative_eq!(hit.location, Point3::new(0.2, 0.2, 0.0), epsilon = 1e-9);

        // bounded short of the surface
        let mut depth = 4.0;
        let start = Point3::new(0.2, 0.2, 5.0);
        assert!(ctx.project_ray(&scene, &params, &start, &-Vec3::z(), &mut depth).is_none());
        assert_eq!(depth, 4.0);

        // degenerate direction
        let mut depth = RAY_DEPTH_MAX;
        assert!(ctx.project_ray(&scene, &params, &start, &Vec3::zeros(), &mut depth).is_none());
    }

    #[test]
    fn test_project_ray_reports_original_polygon() {
        let mut mesh = Mesh::from_polygons(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &[vec![0, 1, 2], vec![0, 2, 3]],
            &[],
        )
        .unwrap();
        mesh.set_poly_orig_index(vec![Some(7), None]).unwrap();
        let mut scene = Scene::new();
        add_mesh(&mut scene, "quad", mesh, Transform::identity());
        let mut ctx = SnapObjectContext::new();
        let params = SnapObjectParams::default();

        let mut depth = RAY_DEPTH_MAX;
        let hit = ctx
            .project_ray(&scene, &params, &Point3::new(0.8, 0.2, 1.0), &-Vec3::z(), &mut depth)
            .unwrap();
        assert_eq!(hit.index, Some(7));

        let mut depth = RAY_DEPTH_MAX;
        let hit = ctx
            .project_ray(&scene, &params, &Point3::new(0.2, 0.8, 1.0), &-Vec3::z(), &mut depth)
            .unwrap();
        assert_eq!(hit.index, None);
    }

    #[test]
    fn test_project_ray_all() {
        let mut scene = Scene::new();
        let upper = add_mesh(&mut scene, "upper", tri(), Transform::translation(0.0, 0.0, 1.0));
        let lower = add_mesh(&mut scene, "lower", tri(), Transform::identity());
        let mut ctx = SnapObjectContext::new();
        let params = SnapObjectParams::default();
        let start = Point3::new(0.2, 0.2, 10.0);

        let hits = ctx.project_ray_all(&scene, &params, &start, &-Vec3::z(), -1.0, true);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].object, upper);
        assert_eq!(hits[1].object, lower);
        assert_relative_eq!(hits[0].depth, 9.0, epsilon = 1e-9);
        assert_relative_eq!(hits[1].depth, 10.0, epsilon = 1e-9);
        assert_ne!(hits[0].ob_uuid, hits[1].ob_uuid);

        let hits = ctx.project_ray_all(&scene, &params, &start, &-Vec3::z(), 9.5, false);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].object, upper);
    }

    #[test]
    fn test_project_all_view3d() {
        let mut scene = Scene::new();
        add_mesh(&mut scene, "upper", tri(), Transform::translation(0.0, 0.0, 1.0));
        add_mesh(&mut scene, "lower", tri(), Transform::identity());
        let mut ctx = SnapObjectContext::new_view3d(ortho());

        let hits = ctx.project_all_view3d(&scene, &SnapObjectParams::default(), &Vec2::new(110.0, 110.0), -1.0, true);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].depth < hits[1].depth);
        assert_relative_eq!(hits[0].location.z, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_equal_distance_prefers_nearer_point() {
        for nearer_first in [true, false] {
            let mut scene = Scene::new();
            let near = Point3::new(1.0, 0.0, 2.0);
            let far = Point3::new(1.0, 0.0, 0.0);
            if nearer_first {
                add_points(&mut scene, vec![near]);
                add_points(&mut scene, vec![far]);
            } else {
                add_points(&mut scene, vec![far]);
                add_points(&mut scene, vec![near]);
            }
            let mut ctx = SnapObjectContext::new_view3d(ortho());
            let hit = snap(
                &mut ctx,
                &scene,
                SnapMode::Vertex,
                &SnapObjectParams::default(),
                Vec2::new(150.0, 100.0),
            )
            .unwrap();
            assert_eq!(hit.location, near);
        }
    }

    #[test]
    fn test_view_clip_planes_reject_points() {
        let mut scene = Scene::new();
        add_points(&mut scene, vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)]);
        // keep x <= 0.5
        let view = ortho().with_clip_planes(vec![Plane::new(-Vec3::x(), 0.5)]);
        let mut ctx = SnapObjectContext::new_view3d(view);
        let params = SnapObjectParams::default();

        assert!(snap(&mut ctx, &scene, SnapMode::Vertex, &params, Vec2::new(150.0, 100.0)).is_none());
        assert!(snap(&mut ctx, &scene, SnapMode::Vertex, &params, Vec2::new(100.0, 100.0)).is_some());
    }

    #[test]
    fn test_perspective_vertex_snap() {
        let mut scene = Scene::new();
        add_points(&mut scene, vec![Point3::origin()]);
        let view = View3d::perspective(
            Transform::translation(0.0, 0.0, 10.0),
            std::f64::consts::FRAC_PI_2,
            Vec2::new(200.0, 200.0),
            0.1,
            100.0,
        )
        .unwrap();
        let mut ctx = SnapObjectContext::new_view3d(view);

        let hit = snap(
            &mut ctx,
            &scene,
            SnapMode::Vertex,
            &SnapObjectParams::default(),
            Vec2::new(101.0, 100.0),
        )
        .unwrap();
        assert_eq!(hit.location, Point3::origin());
        assert_relative_eq!(hit.dist_px, 1.0, epsilon = 1e-6);
    }

    /// A large quad at z = 1, and a point under it at pixel (125, 75).
    fn occluded_point_scene() -> Scene {
        let mut scene = Scene::new();
        let quad = Mesh::from_polygons(
            vec![
                Point3::new(-2.0, -2.0, 1.0),
                Point3::new(2.0, -2.0, 1.0),
                Point3::new(2.0, 2.0, 1.0),
                Point3::new(-2.0, 2.0, 1.0),
            ],
            &[vec![0, 1, 2, 3]],
            &[],
        )
        .unwrap();
        add_mesh(&mut scene, "quad", quad, Transform::identity());
        add_points(&mut scene, vec![Point3::new(0.5, -0.5, 0.0)]);
        scene
    }

    #[test]
    fn test_mixed_depth_occludes_hidden_vertex() {
        init();
        let scene = occluded_point_scene();
        let mut ctx = SnapObjectContext::new_view3d(ortho());
        let params = SnapObjectParams::default();
        let at = Vec2::new(125.0, 75.0);

        let mut dist_px = 5.0;
        let hit = ctx.project_view3d_mixed(&scene, SnapElements::VERTEX, &params, &at, &mut dist_px, false);
        assert_eq!(hit.unwrap().location, Point3::new(0.5, -0.5, 0.0));

        let mut dist_px = 5.0;
        let hit = ctx.project_view3d_mixed(&scene, SnapElements::VERTEX, &params, &at, &mut dist_px, true);
        assert!(hit.is_none());
        assert_eq!(dist_px, 5.0);
    }

    #[test]
    fn test_mixed_face_hit_survives_occluded_vertex() {
        let scene = occluded_point_scene();
        let mut ctx = SnapObjectContext::new_view3d(ortho());

        let mut dist_px = 5.0;
        let hit = ctx
            .project_view3d_mixed(
                &scene,
                SnapElements::VERTEX | SnapElements::FACE,
                &SnapObjectParams::default(),
                &Vec2::new(125.0, 75.0),
                &mut dist_px,
                false,
            )
            .unwrap();
        assert_eq!(hit.element, SnapElement::Face);
        assert_relative_eq!(hit.location, Point3::new(0.5, -0.5, 1.0), epsilon = 1e-9);
    }

    #[test]
    fn test_mixed_vertex_beats_face() {
        let mut scene = Scene::new();
        add_mesh(&mut scene, "tri", tri(), Transform::identity());
        let mut ctx = SnapObjectContext::new_view3d(ortho());

        let mut dist_px = 10.0;
        let hit = ctx
            .project_view3d_mixed(
                &scene,
                SnapElements::all(),
                &SnapObjectParams::default(),
                &Vec2::new(103.0, 103.0),
                &mut dist_px,
                true,
            )
            .unwrap();
        assert_eq!(hit.element, SnapElement::Vertex);
        assert_eq!(hit.location, Point3::origin());
        assert_relative_eq!(dist_px, 18.0_f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_snap_select() {
        let mut scene = Scene::new();
        let id = add_points(&mut scene, vec![Point3::new(1.0, 0.0, 0.0)]);
        let mut ctx = SnapObjectContext::new_view3d(ortho());
        let at = Vec2::new(150.0, 100.0);
        let params = |snap_select| SnapObjectParams {
            snap_select,
            ..SnapObjectParams::default()
        };

        scene
            .set_base_flags(id, BaseFlags::VISIBLE | BaseFlags::WAS_SELECTED)
            .unwrap();
        assert!(snap(&mut ctx, &scene, SnapMode::Vertex, &params(SnapSelect::NotSelected), at).is_none());
        assert!(snap(&mut ctx, &scene, SnapMode::Vertex, &params(SnapSelect::All), at).is_some());

        scene.set_active(Some(id));
        assert!(snap(&mut ctx, &scene, SnapMode::Vertex, &params(SnapSelect::NotActive), at).is_none());

        scene.set_base_flags(id, BaseFlags::VISIBLE | BaseFlags::RECALC).unwrap();
        assert!(snap(&mut ctx, &scene, SnapMode::Vertex, &params(SnapSelect::All), at).is_none());
        scene.set_base_flags(id, BaseFlags::empty()).unwrap();
        assert!(snap(&mut ctx, &scene, SnapMode::Vertex, &params(SnapSelect::All), at).is_none());
    }

    #[test]
    fn test_edit_cage_is_used_when_asked() {
        let mut scene = Scene::new();
        let id = add_mesh(&mut scene, "tri", tri(), Transform::identity());
        scene.enter_edit_mode(id).unwrap();
        scene
            .edit_mesh_mut(id)
            .unwrap()
            .set_vert_co(1, Point3::new(1.0, 1.0, 0.0))
            .unwrap();
        let mut ctx = SnapObjectContext::new_view3d(ortho());
        let moved = Vec2::new(150.0, 150.0);

        let hit = snap(&mut ctx, &scene, SnapMode::Vertex, &SnapObjectParams::default(), moved).unwrap();
        assert_eq!(hit.location, Point3::new(1.0, 1.0, 0.0));
        assert_eq!(hit.index, Some(1));

        let evaluated = SnapObjectParams {
            use_object_edit_cage: false,
            ..SnapObjectParams::default()
        };
        assert!(snap(&mut ctx, &scene, SnapMode::Vertex, &evaluated, moved).is_none());
        assert!(snap(&mut ctx, &scene, SnapMode::Vertex, &evaluated, Vec2::new(150.0, 100.0)).is_some());
    }

    #[test]
    fn test_edit_mesh_filters() {
        let mut scene = Scene::new();
        let id = add_mesh(&mut scene, "tri", tri(), Transform::identity());
        scene.enter_edit_mode(id).unwrap();
        scene.edit_mesh_mut(id).unwrap().select_vert(1, true).unwrap();
        let mut ctx = SnapObjectContext::new_view3d(ortho());
        let at = Vec2::new(150.0, 100.0);
        let params = SnapObjectParams::default();

        assert!(snap(&mut ctx, &scene, SnapMode::Vertex, &params, at).is_some());
        ctx.set_editmesh_filters(EditMeshFilters {
            vert: Some(Box::new(|v: &EditVert| !v.select)),
            ..EditMeshFilters::default()
        });
        assert!(snap(&mut ctx, &scene, SnapMode::Vertex, &params, at).is_none());
    }

    #[test]
    fn test_dupli_instances() {
        let mut scene = Scene::new();
        let points = scene.add_mesh(Mesh::from_points(vec![Point3::origin()]));
        let source = scene.add_instance_source(Object::new(
            "source",
            ObjectData::Mesh(points),
            Transform::identity(),
        ));
        let emitter = scene.add_object(Object::new("emitter", ObjectData::Empty, Transform::identity()));
        scene
            .set_dupli_instances(
                emitter,
                vec![
                    DupliInstance {
                        object: source,
                        matrix: Transform::translation(1.0, 0.0, 0.0),
                    },
                    DupliInstance {
                        object: source,
                        matrix: Transform::translation(0.0, 1.0, 0.0),
                    },
                ],
            )
            .unwrap();
        let mut ctx = SnapObjectContext::new_view3d(ortho());
        let params = SnapObjectParams::default();

        let hit = snap(&mut ctx, &scene, SnapMode::Vertex, &params, Vec2::new(150.0, 100.0)).unwrap();
        assert_eq!(hit.object, source);
        assert_eq!(hit.location, Point3::new(1.0, 0.0, 0.0));
        assert_eq!(hit.object_matrix, Transform::translation(1.0, 0.0, 0.0));

        let hit = snap(&mut ctx, &scene, SnapMode::Vertex, &params, Vec2::new(100.0, 150.0)).unwrap();
        assert_eq!(hit.location, Point3::new(0.0, 1.0, 0.0));

        // the duplicating empty itself is not a target
        assert!(snap(&mut ctx, &scene, SnapMode::Vertex, &params, Vec2::new(100.0, 100.0)).is_none());
    }

    #[test]
    fn test_empty_and_armature_objects() {
        let mut scene = Scene::new();
        let empty = scene.add_object(Object::new(
            "empty",
            ObjectData::Empty,
            Transform::translation(1.0, 0.0, 0.0),
        ));
        let arm = Armature {
            layer: 1,
            edit_bones: None,
            pose: vec![PoseChannel::new(Point3::new(0.0, 1.0, 0.0), Point3::new(0.0, 2.0, 0.0))],
        };
        let bones = scene.add_object(Object::new("rig", ObjectData::Armature(arm), Transform::identity()));
        let mut ctx = SnapObjectContext::new_view3d(ortho());
        let params = SnapObjectParams::default();

        let hit = snap(&mut ctx, &scene, SnapMode::Vertex, &params, Vec2::new(150.0, 100.0)).unwrap();
        assert_eq!(hit.object, empty);
        assert_eq!(hit.index, None);

        let hit = snap(&mut ctx, &scene, SnapMode::Vertex, &params, Vec2::new(100.0, 151.0)).unwrap();
        assert_eq!(hit.object, bones);
        assert_eq!(hit.location, Point3::new(0.0, 1.0, 0.0));

        let hit = snap(&mut ctx, &scene, SnapMode::Edge, &params, Vec2::new(102.0, 175.0)).unwrap();
        assert_eq!(hit.element, SnapElement::Edge);
        assert_relative_eq!(hit.location, Point3::new(0.0, 1.5, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_empty_mesh_never_hits() {
        let mut scene = Scene::new();
        add_points(&mut scene, Vec::new());
        let mut ctx = SnapObjectContext::new_view3d(ortho());
        let params = SnapObjectParams::default();
        assert!(snap(&mut ctx, &scene, SnapMode::Vertex, &params, Vec2::new(100.0, 100.0)).is_none());
        assert!(snap(&mut ctx, &scene, SnapMode::Face, &params, Vec2::new(100.0, 100.0)).is_none());
    }

    #[test]
    fn test_settings() {
        let mut scene = Scene::new();
        add_mesh(&mut scene, "tri", tri(), Transform::identity());
        let mut ctx = SnapObjectContext::new_view3d(ortho());
        snap(&mut ctx, &scene, SnapMode::Vertex, &SnapObjectParams::default(), Vec2::new(150.0, 100.0));
        assert_eq!(ctx.cached_objects(), 1);

        let mut settings = *ctx.settings();
        settings.occlusion_plane_epsilon = 1e-4;
        ctx.set_settings(settings).unwrap();
        assert_eq!(ctx.cached_objects(), 1);

        settings.vert_tree = TreeSettings {
            arity: 8,
            leaf_size: 4,
        };
        ctx.set_settings(settings).unwrap();
        assert_eq!(ctx.cached_objects(), 0);
        assert_eq!(ctx.settings().vert_tree.arity, 8);

        settings.edge_tree.arity = 1;
        assert!(ctx.set_settings(settings).is_err());
        assert_eq!(ctx.settings().edge_tree.arity, 2);

        ctx.clear_cache();
        assert_eq!(ctx.cached_objects(), 0);
    }
}
