//! Per-object snapping, dispatched on the object's data.
//!
//! Every routine works in the object's local space and reports through
//! [`SnapState`], which holds the best candidate of the whole query.

mod armature;
mod camera;
mod curve;
mod edit_mesh;
mod empty;
mod mesh;

use log::trace;
use vcad_kernel_math::{Point3, Transform, Vec3};
use vcad_kernel_scene::{DrawType, Object, ObjectData, ObjectId, SnapScene};

use crate::cache::TreeCache;
use crate::hit::{HitDepth, SnapElement, SnapElements};
use crate::project::{depth_get, ray_seg_closest_point, ClipFlags, NearestBest, NearestLocal};
use crate::snap_data::SnapData;

/// Which geometry a face hit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FaceSource {
    Mesh,
    EditMesh,
}

/// Polygon behind a face hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FaceRef {
    pub source: FaceSource,
    pub face: usize,
}

/// Best candidate so far, in world space.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub location: Point3,
    pub normal: Option<Vec3>,
    pub element: SnapElement,
    pub index: Option<usize>,
    pub object: ObjectId,
    pub object_matrix: Transform,
    pub face: Option<FaceRef>,
}

/// Mutable state of one query.
#[derive(Debug, Clone)]
pub(crate) struct SnapState {
    /// Face hits must be closer than this along the ray.
    pub ray_depth: f64,
    pub nearest: NearestBest,
    pub best: Option<Candidate>,
}

impl SnapState {
    pub(crate) fn new(ray_depth: f64, dist_px: f64) -> Self {
        Self {
            ray_depth,
            nearest: NearestBest::new(dist_px),
            best: None,
        }
    }

    pub(crate) fn dist_px(&self) -> f64 {
        self.nearest.dist_px_sq.sqrt()
    }

    pub(crate) fn commit_face(&mut self, depth: f64, candidate: Candidate) {
        self.ray_depth = depth;
        self.best = Some(candidate);
    }

    pub(crate) fn commit_nearest(&mut self, snap: &SnapData, best: NearestBest, candidate: Candidate) {
        self.nearest = best;
        self.ray_depth = depth_get(&candidate.location, &snap.ray_start, &snap.ray_dir);
        self.best = Some(candidate);
    }
}

/// One object (or dupli instance) taking part in a query.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SnapTarget<'a> {
    pub id: ObjectId,
    pub object: &'a Object,
    pub obmat: &'a Transform,
    pub ob_uuid: u32,
    /// Snap to the edit cage instead of the evaluated mesh.
    pub use_edit: bool,
}

impl SnapTarget<'_> {
    fn candidate(&self, location: Point3, normal: Option<Vec3>, element: SnapElement) -> Candidate {
        Candidate {
            location,
            normal,
            element,
            index: None,
            object: self.id,
            object_matrix: self.obmat.clone(),
            face: None,
        }
    }
}

/// Snap to one object; true when it improved `state` (or added hits).
pub(crate) fn snap_object<S: SnapScene + ?Sized>(
    cache: &mut TreeCache,
    scene: &S,
    snap: &SnapData,
    target: &SnapTarget<'_>,
    state: &mut SnapState,
    hits: Option<&mut Vec<HitDepth>>,
) -> bool {
    let object = target.object;
    if snap.test_occlusion && snap.snap_to == SnapElements::FACE {
        let flat_view = snap.shading.is_some_and(|s| s < DrawType::Solid);
        if flat_view || object.draw_type < DrawType::Solid {
            trace!("{}: not drawn solid, skipped for face snapping", object.name);
            return false;
        }
    }

    match &object.data {
        ObjectData::Mesh(_) => {
            if target.use_edit {
                if let Some(em) = scene.edit_mesh(target.id) {
                    return edit_mesh::snap_edit_mesh(cache, snap, target, em, state, hits);
                }
            }
            match scene.derived_mesh(target.id) {
                Some(m) => mesh::snap_mesh(cache, snap, target, m, state, hits),
                None => false,
            }
        }
        ObjectData::Curve(cu) => curve::snap_curve(snap, target, cu, state),
        ObjectData::Armature(arm) => armature::snap_armature(snap, target, arm, state),
        ObjectData::Empty => empty::snap_empty(snap, target, state),
        ObjectData::Camera(tracking) => match tracking {
            Some(tracking) => camera::snap_camera(snap, target, tracking, state),
            None => false,
        },
    }
}

/// Offer points given in the space of `obmat`, which may differ from the
/// target's own matrix. True when one of them became the best.
fn snap_points<I>(
    snap: &SnapData,
    target: &SnapTarget<'_>,
    obmat: &Transform,
    points: I,
    state: &mut SnapState,
) -> bool
where
    I: IntoIterator<Item = Point3>,
{
    if !snap.snap_to.contains(SnapElements::VERTEX) {
        return false;
    }
    let Some(local) = NearestLocal::new(snap, obmat) else {
        return false;
    };
    let flag = local.initial_flag();
    let mut best = state.nearest;
    let mut found = None;
    for co in points {
        if local.snap_point(&co, flag, &mut best) {
            found = Some(co);
        }
    }
    let Some(co) = found else {
        return false;
    };
    let candidate = target.candidate(obmat.apply_point(&co), None, SnapElement::Vertex);
    state.commit_nearest(snap, best, candidate);
    true
}

/// Offer local-space segments (bones); endpoints count as vertices.
fn snap_segments<I>(snap: &SnapData, target: &SnapTarget<'_>, segments: I, state: &mut SnapState) -> bool
where
    I: IntoIterator<Item = (Point3, Point3)>,
{
    let Some(local) = NearestLocal::new(snap, target.obmat) else {
        return false;
    };
    let flag = local.initial_flag();
    let mut best = state.nearest;
    let mut found = None;
    for (va, vb) in segments {
        if let Some(hit) = snap_segment(&local, snap.snap_to, flag, &va, &vb, &mut best) {
            found = Some(hit);
        }
    }
    let Some((co, element)) = found else {
        return false;
    };
    let candidate = target.candidate(target.obmat.apply_point(&co), None, element);
    state.commit_nearest(snap, best, candidate);
    true
}

/// Nearest point of one segment.
///
/// Vertex mode tries both endpoints. Edge mode takes the interior point
/// closest to the ray, except near an end, where a mixed query tries that
/// endpoint first.
fn snap_segment(
    local: &NearestLocal,
    snap_to: SnapElements,
    flag: ClipFlags,
    va: &Point3,
    vb: &Point3,
    best: &mut NearestBest,
) -> Option<(Point3, SnapElement)> {
    if !snap_to.contains(SnapElements::EDGE) {
        if !snap_to.contains(SnapElements::VERTEX) {
            return None;
        }
        let mut found = None;
        for v in [va, vb] {
            if local.snap_point(v, flag, best) {
                found = Some((*v, SnapElement::Vertex));
            }
        }
        return found;
    }

    let (co, lambda) = ray_seg_closest_point(&local.ray_orig, &local.ray_dir, va, vb);
    if snap_to.contains(SnapElements::VERTEX) {
        if let Some(lambda) = lambda.filter(|l| *l < 0.25 || *l > 0.75) {
            let end = if lambda > 0.5 { vb } else { va };
            if local.snap_point(end, flag, best) {
                return Some((*end, SnapElement::Vertex));
            }
        }
    }
    local
        .snap_point(&co, flag, best)
        .then_some((co, SnapElement::Edge))
}
