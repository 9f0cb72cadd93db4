//! Evaluated mesh objects.

use vcad_kernel_math::Vec3;
use vcad_kernel_scene::Mesh;

use super::{Candidate, FaceRef, FaceSource, SnapState, SnapTarget};
use crate::cache::{self, TreeCache};
use crate::hit::{HitDepth, SnapElement, SnapElements};
use crate::nearest::{LeafKind, Nearest2d};
use crate::project::{dist_aabb_to_plane, NearestLocal};
use crate::raycast::{tri_hit, world_normal, RaycastLocal};
use crate::snap_data::{SnapData, ViewProj};

pub(super) fn snap_mesh(
    cache: &mut TreeCache,
    snap: &SnapData,
    target: &SnapTarget<'_>,
    mesh: &Mesh,
    state: &mut SnapState,
    hits: Option<&mut Vec<HitDepth>>,
) -> bool {
    if mesh.verts().is_empty() {
        return false;
    }
    if snap.snap_to.contains(SnapElements::FACE) {
        raycast_mesh(cache, snap, target, mesh, state, hits)
    } else {
        nearest_mesh(cache, snap, target, mesh, state)
    }
}

fn raycast_mesh(
    cache: &mut TreeCache,
    snap: &SnapData,
    target: &SnapTarget<'_>,
    mesh: &Mesh,
    state: &mut SnapState,
    hits: Option<&mut Vec<HitDepth>>,
) -> bool {
    let Some(mut local) = RaycastLocal::new(snap, target.obmat, state.ray_depth) else {
        return false;
    };
    let Some(bounds) = mesh.bounds() else {
        return false;
    };
    if !local.hits_aabb(bounds) {
        return false;
    }
    if snap.view_proj == ViewProj::Ortho {
        let len_diff = dist_aabb_to_plane(bounds, &local.ray_start, &local.ray_dir);
        local.correct_ortho_start(len_diff, cache.settings().ortho_ray_start_correction);
    }

    let settings = *cache.settings();
    let Some(trees) = cache.mesh_trees(target.id, mesh) else {
        return false;
    };
    let Some(tree) = trees
        .looptris
        .ensure(|| cache::build_mesh_looptris(mesh, &settings))
    else {
        return false;
    };

    let ray = local.ray();
    if let Some(hits) = hits {
        let before = hits.len();
        for hit in tree.ray_cast_all(&ray, local.depth, |i, ray| tri_hit(mesh, i, ray)) {
            hits.push(HitDepth {
                depth: local.world_depth(hit.dist),
                location: target.obmat.apply_point(&hit.co),
                normal: world_normal(target.obmat, &hit.no),
                index: mesh.looptris()[hit.index].poly,
                object: target.id,
                object_matrix: target.obmat.clone(),
                ob_uuid: target.ob_uuid,
            });
        }
        return hits.len() > before;
    }

    let Some(hit) = tree.ray_cast(&ray, local.depth, |i, ray| tri_hit(mesh, i, ray)) else {
        return false;
    };
    let depth = local.world_depth(hit.dist);
    if depth > state.ray_depth {
        return false;
    }
    let poly = mesh.looptris()[hit.index].poly;
    let candidate = Candidate {
        index: Some(poly),
        face: Some(FaceRef {
            source: FaceSource::Mesh,
            face: poly,
        }),
        ..target.candidate(
            target.obmat.apply_point(&hit.co),
            Some(world_normal(target.obmat, &hit.no)),
            SnapElement::Face,
        )
    };
    state.commit_face(depth, candidate);
    true
}

fn nearest_mesh(
    cache: &mut TreeCache,
    snap: &SnapData,
    target: &SnapTarget<'_>,
    mesh: &Mesh,
    state: &mut SnapState,
) -> bool {
    let Some(local) = NearestLocal::new(snap, target.obmat) else {
        return false;
    };
    if let Some(bounds) = mesh.bounds() {
        if !local.aabb_in_reach(bounds, state.nearest.dist_px_sq) {
            return false;
        }
    }

    let settings = *cache.settings();
    let Some(trees) = cache.mesh_trees(target.id, mesh) else {
        return false;
    };
    if snap.snap_to.contains(SnapElements::VERTEX) {
        trees
            .loose_verts
            .ensure(|| cache::build_mesh_loose_verts(mesh, &settings));
    }
    trees
        .loose_edges
        .ensure(|| cache::build_mesh_loose_edges(mesh, &settings));
    trees
        .looptris
        .ensure(|| cache::build_mesh_looptris(mesh, &settings));

    let mut walker = Nearest2d::new(&local, mesh, snap.snap_to, state.nearest);
    if snap.snap_to.contains(SnapElements::VERTEX) {
        if let Some(tree) = trees.loose_verts.get() {
            walker.walk(tree, LeafKind::Vert);
        }
    }
    if let Some(tree) = trees.loose_edges.get() {
        walker.walk(tree, LeafKind::Edge);
    }
    if let Some(tree) = trees.looptris.get() {
        walker.walk(tree, LeafKind::Tri);
    }

    let Some(element) = walker.element else {
        return false;
    };
    let index = match element {
        SnapElement::Vertex => walker.vert_index,
        SnapElement::Edge => walker.edge_index,
        SnapElement::Face => None,
    };
    let normal = nearest_normal(target, element, &walker.no);
    let candidate = Candidate {
        index,
        ..target.candidate(target.obmat.apply_point(&walker.co), normal, element)
    };
    state.commit_nearest(snap, walker.best, candidate);
    true
}

/// World normal of a vertex hit, or world direction of an edge hit.
pub(super) fn nearest_normal(target: &SnapTarget<'_>, element: SnapElement, no: &Vec3) -> Option<Vec3> {
    let no = no.try_normalize(f64::EPSILON)?;
    match element {
        SnapElement::Edge => target.obmat.apply_vec(&no).try_normalize(f64::EPSILON),
        SnapElement::Vertex | SnapElement::Face => Some(world_normal(target.obmat, &no)),
    }
}
