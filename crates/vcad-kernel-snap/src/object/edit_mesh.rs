//! Mesh objects in edit mode, snapped through their edit cage.

use vcad_kernel_bvh::intersect::closest_point_on_triangle;
use vcad_kernel_scene::EditMesh;

use super::mesh::nearest_normal;
use super::{Candidate, FaceRef, FaceSource, SnapState, SnapTarget};
use crate::cache::{self, TreeCache};
use crate::geometry::SnapGeometry;
use crate::hit::{HitDepth, SnapElement, SnapElements};
use crate::nearest::{LeafKind, Nearest2d};
use crate::project::NearestLocal;
use crate::raycast::{tri_hit, world_normal, RaycastLocal};
use crate::snap_data::{SnapData, ViewProj};

pub(super) fn snap_edit_mesh(
    cache: &mut TreeCache,
    snap: &SnapData,
    target: &SnapTarget<'_>,
    em: &EditMesh,
    state: &mut SnapState,
    hits: Option<&mut Vec<HitDepth>>,
) -> bool {
    if em.verts().is_empty() {
        return false;
    }
    if snap.snap_to.contains(SnapElements::FACE) {
        raycast_edit_mesh(cache, snap, target, em, state, hits)
    } else {
        nearest_edit_mesh(cache, snap, target, em, state)
    }
}

fn raycast_edit_mesh(
    cache: &mut TreeCache,
    snap: &SnapData,
    target: &SnapTarget<'_>,
    em: &EditMesh,
    state: &mut SnapState,
    hits: Option<&mut Vec<HitDepth>>,
) -> bool {
    let Some(mut local) = RaycastLocal::new(snap, target.obmat, state.ray_depth) else {
        return false;
    };
    let settings = *cache.settings();
    let Some((trees, filters)) = cache.edit_mesh_trees(target.id, em) else {
        return false;
    };
    let Some(tree) = trees
        .tris
        .ensure(|| cache::build_edit_tris(em, &settings, filters))
    else {
        return false;
    };

    if snap.view_proj == ViewProj::Ortho {
        // no bounds on a cage; measure to the closest triangle instead
        let nearest = tree.find_nearest(&local.ray_start, |i, p| {
            let [a, b, c] = em.tri_verts(i).map(|v| em.vert_co(v));
            closest_point_on_triangle(p, &a, &b, &c)
        });
        if let Some(nearest) = nearest {
            let len_diff = (nearest.co - local.ray_start).dot(&local.ray_dir);
            local.correct_ortho_start(len_diff, settings.ortho_ray_start_correction);
        }
    }

    let ray = local.ray();
    if let Some(hits) = hits {
        let before = hits.len();
        for hit in tree.ray_cast_all(&ray, local.depth, |i, ray| tri_hit(em, i, ray)) {
            hits.push(HitDepth {
                depth: local.world_depth(hit.dist),
                location: target.obmat.apply_point(&hit.co),
                normal: world_normal(target.obmat, &hit.no),
                index: em.tri_face(hit.index),
                object: target.id,
                object_matrix: target.obmat.clone(),
                ob_uuid: target.ob_uuid,
            });
        }
        return hits.len() > before;
    }

    let Some(hit) = tree.ray_cast(&ray, local.depth, |i, ray| tri_hit(em, i, ray)) else {
        return false;
    };
    let depth = local.world_depth(hit.dist);
    if depth > state.ray_depth {
        return false;
    }
    let face = em.tri_face(hit.index);
    let candidate = Candidate {
        index: Some(face),
        face: Some(FaceRef {
            source: FaceSource::EditMesh,
            face,
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

fn nearest_edit_mesh(
    cache: &mut TreeCache,
    snap: &SnapData,
    target: &SnapTarget<'_>,
    em: &EditMesh,
    state: &mut SnapState,
) -> bool {
    let Some(local) = NearestLocal::new(snap, target.obmat) else {
        return false;
    };
    let settings = *cache.settings();
    let Some((trees, filters)) = cache.edit_mesh_trees(target.id, em) else {
        return false;
    };
    if snap.snap_to.contains(SnapElements::VERTEX) {
        trees
            .verts
            .ensure(|| cache::build_edit_verts(em, &settings, filters));
    }
    if snap.snap_to.contains(SnapElements::EDGE) {
        trees
            .edges
            .ensure(|| cache::build_edit_edges(em, &settings, filters));
    }

    let mut walker = Nearest2d::new(&local, em, snap.snap_to, state.nearest);
    if snap.snap_to.contains(SnapElements::VERTEX) {
        if let Some(tree) = trees.verts.get() {
            walker.walk(tree, LeafKind::Vert);
        }
    }
    // edges only count when no vertex is in reach
    if walker.vert_index.is_none() && snap.snap_to.contains(SnapElements::EDGE) {
        if let Some(tree) = trees.edges.get() {
            walker.snap_to = snap.snap_to - SnapElements::VERTEX;
            walker.walk(tree, LeafKind::Edge);
        }
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
