//! Screen-space nearest vertex/edge search over element trees.

use vcad_kernel_bvh::{Bvh, BvhWalker};
use vcad_kernel_math::{Aabb3, Point3, Vec3};

use crate::geometry::SnapGeometry;
use crate::hit::{SnapElement, SnapElements};
use crate::project::{ray_seg_closest_point, ClipFlags, NearestBest, NearestLocal};

/// What the indices of the tree being walked refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LeafKind {
    Vert,
    Edge,
    Tri,
}

/// Tree walker keeping the element projecting closest to the cursor.
///
/// Results are in the object's local space.
pub(crate) struct Nearest2d<'a, G> {
    local: &'a NearestLocal,
    geom: &'a G,
    pub snap_to: SnapElements,
    kind: LeafKind,
    axis_closest: [bool; 3],
    pub best: NearestBest,
    pub vert_index: Option<usize>,
    pub edge_index: Option<usize>,
    pub co: Point3,
    /// Vertex normal for vertices, edge direction for edges.
    pub no: Vec3,
    pub element: Option<SnapElement>,
}

impl<'a, G: SnapGeometry> Nearest2d<'a, G> {
    pub(crate) fn new(
        local: &'a NearestLocal,
        geom: &'a G,
        snap_to: SnapElements,
        best: NearestBest,
    ) -> Self {
        Self {
            local,
            geom,
            snap_to,
            kind: LeafKind::Vert,
            axis_closest: [true; 3],
            best,
            vert_index: None,
            edge_index: None,
            co: Point3::origin(),
            no: Vec3::zeros(),
            element: None,
        }
    }

    pub(crate) fn walk(&mut self, tree: &Bvh, kind: LeafKind) {
        self.kind = kind;
        let flag = self.local.initial_flag();
        tree.walk_dfs(self, flag);
    }

    fn snap_vert(&mut self, index: usize, flag: ClipFlags) {
        if self.vert_index == Some(index) {
            return;
        }
        let co = self.geom.vert_co(index);
        if self.local.snap_point(&co, flag, &mut self.best) {
            self.co = co;
            self.no = self.geom.vert_no(index);
            self.vert_index = Some(index);
            self.element = Some(SnapElement::Vertex);
        }
    }

    fn snap_edge(&mut self, index: usize, flag: ClipFlags) {
        let [i0, i1] = self.geom.edge_verts(index);
        if !self.snap_to.contains(SnapElements::EDGE) {
            self.snap_vert(i0, flag);
            self.snap_vert(i1, flag);
            return;
        }
        if self.edge_index == Some(index) {
            return;
        }

        let v0 = self.geom.vert_co(i0);
        let v1 = self.geom.vert_co(i1);
        let (point, lambda) = ray_seg_closest_point(&self.local.ray_orig, &self.local.ray_dir, &v0, &v1);

        if self.snap_to.contains(SnapElements::VERTEX) {
            // near an end, the endpoint gets the first chance
            if let Some(lambda) = lambda.filter(|l| *l < 0.25 || *l > 0.75) {
                let end = if lambda > 0.5 { i1 } else { i0 };
                self.snap_vert(end, flag);
                if self.vert_index == Some(end) {
                    return;
                }
            }
        }

        if self.local.snap_point(&point, flag, &mut self.best) {
            self.co = point;
            self.no = v0 - v1;
            self.edge_index = Some(index);
            self.element = Some(SnapElement::Edge);
        }
    }

    fn snap_tri(&mut self, index: usize, flag: ClipFlags) {
        if self.snap_to.contains(SnapElements::EDGE) {
            for edge in self.geom.tri_edges(index).into_iter().flatten() {
                self.snap_edge(edge, flag);
            }
        } else {
            for vert in self.geom.tri_verts(index) {
                self.snap_vert(vert, flag);
            }
        }
    }
}

impl<G: SnapGeometry> BvhWalker for Nearest2d<'_, G> {
    type Flag = ClipFlags;

    fn parent(&mut self, aabb: &Aabb3, flag: &mut ClipFlags) -> bool {
        if !self.local.test_planes(aabb, flag) {
            return false;
        }
        let dist_sq = self
            .local
            .dist_squared_to_projected_aabb(aabb, flag, &mut self.axis_closest);
        dist_sq <= self.best.dist_px_sq
    }

    fn leaf(&mut self, index: usize, flag: &ClipFlags) {
        match self.kind {
            LeafKind::Vert => self.snap_vert(index, *flag),
            LeafKind::Edge => self.snap_edge(index, *flag),
            LeafKind::Tri => self.snap_tri(index, *flag),
        }
    }

    fn ascending(&mut self, _aabb: &Aabb3, axis: usize) -> bool {
        self.axis_closest[axis]
    }
}
