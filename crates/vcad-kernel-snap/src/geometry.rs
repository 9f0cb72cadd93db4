//! Uniform element access over evaluated meshes and edit cages.

use vcad_kernel_math::{Point3, Vec3};
use vcad_kernel_scene::{EditMesh, Mesh};

/// Element lookups the snap walkers need.
///
/// Indices come from trees built over the same geometry and are always
/// in range.
pub(crate) trait SnapGeometry {
    fn vert_co(&self, index: usize) -> Point3;
    fn vert_no(&self, index: usize) -> Vec3;
    fn edge_verts(&self, index: usize) -> [usize; 2];
    /// Corner vertices of a triangle.
    fn tri_verts(&self, index: usize) -> [usize; 3];
    /// Edge between each pair of consecutive corners, `None` for
    /// triangulation diagonals.
    fn tri_edges(&self, index: usize) -> [Option<usize>; 3];
    /// Polygon a triangle belongs to.
    fn tri_face(&self, index: usize) -> usize;
    /// Vertex ring of a polygon.
    fn face_verts(&self, face: usize) -> Vec<usize>;
}

impl SnapGeometry for Mesh {
    fn vert_co(&self, index: usize) -> Point3 {
        self.verts()[index].co
    }

    fn vert_no(&self, index: usize) -> Vec3 {
        self.verts()[index].no
    }

    fn edge_verts(&self, index: usize) -> [usize; 2] {
        self.edges()[index].v
    }

    fn tri_verts(&self, index: usize) -> [usize; 3] {
        let loops = self.loops();
        self.looptris()[index].tri.map(|l| loops[l].v)
    }

    fn tri_edges(&self, index: usize) -> [Option<usize>; 3] {
        let loops = self.loops();
        let tri = self.looptris()[index].tri;
        let mut edges = [None; 3];
        for (i, edge) in edges.iter_mut().enumerate() {
            let l1 = loops[tri[i]];
            let l2 = loops[tri[(i + 1) % 3]];
            let v = self.edges()[l1.e].v;
            if v == [l1.v, l2.v] || v == [l2.v, l1.v] {
                *edge = Some(l1.e);
            }
        }
        edges
    }

    fn tri_face(&self, index: usize) -> usize {
        self.looptris()[index].poly
    }

    fn face_verts(&self, face: usize) -> Vec<usize> {
        self.poly_verts(face).collect()
    }
}

impl SnapGeometry for EditMesh {
    fn vert_co(&self, index: usize) -> Point3 {
        self.verts()[index].co
    }

    fn vert_no(&self, index: usize) -> Vec3 {
        self.verts()[index].no
    }

    fn edge_verts(&self, index: usize) -> [usize; 2] {
        self.edges()[index].v
    }

    fn tri_verts(&self, index: usize) -> [usize; 3] {
        self.looptris()[index].verts
    }

    fn tri_edges(&self, index: usize) -> [Option<usize>; 3] {
        self.looptris()[index].edges
    }

    fn tri_face(&self, index: usize) -> usize {
        self.looptris()[index].face
    }

    fn face_verts(&self, face: usize) -> Vec<usize> {
        self.faces()[face].verts.clone()
    }
}
