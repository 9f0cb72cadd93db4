//! The editable cage of a mesh in edit mode.
//!
//! Elements carry selection and visibility state; callers decide which
//! of them take part in snapping through filter predicates.

use vcad_kernel_math::{Point3, Vec3};

use crate::mesh::{alloc_generation, build_topology, fan_triangles, vertex_normals, Mesh};
use crate::{Result, SceneError};

/// An edit-mode vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditVert {
    /// Position in object space.
    pub co: Point3,
    /// Vertex normal.
    pub no: Vec3,
    /// Selected.
    pub select: bool,
    /// Hidden.
    pub hide: bool,
}

/// An edit-mode edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditEdge {
    /// Endpoint vertex indices.
    pub v: [usize; 2],
    /// Selected.
    pub select: bool,
    /// Hidden.
    pub hide: bool,
}

/// An edit-mode face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditFace {
    /// Vertex ring.
    pub verts: Vec<usize>,
    /// Selected.
    pub select: bool,
    /// Hidden.
    pub hide: bool,
}

/// A triangle of a face's triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditLoopTri {
    /// Corner vertices.
    pub verts: [usize; 3],
    /// Edge between consecutive corners, when the pair is a real face edge.
    pub edges: [Option<usize>; 3],
    /// Owning face.
    pub face: usize,
}

/// Editable mesh cage.
#[derive(Debug, Clone)]
pub struct EditMesh {
    verts: Vec<EditVert>,
    edges: Vec<EditEdge>,
    faces: Vec<EditFace>,
    looptris: Vec<EditLoopTri>,
    generation: u64,
}

impl EditMesh {
    /// Build a cage from vertex positions, face rings and loose edges.
    pub fn from_polygons(
        positions: Vec<Point3>,
        faces: &[Vec<usize>],
        loose_edges: &[[usize; 2]],
    ) -> Result<Self> {
        let topo = build_topology(positions.len(), faces, loose_edges)?;
        let normals = vertex_normals(&positions, faces);

        let mut looptris = Vec::new();
        for (i, (ring, corner_edges)) in faces.iter().zip(&topo.poly_edges).enumerate() {
            for tri in fan_triangles(ring.len()) {
                let mut edges = [None; 3];
                for (j, edge) in edges.iter_mut().enumerate() {
                    let a = tri[j];
                    let b = tri[(j + 1) % 3];
                    // consecutive ring corners and the closing (last, first)
                    // pair are real edges; fan diagonals are not
                    if b == a + 1 || (a == ring.len() - 1 && b == 0) {
                        *edge = Some(corner_edges[a]);
                    }
                }
                looptris.push(EditLoopTri {
                    verts: tri.map(|c| ring[c]),
                    edges,
                    face: i,
                });
            }
        }

        Ok(Self {
            verts: positions
                .iter()
                .zip(&normals)
                .map(|(co, no)| EditVert {
                    co: *co,
                    no: *no,
                    select: false,
                    hide: false,
                })
                .collect(),
            edges: topo
                .edges
                .iter()
                .map(|v| EditEdge {
                    v: *v,
                    select: false,
                    hide: false,
                })
                .collect(),
            faces: faces
                .iter()
                .map(|ring| EditFace {
                    verts: ring.clone(),
                    select: false,
                    hide: false,
                })
                .collect(),
            looptris,
            generation: alloc_generation(),
        })
    }

    /// Start editing an evaluated mesh.
    pub fn from_mesh(mesh: &Mesh) -> Result<Self> {
        let positions = mesh.verts().iter().map(|v| v.co).collect();
        let faces: Vec<Vec<usize>> = (0..mesh.polys().len())
            .map(|p| mesh.poly_verts(p).collect())
            .collect();
        let loose: Vec<[usize; 2]> = mesh
            .edges()
            .iter()
            .filter(|e| e.loose)
            .map(|e| e.v)
            .collect();
        Self::from_polygons(positions, &faces, &loose)
    }

    /// Vertices.
    pub fn verts(&self) -> &[EditVert] {
        &self.verts
    }

    /// Edges.
    pub fn edges(&self) -> &[EditEdge] {
        &self.edges
    }

    /// Faces.
    pub fn faces(&self) -> &[EditFace] {
        &self.faces
    }

    /// Triangulation of all faces.
    pub fn looptris(&self) -> &[EditLoopTri] {
        &self.looptris
    }

    /// Stamp that changes whenever geometry or element state changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Move a vertex.
    pub fn set_vert_co(&mut self, index: usize, co: Point3) -> Result<()> {
        self.vert_mut(index)?.co = co;
        Ok(())
    }

    /// Select or deselect a vertex.
    pub fn select_vert(&mut self, index: usize, select: bool) -> Result<()> {
        self.vert_mut(index)?.select = select;
        Ok(())
    }

    /// Hide or reveal a vertex.
    pub fn hide_vert(&mut self, index: usize, hide: bool) -> Result<()> {
        self.vert_mut(index)?.hide = hide;
        Ok(())
    }

    /// Select or deselect an edge.
    pub fn select_edge(&mut self, index: usize, select: bool) -> Result<()> {
        self.edge_mut(index)?.select = select;
        Ok(())
    }

    /// Hide or reveal an edge.
    pub fn hide_edge(&mut self, index: usize, hide: bool) -> Result<()> {
        self.edge_mut(index)?.hide = hide;
        Ok(())
    }

    /// Select or deselect a face.
    pub fn select_face(&mut self, index: usize, select: bool) -> Result<()> {
        self.face_mut(index)?.select = select;
        Ok(())
    }

    /// Hide or reveal a face.
    pub fn hide_face(&mut self, index: usize, hide: bool) -> Result<()> {
        self.face_mut(index)?.hide = hide;
        Ok(())
    }

    fn vert_mut(&mut self, index: usize) -> Result<&mut EditVert> {
        let count = self.verts.len();
        self.generation = alloc_generation();
        self.verts
            .get_mut(index)
            .ok_or(SceneError::VertexOutOfRange { index, count })
    }

    fn edge_mut(&mut self, index: usize) -> Result<&mut EditEdge> {
        let count = self.edges.len();
        self.generation = alloc_generation();
        self.edges
            .get_mut(index)
            .ok_or(SceneError::EdgeOutOfRange { index, count })
    }

    fn face_mut(&mut self, index: usize) -> Result<&mut EditFace> {
        let count = self.faces.len();
        self.generation = alloc_generation();
        self.faces
            .get_mut(index)
            .ok_or(SceneError::FaceOutOfRange { index, count })
    }
}
