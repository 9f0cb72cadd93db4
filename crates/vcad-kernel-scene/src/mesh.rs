//! Evaluated (derived) polygon meshes.
//!
//! A [`Mesh`] stores vertices, edges, polygons with their corner loops and
//! a fan triangulation of every polygon ("looptris"). Every mutation draws
//! a fresh generation stamp so downstream caches can tell stale data apart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use vcad_kernel_math::{Aabb3, Point3, Vec3};

use crate::{Result, SceneError};

/// Global atomic counter for geometry generation stamps.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Allocate a globally unique generation stamp.
pub(crate) fn alloc_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// A mesh vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVert {
    /// Position in object space.
    pub co: Point3,
    /// Vertex normal; zero for vertices without faces.
    pub no: Vec3,
}

/// A mesh edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshEdge {
    /// Endpoint vertex indices.
    pub v: [usize; 2],
    /// True when no polygon uses the edge.
    pub loose: bool,
}

/// A polygon, as a run of loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshPoly {
    /// First loop index.
    pub loop_start: usize,
    /// Number of corners.
    pub loop_count: usize,
}

/// A polygon corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshLoop {
    /// Corner vertex.
    pub v: usize,
    /// Edge from this corner to the next one.
    pub e: usize,
}

/// A triangle of a polygon's triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTri {
    /// Loop indices of the three corners.
    pub tri: [usize; 3],
    /// Polygon the triangle belongs to.
    pub poly: usize,
}

/// An evaluated polygon mesh.
#[derive(Debug, Clone)]
pub struct Mesh {
    verts: Vec<MeshVert>,
    edges: Vec<MeshEdge>,
    polys: Vec<MeshPoly>,
    loops: Vec<MeshLoop>,
    looptris: Vec<LoopTri>,
    poly_orig_index: Option<Vec<Option<usize>>>,
    bounds: Option<Aabb3>,
    generation: u64,
}

/// Edge topology shared by [`Mesh`] and the edit mesh builder.
pub(crate) struct Topology {
    pub edges: Vec<[usize; 2]>,
    pub edge_used: Vec<bool>,
    /// Per polygon, the edge leaving each corner.
    pub poly_edges: Vec<Vec<usize>>,
}

/// Deduplicate polygon and loose edges.
pub(crate) fn build_topology(
    vert_count: usize,
    polygons: &[Vec<usize>],
    loose_edges: &[[usize; 2]],
) -> Result<Topology> {
    let mut lookup: HashMap<(usize, usize), usize> = HashMap::new();
    let mut edges: Vec<[usize; 2]> = Vec::new();
    let mut edge_used: Vec<bool> = Vec::new();

    let mut add_edge = |a: usize, b: usize, used: bool| -> Result<usize> {
        if a >= vert_count || b >= vert_count {
            return Err(SceneError::VertexOutOfRange {
                index: a.max(b),
                count: vert_count,
            });
        }
        if a == b {
            return Err(SceneError::DegenerateEdge(a));
        }
        let key = (a.min(b), a.max(b));
        let index = *lookup.entry(key).or_insert_with(|| {
            edges.push([a, b]);
            edge_used.push(false);
            edges.len() - 1
        });
        edge_used[index] |= used;
        Ok(index)
    };

    let mut poly_edges = Vec::with_capacity(polygons.len());
    for (i, poly) in polygons.iter().enumerate() {
        if poly.len() < 3 {
            return Err(SceneError::DegeneratePolygon(i));
        }
        let mut corner_edges = Vec::with_capacity(poly.len());
        for (j, &a) in poly.iter().enumerate() {
            let b = poly[(j + 1) % poly.len()];
            corner_edges.push(add_edge(a, b, true)?);
        }
        poly_edges.push(corner_edges);
    }
    for &[a, b] in loose_edges {
        add_edge(a, b, false)?;
    }

    Ok(Topology {
        edges,
        edge_used,
        poly_edges,
    })
}

/// Fan triangulation of a polygon with `n` corners, as corner offsets.
pub(crate) fn fan_triangles(n: usize) -> impl Iterator<Item = [usize; 3]> {
    (1..n.saturating_sub(1)).map(|i| [0, i, i + 1])
}

/// Area-weighted vertex normals; vertices without faces get zero.
pub(crate) fn vertex_normals(positions: &[Point3], polygons: &[Vec<usize>]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::zeros(); positions.len()];
    for poly in polygons {
        // Newell's method handles non-planar polygons
        let mut n = Vec3::zeros();
        for (j, &a) in poly.iter().enumerate() {
            let p = positions[a];
            let q = positions[poly[(j + 1) % poly.len()]];
            n.x += (p.y - q.y) * (p.z + q.z);
            n.y += (p.z - q.z) * (p.x + q.x);
            n.z += (p.x - q.x) * (p.y + q.y);
        }
        for &a in poly {
            normals[a] += n;
        }
    }
    for n in &mut normals {
        *n = n.try_normalize(f64::EPSILON).unwrap_or_else(Vec3::zeros);
    }
    normals
}

impl Mesh {
    /// Build a mesh from vertex positions, polygons (as vertex index
    /// rings) and extra loose edges.
    pub fn from_polygons(
        positions: Vec<Point3>,
        polygons: &[Vec<usize>],
        loose_edges: &[[usize; 2]],
    ) -> Result<Self> {
        let topo = build_topology(positions.len(), polygons, loose_edges)?;
        let normals = vertex_normals(&positions, polygons);

        let verts = positions
            .iter()
            .zip(&normals)
            .map(|(co, no)| MeshVert { co: *co, no: *no })
            .collect();
        let edges = topo
            .edges
            .iter()
            .zip(&topo.edge_used)
            .map(|(v, used)| MeshEdge { v: *v, loose: !used })
            .collect();

        let mut polys = Vec::with_capacity(polygons.len());
        let mut loops = Vec::new();
        let mut looptris = Vec::new();
        for (i, (poly, corner_edges)) in polygons.iter().zip(&topo.poly_edges).enumerate() {
            let loop_start = loops.len();
            for (&v, &e) in poly.iter().zip(corner_edges) {
                loops.push(MeshLoop { v, e });
            }
            for [a, b, c] in fan_triangles(poly.len()) {
                looptris.push(LoopTri {
                    tri: [loop_start + a, loop_start + b, loop_start + c],
                    poly: i,
                });
            }
            polys.push(MeshPoly {
                loop_start,
                loop_count: poly.len(),
            });
        }

        Ok(Self {
            bounds: Aabb3::from_points(&positions),
            verts,
            edges,
            polys,
            loops,
            looptris,
            poly_orig_index: None,
            generation: alloc_generation(),
        })
    }

    /// A point cloud: vertices only.
    pub fn from_points(positions: Vec<Point3>) -> Self {
        Self {
            bounds: Aabb3::from_points(&positions),
            verts: positions
                .into_iter()
                .map(|co| MeshVert {
                    co,
                    no: Vec3::zeros(),
                })
                .collect(),
            edges: Vec::new(),
            polys: Vec::new(),
            loops: Vec::new(),
            looptris: Vec::new(),
            poly_orig_index: None,
            generation: alloc_generation(),
        }
    }

    /// Map each polygon back to the polygon it was derived from.
    ///
    /// `None` entries mark polygons with no original.
    pub fn set_poly_orig_index(&mut self, map: Vec<Option<usize>>) -> Result<()> {
        if map.len() != self.polys.len() {
            return Err(SceneError::OrigIndexLength {
                expected: self.polys.len(),
                got: map.len(),
            });
        }
        self.poly_orig_index = Some(map);
        self.generation = alloc_generation();
        Ok(())
    }

    /// Move a vertex.
    pub fn set_vert_co(&mut self, index: usize, co: Point3) -> Result<()> {
        let count = self.verts.len();
        let vert = self
            .verts
            .get_mut(index)
            .ok_or(SceneError::VertexOutOfRange { index, count })?;
        vert.co = co;
        self.bounds = Aabb3::from_points(self.verts.iter().map(|v| &v.co));
        self.generation = alloc_generation();
        Ok(())
    }

    /// Vertices.
    pub fn verts(&self) -> &[MeshVert] {
        &self.verts
    }

    /// Edges.
    pub fn edges(&self) -> &[MeshEdge] {
        &self.edges
    }

    /// Polygons.
    pub fn polys(&self) -> &[MeshPoly] {
        &self.polys
    }

    /// Polygon corners.
    pub fn loops(&self) -> &[MeshLoop] {
        &self.loops
    }

    /// Triangulation of all polygons.
    pub fn looptris(&self) -> &[LoopTri] {
        &self.looptris
    }

    /// Vertex indices of a polygon, in winding order.
    pub fn poly_verts(&self, poly: usize) -> impl Iterator<Item = usize> + '_ {
        let p = self.polys.get(poly).copied().unwrap_or(MeshPoly {
            loop_start: 0,
            loop_count: 0,
        });
        self.loops[p.loop_start..p.loop_start + p.loop_count]
            .iter()
            .map(|l| l.v)
    }

    /// The original polygon a derived polygon maps to.
    ///
    /// Without a mapping table every polygon is its own original.
    pub fn orig_poly_index(&self, poly: usize) -> Option<usize> {
        match &self.poly_orig_index {
            Some(map) => map.get(poly).copied().flatten(),
            None => Some(poly),
        }
    }

    /// Bounds of all vertices, `None` when empty.
    pub fn bounds(&self) -> Option<&Aabb3> {
        self.bounds.as_ref()
    }

    /// Stamp that changes whenever the geometry changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
