//! Snap targets and query results.

use bitflags::bitflags;
use vcad_kernel_math::{Point3, Transform, Vec3};
use vcad_kernel_scene::ObjectId;

bitflags! {
    /// Element kinds a query may snap to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct SnapElements: u8 {
        /// Vertices and point-like targets.
        const VERTEX = 1 << 0;
        /// Edges and bone segments.
        const EDGE = 1 << 1;
        /// Surfaces, found by ray casting.
        const FACE = 1 << 2;
    }
}

/// Snap mode of a single-mode query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapMode {
    /// Grid increments; handled by the caller, never by this engine.
    Increment,
    /// Nearest vertex.
    Vertex,
    /// Nearest edge.
    Edge,
    /// Surface under the cursor.
    Face,
    /// Volume snapping; handled by the caller, never by this engine.
    Volume,
}

impl SnapMode {
    /// The element kinds this mode snaps to; empty for modes this engine
    /// does not serve.
    pub fn elements(self) -> SnapElements {
        match self {
            SnapMode::Vertex => SnapElements::VERTEX,
            SnapMode::Edge => SnapElements::EDGE,
            SnapMode::Face => SnapElements::FACE,
            SnapMode::Increment | SnapMode::Volume => SnapElements::empty(),
        }
    }
}

/// The kind of element a hit landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapElement {
    /// A vertex or point-like target.
    Vertex,
    /// The interior of an edge or bone segment.
    Edge,
    /// A surface.
    Face,
}

/// A successful snap.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapHit {
    /// World-space snap location.
    pub location: Point3,
    /// World-space unit normal for faces and mesh vertices, unit edge
    /// direction for mesh edges; `None` for other targets.
    pub normal: Option<Vec3>,
    /// What was hit.
    pub element: SnapElement,
    /// Index of the hit element: polygon index for faces (mapped to the
    /// original polygon for plain ray casts), vertex or edge index for
    /// mesh vertices and edges, `None` for other targets.
    pub index: Option<usize>,
    /// Object owning the hit element.
    pub object: ObjectId,
    /// World matrix of that object (or instance).
    pub object_matrix: Transform,
    /// Distance from the ray start to the location.
    pub ray_depth: f64,
    /// Screen distance in pixels to the cursor; zero for ray casts.
    pub dist_px: f64,
}

/// One hit of a collect-all ray cast.
#[derive(Debug, Clone, PartialEq)]
pub struct HitDepth {
    /// Distance from the ray start.
    pub depth: f64,
    /// World-space location.
    pub location: Point3,
    /// World-space unit normal.
    pub normal: Vec3,
    /// Polygon (or edit face) index.
    pub index: usize,
    /// Object hit.
    pub object: ObjectId,
    /// World matrix of that object (or instance).
    pub object_matrix: Transform,
    /// Sequence number of the object within the query.
    pub ob_uuid: u32,
}

/// Sort hits by ascending depth.
pub(crate) fn sort_by_depth(hits: &mut [HitDepth]) {
    hits.sort_by(|a, b| a.depth.total_cmp(&b.depth));
}
