//! Error types for scene construction.

use thiserror::Error;

/// Errors raised while building or editing scene data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// A vertex index is out of range.
    #[error("vertex index {index} out of range ({count} vertices)")]
    VertexOutOfRange {
        /// Offending index.
        index: usize,
        /// Number of vertices.
        count: usize,
    },
    /// An edge index is out of range.
    #[error("edge index {index} out of range ({count} edges)")]
    EdgeOutOfRange {
        /// Offending index.
        index: usize,
        /// Number of edges.
        count: usize,
    },
    /// A face index is out of range.
    #[error("face index {index} out of range ({count} faces)")]
    FaceOutOfRange {
        /// Offending index.
        index: usize,
        /// Number of faces.
        count: usize,
    },
    /// An edge joins a vertex to itself.
    #[error("edge joins vertex {0} to itself")]
    DegenerateEdge(usize),
    /// A polygon has fewer than three corners.
    #[error("polygon {0} has fewer than three corners")]
    DegeneratePolygon(usize),
    /// An original-index table does not match the polygon count.
    #[error("original index table has {got} entries, expected {expected}")]
    OrigIndexLength {
        /// Polygon count.
        expected: usize,
        /// Table length.
        got: usize,
    },
    /// The object does not exist in the scene.
    #[error("unknown object")]
    UnknownObject,
    /// A viewport could not be built.
    #[error("invalid view: {0}")]
    InvalidView(&'static str),
    /// The object is not a mesh object.
    #[error("object {0:?} is not a mesh")]
    NotAMesh(String),
}

/// Result type for scene operations.
pub type Result<T> = std::result::Result<T, SceneError>;
