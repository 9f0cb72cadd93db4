#![warn(missing_docs)]

//! Scene model read by the vcad snapping kernel.
//!
//! Objects with their matrices and data (meshes, edit cages, curves,
//! armatures, empties, tracked cameras), the bases that place them in a
//! scene, and the 3D viewport snapping happens in.
//!
//! # Architecture
//!
//! - [`Scene`] - owned scene; implements [`SnapScene`]
//! - [`SnapScene`] - read interface snap queries take
//! - [`Mesh`] / [`EditMesh`] - evaluated mesh and its edit cage
//! - [`View3d`] - camera, projection and clipping of a viewport

pub mod armature;
pub mod curve;
pub mod edit_mesh;
pub mod error;
pub mod mesh;
pub mod object;
pub mod scene;
pub mod tracking;
pub mod view;

pub use armature::{Armature, EditBone, PoseChannel};
pub use curve::{BPoint, BezTriple, Curve, HandleType, Nurb};
pub use edit_mesh::{EditEdge, EditFace, EditLoopTri, EditMesh, EditVert};
pub use error::{Result, SceneError};
pub use mesh::{LoopTri, Mesh, MeshEdge, MeshLoop, MeshPoly, MeshVert};
pub use object::{Base, BaseFlags, DrawType, DupliInstance, Object, ObjectData, ObjectMode};
pub use scene::{Scene, SnapScene};
pub use tracking::{MovieTracking, TrackingObject, TrackingTrack};
pub use view::View3d;

slotmap::new_key_type! {
    /// Handle of an object in a scene.
    pub struct ObjectId;
    /// Handle of mesh data in a scene.
    pub struct MeshId;
}
