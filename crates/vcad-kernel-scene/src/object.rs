//! Scene objects, their data and the bases that place them in a scene.

use bitflags::bitflags;
use vcad_kernel_math::Transform;

use crate::armature::Armature;
use crate::curve::Curve;
use crate::tracking::MovieTracking;
use crate::{MeshId, ObjectId};

/// Interaction mode of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectMode {
    /// Plain object mode.
    #[default]
    Object,
    /// Editing the object's data.
    Edit,
    /// Posing an armature.
    Pose,
    /// Editing particles or hair.
    ParticleEdit,
}

/// How an object (or the whole viewport) is drawn; ordered from the
/// least to the most complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DrawType {
    /// Bounding box only.
    Bounds,
    /// Wireframe.
    Wire,
    /// Solid surfaces.
    #[default]
    Solid,
    /// Textured surfaces.
    Textured,
}

/// What an object is.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectData {
    /// A mesh, shared through the scene's mesh table.
    Mesh(MeshId),
    /// A curve.
    Curve(Curve),
    /// An armature.
    Armature(Armature),
    /// An empty (just a transform).
    Empty,
    /// A camera, optionally with tracking data from its clip.
    Camera(Option<MovieTracking>),
}

impl ObjectData {
    /// The mesh this object shows, if it is a mesh object.
    pub fn mesh_id(&self) -> Option<MeshId> {
        match self {
            ObjectData::Mesh(id) => Some(*id),
            _ => None,
        }
    }
}

/// A scene object.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// Display name.
    pub name: String,
    /// Object-to-world matrix.
    pub matrix: Transform,
    /// Object data.
    pub data: ObjectData,
    /// Interaction mode.
    pub mode: ObjectMode,
    /// Maximum draw type.
    pub draw_type: DrawType,
    /// True when the object instances other objects.
    pub duplicator: bool,
}

impl Object {
    /// An object in object mode, drawn solid, at `matrix`.
    pub fn new(name: impl Into<String>, data: ObjectData, matrix: Transform) -> Self {
        Self {
            name: name.into(),
            matrix,
            data,
            mode: ObjectMode::Object,
            draw_type: DrawType::Solid,
            duplicator: false,
        }
    }
}

bitflags! {
    /// Per-base state.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct BaseFlags: u8 {
        /// Visible in the view.
        const VISIBLE = 1 << 0;
        /// Selected.
        const SELECTED = 1 << 1;
        /// Was selected before the current operation started.
        const WAS_SELECTED = 1 << 2;
        /// Data is being re-evaluated and must not be read.
        const RECALC = 1 << 3;
    }
}

/// An object's membership in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Base {
    /// The object.
    pub object: ObjectId,
    /// State bits.
    pub flags: BaseFlags,
}

/// One instance generated by a duplicator.
#[derive(Debug, Clone, PartialEq)]
pub struct DupliInstance {
    /// The instanced object.
    pub object: ObjectId,
    /// World matrix of this instance.
    pub matrix: Transform,
}
