//! Armature bones, in edit and pose form.

use vcad_kernel_math::Point3;

/// A bone as edited in edit mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditBone {
    /// Head position.
    pub head: Point3,
    /// Tail position.
    pub tail: Point3,
    /// Bone layer bits.
    pub layer: u32,
    /// Hidden in edit mode.
    pub hidden: bool,
    /// Head (root) selected.
    pub root_selected: bool,
    /// Tail (tip) selected.
    pub tip_selected: bool,
}

impl EditBone {
    /// A visible unselected bone on layer 1.
    pub fn new(head: Point3, tail: Point3) -> Self {
        Self {
            head,
            tail,
            layer: 1,
            hidden: false,
            root_selected: false,
            tip_selected: false,
        }
    }
}

/// A posed bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseChannel {
    /// Posed head, armature space.
    pub pose_head: Point3,
    /// Posed tail, armature space.
    pub pose_tail: Point3,
    /// Hidden in pose mode.
    pub hidden: bool,
    /// Hidden through its bone group.
    pub group_hidden: bool,
}

impl PoseChannel {
    /// A visible posed bone.
    pub fn new(pose_head: Point3, pose_tail: Point3) -> Self {
        Self {
            pose_head,
            pose_tail,
            hidden: false,
            group_hidden: false,
        }
    }
}

/// Armature object data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Armature {
    /// Visible bone layers.
    pub layer: u32,
    /// Bones being edited; present while the owner is in edit mode.
    pub edit_bones: Option<Vec<EditBone>>,
    /// Posed bones.
    pub pose: Vec<PoseChannel>,
}
