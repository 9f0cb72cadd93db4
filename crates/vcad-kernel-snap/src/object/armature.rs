//! Armature objects: bones as segments.

use vcad_kernel_scene::Armature;

use super::{snap_segments, SnapState, SnapTarget};
use crate::snap_data::SnapData;

pub(super) fn snap_armature(
    snap: &SnapData,
    target: &SnapTarget<'_>,
    arm: &Armature,
    state: &mut SnapState,
) -> bool {
    match &arm.edit_bones {
        Some(bones) => {
            // selected ends are moving; hidden bones and other layers are out
            let segments = bones
                .iter()
                .filter(|b| b.layer & arm.layer != 0)
                .filter(|b| !(b.hidden || b.root_selected || b.tip_selected))
                .map(|b| (b.head, b.tail));
            snap_segments(snap, target, segments, state)
        }
        None => {
            let segments = arm
                .pose
                .iter()
                .filter(|p| !(p.hidden || p.group_hidden))
                .map(|p| (p.pose_head, p.pose_tail));
            snap_segments(snap, target, segments, state)
        }
    }
}
