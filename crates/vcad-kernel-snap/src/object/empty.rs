//! Empties snap to their origin.

use vcad_kernel_math::Point3;

use super::{snap_points, SnapState, SnapTarget};
use crate::snap_data::SnapData;

pub(super) fn snap_empty(snap: &SnapData, target: &SnapTarget<'_>, state: &mut SnapState) -> bool {
    if target.object.duplicator {
        return false;
    }
    snap_points(snap, target, target.obmat, [Point3::origin()], state)
}
