//! Curve objects: knots and, while editing, handles.

use vcad_kernel_math::Point3;
use vcad_kernel_scene::{BezTriple, Curve, HandleType, Nurb};

use super::{snap_points, SnapState, SnapTarget};
use crate::snap_data::SnapData;

pub(super) fn snap_curve(
    snap: &SnapData,
    target: &SnapTarget<'_>,
    cu: &Curve,
    state: &mut SnapState,
) -> bool {
    let mut points = Vec::new();
    match (&cu.edit_nurbs, target.use_edit) {
        (Some(nurbs), true) => {
            for nu in nurbs {
                edit_points(nu, &mut points);
            }
        }
        _ => {
            // splines shorter than two knots are not drawn
            for nu in cu.nurbs.iter().filter(|nu| nu.len() > 1) {
                match nu {
                    Nurb::Bezier(bezts) => points.extend(bezts.iter().map(|b| b.vec[1])),
                    Nurb::Points(bps) => points.extend(bps.iter().map(|bp| bp.co)),
                }
            }
        }
    }
    snap_points(snap, target, target.obmat, points, state)
}

/// Snappable points of a spline being edited. Selected points are the
/// ones moving, so they and hidden ones are left out.
fn edit_points(nu: &Nurb, out: &mut Vec<Point3>) {
    match nu {
        Nurb::Bezier(bezts) => {
            for bezt in bezts {
                if bezt.select[1] || bezt.hide {
                    continue;
                }
                out.push(bezt.vec[1]);
                if handle_free(bezt, 0) {
                    out.push(bezt.vec[0]);
                }
                if handle_free(bezt, 2) {
                    out.push(bezt.vec[2]);
                }
            }
        }
        Nurb::Points(bps) => {
            out.extend(bps.iter().filter(|bp| !bp.select && !bp.hide).map(|bp| bp.co));
        }
    }
}

/// A handle stays put unless it is selected or aligned to the other,
/// selected, handle.
fn handle_free(bezt: &BezTriple, side: usize) -> bool {
    let other = 2 - side;
    let aligned = bezt.handles[side / 2] == HandleType::Aligned;
    !bezt.select[side] && !(aligned && bezt.select[other])
}
