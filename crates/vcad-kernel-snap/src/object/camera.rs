//! Cameras snap to the reconstructed bundles of their motion tracking.

use vcad_kernel_scene::MovieTracking;

use super::{snap_points, SnapState, SnapTarget};
use crate::snap_data::SnapData;

pub(super) fn snap_camera(
    snap: &SnapData,
    target: &SnapTarget<'_>,
    tracking: &MovieTracking,
    state: &mut SnapState,
) -> bool {
    if target.object.duplicator {
        return false;
    }
    let mut found = false;
    for tracking_object in &tracking.objects {
        let bundles = tracking_object.tracks.iter().filter_map(|t| t.bundle);
        if tracking_object.is_camera {
            // camera bundles live in the space of the solved camera
            found |= snap_points(snap, target, &tracking.camera_object_matrix, bundles, state);
        } else {
            // object bundles are relative to the reconstructed camera
            let Some(rimat) = tracking_object.reconstructed.inverse() else {
                continue;
            };
            let obmat = target.obmat.then(&rimat);
            found |= snap_points(snap, target, &obmat, bundles, state);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use vcad_kernel_math::{Point3, Transform, Vec2};
    use vcad_kernel_scene::{Object, ObjectData, ObjectId, TrackingObject, TrackingTrack, View3d};

    use crate::hit::SnapElements;

    fn tracking() -> MovieTracking {
        MovieTracking {
            camera_object_matrix: Transform::translation(1.0, 0.0, 0.0),
            objects: vec![
                TrackingObject {
                    name: "camera".into(),
                    is_camera: true,
                    reconstructed: Transform::identity(),
                    tracks: vec![
                        TrackingTrack {
                            bundle: Some(Point3::origin()),
                        },
                        TrackingTrack { bundle: None },
                    ],
                },
                TrackingObject {
                    name: "prop".into(),
                    is_camera: false,
                    reconstructed: Transform::translation(0.0, 1.0, 0.0),
                    tracks: vec![TrackingTrack {
                        bundle: Some(Point3::new(0.0, 2.0, 0.0)),
                    }],
                },
            ],
        }
    }

    fn snap_to(object: &Object, mval: Vec2) -> Option<Point3> {
        let view =
            View3d::orthographic(Transform::identity(), 2.0, Vec2::new(200.0, 200.0), 1000.0).unwrap();
        let (snap, _) = SnapData::from_view3d(&view, SnapElements::VERTEX, &mval).unwrap();
        let mut ids = SlotMap::<ObjectId, ()>::with_key();
        let target = SnapTarget {
            id: ids.insert(()),
            object,
            obmat: &object.matrix,
            ob_uuid: 0,
            use_edit: false,
        };
        let ObjectData::Camera(Some(tracking)) = &object.data else {
            return None;
        };
        let mut state = SnapState::new(f64::INFINITY, 5.0);
        if !snap_camera(&snap, &target, tracking, &mut state) {
            return None;
        }
        state.best.map(|c| c.location)
    }

    #[test]
    fn test_bundles_in_their_spaces() {
        let camera = Object::new("cam", ObjectData::Camera(Some(tracking())), Transform::identity());
        // camera solve bundle, placed by the solve matrix
        assert_eq!(snap_to(&camera, Vec2::new(150.0, 100.0)), Some(Point3::new(1.0, 0.0, 0.0)));
        // object bundle, relative to its reconstructed camera
        let hit = snap_to(&camera, Vec2::new(100.0, 150.0)).unwrap();
        assert!((hit - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-9);
        assert!(snap_to(&camera, Vec2::new(100.0, 100.0)).is_none());
    }

    #[test]
    fn test_duplicator_camera_is_skipped() {
        let mut camera = Object::new("cam", ObjectData::Camera(Some(tracking())), Transform::identity());
        camera.duplicator = true;
        assert!(snap_to(&camera, Vec2::new(150.0, 100.0)).is_none());
    }
}
