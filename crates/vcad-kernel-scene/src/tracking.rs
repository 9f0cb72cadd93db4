//! Motion-tracking reconstruction attached to camera objects.

use vcad_kernel_math::{Point3, Transform};

/// A tracked feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingTrack {
    /// Reconstructed 3D position, when the solve produced one.
    pub bundle: Option<Point3>,
}

/// A tracked object (the camera itself or a moving object).
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingObject {
    /// Object name.
    pub name: String,
    /// True for the camera's own solve.
    pub is_camera: bool,
    /// Reconstructed camera matrix of this object at the current frame.
    pub reconstructed: Transform,
    /// Tracks belonging to this object.
    pub tracks: Vec<TrackingTrack>,
}

/// Tracking data of a movie clip.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MovieTracking {
    /// Matrix placing camera-solve bundles in the world.
    pub camera_object_matrix: Transform,
    /// Tracked objects.
    pub objects: Vec<TrackingObject>,
}
