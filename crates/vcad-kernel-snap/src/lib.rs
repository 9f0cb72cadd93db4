#![warn(missing_docs)]

//! Interactive snapping for the vcad viewport.
//!
//! Given a cursor position in a 3D viewport (or a bare ray), finds the
//! scene element the cursor should snap to: the vertex or edge projecting
//! closest to the cursor, or the surface under it. Per-object trees are
//! built on first use and cached in a [`SnapObjectContext`] until the
//! geometry changes.
//!
//! # Architecture
//!
//! - [`SnapObjectContext`] - Tree cache and the public queries
//! - [`SnapSettings`] / [`SnapObjectParams`] - Engine tunables and per-query filters
//! - [`SnapHit`] / [`HitDepth`] - Query results
//!
//! # Example
//!
//! ```ignore
//! use vcad_kernel_snap::{SnapMode, SnapObjectContext, SnapObjectParams, RAY_DEPTH_MAX};
//!
//! let mut ctx = SnapObjectContext::new_view3d(view);
//! let mut dist_px = 15.0;
//! let mut ray_depth = RAY_DEPTH_MAX;
//! let hit = ctx.project_view3d(
//!     &scene,
//!     SnapMode::Vertex,
//!     &SnapObjectParams::default(),
//!     &cursor,
//!     &mut dist_px,
//!     &mut ray_depth,
//! );
//! ```

mod cache;
mod context;
mod error;
mod geometry;
mod hit;
mod nearest;
mod object;
mod project;
mod raycast;
mod settings;
mod snap_data;

pub use cache::{EdgeFilter, EditMeshFilters, FaceFilter, VertFilter};
pub use context::{SnapObjectContext, RAY_DEPTH_MAX};
pub use error::{Result, SnapError};
pub use hit::{HitDepth, SnapElement, SnapElements, SnapHit, SnapMode};
pub use settings::{
    SnapObjectParams, SnapSelect, SnapSettings, TreeSettings, OCCLUSION_PLANE_EPSILON,
    ORTHO_RAY_START_CORRECTION,
};
