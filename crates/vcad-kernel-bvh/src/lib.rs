#![warn(missing_docs)]

//! Bounding volume hierarchies for the vcad snapping kernel.
//!
//! Trees are built over caller-indexed primitives (vertices, edges or
//! triangles) and queried through callbacks, so the same structure backs
//! ray casting, nearest-point lookups and the projected-distance walk.
//!
//! # Architecture
//!
//! - [`Ray`] - Ray representation with origin and direction
//! - [`bvh`] - Tree construction and queries
//! - [`intersect`] - Primitive tests shared by tree callbacks
//!
//! # Example
//!
//! ```ignore
//! use vcad_kernel_bvh::{Bvh, BvhParams, Ray};
//!
//! let bvh = Bvh::build(items, BvhParams { arity: 4, leaf_size: 1 });
//! let hit = bvh.ray_cast(&ray, f64::INFINITY, |index, ray| test(index, ray));
//! ```

mod ray;
pub mod bvh;
pub mod intersect;

pub use bvh::{Bvh, BvhNode, BvhParams, BvhWalker, Nearest, PrimitiveHit, RayHit};
pub use ray::Ray;
