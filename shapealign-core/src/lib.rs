//! Core data structures and traits for shapealign
//!
//! This crate provides the fundamental types used by Procrustes analysis:
//! double precision points, meshes, point clouds, similarity transforms and
//! the `VertexBuffer` trait through which shapes are read and updated.

pub mod point;
pub mod point_cloud;
pub mod mesh;
pub mod traits;
pub mod transform;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use mesh::*;
pub use traits::*;
pub use transform::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Isometry3, Matrix4, UnitQuaternion};
