//! # shapealign Algorithms
//!
//! Alignment algorithms for corresponded 3D shapes.
//!
//! This crate provides the pairwise alignment primitive (SVD based Kabsch /
//! Umeyama fitting behind the `Aligner` trait) and generalized Procrustes
//! analysis, which jointly aligns a collection of meshes to their mean shape.

pub mod alignment;
pub mod procrustes;

// Re-export commonly used items
pub use alignment::*;
pub use procrustes::*;
