//! 3D similarity transformation utilities

use crate::point::*;
use nalgebra::{Isometry3, Matrix4, UnitQuaternion};
use serde::{Deserialize, Serialize};

/// A similarity transform `p -> scale * (rotation * p) + translation`.
///
/// With `scale == 1.0` this is a rigid motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTransform {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3d,
    pub scale: f64,
}

impl SimilarityTransform {
    /// Create a transform from its parts
    pub fn new(rotation: UnitQuaternion<f64>, translation: Vector3d, scale: f64) -> Self {
        Self {
            rotation,
            translation,
            scale,
        }
    }

    /// Create an identity transformation
    pub fn identity() -> Self {
        Self::new(UnitQuaternion::identity(), Vector3d::zeros(), 1.0)
    }

    /// Create a translation transformation
    pub fn from_translation(translation: Vector3d) -> Self {
        Self::new(UnitQuaternion::identity(), translation, 1.0)
    }

    /// Create a rotation transformation about the origin
    pub fn from_rotation(rotation: UnitQuaternion<f64>) -> Self {
        Self::new(rotation, Vector3d::zeros(), 1.0)
    }

    /// Apply the transformation to a point
    pub fn transform_point(&self, point: &Point3d) -> Point3d {
        Point3d::from(self.scale * (self.rotation * point.coords) + self.translation)
    }

    /// Apply the transformation to every point of a shape
    pub fn transform_points(&self, points: &[Point3d]) -> Shape {
        points.iter().map(|p| self.transform_point(p)).collect()
    }

    /// Compose this transformation with another (`other` is applied first)
    pub fn compose(self, other: Self) -> Self {
        Self {
            rotation: self.rotation * other.rotation,
            translation: self.scale * (self.rotation * other.translation) + self.translation,
            scale: self.scale * other.scale,
        }
    }

    /// Get the inverse transformation, `None` if the scale is zero
    pub fn inverse(self) -> Option<Self> {
        if self.scale == 0.0 {
            return None;
        }

        let rotation = self.rotation.inverse();
        let scale = 1.0 / self.scale;
        Some(Self {
            rotation,
            translation: -scale * (rotation * self.translation),
            scale,
        })
    }

    /// Homogeneous 4x4 matrix representation
    pub fn to_homogeneous(&self) -> Matrix4<f64> {
        let mut matrix = self.rotation.to_homogeneous();
        matrix.fixed_view_mut::<3, 3>(0, 0).scale_mut(self.scale);
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        matrix
    }

    /// Check if this is approximately the identity transformation
    pub fn is_identity(&self, epsilon: f64) -> bool {
        (self.to_homogeneous() - Matrix4::identity()).norm() < epsilon
    }
}

impl Default for SimilarityTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for SimilarityTransform {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(rhs)
    }
}

impl From<Isometry3<f64>> for SimilarityTransform {
    fn from(isometry: Isometry3<f64>) -> Self {
        Self::new(isometry.rotation, isometry.translation.vector, 1.0)
    }
}
