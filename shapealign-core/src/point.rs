//! Point types and related functionality

use nalgebra::{Point3, Vector3};

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// An ordered vertex-position array, one point per corresponded vertex
pub type Shape = Vec<Point3d>;

/// Compute the centroid of a set of points.
///
/// Returns the origin for an empty slice.
pub fn centroid(points: &[Point3d]) -> Point3d {
    if points.is_empty() {
        return Point3d::origin();
    }

    let sum = points
        .iter()
        .fold(Vector3d::zeros(), |acc, p| acc + p.coords);
    Point3d::from(sum / points.len() as f64)
}

/// Translate every point by `offset`, returning a new shape
pub fn translated(points: &[Point3d], offset: &Vector3d) -> Shape {
    points.iter().map(|p| p + offset).collect()
}
