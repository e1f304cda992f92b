//! Pairwise alignment of corresponded point sets

use nalgebra::{Matrix3, Rotation3, UnitQuaternion};
use shapealign_core::{centroid, Error, Point3d, Result, SimilarityTransform, Vector3d};

/// Spread below which a point set is treated as collapsed to a single point
const DEGENERATE_SPREAD: f64 = 1e-300;

/// Pairwise alignment primitive consumed by Procrustes analysis.
///
/// `align` maps `source` onto `target` (same length, vertex `i` corresponds
/// to vertex `i`) and returns the transformed source. Implementations must be
/// pure: the same inputs give the same output.
pub trait Aligner {
    fn align(&self, source: &[Point3d], target: &[Point3d]) -> Result<Vec<Point3d>>;
}

impl<F> Aligner for F
where
    F: Fn(&[Point3d], &[Point3d]) -> Result<Vec<Point3d>>,
{
    fn align(&self, source: &[Point3d], target: &[Point3d]) -> Result<Vec<Point3d>> {
        self(source, target)
    }
}

/// SVD based best-fit alignment (Kabsch, or Umeyama when scaling is enabled)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KabschAligner {
    /// Also fit a uniform scale factor
    pub scaling: bool,
}

impl KabschAligner {
    /// Rotation and translation only
    pub fn rigid() -> Self {
        Self { scaling: false }
    }

    /// Rotation, translation and uniform scale
    pub fn similarity() -> Self {
        Self { scaling: true }
    }

    /// Estimate the transform that best maps `source` onto `target` in the
    /// least-squares sense.
    ///
    /// # Arguments
    /// * `source` - Points to be transformed
    /// * `target` - Corresponding points to align to
    ///
    /// # Returns
    /// * `Result<SimilarityTransform>` - Transform with a proper rotation (det = +1)
    pub fn estimate(&self, source: &[Point3d], target: &[Point3d]) -> Result<SimilarityTransform> {
        if source.is_empty() || target.is_empty() {
            return Err(Error::EmptyShape);
        }
        if source.len() != target.len() {
            return Err(Error::InvalidData(format!(
                "point sets must have equal length: {} vs {}",
                source.len(),
                target.len()
            )));
        }

        let source_centroid = centroid(source).coords;
        let target_centroid = centroid(target).coords;

        // Covariance H = sum(p * q^T) of the centered sets
        let mut h = Matrix3::zeros();
        let mut source_spread = 0.0;
        for (src, tgt) in source.iter().zip(target.iter()) {
            let p = src.coords - source_centroid;
            let q = tgt.coords - target_centroid;
            h += p * q.transpose();
            source_spread += p.norm_squared();
        }

        let svd = h.svd(true, true);
        let u = svd.u.ok_or(Error::SvdFailed)?;
        let v_t = svd.v_t.ok_or(Error::SvdFailed)?;
        let singular_values = svd.singular_values;

        let mut v = v_t.transpose();
        let mut rotation_matrix = v * u.transpose();

        // Ensure proper rotation (det(R) = 1) by flipping the axis of the
        // smallest singular value
        let mut signs = Vector3d::repeat(1.0);
        if rotation_matrix.determinant() < 0.0 {
            let k = singular_values.imin();
            signs[k] = -1.0;
            for i in 0..3 {
                v[(i, k)] = -v[(i, k)];
            }
            rotation_matrix = v * u.transpose();
        }

        let rotation =
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation_matrix));

        let scale = if self.scaling {
            if source_spread <= DEGENERATE_SPREAD {
                return Err(Error::Degenerate(
                    "source points coincide, scale is undefined".to_string(),
                ));
            }
            singular_values.dot(&signs) / source_spread
        } else {
            1.0
        };

        let translation = target_centroid - scale * (rotation * source_centroid);

        Ok(SimilarityTransform::new(rotation, translation, scale))
    }
}

impl Aligner for KabschAligner {
    fn align(&self, source: &[Point3d], target: &[Point3d]) -> Result<Vec<Point3d>> {
        let transform = self.estimate(source, target)?;
        Ok(transform.transform_points(source))
    }
}

/// Root-mean-square deviation between two corresponded point sets
pub fn rmsd(a: &[Point3d], b: &[Point3d]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::InvalidData(format!(
            "point sets must have equal length: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    if a.is_empty() {
        return Ok(0.0);
    }

    let sum_squared: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(p, q)| (p - q).norm_squared())
        .sum();

    Ok((sum_squared / a.len() as f64).sqrt())
}
