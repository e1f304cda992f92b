//! Generalized Procrustes analysis
//!
//! Jointly aligns a collection of corresponded shapes to their mean. Each
//! iteration aligns every shape to the current reference with an [`Aligner`]
//! and then replaces the reference with the vertex-wise mean of the aligned
//! shapes, until the reference stops moving or the iteration cap is reached.

use crate::alignment::Aligner;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use shapealign_core::{translated, Error, Point3d, Result, Vector3d, VertexBuffer};

/// Reference movement (L2 norm over all coordinates) at which GPA stops
pub const DEFAULT_TOLERANCE: f64 = 1e-11;

/// Maximum number of GPA iterations
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Convergence settings for Procrustes analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcrustesConfig {
    /// Stop once the reference moves by at most this distance in one iteration
    pub tolerance: f64,
    /// Upper bound on iterations; reaching it is not an error
    pub max_iterations: usize,
    /// Align shapes on the rayon thread pool
    pub parallel: bool,
}

impl Default for ProcrustesConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            parallel: false,
        }
    }
}

impl ProcrustesConfig {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check that the settings describe a usable stopping rule
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Outcome of a Procrustes analysis run
#[derive(Debug, Clone, PartialEq)]
pub struct ProcrustesResult {
    /// Mean shape after the last iteration
    pub reference: Vec<Point3d>,
    /// Number of iterations performed
    pub iterations: usize,
    /// Whether the reference settled within the tolerance
    pub converged: bool,
    /// Reference movement measured in the last iteration
    pub final_change: f64,
}

/// Generalized Procrustes analysis with the default tolerance and iteration cap.
///
/// **Mutates its inputs**: every shape's vertices are overwritten in place on
/// each iteration with their alignment to the current reference. Nothing is
/// returned; the aligned shapes are the result. Use
/// [`generalized_procrustes_with_config`] to also obtain the mean shape.
///
/// # Arguments
/// * `meshes` - Shapes in vertex correspondence, all with the same vertex count
/// * `aligner` - Pairwise alignment primitive
///
/// # Errors
/// * `EmptyCollection` / `EmptyShape` / `VertexCountMismatch` before anything is modified
/// * any error returned by `aligner`, unchanged; shapes may already be modified
///
/// # Example
/// ```rust
/// use shapealign_algorithms::{generalized_procrustes, KabschAligner};
/// use shapealign_core::Point3d;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let triangle = vec![
///         Point3d::new(0.0, 0.0, 0.0),
///         Point3d::new(1.0, 0.0, 0.0),
///         Point3d::new(0.0, 1.0, 0.0),
///     ];
///     let shifted: Vec<Point3d> = triangle.iter().map(|p| Point3d::new(p.x + 2.0, p.y, p.z)).collect();
///     let mut shapes = vec![triangle, shifted];
///
///     generalized_procrustes(&mut shapes, &KabschAligner::rigid())?;
///     assert!((shapes[0][1] - shapes[1][1]).norm() < 1e-9);
///     Ok(())
/// }
/// ```
pub fn generalized_procrustes<M, A>(meshes: &mut [M], aligner: &A) -> Result<()>
where
    M: VertexBuffer + Send,
    A: Aligner + Sync,
{
    generalized_procrustes_with_config(meshes, aligner, &ProcrustesConfig::default()).map(|_| ())
}

/// Generalized Procrustes analysis with explicit convergence settings.
///
/// Same in-place contract as [`generalized_procrustes`]; additionally returns
/// the mean shape and convergence information. Hitting `max_iterations` is
/// reported through `converged == false`, not as an error.
pub fn generalized_procrustes_with_config<M, A>(
    meshes: &mut [M],
    aligner: &A,
    config: &ProcrustesConfig,
) -> Result<ProcrustesResult>
where
    M: VertexBuffer + Send,
    A: Aligner + Sync,
{
    config.validate()?;
    let vertex_count = check_correspondence(meshes)?;
    // zero-vertex shapes are rejected outright instead of trivially "converging"
    if vertex_count == 0 {
        return Err(Error::EmptyShape);
    }

    let mut reference = meshes[0].vertices().to_vec();
    // Offset sentinel so the first check always runs an iteration
    let mut previous = translated(&reference, &Vector3d::repeat(1.0));
    let mut change = shape_distance(&reference, &previous);
    let mut iterations = 0;

    while change > config.tolerance && iterations < config.max_iterations {
        iterations += 1;
        previous = reference;

        align_all(meshes, aligner, &previous, config.parallel)?;

        reference = accumulate_mean(meshes, vertex_count);
        change = shape_distance(&reference, &previous);

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "GPA iteration {}: reference change {:.3e}, residual {:.3e}",
                iterations,
                change,
                residual_unchecked(meshes, &reference)
            );
        }
    }

    let converged = change <= config.tolerance;
    if converged {
        log::debug!("GPA converged after {} iterations", iterations);
    } else {
        log::debug!(
            "GPA stopped after {} iterations without converging (change {:.3e})",
            iterations,
            change
        );
    }

    Ok(ProcrustesResult {
        reference,
        iterations,
        converged,
        final_change: change,
    })
}

/// Align every shape onto `reference`, in collection order or on the thread pool.
///
/// All writes are complete when this returns.
fn align_all<M, A>(meshes: &mut [M], aligner: &A, reference: &[Point3d], parallel: bool) -> Result<()>
where
    M: VertexBuffer + Send,
    A: Aligner + Sync,
{
    if parallel {
        let outcomes: Vec<Result<()>> = meshes
            .par_iter_mut()
            .enumerate()
            .map(|(index, mesh)| align_one(index, mesh, aligner, reference))
            .collect();
        outcomes.into_iter().collect()
    } else {
        meshes
            .iter_mut()
            .enumerate()
            .try_for_each(|(index, mesh)| align_one(index, mesh, aligner, reference))
    }
}

fn align_one<M, A>(index: usize, mesh: &mut M, aligner: &A, reference: &[Point3d]) -> Result<()>
where
    M: VertexBuffer,
    A: Aligner,
{
    let aligned = aligner.align(mesh.vertices(), reference)?;
    if aligned.len() != reference.len() {
        return Err(Error::InvalidData(format!(
            "aligner returned {} vertices for mesh {}, expected {}",
            aligned.len(),
            index,
            reference.len()
        )));
    }
    mesh.set_vertices(aligned);
    Ok(())
}

/// Verify the collection is non-empty and every shape has mesh 0's vertex count
fn check_correspondence<M: VertexBuffer>(meshes: &[M]) -> Result<usize> {
    let first = meshes.first().ok_or(Error::EmptyCollection)?;
    let expected = first.vertex_count();

    for (index, mesh) in meshes.iter().enumerate().skip(1) {
        let found = mesh.vertex_count();
        if found != expected {
            return Err(Error::VertexCountMismatch {
                index,
                expected,
                found,
            });
        }
    }

    Ok(expected)
}

fn accumulate_mean<M: VertexBuffer>(meshes: &[M], vertex_count: usize) -> Vec<Point3d> {
    let mut sums = vec![Vector3d::zeros(); vertex_count];
    for mesh in meshes {
        for (sum, vertex) in sums.iter_mut().zip(mesh.vertices()) {
            *sum += vertex.coords;
        }
    }

    let n = meshes.len() as f64;
    sums.into_iter().map(|sum| Point3d::from(sum / n)).collect()
}

fn residual_unchecked<M: VertexBuffer>(meshes: &[M], reference: &[Point3d]) -> f64 {
    let count = meshes.len() * reference.len();
    if count == 0 {
        return 0.0;
    }

    let total: f64 = meshes
        .iter()
        .flat_map(|mesh| mesh.vertices().iter().zip(reference))
        .map(|(vertex, target)| (vertex - target).norm_squared())
        .sum();

    total / count as f64
}

/// Vertex-wise arithmetic mean of corresponded shapes
pub fn mean_shape<M: VertexBuffer>(meshes: &[M]) -> Result<Vec<Point3d>> {
    let vertex_count = check_correspondence(meshes)?;
    Ok(accumulate_mean(meshes, vertex_count))
}

/// L2 norm of the flattened difference between two shapes.
///
/// Only the common prefix is compared when lengths differ.
pub fn shape_distance(a: &[Point3d], b: &[Point3d]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(p, q)| (p - q).norm_squared())
        .sum::<f64>()
        .sqrt()
}

/// Mean squared vertex distance of all shapes to `reference`
pub fn procrustes_residual<M: VertexBuffer>(meshes: &[M], reference: &[Point3d]) -> Result<f64> {
    let vertex_count = check_correspondence(meshes)?;
    if vertex_count != reference.len() {
        return Err(Error::InvalidData(format!(
            "reference has {} vertices, shapes have {}",
            reference.len(),
            vertex_count
        )));
    }
    Ok(residual_unchecked(meshes, reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::KabschAligner;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn triangle() -> Vec<Point3d> {
        vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
        ]
    }

    fn identity_aligner(source: &[Point3d], _target: &[Point3d]) -> Result<Vec<Point3d>> {
        Ok(source.to_vec())
    }

    #[test]
    fn test_default_config() {
        let config = ProcrustesConfig::default();
        assert_eq!(config.tolerance, 1e-11);
        assert_eq!(config.max_iterations, 1000);
        assert!(!config.parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(ProcrustesConfig::default().with_tolerance(-1.0).validate().is_err());
        assert!(ProcrustesConfig::default().with_tolerance(f64::NAN).validate().is_err());
        assert!(ProcrustesConfig::default().with_tolerance(0.0).validate().is_ok());
    }

    #[test]
    fn test_mean_shape() {
        let shapes = vec![
            triangle(),
            translated(&triangle(), &Vector3d::new(2.0, 0.0, 0.0)),
        ];
        let mean = mean_shape(&shapes).unwrap();
        assert_relative_eq!(mean[0], Point3d::new(1.0, 0.0, 0.0));
        assert_relative_eq!(mean[2], Point3d::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_mean_shape_rejects_bad_input() {
        let empty: Vec<Vec<Point3d>> = Vec::new();
        assert_eq!(mean_shape(&empty), Err(Error::EmptyCollection));

        let mut longer = triangle();
        longer.push(Point3d::new(1.0, 1.0, 0.0));
        assert_eq!(
            mean_shape(&[triangle(), longer]),
            Err(Error::VertexCountMismatch {
                index: 1,
                expected: 3,
                found: 4
            })
        );
    }

    #[test]
    fn test_shape_distance() {
        let a = triangle();
        let b = translated(&a, &Vector3d::repeat(1.0));
        assert_relative_eq!(shape_distance(&a, &b), 3.0);
        assert_eq!(shape_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_residual() {
        let shapes = vec![triangle(), translated(&triangle(), &Vector3d::new(0.0, 0.0, 2.0))];
        let reference = mean_shape(&shapes).unwrap();
        assert_relative_eq!(procrustes_residual(&shapes, &reference).unwrap(), 1.0);
        assert!(procrustes_residual(&shapes, &reference[..2]).is_err());
    }

    #[test]
    fn test_identical_shapes_stop_after_one_iteration() {
        let mut shapes = vec![triangle(), triangle(), triangle()];
        let result = generalized_procrustes_with_config(
            &mut shapes,
            &identity_aligner,
            &ProcrustesConfig::default(),
        )
        .unwrap();

        assert_eq!(result.iterations, 1);
        assert!(result.converged);
        assert_eq!(result.reference, triangle());
        assert_eq!(shapes[2], triangle());
    }

    #[test]
    fn test_iteration_cap_override() {
        let calls = AtomicUsize::new(0);
        let drifting = |source: &[Point3d], _target: &[Point3d]| -> Result<Vec<Point3d>> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(translated(source, &Vector3d::new(1e-3, 0.0, 0.0)))
        };

        let mut shapes = vec![triangle(), triangle()];
        let config = ProcrustesConfig::default().with_max_iterations(2);
        let result = generalized_procrustes_with_config(&mut shapes, &drifting, &config).unwrap();

        assert_eq!(result.iterations, 2);
        assert!(!result.converged);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_relative_eq!(shapes[0][0], Point3d::new(2e-3, 0.0, 0.0), epsilon = 1e-15);
    }

    #[test]
    fn test_zero_iterations_leaves_shapes_untouched() {
        let mut shapes = vec![triangle(), translated(&triangle(), &Vector3d::x())];
        let config = ProcrustesConfig::default().with_max_iterations(0);
        let result =
            generalized_procrustes_with_config(&mut shapes, &KabschAligner::rigid(), &config).unwrap();

        assert_eq!(result.iterations, 0);
        assert!(!result.converged);
        assert_eq!(result.reference, triangle());
        assert_eq!(shapes[1], translated(&triangle(), &Vector3d::x()));
    }

    #[test]
    fn test_aligner_error_propagates() {
        let failing = |_source: &[Point3d], _target: &[Point3d]| -> Result<Vec<Point3d>> {
            Err(Error::Algorithm("singular configuration".to_string()))
        };
        let mut shapes = vec![triangle(), triangle()];
        assert_eq!(
            generalized_procrustes(&mut shapes, &failing),
            Err(Error::Algorithm("singular configuration".to_string()))
        );
    }

    #[test]
    fn test_aligner_output_length_checked() {
        let truncating = |source: &[Point3d], _target: &[Point3d]| -> Result<Vec<Point3d>> {
            Ok(source[..1].to_vec())
        };
        let mut shapes = vec![triangle(), triangle()];
        assert!(matches!(
            generalized_procrustes(&mut shapes, &truncating),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_empty_shapes_rejected() {
        let mut shapes: Vec<Vec<Point3d>> = vec![Vec::new(), Vec::new()];
        assert_eq!(
            generalized_procrustes(&mut shapes, &KabschAligner::rigid()),
            Err(Error::EmptyShape)
        );
    }
}
