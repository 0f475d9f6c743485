//! Surface normal estimation for point clouds.
//!
//! Normals are estimated per point with PCA over the k nearest neighbors:
//! the normal is the eigenvector of the neighborhood covariance matrix with
//! the smallest eigenvalue, oriented toward the cloud's view point to match
//! the single-view sensor model the search assumes.

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};
use rayon::prelude::*;

use super::{CloudPoint, PointCloud};
use crate::error::{GraspError, GraspResult};

/// Spatial index over cloud point positions; the tree item is the point's
/// index in the cloud.
///
/// Structured scans put whole faces of points onto shared axis coordinates
/// (tabletops, box walls). The immutable tree accepts those; kiddo's
/// bucketed mutable tree cannot split a bucket of coincident coordinates
/// and panics on such clouds.
pub(crate) type CloudKdTree = ImmutableKdTree<f64, 3>;

/// Builds the spatial index for a cloud.
pub(crate) fn build_kdtree(points: &[CloudPoint]) -> CloudKdTree {
    let coords: Vec<[f64; 3]> = points
        .iter()
        .map(|p| [p.position.x, p.position.y, p.position.z])
        .collect();
    ImmutableKdTree::new_from_slice(&coords)
}

impl PointCloud {
    /// Estimates normals for all points using PCA on `k` nearest neighbors,
    /// parallelized across points.
    ///
    /// `num_threads` sizes the worker pool; 0 uses the process-wide default.
    /// Estimated normals are oriented toward [`PointCloud::view_point`].
    ///
    /// # Errors
    ///
    /// Returns an error if the cloud has fewer than 3 points or `k` is 0.
    ///
    /// # Example
    ///
    /// ```
    /// use grasp_candidates::cloud::PointCloud;
    /// use nalgebra::Point3;
    ///
    /// let positions: Vec<_> = (0..20)
    ///     .flat_map(|i| (0..20).map(move |j| {
    ///         Point3::new(f64::from(i) * 0.01, f64::from(j) * 0.01, 0.0)
    ///     }))
    ///     .collect();
    /// let mut cloud = PointCloud::from_positions(&positions);
    /// cloud.view_point = Point3::new(0.0, 0.0, 1.0);
    ///
    /// cloud.estimate_normals(10, 1).unwrap();
    /// assert!(cloud.has_normals());
    /// ```
    pub fn estimate_normals(&mut self, k: usize, num_threads: usize) -> GraspResult<()> {
        if self.points.len() < 3 {
            return Err(GraspError::InsufficientPoints {
                required: 3,
                actual: self.points.len(),
            });
        }
        if k == 0 {
            return Err(GraspError::InvalidParameter {
                reason: "k must be greater than 0".to_string(),
            });
        }

        let kdtree = build_kdtree(&self.points);
        let view_point = self.view_point;
        let points = &self.points;

        let estimate_all = || {
            (0..points.len())
                .into_par_iter()
                .map(|i| neighborhood_normal(i, points, &kdtree, k, &view_point))
                .collect::<Vec<Vector3<f64>>>()
        };

        let normals = if num_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build()
                .map_err(|e| GraspError::InvalidParameter {
                    reason: format!("failed to build thread pool: {e}"),
                })?;
            pool.install(estimate_all)
        } else {
            estimate_all()
        };

        for (point, normal) in self.points.iter_mut().zip(normals) {
            point.normal = Some(normal);
        }

        Ok(())
    }
}

/// PCA normal for one point, oriented toward the sensor.
fn neighborhood_normal(
    index: usize,
    points: &[CloudPoint],
    kdtree: &CloudKdTree,
    k: usize,
    view_point: &Point3<f64>,
) -> Vector3<f64> {
    let position = points[index].position;
    let k = std::num::NonZero::new(k).expect("k must be greater than 0");
    let neighbors =
        kdtree.nearest_n::<SquaredEuclidean>(&[position.x, position.y, position.z], k);

    // First and second moments of the neighborhood, accumulated relative to
    // the query point so small variances survive the subtraction below.
    let mut sum = Vector3::zeros();
    let mut outer = Matrix3::zeros();
    for n in &neighbors {
        let offset = points[n.item as usize].position - position;
        sum += offset;
        outer += offset * offset.transpose();
    }

    let normal = if neighbors.len() < 3 {
        Vector3::z()
    } else {
        #[allow(clippy::cast_precision_loss)]
        let count = neighbors.len() as f64;
        let mean = sum / count;
        let covariance = outer / count - mean * mean.transpose();
        smallest_eigenvector(&covariance).unwrap_or_else(Vector3::z)
    };

    // Orient toward the sensor.
    if normal.dot(&(view_point - position)) < 0.0 {
        -normal
    } else {
        normal
    }
}

/// Unit eigenvector for the smallest eigenvalue, or `None` when the
/// decomposition degenerates.
fn smallest_eigenvector(matrix: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let eigen = SymmetricEigen::new(*matrix);
    let min_idx = (0..3).min_by(|&a, &b| {
        eigen.eigenvalues[a]
            .partial_cmp(&eigen.eigenvalues[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;
    let axis: Vector3<f64> = eigen.eigenvectors.column(min_idx).into();
    let norm = axis.norm();
    (norm > 1e-10).then(|| axis / norm)
}
