//! Local reference frame estimation from neighborhood geometry.

use nalgebra::{Matrix3, Rotation3, SymmetricEigen, Vector3};

/// A local reference frame at a sampled point, estimated from the surface
/// normals of its neighborhood.
///
/// The frame is derived from the eigen-decomposition of the normals'
/// outer-product matrix: the normal axis is the direction the neighborhood
/// normals agree on most (largest eigenvalue), the curvature axis the
/// direction they vary least along (smallest eigenvalue, e.g. the axis of a
/// cylinder), and the binormal completes the right-handed triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    /// Average surface normal direction, oriented toward the sensor.
    pub normal: Vector3<f64>,

    /// Minor principal curvature axis.
    pub curvature_axis: Vector3<f64>,

    /// `curvature_axis x normal`.
    pub binormal: Vector3<f64>,
}

impl LocalFrame {
    /// Estimates a frame from neighborhood normals.
    ///
    /// `view_direction` points from the sample toward the sensor and fixes
    /// the sign of the normal axis; when it is ambiguous (perpendicular to
    /// the estimated normal) the mean neighborhood normal decides instead.
    ///
    /// Returns `None` when no normals are available or the decomposition
    /// degenerates.
    #[must_use]
    pub fn estimate(normals: &[Vector3<f64>], view_direction: &Vector3<f64>) -> Option<Self> {
        if normals.is_empty() {
            return None;
        }

        let mut outer = Matrix3::zeros();
        let mut mean = Vector3::zeros();
        for n in normals {
            outer += n * n.transpose();
            mean += n;
        }

        let eigen = SymmetricEigen::new(outer);
        let eigenvalues = eigen.eigenvalues;
        let eigenvectors = eigen.eigenvectors;

        let (mut min_idx, mut max_idx) = (0, 0);
        for i in 1..3 {
            if eigenvalues[i] < eigenvalues[min_idx] {
                min_idx = i;
            }
            if eigenvalues[i] > eigenvalues[max_idx] {
                max_idx = i;
            }
        }
        if min_idx == max_idx {
            return None;
        }

        let mut normal: Vector3<f64> = eigenvectors.column(max_idx).into();
        let curvature_axis: Vector3<f64> = eigenvectors.column(min_idx).into();
        if normal.norm() < 1e-10 {
            return None;
        }

        let view_alignment = normal.dot(view_direction);
        let sign = if view_alignment.abs() > 1e-10 {
            view_alignment
        } else {
            normal.dot(&mean)
        };
        if sign < 0.0 {
            normal = -normal;
        }

        let binormal = curvature_axis.cross(&normal);
        if binormal.norm() < 1e-10 {
            return None;
        }

        Some(Self {
            normal,
            curvature_axis,
            binormal,
        })
    }

    /// The base hand orientation for this frame: approach into the surface
    /// (`-normal`), fingers closing along `-binormal`, hand axis along the
    /// curvature axis.
    #[must_use]
    pub fn hand_orientation(&self) -> Rotation3<f64> {
        let matrix = Matrix3::from_columns(&[-self.normal, -self.binormal, self.curvature_axis]);
        Rotation3::from_matrix_unchecked(matrix)
    }
}
