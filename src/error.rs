//! Error types for grasp candidate generation.

use std::fmt;

/// Result type for grasp candidate operations.
pub type GraspResult<T> = Result<T, GraspError>;

/// Errors that can occur during grasp candidate generation.
///
/// Expected "no grasp found" outcomes are not errors: they are represented
/// by validity flags and empty collections. These variants cover inputs the
/// pipeline cannot meaningfully operate on at all.
#[derive(Debug)]
pub enum GraspError {
    /// Point cloud is empty.
    EmptyPointCloud,

    /// Not enough points for the requested operation.
    InsufficientPoints {
        /// Minimum number of points required.
        required: usize,
        /// Actual number of points provided.
        actual: usize,
    },

    /// Invalid parameter value.
    InvalidParameter {
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// The cloud has no surface normals where normals are required.
    MissingNormals,
}

impl fmt::Display for GraspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPointCloud => write!(f, "point cloud is empty"),
            Self::InsufficientPoints { required, actual } => {
                write!(
                    f,
                    "insufficient points: need at least {required}, got {actual}"
                )
            }
            Self::InvalidParameter { reason } => write!(f, "invalid parameter: {reason}"),
            Self::MissingNormals => write!(f, "point cloud has no surface normals"),
        }
    }
}

impl std::error::Error for GraspError {}
