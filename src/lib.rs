//! Grasp candidate generation for parallel-jaw robot hands.
//!
//! This crate searches an oriented 3D point cloud for poses at which a
//! two-finger hand could close on the observed surface. The pipeline:
//!
//! 1. **Preprocess** the cloud: crop to a workspace box, downsample with a
//!    voxel grid, estimate surface normals, and draw a set of sample seeds
//!    ([`CandidatesGenerator::preprocess_point_cloud`]).
//! 2. **Search** around each sample: estimate a local reference frame from
//!    the neighborhood normals, sweep a grid of hand orientations, and deepen
//!    each orientation along its approach axis while it stays feasible
//!    ([`HandSearch::search_hands`]).
//! 3. **Collect** the feasible poses as [`Hand`] candidates, grouped per
//!    sample in [`HandSet`]s or flattened into a list
//!    ([`CandidatesGenerator::generate_grasp_candidates`]).
//!
//! Feasibility of a pose means the hand encloses material between its
//! fingers without colliding with the cloud and the enclosed surface offers
//! antipodal contacts for both fingers.
//!
//! All stages are deterministic: identical inputs, parameters, and seeds
//! produce identical candidates regardless of thread count.
//!
//! # Example
//!
//! ```no_run
//! use grasp_candidates::{
//!     CandidatesGenerator, CandidatesGeneratorParams, ConfigMap, HandSearchParams, PointCloud,
//! };
//! use nalgebra::Point3;
//!
//! let config = ConfigMap::parse_str(
//!     "finger_width = 0.01\n\
//!      hand_outer_diameter = 0.12\n\
//!      num_samples = 100\n\
//!      num_orientations = 8\n",
//! );
//! let generator = CandidatesGenerator::new(
//!     CandidatesGeneratorParams::from_config(&config),
//!     HandSearchParams::from_config(&config),
//! )?;
//!
//! let mut cloud = PointCloud::new();
//! // ... fill the cloud from a sensor ...
//! cloud.view_point = Point3::new(0.0, 0.0, 1.0);
//!
//! generator.preprocess_point_cloud(&mut cloud)?;
//! let candidates = generator.generate_grasp_candidates(&cloud)?;
//! for hand in &candidates {
//!     println!("grasp at {:?} width {}", hand.position, hand.grasp_width);
//! }
//! # Ok::<(), grasp_candidates::GraspError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod candidate;
pub mod cloud;
pub mod config;
pub mod error;

pub use candidate::{
    evaluate_pose, CandidatesGenerator, CandidatesGeneratorParams, ContactParams, FramePoint,
    Hand, HandGeometry, HandSearch, HandSearchParams, HandSet, LocalFrame, PoseFit,
};
pub use cloud::{CloudPoint, PointCloud, PointColor, Workspace};
pub use config::ConfigMap;
pub use error::{GraspError, GraspResult};
