//! Grasp candidate representation and search.
//!
//! A candidate is a 6-DoF parallel-jaw hand pose with an opening width,
//! generated by sweeping orientations and insertion depths around a local
//! reference frame estimated at each sampled point.

pub mod feasibility;
pub mod generator;
pub mod hand;
pub mod hand_geometry;
pub mod hand_search;
pub mod hand_set;
pub mod local_frame;

pub use feasibility::{evaluate_pose, ContactParams, FramePoint, PoseFit};
pub use generator::{CandidatesGenerator, CandidatesGeneratorParams};
pub use hand::Hand;
pub use hand_geometry::HandGeometry;
pub use hand_search::{HandSearch, HandSearchParams};
pub use hand_set::HandSet;
pub use local_frame::LocalFrame;
