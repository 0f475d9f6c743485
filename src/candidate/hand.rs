//! A single grasp hypothesis.

use nalgebra::{Point3, UnitQuaternion, Vector3};

/// One hypothesized 6-DoF parallel-jaw hand pose with its opening width.
///
/// The orientation's rotation matrix columns are, in order: the approach
/// axis (pointing from the hand into the surface), the closing axis (the
/// direction the fingers close along), and the hand axis.
///
/// A `Hand` is owned by exactly one container at a time: the [`HandSet`]
/// that produced it, then, if valid, the flattened candidate list it is
/// moved into.
///
/// [`HandSet`]: crate::HandSet
#[derive(Debug, Clone, PartialEq)]
pub struct Hand {
    /// Palm center position (the hand base between the fingers).
    pub position: Point3<f64>,

    /// Hand orientation.
    pub orientation: UnitQuaternion<f64>,

    /// Finger opening distance at the chosen insertion depth.
    pub grasp_width: f64,

    /// Achieved finger insertion depth, in
    /// `[init_bite, max_depth]`.
    pub depth: f64,

    /// The sampled point this hypothesis was generated from.
    pub sample: Point3<f64>,

    /// Index of the sampled point in the source cloud, when the sample came
    /// from the cloud's index set. Back-reference only.
    pub sample_index: Option<usize>,

    /// Whether the hypothesis passed every geometric feasibility test.
    pub is_valid: bool,

    /// Optional confidence assigned by a downstream ranker. Unset here.
    pub score: Option<f64>,
}

impl Hand {
    /// Creates a new hypothesis at the given pose.
    #[must_use]
    pub const fn new(
        position: Point3<f64>,
        orientation: UnitQuaternion<f64>,
        grasp_width: f64,
        depth: f64,
        sample: Point3<f64>,
    ) -> Self {
        Self {
            position,
            orientation,
            grasp_width,
            depth,
            sample,
            sample_index: None,
            is_valid: false,
            score: None,
        }
    }

    /// The approach axis: first column of the rotation matrix.
    #[must_use]
    pub fn approach_axis(&self) -> Vector3<f64> {
        self.orientation.to_rotation_matrix().matrix().column(0).into()
    }

    /// The closing axis (binormal): second column of the rotation matrix.
    #[must_use]
    pub fn closing_axis(&self) -> Vector3<f64> {
        self.orientation.to_rotation_matrix().matrix().column(1).into()
    }

    /// The hand axis: third column of the rotation matrix.
    #[must_use]
    pub fn hand_axis(&self) -> Vector3<f64> {
        self.orientation.to_rotation_matrix().matrix().column(2).into()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_new_hand_defaults() {
        let hand = Hand::new(
            Point3::origin(),
            UnitQuaternion::identity(),
            0.05,
            0.01,
            Point3::origin(),
        );
        assert!(!hand.is_valid);
        assert!(hand.score.is_none());
        assert!(hand.sample_index.is_none());
    }

    #[test]
    fn test_axes_are_rotation_columns() {
        let orientation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        let hand = Hand::new(
            Point3::origin(),
            orientation,
            0.05,
            0.01,
            Point3::origin(),
        );

        // Rotating the frame 90 degrees about z maps x to y.
        let approach = hand.approach_axis();
        assert_relative_eq!(approach.y, 1.0, epsilon = 1e-12);

        let hand_axis = hand.hand_axis();
        assert_relative_eq!(hand_axis.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_axes_form_right_handed_frame() {
        let orientation =
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.7);
        let hand = Hand::new(
            Point3::origin(),
            orientation,
            0.05,
            0.01,
            Point3::origin(),
        );
        let cross = hand.approach_axis().cross(&hand.closing_axis());
        assert_relative_eq!(cross.dot(&hand.hand_axis()), 1.0, epsilon = 1e-12);
    }
}
