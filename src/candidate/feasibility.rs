//! Per-pose geometric feasibility tests.
//!
//! All tests run in the hand frame: x is the approach axis (pointing into
//! the surface), y the closing axis, z the hand axis. The sample point is
//! the frame origin, and `bite` is how deep past the sample the fingertips
//! have been inserted. The fingers therefore span `x in [bite - depth, bite]`
//! and the palm sits behind `x = bite - depth`.

use nalgebra::{Point3, Vector3};

use super::hand_geometry::HandGeometry;

/// Numerical tolerance for box containment tests (1 micrometer).
const EPS: f64 = 1e-6;

/// A neighborhood point expressed in the hand frame.
#[derive(Debug, Clone, Copy)]
pub struct FramePoint {
    /// Position in hand-frame coordinates.
    pub position: Point3<f64>,
    /// Unit surface normal in hand-frame coordinates, when known.
    pub normal: Option<Vector3<f64>>,
}

/// Outcome of evaluating one hand pose at one insertion depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoseFit {
    /// The pose is geometrically feasible.
    Valid {
        /// Finger opening distance implied by the enclosed material.
        grasp_width: f64,
        /// Center of the enclosed material along the closing axis; the hand
        /// is re-centered here so both fingers close symmetrically onto it.
        closing_center: f64,
    },
    /// No material inside the closing region at this depth.
    NoMaterial,
    /// The implied opening violates `finger_width < width <= outer_diameter`.
    WidthOutOfRange {
        /// The rejected width.
        width: f64,
    },
    /// A cloud point intersects the volume swept by the fingers or the palm.
    Collision,
    /// Too few viable antipodal contacts on one or both sides.
    NoContacts,
}

impl PoseFit {
    /// Returns true for [`PoseFit::Valid`].
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

/// Tunables of the antipodal closing-region test.
#[derive(Debug, Clone, Copy)]
pub struct ContactParams {
    /// Cosine of the maximum angle between a contact normal and the closing
    /// axis for the contact to count as viable.
    pub cos_cone: f64,
    /// Minimum number of viable contacts required on each side of the
    /// closing center.
    pub min_viable: usize,
}

/// Evaluates one hand pose at insertion depth `bite`.
///
/// The hand is inserted fully open and the fingers then sweep inward until
/// they rest against the enclosed material. The tests, in order:
/// 1. points outside the height slab `|z| <= height / 2` are ignored;
/// 2. any slab point behind the palm plane within the hand's outer
///    diameter is a collision;
/// 3. any slab point in the finger band whose closing-axis offset falls
///    inside the open fingers' sweep annulus (between the maximum aperture
///    and the hand's outer radius) is a collision;
/// 4. the material between the open fingers determines the grasp width,
///    which must satisfy `finger_width < width <= outer_diameter`;
/// 5. each side of the closing center must hold enough contact points whose
///    normals face that side's finger; two walls whose normals point the
///    same way along the closing axis are not antipodal.
#[must_use]
pub fn evaluate_pose(
    points: &[FramePoint],
    geometry: &HandGeometry,
    bite: f64,
    contact: &ContactParams,
) -> PoseFit {
    let half_height = geometry.height * 0.5;
    let half_outer = geometry.outer_diameter * 0.5;
    let half_aperture = geometry.aperture() * 0.5;
    let bottom = bite - geometry.depth;

    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for p in points {
        let q = p.position;
        if q.z.abs() > half_height + EPS {
            continue;
        }
        if q.x < bottom - EPS {
            // Behind the palm plane.
            if q.y.abs() <= half_outer + EPS {
                return PoseFit::Collision;
            }
            continue;
        }
        if q.x > bite + EPS {
            // Deeper than the fingertips reach.
            continue;
        }
        let offset = q.y.abs();
        if offset > half_aperture + EPS {
            if offset <= half_outer + EPS {
                // Inside the open fingers' sweep annulus.
                return PoseFit::Collision;
            }
            continue;
        }
        y_min = y_min.min(q.y);
        y_max = y_max.max(q.y);
    }

    if y_max < y_min {
        return PoseFit::NoMaterial;
    }

    let width = y_max - y_min;
    if width <= geometry.finger_width || width > geometry.outer_diameter + EPS {
        return PoseFit::WidthOutOfRange { width };
    }

    let closing_center = 0.5 * (y_min + y_max);

    // A finger closes onto a surface that faces it, so the contact normal on
    // each side must point from the closing center toward that side's
    // finger. Estimated normals follow the sensor view, which can flip a
    // whole neighborhood at once; a flip that stays consistent across both
    // sides counts the same way.
    let mut outward = [0_usize; 2];
    let mut inward = [0_usize; 2];

    for p in points {
        let q = p.position;
        if q.z.abs() > half_height + EPS
            || q.x < bottom - EPS
            || q.x > bite + EPS
            || q.y.abs() > half_aperture + EPS
        {
            continue;
        }
        if let Some(n) = p.normal {
            let side = usize::from(q.y >= closing_center);
            let aligned = if side == 1 { n.y } else { -n.y };
            if aligned >= contact.cos_cone {
                outward[side] += 1;
            } else if aligned <= -contact.cos_cone {
                inward[side] += 1;
            }
        }
    }

    let antipodal = (outward[0] >= contact.min_viable && outward[1] >= contact.min_viable)
        || (inward[0] >= contact.min_viable && inward[1] >= contact.min_viable);
    if !antipodal {
        return PoseFit::NoContacts;
    }

    PoseFit::Valid {
        grasp_width: width,
        closing_center,
    }
}
