//! Physical description of the parallel-jaw hand.

use std::fmt;

use crate::config::ConfigMap;
use crate::error::{GraspError, GraspResult};

/// Immutable geometry of a parallel-jaw robot hand.
///
/// All lengths are in meters. The candidate search sweeps finger insertion
/// depth from [`init_bite`](Self::init_bite) to [`max_depth`](Self::max_depth)
/// in increments of [`deepen_step`](Self::deepen_step).
///
/// # Example
///
/// ```
/// use grasp_candidates::HandGeometry;
///
/// let geometry = HandGeometry::new(0.01, 0.12, 0.06, 0.02, 0.01, 0.05, 0.004);
/// geometry.validate().unwrap();
/// assert!((geometry.aperture() - 0.10).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HandGeometry {
    /// Width of one robot finger.
    pub finger_width: f64,

    /// Width of the hand including both fingers.
    pub outer_diameter: f64,

    /// Hand depth (finger length).
    pub depth: f64,

    /// Hand height; the hand occupies a slab of half this extent on either
    /// side of the hand axis.
    pub height: f64,

    /// Minimum object depth to be covered by the fingers.
    pub init_bite: f64,

    /// Maximum object depth to be covered by the fingers.
    pub max_depth: f64,

    /// Step size of deepening the hand from `init_bite` to `max_depth`.
    pub deepen_step: f64,
}

impl HandGeometry {
    /// Creates a hand geometry from explicit parameters.
    #[must_use]
    pub const fn new(
        finger_width: f64,
        outer_diameter: f64,
        depth: f64,
        height: f64,
        init_bite: f64,
        max_depth: f64,
        deepen_step: f64,
    ) -> Self {
        Self {
            finger_width,
            outer_diameter,
            depth,
            height,
            init_bite,
            max_depth,
            deepen_step,
        }
    }

    /// Creates a hand geometry with the deepening step derived from the
    /// depth range: `(max_depth - init_bite) * 0.1`.
    #[must_use]
    pub fn with_default_step(
        finger_width: f64,
        outer_diameter: f64,
        depth: f64,
        height: f64,
        init_bite: f64,
        max_depth: f64,
    ) -> Self {
        Self::new(
            finger_width,
            outer_diameter,
            depth,
            height,
            init_bite,
            max_depth,
            (max_depth - init_bite) * 0.1,
        )
    }

    /// Reads a hand geometry from a key-value configuration source.
    ///
    /// Missing keys fall back to the documented defaults below rather than
    /// failing; call [`validate`](Self::validate) afterwards to fail loudly
    /// on malformed values.
    ///
    /// | Key                   | Default |
    /// |-----------------------|---------|
    /// | `finger_width`        | 0.01    |
    /// | `hand_outer_diameter` | 0.12    |
    /// | `hand_depth`          | 0.06    |
    /// | `hand_height`         | 0.02    |
    /// | `init_bite`           | 0.01    |
    /// | `max_depth`           | 0.05    |
    /// | `deepen_step`         | `(max_depth - init_bite) * 0.1` |
    #[must_use]
    pub fn from_config(config: &ConfigMap) -> Self {
        let init_bite = config.get_f64_or("init_bite", 0.01);
        let max_depth = config.get_f64_or("max_depth", 0.05);
        Self {
            finger_width: config.get_f64_or("finger_width", 0.01),
            outer_diameter: config.get_f64_or("hand_outer_diameter", 0.12),
            depth: config.get_f64_or("hand_depth", 0.06),
            height: config.get_f64_or("hand_height", 0.02),
            init_bite,
            max_depth,
            deepen_step: config.get_f64_or("deepen_step", (max_depth - init_bite) * 0.1),
        }
    }

    /// Checks that the geometry is finite, positive where required, and
    /// internally consistent.
    ///
    /// # Errors
    ///
    /// Returns [`GraspError::InvalidParameter`] describing the first
    /// violated constraint.
    pub fn validate(&self) -> GraspResult<()> {
        let fields = [
            ("finger_width", self.finger_width),
            ("hand_outer_diameter", self.outer_diameter),
            ("hand_depth", self.depth),
            ("hand_height", self.height),
            ("init_bite", self.init_bite),
            ("max_depth", self.max_depth),
            ("deepen_step", self.deepen_step),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(GraspError::InvalidParameter {
                    reason: format!("{name} must be finite"),
                });
            }
        }
        if self.finger_width <= 0.0 {
            return Err(GraspError::InvalidParameter {
                reason: "finger_width must be positive".to_string(),
            });
        }
        if self.outer_diameter <= self.finger_width * 2.0 {
            return Err(GraspError::InvalidParameter {
                reason: "hand_outer_diameter must exceed twice finger_width".to_string(),
            });
        }
        if self.depth <= 0.0 {
            return Err(GraspError::InvalidParameter {
                reason: "hand_depth must be positive".to_string(),
            });
        }
        if self.height <= 0.0 {
            return Err(GraspError::InvalidParameter {
                reason: "hand_height must be positive".to_string(),
            });
        }
        if self.init_bite < 0.0 {
            return Err(GraspError::InvalidParameter {
                reason: "init_bite must be non-negative".to_string(),
            });
        }
        if self.max_depth < self.init_bite {
            return Err(GraspError::InvalidParameter {
                reason: "max_depth must be at least init_bite".to_string(),
            });
        }
        if self.deepen_step <= 0.0 {
            return Err(GraspError::InvalidParameter {
                reason: "deepen_step must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Maximum opening between the inner finger faces.
    #[must_use]
    pub fn aperture(&self) -> f64 {
        self.outer_diameter - 2.0 * self.finger_width
    }
}

impl Default for HandGeometry {
    fn default() -> Self {
        Self::from_config(&ConfigMap::new())
    }
}

impl fmt::Display for HandGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "============ HAND GEOMETRY ======================")?;
        writeln!(f, "finger_width: {}", self.finger_width)?;
        writeln!(f, "hand_outer_diameter: {}", self.outer_diameter)?;
        writeln!(f, "hand_depth: {}", self.depth)?;
        writeln!(f, "hand_height: {}", self.height)?;
        writeln!(f, "init_bite: {}", self.init_bite)?;
        writeln!(f, "max_depth: {}", self.max_depth)?;
        writeln!(f, "deepen_step: {}", self.deepen_step)?;
        writeln!(f, "=================================================")
    }
}
