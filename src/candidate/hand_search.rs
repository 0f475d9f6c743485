//! Neighborhood-based search for grasp candidates.
//!
//! For every sampled point the search gathers the spherical neighborhood,
//! estimates a local reference frame from its normals, and sweeps a grid of
//! hand orientations about the configured rotation axes. Each orientation is
//! deepened along the approach axis until the pose stops being feasible; the
//! deepest feasible pose becomes the hypothesis for that orientation.

use std::f64::consts::{FRAC_PI_2, PI};

use kiddo::SquaredEuclidean;
use nalgebra::{Point3, Rotation3, Unit, UnitQuaternion, Vector3};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::feasibility::{evaluate_pose, ContactParams, FramePoint, PoseFit};
use super::hand::Hand;
use super::hand_geometry::HandGeometry;
use super::hand_set::HandSet;
use super::local_frame::LocalFrame;
use crate::cloud::normals::{build_kdtree, CloudKdTree};
use crate::cloud::PointCloud;
use crate::config::ConfigMap;
use crate::error::{GraspError, GraspResult};

/// Tolerance when comparing insertion depths against `max_depth`.
const DEPTH_EPS: f64 = 1e-9;

/// Parameters of the hand search.
///
/// # Example
///
/// ```
/// use grasp_candidates::HandSearchParams;
///
/// let params = HandSearchParams::default()
///     .with_num_orientations(4)
///     .with_nn_radius(0.02);
/// params.validate().unwrap();
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HandSearchParams {
    /// Geometry of the parallel-jaw hand.
    pub hand_geometry: HandGeometry,

    /// Local frame axes (0 = approach, 1 = closing, 2 = hand axis) the
    /// orientation grid rotates about.
    pub hand_axes: Vec<usize>,

    /// Number of orientations tested per rotation axis, spread evenly over
    /// a half turn.
    pub num_orientations: usize,

    /// Radius of the spherical neighborhood around each sample (meters).
    pub nn_radius: f64,

    /// Minimum neighborhood size for a sample to produce hypotheses.
    pub min_neighbors: usize,

    /// Minimum viable contacts required on each side of the closing center.
    pub min_viable_contacts: usize,

    /// Maximum angle (degrees) between a contact normal and the closing axis
    /// for the contact to count as viable.
    pub contact_cone_deg: f64,

    /// Worker pool size; 0 uses the process-wide default.
    pub num_threads: usize,
}

impl Default for HandSearchParams {
    fn default() -> Self {
        Self {
            hand_geometry: HandGeometry::default(),
            hand_axes: vec![2],
            num_orientations: 8,
            nn_radius: 0.01,
            min_neighbors: 20,
            min_viable_contacts: 6,
            contact_cone_deg: 20.0,
            num_threads: 0,
        }
    }
}

impl HandSearchParams {
    /// Sets the hand geometry.
    #[must_use]
    pub fn with_hand_geometry(mut self, hand_geometry: HandGeometry) -> Self {
        self.hand_geometry = hand_geometry;
        self
    }

    /// Sets the rotation axes of the orientation grid.
    #[must_use]
    pub fn with_hand_axes(mut self, hand_axes: Vec<usize>) -> Self {
        self.hand_axes = hand_axes;
        self
    }

    /// Sets the number of orientations per rotation axis.
    #[must_use]
    pub fn with_num_orientations(mut self, num_orientations: usize) -> Self {
        self.num_orientations = num_orientations;
        self
    }

    /// Sets the neighborhood radius.
    #[must_use]
    pub fn with_nn_radius(mut self, nn_radius: f64) -> Self {
        self.nn_radius = nn_radius;
        self
    }

    /// Sets the minimum neighborhood size.
    #[must_use]
    pub fn with_min_neighbors(mut self, min_neighbors: usize) -> Self {
        self.min_neighbors = min_neighbors;
        self
    }

    /// Sets the worker pool size.
    #[must_use]
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Reads search parameters from a key-value configuration source,
    /// falling back to defaults for missing keys.
    #[must_use]
    pub fn from_config(config: &ConfigMap) -> Self {
        let defaults = Self::default();
        Self {
            hand_geometry: HandGeometry::from_config(config),
            hand_axes: config.get_usize_list_or("hand_axes", &defaults.hand_axes),
            num_orientations: config.get_usize_or("num_orientations", defaults.num_orientations),
            nn_radius: config.get_f64_or("nn_radius", defaults.nn_radius),
            min_neighbors: config.get_usize_or("min_neighbors", defaults.min_neighbors),
            min_viable_contacts: config
                .get_usize_or("min_viable_contacts", defaults.min_viable_contacts),
            contact_cone_deg: config.get_f64_or("contact_cone_deg", defaults.contact_cone_deg),
            num_threads: config.get_usize_or("num_threads", defaults.num_threads),
        }
    }

    /// Checks the parameters for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`GraspError::InvalidParameter`] describing the first
    /// violated constraint.
    pub fn validate(&self) -> GraspResult<()> {
        self.hand_geometry.validate()?;
        if self.hand_axes.is_empty() {
            return Err(GraspError::InvalidParameter {
                reason: "hand_axes must not be empty".to_string(),
            });
        }
        if self.hand_axes.iter().any(|&a| a > 2) {
            return Err(GraspError::InvalidParameter {
                reason: "hand_axes entries must be 0, 1, or 2".to_string(),
            });
        }
        if self.num_orientations == 0 {
            return Err(GraspError::InvalidParameter {
                reason: "num_orientations must be positive".to_string(),
            });
        }
        if !self.nn_radius.is_finite() || self.nn_radius <= 0.0 {
            return Err(GraspError::InvalidParameter {
                reason: "nn_radius must be positive and finite".to_string(),
            });
        }
        if self.min_viable_contacts == 0 {
            return Err(GraspError::InvalidParameter {
                reason: "min_viable_contacts must be positive".to_string(),
            });
        }
        if self.contact_cone_deg <= 0.0 || self.contact_cone_deg >= 90.0 {
            return Err(GraspError::InvalidParameter {
                reason: "contact_cone_deg must lie in (0, 90)".to_string(),
            });
        }
        Ok(())
    }

    fn contact_params(&self) -> ContactParams {
        ContactParams {
            cos_cone: self.contact_cone_deg.to_radians().cos(),
            min_viable: self.min_viable_contacts,
        }
    }
}

/// Searches a point cloud for grasp candidates around its designated
/// samples.
#[derive(Debug, Clone)]
pub struct HandSearch {
    params: HandSearchParams,
}

impl HandSearch {
    /// Creates a search with validated parameters.
    ///
    /// # Errors
    ///
    /// Returns [`GraspError::InvalidParameter`] when the parameters are
    /// inconsistent.
    pub fn new(params: HandSearchParams) -> GraspResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// The search parameters.
    #[must_use]
    pub const fn params(&self) -> &HandSearchParams {
        &self.params
    }

    /// Generates one [`HandSet`] per designated sample.
    ///
    /// Explicit samples ([`PointCloud::set_samples`]) take precedence over
    /// sample indices. The output is ordered by sample and, within each set,
    /// by rotation axis then orientation, so identical inputs produce
    /// identical outputs regardless of thread count.
    ///
    /// # Errors
    ///
    /// Returns [`GraspError::MissingNormals`] when any cloud point lacks a
    /// surface normal.
    pub fn search_hands(&self, cloud: &PointCloud) -> GraspResult<Vec<HandSet>> {
        if cloud.is_empty() {
            return Ok(Vec::new());
        }
        if !cloud.has_normals() {
            return Err(GraspError::MissingNormals);
        }

        let samples: Vec<(Point3<f64>, Option<usize>)> = if cloud.samples().is_empty() {
            // Indices can go stale when the caller mutates `points` after
            // designating samples; out-of-range ones are skipped.
            cloud
                .sample_indices()
                .iter()
                .filter(|&&i| i < cloud.points.len())
                .map(|&i| (cloud.points[i].position, Some(i)))
                .collect()
        } else {
            cloud.samples().iter().map(|&s| (s, None)).collect()
        };
        if samples.is_empty() {
            warn!("no samples designated; nothing to search");
            return Ok(Vec::new());
        }

        info!(
            num_samples = samples.len(),
            nn_radius = self.params.nn_radius,
            num_orientations = self.params.num_orientations,
            "searching for grasp candidates"
        );

        let kdtree = build_kdtree(&cloud.points);
        let contact = self.params.contact_params();

        let search_all = || {
            samples
                .par_iter()
                .map(|&(sample, sample_index)| {
                    self.evaluate_sample(sample, sample_index, cloud, &kdtree, &contact)
                })
                .collect::<Vec<HandSet>>()
        };

        let sets = self.run_pooled(search_all)?;

        let num_valid: usize = sets.iter().map(HandSet::num_valid).sum();
        info!(
            num_sets = sets.len(),
            num_valid, "hand search finished"
        );
        Ok(sets)
    }

    /// Re-tests previously generated hypotheses against a cloud and returns
    /// the indices of those that remain feasible, in input order.
    ///
    /// Each hand is re-evaluated at its recorded insertion depth in the
    /// frame given by its orientation, using the neighborhood around its
    /// original sample.
    ///
    /// # Errors
    ///
    /// Returns [`GraspError::MissingNormals`] when any cloud point lacks a
    /// surface normal.
    pub fn reevaluate_hypotheses(
        &self,
        cloud: &PointCloud,
        hands: &[Hand],
    ) -> GraspResult<Vec<usize>> {
        if cloud.is_empty() || hands.is_empty() {
            return Ok(Vec::new());
        }
        if !cloud.has_normals() {
            return Err(GraspError::MissingNormals);
        }

        let kdtree = build_kdtree(&cloud.points);
        let contact = self.params.contact_params();

        let reevaluate_all = || {
            hands
                .par_iter()
                .enumerate()
                .map(|(i, hand)| {
                    let neighbors = self.neighborhood(&kdtree, &hand.sample);
                    if neighbors.len() < self.params.min_neighbors {
                        return None;
                    }
                    let rotation = hand.orientation.to_rotation_matrix();
                    let frame_points =
                        transform_to_frame(cloud, &neighbors, &hand.sample, &rotation);
                    let fit = evaluate_pose(
                        &frame_points,
                        &self.params.hand_geometry,
                        hand.depth,
                        &contact,
                    );
                    fit.is_valid().then_some(i)
                })
                .collect::<Vec<Option<usize>>>()
        };

        let kept: Vec<usize> = self
            .run_pooled(reevaluate_all)?
            .into_iter()
            .flatten()
            .collect();
        debug!(
            num_hands = hands.len(),
            num_kept = kept.len(),
            "re-evaluated hand hypotheses"
        );
        Ok(kept)
    }

    /// Runs `work` on a dedicated pool of `num_threads` workers, or on the
    /// process-wide pool when `num_threads` is 0.
    fn run_pooled<T, F>(&self, work: F) -> GraspResult<T>
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        if self.params.num_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.params.num_threads)
                .build()
                .map_err(|e| GraspError::InvalidParameter {
                    reason: format!("failed to build thread pool: {e}"),
                })?;
            Ok(pool.install(work))
        } else {
            Ok(work())
        }
    }

    /// Indices of cloud points within `nn_radius` of `center`, sorted by
    /// index so downstream iteration order is deterministic.
    fn neighborhood(&self, kdtree: &CloudKdTree, center: &Point3<f64>) -> Vec<usize> {
        let query = [center.x, center.y, center.z];
        let radius_sq = self.params.nn_radius * self.params.nn_radius;
        let mut indices: Vec<usize> = kdtree
            .within_unsorted::<SquaredEuclidean>(&query, radius_sq)
            .iter()
            .map(|n| n.item as usize)
            .collect();
        indices.sort_unstable();
        indices
    }

    /// Builds the hand set for one sample.
    fn evaluate_sample(
        &self,
        sample: Point3<f64>,
        sample_index: Option<usize>,
        cloud: &PointCloud,
        kdtree: &CloudKdTree,
        contact: &ContactParams,
    ) -> HandSet {
        let mut set = HandSet::new(sample, sample_index);

        let neighbors = self.neighborhood(kdtree, &sample);
        if neighbors.len() < self.params.min_neighbors {
            return set;
        }

        let normals: Vec<Vector3<f64>> = neighbors
            .iter()
            .filter_map(|&i| cloud.points[i].normal)
            .collect();
        let to_view = cloud.view_point - sample;
        let view_direction = if to_view.norm() > 1e-10 {
            to_view.normalize()
        } else {
            Vector3::z()
        };
        let Some(frame) = LocalFrame::estimate(&normals, &view_direction) else {
            return set;
        };
        let base = frame.hand_orientation();

        for &axis in &self.params.hand_axes {
            for k in 0..self.params.num_orientations {
                #[allow(clippy::cast_precision_loss)]
                let angle =
                    -FRAC_PI_2 + PI * k as f64 / self.params.num_orientations as f64;
                let rotation = base * Rotation3::from_axis_angle(&local_axis(axis), angle);
                let frame_points = transform_to_frame(cloud, &neighbors, &sample, &rotation);
                set.push(self.deepen_hand(&frame_points, &rotation, sample, sample_index, contact));
            }
        }
        set
    }

    /// Deepens one orientation from `init_bite` toward `max_depth` and
    /// returns the hypothesis at the deepest feasible insertion, or an
    /// invalid hypothesis at `init_bite` when none is feasible.
    fn deepen_hand(
        &self,
        frame_points: &[FramePoint],
        rotation: &Rotation3<f64>,
        sample: Point3<f64>,
        sample_index: Option<usize>,
        contact: &ContactParams,
    ) -> Hand {
        let geometry = &self.params.hand_geometry;

        let mut feasible: Option<(f64, f64, f64)> = None;
        for k in 0.. {
            #[allow(clippy::cast_precision_loss)]
            let bite = geometry.init_bite + k as f64 * geometry.deepen_step;
            if bite > geometry.max_depth + DEPTH_EPS {
                break;
            }
            match evaluate_pose(frame_points, geometry, bite, contact) {
                PoseFit::Valid {
                    grasp_width,
                    closing_center,
                } => feasible = Some((bite, grasp_width, closing_center)),
                _ => break,
            }
        }

        let (bite, grasp_width, closing_center, is_valid) = match feasible {
            Some((bite, width, center)) => (bite, width, center, true),
            None => (geometry.init_bite, 0.0, 0.0, false),
        };

        // Palm center: behind the fingers, re-centered on the material.
        let offset = Vector3::new(bite - geometry.depth, closing_center, 0.0);
        let position = sample + rotation * offset;
        let mut hand = Hand::new(
            position,
            UnitQuaternion::from_rotation_matrix(rotation),
            grasp_width,
            bite,
            sample,
        );
        hand.sample_index = sample_index;
        hand.is_valid = is_valid;
        hand
    }
}

/// Unit vector of a local frame axis by index.
fn local_axis(axis: usize) -> Unit<Vector3<f64>> {
    match axis {
        0 => Vector3::x_axis(),
        1 => Vector3::y_axis(),
        _ => Vector3::z_axis(),
    }
}

/// Expresses the selected cloud points in the hand frame at `sample` with
/// orientation `rotation`.
fn transform_to_frame(
    cloud: &PointCloud,
    indices: &[usize],
    sample: &Point3<f64>,
    rotation: &Rotation3<f64>,
) -> Vec<FramePoint> {
    let inverse = rotation.matrix().transpose();
    indices
        .iter()
        .map(|&i| {
            let point = &cloud.points[i];
            FramePoint {
                position: Point3::from(inverse * (point.position - sample)),
                normal: point.normal.map(|n| inverse * n),
            }
        })
        .collect()
}
