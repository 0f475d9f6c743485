//! Point cloud data structures and preprocessing operations.
//!
//! This module provides the [`PointCloud`] type consumed by the grasp
//! candidate search: 3D points with optional surface normals, a designated
//! set of sample seeds, and the preprocessing primitives (workspace crop,
//! voxel downsampling, subsampling) the generator sequences before a search.
//!
//! # Example
//!
//! ```
//! use grasp_candidates::cloud::PointCloud;
//! use nalgebra::{Point3, Vector3};
//!
//! let mut cloud = PointCloud::new();
//! cloud.add_point_with_normal(Point3::new(0.0, 0.0, 0.0), Vector3::z());
//! cloud.add_point_with_normal(Point3::new(0.01, 0.0, 0.0), Vector3::z());
//!
//! assert_eq!(cloud.len(), 2);
//! assert!(cloud.has_normals());
//! ```

pub mod normals;

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// An RGB color attached to a cloud point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointColor {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl PointColor {
    /// Creates a new color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A point in a point cloud with optional attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudPoint {
    /// The 3D position of the point (meters).
    pub position: Point3<f64>,

    /// Optional unit surface normal at this point.
    pub normal: Option<Vector3<f64>>,

    /// Optional RGB color.
    pub color: Option<PointColor>,
}

impl CloudPoint {
    /// Creates a new point with just a position.
    #[must_use]
    pub const fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            normal: None,
            color: None,
        }
    }

    /// Creates a point from x, y, z coordinates.
    #[must_use]
    pub const fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }

    /// Creates a point with position and normal.
    #[must_use]
    pub const fn with_normal(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            position,
            normal: Some(normal),
            color: None,
        }
    }

    /// Returns true if this point has a normal.
    #[must_use]
    pub const fn has_normal(&self) -> bool {
        self.normal.is_some()
    }
}

impl Default for CloudPoint {
    fn default() -> Self {
        Self::new(Point3::origin())
    }
}

/// An axis-aligned workspace box to which the cloud is cropped before
/// sampling.
///
/// # Example
///
/// ```
/// use grasp_candidates::cloud::Workspace;
/// use nalgebra::Point3;
///
/// let ws = Workspace::new(Point3::new(-1.0, -1.0, 0.0), Point3::new(1.0, 1.0, 2.0));
/// assert!(ws.contains(&Point3::new(0.0, 0.0, 1.0)));
/// assert!(!ws.contains(&Point3::new(0.0, 0.0, 3.0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Workspace {
    /// Minimum corner of the box.
    pub min: Point3<f64>,
    /// Maximum corner of the box.
    pub max: Point3<f64>,
}

impl Workspace {
    /// Creates a new workspace box.
    #[must_use]
    pub const fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Creates a workspace from `[x_min, x_max, y_min, y_max, z_min, z_max]`,
    /// the layout used by configuration sources.
    #[must_use]
    pub const fn from_bounds(bounds: [f64; 6]) -> Self {
        Self {
            min: Point3::new(bounds[0], bounds[2], bounds[4]),
            max: Point3::new(bounds[1], bounds[3], bounds[5]),
        }
    }

    /// Returns true if the point lies inside the box (inclusive).
    #[must_use]
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::from_bounds([-1.0, 1.0, -1.0, 1.0, -1.0, 1.0])
    }
}

/// A collection of 3D points with optional normals and a designated sample
/// set for the grasp search.
///
/// Samples can be designated two ways: as indices into the point list
/// ([`PointCloud::set_sample_indices`], typically the output of
/// [`PointCloud::subsample`]) or as explicit 3D coordinates
/// ([`PointCloud::set_samples`]) that need not coincide with any cloud
/// point. Explicit samples take precedence during a search.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    /// The points in this cloud.
    pub points: Vec<CloudPoint>,

    /// Indices of points selected as grasp-candidate seeds.
    sample_indices: Vec<usize>,

    /// Explicit grasp-candidate seed coordinates.
    samples: Vec<Point3<f64>>,

    /// The sensor position the cloud was observed from. Surface normals are
    /// oriented toward this point during estimation.
    pub view_point: Point3<f64>,
}

impl PointCloud {
    /// Creates an empty point cloud with the view point at the origin.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a point cloud from a slice of 3D positions.
    ///
    /// # Example
    ///
    /// ```
    /// use grasp_candidates::cloud::PointCloud;
    /// use nalgebra::Point3;
    ///
    /// let cloud = PointCloud::from_positions(&[
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    /// ]);
    /// assert_eq!(cloud.len(), 2);
    /// ```
    #[must_use]
    pub fn from_positions(positions: &[Point3<f64>]) -> Self {
        let points = positions.iter().map(|p| CloudPoint::new(*p)).collect();
        Self {
            points,
            ..Self::default()
        }
    }

    /// Returns the number of points in the cloud.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the cloud has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns true if all points have normals.
    #[must_use]
    pub fn has_normals(&self) -> bool {
        !self.points.is_empty() && self.points.iter().all(CloudPoint::has_normal)
    }

    /// Adds a point at the given position.
    pub fn add_point(&mut self, position: Point3<f64>) {
        self.points.push(CloudPoint::new(position));
    }

    /// Adds a point with position and normal.
    pub fn add_point_with_normal(&mut self, position: Point3<f64>, normal: Vector3<f64>) {
        self.points.push(CloudPoint::with_normal(position, normal));
    }

    /// Returns the indices of points designated as sample seeds.
    #[must_use]
    pub fn sample_indices(&self) -> &[usize] {
        &self.sample_indices
    }

    /// Designates sample seeds by index into the point list.
    ///
    /// Out-of-range indices are dropped.
    pub fn set_sample_indices(&mut self, indices: Vec<usize>) {
        let len = self.points.len();
        self.sample_indices = indices.into_iter().filter(|&i| i < len).collect();
    }

    /// Returns the explicit sample seed coordinates.
    #[must_use]
    pub fn samples(&self) -> &[Point3<f64>] {
        &self.samples
    }

    /// Designates explicit sample seed coordinates.
    pub fn set_samples(&mut self, samples: Vec<Point3<f64>>) {
        self.samples = samples;
    }

    /// Returns the axis-aligned bounds of the cloud, or `None` when empty.
    #[must_use]
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.points.first()?.position;
        let mut min = first;
        let mut max = first;
        for point in &self.points[1..] {
            let p = &point.position;
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Some((min, max))
    }

    /// Returns the centroid of the cloud, or `None` when empty.
    #[must_use]
    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.points.is_empty() {
            return None;
        }
        let sum: Vector3<f64> = self.points.iter().map(|p| p.position.coords).sum();
        #[allow(clippy::cast_precision_loss)]
        let centroid = sum / self.points.len() as f64;
        Some(Point3::from(centroid))
    }

    /// Removes all points outside the workspace box.
    ///
    /// Stale sample indices are cleared because they index the old point
    /// order.
    ///
    /// # Example
    ///
    /// ```
    /// use grasp_candidates::cloud::{PointCloud, Workspace};
    /// use nalgebra::Point3;
    ///
    /// let mut cloud = PointCloud::from_positions(&[
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(5.0, 0.0, 0.0),
    /// ]);
    /// cloud.filter_workspace(&Workspace::default());
    /// assert_eq!(cloud.len(), 1);
    /// ```
    pub fn filter_workspace(&mut self, workspace: &Workspace) {
        self.points.retain(|p| workspace.contains(&p.position));
        self.sample_indices.clear();
    }

    /// Downsamples the cloud with a voxel grid filter.
    ///
    /// Points are grouped into voxels of the given size; each occupied voxel
    /// is replaced by the centroid of its points with the renormalized mean
    /// of their normals. The output order follows the first occurrence of
    /// each voxel in the input, which keeps the operation deterministic.
    ///
    /// A non-positive `voxel_size` leaves the cloud unchanged. Stale sample
    /// indices are cleared.
    pub fn voxelize(&mut self, voxel_size: f64) {
        if self.points.is_empty() || voxel_size <= 0.0 {
            return;
        }

        struct VoxelAccum {
            position_sum: Vector3<f64>,
            normal_sum: Vector3<f64>,
            count: usize,
            normal_count: usize,
        }

        let mut order: Vec<(i64, i64, i64)> = Vec::new();
        let mut voxels: HashMap<(i64, i64, i64), VoxelAccum> = HashMap::new();

        for point in &self.points {
            #[allow(clippy::cast_possible_truncation)]
            let key = (
                (point.position.x / voxel_size).floor() as i64,
                (point.position.y / voxel_size).floor() as i64,
                (point.position.z / voxel_size).floor() as i64,
            );
            let accum = voxels.entry(key).or_insert_with(|| {
                order.push(key);
                VoxelAccum {
                    position_sum: Vector3::zeros(),
                    normal_sum: Vector3::zeros(),
                    count: 0,
                    normal_count: 0,
                }
            });
            accum.position_sum += point.position.coords;
            accum.count += 1;
            if let Some(n) = point.normal {
                accum.normal_sum += n;
                accum.normal_count += 1;
            }
        }

        self.points = order
            .into_iter()
            .filter_map(|key| voxels.remove(&key))
            .map(|accum| {
                #[allow(clippy::cast_precision_loss)]
                let position = Point3::from(accum.position_sum / accum.count as f64);
                let mut point = CloudPoint::new(position);
                if accum.normal_count > 0 {
                    let norm = accum.normal_sum.norm();
                    if norm > 1e-10 {
                        point.normal = Some(accum.normal_sum / norm);
                    }
                }
                point
            })
            .collect();
        self.sample_indices.clear();
    }

    /// Draws `num_samples` distinct sample indices uniformly at random and
    /// stores them, sorted, as the cloud's sample set.
    ///
    /// The draw is seeded so identical inputs produce identical sample sets.
    /// When the cloud holds `num_samples` points or fewer, every point is
    /// selected.
    pub fn subsample(&mut self, num_samples: usize, seed: u64) {
        if self.points.len() <= num_samples {
            self.sample_indices = (0..self.points.len()).collect();
            return;
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices: Vec<usize> =
            rand::seq::index::sample(&mut rng, self.points.len(), num_samples).into_vec();
        indices.sort_unstable();
        self.sample_indices = indices;
    }
}

impl FromIterator<CloudPoint> for PointCloud {
    fn from_iter<I: IntoIterator<Item = CloudPoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl FromIterator<Point3<f64>> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Point3<f64>>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().map(CloudPoint::new).collect(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cloud_point_with_normal() {
        let point = CloudPoint::with_normal(Point3::origin(), Vector3::z());
        assert!(point.has_normal());
        assert_relative_eq!(point.normal.unwrap().z, 1.0);
    }

    #[test]
    fn test_workspace_contains() {
        let ws = Workspace::from_bounds([-1.0, 1.0, -2.0, 2.0, 0.0, 0.5]);
        assert!(ws.contains(&Point3::new(0.0, -1.5, 0.25)));
        assert!(!ws.contains(&Point3::new(0.0, -2.5, 0.25)));
        assert!(!ws.contains(&Point3::new(0.0, 0.0, 0.6)));
    }

    #[test]
    fn test_bounds_and_centroid() {
        let cloud =
            PointCloud::from_positions(&[Point3::new(0.0, 1.0, 2.0), Point3::new(4.0, 3.0, 0.0)]);
        let (min, max) = cloud.bounds().unwrap();
        assert_relative_eq!(min.x, 0.0);
        assert_relative_eq!(min.z, 0.0);
        assert_relative_eq!(max.x, 4.0);
        assert_relative_eq!(max.y, 3.0);

        let centroid = cloud.centroid().unwrap();
        assert_relative_eq!(centroid.x, 2.0);
        assert_relative_eq!(centroid.y, 2.0);
        assert_relative_eq!(centroid.z, 1.0);
    }

    #[test]
    fn test_bounds_empty() {
        assert!(PointCloud::new().bounds().is_none());
        assert!(PointCloud::new().centroid().is_none());
    }

    #[test]
    fn test_filter_workspace_clears_sample_indices() {
        let mut cloud = PointCloud::from_positions(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
        ]);
        cloud.set_sample_indices(vec![0, 1]);
        cloud.filter_workspace(&Workspace::default());
        assert_eq!(cloud.len(), 1);
        assert!(cloud.sample_indices().is_empty());
    }

    #[test]
    fn test_set_sample_indices_drops_out_of_range() {
        let mut cloud = PointCloud::from_positions(&[Point3::origin()]);
        cloud.set_sample_indices(vec![0, 7]);
        assert_eq!(cloud.sample_indices(), &[0]);
    }

    #[test]
    fn test_voxelize_merges_points() {
        let positions: Vec<_> = (0..100)
            .map(|i| Point3::new(f64::from(i) * 0.001, 0.0, 0.0))
            .collect();
        let mut cloud = PointCloud::from_positions(&positions);
        cloud.voxelize(0.01);
        assert!(cloud.len() < 100);
        assert!(!cloud.is_empty());
    }

    #[test]
    fn test_voxelize_averages_normals() {
        let mut cloud = PointCloud::new();
        cloud.add_point_with_normal(Point3::new(0.001, 0.0, 0.0), Vector3::z());
        cloud.add_point_with_normal(Point3::new(0.002, 0.0, 0.0), Vector3::z());
        cloud.voxelize(0.01);
        assert_eq!(cloud.len(), 1);
        let normal = cloud.points[0].normal.unwrap();
        assert_relative_eq!(normal.z, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_voxelize_invalid_size_is_noop() {
        let mut cloud = PointCloud::from_positions(&[Point3::origin()]);
        cloud.voxelize(-1.0);
        assert_eq!(cloud.len(), 1);
    }

    #[test]
    fn test_subsample_is_deterministic() {
        let positions: Vec<_> = (0..200)
            .map(|i| Point3::new(f64::from(i) * 0.01, 0.0, 0.0))
            .collect();
        let mut a = PointCloud::from_positions(&positions);
        let mut b = PointCloud::from_positions(&positions);
        a.subsample(20, 42);
        b.subsample(20, 42);
        assert_eq!(a.sample_indices(), b.sample_indices());
        assert_eq!(a.sample_indices().len(), 20);
    }

    #[test]
    fn test_subsample_small_cloud_takes_all() {
        let mut cloud = PointCloud::from_positions(&[Point3::origin(), Point3::new(1.0, 0.0, 0.0)]);
        cloud.subsample(10, 0);
        assert_eq!(cloud.sample_indices(), &[0, 1]);
    }

    #[test]
    fn test_from_iterator() {
        let cloud: PointCloud = vec![Point3::origin(), Point3::new(1.0, 1.0, 1.0)]
            .into_iter()
            .collect();
        assert_eq!(cloud.len(), 2);
    }
}
