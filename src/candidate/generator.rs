//! Top-level candidate generation pipeline.
//!
//! The generator sequences the preprocessing stages (workspace crop, voxel
//! downsampling, normal estimation, sample selection) and drives the hand
//! search over the prepared cloud.

use rayon::prelude::*;
use tracing::info;

use super::hand::Hand;
use super::hand_search::{HandSearch, HandSearchParams};
use super::hand_set::HandSet;
use crate::cloud::{PointCloud, Workspace};
use crate::config::ConfigMap;
use crate::error::{GraspError, GraspResult};

/// Edge length of the voxel grid used for downsampling (3 mm).
const VOXEL_SIZE: f64 = 0.003;

/// Neighborhood size for surface normal estimation.
const NORMALS_K: usize = 30;

/// Parameters of the preprocessing stages.
///
/// # Example
///
/// ```
/// use grasp_candidates::{CandidatesGeneratorParams, ConfigMap};
///
/// let config = ConfigMap::parse_str(
///     "workspace = -0.5 0.5 -0.5 0.5 0.0 1.0\n\
///      num_samples = 50\n",
/// );
/// let params = CandidatesGeneratorParams::from_config(&config);
/// assert_eq!(params.num_samples, 50);
/// assert!(params.voxelize);
/// ```
#[derive(Debug, Clone)]
pub struct CandidatesGeneratorParams {
    /// Axis-aligned box the cloud is cropped to before sampling.
    pub workspace: Workspace,

    /// Whether to downsample the cloud with a voxel grid filter.
    pub voxelize: bool,

    /// Number of sample seeds drawn from the preprocessed cloud.
    pub num_samples: usize,

    /// Seed of the sample draw; identical inputs and seeds select identical
    /// samples.
    pub sample_seed: u64,

    /// Worker pool size for normal estimation; 0 uses the process-wide
    /// default.
    pub num_threads: usize,
}

impl Default for CandidatesGeneratorParams {
    fn default() -> Self {
        Self {
            workspace: Workspace::default(),
            voxelize: true,
            num_samples: 100,
            sample_seed: 0,
            num_threads: 0,
        }
    }
}

impl CandidatesGeneratorParams {
    /// Reads generator parameters from a key-value configuration source,
    /// falling back to defaults for missing keys.
    #[must_use]
    pub fn from_config(config: &ConfigMap) -> Self {
        let defaults = Self::default();
        let bounds = config.get_f64_list_or("workspace", &[-1.0, 1.0, -1.0, 1.0, -1.0, 1.0]);
        let workspace = if bounds.len() == 6 {
            Workspace::from_bounds([
                bounds[0], bounds[1], bounds[2], bounds[3], bounds[4], bounds[5],
            ])
        } else {
            defaults.workspace
        };
        Self {
            workspace,
            voxelize: config.get_bool_or("voxelize", defaults.voxelize),
            num_samples: config.get_usize_or("num_samples", defaults.num_samples),
            sample_seed: u64::try_from(config.get_usize_or("sample_seed", 0)).unwrap_or(0),
            num_threads: config.get_usize_or("num_threads", defaults.num_threads),
        }
    }
}

/// Generates grasp candidates from a point cloud.
///
/// # Example
///
/// ```no_run
/// use grasp_candidates::{
///     CandidatesGenerator, CandidatesGeneratorParams, HandSearchParams, PointCloud,
/// };
///
/// let generator = CandidatesGenerator::new(
///     CandidatesGeneratorParams::default(),
///     HandSearchParams::default(),
/// )
/// .unwrap();
///
/// let mut cloud = PointCloud::new();
/// // ... fill the cloud from a sensor ...
/// generator.preprocess_point_cloud(&mut cloud).unwrap();
/// let candidates = generator.generate_grasp_candidates(&cloud).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct CandidatesGenerator {
    params: CandidatesGeneratorParams,
    hand_search: HandSearch,
}

impl CandidatesGenerator {
    /// Creates a generator with validated search parameters.
    ///
    /// # Errors
    ///
    /// Returns [`GraspError::InvalidParameter`] when the search parameters
    /// are inconsistent.
    pub fn new(
        params: CandidatesGeneratorParams,
        search_params: HandSearchParams,
    ) -> GraspResult<Self> {
        let hand_search = HandSearch::new(search_params)?;
        Ok(Self {
            params,
            hand_search,
        })
    }

    /// The preprocessing parameters.
    #[must_use]
    pub const fn params(&self) -> &CandidatesGeneratorParams {
        &self.params
    }

    /// The underlying hand search.
    #[must_use]
    pub const fn hand_search(&self) -> &HandSearch {
        &self.hand_search
    }

    /// Prepares a raw cloud for the search: crops it to the workspace,
    /// optionally voxelizes it, estimates surface normals, and draws the
    /// sample seeds.
    ///
    /// # Errors
    ///
    /// Returns [`GraspError::EmptyPointCloud`] when the cloud is empty or
    /// the crop removes every point, and propagates normal estimation
    /// failures.
    pub fn preprocess_point_cloud(&self, cloud: &mut PointCloud) -> GraspResult<()> {
        if cloud.is_empty() {
            return Err(GraspError::EmptyPointCloud);
        }
        let raw_len = cloud.len();

        cloud.filter_workspace(&self.params.workspace);
        if cloud.is_empty() {
            return Err(GraspError::EmptyPointCloud);
        }
        let cropped_len = cloud.len();

        if self.params.voxelize {
            cloud.voxelize(VOXEL_SIZE);
        }
        info!(
            raw = raw_len,
            cropped = cropped_len,
            preprocessed = cloud.len(),
            "preprocessed point cloud"
        );

        cloud.estimate_normals(NORMALS_K, self.params.num_threads)?;
        cloud.subsample(self.params.num_samples, self.params.sample_seed);
        Ok(())
    }

    /// Generates the flat list of valid grasp candidates, ordered by sample
    /// and, within each sample, by orientation.
    ///
    /// # Errors
    ///
    /// Propagates [`HandSearch::search_hands`] errors.
    pub fn generate_grasp_candidates(&self, cloud: &PointCloud) -> GraspResult<Vec<Hand>> {
        let mut sets = self.hand_search.search_hands(cloud)?;
        let candidates: Vec<Hand> = sets
            .par_iter_mut()
            .map(HandSet::take_valid_hands)
            .flatten()
            .collect();
        info!(num_candidates = candidates.len(), "generated grasp candidates");
        Ok(candidates)
    }

    /// Generates the per-sample hypothesis sets, including invalid
    /// hypotheses.
    ///
    /// # Errors
    ///
    /// Propagates [`HandSearch::search_hands`] errors.
    pub fn generate_grasp_candidate_sets(&self, cloud: &PointCloud) -> GraspResult<Vec<HandSet>> {
        self.hand_search.search_hands(cloud)
    }

    /// Re-tests previously generated hypotheses against a cloud; see
    /// [`HandSearch::reevaluate_hypotheses`].
    ///
    /// # Errors
    ///
    /// Propagates [`HandSearch::reevaluate_hypotheses`] errors.
    pub fn reevaluate_hypotheses(
        &self,
        cloud: &PointCloud,
        hands: &[Hand],
    ) -> GraspResult<Vec<usize>> {
        self.hand_search.reevaluate_hypotheses(cloud, hands)
    }
}
