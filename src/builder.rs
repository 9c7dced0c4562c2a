//! Configuration surface and run orchestration.
//!
//! `SlicBuilder` collects the clustering parameters, validates them before
//! any computation runs, then drives the full pipeline: spatial index
//! construction, center seeding, and the refinement loop.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::clustering::{refine, SlicOutput, SlicParams};
use crate::core::{BarcodeSpace, SlicError, SlicResult};
use crate::seeding::SeedingStrategy;
use crate::spatial::SpatialIndex;

/// Default compactness weight; the midpoint bias of the SLIC literature.
pub const DEFAULT_COMPACTNESS: f64 = 10.0;
/// Default residual-error threshold.
pub const DEFAULT_THRESHOLD: f64 = 1e-4;
/// Default iteration cap.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;
/// Default RNG seed for seeded policies.
pub const DEFAULT_SEED: u64 = 128;

/// Builder for a superpixel clustering run.
///
/// # Examples
///
/// ```
/// use pixelspace::builder::SlicBuilder;
/// use pixelspace::core::BarcodeSpace;
///
/// let positions = vec![[0.0, 0.0], [0.1, 0.0], [5.0, 5.0], [5.1, 5.0]];
/// let rows = vec![
///     vec![1.0, 0.0],
///     vec![1.0, 0.1],
///     vec![0.0, 9.0],
///     vec![0.1, 9.0],
/// ];
/// let space = BarcodeSpace::new(positions, &rows).unwrap();
///
/// let output = SlicBuilder::new()
///     .with_clusters(2)
///     .with_compactness(5.0)
///     .build(&space)
///     .unwrap();
///
/// assert_eq!(output.labels.len(), 4);
/// assert!(output.labels.iter().all(|&l| l < 2));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlicBuilder {
    k: Option<usize>,
    compactness: f64,
    threshold: f64,
    max_iterations: usize,
    seeding: SeedingStrategy,
    seed: u64,
    persist_best_distances: bool,
}

impl Default for SlicBuilder {
    fn default() -> Self {
        debug!("Creating SlicBuilder with default parameters");
        Self {
            k: None,
            compactness: DEFAULT_COMPACTNESS,
            threshold: DEFAULT_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seeding: SeedingStrategy::default(),
            seed: DEFAULT_SEED,
            persist_best_distances: false,
        }
    }
}

impl SlicBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of superpixels k. Mandatory; must lie in [1, n] at build time.
    pub fn with_clusters(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    /// Compactness weight m in [1, 40]. Near 1 favors feature similarity,
    /// near 40 spatial compactness.
    pub fn with_compactness(mut self, m: f64) -> Self {
        self.compactness = m;
        self
    }

    /// Residual-error threshold (non-negative).
    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Upper bound on refinement passes (positive).
    pub fn with_max_iterations(mut self, cap: usize) -> Self {
        self.max_iterations = cap;
        self
    }

    /// Center-initialization policy.
    pub fn with_seeding(mut self, strategy: SeedingStrategy) -> Self {
        self.seeding = strategy;
        self
    }

    /// RNG seed for seeded policies; fixed default keeps runs reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Keep per-barcode best-distances across passes instead of resetting
    /// them each pass. The reset default follows the SLIC literature and
    /// lets barcodes migrate as centers move; persistence locks
    /// assignments in monotonically.
    pub fn with_best_distance_persistence(mut self, persist: bool) -> Self {
        self.persist_best_distances = persist;
        self
    }

    /// Validates the configuration, builds the spatial index, seeds the
    /// centers, and runs the refinement loop.
    pub fn build(&self, space: &BarcodeSpace) -> SlicResult<SlicOutput> {
        let k = self.k.ok_or_else(|| {
            SlicError::InvalidParameter("cluster count k must be set (with_clusters)".to_string())
        })?;

        let params = SlicParams {
            k,
            compactness: self.compactness,
            threshold: self.threshold,
            max_iterations: self.max_iterations,
            persist_best_distances: self.persist_best_distances,
        };
        params.validate(space.nitems)?;

        info!(
            "SlicBuilder::build: n={}, f={}, k={}, seeding={:?}",
            space.nitems, space.nfeatures, k, self.seeding
        );

        let index = SpatialIndex::new(space.positions(), k)?;
        let centers = self.seeding.seed_centers(space, k, self.seed)?;

        refine(space, &index, centers, &params)
    }
}
