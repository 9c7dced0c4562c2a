//! SLIC-style iterative cluster refinement over a spatial index.
//!
//! One pass visits all k centers in index order. Each center pulls the
//! barcodes inside its 2S window from the `SpatialIndex`, relabels any
//! barcode it improves on (strictly smaller combined distance than the
//! barcode's current best), and folds those barcodes into its accumulator.
//! Centers are double-buffered: relabeling reads only the previous pass's
//! center values; the accumulators are divided out and swapped in at pass
//! end. The loop runs while the total center displacement (residual error)
//! exceeds the configured threshold, bounded by a mandatory iteration cap.
//!
//! Passes are sequential by design: a later center may steal a barcode
//! assigned earlier in the same pass, and that ordering is part of the
//! algorithm's semantics. The read-only sweeps around the loop (final
//! assignment of barcodes no window ever covered) are parallelized.

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::core::{BarcodeSpace, SlicError, SlicResult};
use crate::distance::{combined_distance, squared_distance, COMPACTNESS_MAX, COMPACTNESS_MIN};
use crate::spatial::SpatialIndex;

/// Sentinel for a barcode not yet claimed by any center.
pub const UNASSIGNED: usize = usize::MAX;

/// A cluster center: spatial position plus feature-space centroid.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterCenter {
    pub position: [f64; 2],
    pub features: Vec<f64>,
}

/// Parameters of one refinement run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SlicParams {
    /// Number of superpixels, in [1, n].
    pub k: usize,
    /// Compactness weight m, in [1, 40].
    pub compactness: f64,
    /// Residual-error threshold; the loop continues while the residual
    /// exceeds it.
    pub threshold: f64,
    /// Mandatory upper bound on passes.
    pub max_iterations: usize,
    /// Keep best-distances across passes (monotonic lock-in) instead of
    /// resetting them to infinity each pass. Off by default; the reset
    /// behavior lets barcodes migrate as centers move.
    pub persist_best_distances: bool,
}

impl SlicParams {
    pub fn validate(&self, nitems: usize) -> SlicResult<()> {
        if nitems == 0 {
            return Err(SlicError::EmptyInput);
        }
        if self.k < 1 || self.k > nitems {
            return Err(SlicError::InvalidParameter(format!(
                "cluster count k must lie in [1, {}], got {}",
                nitems, self.k
            )));
        }
        if !(COMPACTNESS_MIN..=COMPACTNESS_MAX).contains(&self.compactness) {
            return Err(SlicError::InvalidParameter(format!(
                "compactness m must lie in [{}, {}], got {}",
                COMPACTNESS_MIN, COMPACTNESS_MAX, self.compactness
            )));
        }
        if !(self.threshold >= 0.0) {
            return Err(SlicError::InvalidParameter(format!(
                "convergence threshold must be non-negative, got {}",
                self.threshold
            )));
        }
        if self.max_iterations == 0 {
            return Err(SlicError::InvalidParameter(
                "iteration cap must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of a refinement run.
#[derive(Clone, Debug)]
pub struct SlicOutput {
    /// Cluster id in [0, k) for every barcode, in barcode-id order.
    pub labels: Vec<usize>,
    /// Final centers, index-aligned with the label values.
    pub centers: Vec<ClusterCenter>,
    /// Passes executed.
    pub iterations: usize,
    /// Residual error of the last pass.
    pub residual: f64,
    /// False when the iteration cap fired before the residual dropped to
    /// the threshold. The labels are still valid.
    pub converged: bool,
}

/// Per-center accumulator for the next pass's value.
struct CenterAccumulator {
    position: [f64; 2],
    features: Vec<f64>,
    count: usize,
}

impl CenterAccumulator {
    fn zeroed(nfeatures: usize) -> Self {
        Self {
            position: [0.0, 0.0],
            features: vec![0.0; nfeatures],
            count: 0,
        }
    }

    #[inline]
    fn fold(&mut self, x: f64, y: f64, features: &[f64]) {
        self.position[0] += x;
        self.position[1] += y;
        for (acc, f) in self.features.iter_mut().zip(features) {
            *acc += f;
        }
        self.count += 1;
    }
}

/// Runs the refinement loop to completion and returns the label vector
/// together with the final centers.
///
/// `centers` is the seed set (see `SeedingStrategy`); its length must equal
/// `params.k` and every feature centroid must match the space's feature
/// dimension.
pub fn refine(
    space: &BarcodeSpace,
    index: &SpatialIndex,
    mut centers: Vec<ClusterCenter>,
    params: &SlicParams,
) -> SlicResult<SlicOutput> {
    params.validate(space.nitems)?;
    if centers.len() != params.k {
        return Err(SlicError::InvalidParameter(format!(
            "expected {} seed centers, got {}",
            params.k,
            centers.len()
        )));
    }
    for center in &centers {
        if center.features.len() != space.nfeatures {
            return Err(SlicError::DimensionMismatch {
                expected: space.nfeatures,
                got: center.features.len(),
            });
        }
    }

    let s = index.grid_interval();
    let n = space.nitems;

    info!(
        "Refining {} centers over {} barcodes: m={}, threshold={:.3e}, cap={}",
        params.k, n, params.compactness, params.threshold, params.max_iterations
    );

    let mut labels = vec![UNASSIGNED; n];
    let mut best = vec![f64::INFINITY; n];

    let mut residual = f64::INFINITY;
    let mut iterations = 0usize;

    while residual > params.threshold && iterations < params.max_iterations {
        if !params.persist_best_distances {
            best.fill(f64::INFINITY);
        }

        let (new_centers, pass_residual) =
            run_pass(space, index, &centers, &mut labels, &mut best, s, params.compactness)?;

        centers = new_centers;
        residual = pass_residual;
        iterations += 1;

        debug!("Pass {}: residual error {:.6e}", iterations, residual);
    }

    let converged = residual <= params.threshold;
    if !converged {
        warn!(
            "Iteration cap {} reached with residual {:.6e} above threshold {:.3e}",
            params.max_iterations, residual, params.threshold
        );
    }

    assign_uncovered(space, &centers, &mut labels, s, params.compactness)?;

    info!(
        "Refinement done after {} passes (converged: {})",
        iterations, converged
    );

    Ok(SlicOutput {
        labels,
        centers,
        iterations,
        residual,
        converged,
    })
}

/// One full pass over all k centers. Reads the previous pass's center
/// values only; returns the committed next-pass centers and the residual
/// error (total spatial displacement).
fn run_pass(
    space: &BarcodeSpace,
    index: &SpatialIndex,
    centers: &[ClusterCenter],
    labels: &mut [usize],
    best: &mut [f64],
    s: f64,
    m: f64,
) -> SlicResult<(Vec<ClusterCenter>, f64)> {
    let mut accumulators: Vec<CenterAccumulator> = (0..centers.len())
        .map(|_| CenterAccumulator::zeroed(space.nfeatures))
        .collect();

    for (c_idx, center) in centers.iter().enumerate() {
        let hits = index.region_query(center.position[0], center.position[1])?;

        for entry in hits {
            assert!(
                entry.id < space.nitems,
                "region query returned barcode id {} outside [0, {})",
                entry.id,
                space.nitems
            );

            let d = combined_distance(
                &center.position,
                &center.features,
                &[entry.x, entry.y],
                space.features(entry.id),
                s,
                m,
            )?;

            if d < best[entry.id] {
                best[entry.id] = d;
                labels[entry.id] = c_idx;
                accumulators[c_idx].fold(entry.x, entry.y, space.features(entry.id));
            }
        }
    }

    // Commit: divide accumulators out; a center that claimed nothing this
    // pass keeps its previous value and contributes zero displacement.
    let mut residual = 0.0;
    let mut new_centers = Vec::with_capacity(centers.len());
    for (old, acc) in centers.iter().zip(accumulators) {
        if acc.count == 0 {
            new_centers.push(old.clone());
            continue;
        }

        let inv = 1.0 / acc.count as f64;
        let position = [acc.position[0] * inv, acc.position[1] * inv];
        let features: Vec<f64> = acc.features.iter().map(|v| v * inv).collect();

        residual += squared_distance(&old.position, &position)?.sqrt();
        new_centers.push(ClusterCenter { position, features });
    }

    Ok((new_centers, residual))
}

/// Assigns every barcode still carrying the sentinel to its nearest center
/// by combined distance. Read-only over the centers, so the per-barcode
/// work runs in parallel.
fn assign_uncovered(
    space: &BarcodeSpace,
    centers: &[ClusterCenter],
    labels: &mut [usize],
    s: f64,
    m: f64,
) -> SlicResult<()> {
    let uncovered: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, &l)| l == UNASSIGNED)
        .map(|(i, _)| i)
        .collect();

    if uncovered.is_empty() {
        return Ok(());
    }
    warn!(
        "{} barcodes outside every center window; assigning by nearest center",
        uncovered.len()
    );

    let fixes: Vec<(usize, usize)> = uncovered
        .into_par_iter()
        .map(|i| -> SlicResult<(usize, usize)> {
            let pos = space.position(i);
            let feat = space.features(i);

            let mut best_d = f64::INFINITY;
            let mut best_c = 0usize;
            for (c_idx, center) in centers.iter().enumerate() {
                let d = combined_distance(&center.position, &center.features, &pos, feat, s, m)?;
                if d < best_d {
                    best_d = d;
                    best_c = c_idx;
                }
            }
            Ok((i, best_c))
        })
        .collect::<SlicResult<Vec<_>>>()?;

    for (i, c) in fixes {
        labels[i] = c;
    }
    Ok(())
}
