//! Center-initialization policies for the refinement loop.
//!
//! Seeding is pluggable and external to the loop itself: any policy that
//! produces k centers spanning the spatial domain works. The grid policies
//! place seeds on a regular lattice over the bounding box of the positions
//! (the classic SLIC initialization, adapted to irregular point sets);
//! `RandomBarcodes` draws k distinct barcodes with a seeded RNG so runs
//! are reproducible.

use log::debug;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::clustering::ClusterCenter;
use crate::core::{BarcodeSpace, SlicError, SlicResult};

/// Named center-initialization strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedingStrategy {
    /// Regular lattice over the bounding box; each seed keeps its lattice
    /// position and borrows the feature vector of the nearest barcode.
    #[default]
    Grid,
    /// Regular lattice, but each seed snaps fully (position and features)
    /// onto the nearest barcode.
    GridSnap,
    /// k distinct barcodes drawn with a seeded RNG.
    RandomBarcodes,
}

impl SeedingStrategy {
    /// Produces k initial centers for `space`.
    ///
    /// Fails with `EmptyInput` on an empty space and `InvalidParameter`
    /// when k is outside [1, n].
    pub fn seed_centers(
        &self,
        space: &BarcodeSpace,
        k: usize,
        seed: u64,
    ) -> SlicResult<Vec<ClusterCenter>> {
        if space.is_empty() {
            return Err(SlicError::EmptyInput);
        }
        if k < 1 || k > space.nitems {
            return Err(SlicError::InvalidParameter(format!(
                "cluster count k must lie in [1, {}], got {}",
                space.nitems, k
            )));
        }

        debug!("Seeding {} centers with {:?} (seed {})", k, self, seed);

        match self {
            SeedingStrategy::Grid => Ok(grid_centers(space, k, false)),
            SeedingStrategy::GridSnap => Ok(grid_centers(space, k, true)),
            SeedingStrategy::RandomBarcodes => Ok(random_barcode_centers(space, k, seed)),
        }
    }
}

/// Lattice seeds over the spatial bounding box. With `snap`, both position
/// and features come from the nearest barcode; otherwise only the features
/// do.
fn grid_centers(space: &BarcodeSpace, k: usize, snap: bool) -> Vec<ClusterCenter> {
    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in space.positions() {
        min_x = min_x.min(p[0]);
        max_x = max_x.max(p[0]);
        min_y = min_y.min(p[1]);
        max_y = max_y.max(p[1]);
    }

    // Smallest square lattice with at least k sites; the first k sites in
    // row-major order become seeds.
    let side = (k as f64).sqrt().ceil() as usize;
    let step_x = (max_x - min_x) / side as f64;
    let step_y = (max_y - min_y) / side as f64;

    let sites: Vec<[f64; 2]> = (0..k)
        .map(|c| {
            let row = c / side;
            let col = c % side;
            [
                min_x + step_x * (col as f64 + 0.5),
                min_y + step_y * (row as f64 + 0.5),
            ]
        })
        .collect();

    sites
        .into_par_iter()
        .map(|site| {
            let nearest = nearest_barcode(space, site);
            let position = if snap { space.position(nearest) } else { site };
            ClusterCenter {
                position,
                features: space.features(nearest).to_vec(),
            }
        })
        .collect()
}

/// Index of the barcode spatially closest to `point`.
fn nearest_barcode(space: &BarcodeSpace, point: [f64; 2]) -> usize {
    let mut best = 0usize;
    let mut best_d = f64::INFINITY;
    for (i, p) in space.positions().iter().enumerate() {
        let dx = p[0] - point[0];
        let dy = p[1] - point[1];
        let d = dx * dx + dy * dy;
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

fn random_barcode_centers(space: &BarcodeSpace, k: usize, seed: u64) -> Vec<ClusterCenter> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut ids: Vec<usize> = (0..space.nitems).collect();
    ids.shuffle(&mut rng);

    ids[..k]
        .iter()
        .map(|&i| ClusterCenter {
            position: space.position(i),
            features: space.features(i).to_vec(),
        })
        .collect()
}
