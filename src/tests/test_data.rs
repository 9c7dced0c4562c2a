//! Shared fixtures for the test suite.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::core::BarcodeSpace;

/// The four-barcode position table used across the spatial index tests:
/// ids 0..4 at (1,7), (4,9), (5,3), (2,2).
pub fn quad_positions() -> Vec<[f64; 2]> {
    vec![[1.0, 7.0], [4.0, 9.0], [5.0, 3.0], [2.0, 2.0]]
}

/// A space over `quad_positions` with small distinct feature rows.
pub fn quad_space() -> BarcodeSpace {
    let rows = vec![
        vec![1.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0],
        vec![0.0, 0.0, 1.0],
        vec![1.0, 1.0, 0.0],
    ];
    BarcodeSpace::new(quad_positions(), &rows).unwrap()
}

/// Two spatially and transcriptionally distinct groups of `n_per` barcodes
/// each: group A near (0, 0) expressing [10, 0], group B near (10, 0)
/// expressing [0, 10]. Gaussian jitter, fixed seed.
pub fn two_blob_space(n_per: usize, seed: u64) -> BarcodeSpace {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let jitter = Normal::new(0.0, 0.25).unwrap();

    let mut positions = Vec::with_capacity(2 * n_per);
    let mut rows = Vec::with_capacity(2 * n_per);

    for &(cx, profile) in &[(0.0, [10.0, 0.0]), (10.0, [0.0, 10.0])] {
        for _ in 0..n_per {
            positions.push([cx + jitter.sample(&mut rng), jitter.sample(&mut rng)]);
            rows.push(vec![
                profile[0] + jitter.sample(&mut rng),
                profile[1] + jitter.sample(&mut rng),
            ]);
        }
    }

    BarcodeSpace::new(positions, &rows).unwrap()
}

/// A single-axis index fixture: barcodes at the given x coordinates, y = 0.
pub fn line_positions(xs: &[f64]) -> Vec<[f64; 2]> {
    xs.iter().map(|&x| [x, 0.0]).collect()
}
