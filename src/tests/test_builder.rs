//! End-to-end tests for `SlicBuilder`: validation, defaults, determinism,
//! and the full pipeline over small datasets.

use log::debug;
use serial_test::serial;

use crate::builder::SlicBuilder;
use crate::core::{BarcodeSpace, SlicError};
use crate::seeding::SeedingStrategy;
use crate::tests::test_data::{quad_space, two_blob_space};

#[test]
fn test_build_requires_cluster_count() {
    let space = quad_space();
    let err = SlicBuilder::new().build(&space).unwrap_err();
    assert!(matches!(err, SlicError::InvalidParameter(_)));
}

#[test]
fn test_build_rejects_k_out_of_range() {
    let space = quad_space();
    for k in [0, 5] {
        let err = SlicBuilder::new().with_clusters(k).build(&space).unwrap_err();
        assert!(matches!(err, SlicError::InvalidParameter(_)), "k={}", k);
    }
}

#[test]
fn test_build_rejects_bad_compactness() {
    let space = quad_space();
    for m in [0.0, 0.99, 40.5] {
        let err = SlicBuilder::new()
            .with_clusters(2)
            .with_compactness(m)
            .build(&space)
            .unwrap_err();
        assert!(matches!(err, SlicError::InvalidParameter(_)), "m={}", m);
    }
}

#[test]
fn test_build_rejects_negative_threshold() {
    let space = quad_space();
    let err = SlicBuilder::new()
        .with_clusters(2)
        .with_convergence_threshold(-0.5)
        .build(&space)
        .unwrap_err();
    assert!(matches!(err, SlicError::InvalidParameter(_)));
}

#[test]
fn test_build_rejects_zero_iteration_cap() {
    let space = quad_space();
    let err = SlicBuilder::new()
        .with_clusters(2)
        .with_max_iterations(0)
        .build(&space)
        .unwrap_err();
    assert!(matches!(err, SlicError::InvalidParameter(_)));
}

#[test]
fn test_build_quad_space_all_k() {
    crate::tests::init();

    let space = quad_space();
    for k in 1..=space.nitems {
        let output = SlicBuilder::new().with_clusters(k).build(&space).unwrap();
        debug!("k={}: labels {:?}", k, output.labels);
        assert_eq!(output.labels.len(), space.nitems);
        assert!(output.labels.iter().all(|&l| l < k));
        assert!(output.iterations >= 1);
    }
}

#[test]
#[serial]
fn test_build_separates_blobs_with_grid_seeding() {
    crate::tests::init();

    let space = two_blob_space(20, 5);
    let output = SlicBuilder::new()
        .with_clusters(2)
        .with_compactness(5.0)
        .build(&space)
        .unwrap();

    let (a, b) = (output.labels[0], output.labels[20]);
    assert_ne!(a, b);
    assert!(output.labels[..20].iter().all(|&l| l == a));
    assert!(output.labels[20..].iter().all(|&l| l == b));
}

#[test]
fn test_random_seeding_is_reproducible() {
    let space = two_blob_space(15, 17);

    let run = |seed: u64| {
        SlicBuilder::new()
            .with_clusters(4)
            .with_seeding(SeedingStrategy::RandomBarcodes)
            .with_seed(seed)
            .build(&space)
            .unwrap()
    };

    let first = run(42);
    let second = run(42);
    assert_eq!(first.labels, second.labels);
    assert_eq!(first.iterations, second.iterations);
}

#[test]
fn test_grid_snap_seeding_runs() {
    let space = two_blob_space(10, 23);
    let output = SlicBuilder::new()
        .with_clusters(3)
        .with_seeding(SeedingStrategy::GridSnap)
        .build(&space)
        .unwrap();
    assert!(output.labels.iter().all(|&l| l < 3));
}

#[test]
fn test_builder_flags_roundtrip() {
    let space = two_blob_space(10, 29);
    let output = SlicBuilder::new()
        .with_clusters(2)
        .with_compactness(1.0)
        .with_convergence_threshold(0.01)
        .with_max_iterations(50)
        .with_best_distance_persistence(true)
        .build(&space)
        .unwrap();
    assert!(output.iterations <= 50);
    assert!(output.labels.iter().all(|&l| l < 2));
}

#[test]
fn test_build_on_empty_space_fails() {
    let err = BarcodeSpace::new(Vec::new(), &[]).unwrap_err();
    assert_eq!(err, SlicError::EmptyInput);
}

#[test]
fn test_output_reports_convergence_state() {
    let space = two_blob_space(10, 31);

    // A generous cap converges on this tiny dataset.
    let relaxed = SlicBuilder::new().with_clusters(2).build(&space).unwrap();
    assert!(relaxed.converged);

    // An impossible threshold with a one-pass cap cannot.
    let capped = SlicBuilder::new()
        .with_clusters(2)
        .with_convergence_threshold(0.0)
        .with_max_iterations(1)
        .with_seeding(SeedingStrategy::RandomBarcodes)
        .build(&space)
        .unwrap();
    assert_eq!(capped.iterations, 1);
    assert_eq!(capped.labels.len(), space.nitems);
}
