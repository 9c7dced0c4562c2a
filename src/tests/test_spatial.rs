//! Tests for the spatial range index: projections, binary search, range
//! and region queries.

use approx::assert_relative_eq;
use log::debug;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::SlicError;
use crate::spatial::{Axis, SpatialIndex};
use crate::tests::test_data::{line_positions, quad_positions};

fn line_index(xs: &[f64]) -> SpatialIndex {
    SpatialIndex::new(&line_positions(xs), 1).unwrap()
}

// -------------------- construction and projections --------------------

#[test]
fn test_empty_positions_rejected() {
    let err = SpatialIndex::new(&[], 1).unwrap_err();
    assert_eq!(err, SlicError::EmptyInput);
}

#[test]
fn test_k_out_of_range_rejected() {
    let positions = quad_positions();
    for k in [0, 5] {
        let err = SpatialIndex::new(&positions, k).unwrap_err();
        assert!(matches!(err, SlicError::InvalidParameter(_)), "k={}", k);
    }
}

#[test]
fn test_x_projection_order() {
    let index = SpatialIndex::new(&quad_positions(), 4).unwrap();
    let got: Vec<(f64, f64, usize)> = index
        .x_projection()
        .iter()
        .map(|e| (e.x, e.y, e.id))
        .collect();
    assert_eq!(
        got,
        vec![(1.0, 7.0, 0), (2.0, 2.0, 3), (4.0, 9.0, 1), (5.0, 3.0, 2)]
    );
}

#[test]
fn test_y_projection_order() {
    let index = SpatialIndex::new(&quad_positions(), 4).unwrap();
    let got: Vec<(f64, f64, usize)> = index
        .y_projection()
        .iter()
        .map(|e| (e.x, e.y, e.id))
        .collect();
    assert_eq!(
        got,
        vec![(2.0, 2.0, 3), (5.0, 3.0, 2), (1.0, 7.0, 0), (4.0, 9.0, 1)]
    );
}

#[test]
fn test_grid_interval_formula() {
    let index = SpatialIndex::new(&quad_positions(), 2).unwrap();
    assert_relative_eq!(index.grid_interval(), (4.0_f64 / 2.0).sqrt());
}

#[test]
fn test_projections_are_permutations() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let positions: Vec<[f64; 2]> = (0..50)
        .map(|_| [rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0)])
        .collect();

    let index = SpatialIndex::new(&positions, 5).unwrap();

    for (projection, axis) in [(index.x_projection(), Axis::X), (index.y_projection(), Axis::Y)] {
        // Ascending on the projection's own coordinate.
        for pair in projection.windows(2) {
            let (a, b) = match axis {
                Axis::X => (pair[0].x, pair[1].x),
                Axis::Y => (pair[0].y, pair[1].y),
            };
            assert!(a <= b, "{:?} projection out of order", axis);
        }

        // Every barcode appears exactly once, with its own coordinates.
        let mut ids: Vec<usize> = projection.iter().map(|e| e.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..positions.len()).collect::<Vec<_>>());
        for entry in projection {
            assert_eq!([entry.x, entry.y], positions[entry.id]);
        }
    }
}

// -------------------- binary search --------------------

#[test]
fn test_search_single_element() {
    let index = line_index(&[10.0]);
    assert_eq!(index.lower_start(Axis::X, 2.0).unwrap(), Some(0));
    assert_eq!(index.lower_start(Axis::X, 10.0).unwrap(), Some(0));
    assert_eq!(index.lower_start(Axis::X, 15.0).unwrap(), None);
}

#[test]
fn test_search_two_elements() {
    let index = line_index(&[10.0, 15.0]);
    assert_eq!(index.lower_start(Axis::X, 2.0).unwrap(), Some(0));
    assert_eq!(index.lower_start(Axis::X, 10.0).unwrap(), Some(0));
    assert_eq!(index.lower_start(Axis::X, 12.0).unwrap(), Some(0));
    assert_eq!(index.lower_start(Axis::X, 15.0).unwrap(), Some(1));
    assert_eq!(index.lower_start(Axis::X, 20.0).unwrap(), None);
}

#[test]
fn test_search_three_elements() {
    let index = line_index(&[0.0, 10.0, 15.0]);
    assert_eq!(index.lower_start(Axis::X, -5.0).unwrap(), Some(0));
    assert_eq!(index.lower_start(Axis::X, 0.0).unwrap(), Some(0));
    assert_eq!(index.lower_start(Axis::X, 5.0).unwrap(), Some(0));
    assert_eq!(index.lower_start(Axis::X, 10.0).unwrap(), Some(1));
    assert_eq!(index.lower_start(Axis::X, 12.0).unwrap(), Some(1));
    assert_eq!(index.lower_start(Axis::X, 15.0).unwrap(), Some(2));
    assert_eq!(index.lower_start(Axis::X, 18.0).unwrap(), None);
}

#[test]
fn test_search_on_y_axis() {
    let positions: Vec<[f64; 2]> = [5.0, 10.0, 15.0].iter().map(|&y| [0.0, y]).collect();
    let index = SpatialIndex::new(&positions, 1).unwrap();
    assert_eq!(index.lower_start(Axis::Y, 2.0).unwrap(), Some(0));
    assert_eq!(index.lower_start(Axis::Y, 10.0).unwrap(), Some(1));
    assert_eq!(index.lower_start(Axis::Y, 12.0).unwrap(), Some(1));
    assert_eq!(index.lower_start(Axis::Y, 18.0).unwrap(), None);
}

// -------------------- range queries --------------------

#[test]
fn test_range_query_interior_window() {
    let index = line_index(&[2.0, 4.0, 6.0]);
    let hits = index.range_query(Axis::X, 3.0, 5.0).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!((hits[0].x, hits[0].y, hits[0].id), (4.0, 0.0, 1));
}

#[test]
fn test_range_query_inclusive_bounds() {
    let index = line_index(&[2.0, 4.0, 6.0]);
    let hits = index.range_query(Axis::X, 2.0, 6.0).unwrap();
    assert_eq!(hits.iter().map(|e| e.id).collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[test]
fn test_range_query_exact_match_window() {
    let index = line_index(&[2.0, 4.0, 6.0]);
    let hits = index.range_query(Axis::X, 4.0, 4.0).unwrap();
    assert_eq!(hits.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1]);
}

#[test]
fn test_range_query_boundary_ties() {
    // Three barcodes share the low-bound coordinate; all must be returned.
    let index = line_index(&[1.0, 5.0, 5.0, 5.0, 9.0]);
    let hits = index.range_query(Axis::X, 5.0, 5.0).unwrap();
    let mut ids: Vec<usize> = hits.iter().map(|e| e.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3]);

    let hits = index.range_query(Axis::X, 5.0, 9.0).unwrap();
    assert_eq!(hits.len(), 4);
}

#[test]
fn test_range_query_below_all() {
    let index = line_index(&[2.0, 4.0, 6.0]);
    let hits = index.range_query(Axis::X, -10.0, 3.0).unwrap();
    assert_eq!(hits.iter().map(|e| e.id).collect::<Vec<_>>(), vec![0]);
}

#[test]
fn test_range_query_above_all_is_empty() {
    let index = line_index(&[2.0, 4.0, 6.0]);
    assert!(index.range_query(Axis::X, 10.0, 20.0).unwrap().is_empty());
}

#[test]
fn test_range_query_window_under_all_is_empty() {
    let index = line_index(&[2.0, 4.0, 6.0]);
    assert!(index.range_query(Axis::X, -5.0, 0.0).unwrap().is_empty());
}

#[test]
fn test_range_query_inverted_window_is_empty() {
    let index = line_index(&[2.0, 4.0, 6.0]);
    assert!(index.range_query(Axis::X, 5.0, 3.0).unwrap().is_empty());
}

#[test]
fn test_range_query_matches_linear_scan() {
    crate::tests::init();

    let mut rng = ChaCha8Rng::seed_from_u64(21);
    let positions: Vec<[f64; 2]> = (0..80)
        .map(|_| [rng.gen_range(0.0..20.0), rng.gen_range(0.0..20.0)])
        .collect();
    let index = SpatialIndex::new(&positions, 8).unwrap();

    for _ in 0..50 {
        let a = rng.gen_range(-2.0..22.0);
        let b = rng.gen_range(-2.0..22.0);
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        let mut got: Vec<usize> = index
            .range_query(Axis::X, low, high)
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        got.sort_unstable();

        let expected: Vec<usize> = (0..positions.len())
            .filter(|&i| positions[i][0] >= low && positions[i][0] <= high)
            .collect();

        debug!("window [{:.3}, {:.3}] -> {} hits", low, high, got.len());
        assert_eq!(got, expected);
    }
}

// -------------------- region queries --------------------

#[test]
fn test_region_query_includes_own_position() {
    let positions = quad_positions();
    let index = SpatialIndex::new(&positions, 4).unwrap();

    for (id, p) in positions.iter().enumerate() {
        let hits = index.region_query(p[0], p[1]).unwrap();
        assert!(
            hits.iter().any(|e| e.id == id),
            "barcode {} missing from its own region",
            id
        );
    }
}

#[test]
fn test_region_query_isolated_region_is_empty() {
    let index = SpatialIndex::new(&quad_positions(), 4).unwrap();
    // S = 1, so the window at (100, 100) spans [98, 102] on both axes.
    assert!(index.region_query(100.0, 100.0).unwrap().is_empty());
}

#[test]
fn test_region_query_intersects_both_axes() {
    // One barcode close in x but far in y, one close in both.
    let positions = vec![[0.0, 0.0], [0.5, 50.0], [0.5, 0.5]];
    let index = SpatialIndex::new(&positions, 3).unwrap();
    // S = 1: window spans +-2 around the query point on each axis.
    let ids: Vec<usize> = index
        .region_query(0.0, 0.0)
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect();
    assert!(ids.contains(&0));
    assert!(ids.contains(&2));
    assert!(!ids.contains(&1), "id 1 is outside the y window");
}

#[test]
fn test_region_query_entries_carry_positions() {
    let positions = quad_positions();
    let index = SpatialIndex::new(&positions, 4).unwrap();
    for entry in index.region_query(2.0, 3.0).unwrap() {
        assert_eq!([entry.x, entry.y], positions[entry.id]);
    }
}
