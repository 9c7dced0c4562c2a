//! Read-only spatial range index over barcode positions.
//!
//! The index keeps two projections of the same (x, y, id) triples, one
//! sorted ascending by x and one by y. A 2-D window query is answered by
//! running a 1-D closed-interval range query on each projection and
//! intersecting the two hit sets on barcode id.
//!
//! The structure is deliberately narrow: exactly two spatial dimensions,
//! built once from the position table, never mutated afterwards. It is not
//! balanced or depth-bounded like a k-d tree; both queries are binary
//! search plus a bounded scan.

use std::collections::HashSet;

use log::{debug, trace};

use crate::core::{SlicError, SlicResult};

/// Projection axis of the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// One indexed barcode: position plus dense 0-based id.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndexEntry {
    pub x: f64,
    pub y: f64,
    pub id: usize,
}

impl IndexEntry {
    #[inline]
    fn key(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }
}

/// Axis-sorted spatial index with the SLIC grid interval S = sqrt(n / k).
///
/// Built once per clustering run; queried by every pass of the refinement
/// loop. Immutable after construction, so shared references are safe for
/// unlimited concurrent readers.
#[derive(Clone, Debug)]
pub struct SpatialIndex {
    x_sorted: Vec<IndexEntry>,
    y_sorted: Vec<IndexEntry>,
    grid_interval: f64,
}

impl SpatialIndex {
    /// Builds both projections from the position table.
    ///
    /// Fails with `EmptyInput` on an empty table and `InvalidParameter`
    /// when k is outside [1, n].
    pub fn new(positions: &[[f64; 2]], k: usize) -> SlicResult<Self> {
        if positions.is_empty() {
            return Err(SlicError::EmptyInput);
        }
        let n = positions.len();
        if k < 1 || k > n {
            return Err(SlicError::InvalidParameter(format!(
                "cluster count k must lie in [1, {}], got {}",
                n, k
            )));
        }

        let entries: Vec<IndexEntry> = positions
            .iter()
            .enumerate()
            .map(|(id, p)| IndexEntry {
                x: p[0],
                y: p[1],
                id,
            })
            .collect();

        let mut x_sorted = entries.clone();
        x_sorted.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap());
        let mut y_sorted = entries;
        y_sorted.sort_by(|a, b| a.y.partial_cmp(&b.y).unwrap());

        let grid_interval = (n as f64 / k as f64).sqrt();
        debug!(
            "Built SpatialIndex over {} barcodes, k={}, S={:.6}",
            n, k, grid_interval
        );

        Ok(Self {
            x_sorted,
            y_sorted,
            grid_interval,
        })
    }

    /// Expected spacing between centers under uniform density.
    #[inline]
    pub fn grid_interval(&self) -> f64 {
        self.grid_interval
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.x_sorted.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x_sorted.is_empty()
    }

    #[inline]
    fn sorted(&self, axis: Axis) -> &[IndexEntry] {
        match axis {
            Axis::X => &self.x_sorted,
            Axis::Y => &self.y_sorted,
        }
    }

    /// Entries in x order. Exposed for downstream consumers that want the
    /// raw projection (and for verification in tests).
    pub fn x_projection(&self) -> &[IndexEntry] {
        &self.x_sorted
    }

    /// Entries in y order.
    pub fn y_projection(&self) -> &[IndexEntry] {
        &self.y_sorted
    }

    /// Locates the scan start for `key` on the given axis: the index of the
    /// entry at `key`, or of the entry just below it.
    ///
    /// Returns `Ok(None)` when `key` exceeds every stored coordinate (the
    /// query is empty and no scan is needed) and `Ok(Some(0))` when it is
    /// below every stored coordinate. Iterative closed-interval search with
    /// the upper midpoint ceil((i+j)/2); the interval collapsing onto a
    /// bound terminates the search at the lower bound.
    pub(crate) fn lower_start(&self, axis: Axis, key: f64) -> SlicResult<Option<usize>> {
        let entries = self.sorted(axis);
        if entries.is_empty() {
            return Err(SlicError::EmptyInput);
        }

        let last = entries.len() - 1;
        if key < entries[0].key(axis) {
            return Ok(Some(0));
        }
        if key > entries[last].key(axis) {
            return Ok(None);
        }

        let (mut i, mut j) = (0usize, last);
        loop {
            let mid = (i + j + 1) / 2;
            let value = entries[mid].key(axis);
            if value == key {
                return Ok(Some(mid));
            }
            if mid == i || mid == j {
                return Ok(Some(i));
            }
            if key < value {
                j = mid;
            } else {
                i = mid;
            }
        }
    }

    /// All entries whose coordinate on `axis` lies in `[low, high]`
    /// inclusive, in ascending coordinate order.
    ///
    /// The degenerate case `low == high` collects only exact matches.
    /// Fails with `EmptyInput` on an index of zero barcodes.
    pub fn range_query(&self, axis: Axis, low: f64, high: f64) -> SlicResult<Vec<IndexEntry>> {
        let entries = self.sorted(axis);
        if entries.is_empty() {
            return Err(SlicError::EmptyInput);
        }
        if low > high {
            return Ok(Vec::new());
        }

        let mut start = match self.lower_start(axis, low)? {
            Some(idx) => idx,
            None => return Ok(Vec::new()),
        };

        // The search lands on one entry at the key; duplicates of the low
        // bound may sit immediately before it.
        while start > 0 && entries[start - 1].key(axis) >= low {
            start -= 1;
        }
        // A just-below start entry sits under the window; step past it.
        while start < entries.len() && entries[start].key(axis) < low {
            start += 1;
        }

        let mut hits = Vec::new();
        while start < entries.len() && entries[start].key(axis) <= high {
            hits.push(entries[start]);
            start += 1;
        }

        trace!(
            "range_query {:?} [{:.6}, {:.6}] -> {} entries",
            axis,
            low,
            high,
            hits.len()
        );
        Ok(hits)
    }

    /// Barcodes within the 2S half-window of `(x, y)` on both axes: the
    /// intersection, on barcode id, of the two 1-D range queries.
    ///
    /// An empty result is valid (an isolated region with no candidates).
    pub fn region_query(&self, x: f64, y: f64) -> SlicResult<Vec<IndexEntry>> {
        let w = 2.0 * self.grid_interval;
        let x_hits = self.range_query(Axis::X, x - w, x + w)?;
        let y_hits = self.range_query(Axis::Y, y - w, y + w)?;

        let y_ids: HashSet<usize> = y_hits.iter().map(|e| e.id).collect();
        let hits: Vec<IndexEntry> = x_hits.into_iter().filter(|e| y_ids.contains(&e.id)).collect();

        trace!(
            "region_query ({:.6}, {:.6}) w={:.6} -> {} barcodes",
            x,
            y,
            w,
            hits.len()
        );
        Ok(hits)
    }
}
