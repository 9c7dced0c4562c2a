//! BarcodeSpace: the shared data model for spatially resolved expression data.
//!
//! This module provides the two abstractions every other module works against:
//!
//! - `BarcodeSpace`: a dense, row-major, zero-copy container pairing each
//!   barcode's 2-D spatial position with its feature vector. Row i of the
//!   feature matrix is the expression profile of barcode id i; ids are dense
//!   and 0-based throughout the crate.
//! - `SlicError`: the crate error type. Structural problems (empty input,
//!   out-of-range parameters, mismatched vector lengths) surface as errors
//!   before any computation runs; numeric edge cases inside the refinement
//!   loop are absorbed locally and never abort a run.
//!
//! Design goals:
//! - Zero-copy access to feature rows for the per-barcode distance loop.
//! - Positions stored separately from features so the spatial index and the
//!   distance metric never pay for data they do not read.

use std::fmt;

use log::{debug, trace};

/// Errors surfaced by index construction, distance evaluation, and the
/// refinement loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SlicError {
    /// A structure or operation was given zero barcodes to work with.
    EmptyInput,
    /// A configuration value is outside its documented domain.
    InvalidParameter(String),
    /// Two vectors that must agree in length do not.
    DimensionMismatch { expected: usize, got: usize },
}

impl fmt::Display for SlicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlicError::EmptyInput => write!(f, "empty input: no barcodes to work with"),
            SlicError::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
            SlicError::DimensionMismatch { expected, got } => {
                write!(f, "dimension mismatch: expected {}, got {}", expected, got)
            }
        }
    }
}

impl std::error::Error for SlicError {}

pub type SlicResult<T> = Result<T, SlicError>;

/// Dense container of n barcodes: per-barcode 2-D position plus a row-major
/// n x f feature matrix.
///
/// # Examples
///
/// ```
/// use pixelspace::core::BarcodeSpace;
///
/// let positions = vec![[0.0, 0.0], [1.0, 1.0]];
/// let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
/// let space = BarcodeSpace::new(positions, &rows).unwrap();
///
/// assert_eq!(space.nitems, 2);
/// assert_eq!(space.features(1), &[3.0, 4.0]);
/// assert_eq!(space.position(0), [0.0, 0.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BarcodeSpace {
    positions: Vec<[f64; 2]>,
    data: Vec<f64>,
    pub nitems: usize,
    pub nfeatures: usize,
}

impl BarcodeSpace {
    /// Builds a space from a position table and per-barcode feature rows.
    ///
    /// Row i must be the feature vector of the barcode at `positions[i]`.
    /// Fails with `EmptyInput` on zero barcodes, `DimensionMismatch` when
    /// the position table and the matrix disagree in length or the rows are
    /// ragged.
    pub fn new(positions: Vec<[f64; 2]>, rows: &[Vec<f64>]) -> SlicResult<Self> {
        if positions.is_empty() || rows.is_empty() {
            return Err(SlicError::EmptyInput);
        }
        if positions.len() != rows.len() {
            return Err(SlicError::DimensionMismatch {
                expected: positions.len(),
                got: rows.len(),
            });
        }

        let nitems = rows.len();
        let nfeatures = rows[0].len();

        let mut data = Vec::with_capacity(nitems * nfeatures);
        for row in rows {
            if row.len() != nfeatures {
                return Err(SlicError::DimensionMismatch {
                    expected: nfeatures,
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }

        debug!(
            "Created BarcodeSpace with {} barcodes, {} features",
            nitems, nfeatures
        );

        Ok(Self {
            positions,
            data,
            nitems,
            nfeatures,
        })
    }

    /// Builds a space from an already-flattened row-major matrix.
    ///
    /// Used by the preprocessing pipeline, which produces flat data anyway.
    pub fn from_flat(
        positions: Vec<[f64; 2]>,
        data: Vec<f64>,
        nfeatures: usize,
    ) -> SlicResult<Self> {
        if positions.is_empty() {
            return Err(SlicError::EmptyInput);
        }
        if nfeatures == 0 || data.len() != positions.len() * nfeatures {
            return Err(SlicError::DimensionMismatch {
                expected: positions.len() * nfeatures.max(1),
                got: data.len(),
            });
        }
        let nitems = positions.len();
        Ok(Self {
            positions,
            data,
            nitems,
            nfeatures,
        })
    }

    /// Zero-copy view of barcode i's feature vector.
    ///
    /// # Panics
    ///
    /// Panics on an out-of-bounds barcode id.
    #[inline]
    pub fn features(&self, i: usize) -> &[f64] {
        let start = i * self.nfeatures;
        &self.data[start..start + self.nfeatures]
    }

    /// Spatial position of barcode i.
    #[inline]
    pub fn position(&self, i: usize) -> [f64; 2] {
        self.positions[i]
    }

    /// The full position table, in barcode-id order.
    #[inline]
    pub fn positions(&self) -> &[[f64; 2]] {
        &self.positions
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nitems == 0
    }

    /// Iterator over (id, position, features) triples in id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, [f64; 2], &[f64])> + '_ {
        trace!("Iterating {} barcodes", self.nitems);
        (0..self.nitems).map(move |i| (i, self.positions[i], self.features(i)))
    }
}
