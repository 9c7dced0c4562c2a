//! Distance metrics for barcode-to-center comparisons.
//!
//! Two measures drive the refinement loop:
//! - squared Euclidean distance, used on both feature vectors and 2-D
//!   positions;
//! - the combined SLIC distance, which folds spatial proximity into the
//!   feature distance through the grid interval S and the compactness
//!   weight m.

use crate::core::{SlicError, SlicResult};

/// Inclusive bounds for the compactness weight m.
pub const COMPACTNESS_MIN: f64 = 1.0;
pub const COMPACTNESS_MAX: f64 = 40.0;

/// Sum of squared componentwise differences of two equal-length vectors.
///
/// Fails with `DimensionMismatch` when the lengths differ.
///
/// # Examples
///
/// ```
/// use pixelspace::distance::squared_distance;
///
/// let d = squared_distance(&[0.0, 3.0], &[4.0, 0.0]).unwrap();
/// assert_eq!(d, 25.0);
/// ```
#[inline]
pub fn squared_distance(a: &[f64], b: &[f64]) -> SlicResult<f64> {
    if a.len() != b.len() {
        return Err(SlicError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    Ok(a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum())
}

/// Combined SLIC distance between a cluster center and a barcode.
///
/// `sqrt(d_feat + (d_spatial / s^2) * m^2)` where `d_feat` and `d_spatial`
/// are squared Euclidean distances in feature and position space. Small m
/// favors feature similarity, large m favors spatial compactness.
///
/// Fails with `InvalidParameter` when m lies outside [1, 40] or s is not
/// positive, and with `DimensionMismatch` when the feature vectors differ
/// in length.
#[inline]
pub fn combined_distance(
    center_pos: &[f64; 2],
    center_feat: &[f64],
    point_pos: &[f64; 2],
    point_feat: &[f64],
    s: f64,
    m: f64,
) -> SlicResult<f64> {
    if !(COMPACTNESS_MIN..=COMPACTNESS_MAX).contains(&m) {
        return Err(SlicError::InvalidParameter(format!(
            "compactness m must lie in [{}, {}], got {}",
            COMPACTNESS_MIN, COMPACTNESS_MAX, m
        )));
    }
    if !(s > 0.0) {
        return Err(SlicError::InvalidParameter(format!(
            "grid interval S must be positive, got {}",
            s
        )));
    }

    let d_feat = squared_distance(center_feat, point_feat)?;
    let d_spatial = squared_distance(center_pos, point_pos)?;

    Ok((d_feat + (d_spatial / (s * s)) * (m * m)).sqrt())
}
