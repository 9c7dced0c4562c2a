//! Coordinate scaling, count transforms, and PCA.

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smartcore::decomposition::pca::{PCAParameters, PCA};
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;

use super::{PreprocessError, PreprocessResult};

/// Count transform applied column-wise (except the logs, which are
/// element-wise).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transformation {
    /// Natural log of count + 1.
    Log,
    /// Base-10 log of count + 1.
    Log10,
    /// Per-gene mean 0 / variance 1.
    Standardize,
    /// Per-gene median removal and interquartile-range scaling.
    RobustScale,
}

/// Min-max scales both coordinate axes to [0, 1] in place. A degenerate
/// axis (all positions equal) collapses to 0.
pub fn scale_coordinates(positions: &mut [[f64; 2]]) {
    for axis in 0..2 {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for p in positions.iter() {
            lo = lo.min(p[axis]);
            hi = hi.max(p[axis]);
        }
        let span = hi - lo;
        for p in positions.iter_mut() {
            p[axis] = if span > 0.0 { (p[axis] - lo) / span } else { 0.0 };
        }
    }
    debug!("Scaled {} positions to the unit square", positions.len());
}

/// Applies the transform to the count matrix in place.
pub fn apply(rows: &mut Vec<Vec<f64>>, transformation: Transformation) {
    match transformation {
        Transformation::Log => {
            rows.par_iter_mut()
                .for_each(|row| row.iter_mut().for_each(|v| *v = v.ln_1p()));
        }
        Transformation::Log10 => {
            rows.par_iter_mut()
                .for_each(|row| row.iter_mut().for_each(|v| *v = (*v + 1.0).log10()));
        }
        Transformation::Standardize => {
            let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
            let n = rows.len() as f64;
            for j in 0..ncols {
                let mean = rows.iter().map(|r| r[j]).sum::<f64>() / n;
                let var = rows.iter().map(|r| (r[j] - mean) * (r[j] - mean)).sum::<f64>() / n;
                let std = var.sqrt();
                for row in rows.iter_mut() {
                    row[j] = if std > 0.0 { (row[j] - mean) / std } else { 0.0 };
                }
            }
        }
        Transformation::RobustScale => {
            let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
            for j in 0..ncols {
                let mut column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
                column.sort_by(|a, b| a.partial_cmp(b).unwrap());
                let median = percentile(&column, 0.5);
                let iqr = percentile(&column, 0.75) - percentile(&column, 0.25);
                for row in rows.iter_mut() {
                    row[j] = if iqr > 0.0 {
                        (row[j] - median) / iqr
                    } else {
                        row[j] - median
                    };
                }
            }
        }
    }
    debug!("Applied {:?} transform", transformation);
}

/// Linear-interpolated percentile of an ascending-sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Reduces the gene space to `components` principal components.
///
/// The component count is capped at the matrix's column count; asking for
/// more is not an error, just a no-op cap.
pub fn pca(rows: &[Vec<f64>], components: usize) -> PreprocessResult<Vec<Vec<f64>>> {
    if rows.is_empty() {
        return Err(PreprocessError::Invalid(
            "PCA on an empty matrix".to_string(),
        ));
    }
    let (n, f) = (rows.len(), rows[0].len());
    let components = components.min(f);
    if components == 0 {
        return Err(PreprocessError::Invalid(
            "PCA needs at least one component".to_string(),
        ));
    }

    debug!("PCA: {} x {} -> {} components", n, f, components);

    let x: DenseMatrix<f64> =
        DenseMatrix::from_iterator(rows.iter().flatten().copied(), n, f, 1);

    let model = PCA::fit(&x, PCAParameters::default().with_n_components(components))
        .map_err(|e| PreprocessError::Invalid(format!("PCA fit failed: {}", e)))?;
    let reduced = model
        .transform(&x)
        .map_err(|e| PreprocessError::Invalid(format!("PCA transform failed: {}", e)))?;

    let (out_rows, _) = reduced.shape();
    Ok((0..out_rows)
        .map(|i| reduced.get_row(i).iterator(0).copied().collect())
        .collect())
}
