//! Barcode (row) and gene (column) quality metrics and filtering.
//!
//! Filtering happens in two layers per entity, in this order:
//! - absolute: a metric value must lie inside configured [min, max] bounds;
//! - relative: only the top and/or bottom percent of entities by a metric
//!   survive.
//!
//! Relative filters are applied one metric at a time on the survivors of
//! the previous one; survivors keep their original order, so barcode ids
//! stay aligned with the position table.

use std::collections::HashMap;

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{PreprocessError, PreprocessResult};

/// Per-barcode quality metrics, computed over the barcode's count row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BarcodeMetric {
    /// Number of genes with a nonzero count.
    CountedGenes,
    /// Sum of all counts.
    TotalCounts,
    /// Population variance of the counts.
    Variance,
    /// Mean absolute deviation of the counts.
    MeanAbsoluteDeviation,
    /// Arithmetic over geometric mean of counts + 1.
    Dispersion,
}

/// Per-gene quality metrics, computed over the gene's count column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GeneMetric {
    /// Number of barcodes in which the gene was measured.
    BarcodesCounted,
    /// Sum of the gene's counts across barcodes.
    TotalMeasures,
    Variance,
    MeanAbsoluteDeviation,
    Dispersion,
}

// ---------------------------------------------------------------------------
// metric kernels
// ---------------------------------------------------------------------------

#[inline]
fn total(values: &[f64]) -> f64 {
    values.iter().sum()
}

#[inline]
fn count_measured(values: &[f64]) -> f64 {
    values.iter().filter(|&&v| v > 0.0).count() as f64
}

fn variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = total(values) / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

fn mean_absolute_deviation(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = total(values) / n;
    values.iter().map(|v| (v - mean).abs()).sum::<f64>() / n
}

/// Ratio of arithmetic to geometric mean, on counts shifted by one so
/// zeros stay defined.
fn dispersion_ratio(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let shifted: Vec<f64> = values.iter().map(|v| v + 1.0).collect();
    let arithmetic = total(&shifted) / n;
    let geometric = (shifted.iter().map(|v| v.ln()).sum::<f64>() / n).exp();
    arithmetic / geometric
}

pub fn barcode_metric_value(metric: BarcodeMetric, row: &[f64]) -> f64 {
    match metric {
        BarcodeMetric::CountedGenes => count_measured(row),
        BarcodeMetric::TotalCounts => total(row),
        BarcodeMetric::Variance => variance(row),
        BarcodeMetric::MeanAbsoluteDeviation => mean_absolute_deviation(row),
        BarcodeMetric::Dispersion => dispersion_ratio(row),
    }
}

pub fn gene_metric_value(metric: GeneMetric, column: &[f64]) -> f64 {
    match metric {
        GeneMetric::BarcodesCounted => count_measured(column),
        GeneMetric::TotalMeasures => total(column),
        GeneMetric::Variance => variance(column),
        GeneMetric::MeanAbsoluteDeviation => mean_absolute_deviation(column),
        GeneMetric::Dispersion => dispersion_ratio(column),
    }
}

// ---------------------------------------------------------------------------
// filtering
// ---------------------------------------------------------------------------

/// Indices of barcodes (rows) surviving absolute then relative filtering,
/// in ascending (original) order.
pub fn filter_barcodes(
    counts: &[Vec<f64>],
    min: &HashMap<BarcodeMetric, f64>,
    max: &HashMap<BarcodeMetric, f64>,
    top: &HashMap<BarcodeMetric, f64>,
    bottom: &HashMap<BarcodeMetric, f64>,
) -> PreprocessResult<Vec<usize>> {
    let values = |metric: BarcodeMetric, kept: &[usize]| -> Vec<f64> {
        kept.par_iter()
            .map(|&i| barcode_metric_value(metric, &counts[i]))
            .collect()
    };
    run_filters(counts.len(), min, max, top, bottom, values)
}

/// Indices of genes (columns) surviving absolute then relative filtering.
pub fn filter_genes(
    counts: &[Vec<f64>],
    min: &HashMap<GeneMetric, f64>,
    max: &HashMap<GeneMetric, f64>,
    top: &HashMap<GeneMetric, f64>,
    bottom: &HashMap<GeneMetric, f64>,
) -> PreprocessResult<Vec<usize>> {
    let ncols = counts.first().map(|r| r.len()).unwrap_or(0);
    let values = |metric: GeneMetric, kept: &[usize]| -> Vec<f64> {
        kept.par_iter()
            .map(|&j| {
                let column: Vec<f64> = counts.iter().map(|row| row[j]).collect();
                gene_metric_value(metric, &column)
            })
            .collect()
    };
    run_filters(ncols, min, max, top, bottom, values)
}

/// Shared driver over an entity axis of size n. `values(metric, kept)`
/// yields the metric value for each surviving entity, kept-order aligned.
fn run_filters<M, F>(
    n: usize,
    min: &HashMap<M, f64>,
    max: &HashMap<M, f64>,
    top: &HashMap<M, f64>,
    bottom: &HashMap<M, f64>,
    values: F,
) -> PreprocessResult<Vec<usize>>
where
    M: Copy + Ord + std::hash::Hash + std::fmt::Debug,
    F: Fn(M, &[usize]) -> Vec<f64>,
{
    let mut kept: Vec<usize> = (0..n).collect();

    // Absolute bounds first: cheap, and they shrink the relative pools.
    let mut absolute: Vec<M> = min.keys().chain(max.keys()).copied().collect();
    absolute.sort();
    absolute.dedup();

    for metric in absolute {
        let vals = values(metric, &kept);
        let lo = min.get(&metric).copied().unwrap_or(f64::NEG_INFINITY);
        let hi = max.get(&metric).copied().unwrap_or(f64::INFINITY);
        let before = kept.len();
        kept = kept
            .into_iter()
            .zip(vals)
            .filter(|(_, v)| *v >= lo && *v <= hi)
            .map(|(i, _)| i)
            .collect();
        debug!(
            "Absolute filter {:?} [{:.3}, {:.3}]: {} -> {}",
            metric,
            lo,
            hi,
            before,
            kept.len()
        );
    }

    // Relative percent filters, one metric at a time.
    let mut relative: Vec<M> = top.keys().chain(bottom.keys()).copied().collect();
    relative.sort();
    relative.dedup();

    for metric in relative {
        let top_pct = top.get(&metric).copied();
        let bottom_pct = bottom.get(&metric).copied();
        for pct in [top_pct, bottom_pct].into_iter().flatten() {
            if !(pct > 0.0 && pct <= 100.0) {
                return Err(PreprocessError::Invalid(format!(
                    "relative threshold for {:?} must lie in (0, 100], got {}",
                    metric, pct
                )));
            }
        }

        let vals = values(metric, &kept);
        let before = kept.len();
        kept = subset_by_rank(kept, &vals, top_pct, bottom_pct);
        debug!(
            "Relative filter {:?} top={:?} bottom={:?}: {} -> {}",
            metric,
            top_pct,
            bottom_pct,
            before,
            kept.len()
        );
    }

    Ok(kept)
}

/// Keeps the top and/or bottom percent of `kept` ranked by `vals`,
/// restoring original order afterwards.
fn subset_by_rank(
    kept: Vec<usize>,
    vals: &[f64],
    top_pct: Option<f64>,
    bottom_pct: Option<f64>,
) -> Vec<usize> {
    let n = kept.len();
    if n == 0 {
        return kept;
    }

    // Rank positions of `kept` by metric value, descending.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| vals[b].partial_cmp(&vals[a]).unwrap_or(std::cmp::Ordering::Equal));

    let take = |pct: f64| ((pct / 100.0) * n as f64).ceil() as usize;

    let mut chosen = vec![false; n];
    if let Some(pct) = top_pct {
        for &pos in order.iter().take(take(pct).min(n)) {
            chosen[pos] = true;
        }
    }
    if let Some(pct) = bottom_pct {
        for &pos in order.iter().rev().take(take(pct).min(n)) {
            chosen[pos] = true;
        }
    }

    kept.into_iter()
        .zip(chosen)
        .filter(|(_, keep)| *keep)
        .map(|(i, _)| i)
        .collect()
}
