//! Correlation-based removal of redundant genes.
//!
//! Two genes whose column correlation reaches `1 - threshold` are
//! redundant; the correlated pairs form an undirected graph and one of two
//! policies decides which vertices (genes) to drop:
//!
//! - `Bag`: greedily unions overlapping pairs into bags, keeps one
//!   randomly chosen gene per bag (seeded RNG) and drops the rest;
//! - `ApproxVertexCover`: the classic 2-approximation — walk the edges,
//!   match uncovered endpoint pairs, drop every matched-edge endpoint that
//!   did not make it into the cover. Deterministic and more conservative.

use std::collections::HashSet;

use log::debug;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{PreprocessError, PreprocessResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationMethod {
    Pearson,
    /// Pearson on midrank-transformed columns.
    Spearman,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeepMethod {
    Bag,
    ApproxVertexCover,
}

/// Returns the column indices to keep, ascending. Columns touching no
/// correlated pair always survive.
pub fn select_with_correlation(
    counts: &[Vec<f64>],
    method: CorrelationMethod,
    threshold: f64,
    keep: KeepMethod,
    seed: u64,
) -> PreprocessResult<Vec<usize>> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(PreprocessError::Invalid(format!(
            "correlation threshold must lie in [0, 1], got {}",
            threshold
        )));
    }
    let ncols = counts.first().map(|r| r.len()).unwrap_or(0);
    if ncols < 2 {
        return Ok((0..ncols).collect());
    }

    let columns: Vec<Vec<f64>> = (0..ncols)
        .map(|j| counts.iter().map(|row| row[j]).collect())
        .collect();
    let columns: Vec<Vec<f64>> = match method {
        CorrelationMethod::Pearson => columns,
        CorrelationMethod::Spearman => columns.par_iter().map(|c| midranks(c)).collect(),
    };

    let cutoff = 1.0 - threshold;
    let edges = correlated_pairs(&columns, cutoff);
    debug!(
        "{} correlated gene pairs at r >= {:.3} ({:?})",
        edges.len(),
        cutoff,
        method
    );

    let to_remove = match keep {
        KeepMethod::Bag => bag_removal(&edges, seed),
        KeepMethod::ApproxVertexCover => vertex_cover_removal(&edges),
    };

    Ok((0..ncols).filter(|j| !to_remove.contains(j)).collect())
}

/// Upper-triangle pairs whose Pearson coefficient reaches the cutoff,
/// ordered by (i, j).
fn correlated_pairs(columns: &[Vec<f64>], cutoff: f64) -> Vec<(usize, usize)> {
    let ncols = columns.len();
    let mut edges: Vec<(usize, usize)> = (0..ncols - 1)
        .into_par_iter()
        .flat_map_iter(move |i| {
            ((i + 1)..ncols).filter_map(move |j| {
                let r = pearson(&columns[i], &columns[j]);
                (r >= cutoff).then_some((i, j))
            })
        })
        .collect();
    edges.sort_unstable();
    edges
}

/// Pearson correlation coefficient of two equal-length columns. A
/// zero-variance column correlates with nothing (coefficient 0).
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    if var_a <= 0.0 || var_b <= 0.0 {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

/// Average ranks (midranks for ties), 1-based.
pub fn midranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Ties share the mean of the rank run they occupy.
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    ranks
}

/// Greedy bag construction over the sorted pairs: a pair joins the current
/// bag when its first vertex is already there, otherwise it opens a new
/// bag. One random member per bag survives.
fn bag_removal(edges: &[(usize, usize)], seed: u64) -> HashSet<usize> {
    let mut bags: Vec<HashSet<usize>> = Vec::new();
    for &(x, y) in edges {
        match bags.last_mut() {
            Some(bag) if bag.contains(&x) => {
                bag.insert(y);
            }
            _ => {
                bags.push(HashSet::from([x, y]));
            }
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut to_remove = HashSet::new();
    for bag in bags {
        let mut members: Vec<usize> = bag.into_iter().collect();
        members.sort_unstable();
        let keep = members[rng.gen_range(0..members.len())];
        to_remove.extend(members.into_iter().filter(|&v| v != keep));
    }
    to_remove
}

/// 2-approximate vertex cover: endpoints of a greedy maximal matching stay
/// (they "explain" the correlations); every other endpoint is dropped.
fn vertex_cover_removal(edges: &[(usize, usize)]) -> HashSet<usize> {
    let mut endpoints = HashSet::new();
    let mut covered = HashSet::new();

    for &(a, b) in edges {
        endpoints.insert(a);
        endpoints.insert(b);
        if !covered.contains(&a) && !covered.contains(&b) {
            covered.insert(a);
            covered.insert(b);
        }
    }

    endpoints.difference(&covered).copied().collect()
}
