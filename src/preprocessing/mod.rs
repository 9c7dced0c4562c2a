//! Preprocessing pipeline: delimited input to a clean `BarcodeSpace`.
//!
//! The clustering core is agnostic to feature semantics; this module does
//! the ordinary wrangling that produces its inputs: ingestion, barcode and
//! gene quality filtering by absolute and relative thresholds, removal of
//! redundant (correlated) genes, coordinate scaling, count transforms, and
//! PCA. Every stage is optional and driven by `PreprocessConfig`.

pub mod filter;
pub mod ingest;
pub mod select;
pub mod transform;

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::core::BarcodeSpace;
use self::filter::{BarcodeMetric, GeneMetric};
use self::select::{CorrelationMethod, KeepMethod};
use self::transform::Transformation;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug)]
pub enum PreprocessError {
    Io(String),
    Csv(String),
    Parse(String),
    Invalid(String),
}

impl std::fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessError::Io(e) => write!(f, "IO error: {}", e),
            PreprocessError::Csv(e) => write!(f, "CSV error: {}", e),
            PreprocessError::Parse(e) => write!(f, "Parse error: {}", e),
            PreprocessError::Invalid(e) => write!(f, "Invalid: {}", e),
        }
    }
}

impl std::error::Error for PreprocessError {}

pub type PreprocessResult<T> = Result<T, PreprocessError>;

// ============================================================================
// Configuration
// ============================================================================

/// Correlation-based redundant-gene removal settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrelationConfig {
    pub method: CorrelationMethod,
    /// Genes whose correlation reaches `1 - threshold` are redundant.
    pub threshold: f64,
    pub keep: KeepMethod,
}

/// Full pipeline configuration. The default runs ingestion only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Field delimiter of the input file.
    pub delimiter: u8,
    /// Skip a leading label column before the barcode tag.
    pub skip_first_column: bool,

    /// Absolute per-metric lower bounds on barcodes.
    pub barcode_min: HashMap<BarcodeMetric, f64>,
    /// Absolute per-metric upper bounds on barcodes.
    pub barcode_max: HashMap<BarcodeMetric, f64>,
    /// Keep only this percent of barcodes with the highest metric value.
    pub barcode_top: HashMap<BarcodeMetric, f64>,
    /// Keep only this percent of barcodes with the lowest metric value.
    pub barcode_bottom: HashMap<BarcodeMetric, f64>,

    pub gene_min: HashMap<GeneMetric, f64>,
    pub gene_max: HashMap<GeneMetric, f64>,
    pub gene_top: HashMap<GeneMetric, f64>,
    pub gene_bottom: HashMap<GeneMetric, f64>,

    pub correlation: Option<CorrelationConfig>,
    /// Min-max scale coordinates to [0, 1].
    pub scale_coordinates: bool,
    pub transformation: Option<Transformation>,
    /// Reduce the gene space to this many principal components.
    pub pca_components: Option<usize>,

    /// RNG seed for the seeded keep policy.
    pub seed: u64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            skip_first_column: true,
            barcode_min: HashMap::new(),
            barcode_max: HashMap::new(),
            barcode_top: HashMap::new(),
            barcode_bottom: HashMap::new(),
            gene_min: HashMap::new(),
            gene_max: HashMap::new(),
            gene_top: HashMap::new(),
            gene_bottom: HashMap::new(),
            correlation: None,
            scale_coordinates: true,
            transformation: None,
            pca_components: None,
            seed: 128,
        }
    }
}

/// Pipeline output: the clustering input plus the surviving identifiers.
#[derive(Clone, Debug)]
pub struct PreprocessOutput {
    pub space: BarcodeSpace,
    /// Barcode tags, in barcode-id order.
    pub barcodes: Vec<String>,
    /// Gene names of the surviving columns; empty after PCA, which
    /// replaces genes with components.
    pub genes: Vec<String>,
}

/// Runs the full pipeline on a delimited file.
pub fn load_and_preprocess<P: AsRef<Path>>(
    path: P,
    config: &PreprocessConfig,
) -> PreprocessResult<PreprocessOutput> {
    let raw = ingest::read_delimited(path.as_ref(), config.delimiter, config.skip_first_column)?;
    info!(
        "Loaded {} barcodes x {} genes from {}",
        raw.counts.len(),
        raw.genes.len(),
        path.as_ref().display()
    );

    let mut barcodes = raw.barcodes;
    let mut positions = raw.positions;
    let mut counts = raw.counts;
    let mut genes = raw.genes;

    // Row (barcode) filtering, absolute then relative.
    let kept_rows = filter::filter_barcodes(
        &counts,
        &config.barcode_min,
        &config.barcode_max,
        &config.barcode_top,
        &config.barcode_bottom,
    )?;
    if kept_rows.len() != counts.len() {
        debug!("Barcode filtering: {} -> {}", counts.len(), kept_rows.len());
        barcodes = kept_rows.iter().map(|&i| barcodes[i].clone()).collect();
        positions = kept_rows.iter().map(|&i| positions[i]).collect();
        counts = kept_rows.iter().map(|&i| counts[i].clone()).collect();
    }
    if counts.is_empty() {
        return Err(PreprocessError::Invalid(
            "no barcodes survived filtering".to_string(),
        ));
    }

    // Column (gene) filtering.
    let kept_cols = filter::filter_genes(
        &counts,
        &config.gene_min,
        &config.gene_max,
        &config.gene_top,
        &config.gene_bottom,
    )?;
    if kept_cols.len() != genes.len() {
        debug!("Gene filtering: {} -> {}", genes.len(), kept_cols.len());
        genes = kept_cols.iter().map(|&j| genes[j].clone()).collect();
        counts = project_columns(&counts, &kept_cols);
    }
    if genes.is_empty() {
        return Err(PreprocessError::Invalid(
            "no genes survived filtering".to_string(),
        ));
    }

    // Redundant-gene removal.
    if let Some(corr) = &config.correlation {
        let kept = select::select_with_correlation(
            &counts,
            corr.method,
            corr.threshold,
            corr.keep,
            config.seed,
        )?;
        if kept.len() != genes.len() {
            debug!("Correlation selection: {} -> {}", genes.len(), kept.len());
            genes = kept.iter().map(|&j| genes[j].clone()).collect();
            counts = project_columns(&counts, &kept);
        }
    }

    if config.scale_coordinates {
        transform::scale_coordinates(&mut positions);
    }
    if let Some(t) = config.transformation {
        transform::apply(&mut counts, t);
    }
    if let Some(components) = config.pca_components {
        counts = transform::pca(&counts, components)?;
        genes = Vec::new();
    }

    let space = BarcodeSpace::new(positions, &counts)
        .map_err(|e| PreprocessError::Invalid(format!("building BarcodeSpace: {}", e)))?;

    info!(
        "Preprocessing done: {} barcodes x {} features",
        space.nitems, space.nfeatures
    );

    Ok(PreprocessOutput {
        space,
        barcodes,
        genes,
    })
}

/// Keeps the listed columns of a row-major matrix, in the given order.
pub(crate) fn project_columns(rows: &[Vec<f64>], cols: &[usize]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|row| cols.iter().map(|&j| row[j]).collect())
        .collect()
}
