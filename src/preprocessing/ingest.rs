//! Delimited-file ingestion.
//!
//! Expected layout, one barcode per row:
//!
//! ```text
//! [label,] barcode, x, y, gene_1, gene_2, ..., gene_f
//! ```
//!
//! The header row carries the gene names in the count columns; the
//! optional leading label column (a row index written by the producing
//! tool) is skipped when `skip_first_column` is set.

use std::path::Path;

use csv::ReaderBuilder;
use log::{debug, trace};

use super::{PreprocessError, PreprocessResult};

/// Parsed input file before any filtering.
#[derive(Clone, Debug)]
pub struct RawDataset {
    pub barcodes: Vec<String>,
    pub positions: Vec<[f64; 2]>,
    pub genes: Vec<String>,
    /// Row-major counts; row i belongs to `barcodes[i]`.
    pub counts: Vec<Vec<f64>>,
}

/// Reads the whole file. Every data row must carry the same number of
/// count columns as the header.
pub fn read_delimited(
    path: &Path,
    delimiter: u8,
    skip_first_column: bool,
) -> PreprocessResult<RawDataset> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| PreprocessError::Io(format!("opening {}: {}", path.display(), e)))?;

    let offset = usize::from(skip_first_column);
    let mut records = reader.records();

    let header = records
        .next()
        .ok_or_else(|| PreprocessError::Invalid("input file is empty".to_string()))?
        .map_err(|e| PreprocessError::Csv(e.to_string()))?;

    if header.len() < offset + 4 {
        return Err(PreprocessError::Invalid(format!(
            "header has {} fields; need tag, x, y and at least one gene",
            header.len()
        )));
    }
    let genes: Vec<String> = header
        .iter()
        .skip(offset + 3)
        .map(|s| s.trim().to_string())
        .collect();
    debug!("Header: {} genes", genes.len());

    let mut barcodes = Vec::new();
    let mut positions = Vec::new();
    let mut counts = Vec::new();

    for (line, record) in records.enumerate() {
        let record = record.map_err(|e| PreprocessError::Csv(e.to_string()))?;
        if record.len() != header.len() {
            return Err(PreprocessError::Parse(format!(
                "row {}: {} fields, header has {}",
                line + 2,
                record.len(),
                header.len()
            )));
        }

        let tag = record.get(offset).unwrap_or_default().trim().to_string();
        let x = parse_field(&record, offset + 1, line)?;
        let y = parse_field(&record, offset + 2, line)?;

        let mut row = Vec::with_capacity(genes.len());
        for j in 0..genes.len() {
            row.push(parse_field(&record, offset + 3 + j, line)?);
        }

        trace!("Row {}: barcode {} at ({}, {})", line + 2, tag, x, y);
        barcodes.push(tag);
        positions.push([x, y]);
        counts.push(row);
    }

    if counts.is_empty() {
        return Err(PreprocessError::Invalid(
            "input file has a header but no data rows".to_string(),
        ));
    }

    Ok(RawDataset {
        barcodes,
        positions,
        genes,
        counts,
    })
}

fn parse_field(record: &csv::StringRecord, idx: usize, line: usize) -> PreprocessResult<f64> {
    let raw = record.get(idx).unwrap_or_default().trim();
    raw.parse::<f64>().map_err(|e| {
        PreprocessError::Parse(format!(
            "row {}, field {}: '{}' is not numeric ({})",
            line + 2,
            idx + 1,
            raw,
            e
        ))
    })
}
