//! # pixelspace
//!
//! SLIC-style superpixel clustering for spatially resolved expression data.
//!
//! A dataset is a set of *barcodes*: spatially tagged observations, each
//! with a 2-D position and a high-dimensional count vector. `pixelspace`
//! partitions them into k spatially coherent, expression-similar groups
//! (*superpixels*), generalizing the SLIC superpixel algorithm from pixel
//! grids to irregular point sets and arbitrary feature dimensions.
//!
//! The crate is organized around three layers:
//! - **Core algorithm**: `spatial` (an axis-sorted range index over
//!   barcode positions), `distance` (the combined spatial/feature metric),
//!   and `clustering` (the double-buffered refinement loop).
//! - **Configuration**: `builder` (the `SlicBuilder` entry point) and
//!   `seeding` (pluggable center initialization).
//! - **Data wrangling**: `preprocessing` turns a delimited count file into
//!   the clean `BarcodeSpace` the core consumes — quality filtering,
//!   redundant-gene removal, transforms, and PCA.
//!
//! ## Quick start
//!
//! ```
//! use pixelspace::builder::SlicBuilder;
//! use pixelspace::core::BarcodeSpace;
//!
//! // Four barcodes in two spatial/expression groups.
//! let positions = vec![[0.0, 0.0], [0.2, 0.1], [8.0, 8.0], [8.1, 8.2]];
//! let rows = vec![
//!     vec![5.0, 0.0],
//!     vec![4.5, 0.2],
//!     vec![0.0, 7.0],
//!     vec![0.3, 6.8],
//! ];
//! let space = BarcodeSpace::new(positions, &rows).unwrap();
//!
//! let output = SlicBuilder::new().with_clusters(2).build(&space).unwrap();
//! assert_eq!(output.labels.len(), 4);
//! ```

pub mod builder;
pub mod clustering;
pub mod core;
pub mod distance;
pub mod preprocessing;
pub mod seeding;
pub mod spatial;

#[cfg(test)]
mod tests;

pub use crate::builder::SlicBuilder;
pub use crate::clustering::{ClusterCenter, SlicOutput, SlicParams};
pub use crate::core::{BarcodeSpace, SlicError, SlicResult};
pub use crate::seeding::SeedingStrategy;
pub use crate::spatial::{Axis, SpatialIndex};
