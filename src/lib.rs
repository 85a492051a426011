#![forbid(unsafe_code)]
//! # platemap
//!
//! Lab **plate maps** (spreadsheets describing per-well experimental variables across
//! microplates) to Illumina **sample sheets**.
//!
//! ## Pipeline
//! 1. [`workbook`] reads an `.xlsx`/`.xls`/`.ods` file or a directory of CSV files into
//!    named worksheet grids ([`grid::GridSource`]).
//! 2. [`layout`] finds the plate blocks on every variable worksheet; [`plate_map`]
//!    expands plate ranges (`Plate1-3,5`), checks consistency and overlays the
//!    `_constants` tab.
//! 3. [`flatten`] pivots the result into one row per (plate, well).
//! 4. [`validate`] and [`samplesheet`] check required variables and emit the sheet,
//!    joining [`barcodes`] tables where indices are not part of the plate map.
//! 5. [`compress`] and [`export`] go the other way: plate map → range-keyed worksheets.
//!
//! ## Reserved names
//! - variables `Sample_Well`, `Plate_ID` (derived) and `Dummy` (quality-control flag);
//! - worksheets starting with `_` are metadata; `_constants` holds plate-wide variables.
//!
//! ## Examples
//! ```rust
//! use platemap::grid::{Workbook, Worksheet};
//! let wb = Workbook::new(vec![
//!     Worksheet::from_strings("assay", &[
//!         vec!["Plate1", "1", "2", "3"],
//!         vec!["A", "x", "y", "z"],
//!         vec!["B", "u", "v", "w"],
//!     ]),
//!     Worksheet::from_strings("_constants", &[vec!["Plate", "Dummy"], vec!["Plate1", "FALSE"]]),
//! ]);
//! let table = platemap::flat_table(&wb).unwrap();
//! assert_eq!(table.len(), 6);
//! assert_eq!(table.get(5, "Sample_Well"), Some("B03"));
//! ```

pub mod error;
pub mod geometry;
pub mod plate_id;
pub mod grid;
pub mod workbook;
pub mod layout;
pub mod plate_map;
pub mod compress;
pub mod flatten;
pub mod validate;
pub mod barcodes;
pub mod samplesheet;
pub mod export;

use std::path::Path;

use error::Result;
use flatten::FlatSampleTable;
use grid::GridSource;

/// Derived per-well label variable (`A01`, `A02`, ...).
pub const SAMPLE_WELL: &str = "Sample_Well";

/// Derived plate identifier column of the flat table.
pub const PLATE_ID: &str = "Plate_ID";

/// Quality-control flag; never folded into constants or plate ranges on export.
pub const DUMMY: &str = "Dummy";

/// Plate column of the `_constants` tab.
pub const PLATE_COLUMN: &str = "Plate";

/// Worksheet holding plate-wide variables.
pub const CONSTANTS_SHEET: &str = "_constants";

/// Worksheets whose name starts with this are not variables.
pub const RESERVED_PREFIX: char = '_';

/// Crate version string (from CARGO_PKG_VERSION).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Assemble a plate map from any grid source and flatten it.
pub fn flat_table<S: GridSource + ?Sized>(source: &S) -> Result<FlatSampleTable> {
    flatten::flatten(&plate_map::read_plate_maps(source)?)
}

/// [`flat_table`] for a workbook on disk (spreadsheet file or CSV directory).
pub fn load_flat_table<P: AsRef<Path>>(path: P) -> Result<FlatSampleTable> {
    flat_table(&workbook::open_workbook(path)?)
}
