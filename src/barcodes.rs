//! Barcode lookup tables read from CSV files.
//!
//! Two tables feed the barcode-join sample sheet:
//! - [`PrimerTable`]: plate primer name → index sequence (`primer_name`, `index_on_primer`);
//! - [`WellBarcodes`]: 384-well position → well barcode (`Sample_Well`, `Barcode`).
//!
//! Neither table is embedded in the crate; both are supplied by the caller.
use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{PlateMapError, Result};
use crate::samplesheet::rev_comp;

/// Number of rows a well barcode table must have.
pub const WELL_BARCODE_ROWS: usize = 384;

#[derive(Debug, Deserialize)]
struct PrimerRecord {
    primer_name: String,
    index_on_primer: String,
}

#[derive(Debug, Deserialize)]
struct WellRecord {
    #[serde(rename = "Sample_Well")]
    sample_well: String,
    #[serde(rename = "Barcode")]
    barcode: String,
}

fn table_error(table: &str, message: impl Into<String>) -> PlateMapError {
    PlateMapError::BarcodeTable { table: table.to_string(), message: message.into() }
}

fn check_headers<R: std::io::Read>(table: &str, rdr: &mut csv::Reader<R>, required: &[&str]) -> Result<()> {
    let headers = rdr.headers()?;
    let missing: Vec<&str> = required.iter().copied().filter(|h| !headers.iter().any(|x| x.trim() == *h)).collect();
    if missing.is_empty() { Ok(()) } else { Err(table_error(table, format!("missing column(s) {}", missing.join(", ")))) }
}

/// Plate primer name → primer index sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrimerTable {
    pub primers: BTreeMap<String, String>,
}

impl PrimerTable {
    /// Parse a CSV with `primer_name` and `index_on_primer` columns; primer names must be unique.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        check_headers("primers", &mut rdr, &["primer_name", "index_on_primer"])?;
        let mut primers = BTreeMap::new();
        for rec in rdr.deserialize() {
            let PrimerRecord { primer_name, index_on_primer } = rec?;
            if primers.insert(primer_name.clone(), index_on_primer).is_some() {
                return Err(table_error("primers", format!("primer \"{primer_name}\" is listed more than once")));
            }
        }
        log::debug!("read {} plate primers", primers.len());
        Ok(PrimerTable { primers })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    /// Index sequence of a plate primer.
    pub fn get(&self, primer: &str) -> Option<&str> { self.primers.get(primer).map(String::as_str) }

    /// Same table with every sequence reverse-complemented.
    pub fn reverse_complemented(&self) -> Self {
        PrimerTable { primers: self.primers.iter().map(|(k, v)| (k.clone(), rev_comp(v))).collect() }
    }
}

/// 384-well position → well barcode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WellBarcodes {
    pub wells: BTreeMap<String, String>,
}

impl WellBarcodes {
    /// Parse a CSV with `Sample_Well` and `Barcode` columns covering exactly 384 distinct wells.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        check_headers("well barcodes", &mut rdr, &["Sample_Well", "Barcode"])?;
        let mut wells = BTreeMap::new();
        let mut n = 0;
        for rec in rdr.deserialize() {
            let WellRecord { sample_well, barcode } = rec?;
            n += 1;
            if wells.insert(sample_well.clone(), barcode).is_some() {
                return Err(table_error("well barcodes", format!("well \"{sample_well}\" is listed more than once")));
            }
        }
        if n != WELL_BARCODE_ROWS {
            return Err(table_error("well barcodes", format!("expected {WELL_BARCODE_ROWS} rows, found {n}")));
        }
        Ok(WellBarcodes { wells })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    pub fn get(&self, well: &str) -> Option<&str> { self.wells.get(well).map(String::as_str) }
}
