//! Pivot a [`PlateMap`] into one flat table: one row per (plate, well), one column
//! per variable.
//!
//! Rows are ordered by plate number, then by well in row-major order. The first two
//! columns are always `Plate_ID` and `Sample_Well`; variables follow alphabetically.
//!
//! # Examples
//! ```
//! use platemap::{flatten::flatten, plate_id::PlateId, plate_map::PlateMap};
//! let pm: PlateMap = [("assay", PlateId(1), vec!["x".to_string(); 6])].into_iter().collect();
//! let t = flatten(&pm).unwrap();
//! assert_eq!(t.len(), 6);
//! assert_eq!(t.get(0, "Sample_Well"), Some("A01"));
//! ```
use std::collections::BTreeMap;

use polars::prelude::*;

use crate::error::{PlateMapError, Result};
use crate::geometry::well_labels;
use crate::plate_id::PlateId;
use crate::plate_map::{check_consistency, plate_sizes, PlateMap};
use crate::{PLATE_ID, SAMPLE_WELL};

/// Terminal tabular form of a plate map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlatSampleTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl FlatSampleTable {
    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn column_index(&self, name: &str) -> Option<usize> { self.columns.iter().position(|c| c == name) }

    /// Cell at `row` of the named column.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Columns as a polars `DataFrame` of string series.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let series: Vec<Series> = self.columns.iter().enumerate().map(|(i, name)| {
            let values: Vec<&str> = self.rows.iter().map(|r| r[i].as_str()).collect();
            Series::new(name, values)
        }).collect();
        Ok(DataFrame::new(series)?)
    }

    /// Write as headered CSV.
    pub fn write_csv<W: std::io::Write>(&self, w: W) -> Result<()> {
        let mut df = self.to_dataframe()?;
        CsvWriter::new(w).include_header(true).finish(&mut df)?;
        Ok(())
    }
}

/// Insert the reserved `Sample_Well` variable: each plate's row-major well labels.
pub fn add_well_labels(pm: &PlateMap) -> Result<PlateMap> {
    if pm.contains_variable(SAMPLE_WELL) {
        return Err(PlateMapError::ReservedVariable(SAMPLE_WELL.to_string()));
    }
    let mut out = pm.clone();
    for (plate, size) in plate_sizes(pm)? {
        out.insert(SAMPLE_WELL, plate, well_labels(size)?);
    }
    Ok(out)
}

/// Pivot a consistent plate map into a [`FlatSampleTable`].
///
/// Inconsistent maps fail with the same errors as [`check_consistency`] and
/// [`plate_sizes`]; nothing is flattened with missing cells.
pub fn flatten(pm: &PlateMap) -> Result<FlatSampleTable> {
    check_consistency(pm)?;
    if pm.contains_variable(PLATE_ID) {
        return Err(PlateMapError::ReservedVariable(PLATE_ID.to_string()));
    }
    let labeled = add_well_labels(pm)?;

    // (plate, well index) -> variable -> value
    let mut cells: BTreeMap<(PlateId, usize), BTreeMap<&str, &str>> = BTreeMap::new();
    for (var, plates) in labeled.iter() {
        for (plate, values) in plates {
            for (well, value) in values.iter().enumerate() {
                cells.entry((*plate, well)).or_default().insert(var, value.as_str());
            }
        }
    }

    let vars: Vec<&str> = pm.variables().collect();
    let mut columns = vec![PLATE_ID.to_string(), SAMPLE_WELL.to_string()];
    columns.extend(vars.iter().map(|v| v.to_string()));

    let rows = cells.into_iter().map(|((plate, _), by_var)| {
        let mut row = vec![plate.to_string(), by_var.get(SAMPLE_WELL).copied().unwrap_or_default().to_string()];
        row.extend(vars.iter().map(|v| by_var.get(v).copied().unwrap_or_default().to_string()));
        row
    }).collect::<Vec<_>>();
    log::debug!("flattened {} variables into {} rows", vars.len(), rows.len());
    Ok(FlatSampleTable { columns, rows })
}

/// Replicate every 96-well plate into a 384-well quadrant layout.
///
/// Well `(r, c)` of the 384-well plate takes well `(r / 2, c / 2)` of the source plate,
/// so each source well fills a 2x2 square.
pub fn stamp_96_to_384(pm: &PlateMap) -> Result<PlateMap> {
    let bad: Vec<String> = plate_sizes(pm)?.into_iter().filter(|(_, n)| *n != 96).map(|(p, _)| p.to_string()).collect();
    if !bad.is_empty() {
        return Err(PlateMapError::InvalidValue {
            variable: PLATE_ID.to_string(),
            message: format!("stamping requires 96-well plates; found other sizes on {}", bad.join(", ")),
        });
    }
    let mut out = PlateMap::new();
    for (var, plates) in pm.iter() {
        out.add_variable(var);
        for (plate, values) in plates {
            let stamped = (0..16).flat_map(|r| (0..24).map(move |c| (r / 2) * 12 + c / 2)).map(|i| values[i].clone()).collect();
            out.insert(var, *plate, stamped);
        }
    }
    Ok(out)
}
