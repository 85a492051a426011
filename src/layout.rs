//! Sheet-layout parser: worksheet grids → plate blocks → [`CompactPlateMap`].
//!
//! A variable worksheet holds one or more **plate blocks** separated by blank rows:
//!
//! ```text
//! Plate1-3  1   2   3   ...  12
//! A         v   v   v   ...  v
//! ...
//! H         v   v   v   ...  v
//!
//! Plate4    1   2   ...
//! ```
//!
//! The top-left cell names the plate (or a plate range), the first row holds column
//! numbers and the first column row letters. Worksheets whose name starts with `_`
//! are metadata and skipped.
use std::collections::BTreeMap;

use crate::error::{PlateMapError, Result};
use crate::geometry::is_valid_dims;
use crate::grid::{Cell, GridSource, Worksheet};
use crate::plate_map::CompactPlateMap;
use crate::{PLATE_ID, RESERVED_PREFIX, SAMPLE_WELL};

/// One plate's values for one variable, as laid out in a worksheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlateBlock {
    /// Plate identifier or range spec from the top-left cell.
    pub plate: String,
    pub rows: usize,
    pub cols: usize,
    /// Interior values in row-major order.
    pub values: Vec<String>,
}

/// Split rows into maximal runs of non-blank rows; blank rows are discarded.
pub fn split_blocks(rows: &[Vec<Cell>]) -> Vec<&[Vec<Cell>]> {
    let mut blocks = Vec::new();
    let mut start = None;
    for (i, row) in rows.iter().enumerate() {
        match (Worksheet::is_blank_row(row), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => { blocks.push(&rows[s..i]); start = None; }
            _ => {}
        }
    }
    if let Some(s) = start { blocks.push(&rows[s..]); }
    blocks
}

fn trimmed_len(row: &[Cell]) -> usize {
    row.iter().rposition(|c| !c.is_blank()).map_or(0, |i| i + 1)
}

/// Validate one block's geometry and extract its values.
///
/// Rows are measured without trailing blanks; interior rows may end early (empty
/// trailing wells) but may not extend past the header row.
pub fn parse_block(worksheet: &str, block: &[Vec<Cell>]) -> Result<PlateBlock> {
    let header = &block[0];
    let width = trimmed_len(header);
    let plate = header.first().map(|c| c.to_string().trim().to_string()).unwrap_or_default();
    let interior = &block[1..];
    if interior.iter().any(|r| trimmed_len(r) > width) {
        return Err(PlateMapError::UnequalRows { worksheet: worksheet.to_string(), plate });
    }
    let (rows, cols) = (interior.len(), width.saturating_sub(1));
    if !is_valid_dims(rows, cols) {
        return Err(PlateMapError::InvalidGeometry { worksheet: worksheet.to_string(), rows, cols });
    }
    let values = interior.iter()
        .flat_map(|r| (1..=cols).map(move |c| r.get(c).map(Cell::to_string).unwrap_or_default()))
        .collect();
    Ok(PlateBlock { plate, rows, cols, values })
}

/// Parse all blocks of one worksheet, keyed by plate spec.
pub fn parse_worksheet(ws: &Worksheet) -> Result<BTreeMap<String, Vec<String>>> {
    let mut plates = BTreeMap::new();
    for block in split_blocks(&ws.rows) {
        let b = parse_block(&ws.name, block)?;
        if plates.contains_key(&b.plate) {
            return Err(PlateMapError::DuplicatePlateId { worksheet: ws.name.clone(), plate: b.plate });
        }
        plates.insert(b.plate, b.values);
    }
    log::debug!("worksheet \"{}\": {} plate blocks", ws.name, plates.len());
    Ok(plates)
}

/// Parse every variable worksheet (name not starting with `_`) of a workbook.
pub fn read_plate_map_sheets<S: GridSource + ?Sized>(source: &S) -> Result<CompactPlateMap> {
    let mut raw = CompactPlateMap::new();
    for ws in source.worksheets() {
        if ws.name.starts_with(RESERVED_PREFIX) {
            log::debug!("skipping reserved worksheet \"{}\"", ws.name);
            continue;
        }
        if ws.name == SAMPLE_WELL || ws.name == PLATE_ID {
            return Err(PlateMapError::ReservedVariable(ws.name.clone()));
        }
        raw.add_variable(&ws.name);
        for (plate, values) in parse_worksheet(ws)? {
            raw.insert(&ws.name, &plate, values);
        }
    }
    Ok(raw)
}
