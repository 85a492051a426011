//! Render a [`PlateMap`] back into plate-block worksheets.
//!
//! Plate-wide variables move to a `_constants` worksheet, the rest are compressed
//! into range-keyed blocks, one worksheet per variable. Before anything is written
//! the rendered workbook is parsed again and must reproduce the input exactly.
use std::path::Path;

use crate::compress::compress;
use crate::error::{PlateMapError, Result};
use crate::geometry::{cols_for_size, row_label, rows_for_size};
use crate::grid::{Cell, Workbook, Worksheet};
use crate::plate_id::expand_range;
use crate::plate_map::{check_consistency, extract_constants, read_plate_maps, ConstantsTable, PlateMap, DEFAULT_EXCLUDE};
use crate::workbook::{remove_stale_sheets, write_csv_dir};

fn block_rows(spec: &str, values: &[String]) -> Result<Vec<Vec<Cell>>> {
    let (rows, cols) = (rows_for_size(values.len())?, cols_for_size(values.len())?);
    let mut grid = vec![std::iter::once(Cell::Text(spec.to_string()))
        .chain((1..=cols).map(|c| Cell::Number(c as f64)))
        .collect::<Vec<_>>()];
    for (r, chunk) in values.chunks(cols).take(rows).enumerate() {
        let mut row = vec![Cell::Text(row_label(r))];
        row.extend(chunk.iter().map(|v| Cell::from(v.as_str())));
        grid.push(row);
    }
    Ok(grid)
}

/// Lay out a plate map as worksheets: one per per-well variable plus `_constants`.
pub fn plate_map_workbook(pm: &PlateMap) -> Result<Workbook> {
    check_consistency(pm)?;
    let (slim, constants) = match extract_constants(pm, DEFAULT_EXCLUDE) {
        (slim, _) if slim.is_empty() => {
            let rows = pm.plates().into_iter().map(|p| (p, Vec::new())).collect();
            (pm.clone(), ConstantsTable { columns: Vec::new(), rows })
        }
        split => split,
    };

    let mut sheets = Vec::new();
    for (var, blocks) in compress(&slim, DEFAULT_EXCLUDE).iter() {
        let mut ordered = Vec::with_capacity(blocks.len());
        for (spec, values) in blocks {
            let first = expand_range(spec)?.into_iter().min();
            ordered.push((first, spec, values));
        }
        ordered.sort_by_key(|(first, _, _)| *first);

        let mut grid = Vec::new();
        for (i, (_, spec, values)) in ordered.into_iter().enumerate() {
            if i > 0 { grid.push(Vec::new()); }
            grid.extend(block_rows(spec, values)?);
        }
        sheets.push(Worksheet::new(var, grid));
    }
    sheets.push(constants.to_worksheet());
    Ok(Workbook::new(sheets))
}

fn describe_difference(expected: &PlateMap, actual: &PlateMap) -> String {
    let mut vars: Vec<&str> = expected.variables().chain(actual.variables()).collect();
    vars.sort_unstable();
    vars.dedup();
    let differing: Vec<&str> = vars.into_iter().filter(|v| expected.plates_of(v) != actual.plates_of(v)).collect();
    format!("variables differ after re-reading: {}", differing.join(", "))
}

/// Render, verify by re-parsing, then write one CSV per worksheet into `dir`.
///
/// Other CSV worksheets already in `dir` are removed so the directory reads back
/// as this plate map, which makes exporting over the source directory safe.
pub fn write_plate_maps<P: AsRef<Path>>(pm: &PlateMap, dir: P) -> Result<Workbook> {
    let wb = plate_map_workbook(pm)?;
    let back = read_plate_maps(&wb).map_err(|e| PlateMapError::RoundTrip(e.to_string()))?;
    if back != *pm {
        return Err(PlateMapError::RoundTrip(describe_difference(pm, &back)));
    }
    write_csv_dir(&dir, &wb)?;
    remove_stale_sheets(&dir, &wb)?;
    Ok(wb)
}
