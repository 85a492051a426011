//! Concrete [`GridSource`]s: spreadsheet files via `calamine` and directories of
//! CSV files (one file per worksheet, named after the file stem).
//!
//! ### Example
//! ```no_run
//! use platemap::{grid::GridSource, workbook::open_workbook};
//! let wb = open_workbook("plates.xlsx").unwrap();
//! for ws in wb.worksheets() { println!("{} rows in {}", ws.rows.len(), ws.name); }
//! ```
use std::fs;
use std::path::Path;

use calamine::{open_workbook_auto, Data, ExcelDateTime, Reader};

use crate::error::Result;
use crate::grid::{Cell, GridSource, Workbook, Worksheet};
use crate::RESERVED_PREFIX;

/// Date cells become ISO text (`2024-01-01`, or `2024-01-01T09:30:00` with a time of day);
/// durations keep their serial value.
fn date_cell(dt: &ExcelDateTime) -> Cell {
    match dt.as_datetime() {
        Some(t) if dt.is_datetime() && t.time() == chrono::NaiveTime::MIN => Cell::Text(t.format("%Y-%m-%d").to_string()),
        Some(t) if dt.is_datetime() => Cell::Text(t.format("%Y-%m-%dT%H:%M:%S").to_string()),
        _ => Cell::Number(dt.as_f64()),
    }
}

fn cell_from_data(d: &Data) -> Cell {
    match d {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => date_cell(dt),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}

fn csv_stem(path: &Path) -> Option<(&str, bool)> {
    let ext = path.extension()?.to_str()?;
    if !ext.eq_ignore_ascii_case("csv") { return None; }
    Some((path.file_stem()?.to_str()?, ext == "csv"))
}

/// Read every worksheet of an `.xlsx`/`.xlsm`/`.xls`/`.ods` file.
pub fn read_spreadsheet<P: AsRef<Path>>(path: P) -> Result<Workbook> {
    let mut wb = open_workbook_auto(path.as_ref())?;
    let mut sheets = Vec::new();
    for name in wb.sheet_names() {
        let range = wb.worksheet_range(&name)?;
        let rows = range.rows().map(|r| r.iter().map(cell_from_data).collect()).collect();
        sheets.push(Worksheet::new(name, rows));
    }
    log::debug!("read {} worksheets from {}", sheets.len(), path.as_ref().display());
    Ok(Workbook::new(sheets))
}

/// Parse one headerless CSV grid.
pub fn read_csv_sheet<R: std::io::Read>(name: &str, reader: R) -> Result<Worksheet> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(reader);
    let mut rows = Vec::new();
    for rec in rdr.records() {
        rows.push(rec?.iter().map(Cell::from).collect());
    }
    Ok(Worksheet::new(name, rows))
}

/// Read a directory of `*.csv` files as a workbook, sorted by worksheet name.
pub fn read_csv_dir<P: AsRef<Path>>(dir: P) -> Result<Workbook> {
    let mut sheets = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        let Some((stem, _)) = csv_stem(&path) else { continue };
        sheets.push(read_csv_sheet(stem, fs::File::open(&path)?)?);
    }
    sheets.sort_by(|a, b| a.name.cmp(&b.name));
    log::debug!("read {} csv worksheets from {}", sheets.len(), dir.as_ref().display());
    Ok(Workbook::new(sheets))
}

/// Open a workbook: a directory is read as CSV worksheets, anything else as a spreadsheet file.
pub fn open_workbook<P: AsRef<Path>>(path: P) -> Result<Workbook> {
    let p = path.as_ref();
    if p.is_dir() { read_csv_dir(p) } else { read_spreadsheet(p) }
}

/// Render worksheets as CSV files in `dir` (created if missing), replacing same-named files.
pub fn write_csv_dir<P: AsRef<Path>>(dir: P, workbook: &Workbook) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut rendered = Vec::with_capacity(workbook.sheets.len());
    for ws in &workbook.sheets {
        let mut w = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());
        for row in &ws.rows {
            if row.is_empty() {
                w.write_record([""])?;
            } else {
                w.write_record(row.iter().map(|c| c.to_string()))?;
            }
        }
        let bytes = w.into_inner().map_err(|e| e.into_error())?;
        rendered.push((dir.join(format!("{}.csv", ws.name)), bytes));
    }
    for (path, bytes) in rendered {
        fs::write(&path, bytes)?;
        log::info!("wrote {}", path.display());
    }
    Ok(())
}

/// Delete CSV files in `dir` that [`write_csv_dir`] did not just write for `workbook`,
/// so that reading the directory back yields exactly these worksheets.
///
/// Files named after a reserved (`_`-prefixed) worksheet the workbook lacks are kept.
pub fn remove_stale_sheets<P: AsRef<Path>>(dir: P, workbook: &Workbook) -> Result<()> {
    for entry in fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        let Some((stem, exact_ext)) = csv_stem(&path) else { continue };
        let known = workbook.worksheet(stem).is_some();
        if (known && exact_ext) || (!known && stem.starts_with(RESERVED_PREFIX)) { continue; }
        fs::remove_file(&path)?;
        log::info!("removed stale worksheet {}", path.display());
    }
    Ok(())
}
