use platemap::error::PlateMapError;
use platemap::flatten::flatten;
use platemap::geometry::{row_label, well_labels};
use platemap::grid::{Cell, GridSource, Workbook, Worksheet};
use platemap::workbook::{open_workbook, write_csv_dir};
use platemap::plate_map::read_plate_maps;
use platemap::samplesheet::{plate_map_samplesheet, HeaderConfig};
use platemap::validate::{validate, ValidationPolicy};
use pretty_assertions::assert_eq;

/// One plate block: header row of column numbers, then lettered rows of `value(r, c)`.
fn block(plate: &str, rows: usize, cols: usize, value: impl Fn(usize, usize) -> String) -> Vec<Vec<Cell>> {
    let mut grid = vec![std::iter::once(Cell::from(plate)).chain((1..=cols).map(|c| Cell::Number(c as f64))).collect()];
    for r in 0..rows {
        let mut row = vec![Cell::Text(row_label(r))];
        row.extend((0..cols).map(|c| Cell::Text(value(r, c))));
        grid.push(row);
    }
    grid
}

fn constants(rows: &[&[&str]]) -> Worksheet {
    let rows: Vec<Vec<&str>> = rows.iter().map(|r| r.to_vec()).collect();
    Worksheet::from_strings("_constants", &rows)
}

#[test]
fn cell_library_plate_flattens_to_96_rows() {
    let wb = Workbook::new(vec![
        Worksheet::new("cell_library", block("Plate1", 8, 12, |r, c| format!("cb{}", r * 12 + c))),
        constants(&[&["Plate", "Dummy"], &["Plate1", "TRUE"]]),
    ]);
    let table = platemap::flat_table(&wb).unwrap();
    assert_eq!(table.len(), 96);
    assert_eq!(table.columns, ["Plate_ID", "Sample_Well", "Dummy", "cell_library"]);
    let wells: Vec<String> = table.column("Sample_Well").unwrap().into_iter().map(String::from).collect();
    assert_eq!(wells, well_labels(96).unwrap());
    assert_eq!(wells.last().map(String::as_str), Some("H12"));
    for (i, v) in table.column("cell_library").unwrap().into_iter().enumerate() {
        assert_eq!(v, format!("cb{i}"));
    }
    assert!(table.column("Dummy").unwrap().iter().all(|d| *d == "TRUE"));
}

#[test]
fn extra_constants_plate_is_a_set_mismatch() {
    let wb = Workbook::new(vec![
        Worksheet::new("cell_library", block("Plate1", 8, 12, |_, _| "cb1".into())),
        constants(&[&["Plate", "Dummy"], &["Plate1", "TRUE"], &["Plate2", "FALSE"]]),
    ]);
    match read_plate_maps(&wb) {
        Err(PlateMapError::SetMismatch { only_in_plate_maps, only_in_constants }) => {
            assert!(only_in_plate_maps.is_empty());
            assert_eq!(only_in_constants, ["Plate2"]);
        }
        other => panic!("expected SetMismatch, got {other:?}"),
    }
}

#[test]
fn five_by_seven_block_is_invalid_geometry() {
    let wb = Workbook::new(vec![
        Worksheet::new("assay", block("Plate1", 5, 7, |_, _| "x".into())),
        constants(&[&["Plate"], &["Plate1"]]),
    ]);
    assert!(matches!(read_plate_maps(&wb), Err(PlateMapError::InvalidGeometry { rows: 5, cols: 7, .. })));
}

#[test]
fn missing_constants_tab() {
    let wb = Workbook::new(vec![Worksheet::new("assay", block("Plate1", 2, 3, |_, _| "x".into()))]);
    assert!(matches!(read_plate_maps(&wb), Err(PlateMapError::MissingConstants)));
}

#[test]
fn ranged_blocks_and_constants_to_sample_sheet_file() {
    let mut assay = block("Plate1-2", 2, 3, |_, _| "amp".into());
    assay.push(vec![]);
    assay.extend(block("Plate3", 2, 3, |_, _| "amp".into()));
    let wb = Workbook::new(vec![
        Worksheet::new("assay", assay),
        Worksheet::new("index", block("Plate1-3", 2, 3, |r, c| ["AAC", "CCG", "GGT", "TTA", "ACG", "CGT"][r * 3 + c].into())),
        constants(&[&["Plate", "index2", "Dummy"], &["Plate3", "GGGG", "FALSE"], &["Plate1", "AAAT", "FALSE"], &["Plate2", "CCCT", "TRUE"]]),
    ]);
    let pm = read_plate_maps(&wb).unwrap();
    validate(&pm, &ValidationPolicy::plate_map_indices()).unwrap();

    let header = HeaderConfig::from_toml_str(
        "investigator = \"Lab\"\nexperiment = \"E1\"\ndate = \"2024-01-02\"\ninstrument = \"NextSeq\"\nreads = \"151\"\n",
    ).unwrap().build().unwrap();
    let sheet = plate_map_samplesheet(&flatten(&pm).unwrap(), header).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("SampleSheet.csv");
    sheet.write(&out).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();

    let (head, data) = text.split_once("[Data]\n").unwrap();
    assert!(head.starts_with("[Header]\nIEMFileVersion,5\n"));
    assert!(head.contains("Instrument Type,NextSeq\n"));
    assert!(head.ends_with("[Reads]\n151\n[Settings]\n\n"));

    let lines: Vec<&str> = data.lines().collect();
    assert_eq!(lines.len(), 1 + 18);
    assert_eq!(lines[0], "Sample_ID,Plate_ID,Sample_Well,Dummy,assay,index,index2");
    assert_eq!(lines[1], "Plate1-A01,Plate1,A01,FALSE,amp,GTT,ATTT");
    assert_eq!(lines[7], "Plate2-A01,Plate2,A01,TRUE,amp,GTT,AGGG");
    assert_eq!(lines[18], "Plate3-B03,Plate3,B03,FALSE,amp,ACG,CCCC");
}

#[test]
fn export_then_reload_from_csv_dir() {
    let wb = Workbook::new(vec![
        Worksheet::new("assay", block("Plate1-4", 4, 6, |r, c| format!("{r}:{c}"))),
        constants(&[&["Plate", "Dummy", "molarity"], &["Plate1", "FALSE", "2"], &["Plate2", "FALSE", "2"], &["Plate3", "TRUE", "0"], &["Plate4", "FALSE", "2"]]),
    ]);
    let pm = read_plate_maps(&wb).unwrap();
    let dir = tempfile::tempdir().unwrap();
    platemap::export::write_plate_maps(&pm, dir.path()).unwrap();
    assert!(dir.path().join("assay.csv").exists());
    assert!(dir.path().join("_constants.csv").exists());
    let reloaded = platemap::load_flat_table(dir.path()).unwrap();
    assert_eq!(reloaded, flatten(&pm).unwrap());
}

#[test]
fn export_over_its_source_directory_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let source = Workbook::new(vec![
        Worksheet::new("assay", block("Plate1-2", 2, 3, |r, c| format!("s{r}{c}"))),
        Worksheet::new("molarity", block("Plate1-2", 2, 3, |_, _| "2".into())),
        constants(&[&["Plate", "Dummy"], &["Plate1", "FALSE"], &["Plate2", "TRUE"]]),
    ]);
    write_csv_dir(dir.path(), &source).unwrap();
    let before = platemap::load_flat_table(dir.path()).unwrap();

    let pm = read_plate_maps(&open_workbook(dir.path()).unwrap()).unwrap();
    let written = platemap::export::write_plate_maps(&pm, dir.path()).unwrap();
    assert!(written.worksheet("molarity").is_none());
    assert!(!dir.path().join("molarity.csv").exists());

    let after = platemap::load_flat_table(dir.path()).unwrap();
    assert_eq!(after, before);
    assert!(after.column("molarity").unwrap().iter().all(|m| *m == "2"));
}
