//! Illumina sample sheets: the `[Header]`/`[Reads]`/`[Settings]` preamble plus the
//! `[Data]` table.
//!
//! Header fields come from a [`HeaderConfig`] (TOML file and/or command-line flags)
//! instead of interactive prompts. The [`Instrument`] decides which index columns
//! are reverse-complemented.
//!
//! Two data flows are supported:
//! - [`plate_map_samplesheet`]: `index` and `index2` are plate-map variables;
//! - [`barcoded_samplesheet`]: `index2` comes from the plate primer of `Sample_Plate`
//!   and `index` from the well barcode of `Sample_Well`.
//!
//! # Examples
//! ```
//! use platemap::samplesheet::HeaderConfig;
//! let cfg = HeaderConfig::from_toml_str(r#"
//!     investigator = "Lab"
//!     experiment = "run-7"
//!     date = "2024-03-01"
//!     instrument = "MiSeq"
//!     reads = "151,151"
//! "#).unwrap();
//! let header = cfg.build().unwrap();
//! assert!(header.render().contains("[Reads]\n151\n151\n[Settings]"));
//! ```
use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::barcodes::{PrimerTable, WellBarcodes};
use crate::error::{PlateMapError, Result};
use crate::flatten::FlatSampleTable;
use crate::{PLATE_ID, SAMPLE_WELL};

// Sample-sheet column names.
pub const SAMPLE_ID: &str = "Sample_ID";
pub const SAMPLE_PLATE: &str = "Sample_Plate";
pub const INDEX: &str = "index";
pub const INDEX2: &str = "index2";

/// Sequencer the sheet is written for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, clap::ValueEnum)]
pub enum Instrument {
    #[value(name = "MiSeq")]
    MiSeq,
    #[value(name = "NextSeq")]
    NextSeq,
    #[value(name = "HiSeq", alias = "Hiseq")]
    #[serde(alias = "Hiseq")]
    HiSeq,
}

impl Instrument {
    /// NextSeq reads `index2` on the opposite strand to MiSeq and HiSeq.
    pub fn reverse_complements_index2(self) -> bool { self == Instrument::NextSeq }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Instrument::MiSeq => "MiSeq",
            Instrument::NextSeq => "NextSeq",
            Instrument::HiSeq => "HiSeq",
        })
    }
}

/// Reverse complement of a DNA sequence. Only `ACGT` (either case) are complemented.
pub fn rev_comp(seq: &str) -> String {
    fn comp(c: char) -> char {
        match c {
            'A' => 'T',
            'T' => 'A',
            'C' => 'G',
            'G' => 'C',
            'a' => 't',
            't' => 'a',
            'c' => 'g',
            'g' => 'c',
            other => other,
        }
    }
    seq.chars().rev().map(comp).collect()
}

/// Read cycles: `"151"` (single end) or `"151,151"` (paired end).
pub fn parse_reads(s: &str) -> Result<Vec<u32>> {
    let bad = || PlateMapError::InvalidHeader(format!("reads \"{s}\" must be one or two positive integers separated by a comma"));
    let reads = s.split(',').map(|r| r.trim().parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(bad)).collect::<Result<Vec<_>>>()?;
    if reads.is_empty() || reads.len() > 2 { return Err(bad()); }
    Ok(reads)
}

/// Partially specified header fields; later sources override earlier ones via [`HeaderConfig::merge`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderConfig {
    pub investigator: Option<String>,
    pub experiment: Option<String>,
    pub date: Option<String>,
    pub instrument: Option<Instrument>,
    pub reads: Option<String>,
    pub chemistry: Option<String>,
}

impl HeaderConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> { Ok(toml::from_str(s)?) }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Fields set in `other` win.
    pub fn merge(self, other: HeaderConfig) -> Self {
        HeaderConfig {
            investigator: other.investigator.or(self.investigator),
            experiment: other.experiment.or(self.experiment),
            date: other.date.or(self.date),
            instrument: other.instrument.or(self.instrument),
            reads: other.reads.or(self.reads),
            chemistry: other.chemistry.or(self.chemistry),
        }
    }

    /// Validate into a complete header; every missing field is reported at once.
    pub fn build(self) -> Result<SampleSheetHeader> {
        let mut missing = Vec::new();
        let mut take = |name: &'static str, v: Option<String>| v.unwrap_or_else(|| { missing.push(name); String::new() });
        let investigator = take("investigator", self.investigator);
        let experiment = take("experiment", self.experiment);
        let date = take("date", self.date);
        let reads = take("reads", self.reads);
        if self.instrument.is_none() { missing.push("instrument"); }
        let Some(instrument) = self.instrument.filter(|_| missing.is_empty()) else {
            return Err(PlateMapError::InvalidHeader(format!("missing field(s): {}", missing.join(", "))));
        };
        let chemistry = self.chemistry.unwrap_or_else(|| "Amplicon".to_string());
        for (name, v) in [("investigator", &investigator), ("experiment", &experiment), ("date", &date), ("chemistry", &chemistry)] {
            if v.trim().is_empty() || v.contains([',', '\n', '\r']) {
                return Err(PlateMapError::InvalidHeader(format!("{name} \"{v}\" must be non-empty and free of commas and line breaks")));
            }
        }
        Ok(SampleSheetHeader { investigator, experiment, date, instrument, reads: parse_reads(&reads)?, chemistry })
    }
}

/// A complete, validated sample sheet preamble.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleSheetHeader {
    pub investigator: String,
    pub experiment: String,
    pub date: String,
    pub instrument: Instrument,
    pub reads: Vec<u32>,
    pub chemistry: String,
}

impl SampleSheetHeader {
    /// Everything up to and including the `[Data]` line, without a trailing newline.
    pub fn render(&self) -> String {
        let reads = self.reads.iter().map(|r| r.to_string()).collect::<Vec<_>>().join("\n");
        format!(
            "[Header]\nIEMFileVersion,5\nInvestigator Name,{}\nExperiment Name,{}\nDate,{}\n\
             Workflow,GenerateFASTQ\nApplication,FASTQ Only\nInstrument Type,{}\nChemistry,{}\n\
             [Reads]\n{}\n[Settings]\n\n[Data]",
            self.investigator, self.experiment, self.date, self.instrument, self.chemistry, reads
        )
    }
}

/// Header plus data table, rendered only when written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleSheet {
    pub header: SampleSheetHeader,
    pub data: FlatSampleTable,
}

impl SampleSheet {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = self.header.render().into_bytes();
        out.push(b'\n');
        self.data.write_csv(&mut out)?;
        Ok(out)
    }

    /// Render fully in memory, then write `path` in one step.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)?;
        log::info!("wrote {} samples to {}", self.data.len(), path.as_ref().display());
        Ok(())
    }
}

fn require_columns(table: &FlatSampleTable, names: &[&str]) -> Result<()> {
    let missing: Vec<String> = names.iter().filter(|n| table.column_index(n).is_none()).map(|n| n.to_string()).collect();
    if missing.is_empty() { Ok(()) } else { Err(PlateMapError::MissingRequired(missing)) }
}

/// Sample sheet whose indices are plate-map variables.
///
/// `index` is always reverse-complemented; `index2` only for NextSeq.
/// `Sample_ID` is `<Plate_ID>-<Sample_Well>` and becomes the first column.
pub fn plate_map_samplesheet(table: &FlatSampleTable, header: SampleSheetHeader) -> Result<SampleSheet> {
    require_columns(table, &[PLATE_ID, SAMPLE_WELL, INDEX, INDEX2])?;
    let (plate, well) = (table.column_index(PLATE_ID), table.column_index(SAMPLE_WELL));
    let (index, index2) = (table.column_index(INDEX), table.column_index(INDEX2));
    let rc2 = header.instrument.reverse_complements_index2();

    let mut columns = vec![SAMPLE_ID.to_string()];
    columns.extend(table.columns.iter().cloned());
    let rows = table.rows.iter().map(|r| {
        let mut row = Vec::with_capacity(columns.len());
        row.push(format!("{}-{}", plate.map_or("", |i| r[i].as_str()), well.map_or("", |i| r[i].as_str())));
        for (i, v) in r.iter().enumerate() {
            let flip = Some(i) == index || (rc2 && Some(i) == index2);
            row.push(if flip { rev_comp(v) } else { v.clone() });
        }
        row
    }).collect();
    Ok(SampleSheet { header, data: FlatSampleTable { columns, rows } })
}

/// Sample sheet whose indices come from barcode tables.
///
/// Rows are inner-joined on `Sample_Plate` (plate primer → `index2`, reverse-complemented
/// for NextSeq) and on `Sample_Well` (well barcode → `index`); rows without a match
/// are dropped with a warning. `Plate_ID` is replaced by `Sample_Plate`, and rows are
/// sorted by `(Sample_Plate, Sample_Well)`.
pub fn barcoded_samplesheet(
    table: &FlatSampleTable,
    primers: &PrimerTable,
    wells: &WellBarcodes,
    header: SampleSheetHeader,
) -> Result<SampleSheet> {
    require_columns(table, &[SAMPLE_PLATE, SAMPLE_WELL])?;
    for reserved in [INDEX, INDEX2, SAMPLE_ID] {
        if table.column_index(reserved).is_some() {
            return Err(PlateMapError::InvalidValue {
                variable: reserved.to_string(),
                message: "is filled in from the barcode tables and must not be a plate map variable".to_string(),
            });
        }
    }
    let primers = if header.instrument.reverse_complements_index2() { primers.reverse_complemented() } else { primers.clone() };
    let plate_idx = table.column_index(SAMPLE_PLATE).unwrap_or_default();
    let well_idx = table.column_index(SAMPLE_WELL).unwrap_or_default();
    let rest: Vec<usize> = table.columns.iter().enumerate()
        .filter(|(_, c)| ![PLATE_ID, SAMPLE_PLATE, SAMPLE_WELL].contains(&c.as_str()))
        .map(|(i, _)| i)
        .collect();

    let mut columns: Vec<String> = [SAMPLE_ID, SAMPLE_PLATE, SAMPLE_WELL, INDEX, INDEX2].map(String::from).to_vec();
    columns.extend(rest.iter().map(|&i| table.columns[i].clone()));

    let (mut no_primer, mut no_barcode) = (0usize, 0usize);
    let mut rows = Vec::with_capacity(table.len());
    for r in &table.rows {
        let (plate, well) = (&r[plate_idx], &r[well_idx]);
        let Some(index2) = primers.get(plate) else { no_primer += 1; continue };
        let Some(index) = wells.get(well) else { no_barcode += 1; continue };
        let mut row = vec![format!("{plate}-{well}"), plate.clone(), well.clone(), index.to_string(), index2.to_string()];
        row.extend(rest.iter().map(|&i| r[i].clone()));
        rows.push(row);
    }
    if no_primer > 0 { log::warn!("dropped {no_primer} rows whose Sample_Plate has no plate primer"); }
    if no_barcode > 0 { log::warn!("dropped {no_barcode} rows whose Sample_Well has no well barcode"); }
    rows.sort_by(|a, b| (&a[1], &a[2]).cmp(&(&b[1], &b[2])));
    Ok(SampleSheet { header, data: FlatSampleTable { columns, rows } })
}

#[cfg(test)]
mod samplesheet_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn header(instrument: Instrument) -> SampleSheetHeader {
        SampleSheetHeader {
            investigator: "Lab".into(),
            experiment: "run-7".into(),
            date: "2024-03-01".into(),
            instrument,
            reads: vec![151, 151],
            chemistry: "Amplicon".into(),
        }
    }

    fn table(columns: &[&str], rows: &[&[&str]]) -> FlatSampleTable {
        FlatSampleTable {
            columns: columns.iter().map(|s| s.to_string()).collect(),
            rows: rows.iter().map(|r| r.iter().map(|s| s.to_string()).collect()).collect(),
        }
    }

    #[test]
    fn rev_comp_only_touches_acgt() {
        assert_eq!(rev_comp("ACTGacgt"), "acgtCAGT");
        assert_eq!(rev_comp("AANN"), "NNTT");
        assert_eq!(rev_comp(""), "");
    }

    #[test]
    fn reads_single_or_paired() {
        assert_eq!(parse_reads("151").unwrap(), [151]);
        assert_eq!(parse_reads("151, 76").unwrap(), [151, 76]);
        for bad in ["", "151,", "a", "1,2,3", "0"] {
            assert!(matches!(parse_reads(bad), Err(PlateMapError::InvalidHeader(_))), "{bad}");
        }
    }

    #[test]
    fn header_text() {
        let text = header(Instrument::MiSeq).render();
        assert_eq!(text, "[Header]\nIEMFileVersion,5\nInvestigator Name,Lab\nExperiment Name,run-7\nDate,2024-03-01\n\
            Workflow,GenerateFASTQ\nApplication,FASTQ Only\nInstrument Type,MiSeq\nChemistry,Amplicon\n\
            [Reads]\n151\n151\n[Settings]\n\n[Data]");
    }

    #[test]
    fn config_merge_and_build() {
        let file = HeaderConfig::from_toml_str("investigator = \"A\"\ninstrument = \"Hiseq\"\nreads = \"151\"").unwrap();
        let cli = HeaderConfig { investigator: Some("B".into()), experiment: Some("E".into()), date: Some("D".into()), ..Default::default() };
        let h = file.merge(cli).build().unwrap();
        assert_eq!(h.investigator, "B");
        assert_eq!(h.instrument, Instrument::HiSeq);
        assert_eq!(h.chemistry, "Amplicon");

        match HeaderConfig::default().build() {
            Err(PlateMapError::InvalidHeader(m)) => assert!(m.contains("investigator") && m.contains("instrument")),
            other => panic!("expected InvalidHeader, got {other:?}"),
        }
        assert!(HeaderConfig::from_toml_str("colour = \"red\"").is_err());
        let comma = HeaderConfig { investigator: Some("A,B".into()), experiment: Some("E".into()), date: Some("D".into()),
            instrument: Some(Instrument::MiSeq), reads: Some("151".into()), chemistry: None };
        assert!(matches!(comma.build(), Err(PlateMapError::InvalidHeader(_))));
    }

    #[test]
    fn plate_map_indices_by_instrument() {
        let t = table(&["Plate_ID", "Sample_Well", "assay", "index", "index2"], &[&["Plate1", "A01", "x", "AACC", "GGTA"]]);
        let miseq = plate_map_samplesheet(&t, header(Instrument::MiSeq)).unwrap();
        assert_eq!(miseq.data.columns[0], "Sample_ID");
        assert_eq!(miseq.data.rows[0], ["Plate1-A01", "Plate1", "A01", "x", "GGTT", "GGTA"]);
        let nextseq = plate_map_samplesheet(&t, header(Instrument::NextSeq)).unwrap();
        assert_eq!(nextseq.data.get(0, "index2"), Some("TACC"));

        let no_index = table(&["Plate_ID", "Sample_Well"], &[]);
        assert!(matches!(plate_map_samplesheet(&no_index, header(Instrument::MiSeq)), Err(PlateMapError::MissingRequired(_))));
    }

    #[test]
    fn barcode_join_drops_and_sorts() {
        let t = table(&["Plate_ID", "Sample_Well", "Sample_Plate", "assay"], &[
            &["Plate1", "B01", "P2", "x"],
            &["Plate1", "A01", "P2", "y"],
            &["Plate2", "A01", "P1", "z"],
            &["Plate3", "A01", "P9", "dropped"],
        ]);
        let primers = PrimerTable { primers: [("P1", "AAAC"), ("P2", "CCCA")].into_iter().map(|(a, b)| (a.into(), b.into())).collect() };
        let wells = WellBarcodes { wells: [("A01", "GATT"), ("B01", "TTAG")].into_iter().map(|(a, b)| (a.into(), b.into())).collect() };

        let s = barcoded_samplesheet(&t, &primers, &wells, header(Instrument::MiSeq)).unwrap();
        assert_eq!(s.data.columns, ["Sample_ID", "Sample_Plate", "Sample_Well", "index", "index2", "assay"]);
        assert_eq!(s.data.rows, [
            ["P1-A01", "P1", "A01", "GATT", "AAAC", "z"],
            ["P2-A01", "P2", "A01", "GATT", "CCCA", "y"],
            ["P2-B01", "P2", "B01", "TTAG", "CCCA", "x"],
        ]);
        let s = barcoded_samplesheet(&t, &primers, &wells, header(Instrument::NextSeq)).unwrap();
        assert_eq!(s.data.get(0, "index2"), Some("GTTT"));
    }

    #[test]
    fn sheet_bytes_start_with_header() {
        let t = table(&["Plate_ID", "Sample_Well", "index", "index2"], &[&["Plate1", "A01", "AC", "GT"]]);
        let s = plate_map_samplesheet(&t, header(Instrument::MiSeq)).unwrap();
        let text = String::from_utf8(s.to_bytes().unwrap()).unwrap();
        assert!(text.contains("[Data]\nSample_ID,Plate_ID,Sample_Well,index,index2\nPlate1-A01,Plate1,A01,GT,GT\n"));
    }
}
