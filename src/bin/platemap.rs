use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use platemap::barcodes::{PrimerTable, WellBarcodes};
use platemap::flatten::{flatten, stamp_96_to_384};
use platemap::plate_map::{read_plate_maps, PlateMap};
use platemap::samplesheet::{barcoded_samplesheet, plate_map_samplesheet, HeaderConfig, Instrument, SampleSheetHeader};
use platemap::validate::{validate, ValidationPolicy};
use platemap::workbook::open_workbook;

/// Platemap CLI
#[derive(Parser)]
#[command(name = "platemap")]
#[command(version)]
#[command(about = "Plate-map workbooks to Illumina sample sheets", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the flattened plate map table
    Show {
        /// Spreadsheet (.xlsx/.xls/.ods) or directory of CSV worksheets
        workbook: PathBuf,
        /// Write the table as CSV instead of printing it
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Stamp 96-well plates onto 384-well quadrants first
        #[arg(long)]
        stamp: bool,
    },

    /// Sample sheet whose index and index2 come from the plate map
    Samplesheet {
        workbook: PathBuf,
        #[command(flatten)]
        header: HeaderArgs,
        #[arg(short, long = "out-file", default_value = "SampleSheet.csv")]
        out_file: PathBuf,
    },

    /// Sample sheet whose indices come from plate primer and well barcode tables
    Barcoded {
        workbook: PathBuf,
        /// CSV with columns primer_name, index_on_primer
        #[arg(long)]
        primers: PathBuf,
        /// CSV with columns Sample_Well, Barcode (384 rows)
        #[arg(long)]
        well_barcodes: PathBuf,
        #[command(flatten)]
        header: HeaderArgs,
        /// Stamp 96-well plates onto 384-well quadrants first
        #[arg(long)]
        stamp: bool,
        /// Check chem_ID, cell_library and bc_promoter naming (Dummy wells exempt)
        #[arg(long)]
        check_library_ids: bool,
        #[arg(short, long = "out-file", default_value = "SampleSheet.csv")]
        out_file: PathBuf,
    },

    /// Write the plate map back out as range-compressed CSV worksheets
    Export {
        workbook: PathBuf,
        /// Output directory, one CSV per worksheet
        out_dir: PathBuf,
    },
}

/// Sample sheet header fields; flags override the TOML file.
#[derive(Args)]
struct HeaderArgs {
    /// TOML file with investigator, experiment, date, instrument, reads, chemistry
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    investigator: Option<String>,
    #[arg(long)]
    experiment: Option<String>,
    #[arg(long)]
    date: Option<String>,
    #[arg(long, value_enum, ignore_case = true)]
    instrument: Option<Instrument>,
    /// Cycles, e.g. 151 or 151,151 for paired end
    #[arg(long)]
    reads: Option<String>,
    #[arg(long)]
    chemistry: Option<String>,
}

impl HeaderArgs {
    fn build(self) -> Result<SampleSheetHeader> {
        let base = match &self.config {
            Some(p) => HeaderConfig::from_path(p).with_context(|| format!("reading header config {}", p.display()))?,
            None => HeaderConfig::default(),
        };
        let flags = HeaderConfig {
            investigator: self.investigator,
            experiment: self.experiment,
            date: self.date,
            instrument: self.instrument,
            reads: self.reads,
            chemistry: self.chemistry,
        };
        Ok(base.merge(flags).build()?)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose { 0 => "warn", 1 => "info", _ => "debug" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Show { workbook, csv, stamp } => cmd_show(&workbook, csv.as_deref(), stamp),
        Commands::Samplesheet { workbook, header, out_file } => cmd_samplesheet(&workbook, header, &out_file),
        Commands::Barcoded { workbook, primers, well_barcodes, header, stamp, check_library_ids, out_file } => {
            cmd_barcoded(&workbook, &primers, &well_barcodes, header, stamp, check_library_ids, &out_file)
        }
        Commands::Export { workbook, out_dir } => {
            let pm = load(&workbook, false)?;
            platemap::export::write_plate_maps(&pm, &out_dir)
                .with_context(|| format!("exporting plate maps to {}", out_dir.display()))?;
            Ok(())
        }
    }
}

fn load(path: &Path, stamp: bool) -> Result<PlateMap> {
    let wb = open_workbook(path).with_context(|| format!("opening {}", path.display()))?;
    let pm = read_plate_maps(&wb).with_context(|| format!("reading plate maps from {}", path.display()))?;
    if stamp { Ok(stamp_96_to_384(&pm)?) } else { Ok(pm) }
}

fn cmd_show(path: &Path, csv: Option<&Path>, stamp: bool) -> Result<()> {
    let table = flatten(&load(path, stamp)?)?;
    if let Some(out) = csv {
        let mut buf = Vec::new();
        table.write_csv(&mut buf)?;
        std::fs::write(out, buf).with_context(|| format!("writing {}", out.display()))?;
        return Ok(());
    }

    // Show every row and column untruncated.
    std::env::set_var("POLARS_FMT_TABLE_FORMATTING", "UTF8_FULL");
    std::env::set_var("POLARS_FMT_MAX_COLS", "100000");
    std::env::set_var("POLARS_FMT_MAX_ROWS", "1000000");
    std::env::set_var("POLARS_FMT_STR_LEN", "100000");
    std::env::set_var("POLARS_TABLE_WIDTH", "65535");
    println!("{}", table.to_dataframe()?);
    Ok(())
}

fn cmd_samplesheet(path: &Path, header: HeaderArgs, out: &Path) -> Result<()> {
    let header = header.build()?;
    let pm = load(path, false)?;
    validate(&pm, &ValidationPolicy::plate_map_indices())?;
    let sheet = plate_map_samplesheet(&flatten(&pm)?, header)?;
    sheet.write(out).with_context(|| format!("writing {}", out.display()))?;
    Ok(())
}

fn cmd_barcoded(
    path: &Path,
    primers: &Path,
    wells: &Path,
    header: HeaderArgs,
    stamp: bool,
    check_library_ids: bool,
    out: &Path,
) -> Result<()> {
    let header = header.build()?;
    let primers = PrimerTable::from_path(primers).with_context(|| format!("reading {}", primers.display()))?;
    let wells = WellBarcodes::from_path(wells).with_context(|| format!("reading {}", wells.display()))?;
    let pm = load(path, stamp)?;
    validate(&pm, &ValidationPolicy::barcode_join().with_library_ids(check_library_ids))?;
    let sheet = barcoded_samplesheet(&flatten(&pm)?, &primers, &wells, header)?;
    sheet.write(out).with_context(|| format!("writing {}", out.display()))?;
    Ok(())
}
