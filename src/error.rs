//! Error taxonomy for plate-map parsing, assembly and sample-sheet emission.
//!
//! Every variant carries the worksheet, variable or plate identifiers needed to
//! locate the problem in the source spreadsheet. Nothing here is recovered from
//! automatically: callers abort the run and report the message.
use std::fmt;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = PlateMapError> = std::result::Result<T, E>;

/// A `(variable, plate)` pair that is absent from a plate map.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct MissingPair {
    pub variable: String,
    pub plate: String,
}

impl fmt::Display for MissingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}\t{}", self.variable, self.plate) }
}

#[derive(Debug, Error)]
pub enum PlateMapError {
    /// Malformed plate-ID range syntax.
    #[error("\"{spec}\" is not a valid plate id: {reason}. The proper format is \"PlateX-Y,W-Z\", where X, Y, W & Z are integers")]
    Format { spec: String, reason: String },

    /// Block (or plate size) outside the supported 6..1536 family.
    #[error("worksheet \"{worksheet}\": plate has invalid dimensions {rows} x {cols}; plate size must be one of 6, 12, 24, 48, 96, 384, 1536")]
    InvalidGeometry { worksheet: String, rows: usize, cols: usize },

    /// A plate size with no 2:3 or 3:4 layout.
    #[error("{0} is not a valid plate size")]
    InvalidPlateSize(usize),

    /// Interior rows of one block disagree in width.
    #[error("worksheet \"{worksheet}\": rows of plate \"{plate}\" are not of equal length")]
    UnequalRows { worksheet: String, plate: String },

    /// One plate reached by two blocks (or range items) of the same variable.
    #[error("worksheet \"{worksheet}\": plate \"{plate}\" is defined more than once")]
    DuplicatePlateId { worksheet: String, plate: String },

    /// Plates some variables define and others do not.
    #[error("the following plates are missing from their respective variables:\nVariable\tPlate\n{}", join_lines(.0))]
    MissingVariable(Vec<MissingPair>),

    /// A plate whose well count differs between variables.
    #[error("the following plates have different sizes across the variables:\n{}", .0.join("\n"))]
    SizeMismatch(Vec<String>),

    /// The plate sets of the variable worksheets and `_constants` differ.
    #[error("plates in the plate maps and the \"_constants\" tab disagree; only in plate maps: [{}]; only in \"_constants\": [{}]", .only_in_plate_maps.join(", "), .only_in_constants.join(", "))]
    SetMismatch { only_in_plate_maps: Vec<String>, only_in_constants: Vec<String> },

    /// A variable given both as a worksheet and as a `_constants` column.
    #[error("the following variables are defined in both the individual plate maps and the \"_constants\" tab: {}", .0.join(", "))]
    DuplicateVariable(Vec<String>),

    /// No `_constants` worksheet.
    #[error("a worksheet named \"_constants\" must be present in the workbook")]
    MissingConstants,

    /// `_constants` has no `Plate` column.
    #[error("a column named \"Plate\" must be present in the \"_constants\" tab")]
    MissingPlateColumn,

    /// A worksheet named after a derived variable (`Sample_Well`, `Plate_ID`).
    #[error("\"{0}\" is a reserved variable name and cannot be used as a worksheet")]
    ReservedVariable(String),

    /// Variables a sample-sheet flow needs but the plate map lacks.
    #[error("the following required variables are not present: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    /// A value failing a validation rule.
    #[error("{variable}: {message}")]
    InvalidValue { variable: String, message: String },

    /// Malformed primer or well-barcode table, or a failed join against it.
    #[error("barcode table \"{table}\": {message}")]
    BarcodeTable { table: String, message: String },

    /// Missing or unusable header field.
    #[error("invalid sample sheet header: {0}")]
    InvalidHeader(String),

    /// The exported workbook does not parse back to the same plate map.
    #[error("round trip of exported plate maps failed: {0}")]
    RoundTrip(String),

    // Wrapped library errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Xlsx(#[from] calamine::Error),

    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

fn join_lines(pairs: &[MissingPair]) -> String {
    pairs.iter().map(|p| p.to_string()).collect::<Vec<_>>().join("\n")
}
