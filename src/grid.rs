//! Worksheet grids, independent of any spreadsheet library.
//!
//! The parser and assembler only ever see a [`GridSource`]: a list of named
//! worksheets, each a 2-D grid of [`Cell`]s. Concrete sources live in
//! [`crate::workbook`].
use core::fmt;

/// One spreadsheet cell value.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// `true` for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) | Cell::Bool(_) => false,
        }
    }
}

impl fmt::Display for Cell {
    /// Booleans render as `TRUE`/`FALSE`, integral numbers without a decimal point.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Bool(true) => f.write_str("TRUE"),
            Cell::Bool(false) => f.write_str("FALSE"),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self { if s.is_empty() { Cell::Empty } else { Cell::Text(s.to_string()) } }
}

/// A named worksheet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Worksheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Worksheet {
    /// Build a worksheet, trimming trailing blank cells from each row and
    /// trailing blank rows from the grid.
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        let mut rows: Vec<Vec<Cell>> = rows.into_iter().map(|mut r| {
            while r.last().is_some_and(Cell::is_blank) { r.pop(); }
            r
        }).collect();
        while rows.last().is_some_and(|r| r.is_empty()) { rows.pop(); }
        Worksheet { name: name.into(), rows }
    }

    /// Convenience for tests and CSV input: every string becomes a text cell.
    pub fn from_strings(name: impl Into<String>, rows: &[Vec<&str>]) -> Self {
        Worksheet::new(name, rows.iter().map(|r| r.iter().map(|s| Cell::from(*s)).collect()).collect())
    }

    pub fn is_blank_row(row: &[Cell]) -> bool { row.iter().all(Cell::is_blank) }
}

/// Anything that can hand out named worksheet grids.
pub trait GridSource {
    /// All worksheets, in workbook order.
    fn worksheets(&self) -> &[Worksheet];

    fn worksheet(&self, name: &str) -> Option<&Worksheet> {
        self.worksheets().iter().find(|w| w.name == name)
    }
}

/// An in-memory workbook.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Worksheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Worksheet>) -> Self { Workbook { sheets } }
}

impl GridSource for Workbook {
    fn worksheets(&self) -> &[Worksheet] { &self.sheets }
}
