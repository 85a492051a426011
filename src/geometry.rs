//! Microplate geometry: rows, columns and well labels for a plate size.
//!
//! Supported plates come from two aspect-ratio families, **2:3** (6, 24, 96, 384,
//! 1536 wells) and **3:4** (12, 48 wells). The 2:3 family is tried first.
//!
//! # Examples
//! ```
//! use platemap::geometry::{rows_for_size, cols_for_size, row_letters};
//! assert_eq!(rows_for_size(96).unwrap(), 8);
//! assert_eq!(cols_for_size(96).unwrap(), 12);
//! assert_eq!(row_letters(384).unwrap().last().unwrap(), "P");
//! ```
use crate::error::{PlateMapError, Result};

/// Plate sizes accepted anywhere in the crate.
pub const PLATE_SIZES: [usize; 7] = [6, 12, 24, 48, 96, 384, 1536];

/// Valid `(rows, cols)` block dimensions, index-aligned with [`PLATE_SIZES`].
pub const PLATE_DIMS: [(usize, usize); 7] = [(2, 3), (3, 4), (4, 6), (6, 8), (8, 12), (16, 24), (32, 48)];

/// `true` if `(rows, cols)` is the layout of a supported plate.
pub fn is_valid_dims(rows: usize, cols: usize) -> bool { PLATE_DIMS.contains(&(rows, cols)) }

fn exact_sqrt(n: usize) -> Option<usize> {
    let r = (n as f64).sqrt().round() as usize;
    (r * r == n).then_some(r)
}

/// `num * n / den` when exact and a perfect square.
fn family_side(n: usize, num: usize, den: usize) -> Option<usize> {
    if (num * n) % den != 0 { return None; }
    exact_sqrt(num * n / den)
}

fn dims_for_size(n: usize) -> Result<(usize, usize)> {
    let dims = [(2, 3, 3, 2), (3, 4, 4, 3)].iter().find_map(|&(rn, rd, cn, cd)| {
        let rows = family_side(n, rn, rd)?;
        let cols = family_side(n, cn, cd)?;
        (rows * cols == n).then_some((rows, cols))
    });
    match dims {
        Some(d) if PLATE_SIZES.contains(&n) => Ok(d),
        _ => Err(PlateMapError::InvalidPlateSize(n)),
    }
}

/// Number of rows on a plate of `n` wells.
pub fn rows_for_size(n: usize) -> Result<usize> { dims_for_size(n).map(|d| d.0) }

/// Number of columns on a plate of `n` wells.
pub fn cols_for_size(n: usize) -> Result<usize> { dims_for_size(n).map(|d| d.1) }

/// Spreadsheet-style label for the zero-based row `i`: `A`..`Z`, `AA`..`AZ`, `BA`, ...
pub fn row_label(i: usize) -> String {
    let mut n = i + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// The first `rows_for_size(n)` row labels, in order.
pub fn row_letters(n: usize) -> Result<Vec<String>> {
    Ok((0..rows_for_size(n)?).map(row_label).collect())
}

/// Well label: row letter(s) plus a zero-padded two-digit column number (`A01`).
pub fn well_label(row: usize, col: usize) -> String { format!("{}{:02}", row_label(row), col + 1) }

/// All well labels of a plate of `n` wells in row-major order.
pub fn well_labels(n: usize) -> Result<Vec<String>> {
    let (rows, cols) = dims_for_size(n)?;
    Ok((0..rows).flat_map(|r| (0..cols).map(move |c| well_label(r, c))).collect())
}
