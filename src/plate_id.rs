//! Plate identifiers and the compact multi-plate range notation.
//!
//! A single plate is named `PlateN`. Several plates sharing identical content can be
//! written as one range spec such as `Plate1-3,5-7`.
//!
//! # Examples
//! ```
//! use platemap::plate_id::{expand_range, compress_range, PlateId};
//! let ids = expand_range("Plate1-3,5").unwrap();
//! assert_eq!(ids.iter().map(|p| p.to_string()).collect::<Vec<_>>(), ["Plate1", "Plate2", "Plate3", "Plate5"]);
//! assert_eq!(compress_range(&[PlateId(5), PlateId(2), PlateId(1), PlateId(3)]), "Plate1-3,5");
//! ```
use core::fmt;
use std::str::FromStr;

use crate::error::{PlateMapError, Result};

/// Prefix shared by every plate identifier.
pub const PLATE_PREFIX: &str = "Plate";

/// Most plates a single range spec may cover.
pub const MAX_PLATES_PER_RANGE: usize = 10_000;

/// Canonical plate identifier; orders by plate number.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PlateId(pub u32);

impl fmt::Display for PlateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}{}", PLATE_PREFIX, self.0) }
}

impl FromStr for PlateId {
    type Err = PlateMapError;

    /// Parse exactly one plate (`Plate7`); ranges are rejected.
    fn from_str(s: &str) -> Result<Self> {
        match expand_range(s)?.as_slice() {
            [one] if !s.contains([',', '-']) => Ok(*one),
            _ => Err(format_error(s, "expected a single plate")),
        }
    }
}

fn format_error(spec: &str, reason: &str) -> PlateMapError {
    PlateMapError::Format { spec: spec.to_string(), reason: reason.to_string() }
}

fn parse_number(spec: &str, item: &str) -> Result<u32> {
    item.trim().parse::<u32>().map_err(|_| format_error(spec, &format!("\"{}\" is not an integer", item.trim())))
}

/// Expand `Plate<list>` into every plate it covers, in listed order.
///
/// `<list>` is a comma-separated list of integers or inclusive `start-end` pairs,
/// covering at most [`MAX_PLATES_PER_RANGE`] plates in total.
pub fn expand_range(spec: &str) -> Result<Vec<PlateId>> {
    let body = spec.trim().strip_prefix(PLATE_PREFIX)
        .ok_or_else(|| format_error(spec, "must start with \"Plate\""))?;
    let mut out = Vec::new();
    for item in body.split(',') {
        let parts: Vec<&str> = item.split('-').collect();
        let (start, end) = match parts.as_slice() {
            [single] => { let n = parse_number(spec, single)?; (n, n) }
            [a, b] => (parse_number(spec, a)?, parse_number(spec, b)?),
            _ => return Err(format_error(spec, &format!("\"{item}\" has more than two dash-separated parts"))),
        };
        if start > end {
            return Err(format_error(spec, &format!("range \"{}\" is descending", item.trim())));
        }
        if out.len() + (end - start) as usize + 1 > MAX_PLATES_PER_RANGE {
            return Err(format_error(spec, &format!("covers more than {MAX_PLATES_PER_RANGE} plates")));
        }
        out.extend((start..=end).map(PlateId));
    }
    Ok(out)
}

/// Collapse plates into range notation: sort, merge consecutive runs, join with commas.
///
/// Duplicates are ignored. An empty slice yields the bare prefix.
pub fn compress_range(plates: &[PlateId]) -> String {
    let mut nums: Vec<u32> = plates.iter().map(|p| p.0).collect();
    nums.sort_unstable();
    nums.dedup();
    let mut runs: Vec<(u32, u32)> = Vec::new();
    for n in nums {
        match runs.last_mut() {
            Some((_, hi)) if *hi + 1 == n => *hi = n,
            _ => runs.push((n, n)),
        }
    }
    let tokens: Vec<String> = runs.iter()
        .map(|&(lo, hi)| if lo == hi { lo.to_string() } else { format!("{lo}-{hi}") })
        .collect();
    format!("{}{}", PLATE_PREFIX, tokens.join(","))
}
