//! Plate maps: per-variable, per-plate value sequences.
//!
//! A [`CompactPlateMap`] is what the sheet-layout parser produces: plates may be
//! keyed by range notation (`Plate1-3`). [`expand`] turns it into a [`PlateMap`]
//! keyed by single [`PlateId`]s, which is what every other stage consumes.
//!
//! Values are stored in row-major well order (`A01`, `A02`, ..., `B01`, ...).
//! Transformations never mutate a map in place; they return a new one.
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{MissingPair, PlateMapError, Result};
use crate::grid::{Cell, GridSource, Worksheet};
use crate::plate_id::{expand_range, PlateId};
use crate::{CONSTANTS_SHEET, DUMMY, PLATE_COLUMN, PLATE_ID, SAMPLE_WELL};

/// Variable → plate range spec → values, as read from worksheets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompactPlateMap {
    vars: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl CompactPlateMap {
    /// Empty map.
    pub fn new() -> Self { Self::default() }

    /// Insert (or replace) the values for `plates` of `variable`.
    pub fn insert(&mut self, variable: &str, plates: &str, values: Vec<String>) {
        self.vars.entry(variable.to_string()).or_default().insert(plates.to_string(), values);
    }

    /// Register a variable even if it has no plates yet.
    pub fn add_variable(&mut self, variable: &str) { self.vars.entry(variable.to_string()).or_default(); }

    /// Variable names in sorted order.
    pub fn variables(&self) -> impl Iterator<Item = &str> { self.vars.keys().map(String::as_str) }

    /// Range spec → values for one variable.
    pub fn get(&self, variable: &str) -> Option<&BTreeMap<String, Vec<String>>> { self.vars.get(variable) }

    /// `(variable, range spec → values)`, sorted by variable.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, Vec<String>>)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Variable → plate → values, fully expanded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlateMap {
    vars: BTreeMap<String, BTreeMap<PlateId, Vec<String>>>,
}

impl PlateMap {
    pub fn new() -> Self { Self::default() }

    /// Insert (or replace) the values of one plate.
    pub fn insert(&mut self, variable: &str, plate: PlateId, values: Vec<String>) {
        self.vars.entry(variable.to_string()).or_default().insert(plate, values);
    }

    /// Register a variable even if it has no plates yet.
    pub fn add_variable(&mut self, variable: &str) { self.vars.entry(variable.to_string()).or_default(); }

    /// Drop a variable, returning its plates.
    pub fn remove_variable(&mut self, variable: &str) -> Option<BTreeMap<PlateId, Vec<String>>> {
        self.vars.remove(variable)
    }

    pub fn contains_variable(&self, variable: &str) -> bool { self.vars.contains_key(variable) }

    /// Variable names in sorted order.
    pub fn variables(&self) -> impl Iterator<Item = &str> { self.vars.keys().map(String::as_str) }

    /// Union of plates seen under any variable, in plate-number order.
    pub fn plates(&self) -> BTreeSet<PlateId> {
        self.vars.values().flat_map(|p| p.keys().copied()).collect()
    }

    /// Values of `variable` on `plate`, in row-major well order.
    pub fn get(&self, variable: &str, plate: PlateId) -> Option<&[String]> {
        self.vars.get(variable)?.get(&plate).map(Vec::as_slice)
    }

    /// Plate → values for one variable.
    pub fn plates_of(&self, variable: &str) -> Option<&BTreeMap<PlateId, Vec<String>>> { self.vars.get(variable) }

    /// `(variable, plate → values)`, sorted by variable.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<PlateId, Vec<String>>)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// No variables at all.
    pub fn is_empty(&self) -> bool { self.vars.is_empty() }
}

impl<S: Into<String>> FromIterator<(S, PlateId, Vec<String>)> for PlateMap {
    fn from_iter<I: IntoIterator<Item = (S, PlateId, Vec<String>)>>(iter: I) -> Self {
        let mut pm = PlateMap::new();
        for (var, plate, values) in iter {
            let var: String = var.into();
            pm.insert(&var, plate, values);
        }
        pm
    }
}

/// Expand every range spec and replicate its values under each covered plate.
///
/// A plate reached twice for the same variable is a [`PlateMapError::DuplicatePlateId`].
pub fn expand(raw: &CompactPlateMap) -> Result<PlateMap> {
    let mut out = PlateMap::new();
    for (var, plates) in raw.iter() {
        out.add_variable(var);
        for (spec, values) in plates {
            for plate in expand_range(spec)? {
                if out.get(var, plate).is_some() {
                    return Err(PlateMapError::DuplicatePlateId { worksheet: var.to_string(), plate: plate.to_string() });
                }
                out.insert(var, plate, values.clone());
            }
        }
    }
    Ok(out)
}

/// Every variable must define every plate observed anywhere in the map.
///
/// All missing `(variable, plate)` pairs are reported together.
pub fn check_consistency(pm: &PlateMap) -> Result<()> {
    let plates = pm.plates();
    let mut missing = Vec::new();
    for (var, defined) in pm.iter() {
        for plate in plates.iter().filter(|p| !defined.contains_key(*p)) {
            missing.push(MissingPair { variable: var.to_string(), plate: plate.to_string() });
        }
    }
    if missing.is_empty() { Ok(()) } else { Err(PlateMapError::MissingVariable(missing)) }
}

/// Number of wells per plate, agreed on by every variable.
pub fn plate_sizes(pm: &PlateMap) -> Result<BTreeMap<PlateId, usize>> {
    let mut seen: BTreeMap<PlateId, BTreeSet<usize>> = BTreeMap::new();
    for (_, plates) in pm.iter() {
        for (plate, values) in plates {
            seen.entry(*plate).or_default().insert(values.len());
        }
    }
    let bad: Vec<String> = seen.iter().filter(|(_, s)| s.len() > 1).map(|(p, _)| p.to_string()).collect();
    if !bad.is_empty() {
        return Err(PlateMapError::SizeMismatch(bad));
    }
    Ok(seen.into_iter().filter_map(|(p, s)| s.into_iter().next().map(|n| (p, n))).collect())
}

/// The `_constants` tab: one row per plate, one column per plate-wide variable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConstantsTable {
    /// Variable columns, excluding `Plate`.
    pub columns: Vec<String>,
    /// Plate → one value per column.
    pub rows: BTreeMap<PlateId, Vec<String>>,
}

impl ConstantsTable {
    pub fn plates(&self) -> BTreeSet<PlateId> { self.rows.keys().copied().collect() }

    pub fn value(&self, plate: PlateId, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(&plate)?.get(idx).map(String::as_str)
    }

    /// Parse a header row containing `Plate` followed by one row per plate.
    pub fn from_worksheet(ws: &Worksheet) -> Result<Self> {
        let mut rows = ws.rows.iter().filter(|r| !Worksheet::is_blank_row(r));
        let header: Vec<String> = match rows.next() {
            Some(h) => h.iter().map(|c| c.to_string().trim().to_string()).collect(),
            None => return Err(PlateMapError::MissingPlateColumn),
        };
        let plate_idx = header.iter().position(|h| h == PLATE_COLUMN).ok_or(PlateMapError::MissingPlateColumn)?;

        let mut columns: Vec<(usize, String)> = Vec::new();
        for (i, name) in header.iter().enumerate() {
            if i == plate_idx || name.is_empty() { continue; }
            if name == SAMPLE_WELL || name == PLATE_ID {
                return Err(PlateMapError::ReservedVariable(name.clone()));
            }
            if columns.iter().any(|(_, c)| c == name) {
                return Err(PlateMapError::DuplicateVariable(vec![name.clone()]));
            }
            columns.push((i, name.clone()));
        }

        let mut table = ConstantsTable { columns: columns.iter().map(|(_, c)| c.clone()).collect(), rows: BTreeMap::new() };
        for row in rows {
            let cell = |i: usize| row.get(i).map(Cell::to_string).unwrap_or_default();
            let plate: PlateId = cell(plate_idx).trim().parse()?;
            let values = columns.iter().map(|(i, _)| cell(*i)).collect();
            if table.rows.insert(plate, values).is_some() {
                return Err(PlateMapError::DuplicatePlateId { worksheet: ws.name.clone(), plate: plate.to_string() });
            }
        }
        Ok(table)
    }

    /// Render back into worksheet form (`Plate` first, then columns).
    pub fn to_worksheet(&self) -> Worksheet {
        let mut grid = vec![std::iter::once(PLATE_COLUMN.to_string()).chain(self.columns.iter().cloned())
            .map(Cell::Text).collect::<Vec<_>>()];
        for (plate, values) in &self.rows {
            grid.push(std::iter::once(plate.to_string()).chain(values.iter().cloned()).map(|s| Cell::from(s.as_str())).collect());
        }
        Worksheet::new(CONSTANTS_SHEET, grid)
    }
}

/// Locate and parse the `_constants` worksheet.
pub fn get_constants_tab<S: GridSource + ?Sized>(source: &S) -> Result<ConstantsTable> {
    let ws = source.worksheet(CONSTANTS_SHEET).ok_or(PlateMapError::MissingConstants)?;
    ConstantsTable::from_worksheet(ws)
}

fn plate_names<'a>(plates: impl Iterator<Item = &'a PlateId>) -> Vec<String> {
    plates.map(|p| p.to_string()).collect()
}

/// Add every constant as a full per-well value list.
///
/// The constants' plate set must equal the plate map's, and no variable may be
/// defined on both sides.
pub fn overlay_constants(pm: &PlateMap, constants: &ConstantsTable) -> Result<PlateMap> {
    let sizes = plate_sizes(pm)?;
    let in_maps: BTreeSet<PlateId> = sizes.keys().copied().collect();
    let in_constants = constants.plates();
    if in_maps != in_constants {
        return Err(PlateMapError::SetMismatch {
            only_in_plate_maps: plate_names(in_maps.difference(&in_constants)),
            only_in_constants: plate_names(in_constants.difference(&in_maps)),
        });
    }

    let dup: Vec<String> = constants.columns.iter().filter(|c| pm.contains_variable(c)).cloned().collect();
    if !dup.is_empty() {
        return Err(PlateMapError::DuplicateVariable(dup));
    }

    let mut out = pm.clone();
    for (plate, size) in &sizes {
        for (idx, var) in constants.columns.iter().enumerate() {
            let value = constants.rows.get(plate).and_then(|r| r.get(idx)).cloned().unwrap_or_default();
            out.insert(var, *plate, vec![value; *size]);
        }
    }
    Ok(out)
}

/// Move variables holding one value per plate (on every plate) into a constants table.
///
/// Inverse of [`overlay_constants`]; `exclude` names variables that always stay per-well.
pub fn extract_constants(pm: &PlateMap, exclude: &[&str]) -> (PlateMap, ConstantsTable) {
    let constant_vars: Vec<&str> = pm.iter()
        .filter(|(var, _)| !exclude.contains(var))
        .filter(|(_, plates)| !plates.is_empty() && plates.values().all(|v| !v.is_empty() && v.iter().all(|x| *x == v[0])))
        .map(|(var, _)| var)
        .collect();

    let mut slim = pm.clone();
    let mut table = ConstantsTable { columns: constant_vars.iter().map(|s| s.to_string()).collect(), rows: BTreeMap::new() };
    for plate in pm.plates() {
        let values = constant_vars.iter()
            .map(|var| pm.get(var, plate).and_then(|v| v.first()).cloned().unwrap_or_default())
            .collect();
        table.rows.insert(plate, values);
    }
    for var in &constant_vars { slim.remove_variable(var); }
    (slim, table)
}

/// Read, expand, check and overlay constants: the full workbook → [`PlateMap`] path.
pub fn read_plate_maps<S: GridSource + ?Sized>(source: &S) -> Result<PlateMap> {
    let raw = crate::layout::read_plate_map_sheets(source)?;
    let pm = expand(&raw)?;
    check_consistency(&pm)?;
    let constants = get_constants_tab(source)?;
    let pm = overlay_constants(&pm, &constants)?;
    log::info!("assembled {} variables across {} plates", pm.variables().count(), pm.plates().len());
    Ok(pm)
}

/// Default variables left per-well by [`extract_constants`] and [`crate::compress::compress`].
pub const DEFAULT_EXCLUDE: &[&str] = &[DUMMY];

#[cfg(test)]
mod plate_map_tests {
    use super::*;

    fn vals(n: usize, v: &str) -> Vec<String> { vec![v.to_string(); n] }

    fn constants(cols: &[&str], rows: Vec<(u32, Vec<&str>)>) -> ConstantsTable {
        ConstantsTable {
            columns: cols.iter().map(|s| s.to_string()).collect(),
            rows: rows.into_iter().map(|(p, v)| (PlateId(p), v.into_iter().map(String::from).collect())).collect(),
        }
    }

    #[test]
    fn expand_replicates_ranges() {
        let mut raw = CompactPlateMap::new();
        raw.insert("assay", "Plate1-3", vals(6, "x"));
        raw.insert("assay", "Plate5", vals(6, "y"));
        let pm = expand(&raw).unwrap();
        assert_eq!(pm.plates().len(), 4);
        assert_eq!(pm.get("assay", PlateId(2)).unwrap(), vals(6, "x").as_slice());
        assert_eq!(pm.get("assay", PlateId(5)).unwrap()[0], "y");
    }

    #[test]
    fn overlapping_ranges_are_duplicates() {
        let mut raw = CompactPlateMap::new();
        raw.insert("assay", "Plate1-3", vals(6, "x"));
        raw.insert("assay", "Plate2", vals(6, "y"));
        assert!(matches!(expand(&raw), Err(PlateMapError::DuplicatePlateId { plate, .. }) if plate == "Plate2"));
    }

    #[test]
    fn missing_variable_reports_all_pairs() {
        let pm: PlateMap = [
            ("cell_library", PlateId(1), vals(96, "cb1")),
            ("chem_ID", PlateId(2), vals(96, "C-1")),
        ].into_iter().collect();
        match check_consistency(&pm) {
            Err(PlateMapError::MissingVariable(pairs)) => {
                assert_eq!(pairs.len(), 2);
                assert!(pairs.contains(&MissingPair { variable: "chem_ID".into(), plate: "Plate1".into() }));
                assert!(pairs.contains(&MissingPair { variable: "cell_library".into(), plate: "Plate2".into() }));
            }
            other => panic!("expected MissingVariable, got {other:?}"),
        }
    }

    #[test]
    fn size_mismatch_lists_plates() {
        let pm: PlateMap = [
            ("a", PlateId(1), vals(96, "x")),
            ("b", PlateId(1), vals(384, "x")),
            ("a", PlateId(2), vals(6, "x")),
            ("b", PlateId(2), vals(6, "x")),
        ].into_iter().collect();
        assert!(matches!(plate_sizes(&pm), Err(PlateMapError::SizeMismatch(p)) if p == ["Plate1"]));
    }

    #[test]
    fn overlay_expands_constants_per_well() {
        let pm: PlateMap = [("assay", PlateId(1), vals(6, "x")), ("assay", PlateId(2), vals(24, "y"))].into_iter().collect();
        let c = constants(&["Dummy"], vec![(1, vec!["TRUE"]), (2, vec!["FALSE"])]);
        let full = overlay_constants(&pm, &c).unwrap();
        assert_eq!(full.get("Dummy", PlateId(1)).unwrap(), vals(6, "TRUE").as_slice());
        assert_eq!(full.get("Dummy", PlateId(2)).unwrap(), vals(24, "FALSE").as_slice());
    }

    #[test]
    fn overlay_set_mismatch_both_directions() {
        let pm: PlateMap = [("assay", PlateId(1), vals(6, "x"))].into_iter().collect();
        let c = constants(&["Dummy"], vec![(1, vec!["TRUE"]), (2, vec!["TRUE"])]);
        match overlay_constants(&pm, &c) {
            Err(PlateMapError::SetMismatch { only_in_plate_maps, only_in_constants }) => {
                assert!(only_in_plate_maps.is_empty());
                assert_eq!(only_in_constants, ["Plate2"]);
            }
            other => panic!("expected SetMismatch, got {other:?}"),
        }
        let c = constants(&["Dummy"], vec![]);
        assert!(matches!(overlay_constants(&pm, &c),
            Err(PlateMapError::SetMismatch { only_in_plate_maps, .. }) if only_in_plate_maps == ["Plate1"]));
    }

    #[test]
    fn overlay_rejects_duplicate_variables() {
        let pm: PlateMap = [("assay", PlateId(1), vals(6, "x"))].into_iter().collect();
        let c = constants(&["assay"], vec![(1, vec!["y"])]);
        assert!(matches!(overlay_constants(&pm, &c), Err(PlateMapError::DuplicateVariable(v)) if v == ["assay"]));
    }

    #[test]
    fn constants_worksheet_parse() {
        let ws = Worksheet::from_strings("_constants", &[
            vec!["Plate", "Dummy", "molarity"],
            vec!["Plate1", "TRUE", "2"],
            vec![],
            vec!["Plate3", "FALSE"],
        ]);
        let c = ConstantsTable::from_worksheet(&ws).unwrap();
        assert_eq!(c.columns, ["Dummy", "molarity"]);
        assert_eq!(c.value(PlateId(1), "molarity"), Some("2"));
        assert_eq!(c.value(PlateId(3), "molarity"), Some(""));
        assert_eq!(ConstantsTable::from_worksheet(&c.to_worksheet()).unwrap(), c);
    }

    #[test]
    fn constants_worksheet_errors() {
        let no_plate = Worksheet::from_strings("_constants", &[vec!["Dummy"], vec!["TRUE"]]);
        assert!(matches!(ConstantsTable::from_worksheet(&no_plate), Err(PlateMapError::MissingPlateColumn)));
        let dup = Worksheet::from_strings("_constants", &[vec!["Plate"], vec!["Plate1"], vec!["Plate1"]]);
        assert!(matches!(ConstantsTable::from_worksheet(&dup), Err(PlateMapError::DuplicatePlateId { .. })));
        let ranged = Worksheet::from_strings("_constants", &[vec!["Plate"], vec!["Plate1-2"]]);
        assert!(matches!(ConstantsTable::from_worksheet(&ranged), Err(PlateMapError::Format { .. })));
    }

    #[test]
    fn extract_is_inverse_of_overlay() {
        let pm: PlateMap = [
            ("assay", PlateId(1), vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into(), "f".into()]),
            ("molarity", PlateId(1), vals(6, "2")),
            ("Dummy", PlateId(1), vals(6, "FALSE")),
        ].into_iter().collect();
        let (slim, table) = extract_constants(&pm, DEFAULT_EXCLUDE);
        assert_eq!(table.columns, ["molarity"]);
        assert!(slim.contains_variable("Dummy"));
        assert!(!slim.contains_variable("molarity"));
        assert_eq!(overlay_constants(&slim, &table).unwrap(), pm);
    }
}
