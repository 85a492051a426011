//! Validation policies applied to an assembled [`PlateMap`] before output.
//!
//! Two checks are available:
//! - **required variables**: each sample-sheet flow needs certain variables;
//! - **library identifiers** (opt-in): `chem_ID`, `cell_library` and `bc_promoter`
//!   must follow the lab's naming scheme, except on wells flagged `Dummy = TRUE`.
use std::collections::BTreeSet;

use regex::Regex;

use crate::error::{PlateMapError, Result};
use crate::plate_map::PlateMap;
use crate::DUMMY;

/// Allowed `bc_promoter` values.
pub const BC_PROMOTERS: [&str; 4] = ["cag", "cre", "gal4uas", "mixed"];

/// Variables the library-identifier check reads.
pub const LIBRARY_VARS: [&str; 6] = ["cell_library", "bc_promoter", "chem_ID", "molarity", "Sample_Plate", DUMMY];

/// What to check before writing a sample sheet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub required: BTreeSet<String>,
    pub check_library_ids: bool,
}

impl ValidationPolicy {
    /// Sample sheet built from plate-map index columns.
    pub fn plate_map_indices() -> Self {
        ValidationPolicy { required: ["assay", "index", "index2"].map(String::from).into(), check_library_ids: false }
    }

    /// Sample sheet built by joining primer and well barcode tables.
    pub fn barcode_join() -> Self {
        ValidationPolicy { required: BTreeSet::from(["Sample_Plate".to_string()]), check_library_ids: false }
    }

    /// Toggle the `chem_ID`/`cell_library`/`bc_promoter` naming checks, which also become required.
    pub fn with_library_ids(mut self, on: bool) -> Self {
        self.check_library_ids = on;
        if on { self.required.extend(LIBRARY_VARS.map(String::from)); }
        self
    }

    /// Add required variables.
    pub fn require<I: IntoIterator<Item = String>>(mut self, vars: I) -> Self {
        self.required.extend(vars);
        self
    }
}

/// Fail with every required variable the plate map lacks.
pub fn check_required(pm: &PlateMap, required: &BTreeSet<String>) -> Result<()> {
    let missing: Vec<String> = required.iter().filter(|v| !pm.contains_variable(v)).cloned().collect();
    if missing.is_empty() { Ok(()) } else { Err(PlateMapError::MissingRequired(missing)) }
}

fn check_each(pm: &PlateMap, var: &str, message: &str, ok: impl Fn(&str) -> bool) -> Result<()> {
    let mut bad = BTreeSet::new();
    for plate in pm.plates() {
        let (Some(values), Some(dummy)) = (pm.get(var, plate), pm.get(DUMMY, plate)) else { continue };
        for (v, d) in values.iter().zip(dummy) {
            if d != "TRUE" && !ok(v) { bad.insert(v.clone()); }
        }
    }
    if bad.is_empty() {
        return Ok(());
    }
    Err(PlateMapError::InvalidValue {
        variable: var.to_string(),
        message: format!("{message}; offending values: {}", bad.into_iter().collect::<Vec<_>>().join(", ")),
    })
}

/// Check `chem_ID`, `cell_library` and `bc_promoter` naming on non-dummy wells.
pub fn check_library_ids(pm: &PlateMap) -> Result<()> {
    let chem_id = Regex::new(r"^C-\d+")?;
    let cell_library = Regex::new(r"^(cb\d+|vl\d+)")?;
    check_each(pm, "chem_ID", "chem_ID must be C-X, where X is numeric", |v| chem_id.is_match(v))?;
    check_each(pm, "cell_library", "cell_library must be cbX or vlX, where X is numeric", |v| cell_library.is_match(v))?;
    check_each(pm, "bc_promoter", &format!("bc_promoter must be one of {}", BC_PROMOTERS.join(", ")), |v| BC_PROMOTERS.contains(&v))
}

/// Apply a policy.
pub fn validate(pm: &PlateMap, policy: &ValidationPolicy) -> Result<()> {
    check_required(pm, &policy.required)?;
    if policy.check_library_ids { check_library_ids(pm)?; }
    Ok(())
}
