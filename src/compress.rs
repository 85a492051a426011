//! Compression of an expanded [`PlateMap`] back into range notation.
//!
//! For each variable, plates holding identical value sequences are grouped and
//! keyed by one range spec (`Plate1-3,7`). [`crate::plate_map::expand`] undoes this
//! exactly: `expand(&compress(&p, ..)) == p` for every plate map `p`.
use std::collections::BTreeMap;

use crate::plate_id::{compress_range, PlateId, MAX_PLATES_PER_RANGE};
use crate::plate_map::{CompactPlateMap, PlateMap};

/// Group plates by identical values; variables in `exclude` keep one entry per plate.
///
/// Groups larger than [`MAX_PLATES_PER_RANGE`] are split so every key expands again.
pub fn compress(pm: &PlateMap, exclude: &[&str]) -> CompactPlateMap {
    let mut out = CompactPlateMap::new();
    for (var, plates) in pm.iter() {
        out.add_variable(var);
        if exclude.contains(&var) {
            for (plate, values) in plates { out.insert(var, &plate.to_string(), values.clone()); }
            continue;
        }
        let mut groups: BTreeMap<&[String], Vec<PlateId>> = BTreeMap::new();
        for (plate, values) in plates {
            groups.entry(values.as_slice()).or_default().push(*plate);
        }
        for (values, members) in groups {
            for chunk in members.chunks(MAX_PLATES_PER_RANGE) {
                out.insert(var, &compress_range(chunk), values.to_vec());
            }
        }
    }
    out
}
