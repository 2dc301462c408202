//! Grid alignment and exact-join merge.
//!
//! `sfcWind`, `uas` and `vas` are published with one extra latitude row
//! compared with every other variable on the nominal 60km grid. Before the
//! exact join their first row is dropped and their horizontal coordinates
//! are replaced with the base dataset's. The replaced values are asserted to
//! match the base grid, not checked.

use tracing::{debug, warn};

use crate::{
    dataset::{Dataset, Variable},
    error::ReconcileError,
    WIND_VARIABLES,
};

/// Coordinates taken from the base dataset when forcing a wind grid.
const FORCED: [&str; 4] = ["latitude", "longitude", "latitude_bnds", "longitude_bnds"];
const REQUIRED: [&str; 2] = ["latitude", "longitude"];

/// The dataset the others are aligned to: the first one on the nominal grid,
/// or the first input when every input is a wind file.
pub fn alignment_base(datasets: &[Dataset]) -> Option<&Dataset> {
    datasets
        .iter()
        .find(|ds| !is_wind(ds))
        .or_else(|| datasets.first())
}

/// Copy every input, drop `height`, and force wind grids onto `base`.
/// A wind `base` means the inputs already share the wind grid, so nothing
/// is forced. The inputs are left untouched.
pub fn align(datasets: &[Dataset], base: &Dataset) -> Result<Vec<Dataset>, ReconcileError> {
    let force = !is_wind(base);
    datasets
        .iter()
        .map(|ds| {
            let mut ds = ds.clone();
            ds.remove("height");
            if force && is_wind(&ds) {
                force_onto(&mut ds, base)?;
            }
            Ok(ds)
        })
        .collect()
}

/// Align then merge under an exact join.
pub fn reconcile(datasets: &[Dataset], base: &Dataset) -> Result<Dataset, ReconcileError> {
    let aligned = align(datasets, base)?;
    merge_exact(&aligned)
}

/// Merge datasets that must already agree on every shared dimension,
/// dimension coordinate, and variable. The first dataset to define an
/// attribute wins.
pub fn merge_exact(datasets: &[Dataset]) -> Result<Dataset, ReconcileError> {
    let mut iter = datasets.iter();
    let mut merged = iter.next().ok_or(ReconcileError::Empty)?.clone();

    for ds in iter {
        for (dim, &len) in &ds.dims {
            match merged.dims.get(dim) {
                Some(&have) if have != len => {
                    return Err(ReconcileError::DimensionMismatch {
                        dim: dim.clone(),
                        left: have,
                        right: len,
                    })
                }
                Some(_) => {}
                None => {
                    merged.dims.insert(dim.clone(), len);
                }
            }
        }

        for (name, var) in &ds.variables {
            match merged.variables.get(name) {
                Some(existing) => check_compatible(name, existing, var, ds.dims.contains_key(name))?,
                None => merged.insert(name, var.clone())?,
            }
        }

        for (key, value) in &ds.attrs {
            merged.attrs.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    debug!(
        datasets = datasets.len(),
        variables = merged.variables.len(),
        "merged datasets"
    );
    Ok(merged)
}

fn is_wind(ds: &Dataset) -> bool {
    ds.data_vars().any(|(name, _)| WIND_VARIABLES.contains(&name.as_str()))
}

fn force_onto(ds: &mut Dataset, base: &Dataset) -> Result<(), ReconcileError> {
    for name in REQUIRED {
        if base.variable(name).is_none() {
            return Err(ReconcileError::MissingBaseCoordinate(name.to_string()));
        }
    }

    ds.slice_from("latitude", 1)?;
    for name in FORCED {
        let Some(var) = base.variable(name) else {
            continue;
        };
        let found = ds.shape(name).unwrap_or_default();
        let want = base.shape(name).unwrap_or_default();
        if ds.variable(name).is_some() && found != want {
            return Err(ReconcileError::GridShape {
                name: name.to_string(),
                found,
                base: want,
            });
        }
        ds.insert(name, var.clone()).map_err(|_| ReconcileError::GridShape {
            name: name.to_string(),
            found,
            base: want,
        })?;
    }

    warn!(
        variables = ?ds.data_vars().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
        latitude = ds.dims.get("latitude").copied().unwrap_or_default(),
        "forced wind grid onto base coordinates"
    );
    Ok(())
}

fn check_compatible(
    name: &str,
    left: &Variable,
    right: &Variable,
    is_dimension: bool,
) -> Result<(), ReconcileError> {
    let same_values = match (&left.values, &right.values) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    };
    if is_dimension && !same_values {
        return Err(ReconcileError::CoordinateMismatch(name.to_string()));
    }
    if left.dims != right.dims || left.kind != right.kind || !same_values {
        return Err(ReconcileError::VariableConflict(name.to_string()));
    }
    Ok(())
}
