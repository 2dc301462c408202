//! NetCDF → [`Dataset`].
//!
//! Reads structure only. Values are loaded for coordinate and bounds
//! variables, which are small; data variables are never read.

use std::{collections::HashSet, path::Path};

use netcdf::AttributeValue;
use tracing::debug;

use crate::{
    dataset::{AttrValue, Attrs, Dataset, Variable, VariableKind},
    error::Result,
};

pub fn open_dataset(path: &Path) -> Result<Dataset> {
    let file = netcdf::open(path)?;
    let mut ds = Dataset::new();

    for dim in file.dimensions() {
        ds.add_dimension(&dim.name(), dim.len());
    }
    ds.attrs = read_attrs(file.attributes());

    // Coordinates: dimension variables plus anything named by a
    // `coordinates` attribute. Bounds: named by `bounds`, or `*_bnds`.
    let mut coordinates: HashSet<String> = ds.dims.keys().cloned().collect();
    let mut bounds: HashSet<String> = HashSet::new();
    for var in file.variables() {
        for attr in var.attributes() {
            let Ok(AttributeValue::Str(value)) = attr.value() else {
                continue;
            };
            match attr.name() {
                "coordinates" => coordinates.extend(value.split_whitespace().map(str::to_string)),
                "bounds" => {
                    bounds.insert(value);
                }
                _ => {}
            }
        }
    }

    for var in file.variables() {
        let name = var.name();
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let kind = if coordinates.contains(&name) {
            VariableKind::Coordinate
        } else {
            VariableKind::Data
        };
        let is_bounds = bounds.contains(&name) || name.ends_with("_bnds");

        let values = if kind == VariableKind::Coordinate || is_bounds {
            match var.get_values::<f64, _>(..) {
                Ok(v) => Some(v),
                Err(e) => {
                    // character coordinates (e.g. yyyymmdd) stay unloaded
                    debug!(variable = %name, error = %e, "coordinate values not numeric");
                    None
                }
            }
        } else {
            None
        };

        let variable = Variable {
            dims,
            attrs: read_attrs(var.attributes()),
            kind,
            values,
        };
        ds.insert(&name, variable)?;
    }

    debug!(
        path = %path.display(),
        dims = ds.dims.len(),
        variables = ds.variables.len(),
        "opened NetCDF file"
    );
    Ok(ds)
}

fn read_attrs<'a>(attrs: impl Iterator<Item = netcdf::Attribute<'a>>) -> Attrs {
    let mut out = Attrs::new();
    for attr in attrs {
        match attr.value() {
            Ok(value) => {
                if let Some(v) = convert(value) {
                    out.insert(attr.name().to_string(), v);
                }
            }
            Err(e) => debug!(attribute = %attr.name(), error = %e, "unreadable attribute skipped"),
        }
    }
    out
}

fn convert(value: AttributeValue) -> Option<AttrValue> {
    use AttributeValue as A;

    fn ints<T: Into<i64>>(v: Vec<T>) -> AttrValue {
        AttrValue::Ints(v.into_iter().map(Into::into).collect())
    }

    Some(match value {
        A::Str(s) => AttrValue::Str(s),
        A::Strs(s) => AttrValue::Strs(s),
        A::Float(v) => AttrValue::Float(f64::from(v)),
        A::Floats(v) => AttrValue::Floats(v.into_iter().map(f64::from).collect()),
        A::Double(v) => AttrValue::Float(v),
        A::Doubles(v) => AttrValue::Floats(v),
        A::Schar(v) => AttrValue::Int(v.into()),
        A::Schars(v) => ints(v),
        A::Uchar(v) => AttrValue::Int(v.into()),
        A::Uchars(v) => ints(v),
        A::Short(v) => AttrValue::Int(v.into()),
        A::Shorts(v) => ints(v),
        A::Ushort(v) => AttrValue::Int(v.into()),
        A::Ushorts(v) => ints(v),
        A::Int(v) => AttrValue::Int(v.into()),
        A::Ints(v) => ints(v),
        A::Uint(v) => AttrValue::Int(v.into()),
        A::Uints(v) => ints(v),
        A::Longlong(v) => AttrValue::Int(v),
        A::Longlongs(v) => AttrValue::Ints(v),
        A::Ulonglong(v) => AttrValue::Int(i64::try_from(v).ok()?),
        A::Ulonglongs(v) => AttrValue::Ints(
            v.into_iter()
                .map(i64::try_from)
                .collect::<std::result::Result<_, _>>()
                .ok()?,
        ),
        #[allow(unreachable_patterns)]
        _ => return None,
    })
}
