//! Dataset → datacube extension metadata.
//!
//! Dimensions with a coordinate variable become `cube:dimensions` entries
//! (temporal, spatial x/y/z, or a generic type); every non-dimension variable
//! becomes a `cube:variables` entry.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    cftime::TimeUnits,
    dataset::{Dataset, Variable},
    error::Result,
};

/// Relative tolerance when deciding whether a coordinate is regularly spaced.
const STEP_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeDimension {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extent: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_system: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeVariable {
    #[serde(rename = "type")]
    pub kind: String,
    pub dimensions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub shape: Vec<usize>,
    #[serde(default)]
    pub attrs: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cube {
    pub dimensions: IndexMap<String, CubeDimension>,
    pub variables: IndexMap<String, CubeVariable>,
}

/// Describe `ds` for the datacube extension. Spatial dimensions carry
/// `reference_system` as an EPSG code.
pub fn describe(ds: &Dataset, reference_system: u32) -> Result<Cube> {
    let mut cube = Cube::default();

    for dim in ds.dims.keys() {
        let Some(coord) = ds.variable(dim) else {
            continue;
        };
        cube.dimensions
            .insert(dim.clone(), dimension(dim, coord, reference_system)?);
    }

    for (name, var) in &ds.variables {
        if ds.dims.contains_key(name) {
            continue;
        }
        cube.variables.insert(
            name.clone(),
            CubeVariable {
                kind: if var.is_coordinate() { "auxiliary" } else { "data" }.to_string(),
                dimensions: var.dims.clone(),
                description: var
                    .attr_str("long_name")
                    .or_else(|| var.attr_str("description"))
                    .map(str::to_string),
                unit: var.attr_str("units").map(str::to_string),
                shape: ds.shape(name).unwrap_or_default(),
                attrs: attrs_json(var),
            },
        );
    }
    Ok(cube)
}

fn dimension(name: &str, coord: &Variable, reference_system: u32) -> Result<CubeDimension> {
    let values = coord.values.as_deref().unwrap_or_default();
    let mut out = CubeDimension {
        kind: "other".to_string(),
        axis: None,
        description: coord.attr_str("long_name").map(str::to_string),
        extent: Vec::new(),
        step: None,
        unit: None,
        reference_system: None,
    };

    if let Some(axis) = spatial_axis(name, coord) {
        out.kind = "spatial".to_string();
        out.axis = Some(axis.to_string());
        out.extent = min_max(values).map(|(lo, hi)| vec![lo.into(), hi.into()]).unwrap_or_default();
        out.step = regular_step(values);
        out.reference_system = Some(reference_system.into());
        if axis == "z" {
            out.unit = coord.attr_str("units").map(str::to_string);
        }
    } else if is_temporal(name, coord) {
        out.kind = "temporal".to_string();
        if let (Some((lo, hi)), Some(units)) = (min_max(values), coord.attr_str("units")) {
            let units = TimeUnits::parse(units, coord.attr_str("calendar"))?;
            out.extent = vec![
                units.decode(lo)?.to_string().into(),
                units.decode(hi)?.to_string().into(),
            ];
        }
    } else {
        out.extent = min_max(values).map(|(lo, hi)| vec![lo.into(), hi.into()]).unwrap_or_default();
        out.step = regular_step(values);
        out.unit = coord.attr_str("units").map(str::to_string);
    }
    Ok(out)
}

fn spatial_axis(name: &str, coord: &Variable) -> Option<&'static str> {
    match coord.attr_str("axis").map(str::to_ascii_uppercase).as_deref() {
        Some("X") => return Some("x"),
        Some("Y") => return Some("y"),
        Some("Z") => return Some("z"),
        _ => {}
    }
    match coord.attr_str("standard_name").unwrap_or(name) {
        "longitude" | "lon" | "grid_longitude" | "projection_x_coordinate" => Some("x"),
        "latitude" | "lat" | "grid_latitude" | "projection_y_coordinate" => Some("y"),
        _ => None,
    }
}

fn is_temporal(name: &str, coord: &Variable) -> bool {
    coord.attr_str("axis").is_some_and(|a| a.eq_ignore_ascii_case("T"))
        || coord.attr_str("standard_name") == Some("time")
        || name == "time"
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn regular_step(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let step = values[1] - values[0];
    let tol = STEP_TOLERANCE * step.abs().max(1.0);
    values
        .windows(2)
        .all(|w| ((w[1] - w[0]) - step).abs() <= tol)
        .then_some(step)
}

fn attrs_json(var: &Variable) -> Map<String, Value> {
    var.attrs
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::to_value(v).unwrap_or(Value::Null)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{align::reconcile, fixtures::grid};
    use serde_json::json;

    #[test]
    fn classifies_dimensions() {
        let cube = describe(&grid("tas"), 4326).unwrap();

        let time = &cube.dimensions["time"];
        assert_eq!(time.kind, "temporal");
        assert_eq!(time.extent, vec![json!("1899-12-01T12:00:00Z"), json!("1899-12-04T12:00:00Z")]);

        let lon = &cube.dimensions["longitude"];
        assert_eq!(lon.kind, "spatial");
        assert_eq!(lon.axis.as_deref(), Some("x"));
        assert_eq!(lon.extent, vec![json!(0.0), json!(270.0)]);
        assert_eq!(lon.step, Some(90.0));
        assert_eq!(lon.reference_system, Some(json!(4326)));

        let lat = &cube.dimensions["latitude"];
        assert_eq!(lat.axis.as_deref(), Some("y"));
        assert_eq!(lat.extent, vec![json!(-60.0), json!(60.0)]);

        // no coordinate variable
        assert!(!cube.dimensions.contains_key("bnds"));
    }

    #[test]
    fn describes_variables() {
        let cube = describe(&grid("tas"), 4326).unwrap();

        let tas = &cube.variables["tas"];
        assert_eq!(tas.kind, "data");
        assert_eq!(tas.dimensions, vec!["time", "latitude", "longitude"]);
        assert_eq!(tas.shape, vec![4, 3, 4]);
        assert_eq!(tas.description.as_deref(), Some("Mean air temperature at 1.5m"));
        assert_eq!(tas.unit.as_deref(), Some("1"));
        assert_eq!(tas.attrs["units"], json!("1"));

        assert_eq!(cube.variables["height"].kind, "auxiliary");
        assert_eq!(cube.variables["latitude_bnds"].kind, "data");
        assert!(!cube.variables.contains_key("time"));
    }

    #[test]
    fn merged_dataset_lists_every_variable() {
        let inputs = vec![grid("tas"), grid("pr")];
        let merged = reconcile(&inputs, &inputs[0]).unwrap();
        let cube = describe(&merged, 4326).unwrap();
        assert!(cube.variables.contains_key("tas"));
        assert!(cube.variables.contains_key("pr"));
    }

    #[test]
    fn irregular_coordinates_have_no_step() {
        assert_eq!(regular_step(&[0.0, 1.0, 3.0]), None);
        assert_eq!(regular_step(&[0.0, 0.5, 1.0]), Some(0.5));
        assert_eq!(regular_step(&[1.0]), None);
    }

    #[test]
    fn bad_time_units_are_errors() {
        let mut ds = grid("tas");
        ds.variables["time"]
            .attrs
            .insert("units".into(), "moons since 1970-01-01".into());
        assert!(describe(&ds, 4326).is_err());
    }
}
