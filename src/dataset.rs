//! Metadata-only view of a labeled multi-dimensional dataset.
//!
//! Only structure is kept: dimensions, variables with their dimension names
//! and attributes, and the values of coordinate and bounds variables. Data
//! payloads are never loaded.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// An attribute value as stored in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    Strs(Vec<String>),
    Int(i64),
    Ints(Vec<i64>),
    Float(f64),
    Floats(Vec<f64>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(v: Vec<String>) -> Self {
        Self::Strs(v)
    }
}

pub type Attrs = IndexMap<String, AttrValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Coordinate,
    Data,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub dims: Vec<String>,
    pub attrs: Attrs,
    pub kind: VariableKind,
    /// Row-major values; loaded for coordinate and bounds variables only.
    pub values: Option<Vec<f64>>,
}

impl Variable {
    pub fn data(dims: &[&str]) -> Self {
        Self {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            attrs: Attrs::new(),
            kind: VariableKind::Data,
            values: None,
        }
    }

    pub fn coordinate(dims: &[&str], values: Vec<f64>) -> Self {
        Self {
            kind: VariableKind::Coordinate,
            values: Some(values),
            ..Self::data(dims)
        }
    }

    /// A data variable whose values are loaded, e.g. `latitude_bnds`.
    pub fn bounds(dims: &[&str], values: Vec<f64>) -> Self {
        Self {
            values: Some(values),
            ..Self::data(dims)
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(AttrValue::as_str)
    }

    pub fn is_coordinate(&self) -> bool {
        self.kind == VariableKind::Coordinate
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub dims: IndexMap<String, usize>,
    pub variables: IndexMap<String, Variable>,
    pub attrs: Attrs,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dimension(&mut self, name: &str, len: usize) -> &mut Self {
        self.dims.insert(name.to_string(), len);
        self
    }

    /// Insert or replace a variable. Its dimensions must already exist and
    /// any loaded values must fill the resulting shape exactly.
    pub fn insert(&mut self, name: &str, var: Variable) -> Result<(), ReconcileError> {
        let shape = self.shape_of(name, &var.dims)?;
        if let Some(values) = &var.values {
            let expected: usize = shape.iter().product();
            if values.len() != expected {
                return Err(ReconcileError::GridShape {
                    name: name.to_string(),
                    found: vec![values.len()],
                    base: shape,
                });
            }
        }
        self.variables.insert(name.to_string(), var);
        Ok(())
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        self.variables.shift_remove(name)
    }

    pub fn shape(&self, name: &str) -> Option<Vec<usize>> {
        let var = self.variables.get(name)?;
        self.shape_of(name, &var.dims).ok()
    }

    pub fn data_vars(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.variables.iter().filter(|(_, v)| !v.is_coordinate())
    }

    pub fn coords(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.variables.iter().filter(|(_, v)| v.is_coordinate())
    }

    /// Keep indices `start..` along `dim`, trimming every variable that spans it.
    pub fn slice_from(&mut self, dim: &str, start: usize) -> Result<(), ReconcileError> {
        let Some(&len) = self.dims.get(dim) else {
            return Err(ReconcileError::UnknownDimension {
                name: dim.to_string(),
                dim: dim.to_string(),
            });
        };
        let before = self.dims.clone();
        for var in self.variables.values_mut() {
            let Some(axis) = var.dims.iter().position(|d| d == dim) else {
                continue;
            };
            if let Some(values) = var.values.as_mut() {
                let shape: Vec<usize> = var.dims.iter().map(|d| before[d.as_str()]).collect();
                *values = slice_axis(values, &shape, axis, start);
            }
        }
        self.dims.insert(dim.to_string(), len.saturating_sub(start));
        Ok(())
    }

    fn shape_of(&self, name: &str, dims: &[String]) -> Result<Vec<usize>, ReconcileError> {
        dims.iter()
            .map(|d| {
                self.dims
                    .get(d)
                    .copied()
                    .ok_or_else(|| ReconcileError::UnknownDimension {
                        name: name.to_string(),
                        dim: d.clone(),
                    })
            })
            .collect()
    }
}

fn slice_axis(values: &[f64], shape: &[usize], axis: usize, start: usize) -> Vec<f64> {
    let outer: usize = shape[..axis].iter().product();
    let n = shape[axis];
    let inner: usize = shape[axis + 1..].iter().product();
    let start = start.min(n);

    let mut out = Vec::with_capacity(outer * (n - start) * inner);
    for o in 0..outer {
        let row = o * n * inner;
        out.extend_from_slice(&values[row + start * inner..row + n * inner]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_checks_dimensions_and_lengths() {
        let mut ds = Dataset::new();
        ds.add_dimension("latitude", 3);

        assert!(ds
            .insert("latitude", Variable::coordinate(&["latitude"], vec![0.0, 1.0, 2.0]))
            .is_ok());
        assert!(matches!(
            ds.insert("lat2", Variable::coordinate(&["latitude"], vec![0.0])),
            Err(ReconcileError::GridShape { .. })
        ));
        assert!(matches!(
            ds.insert("tas", Variable::data(&["time", "latitude"])),
            Err(ReconcileError::UnknownDimension { .. })
        ));
    }

    #[test]
    fn slice_from_trims_every_spanning_variable() {
        let mut ds = Dataset::new();
        ds.add_dimension("latitude", 3).add_dimension("bnds", 2);
        ds.insert("latitude", Variable::coordinate(&["latitude"], vec![-1.0, 0.0, 1.0]))
            .unwrap();
        ds.insert(
            "latitude_bnds",
            Variable::bounds(&["latitude", "bnds"], vec![-1.5, -0.5, -0.5, 0.5, 0.5, 1.5]),
        )
        .unwrap();
        ds.insert("uas", Variable::data(&["latitude"])).unwrap();

        ds.slice_from("latitude", 1).unwrap();

        assert_eq!(ds.dims["latitude"], 2);
        assert_eq!(ds.variable("latitude").unwrap().values, Some(vec![0.0, 1.0]));
        assert_eq!(
            ds.variable("latitude_bnds").unwrap().values,
            Some(vec![-0.5, 0.5, 0.5, 1.5])
        );
        assert_eq!(ds.shape("uas"), Some(vec![2]));
    }

    #[test]
    fn slice_inner_axis() {
        // 2 x 3, drop the first column
        let out = slice_axis(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3], 1, 1);
        assert_eq!(out, vec![2.0, 3.0, 5.0, 6.0]);
    }

    #[test]
    fn data_vars_exclude_coordinates() {
        let mut ds = Dataset::new();
        ds.add_dimension("time", 1);
        ds.insert("time", Variable::coordinate(&["time"], vec![0.0])).unwrap();
        ds.insert("tas", Variable::data(&["time"])).unwrap();

        let names: Vec<_> = ds.data_vars().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["tas"]);
        assert_eq!(ds.coords().count(), 1);
    }
}
