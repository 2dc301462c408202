//! Attribute normalization.
//!
//! Some UKCP18 attributes (`label_units`, `plot_label`, ...) are stored as
//! one-element string arrays instead of plain strings. They are encoded the
//! way chunked-array stores serialize attributes before the dataset is
//! described, so downstream records only ever see plain strings.

use crate::dataset::{AttrValue, Attrs, Dataset};

/// Encode one attribute value. This is the only place the array-wrapped
/// string quirk is handled.
pub fn encode_attr_value(value: &AttrValue) -> AttrValue {
    match value {
        AttrValue::Strs(items) if items.len() == 1 => AttrValue::Str(items[0].clone()),
        AttrValue::Ints(items) if items.len() == 1 => AttrValue::Int(items[0]),
        AttrValue::Floats(items) if items.len() == 1 => AttrValue::Float(items[0]),
        other => other.clone(),
    }
}

pub fn encode_attrs(attrs: &Attrs) -> Attrs {
    attrs
        .iter()
        .map(|(k, v)| (k.clone(), encode_attr_value(v)))
        .collect()
}

/// Round-trip every variable's attributes, and the dataset's own, through
/// [`encode_attr_value`].
pub fn normalize_attrs(ds: &mut Dataset) {
    for var in ds.variables.values_mut() {
        var.attrs = encode_attrs(&var.attrs);
    }
    ds.attrs = encode_attrs(&ds.attrs);
}
