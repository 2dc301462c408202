//! Schema checks for the serialized records: STAC 1.0.0 core plus the
//! datacube, item-assets and scientific extensions.
//!
//! Checks run on the JSON form, the same document a schema validator would
//! see, and every violation is reported.

use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::{
    error::Result,
    stac::{
        check, Collection, Item, DATACUBE_EXTENSION, ITEM_ASSETS_EXTENSION, SCIENTIFIC_EXTENSION,
        STAC_VERSION,
    },
};

static EXTENSION_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://\S+/schema\.json$").expect("valid regex"));

/// ISO 8601 instant; month/day ranges are not checked so 360-day dates pass.
static CUBE_INSTANT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?\d{4,}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})$")
        .expect("valid regex")
});

const DIMENSION_AXES: [&str; 3] = ["x", "y", "z"];
const VARIABLE_TYPES: [&str; 2] = ["data", "auxiliary"];

pub fn validate_collection(collection: &Collection) -> Result<()> {
    let doc = serde_json::to_value(collection)?;
    let mut errors = Vec::new();
    let obj = as_object(&doc, &mut errors);

    common(obj, "Collection", &mut errors);
    non_empty_string(obj, "description", &mut errors);
    non_empty_string(obj, "license", &mut errors);

    match obj.get("extent") {
        Some(extent) => collection_extent(extent, &mut errors),
        None => errors.push("missing extent".into()),
    }
    if let Some(providers) = obj.get("providers").and_then(Value::as_array) {
        for (i, p) in providers.iter().enumerate() {
            if p.get("name").and_then(Value::as_str).map_or(true, str::is_empty) {
                errors.push(format!("providers[{i}] has no name"));
            }
        }
    }
    if let Some(summaries) = obj.get("summaries").and_then(Value::as_object) {
        for (k, v) in summaries {
            if v.as_array().is_some_and(Vec::is_empty) {
                errors.push(format!("summary {k:?} is empty"));
            }
        }
    }

    let extensions = extensions(obj);
    if extensions.contains(&DATACUBE_EXTENSION) {
        datacube(obj, &mut errors);
    }
    if extensions.contains(&ITEM_ASSETS_EXTENSION) {
        item_assets(obj, &mut errors);
    }
    if extensions.contains(&SCIENTIFIC_EXTENSION) {
        scientific(obj, &mut errors);
    }

    Ok(check("Collection", &collection.id, errors)?)
}

pub fn validate_item(item: &Item) -> Result<()> {
    let doc = serde_json::to_value(item)?;
    let mut errors = Vec::new();
    let obj = as_object(&doc, &mut errors);

    common(obj, "Feature", &mut errors);

    match obj.get("geometry") {
        Some(Value::Null) => {}
        Some(g) => geometry(g, &mut errors),
        None => errors.push("missing geometry".into()),
    }
    if let Some(bbox) = obj.get("bbox") {
        bbox_values(bbox, "bbox", &mut errors);
    } else if !matches!(obj.get("geometry"), Some(Value::Null)) {
        errors.push("bbox is required when geometry is set".into());
    }

    let empty = Map::new();
    let props = obj.get("properties").and_then(Value::as_object).unwrap_or_else(|| {
        errors.push("properties must be an object".into());
        &empty
    });
    item_datetimes(props, &mut errors);

    match obj.get("assets").and_then(Value::as_object) {
        Some(assets) => {
            for (k, a) in assets {
                if a.get("href").and_then(Value::as_str).map_or(true, str::is_empty) {
                    errors.push(format!("asset {k:?} has no href"));
                }
            }
        }
        None => errors.push("assets must be an object".into()),
    }
    item_collection(obj, &mut errors);

    if extensions(obj).contains(&DATACUBE_EXTENSION) {
        datacube(props, &mut errors);
    }

    Ok(check("Item", &item.id, errors)?)
}

fn as_object<'a>(doc: &'a Value, errors: &mut Vec<String>) -> &'a Map<String, Value> {
    static EMPTY: Lazy<Map<String, Value>> = Lazy::new(Map::new);
    doc.as_object().unwrap_or_else(|| {
        errors.push("record is not a JSON object".into());
        &*EMPTY
    })
}

fn common(obj: &Map<String, Value>, kind: &str, errors: &mut Vec<String>) {
    if obj.get("type").and_then(Value::as_str) != Some(kind) {
        errors.push(format!("type must be {kind:?}"));
    }
    if obj.get("stac_version").and_then(Value::as_str) != Some(STAC_VERSION) {
        errors.push(format!("stac_version must be {STAC_VERSION:?}"));
    }
    non_empty_string(obj, "id", errors);

    for url in extensions(obj) {
        if !EXTENSION_URL.is_match(url) {
            errors.push(format!("stac_extensions entry {url:?} is not a schema URL"));
        }
    }

    match obj.get("links").and_then(Value::as_array) {
        Some(links) => {
            for (i, link) in links.iter().enumerate() {
                for key in ["rel", "href"] {
                    if link.get(key).and_then(Value::as_str).map_or(true, str::is_empty) {
                        errors.push(format!("links[{i}] has no {key}"));
                    }
                }
            }
        }
        None => errors.push("links must be an array".into()),
    }
}

fn extensions(obj: &Map<String, Value>) -> Vec<&str> {
    obj.get("stac_extensions")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn non_empty_string(obj: &Map<String, Value>, key: &str, errors: &mut Vec<String>) {
    if obj.get(key).and_then(Value::as_str).map_or(true, str::is_empty) {
        errors.push(format!("{key} must be a non-empty string"));
    }
}

fn collection_extent(extent: &Value, errors: &mut Vec<String>) {
    match extent.pointer("/spatial/bbox").and_then(Value::as_array) {
        Some(boxes) if !boxes.is_empty() => {
            for (i, b) in boxes.iter().enumerate() {
                bbox_values(b, &format!("extent.spatial.bbox[{i}]"), errors);
            }
        }
        _ => errors.push("extent.spatial.bbox must be a non-empty array".into()),
    }

    match extent.pointer("/temporal/interval").and_then(Value::as_array) {
        Some(intervals) if !intervals.is_empty() => {
            for (i, interval) in intervals.iter().enumerate() {
                let pair = interval.as_array().filter(|p| p.len() == 2);
                let Some(pair) = pair else {
                    errors.push(format!("extent.temporal.interval[{i}] must have two entries"));
                    continue;
                };
                let mut bounds = Vec::new();
                for v in pair {
                    match v {
                        Value::Null => bounds.push(None),
                        Value::String(s) => match DateTime::parse_from_rfc3339(s) {
                            Ok(t) => bounds.push(Some(t)),
                            Err(_) => errors.push(format!(
                                "extent.temporal.interval[{i}] has invalid timestamp {s:?}"
                            )),
                        },
                        _ => errors.push(format!(
                            "extent.temporal.interval[{i}] entries must be strings or null"
                        )),
                    }
                }
                if let [Some(start), Some(end)] = bounds[..] {
                    if start > end {
                        errors.push(format!("extent.temporal.interval[{i}] starts after it ends"));
                    }
                }
            }
        }
        _ => errors.push("extent.temporal.interval must be a non-empty array".into()),
    }
}

fn bbox_values(bbox: &Value, what: &str, errors: &mut Vec<String>) {
    let Some(nums) = bbox
        .as_array()
        .and_then(|a| a.iter().map(Value::as_f64).collect::<Option<Vec<f64>>>())
    else {
        errors.push(format!("{what} must be an array of numbers"));
        return;
    };
    match nums[..] {
        [_, south, _, north] | [_, south, _, _, north, _] => {
            if south > north {
                errors.push(format!("{what} has south greater than north"));
            }
        }
        _ => errors.push(format!("{what} must have 4 or 6 numbers")),
    }
}

fn geometry(g: &Value, errors: &mut Vec<String>) {
    match g.get("type").and_then(Value::as_str) {
        Some("Polygon") => {}
        Some(other) => {
            errors.push(format!("geometry type {other:?} is not supported"));
            return;
        }
        None => {
            errors.push("geometry has no type".into());
            return;
        }
    }
    let Some(rings) = g.get("coordinates").and_then(Value::as_array) else {
        errors.push("polygon has no coordinates".into());
        return;
    };
    if rings.is_empty() {
        errors.push("polygon has no rings".into());
    }
    for (i, ring) in rings.iter().enumerate() {
        let positions: Option<Vec<Vec<f64>>> = ring.as_array().and_then(|r| {
            r.iter()
                .map(|p| {
                    p.as_array()
                        .and_then(|xy| xy.iter().map(Value::as_f64).collect::<Option<Vec<_>>>())
                        .filter(|xy| xy.len() >= 2)
                })
                .collect()
        });
        match positions {
            Some(p) if p.len() >= 4 && p.first() == p.last() => {}
            Some(_) => errors.push(format!("polygon ring {i} must be closed with at least 4 positions")),
            None => errors.push(format!("polygon ring {i} has invalid positions")),
        }
    }
}

fn item_datetimes(props: &Map<String, Value>, errors: &mut Vec<String>) {
    if !props.contains_key("datetime") {
        errors.push("properties.datetime is required".into());
    }
    let datetime = timestamp(props, "datetime", errors);
    let start = timestamp(props, "start_datetime", errors);
    let end = timestamp(props, "end_datetime", errors);

    if datetime.is_none() && (start.is_none() || end.is_none()) {
        errors.push("start_datetime and end_datetime are required when datetime is null".into());
    }
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            errors.push("start_datetime is after end_datetime".into());
        }
    }
}

fn timestamp(
    props: &Map<String, Value>,
    key: &str,
    errors: &mut Vec<String>,
) -> Option<DateTime<FixedOffset>> {
    match props.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map_err(|_| errors.push(format!("properties.{key} is not an RFC 3339 timestamp")))
            .ok(),
        Some(_) => {
            errors.push(format!("properties.{key} must be a string"));
            None
        }
    }
}

fn datacube(obj: &Map<String, Value>, errors: &mut Vec<String>) {
    let Some(dims) = obj.get("cube:dimensions").and_then(Value::as_object) else {
        errors.push("cube:dimensions is required by the datacube extension".into());
        return;
    };
    for (name, dim) in dims {
        let kind = dim.get("type").and_then(Value::as_str).unwrap_or_default();
        let extent = dim.get("extent").and_then(Value::as_array);
        match kind {
            "" => errors.push(format!("cube:dimensions.{name} has no type")),
            "spatial" => {
                let axis = dim.get("axis").and_then(Value::as_str).unwrap_or_default();
                if !DIMENSION_AXES.contains(&axis) {
                    errors.push(format!("cube:dimensions.{name} has invalid axis {axis:?}"));
                }
                let numeric = extent.is_some_and(|e| e.len() == 2 && e.iter().all(Value::is_number));
                if axis != "z" && !numeric {
                    errors.push(format!("cube:dimensions.{name} needs a numeric [min, max] extent"));
                }
            }
            "temporal" => {
                let ok = extent.is_some_and(|e| {
                    e.len() == 2
                        && e.iter().all(|v| v.is_null() || v.as_str().is_some_and(|s| CUBE_INSTANT.is_match(s)))
                });
                if !ok {
                    errors.push(format!("cube:dimensions.{name} needs an ISO 8601 [start, end] extent"));
                } else if let Some([Value::String(a), Value::String(b)]) = extent.map(Vec::as_slice) {
                    // zero-padded, same-width instants order lexically
                    if a.len() == b.len() && a > b {
                        errors.push(format!("cube:dimensions.{name} extent starts after it ends"));
                    }
                }
            }
            _ => {
                if extent.is_none() && dim.get("values").is_none() {
                    errors.push(format!("cube:dimensions.{name} needs an extent or values"));
                }
            }
        }
    }

    if let Some(vars) = obj.get("cube:variables").and_then(Value::as_object) {
        for (name, var) in vars {
            let kind = var.get("type").and_then(Value::as_str).unwrap_or_default();
            if !VARIABLE_TYPES.contains(&kind) {
                errors.push(format!("cube:variables.{name} has invalid type {kind:?}"));
            }
            if !var.get("dimensions").is_some_and(Value::is_array) {
                errors.push(format!("cube:variables.{name} has no dimensions"));
            }
        }
    }
}

fn item_assets(obj: &Map<String, Value>, errors: &mut Vec<String>) {
    let Some(defs) = obj.get("item_assets").and_then(Value::as_object).filter(|d| !d.is_empty())
    else {
        errors.push("item_assets is required by the item-assets extension".into());
        return;
    };
    for (k, def) in defs {
        let Some(def) = def.as_object() else {
            errors.push(format!("item_assets.{k} must be an object"));
            continue;
        };
        if def.contains_key("href") {
            errors.push(format!("item_assets.{k} must not have an href"));
        }
        if def.len() < 2 {
            errors.push(format!("item_assets.{k} needs at least two fields"));
        }
    }
}

fn scientific(obj: &Map<String, Value>, errors: &mut Vec<String>) {
    match obj.get("sci:citation") {
        None => {}
        Some(Value::String(s)) if !s.is_empty() => {}
        Some(_) => errors.push("sci:citation must be a non-empty string".into()),
    }
}

/// An Item names its parent collection if and only if it links to it.
fn item_collection(obj: &Map<String, Value>, errors: &mut Vec<String>) {
    let linked = obj
        .get("links")
        .and_then(Value::as_array)
        .is_some_and(|links| {
            links
                .iter()
                .any(|l| l.get("rel").and_then(Value::as_str) == Some("collection"))
        });
    match obj.get("collection") {
        None if linked => errors.push("collection link without a collection id".into()),
        None => {}
        Some(Value::String(s)) if s.is_empty() => {
            errors.push("collection must be a non-empty string".into())
        }
        Some(Value::String(_)) if !linked => {
            errors.push("collection id without a collection link".into())
        }
        Some(Value::String(_)) => {}
        Some(_) => errors.push("collection must be a non-empty string".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::stac::{Extent, Link, SpatialExtent, TemporalExtent};
    use serde_json::json;

    fn collection() -> Collection {
        Collection::new(
            "c",
            "a collection",
            Extent {
                spatial: SpatialExtent {
                    bbox: vec![vec![-180.0, -90.0, 180.0, 90.0]],
                },
                temporal: TemporalExtent {
                    interval: vec![[
                        Some("1899-12-01T00:00:00Z".into()),
                        Some("2100-12-31T00:00:00Z".into()),
                    ]],
                },
            },
        )
    }

    fn item() -> Item {
        let mut item = Item::new(
            "i",
            json!({"type": "Polygon", "coordinates": [[[180.0, -90.0], [180.0, 90.0], [-180.0, 90.0], [-180.0, -90.0], [180.0, -90.0]]]}),
            vec![-180.0, -90.0, 180.0, 90.0],
        );
        item.properties.insert("datetime".into(), Value::Null);
        item.properties
            .insert("start_datetime".into(), json!("1899-12-01T00:00:00Z"));
        item.properties
            .insert("end_datetime".into(), json!("1909-11-30T00:00:00Z"));
        item
    }

    fn as_validation(err: &crate::Error) -> Option<&ValidationError> {
        match err {
            crate::Error::Validation(v) => Some(v),
            _ => None,
        }
    }

    fn errors(result: Result<()>) -> Vec<String> {
        match result {
            Ok(()) => Vec::new(),
            Err(e) => as_validation(&e).expect("validation error").errors.clone(),
        }
    }

    #[test]
    fn minimal_records_pass() {
        assert!(validate_collection(&collection()).is_ok());
        assert!(validate_item(&item()).is_ok());
    }

    #[test]
    fn reversed_interval_fails() {
        let mut c = collection();
        c.extent.temporal.interval[0].reverse();
        let errs = errors(validate_collection(&c));
        assert!(errs.iter().any(|e| e.contains("starts after")), "{errs:?}");
    }

    #[test]
    fn declared_extensions_need_their_fields() {
        let mut c = collection();
        c.add_extension(DATACUBE_EXTENSION);
        c.add_extension(ITEM_ASSETS_EXTENSION);
        let errs = errors(validate_collection(&c));
        assert!(errs.iter().any(|e| e.contains("cube:dimensions")));
        assert!(errs.iter().any(|e| e.contains("item_assets")));
    }

    #[test]
    fn temporal_cube_extent_accepts_360_day_dates() {
        let mut i = item();
        i.add_extension(DATACUBE_EXTENSION);
        i.properties.insert(
            "cube:dimensions".into(),
            json!({"time": {"type": "temporal", "extent": ["1900-02-30T12:00:00Z", "1909-11-30T12:00:00Z"]}}),
        );
        assert!(validate_item(&i).is_ok());
    }

    #[test]
    fn item_without_range_fails() {
        let mut i = item();
        i.properties.remove("end_datetime");
        let errs = errors(validate_item(&i));
        assert_eq!(errs.len(), 1, "{errs:?}");
    }

    #[test]
    fn open_ring_fails() {
        let mut i = item();
        i.geometry = json!({"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]]});
        let errs = errors(validate_item(&i));
        assert!(errs.iter().any(|e| e.contains("closed")));
    }

    #[test]
    fn asset_needs_href() {
        let mut i = item();
        i.assets.insert("tas".into(), crate::stac::Asset::netcdf(""));
        let errs = errors(validate_item(&i));
        assert!(errs.iter().any(|e| e.contains("href")));
    }

    #[test]
    fn collection_id_and_link_go_together() {
        let mut i = item();
        i.collection = Some("ukcp-18".into());
        let errs = errors(validate_item(&i));
        assert!(errs.iter().any(|e| e.contains("without a collection link")), "{errs:?}");

        i.links.push(Link::new("collection", "../collection.json"));
        assert!(validate_item(&i).is_ok());

        i.collection = None;
        let errs = errors(validate_item(&i));
        assert!(errs.iter().any(|e| e.contains("without a collection id")), "{errs:?}");
    }
}
