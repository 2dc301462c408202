//! STAC record types: just the fields the UKCP18 records use, plus
//! `extra_fields` for anything else.

use std::{fs, path::Path};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    cube::{CubeDimension, CubeVariable},
    error::{Result, ValidationError},
};

pub const STAC_VERSION: &str = "1.0.0";
pub const DATACUBE_EXTENSION: &str =
    "https://stac-extensions.github.io/datacube/v2.2.0/schema.json";
pub const ITEM_ASSETS_EXTENSION: &str =
    "https://stac-extensions.github.io/item-assets/v1.0.0/schema.json";
pub const SCIENTIFIC_EXTENSION: &str =
    "https://stac-extensions.github.io/scientific/v1.0.0/schema.json";

pub const NETCDF_MEDIA_TYPE: &str = "application/netcdf";
pub const DATA_ROLE: &str = "data";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    pub fn new(rel: &str, href: &str) -> Self {
        Self {
            rel: rel.to_string(),
            href: href.to_string(),
            media_type: None,
            title: None,
        }
    }

    pub fn with_type(mut self, media_type: &str) -> Self {
        self.media_type = Some(media_type.to_string());
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderRole {
    Producer,
    Licensor,
    Processor,
    Host,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<ProviderRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialExtent {
    pub bbox: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalExtent {
    pub interval: Vec<[Option<String>; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub spatial: SpatialExtent,
    pub temporal: TemporalExtent,
}

/// Collection summaries. Adding a list longer than `maxcount` is refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summaries {
    #[serde(skip, default = "Summaries::default_maxcount")]
    pub maxcount: usize,
    #[serde(flatten)]
    pub values: IndexMap<String, Value>,
}

impl Default for Summaries {
    fn default() -> Self {
        Self {
            maxcount: Self::default_maxcount(),
            values: IndexMap::new(),
        }
    }
}

impl Summaries {
    fn default_maxcount() -> usize {
        25
    }

    pub fn add(&mut self, key: &str, values: &[&str]) -> std::result::Result<(), String> {
        if values.len() > self.maxcount {
            return Err(format!(
                "summary {key:?} has {} values, more than maxcount {}",
                values.len(),
                self.maxcount
            ));
        }
        self.values.insert(key.to_string(), Value::from(values.to_vec()));
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Item-assets definition: an asset without an href.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(flatten)]
    pub extra_fields: Map<String, Value>,
}

impl Asset {
    pub fn netcdf(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            title: None,
            media_type: Some(NETCDF_MEDIA_TYPE.to_string()),
            roles: vec![DATA_ROLE.to_string()],
            extra_fields: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(rename = "type")]
    pub kind: String,
    pub stac_version: String,
    #[serde(default)]
    pub stac_extensions: Vec<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    pub license: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<Provider>,
    pub extent: Extent,
    #[serde(default, skip_serializing_if = "Summaries::is_empty")]
    pub summaries: Summaries,
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub item_assets: IndexMap<String, AssetDefinition>,
    #[serde(rename = "cube:dimensions", default, skip_serializing_if = "IndexMap::is_empty")]
    pub cube_dimensions: IndexMap<String, CubeDimension>,
    #[serde(rename = "cube:variables", default, skip_serializing_if = "IndexMap::is_empty")]
    pub cube_variables: IndexMap<String, CubeVariable>,
    #[serde(rename = "sci:citation", default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    #[serde(flatten)]
    pub extra_fields: Map<String, Value>,
}

impl Collection {
    pub fn new(id: &str, description: &str, extent: Extent) -> Self {
        Self {
            kind: "Collection".to_string(),
            stac_version: STAC_VERSION.to_string(),
            stac_extensions: Vec::new(),
            id: id.to_string(),
            title: None,
            description: description.to_string(),
            keywords: Vec::new(),
            license: "proprietary".to_string(),
            providers: Vec::new(),
            extent,
            summaries: Summaries::default(),
            links: Vec::new(),
            item_assets: IndexMap::new(),
            cube_dimensions: IndexMap::new(),
            cube_variables: IndexMap::new(),
            citation: None,
            extra_fields: Map::new(),
        }
    }

    pub fn add_extension(&mut self, url: &str) {
        add_extension(&mut self.stac_extensions, url);
    }

    pub fn set_self_href(&mut self, href: &str) {
        set_self_href(&mut self.links, href);
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "type")]
    pub kind: String,
    pub stac_version: String,
    #[serde(default)]
    pub stac_extensions: Vec<String>,
    pub id: String,
    pub geometry: Value,
    pub bbox: Vec<f64>,
    pub properties: Map<String, Value>,
    pub links: Vec<Link>,
    pub assets: IndexMap<String, Asset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl Item {
    pub fn new(id: &str, geometry: Value, bbox: Vec<f64>) -> Self {
        Self {
            kind: "Feature".to_string(),
            stac_version: STAC_VERSION.to_string(),
            stac_extensions: Vec::new(),
            id: id.to_string(),
            geometry,
            bbox,
            properties: Map::new(),
            links: Vec::new(),
            assets: IndexMap::new(),
            collection: None,
        }
    }

    pub fn add_extension(&mut self, url: &str) {
        add_extension(&mut self.stac_extensions, url);
    }

    pub fn set_self_href(&mut self, href: &str) {
        set_self_href(&mut self.links, href);
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }
}

/// Turn a list of schema violations into a result.
pub(crate) fn check(
    record: &'static str,
    id: &str,
    errors: Vec<String>,
) -> std::result::Result<(), ValidationError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            record,
            id: id.to_string(),
            errors,
        })
    }
}

fn add_extension(extensions: &mut Vec<String>, url: &str) {
    if !extensions.iter().any(|e| e == url) {
        extensions.push(url.to_string());
    }
}

fn set_self_href(links: &mut Vec<Link>, href: &str) {
    links.retain(|l| l.rel != "self");
    links.push(Link::new("self", href).with_type("application/json"));
}

fn write_json<T: Serialize>(record: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(record)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summaries_respect_maxcount() {
        let mut s = Summaries::default();
        s.maxcount = 2;
        assert!(s.add("a", &["x", "y", "z"]).is_err());
        assert!(s.is_empty());
        s.maxcount = 50;
        s.add("a", &["x", "y", "z"]).unwrap();
        assert_eq!(s.values["a"], serde_json::json!(["x", "y", "z"]));
    }

    #[test]
    fn extensions_are_not_duplicated() {
        let mut item = Item::new("i", Value::Null, vec![]);
        item.add_extension(DATACUBE_EXTENSION);
        item.add_extension(DATACUBE_EXTENSION);
        assert_eq!(item.stac_extensions.len(), 1);
    }

    #[test]
    fn self_link_is_replaced() {
        let mut item = Item::new("i", Value::Null, vec![]);
        item.set_self_href("a.json");
        item.set_self_href("b.json");
        let selfs: Vec<_> = item.links.iter().filter(|l| l.rel == "self").collect();
        assert_eq!(selfs.len(), 1);
        assert_eq!(selfs[0].href, "b.json");
    }

    #[test]
    fn asset_serializes_with_extra_fields() {
        let mut asset = Asset::netcdf("file.nc");
        asset
            .extra_fields
            .insert("xarray:open_kwargs".into(), serde_json::json!({"engine": "h5netcdf"}));
        let v = serde_json::to_value(&asset).unwrap();
        assert_eq!(v["type"], NETCDF_MEDIA_TYPE);
        assert_eq!(v["roles"], serde_json::json!(["data"]));
        assert_eq!(v["xarray:open_kwargs"]["engine"], "h5netcdf");
    }
}
