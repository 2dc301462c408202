//! Item builder: one STAC Item per group of files sharing an identity.

use std::fmt;

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::{
    align::{alignment_base, reconcile},
    attrs::normalize_attrs,
    cube::describe,
    error::{Error, ReconcileError, Result},
    identity::FileIdentity,
    stac::{Asset, Item, Link, DATACUBE_EXTENSION},
    storage::DatasetOpener,
    validate::validate_item,
    MEMBER_ID_PROPERTY, TEMPORAL_RESOLUTION_PROPERTY,
};

const GLOBE_BBOX: [f64; 4] = [-180.0, -90.0, 180.0, 90.0];

pub type HrefRewrite = Box<dyn Fn(&str) -> String + Send + Sync>;

pub struct ItemOptions {
    /// Maps an input path to the href written in its asset.
    pub href_rewrite: Option<HrefRewrite>,
    /// Merged into every asset (e.g. `xarray:open_kwargs`).
    pub asset_extra_fields: Map<String, Value>,
    /// Parent collection id. Setting it also adds a `collection` link.
    pub collection: Option<String>,
    /// Target of the `collection` link.
    pub collection_href: String,
    /// EPSG code for the spatial cube dimensions.
    pub reference_system: u32,
}

impl Default for ItemOptions {
    fn default() -> Self {
        Self {
            href_rewrite: None,
            asset_extra_fields: Map::new(),
            collection: None,
            collection_href: "../collection.json".to_string(),
            reference_system: 4326,
        }
    }
}

impl fmt::Debug for ItemOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemOptions")
            .field("href_rewrite", &self.href_rewrite.is_some())
            .field("asset_extra_fields", &self.asset_extra_fields)
            .field("collection", &self.collection)
            .field("collection_href", &self.collection_href)
            .field("reference_system", &self.reference_system)
            .finish()
    }
}

impl ItemOptions {
    fn href(&self, path: &str) -> String {
        match &self.href_rewrite {
            Some(rewrite) => rewrite(path),
            None => path.to_string(),
        }
    }
}

/// Build and validate the Item for `paths`, which must all name the same
/// (resolution, scenario, member, period) and hold distinct variables. The
/// first file that is not a wind file is the grid the wind files are aligned
/// to; a group of wind files only is merged as is.
pub fn build_item<S, P>(paths: &[P], opener: &S, options: &ItemOptions) -> Result<Item>
where
    S: DatasetOpener + ?Sized,
    P: AsRef<str>,
{
    let identities = paths
        .iter()
        .map(|p| FileIdentity::parse(p.as_ref()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let identity = check_group(&identities)?;

    let datasets = paths
        .iter()
        .map(|p| opener.open(p.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    let base = alignment_base(&datasets).ok_or(ReconcileError::Empty)?;
    let mut ds = reconcile(&datasets, base)?;
    normalize_attrs(&mut ds);
    debug!(files = datasets.len(), variables = ds.variables.len(), "reconciled item group");

    let cube = describe(&ds, options.reference_system)?;

    let [west, south, east, north] = GLOBE_BBOX;
    let geometry = json!({
        "type": "Polygon",
        "coordinates": [[[east, south], [east, north], [west, north], [west, south], [east, south]]],
    });
    let mut item = Item::new(&identity.item_id(), geometry, GLOBE_BBOX.to_vec());
    if let Some(collection) = &options.collection {
        item.collection = Some(collection.clone());
        item.links.push(
            Link::new("collection", &options.collection_href)
                .with_type("application/json"),
        );
    }

    let props = &mut item.properties;
    props.insert("datetime".into(), Value::Null);
    props.insert("start_datetime".into(), identity.start_datetime().into());
    props.insert("end_datetime".into(), identity.end_datetime().into());
    props.insert("cube:dimensions".into(), serde_json::to_value(&cube.dimensions)?);
    props.insert("cube:variables".into(), serde_json::to_value(&cube.variables)?);
    props.insert(MEMBER_ID_PROPERTY.into(), identity.member_id.into());
    props.insert(
        TEMPORAL_RESOLUTION_PROPERTY.into(),
        identity.temporal_resolution.as_str().into(),
    );

    for (path, id) in paths.iter().zip(&identities) {
        let mut asset = Asset::netcdf(options.href(path.as_ref()));
        asset.extra_fields = options.asset_extra_fields.clone();
        item.assets.insert(id.variable.clone(), asset);
    }
    item.add_extension(DATACUBE_EXTENSION);

    validate_item(&item)?;
    info!(id = %item.id, assets = item.assets.len(), "built item");
    Ok(item)
}

/// The shared identity of a group, taken from its first file.
fn check_group(identities: &[FileIdentity]) -> Result<&FileIdentity> {
    let first = identities
        .first()
        .ok_or_else(|| Error::InconsistentGroup("no files".to_string()))?;
    let id = first.item_id();

    for (i, other) in identities.iter().enumerate().skip(1) {
        if other.item_id() != id {
            return Err(Error::InconsistentGroup(format!(
                "{} belongs to {}, not {id}",
                other.filename,
                other.item_id()
            )));
        }
        if identities[..i].iter().any(|p| p.variable == other.variable) {
            return Err(Error::InconsistentGroup(format!(
                "variable {} appears twice ({})",
                other.variable, other.filename
            )));
        }
    }
    Ok(first)
}
