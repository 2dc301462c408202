//! Collection builder: the whole archive as one STAC Collection.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::info;

use crate::{
    attrs::normalize_attrs,
    cube::{describe, Cube},
    dataset::Dataset,
    error::{Error, Result, ValidationError},
    publisher::Publisher,
    stac::{
        AssetDefinition, Collection, Extent, SpatialExtent, TemporalExtent, DATACUBE_EXTENSION,
        DATA_ROLE, ITEM_ASSETS_EXTENSION, NETCDF_MEDIA_TYPE, SCIENTIFIC_EXTENSION,
    },
    validate::validate_collection,
    TEMPORAL_RESOLUTIONS, TEMPORAL_RESOLUTION_PROPERTY, VARIABLES, VARIABLE_SUMMARY,
};

/// Build and validate the archive Collection from a reconciled dataset.
/// `ds` is not modified.
pub fn build_collection(ds: &Dataset, publisher: &Publisher) -> Result<Collection> {
    let mut ds = ds.clone();
    normalize_attrs(&mut ds);

    let mut cube = describe(&ds, publisher.reference_system)?;
    extend_time(&mut cube, publisher)?;

    let extent = Extent {
        spatial: SpatialExtent {
            bbox: vec![publisher.bbox.to_vec()],
        },
        temporal: TemporalExtent {
            interval: vec![publisher.temporal_interval.clone().map(Some)],
        },
    };
    let mut collection = Collection::new(&publisher.collection_id, &publisher.description, extent);
    collection.title = Some(publisher.title.clone());
    collection.keywords = publisher.keywords.clone();
    collection.license = publisher.license.clone();
    collection.providers = publisher.providers.clone();
    collection.links = publisher.links.clone();
    collection.citation = Some(publisher.citation.clone());

    collection.item_assets = item_assets(&ds, &cube);

    collection.summaries.maxcount = publisher.summary_maxcount;
    for (key, values) in [
        (VARIABLE_SUMMARY, &VARIABLES[..]),
        (TEMPORAL_RESOLUTION_PROPERTY, &TEMPORAL_RESOLUTIONS[..]),
    ] {
        collection
            .summaries
            .add(key, values)
            .map_err(|e| invalid(&publisher.collection_id, e))?;
    }

    collection.cube_dimensions = cube.dimensions;
    collection.cube_variables = cube.variables;

    for ext in [DATACUBE_EXTENSION, ITEM_ASSETS_EXTENSION, SCIENTIFIC_EXTENSION] {
        collection.add_extension(ext);
    }

    validate_collection(&collection)?;
    info!(
        id = %collection.id,
        variables = collection.cube_variables.len(),
        "built collection"
    );
    Ok(collection)
}

/// The archive runs past the last file on disk; the collection's time
/// dimension ends where the publisher says it does.
fn extend_time(cube: &mut Cube, publisher: &Publisher) -> Result<()> {
    let time = cube
        .dimensions
        .get_mut("time")
        .ok_or_else(|| invalid(&publisher.collection_id, "dataset has no time dimension".into()))?;
    let end = Value::from(publisher.temporal_end());
    match time.extent.len() {
        2 => time.extent[1] = end,
        _ => time.extent = vec![Value::Null, end],
    }
    Ok(())
}

fn item_assets(ds: &Dataset, cube: &Cube) -> IndexMap<String, AssetDefinition> {
    cube.variables
        .iter()
        .map(|(name, var)| {
            let title = ds
                .variable(name)
                .and_then(|v| v.attr_str("long_name"))
                .unwrap_or(name);
            (
                name.clone(),
                AssetDefinition {
                    title: Some(title.to_string()),
                    description: var.description.clone(),
                    media_type: Some(NETCDF_MEDIA_TYPE.to_string()),
                    roles: vec![DATA_ROLE.to_string()],
                },
            )
        })
        .collect()
}

fn invalid(id: &str, error: String) -> Error {
    ValidationError {
        record: "Collection",
        id: id.to_string(),
        errors: vec![error],
    }
    .into()
}
