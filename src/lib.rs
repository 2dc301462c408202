//! STAC metadata for the UKCP18 global climate projections.
//!
//! Files are named by a fixed grammar ([`identity`]), opened into a
//! metadata-only [`dataset::Dataset`], reconciled onto one grid ([`align`]),
//! and turned into a STAC Collection ([`collection`]) or Item ([`item`]).

pub mod align;
pub mod attrs;
pub mod cftime;
pub mod collection;
pub mod cube;
pub mod dataset;
pub mod error;
pub mod identity;
pub mod item;
#[cfg(feature = "netcdf")]
pub mod netcdf_reader;
pub mod publisher;
pub mod stac;
pub mod storage;
pub mod validate;

#[cfg(test)]
mod fixtures;

pub use align::{align, alignment_base, reconcile};
pub use collection::build_collection;
pub use dataset::Dataset;
pub use error::{Error, ParseError, ReconcileError, Result, ValidationError};
pub use identity::{group_by_item, FileIdentity, TemporalResolution};
pub use item::{build_item, ItemOptions};
pub use publisher::Publisher;
pub use stac::{Collection, Item};
pub use storage::{filesystem, DatasetOpener, LocalStorage, MemoryStorage, Storage, StorageOptions};

// ─────────────────────────────────────────────────────────────────────
// Controlled vocabularies
// ─────────────────────────────────────────────────────────────────────
pub const VARIABLES: [&str; 13] = [
    "clt", "hurs", "huss", "pr", "psl", "rls", "rss", "sfcWind", "tas", "tasmax", "tasmin", "uas",
    "vas",
];
pub const TEMPORAL_RESOLUTIONS: [&str; 2] = ["day", "mon"];

/// Published with one extra latitude row on the nominal 60km grid.
pub const WIND_VARIABLES: [&str; 3] = ["sfcWind", "uas", "vas"];

// ─────────────────────────────────────────────────────────────────────
// Custom property names
// ─────────────────────────────────────────────────────────────────────
pub const MEMBER_ID_PROPERTY: &str = "ukcp18:member_id";
pub const TEMPORAL_RESOLUTION_PROPERTY: &str = "ukcp18:temporal_resolution";
pub const VARIABLE_SUMMARY: &str = "ukcp18:variable";
