//! Where input files come from.
//!
//! Builders only need something that turns an href into a [`Dataset`];
//! listing and protocol selection are for the command line.

use std::path::{Path, PathBuf};

use glob::glob;
use indexmap::IndexMap;
use tracing::debug;

use crate::{
    dataset::Dataset,
    error::{Error, Result},
};

/// Free-form options passed to the filesystem (credentials, endpoints...).
/// The local filesystem accepts and ignores them.
pub type StorageOptions = IndexMap<String, String>;

/// Opens the dataset behind an href.
pub trait DatasetOpener {
    fn open(&self, href: &str) -> Result<Dataset>;
}

// ─────────────────────────────────────────────────────────────────────
// Local filesystem
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct LocalStorage {
    options: StorageOptions,
}

impl LocalStorage {
    pub fn new(options: StorageOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &StorageOptions {
        &self.options
    }

    /// Local path behind `href`, with any `file://` scheme removed.
    pub fn path(href: &str) -> PathBuf {
        PathBuf::from(href.strip_prefix("file://").unwrap_or(href))
    }

    /// Files matching a glob `pattern`, sorted.
    pub fn list(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = pattern.strip_prefix("file://").unwrap_or(pattern);
        let mut v: Vec<_> = glob(pattern)?.filter_map(std::result::Result::ok).collect();
        v.sort();
        debug!(pattern, matched = v.len(), "listed files");
        Ok(v)
    }

    /// `*.nc` files directly under `dir`, sorted.
    pub fn list_netcdf(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.list(&format!("{}/*.nc", dir.display()))
    }
}

impl DatasetOpener for LocalStorage {
    fn open(&self, href: &str) -> Result<Dataset> {
        let path = Self::path(href);
        if !path.is_file() {
            return Err(Error::Open {
                href: href.to_string(),
                reason: "no such file".to_string(),
            });
        }
        open_local(href, &path)
    }
}

#[cfg(feature = "netcdf")]
fn open_local(_href: &str, path: &Path) -> Result<Dataset> {
    crate::netcdf_reader::open_dataset(path)
}

#[cfg(not(feature = "netcdf"))]
fn open_local(href: &str, _path: &Path) -> Result<Dataset> {
    Err(Error::Open {
        href: href.to_string(),
        reason: "built without NetCDF support".to_string(),
    })
}

// ─────────────────────────────────────────────────────────────────────
// In-memory
// ─────────────────────────────────────────────────────────────────────

/// Datasets held in memory under their hrefs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    datasets: IndexMap<String, Dataset>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, href: impl Into<String>, ds: Dataset) -> &mut Self {
        self.datasets.insert(href.into(), ds);
        self
    }

    /// Hrefs matching a glob `pattern`, sorted.
    pub fn list(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = glob::Pattern::new(pattern)?;
        let mut v: Vec<String> = self
            .datasets
            .keys()
            .filter(|k| pattern.matches(k))
            .cloned()
            .collect();
        v.sort();
        Ok(v)
    }
}

impl DatasetOpener for MemoryStorage {
    fn open(&self, href: &str) -> Result<Dataset> {
        self.datasets.get(href).cloned().ok_or_else(|| Error::Open {
            href: href.to_string(),
            reason: "not in memory storage".to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────
// Protocol selection
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Storage {
    Local(LocalStorage),
}

impl Storage {
    pub fn list(&self, pattern: &str) -> Result<Vec<String>> {
        match self {
            Self::Local(fs) => Ok(fs
                .list(pattern)?
                .into_iter()
                .map(|p| p.display().to_string())
                .collect()),
        }
    }
}

impl DatasetOpener for Storage {
    fn open(&self, href: &str) -> Result<Dataset> {
        match self {
            Self::Local(fs) => fs.open(href),
        }
    }
}

/// Filesystem for `protocol`. Only the local filesystem is built in.
pub fn filesystem(protocol: &str, options: &StorageOptions) -> Result<Storage> {
    match protocol {
        "" | "file" | "local" => Ok(Storage::Local(LocalStorage::new(options.clone()))),
        other => Err(Error::UnsupportedProtocol(other.to_string())),
    }
}
