//! Error taxonomy for record building.
//!
//! Every failure aborts the current build: a builder returns either a fully
//! validated record or one of these errors, never a partial record.

use thiserror::Error;

/// A filename that does not follow the UKCP18 naming grammar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("filename does not match the UKCP18 grammar: {0}")]
    Grammar(String),

    #[error("unknown variable {variable:?} in {filename}")]
    UnknownVariable { variable: String, filename: String },

    #[error("unknown temporal resolution {resolution:?} in {filename}")]
    UnknownResolution { resolution: String, filename: String },

    #[error("ensemble member must be a positive integer, got {member:?} in {filename}")]
    Member { member: String, filename: String },

    #[error("malformed date {token:?} in {filename}: {reason}")]
    Date {
        token: String,
        filename: String,
        reason: String,
    },

    #[error("start date {start} is after end date {end} in {filename}")]
    Range {
        start: String,
        end: String,
        filename: String,
    },
}

/// Datasets that still disagree after coordinate forcing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReconcileError {
    #[error("no datasets to reconcile")]
    Empty,

    #[error("base dataset has no {0:?} coordinate")]
    MissingBaseCoordinate(String),

    #[error("cannot force {name:?} onto the base grid: shape {found:?} vs base {base:?}")]
    GridShape {
        name: String,
        found: Vec<usize>,
        base: Vec<usize>,
    },

    #[error("dimension {dim:?} has size {left} in one dataset and {right} in another")]
    DimensionMismatch {
        dim: String,
        left: usize,
        right: usize,
    },

    #[error("coordinate {0:?} differs between datasets")]
    CoordinateMismatch(String),

    #[error("variable {0:?} conflicts between datasets")]
    VariableConflict(String),

    #[error("variable {name:?} refers to unknown dimension {dim:?}")]
    UnknownDimension { name: String, dim: String },
}

/// A record that failed the schema checks. Holds every violation found.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{record} {id:?} failed validation: {}", .errors.join("; "))]
pub struct ValidationError {
    pub record: &'static str,
    pub id: String,
    pub errors: Vec<String>,
}

/// CF time units or calendars this crate cannot decode.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CfTimeError {
    #[error("invalid time units {0:?}")]
    Units(String),

    #[error("unsupported calendar {0:?}")]
    Calendar(String),

    #[error("time value {0} is out of range")]
    Range(f64),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    CfTime(#[from] CfTimeError),

    #[error("inconsistent file group: {0}")]
    InconsistentGroup(String),

    #[error("unsupported storage protocol {0:?}")]
    UnsupportedProtocol(String),

    #[error("cannot open {href}: {reason}")]
    Open { href: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::error::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
