// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

use crate::record::JobId;

#[derive(Error, Debug)]
pub enum Dib2CloudError {
    #[error("No job with id {0} found")]
    RecordNotFound(JobId),

    #[error("Record file {path:?} is corrupt: {reason}")]
    RecordCorrupt { path: PathBuf, reason: String },

    #[error("Job {0} has already been run")]
    AlreadyRun(JobId),

    #[error("Cannot delete job {0} while it is running")]
    DeleteWhileRunning(JobId),

    #[error("Job {id} is not a {expected} job")]
    KindMismatch { id: JobId, expected: &'static str },

    #[error("Invalid job id '{0}'")]
    InvalidJobId(String),

    #[error("Failed to launch job {id}: {reason}")]
    Launch { id: JobId, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No diskimage with name {0} found in config")]
    UnknownDiskimage(String),

    #[error("No provider with name {0} found in config")]
    UnknownProvider(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Dib2CloudError>;
