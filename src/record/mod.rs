// src/record/mod.rs

//! Durable job records.
//!
//! - [`id`] defines the opaque [`JobId`].
//! - [`store`] owns the on-disk layout (`<dir>/<id>.record`), the advisory
//!   lock around writers and the atomic replace of record files.
//!
//! A [`JobRecord`] is the only state that survives between invocations of
//! the controlling program. Liveness is never stored here; it is re-derived
//! from the recorded `pid`.

pub mod id;
pub mod store;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::tracker::build::BuildJob;
use crate::tracker::upload::UploadJob;

pub use id::JobId;
pub use store::{LockedRecord, RecordStore};

/// File suffix of record files inside a record directory.
pub const RECORD_SUFFIX: &str = "record";

/// Persisted state of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,

    /// Directory this record lives in, so a loaded record can re-save itself.
    pub record_dir: PathBuf,

    /// Process id of the most recent launch. Set once by `run`, never
    /// cleared afterwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    pub job: JobKind,
}

/// Kind-specific configuration and completion evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JobKind {
    Build(BuildJob),
    Upload(UploadJob),
}

impl JobKind {
    pub fn label(&self) -> &'static str {
        match self {
            JobKind::Build(_) => "build",
            JobKind::Upload(_) => "upload",
        }
    }
}

impl JobRecord {
    pub fn new(id: JobId, record_dir: impl Into<PathBuf>, job: JobKind) -> Self {
        Self {
            id,
            record_dir: record_dir.into(),
            pid: None,
            job,
        }
    }

    /// Store rooted at this record's own directory.
    pub fn store(&self) -> RecordStore {
        RecordStore::new(self.record_dir.clone())
    }
}
