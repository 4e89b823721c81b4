// src/tracker/upload.rs

//! Upload job kind: pushes a finished build's output into a cloud.
//!
//! The upload runs in-process. Its completion evidence is the
//! `remote_object_id` field, written back into the record once the cloud
//! client returns.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::cloud::CloudClient;
use crate::config::Provider;
use crate::errors::{Dib2CloudError, Result};
use crate::process::FunctionLaunch;
use crate::record::{JobId, JobKind, JobRecord, RecordStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadJob {
    /// The build whose output is uploaded.
    pub build_id: JobId,
    pub format: String,
    pub provider: String,
    pub cloud: String,
    pub upload_name: String,

    /// Resolved from the build at construction time.
    pub source_path: PathBuf,

    /// Id assigned by the cloud; present once the upload finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_object_id: Option<String>,
}

impl UploadJob {
    /// Describe an upload of `build`'s `format` output to `provider`.
    pub fn for_build(build: &JobRecord, format: &str, provider: &Provider) -> Result<Self> {
        let JobKind::Build(job) = &build.job else {
            return Err(Dib2CloudError::KindMismatch {
                id: build.id.clone(),
                expected: "build",
            });
        };
        if !job.produces(format) {
            return Err(Dib2CloudError::ConfigError(format!(
                "build {} does not produce format '{format}'",
                build.id
            )));
        }

        Ok(Self {
            build_id: build.id.clone(),
            format: format.to_string(),
            provider: provider.name.clone(),
            cloud: provider.cloud.clone(),
            upload_name: format!("{}-{}", job.name, build.id),
            source_path: job.output_path_for(&build.id, format),
            remote_object_id: None,
        })
    }

    /// The in-process closure: one blocking call into the cloud client.
    pub(crate) fn launch(&self, client: Arc<dyn CloudClient>) -> FunctionLaunch {
        let cloud = self.cloud.clone();
        let name = self.upload_name.clone();
        let source = self.source_path.clone();
        let format = self.format.clone();
        FunctionLaunch::new(move || client.upload_image(&cloud, &name, &source, &format))
    }
}

/// Record the remote object id on an upload record.
pub(crate) fn apply_remote_id(record: &mut JobRecord, remote_id: String) {
    if let JobKind::Upload(job) = &mut record.job {
        job.remote_object_id = Some(remote_id);
    }
}

/// Completion hook for a non-blocking upload worker.
///
/// Waits for `gate`, which `run` fires once its own record write landed, so
/// the re-write below cannot be overwritten by it. A dropped gate means `run`
/// failed to persist the job; the output is then discarded.
pub(crate) fn persist_output(
    store: RecordStore,
    id: JobId,
    gate: oneshot::Receiver<()>,
) -> impl FnOnce(anyhow::Result<String>) + Send + 'static {
    move |output| {
        if gate.blocking_recv().is_err() {
            warn!(job_id = %id, "upload record was never written; dropping result");
            return;
        }
        let Ok(remote_id) = output else {
            return;
        };

        match store.update(&id, |record| apply_remote_id(record, remote_id.clone())) {
            Ok(_) => info!(job_id = %id, remote_id = %remote_id, "upload finished"),
            Err(e) => warn!(job_id = %id, error = %e, "failed to persist upload result"),
        }
    }
}
