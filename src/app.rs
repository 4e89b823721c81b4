// src/app.rs

//! High-level operations behind the CLI subcommands.

use std::sync::Arc;

use tracing::info;

use crate::cloud::{CloudClient, OpenStackCliClient};
use crate::config::Config;
use crate::errors::{Dib2CloudError, Result};
use crate::record::{JobId, JobKind, JobRecord, RecordStore};
use crate::tracker::build::BuildJob;
use crate::tracker::upload::UploadJob;
use crate::tracker::{Toolchain, Tracker};

/// Output format uploads take from a build unless told otherwise.
pub const DEFAULT_UPLOAD_FORMAT: &str = "qcow2";

#[derive(Debug, Clone)]
pub struct App {
    config: Config,
    tools: Toolchain,
}

impl App {
    /// App using the `openstack` CLI named in the config for uploads.
    pub fn new(config: Config) -> Self {
        let cloud = Arc::new(OpenStackCliClient::new(config.upload_tool.clone()));
        Self::with_cloud(config, cloud)
    }

    pub fn with_cloud(config: Config, cloud: Arc<dyn CloudClient>) -> Self {
        let tools = Toolchain {
            build_tool: config.build_tool.clone(),
            cloud,
        };
        Self { config, tools }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn build_store(&self) -> RecordStore {
        RecordStore::new(self.config.build_processfile_dir.clone())
    }

    fn upload_store(&self) -> RecordStore {
        RecordStore::new(self.config.upload_processfile_dir.clone())
    }

    /// Start a build of the diskimage called `name`.
    pub async fn build(&self, name: &str, blocking: bool) -> Result<Tracker> {
        let image = self.config.diskimage(name)?;
        let job = BuildJob::from_diskimage(
            image,
            self.config.buildlog_dir.clone(),
            self.config.images_dir.clone(),
        );
        let record = JobRecord::new(
            JobId::generate(),
            self.config.build_processfile_dir.clone(),
            JobKind::Build(job),
        );

        let mut tracker = Tracker::new(record);
        tracker.run(&self.tools, blocking).await?;
        info!(job_id = %tracker.id(), image = name, "build requested");
        Ok(tracker)
    }

    pub fn get_build(&self, id: &JobId) -> Result<Tracker> {
        expect_kind(Tracker::load(&self.build_store(), id)?, "build")
    }

    pub fn get_builds(&self) -> Result<Vec<Tracker>> {
        self.build_store()
            .list()?
            .iter()
            .map(|id| self.get_build(id))
            .collect()
    }

    /// Delete a finished build and its images; returns what was deleted.
    pub fn delete_build(&self, id: &JobId) -> Result<JobRecord> {
        self.get_build(id)?.delete()
    }

    /// Start uploading build `build_id` to the provider `provider_name`.
    pub async fn upload(
        &self,
        build_id: &JobId,
        provider_name: &str,
        blocking: bool,
    ) -> Result<Tracker> {
        let provider = self.config.provider(provider_name)?;
        let build = self.get_build(build_id)?;
        let job = UploadJob::for_build(build.record(), DEFAULT_UPLOAD_FORMAT, provider)?;
        let record = JobRecord::new(
            JobId::generate(),
            self.config.upload_processfile_dir.clone(),
            JobKind::Upload(job),
        );

        let mut tracker = Tracker::new(record);
        tracker.run(&self.tools, blocking).await?;
        info!(job_id = %tracker.id(), build_id = %build_id, provider = provider_name, "upload requested");
        Ok(tracker)
    }

    pub fn get_upload(&self, id: &JobId) -> Result<Tracker> {
        expect_kind(Tracker::load(&self.upload_store(), id)?, "upload")
    }

    pub fn get_uploads(&self) -> Result<Vec<Tracker>> {
        self.upload_store()
            .list()?
            .iter()
            .map(|id| self.get_upload(id))
            .collect()
    }
}

fn expect_kind(tracker: Tracker, expected: &'static str) -> Result<Tracker> {
    if tracker.record().job.label() == expected {
        Ok(tracker)
    } else {
        Err(Dib2CloudError::KindMismatch {
            id: tracker.id().clone(),
            expected,
        })
    }
}
