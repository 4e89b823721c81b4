// src/report.rs

//! JSON summaries printed on stdout by the CLI.

use std::path::PathBuf;

use serde::Serialize;

use crate::record::{JobId, JobKind, JobRecord};
use crate::tracker::{JobFailure, Tracker};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildSummary {
    pub name: String,
    pub status: String,
    pub id: JobId,
    pub pid: Option<u32>,
    pub log: PathBuf,
    pub destinations: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSummary {
    pub id: JobId,
    pub build_id: JobId,
    pub upload_name: String,
    pub cloud: String,
    pub status: String,
    pub glance_uuid: Option<String>,
}

fn status_str(tracker: &Tracker, done: &'static str, busy: &'static str) -> &'static str {
    match tracker.succeeded() {
        (true, _) => done,
        (false, Some(JobFailure::StillRunning)) => busy,
        (false, _) => "error",
    }
}

/// Summary of a live build. `None` if the tracker is not a build.
pub fn build_summary(tracker: &Tracker) -> Option<BuildSummary> {
    let status = status_str(tracker, "built", "building");
    let pid = if tracker.is_running() {
        tracker.pid()
    } else {
        None
    };
    let mut summary = build_record_summary(tracker.record(), status)?;
    summary.pid = pid;
    Some(summary)
}

/// Summary of a build record with a fixed status (e.g. `deleted`).
pub fn build_record_summary(record: &JobRecord, status: &str) -> Option<BuildSummary> {
    let JobKind::Build(job) = &record.job else {
        return None;
    };
    Some(BuildSummary {
        name: job.name.clone(),
        status: status.to_string(),
        id: record.id.clone(),
        pid: None,
        log: job.log_path(&record.id),
        destinations: job.dest_paths(&record.id),
    })
}

pub fn upload_summary(tracker: &Tracker) -> Option<UploadSummary> {
    let job = tracker.as_upload()?;
    Some(UploadSummary {
        id: tracker.id().clone(),
        build_id: job.build_id.clone(),
        upload_name: job.upload_name.clone(),
        cloud: job.cloud.clone(),
        status: status_str(tracker, "uploaded", "uploading").to_string(),
        glance_uuid: job.remote_object_id.clone(),
    })
}
