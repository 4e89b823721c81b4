// src/tracker/mod.rs

//! Process tracker.
//!
//! A [`Tracker`] wraps one [`JobRecord`] and moves through three states:
//!
//! ```text
//! Unstarted --run--> Running --process ends--> Finished
//! ```
//!
//! Only `run` writes state. `Running` vs `Finished` is recomputed on every
//! query from the recorded pid, so a tracker rebuilt from disk by a new
//! process answers the same way as the one that launched the job.
//!
//! - [`build`] holds the build kind (external command, file outputs).
//! - [`upload`] holds the upload kind (in-process worker, remote id output).

pub mod build;
pub mod upload;

use std::path::PathBuf;
use std::process::Child;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cloud::CloudClient;
use crate::errors::{Dib2CloudError, Result};
use crate::process::liveness::{current_pid, is_echild};
use crate::process::{CommandLaunch, FunctionLaunch, pid_exists, workers};
use crate::record::store::remove_if_present;
use crate::record::{JobId, JobKind, JobRecord, RecordStore};

use self::build::BuildJob;
use self::upload::UploadJob;

/// Interval between liveness probes in [`Tracker::wait`].
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Why a job has not (yet) succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFailure {
    StillRunning,
    OutputMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Unstarted,
    Running,
    Finished,
}

/// Collaborators a launch needs that are not part of the record.
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// Image-creation command line (first word is the binary).
    pub build_tool: String,
    pub cloud: Arc<dyn CloudClient>,
}

enum LaunchPlan {
    Command(CommandLaunch),
    Function(FunctionLaunch),
}

#[derive(Debug)]
pub struct Tracker {
    record: JobRecord,
    child: Option<Child>,
}

impl Tracker {
    pub fn new(record: JobRecord) -> Self {
        Self {
            record,
            child: None,
        }
    }

    /// Rebuild a tracker from the record stored under `id`.
    pub fn load(store: &RecordStore, id: &JobId) -> Result<Self> {
        Ok(Self::new(store.read(id)?))
    }

    pub fn id(&self) -> &JobId {
        &self.record.id
    }

    pub fn pid(&self) -> Option<u32> {
        self.record.pid
    }

    pub fn record(&self) -> &JobRecord {
        &self.record
    }

    pub fn into_record(self) -> JobRecord {
        self.record
    }

    pub fn as_build(&self) -> Option<&BuildJob> {
        match &self.record.job {
            JobKind::Build(job) => Some(job),
            JobKind::Upload(_) => None,
        }
    }

    pub fn as_upload(&self) -> Option<&UploadJob> {
        match &self.record.job {
            JobKind::Upload(job) => Some(job),
            JobKind::Build(_) => None,
        }
    }

    /// Paths this job promises to produce.
    pub fn declared_outputs(&self) -> Vec<PathBuf> {
        match &self.record.job {
            JobKind::Build(job) => job.dest_paths(&self.record.id),
            JobKind::Upload(_) => Vec::new(),
        }
    }

    pub fn state(&self) -> TrackerState {
        match self.record.pid {
            None => TrackerState::Unstarted,
            Some(_) if self.is_running() => TrackerState::Running,
            Some(_) => TrackerState::Finished,
        }
    }

    /// Is the recorded process (or in-process worker) still alive?
    pub fn is_running(&self) -> bool {
        match self.record.pid {
            None => false,
            Some(pid) if pid == current_pid() => workers::is_active(&self.record.id),
            Some(pid) => pid_exists(pid),
        }
    }

    /// `(true, None)` once finished with all evidence present.
    pub fn succeeded(&self) -> (bool, Option<JobFailure>) {
        if self.is_running() {
            return (false, Some(JobFailure::StillRunning));
        }

        let complete = match &self.record.job {
            JobKind::Build(job) => job.outputs_exist(&self.record.id),
            JobKind::Upload(job) => job.remote_object_id.is_some(),
        };

        if complete {
            (true, None)
        } else {
            (false, Some(JobFailure::OutputMissing))
        }
    }

    /// Launch the job and persist its record.
    ///
    /// The record is written only after a pid was obtained; a failed launch
    /// leaves nothing on disk.
    pub async fn run(&mut self, tools: &Toolchain, blocking: bool) -> Result<()> {
        if self.record.pid.is_some() {
            return Err(Dib2CloudError::AlreadyRun(self.record.id.clone()));
        }

        let id = self.record.id.clone();
        let store = self.record.store();
        let plan = match &self.record.job {
            JobKind::Build(job) => LaunchPlan::Command(job.launch(&id, &tools.build_tool)?),
            JobKind::Upload(job) => LaunchPlan::Function(job.launch(Arc::clone(&tools.cloud))),
        };

        match plan {
            LaunchPlan::Command(launch) => {
                let spawned = launch.launch(&id, blocking).await?;
                self.record.pid = Some(spawned.pid);
                self.child = spawned.child;
                store.save(&self.record)?;
            }
            LaunchPlan::Function(launch) if blocking => {
                let (pid, output) = launch.run_blocking().await?;
                self.record.pid = Some(pid);
                store.save(&self.record)?;

                let remote_id = output?;
                self.record = store.update(&id, |record| {
                    upload::apply_remote_id(record, remote_id)
                })?;
            }
            LaunchPlan::Function(launch) => {
                let (gate_tx, gate_rx) = oneshot::channel();
                let finish = upload::persist_output(store.clone(), id.clone(), gate_rx);
                let pid = launch.spawn(&id, finish);
                self.record.pid = Some(pid);

                let saved = store.save(&self.record);
                if saved.is_ok() {
                    let _ = gate_tx.send(());
                }
                saved?;
            }
        }

        info!(job_id = %id, kind = self.record.job.label(), pid = ?self.record.pid, blocking, "job started");
        Ok(())
    }

    /// Block until the job is no longer running, then reload the record.
    ///
    /// Returns `Ok(false)` if `timeout` elapsed first. A child handle still
    /// held from `run` is polled in place and stays with the tracker, so a
    /// timed-out wait leaves nothing behind.
    pub async fn wait(&mut self, timeout: Option<Duration>) -> Result<bool> {
        let deadline = timeout.map(|limit| Instant::now() + limit);

        while !(self.reap_held_child()? && !self.is_running()) {
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    debug!(job_id = %self.record.id, ?timeout, "wait timed out");
                    return Ok(false);
                }
                tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
            } else {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }

        self.reload()?;
        Ok(true)
    }

    /// Collect the held child's status if it has exited.
    ///
    /// `true` when no child is held any more.
    fn reap_held_child(&mut self) -> Result<bool> {
        let Some(child) = self.child.as_mut() else {
            return Ok(true);
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(job_id = %self.record.id, ?status, "command exited");
            }
            Ok(None) => return Ok(false),
            // Collected by the reaper or a liveness probe first.
            Err(e) if is_echild(&e) => {}
            Err(e) => return Err(e.into()),
        }
        self.child = None;
        Ok(true)
    }

    /// Replace the in-memory record with the stored one.
    ///
    /// Unstarted trackers have nothing stored and are left untouched.
    pub fn reload(&mut self) -> Result<()> {
        if self.record.pid.is_none() {
            return Ok(());
        }
        self.record = self.record.store().read(&self.record.id)?;
        Ok(())
    }

    /// Remove every declared output, then the record.
    ///
    /// Refused while the job is running, before anything is touched.
    pub fn delete(self) -> Result<JobRecord> {
        if self.is_running() {
            return Err(Dib2CloudError::DeleteWhileRunning(self.record.id.clone()));
        }

        let store = self.record.store();
        let locked = store.acquire(&self.record.id)?;
        for path in self.declared_outputs() {
            remove_if_present(&path)?;
            debug!(job_id = %self.record.id, path = ?path, "removed output");
        }
        locked.remove()?;

        info!(job_id = %self.record.id, "job deleted");
        Ok(self.record)
    }
}
