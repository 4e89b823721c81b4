// src/process/launch.rs

//! Launch strategies.
//!
//! Both strategies end in a pid that the tracker records and later polls:
//!
//! - [`CommandLaunch`] spawns an external program with stdout and stderr
//!   redirected into a log file. The pid is the child's.
//! - [`FunctionLaunch`] runs a closure on tokio's blocking pool. The pid is
//!   our own; liveness of the worker is tracked in [`crate::process::workers`].

use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::errors::{Dib2CloudError, Result};
use crate::process::liveness::{current_pid, is_echild};
use crate::process::workers;
use crate::record::JobId;

/// Spawn-and-supervise an external command.
#[derive(Debug, Clone)]
pub struct CommandLaunch {
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
    pub log_path: PathBuf,
}

/// A spawned command: its pid and, unless the launch was blocking, the
/// still-running child handle.
#[derive(Debug)]
pub struct Spawned {
    pub pid: u32,
    pub child: Option<Child>,
}

impl CommandLaunch {
    pub fn new(argv: Vec<String>, log_path: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            env: Vec::new(),
            log_path: log_path.into(),
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Start the command. With `blocking`, also wait for it to exit.
    pub async fn launch(self, id: &JobId, blocking: bool) -> Result<Spawned> {
        let child = self.spawn(id)?;
        let pid = child.id();

        info!(job_id = %id, pid, cmd = ?self.argv, log = ?self.log_path, "started command");

        if blocking {
            let status = wait_child(child).await?;
            debug!(job_id = %id, pid, ?status, "command exited");
            return Ok(Spawned { pid, child: None });
        }

        Ok(Spawned {
            pid,
            child: Some(child),
        })
    }

    fn spawn(&self, id: &JobId) -> Result<Child> {
        let launch_err = |reason: String| Dib2CloudError::Launch {
            id: id.clone(),
            reason,
        };

        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| launch_err("empty command line".to_string()))?;

        if let Some(parent) = self.log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let stdout = File::create(&self.log_path)?;
        let stderr = stdout.try_clone()?;

        Command::new(program)
            .args(args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|e| launch_err(format!("spawning {program}: {e}")))
    }
}

/// Wait for `child` on the blocking pool.
///
/// `Ok(None)` means the status was already collected elsewhere (the reaper,
/// or a liveness probe); the child is gone either way.
pub async fn wait_child(mut child: Child) -> Result<Option<ExitStatus>> {
    let waited = tokio::task::spawn_blocking(move || child.wait())
        .await
        .context("joining child waiter")?;

    match waited {
        Ok(status) => Ok(Some(status)),
        Err(e) if is_echild(&e) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// In-process unit of work. Produces the job's output token.
pub type Work = Box<dyn FnOnce() -> anyhow::Result<String> + Send + 'static>;

/// Run-a-closure strategy.
pub struct FunctionLaunch {
    work: Work,
}

impl FunctionLaunch {
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<String> + Send + 'static,
    {
        Self {
            work: Box::new(work),
        }
    }

    /// Run the closure to completion and return our pid with its result.
    pub async fn run_blocking(self) -> Result<(u32, anyhow::Result<String>)> {
        let output = tokio::task::spawn_blocking(self.work)
            .await
            .map_err(|e| io::Error::other(format!("in-process work panicked: {e}")))?;
        Ok((current_pid(), output))
    }

    /// Run the closure on a worker and return immediately with our pid.
    ///
    /// `finish` runs on the same worker with the closure's result; that is
    /// where the caller persists the output. The worker is registered under
    /// `id` until both have returned.
    pub fn spawn<F>(self, id: &JobId, finish: F) -> u32
    where
        F: FnOnce(anyhow::Result<String>) + Send + 'static,
    {
        let work = self.work;
        let job_id = id.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let output = work();
            if let Err(e) = &output {
                warn!(job_id = %job_id, error = %e, "in-process work failed");
            }
            finish(output);
            debug!(job_id = %job_id, "in-process worker finished");
        });

        let handle = tokio::spawn(async move {
            if let Err(e) = handle.await {
                warn!(error = %e, "in-process worker panicked");
            }
        });
        workers::register(id.clone(), handle);

        current_pid()
    }
}
