// src/process/reaper.rs

//! Process-wide child reaper.
//!
//! Builds are spawned and then forgotten, so nobody is guaranteed to `wait`
//! on them. The reaper listens for SIGCHLD on a tokio task and collects every
//! terminated child with a non-blocking `waitpid` loop, discarding statuses.
//! Job outcomes are never read from here; trackers infer them later from
//! liveness and output files.

use std::sync::OnceLock;

use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::process::liveness::reap_all;

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Handle to the installed reaper.
#[derive(Debug, Clone, Copy)]
pub struct Reaper;

impl Reaper {
    /// Install the SIGCHLD listener. Must be called inside a tokio runtime.
    ///
    /// Idempotent: only the first call registers the handler; later calls
    /// return the same handle.
    pub fn install() -> Result<Reaper> {
        if INSTALLED.get().is_some() {
            return Ok(Reaper);
        }

        let mut sigchld = signal(SignalKind::child())?;
        if INSTALLED.set(()).is_err() {
            // Lost a race with another installer; its task is already running.
            return Ok(Reaper);
        }

        tokio::spawn(async move {
            info!("child reaper started");
            while sigchld.recv().await.is_some() {
                let reaped = reap_all();
                if reaped > 0 {
                    debug!(reaped, "collected terminated children");
                }
            }
            warn!("SIGCHLD stream closed; child reaper stopped");
        });

        // Children that exited before the handler existed.
        reap_all();
        Ok(Reaper)
    }

    pub fn is_installed() -> bool {
        INSTALLED.get().is_some()
    }
}
