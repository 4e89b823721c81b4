// src/process/mod.rs

//! OS process layer.
//!
//! - [`liveness`] holds the non-blocking probes (`kill(pid, 0)`, `waitpid`).
//! - [`launch`] implements the two launch strategies.
//! - [`workers`] tracks in-process workers by job id.
//! - [`reaper`] collects exited children on SIGCHLD.

pub mod launch;
pub mod liveness;
pub mod reaper;
pub mod workers;

pub use launch::{CommandLaunch, FunctionLaunch, Spawned};
pub use liveness::pid_exists;
pub use reaper::Reaper;
