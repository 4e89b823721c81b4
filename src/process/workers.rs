// src/process/workers.rs

//! Table of in-process workers, keyed by job id.
//!
//! Uploads run inside the controlling process, so their recorded pid is our
//! own pid and a `kill(pid, 0)` probe says nothing useful. Liveness for those
//! jobs is read from this table instead: a job is running iff it has an
//! entry whose task has not finished.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock};

use tokio::task::JoinHandle;
use tracing::debug;

use crate::record::JobId;

static WORKERS: OnceLock<Mutex<HashMap<JobId, JoinHandle<()>>>> = OnceLock::new();

fn table() -> MutexGuard<'static, HashMap<JobId, JoinHandle<()>>> {
    let table = WORKERS.get_or_init(|| Mutex::new(HashMap::new()));
    // A panic while holding the guard cannot leave the map half-updated.
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Track `handle` as the worker for `id`.
///
/// Finished workers of every job are dropped first, so the table stays
/// bounded even if nobody ever asks about them.
pub fn register(id: JobId, handle: JoinHandle<()>) {
    let mut table = table();
    table.retain(|_, worker| !worker.is_finished());
    debug!(job_id = %id, tracked = table.len() + 1, "registered in-process worker");
    if table.insert(id, handle).is_some() {
        // `run` refuses a second launch, so this never replaces a live worker.
        debug_assert!(false, "replaced an active worker");
    }
}

/// Does `id` have a worker in this process that has not finished yet?
///
/// Finished entries are pruned on the way.
pub fn is_active(id: &JobId) -> bool {
    let mut table = table();
    match table.get(id) {
        Some(handle) if !handle.is_finished() => true,
        Some(_) => {
            table.remove(id);
            false
        }
        None => false,
    }
}
