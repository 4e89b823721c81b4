// src/record/store.rs

//! Locked record store.
//!
//! Layout inside a record directory:
//!
//! - `<id>.record`: the TOML-serialized [`JobRecord`]
//! - `<id>.lock`: sidecar file carrying the exclusive advisory lock
//!
//! Writers take the lock on the sidecar, write the record into a temp file in
//! the same directory and rename it over `<id>.record`. The rename swaps the
//! inode, which is why the lock cannot live on the record file itself.
//! Readers never lock; they only ever see a complete old or new record.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::{Dib2CloudError, Result};
use crate::record::{JobId, JobRecord, RECORD_SUFFIX};

const LOCK_SUFFIX: &str = "lock";

/// Handle on one record directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, id: &JobId) -> PathBuf {
        self.dir.join(format!("{id}.{RECORD_SUFFIX}"))
    }

    fn lock_path(&self, id: &JobId) -> PathBuf {
        self.dir.join(format!("{id}.{LOCK_SUFFIX}"))
    }

    /// Block until the exclusive lock for `id` is held.
    ///
    /// Creates the record directory if needed. The lock is released when the
    /// returned guard is dropped.
    pub fn acquire(&self, id: &JobId) -> Result<LockedRecord> {
        fs::create_dir_all(&self.dir)?;

        let lock_path = self.lock_path(id);
        loop {
            let lock_file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&lock_path)?;
            lock_file.lock_exclusive()?;

            // `remove` unlinks the lock file while holding it. A waiter that
            // wakes on an unlinked inode must start over on the current file.
            if !is_current_lock_file(&lock_file, &lock_path)? {
                debug!(job_id = %id, path = ?lock_path, "lock file replaced while waiting; retrying");
                continue;
            }

            debug!(job_id = %id, path = ?lock_path, "acquired record lock");
            return Ok(LockedRecord {
                store: self.clone(),
                id: id.clone(),
                lock_file,
            });
        }
    }

    /// Read the record for `id` without taking the lock.
    pub fn read(&self, id: &JobId) -> Result<JobRecord> {
        let path = self.record_path(id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Dib2CloudError::RecordNotFound(id.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let record: JobRecord =
            toml::from_str(&contents).map_err(|e| Dib2CloudError::RecordCorrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if &record.id != id {
            return Err(Dib2CloudError::RecordCorrupt {
                path,
                reason: format!("file holds record for job {}", record.id),
            });
        }

        Ok(record)
    }

    /// Ids of every record in the directory. A missing directory is empty.
    pub fn list(&self) -> Result<BTreeSet<JobId>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = BTreeSet::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_SUFFIX) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match stem.parse::<JobId>() {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(_) => warn!(path = ?path, "ignoring record file with unusable name"),
            }
        }
        Ok(ids)
    }

    /// Read every record in the directory.
    pub fn load_all(&self) -> Result<Vec<JobRecord>> {
        self.list()?.iter().map(|id| self.read(id)).collect()
    }

    /// Lock, write, unlock.
    pub fn save(&self, record: &JobRecord) -> Result<()> {
        self.acquire(&record.id)?.write(record)
    }

    /// Read-modify-write of an existing record under the lock.
    pub fn update<F>(&self, id: &JobId, f: F) -> Result<JobRecord>
    where
        F: FnOnce(&mut JobRecord),
    {
        let locked = self.acquire(id)?;
        let mut record = locked.read()?;
        f(&mut record);
        locked.write(&record)?;
        Ok(record)
    }
}

/// Exclusive hold on one job's record. Dropping it releases the lock.
#[derive(Debug)]
pub struct LockedRecord {
    store: RecordStore,
    id: JobId,
    lock_file: File,
}

impl LockedRecord {
    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn read(&self) -> Result<JobRecord> {
        self.store.read(&self.id)
    }

    /// Atomically replace the record file with `record`.
    pub fn write(&self, record: &JobRecord) -> Result<()> {
        let body = toml::to_string(record)?;
        let path = self.store.record_path(&self.id);

        let mut tmp = NamedTempFile::new_in(self.store.dir())?;
        tmp.write_all(body.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(job_id = %self.id, path = ?path, pid = ?record.pid, "wrote record");
        Ok(())
    }

    /// Delete the record file, then the lock file, then release the lock.
    ///
    /// The lock file is unlinked while still held so that every waiter on it
    /// notices the swap in [`RecordStore::acquire`].
    pub fn remove(self) -> Result<()> {
        let record_path = self.store.record_path(&self.id);
        remove_if_present(&record_path)?;
        remove_if_present(&self.store.lock_path(&self.id))?;
        drop(self);

        debug!(path = ?record_path, "removed record");
        Ok(())
    }
}

impl Drop for LockedRecord {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.lock_file) {
            warn!(job_id = %self.id, error = %e, "failed to release record lock");
        }
    }
}

/// Is `file` still the inode found at `path`?
fn is_current_lock_file(file: &File, path: &Path) -> Result<bool> {
    let held = file.metadata()?;
    match fs::metadata(path) {
        Ok(current) => Ok(held.dev() == current.dev() && held.ino() == current.ino()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// `remove_file` that treats "already gone" as success.
pub(crate) fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
