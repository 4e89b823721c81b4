use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, bail};
use dib2cloud::cloud::CloudClient;

/// One call made to [`FakeCloudClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct UploadCall {
    pub cloud: String,
    pub name: String,
    pub source: PathBuf,
    pub disk_format: String,
}

/// Cloud client that records calls and returns a fixed image id.
#[derive(Debug)]
pub struct FakeCloudClient {
    remote_id: String,
    delay: Option<Duration>,
    fail: bool,
    calls: Mutex<Vec<UploadCall>>,
}

impl FakeCloudClient {
    pub fn new(remote_id: &str) -> Self {
        Self {
            remote_id: remote_id.to_string(),
            delay: None,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sleep this long inside every upload.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> Vec<UploadCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl CloudClient for FakeCloudClient {
    fn upload_image(
        &self,
        cloud: &str,
        name: &str,
        source: &Path,
        disk_format: &str,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(UploadCall {
            cloud: cloud.to_string(),
            name: name.to_string(),
            source: source.to_path_buf(),
            disk_format: disk_format.to_string(),
        });

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail {
            bail!("fake cloud rejected upload of {name}");
        }
        Ok(self.remote_id.clone())
    }
}
