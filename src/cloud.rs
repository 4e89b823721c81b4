// src/cloud.rs

//! Cloud upload boundary.
//!
//! Uploads are opaque blocking calls: hand over a local image, get back the
//! id the cloud assigned to it. [`OpenStackCliClient`] implements this by
//! shelling out to the `openstack` client.

use std::fmt::Debug;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};
use uuid::Uuid;

use crate::process::liveness::is_echild;

/// Anything that can push an image file into a named cloud.
pub trait CloudClient: Send + Sync + Debug {
    /// Upload `source` as image `name` into the cloud profile `cloud` and
    /// return the remote object id.
    fn upload_image(&self, cloud: &str, name: &str, source: &Path, disk_format: &str)
    -> Result<String>;
}

/// Uses the `openstack` CLI and its `clouds.yaml` profiles.
///
/// `program` is split on whitespace like `build_tool`, so a wrapper such as
/// `sudo -u glance openstack` works.
#[derive(Debug, Clone)]
pub struct OpenStackCliClient {
    program: String,
}

impl OpenStackCliClient {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn command_line(&self, cloud: &str, name: &str, source: &Path, disk_format: &str) -> Vec<String> {
        let mut argv: Vec<String> = self.program.split_whitespace().map(str::to_string).collect();
        argv.extend([
            "--os-cloud".to_string(),
            cloud.to_string(),
            "image".to_string(),
            "create".to_string(),
            "--disk-format".to_string(),
            disk_format.to_string(),
            "--container-format".to_string(),
            "bare".to_string(),
            "--file".to_string(),
            source.to_string_lossy().into_owned(),
            "-f".to_string(),
            "value".to_string(),
            "-c".to_string(),
            "id".to_string(),
            name.to_string(),
        ]);
        argv
    }
}

impl CloudClient for OpenStackCliClient {
    fn upload_image(
        &self,
        cloud: &str,
        name: &str,
        source: &Path,
        disk_format: &str,
    ) -> Result<String> {
        let argv = self.command_line(cloud, name, source, disk_format);
        if self.program.split_whitespace().next().is_none() {
            bail!("upload_tool must not be empty");
        }
        info!(cloud, name, source = ?source, "uploading image");

        let mut child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("spawning {}", self.program))?;

        let mut stdout = String::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_string(&mut stdout)
                .context("reading image id from upload client")?;
        }

        // The reaper may have collected the status already. The printed id
        // then has to stand on its own, so it must parse as an image UUID.
        match child.wait() {
            Ok(status) if !status.success() => bail!("{} exited with {status}", self.program),
            Ok(_) => {}
            Err(e) if is_echild(&e) => debug!("upload client status already reaped"),
            Err(e) => return Err(e).context("waiting for upload client"),
        }

        parse_image_id(&stdout).with_context(|| format!("output of {}", self.program))
    }
}

/// The image id printed by `-f value -c id`: one UUID on one line.
fn parse_image_id(stdout: &str) -> Result<String> {
    let id = stdout.trim();
    if id.is_empty() {
        bail!("no image id printed");
    }
    let uuid = Uuid::parse_str(id).with_context(|| format!("'{id}' is not an image id"))?;
    Ok(uuid.hyphenated().to_string())
}
