// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{Dib2CloudError, Result};

/// Raw configuration as read from a TOML file, before validation.
///
/// ```toml
/// build_processfile_dir = "/var/lib/dib2cloud/run/builds"
/// images_dir = "/var/lib/dib2cloud/images"
///
/// [[diskimages]]
/// name = "ubuntu-minimal"
/// elements = ["ubuntu-minimal", "simple-init"]
/// release = "noble"
///
/// [[providers]]
/// name = "test_provider"
/// cloud = "dib2cloud_test"
/// ```
///
/// Every key is optional; directories default to locations under
/// `~/.dib2cloud/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawConfig {
    /// Where build job records live.
    #[serde(default = "default_build_processfile_dir")]
    pub build_processfile_dir: PathBuf,

    /// Where upload job records live.
    #[serde(default = "default_upload_processfile_dir")]
    pub upload_processfile_dir: PathBuf,

    /// Root for per-image build logs.
    #[serde(default = "default_buildlog_dir")]
    pub buildlog_dir: PathBuf,

    /// Root for per-image output files.
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,

    /// The image-creation binary.
    #[serde(default = "default_build_tool")]
    pub build_tool: String,

    /// Command line of [`crate::cloud::OpenStackCliClient`] (first word is
    /// the binary).
    #[serde(default = "default_upload_tool")]
    pub upload_tool: String,

    #[serde(default)]
    pub diskimages: Vec<Diskimage>,

    #[serde(default)]
    pub providers: Vec<Provider>,
}

fn dib2cloud_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dib2cloud")
}

fn default_build_processfile_dir() -> PathBuf {
    dib2cloud_home().join("run").join("builds")
}

fn default_upload_processfile_dir() -> PathBuf {
    dib2cloud_home().join("run").join("uploads")
}

fn default_buildlog_dir() -> PathBuf {
    dib2cloud_home().join("logs").join("builds")
}

fn default_images_dir() -> PathBuf {
    dib2cloud_home().join("images")
}

fn default_build_tool() -> String {
    "disk-image-create".to_string()
}

fn default_upload_tool() -> String {
    "openstack".to_string()
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            build_processfile_dir: default_build_processfile_dir(),
            upload_processfile_dir: default_upload_processfile_dir(),
            buildlog_dir: default_buildlog_dir(),
            images_dir: default_images_dir(),
            build_tool: default_build_tool(),
            upload_tool: default_upload_tool(),
            diskimages: Vec::new(),
            providers: Vec::new(),
        }
    }
}

/// `[[diskimages]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diskimage {
    pub name: String,

    /// diskimage-builder elements, passed in order after the flags.
    pub elements: Vec<String>,

    /// Exported to the build as `DIB_RELEASE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,

    /// Extra environment for the build process.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env_vars: BTreeMap<String, String>,

    /// Output formats requested with `-t`.
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
}

fn default_formats() -> Vec<String> {
    vec!["qcow2".to_string()]
}

/// `[[providers]]` entry: a named upload target backed by a cloud profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    pub cloud: String,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfig>` (see `validate.rs`), so
/// name lookups can assume uniqueness.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub build_processfile_dir: PathBuf,
    pub upload_processfile_dir: PathBuf,
    pub buildlog_dir: PathBuf,
    pub images_dir: PathBuf,
    pub build_tool: String,
    pub upload_tool: String,
    diskimages: Vec<Diskimage>,
    providers: Vec<Provider>,
}

impl Config {
    pub(crate) fn new_unchecked(raw: RawConfig) -> Self {
        Self {
            build_processfile_dir: raw.build_processfile_dir,
            upload_processfile_dir: raw.upload_processfile_dir,
            buildlog_dir: raw.buildlog_dir,
            images_dir: raw.images_dir,
            build_tool: raw.build_tool,
            upload_tool: raw.upload_tool,
            diskimages: raw.diskimages,
            providers: raw.providers,
        }
    }

    pub fn diskimages(&self) -> &[Diskimage] {
        &self.diskimages
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn diskimage(&self, name: &str) -> Result<&Diskimage> {
        self.diskimages
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| Dib2CloudError::UnknownDiskimage(name.to_string()))
    }

    pub fn provider(&self, name: &str) -> Result<&Provider> {
        self.providers
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Dib2CloudError::UnknownProvider(name.to_string()))
    }
}
