#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dib2cloud::config::{Config, Diskimage, Provider, RawConfig};
use tempfile::TempDir;

/// A validated config whose directory roots live in a private temp dir.
///
/// The roots are *not* created up front; the code under test has to cope
/// with missing directories.
pub struct TestConfig {
    pub config: Config,
    pub dir: TempDir,
}

impl TestConfig {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

/// Builder for `Config` to simplify test setup.
pub struct ConfigBuilder {
    config: RawConfig,
    dir: TempDir,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("creating temp dir for config roots");
        let root = dir.path().to_path_buf();
        Self {
            config: RawConfig {
                build_processfile_dir: root.join("run").join("builds"),
                upload_processfile_dir: root.join("run").join("uploads"),
                buildlog_dir: root.join("logs").join("builds"),
                images_dir: root.join("images"),
                ..RawConfig::default()
            },
            dir,
        }
    }

    pub fn with_diskimage(mut self, image: Diskimage) -> Self {
        self.config.diskimages.push(image);
        self
    }

    pub fn with_provider(mut self, name: &str, cloud: &str) -> Self {
        self.config.providers.push(Provider {
            name: name.to_string(),
            cloud: cloud.to_string(),
        });
        self
    }

    pub fn build_tool(mut self, command: &str) -> Self {
        self.config.build_tool = command.to_string();
        self
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn build(self) -> TestConfig {
        let config =
            Config::try_from(self.config).expect("Failed to build valid config from builder");
        TestConfig {
            config,
            dir: self.dir,
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `Diskimage`.
pub struct DiskimageBuilder {
    image: Diskimage,
}

impl DiskimageBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            image: Diskimage {
                name: name.to_string(),
                elements: vec![],
                release: None,
                env_vars: BTreeMap::new(),
                formats: vec!["qcow2".to_string()],
            },
        }
    }

    pub fn element(mut self, element: &str) -> Self {
        self.image.elements.push(element.to_string());
        self
    }

    pub fn formats(mut self, formats: &[&str]) -> Self {
        self.image.formats = formats.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn release(mut self, release: &str) -> Self {
        self.image.release = Some(release.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.image.env_vars.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> Diskimage {
        self.image
    }
}
