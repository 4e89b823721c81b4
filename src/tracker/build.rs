// src/tracker/build.rs

//! Build job kind: an external `disk-image-create` run.
//!
//! Every path a build touches is derived from `(directory roots, name, id,
//! formats)`, so any process that loads the record computes the same paths:
//!
//! - log:     `<log_dir>/<name>/<id>.log`
//! - dest:    `<images_dir>/<name>/<id>`
//! - outputs: `<dest>.<format>` for each requested format

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::Diskimage;
use crate::errors::{Dib2CloudError, Result};
use crate::process::CommandLaunch;
use crate::record::JobId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildJob {
    pub name: String,
    pub elements: Vec<String>,
    pub output_formats: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,

    pub log_dir: PathBuf,
    pub images_dir: PathBuf,

    // Kept last: it serializes as a sub-table.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env_vars: BTreeMap<String, String>,
}

impl BuildJob {
    pub fn from_diskimage(
        image: &Diskimage,
        log_dir: impl Into<PathBuf>,
        images_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: image.name.clone(),
            elements: image.elements.clone(),
            output_formats: image.formats.clone(),
            release: image.release.clone(),
            env_vars: image.env_vars.clone(),
            log_dir: log_dir.into(),
            images_dir: images_dir.into(),
        }
    }

    pub fn log_path(&self, id: &JobId) -> PathBuf {
        self.log_dir.join(&self.name).join(format!("{id}.log"))
    }

    /// Destination passed to `-o`; the tool appends `.<format>`.
    pub fn dest_path(&self, id: &JobId) -> PathBuf {
        self.images_dir.join(&self.name).join(id.as_str())
    }

    pub fn output_path_for(&self, id: &JobId, format: &str) -> PathBuf {
        let mut path = self.dest_path(id).into_os_string();
        path.push(".");
        path.push(format);
        PathBuf::from(path)
    }

    /// One declared output per requested format.
    pub fn dest_paths(&self, id: &JobId) -> Vec<PathBuf> {
        self.output_formats
            .iter()
            .map(|format| self.output_path_for(id, format))
            .collect()
    }

    pub fn outputs_exist(&self, id: &JobId) -> bool {
        self.dest_paths(id).iter().all(|p| p.exists())
    }

    pub fn produces(&self, format: &str) -> bool {
        self.output_formats.iter().any(|f| f == format)
    }

    /// `<tool> -t <formats> -o <dest> <elements…>`.
    ///
    /// `build_tool` may carry leading words (e.g. `sudo disk-image-create`).
    pub fn command(&self, id: &JobId, build_tool: &str) -> Vec<String> {
        let mut argv: Vec<String> = build_tool.split_whitespace().map(str::to_string).collect();
        argv.push("-t".to_string());
        argv.push(self.output_formats.join(","));
        argv.push("-o".to_string());
        argv.push(self.dest_path(id).to_string_lossy().into_owned());
        argv.extend(self.elements.iter().cloned());
        argv
    }

    /// Launch plan for this build. Creates the per-name output directory.
    pub(crate) fn launch(&self, id: &JobId, build_tool: &str) -> Result<CommandLaunch> {
        if build_tool.split_whitespace().next().is_none() {
            return Err(Dib2CloudError::ConfigError(
                "build_tool must not be empty".to_string(),
            ));
        }

        let dest = self.dest_path(id);
        if let Some(dir) = dest.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut launch = CommandLaunch::new(self.command(id, build_tool), self.log_path(id));
        if let Some(release) = &self.release {
            launch = launch.env("DIB_RELEASE", release);
        }
        for (key, value) in self.env_vars.iter() {
            launch = launch.env(key, value);
        }
        Ok(launch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> BuildJob {
        BuildJob {
            name: "test-image".to_string(),
            elements: vec!["e1".to_string(), "e2".to_string()],
            output_formats: vec!["qcow2".to_string()],
            release: None,
            env_vars: BTreeMap::new(),
            log_dir: PathBuf::from("/logs"),
            images_dir: PathBuf::from("/images"),
        }
    }

    #[test]
    fn command_matches_disk_image_create_usage() {
        let id: JobId = "abc".parse().unwrap();
        assert_eq!(
            job().command(&id, "disk-image-create"),
            vec![
                "disk-image-create",
                "-t",
                "qcow2",
                "-o",
                "/images/test-image/abc",
                "e1",
                "e2"
            ]
        );
    }

    #[test]
    fn formats_are_comma_joined_and_tool_words_kept() {
        let id: JobId = "abc".parse().unwrap();
        let mut j = job();
        j.output_formats = vec!["qcow2".to_string(), "raw".to_string()];
        let argv = j.command(&id, "sudo disk-image-create");
        assert_eq!(&argv[..4], ["sudo", "disk-image-create", "-t", "qcow2,raw"]);
    }

    #[test]
    fn paths_are_a_function_of_roots_name_and_id() {
        let id: JobId = "abc".parse().unwrap();
        let j = job();
        assert_eq!(j.log_path(&id), PathBuf::from("/logs/test-image/abc.log"));
        assert_eq!(
            j.dest_paths(&id),
            vec![PathBuf::from("/images/test-image/abc.qcow2")]
        );
        assert_eq!(j.dest_paths(&id), j.clone().dest_paths(&id));
    }
}
