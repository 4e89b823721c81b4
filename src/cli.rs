// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `dib2cloud`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dib2cloud",
    version,
    about = "Build disk images with diskimage-builder and upload them to clouds.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// A missing file is treated as an empty config with default directories.
    #[arg(long = "config", value_name = "PATH", default_value = "/etc/dib2cloud.toml")]
    pub config_path: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DIB2CLOUD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Start building the named diskimage.
    Build {
        image_name: String,

        /// Wait for the build to finish before printing the summary.
        #[arg(long)]
        wait: bool,
    },

    /// List every build known on this host.
    ListBuilds,

    /// Delete a finished build and its image files.
    DeleteBuild { build_id: String },

    /// Upload the output of a build to the cloud of a provider.
    Upload {
        build_id: String,
        provider_name: String,

        /// Run the upload on the calling thread instead of a worker.
        #[arg(long)]
        blocking: bool,
    },

    /// List every upload known on this host.
    ListUploads,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_upload_subcommand() {
        let args = CliArgs::try_parse_from([
            "dib2cloud",
            "--config",
            "some_config",
            "upload",
            "abc",
            "test_provider",
        ])
        .unwrap();

        assert_eq!(args.config_path, "some_config");
        match args.command {
            Command::Upload {
                build_id,
                provider_name,
                blocking,
            } => {
                assert_eq!(build_id, "abc");
                assert_eq!(provider_name, "test_provider");
                assert!(!blocking);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn config_path_has_default() {
        let args = CliArgs::try_parse_from(["dib2cloud", "list-builds"]).unwrap();
        assert_eq!(args.config_path, "/etc/dib2cloud.toml");
        assert!(matches!(args.command, Command::ListBuilds));
    }
}
