// src/lib.rs

pub mod app;
pub mod cli;
pub mod cloud;
pub mod config;
pub mod errors;
pub mod logging;
pub mod process;
pub mod record;
pub mod report;
pub mod tracker;

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::app::App;
use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::process::Reaper;
use crate::record::JobId;
use crate::report::{build_record_summary, build_summary, upload_summary};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the child reaper
/// - the app and the requested subcommand
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config_path)
        .with_context(|| format!("loading config {}", args.config_path))?;

    Reaper::install()?;

    let app = App::new(cfg);
    let stdout = std::io::stdout();
    execute(&app, args.command, &mut stdout.lock()).await
}

/// Run one subcommand against `app`, writing its JSON summary to `out`.
pub async fn execute(app: &App, command: Command, out: &mut impl Write) -> Result<()> {
    debug!(?command, "executing command");

    match command {
        Command::Build { image_name, wait } => {
            let mut build = app.build(&image_name, false).await?;
            if wait {
                build.wait(None).await?;
            }
            emit(out, &build_summary(&build))
        }

        Command::ListBuilds => {
            let builds = app.get_builds()?;
            let summaries: Vec<_> = builds.iter().filter_map(build_summary).collect();
            emit(out, &summaries)
        }

        Command::DeleteBuild { build_id } => {
            let id: JobId = build_id.parse()?;
            let deleted = app.delete_build(&id)?;
            emit(out, &build_record_summary(&deleted, "deleted"))
        }

        Command::Upload {
            build_id,
            provider_name,
            blocking,
        } => {
            let id: JobId = build_id.parse()?;
            let mut upload = app.upload(&id, &provider_name, blocking).await?;
            // The worker lives in this process; exiting now would cut it short.
            upload.wait(None).await?;
            emit(out, &upload_summary(&upload))
        }

        Command::ListUploads => {
            let uploads = app.get_uploads()?;
            let summaries: Vec<_> = uploads.iter().filter_map(upload_summary).collect();
            emit(out, &summaries)
        }
    }
}

fn emit<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value).context("encoding summary")?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
