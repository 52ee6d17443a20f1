//! Command implementations for the CLI

use crate::{
    cli::Command,
    config::Config,
    core::{inspect::ControllerInspector, mirror::RepositoryMirror},
};
use anyhow::Context;
use tracing::{info, instrument};

/// Execute the appropriate command based on CLI arguments
#[instrument(skip(config))]
pub fn execute_command(config: &Config, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::ControllerVersion { .. } => execute_controller_version_command(config),
        Command::MirrorRepo { .. } => execute_mirror_repo_command(config),
    }
}

/// Execute the controller-version command
#[instrument(skip(config))]
fn execute_controller_version_command(config: &Config) -> anyhow::Result<()> {
    let settings = config.controller()?;
    info!("Inspecting {} in namespace {}", settings.kind, settings.namespace);

    let inspector = ControllerInspector::new(config)?;
    let report = inspector
        .inspect()
        .with_context(|| format!("Failed to inspect {}", settings.kind))?;

    let filter = settings.dependency_filter.as_deref();
    if settings.json {
        println!("{}", report.render_json(filter)?);
    } else {
        print!("{}", report.render_text(filter));
    }

    Ok(())
}

/// Execute the mirror-repo command
#[instrument(skip(config))]
fn execute_mirror_repo_command(config: &Config) -> anyhow::Result<()> {
    let settings = config.mirror()?;
    info!(
        "Mirroring {} of {} to {}",
        settings.branches.join(", "),
        settings.source_repo,
        settings.target_repo
    );

    let mirror = RepositoryMirror::new(config)?;
    let summary = mirror
        .run()
        .with_context(|| format!("Failed to mirror into {}", settings.target_repo))?;

    println!("{summary}");
    Ok(())
}
