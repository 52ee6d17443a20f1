//! # nbtools
//!
//! Maintainer tooling for the Kubernetes notebooks project.
//!
//! Two workflows are provided, both driving external CLIs:
//!
//! - `controller-version`: find a running controller pod, copy its binary out
//!   of the pod's image with podman or docker, and report the Go build
//!   metadata embedded in it.
//! - `mirror-repo`: clone an upstream repository and push selected branches
//!   to a detached target repository, force-pushing when the target rejects
//!   a normal push.
//!
//! ## Example
//!
//! ```no_run
//! use nbtools::core::BuildInfoParser;
//! use std::path::Path;
//!
//! let parser = BuildInfoParser::new()?;
//! let info = parser.parse("manager: go1.22.5\n", Path::new("manager"))?;
//! println!("Built with {}", info.go_version);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod utils;

use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging with appropriate verbosity
///
/// `RUST_LOG` takes precedence over the `--debug` flag. Logs go to stderr;
/// stdout carries only command output.
pub fn setup_logging(debug: bool) -> Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
