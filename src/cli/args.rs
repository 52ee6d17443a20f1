//! Command-line argument parsing and validation

use crate::core::controller::ControllerKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Upstream repository mirrored when `--source-repo` is not given
pub const DEFAULT_SOURCE_REPO: &str = "https://github.com/kubeflow/notebooks.git";
/// Branches mirrored when `--branches` is not given
pub const DEFAULT_BRANCHES: &str = "notebooks-v2";
/// Namespace searched for controller pods
pub const DEFAULT_NAMESPACE: &str = "kubeflow";

/// Maintainer tooling for the Kubernetes notebooks project
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "nbtools")]
pub struct Args {
    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report build version and dependency metadata of a running controller
    ControllerVersion {
        /// Controller whose pod should be inspected
        #[arg(value_enum)]
        controller: ControllerKind,

        /// Namespace the controller runs in
        #[arg(default_value = DEFAULT_NAMESPACE)]
        namespace: String,

        /// Path of the controller binary inside the image
        binary_path: Option<PathBuf>,

        /// Print the build metadata as JSON
        #[arg(long)]
        json: bool,

        /// Only list dependencies whose module path contains this string
        #[arg(long, value_name = "SUBSTR")]
        filter: Option<String>,
    },

    /// Push selected branches of a repository to a new, detached repository
    MirrorRepo {
        /// Repository that receives the branches
        #[arg(long, value_name = "URL")]
        target_repo: String,

        /// Repository to clone from
        #[arg(long, value_name = "URL", default_value = DEFAULT_SOURCE_REPO)]
        source_repo: String,

        /// Comma-separated list of branches to push
        #[arg(long, value_name = "LIST", value_delimiter = ',', default_value = DEFAULT_BRANCHES)]
        branches: Vec<String>,

        /// Fetch only the selected branches instead of every ref
        #[arg(long)]
        shallow: bool,
    },
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    Args::parse()
}
