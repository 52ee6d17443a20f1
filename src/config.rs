//! Configuration management for nbtools
//!
//! Centralizes configuration options and provides validation.

use crate::{
    cli::{Args, Command},
    core::{controller::ControllerKind, mirror},
    error::ToolError,
    utils::env::{self, EnvUtils},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Enable debug logging
    pub debug: bool,
    /// Locations of the external tools
    pub tools: ToolsConfig,
    /// Settings for `controller-version`
    pub controller: Option<ControllerConfig>,
    /// Settings for `mirror-repo`
    pub mirror: Option<MirrorConfig>,
}

/// External tool binaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Cluster client
    pub kubectl: String,
    /// Container engine; detected from PATH when unset
    pub container_engine: Option<String>,
    /// Go toolchain used to read embedded build info
    pub go: String,
    /// Version-control client
    pub git: String,
}

/// Controller inspection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Controller to inspect
    pub kind: ControllerKind,
    /// Namespace holding the controller pod
    pub namespace: String,
    /// Binary path inside the controller image
    pub binary_path: PathBuf,
    /// Emit JSON instead of text
    pub json: bool,
    /// Dependency path filter
    pub dependency_filter: Option<String>,
}

/// Repository mirroring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Repository to clone
    pub source_repo: String,
    /// Repository receiving the pushed branches
    pub target_repo: String,
    /// Branches to push, deduplicated and in request order
    pub branches: Vec<String>,
    /// Restrict fetching to the selected branches
    pub shallow: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            kubectl: "kubectl".to_string(),
            container_engine: None,
            go: "go".to_string(),
            git: "git".to_string(),
        }
    }
}

impl ToolsConfig {
    /// Read tool overrides from the environment
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            kubectl: EnvUtils::get_var_or_default(env::KUBECTL_VAR, &defaults.kubectl),
            container_engine: EnvUtils::get_non_empty(env::CONTAINER_ENGINE_VAR),
            go: EnvUtils::get_var_or_default(env::GO_VAR, &defaults.go),
            git: EnvUtils::get_var_or_default(env::GIT_VAR, &defaults.git),
        }
    }
}

impl Config {
    /// Create configuration from command line arguments
    pub fn from_args(args: &Args) -> Result<Self, ToolError> {
        let mut config = Self {
            debug: args.debug,
            tools: ToolsConfig::from_env(),
            ..Self::default()
        };

        match &args.command {
            Command::ControllerVersion {
                controller,
                namespace,
                binary_path,
                json,
                filter,
            } => {
                config.controller = Some(ControllerConfig {
                    kind: *controller,
                    namespace: namespace.trim().to_string(),
                    binary_path: binary_path
                        .clone()
                        .unwrap_or_else(|| PathBuf::from(controller.default_binary_path())),
                    json: *json,
                    dependency_filter: filter.clone().filter(|f| !f.is_empty()),
                });
            }
            Command::MirrorRepo {
                target_repo,
                source_repo,
                branches,
                shallow,
            } => {
                config.mirror = Some(MirrorConfig {
                    source_repo: mirror::resolve_repo_location(source_repo.trim())?,
                    target_repo: mirror::resolve_repo_location(target_repo.trim())?,
                    branches: mirror::normalize_branches(branches),
                    shallow: *shallow,
                });
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ToolError> {
        if let Some(controller) = &self.controller {
            if controller.namespace.is_empty()
                || controller.namespace.contains(char::is_whitespace)
            {
                return Err(ToolError::validation(format!(
                    "Invalid namespace: '{}'",
                    controller.namespace
                )));
            }

            if !controller.binary_path.is_absolute() {
                return Err(ToolError::validation(format!(
                    "Binary path must be absolute inside the image: {}",
                    controller.binary_path.display()
                )));
            }
        }

        if let Some(settings) = &self.mirror {
            if settings.target_repo.is_empty() {
                return Err(ToolError::validation("--target-repo must not be empty"));
            }

            if settings.source_repo.is_empty() {
                return Err(ToolError::validation("--source-repo must not be empty"));
            }

            if settings.source_repo == settings.target_repo {
                return Err(ToolError::validation(
                    "Source and target repository must differ",
                ));
            }

            if settings.branches.is_empty() {
                return Err(ToolError::validation("No branches selected for pushing"));
            }

            for branch in &settings.branches {
                mirror::validate_branch_name(branch)?;
            }
        }

        if self.controller.is_none() && self.mirror.is_none() {
            return Err(ToolError::config("No command configuration present"));
        }

        Ok(())
    }

    /// Controller settings, required by `controller-version`
    pub fn controller(&self) -> Result<&ControllerConfig, ToolError> {
        self.controller
            .as_ref()
            .ok_or_else(|| ToolError::config("controller-version settings missing"))
    }

    /// Mirroring settings, required by `mirror-repo`
    pub fn mirror(&self) -> Result<&MirrorConfig, ToolError> {
        self.mirror
            .as_ref()
            .ok_or_else(|| ToolError::config("mirror-repo settings missing"))
    }
}
