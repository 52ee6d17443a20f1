//! Environment variable handling
//!
//! External tool locations can be overridden through the environment so the
//! same binary works against `oc` instead of `kubectl`, a pinned `go`, or
//! test doubles.

use std::env;

/// Override for the cluster client binary
pub const KUBECTL_VAR: &str = "NBTOOLS_KUBECTL";
/// Override for the container engine binary
pub const CONTAINER_ENGINE_VAR: &str = "NBTOOLS_CONTAINER_ENGINE";
/// Override for the Go toolchain binary
pub const GO_VAR: &str = "NBTOOLS_GO";
/// Override for the git binary
pub const GIT_VAR: &str = "NBTOOLS_GIT";

/// Environment variable utilities
#[derive(Debug)]
pub struct EnvUtils;

impl EnvUtils {
    /// Get an environment variable with a default value
    pub fn get_var_or_default(key: &str, default: &str) -> String {
        Self::get_non_empty(key).unwrap_or_else(|| default.to_string())
    }

    /// Get an environment variable, treating empty values as unset
    pub fn get_non_empty(key: &str) -> Option<String> {
        env::var(key)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}
