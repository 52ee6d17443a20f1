//! Process execution utilities
//!
//! Every external tool (kubectl, the container engine, go, git) is driven
//! through [`ProcessRunner`], which logs the command line and turns
//! non-zero exits into [`ToolError::Process`].

use crate::error::{Result, ToolError};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info, instrument};

/// Utility for running external processes
#[derive(Debug, Clone, Copy)]
pub struct ProcessRunner {
    debug: bool,
}

/// Result of a process execution
#[derive(Debug)]
pub struct ProcessResult {
    /// Exit status code
    pub exit_code: Option<i32>,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl ProcessResult {
    /// Standard output with surrounding whitespace removed
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

impl ProcessRunner {
    /// Create a new process runner
    #[must_use]
    pub const fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// Run a command and capture its output
    #[instrument(skip(self))]
    pub fn run_command_with_output(&self, command: &str, args: &[&str]) -> Result<ProcessResult> {
        self.run_command_with_output_and_env(command, args, &[])
    }

    /// Run a command with environment variables and capture output
    #[instrument(skip(self, env_vars))]
    pub fn run_command_with_output_and_env(
        &self,
        command: &str,
        args: &[&str],
        env_vars: &[(&str, &str)],
    ) -> Result<ProcessResult> {
        let cmd_str = Self::format_command(command, args);
        self.announce(&cmd_str, env_vars);

        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .envs(env_vars.iter().copied());

        let output = cmd.output().map_err(|e| {
            ToolError::process(
                cmd_str.clone(),
                None,
                String::new(),
                format!("Failed to execute command: {e}"),
            )
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code();

        debug!(
            "Command finished: success={}, exit_code={:?}, stdout_len={}, stderr_len={}",
            output.status.success(),
            exit_code,
            stdout.len(),
            stderr.len()
        );

        if !output.status.success() {
            debug!("Command stderr: {}", stderr.trim_end());
            return Err(ToolError::process(cmd_str, exit_code, stdout, stderr));
        }

        Ok(ProcessResult {
            exit_code,
            stdout,
            stderr,
        })
    }

    /// Check if a command exists, either as a path or on PATH
    #[instrument(skip(self))]
    pub fn command_exists(&self, command: &str) -> bool {
        let exists = Self::resolve(command).is_some();
        debug!("Command '{}' exists: {}", command, exists);
        exists
    }

    /// Resolve a command to an executable path
    pub fn resolve(command: &str) -> Option<PathBuf> {
        which::which(command).ok()
    }

    fn announce(&self, cmd_str: &str, env_vars: &[(&str, &str)]) {
        if self.debug {
            debug!("Running command: {}", cmd_str);
            if !env_vars.is_empty() {
                debug!("Environment variables: {:?}", env_vars);
            }
        } else {
            info!("+ {}", cmd_str);
        }
    }

    fn format_command(command: &str, args: &[&str]) -> String {
        if args.is_empty() {
            command.to_string()
        } else {
            format!("{} {}", command, args.join(" "))
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_runner_creation() {
        let runner = ProcessRunner::new(true);
        assert!(runner.debug);

        let runner = ProcessRunner::default();
        assert!(!runner.debug);
    }

    #[test]
    fn test_run_command_with_output() {
        let runner = ProcessRunner::new(false);
        let result = runner
            .run_command_with_output("echo", &["hello", "world"])
            .unwrap();

        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stdout_trimmed(), "hello world");
        assert!(result.stderr.is_empty());
    }

    #[test]
    fn test_command_exists() {
        let runner = ProcessRunner::new(false);
        assert!(runner.command_exists("sh"));
        assert!(!runner.command_exists("nonexistent_command_12345"));
    }

    #[test]
    fn test_run_failing_command() {
        let runner = ProcessRunner::new(false);
        let result = runner.run_command_with_output("false", &[]);

        match result {
            Err(ToolError::Process {
                command, exit_code, ..
            }) => {
                assert_eq!(command, "false");
                assert_eq!(exit_code, Some(1));
            }
            other => panic!("Expected process error, got {other:?}"),
        }
    }

    #[test]
    fn test_failing_command_keeps_stderr() {
        let runner = ProcessRunner::new(false);
        let err = runner
            .run_command_with_output("sh", &["-c", "echo boom >&2; exit 3"])
            .unwrap_err();

        assert_eq!(err.stderr().trim(), "boom");
        assert!(matches!(err, ToolError::Process { exit_code: Some(3), .. }));
    }

    #[test]
    fn test_missing_binary_is_process_error() {
        let runner = ProcessRunner::new(false);
        let err = runner
            .run_command_with_output("nonexistent_command_12345", &[])
            .unwrap_err();
        assert!(err.stderr().starts_with("Failed to execute command"));
    }

    #[test]
    fn test_run_command_with_env() {
        let runner = ProcessRunner::new(false);
        let result = runner
            .run_command_with_output_and_env(
                "sh",
                &["-c", "echo $TEST_VAR"],
                &[("TEST_VAR", "test_value")],
            )
            .unwrap();

        assert_eq!(result.stdout_trimmed(), "test_value");
    }
}
