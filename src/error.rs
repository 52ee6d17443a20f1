//! Error types for nbtools
//!
//! Provides structured error handling with context and proper error chains.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the maintainer tooling
#[derive(Error, Debug)]
pub enum ToolError {
    /// A required external tool or input is missing
    #[error("Missing prerequisite: {message}")]
    Prerequisite { message: String },

    /// Cluster lookups that found nothing usable
    #[error("Cluster lookup failed: {message}")]
    Lookup {
        message: String,
        namespace: String,
    },

    /// Failures while pulling a binary out of a container image
    #[error("Image extraction failed for {image}: {message}")]
    Extraction {
        message: String,
        image: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Build metadata could not be read or parsed
    #[error("Build info error: {message}")]
    BuildInfo { message: String, path: PathBuf },

    /// Source or target repository problems
    #[error("Repository error ({repo}): {message}")]
    Repository { message: String, repo: String },

    /// File system operation errors
    #[error("File system error: {operation} failed on {path}")]
    FileSystem {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Process execution errors
    #[error("Process error: {command} failed{}", format_exit_code(.exit_code))]
    Process {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },
}

fn format_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {code}"),
        None => String::new(),
    }
}

impl ToolError {
    /// Create a new prerequisite error
    pub fn prerequisite(message: impl Into<String>) -> Self {
        Self::Prerequisite {
            message: message.into(),
        }
    }

    /// Create a new cluster lookup error
    pub fn lookup(message: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self::Lookup {
            message: message.into(),
            namespace: namespace.into(),
        }
    }

    /// Create a new image extraction error
    pub fn extraction(message: impl Into<String>, image: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
            image: image.into(),
            source: None,
        }
    }

    /// Attach an underlying cause to an extraction error
    pub fn extraction_with_source(
        message: impl Into<String>,
        image: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Extraction {
            message: message.into(),
            image: image.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new build info error
    pub fn build_info<P: Into<PathBuf>>(message: impl Into<String>, path: P) -> Self {
        Self::BuildInfo {
            message: message.into(),
            path: path.into(),
        }
    }

    /// Create a new repository error
    pub fn repository(message: impl Into<String>, repo: impl Into<String>) -> Self {
        Self::Repository {
            message: message.into(),
            repo: repo.into(),
        }
    }

    /// Create a new file system error
    pub fn file_system<P: Into<PathBuf>>(
        operation: impl Into<String>,
        path: P,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Create a new process error
    pub fn process(
        command: impl Into<String>,
        exit_code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::Process {
            command: command.into(),
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Captured stderr of a failed process, empty for other variants
    pub fn stderr(&self) -> &str {
        match self {
            Self::Process { stderr, .. } => stderr,
            _ => "",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ToolError>;
