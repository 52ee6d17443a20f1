//! Binary extraction from container images
//!
//! A stopped container is created from the image so files can be copied out
//! of its filesystem without running anything. The container is removed when
//! its guard goes out of scope, including on error paths.

use crate::{
    error::{Result, ToolError},
    utils::process::ProcessRunner,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Engines probed, in order, when none is configured
pub const ENGINE_CANDIDATES: [&str; 2] = ["podman", "docker"];

/// A container engine CLI (podman or docker)
#[derive(Debug)]
pub struct ContainerEngine {
    program: String,
    runner: ProcessRunner,
}

impl ContainerEngine {
    /// Use an explicit engine binary
    pub fn new(program: impl Into<String>, runner: ProcessRunner) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    /// Use the configured engine, else the first candidate found on PATH
    pub fn resolve(configured: Option<&str>, runner: ProcessRunner) -> Result<Self> {
        if let Some(program) = configured {
            if !runner.command_exists(program) {
                return Err(ToolError::prerequisite(format!(
                    "container engine '{program}' not found"
                )));
            }
            return Ok(Self::new(program, runner));
        }

        ENGINE_CANDIDATES
            .iter()
            .find(|candidate| runner.command_exists(candidate))
            .map(|candidate| {
                debug!("Using container engine: {}", candidate);
                Self::new(*candidate, runner)
            })
            .ok_or_else(|| {
                ToolError::prerequisite(format!(
                    "no container engine found (tried {})",
                    ENGINE_CANDIDATES.join(", ")
                ))
            })
    }

    /// Engine binary in use
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Create a stopped container from `image`, pulling it if needed
    #[instrument(skip(self))]
    pub fn create_container(&self, image: &str) -> Result<TempContainer<'_>> {
        let output = self
            .runner
            .run_command_with_output(&self.program, &["create", image])
            .map_err(|e| {
                let reason = e.stderr().trim().to_string();
                ToolError::extraction_with_source(
                    format!("could not create container: {reason}"),
                    image,
                    e,
                )
            })?;

        let id = parse_container_id(&output.stdout).ok_or_else(|| {
            ToolError::extraction(format!("{} create printed no container id", self.program), image)
        })?;

        debug!("Created temporary container {}", id);
        Ok(TempContainer {
            engine: self,
            id,
            image: image.to_string(),
            removed: false,
        })
    }

    /// Copy `binary_path` out of `image` into `dest_dir`
    #[instrument(skip(self))]
    pub fn extract_binary(
        &self,
        image: &str,
        binary_path: &Path,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let file_name = binary_path.file_name().ok_or_else(|| {
            ToolError::extraction(
                format!("binary path {} has no file name", binary_path.display()),
                image,
            )
        })?;
        let destination = dest_dir.join(file_name);

        let mut container = self.create_container(image)?;
        container.copy_out(binary_path, &destination)?;

        if let Err(e) = container.remove() {
            warn!("Could not remove container {}: {}", container.id(), e);
        }

        info!("Extracted {} to {}", binary_path.display(), destination.display());
        Ok(destination)
    }
}

/// A container that is force-removed when dropped
#[derive(Debug)]
pub struct TempContainer<'a> {
    engine: &'a ContainerEngine,
    id: String,
    image: String,
    removed: bool,
}

impl TempContainer<'_> {
    /// Container id reported by the engine
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Copy a file out of the container filesystem
    #[instrument(skip(self))]
    pub fn copy_out(&self, source: &Path, destination: &Path) -> Result<()> {
        let from = format!("{}:{}", self.id, source.display());
        let to = destination.to_string_lossy();

        self.engine
            .runner
            .run_command_with_output(&self.engine.program, &["cp", &from, &to])
            .map_err(|e| {
                let reason = e.stderr().trim().to_string();
                ToolError::extraction_with_source(
                    format!("could not copy {} out of the image: {reason}", source.display()),
                    self.image.as_str(),
                    e,
                )
            })?;

        if !destination.is_file() {
            return Err(ToolError::extraction(
                format!("{} is not a regular file in the image", source.display()),
                self.image.as_str(),
            ));
        }

        Ok(())
    }

    /// Remove the container now; later calls and the drop are no-ops
    pub fn remove(&mut self) -> Result<()> {
        if self.removed {
            return Ok(());
        }
        self.removed = true;

        self.engine
            .runner
            .run_command_with_output(&self.engine.program, &["rm", "--force", &self.id])?;
        debug!("Removed temporary container {}", self.id);
        Ok(())
    }
}

impl Drop for TempContainer<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            warn!("Could not remove container {}: {}", self.id, e);
        }
    }
}

/// Last non-empty stdout line, which is where engines print the new id
pub fn parse_container_id(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Write an executable fake engine that logs its arguments
    fn fake_engine(dir: &TempDir, body: &str) -> (String, PathBuf) {
        let log = dir.path().join("calls.log");
        let script = dir.path().join("engine");
        let content = format!(
            "#!/bin/sh\necho \"$@\" >> '{}'\n{}\n",
            log.display(),
            body
        );
        fs::write(&script, content).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        (script.to_string_lossy().to_string(), log)
    }

    #[test]
    fn test_parse_container_id() {
        assert_eq!(
            parse_container_id("Trying to pull...\n3f2a9c\n"),
            Some("3f2a9c".to_string())
        );
        assert_eq!(parse_container_id("\n  \n"), None);
    }

    #[test]
    fn test_resolve_missing_configured_engine() {
        let err =
            ContainerEngine::resolve(Some("nonexistent_engine_12345"), ProcessRunner::default())
                .unwrap_err();
        assert!(matches!(err, ToolError::Prerequisite { .. }));
    }

    #[test]
    fn test_extract_binary_success_removes_container() {
        let dir = TempDir::new().unwrap();
        let (program, log) = fake_engine(
            &dir,
            r#"case "$1" in
  create) echo cid-123 ;;
  cp) echo binary > "$3" ;;
esac"#,
        );
        let engine = ContainerEngine::new(program, ProcessRunner::default());
        let out_dir = TempDir::new().unwrap();

        let path = engine
            .extract_binary("img:1", Path::new("/manager"), out_dir.path())
            .unwrap();

        assert_eq!(path, out_dir.path().join("manager"));
        assert!(path.is_file());
        let calls = fs::read_to_string(log).unwrap();
        let lines: Vec<&str> = calls.lines().collect();
        assert_eq!(lines[0], "create img:1");
        assert!(lines[1].starts_with("cp cid-123:/manager "));
        assert_eq!(lines[2], "rm --force cid-123");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_failed_copy_still_removes_container() {
        let dir = TempDir::new().unwrap();
        let (program, log) = fake_engine(
            &dir,
            r#"case "$1" in
  create) echo cid-456 ;;
  cp) echo "no such file" >&2; exit 1 ;;
esac"#,
        );
        let engine = ContainerEngine::new(program, ProcessRunner::default());
        let out_dir = TempDir::new().unwrap();

        let err = engine
            .extract_binary("img:2", Path::new("/manager"), out_dir.path())
            .unwrap_err();

        assert!(err.to_string().contains("img:2"));
        let calls = fs::read_to_string(log).unwrap();
        assert!(calls.lines().any(|l| l == "rm --force cid-456"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (program, log) = fake_engine(&dir, r#"[ "$1" = create ] && echo cid-789; exit 0"#);
        let engine = ContainerEngine::new(program, ProcessRunner::default());

        {
            let mut container = engine.create_container("img:3").unwrap();
            container.remove().unwrap();
            container.remove().unwrap();
        }

        let calls = fs::read_to_string(log).unwrap();
        assert_eq!(calls.lines().filter(|l| l.starts_with("rm")).count(), 1);
    }

    #[test]
    fn test_create_failure_is_extraction_error() {
        let dir = TempDir::new().unwrap();
        let (program, _log) = fake_engine(&dir, "echo 'manifest unknown' >&2; exit 125");
        let engine = ContainerEngine::new(program, ProcessRunner::default());

        let err = engine.create_container("img:missing").unwrap_err();
        assert!(err.to_string().contains("manifest unknown"));
    }
}
