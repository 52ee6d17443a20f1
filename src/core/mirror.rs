//! Repository mirroring
//!
//! Clones an upstream repository and pushes selected branches to a detached
//! target repository. The clone lives in a temporary directory that is
//! removed when the mirror run ends, whether it succeeded or not.

use crate::{
    config::{Config, MirrorConfig},
    error::{Result, ToolError},
    utils::process::{ProcessResult, ProcessRunner},
};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

/// Keeps git from blocking on credential prompts
const GIT_ENV: [(&str, &str); 1] = [("GIT_TERMINAL_PROMPT", "0")];

/// Outcome of a mirror run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MirrorSummary {
    /// Branches pushed, in request order
    pub pushed: Vec<String>,
    /// Subset of `pushed` that needed a force push
    pub forced: Vec<String>,
}

impl std::fmt::Display for MirrorSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pushed {} branch(es): {}", self.pushed.len(), self.pushed.join(", "))?;
        if !self.forced.is_empty() {
            write!(f, " (force-pushed: {})", self.forced.join(", "))?;
        }
        Ok(())
    }
}

/// Pushes branches of one repository into another
#[derive(Debug)]
pub struct RepositoryMirror {
    settings: MirrorConfig,
    git: String,
    process_runner: ProcessRunner,
}

impl RepositoryMirror {
    /// Create a mirror from a validated configuration
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            settings: config.mirror()?.clone(),
            git: config.tools.git.clone(),
            process_runner: ProcessRunner::new(config.debug),
        })
    }

    /// Run the whole clone, track, re-remote and push sequence
    #[instrument(skip(self), fields(target = %self.settings.target_repo))]
    pub fn run(&self) -> Result<MirrorSummary> {
        self.check_prerequisites()?;

        let source = &self.settings.source_repo;
        let target = &self.settings.target_repo;

        info!("Checking access to source repository {}", source);
        let source_heads = self.remote_heads(source)?;
        info!("Checking access to target repository {}", target);
        self.remote_heads(target)?;

        let missing = missing_branches(&self.settings.branches, &source_heads);
        if !missing.is_empty() {
            return Err(ToolError::repository(
                format!("branch(es) not found: {}", missing.join(", ")),
                source.as_str(),
            ));
        }

        let work_dir = TempDir::with_prefix("nbtools-mirror-").map_err(|e| {
            ToolError::file_system("create temporary directory", std::env::temp_dir(), e)
        })?;
        let repo_dir = work_dir.path().join("repo");

        self.clone_source(&repo_dir)?;
        self.create_tracking_branches(&repo_dir)?;
        self.switch_remotes(&repo_dir)?;

        let mut summary = MirrorSummary::default();
        for branch in &self.settings.branches {
            if self.push_branch(&repo_dir, branch)? {
                summary.forced.push(branch.clone());
            }
            summary.pushed.push(branch.clone());
        }

        info!("{}", summary);
        Ok(summary)
    }

    fn check_prerequisites(&self) -> Result<()> {
        if !self.process_runner.command_exists(&self.git) {
            return Err(ToolError::prerequisite(format!("git client '{}' not found", self.git)));
        }
        Ok(())
    }

    fn git(&self, repo_dir: Option<&Path>, args: &[&str]) -> Result<ProcessResult> {
        let dir;
        let mut full_args: Vec<&str> = Vec::with_capacity(args.len() + 2);
        if let Some(repo_dir) = repo_dir {
            dir = repo_dir.to_string_lossy();
            full_args.extend(["-C", &*dir]);
        }
        full_args.extend_from_slice(args);

        self.process_runner
            .run_command_with_output_and_env(&self.git, &full_args, &GIT_ENV)
    }

    /// Branch names a repository advertises
    #[instrument(skip(self))]
    fn remote_heads(&self, repo: &str) -> Result<Vec<String>> {
        let output = self.git(None, &["ls-remote", "--heads", repo]).map_err(|e| {
            ToolError::repository(
                format!("repository is not accessible: {}", e.stderr().trim()),
                repo,
            )
        })?;

        let heads = parse_remote_heads(&output.stdout);
        debug!("{} advertises {} branch(es)", repo, heads.len());
        Ok(heads)
    }

    #[instrument(skip(self))]
    fn clone_source(&self, repo_dir: &Path) -> Result<()> {
        let source = self.settings.source_repo.as_str();
        let dest = repo_dir.to_string_lossy();

        if self.settings.shallow {
            let (first, rest) = self
                .settings
                .branches
                .split_first()
                .ok_or_else(|| ToolError::validation("No branches selected for pushing"))?;

            info!("Cloning {} (selected branches only)", source);
            self.git(
                None,
                &[
                    "clone",
                    "--no-checkout",
                    "--single-branch",
                    "--no-tags",
                    "--branch",
                    first,
                    source,
                    &dest,
                ],
            )
            .map_err(|e| clone_error(source, &e))?;

            if !rest.is_empty() {
                for branch in rest {
                    self.git(
                        Some(repo_dir),
                        &["remote", "set-branches", "--add", "origin", branch],
                    )?;
                }
                self.git(Some(repo_dir), &["fetch", "--no-tags", "origin"])
                    .map_err(|e| clone_error(source, &e))?;
            }
        } else {
            info!("Cloning {}", source);
            self.git(None, &["clone", "--no-checkout", source, &dest])
                .map_err(|e| clone_error(source, &e))?;
        }

        Ok(())
    }

    /// Local branches tracking `origin/<branch>` for every selected branch
    #[instrument(skip(self))]
    fn create_tracking_branches(&self, repo_dir: &Path) -> Result<()> {
        let current = self
            .git(Some(repo_dir), &["symbolic-ref", "--quiet", "--short", "HEAD"])
            .ok()
            .map(|out| out.stdout_trimmed().to_string());

        for branch in &self.settings.branches {
            if current.as_deref() == Some(branch.as_str()) {
                debug!("{} is checked out and already tracks origin", branch);
                continue;
            }
            let upstream = format!("origin/{branch}");
            self.git(Some(repo_dir), &["branch", "--force", "--track", branch, &upstream])?;
        }
        Ok(())
    }

    /// Rename `origin` to `upstream` and point `origin` at the target
    #[instrument(skip(self))]
    fn switch_remotes(&self, repo_dir: &Path) -> Result<()> {
        self.git(Some(repo_dir), &["remote", "rename", "origin", "upstream"])?;
        self.git(
            Some(repo_dir),
            &["remote", "add", "origin", &self.settings.target_repo],
        )?;
        Ok(())
    }

    /// Push one branch; returns whether a force push was needed
    #[instrument(skip(self))]
    fn push_branch(&self, repo_dir: &Path, branch: &str) -> Result<bool> {
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        let target = self.settings.target_repo.as_str();

        info!("Pushing {} to {}", branch, target);
        match self.git(Some(repo_dir), &["push", "origin", &refspec]) {
            Ok(_) => Ok(false),
            Err(e) if is_push_rejection(e.stderr()) => {
                warn!(
                    "Push of {} was rejected by {}; force-pushing over the existing branch",
                    branch, target
                );
                self.git(Some(repo_dir), &["push", "--force", "origin", &refspec])
                    .map_err(|e| {
                        ToolError::repository(
                            format!("force push of {branch} failed: {}", e.stderr().trim()),
                            target,
                        )
                    })?;
                Ok(true)
            }
            Err(e) => Err(ToolError::repository(
                format!("push of {branch} failed: {}", e.stderr().trim()),
                target,
            )),
        }
    }
}

fn clone_error(source: &str, e: &ToolError) -> ToolError {
    ToolError::repository(format!("clone failed: {}", e.stderr().trim()), source)
}

/// Make a repository location that names an existing local path absolute
///
/// Remote URLs pass through unchanged. git runs in the temporary clone once
/// remotes are configured, so relative paths would resolve against it.
pub fn resolve_repo_location(repo: &str) -> Result<String> {
    let path = Path::new(repo);
    if repo.is_empty() || !path.exists() {
        return Ok(repo.to_string());
    }

    let absolute = fs::canonicalize(path)
        .map_err(|e| ToolError::file_system("resolve repository path", path, e))?;
    Ok(absolute.to_string_lossy().into_owned())
}

/// Trim, drop empties and deduplicate, keeping first occurrences in order
pub fn normalize_branches(branches: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    branches
        .iter()
        .map(|b| b.trim())
        .filter(|b| !b.is_empty())
        .filter(|b| seen.insert(b.to_string()))
        .map(str::to_string)
        .collect()
}

/// Reject names git would refuse as a branch
pub fn validate_branch_name(name: &str) -> Result<()> {
    const FORBIDDEN: &[char] = &['~', '^', ':', '?', '*', '[', '\\'];

    let invalid = name.is_empty()
        || name == "@"
        || name.starts_with('-')
        || name.starts_with('/')
        || name.ends_with('/')
        || name.ends_with('.')
        || name.ends_with(".lock")
        || name.contains("..")
        || name.contains("//")
        || name.contains("@{")
        || name.chars().any(|c| c.is_whitespace() || c.is_control() || FORBIDDEN.contains(&c));

    if invalid {
        return Err(ToolError::validation(format!("Invalid branch name: '{name}'")));
    }
    Ok(())
}

/// Branch names from `git ls-remote --heads` output
pub fn parse_remote_heads(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_once('\t'))
        .filter_map(|(_, reference)| reference.trim().strip_prefix("refs/heads/"))
        .map(str::to_string)
        .collect()
}

/// Requested branches absent from `available`
pub fn missing_branches(requested: &[String], available: &[String]) -> Vec<String> {
    requested
        .iter()
        .filter(|b| !available.contains(b))
        .cloned()
        .collect()
}

/// Whether git's stderr describes a rejected (non-fast-forward) push
pub fn is_push_rejection(stderr: &str) -> bool {
    stderr.contains("[rejected]")
        || stderr.contains("non-fast-forward")
        || stderr.contains("fetch first")
        || stderr.contains("Updates were rejected")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_branches() {
        let input = strings(&[" main", "", "notebooks-v2", "main ", "  "]);
        assert_eq!(normalize_branches(&input), vec!["main", "notebooks-v2"]);
    }

    #[test]
    fn test_validate_branch_name() {
        for ok in ["main", "notebooks-v2", "release/v1.10", "feature_x.y"] {
            assert!(validate_branch_name(ok).is_ok(), "{ok} should be valid");
        }
        for bad in ["", "-main", "a..b", "trailing/", "x.lock", "has space", "a:b", "@", "x@{1}"] {
            assert!(validate_branch_name(bad).is_err(), "{bad} should be invalid");
        }
    }

    #[test]
    fn test_parse_remote_heads() {
        let output = "2b5c1f0e\trefs/heads/main\n\
                      9d8a7b6c\trefs/heads/notebooks-v2\n\
                      5d4e3f2a\trefs/tags/v1.0\n";
        assert_eq!(parse_remote_heads(output), vec!["main", "notebooks-v2"]);
        assert!(parse_remote_heads("").is_empty());
    }

    #[test]
    fn test_missing_branches() {
        let available = strings(&["main", "notebooks-v2"]);
        let requested = strings(&["main", "v2-dev", "notebooks-v2", "other"]);
        assert_eq!(missing_branches(&requested, &available), vec!["v2-dev", "other"]);
    }

    #[test]
    fn test_is_push_rejection() {
        let stderr = " ! [rejected]        main -> main (fetch first)\n\
                      error: failed to push some refs to 'github.com:me/test.git'\n";
        assert!(is_push_rejection(stderr));
        assert!(is_push_rejection("hint: Updates were rejected because the tip ..."));
        assert!(!is_push_rejection(
            " ! [remote rejected] main -> main (protected branch hook declined)"
        ));
        assert!(!is_push_rejection("fatal: Could not read from remote repository."));
    }

    #[test]
    fn test_resolve_repo_location() {
        let url = "https://github.com/kubeflow/notebooks.git";
        assert_eq!(resolve_repo_location(url).unwrap(), url);
        let scp = "git@github.com:me/x.git";
        assert_eq!(resolve_repo_location(scp).unwrap(), scp);

        // Unit tests run from the package root
        let resolved = resolve_repo_location("src").unwrap();
        assert!(Path::new(&resolved).is_absolute());
        assert!(resolved.ends_with("src"));
    }

    #[test]
    fn test_summary_display() {
        let summary = MirrorSummary {
            pushed: strings(&["main", "notebooks-v2"]),
            forced: strings(&["main"]),
        };
        assert_eq!(
            summary.to_string(),
            "Pushed 2 branch(es): main, notebooks-v2 (force-pushed: main)"
        );
    }

    #[test]
    fn test_missing_git_is_prerequisite_error() {
        let mut config = Config::default();
        config.tools.git = "nonexistent_git_12345".into();
        config.mirror = Some(MirrorConfig {
            source_repo: "/tmp/src.git".into(),
            target_repo: "/tmp/dst.git".into(),
            branches: strings(&["main"]),
            shallow: false,
        });

        let err = RepositoryMirror::new(&config).unwrap().run().unwrap_err();
        assert!(matches!(err, ToolError::Prerequisite { .. }));
    }
}
