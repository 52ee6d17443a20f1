//! Build metadata embedded in Go binaries
//!
//! Reads the module and build-setting records that the Go linker stores in
//! every binary, as printed by `go version -m`.

use crate::{
    error::{Result, ToolError},
    utils::process::ProcessRunner,
};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, instrument};

/// A module record (`mod`, `dep` or a `=>` replacement)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Module path
    pub path: String,
    /// Module version, `(devel)` for local builds
    pub version: String,
    /// go.sum checksum, empty when absent
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub sum: String,
    /// Replacement directive applied to this module
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub replacement: Option<Box<Module>>,
}

impl Module {
    /// Version that actually got linked, following a replacement
    pub fn effective_version(&self) -> &str {
        self.replacement
            .as_deref()
            .map_or(self.version.as_str(), |r| r.version.as_str())
    }
}

/// Everything `go version -m` reports about a binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Toolchain that built the binary, e.g. `go1.22.5`
    pub go_version: String,
    /// Main package import path
    pub path: String,
    /// Main module
    pub main: Option<Module>,
    /// Linked dependency modules
    pub deps: Vec<Module>,
    /// Build settings (`GOOS`, `vcs.revision`, `-ldflags`, ...)
    pub settings: BTreeMap<String, String>,
}

impl BuildInfo {
    /// VCS revision the binary was built from
    pub fn revision(&self) -> Option<&str> {
        self.settings.get("vcs.revision").map(String::as_str)
    }

    /// Commit time of that revision
    pub fn commit_time(&self) -> Option<DateTime<Utc>> {
        self.settings
            .get("vcs.time")
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
    }

    /// Whether the working tree had uncommitted changes
    pub fn is_modified(&self) -> bool {
        self.settings.get("vcs.modified").is_some_and(|v| v == "true")
    }

    /// `GOOS/GOARCH`
    pub fn platform(&self) -> Option<String> {
        match (self.settings.get("GOOS"), self.settings.get("GOARCH")) {
            (Some(os), Some(arch)) => Some(format!("{os}/{arch}")),
            _ => None,
        }
    }

    /// Dependencies whose path contains `filter`
    pub fn filtered_deps<'a>(
        &'a self,
        filter: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Module> {
        self.deps
            .iter()
            .filter(move |m| filter.is_none_or(|f| m.path.contains(f)))
    }
}

/// Parser for `go version -m` output
pub struct BuildInfoParser {
    re_header: Regex,
}

impl BuildInfoParser {
    /// Create a new parser
    pub fn new() -> Result<Self> {
        Ok(Self {
            re_header: Regex::new(r"^(?P<file>.+?): (?P<go>(?:devel )?go\S+)(?:\s.*)?$")
                .map_err(|e| ToolError::config(format!("Failed to compile regex: {e}")))?,
        })
    }

    /// Parse the output for the binary at `path`
    pub fn parse(&self, output: &str, path: &Path) -> Result<BuildInfo> {
        let mut lines = output.lines().filter(|l| !l.trim().is_empty());

        let header = lines
            .next()
            .ok_or_else(|| ToolError::build_info("no output from go version -m", path))?;
        let go_version = self
            .re_header
            .captures(header)
            .and_then(|c| c.name("go"))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                ToolError::build_info(
                    format!("not a Go binary or no build info present: '{}'", header.trim()),
                    path,
                )
            })?;

        let mut info = BuildInfo {
            go_version,
            ..BuildInfo::default()
        };

        // `=>` lines attach to whichever module record came right before them
        let mut last_was_main = false;

        for line in lines {
            let fields: Vec<&str> = line.trim_start().split('\t').collect();
            match fields.as_slice() {
                ["path", value, ..] => info.path = value.trim().to_string(),
                ["mod", rest @ ..] => {
                    info.main = parse_module(rest);
                    last_was_main = true;
                }
                ["dep", rest @ ..] => {
                    if let Some(module) = parse_module(rest) {
                        info.deps.push(module);
                    }
                    last_was_main = false;
                }
                ["=>", rest @ ..] => {
                    let replacement = parse_module(rest).map(Box::new);
                    let target = if last_was_main {
                        info.main.as_mut()
                    } else {
                        info.deps.last_mut()
                    };
                    match target {
                        Some(module) => module.replacement = replacement,
                        None => debug!("Replacement without a module record: {}", line),
                    }
                }
                ["build", setting, ..] => {
                    let (key, value) = parse_setting(setting);
                    info.settings.insert(key, value);
                }
                _ => debug!("Ignoring build info line: {}", line),
            }
        }

        Ok(info)
    }
}

fn parse_module(fields: &[&str]) -> Option<Module> {
    let path = fields.first()?.trim();
    if path.is_empty() {
        return None;
    }
    let field = |i: usize| fields.get(i).map_or(String::new(), |f| f.trim().to_string());
    Some(Module {
        path: path.to_string(),
        version: field(1),
        sum: field(2),
        replacement: None,
    })
}

fn parse_setting(setting: &str) -> (String, String) {
    match setting.split_once('=') {
        Some((key, value)) => (key.to_string(), value.trim_matches('"').to_string()),
        None => (setting.to_string(), String::new()),
    }
}

/// Run `go version -m` on a binary and parse the result
#[instrument(skip(runner))]
pub fn read_build_info(runner: &ProcessRunner, go: &str, binary: &Path) -> Result<BuildInfo> {
    if !runner.command_exists(go) {
        return Err(ToolError::prerequisite(format!(
            "Go toolchain '{go}' not found; it is needed to read embedded build info"
        )));
    }

    let binary_str = binary.to_string_lossy();
    let output = runner
        .run_command_with_output(go, &["version", "-m", &binary_str])
        .map_err(|e| ToolError::build_info(e.stderr().trim().to_string(), binary))?;

    BuildInfoParser::new()?.parse(&output.stdout, binary)
}
