//! Controller build inspection
//!
//! Ties the cluster lookup, image extraction and build info parsing into the
//! `controller-version` workflow.

use crate::{
    config::{Config, ControllerConfig},
    core::{
        buildinfo::{self, BuildInfo},
        cluster::ClusterClient,
        controller::ControllerKind,
        image::ContainerEngine,
    },
    error::{Result, ToolError},
    utils::process::ProcessRunner,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;
use tempfile::TempDir;
use tracing::{info, instrument};

/// Result of inspecting a running controller
#[derive(Debug, Clone, Serialize)]
pub struct ControllerReport {
    /// Inspected controller
    pub controller: ControllerKind,
    /// Namespace searched
    pub namespace: String,
    /// Pod the image was read from
    pub pod: String,
    /// Image the controller runs
    pub image: String,
    /// Binary path inside the image
    pub binary_path: PathBuf,
    /// `vcs.time` normalized to UTC
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_time: Option<DateTime<Utc>>,
    /// Embedded build metadata
    pub build: BuildInfo,
}

impl ControllerReport {
    /// Human readable report; `filter` limits the dependency list
    pub fn render_text(&self, filter: Option<&str>) -> String {
        let build = &self.build;
        let mut out = String::new();

        let _ = writeln!(out, "Controller:    {}", self.controller);
        let _ = writeln!(out, "Namespace:     {}", self.namespace);
        let _ = writeln!(out, "Pod:           {}", self.pod);
        let _ = writeln!(out, "Image:         {}", self.image);
        let _ = writeln!(out, "Binary:        {}", self.binary_path.display());
        let _ = writeln!(out, "Go version:    {}", build.go_version);
        if !build.path.is_empty() {
            let _ = writeln!(out, "Package:       {}", build.path);
        }
        if let Some(main) = &build.main {
            let _ = writeln!(out, "Main module:   {} {}", main.path, main.version);
        }
        if let Some(revision) = build.revision() {
            let suffix = if build.is_modified() { " (modified)" } else { "" };
            let _ = writeln!(out, "Revision:      {revision}{suffix}");
        }
        if let Some(time) = build.commit_time() {
            let _ = writeln!(out, "Commit time:   {}", time.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        if let Some(platform) = build.platform() {
            let _ = writeln!(out, "Platform:      {platform}");
        }

        let deps: Vec<_> = build.filtered_deps(filter).collect();
        match filter {
            Some(f) => {
                let _ = writeln!(out, "Dependencies matching '{f}' ({}):", deps.len());
            }
            None => {
                let _ = writeln!(out, "Dependencies ({}):", deps.len());
            }
        }
        for dep in deps {
            match &dep.replacement {
                Some(r) => {
                    let _ = writeln!(
                        out,
                        "  {} {} => {} {}",
                        dep.path, dep.version, r.path, r.version
                    );
                }
                None => {
                    let _ = writeln!(out, "  {} {}", dep.path, dep.version);
                }
            }
        }

        out
    }

    /// JSON report; `filter` limits the dependency list
    pub fn render_json(&self, filter: Option<&str>) -> Result<String> {
        let mut report = self.clone();
        if filter.is_some() {
            report.build.deps = self.build.filtered_deps(filter).cloned().collect();
        }
        serde_json::to_string_pretty(&report)
            .map_err(|e| ToolError::config(format!("Failed to serialize report: {e}")))
    }
}

/// Finds a controller pod and reads the build info of its binary
#[derive(Debug)]
pub struct ControllerInspector {
    settings: ControllerConfig,
    cluster: ClusterClient,
    container_engine: Option<String>,
    go: String,
    process_runner: ProcessRunner,
}

impl ControllerInspector {
    /// Create an inspector from a validated configuration
    pub fn new(config: &Config) -> Result<Self> {
        let process_runner = ProcessRunner::new(config.debug);
        let settings = config.controller()?.clone();

        if !process_runner.command_exists(&config.tools.kubectl) {
            return Err(ToolError::prerequisite(format!(
                "cluster client '{}' not found",
                config.tools.kubectl
            )));
        }

        Ok(Self {
            settings,
            cluster: ClusterClient::new(config.tools.kubectl.clone(), process_runner),
            container_engine: config.tools.container_engine.clone(),
            go: config.tools.go.clone(),
            process_runner,
        })
    }

    /// Run the lookup, extraction and parsing steps
    #[instrument(skip(self), fields(controller = %self.settings.kind))]
    pub fn inspect(&self) -> Result<ControllerReport> {
        let kind = self.settings.kind;
        let namespace = &self.settings.namespace;

        info!("Looking up {} pods in namespace {}", kind, namespace);
        let pod = self
            .cluster
            .find_running_pod(namespace, kind.label_selector())?;
        let image = self
            .cluster
            .pod_image(namespace, &pod, kind.container_name())?;

        let engine =
            ContainerEngine::resolve(self.container_engine.as_deref(), self.process_runner)?;
        info!("Extracting {} with {}", self.settings.binary_path.display(), engine.program());

        let work_dir = TempDir::with_prefix("nbtools-").map_err(|e| {
            ToolError::file_system("create temporary directory", std::env::temp_dir(), e)
        })?;
        let binary = engine.extract_binary(&image, &self.settings.binary_path, work_dir.path())?;

        let build = buildinfo::read_build_info(&self.process_runner, &self.go, &binary)?;

        Ok(ControllerReport {
            controller: kind,
            namespace: namespace.clone(),
            pod,
            image,
            binary_path: self.settings.binary_path.clone(),
            commit_time: build.commit_time(),
            build,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::buildinfo::Module;

    fn sample_report() -> ControllerReport {
        let mut build = BuildInfo {
            go_version: "go1.22.5".to_string(),
            path: "github.com/kubeflow/notebooks/components/notebook-controller".to_string(),
            ..BuildInfo::default()
        };
        build.settings.insert("vcs.revision".into(), "abc123".into());
        build.settings.insert("vcs.modified".into(), "false".into());
        build.settings.insert("vcs.time".into(), "2024-05-01T12:30:00Z".into());
        build.settings.insert("GOOS".into(), "linux".into());
        build.settings.insert("GOARCH".into(), "arm64".into());
        build.deps = vec![
            Module {
                path: "k8s.io/client-go".into(),
                version: "v0.29.0".into(),
                sum: String::new(),
                replacement: Some(Box::new(Module {
                    path: "k8s.io/client-go".into(),
                    version: "v0.28.4".into(),
                    sum: String::new(),
                    replacement: None,
                })),
            },
            Module {
                path: "github.com/go-logr/logr".into(),
                version: "v1.4.1".into(),
                sum: String::new(),
                replacement: None,
            },
        ];

        ControllerReport {
            controller: ControllerKind::Notebook,
            namespace: "kubeflow".into(),
            pod: "notebook-controller-abc".into(),
            image: "ghcr.io/kubeflow/notebooks/notebook-controller:v1.10.0".into(),
            binary_path: PathBuf::from("/manager"),
            commit_time: build.commit_time(),
            build,
        }
    }

    #[test]
    fn test_render_text() {
        let text = sample_report().render_text(None);

        assert!(text.contains("Controller:    notebook-controller"));
        assert!(text.contains("Revision:      abc123\n"));
        assert!(text.contains("Commit time:   2024-05-01 12:30:00 UTC"));
        assert!(text.contains("Platform:      linux/arm64"));
        assert!(text.contains("Dependencies (2):"));
        assert!(text.contains("  k8s.io/client-go v0.29.0 => k8s.io/client-go v0.28.4"));
    }

    #[test]
    fn test_render_text_with_filter() {
        let text = sample_report().render_text(Some("logr"));
        assert!(text.contains("Dependencies matching 'logr' (1):"));
        assert!(!text.contains("client-go"));
    }

    #[test]
    fn test_render_json_filters_deps() {
        let json = sample_report().render_json(Some("k8s.io")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["controller"], "notebook-controller");
        assert_eq!(value["build"]["deps"].as_array().unwrap().len(), 1);
        assert_eq!(value["build"]["settings"]["GOARCH"], "arm64");
        assert_eq!(value["commit_time"], "2024-05-01T12:30:00Z");
    }

    #[test]
    fn test_render_json_omits_unknown_commit_time() {
        let mut report = sample_report();
        report.build.settings.remove("vcs.time");
        report.commit_time = report.build.commit_time();

        let value: serde_json::Value =
            serde_json::from_str(&report.render_json(None).unwrap()).unwrap();
        assert!(value.get("commit_time").is_none());
    }

    #[test]
    fn test_inspector_requires_cluster_client() {
        let mut config = Config::default();
        config.tools.kubectl = "nonexistent_kubectl_12345".into();
        config.controller = Some(ControllerConfig {
            kind: ControllerKind::Notebook,
            namespace: "kubeflow".into(),
            binary_path: PathBuf::from("/manager"),
            json: false,
            dependency_filter: None,
        });

        let err = ControllerInspector::new(&config).unwrap_err();
        assert!(matches!(err, ToolError::Prerequisite { .. }));
    }
}
