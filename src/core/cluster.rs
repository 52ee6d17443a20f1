//! Pod lookups through the cluster client
//!
//! Only `kubectl get` with jsonpath output is used, so `oc` works as a
//! drop-in replacement.

use crate::{
    error::{Result, ToolError},
    utils::process::ProcessRunner,
};
use tracing::{debug, info, instrument};

/// A container declared in a pod spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodContainer {
    /// Container name
    pub name: String,
    /// Image reference the container runs
    pub image: String,
}

/// Thin wrapper around the cluster client binary
#[derive(Debug)]
pub struct ClusterClient {
    kubectl: String,
    runner: ProcessRunner,
}

impl ClusterClient {
    /// Create a client driving the given binary
    pub fn new(kubectl: impl Into<String>, runner: ProcessRunner) -> Self {
        Self {
            kubectl: kubectl.into(),
            runner,
        }
    }

    /// Name of the first running pod matching `selector`
    #[instrument(skip(self))]
    pub fn find_running_pod(&self, namespace: &str, selector: &str) -> Result<String> {
        let output = self
            .runner
            .run_command_with_output(
                &self.kubectl,
                &[
                    "get",
                    "pods",
                    "--namespace",
                    namespace,
                    "--selector",
                    selector,
                    "--field-selector=status.phase=Running",
                    "--output",
                    "jsonpath={.items[*].metadata.name}",
                ],
            )
            .map_err(|e| {
                ToolError::lookup(
                    format!(
                        "could not list pods with selector '{selector}' in namespace '{namespace}': {}",
                        e.stderr().trim()
                    ),
                    namespace,
                )
            })?;

        let pods = parse_pod_names(&output.stdout);
        let Some((first, rest)) = pods.split_first() else {
            return Err(ToolError::lookup(
                format!("no running pod matches selector '{selector}' in namespace '{namespace}'"),
                namespace,
            ));
        };

        if !rest.is_empty() {
            debug!("Ignoring additional matching pods: {:?}", rest);
        }

        info!("Found controller pod: {}", first);
        Ok(first.clone())
    }

    /// Image of the preferred container in `pod`, falling back to the first one
    #[instrument(skip(self))]
    pub fn pod_image(
        &self,
        namespace: &str,
        pod: &str,
        preferred_container: &str,
    ) -> Result<String> {
        let output = self
            .runner
            .run_command_with_output(
                &self.kubectl,
                &[
                    "get",
                    "pod",
                    pod,
                    "--namespace",
                    namespace,
                    "--output",
                    r#"jsonpath={range .spec.containers[*]}{.name}{"\t"}{.image}{"\n"}{end}"#,
                ],
            )
            .map_err(|e| {
                ToolError::lookup(
                    format!("could not read pod '{pod}': {}", e.stderr().trim()),
                    namespace,
                )
            })?;

        let containers = parse_containers(&output.stdout);
        let container = select_container(&containers, preferred_container).ok_or_else(|| {
            ToolError::lookup(format!("pod '{pod}' declares no containers"), namespace)
        })?;

        if container.name != preferred_container {
            debug!(
                "Container '{}' not found in pod {}, using '{}'",
                preferred_container, pod, container.name
            );
        }

        info!("Controller image: {}", container.image);
        Ok(container.image.clone())
    }
}

/// Split whitespace separated jsonpath output into pod names
pub fn parse_pod_names(output: &str) -> Vec<String> {
    output.split_whitespace().map(str::to_string).collect()
}

/// Parse `name<TAB>image` lines
pub fn parse_containers(output: &str) -> Vec<PodContainer> {
    output
        .lines()
        .filter_map(|line| {
            let (name, image) = line.trim().split_once('\t')?;
            let image = image.trim();
            if image.is_empty() {
                return None;
            }
            Some(PodContainer {
                name: name.trim().to_string(),
                image: image.to_string(),
            })
        })
        .collect()
}

/// Preferred container by name, else the first declared one
pub fn select_container<'a>(
    containers: &'a [PodContainer],
    preferred: &str,
) -> Option<&'a PodContainer> {
    containers
        .iter()
        .find(|c| c.name == preferred)
        .or_else(|| containers.first())
}
