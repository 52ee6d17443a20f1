//! Registry of the controllers shipped by the notebooks project

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Controllers whose build metadata can be inspected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum ControllerKind {
    /// Reconciles `Notebook` resources
    #[value(name = "notebook-controller")]
    #[serde(rename = "notebook-controller")]
    Notebook,
    /// Reconciles `Tensorboard` resources
    #[value(name = "tensorboard-controller")]
    #[serde(rename = "tensorboard-controller")]
    Tensorboard,
    /// Reconciles `PVCViewer` resources
    #[value(name = "pvcviewer-controller")]
    #[serde(rename = "pvcviewer-controller")]
    PvcViewer,
    /// Reconciles `Workspace` and `WorkspaceKind` resources
    #[value(name = "workspaces-controller")]
    #[serde(rename = "workspaces-controller")]
    Workspaces,
}

impl ControllerKind {
    /// Every supported controller, in display order
    pub const ALL: [Self; 4] = [
        Self::Notebook,
        Self::Tensorboard,
        Self::PvcViewer,
        Self::Workspaces,
    ];

    /// Name used on the command line and in deployment manifests
    pub const fn name(self) -> &'static str {
        match self {
            Self::Notebook => "notebook-controller",
            Self::Tensorboard => "tensorboard-controller",
            Self::PvcViewer => "pvcviewer-controller",
            Self::Workspaces => "workspaces-controller",
        }
    }

    /// Label selector matching the controller's pods
    pub const fn label_selector(self) -> &'static str {
        match self {
            Self::Notebook => "app=notebook-controller",
            Self::Tensorboard => "app=tensorboard-controller",
            Self::PvcViewer => "app=pvcviewer",
            Self::Workspaces => "app.kubernetes.io/name=workspaces-controller",
        }
    }

    /// Container inside the pod that runs the controller binary
    pub const fn container_name(self) -> &'static str {
        "manager"
    }

    /// Location of the controller binary inside its image
    pub const fn default_binary_path(self) -> &'static str {
        "/manager"
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_names_match_display() {
        for kind in ControllerKind::ALL {
            let parsed = ControllerKind::from_str(kind.name(), false).unwrap();
            assert_eq!(parsed, kind);
            assert_eq!(kind.to_string(), kind.name());
        }
    }

    #[test]
    fn test_unknown_name_rejected() {
        assert!(ControllerKind::from_str("jupyter-web-app", false).is_err());
    }

    #[test]
    fn test_label_selectors() {
        assert_eq!(
            ControllerKind::Notebook.label_selector(),
            "app=notebook-controller"
        );
        assert_eq!(ControllerKind::PvcViewer.label_selector(), "app=pvcviewer");
        assert!(
            ControllerKind::ALL
                .iter()
                .all(|kind| kind.label_selector().contains('='))
        );
    }

    #[test]
    fn test_serializes_as_cli_name() {
        let json = serde_json::to_string(&ControllerKind::Tensorboard).unwrap();
        assert_eq!(json, "\"tensorboard-controller\"");
    }
}
