//! Core workflows
//!
//! Controller lookup and build inspection on one side, repository mirroring
//! on the other.

pub mod buildinfo;
pub mod cluster;
pub mod controller;
pub mod image;
pub mod inspect;
pub mod mirror;

pub use buildinfo::{BuildInfo, BuildInfoParser};
pub use controller::ControllerKind;
pub use inspect::{ControllerInspector, ControllerReport};
pub use mirror::{MirrorSummary, RepositoryMirror};
