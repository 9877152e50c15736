//! Domain models for model management.
//!
//! This module contains the network-agnostic core: elements, the snapshot of
//! a commit, the reconstructed element tree and configuration.

/// Attribute name/value pairs and their text encoding.
pub mod attribute;
pub use attribute::{Attribute, AttributeError};

/// Projects and commits.
pub mod commit;
pub use commit::{CommitId, CommitInfo, ProjectId, ProjectInfo};

mod config;
pub use config::Config;

/// Model elements.
pub mod element;
pub use element::{Element, ElementId, ElementKind, Payload};

/// The element collection of one commit.
pub mod snapshot;
pub use snapshot::{Snapshot, SnapshotError};

/// Tree reconstruction.
pub mod tree;
pub use tree::{ElementTree, TreeDiff, TreeError, TreeNode};
