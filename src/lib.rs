//! Model management for SysML v2 REST API projects
//!
//! A project on the server is an append-only sequence of commits, each holding
//! a flat list of elements that reference their owner. This crate fetches the
//! elements of a commit, rebuilds the ownership tree from them and turns
//! logical edits into new commits.

pub mod domain;
pub use domain::{
    Attribute, CommitId, Config, Element, ElementId, ElementKind, ElementTree, ProjectId,
    Snapshot, TreeDiff, TreeError, TreeNode,
};

pub mod client;
pub use client::{ApiError, HttpApi, MemoryApi, ModelApi};

pub mod store;
pub use store::{ElementStore, StoreError};

pub mod project;
pub use project::{Project, ProjectError};
