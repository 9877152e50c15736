//! Access to the remote versioned-model API.
//!
//! [`ModelApi`] is the boundary between the core and whatever serves the
//! model: [`HttpApi`] talks to a SysML v2 REST server, [`MemoryApi`] keeps
//! the whole history in process.

use thiserror::Error;

use crate::domain::{CommitId, CommitInfo, Element, ElementId, Payload, ProjectId, ProjectInfo};

/// Blocking HTTP client for the SysML v2 REST API.
pub mod http;
pub use http::HttpApi;

/// In-process implementation of the API.
pub mod memory;
pub use memory::MemoryApi;

mod wire;

/// One element change inside a commit.
///
/// A payload without identity creates an element, a payload with identity
/// replaces that element and an identity without payload deletes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// The new content, or `None` to delete.
    pub payload: Option<Payload>,
    /// The element being replaced or deleted.
    pub identity: Option<ElementId>,
}

impl Change {
    /// Creates a new element.
    #[must_use]
    pub const fn create(payload: Payload) -> Self {
        Self {
            payload: Some(payload),
            identity: None,
        }
    }

    /// Replaces the content of an existing element.
    #[must_use]
    pub const fn update(id: ElementId, payload: Payload) -> Self {
        Self {
            payload: Some(payload),
            identity: Some(id),
        }
    }

    /// Deletes an existing element.
    #[must_use]
    pub const fn delete(id: ElementId) -> Self {
        Self {
            payload: None,
            identity: Some(id),
        }
    }
}

/// A request for a new commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    /// The commit the changes apply to. `None` only for the first commit of
    /// a project.
    pub previous: Option<CommitId>,
    /// Changes applied atomically.
    pub changes: Vec<Change>,
}

/// Failures reported by the model server.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// A read failed: transport error, timeout, non-success status or an
    /// undecodable body.
    #[error("failed to fetch {resource}: {reason}")]
    Fetch {
        /// What was being fetched.
        resource: String,
        /// Why it failed.
        reason: String,
    },

    /// The server did not accept a commit.
    #[error("commit to project {project} rejected: {reason}")]
    Commit {
        /// The target project.
        project: ProjectId,
        /// Why it was rejected.
        reason: String,
    },

    /// The server did not create a project.
    #[error("failed to create project '{name}': {reason}")]
    CreateProject {
        /// The requested name.
        name: String,
        /// Why it failed.
        reason: String,
    },
}

/// The operations the core needs from a model server.
///
/// Calls block until the server has answered.
pub trait ModelApi {
    /// All projects on the server.
    ///
    /// # Errors
    ///
    /// [`ApiError::Fetch`] if the list cannot be retrieved.
    fn projects(&self) -> Result<Vec<ProjectInfo>, ApiError>;

    /// Creates an empty project.
    ///
    /// # Errors
    ///
    /// [`ApiError::CreateProject`] if the server refuses.
    fn create_project(&self, name: &str, description: &str) -> Result<ProjectInfo, ApiError>;

    /// The commits of a project, in server order.
    ///
    /// # Errors
    ///
    /// [`ApiError::Fetch`] if the list cannot be retrieved.
    fn commits(&self, project: &ProjectId) -> Result<Vec<CommitInfo>, ApiError>;

    /// The flat element list of a commit.
    ///
    /// # Errors
    ///
    /// [`ApiError::Fetch`] if the list cannot be retrieved.
    fn elements(&self, project: &ProjectId, commit: &CommitId) -> Result<Vec<Element>, ApiError>;

    /// Submits a commit and returns its identifier.
    ///
    /// # Errors
    ///
    /// [`ApiError::Commit`] if the server rejects it.
    fn commit(&self, project: &ProjectId, request: &CommitRequest) -> Result<CommitId, ApiError>;
}

impl<T: ModelApi + ?Sized> ModelApi for &T {
    fn projects(&self) -> Result<Vec<ProjectInfo>, ApiError> {
        (**self).projects()
    }

    fn create_project(&self, name: &str, description: &str) -> Result<ProjectInfo, ApiError> {
        (**self).create_project(name, description)
    }

    fn commits(&self, project: &ProjectId) -> Result<Vec<CommitInfo>, ApiError> {
        (**self).commits(project)
    }

    fn elements(&self, project: &ProjectId, commit: &CommitId) -> Result<Vec<Element>, ApiError> {
        (**self).elements(project, commit)
    }

    fn commit(&self, project: &ProjectId, request: &CommitRequest) -> Result<CommitId, ApiError> {
        (**self).commit(project, request)
    }
}
