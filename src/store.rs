//! Fetching element snapshots from the model server.

use thiserror::Error;
use tracing::instrument;

use crate::{
    client::{ApiError, ModelApi},
    domain::{CommitId, ProjectId, Snapshot, SnapshotError},
};

/// Retrieves and validates the element collection of a commit.
#[derive(Debug, Clone, Copy)]
pub struct ElementStore<'a, A: ?Sized> {
    api: &'a A,
}

/// Failure to produce a snapshot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The server could not be read.
    #[error(transparent)]
    Fetch(#[from] ApiError),

    /// The server returned elements whose references do not resolve.
    #[error("malformed model data: {0}")]
    Malformed(#[from] SnapshotError),
}

impl<'a, A: ModelApi + ?Sized> ElementStore<'a, A> {
    /// A store reading through `api`.
    pub const fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Fetches the full element collection of `commit`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Fetch`] if the request fails and
    /// [`StoreError::Malformed`] if an owner reference cannot be resolved
    /// within the returned collection.
    #[instrument(skip(self))]
    pub fn refresh(&self, project: &ProjectId, commit: &CommitId) -> Result<Snapshot, StoreError> {
        let elements = self.api.elements(project, commit)?;
        let snapshot = Snapshot::new(commit.clone(), elements)?;
        tracing::debug!(elements = snapshot.len(), "refreshed snapshot");
        Ok(snapshot)
    }
}
