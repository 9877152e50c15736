use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::{
    client::{ApiError, CommitRequest, ModelApi},
    domain::{CommitId, CommitInfo, Element, ElementId, ProjectId, ProjectInfo},
};

/// A [`ModelApi`] that keeps every project and commit in memory.
///
/// Commits are applied exactly as a model server would: deleting an element
/// does not touch the elements it owns. Commit timestamps advance by one
/// second per commit so that "most recent" is always well defined.
#[derive(Debug)]
pub struct MemoryApi {
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    projects: Vec<StoredProject>,
    epoch: DateTime<Utc>,
    ticks: i64,
    /// Number of further commits to accept before rejecting all of them.
    accept_budget: Option<usize>,
    /// Element fetches fail while set.
    withhold_elements: bool,
}

#[derive(Debug)]
struct StoredProject {
    info: ProjectInfo,
    commits: Vec<StoredCommit>,
}

#[derive(Debug)]
struct StoredCommit {
    info: CommitInfo,
    elements: Vec<Element>,
}

impl Default for MemoryApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryApi {
    /// An empty server.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                projects: Vec::new(),
                epoch: Utc::now(),
                ticks: 0,
                accept_budget: None,
                withhold_elements: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a project whose single commit holds exactly `elements`.
    ///
    /// Identifiers and owner references are stored verbatim, so the commit
    /// may hold data a well-behaved client would never produce.
    pub fn seed_project(&self, name: &str, elements: Vec<Element>) -> (ProjectId, CommitId) {
        let mut state = self.state();
        let info = ProjectInfo {
            id: ProjectId::new(Uuid::new_v4().to_string()),
            name: name.to_string(),
        };
        let commit = state.next_commit();
        let ids = (info.id.clone(), commit.id.clone());
        state.projects.push(StoredProject {
            info,
            commits: vec![StoredCommit {
                info: commit,
                elements,
            }],
        });
        ids
    }

    /// Accepts `count` more commits, then rejects every commit after that.
    pub fn reject_commits_after(&self, count: usize) {
        self.state().accept_budget = Some(count);
    }

    /// Accepts commits again.
    pub fn accept_commits(&self) {
        self.state().accept_budget = None;
    }

    /// Fails every element fetch until [`MemoryApi::serve_elements`] is
    /// called. Commits are still accepted.
    pub fn withhold_elements(&self) {
        self.state().withhold_elements = true;
    }

    /// Serves element fetches again.
    pub fn serve_elements(&self) {
        self.state().withhold_elements = false;
    }
}

impl State {
    fn next_commit(&mut self) -> CommitInfo {
        self.ticks += 1;
        CommitInfo {
            id: CommitId::new(Uuid::new_v4().to_string()),
            created: self.epoch + TimeDelta::seconds(self.ticks),
        }
    }

    fn project(&self, id: &ProjectId) -> Option<&StoredProject> {
        self.projects.iter().find(|p| &p.info.id == id)
    }
}

impl StoredProject {
    fn commit(&self, id: &CommitId) -> Option<&StoredCommit> {
        self.commits.iter().find(|c| &c.info.id == id)
    }
}

fn apply(mut elements: Vec<Element>, request: &CommitRequest) -> Result<Vec<Element>, String> {
    for change in &request.changes {
        let position = |id: &ElementId| {
            elements
                .iter()
                .position(|e| &e.id == id)
                .ok_or_else(|| format!("no element {id}"))
        };
        match (&change.identity, &change.payload) {
            (Some(id), None) => {
                let index = position(id)?;
                elements.remove(index);
            }
            (Some(id), Some(payload)) => {
                let index = position(id)?;
                elements[index] = payload.clone().into_element(id.clone());
            }
            (None, Some(payload)) => {
                elements.push(payload.clone().into_element(ElementId::generate()));
            }
            (None, None) => return Err("change has neither payload nor identity".to_string()),
        }
    }
    Ok(elements)
}

impl ModelApi for MemoryApi {
    fn projects(&self) -> Result<Vec<ProjectInfo>, ApiError> {
        Ok(self.state().projects.iter().map(|p| p.info.clone()).collect())
    }

    fn create_project(&self, name: &str, _description: &str) -> Result<ProjectInfo, ApiError> {
        let info = ProjectInfo {
            id: ProjectId::new(Uuid::new_v4().to_string()),
            name: name.to_string(),
        };
        self.state().projects.push(StoredProject {
            info: info.clone(),
            commits: Vec::new(),
        });
        Ok(info)
    }

    fn commits(&self, project: &ProjectId) -> Result<Vec<CommitInfo>, ApiError> {
        let state = self.state();
        let project = state.project(project).ok_or_else(|| ApiError::Fetch {
            resource: format!("projects/{project}/commits"),
            reason: "no such project".to_string(),
        })?;
        Ok(project.commits.iter().map(|c| c.info.clone()).collect())
    }

    fn elements(&self, project: &ProjectId, commit: &CommitId) -> Result<Vec<Element>, ApiError> {
        let state = self.state();
        let not_found = |reason: &str| ApiError::Fetch {
            resource: format!("projects/{project}/commits/{commit}/elements"),
            reason: reason.to_string(),
        };
        if state.withhold_elements {
            return Err(not_found("elements are not being served"));
        }
        let stored = state
            .project(project)
            .ok_or_else(|| not_found("no such project"))?
            .commit(commit)
            .ok_or_else(|| not_found("no such commit"))?;
        Ok(stored.elements.clone())
    }

    fn commit(&self, project: &ProjectId, request: &CommitRequest) -> Result<CommitId, ApiError> {
        let mut state = self.state();
        let rejected = |reason: String| ApiError::Commit {
            project: project.clone(),
            reason,
        };

        match &mut state.accept_budget {
            Some(0) => return Err(rejected("commits are not being accepted".to_string())),
            Some(remaining) => *remaining -= 1,
            None => {}
        }

        let stored = state
            .project(project)
            .ok_or_else(|| rejected("no such project".to_string()))?;
        let base = match &request.previous {
            Some(previous) => stored
                .commit(previous)
                .ok_or_else(|| rejected(format!("unknown previous commit {previous}")))?
                .elements
                .clone(),
            None => Vec::new(),
        };
        let elements = apply(base, request).map_err(rejected)?;

        let info = state.next_commit();
        let id = info.id.clone();
        if let Some(stored) = state.projects.iter_mut().find(|p| &p.info.id == project) {
            stored.commits.push(StoredCommit { info, elements });
        }
        Ok(id)
    }
}
