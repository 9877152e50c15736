//! Projects and commits of the remote version history.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a project on the model server.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Wraps an identifier received from the API.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an immutable commit in a project's history.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    /// Wraps an identifier received from the API.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A project as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    /// Server-assigned identifier.
    pub id: ProjectId,
    /// Display name. Not necessarily unique.
    pub name: String,
}

/// A commit as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    /// Server-assigned identifier.
    pub id: CommitId,
    /// Creation time, used to find the most recent commit.
    pub created: DateTime<Utc>,
}

/// Orders commits newest first.
///
/// Commits created at the same instant keep their relative order.
pub fn sort_newest_first(commits: &mut [CommitInfo]) {
    commits.sort_by(|a, b| b.created.cmp(&a.created));
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn newest_commit_comes_first() {
        let at = |secs| Utc.timestamp_opt(secs, 0).unwrap();
        let mut commits = vec![
            CommitInfo {
                id: CommitId::new("a"),
                created: at(10),
            },
            CommitInfo {
                id: CommitId::new("c"),
                created: at(30),
            },
            CommitInfo {
                id: CommitId::new("b"),
                created: at(20),
            },
        ];

        sort_newest_first(&mut commits);

        let ids: Vec<_> = commits.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);
    }
}
