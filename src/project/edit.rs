//! Logical edits accepted by a [`Project`](crate::Project).

use std::fmt;

use crate::domain::{Attribute, CommitId, ElementId, ElementKind, ProjectId, TreeDiff};

/// How an edit addresses an existing element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementRef {
    /// By identifier. Always unambiguous.
    Id(ElementId),
    /// By name. Fails if more than one element carries the name.
    Name(String),
}

impl ElementRef {
    /// Addresses an element by name.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Addresses an element by identifier.
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(ElementId::new(id))
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Name(name) => write!(f, "name '{name}'"),
        }
    }
}

/// Whether an edit may introduce a name that is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicateNames {
    /// Refuse names already used by another element.
    #[default]
    Reject,
    /// Accept them.
    Allow,
}

/// A new element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Create {
    /// A part. Without owner it becomes the root, which is only possible
    /// while the project has none.
    Part {
        /// Name of the part.
        name: String,
        /// The owning element.
        owner: Option<ElementRef>,
    },
    /// An attribute of a part.
    Attribute {
        /// Name and value.
        attribute: Attribute,
        /// The owning part.
        owner: ElementRef,
    },
    /// A requirement attached to a part.
    Requirement {
        /// Name of the requirement.
        name: String,
        /// Requirement text.
        description: String,
        /// The owning part.
        owner: ElementRef,
    },
}

/// A change to an existing element. Fields left `None` keep their value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Renames and/or moves a part.
    Part {
        /// The part to change.
        target: ElementRef,
        /// New name.
        name: Option<String>,
        /// New owner.
        owner: Option<ElementRef>,
    },
    /// Sets the value of an attribute, keeping its name.
    Attribute {
        /// The attribute to change.
        target: ElementRef,
        /// New value.
        value: String,
    },
    /// Renames a requirement and/or rewrites its text.
    Requirement {
        /// The requirement to change.
        target: ElementRef,
        /// New name.
        name: Option<String>,
        /// New text.
        description: Option<String>,
    },
}

/// Removal of an element and everything it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    /// The element to remove.
    pub target: ElementRef,
    /// If set, the target must be of this kind.
    pub kind: Option<ElementKind>,
}

/// Selects a project on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectSelector {
    /// By identifier.
    Id(ProjectId),
    /// By name. The name must be unique.
    Name(String),
    /// By position in the name-ordered project list.
    Index(usize),
    /// An identifier if one matches, otherwise a name.
    IdOrName(String),
}

/// Selects a commit of the current project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitSelector {
    /// By identifier.
    Id(CommitId),
    /// By position in the newest-first commit list.
    Index(usize),
}

/// Outcome of a successful edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// The commit now current.
    pub commit: CommitId,
    /// How the tree changed.
    pub diff: TreeDiff,
}
