//! The mutation coordinator.
//!
//! A [`Project`] owns the local view of one remote project: the commit
//! history, the commit currently looked at, its [`Snapshot`] and the
//! [`ElementTree`] built from it. Edits are validated against that view,
//! submitted as commits on top of the current one and then the view is
//! rebuilt from what the server actually stored.
//!
//! The view is only ever replaced as a whole. If anything fails along the
//! way the previous commit, snapshot and tree stay in place.

use chrono::Utc;
use nonempty::NonEmpty;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    client::{ApiError, Change, CommitRequest, ModelApi},
    domain::{
        Attribute, AttributeError, CommitId, CommitInfo, Element, ElementId, ElementKind,
        ElementTree, Payload, ProjectId, ProjectInfo, Snapshot, TreeDiff, TreeError,
        commit::sort_newest_first,
    },
    store::{ElementStore, StoreError},
};

mod edit;
pub use edit::{
    Applied, CommitSelector, Create, Delete, DuplicateNames, ElementRef, ProjectSelector, Update,
};

/// Name of the part every new project starts with.
pub const ROOT_PART: &str = "Root Part";

/// A project opened at one of its commits.
#[derive(Debug)]
pub struct Project<A> {
    api: A,
    info: ProjectInfo,
    /// Newest first.
    commits: Vec<CommitInfo>,
    snapshot: Snapshot,
    tree: ElementTree,
}

/// Failures of project-level operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectError {
    /// The server could not be reached or refused a request.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A snapshot could not be fetched or is inconsistent.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The hierarchy could not be built, or an edit would break it.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// An attribute could not be encoded or decoded.
    #[error(transparent)]
    Attribute(#[from] AttributeError),

    /// No project matches the selector.
    #[error("no project matches '{0}'")]
    ProjectNotFound(String),

    /// More than one project carries the requested name.
    #[error("{count} projects are named '{name}'; select one by id")]
    DuplicateProjectName {
        /// The shared name.
        name: String,
        /// How many projects carry it.
        count: usize,
    },

    /// The project exists but has never been committed to.
    #[error("project {0} has no commits")]
    NoCommits(ProjectId),

    /// No commit matches the selector.
    #[error("no commit matches '{0}'")]
    CommitNotFound(String),

    /// No element matches the reference.
    #[error("no element with {0}")]
    ElementNotFound(ElementRef),

    /// A name reference matches more than one element.
    #[error("{} elements are named '{name}'; select one by id", .candidates.len())]
    DuplicateName {
        /// The shared name.
        name: String,
        /// Identifiers of every element carrying it.
        candidates: NonEmpty<ElementId>,
    },

    /// The name an edit would introduce is already taken.
    #[error("an element named '{0}' already exists")]
    NameInUse(String),

    /// The referenced element is not of the kind the edit applies to.
    #[error("'{name}' is a {found}, not a {expected}")]
    WrongKind {
        /// The element name.
        name: String,
        /// The kind the edit needs.
        expected: ElementKind,
        /// The kind it has.
        found: ElementKind,
    },

    /// The requested owner cannot own other elements.
    #[error("'{name}' is a {kind} and cannot own other elements")]
    InvalidOwner {
        /// The owner name.
        name: String,
        /// Its kind.
        kind: ElementKind,
    },

    /// The server accepted the commit, but the local view could not be
    /// rebuilt from it. The view still shows the previous commit.
    #[error("commit {commit} was accepted but could not be loaded")]
    Resync {
        /// The accepted commit.
        commit: CommitId,
        /// Why it could not be loaded.
        #[source]
        source: Box<Self>,
    },

    /// A cascading delete was rejected part way through. The elements in
    /// `deleted` are gone on the server; the view still shows the commit the
    /// delete started from.
    #[error("delete stopped after removing {} element(s)", .deleted.len())]
    CascadeInterrupted {
        /// Keys of the elements already removed, in removal order.
        deleted: Vec<String>,
        /// The last commit the server accepted.
        last_commit: CommitId,
        /// The rejection.
        #[source]
        source: ApiError,
    },
}

/// All projects on the server, ordered by name.
///
/// # Errors
///
/// [`ProjectError::Api`] if the list cannot be retrieved.
pub fn list_projects(api: &impl ModelApi) -> Result<Vec<ProjectInfo>, ProjectError> {
    let mut projects = api.projects()?;
    projects.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.as_str().cmp(b.id.as_str())));
    Ok(projects)
}

fn resolve_project(projects: &[ProjectInfo], selector: &ProjectSelector) -> Result<ProjectInfo, ProjectError> {
    let by_name = |name: &str| {
        let matches: Vec<_> = projects.iter().filter(|p| p.name == name).collect();
        match matches.as_slice() {
            [] => Err(ProjectError::ProjectNotFound(name.to_string())),
            [project] => Ok((*project).clone()),
            _ => Err(ProjectError::DuplicateProjectName {
                name: name.to_string(),
                count: matches.len(),
            }),
        }
    };
    let by_id = |id: &str| projects.iter().find(|p| p.id.as_str() == id).cloned();

    match selector {
        ProjectSelector::Id(id) => {
            by_id(id.as_str()).ok_or_else(|| ProjectError::ProjectNotFound(id.to_string()))
        }
        ProjectSelector::Name(name) => by_name(name),
        ProjectSelector::Index(index) => projects
            .get(*index)
            .cloned()
            .ok_or_else(|| ProjectError::ProjectNotFound(format!("#{index}"))),
        ProjectSelector::IdOrName(text) => by_id(text).map_or_else(|| by_name(text), Ok),
    }
}

fn fetch_commits(api: &impl ModelApi, project: &ProjectId) -> Result<Vec<CommitInfo>, ProjectError> {
    let mut commits = api.commits(project)?;
    sort_newest_first(&mut commits);
    Ok(commits)
}

fn load(
    api: &impl ModelApi,
    project: &ProjectId,
    commit: &CommitId,
) -> Result<(Snapshot, ElementTree), ProjectError> {
    let snapshot = ElementStore::new(api).refresh(project, commit)?;
    let tree = ElementTree::build(&snapshot)?;
    Ok((snapshot, tree))
}

impl<A: ModelApi> Project<A> {
    /// Opens a project at its most recent commit.
    ///
    /// # Errors
    ///
    /// Fails if no single project matches, if it has no commits, or if the
    /// latest commit cannot be loaded into a tree.
    #[instrument(skip(api))]
    pub fn open(api: A, selector: &ProjectSelector) -> Result<Self, ProjectError> {
        let projects = list_projects(&api)?;
        let info = resolve_project(&projects, selector)?;
        let commits = fetch_commits(&api, &info.id)?;
        let latest = commits
            .first()
            .ok_or_else(|| ProjectError::NoCommits(info.id.clone()))?
            .id
            .clone();
        let (snapshot, tree) = load(&api, &info.id, &latest)?;

        info!(project = %info.name, commit = %latest, elements = snapshot.len(), "opened project");
        Ok(Self {
            api,
            info,
            commits,
            snapshot,
            tree,
        })
    }

    /// Creates a project and opens it.
    ///
    /// The project starts with one commit holding comments for its name,
    /// description and creation time, and a root part named [`ROOT_PART`].
    ///
    /// # Errors
    ///
    /// [`ProjectError::NameInUse`] if another project already has the name
    /// and duplicates are rejected, otherwise any failure of the server.
    #[instrument(skip(api))]
    pub fn create(
        api: A,
        name: &str,
        description: &str,
        duplicates: DuplicateNames,
    ) -> Result<Self, ProjectError> {
        if duplicates == DuplicateNames::Reject && api.projects()?.iter().any(|p| p.name == name) {
            return Err(ProjectError::NameInUse(name.to_string()));
        }

        let info = api.create_project(name, description)?;
        let created = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let request = CommitRequest {
            previous: None,
            changes: vec![
                Change::create(Payload::comment(format!("Project Name: {name}"))),
                Change::create(Payload::comment(format!("Project Description: {description}"))),
                Change::create(Payload::comment(format!("Created: {created}"))),
                Change::create(Payload::part(ROOT_PART, None)),
            ],
        };
        let commit = api.commit(&info.id, &request)?;
        info!(project = %info.id, %commit, "created project");

        Self::open(api, &ProjectSelector::Id(info.id))
    }

    /// The project identity.
    #[must_use]
    pub const fn info(&self) -> &ProjectInfo {
        &self.info
    }

    /// The API this project talks through.
    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Commit history, newest first, as of the last refresh.
    #[must_use]
    pub fn commits(&self) -> &[CommitInfo] {
        &self.commits
    }

    /// The commit the view shows.
    #[must_use]
    pub const fn current_commit(&self) -> &CommitId {
        self.snapshot.commit()
    }

    /// The newest known commit.
    #[must_use]
    pub fn latest_commit(&self) -> Option<&CommitId> {
        self.commits.first().map(|c| &c.id)
    }

    /// The elements of the current commit.
    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// The hierarchy of the current commit.
    #[must_use]
    pub const fn current_tree(&self) -> &ElementTree {
        &self.tree
    }

    /// Reloads the commit history and the current commit.
    ///
    /// # Errors
    ///
    /// Any failure to fetch or rebuild. The view is left unchanged.
    pub fn refresh(&mut self) -> Result<TreeDiff, ProjectError> {
        let commit = self.current_commit().clone();
        self.sync_to(&commit)
    }

    /// Switches the view to another commit.
    ///
    /// # Errors
    ///
    /// [`ProjectError::CommitNotFound`] if the selector matches nothing,
    /// otherwise any failure to fetch or rebuild. The view is left unchanged.
    #[instrument(skip(self), fields(project = %self.info.name))]
    pub fn select_commit(&mut self, selector: &CommitSelector) -> Result<&CommitId, ProjectError> {
        let commits = fetch_commits(&self.api, &self.info.id)?;
        let commit = match selector {
            CommitSelector::Index(index) => commits.get(*index),
            CommitSelector::Id(id) => commits.iter().find(|c| &c.id == id),
        }
        .map(|c| c.id.clone())
        .ok_or_else(|| {
            ProjectError::CommitNotFound(match selector {
                CommitSelector::Index(index) => format!("#{index}"),
                CommitSelector::Id(id) => id.to_string(),
            })
        })?;

        let (snapshot, tree) = load(&self.api, &self.info.id, &commit)?;
        self.replace(commits, snapshot, tree);
        Ok(self.current_commit())
    }

    /// Switches the view to the newest commit.
    ///
    /// # Errors
    ///
    /// See [`Project::select_commit`].
    pub fn select_most_recent_commit(&mut self) -> Result<&CommitId, ProjectError> {
        self.select_commit(&CommitSelector::Index(0))
    }

    /// Looks up the element an edit refers to.
    ///
    /// Comments are not addressable.
    ///
    /// # Errors
    ///
    /// [`ProjectError::ElementNotFound`] if nothing matches and
    /// [`ProjectError::DuplicateName`] if a name matches several elements.
    pub fn resolve(&self, target: &ElementRef) -> Result<&Element, ProjectError> {
        let not_found = || ProjectError::ElementNotFound(target.clone());
        match target {
            ElementRef::Id(id) => self
                .snapshot
                .get(id)
                .filter(|e| e.kind != ElementKind::Comment)
                .ok_or_else(not_found),
            ElementRef::Name(name) => {
                let mut matches = self.named(name);
                match matches.len() {
                    0 => Err(not_found()),
                    1 => Ok(matches.remove(0)),
                    _ => {
                        let ids = matches.iter().map(|e| e.id.clone()).collect();
                        Err(ProjectError::DuplicateName {
                            name: name.clone(),
                            candidates: NonEmpty::from_vec(ids).ok_or_else(not_found)?,
                        })
                    }
                }
            }
        }
    }

    fn named(&self, name: &str) -> Vec<&Element> {
        self.snapshot
            .find_by_name(name)
            .into_iter()
            .filter(|e| e.kind != ElementKind::Comment)
            .collect()
    }

    fn resolve_kind(&self, target: &ElementRef, expected: &ElementKind) -> Result<&Element, ProjectError> {
        let element = self.resolve(target)?;
        if &element.kind != expected {
            return Err(ProjectError::WrongKind {
                name: element.name.clone(),
                expected: expected.clone(),
                found: element.kind.clone(),
            });
        }
        Ok(element)
    }

    fn resolve_owner(&self, owner: &ElementRef) -> Result<&Element, ProjectError> {
        let element = self.resolve(owner)?;
        if !element.kind.can_own() {
            return Err(ProjectError::InvalidOwner {
                name: element.name.clone(),
                kind: element.kind.clone(),
            });
        }
        Ok(element)
    }

    fn check_name(&self, name: &str, duplicates: DuplicateNames) -> Result<(), ProjectError> {
        if duplicates == DuplicateNames::Reject && !self.named(name).is_empty() {
            return Err(ProjectError::NameInUse(name.to_string()));
        }
        Ok(())
    }

    /// Rejects moving `element` under itself or one of its descendants.
    fn check_reparent(&self, element: &Element, owner: &Element) -> Result<(), ProjectError> {
        let (Some(key), Some(owner_key)) = (
            self.snapshot.key_of(&element.id),
            self.snapshot.key_of(&owner.id),
        ) else {
            return Ok(());
        };

        let mut chain = vec![owner_key.to_string()];
        let mut current = owner_key;
        loop {
            if current == key {
                chain.reverse();
                return Err(TreeError::CyclicOwnership { cycle: chain }.into());
            }
            match self.tree.parent(current) {
                Some(parent) => {
                    current = parent.key();
                    chain.push(current.to_string());
                }
                None => return Ok(()),
            }
        }
    }

    /// Creates an element.
    ///
    /// # Errors
    ///
    /// Local checks fail before anything is sent: the owner must exist and be
    /// able to own, the name must be free unless duplicates are allowed and a
    /// part without owner is only accepted while the tree is empty. Server
    /// failures leave the view unchanged.
    #[instrument(skip(self), fields(project = %self.info.name))]
    pub fn apply_create(&mut self, create: &Create, duplicates: DuplicateNames) -> Result<Applied, ProjectError> {
        let payload = match create {
            Create::Part { name, owner } => {
                let owner = match owner {
                    Some(owner) => Some(self.resolve_owner(owner)?.id.clone()),
                    None => {
                        if let Some(root) = self.tree.root() {
                            let mut roots = vec![root.key().to_string(), name.clone()];
                            roots.sort();
                            return Err(TreeError::AmbiguousRoot { roots }.into());
                        }
                        None
                    }
                };
                Payload::part(name.clone(), owner)
            }
            Create::Attribute { attribute, owner } => {
                Payload::attribute(attribute, self.resolve_owner(owner)?.id.clone())
            }
            Create::Requirement {
                name,
                description,
                owner,
            } => Payload::requirement(name.clone(), description.clone(), self.resolve_owner(owner)?.id.clone()),
        };
        self.check_name(&payload.name, duplicates)?;

        let applied = self.submit(vec![Change::create(payload)])?;
        info!(commit = %applied.commit, added = ?applied.diff.added, "created element");
        Ok(applied)
    }

    /// Changes an existing element. Owner and description are kept unless
    /// the edit replaces them.
    ///
    /// # Errors
    ///
    /// Local checks fail before anything is sent: the target must resolve to
    /// exactly one element of the right kind, a new name (or new attribute
    /// text) must be free unless duplicates are allowed and a new owner must be able to own and must not
    /// be the part itself or one of its descendants. Server failures leave the
    /// view unchanged.
    #[instrument(skip(self), fields(project = %self.info.name))]
    pub fn apply_update(&mut self, update: &Update, duplicates: DuplicateNames) -> Result<Applied, ProjectError> {
        let (id, payload) = match update {
            Update::Part { target, name, owner } => {
                let element = self.resolve_kind(target, &ElementKind::Part)?;
                let mut payload = element.payload();
                if let Some(name) = name.as_ref().filter(|name| **name != element.name) {
                    self.check_name(name, duplicates)?;
                    payload.name.clone_from(name);
                }
                if let Some(owner) = owner {
                    let owner = self.resolve_owner(owner)?;
                    self.check_reparent(element, owner)?;
                    payload.owner = Some(owner.id.clone());
                }
                (element.id.clone(), payload)
            }
            Update::Attribute { target, value } => {
                let element = self.resolve_kind(target, &ElementKind::Attribute)?;
                let attribute = element.attribute().unwrap_or_else(|| element.name.parse())?;
                let name = attribute.with_value(value.as_str()).to_string();
                if name != element.name {
                    self.check_name(&name, duplicates)?;
                }
                let mut payload = element.payload();
                payload.name = name;
                (element.id.clone(), payload)
            }
            Update::Requirement {
                target,
                name,
                description,
            } => {
                let element = self.resolve_kind(target, &ElementKind::Requirement)?;
                let mut payload = element.payload();
                if let Some(name) = name.as_ref().filter(|name| **name != element.name) {
                    self.check_name(name, duplicates)?;
                    payload.name.clone_from(name);
                }
                if let Some(description) = description {
                    payload.description = Some(description.clone());
                }
                (element.id.clone(), payload)
            }
        };

        let applied = self.submit(vec![Change::update(id, payload)])?;
        info!(commit = %applied.commit, changed = ?applied.diff.changed, "updated element");
        Ok(applied)
    }

    /// Deletes an element and, first, everything it transitively owns.
    ///
    /// Each element is removed by its own commit, deepest first, so that no
    /// commit ever holds an element whose owner is gone.
    ///
    /// # Errors
    ///
    /// Local checks fail before anything is sent. If the server rejects the
    /// first deletion the error is [`ProjectError::Api`]; if it rejects a
    /// later one the error is [`ProjectError::CascadeInterrupted`]. In both
    /// cases the view is left unchanged.
    #[instrument(skip(self), fields(project = %self.info.name))]
    pub fn apply_delete(&mut self, delete: &Delete) -> Result<Applied, ProjectError> {
        let element = match &delete.kind {
            Some(kind) => self.resolve_kind(&delete.target, kind)?,
            None => self.resolve(&delete.target)?,
        };
        // Comments are outside the tree but may still be owned.
        let doomed: Vec<(String, ElementId)> = self
            .snapshot
            .owned_by(&element.id)
            .into_iter()
            .chain(std::iter::once(element))
            .map(|e| {
                let key = self.snapshot.key_of(&e.id).unwrap_or(e.name.as_str());
                (key.to_string(), e.id.clone())
            })
            .collect();
        debug!(count = doomed.len(), "deleting subtree");

        let mut head = self.current_commit().clone();
        let mut deleted = Vec::with_capacity(doomed.len());
        for (key, id) in doomed {
            let request = CommitRequest {
                previous: Some(head.clone()),
                changes: vec![Change::delete(id)],
            };
            match self.api.commit(&self.info.id, &request) {
                Ok(commit) => {
                    debug!(%key, %commit, "deleted element");
                    head = commit;
                    deleted.push(key);
                }
                Err(source) if deleted.is_empty() => return Err(source.into()),
                Err(source) => {
                    warn!(deleted = deleted.len(), "delete interrupted");
                    return Err(ProjectError::CascadeInterrupted {
                        deleted,
                        last_commit: head,
                        source,
                    });
                }
            }
        }

        let applied = self.adopt(head)?;
        info!(commit = %applied.commit, removed = ?applied.diff.removed, "deleted element");
        Ok(applied)
    }

    /// Creates a part.
    ///
    /// # Errors
    ///
    /// See [`Project::apply_create`].
    pub fn create_part(
        &mut self,
        name: &str,
        owner: Option<ElementRef>,
        duplicates: DuplicateNames,
    ) -> Result<Applied, ProjectError> {
        let create = Create::Part {
            name: name.to_string(),
            owner,
        };
        self.apply_create(&create, duplicates)
    }

    /// Renames and/or moves a part.
    ///
    /// # Errors
    ///
    /// See [`Project::apply_update`].
    pub fn update_part(
        &mut self,
        target: ElementRef,
        name: Option<String>,
        owner: Option<ElementRef>,
    ) -> Result<Applied, ProjectError> {
        self.apply_update(&Update::Part { target, name, owner }, DuplicateNames::Reject)
    }

    /// Deletes a part and everything it owns.
    ///
    /// # Errors
    ///
    /// See [`Project::apply_delete`].
    pub fn delete_part(&mut self, target: ElementRef) -> Result<Applied, ProjectError> {
        self.apply_delete(&Delete {
            target,
            kind: Some(ElementKind::Part),
        })
    }

    /// Adds an attribute to a part.
    ///
    /// # Errors
    ///
    /// See [`Project::apply_create`].
    pub fn add_attribute(
        &mut self,
        attribute: Attribute,
        owner: ElementRef,
        duplicates: DuplicateNames,
    ) -> Result<Applied, ProjectError> {
        self.apply_create(&Create::Attribute { attribute, owner }, duplicates)
    }

    /// Sets the value of an attribute.
    ///
    /// The attribute text changes with its value, so the new text must be
    /// free like any other new name.
    ///
    /// # Errors
    ///
    /// See [`Project::apply_update`].
    pub fn update_attribute(&mut self, target: ElementRef, value: &str) -> Result<Applied, ProjectError> {
        let update = Update::Attribute {
            target,
            value: value.to_string(),
        };
        self.apply_update(&update, DuplicateNames::Reject)
    }

    /// Removes an attribute.
    ///
    /// # Errors
    ///
    /// See [`Project::apply_delete`].
    pub fn remove_attribute(&mut self, target: ElementRef) -> Result<Applied, ProjectError> {
        self.apply_delete(&Delete {
            target,
            kind: Some(ElementKind::Attribute),
        })
    }

    /// Attaches a requirement to a part.
    ///
    /// # Errors
    ///
    /// See [`Project::apply_create`].
    pub fn create_requirement(
        &mut self,
        name: &str,
        description: &str,
        owner: ElementRef,
        duplicates: DuplicateNames,
    ) -> Result<Applied, ProjectError> {
        let create = Create::Requirement {
            name: name.to_string(),
            description: description.to_string(),
            owner,
        };
        self.apply_create(&create, duplicates)
    }

    /// Renames a requirement and/or rewrites its text.
    ///
    /// # Errors
    ///
    /// See [`Project::apply_update`].
    pub fn update_requirement(
        &mut self,
        target: ElementRef,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Applied, ProjectError> {
        let update = Update::Requirement {
            target,
            name,
            description,
        };
        self.apply_update(&update, DuplicateNames::Reject)
    }

    /// Deletes a requirement.
    ///
    /// # Errors
    ///
    /// See [`Project::apply_delete`].
    pub fn delete_requirement(&mut self, target: ElementRef) -> Result<Applied, ProjectError> {
        self.apply_delete(&Delete {
            target,
            kind: Some(ElementKind::Requirement),
        })
    }

    fn submit(&mut self, changes: Vec<Change>) -> Result<Applied, ProjectError> {
        let request = CommitRequest {
            previous: Some(self.current_commit().clone()),
            changes,
        };
        let commit = self.api.commit(&self.info.id, &request)?;
        self.adopt(commit)
    }

    /// Moves the view to a commit the server has just accepted.
    fn adopt(&mut self, commit: CommitId) -> Result<Applied, ProjectError> {
        match self.sync_to(&commit) {
            Ok(diff) => Ok(Applied { commit, diff }),
            Err(source) => {
                warn!(%commit, error = %source, "accepted commit could not be loaded");
                Err(ProjectError::Resync {
                    commit,
                    source: Box::new(source),
                })
            }
        }
    }

    fn sync_to(&mut self, commit: &CommitId) -> Result<TreeDiff, ProjectError> {
        let commits = fetch_commits(&self.api, &self.info.id)?;
        let (snapshot, tree) = load(&self.api, &self.info.id, commit)?;
        let diff = self.tree.diff(&tree);
        self.replace(commits, snapshot, tree);
        Ok(diff)
    }

    fn replace(&mut self, commits: Vec<CommitInfo>, snapshot: Snapshot, tree: ElementTree) {
        self.commits = commits;
        self.snapshot = snapshot;
        self.tree = tree;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryApi;

    fn part(id: &str, name: &str, owner: Option<&str>) -> Element {
        Payload::part(name, owner.map(ElementId::new)).into_element(ElementId::new(id))
    }

    fn attribute(id: &str, name: &str, value: &str, owner: &str) -> Element {
        Payload::attribute(&Attribute::new(name, value).unwrap(), ElementId::new(owner))
            .into_element(ElementId::new(id))
    }

    /// Root Part -> Wheel -> {mass: 5, Hub}; Root Part -> Body.
    fn vehicle(api: &MemoryApi) -> Project<&MemoryApi> {
        api.seed_project(
            "vehicle",
            vec![
                part("1", "Root Part", None),
                part("2", "Wheel", Some("1")),
                attribute("3", "mass", "5", "2"),
                part("4", "Hub", Some("2")),
                part("5", "Body", Some("1")),
            ],
        );
        Project::open(api, &ProjectSelector::Name("vehicle".to_string())).unwrap()
    }

    fn keys(project: &Project<&MemoryApi>) -> Vec<String> {
        let mut keys: Vec<_> = project
            .current_tree()
            .iter()
            .map(|n| n.key().to_string())
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn new_project_starts_with_comments_and_root_part() {
        let api = MemoryApi::new();

        let project = Project::create(&api, "demo", "a demo", DuplicateNames::Reject).unwrap();

        assert_eq!(project.info().name, "demo");
        assert_eq!(project.commits().len(), 1);
        assert_eq!(project.current_tree().root().unwrap().key(), ROOT_PART);
        assert_eq!(project.current_tree().len(), 1);

        let comments: Vec<_> = project
            .snapshot()
            .of_kind(&ElementKind::Comment)
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(comments.len(), 3);
        assert_eq!(comments[0], "Project Name: demo");
        assert_eq!(comments[1], "Project Description: a demo");
        assert!(comments[2].starts_with("Created: "));
    }

    #[test]
    fn duplicate_project_name_is_rejected_unless_allowed() {
        let api = MemoryApi::new();
        Project::create(&api, "demo", "", DuplicateNames::Reject).unwrap();

        let err = Project::create(&api, "demo", "", DuplicateNames::Reject).unwrap_err();
        assert_eq!(err, ProjectError::NameInUse("demo".to_string()));

        Project::create(&api, "demo", "", DuplicateNames::Allow).unwrap();
        let err = Project::open(&api, &ProjectSelector::Name("demo".to_string())).unwrap_err();
        assert_eq!(
            err,
            ProjectError::DuplicateProjectName {
                name: "demo".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn projects_are_listed_by_name_and_selectable_by_index() {
        let api = MemoryApi::new();
        api.seed_project("zeta", vec![part("1", "Root Part", None)]);
        let (alpha, _) = api.seed_project("alpha", vec![part("1", "Root Part", None)]);

        let names: Vec<_> = list_projects(&api).unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["alpha", "zeta"]);

        let project = Project::open(&api, &ProjectSelector::Index(0)).unwrap();
        assert_eq!(project.info().id, alpha);

        let project = Project::open(&api, &ProjectSelector::IdOrName(alpha.to_string())).unwrap();
        assert_eq!(project.info().name, "alpha");

        let err = Project::open(&api, &ProjectSelector::Index(5)).unwrap_err();
        assert!(matches!(err, ProjectError::ProjectNotFound(_)));
    }

    #[test]
    fn project_without_commits_cannot_be_opened() {
        let api = MemoryApi::new();
        let info = api.create_project("empty", "").unwrap();

        let err = Project::open(&api, &ProjectSelector::Id(info.id.clone())).unwrap_err();
        assert_eq!(err, ProjectError::NoCommits(info.id));
    }

    #[test]
    fn two_roots_fail_to_open() {
        let api = MemoryApi::new();
        api.seed_project("broken", vec![part("1", "A", None), part("2", "B", None)]);

        let err = Project::open(&api, &ProjectSelector::Index(0)).unwrap_err();
        assert_eq!(
            err,
            ProjectError::Tree(TreeError::AmbiguousRoot {
                roots: vec!["A".to_string(), "B".to_string()]
            })
        );
    }

    #[test]
    fn created_part_appears_under_its_owner() {
        let api = MemoryApi::new();
        let mut project = Project::create(&api, "demo", "", DuplicateNames::Reject).unwrap();
        let before = project.current_commit().clone();

        let applied = project
            .create_part("Wheel", Some(ElementRef::name(ROOT_PART)), DuplicateNames::Reject)
            .unwrap();

        assert_ne!(applied.commit, before);
        assert_eq!(project.current_commit(), &applied.commit);
        assert_eq!(project.latest_commit(), Some(&applied.commit));
        assert_eq!(applied.diff.added, ["Wheel"]);
        assert_eq!(
            project.current_tree().parent("Wheel").unwrap().key(),
            ROOT_PART
        );
    }

    #[test]
    fn duplicate_name_leaves_state_unchanged() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);
        let commit = project.current_commit().clone();
        let snapshot = project.snapshot().clone();

        let err = project
            .create_part("Wheel", Some(ElementRef::name(ROOT_PART)), DuplicateNames::Reject)
            .unwrap_err();

        assert_eq!(err, ProjectError::NameInUse("Wheel".to_string()));
        assert_eq!(project.current_commit(), &commit);
        assert_eq!(project.snapshot(), &snapshot);
        assert_eq!(api.commits(&project.info().id).unwrap().len(), 1);
    }

    #[test]
    fn allowed_duplicates_get_qualified_keys_and_need_an_id() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);

        project
            .create_part("Wheel", Some(ElementRef::name(ROOT_PART)), DuplicateNames::Allow)
            .unwrap();

        assert!(!project.current_tree().contains("Wheel"));
        assert!(project.current_tree().contains("Wheel#2"));

        let err = project.delete_part(ElementRef::name("Wheel")).unwrap_err();
        assert!(matches!(err, ProjectError::DuplicateName { ref candidates, .. } if candidates.len() == 2));

        project.delete_part(ElementRef::id("2")).unwrap();
        assert_eq!(project.current_tree().children(ROOT_PART).len(), 2);
        assert!(project.current_tree().contains("Wheel"));
    }

    #[test]
    fn missing_owner_is_rejected_before_commit() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);

        let err = project
            .create_part("Spoke", Some(ElementRef::name("Rim")), DuplicateNames::Reject)
            .unwrap_err();

        assert_eq!(err, ProjectError::ElementNotFound(ElementRef::name("Rim")));
        assert_eq!(api.commits(&project.info().id).unwrap().len(), 1);
    }

    #[test]
    fn attributes_cannot_own() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);

        let err = project
            .create_part("Spoke", Some(ElementRef::name("mass: 5")), DuplicateNames::Reject)
            .unwrap_err();

        assert!(matches!(err, ProjectError::InvalidOwner { kind: ElementKind::Attribute, .. }));
    }

    #[test]
    fn second_root_is_rejected_before_commit() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);

        let err = project.create_part("Other", None, DuplicateNames::Reject).unwrap_err();

        assert!(matches!(err, ProjectError::Tree(TreeError::AmbiguousRoot { .. })));
        assert_eq!(api.commits(&project.info().id).unwrap().len(), 1);
    }

    #[test]
    fn attribute_update_keeps_name_and_owner() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);

        let applied = project
            .update_attribute(ElementRef::name("mass: 5"), "7")
            .unwrap();

        assert_eq!(applied.diff.removed, ["mass: 5"]);
        assert_eq!(applied.diff.added, ["mass: 7"]);
        let node = project.current_tree().get("mass: 7").unwrap();
        assert_eq!(node.label(), "Attribute:\n mass: 7");
        assert_eq!(project.current_tree().parent("mass: 7").unwrap().key(), "Wheel");
        assert_eq!(node.element(), &ElementId::new("3"));
    }

    #[test]
    fn requirement_update_keeps_owner_and_untouched_fields() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);
        project
            .create_requirement("R1", "shall roll", ElementRef::name("Wheel"), DuplicateNames::Reject)
            .unwrap();

        let applied = project
            .update_requirement(ElementRef::name("R1"), None, Some("shall roll quietly".to_string()))
            .unwrap();

        assert_eq!(applied.diff.changed, ["R1"]);
        let node = project.current_tree().get("R1").unwrap();
        assert_eq!(node.label(), "Requirement:\n R1\n shall roll quietly");
        assert_eq!(project.current_tree().parent("R1").unwrap().key(), "Wheel");
    }

    #[test]
    fn part_can_be_renamed_and_moved() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);

        project
            .update_part(
                ElementRef::name("Hub"),
                Some("Axle".to_string()),
                Some(ElementRef::name("Body")),
            )
            .unwrap();

        let tree = project.current_tree();
        assert!(!tree.contains("Hub"));
        assert_eq!(tree.parent("Axle").unwrap().key(), "Body");
    }

    #[test]
    fn part_cannot_move_under_its_own_descendant() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);

        let err = project
            .update_part(ElementRef::name("Wheel"), None, Some(ElementRef::name("Hub")))
            .unwrap_err();

        assert_eq!(
            err,
            ProjectError::Tree(TreeError::CyclicOwnership {
                cycle: vec!["Wheel".to_string(), "Hub".to_string()]
            })
        );
        assert_eq!(api.commits(&project.info().id).unwrap().len(), 1);

        let err = project
            .update_part(ElementRef::name("Wheel"), None, Some(ElementRef::name("Wheel")))
            .unwrap_err();
        assert!(matches!(err, ProjectError::Tree(TreeError::CyclicOwnership { .. })));
    }

    #[test]
    fn edits_check_the_element_kind() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);

        let err = project.update_attribute(ElementRef::name("Wheel"), "1").unwrap_err();
        assert_eq!(
            err,
            ProjectError::WrongKind {
                name: "Wheel".to_string(),
                expected: ElementKind::Attribute,
                found: ElementKind::Part,
            }
        );

        let err = project.delete_requirement(ElementRef::name("Hub")).unwrap_err();
        assert!(matches!(err, ProjectError::WrongKind { .. }));
    }

    #[test]
    fn delete_cascades_one_commit_per_element() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);

        let applied = project.delete_part(ElementRef::name("Wheel")).unwrap();

        let mut removed = applied.diff.removed.clone();
        removed.sort();
        assert_eq!(removed, ["Hub", "Wheel", "mass: 5"]);
        assert_eq!(keys(&project), ["Body", ROOT_PART]);
        assert_eq!(project.commits().len(), 4);

        let stored = api.elements(&project.info().id, &applied.commit).unwrap();
        assert!(Snapshot::new(applied.commit, stored).is_ok());
    }

    #[test]
    fn attribute_value_cannot_collide_with_another_attribute() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);
        project
            .add_attribute(Attribute::new("mass", "7").unwrap(), ElementRef::name("Body"), DuplicateNames::Reject)
            .unwrap();
        let commit = project.current_commit().clone();

        let err = project
            .update_attribute(ElementRef::name("mass: 5"), "7")
            .unwrap_err();

        assert_eq!(err, ProjectError::NameInUse("mass: 7".to_string()));
        assert_eq!(project.current_commit(), &commit);

        // Setting the value it already has is not a clash.
        project.update_attribute(ElementRef::name("mass: 5"), "5").unwrap();
    }

    #[test]
    fn delete_removes_owned_comments() {
        let api = MemoryApi::new();
        let note = Payload {
            kind: ElementKind::Comment,
            name: "note on wheel".to_string(),
            owner: Some(ElementId::new("2")),
            description: None,
        }
        .into_element(ElementId::new("6"));
        api.seed_project(
            "annotated",
            vec![part("1", "Root Part", None), part("2", "Wheel", Some("1")), note],
        );
        let mut project = Project::open(&api, &ProjectSelector::Name("annotated".to_string())).unwrap();

        let applied = project.delete_part(ElementRef::name("Wheel")).unwrap();

        assert_eq!(applied.diff.removed, ["Wheel"]);
        assert_eq!(project.commits().len(), 3);
        assert_eq!(project.snapshot().len(), 1);

        let reopened = Project::open(&api, &ProjectSelector::Name("annotated".to_string())).unwrap();
        assert_eq!(reopened.current_commit(), &applied.commit);
    }

    #[test]
    fn accepted_commit_that_cannot_be_loaded_leaves_state_unchanged() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);
        let commit = project.current_commit().clone();
        let snapshot = project.snapshot().clone();
        api.withhold_elements();

        let err = project
            .create_part("Door", Some(ElementRef::name("Body")), DuplicateNames::Reject)
            .unwrap_err();

        let ProjectError::Resync { commit: accepted, source } = err else {
            panic!("expected a resync failure");
        };
        assert!(matches!(*source, ProjectError::Store(_)));
        assert_eq!(project.current_commit(), &commit);
        assert_eq!(project.snapshot(), &snapshot);
        assert!(!project.current_tree().contains("Door"));

        api.serve_elements();
        project.select_commit(&CommitSelector::Id(accepted.clone())).unwrap();
        assert_eq!(project.current_commit(), &accepted);
        assert!(project.current_tree().contains("Door"));
    }

    #[test]
    fn failed_commit_leaves_state_unchanged() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);
        let commit = project.current_commit().clone();
        api.reject_commits_after(0);

        let err = project.remove_attribute(ElementRef::name("mass: 5")).unwrap_err();

        assert!(matches!(err, ProjectError::Api(ApiError::Commit { .. })));
        assert_eq!(project.current_commit(), &commit);
        assert!(project.current_tree().contains("mass: 5"));
    }

    #[test]
    fn interrupted_cascade_reports_progress() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);
        let commit = project.current_commit().clone();
        api.reject_commits_after(1);

        let err = project.delete_part(ElementRef::name("Wheel")).unwrap_err();

        let ProjectError::CascadeInterrupted {
            deleted,
            last_commit,
            ..
        } = err
        else {
            panic!("expected an interrupted cascade");
        };
        assert_eq!(deleted.len(), 1);
        assert_ne!(last_commit, commit);
        assert_eq!(project.current_commit(), &commit);
        assert_eq!(project.current_tree().len(), 5);

        api.accept_commits();
        project.select_most_recent_commit().unwrap();
        assert_eq!(project.current_commit(), &last_commit);
        assert_eq!(project.current_tree().len(), 4);
    }

    #[test]
    fn older_commits_can_be_selected() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);
        let first = project.current_commit().clone();
        project
            .create_part("Door", Some(ElementRef::name("Body")), DuplicateNames::Reject)
            .unwrap();

        project.select_commit(&CommitSelector::Index(1)).unwrap();
        assert_eq!(project.current_commit(), &first);
        assert!(!project.current_tree().contains("Door"));

        project.select_most_recent_commit().unwrap();
        assert!(project.current_tree().contains("Door"));

        let err = project
            .select_commit(&CommitSelector::Id(CommitId::new("nope")))
            .unwrap_err();
        assert_eq!(err, ProjectError::CommitNotFound("nope".to_string()));
    }

    #[test]
    fn edits_on_an_older_commit_branch_from_it() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);
        project
            .create_part("Door", Some(ElementRef::name("Body")), DuplicateNames::Reject)
            .unwrap();
        project.select_commit(&CommitSelector::Index(1)).unwrap();

        project
            .create_part("Trunk", Some(ElementRef::name("Body")), DuplicateNames::Reject)
            .unwrap();

        assert!(project.current_tree().contains("Trunk"));
        assert!(!project.current_tree().contains("Door"));
    }

    #[test]
    fn refresh_reports_no_change_when_nothing_moved() {
        let api = MemoryApi::new();
        let mut project = vehicle(&api);

        let diff = project.refresh().unwrap();

        assert!(diff.is_empty());
    }
}
