//! The flat element collection of a single commit.
//!
//! A [`Snapshot`] is validated on construction: every owner reference
//! resolves inside the collection. It also assigns each hierarchy element
//! the key it is known by in the [`ElementTree`](crate::ElementTree).

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::{
    commit::CommitId,
    element::{Element, ElementId, ElementKind},
};

/// The materialised element list of one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    commit: CommitId,
    elements: Vec<Element>,
    /// Position of each element in `elements`.
    positions: HashMap<ElementId, usize>,
    /// Node key of every non-comment element.
    keys: HashMap<ElementId, String>,
    /// Reverse of `keys`.
    by_key: HashMap<String, ElementId>,
}

/// A snapshot whose references cannot be resolved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// Two elements share an identifier.
    #[error("element {0} appears more than once")]
    DuplicateId(ElementId),

    /// An owner reference points outside the snapshot.
    #[error("owner {owner} of element '{name}' ({id}) is not part of the snapshot")]
    MissingOwner {
        /// The owned element.
        id: ElementId,
        /// Its name.
        name: String,
        /// The dangling owner reference.
        owner: ElementId,
    },

    /// An owner reference points at a comment.
    #[error("element '{name}' ({id}) is owned by comment {owner}")]
    CommentOwner {
        /// The owned element.
        id: ElementId,
        /// Its name.
        name: String,
        /// The comment it claims as owner.
        owner: ElementId,
    },
}

impl Snapshot {
    /// Validates `elements` and indexes them.
    ///
    /// # Errors
    ///
    /// Fails if identifiers repeat, or if an owner reference does not resolve
    /// to a non-comment element of the same collection.
    pub fn new(commit: CommitId, elements: Vec<Element>) -> Result<Self, SnapshotError> {
        let mut positions = HashMap::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            if positions.insert(element.id.clone(), index).is_some() {
                return Err(SnapshotError::DuplicateId(element.id.clone()));
            }
        }

        for element in &elements {
            let Some(owner) = &element.owner else {
                continue;
            };
            match positions.get(owner).map(|&index| &elements[index]) {
                None => {
                    return Err(SnapshotError::MissingOwner {
                        id: element.id.clone(),
                        name: element.name.clone(),
                        owner: owner.clone(),
                    });
                }
                Some(found) if found.kind == ElementKind::Comment => {
                    return Err(SnapshotError::CommentOwner {
                        id: element.id.clone(),
                        name: element.name.clone(),
                        owner: owner.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        let keys = assign_keys(&elements);
        let by_key = keys
            .iter()
            .map(|(id, key)| (key.clone(), id.clone()))
            .collect();

        Ok(Self {
            commit,
            elements,
            positions,
            keys,
            by_key,
        })
    }

    /// A snapshot with no elements.
    #[must_use]
    pub fn empty(commit: CommitId) -> Self {
        Self {
            commit,
            elements: Vec::new(),
            positions: HashMap::new(),
            keys: HashMap::new(),
            by_key: HashMap::new(),
        }
    }

    /// The commit this snapshot was taken from.
    #[must_use]
    pub const fn commit(&self) -> &CommitId {
        &self.commit
    }

    /// Number of elements, comments included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the snapshot holds no elements at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All elements in the order the server returned them.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    /// All elements of the given kind.
    pub fn of_kind<'a>(&'a self, kind: &'a ElementKind) -> impl Iterator<Item = &'a Element> {
        self.elements.iter().filter(move |e| &e.kind == kind)
    }

    /// Looks an element up by identifier.
    #[must_use]
    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.positions.get(id).map(|&index| &self.elements[index])
    }

    /// The owner of an element, if it has one.
    #[must_use]
    pub fn owner_of(&self, id: &ElementId) -> Option<&Element> {
        self.get(id)?.owner.as_ref().and_then(|owner| self.get(owner))
    }

    /// Every element carrying exactly this name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Vec<&Element> {
        self.elements.iter().filter(|e| e.name == name).collect()
    }

    /// Everything `id` transitively owns, comments included. Every element
    /// comes after the elements it owns; `id` itself is not included.
    #[must_use]
    pub fn owned_by(&self, id: &ElementId) -> Vec<&Element> {
        let mut children: HashMap<&ElementId, Vec<&Element>> = HashMap::new();
        for element in &self.elements {
            if let Some(owner) = &element.owner {
                children.entry(owner).or_default().push(element);
            }
        }

        let mut owned = Vec::new();
        // (element, whether its children have been pushed)
        let mut stack: Vec<(&ElementId, bool)> = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                if current != id {
                    owned.extend(self.get(current));
                }
                continue;
            }
            stack.push((current, true));
            for child in children.get(current).into_iter().flatten().rev() {
                stack.push((&child.id, false));
            }
        }
        owned
    }

    /// The tree key of a non-comment element.
    #[must_use]
    pub fn key_of(&self, id: &ElementId) -> Option<&str> {
        self.keys.get(id).map(String::as_str)
    }

    /// The non-comment element known by this tree key.
    #[must_use]
    pub fn by_key(&self, key: &str) -> Option<&Element> {
        self.by_key.get(key).and_then(|id| self.get(id))
    }

    /// Ownerless non-comment elements, i.e. root candidates.
    #[must_use]
    pub fn roots(&self) -> Vec<&Element> {
        self.elements
            .iter()
            .filter(|e| e.kind != ElementKind::Comment && e.owner.is_none())
            .collect()
    }

    /// Elements ordered for listing: by type tag descending, then by name.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Element> {
        let mut elements: Vec<_> = self.elements.iter().collect();
        elements.sort_by(|a, b| {
            b.kind
                .type_tag()
                .cmp(a.kind.type_tag())
                .then_with(|| a.name.cmp(&b.name))
        });
        elements
    }
}

/// Names are keys unless they are shared. Every element whose key is claimed
/// more than once gets `#id` appended, repeatedly, until no two keys are
/// equal. A qualified key can only clash with another element's literal name
/// (`Wheel#2`), in which case both are qualified again.
///
/// The outcome depends only on the set of elements, not on their order.
fn assign_keys(elements: &[Element]) -> HashMap<ElementId, String> {
    let mut keys: HashMap<ElementId, String> = elements
        .iter()
        .filter(|e| e.kind != ElementKind::Comment)
        .map(|e| (e.id.clone(), e.name.clone()))
        .collect();

    loop {
        let clashing: Vec<ElementId> = {
            let mut claims: HashMap<&str, usize> = HashMap::new();
            for key in keys.values() {
                *claims.entry(key.as_str()).or_default() += 1;
            }
            keys.iter()
                .filter(|(_, key)| claims[key.as_str()] > 1)
                .map(|(id, _)| id.clone())
                .collect()
        };
        if clashing.is_empty() {
            return keys;
        }
        for id in clashing {
            if let Some(key) = keys.get_mut(&id) {
                key.push('#');
                key.push_str(id.as_str());
            }
        }
    }
}
