//! Hierarchical view of a [`Snapshot`].
//!
//! The [`ElementTree`] knows nothing about the network. It is rebuilt from a
//! snapshot by inserting every non-comment element, ancestors first. Owner
//! references may point at elements that come later in the snapshot, so each
//! insertion walks up the ownership chain until it reaches a node that is
//! already present (or a root) and then inserts the chain top-down.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    fmt::Write as _,
};

use petgraph::{
    Direction,
    stable_graph::{NodeIndex, StableDiGraph},
};
use thiserror::Error;
use tracing::instrument;

use crate::domain::{
    element::{Element, ElementId, ElementKind},
    snapshot::Snapshot,
};

/// A node of the reconstructed hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    key: String,
    label: String,
    element: ElementId,
    kind: ElementKind,
}

impl TreeNode {
    fn new(key: String, element: &Element) -> Self {
        Self {
            key,
            label: label_for(element),
            element: element.id.clone(),
            kind: element.kind.clone(),
        }
    }

    /// The node key: the element name, qualified with the id when the name is
    /// shared.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The display label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The element this node stands for.
    #[must_use]
    pub const fn element(&self) -> &ElementId {
        &self.element
    }

    /// The kind of the element.
    #[must_use]
    pub const fn kind(&self) -> &ElementKind {
        &self.kind
    }
}

fn label_for(element: &Element) -> String {
    match element.kind {
        ElementKind::Attribute => format!("Attribute:\n {}", element.name),
        ElementKind::Requirement => format!(
            "Requirement:\n {}\n {}",
            element.name,
            element.description.as_deref().unwrap_or_default()
        ),
        _ => element.name.clone(),
    }
}

/// Errors raised while reconstructing the hierarchy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// No hierarchy element is known by this key.
    #[error("no element with key '{0}' in the snapshot")]
    UnknownNode(String),

    /// Following owner references leads back to an element already on the
    /// chain.
    #[error("ownership cycle: {}", .cycle.join(" -> "))]
    CyclicOwnership {
        /// Keys of the elements on the cycle, starting from the smallest.
        cycle: Vec<String>,
    },

    /// More than one ownerless element.
    #[error("more than one root element: {}", .roots.join(", "))]
    AmbiguousRoot {
        /// Keys of the competing roots, sorted.
        roots: Vec<String>,
    },
}

/// Changes between two trees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDiff {
    /// Keys present only in the newer tree.
    pub added: Vec<String>,
    /// Keys present only in the older tree.
    pub removed: Vec<String>,
    /// Keys present in both whose label or parent differs.
    pub changed: Vec<String>,
}

impl TreeDiff {
    /// Whether the two trees are identical.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// A single-rooted hierarchy of model elements.
///
/// Edges point from parent to child.
#[derive(Debug, Clone, Default)]
pub struct ElementTree {
    graph: StableDiGraph<TreeNode, ()>,
    nodes: HashMap<String, NodeIndex>,
    root: Option<NodeIndex>,
}

impl ElementTree {
    /// Reconstructs the hierarchy of a snapshot.
    ///
    /// Elements are inserted in snapshot order. The resulting tree does not
    /// depend on that order.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::AmbiguousRoot`] if more than one non-comment
    /// element is ownerless and [`TreeError::CyclicOwnership`] if an element
    /// is transitively owned by itself.
    #[instrument(skip_all, fields(commit = %snapshot.commit(), elements = snapshot.len()))]
    pub fn build(snapshot: &Snapshot) -> Result<Self, TreeError> {
        let roots = snapshot.roots();
        if roots.len() > 1 {
            let mut roots: Vec<_> = roots
                .iter()
                .filter_map(|e| snapshot.key_of(&e.id))
                .map(str::to_string)
                .collect();
            roots.sort();
            return Err(TreeError::AmbiguousRoot { roots });
        }

        let mut tree = Self::default();
        for element in snapshot.iter().filter(|e| e.kind != ElementKind::Comment) {
            tree.insert_element(snapshot, element)?;
        }

        tracing::debug!(nodes = tree.len(), "built element tree");
        Ok(tree)
    }

    /// Inserts the element known by `key`, along with any missing ancestors.
    ///
    /// Inserting a key that is already present returns the existing node
    /// untouched. Comments are never inserted and yield `None`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::UnknownNode`] if the snapshot has no such element,
    /// [`TreeError::CyclicOwnership`] if its ownership chain loops and
    /// [`TreeError::AmbiguousRoot`] if the chain ends in a second root.
    pub fn insert(&mut self, snapshot: &Snapshot, key: &str) -> Result<Option<&TreeNode>, TreeError> {
        let Some(element) = snapshot.by_key(key) else {
            let is_comment = snapshot
                .of_kind(&ElementKind::Comment)
                .any(|comment| comment.name == key);
            return if is_comment {
                Ok(None)
            } else {
                Err(TreeError::UnknownNode(key.to_string()))
            };
        };

        let index = self.insert_element(snapshot, element)?;
        Ok(Some(&self.graph[index]))
    }

    fn insert_element(&mut self, snapshot: &Snapshot, element: &Element) -> Result<NodeIndex, TreeError> {
        let key = key_in(snapshot, element)?;
        if let Some(&index) = self.nodes.get(key) {
            return Ok(index);
        }

        // Collect the chain of missing ancestors, nearest first.
        let mut chain = vec![element];
        let mut resolving = HashSet::from([&element.id]);
        let mut current = element;
        let attach = loop {
            let Some(owner_id) = &current.owner else {
                break None;
            };
            let owner = snapshot
                .get(owner_id)
                .ok_or_else(|| TreeError::UnknownNode(owner_id.to_string()))?;
            if let Some(&index) = self.nodes.get(key_in(snapshot, owner)?) {
                break Some(index);
            }
            if !resolving.insert(&owner.id) {
                return Err(cycle_error(snapshot, &chain, owner));
            }
            chain.push(owner);
            current = owner;
        };

        let mut parent = attach;
        for ancestor in chain[1..].iter().rev() {
            parent = Some(self.add_node(snapshot, ancestor, parent)?);
        }
        self.add_node(snapshot, element, parent)
    }

    fn add_node(
        &mut self,
        snapshot: &Snapshot,
        element: &Element,
        parent: Option<NodeIndex>,
    ) -> Result<NodeIndex, TreeError> {
        let key = key_in(snapshot, element)?.to_string();

        if parent.is_none() {
            if let Some(root) = self.root {
                let mut roots = vec![self.graph[root].key.clone(), key];
                roots.sort();
                return Err(TreeError::AmbiguousRoot { roots });
            }
        }

        let index = self.graph.add_node(TreeNode::new(key.clone(), element));
        self.nodes.insert(key, index);
        match parent {
            Some(parent) => {
                self.graph.add_edge(parent, index, ());
            }
            None => self.root = Some(index),
        }
        Ok(index)
    }

    /// The root node, if the tree is not empty.
    #[must_use]
    pub fn root(&self) -> Option<&TreeNode> {
        self.root.map(|index| &self.graph[index])
    }

    /// Looks a node up by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TreeNode> {
        self.nodes.get(key).map(|&index| &self.graph[index])
    }

    /// Whether a node with this key exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        self.graph.node_indices().map(|index| &self.graph[index])
    }

    /// The parent of a node.
    #[must_use]
    pub fn parent(&self, key: &str) -> Option<&TreeNode> {
        let index = *self.nodes.get(key)?;
        self.graph
            .neighbors_directed(index, Direction::Incoming)
            .next()
            .map(|parent| &self.graph[parent])
    }

    /// The direct children of a node, sorted by key.
    #[must_use]
    pub fn children(&self, key: &str) -> Vec<&TreeNode> {
        self.nodes
            .get(key)
            .map(|&index| self.child_indices(index))
            .unwrap_or_default()
            .into_iter()
            .map(|child| &self.graph[child])
            .collect()
    }

    fn child_indices(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<_> = self
            .graph
            .neighbors_directed(index, Direction::Outgoing)
            .collect();
        children.sort_by(|a, b| self.graph[*a].key.cmp(&self.graph[*b].key));
        children
    }

    /// All descendants of a node in post-order: every node comes after its
    /// own descendants. The node itself is not included.
    #[must_use]
    pub fn descendants(&self, key: &str) -> Vec<&TreeNode> {
        let Some(&index) = self.nodes.get(key) else {
            return Vec::new();
        };
        let mut order = self.post_order(index);
        order.pop();
        order.into_iter().map(|i| &self.graph[i]).collect()
    }

    /// Post-order walk of the subtree rooted at `start`, ending with `start`.
    fn post_order(&self, start: NodeIndex) -> Vec<NodeIndex> {
        let mut order = Vec::new();
        let mut stack = vec![(start, false)];
        while let Some((index, expanded)) = stack.pop() {
            if expanded {
                order.push(index);
                continue;
            }
            stack.push((index, true));
            for child in self.child_indices(index).into_iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    /// Removes a node together with all of its descendants.
    ///
    /// Returns the removed nodes in post-order, so the node itself is last.
    pub fn remove_subtree(&mut self, key: &str) -> Vec<TreeNode> {
        let Some(&index) = self.nodes.get(key) else {
            return Vec::new();
        };
        let removed: Vec<_> = self
            .post_order(index)
            .into_iter()
            .filter_map(|i| self.graph.remove_node(i))
            .collect();
        for node in &removed {
            self.nodes.remove(&node.key);
        }
        if self.root == Some(index) {
            self.root = None;
        }
        removed
    }

    /// Parent → child key pairs.
    #[must_use]
    pub fn edges(&self) -> BTreeSet<(&str, &str)> {
        self.graph
            .edge_indices()
            .filter_map(|edge| self.graph.edge_endpoints(edge))
            .map(|(parent, child)| (self.graph[parent].key(), self.graph[child].key()))
            .collect()
    }

    fn labels(&self) -> BTreeMap<&str, &str> {
        self.iter()
            .map(|node| (node.key(), node.label()))
            .collect()
    }

    /// Whether both trees have the same root, edges and labels.
    #[must_use]
    pub fn is_isomorphic(&self, other: &Self) -> bool {
        self.root().map(TreeNode::key) == other.root().map(TreeNode::key)
            && self.edges() == other.edges()
            && self.labels() == other.labels()
    }

    /// What changed going from `self` to `next`.
    #[must_use]
    pub fn diff(&self, next: &Self) -> TreeDiff {
        let mut diff = TreeDiff::default();
        for node in next.iter() {
            match self.get(node.key()) {
                None => diff.added.push(node.key.clone()),
                Some(old) => {
                    let old_parent = self.parent(old.key()).map(TreeNode::key);
                    let new_parent = next.parent(node.key()).map(TreeNode::key);
                    if old.label != node.label || old_parent != new_parent {
                        diff.changed.push(node.key.clone());
                    }
                }
            }
        }
        diff.removed = self
            .iter()
            .filter(|node| !next.contains(node.key()))
            .map(|node| node.key.clone())
            .collect();

        diff.added.sort();
        diff.removed.sort();
        diff.changed.sort();
        diff
    }

    /// Graphviz DOT source for the tree.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph G {\n");
        if let Some(root) = self.root {
            for index in self.pre_order(root) {
                let node = &self.graph[index];
                let _ = writeln!(
                    dot,
                    "    \"{}\" [label=\"{}\"];",
                    escape_dot(&node.key),
                    escape_dot(&node.label)
                );
                if let Some(parent) = self.parent(&node.key) {
                    let _ = writeln!(
                        dot,
                        "    \"{}\" -> \"{}\";",
                        escape_dot(&parent.key),
                        escape_dot(&node.key)
                    );
                }
            }
        }
        dot.push('}');
        dot
    }

    /// An indented text rendering, one node per line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let Some(root) = self.root else {
            return out;
        };
        let _ = writeln!(out, "{}", single_line(&self.graph[root].label));

        // (node, prefix for its own line, prefix for its children)
        let mut stack: Vec<(NodeIndex, String, String)> = Vec::new();
        push_children(&mut stack, &self.child_indices(root), "");
        while let Some((index, line_prefix, child_prefix)) = stack.pop() {
            let _ = writeln!(out, "{line_prefix}{}", single_line(&self.graph[index].label));
            push_children(&mut stack, &self.child_indices(index), &child_prefix);
        }
        out
    }

    fn pre_order(&self, start: NodeIndex) -> Vec<NodeIndex> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(self.child_indices(index).into_iter().rev());
        }
        order
    }
}

fn push_children(stack: &mut Vec<(NodeIndex, String, String)>, children: &[NodeIndex], prefix: &str) {
    for (position, &child) in children.iter().enumerate().rev() {
        let last = position + 1 == children.len();
        let (branch, indent) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
        stack.push((child, format!("{prefix}{branch}"), format!("{prefix}{indent}")));
    }
}

fn key_in<'a>(snapshot: &'a Snapshot, element: &Element) -> Result<&'a str, TreeError> {
    snapshot
        .key_of(&element.id)
        .ok_or_else(|| TreeError::UnknownNode(element.name.clone()))
}

/// `chain` runs from the inserted element towards the root; `repeated` is the
/// ancestor that was met a second time.
fn cycle_error(snapshot: &Snapshot, chain: &[&Element], repeated: &Element) -> TreeError {
    let start = chain
        .iter()
        .position(|e| e.id == repeated.id)
        .unwrap_or_default();
    let mut cycle: Vec<String> = chain[start..]
        .iter()
        .map(|e| snapshot.key_of(&e.id).unwrap_or(e.name.as_str()).to_string())
        .collect();
    if let Some(smallest) = cycle
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
    {
        cycle.rotate_left(smallest);
    }
    TreeError::CyclicOwnership { cycle }
}

fn single_line(label: &str) -> String {
    label.lines().map(str::trim).collect::<Vec<_>>().join(" ")
}

fn escape_dot(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
