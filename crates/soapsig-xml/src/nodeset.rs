#![forbid(unsafe_code)]

//! NodeSet type for canonicalization and transforms.
//!
//! A `NodeSet` is the set of nodes a reference covers, identified by their
//! [`NodeId`]. Canonicalization renders only visible nodes; the
//! enveloped-signature transform removes the signature subtree from it.

use crate::document::{Document, NodeId, NodeKind};
use std::collections::HashSet;

/// A set of document nodes identified by `NodeId`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: HashSet<usize>,
}

impl NodeSet {
    /// Create an empty node set.
    pub fn new() -> Self {
        Self::default()
    }

    /// All nodes in the document, comments included.
    pub fn all(doc: &Document) -> Self {
        Self::tree(doc.root(), doc, true)
    }

    /// All nodes except comments. `URI=""` selects the document this way.
    pub fn all_without_comments(doc: &Document) -> Self {
        Self::tree(doc.root(), doc, false)
    }

    /// The subtree rooted at `root_id`, without comments. `URI="#id"`
    /// selects the identified element this way.
    pub fn tree_without_comments(root_id: NodeId, doc: &Document) -> Self {
        Self::tree(root_id, doc, false)
    }

    fn tree(root_id: NodeId, doc: &Document, include_comments: bool) -> Self {
        let mut nodes = HashSet::new();
        nodes.insert(root_id.index());
        for id in doc.descendants(root_id) {
            if include_comments || !matches!(doc.node_kind(id), Some(NodeKind::Comment(_))) {
                nodes.insert(id.index());
            }
        }
        Self { nodes }
    }

    /// Check if a node is in this set.
    pub fn contains_id(&self, id: NodeId) -> bool {
        self.nodes.contains(&id.index())
    }

    /// Add a node to this set.
    pub fn insert_id(&mut self, id: NodeId) {
        self.nodes.insert(id.index());
    }

    /// Remove a node from this set.
    pub fn remove_id(&mut self, id: NodeId) {
        self.nodes.remove(&id.index());
    }

    /// Remove `id` and all of its descendants.
    pub fn remove_subtree(&mut self, id: NodeId, doc: &Document) {
        self.remove_id(id);
        for d in doc.descendants(id) {
            self.remove_id(d);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}
