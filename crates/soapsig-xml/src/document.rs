#![forbid(unsafe_code)]

//! Owned, mutable XML tree.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Nodes are only
//! ever added (a replaced text child is unlinked, not freed), so an id stays
//! valid for the lifetime of its document.

use soapsig_core::{ns, Error, Result};
use std::collections::{BTreeMap, HashMap};

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// An attribute with its qualified name split into prefix and local part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub prefix: Option<String>,
    pub local_name: String,
    /// Resolved namespace URI; `None` for un-prefixed attributes.
    pub namespace: Option<String>,
    pub value: String,
}

impl Attribute {
    /// An attribute in no namespace.
    pub fn new(local_name: &str, value: &str) -> Self {
        Self {
            prefix: None,
            local_name: local_name.to_owned(),
            namespace: None,
            value: value.to_owned(),
        }
    }

    /// `prefix:local` or just `local`.
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.local_name)
    }
}

/// Element data: name, namespace declarations and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub prefix: Option<String>,
    pub local_name: String,
    pub namespace: Option<String>,
    /// Namespace declarations written on this element, in source order, as
    /// `(prefix, uri)`. The default namespace has an empty prefix; an empty
    /// URI undeclares it.
    pub ns_decls: Vec<(String, String)>,
    pub attributes: Vec<Attribute>,
}

impl Element {
    pub fn new(prefix: Option<&str>, local_name: &str, namespace: Option<&str>) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_owned),
            local_name: local_name.to_owned(),
            namespace: namespace.map(str::to_owned),
            ns_decls: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.local_name)
    }

    /// True if the element has the given namespace URI and local name.
    pub fn is(&self, ns_uri: &str, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace.as_deref().unwrap_or("") == ns_uri
    }

    /// Value of an attribute in no namespace.
    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.local_name == local_name)
            .map(|a| a.value.as_str())
    }

    /// Set (or replace) an attribute in no namespace.
    pub fn set_attribute(&mut self, local_name: &str, value: &str) {
        match self
            .attributes
            .iter_mut()
            .find(|a| a.namespace.is_none() && a.local_name == local_name)
        {
            Some(attr) => attr.value = value.to_owned(),
            None => self.attributes.push(Attribute::new(local_name, value)),
        }
    }

    /// Declare a namespace on this element.
    pub fn declare_namespace(&mut self, prefix: &str, uri: &str) {
        self.ns_decls.retain(|(p, _)| p != prefix);
        self.ns_decls.push((prefix.to_owned(), uri.to_owned()));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingInstruction {
    pub target: String,
    pub data: Option<String>,
}

/// The kind and payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction(ProcessingInstruction),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An owned XML document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    /// Identifier value → elements carrying it, in document order.
    ids: HashMap<String, Vec<NodeId>>,
}

impl Document {
    /// An empty document holding only the document node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            ids: HashMap::new(),
        }
    }

    /// Parse XML text into an owned tree.
    pub fn parse(text: &str) -> Result<Self> {
        let source = roxmltree::Document::parse_with_options(text, crate::parsing_options())
            .map_err(|e| Error::MalformedInputXml(e.to_string()))?;
        let mut doc = Self::new();
        let root = doc.root();
        doc.copy_children(text, source.root(), root);
        Ok(doc)
    }

    fn copy_children(&mut self, text: &str, from: roxmltree::Node<'_, '_>, to: NodeId) {
        for child in from.children() {
            let kind = match child.node_type() {
                roxmltree::NodeType::Element => NodeKind::Element(convert_element(text, child)),
                roxmltree::NodeType::Text => NodeKind::Text(child.text().unwrap_or("").to_owned()),
                roxmltree::NodeType::Comment => {
                    NodeKind::Comment(child.text().unwrap_or("").to_owned())
                }
                roxmltree::NodeType::PI => match child.pi() {
                    Some(pi) => NodeKind::ProcessingInstruction(ProcessingInstruction {
                        target: pi.target.to_owned(),
                        data: pi.value.map(str::to_owned),
                    }),
                    None => continue,
                },
                roxmltree::NodeType::Root => continue,
            };
            let id = self.push(kind);
            self.append_child(to, id);
            if child.is_element() {
                self.copy_children(text, child, id);
            }
        }
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    // ── Navigation ───────────────────────────────────────────────────

    /// The document node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The document element (envelope root).
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root()).find(|&c| self.element(c).is_some())
    }

    pub fn node_kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.node_kind(id) {
            Some(NodeKind::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .copied()
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(|&c| self.element(c).is_some())
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = &self.nodes[self.parent(id)?.0].children;
        let pos = siblings.iter().position(|&s| s == id)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = &self.nodes[self.parent(id)?.0].children;
        let pos = siblings.iter().position(|&s| s == id)?;
        siblings.get(pos + 1).copied()
    }

    /// All descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).collect();
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let before = stack.len();
            stack.extend(self.children(next));
            stack[before..].reverse();
        }
        out
    }

    /// Check if `ancestor` is `node` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for d in self.descendants(id) {
            if let Some(NodeKind::Text(t)) = self.node_kind(d) {
                out.push_str(t);
            }
        }
        out
    }

    /// Find the first element in document order with the given namespace
    /// and local name.
    pub fn find_element(&self, ns_uri: &str, local_name: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|&d| self.element(d).is_some_and(|e| e.is(ns_uri, local_name)))
    }

    /// Find the first child element with the given namespace and local name.
    pub fn find_child_element(
        &self,
        parent: NodeId,
        ns_uri: &str,
        local_name: &str,
    ) -> Option<NodeId> {
        self.element_children(parent)
            .find(|&c| self.element(c).is_some_and(|e| e.is(ns_uri, local_name)))
    }

    /// Namespace bindings in scope at `id`, keyed by prefix ("" for the
    /// default namespace). The implicit `xml` binding is not included.
    pub fn in_scope_namespaces(&self, id: NodeId) -> BTreeMap<String, String> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(n) = current {
            if let Some(e) = self.element(n) {
                chain.push(e);
            }
            current = self.parent(n);
        }

        let mut result = BTreeMap::new();
        for elem in chain.into_iter().rev() {
            for (prefix, uri) in &elem.ns_decls {
                if uri.is_empty() {
                    result.remove(prefix);
                } else {
                    result.insert(prefix.clone(), uri.clone());
                }
            }
        }
        result
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Create a detached element node.
    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.push(NodeKind::Element(element))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_owned()))
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `new` as the next sibling of `sibling`. A parentless
    /// `sibling` (the document node) receives `new` as its last child.
    pub fn insert_after(&mut self, sibling: NodeId, new: NodeId) {
        self.detach(new);
        let Some(parent) = self.parent(sibling) else {
            self.append_child(sibling, new);
            return;
        };
        let siblings = &mut self.nodes[parent.0].children;
        let pos = siblings
            .iter()
            .position(|&s| s == sibling)
            .map_or(siblings.len(), |p| p + 1);
        siblings.insert(pos, new);
        self.nodes[new.0].parent = Some(parent);
    }

    /// Replace every child of `id` with a single text node, as DOM
    /// `textContent` assignment does. Identifiers registered on the
    /// removed subtrees are dropped.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        let removed = self.descendants(id);
        self.ids.retain(|_, nodes| {
            nodes.retain(|n| !removed.contains(n));
            !nodes.is_empty()
        });
        let children: Vec<NodeId> = self.children(id).collect();
        for c in children {
            self.detach(c);
        }
        let node = self.create_text(text);
        self.append_child(id, node);
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    // ── Identifiers ──────────────────────────────────────────────────

    /// Register `id` as carrying the identifier `value`.
    pub fn register_id(&mut self, value: &str, id: NodeId) {
        let entry = self.ids.entry(value.to_owned()).or_default();
        if !entry.contains(&id) {
            entry.push(id);
        }
    }

    /// Elements registered under the identifier `value`.
    pub fn elements_with_id(&self, value: &str) -> &[NodeId] {
        self.ids.get(value).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn qualify(prefix: Option<&str>, local_name: &str) -> String {
    match prefix {
        Some(p) => format!("{p}:{local_name}"),
        None => local_name.to_owned(),
    }
}

fn split_qname(qname: &str) -> (Option<String>, String) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix.to_owned()), local.to_owned()),
        None => (None, qname.to_owned()),
    }
}

fn convert_element(text: &str, node: roxmltree::Node<'_, '_>) -> Element {
    // The start tag begins at the node's range: `<` followed by the qname.
    let tag = &text[node.range()];
    let qname: &str = tag
        .trim_start_matches('<')
        .split(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .next()
        .unwrap_or("");
    let (prefix, _) = split_qname(qname);

    let attributes = node
        .attributes()
        .map(|a| {
            let (prefix, _) = split_qname(&text[a.range_qname()]);
            Attribute {
                prefix,
                local_name: a.name().to_owned(),
                namespace: a.namespace().map(str::to_owned),
                value: a.value().to_owned(),
            }
        })
        .collect();

    Element {
        prefix,
        local_name: node.tag_name().name().to_owned(),
        namespace: node.tag_name().namespace().map(str::to_owned),
        ns_decls: declared_namespaces(node),
        attributes,
    }
}

/// Namespace declarations made on `node` itself: its in-scope bindings that
/// differ from its parent's.
fn declared_namespaces(node: roxmltree::Node<'_, '_>) -> Vec<(String, String)> {
    let inherited: BTreeMap<&str, &str> = node
        .parent_element()
        .map(|p| p.namespaces().map(|n| (n.name().unwrap_or(""), n.uri())).collect())
        .unwrap_or_default();

    node.namespaces()
        .map(|n| (n.name().unwrap_or(""), n.uri()))
        .filter(|(prefix, uri)| *prefix != "xml" && *uri != ns::XML)
        .filter(|(prefix, uri)| match inherited.get(prefix) {
            Some(parent_uri) => parent_uri != uri,
            // A fresh `xmlns=""` on a root element changes nothing.
            None => !uri.is_empty(),
        })
        .map(|(prefix, uri)| (prefix.to_owned(), uri.to_owned()))
        .collect()
}
