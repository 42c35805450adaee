#![forbid(unsafe_code)]

//! Shared rendering utilities for C14N output.

use soapsig_core::ns;
use soapsig_xml::escape::Escape;
use soapsig_xml::{Document, NodeId, NodeKind};

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// The prefix ("" for default namespace).
    pub prefix: String,
    /// The namespace URI.
    pub uri: String,
}

impl NsDecl {
    /// Render this namespace declaration to a string.
    pub fn render(&self) -> String {
        if self.prefix.is_empty() {
            format!(" xmlns=\"{}\"", Escape::Attribute.apply(&self.uri))
        } else {
            format!(" xmlns:{}=\"{}\"", self.prefix, Escape::Attribute.apply(&self.uri))
        }
    }
}

impl Ord for NsDecl {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Default namespace (empty prefix) sorts first, then by prefix.
        match (self.prefix.is_empty(), other.prefix.is_empty()) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => self.prefix.cmp(&other.prefix),
        }
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// The namespace URI of the attribute ("" for no namespace).
    pub ns_uri: String,
    pub local_name: String,
    /// The qualified name (prefix:local or just local).
    pub qualified_name: String,
    pub value: String,
}

impl Attr {
    /// Render this attribute to a string.
    pub fn render(&self) -> String {
        format!(" {}=\"{}\"", self.qualified_name, Escape::Attribute.apply(&self.value))
    }
}

impl Ord for Attr {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // No-namespace attributes first, by local name; then by
        // (namespace URI, local name).
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, true) => self.local_name.cmp(&other.local_name),
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (false, false) => self
                .ns_uri
                .cmp(&other.ns_uri)
                .then(self.local_name.cmp(&other.local_name)),
        }
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// The element's own attributes, unsorted.
pub fn element_attrs(doc: &Document, id: NodeId) -> Vec<Attr> {
    let Some(elem) = doc.element(id) else {
        return Vec::new();
    };
    elem.attributes
        .iter()
        .map(|a| {
            let qualified_name = if a.namespace.as_deref() == Some(ns::XML) {
                format!("xml:{}", a.local_name)
            } else {
                a.qualified_name()
            };
            Attr {
                ns_uri: a.namespace.clone().unwrap_or_default(),
                local_name: a.local_name.clone(),
                qualified_name,
                value: a.value.clone(),
            }
        })
        .collect()
}

/// Write a comment or processing instruction, adding the line breaks
/// canonical form requires around nodes outside the document element.
pub fn write_misc(
    doc: &Document,
    id: NodeId,
    with_comments: bool,
    output: &mut Vec<u8>,
) {
    let body = match doc.node_kind(id) {
        Some(NodeKind::Comment(text)) if with_comments => format!("<!--{text}-->"),
        Some(NodeKind::ProcessingInstruction(pi)) => match pi.data.as_deref() {
            Some(data) if !data.is_empty() => {
                format!("<?{} {}?>", pi.target, Escape::Instruction.apply(data))
            }
            _ => format!("<?{}?>", pi.target),
        },
        _ => return,
    };

    let at_top_level = doc.parent(id) == Some(doc.root());
    if at_top_level && has_sibling_element(doc, id, Direction::Before) {
        output.push(b'\n');
    }
    output.extend_from_slice(body.as_bytes());
    if at_top_level && has_sibling_element(doc, id, Direction::After) {
        output.push(b'\n');
    }
}

enum Direction {
    Before,
    After,
}

fn has_sibling_element(doc: &Document, id: NodeId, dir: Direction) -> bool {
    let step = |n: NodeId| match dir {
        Direction::Before => doc.previous_sibling(n),
        Direction::After => doc.next_sibling(n),
    };
    let mut sib = step(id);
    while let Some(s) = sib {
        if doc.element(s).is_some() {
            return true;
        }
        sib = step(s);
    }
    false
}
