#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.0 (C14N 1.0).
//!
//! Algorithm URI: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315`
//! With comments: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments`
//!
//! The canonical form:
//! - Outputs namespace declarations sorted by prefix (default first)
//! - Outputs attributes sorted by (namespace-URI, local-name)
//! - Escapes text and attribute values per C14N rules
//! - Optionally preserves or strips comments
//! - Supports document-subset canonicalization via NodeSet

use crate::render::{self, Attr, NsDecl};
use soapsig_core::{ns, Result};
use soapsig_xml::{Document, NodeId, NodeKind, NodeSet};
use soapsig_xml::escape::Escape;
use std::collections::BTreeMap;

/// Canonicalize a document using Inclusive C14N 1.0.
pub fn canonicalize(
    doc: &Document,
    with_comments: bool,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>> {
    let ctx = C14nContext {
        doc,
        with_comments,
        node_set,
        inherit_xml_id: true,
    };
    Ok(ctx.run())
}

pub(crate) struct C14nContext<'a> {
    pub(crate) doc: &'a Document,
    pub(crate) with_comments: bool,
    pub(crate) node_set: Option<&'a NodeSet>,
    /// C14N 1.1 stops `xml:id` from being inherited by apex elements.
    pub(crate) inherit_xml_id: bool,
}

impl C14nContext<'_> {
    pub(crate) fn run(&self) -> Vec<u8> {
        let mut output = Vec::new();
        self.process_node(self.doc.root(), &mut output, &BTreeMap::new());
        output
    }

    fn is_visible(&self, id: NodeId) -> bool {
        match self.node_set {
            None => true,
            Some(set) => set.contains_id(id),
        }
    }

    fn process_node(&self, id: NodeId, output: &mut Vec<u8>, rendered_ns: &BTreeMap<String, String>) {
        match self.doc.node_kind(id) {
            Some(NodeKind::Document) => {
                for child in self.doc.children(id) {
                    self.process_node(child, output, rendered_ns);
                }
            }
            Some(NodeKind::Element(_)) => self.process_element(id, output, rendered_ns),
            Some(NodeKind::Text(text)) => {
                if self.is_visible(id) {
                    output.extend_from_slice(Escape::Text.apply(text).as_bytes());
                }
            }
            Some(NodeKind::Comment(_)) | Some(NodeKind::ProcessingInstruction(_)) => {
                if self.is_visible(id) {
                    render::write_misc(self.doc, id, self.with_comments, output);
                }
            }
            None => {}
        }
    }

    fn process_element(
        &self,
        id: NodeId,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) {
        if !self.is_visible(id) {
            // Descendants are rendered against the nearest visible ancestor.
            for child in self.doc.children(id) {
                self.process_node(child, output, rendered_ns);
            }
            return;
        }
        let Some(elem) = self.doc.element(id) else {
            return;
        };

        let in_scope = self.doc.in_scope_namespaces(id);

        let mut ns_decls: Vec<NsDecl> = in_scope
            .iter()
            .filter(|(prefix, uri)| rendered_ns.get(*prefix) != Some(*uri))
            .map(|(prefix, uri)| NsDecl {
                prefix: prefix.clone(),
                uri: uri.clone(),
            })
            .collect();

        // A default namespace rendered above but absent here must be undeclared.
        if rendered_ns.get("").is_some_and(|d| !d.is_empty()) && !in_scope.contains_key("") {
            ns_decls.push(NsDecl {
                prefix: String::new(),
                uri: String::new(),
            });
        }
        ns_decls.sort();

        let mut attrs = render::element_attrs(self.doc, id);
        if self.node_set.is_some() {
            let parent_hidden = self
                .doc
                .parent(id)
                .map_or(true, |p| self.doc.element(p).is_none() || !self.is_visible(p));
            if parent_hidden {
                let extra = self.inherited_xml_attrs(id, &attrs);
                attrs.extend(extra);
            }
        }
        attrs.sort();

        let name = elem.qualified_name();
        output.push(b'<');
        output.extend_from_slice(name.as_bytes());
        for decl in &ns_decls {
            output.extend_from_slice(decl.render().as_bytes());
        }
        for attr in &attrs {
            output.extend_from_slice(attr.render().as_bytes());
        }
        output.push(b'>');

        let mut child_ns = in_scope;
        if !child_ns.contains_key("") && rendered_ns.contains_key("") {
            child_ns.insert(String::new(), String::new());
        }
        for child in self.doc.children(id) {
            self.process_node(child, output, &child_ns);
        }

        output.extend_from_slice(b"</");
        output.extend_from_slice(name.as_bytes());
        output.push(b'>');
    }

    /// `xml:*` attributes of the ancestors that an apex element of a
    /// document subset picks up, nearest ancestor first.
    fn inherited_xml_attrs(&self, id: NodeId, existing: &[Attr]) -> Vec<Attr> {
        let mut inherited: BTreeMap<String, String> = BTreeMap::new();

        let mut current = self.doc.parent(id);
        while let Some(ancestor) = current {
            if let Some(elem) = self.doc.element(ancestor) {
                for attr in &elem.attributes {
                    if attr.namespace.as_deref() != Some(ns::XML) {
                        continue;
                    }
                    if !self.inherit_xml_id && attr.local_name == "id" {
                        continue;
                    }
                    inherited
                        .entry(attr.local_name.clone())
                        .or_insert_with(|| attr.value.clone());
                }
            }
            current = self.doc.parent(ancestor);
        }

        inherited
            .into_iter()
            .filter(|(name, _)| {
                !existing
                    .iter()
                    .any(|a| a.ns_uri == ns::XML && a.local_name == *name)
            })
            .map(|(name, value)| Attr {
                ns_uri: ns::XML.to_owned(),
                qualified_name: format!("xml:{name}"),
                local_name: name,
                value,
            })
            .collect()
    }
}
