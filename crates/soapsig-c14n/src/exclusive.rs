#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//! With comments: `http://www.w3.org/2001/10/xml-exc-c14n#WithComments`
//!
//! The key difference from inclusive C14N: only "visibly utilized" namespace
//! declarations are output.  A namespace is visibly utilized if:
//! 1. Its prefix is used by the element's tag name, OR
//! 2. Its prefix is used by one of the element's attributes, OR
//! 3. The prefix appears in the InclusiveNamespaces PrefixList, OR
//! 4. It's the default namespace and the element is in that namespace.
//!
//! Ancestor `xml:*` attributes are never inherited.

use crate::render::{self, NsDecl};
use soapsig_core::Result;
use soapsig_xml::escape::Escape;
use soapsig_xml::{Document, NodeId, NodeKind, NodeSet};
use std::collections::{BTreeMap, BTreeSet};

/// The PrefixList token naming the default namespace.
pub const DEFAULT_PREFIX_TOKEN: &str = "#default";

/// Canonicalize using Exclusive C14N 1.0.
pub fn canonicalize(
    doc: &Document,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>> {
    let inclusive_prefixes = inclusive_prefixes
        .iter()
        .map(|p| {
            if p == DEFAULT_PREFIX_TOKEN {
                String::new()
            } else {
                p.clone()
            }
        })
        .collect();
    let ctx = ExcC14nContext {
        doc,
        with_comments,
        node_set,
        inclusive_prefixes,
    };
    let mut output = Vec::new();
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new());
    Ok(output)
}

/// Split an `InclusiveNamespaces/@PrefixList` value into prefixes.
pub fn parse_prefix_list(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_owned).collect()
}

struct ExcC14nContext<'a> {
    doc: &'a Document,
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
    /// PrefixList entries, with `#default` mapped to "".
    inclusive_prefixes: BTreeSet<String>,
}

impl ExcC14nContext<'_> {
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
            for child in self.doc.children(id) {
                self.process_node(child, output, rendered_ns);
            }
            return;
        }
        let Some(elem) = self.doc.element(id) else {
            return;
        };

        // Visibly utilized prefixes
        let mut utilized: BTreeSet<String> = self.inclusive_prefixes.clone();
        utilized.insert(elem.prefix.clone().unwrap_or_default());
        for attr in &elem.attributes {
            if let Some(prefix) = &attr.prefix {
                utilized.insert(prefix.clone());
            }
        }
        utilized.remove("xml");

        let in_scope = self.doc.in_scope_namespaces(id);

        let mut ns_decls: Vec<NsDecl> = Vec::new();
        for prefix in &utilized {
            match in_scope.get(prefix) {
                Some(uri) if rendered_ns.get(prefix) != Some(uri) => ns_decls.push(NsDecl {
                    prefix: prefix.clone(),
                    uri: uri.clone(),
                }),
                Some(_) => {}
                None if prefix.is_empty() => {
                    if rendered_ns.get("").is_some_and(|d| !d.is_empty()) {
                        ns_decls.push(NsDecl {
                            prefix: String::new(),
                            uri: String::new(),
                        });
                    }
                }
                None => {}
            }
        }
        ns_decls.sort();

        let mut attrs = render::element_attrs(self.doc, id);
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

        let mut child_rendered_ns = rendered_ns.clone();
        for decl in ns_decls {
            child_rendered_ns.insert(decl.prefix, decl.uri);
        }
        for child in self.doc.children(id) {
            self.process_node(child, output, &child_rendered_ns);
        }

        output.extend_from_slice(b"</");
        output.extend_from_slice(name.as_bytes());
        output.push(b'>');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENVELOPE: &str = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:m="urn:m" xmlns:unused="urn:unused"><soapenv:Body Id="body"><m:Op><m:Arg xmlns="urn:d">1</m:Arg></m:Op></soapenv:Body></soapenv:Envelope>"#;

    fn body_subset(prefixes: &[String]) -> String {
        let doc = Document::parse(ENVELOPE).unwrap();
        let body = doc
            .find_element("http://schemas.xmlsoap.org/soap/envelope/", "Body")
            .unwrap();
        let set = NodeSet::tree_without_comments(body, &doc);
        String::from_utf8(canonicalize(&doc, false, Some(&set), prefixes).unwrap()).unwrap()
    }

    #[test]
    fn test_unused_namespaces_dropped() {
        assert_eq!(
            body_subset(&[]),
            concat!(
                r#"<soapenv:Body xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" Id="body">"#,
                r#"<m:Op xmlns:m="urn:m"><m:Arg>1</m:Arg></m:Op></soapenv:Body>"#
            )
        );
    }

    #[test]
    fn test_prefix_list_forces_declaration() {
        let out = body_subset(&parse_prefix_list("unused m"));
        assert!(out.starts_with(
            r#"<soapenv:Body xmlns:m="urn:m" xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:unused="urn:unused" Id="body">"#
        ));
        // Already rendered on the apex, so not repeated on m:Op.
        assert!(out.contains("<m:Op>"));
    }

    #[test]
    fn test_default_prefix_token() {
        let xml = r#"<r xmlns="urn:d" xmlns:p="urn:p"><p:c/></r>"#;
        let doc = Document::parse(xml).unwrap();
        let c = doc.find_element("urn:p", "c").unwrap();
        let set = NodeSet::tree_without_comments(c, &doc);

        let without = canonicalize(&doc, false, Some(&set), &[]).unwrap();
        assert_eq!(without, br#"<p:c xmlns:p="urn:p"></p:c>"#);

        let with = canonicalize(&doc, false, Some(&set), &["#default".to_owned()]).unwrap();
        assert_eq!(with, br#"<p:c xmlns="urn:d" xmlns:p="urn:p"></p:c>"#);
    }

    #[test]
    fn test_default_namespace_undeclared_when_utilized() {
        let xml = r#"<r xmlns="urn:d"><c xmlns=""/></r>"#;
        let doc = Document::parse(xml).unwrap();
        let out = canonicalize(&doc, false, None, &[]).unwrap();
        assert_eq!(out, br#"<r xmlns="urn:d"><c xmlns=""></c></r>"#);
    }

    #[test]
    fn test_xml_attributes_not_inherited() {
        let xml = r#"<r xml:lang="en"><c/></r>"#;
        let doc = Document::parse(xml).unwrap();
        let c = doc.find_element("", "c").unwrap();
        let set = NodeSet::tree_without_comments(c, &doc);
        assert_eq!(canonicalize(&doc, false, Some(&set), &[]).unwrap(), b"<c></c>");
    }
}
