#![forbid(unsafe_code)]

//! URI resolution for XML-DSig references.
//!
//! Handles:
//! - Empty URI ("") : the entire document minus comments
//! - Same-document references ("#id") : the identified element's subtree minus comments
//!
//! Anything else is rejected.

use soapsig_core::{Error, Result};
use soapsig_xml::id::{parse_same_document_ref, resolve_id};
use soapsig_xml::{Document, NodeSet};

/// Resolve a reference URI to the node set it selects.
pub fn resolve_uri(uri: &str, doc: &Document) -> Result<NodeSet> {
    if uri.is_empty() {
        return Ok(NodeSet::all_without_comments(doc));
    }
    match parse_same_document_ref(uri) {
        Some("") => Err(Error::invalid_reference(uri, "empty fragment identifier")),
        Some(id) if id.starts_with("xpointer(") => Err(Error::invalid_reference(
            uri,
            "XPointer references are not supported",
        )),
        Some(id) => {
            let node_id = resolve_id(doc, id)?;
            Ok(NodeSet::tree_without_comments(node_id, doc))
        }
        None => Err(Error::invalid_reference(
            uri,
            "only \"\" and same-document \"#id\" references are supported",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soapsig_xml::IdResolver;

    fn marked(xml: &str) -> Document {
        let mut doc = Document::parse(xml).unwrap();
        IdResolver::default().mark(&mut doc);
        doc
    }

    #[test]
    fn test_empty_uri_selects_document_without_comments() {
        let doc = marked("<a><!--c--><b/></a>");
        let set = resolve_uri("", &doc).unwrap();
        assert_eq!(set, NodeSet::all_without_comments(&doc));
        assert_ne!(set, NodeSet::all(&doc));
    }

    #[test]
    fn test_fragment_selects_subtree() {
        let doc = marked(r#"<a><b Id="x"><c/></b><d/></a>"#);
        let set = resolve_uri("#x", &doc).unwrap();
        let b = doc.find_element("", "b").unwrap();
        let c = doc.find_element("", "c").unwrap();
        let d = doc.find_element("", "d").unwrap();
        assert!(set.contains_id(b) && set.contains_id(c));
        assert!(!set.contains_id(d));
    }

    #[test]
    fn test_rejected_uris() {
        let doc = marked(r#"<a Id="x"/>"#);
        for uri in ["#", "#missing", "http://example.com/doc.xml", "#xpointer(/)", "x"] {
            assert!(
                matches!(resolve_uri(uri, &doc), Err(Error::InvalidReference { .. })),
                "{uri}"
            );
        }
    }
}
