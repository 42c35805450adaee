#![forbid(unsafe_code)]

//! Identifier attributes and same-document reference resolution.
//!
//! Without a schema or DTD nothing marks an attribute as an XML ID, so the
//! signer registers the configured attribute names itself before any
//! `#value` reference is resolved.

use crate::document::{Document, NodeId};
use soapsig_core::{ns, Error, Result};
use tracing::debug;

/// Marks identifier attributes on a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdResolver {
    attr_names: Vec<String>,
}

impl Default for IdResolver {
    fn default() -> Self {
        Self {
            attr_names: vec![ns::attr::ID.to_owned()],
        }
    }
}

impl IdResolver {
    /// A resolver for the given attribute names.
    ///
    /// A name with a prefix (`wsu:Id`) matches an attribute's qualified
    /// name; a bare name (`Id`) matches an attribute in no namespace.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attr_names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Register an additional identifier attribute name (e.g., `"wsu:Id"`).
    pub fn add_id_attr(&mut self, name: &str) {
        if !self.attr_names.iter().any(|n| n == name) {
            self.attr_names.push(name.to_owned());
        }
    }

    pub fn attr_names(&self) -> &[String] {
        &self.attr_names
    }

    /// Register every matching attribute in document order as an
    /// identifier of its element. Attribute values are not modified and
    /// duplicates are recorded, not rejected. Returns the number of
    /// identifiers registered.
    pub fn mark(&self, doc: &mut Document) -> usize {
        let mut found = Vec::new();
        for node in doc.descendants(doc.root()) {
            let Some(elem) = doc.element(node) else {
                continue;
            };
            for attr in &elem.attributes {
                let matched = self.attr_names.iter().any(|name| {
                    if name.contains(':') {
                        attr.qualified_name() == *name
                    } else {
                        attr.namespace.is_none() && attr.local_name == *name
                    }
                });
                if matched {
                    debug!(
                        element = %elem.qualified_name(),
                        attribute = %attr.qualified_name(),
                        id = %attr.value,
                        "marked identifier attribute"
                    );
                    found.push((attr.value.clone(), node));
                }
            }
        }

        let count = found.len();
        for (value, node) in found {
            doc.register_id(&value, node);
        }
        count
    }
}

/// Parse a same-document reference (e.g., `#foo` → `foo`).
pub fn parse_same_document_ref(uri: &str) -> Option<&str> {
    uri.strip_prefix('#')
}

/// Resolve an identifier to the single element carrying it.
///
/// Zero matches and more than one match are both `InvalidReference`.
pub fn resolve_id(doc: &Document, id: &str) -> Result<NodeId> {
    match doc.elements_with_id(id) {
        [node] => Ok(*node),
        [] => Err(Error::invalid_reference(
            format!("#{id}"),
            "no element carries this identifier",
        )),
        many => Err(Error::invalid_reference(
            format!("#{id}"),
            format!("ambiguous: {} elements carry this identifier", many.len()),
        )),
    }
}
