#![forbid(unsafe_code)]

//! Serialization of a [`Document`] back to UTF-8 text.
//!
//! Element and attribute names keep the prefixes they were parsed with, namespace
//! declarations stay on the element that made them, and whitespace text is
//! written back as parsed. No indentation is added.

use crate::document::{Document, NodeId, NodeKind};
use crate::escape::Escape;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Options for [`serialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>` before the content.
    pub xml_declaration: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            xml_declaration: true,
        }
    }
}

/// Serialize the whole document.
pub fn serialize(doc: &Document, options: SerializeOptions) -> String {
    let mut out = String::new();
    if options.xml_declaration {
        out.push_str(XML_DECLARATION);
        out.push('\n');
    }
    for child in doc.children(doc.root()) {
        write_node(doc, child, &mut out);
    }
    out
}

/// Serialize a single node and its subtree.
pub fn serialize_node(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.node_kind(id) {
        Some(NodeKind::Document) => {
            for child in doc.children(id) {
                write_node(doc, child, out);
            }
        }
        Some(NodeKind::Element(elem)) => {
            let name = elem.qualified_name();
            out.push('<');
            out.push_str(&name);
            for (prefix, uri) in &elem.ns_decls {
                if prefix.is_empty() {
                    out.push_str(" xmlns=\"");
                } else {
                    out.push_str(" xmlns:");
                    out.push_str(prefix);
                    out.push_str("=\"");
                }
                out.push_str(&Escape::Attribute.apply(uri));
                out.push('"');
            }
            for attr in &elem.attributes {
                out.push(' ');
                out.push_str(&attr.qualified_name());
                out.push_str("=\"");
                out.push_str(&Escape::Attribute.apply(&attr.value));
                out.push('"');
            }

            let mut children = doc.children(id).peekable();
            if children.peek().is_none() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in children {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }
        Some(NodeKind::Text(text)) => out.push_str(&Escape::Text.apply(text)),
        Some(NodeKind::Comment(text)) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        Some(NodeKind::ProcessingInstruction(pi)) => {
            out.push_str("<?");
            out.push_str(&pi.target);
            if let Some(data) = &pi.data {
                out.push(' ');
                out.push_str(data);
            }
            out.push_str("?>");
        }
        None => {}
    }
}
