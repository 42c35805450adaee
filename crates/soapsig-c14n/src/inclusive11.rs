#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.1 (C14N 1.1).
//!
//! Algorithm URI: `http://www.w3.org/2006/12/xml-c14n11`
//! With comments: `http://www.w3.org/2006/12/xml-c14n11#WithComments`
//!
//! Differs from C14N 1.0 only for document subsets: `xml:id` is never
//! inherited by an apex element. `xml:base` values are copied as found;
//! no relative-URI fix-up is applied.

use crate::inclusive::C14nContext;
use soapsig_core::Result;
use soapsig_xml::{Document, NodeSet};

/// Canonicalize using Inclusive C14N 1.1.
pub fn canonicalize(
    doc: &Document,
    with_comments: bool,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>> {
    let ctx = C14nContext {
        doc,
        with_comments,
        node_set,
        inherit_xml_id: false,
    };
    Ok(ctx.run())
}
