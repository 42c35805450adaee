#![forbid(unsafe_code)]

//! XML document model for soapsig.
//!
//! Input text is parsed with `roxmltree` and copied into an owned arena
//! tree ([`Document`]) that the signing pipeline mutates in place: the
//! certificate is written into the security token, the signature structure
//! is inserted, digests and the signature value are filled in. The tree is
//! then written back out with [`serialize`].

pub mod document;
pub mod escape;
pub mod id;
pub mod nodeset;
pub mod serialize;

pub use document::{Attribute, Document, Element, NodeId, NodeKind, ProcessingInstruction};
pub use id::IdResolver;
pub use nodeset::NodeSet;
pub use serialize::{serialize, SerializeOptions};

/// Return roxmltree parsing options for SOAP input.
///
/// SOAP messages must not carry a document type declaration, so DTDs are
/// rejected at parse time.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: false,
        ..roxmltree::ParsingOptions::default()
    }
}
