#![forbid(unsafe_code)]

//! Enveloped signature transform.
//!
//! Removes the `<Signature>` element being produced, with all its
//! descendants, from the node set.

use crate::pipeline::{Transform, TransformData};
use soapsig_core::{algorithm, Error, Result};
use soapsig_xml::NodeId;

/// Removes a signature subtree from the node set.
///
/// A no-op when the signature is not part of the selected node set.
pub struct EnvelopedSignatureTransform {
    signature: NodeId,
}

impl EnvelopedSignatureTransform {
    /// Create with the NodeId of the Signature element to remove.
    pub fn new(signature: NodeId) -> Self {
        Self { signature }
    }
}

impl Transform for EnvelopedSignatureTransform {
    fn uri(&self) -> &str {
        algorithm::ENVELOPED_SIGNATURE
    }

    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>> {
        match input {
            TransformData::Xml { doc, mut node_set } => {
                node_set.remove_subtree(self.signature, doc);
                Ok(TransformData::Xml { doc, node_set })
            }
            TransformData::Binary(_) => Err(Error::SignatureComputation(
                "enveloped-signature transform requires XML input".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soapsig_xml::{Document, NodeSet};

    #[test]
    fn test_removes_signature_subtree() {
        let doc = Document::parse("<a><b>x</b><Signature><c/></Signature></a>").unwrap();
        let sig = doc.find_element("", "Signature").unwrap();
        let input = TransformData::Xml {
            doc: &doc,
            node_set: NodeSet::all_without_comments(&doc),
        };
        let out = EnvelopedSignatureTransform::new(sig)
            .execute(input)
            .unwrap()
            .to_binary()
            .unwrap();
        assert_eq!(out, b"<a><b>x</b></a>");
    }

    #[test]
    fn test_absent_signature_is_noop() {
        let doc = Document::parse(r#"<a><b Id="x">t</b><Signature/></a>"#).unwrap();
        let b = doc.find_element("", "b").unwrap();
        let sig = doc.find_element("", "Signature").unwrap();
        let set = NodeSet::tree_without_comments(b, &doc);
        let out = EnvelopedSignatureTransform::new(sig)
            .execute(TransformData::Xml {
                doc: &doc,
                node_set: set.clone(),
            })
            .unwrap();
        assert!(matches!(out, TransformData::Xml { node_set, .. } if node_set == set));
    }

    #[test]
    fn test_binary_input_rejected() {
        let doc = Document::parse("<a/>").unwrap();
        let sig = doc.document_element().unwrap();
        assert!(EnvelopedSignatureTransform::new(sig)
            .execute(TransformData::Binary(vec![1]))
            .is_err());
    }
}
