//! Signature checking for tests.
//!
//! Reads everything from the signed document itself (algorithms, transforms,
//! the certificate in `KeyInfo`) so it catches mistakes the signer's own
//! configuration would hide.

use base64::Engine;
use soapsig_c14n::C14nMode;
use soapsig_core::{algorithm, ns};
use soapsig_keys::Certificate;
use soapsig_transforms::{
    resolve_uri, C14nTransform, EnvelopedSignatureTransform, Transform, TransformData,
};
use soapsig_xml::{Document, IdResolver, NodeId, NodeSet};

fn b64(text: &str) -> Result<Vec<u8>, String> {
    let clean: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(clean)
        .map_err(|e| e.to_string())
}

fn child(doc: &Document, parent: NodeId, local_name: &str) -> Result<NodeId, String> {
    doc.find_child_element(parent, ns::DSIG, local_name)
        .ok_or_else(|| format!("missing {local_name}"))
}

fn algorithm_of(doc: &Document, id: NodeId) -> Result<String, String> {
    doc.element(id)
        .and_then(|e| e.attribute(ns::attr::ALGORITHM))
        .map(str::to_owned)
        .ok_or_else(|| "missing Algorithm".to_owned())
}

fn prefix_list(doc: &Document, id: NodeId) -> Vec<String> {
    doc.find_child_element(id, ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES)
        .and_then(|n| doc.element(n))
        .and_then(|e| e.attribute(ns::attr::PREFIX_LIST))
        .map(soapsig_c14n::exclusive::parse_prefix_list)
        .unwrap_or_default()
}

/// Verify the first `ds:Signature` in `xml`.
pub fn verify(xml: &str, id_attributes: &[&str]) -> Result<(), String> {
    let mut doc = Document::parse(xml).map_err(|e| e.to_string())?;
    IdResolver::new(id_attributes.iter().copied()).mark(&mut doc);
    let doc = doc;

    let sig = doc
        .find_element(ns::DSIG, ns::node::SIGNATURE)
        .ok_or("no Signature")?;
    let signed_info = child(&doc, sig, ns::node::SIGNED_INFO)?;
    let c14n_node = child(&doc, signed_info, ns::node::CANONICALIZATION_METHOD)?;
    let c14n_uri = algorithm_of(&doc, c14n_node)?;
    let c14n_mode = C14nMode::from_uri(&c14n_uri).ok_or("unknown canonicalization")?;
    let sig_method = algorithm_of(&doc, child(&doc, signed_info, ns::node::SIGNATURE_METHOD)?)?;

    for reference in doc.element_children(signed_info) {
        if !doc.element(reference).is_some_and(|e| e.is(ns::DSIG, ns::node::REFERENCE)) {
            continue;
        }
        verify_reference(&doc, sig, reference)?;
    }

    let cert_node = doc
        .find_element(ns::DSIG, ns::node::X509_CERTIFICATE)
        .ok_or("no X509Certificate")?;
    let certificate =
        Certificate::from_der(b64(&doc.text_content(cert_node))?).map_err(|e| e.to_string())?;
    let public_key = certificate.public_key().map_err(|e| e.to_string())?;

    let node_set = NodeSet::tree_without_comments(signed_info, &doc);
    let canonical = soapsig_c14n::canonicalize(
        &doc,
        c14n_mode,
        Some(&node_set),
        &prefix_list(&doc, c14n_node),
    )
    .map_err(|e| e.to_string())?;
    let value = b64(&doc.text_content(child(&doc, sig, ns::node::SIGNATURE_VALUE)?))?;
    let alg = soapsig_crypto::sign::from_uri(&sig_method).map_err(|e| e.to_string())?;
    match alg.verify(&public_key, &canonical, &value) {
        Ok(true) => Ok(()),
        Ok(false) => Err("signature value does not verify".to_owned()),
        Err(e) => Err(e.to_string()),
    }
}

fn verify_reference(doc: &Document, sig: NodeId, reference: NodeId) -> Result<(), String> {
    let uri = doc
        .element(reference)
        .and_then(|e| e.attribute(ns::attr::URI))
        .unwrap_or("");
    let mut data = TransformData::Xml {
        doc,
        node_set: resolve_uri(uri, doc).map_err(|e| e.to_string())?,
    };

    if let Some(transforms) = doc.find_child_element(reference, ns::DSIG, ns::node::TRANSFORMS) {
        for t in doc.element_children(transforms) {
            let t_uri = algorithm_of(doc, t)?;
            data = if t_uri == algorithm::ENVELOPED_SIGNATURE {
                EnvelopedSignatureTransform::new(sig).execute(data)
            } else {
                let mode = C14nMode::from_uri(&t_uri).ok_or("unknown transform")?;
                C14nTransform::new(mode, prefix_list(doc, t)).execute(data)
            }
            .map_err(|e| e.to_string())?;
        }
    }

    let digest_method = algorithm_of(doc, child(doc, reference, ns::node::DIGEST_METHOD)?)?;
    let expected = b64(&doc.text_content(child(doc, reference, ns::node::DIGEST_VALUE)?))?;
    let bytes = data.to_binary().map_err(|e| e.to_string())?;
    let computed =
        soapsig_crypto::digest::digest(&digest_method, &bytes).map_err(|e| e.to_string())?;
    if computed == expected {
        Ok(())
    } else {
        Err(format!("digest mismatch for reference '{uri}'"))
    }
}
