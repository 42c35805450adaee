#![forbid(unsafe_code)]

//! Enveloped signature creation.
//!
//! Signing is split in two so the caller can place the signature before
//! anything is digested:
//!
//! 1. [`SignatureEngine::prepare`] builds the `<Signature>` element with
//!    empty `DigestValue`/`SignatureValue` as a detached subtree.
//! 2. The caller inserts it at its final position.
//! 3. [`SignatureEngine::complete`] digests each reference (the enveloped
//!    transform drops the signature again), canonicalizes `SignedInfo` in
//!    place and fills in the signature value.
//!
//! The canonical form of `SignedInfo` depends on the namespaces in scope
//! where it sits, which is why step 3 must run after step 2.

use crate::keyinfo::KeyInfo;
use crate::profile::SignatureProfile;
use crate::reference::{Reference, ReferenceBuilder};
use base64::Engine;
use soapsig_c14n::C14nMode;
use soapsig_core::{ns, Result};
use soapsig_crypto::{sign, SignatureAlgorithm, SigningKey};
use soapsig_keys::CredentialBundle;
use soapsig_xml::{Document, Element, NodeId, NodeSet};
use tracing::debug;

/// The `<SignedInfo>` content of a finished signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInfo {
    pub canonicalization_method: String,
    pub signature_method: String,
    pub references: Vec<Reference>,
}

/// A finished signature, as written into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub signed_info: SignedInfo,
    pub key_info: KeyInfo,
    pub signature_value: Vec<u8>,
}

/// A `<Signature>` skeleton waiting for its digests and signature value.
#[derive(Debug)]
pub struct SignatureTemplate {
    signature: NodeId,
    signed_info: NodeId,
    digest_values: Vec<NodeId>,
    signature_value: NodeId,
    references: Vec<Reference>,
    key_info: KeyInfo,
}

impl SignatureTemplate {
    /// The `<Signature>` element, detached until the caller inserts it.
    pub fn signature(&self) -> NodeId {
        self.signature
    }

    pub fn signed_info(&self) -> NodeId {
        self.signed_info
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }
}

/// Creates enveloped signatures under a fixed profile.
pub struct SignatureEngine {
    profile: SignatureProfile,
    algorithm: Box<dyn SignatureAlgorithm>,
}

impl std::fmt::Debug for SignatureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureEngine")
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

impl SignatureEngine {
    /// Fails with `UnsupportedAlgorithm` if the profile names an
    /// unimplemented signature or digest method.
    pub fn new(profile: SignatureProfile) -> Result<Self> {
        profile.validate()?;
        let algorithm = sign::from_uri(profile.signature_method())?;
        Ok(Self { profile, algorithm })
    }

    pub fn profile(&self) -> &SignatureProfile {
        &self.profile
    }

    /// Build the reference descriptors and the detached `<Signature>`
    /// skeleton for `reference_uris`.
    pub fn prepare<S: AsRef<str>>(
        &self,
        doc: &mut Document,
        reference_uris: &[S],
        credential: &CredentialBundle,
    ) -> Result<SignatureTemplate> {
        let references = ReferenceBuilder::new(&self.profile).build_all(reference_uris)?;
        let key_info = KeyInfo::from_certificate(credential.certificate());
        let template = SkeletonBuilder::new(doc, &self.profile).build(references, key_info);
        debug!(
            references = template.references.len(),
            "built signature skeleton"
        );
        Ok(template)
    }

    /// Digest every reference, then sign the canonical `SignedInfo`.
    pub fn complete(
        &self,
        doc: &mut Document,
        template: SignatureTemplate,
        key: &SigningKey,
    ) -> Result<Signature> {
        let SignatureTemplate {
            signature,
            signed_info,
            digest_values,
            signature_value,
            mut references,
            key_info,
        } = template;

        for (reference, &node) in references.iter_mut().zip(&digest_values) {
            let digest = reference.compute_digest(doc, signature)?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(digest);
            doc.set_text(node, &encoded);
        }

        let canonical = canonicalize_signed_info(doc, signed_info, &self.profile)?;
        debug!(len = canonical.len(), "canonicalized SignedInfo");

        let value = self.algorithm.sign(key, &canonical)?;
        doc.set_text(
            signature_value,
            &base64::engine::general_purpose::STANDARD.encode(&value),
        );

        Ok(Signature {
            signed_info: SignedInfo {
                canonicalization_method: self.profile.canonicalization().uri().to_owned(),
                signature_method: self.profile.signature_method().to_owned(),
                references,
            },
            key_info,
            signature_value: value,
        })
    }

    /// Sign in one step, appending the signature as the last child of `parent`.
    pub fn sign_enveloped<S: AsRef<str>>(
        &self,
        doc: &mut Document,
        parent: NodeId,
        reference_uris: &[S],
        credential: &CredentialBundle,
    ) -> Result<Signature> {
        let template = self.prepare(doc, reference_uris, credential)?;
        doc.append_child(parent, template.signature());
        self.complete(doc, template, credential.private_key())
    }
}

/// Canonical bytes of a `SignedInfo` element, as signed and verified.
pub fn canonicalize_signed_info(
    doc: &Document,
    signed_info: NodeId,
    profile: &SignatureProfile,
) -> Result<Vec<u8>> {
    let mode = profile.canonicalization();
    let node_set = NodeSet::tree_without_comments(signed_info, doc);
    soapsig_c14n::canonicalize(doc, mode, Some(&node_set), &profile.c14n_prefixes())
}

// ── Skeleton ─────────────────────────────────────────────────────────

struct SkeletonBuilder<'a> {
    doc: &'a mut Document,
    profile: &'a SignatureProfile,
}

impl<'a> SkeletonBuilder<'a> {
    fn new(doc: &'a mut Document, profile: &'a SignatureProfile) -> Self {
        Self { doc, profile }
    }

    fn build(mut self, references: Vec<Reference>, key_info: KeyInfo) -> SignatureTemplate {
        let profile = self.profile;
        let mut root = Element::new(Some(profile.prefix()), ns::node::SIGNATURE, Some(ns::DSIG));
        root.declare_namespace(profile.prefix(), ns::DSIG);
        let signature = self.doc.create_element(root);

        let signed_info = self.child(signature, ns::node::SIGNED_INFO);
        let c14n = self.algorithm_child(
            signed_info,
            ns::node::CANONICALIZATION_METHOD,
            profile.canonicalization().uri(),
        );
        self.inclusive_namespaces(c14n, profile.canonicalization());
        self.algorithm_child(signed_info, ns::node::SIGNATURE_METHOD, profile.signature_method());

        let mut digest_values = Vec::with_capacity(references.len());
        for reference in &references {
            digest_values.push(self.reference(signed_info, reference));
        }

        let signature_value = self.child(signature, ns::node::SIGNATURE_VALUE);

        let key_info_node = self.child(signature, ns::node::KEY_INFO);
        let x509_data = self.child(key_info_node, ns::node::X509_DATA);
        let subject = self.child(x509_data, ns::node::X509_SUBJECT_NAME);
        self.doc.set_text(subject, &key_info.subject_name);
        let cert = self.child(x509_data, ns::node::X509_CERTIFICATE);
        self.doc.set_text(cert, &key_info.certificate_base64());

        SignatureTemplate {
            signature,
            signed_info,
            digest_values,
            signature_value,
            references,
            key_info,
        }
    }

    fn reference(&mut self, signed_info: NodeId, reference: &Reference) -> NodeId {
        let node = self.child(signed_info, ns::node::REFERENCE);
        if let Some(e) = self.doc.element_mut(node) {
            e.set_attribute(ns::attr::URI, reference.uri());
        }

        let transforms = self.child(node, ns::node::TRANSFORMS);
        for uri in reference.transforms() {
            let transform = self.algorithm_child(transforms, ns::node::TRANSFORM, uri);
            if let Some(mode) = C14nMode::from_uri(uri) {
                self.inclusive_namespaces(transform, mode);
            }
        }
        self.algorithm_child(node, ns::node::DIGEST_METHOD, reference.digest_method());
        self.child(node, ns::node::DIGEST_VALUE)
    }

    fn inclusive_namespaces(&mut self, parent: NodeId, mode: C14nMode) {
        let prefixes = self.profile.inclusive_prefixes();
        let prefixes = prefixes.join(" ");
        if !mode.is_exclusive() || prefixes.trim().is_empty() {
            return;
        }
        let mut elem = Element::new(
            Some(ns::DEFAULT_EXC_C14N_PREFIX),
            ns::node::INCLUSIVE_NAMESPACES,
            Some(ns::EXC_C14N),
        );
        elem.declare_namespace(ns::DEFAULT_EXC_C14N_PREFIX, ns::EXC_C14N);
        elem.set_attribute(ns::attr::PREFIX_LIST, &prefixes);
        let id = self.doc.create_element(elem);
        self.doc.append_child(parent, id);
    }

    fn child(&mut self, parent: NodeId, local_name: &str) -> NodeId {
        let profile = self.profile;
        let elem = Element::new(Some(profile.prefix()), local_name, Some(ns::DSIG));
        let id = self.doc.create_element(elem);
        self.doc.append_child(parent, id);
        id
    }

    fn algorithm_child(&mut self, parent: NodeId, local_name: &str, algorithm: &str) -> NodeId {
        let id = self.child(parent, local_name);
        if let Some(e) = self.doc.element_mut(id) {
            e.set_attribute(ns::attr::ALGORITHM, algorithm);
        }
        id
    }
}
