#![forbid(unsafe_code)]

//! Reference descriptors and their digests.

use crate::profile::SignatureProfile;
use soapsig_c14n::C14nMode;
use soapsig_core::{algorithm, Error, Result};
use soapsig_crypto::digest;
use soapsig_transforms::{
    resolve_uri, C14nTransform, EnvelopedSignatureTransform, TransformData, TransformPipeline,
};
use soapsig_xml::{Document, NodeId};
use tracing::debug;

/// One `<Reference>`: what is signed and how it is digested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    uri: String,
    digest_method: String,
    /// Transform algorithm URIs, in order.
    transforms: Vec<String>,
    canonicalization: C14nMode,
    inclusive_prefixes: Vec<String>,
    digest_value: Option<Vec<u8>>,
}

impl Reference {
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn digest_method(&self) -> &str {
        &self.digest_method
    }

    pub fn transforms(&self) -> &[String] {
        &self.transforms
    }

    /// PrefixList written under the exclusive C14N transform, if any.
    pub fn inclusive_prefixes(&self) -> &[String] {
        &self.inclusive_prefixes
    }

    /// Set once [`Reference::compute_digest`] has run.
    pub fn digest_value(&self) -> Option<&[u8]> {
        self.digest_value.as_deref()
    }

    /// Resolve the URI, run the transform chain and digest the result.
    ///
    /// `signature` is the Signature element the enveloped transform removes.
    pub fn digest(&self, doc: &Document, signature: NodeId) -> Result<Vec<u8>> {
        let node_set = resolve_uri(&self.uri, doc)?;
        let mut pipeline = TransformPipeline::new();
        pipeline.push(Box::new(EnvelopedSignatureTransform::new(signature)));
        if self.canonicalization != C14nMode::Inclusive {
            pipeline.push(Box::new(C14nTransform::new(
                self.canonicalization,
                self.inclusive_prefixes.clone(),
            )));
        }

        let data = pipeline.execute(TransformData::Xml { doc, node_set })?;
        let bytes = data.to_binary()?;
        let value = digest::digest(&self.digest_method, &bytes)?;
        debug!(
            uri = %self.uri,
            digest_method = algorithm::short_name(&self.digest_method),
            canonical_len = bytes.len(),
            "computed reference digest"
        );
        Ok(value)
    }

    /// Compute and store the digest value.
    pub fn compute_digest(&mut self, doc: &Document, signature: NodeId) -> Result<&[u8]> {
        let value = self.digest(doc, signature)?;
        Ok(self.digest_value.insert(value).as_slice())
    }
}

/// Builds one [`Reference`] per URI under a profile.
#[derive(Debug, Clone)]
pub struct ReferenceBuilder<'a> {
    profile: &'a SignatureProfile,
}

impl<'a> ReferenceBuilder<'a> {
    pub fn new(profile: &'a SignatureProfile) -> Self {
        Self { profile }
    }

    /// Build a descriptor for a `""` or `#id` URI.
    ///
    /// The transform chain is enveloped-signature, followed by the profile's
    /// canonicalization unless it is plain Canonical XML 1.0, which is what
    /// a verifier applies to a node set anyway.
    pub fn build(&self, uri: &str) -> Result<Reference> {
        check_uri(uri)?;
        let canonicalization = self.profile.canonicalization();
        let mut transforms = vec![algorithm::ENVELOPED_SIGNATURE.to_owned()];
        if canonicalization != C14nMode::Inclusive {
            transforms.push(canonicalization.uri().to_owned());
        }
        Ok(Reference {
            uri: uri.to_owned(),
            digest_method: self.profile.digest_method().to_owned(),
            transforms,
            canonicalization,
            inclusive_prefixes: self.profile.c14n_prefixes(),
            digest_value: None,
        })
    }

    /// Build descriptors for all URIs, preserving order.
    pub fn build_all<S: AsRef<str>>(&self, uris: &[S]) -> Result<Vec<Reference>> {
        check_uris(uris)?;
        uris.iter().map(|u| self.build(u.as_ref())).collect()
    }
}

/// Reject a reference list a verifier could not accept: an empty list
/// (`SignedInfo` needs at least one `Reference`) or any URI other than
/// `""` and `#id`. Runs before any document or key is touched.
pub fn check_uris<S: AsRef<str>>(uris: &[S]) -> Result<()> {
    if uris.is_empty() {
        return Err(Error::invalid_reference(
            "",
            "no reference URIs given; SignedInfo needs at least one Reference",
        ));
    }
    uris.iter().try_for_each(|u| check_uri(u.as_ref()))
}

fn check_uri(uri: &str) -> Result<()> {
    if uri.is_empty() {
        return Ok(());
    }
    match uri.strip_prefix('#') {
        Some(id) if !id.is_empty() && !id.starts_with("xpointer(") => Ok(()),
        Some(_) => Err(Error::invalid_reference(uri, "unsupported fragment identifier")),
        None => Err(Error::invalid_reference(
            uri,
            "only \"\" and same-document \"#id\" references are supported",
        )),
    }
}
