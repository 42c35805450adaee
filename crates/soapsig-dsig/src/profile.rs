#![forbid(unsafe_code)]

//! Signature profile: the algorithm suite and naming used for a signature.

use soapsig_c14n::C14nMode;
use soapsig_core::{algorithm, ns, Error, Result};
use soapsig_crypto::{digest, sign};

/// Algorithms and prefix used to build a signature.
///
/// The default is the suite most SOAP relying parties still expect:
/// Canonical XML 1.0, RSA-SHA1 and SHA-1, under the `ds` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureProfile {
    canonicalization: C14nMode,
    signature_method: String,
    digest_method: String,
    inclusive_prefixes: Vec<String>,
    prefix: String,
}

impl Default for SignatureProfile {
    fn default() -> Self {
        Self {
            canonicalization: C14nMode::Inclusive,
            signature_method: algorithm::RSA_SHA1.to_owned(),
            digest_method: algorithm::SHA1.to_owned(),
            inclusive_prefixes: Vec::new(),
            prefix: ns::DEFAULT_DSIG_PREFIX.to_owned(),
        }
    }
}

impl SignatureProfile {
    /// Exclusive C14N, RSA-SHA256 and SHA-256.
    pub fn rsa_sha256_exclusive() -> Self {
        Self {
            canonicalization: C14nMode::Exclusive,
            signature_method: algorithm::RSA_SHA256.to_owned(),
            digest_method: algorithm::SHA256.to_owned(),
            ..Self::default()
        }
    }

    /// Build a profile from algorithm URIs.
    ///
    /// Fails with `UnsupportedAlgorithm` if any of them is not implemented.
    pub fn from_uris(c14n: &str, signature_method: &str, digest_method: &str) -> Result<Self> {
        let canonicalization = C14nMode::from_uri(c14n)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("canonicalization: {c14n}")))?;
        let profile = Self {
            canonicalization,
            signature_method: signature_method.to_owned(),
            digest_method: digest_method.to_owned(),
            ..Self::default()
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn with_canonicalization(mut self, mode: C14nMode) -> Self {
        self.canonicalization = mode;
        self
    }

    pub fn with_signature_method(mut self, uri: impl Into<String>) -> Self {
        self.signature_method = uri.into();
        self
    }

    pub fn with_digest_method(mut self, uri: impl Into<String>) -> Self {
        self.digest_method = uri.into();
        self
    }

    /// InclusiveNamespaces PrefixList for exclusive C14N. `#default` names
    /// the default namespace.
    pub fn with_inclusive_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inclusive_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Namespace prefix of the signature elements; empty for the default namespace.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn canonicalization(&self) -> C14nMode {
        self.canonicalization
    }

    pub fn signature_method(&self) -> &str {
        &self.signature_method
    }

    pub fn digest_method(&self) -> &str {
        &self.digest_method
    }

    pub fn inclusive_prefixes(&self) -> &[String] {
        &self.inclusive_prefixes
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prefixes handed to the canonicalizer. Empty unless exclusive.
    pub fn c14n_prefixes(&self) -> Vec<String> {
        if !self.canonicalization.is_exclusive() {
            return Vec::new();
        }
        soapsig_c14n::exclusive::parse_prefix_list(&self.inclusive_prefixes.join(" "))
    }

    /// Check that the signature and digest methods are implemented.
    pub fn validate(&self) -> Result<()> {
        sign::from_uri(&self.signature_method)?;
        if !digest::is_supported(&self.digest_method) {
            return Err(Error::UnsupportedAlgorithm(format!(
                "digest: {}",
                self.digest_method
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_legacy_suite() {
        let p = SignatureProfile::default();
        assert_eq!(p.canonicalization(), C14nMode::Inclusive);
        assert_eq!(p.signature_method(), algorithm::RSA_SHA1);
        assert_eq!(p.digest_method(), algorithm::SHA1);
        assert_eq!(p.prefix(), "ds");
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_from_uris() {
        let p = SignatureProfile::from_uris(
            algorithm::EXC_C14N,
            algorithm::ECDSA_SHA256,
            algorithm::SHA256,
        )
        .unwrap();
        assert!(p.canonicalization().is_exclusive());

        for (c, s, d) in [
            ("urn:c14n", algorithm::RSA_SHA1, algorithm::SHA1),
            (algorithm::C14N, "urn:sig", algorithm::SHA1),
            (algorithm::C14N, algorithm::RSA_SHA1, "urn:digest"),
        ] {
            assert!(matches!(
                SignatureProfile::from_uris(c, s, d),
                Err(Error::UnsupportedAlgorithm(_))
            ));
        }
    }

    #[test]
    fn test_prefix_list_only_for_exclusive() {
        let p = SignatureProfile::rsa_sha256_exclusive().with_inclusive_prefixes(["soap", "#default"]);
        assert_eq!(p.c14n_prefixes(), ["soap", "#default"]);
        let p = p.with_canonicalization(C14nMode::Inclusive11);
        assert!(p.c14n_prefixes().is_empty());
    }
}
