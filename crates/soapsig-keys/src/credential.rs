#![forbid(unsafe_code)]

//! The credential handed to the signer: a private key and its certificate.

use crate::loader::{self, LoadError};
use soapsig_crypto::SigningKey;

/// A DER-encoded X.509 certificate with its subject name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    subject_name: String,
}

impl Certificate {
    /// Parse a DER certificate and record its subject name as an RFC 4514 string.
    pub fn from_der(der: Vec<u8>) -> Result<Self, LoadError> {
        use der::Decode;

        let cert = x509_cert::Certificate::from_der(&der)
            .map_err(|e| LoadError::Certificate(e.to_string()))?;
        let subject_name = cert.tbs_certificate.subject.to_string();
        Ok(Self { der, subject_name })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject distinguished name, e.g. `CN=mykey,O=Example,C=NL`.
    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    /// The certificate's public key.
    pub fn public_key(&self) -> Result<SigningKey, LoadError> {
        loader::load_x509_public_key(&self.der)
    }
}

/// A private key, its certificate and the alias it was loaded under.
///
/// Loaded once per signing call and dropped afterwards. `Debug` never
/// prints key material.
#[derive(Clone)]
pub struct CredentialBundle {
    alias: String,
    private_key: SigningKey,
    certificate: Certificate,
}

impl CredentialBundle {
    pub fn new(alias: impl Into<String>, private_key: SigningKey, certificate: Certificate) -> Self {
        Self {
            alias: alias.into(),
            private_key,
            certificate,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn private_key(&self) -> &SigningKey {
        &self.private_key
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }
}

impl std::fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("alias", &self.alias)
            .field("private_key", &self.private_key.kind())
            .field("subject", &self.certificate.subject_name)
            .finish()
    }
}
