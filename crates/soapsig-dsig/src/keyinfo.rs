#![forbid(unsafe_code)]

//! `<KeyInfo>` content identifying the signer's certificate.

use base64::Engine;
use soapsig_keys::Certificate;

/// Subject name and DER bytes of the signing certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    pub subject_name: String,
    pub certificate_der: Vec<u8>,
}

impl KeyInfo {
    pub fn from_certificate(certificate: &Certificate) -> Self {
        Self {
            subject_name: certificate.subject_name().to_owned(),
            certificate_der: certificate.der().to_vec(),
        }
    }

    /// Standard base64 of the certificate, as written into `X509Certificate`.
    pub fn certificate_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.certificate_der)
    }
}
