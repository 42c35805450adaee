#![forbid(unsafe_code)]

//! Private key and certificate loading from PEM, DER and PKCS#8.

use crate::credential::Certificate;
use soapsig_crypto::SigningKey;

/// Why key material could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("invalid PEM: {0}")]
    Pem(String),

    #[error("unexpected PEM label '{0}'")]
    Label(String),

    #[error("unsupported or malformed private key")]
    PrivateKey,

    #[error("malformed X.509 certificate: {0}")]
    Certificate(String),

    #[error("unsupported public key algorithm in X.509 certificate")]
    PublicKey,
}

/// Load a private key from PKCS#8 DER bytes (as extracted from PKCS#12 or other containers).
///
/// Tries RSA, then EC P-256, P-384 in order.
pub fn load_private_key_pkcs8_der(der: &[u8]) -> Result<SigningKey, LoadError> {
    use pkcs8::DecodePrivateKey;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
        return Ok(SigningKey::Rsa(pk));
    }
    if let Ok(sk) = p256::ecdsa::SigningKey::from_pkcs8_der(der) {
        return Ok(SigningKey::EcP256(sk));
    }
    if let Ok(sk) = p384::ecdsa::SigningKey::from_pkcs8_der(der) {
        return Ok(SigningKey::EcP384(sk));
    }
    Err(LoadError::PrivateKey)
}

/// Load a private key from DER, PKCS#8 first, then PKCS#1 RSA.
pub fn load_private_key_der(der: &[u8]) -> Result<SigningKey, LoadError> {
    use pkcs1::DecodeRsaPrivateKey;

    match load_private_key_pkcs8_der(der) {
        Ok(key) => Ok(key),
        Err(_) => rsa::RsaPrivateKey::from_pkcs1_der(der)
            .map(SigningKey::Rsa)
            .map_err(|_| LoadError::PrivateKey),
    }
}

/// Load a private key from PEM (`PRIVATE KEY` or `RSA PRIVATE KEY`).
pub fn load_private_key_pem(pem_data: &[u8]) -> Result<SigningKey, LoadError> {
    let (label, der_bytes) = decode_pem(pem_data)?;
    match label.as_str() {
        "PRIVATE KEY" => load_private_key_pkcs8_der(&der_bytes),
        "RSA PRIVATE KEY" => {
            use pkcs1::DecodeRsaPrivateKey;
            rsa::RsaPrivateKey::from_pkcs1_der(&der_bytes)
                .map(SigningKey::Rsa)
                .map_err(|_| LoadError::PrivateKey)
        }
        _ => Err(LoadError::Label(label)),
    }
}

/// Load a certificate from PEM.
pub fn load_x509_cert_pem(pem_data: &[u8]) -> Result<Certificate, LoadError> {
    let (label, der_bytes) = decode_pem(pem_data)?;
    if label != "CERTIFICATE" {
        return Err(LoadError::Label(label));
    }
    Certificate::from_der(der_bytes)
}

/// The public key carried by a DER-encoded certificate.
pub fn load_x509_public_key(cert_der: &[u8]) -> Result<SigningKey, LoadError> {
    use der::{Decode, Encode};
    use spki::DecodePublicKey;

    let cert = x509_cert::Certificate::from_der(cert_der)
        .map_err(|e| LoadError::Certificate(e.to_string()))?;
    let spki_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| LoadError::Certificate(e.to_string()))?;

    if let Ok(pk) = rsa::RsaPublicKey::from_public_key_der(&spki_der) {
        return Ok(SigningKey::RsaPublic(pk));
    }
    if let Ok(vk) = p256::ecdsa::VerifyingKey::from_public_key_der(&spki_der) {
        return Ok(SigningKey::EcP256Public(vk));
    }
    if let Ok(vk) = p384::ecdsa::VerifyingKey::from_public_key_der(&spki_der) {
        return Ok(SigningKey::EcP384Public(vk));
    }
    Err(LoadError::PublicKey)
}

fn decode_pem(pem_data: &[u8]) -> Result<(String, Vec<u8>), LoadError> {
    let text = std::str::from_utf8(pem_data).map_err(|e| LoadError::Pem(e.to_string()))?;
    // Some PEM files have extra newlines
    let (label, der_bytes) = pem_rfc7468::decode_vec(text.trim().as_bytes())
        .map_err(|e| LoadError::Pem(e.to_string()))?;
    Ok((label.to_owned(), der_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> Vec<u8> {
        let path = format!("{}/../../test-data/keys/{name}", env!("CARGO_MANIFEST_DIR"));
        std::fs::read(path).unwrap()
    }

    #[test]
    fn test_load_rsa_pem() {
        let key = load_private_key_pem(&fixture("rsa-2048-key.pem")).unwrap();
        assert!(matches!(key, SigningKey::Rsa(_)));
    }

    #[test]
    fn test_load_ec_pem() {
        let key = load_private_key_pem(&fixture("ec-p256-key.pem")).unwrap();
        assert!(matches!(key, SigningKey::EcP256(_)));
    }

    #[test]
    fn test_certificate_public_key_matches_private_key() {
        let key = load_private_key_pem(&fixture("rsa-2048-key.pem")).unwrap();
        let cert = load_x509_cert_pem(&fixture("rsa-2048-cert.pem")).unwrap();
        let public = load_x509_public_key(cert.der()).unwrap();
        assert!(matches!(public, SigningKey::RsaPublic(_)));
        assert_eq!(public, key);

        let ec_cert = load_x509_cert_pem(&fixture("ec-p256-cert.pem")).unwrap();
        assert_ne!(load_x509_public_key(ec_cert.der()).unwrap(), key);
    }

    #[test]
    fn test_wrong_label() {
        let err = load_x509_cert_pem(&fixture("rsa-2048-key.pem")).unwrap_err();
        assert!(matches!(err, LoadError::Label(label) if label == "PRIVATE KEY"));
        let err = load_private_key_pem(&fixture("rsa-2048-cert.pem")).unwrap_err();
        assert!(matches!(err, LoadError::Label(_)));
    }

    #[test]
    fn test_garbage_der() {
        assert!(matches!(
            load_private_key_der(&[0x30, 0x03, 0x02, 0x01, 0x00]),
            Err(LoadError::PrivateKey)
        ));
        assert!(load_x509_public_key(b"not a certificate").is_err());
    }
}
