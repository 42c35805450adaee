#![forbid(unsafe_code)]

//! Reference digests, addressed by their XML-DSig `DigestMethod` URI.

use digest::Digest;
use soapsig_core::{algorithm, Error, Result};

/// A supported `DigestMethod`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestMethod {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
}

impl DigestMethod {
    pub const ALL: [DigestMethod; 9] = [
        Self::Sha1,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
        Self::Sha3_224,
        Self::Sha3_256,
        Self::Sha3_384,
        Self::Sha3_512,
    ];

    pub fn from_uri(uri: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.uri() == uri)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("digest algorithm: {uri}")))
    }

    pub fn uri(self) -> &'static str {
        match self {
            Self::Sha1 => algorithm::SHA1,
            Self::Sha224 => algorithm::SHA224,
            Self::Sha256 => algorithm::SHA256,
            Self::Sha384 => algorithm::SHA384,
            Self::Sha512 => algorithm::SHA512,
            Self::Sha3_224 => algorithm::SHA3_224,
            Self::Sha3_256 => algorithm::SHA3_256,
            Self::Sha3_384 => algorithm::SHA3_384,
            Self::Sha3_512 => algorithm::SHA3_512,
        }
    }

    /// Length of the digest value in bytes.
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 | Self::Sha3_224 => 28,
            Self::Sha256 | Self::Sha3_256 => 32,
            Self::Sha384 | Self::Sha3_384 => 48,
            Self::Sha512 | Self::Sha3_512 => 64,
        }
    }

    pub fn hash(self, data: &[u8]) -> Vec<u8> {
        fn run<D: Digest>(data: &[u8]) -> Vec<u8> {
            D::digest(data).to_vec()
        }
        match self {
            Self::Sha1 => run::<sha1::Sha1>(data),
            Self::Sha224 => run::<sha2::Sha224>(data),
            Self::Sha256 => run::<sha2::Sha256>(data),
            Self::Sha384 => run::<sha2::Sha384>(data),
            Self::Sha512 => run::<sha2::Sha512>(data),
            Self::Sha3_224 => run::<sha3::Sha3_224>(data),
            Self::Sha3_256 => run::<sha3::Sha3_256>(data),
            Self::Sha3_384 => run::<sha3::Sha3_384>(data),
            Self::Sha3_512 => run::<sha3::Sha3_512>(data),
        }
    }
}

/// Check a `DigestMethod` URI without hashing anything.
pub fn is_supported(uri: &str) -> bool {
    DigestMethod::from_uri(uri).is_ok()
}

/// Hash `data` with the digest named by `uri`.
pub fn digest(uri: &str, data: &[u8]) -> Result<Vec<u8>> {
    Ok(DigestMethod::from_uri(uri)?.hash(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_known_values() {
        assert_eq!(
            hex(&digest(algorithm::SHA1, b"abc").unwrap()),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            hex(&digest(algorithm::SHA256, b"hello").unwrap()),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(
            hex(&digest(algorithm::SHA3_256, b"").unwrap()),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn test_every_method_round_trips_its_uri() {
        for method in DigestMethod::ALL {
            assert_eq!(DigestMethod::from_uri(method.uri()).unwrap(), method);
            assert_eq!(method.hash(b"soap").len(), method.output_len(), "{method:?}");
        }
    }

    #[test]
    fn test_unknown_uri() {
        assert!(!is_supported("http://www.w3.org/2001/04/xmldsig-more#md5"));
        assert!(matches!(
            digest("urn:nope", b""),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }
}
