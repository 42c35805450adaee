#![forbid(unsafe_code)]

//! PKCS#12 (.p12/.pfx) parser for soapsig.
//!
//! Reads the key stores OpenSSL and Java write: legacy
//! `pbeWithSHAAnd3-KeyTripleDES-CBC`, PBES2 (PBKDF2 with AES-CBC), and
//! unencrypted bags. Bag attributes (`friendlyName`, `localKeyId`) are
//! kept so callers can look keys up by alias and pair them with their
//! certificates.

mod parse;
mod pbe;

/// Errors from PKCS#12 parsing.
#[derive(Debug, thiserror::Error)]
pub enum Pkcs12Error {
    /// The data is not a well-formed PFX, or uses an unsupported scheme.
    #[error("malformed PKCS#12 data: {0}")]
    Malformed(String),

    /// The integrity MAC does not match; almost always a wrong password.
    #[error("PKCS#12 MAC verification failed")]
    MacMismatch,

    /// Decryption produced invalid padding; almost always a wrong password.
    #[error("PKCS#12 decryption failed: {0}")]
    Decrypt(&'static str),
}

impl Pkcs12Error {
    /// Whether the failure points at the password rather than the file.
    pub fn wrong_password(&self) -> bool {
        matches!(self, Self::MacMismatch | Self::Decrypt(_))
    }
}

/// Key store aliases compare case-insensitively, as Java key stores do.
pub fn alias_matches(stored: &str, requested: &str) -> bool {
    stored == requested || stored.to_lowercase() == requested.to_lowercase()
}

/// Attributes attached to a SafeBag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BagAttributes {
    /// PKCS#9 `friendlyName` (the key store alias).
    pub friendly_name: Option<String>,
    /// PKCS#9 `localKeyId`, shared by a key and its certificate.
    pub local_key_id: Option<Vec<u8>>,
}

/// A decrypted private key.
pub struct KeyBag {
    /// PKCS#8 DER-encoded private key.
    pub pkcs8_der: Vec<u8>,
    pub attributes: BagAttributes,
}

impl std::fmt::Debug for KeyBag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyBag")
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

/// A certificate.
#[derive(Debug, Clone)]
pub struct CertBag {
    /// DER-encoded X.509 certificate.
    pub der: Vec<u8>,
    pub attributes: BagAttributes,
}

/// Contents extracted from a PKCS#12 file.
#[derive(Debug, Default)]
pub struct Pkcs12Contents {
    pub keys: Vec<KeyBag>,
    pub certificates: Vec<CertBag>,
}

impl Pkcs12Contents {
    /// The key whose `friendlyName` matches `alias`, ignoring case.
    pub fn key_by_alias(&self, alias: &str) -> Option<&KeyBag> {
        self.keys.iter().find(|k| {
            k.attributes
                .friendly_name
                .as_deref()
                .is_some_and(|name| alias_matches(name, alias))
        })
    }

    /// Every alias in the file, keys and certificates alike.
    pub fn aliases(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .keys
            .iter()
            .map(|k| &k.attributes)
            .chain(self.certificates.iter().map(|c| &c.attributes))
            .filter_map(|a| a.friendly_name.as_deref())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

/// Parse a PKCS#12 file, decrypting with the given password.
pub fn parse_pkcs12(data: &[u8], password: &str) -> Result<Pkcs12Contents, Pkcs12Error> {
    parse::open(data, password)
}
