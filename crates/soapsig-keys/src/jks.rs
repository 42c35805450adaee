#![forbid(unsafe_code)]

//! Java KeyStore (`JKS`) files, the format `keytool` wrote by default
//! before Java 9.
//!
//! A store is the magic `FEEDFEED`, a version (1 or 2), an entry count,
//! the entries, and a trailing SHA-1 over the UTF-16BE password, the
//! phrase `Mighty Aphrodite` and every preceding byte. Private keys are
//! PKCS#8 DER behind Sun's SHA-1 key protector.

use sha1::{Digest, Sha1};
use soapsig_pkcs12::alias_matches;

const MAGIC: u32 = 0xFEED_FEED;
const INTEGRITY_PHRASE: &[u8] = b"Mighty Aphrodite";
const DIGEST_LEN: usize = 20;

const PRIVATE_KEY_ENTRY: u32 = 1;
const TRUSTED_CERT_ENTRY: u32 = 2;

/// `1.3.6.1.4.1.42.2.17.1.1`, Sun's proprietary key protection.
const KEY_PROTECTOR: &[u64] = &[1, 3, 6, 1, 4, 1, 42, 2, 17, 1, 1];

#[derive(Debug, thiserror::Error)]
pub enum JksError {
    #[error("malformed Java KeyStore: {0}")]
    Malformed(String),

    /// Java reports this as "Keystore was tampered with, or password was incorrect".
    #[error("Java KeyStore integrity check failed")]
    IntegrityMismatch,

    #[error("cannot recover the private key of '{0}'")]
    KeyRecovery(String),
}

impl JksError {
    /// Whether the failure points at the password rather than the file.
    pub fn wrong_password(&self) -> bool {
        matches!(self, Self::IntegrityMismatch | Self::KeyRecovery(_))
    }
}

/// A private key entry, still protected.
#[derive(Clone)]
pub struct JksKeyEntry {
    alias: String,
    protected_key: Vec<u8>,
    chain: Vec<Vec<u8>>,
}

impl JksKeyEntry {
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// DER certificates, leaf first.
    pub fn certificate_chain(&self) -> &[Vec<u8>] {
        &self.chain
    }

    /// Undo the key protector and return the PKCS#8 DER private key.
    pub fn recover_key(&self, password: &str) -> Result<Vec<u8>, JksError> {
        let encrypted = yasna::parse_der(&self.protected_key, |r| {
            r.read_sequence(|r| {
                let algorithm = r.next().read_sequence(|r| {
                    let oid = r.next().read_oid()?;
                    r.read_optional(|r| r.read_null())?;
                    Ok(oid)
                })?;
                if algorithm.components().as_slice() != KEY_PROTECTOR {
                    return Err(yasna::ASN1Error::new(yasna::ASN1ErrorKind::Invalid));
                }
                r.next().read_bytes()
            })
        })
        .map_err(|e| JksError::Malformed(format!("protected key of '{}': {e}", self.alias)))?;

        if encrypted.len() < 2 * DIGEST_LEN {
            return Err(JksError::Malformed(format!(
                "protected key of '{}' is truncated",
                self.alias
            )));
        }
        let (salt, rest) = encrypted.split_at(DIGEST_LEN);
        let (ciphertext, check) = rest.split_at(rest.len() - DIGEST_LEN);
        let password = utf16be(password);

        // Keystream blocks are SHA-1(password || previous block), seeded by the salt.
        let mut block = salt.to_vec();
        let mut plain = Vec::with_capacity(ciphertext.len());
        for chunk in ciphertext.chunks(DIGEST_LEN) {
            block = Sha1::new()
                .chain_update(&password)
                .chain_update(&block)
                .finalize()
                .to_vec();
            plain.extend(chunk.iter().zip(&block).map(|(c, k)| c ^ k));
        }

        let expected = Sha1::new()
            .chain_update(&password)
            .chain_update(&plain)
            .finalize();
        if expected.as_slice() != check {
            return Err(JksError::KeyRecovery(self.alias.clone()));
        }
        Ok(plain)
    }
}

impl std::fmt::Debug for JksKeyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JksKeyEntry")
            .field("alias", &self.alias)
            .field("chain", &self.chain.len())
            .finish_non_exhaustive()
    }
}

/// The entries of a verified store.
#[derive(Debug, Default)]
pub struct JksContents {
    pub keys: Vec<JksKeyEntry>,
    /// Trusted certificate entries as `(alias, DER)`.
    pub trusted: Vec<(String, Vec<u8>)>,
}

impl JksContents {
    /// The key entry under `alias`, ignoring case.
    pub fn key_entry(&self, alias: &str) -> Option<&JksKeyEntry> {
        self.keys.iter().find(|k| alias_matches(&k.alias, alias))
    }

    pub fn aliases(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .keys
            .iter()
            .map(|k| k.alias.as_str())
            .chain(self.trusted.iter().map(|(a, _)| a.as_str()))
            .collect();
        out.sort_unstable();
        out
    }
}

/// Whether `data` starts with the JKS magic.
pub fn is_jks(data: &[u8]) -> bool {
    data.get(..4) == Some(&MAGIC.to_be_bytes()[..])
}

/// Check the store's integrity digest with `password` and read its entries.
pub fn parse_jks(data: &[u8], password: &str) -> Result<JksContents, JksError> {
    if !is_jks(data) {
        return Err(JksError::Malformed("missing FEEDFEED magic".into()));
    }
    if data.len() < 12 + DIGEST_LEN {
        return Err(JksError::Malformed("truncated".into()));
    }
    let (body, digest) = data.split_at(data.len() - DIGEST_LEN);
    let computed = Sha1::new()
        .chain_update(utf16be(password))
        .chain_update(INTEGRITY_PHRASE)
        .chain_update(body)
        .finalize();
    if computed.as_slice() != digest {
        return Err(JksError::IntegrityMismatch);
    }

    let mut input = Input { data: body, pos: 4 };
    let version = input.u32()?;
    if version != 1 && version != 2 {
        return Err(JksError::Malformed(format!("unknown version {version}")));
    }
    let count = input.u32()?;

    let mut contents = JksContents::default();
    for _ in 0..count {
        let tag = input.u32()?;
        let alias = input.utf()?;
        let _created_millis = input.u64()?;
        match tag {
            PRIVATE_KEY_ENTRY => {
                let protected_key = input.blob()?.to_vec();
                let chain_len = input.u32()?;
                let chain = (0..chain_len)
                    .map(|_| input.certificate(version))
                    .collect::<Result<Vec<_>, _>>()?;
                contents.keys.push(JksKeyEntry {
                    alias,
                    protected_key,
                    chain,
                });
            }
            TRUSTED_CERT_ENTRY => {
                let der = input.certificate(version)?;
                contents.trusted.push((alias, der));
            }
            other => {
                return Err(JksError::Malformed(format!(
                    "entry '{alias}' has unknown tag {other}"
                )))
            }
        }
    }
    if input.pos != body.len() {
        return Err(JksError::Malformed("trailing bytes after last entry".into()));
    }
    Ok(contents)
}

fn utf16be(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

/// Big-endian reader over the store body, in `java.io.DataInputStream` terms.
struct Input<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Input<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], JksError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| JksError::Malformed("unexpected end of data".into()))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u16(&mut self) -> Result<u16, JksError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, JksError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, JksError> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_be_bytes(buf))
    }

    /// A `writeUTF` string. Aliases are ASCII in practice, so modified
    /// UTF-8 is read as plain UTF-8.
    fn utf(&mut self) -> Result<String, JksError> {
        let len = usize::from(self.u16()?);
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| JksError::Malformed("alias is not valid UTF-8".into()))
    }

    fn blob(&mut self) -> Result<&'a [u8], JksError> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    /// Version 2 stores name the certificate type before each certificate.
    fn certificate(&mut self, version: u32) -> Result<Vec<u8>, JksError> {
        if version == 2 {
            let kind = self.utf()?;
            if kind != "X.509" {
                return Err(JksError::Malformed(format!("certificate type {kind}")));
            }
        }
        Ok(self.blob()?.to_vec())
    }
}
