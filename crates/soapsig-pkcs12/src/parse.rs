#![forbid(unsafe_code)]

//! Reading the PFX structure (RFC 7292) with `yasna`.
//!
//! PFX files in the wild are BER (indefinite lengths from Java and older
//! Windows exports), so only the innermost key material is read as DER.

use yasna::models::ObjectIdentifier;
use yasna::{ASN1Error, ASN1ErrorKind, ASN1Result, BERReader, BERReaderSeq, Tag};

use crate::pbe::{self, AesCbc, MacDigest, Prf, Protection, StorePassword};
use crate::{BagAttributes, CertBag, KeyBag, Pkcs12Contents, Pkcs12Error};

mod oid {
    pub const DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 1];
    pub const ENCRYPTED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 6];

    pub const KEY_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 1];
    pub const SHROUDED_KEY_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 2];
    pub const CERT_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 3];
    pub const X509_CERTIFICATE: &[u64] = &[1, 2, 840, 113549, 1, 9, 22, 1];

    pub const FRIENDLY_NAME: &[u64] = &[1, 2, 840, 113549, 1, 9, 20];
    pub const LOCAL_KEY_ID: &[u64] = &[1, 2, 840, 113549, 1, 9, 21];

    pub const PBE_SHA1_3DES: &[u64] = &[1, 2, 840, 113549, 1, 12, 1, 3];
    pub const PBES2: &[u64] = &[1, 2, 840, 113549, 1, 5, 13];
    pub const PBKDF2: &[u64] = &[1, 2, 840, 113549, 1, 5, 12];
    pub const HMAC_SHA1: &[u64] = &[1, 2, 840, 113549, 2, 7];
    pub const HMAC_SHA256: &[u64] = &[1, 2, 840, 113549, 2, 9];
    pub const AES128_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 2];
    pub const AES192_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 22];
    pub const AES256_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 42];

    pub const SHA1: &[u64] = &[1, 3, 14, 3, 2, 26];
    pub const SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
    pub const SHA384: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 2];
    pub const SHA512: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 3];
}

fn invalid<T>() -> ASN1Result<T> {
    Err(ASN1Error::new(ASN1ErrorKind::Invalid))
}

fn malformed(part: &'static str) -> impl Fn(ASN1Error) -> Pkcs12Error {
    move |e| Pkcs12Error::Malformed(format!("{part}: {e}"))
}

/// Decode, authenticate and decrypt a PFX.
pub(crate) fn open(data: &[u8], password: &str) -> Result<Pkcs12Contents, Pkcs12Error> {
    let password = StorePassword::new(password);
    let pfx = Pfx::from_ber(data)?;
    pfx.authenticate(&password)?;

    let mut contents = Pkcs12Contents::default();
    for safe in pfx.safes()? {
        let plain = match safe {
            Safe::Plain(bytes) => bytes,
            Safe::Encrypted { protection, data } => protection.decrypt(&password, &data)?,
        };
        let bags = yasna::parse_ber(&plain, |r| r.collect_sequence_of(read_bag))
            .map_err(malformed("SafeContents"))?;
        for bag in bags {
            match bag {
                Bag::Key {
                    pkcs8_der,
                    attributes,
                } => contents.keys.push(KeyBag {
                    pkcs8_der,
                    attributes,
                }),
                Bag::ShroudedKey {
                    protection,
                    data,
                    attributes,
                } => contents.keys.push(KeyBag {
                    pkcs8_der: protection.decrypt(&password, &data)?,
                    attributes,
                }),
                Bag::Certificate { der, attributes } => {
                    contents.certificates.push(CertBag { der, attributes })
                }
                Bag::Other => {}
            }
        }
    }
    Ok(contents)
}

// ── PFX ──────────────────────────────────────────────────────────────

struct MacData {
    digest: MacDigest,
    value: Vec<u8>,
    salt: Vec<u8>,
    rounds: u32,
}

/// The outer PFX: the authenticated safe bytes and the optional MAC over them.
struct Pfx {
    auth_safe: Vec<u8>,
    mac: Option<MacData>,
}

impl Pfx {
    fn from_ber(data: &[u8]) -> Result<Self, Pkcs12Error> {
        yasna::parse_ber(data, |r| {
            r.read_sequence(|r| {
                if r.next().read_u32()? != 3 {
                    return invalid();
                }
                let auth_safe = r.next().read_sequence(|r| {
                    if r.next().read_oid()?.components().as_slice() != oid::DATA {
                        return invalid();
                    }
                    r.next().read_tagged(Tag::context(0), |r| r.read_bytes())
                })?;
                let mac = r.read_optional(read_mac_data)?;
                Ok(Pfx { auth_safe, mac })
            })
        })
        .map_err(malformed("PFX"))
    }

    /// Stores written without a MAC (`openssl pkcs12 -nomac`) are accepted.
    fn authenticate(&self, password: &StorePassword) -> Result<(), Pkcs12Error> {
        match &self.mac {
            Some(mac) => pbe::verify_mac(
                mac.digest,
                password,
                &mac.salt,
                mac.rounds,
                &self.auth_safe,
                &mac.value,
            ),
            None => Ok(()),
        }
    }

    fn safes(&self) -> Result<Vec<Safe>, Pkcs12Error> {
        yasna::parse_ber(&self.auth_safe, |r| r.collect_sequence_of(read_safe))
            .map_err(malformed("AuthenticatedSafe"))
    }
}

fn read_mac_data(r: BERReader) -> ASN1Result<MacData> {
    r.read_sequence(|r| {
        let (digest, value) = r.next().read_sequence(|r| {
            let digest = r.next().read_sequence(|r| {
                let alg = r.next().read_oid()?;
                r.read_optional(|r| r.read_null())?;
                match alg.components().as_slice() {
                    oid::SHA1 => Ok(MacDigest::Sha1),
                    oid::SHA256 => Ok(MacDigest::Sha256),
                    oid::SHA384 => Ok(MacDigest::Sha384),
                    oid::SHA512 => Ok(MacDigest::Sha512),
                    _ => invalid(),
                }
            })?;
            Ok((digest, r.next().read_bytes()?))
        })?;
        let salt = r.next().read_bytes()?;
        let rounds = r.read_optional(|r| r.read_u32())?.unwrap_or(1);
        Ok(MacData {
            digest,
            value,
            salt,
            rounds,
        })
    })
}

// ── Safes and bags ───────────────────────────────────────────────────

/// One `ContentInfo` of the authenticated safe.
enum Safe {
    Plain(Vec<u8>),
    Encrypted { protection: Protection, data: Vec<u8> },
}

fn read_safe(r: BERReader) -> ASN1Result<Safe> {
    r.read_sequence(|r| {
        let content_type = r.next().read_oid()?;
        let content = r.next();
        match content_type.components().as_slice() {
            oid::DATA => content
                .read_tagged(Tag::context(0), |r| r.read_bytes())
                .map(Safe::Plain),
            oid::ENCRYPTED_DATA => content.read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    r.next().read_u32()?;
                    r.next().read_sequence(|r| {
                        r.next().read_oid()?;
                        let protection = read_protection(r.next())?;
                        let data = r
                            .next()
                            .read_tagged_implicit(Tag::context(0), |r| r.read_bytes())?;
                        Ok(Safe::Encrypted { protection, data })
                    })
                })
            }),
            _ => invalid(),
        }
    })
}

enum Bag {
    Key {
        pkcs8_der: Vec<u8>,
        attributes: BagAttributes,
    },
    ShroudedKey {
        protection: Protection,
        data: Vec<u8>,
        attributes: BagAttributes,
    },
    Certificate {
        der: Vec<u8>,
        attributes: BagAttributes,
    },
    Other,
}

fn read_bag(r: BERReader) -> ASN1Result<Bag> {
    r.read_sequence(|r| {
        let bag_type = r.next().read_oid()?;
        let value = r.next();
        let bag = match bag_type.components().as_slice() {
            oid::KEY_BAG => {
                let pkcs8_der = value.read_tagged(Tag::context(0), |r| r.read_der())?;
                Bag::Key {
                    pkcs8_der,
                    attributes: read_attributes(r)?,
                }
            }
            oid::SHROUDED_KEY_BAG => {
                let (protection, data) = value.read_tagged(Tag::context(0), |r| {
                    r.read_sequence(|r| Ok((read_protection(r.next())?, r.next().read_bytes()?)))
                })?;
                Bag::ShroudedKey {
                    protection,
                    data,
                    attributes: read_attributes(r)?,
                }
            }
            oid::CERT_BAG => {
                let der = value.read_tagged(Tag::context(0), |r| {
                    r.read_sequence(|r| {
                        if r.next().read_oid()?.components().as_slice() != oid::X509_CERTIFICATE {
                            return invalid();
                        }
                        r.next().read_tagged(Tag::context(0), |r| r.read_bytes())
                    })
                })?;
                Bag::Certificate {
                    der,
                    attributes: read_attributes(r)?,
                }
            }
            // CRL, secret and nested bags carry nothing a signer needs.
            _ => {
                value.read_tagged(Tag::context(0), |r| r.read_der())?;
                read_attributes(r)?;
                Bag::Other
            }
        };
        Ok(bag)
    })
}

/// Keep `friendlyName` and `localKeyId` from the optional attribute set.
fn read_attributes(r: &mut BERReaderSeq<'_, '_>) -> ASN1Result<BagAttributes> {
    let mut attributes = BagAttributes::default();
    r.read_optional(|r| {
        r.read_set_of(|r| {
            r.read_sequence(|r| {
                let kind = r.next().read_oid()?;
                r.next().read_set_of(|r| {
                    match kind.components().as_slice() {
                        oid::FRIENDLY_NAME => {
                            let raw = r.read_tagged_implicit(yasna::tags::TAG_BMPSTRING, |r| {
                                r.read_bytes()
                            })?;
                            attributes.friendly_name = Some(utf16be(&raw)?);
                        }
                        oid::LOCAL_KEY_ID => attributes.local_key_id = Some(r.read_bytes()?),
                        _ => {
                            r.read_der()?;
                        }
                    }
                    Ok(())
                })
            })
        })
    })?;
    Ok(attributes)
}

fn utf16be(raw: &[u8]) -> ASN1Result<String> {
    if raw.len() % 2 != 0 {
        return invalid();
    }
    let units = raw.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]]));
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|_| ASN1Error::new(ASN1ErrorKind::Invalid))
}

// ── Protection parameters ────────────────────────────────────────────

fn read_protection(r: BERReader) -> ASN1Result<Protection> {
    r.read_sequence(|r| {
        let scheme = r.next().read_oid()?;
        match scheme.components().as_slice() {
            oid::PBE_SHA1_3DES => r.next().read_sequence(|r| {
                let salt = r.next().read_bytes()?;
                let rounds = r.next().read_u32()?;
                Ok(Protection::Sha1TripleDes { salt, rounds })
            }),
            oid::PBES2 => r.next().read_sequence(|r| {
                let (salt, rounds, prf) = r.next().read_sequence(|r| {
                    if r.next().read_oid()?.components().as_slice() != oid::PBKDF2 {
                        return invalid();
                    }
                    read_pbkdf2_params(r.next())
                })?;
                let (cipher, iv) = r.next().read_sequence(|r| {
                    let cipher = aes_cbc(&r.next().read_oid()?)?;
                    Ok((cipher, r.next().read_bytes()?))
                })?;
                Ok(Protection::Pbes2 {
                    salt,
                    rounds,
                    prf,
                    cipher,
                    iv,
                })
            }),
            _ => invalid(),
        }
    })
}

/// `PBKDF2-params`: salt, iteration count, then an optional key length and
/// an optional PRF (HMAC-SHA1 when absent).
fn read_pbkdf2_params(r: BERReader) -> ASN1Result<(Vec<u8>, u32, Prf)> {
    r.read_sequence(|r| {
        let salt = r.next().read_bytes()?;
        let rounds = r.next().read_u32()?;
        let mut prf = Prf::HmacSha1;
        while let Some(field) = r.read_optional(|r| r.read_der())? {
            // Key length is an INTEGER; only the SEQUENCE matters here.
            if field.first() == Some(&0x30) {
                prf = yasna::parse_der(&field, read_prf)?;
            }
        }
        Ok((salt, rounds, prf))
    })
}

fn read_prf(r: BERReader) -> ASN1Result<Prf> {
    r.read_sequence(|r| {
        let alg = r.next().read_oid()?;
        r.read_optional(|r| r.read_null())?;
        match alg.components().as_slice() {
            oid::HMAC_SHA1 => Ok(Prf::HmacSha1),
            oid::HMAC_SHA256 => Ok(Prf::HmacSha256),
            _ => invalid(),
        }
    })
}

fn aes_cbc(alg: &ObjectIdentifier) -> ASN1Result<AesCbc> {
    match alg.components().as_slice() {
        oid::AES128_CBC => Ok(AesCbc::Aes128),
        oid::AES192_CBC => Ok(AesCbc::Aes192),
        oid::AES256_CBC => Ok(AesCbc::Aes256),
        _ => invalid(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> Vec<u8> {
        let path = format!("{}/../../test-data/keys/{name}", env!("CARGO_MANIFEST_DIR"));
        std::fs::read(path).unwrap()
    }

    #[test]
    fn test_open_pbes2_store() {
        let contents = open(&fixture("rsa-2048.p12"), "changeit").unwrap();
        assert_eq!(contents.keys.len(), 1);
        assert_eq!(contents.certificates.len(), 1);

        let key = &contents.keys[0];
        assert_eq!(key.pkcs8_der[0], 0x30);
        assert_eq!(key.attributes.friendly_name.as_deref(), Some("mykey"));
        assert!(key.attributes.local_key_id.is_some());
        assert_eq!(
            key.attributes.local_key_id,
            contents.certificates[0].attributes.local_key_id
        );
    }

    #[test]
    fn test_open_legacy_3des_store() {
        let contents = open(&fixture("rsa-2048-3des.p12"), "changeit").unwrap();
        assert_eq!(contents.keys.len(), 1);
        assert!(contents.key_by_alias("mykey").is_some());
        assert_eq!(contents.certificates[0].der[0], 0x30);
    }

    #[test]
    fn test_open_aes128_store_with_sha512_mac() {
        let contents = open(&fixture("rsa-2048-aes128.p12"), "changeit").unwrap();
        assert_eq!(contents.aliases(), vec!["Signing Key"]);
        let aes256 = open(&fixture("rsa-2048.p12"), "changeit").unwrap();
        assert_eq!(contents.keys[0].pkcs8_der, aes256.keys[0].pkcs8_der);
    }

    #[test]
    fn test_open_unprotected_store() {
        let contents = open(&fixture("rsa-2048-plain.p12"), "").unwrap();
        let key = contents.key_by_alias("mykey").unwrap();
        let reference = open(&fixture("rsa-2048.p12"), "changeit").unwrap();
        assert_eq!(key.pkcs8_der, reference.keys[0].pkcs8_der);
    }

    #[test]
    fn test_open_ec_store() {
        let contents = open(&fixture("ec-p256.p12"), "changeit").unwrap();
        assert_eq!(contents.aliases(), vec!["eckey"]);
        assert!(contents.key_by_alias("mykey").is_none());
    }

    #[test]
    fn test_wrong_password_fails_mac() {
        for name in ["rsa-2048.p12", "rsa-2048-3des.p12", "rsa-2048-aes128.p12"] {
            let err = open(&fixture(name), "wrong_password").unwrap_err();
            assert!(matches!(err, Pkcs12Error::MacMismatch), "{name}: {err}");
        }
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = open(b"-----BEGIN CERTIFICATE-----", "changeit").unwrap_err();
        assert!(matches!(err, Pkcs12Error::Malformed(_)));
    }

    #[test]
    fn test_utf16be() {
        assert_eq!(utf16be(&[0, b'm', 0, b'y']).unwrap(), "my");
        assert!(utf16be(&[0]).is_err());
        assert!(utf16be(&[0xD8, 0x00]).is_err());
    }
}
