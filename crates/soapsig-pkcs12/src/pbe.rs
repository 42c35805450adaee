#![forbid(unsafe_code)]

//! Password-based protection of PKCS#12 content: the RFC 7292 key
//! derivation, the integrity MAC, and the bag and safe ciphers.

use crate::Pkcs12Error;
use cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use hmac::digest::core_api::BlockSizeUser;
use hmac::digest::{FixedOutputReset, KeyInit};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

/// The store password in both encodings PKCS#12 uses: UTF-8 for PBKDF2,
/// and NUL-terminated UTF-16BE for the legacy derivation.
pub(crate) struct StorePassword {
    utf8: Vec<u8>,
    bmp: Vec<u8>,
}

impl StorePassword {
    pub(crate) fn new(password: &str) -> Self {
        // An empty password is an empty BMPString, without the terminator.
        let bmp = if password.is_empty() {
            Vec::new()
        } else {
            password
                .encode_utf16()
                .chain(std::iter::once(0))
                .flat_map(u16::to_be_bytes)
                .collect()
        };
        Self {
            utf8: password.as_bytes().to_vec(),
            bmp,
        }
    }

    pub(crate) fn bmp(&self) -> &[u8] {
        &self.bmp
    }

    pub(crate) fn utf8(&self) -> &[u8] {
        &self.utf8
    }
}

/// Diversifier byte of the RFC 7292 B.2 derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Purpose {
    Key = 1,
    Iv = 2,
    Mac = 3,
}

/// RFC 7292 Appendix B.2 key derivation over any block-based digest.
pub(crate) fn derive<D>(
    password: &StorePassword,
    salt: &[u8],
    purpose: Purpose,
    rounds: u32,
    len: usize,
) -> Vec<u8>
where
    D: Digest + FixedOutputReset + BlockSizeUser,
{
    let v = D::block_size();
    let diversifier = vec![purpose as u8; v];
    let mut input = repeat_to_blocks(salt, v);
    input.extend(repeat_to_blocks(password.bmp(), v));

    let mut hasher = D::new();
    let mut out = Vec::with_capacity(len + <D as Digest>::output_size());
    loop {
        Digest::update(&mut hasher, &diversifier);
        Digest::update(&mut hasher, &input);
        let mut block = hasher.finalize_reset();
        for _ in 1..rounds.max(1) {
            Digest::update(&mut hasher, &block);
            block = hasher.finalize_reset();
        }
        out.extend_from_slice(&block);
        if out.len() >= len {
            break;
        }

        let addend = repeat_to_blocks(&block, v);
        for chunk in input.chunks_exact_mut(v) {
            add_plus_one(chunk, &addend);
        }
    }
    out.truncate(len);
    out
}

/// `data` repeated up to the next multiple of `v` bytes; empty stays empty.
fn repeat_to_blocks(data: &[u8], v: usize) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let len = data.len().div_ceil(v) * v;
    data.iter().copied().cycle().take(len).collect()
}

/// `chunk = (chunk + addend + 1) mod 2^(8 * chunk.len())`, big-endian.
fn add_plus_one(chunk: &mut [u8], addend: &[u8]) {
    let mut carry = 1u16;
    for (x, y) in chunk.iter_mut().rev().zip(addend.iter().rev()) {
        let sum = u16::from(*x) + u16::from(*y) + carry;
        *x = sum as u8;
        carry = sum >> 8;
    }
}

// ── Integrity ────────────────────────────────────────────────────────

/// Digest of the PFX `MacData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MacDigest {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

/// Check the HMAC over the authenticated safe. A mismatch means a wrong
/// password far more often than a damaged file.
pub(crate) fn verify_mac(
    digest: MacDigest,
    password: &StorePassword,
    salt: &[u8],
    rounds: u32,
    data: &[u8],
    expected: &[u8],
) -> Result<(), Pkcs12Error> {
    let matches = match digest {
        MacDigest::Sha1 => {
            hmac_matches::<Hmac<Sha1>>(&mac_key::<Sha1>(password, salt, rounds), data, expected)?
        }
        MacDigest::Sha256 => {
            hmac_matches::<Hmac<Sha256>>(&mac_key::<Sha256>(password, salt, rounds), data, expected)?
        }
        MacDigest::Sha384 => {
            hmac_matches::<Hmac<Sha384>>(&mac_key::<Sha384>(password, salt, rounds), data, expected)?
        }
        MacDigest::Sha512 => {
            hmac_matches::<Hmac<Sha512>>(&mac_key::<Sha512>(password, salt, rounds), data, expected)?
        }
    };
    if matches {
        Ok(())
    } else {
        Err(Pkcs12Error::MacMismatch)
    }
}

fn mac_key<D>(password: &StorePassword, salt: &[u8], rounds: u32) -> Vec<u8>
where
    D: Digest + FixedOutputReset + BlockSizeUser,
{
    derive::<D>(password, salt, Purpose::Mac, rounds, <D as Digest>::output_size())
}

fn hmac_matches<M>(key: &[u8], data: &[u8], expected: &[u8]) -> Result<bool, Pkcs12Error>
where
    M: Mac + KeyInit,
{
    let mut mac = <M as KeyInit>::new_from_slice(key)
        .map_err(|e| Pkcs12Error::Malformed(format!("MAC key: {e}")))?;
    Mac::update(&mut mac, data);
    Ok(mac.verify_slice(expected).is_ok())
}

// ── Encryption ───────────────────────────────────────────────────────

/// PRF of PBKDF2 inside PBES2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Prf {
    HmacSha1,
    HmacSha256,
}

/// AES mode of a PBES2 encryption scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AesCbc {
    Aes128,
    Aes192,
    Aes256,
}

impl AesCbc {
    fn key_len(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }
}

/// How a shrouded key bag or an encrypted safe is protected.
#[derive(Debug)]
pub(crate) enum Protection {
    /// `pbeWithSHAAnd3-KeyTripleDES-CBC`, the pre-OpenSSL 3 default.
    Sha1TripleDes { salt: Vec<u8>, rounds: u32 },
    /// PBES2 with PBKDF2 and AES-CBC.
    Pbes2 {
        salt: Vec<u8>,
        rounds: u32,
        prf: Prf,
        cipher: AesCbc,
        iv: Vec<u8>,
    },
}

impl Protection {
    /// Decrypt `ciphertext`. Bad padding is reported as
    /// [`Pkcs12Error::Decrypt`], the usual sign of a wrong password.
    pub(crate) fn decrypt(
        &self,
        password: &StorePassword,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, Pkcs12Error> {
        match self {
            Self::Sha1TripleDes { salt, rounds } => {
                let key = derive::<Sha1>(password, salt, Purpose::Key, *rounds, 24);
                let iv = derive::<Sha1>(password, salt, Purpose::Iv, *rounds, 8);
                cbc_decrypt::<cbc::Decryptor<des::TdesEde3>>(&key, &iv, ciphertext)
            }
            Self::Pbes2 {
                salt,
                rounds,
                prf,
                cipher,
                iv,
            } => {
                let mut key = vec![0u8; cipher.key_len()];
                match prf {
                    Prf::HmacSha1 => {
                        pbkdf2::pbkdf2_hmac::<Sha1>(password.utf8(), salt, *rounds, &mut key)
                    }
                    Prf::HmacSha256 => {
                        pbkdf2::pbkdf2_hmac::<Sha256>(password.utf8(), salt, *rounds, &mut key)
                    }
                }
                match cipher {
                    AesCbc::Aes128 => cbc_decrypt::<cbc::Decryptor<aes::Aes128>>(&key, iv, ciphertext),
                    AesCbc::Aes192 => cbc_decrypt::<cbc::Decryptor<aes::Aes192>>(&key, iv, ciphertext),
                    AesCbc::Aes256 => cbc_decrypt::<cbc::Decryptor<aes::Aes256>>(&key, iv, ciphertext),
                }
            }
        }
    }
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Pkcs12Error>
where
    C: KeyIvInit + BlockDecryptMut,
{
    C::new_from_slices(key, iv)
        .map_err(|_| Pkcs12Error::Malformed("cipher key or IV has the wrong length".into()))?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| Pkcs12Error::Decrypt("padding check failed"))
}
