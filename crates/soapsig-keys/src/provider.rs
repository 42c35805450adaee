#![forbid(unsafe_code)]

//! Credential providers.

use crate::credential::{Certificate, CredentialBundle};
use crate::jks::{self, JksError};
use crate::loader::{self, LoadError};
use soapsig_core::{Error, Result};
use soapsig_crypto::SigningKey;
use soapsig_pkcs12::{alias_matches, CertBag, KeyBag, Pkcs12Contents};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// A source of signing credentials addressed by alias.
///
/// Implementations must be safe to share between threads; each `load`
/// returns a fresh bundle owned by the caller.
pub trait KeyMaterialProvider: Send + Sync {
    fn load(&self, alias: &str) -> Result<CredentialBundle>;
}

impl<P: KeyMaterialProvider + ?Sized> KeyMaterialProvider for Arc<P> {
    fn load(&self, alias: &str) -> Result<CredentialBundle> {
        (**self).load(alias)
    }
}

impl<P: KeyMaterialProvider + ?Sized> KeyMaterialProvider for &P {
    fn load(&self, alias: &str) -> Result<CredentialBundle> {
        (**self).load(alias)
    }
}

// ── Key store files ──────────────────────────────────────────────────

/// A store password; `Debug` never prints it.
#[derive(Clone)]
struct Password(String);

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<redacted>")
    }
}

/// A password-protected PKCS#12 file, read on every `load`.
#[derive(Debug, Clone)]
pub struct Pkcs12KeyStore {
    path: PathBuf,
    password: Password,
}

impl Pkcs12KeyStore {
    pub fn new(path: impl Into<PathBuf>, password: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            password: Password(password.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyMaterialProvider for Pkcs12KeyStore {
    fn load(&self, alias: &str) -> Result<CredentialBundle> {
        let data = read_store(&self.path)?;
        pkcs12_credential(&self.path, &data, &self.password.0, alias)
    }
}

/// A Java KeyStore (`JKS`) file, read on every `load`.
///
/// The key entry is unlocked with the store password unless a separate
/// key password is set.
#[derive(Debug, Clone)]
pub struct JksKeyStore {
    path: PathBuf,
    password: Password,
    key_password: Option<Password>,
}

impl JksKeyStore {
    pub fn new(path: impl Into<PathBuf>, password: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            password: Password(password.into()),
            key_password: None,
        }
    }

    pub fn with_key_password(mut self, key_password: impl Into<String>) -> Self {
        self.key_password = Some(Password(key_password.into()));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyMaterialProvider for JksKeyStore {
    fn load(&self, alias: &str) -> Result<CredentialBundle> {
        let data = read_store(&self.path)?;
        let key_password = self.key_password.as_ref().unwrap_or(&self.password);
        jks_credential(&self.path, &data, &self.password.0, &key_password.0, alias)
    }
}

/// A key store file in either format, told apart by the JKS magic.
///
/// Mirrors `KeyStore.getInstance("JKS")` on current JDKs, which also
/// opens PKCS#12 files. Key entries share the store password.
#[derive(Debug, Clone)]
pub struct KeyStoreFile {
    path: PathBuf,
    password: Password,
}

impl KeyStoreFile {
    pub fn new(path: impl Into<PathBuf>, password: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            password: Password(password.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyMaterialProvider for KeyStoreFile {
    fn load(&self, alias: &str) -> Result<CredentialBundle> {
        let data = read_store(&self.path)?;
        let password = &self.password.0;
        if jks::is_jks(&data) {
            jks_credential(&self.path, &data, password, password, alias)
        } else {
            pkcs12_credential(&self.path, &data, password, alias)
        }
    }
}

fn unavailable(path: &Path, reason: impl ToString) -> Error {
    Error::store_unavailable(path.display().to_string(), reason.to_string())
}

fn access_denied(reason: impl ToString) -> Error {
    Error::CredentialAccessDenied {
        reason: reason.to_string(),
    }
}

fn not_found(alias: &str) -> Error {
    Error::CredentialNotFound {
        alias: alias.to_owned(),
    }
}

fn read_store(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| unavailable(path, e))
}

fn pkcs12_credential(
    path: &Path,
    data: &[u8],
    password: &str,
    alias: &str,
) -> Result<CredentialBundle> {
    let contents = soapsig_pkcs12::parse_pkcs12(data, password).map_err(|e| {
        if e.wrong_password() {
            access_denied(e)
        } else {
            unavailable(path, e)
        }
    })?;

    let key_bag = contents.key_by_alias(alias).ok_or_else(|| not_found(alias))?;
    let private_key =
        loader::load_private_key_pkcs8_der(&key_bag.pkcs8_der).map_err(|e| unavailable(path, e))?;
    let cert_bag = select_certificate(&contents, key_bag, &private_key, alias)
        .ok_or_else(|| not_found(alias))?;
    let certificate = Certificate::from_der(cert_bag.der.clone()).map_err(|e| unavailable(path, e))?;

    debug!(
        alias,
        key = private_key.kind(),
        subject = certificate.subject_name(),
        "loaded credential from PKCS#12 store"
    );
    Ok(CredentialBundle::new(alias, private_key, certificate))
}

fn jks_credential(
    path: &Path,
    data: &[u8],
    store_password: &str,
    key_password: &str,
    alias: &str,
) -> Result<CredentialBundle> {
    let classify = |e: JksError| {
        if e.wrong_password() {
            access_denied(e)
        } else {
            unavailable(path, e)
        }
    };
    let contents = jks::parse_jks(data, store_password).map_err(classify)?;
    let entry = contents.key_entry(alias).ok_or_else(|| not_found(alias))?;
    let pkcs8 = entry.recover_key(key_password).map_err(classify)?;
    let private_key = loader::load_private_key_pkcs8_der(&pkcs8).map_err(|e| unavailable(path, e))?;
    let leaf = entry
        .certificate_chain()
        .first()
        .ok_or_else(|| unavailable(path, format!("key entry '{}' has no certificate", entry.alias())))?;
    let certificate = Certificate::from_der(leaf.clone()).map_err(|e| unavailable(path, e))?;

    debug!(
        alias,
        key = private_key.kind(),
        subject = certificate.subject_name(),
        chain = entry.certificate_chain().len(),
        "loaded credential from Java KeyStore"
    );
    Ok(CredentialBundle::new(alias, private_key, certificate))
}

/// Pick the certificate belonging to a key: same `localKeyId`, then same
/// `friendlyName`, then same public key.
fn select_certificate<'a>(
    contents: &'a Pkcs12Contents,
    key_bag: &KeyBag,
    private_key: &SigningKey,
    alias: &str,
) -> Option<&'a CertBag> {
    if let Some(id) = &key_bag.attributes.local_key_id {
        if let Some(cert) = contents
            .certificates
            .iter()
            .find(|c| c.attributes.local_key_id.as_ref() == Some(id))
        {
            return Some(cert);
        }
    }
    if let Some(cert) = contents.certificates.iter().find(|c| {
        c.attributes
            .friendly_name
            .as_deref()
            .is_some_and(|name| alias_matches(name, alias))
    }) {
        return Some(cert);
    }

    warn!(alias, "no certificate tagged for key; matching by public key");
    contents.certificates.iter().find(|c| {
        loader::load_x509_public_key(&c.der).is_ok_and(|public| public == *private_key)
    })
}

// ── In memory ────────────────────────────────────────────────────────

const MEMORY_STORE: &str = "<memory>";

/// Credentials registered programmatically.
#[derive(Default, Clone)]
pub struct MemoryKeyStore {
    entries: HashMap<String, (SigningKey, Certificate)>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key and certificate under `alias`, replacing any previous entry.
    pub fn insert(&mut self, alias: impl Into<String>, key: SigningKey, certificate: Certificate) {
        self.entries.insert(alias.into(), (key, certificate));
    }

    /// Register PEM-encoded key and certificate.
    pub fn insert_pem(&mut self, alias: &str, key_pem: &[u8], cert_pem: &[u8]) -> Result<()> {
        let key = loader::load_private_key_pem(key_pem).map_err(memory_error)?;
        let cert = loader::load_x509_cert_pem(cert_pem).map_err(memory_error)?;
        self.insert(alias, key, cert);
        Ok(())
    }

    /// Register a DER private key (PKCS#8 or PKCS#1) and DER certificate.
    pub fn insert_der(&mut self, alias: &str, key_der: &[u8], cert_der: &[u8]) -> Result<()> {
        let key = loader::load_private_key_der(key_der).map_err(memory_error)?;
        let cert = Certificate::from_der(cert_der.to_vec()).map_err(memory_error)?;
        self.insert(alias, key, cert);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn memory_error(e: LoadError) -> Error {
    Error::store_unavailable(MEMORY_STORE, e.to_string())
}

impl std::fmt::Debug for MemoryKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut aliases: Vec<&String> = self.entries.keys().collect();
        aliases.sort();
        f.debug_struct("MemoryKeyStore")
            .field("aliases", &aliases)
            .finish()
    }
}

impl KeyMaterialProvider for MemoryKeyStore {
    fn load(&self, alias: &str) -> Result<CredentialBundle> {
        let (key, cert) = self
            .entries
            .get(alias)
            .ok_or_else(|| Error::CredentialNotFound {
                alias: alias.to_owned(),
            })?;
        Ok(CredentialBundle::new(alias, key.clone(), cert.clone()))
    }
}
