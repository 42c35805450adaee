#![forbid(unsafe_code)]

//! Enveloped XML digital signatures for SOAP messages.
//!
//! [`SoapSigner`] takes a SOAP envelope whose WS-Security header already
//! holds an empty `wsse:BinarySecurityToken`, loads a credential by alias,
//! writes the certificate into the token, and inserts a `ds:Signature`
//! over the requested references right after it.
//!
//! ```no_run
//! use soapsig::{KeyStoreFile, SignerConfig, SoapSigner};
//!
//! # fn main() -> soapsig::Result<()> {
//! let store = KeyStoreFile::new("keystore.jks", "changeit");
//! let signer = SoapSigner::new(store, SignerConfig::default())?;
//! let xml = std::fs::read_to_string("request.xml").expect("readable input");
//! let signed = signer.sign(&xml, "mykey", &["#body1"])?;
//! # let _ = signed;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod header;
pub mod signer;

#[cfg(test)]
mod verifier;

pub use config::SignerConfig;
pub use header::{HeaderLocator, SecurityHeader, SecurityHeaderInjector};
pub use signer::{sign_soap_message, SoapSigner};

pub use soapsig_core::{Error, Result};
pub use soapsig_dsig::SignatureProfile;
pub use soapsig_keys::{
    CredentialBundle, JksKeyStore, KeyMaterialProvider, KeyStoreFile, MemoryKeyStore, Pkcs12KeyStore,
};

pub use soapsig_c14n as c14n;
pub use soapsig_core as core;
pub use soapsig_crypto as crypto;
pub use soapsig_dsig as dsig;
pub use soapsig_keys as keys;
pub use soapsig_pkcs12 as pkcs12;
pub use soapsig_transforms as transforms;
pub use soapsig_xml as xml;
