#![forbid(unsafe_code)]

//! Signing credentials for soapsig.
//!
//! A [`KeyMaterialProvider`] turns an alias into a [`CredentialBundle`]:
//! a private key plus the X.509 certificate that goes into the message.
//! Providers exist for PKCS#12 files, Java KeyStore (`JKS`) files, either
//! of the two picked by content ([`KeyStoreFile`]), and keys registered
//! in memory. Aliases in store files match without regard to case.

pub mod credential;
pub mod jks;
pub mod loader;
pub mod provider;

pub use credential::{Certificate, CredentialBundle};
pub use jks::JksError;
pub use loader::LoadError;
pub use provider::{JksKeyStore, KeyMaterialProvider, KeyStoreFile, MemoryKeyStore, Pkcs12KeyStore};
