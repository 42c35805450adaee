#![forbid(unsafe_code)]

//! Enveloped XML Digital Signature creation.
//!
//! A [`SignatureEngine`] turns a list of reference URIs and a signing
//! credential into a `<ds:Signature>` element inside the document being
//! signed: one `<Reference>` per URI, a `<SignedInfo>` canonicalized in
//! place, and a `<KeyInfo>` carrying the signer's X.509 certificate.

pub mod engine;
pub mod keyinfo;
pub mod profile;
pub mod reference;

pub use engine::{canonicalize_signed_info, Signature, SignatureEngine, SignatureTemplate, SignedInfo};
pub use keyinfo::KeyInfo;
pub use profile::SignatureProfile;
pub use reference::{check_uris, Reference, ReferenceBuilder};
