#![forbid(unsafe_code)]

//! Cryptographic algorithm implementations for soapsig.
//!
//! Provides the digest and signature algorithms that XML-DSig references
//! by URI.

pub mod digest;
pub mod sign;

pub use digest::DigestMethod;
pub use sign::{SignatureAlgorithm, SigningKey};
