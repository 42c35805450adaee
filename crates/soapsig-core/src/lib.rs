#![forbid(unsafe_code)]

//! Shared definitions for the soapsig workspace: the error taxonomy,
//! XML-DSig algorithm URIs and the namespaces of the SOAP, WS-Security
//! and XML-DSig vocabularies.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
