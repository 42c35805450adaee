#![forbid(unsafe_code)]

//! Transform pipeline engine for soapsig.
//!
//! Implements the transform chain model from XML-DSig: each reference
//! selects a node set by URI, then applies a sequence of transforms in
//! order until the data is an octet stream ready for digesting.

pub mod enveloped;
pub mod pipeline;
pub mod uri;

pub use enveloped::EnvelopedSignatureTransform;
pub use pipeline::{C14nTransform, Transform, TransformData, TransformPipeline};
pub use uri::resolve_uri;
