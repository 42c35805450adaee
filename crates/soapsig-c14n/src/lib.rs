#![forbid(unsafe_code)]

//! XML Canonicalization (C14N) over the soapsig document tree.
//!
//! Canonical XML 1.0, Canonical XML 1.1 and Exclusive Canonical XML 1.0,
//! each with and without comments. The signer only ever feeds whole
//! subtrees, minus the signature being built, through these.

pub mod exclusive;
pub mod inclusive;
pub mod inclusive11;
pub mod render;

use soapsig_core::{algorithm, Result};
use soapsig_xml::{Document, NodeSet};

/// The canonicalization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C14nMode {
    /// Canonical XML 1.0, the XML-DSig default.
    Inclusive,
    InclusiveWithComments,
    Inclusive11,
    Inclusive11WithComments,
    /// Exclusive Canonical XML 1.0; takes an InclusiveNamespaces PrefixList.
    Exclusive,
    ExclusiveWithComments,
}

impl C14nMode {
    pub const ALL: [C14nMode; 6] = [
        Self::Inclusive,
        Self::InclusiveWithComments,
        Self::Inclusive11,
        Self::Inclusive11WithComments,
        Self::Exclusive,
        Self::ExclusiveWithComments,
    ];

    pub fn uri(&self) -> &'static str {
        match self {
            Self::Inclusive => algorithm::C14N,
            Self::InclusiveWithComments => algorithm::C14N_WITH_COMMENTS,
            Self::Inclusive11 => algorithm::C14N11,
            Self::Inclusive11WithComments => algorithm::C14N11_WITH_COMMENTS,
            Self::Exclusive => algorithm::EXC_C14N,
            Self::ExclusiveWithComments => algorithm::EXC_C14N_WITH_COMMENTS,
        }
    }

    /// The mode named by a `CanonicalizationMethod` or transform URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.uri() == uri)
    }

    pub fn with_comments(&self) -> bool {
        matches!(
            self,
            Self::InclusiveWithComments
                | Self::Inclusive11WithComments
                | Self::ExclusiveWithComments
        )
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::Exclusive | Self::ExclusiveWithComments)
    }
}

/// Canonicalize a document or a document subset.
///
/// - `node_set`: the visible nodes; `None` canonicalizes the whole document
/// - `inclusive_prefixes`: for exclusive C14N, the InclusiveNamespaces PrefixList
pub fn canonicalize(
    doc: &Document,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>> {
    match mode {
        C14nMode::Inclusive | C14nMode::InclusiveWithComments => {
            inclusive::canonicalize(doc, mode.with_comments(), node_set)
        }
        C14nMode::Inclusive11 | C14nMode::Inclusive11WithComments => {
            inclusive11::canonicalize(doc, mode.with_comments(), node_set)
        }
        C14nMode::Exclusive | C14nMode::ExclusiveWithComments => {
            exclusive::canonicalize(doc, mode.with_comments(), node_set, inclusive_prefixes)
        }
    }
}
