#![forbid(unsafe_code)]

/// Errors produced while signing a SOAP message.
///
/// Every failure aborts the signing pipeline; exactly one of these reaches
/// the caller, carrying the alias, URI or element name needed to diagnose it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The credential store is missing, unreadable or corrupt.
    #[error("credential store unavailable ({path}): {reason}")]
    StoreUnavailable { path: String, reason: String },

    /// The store holds no private key under the requested alias.
    #[error("credential not found for alias '{alias}'")]
    CredentialNotFound { alias: String },

    /// The store rejected the access credential (wrong password).
    #[error("credential access denied: {reason}")]
    CredentialAccessDenied { reason: String },

    /// The input text is not well-formed XML.
    #[error("malformed input XML: {0}")]
    MalformedInputXml(String),

    /// The envelope lacks the Header, Security or token placeholder element.
    #[error("malformed SOAP envelope: missing {element}")]
    MalformedEnvelope { element: String },

    /// A reference URI does not resolve to exactly one element.
    #[error("invalid reference '{uri}': {reason}")]
    InvalidReference { uri: String, reason: String },

    /// A digest, signature or canonicalization identifier is not implemented.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The cryptographic provider failed (malformed key, key/algorithm mismatch).
    #[error("signature computation failed: {0}")]
    SignatureComputation(String),
}

impl Error {
    pub fn store_unavailable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_reference(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed_envelope(element: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            element: element.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = Error::CredentialNotFound {
            alias: "nosuchkey".into(),
        };
        assert_eq!(err.to_string(), "credential not found for alias 'nosuchkey'");

        let err = Error::invalid_reference("#body1", "no element carries this identifier");
        assert!(err.to_string().contains("#body1"));

        let err = Error::malformed_envelope("wsse:Security");
        assert_eq!(err.to_string(), "malformed SOAP envelope: missing wsse:Security");
    }
}
