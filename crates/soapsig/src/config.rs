#![forbid(unsafe_code)]

//! Signer configuration.

use crate::header::HeaderLocator;
use soapsig_core::ns;
use soapsig_dsig::SignatureProfile;

/// Everything about a signing run except the credential and the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerConfig {
    /// Algorithm suite and signature prefix.
    pub profile: SignatureProfile,
    /// Attribute names that make an element addressable as `#value`.
    pub id_attributes: Vec<String>,
    /// Where the certificate and the signature go.
    pub locator: HeaderLocator,
    /// Emit an XML declaration before the signed document.
    pub xml_declaration: bool,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            profile: SignatureProfile::default(),
            id_attributes: vec![ns::attr::ID.to_owned()],
            locator: HeaderLocator::default(),
            xml_declaration: true,
        }
    }
}

impl SignerConfig {
    pub fn with_profile(mut self, profile: SignatureProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Add an identifier attribute name, e.g. `wsu:Id`.
    pub fn with_id_attribute(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.id_attributes.contains(&name) {
            self.id_attributes.push(name);
        }
        self
    }

    pub fn with_locator(mut self, locator: HeaderLocator) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_xml_declaration(mut self, enabled: bool) -> Self {
        self.xml_declaration = enabled;
        self
    }
}
