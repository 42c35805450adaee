#![forbid(unsafe_code)]

//! Locating the WS-Security header and writing into it.

use base64::Engine;
use soapsig_core::{ns, Error, Result};
use soapsig_keys::Certificate;
use soapsig_xml::{Document, NodeId};
use tracing::debug;

/// Names of the three elements that must exist before signing:
/// `Header`, the security element under it, and the certificate token
/// under that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLocator {
    envelope_namespaces: Vec<String>,
    security_namespace: String,
    security_name: String,
    token_name: String,
}

impl Default for HeaderLocator {
    /// SOAP 1.1 or 1.2 `Header`, WS-Security 1.0 `Security` and
    /// `BinarySecurityToken`.
    fn default() -> Self {
        Self {
            envelope_namespaces: vec![ns::SOAP11_ENV.to_owned(), ns::SOAP12_ENV.to_owned()],
            security_namespace: ns::WSSE.to_owned(),
            security_name: ns::node::SECURITY.to_owned(),
            token_name: ns::node::BINARY_SECURITY_TOKEN.to_owned(),
        }
    }
}

impl HeaderLocator {
    /// Namespaces accepted for the `Header` element.
    pub fn with_envelope_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.envelope_namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    /// Namespace of the security element and the token.
    pub fn with_security_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.security_namespace = namespace.into();
        self
    }

    pub fn with_security_name(mut self, local_name: impl Into<String>) -> Self {
        self.security_name = local_name.into();
        self
    }

    pub fn with_token_name(mut self, local_name: impl Into<String>) -> Self {
        self.token_name = local_name.into();
        self
    }

    fn header_matches(&self, doc: &Document, id: NodeId) -> bool {
        doc.element(id).is_some_and(|e| {
            e.local_name == ns::node::HEADER
                && self
                    .envelope_namespaces
                    .iter()
                    .any(|n| e.namespace.as_deref() == Some(n.as_str()))
        })
    }
}

/// The located security header elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityHeader {
    pub header: NodeId,
    pub security: NodeId,
    pub token: NodeId,
}

/// Embeds the signer's certificate and the signature into the security header.
#[derive(Debug, Clone, Default)]
pub struct SecurityHeaderInjector {
    locator: HeaderLocator,
}

impl SecurityHeaderInjector {
    pub fn new(locator: HeaderLocator) -> Self {
        Self { locator }
    }

    pub fn locator(&self) -> &HeaderLocator {
        &self.locator
    }

    /// Find, in document order, the first `Header` under the envelope
    /// root, the first security element under it and the first token
    /// under that. A missing element is `MalformedEnvelope`.
    pub fn locate(&self, doc: &Document) -> Result<SecurityHeader> {
        let envelope = doc
            .document_element()
            .ok_or_else(|| Error::malformed_envelope(ns::node::ENVELOPE))?;
        let header = first_descendant(doc, envelope, |id| self.locator.header_matches(doc, id))
            .ok_or_else(|| Error::malformed_envelope(ns::node::HEADER))?;
        let security = first_descendant(doc, header, |id| {
            is_element(doc, id, &self.locator.security_namespace, &self.locator.security_name)
        })
        .ok_or_else(|| Error::malformed_envelope(self.locator.security_name.as_str()))?;
        let token = first_descendant(doc, security, |id| {
            is_element(doc, id, &self.locator.security_namespace, &self.locator.token_name)
        })
        .ok_or_else(|| Error::malformed_envelope(self.locator.token_name.as_str()))?;

        debug!("located security header");
        Ok(SecurityHeader {
            header,
            security,
            token,
        })
    }

    /// Replace the token's content with the base64 DER of `certificate`.
    /// Any child elements or comments of the placeholder are removed.
    pub fn embed_certificate(
        &self,
        doc: &mut Document,
        located: &SecurityHeader,
        certificate: &Certificate,
    ) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(certificate.der());
        doc.set_text(located.token, &encoded);
        debug!(subject = certificate.subject_name(), "embedded certificate");
    }

    /// Insert `signature` into the security element right after the token.
    ///
    /// If the token is nested deeper than a direct child, the signature is
    /// appended as the last child of the security element instead.
    pub fn insert_signature(&self, doc: &mut Document, located: &SecurityHeader, signature: NodeId) {
        if doc.parent(located.token) == Some(located.security) {
            doc.insert_after(located.token, signature);
        } else {
            doc.append_child(located.security, signature);
        }
        debug!("inserted signature into security header");
    }
}

fn is_element(doc: &Document, id: NodeId, namespace: &str, local_name: &str) -> bool {
    doc.element(id).is_some_and(|e| e.is(namespace, local_name))
}

fn first_descendant(
    doc: &Document,
    root: NodeId,
    mut predicate: impl FnMut(NodeId) -> bool,
) -> Option<NodeId> {
    doc.descendants(root).into_iter().find(|&id| predicate(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use soapsig_xml::serialize::serialize_node;
    use soapsig_xml::Element;

    const WSSE: &str = ns::WSSE;

    fn envelope(env_ns: &str, security: &str) -> String {
        format!(
            r#"<s:Envelope xmlns:s="{env_ns}" xmlns:wsse="{WSSE}"><s:Header>{security}</s:Header><s:Body>x</s:Body></s:Envelope>"#
        )
    }

    fn cert() -> Certificate {
        let path = format!(
            "{}/../../test-data/keys/rsa-2048-cert.pem",
            env!("CARGO_MANIFEST_DIR")
        );
        soapsig_keys::loader::load_x509_cert_pem(&std::fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn test_locate_soap11_and_soap12() {
        let security =
            "<wsse:Security><wsse:BinarySecurityToken>old</wsse:BinarySecurityToken></wsse:Security>";
        for env_ns in [ns::SOAP11_ENV, ns::SOAP12_ENV] {
            let doc = Document::parse(&envelope(env_ns, security)).unwrap();
            let found = SecurityHeaderInjector::default().locate(&doc).unwrap();
            assert_eq!(doc.element(found.security).unwrap().local_name, "Security");
            assert_eq!(doc.parent(found.token), Some(found.security));
        }
    }

    #[test]
    fn test_missing_elements() {
        let injector = SecurityHeaderInjector::default();
        let cases = [
            (
                r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body/></s:Envelope>"#.to_owned(),
                "Header",
            ),
            (envelope(ns::SOAP11_ENV, ""), "Security"),
            (envelope(ns::SOAP11_ENV, "<wsse:Security/>"), "BinarySecurityToken"),
            (
                envelope("urn:not-soap", "<wsse:Security><wsse:BinarySecurityToken/></wsse:Security>"),
                "Header",
            ),
        ];
        for (xml, missing) in cases {
            let doc = Document::parse(&xml).unwrap();
            match injector.locate(&doc) {
                Err(Error::MalformedEnvelope { element }) => assert_eq!(element, missing),
                other => panic!("expected MalformedEnvelope, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_custom_locator() {
        let xml = r#"<s:Envelope xmlns:s="urn:env" xmlns:x="urn:sec"><s:Header><x:Sec><x:Token/></x:Sec></s:Header></s:Envelope>"#;
        let doc = Document::parse(xml).unwrap();
        let locator = HeaderLocator::default()
            .with_envelope_namespaces(["urn:env"])
            .with_security_namespace("urn:sec")
            .with_security_name("Sec")
            .with_token_name("Token");
        assert!(SecurityHeaderInjector::new(locator).locate(&doc).is_ok());
    }

    #[test]
    fn test_embed_and_insert_keep_siblings() {
        let security = "<wsse:Security><!--keep--><wsse:BinarySecurityToken>old<x/></wsse:BinarySecurityToken><wsse:Other/></wsse:Security>";
        let mut doc = Document::parse(&envelope(ns::SOAP11_ENV, security)).unwrap();
        let injector = SecurityHeaderInjector::default();
        let found = injector.locate(&doc).unwrap();
        let certificate = cert();

        injector.embed_certificate(&mut doc, &found, &certificate);
        let sig = doc.create_element(Element::new(None, "Sig", None));
        injector.insert_signature(&mut doc, &found, sig);

        let b64 = base64::engine::general_purpose::STANDARD.encode(certificate.der());
        assert_eq!(
            serialize_node(&doc, found.security),
            format!(
                "<wsse:Security><!--keep--><wsse:BinarySecurityToken>{b64}</wsse:BinarySecurityToken><Sig/><wsse:Other/></wsse:Security>"
            )
        );
    }

    #[test]
    fn test_placeholder_content_fully_replaced() {
        let security = "<wsse:Security><wsse:BinarySecurityToken><!-- cert --><wsse:Embedded>PLACEHOLDER</wsse:Embedded></wsse:BinarySecurityToken></wsse:Security>";
        let mut doc = Document::parse(&envelope(ns::SOAP11_ENV, security)).unwrap();
        let injector = SecurityHeaderInjector::default();
        let found = injector.locate(&doc).unwrap();
        let certificate = cert();

        injector.embed_certificate(&mut doc, &found, &certificate);

        assert_eq!(doc.children(found.token).count(), 1);
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(doc.text_content(found.token))
            .unwrap();
        assert_eq!(decoded, certificate.der());
        assert!(!serialize_node(&doc, found.security).contains("PLACEHOLDER"));
    }

    #[test]
    fn test_nested_token_appends_signature() {
        let security = "<wsse:Security><w><wsse:BinarySecurityToken/></w><wsse:Other/></wsse:Security>";
        let mut doc = Document::parse(&envelope(ns::SOAP11_ENV, security)).unwrap();
        let injector = SecurityHeaderInjector::default();
        let found = injector.locate(&doc).unwrap();
        let sig = doc.create_element(Element::new(None, "Sig", None));
        injector.insert_signature(&mut doc, &found, sig);
        let last = doc.element_children(found.security).last().unwrap();
        assert_eq!(last, sig);
    }
}
