#![forbid(unsafe_code)]

//! The signing pipeline.

use crate::config::SignerConfig;
use crate::header::SecurityHeaderInjector;
use soapsig_core::{algorithm, Result};
use soapsig_dsig::{check_uris, SignatureEngine};
use soapsig_keys::{KeyMaterialProvider, KeyStoreFile};
use soapsig_xml::{serialize, Document, IdResolver, SerializeOptions};
use std::path::Path;
use tracing::{debug, info};

/// Signs SOAP messages with credentials from a [`KeyMaterialProvider`].
///
/// Holds only immutable configuration, so one signer can serve many
/// threads; every call parses, signs and serializes its own document.
#[derive(Debug)]
pub struct SoapSigner<P> {
    provider: P,
    config: SignerConfig,
    id_resolver: IdResolver,
    injector: SecurityHeaderInjector,
    engine: SignatureEngine,
}

impl<P: KeyMaterialProvider> SoapSigner<P> {
    /// Fails with `UnsupportedAlgorithm` if the configured profile names
    /// an unimplemented algorithm.
    pub fn new(provider: P, config: SignerConfig) -> Result<Self> {
        let engine = SignatureEngine::new(config.profile.clone())?;
        Ok(Self {
            provider,
            id_resolver: IdResolver::new(config.id_attributes.iter().cloned()),
            injector: SecurityHeaderInjector::new(config.locator.clone()),
            engine,
            config,
        })
    }

    pub fn config(&self) -> &SignerConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Sign `xml` with the credential stored under `alias`, with one
    /// reference per entry of `reference_uris` (`""` or `#id`).
    ///
    /// Returns the serialized signed document. Nothing is returned on
    /// failure; the first error aborts the run.
    pub fn sign<S: AsRef<str>>(&self, xml: &str, alias: &str, reference_uris: &[S]) -> Result<String> {
        check_uris(reference_uris)?;
        let mut doc = Document::parse(xml)?;
        debug!("parsed input document");

        let marked = self.id_resolver.mark(&mut doc);
        debug!(marked, "marked identifier attributes");

        let credential = self.provider.load(alias)?;
        debug!(alias, key = credential.private_key().kind(), "loaded credential");

        let located = self.injector.locate(&doc)?;
        self.injector
            .embed_certificate(&mut doc, &located, credential.certificate());

        let template = self.engine.prepare(&mut doc, reference_uris, &credential)?;
        self.injector
            .insert_signature(&mut doc, &located, template.signature());

        let signature = self
            .engine
            .complete(&mut doc, template, credential.private_key())?;
        debug!("computed SignedInfo and signature value");

        let output = serialize(
            &doc,
            SerializeOptions {
                xml_declaration: self.config.xml_declaration,
            },
        );
        info!(
            alias,
            references = signature.signed_info.references.len(),
            canonicalization = algorithm::short_name(&signature.signed_info.canonicalization_method),
            signature_method = algorithm::short_name(&signature.signed_info.signature_method),
            digest_method = algorithm::short_name(self.config.profile.digest_method()),
            "signed SOAP message"
        );
        Ok(output)
    }
}

/// Sign once with a key store file and the default configuration.
///
/// The store may be PKCS#12 or JKS; see [`KeyStoreFile`].
pub fn sign_soap_message<S: AsRef<str>>(
    store_path: impl AsRef<Path>,
    alias: &str,
    password: &str,
    xml: &str,
    reference_uris: &[S],
) -> Result<String> {
    let store = KeyStoreFile::new(store_path.as_ref(), password);
    SoapSigner::new(store, SignerConfig::default())?.sign(xml, alias, reference_uris)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::verify;
    use base64::Engine;
    use soapsig_core::{ns, Error};
    use soapsig_dsig::SignatureProfile;
    use soapsig_keys::{JksKeyStore, MemoryKeyStore, Pkcs12KeyStore};

    fn fixture_path(name: &str) -> String {
        format!("{}/../../test-data/keys/{name}", env!("CARGO_MANIFEST_DIR"))
    }

    fn fixture(name: &str) -> Vec<u8> {
        std::fs::read(fixture_path(name)).unwrap()
    }

    fn store() -> Pkcs12KeyStore {
        Pkcs12KeyStore::new(fixture_path("rsa-2048.p12"), "changeit")
    }

    fn envelope(header: &str) -> String {
        format!(
            r#"<soapenv:Envelope xmlns:soapenv="{soap}" xmlns:wsse="{wsse}" xmlns:wsu="{wsu}">
  <soapenv:Header>{header}</soapenv:Header>
  <soapenv:Body Id="body1">
    <m:ping xmlns:m="urn:example:ping">hello &amp; welcome</m:ping>
  </soapenv:Body>
</soapenv:Envelope>"#,
            soap = ns::SOAP11_ENV,
            wsse = ns::WSSE,
            wsu = ns::WSU,
        )
    }

    fn request() -> String {
        envelope(
            r#"
    <wsse:Security>
      <wsse:BinarySecurityToken EncodingType="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary" ValueType="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-x509-token-profile-1.0#X509v3" wsu:Id="X509-1"/>
      <wsu:Timestamp wsu:Id="ts"><wsu:Created>2024-01-01T00:00:00Z</wsu:Created></wsu:Timestamp>
    </wsse:Security>
  "#,
        )
    }

    fn signed_doc(xml: &str) -> Document {
        Document::parse(xml).unwrap()
    }

    #[test]
    fn test_sign_body_reference() {
        let signer = SoapSigner::new(store(), SignerConfig::default()).unwrap();
        let signed = signer.sign(&request(), "mykey", &["#body1"]).unwrap();

        assert!(signed.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        verify(&signed, &["Id"]).unwrap();

        let doc = signed_doc(&signed);
        let security = doc.find_element(ns::WSSE, ns::node::SECURITY).unwrap();
        let children: Vec<String> = doc
            .element_children(security)
            .map(|c| doc.element(c).unwrap().qualified_name())
            .collect();
        assert_eq!(
            children,
            ["wsse:BinarySecurityToken", "ds:Signature", "wsu:Timestamp"]
        );

        let reference = doc.find_element(ns::DSIG, ns::node::REFERENCE).unwrap();
        assert_eq!(doc.element(reference).unwrap().attribute("URI"), Some("#body1"));
        let method = doc.find_element(ns::DSIG, ns::node::SIGNATURE_METHOD).unwrap();
        assert_eq!(
            doc.element(method).unwrap().attribute("Algorithm"),
            Some(algorithm::RSA_SHA1)
        );
    }

    #[test]
    fn test_placeholder_matches_keyinfo_certificate() {
        let signed = sign_soap_message(
            fixture_path("rsa-2048.p12"),
            "mykey",
            "changeit",
            &request(),
            &["#body1"],
        )
        .unwrap();
        let doc = signed_doc(&signed);
        let token = doc.find_element(ns::WSSE, ns::node::BINARY_SECURITY_TOKEN).unwrap();
        let x509 = doc.find_element(ns::DSIG, ns::node::X509_CERTIFICATE).unwrap();
        let engine = base64::engine::general_purpose::STANDARD;
        let placeholder = engine.decode(doc.text_content(token)).unwrap();
        let key_info = engine.decode(doc.text_content(x509)).unwrap();
        assert_eq!(placeholder, key_info);

        let expected = soapsig_keys::loader::load_x509_cert_pem(&fixture("rsa-2048-cert.pem")).unwrap();
        assert_eq!(placeholder, expected.der());

        let subject = doc.find_element(ns::DSIG, ns::node::X509_SUBJECT_NAME).unwrap();
        assert_eq!(doc.text_content(subject), expected.subject_name());
    }

    #[test]
    fn test_unknown_alias() {
        let signer = SoapSigner::new(store(), SignerConfig::default()).unwrap();
        match signer.sign(&request(), "nosuchkey", &["#body1"]) {
            Err(Error::CredentialNotFound { alias }) => assert_eq!(alias, "nosuchkey"),
            other => panic!("expected CredentialNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_security_header() {
        let signer = SoapSigner::new(store(), SignerConfig::default()).unwrap();
        match signer.sign(&envelope(""), "mykey", &["#body1"]) {
            Err(Error::MalformedEnvelope { element }) => assert_eq!(element, "Security"),
            other => panic!("expected MalformedEnvelope, got {other:?}"),
        }
    }

    #[test]
    fn test_whole_document_reference() {
        let signer = SoapSigner::new(store(), SignerConfig::default()).unwrap();
        let signed = signer.sign(&request(), "mykey", &[""]).unwrap();
        verify(&signed, &["Id"]).unwrap();

        // The certificate is part of the digested content.
        let doc = signed_doc(&signed);
        let token = doc.find_element(ns::WSSE, ns::node::BINARY_SECURITY_TOKEN).unwrap();
        let cert_b64 = doc.text_content(token);
        let tampered = signed.replacen(&cert_b64[..40], &cert_b64[..40].to_lowercase(), 1);
        assert!(verify(&tampered, &["Id"]).is_err());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = SoapSigner::new(store(), SignerConfig::default()).unwrap();
        let a = signer.sign(&request(), "mykey", &["#body1"]).unwrap();
        let b = signer.sign(&request(), "mykey", &["#body1"]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tampering_detected() {
        let signer = SoapSigner::new(store(), SignerConfig::default()).unwrap();
        let signed = signer.sign(&request(), "mykey", &["#body1"]).unwrap();
        let tampered = signed.replace("hello &amp; welcome", "hello &amp; goodbye");
        assert_ne!(tampered, signed);
        let err = verify(&tampered, &["Id"]).unwrap_err();
        assert!(err.contains("digest mismatch"), "{err}");
    }

    #[test]
    fn test_multiple_references_with_wsu_id() {
        let config = SignerConfig::default()
            .with_id_attribute("wsu:Id")
            .with_profile(SignatureProfile::rsa_sha256_exclusive().with_inclusive_prefixes(["soapenv"]));
        let signer = SoapSigner::new(store(), config).unwrap();
        let signed = signer.sign(&request(), "mykey", &["#body1", "#ts"]).unwrap();
        verify(&signed, &["Id", "wsu:Id"]).unwrap();

        let doc = signed_doc(&signed);
        let signed_info = doc.find_element(ns::DSIG, ns::node::SIGNED_INFO).unwrap();
        let uris: Vec<&str> = doc
            .element_children(signed_info)
            .filter_map(|c| doc.element(c)?.attribute("URI"))
            .collect();
        assert_eq!(uris, ["#body1", "#ts"]);
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let xml = request().replace(r#"wsu:Id="ts""#, r#"Id="body1""#);
        let signer = SoapSigner::new(store(), SignerConfig::default()).unwrap();
        match signer.sign(&xml, "mykey", &["#body1"]) {
            Err(Error::InvalidReference { uri, reason }) => {
                assert_eq!(uri, "#body1");
                assert!(reason.contains("ambiguous"));
            }
            other => panic!("expected InvalidReference, got {other:?}"),
        }
    }

    #[test]
    fn test_unresolvable_and_unsupported_references() {
        let signer = SoapSigner::new(store(), SignerConfig::default()).unwrap();
        for uri in ["#nothing", "http://example.com/body"] {
            assert!(matches!(
                signer.sign(&request(), "mykey", &[uri]),
                Err(Error::InvalidReference { .. })
            ));
        }
    }

    #[test]
    fn test_empty_reference_list_rejected_before_loading_credential() {
        let missing = Pkcs12KeyStore::new(fixture_path("missing.p12"), "changeit");
        let signer = SoapSigner::new(missing, SignerConfig::default()).unwrap();
        match signer.sign::<&str>(&request(), "mykey", &[]) {
            Err(Error::InvalidReference { reason, .. }) => {
                assert!(reason.contains("at least one Reference"))
            }
            other => panic!("expected InvalidReference, got {other:?}"),
        }
        assert!(matches!(
            signer.sign(&request(), "mykey", &["#body1", "cid:attachment"]),
            Err(Error::InvalidReference { .. })
        ));
    }

    #[test]
    fn test_wrong_password() {
        let result = sign_soap_message(
            fixture_path("rsa-2048.p12"),
            "mykey",
            "wrong",
            &request(),
            &["#body1"],
        );
        assert!(matches!(result, Err(Error::CredentialAccessDenied { .. })));
    }

    #[test]
    fn test_missing_store() {
        let result = sign_soap_message(
            fixture_path("missing.p12"),
            "mykey",
            "changeit",
            &request(),
            &["#body1"],
        );
        assert!(matches!(result, Err(Error::StoreUnavailable { .. })));
    }

    #[test]
    fn test_malformed_input() {
        let signer = SoapSigner::new(store(), SignerConfig::default()).unwrap();
        assert!(matches!(
            signer.sign("<soapenv:Envelope>", "mykey", &["#body1"]),
            Err(Error::MalformedInputXml(_))
        ));
    }

    #[test]
    fn test_unsupported_profile_rejected_up_front() {
        let config = SignerConfig::default()
            .with_profile(SignatureProfile::default().with_digest_method("urn:example:digest"));
        assert!(matches!(
            SoapSigner::new(store(), config),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_ecdsa_from_memory_store() {
        let mut keys = MemoryKeyStore::new();
        keys.insert_pem("eckey", &fixture("ec-p256-key.pem"), &fixture("ec-p256-cert.pem"))
            .unwrap();
        let profile = SignatureProfile::default()
            .with_signature_method(algorithm::ECDSA_SHA256)
            .with_digest_method(algorithm::SHA256);
        let config = SignerConfig::default()
            .with_profile(profile)
            .with_xml_declaration(false);
        let signer = SoapSigner::new(keys, config).unwrap();
        let signed = signer.sign(&request(), "eckey", &["#body1", ""]).unwrap();
        assert!(signed.starts_with("<soapenv:Envelope"));
        verify(&signed, &["Id"]).unwrap();
    }

    #[test]
    fn test_ec_pkcs12_store_with_rsa_profile_fails() {
        let store = Pkcs12KeyStore::new(fixture_path("ec-p256.p12"), "changeit");
        let signer = SoapSigner::new(store, SignerConfig::default()).unwrap();
        assert!(matches!(
            signer.sign(&request(), "eckey", &["#body1"]),
            Err(Error::SignatureComputation(_))
        ));
    }

    #[test]
    fn test_soap12_envelope() {
        let xml = request().replace(ns::SOAP11_ENV, ns::SOAP12_ENV);
        let signer = SoapSigner::new(store(), SignerConfig::default()).unwrap();
        let signed = signer.sign(&xml, "mykey", &["#body1"]).unwrap();
        verify(&signed, &["Id"]).unwrap();
    }

    #[test]
    fn test_concurrent_signing() {
        let signer = SoapSigner::new(store(), SignerConfig::default()).unwrap();
        let expected = signer.sign(&request(), "mykey", &["#body1"]).unwrap();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| signer.sign(&request(), "mykey", &["#body1"]).unwrap()))
                .collect();
            for h in handles {
                assert_eq!(h.join().unwrap(), expected);
            }
        });
    }

    fn order_request() -> String {
        let path = format!("{}/../../test-data/soap/order-request.xml", env!("CARGO_MANIFEST_DIR"));
        std::fs::read_to_string(path).unwrap()
    }

    /// `(DigestValue per Reference, SignatureValue)` of a signed document.
    fn signature_values(signed: &str) -> (Vec<String>, String) {
        let doc = signed_doc(signed);
        let digests = doc
            .descendants(doc.root())
            .into_iter()
            .filter(|&n| doc.element(n).is_some_and(|e| e.is(ns::DSIG, ns::node::DIGEST_VALUE)))
            .map(|n| doc.text_content(n))
            .collect();
        let value = doc.find_element(ns::DSIG, ns::node::SIGNATURE_VALUE).unwrap();
        (digests, doc.text_content(value))
    }

    // Expected values come from the JDK XML-DSig signer run over the same
    // input with the same key.
    #[test]
    fn test_known_answer_inclusive_rsa_sha1() {
        let store = JksKeyStore::new(fixture_path("rsa-2048.jks"), "changeit");
        let signer = SoapSigner::new(store, SignerConfig::default()).unwrap();
        let signed = signer.sign(&order_request(), "mykey", &["", "#body1"]).unwrap();

        let (digests, signature) = signature_values(&signed);
        assert_eq!(
            digests,
            ["+s/xhOsTqM5wj7yjChT5cnAH09g=", "AxuZNgqOhqTS8wy7X0mQa/X2uSQ="]
        );
        assert_eq!(
            signature,
            "Q1PlJIRafJ+NQuau/qtvXf4MestwlGrlCbFeRAjdJDW/NtfmtpSXPzfP50nkPtSwuDJoqaSm486tdfU/4v9cKos3\
             DkwXZEPkWXkHebtP1iW0/HfP0X0vDAafGD3D7ROPCMM+5XhtoWpqGL4zqTleiB5q9v9RImv2JSGbDxhVHip2AS8I\
             UkMfuJvBXhDUDZ3w+071xh71nrRHrBnwCdf+rMts0EwX1A13ZjKKhg0hYr3qJCvWKZDGyr37R7Lc8jmsIwPs301W\
             o2s72/pjsS9wjrM05habN80wOTOofOvKrSXtQ6y2JfPPmcYKcTzYTDIZCIeRQgqr1ESr1arQPYsLXQ=="
        );

        let doc = signed_doc(&signed);
        let subject = doc.find_element(ns::DSIG, ns::node::X509_SUBJECT_NAME).unwrap();
        assert_eq!(doc.text_content(subject), "CN=mykey,O=Soapsig Test,C=NL");
    }

    #[test]
    fn test_known_answer_exclusive_rsa_sha256() {
        let config = SignerConfig::default()
            .with_profile(SignatureProfile::rsa_sha256_exclusive().with_inclusive_prefixes(["soapenv"]));
        let signed = SoapSigner::new(KeyStoreFile::new(fixture_path("rsa-2048.jks"), "changeit"), config)
            .unwrap()
            .sign(&order_request(), "mykey", &["#body1"])
            .unwrap();

        let (digests, signature) = signature_values(&signed);
        assert_eq!(digests, ["llucJM5uJtFaw5gA9L0fAOSvd76Jt/hWAwMx13ZICF8="]);
        assert_eq!(
            signature,
            "HL8ICe6+XtlS1brCSsbt93UWXL0KtToIrrynDeyjRDj5Ri7gwiPQpP77bK8iuX3g6klUU4mpAkHKnEmXPMMOGfuE\
             DcUYVH+seXpBJy2kkVRGYV/ZHGoPvOIKSFgQY7en0q8d8kblH9BsbEhHyMp34oi845fy7g1sDP4F/SiCfcBjNQ60\
             woS/GfSjpD50ZX1cWFp4U19XgZr9aul09+EyO/IzntZecb6Lm9oTG258DxA6iAvH/1eYD1437FxSX8//hggqNJCI\
             VEEE8C7RNvyh5JYxISOKMglTrPzLcJSEITeMxUq3889KNyfj+wXdApNSzT3HibzG80lxgHeEaKzvrw=="
        );
    }

    #[test]
    fn test_jks_and_pkcs12_stores_sign_alike() {
        let from_jks = sign_soap_message(
            fixture_path("rsa-2048.jks"),
            "MYKEY",
            "changeit",
            &request(),
            &["#body1"],
        )
        .unwrap();
        let from_p12 = SoapSigner::new(store(), SignerConfig::default())
            .unwrap()
            .sign(&request(), "mykey", &["#body1"])
            .unwrap();
        assert_eq!(from_jks, from_p12);
    }
}
