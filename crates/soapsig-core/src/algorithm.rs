#![forbid(unsafe_code)]

//! Algorithm identifiers written into `Algorithm` attributes.
//!
//! XML-DSig and its companions name algorithms by a namespace URI plus a
//! fragment, so the constants are spelled as (namespace, fragment) pairs.

macro_rules! identifiers {
    ($($base:literal => { $($name:ident = $fragment:literal,)+ })+) => {
        $($(
            pub const $name: &str = concat!($base, $fragment);
        )+)+
    };
}

identifiers! {
    "http://www.w3.org/2000/09/xmldsig#" => {
        SHA1 = "sha1",
        RSA_SHA1 = "rsa-sha1",
        ENVELOPED_SIGNATURE = "enveloped-signature",
    }
    "http://www.w3.org/2001/04/xmlenc#" => {
        SHA256 = "sha256",
        SHA512 = "sha512",
    }
    "http://www.w3.org/2001/04/xmldsig-more#" => {
        SHA224 = "sha224",
        SHA384 = "sha384",
        RSA_SHA224 = "rsa-sha224",
        RSA_SHA256 = "rsa-sha256",
        RSA_SHA384 = "rsa-sha384",
        RSA_SHA512 = "rsa-sha512",
        ECDSA_SHA256 = "ecdsa-sha256",
        ECDSA_SHA384 = "ecdsa-sha384",
    }
    "http://www.w3.org/2007/05/xmldsig-more#" => {
        SHA3_224 = "sha3-224",
        SHA3_256 = "sha3-256",
        SHA3_384 = "sha3-384",
        SHA3_512 = "sha3-512",
        RSA_PSS_SHA1 = "sha1-rsa-MGF1",
        RSA_PSS_SHA224 = "sha224-rsa-MGF1",
        RSA_PSS_SHA256 = "sha256-rsa-MGF1",
        RSA_PSS_SHA384 = "sha384-rsa-MGF1",
        RSA_PSS_SHA512 = "sha512-rsa-MGF1",
    }
    // Canonical XML 1.0 and 1.1 carry no fragment in their plain form.
    "http://www.w3.org/TR/2001/REC-xml-c14n-20010315" => {
        C14N = "",
        C14N_WITH_COMMENTS = "#WithComments",
    }
    "http://www.w3.org/2006/12/xml-c14n11" => {
        C14N11 = "",
        C14N11_WITH_COMMENTS = "#WithComments",
    }
    "http://www.w3.org/2001/10/xml-exc-c14n#" => {
        EXC_C14N = "",
        EXC_C14N_WITH_COMMENTS = "WithComments",
    }
}

/// A short label for log lines: the fragment, or the last path segment
/// when the fragment is empty.
pub fn short_name(uri: &str) -> &str {
    let trimmed = uri.trim_end_matches('#');
    match trimmed.rsplit_once('#') {
        Some((_, fragment)) => fragment,
        None => trimmed.rsplit('/').next().unwrap_or(trimmed),
    }
}
