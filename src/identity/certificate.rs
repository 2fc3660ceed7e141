//! Email identities carried by verified client certificates.
//!
//! Certificates arrive already verified by the TLS terminator, which puts them
//! into the request extensions as [`ClientCertificates`] together with a
//! [`SecureTransport`] marker. Nothing here checks signatures, chains or
//! validity periods.

use {
    crate::{Error, Result},
    http::{request::Parts, uri::Scheme},
    x509_parser::prelude::*,
};

/// `GeneralName` tag of an rfc822Name (email) subject alternative name.
pub const RFC822_NAME: u8 = 1;

/// Request extension marking a connection as transport-secure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecureTransport;

/// Request extension holding the verified client certificates of the
/// connection, DER encoded, in the order the TLS terminator presented them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientCertificates(pub Vec<Vec<u8>>);

/// A subject alternative name reduced to its tag and textual value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AltName {
    pub tag: u8,
    pub value: String,
}

/// Whether the request arrived over a secure transport.
pub fn is_secure(parts: &Parts) -> bool {
    parts.extensions.get::<SecureTransport>().is_some()
        || parts.uri.scheme() == Some(&Scheme::HTTPS)
}

/// Extracts the textual subject alternative names of a DER certificate.
///
/// Name forms without a textual value (directory names, other names, ...)
/// are skipped.
pub fn subject_alt_names(der: &[u8]) -> Result<Vec<AltName>> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| Error::certificate(format!("X.509 parse failed: {e}")))?;

    let san = cert
        .subject_alternative_name()
        .map_err(|e| Error::certificate(format!("invalid subjectAltName extension: {e}")))?;

    let Some(san) = san else {
        return Ok(Vec::new());
    };

    let names = san
        .value
        .general_names
        .iter()
        .filter_map(|name| match name {
            GeneralName::RFC822Name(email) => Some(AltName {
                tag: RFC822_NAME,
                value: (*email).to_string(),
            }),
            GeneralName::DNSName(dns) => Some(AltName {
                tag: 2,
                value: (*dns).to_string(),
            }),
            GeneralName::URI(uri) => Some(AltName {
                tag: 6,
                value: (*uri).to_string(),
            }),
            _ => None,
        })
        .collect();

    Ok(names)
}

/// The first rfc822Name among `names`.
pub fn rfc822_name(names: &[AltName]) -> Option<&str> {
    names
        .iter()
        .find(|name| name.tag == RFC822_NAME)
        .map(|name| name.value.as_str())
}

/// The email identity presented by a chain of client certificates.
///
/// Each certificate contributes its first rfc822Name; when several
/// certificates carry one, the last certificate in the chain wins.
/// Parse failures are returned, not skipped.
pub fn email_identity(certificates: &ClientCertificates) -> Result<Option<String>> {
    let mut email = None;
    for der in &certificates.0 {
        let names = subject_alt_names(der)?;
        if let Some(found) = rfc822_name(&names) {
            email = Some(found.to_string());
        }
    }
    Ok(email)
}
