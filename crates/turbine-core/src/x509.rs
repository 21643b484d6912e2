//! X.509 DER certificates as [`PeerCertificate`]s
//!
//! Decoding only, using the x509-parser crate. Signatures and chains are not
//! looked at.

use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::FromDer;

use crate::error::CertificateError;
use crate::verify::{match_hostname, NameEntry, PeerCertificate, Verdict};

/// Decoded DER certificate borrowing its encoding
#[derive(Debug)]
pub struct X509Peer<'a> {
    cert: X509Certificate<'a>,
}

impl<'a> X509Peer<'a> {
    /// Decode a DER certificate
    pub fn from_der(der: &'a [u8]) -> Result<Self, CertificateError> {
        let (_, cert) =
            X509Certificate::from_der(der).map_err(|e| CertificateError::Decode(e.to_string()))?;
        Ok(Self { cert })
    }

    #[inline]
    pub fn certificate(&self) -> &X509Certificate<'a> {
        &self.cert
    }
}

impl PeerCertificate for X509Peer<'_> {
    fn san_dns_entries(&self) -> Result<Option<Vec<NameEntry<'_>>>, CertificateError> {
        let san = self
            .cert
            .subject_alternative_name()
            .map_err(|e| CertificateError::Extension(e.to_string()))?;

        Ok(san.map(|ext| {
            ext.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some(NameEntry::new(dns.as_bytes())),
                    _ => None,
                })
                .collect()
        }))
    }

    fn common_name(&self) -> Result<Option<NameEntry<'_>>, CertificateError> {
        Ok(self
            .cert
            .subject()
            .iter_common_name()
            .next()
            .map(|attr| NameEntry::new(attr.attr_value().data)))
    }
}

/// Verify `hostname` against a DER certificate. Undecodable input is
/// [`Verdict::Error`].
pub fn validate_der(hostname: &str, der: &[u8]) -> Verdict {
    match X509Peer::from_der(der) {
        Ok(peer) => match_hostname(hostname, &peer),
        Err(error) => {
            tracing::warn!(%error, "peer certificate did not decode");
            Verdict::Error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_der_is_error() {
        assert!(X509Peer::from_der(b"not a certificate").is_err());
        assert_eq!(validate_der("example.com", b"not a certificate"), Verdict::Error);
    }

    #[test]
    fn test_empty_der_is_error() {
        assert_eq!(validate_der("example.com", &[]), Verdict::Error);
    }
}
