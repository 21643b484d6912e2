//! rustls integration
//!
//! Provides:
//! - hostname verification of a finished handshake's peer certificate
//! - certificate loading from PEM files

use crate::verify::Verdict;
use crate::x509::validate_der;
use crate::{Error, Result};
use rustls::pki_types::CertificateDer;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Verify `hostname` against the end-entity certificate the peer presented
/// during a completed handshake. No peer certificate is [`Verdict::Error`].
pub fn validate_connection(hostname: &str, conn: &rustls::CommonState) -> Verdict {
    match conn.peer_certificates().and_then(|certs| certs.first()) {
        Some(cert) => validate_peer(hostname, cert),
        None => {
            tracing::debug!(hostname, "no peer certificate to verify");
            Verdict::Error
        }
    }
}

/// Verify `hostname` against one rustls certificate
pub fn validate_peer(hostname: &str, cert: &CertificateDer<'_>) -> Verdict {
    validate_der(hostname, cert.as_ref())
}

/// Load certificates from PEM file
pub fn load_certs(path: impl AsRef<Path>) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path.as_ref())
        .map_err(|e| Error::Tls(format!("Failed to open cert file: {}", e)))?;
    let mut reader = BufReader::new(file);

    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Tls(format!("Failed to parse certs: {}", e)))?;

    if certs.is_empty() {
        return Err(Error::Tls("No certificates found in file".to_string()));
    }

    Ok(certs)
}
