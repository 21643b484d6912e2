#![cfg(feature = "tls")]

use std::path::PathBuf;

use turbine_core::tls::{load_certs, validate_peer};
use turbine_core::{validate_der, PeerCertificate, Verdict, X509Peer};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn der(name: &str) -> Vec<u8> {
    let certs = load_certs(fixture(name)).unwrap();
    assert_eq!(certs.len(), 1);
    certs[0].as_ref().to_vec()
}

#[test]
fn test_wildcard_certificate() {
    let der = der("wildcard.pem");
    assert_eq!(validate_der("www.example.com", &der), Verdict::MatchFound);
    assert_eq!(validate_der("example.com", &der), Verdict::MatchFound);
    assert_eq!(validate_der("a.b.example.com", &der), Verdict::MatchNotFound);
    assert_eq!(validate_der("example.org", &der), Verdict::MatchNotFound);
}

#[test]
fn test_san_hides_common_name() {
    let der = der("wildcard.pem");
    assert_eq!(validate_der("ignored.example", &der), Verdict::MatchNotFound);
}

#[test]
fn test_common_name_fallback() {
    let der = der("cn_only.pem");
    let peer = X509Peer::from_der(&der).unwrap();
    assert_eq!(peer.san_dns_entries().unwrap(), None);

    assert_eq!(validate_der("legacy.example", &der), Verdict::MatchFound);
    assert_eq!(validate_der("LEGACY.example", &der), Verdict::MatchFound);
    assert_eq!(validate_der("other.example", &der), Verdict::MatchNotFound);
}

#[test]
fn test_san_without_dns_names() {
    let der = der("ip_san.pem");
    let peer = X509Peer::from_der(&der).unwrap();
    assert_eq!(peer.san_dns_entries().unwrap(), Some(vec![]));

    // the extension exists, so the CN is never consulted
    assert_eq!(validate_der("ip.example", &der), Verdict::MatchNotFound);
}

#[test]
fn test_san_with_embedded_nul_is_malformed() {
    let der = der("san_embedded_nul.pem");
    let peer = X509Peer::from_der(&der).unwrap();
    let entries = peer.san_dns_entries().unwrap().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].content(), b"evil.com");
    assert!(!entries[0].is_intact());

    assert_eq!(validate_der("evil.com", &der), Verdict::MalformedCertificate);
    assert_eq!(validate_der("evil.com.example.com", &der), Verdict::MalformedCertificate);
}

#[test]
fn test_cn_with_embedded_nul_is_malformed() {
    let der = der("cn_embedded_nul.pem");
    assert_eq!(validate_der("legacy.example", &der), Verdict::MalformedCertificate);
}

#[test]
fn test_rustls_certificate() {
    let certs = load_certs(fixture("wildcard.pem")).unwrap();
    assert_eq!(validate_peer("api.example.com", &certs[0]), Verdict::MatchFound);
}

#[test]
fn test_empty_pem_file() {
    let err = load_certs(fixture("empty.pem")).unwrap_err();
    assert_eq!(err.to_string(), "TLS error: No certificates found in file");
}
