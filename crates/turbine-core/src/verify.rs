//! Certificate hostname verification
//!
//! Matches a hostname against the identities of a peer certificate after
//! the TLS handshake:
//! - Subject Alternative Name DNS entries first, with single-label
//!   left-most wildcards (`*.example.com`)
//! - Subject Common Name only when the certificate has no SAN extension at
//!   all, exact comparison only
//! - names whose declared length disagrees with their content (embedded NUL)
//!   mark the certificate as malformed
//!
//! Trust-chain validation is the TLS stack's job, not this module's.

use std::fmt;

use tracing::{debug, warn};

use crate::error::CertificateError;

/// Verification outcome. The discriminants are the stable host-facing codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Verdict {
    MatchFound = 0,
    MatchNotFound = 1,
    /// Internal signal that triggers the Common Name fallback; never returned
    NoSanPresent = 2,
    MalformedCertificate = 3,
    Error = 4,
}

impl Verdict {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Convert from u8 code
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Verdict::MatchFound),
            1 => Some(Verdict::MatchNotFound),
            2 => Some(Verdict::NoSanPresent),
            3 => Some(Verdict::MalformedCertificate),
            4 => Some(Verdict::Error),
            _ => None,
        }
    }

    /// Whether the connection may proceed
    #[inline]
    pub fn is_match(self) -> bool {
        self == Verdict::MatchFound
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::MatchFound => "match found",
            Verdict::MatchNotFound => "match not found",
            Verdict::NoSanPresent => "no subjectAltName present",
            Verdict::MalformedCertificate => "malformed certificate",
            Verdict::Error => "error",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One certificate name: its stored bytes and the length the encoding claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameEntry<'a> {
    pub bytes: &'a [u8],
    pub declared_len: usize,
}

impl<'a> NameEntry<'a> {
    /// Entry whose declared length is its byte length
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            declared_len: bytes.len(),
        }
    }

    pub fn with_declared_len(bytes: &'a [u8], declared_len: usize) -> Self {
        Self { bytes, declared_len }
    }

    /// The name as a C string reader sees it: up to the first NUL
    pub fn content(&self) -> &'a [u8] {
        match self.bytes.iter().position(|&b| b == 0) {
            Some(nul) => &self.bytes[..nul],
            None => self.bytes,
        }
    }

    /// Declared and actual lengths agree
    #[inline]
    pub fn is_intact(&self) -> bool {
        self.content().len() == self.declared_len
    }
}

/// Identity accessors of a decoded peer certificate
pub trait PeerCertificate {
    /// DNS entries of the subjectAltName extension.
    ///
    /// `Ok(None)` when the certificate has no such extension, `Ok(Some(vec![]))`
    /// when it has one without DNS names.
    fn san_dns_entries(&self) -> Result<Option<Vec<NameEntry<'_>>>, CertificateError>;

    /// First Common Name attribute of the subject, if any
    fn common_name(&self) -> Result<Option<NameEntry<'_>>, CertificateError>;
}

impl<T: PeerCertificate + ?Sized> PeerCertificate for &T {
    fn san_dns_entries(&self) -> Result<Option<Vec<NameEntry<'_>>>, CertificateError> {
        (**self).san_dns_entries()
    }

    fn common_name(&self) -> Result<Option<NameEntry<'_>>, CertificateError> {
        (**self).common_name()
    }
}

/// Verify `hostname` against `certificate`.
///
/// Missing input yields [`Verdict::Error`]. Never returns
/// [`Verdict::NoSanPresent`].
pub fn validate_hostname<C>(hostname: Option<&str>, certificate: Option<&C>) -> Verdict
where
    C: PeerCertificate + ?Sized,
{
    match (hostname, certificate) {
        (Some(hostname), Some(certificate)) => match_hostname(hostname, certificate),
        _ => {
            debug!("hostname verification without hostname or certificate");
            Verdict::Error
        }
    }
}

/// Verify `hostname` against `certificate`: SAN first, CN only without SAN
pub fn match_hostname<C>(hostname: &str, certificate: &C) -> Verdict
where
    C: PeerCertificate + ?Sized,
{
    let verdict = match certificate.san_dns_entries() {
        Ok(Some(entries)) => match_subject_alt_names(hostname.as_bytes(), &entries),
        Ok(None) => Verdict::NoSanPresent,
        Err(error) => {
            warn!(%error, "unreadable subjectAltName");
            return Verdict::Error;
        }
    };

    let verdict = if verdict == Verdict::NoSanPresent {
        match certificate.common_name() {
            Ok(Some(entry)) => match_common_name(hostname.as_bytes(), entry),
            Ok(None) => {
                debug!(hostname, "certificate has neither SAN nor CN");
                Verdict::Error
            }
            Err(error) => {
                warn!(%error, "unreadable subject common name");
                Verdict::Error
            }
        }
    } else {
        verdict
    };

    debug!(hostname, verdict = verdict.as_str(), "hostname verification");
    verdict
}

/// Walk SAN DNS entries in order; the first match or malformed entry decides
pub fn match_subject_alt_names(hostname: &[u8], entries: &[NameEntry<'_>]) -> Verdict {
    for entry in entries {
        if !entry.is_intact() {
            warn!(
                declared = entry.declared_len,
                actual = entry.content().len(),
                "SAN entry length mismatch"
            );
            return Verdict::MalformedCertificate;
        }
        let name = entry.content();

        if hostname.eq_ignore_ascii_case(name) {
            return Verdict::MatchFound;
        }
        if name.len() <= 2 {
            continue;
        }
        if let Some(rest) = name.strip_prefix(b"*.") {
            if wildcard_matches(hostname, rest) {
                return Verdict::MatchFound;
            }
        }
    }
    Verdict::MatchNotFound
}

/// Exact, case-insensitive Common Name comparison; no wildcards
pub fn match_common_name(hostname: &[u8], entry: NameEntry<'_>) -> Verdict {
    if !entry.is_intact() {
        warn!(
            declared = entry.declared_len,
            actual = entry.content().len(),
            "CN length mismatch"
        );
        return Verdict::MalformedCertificate;
    }
    if hostname.eq_ignore_ascii_case(entry.content()) {
        Verdict::MatchFound
    } else {
        Verdict::MatchNotFound
    }
}

/// `*.rest` against `hostname`: the `*` stands for exactly one non-empty
/// left-most label. A dotless hostname never matches a wildcard.
fn wildcard_matches(hostname: &[u8], rest: &[u8]) -> bool {
    match hostname.iter().position(|&b| b == b'.') {
        None => false,
        Some(dot) => {
            let (first_label, remainder) = (&hostname[..dot], &hostname[dot + 1..]);
            !first_label.is_empty() && remainder.eq_ignore_ascii_case(rest)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory certificate
    #[derive(Default)]
    struct FakeCert {
        san: Option<Vec<(&'static [u8], usize)>>,
        cn: Option<(&'static [u8], usize)>,
        unreadable: bool,
    }

    impl FakeCert {
        fn with_san(names: &[&'static str]) -> Self {
            Self {
                san: Some(names.iter().map(|n| (n.as_bytes(), n.len())).collect()),
                ..Self::default()
            }
        }

        fn cn(mut self, name: &'static str) -> Self {
            self.cn = Some((name.as_bytes(), name.len()));
            self
        }
    }

    impl PeerCertificate for FakeCert {
        fn san_dns_entries(&self) -> Result<Option<Vec<NameEntry<'_>>>, CertificateError> {
            if self.unreadable {
                return Err(CertificateError::Extension("duplicate extension".to_string()));
            }
            Ok(self.san.as_ref().map(|names| {
                names
                    .iter()
                    .map(|&(bytes, len)| NameEntry::with_declared_len(bytes, len))
                    .collect()
            }))
        }

        fn common_name(&self) -> Result<Option<NameEntry<'_>>, CertificateError> {
            Ok(self
                .cn
                .map(|(bytes, len)| NameEntry::with_declared_len(bytes, len)))
        }
    }

    #[test]
    fn test_exact_san_match_is_case_insensitive() {
        let cert = FakeCert::with_san(&["Example.COM"]);
        assert_eq!(match_hostname("example.com", &cert), Verdict::MatchFound);
    }

    #[test]
    fn test_wildcard_single_label() {
        let cert = FakeCert::with_san(&["*.example.com"]);
        assert_eq!(match_hostname("foo.example.com", &cert), Verdict::MatchFound);
        assert_eq!(match_hostname("FOO.Example.com", &cert), Verdict::MatchFound);
        assert_eq!(match_hostname("a.b.example.com", &cert), Verdict::MatchNotFound);
        assert_eq!(match_hostname("example.com", &cert), Verdict::MatchNotFound);
    }

    #[test]
    fn test_apex_matches_only_exact_entry() {
        let cert = FakeCert::with_san(&["*.example.com", "example.com"]);
        assert_eq!(match_hostname("example.com", &cert), Verdict::MatchFound);
    }

    #[test]
    fn test_wildcard_empty_first_label() {
        let cert = FakeCert::with_san(&["*.example.com"]);
        assert_eq!(match_hostname(".example.com", &cert), Verdict::MatchNotFound);
    }

    #[test]
    fn test_wildcard_dotless_hostname() {
        let cert = FakeCert::with_san(&["*.localhost"]);
        assert_eq!(match_hostname("localhost", &cert), Verdict::MatchNotFound);
        assert_eq!(match_hostname("otherhost", &cert), Verdict::MatchNotFound);

        let cert = FakeCert::with_san(&["*.localhost", "localhost"]);
        assert_eq!(match_hostname("localhost", &cert), Verdict::MatchFound);
    }

    #[test]
    fn test_short_entries_skip_wildcard() {
        let cert = FakeCert::with_san(&["*.", "*"]);
        assert_eq!(match_hostname("a.b", &cert), Verdict::MatchNotFound);
    }

    #[test]
    fn test_san_supersedes_cn() {
        let cert = FakeCert::with_san(&["bad.example"]).cn("good.example");
        assert_eq!(match_hostname("good.example", &cert), Verdict::MatchNotFound);
    }

    #[test]
    fn test_empty_san_still_supersedes_cn() {
        let cert = FakeCert::with_san(&[]).cn("good.example");
        assert_eq!(match_hostname("good.example", &cert), Verdict::MatchNotFound);
    }

    #[test]
    fn test_cn_fallback() {
        let cert = FakeCert::default().cn("Legacy.Example");
        assert_eq!(match_hostname("legacy.example", &cert), Verdict::MatchFound);
        assert_eq!(match_hostname("other.example", &cert), Verdict::MatchNotFound);
    }

    #[test]
    fn test_cn_has_no_wildcards() {
        let cert = FakeCert::default().cn("*.example.com");
        assert_eq!(match_hostname("foo.example.com", &cert), Verdict::MatchNotFound);
    }

    #[test]
    fn test_missing_cn_is_error() {
        let cert = FakeCert::default();
        assert_eq!(match_hostname("example.com", &cert), Verdict::Error);
    }

    #[test]
    fn test_malformed_san_entry() {
        let cert = FakeCert {
            san: Some(vec![(&b"evil.com\0.example.com"[..], 21)]),
            ..FakeCert::default()
        };
        assert_eq!(match_hostname("evil.com", &cert), Verdict::MalformedCertificate);
    }

    #[test]
    fn test_malformed_entry_aborts_scan() {
        let cert = FakeCert {
            san: Some(vec![(&b"short"[..], 9), (&b"example.com"[..], 11)]),
            ..FakeCert::default()
        };
        assert_eq!(match_hostname("example.com", &cert), Verdict::MalformedCertificate);
    }

    #[test]
    fn test_match_before_malformed_entry_wins() {
        let cert = FakeCert {
            san: Some(vec![(&b"example.com"[..], 11), (&b"bad\0"[..], 4)]),
            ..FakeCert::default()
        };
        assert_eq!(match_hostname("example.com", &cert), Verdict::MatchFound);
    }

    #[test]
    fn test_malformed_cn() {
        let cert = FakeCert {
            cn: Some((&b"example.com"[..], 20)),
            ..FakeCert::default()
        };
        assert_eq!(match_hostname("example.com", &cert), Verdict::MalformedCertificate);
    }

    #[test]
    fn test_missing_input() {
        let cert = FakeCert::with_san(&["example.com"]);
        assert_eq!(validate_hostname(None, Some(&cert)), Verdict::Error);
        assert_eq!(validate_hostname::<FakeCert>(Some("example.com"), None), Verdict::Error);
        assert_eq!(validate_hostname(Some("example.com"), Some(&cert)), Verdict::MatchFound);
    }

    #[test]
    fn test_unreadable_certificate() {
        let cert = FakeCert {
            unreadable: true,
            ..FakeCert::default()
        };
        assert_eq!(match_hostname("example.com", &cert), Verdict::Error);
    }

    #[test]
    fn test_never_returns_no_san_present() {
        for cert in [FakeCert::default(), FakeCert::default().cn("x"), FakeCert::with_san(&[])] {
            assert_ne!(match_hostname("x", &cert), Verdict::NoSanPresent);
        }
    }

    #[test]
    fn test_verdict_codes() {
        assert_eq!(Verdict::MatchFound.code(), 0);
        assert_eq!(Verdict::MatchNotFound.code(), 1);
        assert_eq!(Verdict::NoSanPresent.code(), 2);
        assert_eq!(Verdict::MalformedCertificate.code(), 3);
        assert_eq!(Verdict::Error.code(), 4);
        assert_eq!(Verdict::from_u8(3), Some(Verdict::MalformedCertificate));
        assert_eq!(Verdict::from_u8(5), None);
    }

    #[test]
    fn test_name_entry_content() {
        let entry = NameEntry::new(b"a\0b");
        assert_eq!(entry.content(), b"a");
        assert!(!entry.is_intact());
        assert!(NameEntry::new(b"plain").is_intact());
    }
}
