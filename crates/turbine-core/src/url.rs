//! Request-target parser and URL field extraction
//!
//! Splits a request target into fixed component slots (schema, host, port,
//! path, query, fragment, userinfo). Slots are [`ByteSpan`]s relative to the
//! URL bytes, with a presence bitmask. Accepted forms:
//!
//! - origin-form: `/path?query#fragment`
//! - absolute-form: `http://user@host:8080/path?query#fragment`
//! - asterisk-form: `*`
//! - authority-form (CONNECT only): `host:port`

use bytes::Bytes;

use crate::error::UrlError;
use crate::span::ByteSpan;

/// URL component selector. The discriminants are the stable host-facing indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UrlComponent {
    Schema = 0,
    Host = 1,
    Port = 2,
    Path = 3,
    Query = 4,
    Fragment = 5,
    UserInfo = 6,
}

impl UrlComponent {
    pub const COUNT: usize = 7;

    pub const ALL: [UrlComponent; UrlComponent::COUNT] = [
        UrlComponent::Schema,
        UrlComponent::Host,
        UrlComponent::Port,
        UrlComponent::Path,
        UrlComponent::Query,
        UrlComponent::Fragment,
        UrlComponent::UserInfo,
    ];

    /// Convert from u8 code
    pub fn from_u8(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    #[inline]
    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UrlComponent::Schema => "schema",
            UrlComponent::Host => "host",
            UrlComponent::Port => "port",
            UrlComponent::Path => "path",
            UrlComponent::Query => "query",
            UrlComponent::Fragment => "fragment",
            UrlComponent::UserInfo => "userinfo",
        }
    }
}

/// Component table of a parsed URL.
///
/// Always produced, even when parsing fails: the failure is recorded and
/// every component is then reported absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParsedUrl {
    field_set: u16,
    port: u16,
    fields: [ByteSpan; UrlComponent::COUNT],
    error: Option<UrlError>,
}

impl ParsedUrl {
    /// Parse `url`. `is_connect` selects authority-form (`host:port`).
    pub fn parse(url: &[u8], is_connect: bool) -> Self {
        match parse_url(url, is_connect) {
            Ok(parsed) => parsed,
            Err(error) => ParsedUrl {
                error: Some(error),
                ..ParsedUrl::default()
            },
        }
    }

    /// Sub-parser return code: 0 on success, non-zero on failure
    #[inline]
    pub fn rc(&self) -> i32 {
        if self.error.is_some() {
            1
        } else {
            0
        }
    }

    #[inline]
    pub fn error(&self) -> Option<UrlError> {
        self.error
    }

    /// Presence bitmask, one bit per [`UrlComponent`] discriminant
    #[inline]
    pub fn field_set(&self) -> u16 {
        self.field_set
    }

    #[inline]
    pub fn is_set(&self, which: UrlComponent) -> bool {
        self.field_set & which.bit() != 0
    }

    /// Component span relative to the URL bytes
    pub fn span(&self, which: UrlComponent) -> Option<ByteSpan> {
        if self.is_set(which) {
            Some(self.fields[which as usize])
        } else {
            None
        }
    }

    /// Numeric port, when the URL carried one
    pub fn port(&self) -> Option<u16> {
        if self.is_set(UrlComponent::Port) {
            Some(self.port)
        } else {
            None
        }
    }

    fn set(&mut self, which: UrlComponent, span: ByteSpan) {
        self.fields[which as usize] = span;
        self.field_set |= which.bit();
    }
}

/// Check whether a component is present
#[inline]
pub fn is_set(parsed: &ParsedUrl, which: UrlComponent) -> bool {
    parsed.is_set(which)
}

/// Copy one component out of `url_source`.
///
/// Unlike the accumulator's borrowed spans the result owns its bytes, so it
/// can outlive the source buffer. Absent components yield `None`.
pub fn field(url_source: &[u8], parsed: &ParsedUrl, which: UrlComponent) -> Option<Bytes> {
    parsed
        .span(which)
        .map(|span| Bytes::copy_from_slice(span.slice(url_source)))
}

/// Parse `url`, failing on the first syntax error
pub fn parse_url(url: &[u8], is_connect: bool) -> Result<ParsedUrl, UrlError> {
    if url.is_empty() {
        return Err(UrlError::Empty);
    }
    if let Some(offset) = url.iter().position(|&b| b <= b' ' || b == 0x7F) {
        return Err(UrlError::InvalidCharacter { offset });
    }

    let mut parsed = ParsedUrl::default();

    if is_connect {
        parse_authority(url, 0, url.len(), false, &mut parsed)?;
        if !parsed.is_set(UrlComponent::Port) {
            return Err(UrlError::InvalidAuthority);
        }
        return Ok(parsed);
    }

    let mut pos = 0;

    if url == b"*" {
        parsed.set(UrlComponent::Path, ByteSpan::new(0, 1));
        return Ok(parsed);
    }

    if url[0] != b'/' {
        // absolute-form: schema "://" authority
        let colon = url
            .iter()
            .position(|&b| b == b':')
            .ok_or(UrlError::InvalidSchema)?;
        let schema = &url[..colon];
        let valid_schema = schema.first().is_some_and(u8::is_ascii_alphabetic)
            && schema
                .iter()
                .all(|&b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'));
        if !valid_schema || !url[colon..].starts_with(b"://") {
            return Err(UrlError::InvalidSchema);
        }
        parsed.set(UrlComponent::Schema, ByteSpan::new(0, colon));

        let authority_start = colon + 3;
        let authority_end = url[authority_start..]
            .iter()
            .position(|&b| matches!(b, b'/' | b'?' | b'#'))
            .map_or(url.len(), |i| authority_start + i);
        parse_authority(url, authority_start, authority_end, true, &mut parsed)?;
        pos = authority_end;
    }

    // path
    let path_end = url[pos..]
        .iter()
        .position(|&b| b == b'?' || b == b'#')
        .map_or(url.len(), |i| pos + i);
    if path_end > pos {
        parsed.set(UrlComponent::Path, ByteSpan::from_range(pos..path_end));
    }
    pos = path_end;

    // query
    if url.get(pos) == Some(&b'?') {
        let start = pos + 1;
        let end = url[start..]
            .iter()
            .position(|&b| b == b'#')
            .map_or(url.len(), |i| start + i);
        if end > start {
            parsed.set(UrlComponent::Query, ByteSpan::from_range(start..end));
        }
        pos = end;
    }

    // fragment
    if url.get(pos) == Some(&b'#') {
        let start = pos + 1;
        if url.len() > start {
            parsed.set(UrlComponent::Fragment, ByteSpan::from_range(start..url.len()));
        }
    }

    Ok(parsed)
}

/// `[userinfo "@"] host [":" port]` over `url[start..end]`
fn parse_authority(
    url: &[u8],
    start: usize,
    end: usize,
    allow_userinfo: bool,
    parsed: &mut ParsedUrl,
) -> Result<(), UrlError> {
    let authority = &url[start..end];

    let host_start = match authority.iter().rposition(|&b| b == b'@') {
        Some(at) if allow_userinfo => {
            if at > 0 {
                parsed.set(UrlComponent::UserInfo, ByteSpan::new(start, at));
            }
            start + at + 1
        }
        Some(_) => return Err(UrlError::InvalidAuthority),
        None => start,
    };

    let (host, port_start) = if url.get(host_start) == Some(&b'[') {
        // IPv6 literal; the host slot excludes the brackets
        let close = url[host_start..end]
            .iter()
            .position(|&b| b == b']')
            .map(|i| host_start + i)
            .ok_or(UrlError::InvalidAuthority)?;
        let rest = close + 1;
        let port_start = match url.get(rest) {
            _ if rest == end => None,
            Some(b':') => Some(rest + 1),
            _ => return Err(UrlError::InvalidAuthority),
        };
        (ByteSpan::from_range(host_start + 1..close), port_start)
    } else {
        match url[host_start..end].iter().rposition(|&b| b == b':') {
            Some(i) => (
                ByteSpan::from_range(host_start..host_start + i),
                Some(host_start + i + 1),
            ),
            None => (ByteSpan::from_range(host_start..end), None),
        }
    };

    if host.is_empty() {
        return Err(UrlError::MissingHost);
    }
    if host
        .slice(url)
        .iter()
        .any(|&b| matches!(b, b'[' | b']' | b'/' | b'?' | b'#' | b'@'))
    {
        return Err(UrlError::InvalidAuthority);
    }
    parsed.set(UrlComponent::Host, host);

    if let Some(port_start) = port_start {
        let digits = &url[port_start..end];
        if !digits.is_empty() {
            if !digits.iter().all(u8::is_ascii_digit) {
                return Err(UrlError::InvalidPort);
            }
            let mut value: u32 = 0;
            for &d in digits {
                value = value * 10 + u32::from(d - b'0');
                if value > u32::from(u16::MAX) {
                    return Err(UrlError::InvalidPort);
                }
            }
            parsed.port = value as u16;
            parsed.set(UrlComponent::Port, ByteSpan::from_range(port_start..end));
        }
    }

    Ok(())
}
