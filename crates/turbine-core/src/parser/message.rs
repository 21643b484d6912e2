//! Parsed HTTP message (zero-copy view over the input buffer)

use bytes::{Bytes, BytesMut};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode, Version};
use smallvec::SmallVec;

use super::accumulator::{HeaderPair, HeaderVec};
use super::tokenizer::HeadInfo;
use super::MessageKind;
use crate::error::TokenizeError;
use crate::span::ByteSpan;
use crate::url::{ParsedUrl, UrlComponent};

/// Result of [`crate::parse`].
///
/// Borrows the buffer it was parsed from; every accessor returns slices of
/// that buffer, so the message cannot outlive it. Only the header array is
/// owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage<'buf> {
    pub(super) buf: &'buf [u8],
    pub(super) kind: MessageKind,
    pub(super) method: Option<ByteSpan>,
    pub(super) url: Option<ByteSpan>,
    pub(super) parsed_url: ParsedUrl,
    pub(super) status: Option<(u16, ByteSpan)>,
    pub(super) version: Option<(u8, u8)>,
    pub(super) headers: HeaderVec,
    pub(super) committed: usize,
    pub(super) head: HeadInfo,
    pub(super) body: SmallVec<[ByteSpan; 2]>,
    pub(super) headers_complete: bool,
    pub(super) message_complete: bool,
    pub(super) bytes_consumed: usize,
    pub(super) parser_error: Option<TokenizeError>,
}

impl<'buf> ParsedMessage<'buf> {
    #[inline]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// The buffer this message was parsed from
    #[inline]
    pub fn buffer(&self) -> &'buf [u8] {
        self.buf
    }

    // ------------------------------------------------------------------
    // Start line
    // ------------------------------------------------------------------

    /// Raw method token (requests only)
    pub fn method_bytes(&self) -> Option<&'buf [u8]> {
        self.method.map(|s| s.slice(self.buf))
    }

    /// Method (requests only)
    pub fn method(&self) -> Option<Method> {
        self.method_bytes().and_then(|m| Method::from_bytes(m).ok())
    }

    /// Raw request target (requests only)
    pub fn url(&self) -> Option<&'buf [u8]> {
        self.url.map(|s| s.slice(self.buf))
    }

    #[inline]
    pub fn url_span(&self) -> Option<ByteSpan> {
        self.url
    }

    /// Component table of the request target; spans are relative to [`Self::url`]
    #[inline]
    pub fn parsed_url(&self) -> &ParsedUrl {
        &self.parsed_url
    }

    /// One component of the request target, borrowed from the buffer
    pub fn url_field(&self, which: UrlComponent) -> Option<&'buf [u8]> {
        let url = self.url()?;
        self.parsed_url.span(which).map(|s| s.slice(url))
    }

    /// Status code (responses only)
    pub fn status(&self) -> Option<StatusCode> {
        self.status
            .and_then(|(code, _)| StatusCode::from_u16(code).ok())
    }

    /// Numeric status code as received (responses only)
    pub fn status_code(&self) -> Option<u16> {
        self.status.map(|(code, _)| code)
    }

    /// Reason phrase (responses only)
    pub fn reason(&self) -> Option<&'buf [u8]> {
        self.status.map(|(_, reason)| reason.slice(self.buf))
    }

    /// Raw `(major, minor)` version
    #[inline]
    pub fn version_pair(&self) -> Option<(u8, u8)> {
        self.version
    }

    pub fn version(&self) -> Option<Version> {
        self.version.and_then(|pair| match pair {
            (0, 9) => Some(Version::HTTP_09),
            (1, 0) => Some(Version::HTTP_10),
            (1, 1) => Some(Version::HTTP_11),
            (2, 0) => Some(Version::HTTP_2),
            (3, 0) => Some(Version::HTTP_3),
            _ => None,
        })
    }

    // ------------------------------------------------------------------
    // Headers
    // ------------------------------------------------------------------

    /// Pairs that received a value, in arrival order
    #[inline]
    pub fn header_pairs(&self) -> &[HeaderPair] {
        &self.headers[..self.committed]
    }

    /// Number of complete header pairs
    #[inline]
    pub fn header_count(&self) -> usize {
        self.committed
    }

    /// `(name, value)` in arrival order; repeated names are not merged
    pub fn headers(&self) -> impl Iterator<Item = (&'buf [u8], &'buf [u8])> + '_ {
        let buf = self.buf;
        self.header_pairs().iter().map(move |pair| {
            (
                pair.key.slice(buf),
                pair.value.map_or(&[][..], |v| v.slice(buf)),
            )
        })
    }

    /// First value for `name` (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&'buf [u8]> {
        self.headers()
            .find(|(key, _)| key.eq_ignore_ascii_case(name.as_bytes()))
            .map(|(_, value)| value)
    }

    /// Every value for `name` (case-insensitive), in order
    pub fn header_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'buf [u8]> + 'a {
        self.headers()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name.as_bytes()))
            .map(|(_, value)| value)
    }

    /// A header name whose value never arrived before parsing stopped
    pub fn pending_field(&self) -> Option<&'buf [u8]> {
        self.headers
            .get(self.committed)
            .filter(|pair| pair.value.is_none())
            .map(|pair| pair.key.slice(self.buf))
    }

    /// Owned copy of the headers; repeated names become multiple entries
    pub fn header_map(&self) -> Result<HeaderMap, http::Error> {
        let mut map = HeaderMap::with_capacity(self.committed);
        for (name, value) in self.headers() {
            map.append(HeaderName::from_bytes(name)?, HeaderValue::from_bytes(value)?);
        }
        Ok(map)
    }

    // ------------------------------------------------------------------
    // Framing and body
    // ------------------------------------------------------------------

    #[inline]
    pub fn headers_complete(&self) -> bool {
        self.headers_complete
    }

    #[inline]
    pub fn message_complete(&self) -> bool {
        self.message_complete
    }

    /// Bytes of the buffer the tokenizer consumed
    #[inline]
    pub fn bytes_consumed(&self) -> usize {
        self.bytes_consumed
    }

    /// Syntax error that stopped the tokenizer, if any
    #[inline]
    pub fn parser_error(&self) -> Option<TokenizeError> {
        self.parser_error
    }

    #[inline]
    pub fn content_length(&self) -> Option<u64> {
        self.head.content_length
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        self.head.chunked
    }

    /// The connection switches protocol after this head (Upgrade, CONNECT, 101)
    #[inline]
    pub fn upgrade(&self) -> bool {
        self.head.upgrade
    }

    #[inline]
    pub fn should_keep_alive(&self) -> bool {
        self.headers_complete && self.head.keep_alive
    }

    /// Body spans as delivered (one per chunk for chunked bodies)
    #[inline]
    pub fn body_spans(&self) -> &[ByteSpan] {
        &self.body
    }

    pub fn body_chunks(&self) -> impl Iterator<Item = &'buf [u8]> + '_ {
        let buf = self.buf;
        self.body.iter().map(move |span| span.slice(buf))
    }

    /// Owned, de-chunked copy of the body received so far
    pub fn body(&self) -> Bytes {
        match self.body.as_slice() {
            [] => Bytes::new(),
            [single] => Bytes::copy_from_slice(single.slice(self.buf)),
            spans => {
                let total = spans.iter().map(|s| s.len).sum();
                let mut out = BytesMut::with_capacity(total);
                for chunk in self.body_chunks() {
                    out.extend_from_slice(chunk);
                }
                out.freeze()
            }
        }
    }
}
