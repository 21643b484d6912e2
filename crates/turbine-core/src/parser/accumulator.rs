//! Token stream → structured message
//!
//! The accumulator pairs header field and value tokens. A lexer may deliver
//! one logical name or value in several pieces, so repeated tokens of the
//! same kind extend the previous span instead of opening a new pair.

use smallvec::SmallVec;
use tracing::{trace, warn};

use super::message::ParsedMessage;
use super::tokenizer::{HeadInfo, Token};
use super::{MessageKind, ParserConfig};
use crate::error::{Callback, ParserError, TokenizeError};
use crate::span::ByteSpan;
use crate::url::ParsedUrl;

/// Header slots kept inline before the array spills to the heap
pub(crate) const INLINE_HEADERS: usize = 8;

pub(crate) type HeaderVec = SmallVec<[HeaderPair; INLINE_HEADERS]>;

/// Which header token was seen last
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderState {
    /// No header token yet
    #[default]
    Nothing,
    /// A name was opened and waits for its value
    Field,
    /// The last pair received its value
    Value,
}

/// One header occurrence, as spans into the input buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPair {
    pub key: ByteSpan,
    /// Unset until a value token follows the key
    pub value: Option<ByteSpan>,
}

/// Header/URL accumulator state machine
#[derive(Debug)]
pub struct Accumulator<'buf> {
    buf: &'buf [u8],
    kind: MessageKind,
    header_batch: usize,
    max_headers: Option<usize>,
    state: HeaderState,
    headers: HeaderVec,
    committed: usize,
    method: Option<ByteSpan>,
    url: Option<ByteSpan>,
    parsed_url: ParsedUrl,
    status: Option<(u16, ByteSpan)>,
    version: Option<(u8, u8)>,
    head: HeadInfo,
    body: SmallVec<[ByteSpan; 2]>,
    headers_complete: bool,
    message_complete: bool,
}

impl<'buf> Accumulator<'buf> {
    pub fn new(buf: &'buf [u8], kind: MessageKind) -> Self {
        Self::with_config(buf, kind, &ParserConfig::default())
    }

    pub fn with_config(buf: &'buf [u8], kind: MessageKind, config: &ParserConfig) -> Self {
        Self {
            buf,
            kind,
            header_batch: config.header_batch.max(1),
            max_headers: config.max_headers,
            state: HeaderState::Nothing,
            headers: SmallVec::new(),
            committed: 0,
            method: None,
            url: None,
            parsed_url: ParsedUrl::default(),
            status: None,
            version: None,
            head: HeadInfo::default(),
            body: SmallVec::new(),
            headers_complete: false,
            message_complete: false,
        }
    }

    #[inline]
    pub fn state(&self) -> HeaderState {
        self.state
    }

    /// Number of pairs that received a value
    #[inline]
    pub fn committed_headers(&self) -> usize {
        self.committed
    }

    /// Apply one token
    pub fn feed(&mut self, token: Token) -> Result<(), ParserError> {
        match token {
            Token::MessageBegin => {}
            Token::Method(span) => {
                self.method = Some(match self.method {
                    Some(method) => method.extend_to(span),
                    None => span,
                });
            }
            Token::Url(span) => self.on_url(span),
            Token::Status { code, reason } => self.status = Some((code, reason)),
            Token::Version { major, minor } => self.version = Some((major, minor)),
            Token::HeaderField(span) => self.on_header_field(span)?,
            Token::HeaderValue(span) => self.on_header_value(span),
            Token::HeadersComplete(info) => {
                self.head = info;
                self.headers_complete = true;
            }
            Token::Body(span) => self.body.push(span),
            Token::MessageComplete => self.message_complete = true,
        }
        Ok(())
    }

    fn on_url(&mut self, span: ByteSpan) {
        let url = match self.url {
            Some(previous) => previous.extend_to(span),
            None => span,
        };
        self.url = Some(url);

        let is_connect = self
            .method
            .is_some_and(|m| m.slice(self.buf) == b"CONNECT");
        // a URL the sub-parser rejects is recorded, header parsing goes on
        self.parsed_url = ParsedUrl::parse(url.slice(self.buf), is_connect);
        if let Some(error) = self.parsed_url.error() {
            trace!(?error, "request target did not parse");
        }
    }

    fn on_header_field(&mut self, span: ByteSpan) -> Result<(), ParserError> {
        match self.state {
            HeaderState::Nothing | HeaderState::Value => {
                if self.max_headers.is_some_and(|max| self.headers.len() >= max) {
                    return Err(ParserError::CallbackAborted {
                        handler: Callback::HeaderField,
                    });
                }
                if self.headers.len() == self.headers.capacity() {
                    self.headers
                        .try_reserve_exact(self.header_batch)
                        .map_err(|_| {
                            warn!(
                                headers = self.headers.len(),
                                batch = self.header_batch,
                                "header array growth failed"
                            );
                            ParserError::AllocationFailed
                        })?;
                }
                self.headers.push(HeaderPair { key: span, value: None });
            }
            HeaderState::Field => {
                if let Some(pair) = self.headers.last_mut() {
                    pair.key = pair.key.extend_to(span);
                }
            }
        }
        self.state = HeaderState::Field;
        Ok(())
    }

    fn on_header_value(&mut self, span: ByteSpan) {
        match self.state {
            HeaderState::Field => {
                if let Some(pair) = self.headers.last_mut() {
                    pair.value = Some(span);
                    self.committed += 1;
                }
            }
            HeaderState::Value => {
                if let Some(value) = self.headers.last_mut().and_then(|p| p.value.as_mut()) {
                    *value = value.extend_to(span);
                }
            }
            HeaderState::Nothing => {
                trace!(offset = span.offset, "header value without a field dropped");
            }
        }
        self.state = HeaderState::Value;
    }

    /// Close the parse. `bytes_consumed` and `parser_error` come from the
    /// token source.
    pub fn finish(
        self,
        bytes_consumed: usize,
        parser_error: Option<TokenizeError>,
    ) -> ParsedMessage<'buf> {
        ParsedMessage {
            buf: self.buf,
            kind: self.kind,
            method: self.method,
            url: self.url,
            parsed_url: self.parsed_url,
            status: self.status,
            version: self.version,
            headers: self.headers,
            committed: self.committed,
            head: self.head,
            body: self.body,
            headers_complete: self.headers_complete,
            message_complete: self.message_complete,
            bytes_consumed,
            parser_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(offset: usize, len: usize) -> Token {
        Token::HeaderField(ByteSpan::new(offset, len))
    }

    fn value(offset: usize, len: usize) -> Token {
        Token::HeaderValue(ByteSpan::new(offset, len))
    }

    #[test]
    fn test_state_transitions() {
        let buf = b"Host: a";
        let mut acc = Accumulator::new(buf, MessageKind::Request);
        assert_eq!(acc.state(), HeaderState::Nothing);

        acc.feed(field(0, 4)).unwrap();
        assert_eq!(acc.state(), HeaderState::Field);
        assert_eq!(acc.committed_headers(), 0);

        acc.feed(value(6, 1)).unwrap();
        assert_eq!(acc.state(), HeaderState::Value);
        assert_eq!(acc.committed_headers(), 1);
    }

    #[test]
    fn test_split_field_extends_key() {
        // "Content-Type: text" delivered as "Cont" + "ent-Type"
        let buf = b"Content-Type: text";
        let mut acc = Accumulator::new(buf, MessageKind::Request);
        acc.feed(field(0, 4)).unwrap();
        acc.feed(field(4, 8)).unwrap();
        acc.feed(value(14, 4)).unwrap();

        let message = acc.finish(buf.len(), None);
        let headers: Vec<_> = message.headers().collect();
        assert_eq!(headers, vec![(&b"Content-Type"[..], &b"text"[..])]);
    }

    #[test]
    fn test_split_value_extends_value() {
        let buf = b"Accept: text/html";
        let mut acc = Accumulator::new(buf, MessageKind::Request);
        acc.feed(field(0, 6)).unwrap();
        acc.feed(value(8, 5)).unwrap();
        acc.feed(value(13, 4)).unwrap();

        assert_eq!(acc.committed_headers(), 1);
        let message = acc.finish(buf.len(), None);
        assert_eq!(message.header("accept"), Some(&b"text/html"[..]));
    }

    #[test]
    fn test_value_without_field_is_dropped() {
        let buf = b"orphan";
        let mut acc = Accumulator::new(buf, MessageKind::Request);
        acc.feed(value(0, 6)).unwrap();
        assert_eq!(acc.state(), HeaderState::Value);

        let message = acc.finish(buf.len(), None);
        assert_eq!(message.header_count(), 0);
        assert!(message.pending_field().is_none());
    }

    #[test]
    fn test_field_without_value_stays_pending() {
        let buf = b"A: 1X-Dangling";
        let mut acc = Accumulator::new(buf, MessageKind::Request);
        acc.feed(field(0, 1)).unwrap();
        acc.feed(value(3, 1)).unwrap();
        acc.feed(field(4, 10)).unwrap();

        let message = acc.finish(buf.len(), None);
        assert_eq!(message.header_count(), 1);
        assert_eq!(message.pending_field(), Some(&b"X-Dangling"[..]));
    }

    #[test]
    fn test_grows_in_batches() {
        let buf = b"k: v";
        let config = ParserConfig::new().header_batch(10);
        let mut acc = Accumulator::with_config(buf, MessageKind::Request, &config);
        for _ in 0..=INLINE_HEADERS {
            acc.feed(field(0, 1)).unwrap();
            acc.feed(value(3, 1)).unwrap();
        }
        assert_eq!(acc.headers.len(), INLINE_HEADERS + 1);
        assert_eq!(acc.headers.capacity(), INLINE_HEADERS + 10);
    }

    #[test]
    fn test_allocation_failure_is_fatal() {
        let buf = b"k: v";
        let config = ParserConfig::new().header_batch(usize::MAX);
        let mut acc = Accumulator::with_config(buf, MessageKind::Request, &config);
        for _ in 0..INLINE_HEADERS {
            acc.feed(field(0, 1)).unwrap();
            acc.feed(value(3, 1)).unwrap();
        }
        assert_eq!(acc.feed(field(0, 1)), Err(ParserError::AllocationFailed));
    }

    #[test]
    fn test_max_headers_aborts() {
        let buf = b"k: v";
        let config = ParserConfig::new().max_headers(2);
        let mut acc = Accumulator::with_config(buf, MessageKind::Request, &config);
        for _ in 0..2 {
            acc.feed(field(0, 1)).unwrap();
            acc.feed(value(3, 1)).unwrap();
        }
        assert_eq!(
            acc.feed(field(0, 1)),
            Err(ParserError::CallbackAborted { handler: Callback::HeaderField })
        );
    }

    #[test]
    fn test_bad_url_is_recorded() {
        let buf = b"http://:1/";
        let mut acc = Accumulator::new(buf, MessageKind::Request);
        acc.feed(Token::Url(ByteSpan::new(0, buf.len()))).unwrap();
        acc.feed(field(0, 1)).unwrap();

        let message = acc.finish(buf.len(), None);
        assert_eq!(message.parsed_url().rc(), 1);
        assert_eq!(message.url(), Some(&buf[..]));
    }
}
