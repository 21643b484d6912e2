//! HTTP message parsing
//!
//! [`Tokenizer`] lexes the raw bytes, [`Accumulator`] folds the token stream
//! into a [`ParsedMessage`] whose spans borrow the input buffer.

mod accumulator;
mod message;
pub mod tokenizer;

pub use accumulator::{Accumulator, HeaderPair, HeaderState};
pub use message::ParsedMessage;
pub use tokenizer::{HeadInfo, Token, Tokenizer, DEFAULT_MAX_HEADER_BYTES};

use tracing::debug;

use crate::error::ParserError;

/// Default number of header slots added each time the header array fills up
pub const DEFAULT_HEADER_BATCH: usize = 10;

/// Wire mode. The discriminants are the stable host-facing selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Request = 0,
    Response = 1,
}

impl MessageKind {
    /// Convert from u8 code
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(MessageKind::Request),
            1 => Some(MessageKind::Response),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Request => "request",
            MessageKind::Response => "response",
        }
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = ParserError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        MessageKind::from_u8(code).ok_or(ParserError::InvalidMessageKind(code))
    }
}

/// Parser configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Header slots reserved per growth step
    pub header_batch: usize,
    /// Maximum number of header fields; `None` = unlimited
    pub max_headers: Option<usize>,
    /// Maximum size of the start line plus headers
    pub max_header_bytes: usize,
    /// Parsing the response to a HEAD request (never has a body)
    pub head_response: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            header_batch: DEFAULT_HEADER_BATCH,
            max_headers: None,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            head_response: false,
        }
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set header array growth step
    pub fn header_batch(mut self, batch: usize) -> Self {
        self.header_batch = batch;
        self
    }

    /// Cap the number of header fields
    pub fn max_headers(mut self, max: usize) -> Self {
        self.max_headers = Some(max);
        self
    }

    /// Cap the size of the message head
    pub fn max_header_bytes(mut self, max: usize) -> Self {
        self.max_header_bytes = max;
        self
    }

    /// Mark the message as the response to a HEAD request
    pub fn head_response(mut self, head: bool) -> Self {
        self.head_response = head;
        self
    }
}

/// Reusable parse entry point: a message kind plus configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parser {
    kind: MessageKind,
    config: ParserConfig,
}

impl Parser {
    pub fn new(kind: MessageKind) -> Self {
        Self::with_config(kind, ParserConfig::default())
    }

    pub fn with_config(kind: MessageKind, config: ParserConfig) -> Self {
        Self { kind, config }
    }

    #[inline]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    #[inline]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse one message from `buf`.
    ///
    /// Syntax errors from the tokenizer are recorded on the result together
    /// with the number of bytes consumed before the error. Only allocation
    /// failure and aborting handlers fail the call.
    pub fn parse<'buf>(&self, buf: &'buf [u8]) -> Result<ParsedMessage<'buf>, ParserError> {
        let mut tokenizer = Tokenizer::with_limit(buf, self.kind, self.config.max_header_bytes);
        tokenizer.set_head_response(self.config.head_response);
        let mut accumulator = Accumulator::with_config(buf, self.kind, &self.config);

        let mut parser_error = None;
        for token in tokenizer.by_ref() {
            match token {
                Ok(token) => accumulator.feed(token)?,
                Err(error) => {
                    parser_error = Some(error);
                    break;
                }
            }
        }

        let message = accumulator.finish(tokenizer.position(), parser_error);
        debug!(
            kind = self.kind.as_str(),
            headers = message.header_count(),
            consumed = message.bytes_consumed(),
            complete = message.message_complete(),
            "parsed HTTP message"
        );
        Ok(message)
    }
}

/// Parse one message from `buf` with the default configuration
pub fn parse(buf: &[u8], kind: MessageKind) -> Result<ParsedMessage<'_>, ParserError> {
    Parser::new(kind).parse(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kind_codes() {
        assert_eq!(MessageKind::from_u8(0), Some(MessageKind::Request));
        assert_eq!(MessageKind::from_u8(1), Some(MessageKind::Response));
        assert_eq!(MessageKind::from_u8(2), None);
        assert_eq!(
            MessageKind::try_from(7u8),
            Err(ParserError::InvalidMessageKind(7))
        );
        assert_eq!(MessageKind::Response as u8, 1);
    }

    #[test]
    fn test_config_builder() {
        let config = ParserConfig::new()
            .header_batch(4)
            .max_headers(32)
            .max_header_bytes(1024)
            .head_response(true);
        assert_eq!(config.header_batch, 4);
        assert_eq!(config.max_headers, Some(32));
        assert_eq!(config.max_header_bytes, 1024);
        assert!(config.head_response);
    }

    #[test]
    fn test_parse_request() {
        let buf = b"GET /hello?name=world HTTP/1.1\r\nHost: localhost\r\nAccept: */*\r\n\r\n";
        let message = parse(buf, MessageKind::Request).unwrap();

        assert!(message.headers_complete());
        assert!(message.message_complete());
        assert_eq!(message.bytes_consumed(), buf.len());
        assert_eq!(message.url(), Some(&b"/hello?name=world"[..]));
        assert_eq!(message.header_count(), 2);
        assert!(message.parser_error().is_none());
    }

    #[test]
    fn test_head_response_has_no_body() {
        let buf = b"HTTP/1.1 200 OK\r\nContent-Length: 1234\r\n\r\n";
        let parser = Parser::with_config(
            MessageKind::Response,
            ParserConfig::new().head_response(true),
        );
        let message = parser.parse(buf).unwrap();
        assert!(message.message_complete());
        assert_eq!(message.body_chunks().count(), 0);
    }
}
