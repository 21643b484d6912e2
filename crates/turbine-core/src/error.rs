//! Error types for turbine-core
//!
//! Fatal parse failures, tokenizer syntax errors and URL sub-parser errors
//! are kept apart: only [`ParserError`] aborts a parse, the other two are
//! recorded on the result.

use thiserror::Error;

/// Result type alias for turbine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error
#[derive(Debug, Error)]
pub enum Error {
    /// Fatal parse error
    #[error(transparent)]
    Parser(#[from] ParserError),

    /// Certificate could not be decoded
    #[error(transparent)]
    Certificate(#[from] CertificateError),

    /// TLS error
    #[cfg(feature = "tls")]
    #[error("TLS error: {0}")]
    Tls(String),
}

/// Message handler that refused a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Url,
    HeaderField,
    HeaderValue,
    HeadersComplete,
    MessageComplete,
}

impl Callback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Callback::Url => "on-url",
            Callback::HeaderField => "on-header-field",
            Callback::HeaderValue => "on-header-value",
            Callback::HeadersComplete => "on-headers-complete",
            Callback::MessageComplete => "on-message-complete",
        }
    }
}

/// Fatal accumulator errors. No partial message is ever returned with these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParserError {
    /// Growing the header array failed
    #[error("allocation failed while growing the header array")]
    AllocationFailed,

    /// A handler refused its token and stopped the tokenizer
    #[error("{} handler aborted the parse", .handler.as_str())]
    CallbackAborted { handler: Callback },

    /// Message kind selector outside 0 (request) / 1 (response)
    #[error("invalid message kind: {0}")]
    InvalidMessageKind(u8),
}

impl ParserError {
    /// Stable numeric code for host bindings
    pub fn code(&self) -> u8 {
        match self {
            ParserError::AllocationFailed => 1,
            ParserError::CallbackAborted { .. } => 2,
            ParserError::InvalidMessageKind(_) => 3,
        }
    }
}

/// HTTP syntax errors reported by the tokenizer.
///
/// These stop the tokenizer but not the parse: the message built so far is
/// returned with the error attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("invalid method")]
    InvalidMethod,

    #[error("invalid request target")]
    InvalidUrl,

    #[error("invalid HTTP version")]
    InvalidVersion,

    #[error("invalid status code")]
    InvalidStatus,

    #[error("invalid character in header")]
    InvalidHeaderToken,

    #[error("invalid Content-Length")]
    InvalidContentLength,

    #[error("invalid chunk size")]
    InvalidChunkSize,

    #[error("Content-Length together with chunked Transfer-Encoding")]
    UnexpectedContentLength,

    #[error("message head exceeds the configured limit")]
    HeaderOverflow,

    #[error("expected LF after CR")]
    LfExpected,
}

impl TokenizeError {
    /// Stable numeric code for host bindings
    pub fn code(&self) -> u8 {
        match self {
            TokenizeError::InvalidMethod => 1,
            TokenizeError::InvalidUrl => 2,
            TokenizeError::InvalidVersion => 3,
            TokenizeError::InvalidStatus => 4,
            TokenizeError::InvalidHeaderToken => 5,
            TokenizeError::InvalidContentLength => 6,
            TokenizeError::InvalidChunkSize => 7,
            TokenizeError::UnexpectedContentLength => 8,
            TokenizeError::HeaderOverflow => 9,
            TokenizeError::LfExpected => 10,
        }
    }
}

/// URL sub-parser errors. Non-fatal: stored on the parsed URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid character at offset {offset}")]
    InvalidCharacter { offset: usize },

    #[error("invalid schema")]
    InvalidSchema,

    #[error("missing host")]
    MissingHost,

    #[error("invalid port")]
    InvalidPort,

    #[error("invalid authority")]
    InvalidAuthority,
}

impl UrlError {
    /// Stable numeric code for host bindings
    pub fn code(&self) -> u8 {
        match self {
            UrlError::Empty => 1,
            UrlError::InvalidCharacter { .. } => 2,
            UrlError::InvalidSchema => 3,
            UrlError::MissingHost => 4,
            UrlError::InvalidPort => 5,
            UrlError::InvalidAuthority => 6,
        }
    }
}

/// Certificate could not be read
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CertificateError {
    #[error("certificate is not valid DER: {0}")]
    Decode(String),

    #[error("unreadable certificate extension: {0}")]
    Extension(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_error_codes() {
        assert_eq!(ParserError::AllocationFailed.code(), 1);
        assert_eq!(
            ParserError::CallbackAborted { handler: Callback::HeaderField }.code(),
            2
        );
    }

    #[test]
    fn test_callback_aborted_message() {
        let err = ParserError::CallbackAborted { handler: Callback::HeaderField };
        assert_eq!(err.to_string(), "on-header-field handler aborted the parse");
    }

    #[test]
    fn test_parser_error_converts() {
        let err: Error = ParserError::AllocationFailed.into();
        assert!(matches!(err, Error::Parser(ParserError::AllocationFailed)));
    }
}
