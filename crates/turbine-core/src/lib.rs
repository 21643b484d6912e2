//! turbine-core: zero-copy HTTP/1.x parsing and TLS peer verification
//!
//! Shared between the WASM and Node.js bindings. Everything here is a pure
//! computation over caller-owned buffers.
//!
//! ## Features
//! - `x509` - hostname verification of DER certificates (x509-parser)
//! - `tls` - rustls integration and PEM loading, implies `x509`

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod endian;
pub mod error;
pub mod parser;
pub mod span;
pub mod url;
pub mod verify;
pub mod websocket;

#[cfg(feature = "x509")]
pub mod x509;

#[cfg(feature = "tls")]
pub mod tls;

// Re-exports
pub use error::{
    Callback, CertificateError, Error, ParserError, Result, TokenizeError, UrlError,
};
pub use parser::{
    parse, Accumulator, HeadInfo, HeaderPair, HeaderState, MessageKind, ParsedMessage, Parser,
    ParserConfig, Token, Tokenizer,
};
pub use span::ByteSpan;
pub use url::{parse_url, ParsedUrl, UrlComponent};
pub use verify::{match_hostname, validate_hostname, NameEntry, PeerCertificate, Verdict};

pub use endian::{from_network64, swap64, to_network64};
pub use websocket::{mask, mask_from, mask_in_place};

#[cfg(feature = "x509")]
pub use x509::{validate_der, X509Peer};

#[cfg(feature = "tls")]
pub use tls::{load_certs, validate_connection};
