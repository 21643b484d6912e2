//! Native Node.js bindings for turbine-core via napi-rs
//!
//! Features:
//! - HTTP/1.x message parsing into plain JS objects
//! - URL component extraction
//! - Certificate hostname verification (DER buffers, PEM files with `tls`)
//! - WebSocket masking and 64-bit byte swapping

use bytes::Bytes;
use napi::bindgen_prelude::*;
use napi_derive::napi;
use turbine_core::url::{field as url_field_bytes, ParsedUrl};
use turbine_core::{
    MessageKind, ParsedMessage, Parser, ParserConfig, UrlComponent, Verdict, X509Peer,
};

// Use mimalloc for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// HTTP Parser
// ============================================================================

/// Parser options from JS
#[napi(object)]
#[derive(Clone, Default)]
pub struct ParseOptions {
    /// Header slots added per growth step
    pub header_batch: Option<u32>,
    /// Abort once more header fields arrive
    pub max_headers: Option<u32>,
    /// Cap on the start line plus headers
    pub max_header_bytes: Option<u32>,
    /// The message answers a HEAD request
    pub head_response: Option<bool>,
}

impl ParseOptions {
    fn to_config(&self) -> ParserConfig {
        let mut config = ParserConfig::new().head_response(self.head_response.unwrap_or(false));
        if let Some(batch) = self.header_batch {
            config = config.header_batch(batch as usize);
        }
        if let Some(max) = self.max_headers {
            config = config.max_headers(max as usize);
        }
        if let Some(max) = self.max_header_bytes {
            config = config.max_header_bytes(max as usize);
        }
        config
    }
}

/// One header occurrence
#[napi(object)]
#[derive(Clone)]
pub struct HttpHeader {
    pub name: String,
    pub value: String,
}

/// URL components; absent ones are undefined
#[napi(object)]
#[derive(Clone, Default)]
pub struct UrlParts {
    /// 0 on success, 1 when the URL did not parse
    pub rc: i32,
    /// Presence bitmask (schema=0 .. userinfo=6)
    pub field_set: u32,
    pub error: Option<String>,
    pub schema: Option<String>,
    pub host: Option<String>,
    pub port: Option<u32>,
    pub path: Option<String>,
    pub query: Option<String>,
    pub fragment: Option<String>,
    pub userinfo: Option<String>,
}

/// Parsed HTTP message
#[napi(object)]
pub struct HttpMessage {
    /// 0 = request, 1 = response
    pub kind: u32,
    pub method: Option<String>,
    pub url: Option<String>,
    pub url_parts: Option<UrlParts>,
    pub status: Option<u32>,
    pub reason: Option<String>,
    pub version_major: Option<u32>,
    pub version_minor: Option<u32>,
    /// Complete pairs in arrival order, duplicates kept
    pub headers: Vec<HttpHeader>,
    /// A header name whose value never arrived
    pub pending_field: Option<String>,
    pub headers_complete: bool,
    pub message_complete: bool,
    pub keep_alive: bool,
    pub upgrade: bool,
    pub chunked: bool,
    pub content_length: Option<i64>,
    pub bytes_consumed: u32,
    /// Tokenizer error code and message
    pub error_code: Option<u32>,
    pub error: Option<String>,
    pub body: Buffer,
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn url_parts(url: &[u8], parsed: &ParsedUrl) -> UrlParts {
    let component = |which| parsed.span(which).map(|span| lossy(span.slice(url)));
    UrlParts {
        rc: parsed.rc(),
        field_set: u32::from(parsed.field_set()),
        error: parsed.error().map(|e| e.to_string()),
        schema: component(UrlComponent::Schema),
        host: component(UrlComponent::Host),
        port: parsed.port().map(u32::from),
        path: component(UrlComponent::Path),
        query: component(UrlComponent::Query),
        fragment: component(UrlComponent::Fragment),
        userinfo: component(UrlComponent::UserInfo),
    }
}

fn to_js(message: &ParsedMessage<'_>) -> HttpMessage {
    let body: Bytes = message.body();
    HttpMessage {
        kind: message.kind() as u32,
        method: message.method_bytes().map(lossy),
        url: message.url().map(lossy),
        url_parts: message.url().map(|url| url_parts(url, message.parsed_url())),
        status: message.status_code().map(u32::from),
        reason: message.reason().map(lossy),
        version_major: message.version_pair().map(|(major, _)| u32::from(major)),
        version_minor: message.version_pair().map(|(_, minor)| u32::from(minor)),
        headers: message
            .headers()
            .map(|(name, value)| HttpHeader {
                name: lossy(name),
                value: lossy(value),
            })
            .collect(),
        pending_field: message.pending_field().map(lossy),
        headers_complete: message.headers_complete(),
        message_complete: message.message_complete(),
        keep_alive: message.should_keep_alive(),
        upgrade: message.upgrade(),
        chunked: message.is_chunked(),
        content_length: message.content_length().map(|len| len as i64),
        bytes_consumed: message.bytes_consumed() as u32,
        error_code: message.parser_error().map(|e| u32::from(e.code())),
        error: message.parser_error().map(|e| e.to_string()),
        body: body.to_vec().into(),
    }
}

/// Parse one HTTP message. `kind` is 0 for a request, 1 for a response.
#[napi]
pub fn parse_http(buf: Buffer, kind: u32, options: Option<ParseOptions>) -> Result<HttpMessage> {
    let kind = u8::try_from(kind)
        .ok()
        .and_then(MessageKind::from_u8)
        .ok_or_else(|| Error::from_reason(format!("Invalid message kind: {}", kind)))?;
    let config = options.unwrap_or_default().to_config();

    let message = Parser::with_config(kind, config)
        .parse(&buf)
        .map_err(|e| Error::from_reason(format!("Parse failed ({}): {}", e.code(), e)))?;
    Ok(to_js(&message))
}

/// Parse a standalone URL. `is_connect` selects authority-form (`host:port`).
#[napi]
pub fn parse_url(url: Buffer, is_connect: Option<bool>) -> UrlParts {
    let parsed = ParsedUrl::parse(&url, is_connect.unwrap_or(false));
    url_parts(&url, &parsed)
}

/// Copy one URL component (schema=0 .. userinfo=6); undefined when absent
#[napi]
pub fn url_field(url: Buffer, which: u32, is_connect: Option<bool>) -> Option<Buffer> {
    let which = u8::try_from(which).ok().and_then(UrlComponent::from_u8)?;
    let parsed = ParsedUrl::parse(&url, is_connect.unwrap_or(false));
    url_field_bytes(&url, &parsed, which).map(|field| field.to_vec().into())
}

// ============================================================================
// Certificate verification
// ============================================================================

/// Verify `hostname` against a DER certificate.
///
/// Returns 0 match found, 1 match not found, 3 malformed certificate,
/// 4 error (missing input or undecodable certificate).
#[napi]
pub fn validate_hostname(hostname: Option<String>, certificate: Option<Buffer>) -> u32 {
    let peer = certificate
        .as_deref()
        .map(X509Peer::from_der)
        .transpose();
    let verdict = match peer {
        Ok(peer) => turbine_core::validate_hostname(hostname.as_deref(), peer.as_ref()),
        Err(_) => Verdict::Error,
    };
    u32::from(verdict.code())
}

/// Verify `hostname` against the first certificate of a PEM file
#[cfg(feature = "tls")]
#[napi]
pub fn validate_hostname_pem(hostname: String, path: String) -> Result<u32> {
    let certs = turbine_core::load_certs(&path)
        .map_err(|e| Error::from_reason(format!("Certificate load failed: {}", e)))?;
    let verdict = certs
        .first()
        .map_or(Verdict::Error, |cert| turbine_core::tls::validate_peer(&hostname, cert));
    Ok(u32::from(verdict.code()))
}

/// Describe a verdict code
#[napi]
pub fn verdict_to_string(code: u32) -> String {
    u8::try_from(code)
        .ok()
        .and_then(Verdict::from_u8)
        .map_or("unknown", |verdict| verdict.as_str())
        .to_string()
}

// ============================================================================
// WebSocket / byte order
// ============================================================================

/// XOR-mask `payload` with a 4-byte `key`
#[napi]
pub fn websocket_mask(key: Buffer, payload: Buffer) -> Result<Buffer> {
    let key: [u8; 4] = key[..]
        .try_into()
        .map_err(|_| Error::from_reason("WebSocket mask key must be 4 bytes"))?;
    Ok(turbine_core::mask(key, &payload).into())
}

/// Reverse the byte order of a 64-bit value
#[napi]
pub fn swap64(value: BigInt) -> Result<BigInt> {
    let (signed, value, lossless) = value.get_u64();
    if signed || !lossless {
        return Err(Error::from_reason("swap64 expects an unsigned 64-bit value"));
    }
    Ok(BigInt::from(turbine_core::swap64(value)))
}

