//! WASM bindings for JavaScript interop
//! Results are offset tables into the caller's buffer

use crate::layout::{MessageLayout, UrlLayout};
use js_sys::Uint32Array;
use turbine_core::{MessageKind, ParsedUrl, Parser, ParserConfig, Verdict, X509Peer};
use wasm_bindgen::prelude::*;

// ============================================================================
// HTTP Parser
// ============================================================================

/// WASM-exposed HTTP parse result
#[wasm_bindgen]
pub struct ParseResult {
    /// 0 = request, 1 = response
    pub kind: u8,
    /// Bit set of the `FLAG_*` constants
    pub flags: u8,
    /// Tokenizer error code, 0 if none
    pub error: u8,
    pub version_major: u8,
    pub version_minor: u8,
    /// Status code (responses), 0 for requests
    pub status: u16,
    /// Bytes of the buffer consumed by the parse
    pub bytes_consumed: u32,
    /// Method start/end offsets
    pub method_start: u32,
    pub method_end: u32,
    /// Request target start/end offsets
    pub url_start: u32,
    pub url_end: u32,
    /// Reason phrase start/end offsets
    pub reason_start: u32,
    pub reason_end: u32,
    layout: MessageLayout,
}

#[wasm_bindgen]
impl ParseResult {
    /// Number of complete header pairs
    #[wasm_bindgen(getter)]
    pub fn headers_count(&self) -> u32 {
        (self.layout.headers.len() / 4) as u32
    }

    /// `[name_start, name_end, value_start, value_end]` per header
    #[wasm_bindgen(getter)]
    pub fn header_offsets(&self) -> Uint32Array {
        Uint32Array::from(&self.layout.headers[..])
    }

    /// `[start, end]` per body piece
    #[wasm_bindgen(getter)]
    pub fn body_offsets(&self) -> Uint32Array {
        Uint32Array::from(&self.layout.body[..])
    }

    /// Components of the request target, offsets into the parsed buffer
    #[wasm_bindgen(getter)]
    pub fn url(&self) -> UrlResult {
        UrlResult {
            layout: self.layout.url_layout.clone(),
        }
    }
}

/// Parse one HTTP message.
///
/// `kind` is 0 for a request, 1 for a response. `max_headers` of 0 means
/// unlimited. Throws on an unknown kind, allocation failure or when the
/// header limit is hit; syntax errors are reported on the result.
#[wasm_bindgen]
pub fn parse_http(
    buf: &[u8],
    kind: u8,
    max_headers: Option<u32>,
    head_response: Option<bool>,
) -> Result<ParseResult, JsError> {
    let kind = MessageKind::try_from(kind)?;
    let mut config = ParserConfig::new().head_response(head_response.unwrap_or(false));
    if let Some(max) = max_headers.filter(|&max| max > 0) {
        config = config.max_headers(max as usize);
    }

    let message = Parser::with_config(kind, config).parse(buf)?;
    let layout = MessageLayout::from_message(&message);

    Ok(ParseResult {
        kind: layout.kind,
        flags: layout.flags,
        error: layout.error,
        version_major: layout.version_major,
        version_minor: layout.version_minor,
        status: layout.status,
        bytes_consumed: layout.bytes_consumed,
        method_start: layout.method[0],
        method_end: layout.method[1],
        url_start: layout.url[0],
        url_end: layout.url[1],
        reason_start: layout.reason[0],
        reason_end: layout.reason[1],
        layout,
    })
}

// ============================================================================
// URL
// ============================================================================

/// WASM-exposed URL component table
#[wasm_bindgen]
pub struct UrlResult {
    layout: UrlLayout,
}

#[wasm_bindgen]
impl UrlResult {
    /// 0 on success, 1 when the URL did not parse
    #[wasm_bindgen(getter)]
    pub fn rc(&self) -> i32 {
        self.layout.rc
    }

    #[wasm_bindgen(getter)]
    pub fn field_set(&self) -> u16 {
        self.layout.field_set
    }

    /// Numeric port, 0 when absent
    #[wasm_bindgen(getter)]
    pub fn port(&self) -> u16 {
        self.layout.port
    }

    /// Whether component `which` (schema=0 .. userinfo=6) is present
    pub fn is_set(&self, which: u8) -> bool {
        which < 16 && self.layout.field_set & (1 << which) != 0
    }

    /// Copy component `which` out of `source`, the buffer the offsets refer to
    pub fn field(&self, source: &[u8], which: u8) -> Option<Vec<u8>> {
        if !self.is_set(which) {
            return None;
        }
        let index = usize::from(which) * 2;
        let start = *self.layout.fields.get(index)? as usize;
        let end = *self.layout.fields.get(index + 1)? as usize;
        source.get(start..end).map(<[u8]>::to_vec)
    }
}

/// Parse a standalone URL. `is_connect` selects authority-form (`host:port`).
#[wasm_bindgen]
pub fn parse_url(url: &[u8], is_connect: bool) -> UrlResult {
    UrlResult {
        layout: UrlLayout::from_parsed(&ParsedUrl::parse(url, is_connect), 0),
    }
}

// ============================================================================
// Certificate verification
// ============================================================================

/// Verify `hostname` against a DER certificate.
///
/// Returns 0 match found, 1 match not found, 3 malformed certificate,
/// 4 error (missing input or undecodable certificate).
#[wasm_bindgen]
pub fn validate_hostname(hostname: Option<String>, certificate: Option<Vec<u8>>) -> u8 {
    let peer = certificate.as_deref().map(X509Peer::from_der).transpose();
    match peer {
        Ok(peer) => turbine_core::validate_hostname(hostname.as_deref(), peer.as_ref()).code(),
        Err(_) => Verdict::Error.code(),
    }
}

/// Describe a verdict code
#[wasm_bindgen]
pub fn verdict_to_string(code: u8) -> String {
    Verdict::from_u8(code)
        .map_or("unknown", |verdict| verdict.as_str())
        .to_string()
}

// ============================================================================
// WebSocket / byte order
// ============================================================================

/// XOR-mask `payload` with a 4-byte `key`
#[wasm_bindgen]
pub fn websocket_mask(key: &[u8], payload: &[u8]) -> Result<Vec<u8>, JsError> {
    let key: [u8; 4] = key
        .try_into()
        .map_err(|_| JsError::new("WebSocket mask key must be 4 bytes"))?;
    Ok(turbine_core::mask(key, payload))
}

/// Reverse the byte order of a 64-bit value
#[wasm_bindgen]
pub fn swap64(value: u64) -> u64 {
    turbine_core::swap64(value)
}
