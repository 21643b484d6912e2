//! Flat offset tables for JS interop
//!
//! All offsets are absolute positions in the parsed buffer. Header entries
//! are `[name_start, name_end, value_start, value_end]` quadruples.

use turbine_core::{ByteSpan, ParsedMessage, ParsedUrl, UrlComponent};

pub const FLAG_HEADERS_COMPLETE: u8 = 1;
pub const FLAG_MESSAGE_COMPLETE: u8 = 1 << 1;
pub const FLAG_KEEP_ALIVE: u8 = 1 << 2;
pub const FLAG_UPGRADE: u8 = 1 << 3;
pub const FLAG_CHUNKED: u8 = 1 << 4;

/// Offsets of a [`ParsedMessage`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLayout {
    pub kind: u8,
    pub flags: u8,
    /// Tokenizer error code, 0 if none
    pub error: u8,
    pub version_major: u8,
    pub version_minor: u8,
    /// 0 for requests
    pub status: u16,
    pub bytes_consumed: u32,
    /// `[start, end]` of the method, request target or reason phrase
    pub method: [u32; 2],
    pub url: [u32; 2],
    pub reason: [u32; 2],
    pub headers: Vec<u32>,
    /// `[start, end]` pairs, one per body piece
    pub body: Vec<u32>,
    pub url_layout: UrlLayout,
}

impl MessageLayout {
    pub fn from_message(message: &ParsedMessage<'_>) -> Self {
        let buf = message.buffer();
        let mut flags = 0;
        if message.headers_complete() {
            flags |= FLAG_HEADERS_COMPLETE;
        }
        if message.message_complete() {
            flags |= FLAG_MESSAGE_COMPLETE;
        }
        if message.should_keep_alive() {
            flags |= FLAG_KEEP_ALIVE;
        }
        if message.upgrade() {
            flags |= FLAG_UPGRADE;
        }
        if message.is_chunked() {
            flags |= FLAG_CHUNKED;
        }

        let mut headers = Vec::with_capacity(message.header_count() * 4);
        for pair in message.header_pairs() {
            headers.extend_from_slice(&bounds(pair.key));
            headers.extend_from_slice(&bounds(pair.value.unwrap_or_default()));
        }

        let (version_major, version_minor) = message.version_pair().unwrap_or_default();
        let url_base = message.url_span().map_or(0, |s| s.offset);

        Self {
            kind: message.kind() as u8,
            flags,
            error: message.parser_error().map_or(0, |e| e.code()),
            version_major,
            version_minor,
            status: message.status_code().unwrap_or(0),
            bytes_consumed: message.bytes_consumed() as u32,
            method: subslice_bounds(buf, message.method_bytes()),
            url: message.url_span().map_or([0, 0], bounds),
            reason: subslice_bounds(buf, message.reason()),
            headers,
            body: message.body_spans().iter().flat_map(|&s| bounds(s)).collect(),
            url_layout: UrlLayout::from_parsed(message.parsed_url(), url_base),
        }
    }
}

/// Offsets of a [`ParsedUrl`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlLayout {
    /// 0 on success
    pub rc: i32,
    pub field_set: u16,
    pub port: u16,
    /// `[start, end]` per component, indexed by the component code; zero
    /// when absent
    pub fields: [u32; UrlComponent::COUNT * 2],
}

impl UrlLayout {
    /// `base` shifts the component offsets, e.g. to the URL's position in a
    /// request buffer
    pub fn from_parsed(parsed: &ParsedUrl, base: usize) -> Self {
        let mut fields = [0; UrlComponent::COUNT * 2];
        for component in UrlComponent::ALL {
            if let Some(span) = parsed.span(component) {
                let [start, end] = bounds(span.shift(base));
                fields[component as usize * 2] = start;
                fields[component as usize * 2 + 1] = end;
            }
        }
        Self {
            rc: parsed.rc(),
            field_set: parsed.field_set(),
            port: parsed.port().unwrap_or(0),
            fields,
        }
    }
}

fn bounds(span: ByteSpan) -> [u32; 2] {
    [span.offset as u32, span.end() as u32]
}

/// Bounds of a slice borrowed from `buf`
fn subslice_bounds(buf: &[u8], part: Option<&[u8]>) -> [u32; 2] {
    match part {
        Some(part) => {
            let start = part.as_ptr() as usize - buf.as_ptr() as usize;
            [start as u32, (start + part.len()) as u32]
        }
        None => [0, 0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turbine_core::{parse, MessageKind};

    #[test]
    fn test_request_layout() {
        let buf = b"GET /a?b=1 HTTP/1.1\r\nHost: x\r\nK: vv\r\n\r\n";
        let message = parse(buf, MessageKind::Request).unwrap();
        let layout = MessageLayout::from_message(&message);

        assert_eq!(layout.kind, 0);
        assert_eq!(layout.method, [0, 3]);
        assert_eq!(layout.url, [4, 10]);
        assert_eq!(&buf[layout.headers[0] as usize..layout.headers[1] as usize], b"Host");
        assert_eq!(&buf[layout.headers[6] as usize..layout.headers[7] as usize], b"vv");
        assert_eq!(layout.headers.len(), 8);
        assert_eq!(layout.flags & FLAG_MESSAGE_COMPLETE, FLAG_MESSAGE_COMPLETE);
        assert_eq!(layout.flags & FLAG_KEEP_ALIVE, FLAG_KEEP_ALIVE);
        assert_eq!((layout.version_major, layout.version_minor), (1, 1));

        // query is url-relative in the core, absolute here
        let query = UrlComponent::Query as usize * 2;
        let (start, end) = (layout.url_layout.fields[query], layout.url_layout.fields[query + 1]);
        assert_eq!(&buf[start as usize..end as usize], b"b=1");
    }

    #[test]
    fn test_response_layout() {
        let buf = b"HTTP/1.1 404 Not Found\r\nContent-Length: 2\r\n\r\nno";
        let message = parse(buf, MessageKind::Response).unwrap();
        let layout = MessageLayout::from_message(&message);

        assert_eq!(layout.status, 404);
        assert_eq!(&buf[layout.reason[0] as usize..layout.reason[1] as usize], b"Not Found");
        assert_eq!(&buf[layout.body[0] as usize..layout.body[1] as usize], b"no");
        assert_eq!(layout.url, [0, 0]);
        assert_eq!(layout.bytes_consumed as usize, buf.len());
    }

    #[test]
    fn test_error_code() {
        let message = parse(b"GET / HTTP/9\r\n\r\n", MessageKind::Request).unwrap();
        let layout = MessageLayout::from_message(&message);
        assert_ne!(layout.error, 0);
        assert_eq!(layout.flags & FLAG_HEADERS_COMPLETE, 0);
    }

    #[test]
    fn test_failed_url_layout() {
        let parsed = ParsedUrl::parse(b"http://:1/", false);
        let layout = UrlLayout::from_parsed(&parsed, 0);
        assert_eq!(layout.rc, 1);
        assert_eq!(layout.field_set, 0);
        assert!(layout.fields.iter().all(|&o| o == 0));
    }
}
