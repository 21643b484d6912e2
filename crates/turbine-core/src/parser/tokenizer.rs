//! Pull-based HTTP/1.x tokenizer
//!
//! Walks a single buffer and yields [`Token`]s carrying offsets into it.
//! The caller polls for the next token instead of registering callbacks.
//! A token cut off by the end of the buffer is held back, so
//! [`Tokenizer::position`] always sits on a token boundary.

use std::collections::VecDeque;

use tracing::trace;

use super::MessageKind;
use crate::error::TokenizeError;
use crate::span::ByteSpan;

/// Default cap on the size of the request/status line plus headers
pub const DEFAULT_MAX_HEADER_BYTES: usize = 80 * 1024;

/// Framing facts learned from the message head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeadInfo {
    /// Declared Content-Length
    pub content_length: Option<u64>,
    /// Transfer-Encoding ends in `chunked`
    pub chunked: bool,
    /// Connection is persistent after this message
    pub keep_alive: bool,
    /// Protocol switch: the bytes after the head are not HTTP
    pub upgrade: bool,
}

/// Lexical unit of an HTTP message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    MessageBegin,
    Method(ByteSpan),
    Url(ByteSpan),
    Status { code: u16, reason: ByteSpan },
    Version { major: u8, minor: u8 },
    HeaderField(ByteSpan),
    HeaderValue(ByteSpan),
    HeadersComplete(HeadInfo),
    Body(ByteSpan),
    MessageComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Begin,
    StartLine,
    HeaderLine,
    FixedBody { remaining: u64 },
    BodyToEof,
    ChunkSize,
    ChunkData { remaining: u64 },
    ChunkDataEnd,
    Trailers,
    Finish,
    Done,
}

/// Head facts collected while walking header lines
#[derive(Debug, Default)]
struct HeadScan {
    content_length: Option<u64>,
    chunked: bool,
    connection_close: bool,
    connection_keep_alive: bool,
    connection_upgrade: bool,
    has_upgrade: bool,
    saw_header: bool,
}

/// Incremental HTTP/1.x lexer over one buffer
#[derive(Debug)]
pub struct Tokenizer<'a> {
    buf: &'a [u8],
    kind: MessageKind,
    pos: usize,
    state: State,
    queued: VecDeque<Token>,
    max_header_bytes: usize,
    version: (u8, u8),
    status: u16,
    is_connect: bool,
    is_head: bool,
    scan: HeadScan,
}

impl<'a> Tokenizer<'a> {
    pub fn new(buf: &'a [u8], kind: MessageKind) -> Self {
        Self::with_limit(buf, kind, DEFAULT_MAX_HEADER_BYTES)
    }

    /// Tokenizer with a custom cap on the message head size
    pub fn with_limit(buf: &'a [u8], kind: MessageKind, max_header_bytes: usize) -> Self {
        Self {
            buf,
            kind,
            pos: 0,
            state: State::Begin,
            queued: VecDeque::with_capacity(3),
            max_header_bytes,
            version: (1, 1),
            status: 0,
            is_connect: false,
            is_head: false,
            scan: HeadScan::default(),
        }
    }

    /// Bytes consumed so far
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Whether a full message has been tokenized
    #[inline]
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Responses to HEAD carry no body whatever their headers say
    pub fn set_head_response(&mut self, is_head: bool) {
        self.is_head = is_head;
    }

    fn fail(&mut self, error: TokenizeError) -> Option<Result<Token, TokenizeError>> {
        trace!(?error, offset = self.pos, "tokenizer stopped");
        self.state = State::Done;
        self.queued.clear();
        Some(Err(error))
    }

    /// Next line starting at `pos`, without its terminator, plus the offset
    /// just past the terminator. `Ok(None)` when the line is not complete yet.
    fn next_line(&self, in_head: bool) -> Result<Option<(ByteSpan, usize)>, TokenizeError> {
        let rest = &self.buf[self.pos..];
        let Some(nl) = memchr(b'\n', rest) else {
            if in_head && self.pos + rest.len() > self.max_header_bytes {
                return Err(TokenizeError::HeaderOverflow);
            }
            return Ok(None);
        };
        let next = self.pos + nl + 1;
        if in_head && next > self.max_header_bytes {
            return Err(TokenizeError::HeaderOverflow);
        }
        let mut line = &rest[..nl];
        if line.last() == Some(&b'\r') {
            line = &line[..line.len() - 1];
        }
        if memchr(b'\r', line).is_some() {
            return Err(TokenizeError::LfExpected);
        }
        Ok(Some((ByteSpan::new(self.pos, line.len()), next)))
    }

    fn start_line(&mut self) -> Result<Option<Token>, TokenizeError> {
        // Tolerate empty lines before the start line (RFC 7230 §3.5); they
        // count against the head size limit
        let (line, next) = loop {
            let Some((line, next)) = self.next_line(true)? else {
                return Ok(None);
            };
            if !line.is_empty() {
                break (line, next);
            }
            self.pos = next;
        };
        match self.kind {
            MessageKind::Request => self.request_line(line)?,
            MessageKind::Response => self.status_line(line)?,
        }
        self.pos = next;
        self.state = State::HeaderLine;
        Ok(self.queued.pop_front())
    }

    fn request_line(&mut self, line: ByteSpan) -> Result<(), TokenizeError> {
        let bytes = line.slice(self.buf);

        let method_len = memchr(b' ', bytes).ok_or(TokenizeError::InvalidMethod)?;
        let method = &bytes[..method_len];
        if method.is_empty() || !method.iter().all(|&b| is_token(b)) {
            return Err(TokenizeError::InvalidMethod);
        }

        let target_start = method_len + 1;
        let target_len = memchr(b' ', &bytes[target_start..]).ok_or(TokenizeError::InvalidVersion)?;
        let target = &bytes[target_start..target_start + target_len];
        if target.is_empty() || target.iter().any(|&b| b < b' ' || b == 0x7F) {
            return Err(TokenizeError::InvalidUrl);
        }

        let (major, minor) = parse_version(&bytes[target_start + target_len + 1..])?;

        self.is_connect = method == b"CONNECT";
        self.version = (major, minor);
        self.queued.push_back(Token::Method(ByteSpan::new(line.offset, method_len)));
        self.queued.push_back(Token::Url(ByteSpan::new(line.offset + target_start, target_len)));
        self.queued.push_back(Token::Version { major, minor });
        Ok(())
    }

    fn status_line(&mut self, line: ByteSpan) -> Result<(), TokenizeError> {
        let bytes = line.slice(self.buf);

        let version_len = memchr(b' ', bytes).ok_or(TokenizeError::InvalidVersion)?;
        let (major, minor) = parse_version(&bytes[..version_len])?;

        let code_start = version_len + 1;
        let code_bytes = bytes.get(code_start..code_start + 3).ok_or(TokenizeError::InvalidStatus)?;
        if !code_bytes.iter().all(u8::is_ascii_digit) {
            return Err(TokenizeError::InvalidStatus);
        }
        let code = code_bytes
            .iter()
            .fold(0u16, |acc, &d| acc * 10 + u16::from(d - b'0'));
        if code < 100 {
            return Err(TokenizeError::InvalidStatus);
        }

        let after = code_start + 3;
        let reason = match bytes.get(after) {
            None => ByteSpan::new(line.offset + after, 0),
            Some(b' ') => ByteSpan::new(line.offset + after + 1, bytes.len() - after - 1),
            Some(_) => return Err(TokenizeError::InvalidStatus),
        };

        self.version = (major, minor);
        self.status = code;
        self.queued.push_back(Token::Version { major, minor });
        self.queued.push_back(Token::Status { code, reason });
        Ok(())
    }

    fn header_line(&mut self) -> Result<Option<Token>, TokenizeError> {
        let Some((line, next)) = self.next_line(true)? else {
            return Ok(None);
        };
        let token = self.header_tokens(line)?;
        self.pos = next;
        Ok(Some(token))
    }

    fn header_tokens(&mut self, line: ByteSpan) -> Result<Token, TokenizeError> {
        if line.is_empty() {
            return self.end_of_head();
        }

        let bytes = line.slice(self.buf);

        // obs-fold: continuation of the previous header value
        if bytes[0] == b' ' || bytes[0] == b'\t' {
            if !self.scan.saw_header {
                return Err(TokenizeError::InvalidHeaderToken);
            }
            let value = trim_ows(bytes);
            check_value(bytes)?;
            return Ok(Token::HeaderValue(value.shift(line.offset)));
        }

        let colon = memchr(b':', bytes).ok_or(TokenizeError::InvalidHeaderToken)?;
        let name = &bytes[..colon];
        if name.is_empty() || !name.iter().all(|&b| is_token(b)) {
            return Err(TokenizeError::InvalidHeaderToken);
        }
        let raw_value = &bytes[colon + 1..];
        check_value(raw_value)?;
        let value = trim_ows(raw_value).shift(line.offset + colon + 1);

        self.scan.saw_header = true;
        self.inspect_header(name, value.slice(self.buf))?;

        self.queued.push_back(Token::HeaderValue(value));
        Ok(Token::HeaderField(ByteSpan::new(line.offset, colon)))
    }

    fn inspect_header(&mut self, name: &[u8], value: &[u8]) -> Result<(), TokenizeError> {
        if name.eq_ignore_ascii_case(b"content-length") {
            let length = parse_content_length(value)?;
            match self.scan.content_length {
                Some(previous) if previous != length => {
                    return Err(TokenizeError::InvalidContentLength)
                }
                _ => self.scan.content_length = Some(length),
            }
        } else if name.eq_ignore_ascii_case(b"transfer-encoding") {
            self.scan.chunked = value
                .rsplit(|&b| b == b',')
                .next()
                .is_some_and(|last| trim_ows(last).slice(last).eq_ignore_ascii_case(b"chunked"));
        } else if name.eq_ignore_ascii_case(b"connection") {
            for option in value.split(|&b| b == b',') {
                let option = trim_ows(option).slice(option);
                if option.eq_ignore_ascii_case(b"close") {
                    self.scan.connection_close = true;
                } else if option.eq_ignore_ascii_case(b"keep-alive") {
                    self.scan.connection_keep_alive = true;
                } else if option.eq_ignore_ascii_case(b"upgrade") {
                    self.scan.connection_upgrade = true;
                }
            }
        } else if name.eq_ignore_ascii_case(b"upgrade") {
            self.scan.has_upgrade = true;
        }
        Ok(())
    }

    fn end_of_head(&mut self) -> Result<Token, TokenizeError> {
        let scan = &self.scan;
        if scan.chunked && scan.content_length.is_some() {
            return Err(TokenizeError::UnexpectedContentLength);
        }

        let keep_alive = if self.version >= (1, 1) {
            !scan.connection_close
        } else {
            scan.connection_keep_alive && !scan.connection_close
        };
        let upgrade = match self.kind {
            MessageKind::Request => {
                self.is_connect || (scan.connection_upgrade && scan.has_upgrade)
            }
            MessageKind::Response => self.status == 101,
        };

        let info = HeadInfo {
            content_length: scan.content_length,
            chunked: scan.chunked,
            keep_alive,
            upgrade,
        };

        let bodyless_response = self.kind == MessageKind::Response
            && (self.is_head
                || (100..200).contains(&self.status)
                || self.status == 204
                || self.status == 304);

        self.state = if upgrade || bodyless_response {
            State::Finish
        } else if info.chunked {
            State::ChunkSize
        } else {
            match info.content_length {
                Some(0) => State::Finish,
                Some(remaining) => State::FixedBody { remaining },
                None if self.kind == MessageKind::Request => State::Finish,
                None => State::BodyToEof,
            }
        };

        Ok(Token::HeadersComplete(info))
    }

    /// Emit up to `remaining` body bytes; returns the token and bytes taken
    fn body_slice(&mut self, remaining: u64) -> Option<(Token, u64)> {
        let available = (self.buf.len() - self.pos) as u64;
        if available == 0 {
            return None;
        }
        let take = available.min(remaining);
        let span = ByteSpan::new(self.pos, take as usize);
        self.pos += take as usize;
        Some((Token::Body(span), take))
    }

    fn chunk_size(&mut self) -> Result<Option<Token>, TokenizeError> {
        let Some((line, next)) = self.next_line(false)? else {
            return Ok(None);
        };
        let bytes = line.slice(self.buf);
        let digits_end = bytes
            .iter()
            .position(|&b| !b.is_ascii_hexdigit())
            .unwrap_or(bytes.len());
        if digits_end == 0 {
            return Err(TokenizeError::InvalidChunkSize);
        }
        // anything after the size must be an extension
        match bytes.get(digits_end) {
            None | Some(b';') | Some(b' ') | Some(b'\t') => {}
            Some(_) => return Err(TokenizeError::InvalidChunkSize),
        }
        let mut size: u64 = 0;
        for &d in &bytes[..digits_end] {
            let digit = (d as char).to_digit(16).ok_or(TokenizeError::InvalidChunkSize)?;
            size = size
                .checked_mul(16)
                .and_then(|s| s.checked_add(u64::from(digit)))
                .ok_or(TokenizeError::InvalidChunkSize)?;
        }
        self.pos = next;
        self.state = if size == 0 {
            State::Trailers
        } else {
            State::ChunkData { remaining: size }
        };
        self.step()
    }

    fn chunk_data_end(&mut self) -> Result<Option<Token>, TokenizeError> {
        let rest = &self.buf[self.pos..];
        if rest.starts_with(b"\r\n") {
            self.pos += 2;
        } else if rest.starts_with(b"\n") {
            self.pos += 1;
        } else if rest.is_empty() || rest == b"\r" {
            return Ok(None);
        } else {
            return Err(TokenizeError::LfExpected);
        }
        self.state = State::ChunkSize;
        self.step()
    }

    fn trailers(&mut self) -> Result<Option<Token>, TokenizeError> {
        loop {
            let Some((line, next)) = self.next_line(false)? else {
                return Ok(None);
            };
            self.pos = next;
            if line.is_empty() {
                self.state = State::Done;
                return Ok(Some(Token::MessageComplete));
            }
        }
    }

    fn step(&mut self) -> Result<Option<Token>, TokenizeError> {
        if let Some(token) = self.queued.pop_front() {
            return Ok(Some(token));
        }
        match self.state {
            State::Begin => {
                if self.pos >= self.buf.len() {
                    return Ok(None);
                }
                self.state = State::StartLine;
                Ok(Some(Token::MessageBegin))
            }
            State::StartLine => self.start_line(),
            State::HeaderLine => self.header_line(),
            State::FixedBody { remaining } => Ok(self.body_slice(remaining).map(|(token, taken)| {
                let remaining = remaining - taken;
                self.state = if remaining == 0 {
                    State::Finish
                } else {
                    State::FixedBody { remaining }
                };
                token
            })),
            State::BodyToEof => Ok(self.body_slice(u64::MAX).map(|(token, _)| token)),
            State::ChunkSize => self.chunk_size(),
            State::ChunkData { remaining } => Ok(self.body_slice(remaining).map(|(token, taken)| {
                let remaining = remaining - taken;
                self.state = if remaining == 0 {
                    State::ChunkDataEnd
                } else {
                    State::ChunkData { remaining }
                };
                token
            })),
            State::ChunkDataEnd => self.chunk_data_end(),
            State::Trailers => self.trailers(),
            State::Finish => {
                self.state = State::Done;
                Ok(Some(Token::MessageComplete))
            }
            State::Done => Ok(None),
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token, TokenizeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(token) => token.map(Ok),
            Err(error) => self.fail(error),
        }
    }
}

/// `HTTP/x.y`
fn parse_version(bytes: &[u8]) -> Result<(u8, u8), TokenizeError> {
    match bytes {
        [b'H', b'T', b'T', b'P', b'/', major, b'.', minor]
            if major.is_ascii_digit() && minor.is_ascii_digit() =>
        {
            Ok((major - b'0', minor - b'0'))
        }
        _ => Err(TokenizeError::InvalidVersion),
    }
}

fn parse_content_length(value: &[u8]) -> Result<u64, TokenizeError> {
    if value.is_empty() {
        return Err(TokenizeError::InvalidContentLength);
    }
    let mut length: u64 = 0;
    for &b in value {
        if !b.is_ascii_digit() {
            return Err(TokenizeError::InvalidContentLength);
        }
        length = length
            .checked_mul(10)
            .and_then(|l| l.checked_add(u64::from(b - b'0')))
            .ok_or(TokenizeError::InvalidContentLength)?;
    }
    Ok(length)
}

/// Reject control characters other than HTAB in a field value
fn check_value(value: &[u8]) -> Result<(), TokenizeError> {
    if value.iter().any(|&b| (b < b' ' && b != b'\t') || b == 0x7F) {
        return Err(TokenizeError::InvalidHeaderToken);
    }
    Ok(())
}

/// Span of `bytes` without leading/trailing SP and HTAB, relative to `bytes`
fn trim_ows(bytes: &[u8]) -> ByteSpan {
    let is_ows = |b: &u8| *b == b' ' || *b == b'\t';
    let start = bytes.iter().position(|b| !is_ows(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !is_ows(b)).map_or(start, |i| i + 1);
    ByteSpan::from_range(start..end)
}

/// RFC 7230 tchar
#[inline]
fn is_token(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
        )
}

#[inline]
fn memchr(needle: u8, haystack: &[u8]) -> Option<usize> {
    haystack.iter().position(|&b| b == needle)
}
