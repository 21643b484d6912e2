//! Offset/length views into a caller-owned buffer

use std::ops::Range;

/// Non-owning view into an input buffer: an offset and a length.
///
/// A span only means something together with the buffer it was produced
/// from. [`crate::ParsedMessage`] keeps that buffer borrowed so spans cannot
/// outlive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ByteSpan {
    pub offset: usize,
    pub len: usize,
}

impl ByteSpan {
    pub const EMPTY: ByteSpan = ByteSpan { offset: 0, len: 0 };

    #[inline]
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    #[inline]
    pub fn from_range(range: Range<usize>) -> Self {
        Self {
            offset: range.start,
            len: range.end.saturating_sub(range.start),
        }
    }

    /// One past the last byte
    #[inline]
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }

    /// Resolve against the buffer. Out-of-bounds spans resolve to an empty slice.
    #[inline]
    pub fn slice<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        buf.get(self.range()).unwrap_or(&[])
    }

    /// Grow this span so it also covers `next`, which must start at or after
    /// this span's start. Used for tokens the lexer delivered in pieces.
    #[inline]
    pub fn extend_to(self, next: ByteSpan) -> ByteSpan {
        if next.end() <= self.end() {
            return self;
        }
        ByteSpan {
            offset: self.offset,
            len: next.end() - self.offset,
        }
    }

    /// Move a span that is relative to a sub-slice back into the parent buffer
    #[inline]
    pub const fn shift(self, base: usize) -> ByteSpan {
        ByteSpan {
            offset: self.offset + base,
            len: self.len,
        }
    }
}
