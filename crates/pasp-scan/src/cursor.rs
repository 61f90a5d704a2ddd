//! Bounded position over a source buffer.
//!
//! The translator never relies on a terminator byte. Scanning loops read
//! through `source().get(..)`, and every jump goes through [`Cursor::seek`],
//! which cannot move past the end.

/// Position within an immutable source buffer.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        Self { src, pos: 0 }
    }

    #[inline]
    pub fn source(&self) -> &'a [u8] {
        self.src
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Jump to an absolute offset, clamped to the buffer length.
    #[inline]
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.src.len());
    }
}

/// 1-based line number of `offset` within `src`, counting LF bytes.
pub fn line_of(src: &[u8], offset: usize) -> usize {
    let end = offset.min(src.len());
    1 + src[..end].iter().filter(|&&b| b == b'\n').count()
}
