//! Byte-cursor primitives for reading the fixed-offset binary structures that make up
//! `dir`, `_VBA_PROJECT` and module streams.
//!
//! Unlike the streaming readers in [`ctxutils::io`], the formats parsed here mix
//! sequential advances with occasional direct jumps to a computed offset, so [`Reader`]
//! keeps an explicit `(buffer, position)` pair rather than wrapping a [`Read`](std::io::Read).
//! The actual integer decoding is delegated to `ctxutils::io` via a short-lived
//! [`io::Cursor`].
use ctxutils::io::{rdu16be, rdu16le, rdu32be, rdu32le};
use std::io::{self, Seek, SeekFrom};

/// Byte order of a given project or stream.
///
/// The `dir` stream is always [`Endian::Little`]; module and `_VBA_PROJECT` streams use
/// whichever endianness the project was compiled under (see
/// [`module::Endianness`](crate::module)-adjacent detection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

fn eof() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "short read")
}

/// Reads a little/big-endian `u16` at a fixed offset, without disturbing any cursor.
pub fn u16_at(buf: &[u8], offset: usize, endian: Endian) -> io::Result<u16> {
    let mut c = io::Cursor::new(buf);
    c.seek(SeekFrom::Start(offset as u64))?;
    match endian {
        Endian::Little => rdu16le(&mut c),
        Endian::Big => rdu16be(&mut c),
    }
}

/// Reads a little/big-endian `u32` at a fixed offset, without disturbing any cursor.
pub fn u32_at(buf: &[u8], offset: usize, endian: Endian) -> io::Result<u32> {
    let mut c = io::Cursor::new(buf);
    c.seek(SeekFrom::Start(offset as u64))?;
    match endian {
        Endian::Little => rdu32le(&mut c),
        Endian::Big => rdu32be(&mut c),
    }
}

/// Reads a single byte at a fixed offset.
pub fn u8_at(buf: &[u8], offset: usize) -> io::Result<u8> {
    buf.get(offset).copied().ok_or_else(eof)
}

/// A cursor over a borrowed byte slice, threading an explicit position the way the
/// original parser threads its `offset` variable.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn with_pos(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn advance(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n);
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn buf(&self) -> &'a [u8] {
        self.buf
    }

    pub fn u8(&mut self) -> io::Result<u8> {
        let v = u8_at(self.buf, self.pos)?;
        self.pos += 1;
        Ok(v)
    }

    pub fn u16(&mut self, endian: Endian) -> io::Result<u16> {
        let v = u16_at(self.buf, self.pos, endian)?;
        self.pos += 2;
        Ok(v)
    }

    pub fn u32(&mut self, endian: Endian) -> io::Result<u32> {
        let v = u32_at(self.buf, self.pos, endian)?;
        self.pos += 4;
        Ok(v)
    }

    /// Reads a 16- or 32-bit value depending on `is_dword`, widened to `u32`.
    pub fn var(&mut self, is_dword: bool, endian: Endian) -> io::Result<u32> {
        if is_dword {
            self.u32(endian)
        } else {
            self.u16(endian).map(u32::from)
        }
    }

    pub fn bytes(&mut self, n: usize) -> io::Result<&'a [u8]> {
        let s = self.buf.get(self.pos..self.pos + n).ok_or_else(eof)?;
        self.pos += n;
        Ok(s)
    }

    /// Reads a length-prefixed array and skips over its payload.
    ///
    /// `treat_all_ones_as_absent`: when the length field reads as all-ones (`0xFFFF` or
    /// `0xFFFF_FFFF`), only the length field itself is consumed.
    pub fn skip_array(
        &mut self,
        length_is_u32: bool,
        element_size: usize,
        endian: Endian,
        treat_all_ones_as_absent: bool,
    ) -> io::Result<u32> {
        let (length, all_ones) = if length_is_u32 {
            let l = self.u32(endian)?;
            (l, l == 0xFFFF_FFFF)
        } else {
            let l = self.u16(endian)?;
            (u32::from(l), l == 0xFFFF)
        };
        if !(treat_all_ones_as_absent && all_ones) {
            self.advance(length as usize * element_size);
        }
        Ok(length)
    }
}
