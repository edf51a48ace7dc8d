//! Sequential little-endian reader over a page buffer.
//!
//! Every read advances the position by exactly the width it consumed and
//! fails with a [`DecodeError`] when the buffer runs short. Tagged reads
//! validate the field index and wire type of the v6 format before decoding
//! the value.

use super::DecodeError;

/// Wire type carried in the low nibble of a field tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    /// Four-byte scalar (`u32`, `i32`, `f32`).
    Byte4,
    /// Eight-byte scalar (`f64`).
    Byte8,
    /// `u32` length followed by that many bytes.
    Length,
    /// Compound id: one byte plus a variable-width integer.
    Id,
}

impl WireType {
    /// Numeric code as written on the wire.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Byte4 => 0x4,
            Self::Byte8 => 0x8,
            Self::Length => 0xC,
            Self::Id => 0xF,
        }
    }
}

/// Compound identifier used by scene items (author part + counter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrdtId {
    pub part1: u8,
    pub part2: u64,
}

/// Read cursor over an immutable byte slice.
#[derive(Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Total buffer length.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left to read.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, width: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < width {
            return Err(DecodeError::UnexpectedEof {
                position: self.pos,
                needed: width,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + width];
        self.pos += width;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.take_array()?))
    }

    /// Read `length` raw bytes as a Latin-1 string.
    ///
    /// Device strings are single-byte; every byte maps to the code point of
    /// the same value, so this never fails on content.
    pub fn read_fixed_string(&mut self, length: usize) -> Result<String, DecodeError> {
        Ok(self.take(length)?.iter().map(|&b| char::from(b)).collect())
    }

    pub fn skip(&mut self, length: usize) -> Result<(), DecodeError> {
        self.take(length).map(|_| ())
    }

    /// Read an unsigned LEB128 integer.
    pub fn read_var_uint(&mut self) -> Result<u64, DecodeError> {
        let start = self.pos;
        let mut shift = 0u32;
        let mut result = 0u64;
        loop {
            let byte = self.read_u8()?;
            if shift >= 64 || (shift == 63 && byte & 0x7E != 0) {
                return Err(DecodeError::VarIntOverflow { position: start });
            }
            result |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    fn expect_tag(&mut self, index: u64, wire: WireType) -> Result<(), DecodeError> {
        let position = self.pos;
        let tag = self.read_var_uint()?;
        let actual_index = tag >> 4;
        let actual_type = (tag & 0xF) as u8;
        if actual_index != index || actual_type != wire.code() {
            return Err(DecodeError::TagMismatch {
                position,
                expected_index: index,
                expected_type: wire.code(),
                actual_index,
                actual_type,
            });
        }
        Ok(())
    }

    /// Read an untagged compound id.
    pub fn read_crdt_id(&mut self) -> Result<CrdtId, DecodeError> {
        let part1 = self.read_u8()?;
        let part2 = self.read_var_uint()?;
        Ok(CrdtId { part1, part2 })
    }

    pub fn read_id(&mut self, index: u64) -> Result<CrdtId, DecodeError> {
        self.expect_tag(index, WireType::Id)?;
        self.read_crdt_id()
    }

    pub fn read_u32_tagged(&mut self, index: u64) -> Result<u32, DecodeError> {
        self.expect_tag(index, WireType::Byte4)?;
        self.read_u32()
    }

    pub fn read_i32_tagged(&mut self, index: u64) -> Result<i32, DecodeError> {
        self.expect_tag(index, WireType::Byte4)?;
        self.read_i32()
    }

    pub fn read_f32_tagged(&mut self, index: u64) -> Result<f32, DecodeError> {
        self.expect_tag(index, WireType::Byte4)?;
        self.read_f32()
    }

    pub fn read_f64_tagged(&mut self, index: u64) -> Result<f64, DecodeError> {
        self.expect_tag(index, WireType::Byte8)?;
        self.read_f64()
    }

    /// Read the tag and `u32` length of a sub-block, returning the length.
    pub fn read_sub_block_length(&mut self, index: u64) -> Result<usize, DecodeError> {
        self.expect_tag(index, WireType::Length)?;
        Ok(self.read_u32()? as usize)
    }
}
