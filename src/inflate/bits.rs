//! LSB-first bit reader
//!
//! DEFLATE packs values starting at the least significant bit of each byte.
//! Whole bytes are shifted into a small accumulator on demand; reads that run
//! past the end of the buffer fail instead of producing zero bits.

use crate::{CabError, Result};

/// Largest bit count accepted by [`BitReader::read_bits`]
pub const MAX_READ_BITS: u32 = 24;

/// Sequential bit reader over an in-memory buffer
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Next byte to load into the accumulator
    pos: usize,
    /// Pending bits, next bit in bit 0
    bit_buff: u32,
    /// Number of valid bits in `bit_buff`
    bit_count: u32,
}

impl<'a> BitReader<'a> {
    /// Create a reader positioned at the first bit of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            bit_buff: 0,
            bit_count: 0,
        }
    }

    /// Load bytes until at least `n_bits` are pending or the input runs out
    fn refill(&mut self, n_bits: u32) {
        while self.bit_count < n_bits && self.pos < self.data.len() {
            self.bit_buff |= (self.data[self.pos] as u32) << self.bit_count;
            self.pos += 1;
            self.bit_count += 8;
        }
    }

    /// Read the next `n_bits` bits (0..=24), least significant bit first
    pub fn read_bits(&mut self, n_bits: u32) -> Result<u32> {
        debug_assert!(n_bits <= MAX_READ_BITS);
        if n_bits == 0 {
            return Ok(0);
        }
        let value = self.peek_bits(n_bits);
        self.consume(n_bits)?;
        Ok(value)
    }

    /// Return the next `n_bits` bits without consuming them
    ///
    /// Near the end of input the missing high bits read as zero; use
    /// [`consume`](Self::consume) to find out whether they really exist.
    pub fn peek_bits(&mut self, n_bits: u32) -> u32 {
        debug_assert!(n_bits <= MAX_READ_BITS);
        self.refill(n_bits);
        self.bit_buff & ((1u32 << n_bits) - 1)
    }

    /// Drop `n_bits` previously peeked bits
    pub fn consume(&mut self, n_bits: u32) -> Result<()> {
        self.refill(n_bits);
        if n_bits > self.bit_count {
            return Err(CabError::UnexpectedEof);
        }
        self.bit_buff >>= n_bits;
        self.bit_count -= n_bits;
        Ok(())
    }

    /// Discard the unread bits of the current byte
    pub fn align_to_byte(&mut self) {
        let partial = self.bit_count % 8;
        self.bit_buff >>= partial;
        self.bit_count -= partial;
    }

    /// Align to a byte boundary, then read a little-endian u16
    pub fn read_aligned_u16(&mut self) -> Result<u16> {
        self.align_to_byte();
        Ok(self.read_bits(16)? as u16)
    }

    /// Align to a byte boundary, then append `len` raw bytes to `out`
    pub fn read_aligned_bytes(&mut self, len: usize, out: &mut Vec<u8>) -> Result<()> {
        self.align_to_byte();

        // Bytes already shifted into the accumulator come first
        let mut remaining = len;
        while remaining > 0 && self.bit_count >= 8 {
            out.push(self.bit_buff as u8);
            self.bit_buff >>= 8;
            self.bit_count -= 8;
            remaining -= 1;
        }

        let end = self
            .pos
            .checked_add(remaining)
            .filter(|&end| end <= self.data.len())
            .ok_or(CabError::UnexpectedEof)?;
        out.extend_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(())
    }

    /// Number of input bytes consumed, counting a partially read byte
    pub fn byte_position(&self) -> usize {
        self.pos - (self.bit_count / 8) as usize
    }

    /// Bits left in the input, buffered or not
    pub fn bits_remaining(&self) -> usize {
        (self.data.len() - self.pos) * 8 + self.bit_count as usize
    }

    /// True when every input bit has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.bits_remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lsb_first_order() {
        // 0b1011_0100, 0b0000_0001
        let data = [0xB4, 0x01];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_bits(1).unwrap(), 0);
        assert_eq!(reader.read_bits(2).unwrap(), 0b10);
        assert_eq!(reader.read_bits(3).unwrap(), 0b110);
        // Spans the byte boundary: bits 6,7 of byte 0 then bit 0 of byte 1
        assert_eq!(reader.read_bits(3).unwrap(), 0b110);
        assert_eq!(reader.read_bits(7).unwrap(), 0);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_read_zero_bits() {
        let mut reader = BitReader::new(&[]);
        assert_eq!(reader.read_bits(0).unwrap(), 0);
    }

    #[test]
    fn test_read_24_bits() {
        let data = [0x12, 0x34, 0x56, 0x78];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(4).unwrap(), 0x2);
        assert_eq!(reader.read_bits(24).unwrap(), 0x856341);
        assert_eq!(reader.read_bits(4).unwrap(), 0x7);
    }

    #[test]
    fn test_eof_is_an_error() {
        let data = [0xFF];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(5).unwrap(), 0x1F);
        assert!(matches!(reader.read_bits(4), Err(CabError::UnexpectedEof)));
        // The failed read leaves the remaining bits in place
        assert_eq!(reader.read_bits(3).unwrap(), 0x7);
    }

    #[test]
    fn test_peek_pads_with_zero() {
        let data = [0x81];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.peek_bits(12), 0x81);
        assert!(reader.consume(9).is_err());
        assert!(reader.consume(8).is_ok());
    }

    #[test]
    fn test_align_and_aligned_u16() {
        let data = [0x05, 0x34, 0x12, 0xAA];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.byte_position(), 1);
        assert_eq!(reader.read_aligned_u16().unwrap(), 0x1234);
        assert_eq!(reader.byte_position(), 3);
        assert_eq!(reader.read_bits(8).unwrap(), 0xAA);
    }

    #[test]
    fn test_align_when_already_aligned() {
        let data = [0x01, 0x02];
        let mut reader = BitReader::new(&data);
        reader.align_to_byte();
        assert_eq!(reader.read_bits(8).unwrap(), 0x01);
        reader.align_to_byte();
        assert_eq!(reader.read_bits(8).unwrap(), 0x02);
    }

    #[test]
    fn test_aligned_bytes_after_buffered_data() {
        let data = b"\x03hello world";
        let mut reader = BitReader::new(data);
        assert_eq!(reader.read_bits(2).unwrap(), 0b11);
        // Force extra bytes into the accumulator before the copy
        let _ = reader.peek_bits(24);

        let mut out = Vec::new();
        reader.read_aligned_bytes(5, &mut out).unwrap();
        assert_eq!(out, b"hello");
        reader.read_aligned_bytes(6, &mut out).unwrap();
        assert_eq!(out, b"hello world");
        assert!(reader.is_exhausted());

        assert!(matches!(
            reader.read_aligned_bytes(1, &mut out),
            Err(CabError::UnexpectedEof)
        ));
    }
}
