//! Canonical Huffman decode tables
//!
//! Codes are assigned from per-symbol bit lengths following RFC 1951
//! section 3.2.2. The table is indexed by the next `lookup_bits` input bits
//! (LSB-first, so codes are stored bit-reversed) and each entry records the
//! symbol together with the number of bits its code actually occupies.

use super::bits::BitReader;
use crate::{CabError, Result};

/// Longest code length DEFLATE allows
pub const MAX_CODE_BITS: usize = 15;

/// Largest alphabet a table accepts (the fixed literal/length alphabet)
pub const MAX_SYMBOLS: usize = 288;

/// One slot of the lookup table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TableEntry {
    symbol: u16,
    /// Bits consumed by the code; 0 marks an unassigned pattern
    length: u8,
}

/// A symbol's canonical code, most significant bit first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalCode {
    /// Code value
    pub code: u16,
    /// Code length in bits
    pub length: u8,
}

/// Decode table built from an array of code lengths
#[derive(Debug, Clone)]
pub struct CanonicalCodeTable {
    entries: Vec<TableEntry>,
    lookup_bits: u32,
    codes: Vec<Option<CanonicalCode>>,
    symbol_count: usize,
    complete: bool,
}

impl CanonicalCodeTable {
    /// Build a table from per-symbol code lengths (0 = unused)
    ///
    /// Over-subscribed lengths are rejected. Under-subscribed lengths
    /// produce a table flagged as incomplete; whether that is acceptable
    /// depends on the alphabet, so the caller decides.
    pub fn build(code_lengths: &[u8]) -> Result<Self> {
        let mut bl_count = [0usize; MAX_CODE_BITS + 1];
        for &len in code_lengths {
            if len as usize > MAX_CODE_BITS {
                return Err(CabError::InvalidCodeLength(len));
            }
            bl_count[len as usize] += 1;
        }
        bl_count[0] = 0;

        let mut left: isize = 1;
        for &count in &bl_count[1..] {
            left = (left << 1).saturating_sub_unsigned(count);
            if left < 0 {
                return Err(CabError::OverSubscribedCode);
            }
        }

        // Symbols are stored as u16 in the table
        if code_lengths.len() > MAX_SYMBOLS {
            return Err(CabError::InvalidBlockHeader(format!(
                "{} code lengths exceed the {MAX_SYMBOLS}-symbol limit",
                code_lengths.len()
            )));
        }

        // Not over-subscribed, so every count fits the 15-bit code space
        let mut next_code = [0u16; MAX_CODE_BITS + 1];
        let mut code = 0u16;
        for len in 1..=MAX_CODE_BITS {
            code = (code + bl_count[len - 1] as u16) << 1;
            next_code[len] = code;
        }

        let lookup_bits = code_lengths.iter().copied().max().unwrap_or(0) as u32;
        let mut entries = vec![TableEntry::default(); 1usize << lookup_bits];
        let mut codes = vec![None; code_lengths.len()];
        let mut symbol_count = 0;

        for (symbol, &len) in code_lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let code = next_code[len as usize];
            next_code[len as usize] += 1;
            codes[symbol] = Some(CanonicalCode { code, length: len });
            symbol_count += 1;

            let entry = TableEntry {
                symbol: symbol as u16,
                length: len,
            };
            let reversed = reverse_bits(code, len as u32) as usize;
            let step = 1usize << len;
            let mut index = reversed;
            while index < entries.len() {
                entries[index] = entry;
                index += step;
            }
        }

        Ok(Self {
            entries,
            lookup_bits,
            codes,
            symbol_count,
            complete: left == 0,
        })
    }

    /// Decode one symbol, consuming exactly the bits of its code
    pub fn decode(&self, reader: &mut BitReader<'_>) -> Result<u16> {
        if self.lookup_bits == 0 {
            return Err(CabError::InvalidHuffmanCode);
        }
        let entry = self.entries[reader.peek_bits(self.lookup_bits) as usize];
        if entry.length == 0 {
            // Either a hole in an incomplete code or zero padding past EOF
            return Err(if reader.bits_remaining() < self.lookup_bits as usize {
                CabError::UnexpectedEof
            } else {
                CabError::InvalidHuffmanCode
            });
        }
        reader.consume(entry.length as u32)?;
        Ok(entry.symbol)
    }

    /// Width of the lookup index in bits (the longest code length)
    pub fn lookup_bits(&self) -> u32 {
        self.lookup_bits
    }

    /// Canonical code assigned to `symbol`, if it is used
    pub fn code(&self, symbol: usize) -> Option<CanonicalCode> {
        self.codes.get(symbol).copied().flatten()
    }

    /// Number of symbols with a nonzero code length
    pub fn symbol_count(&self) -> usize {
        self.symbol_count
    }

    /// True when the lengths use the whole code space
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// Reverse the low `len` bits of `code`
fn reverse_bits(code: u16, len: u32) -> u16 {
    code.reverse_bits() >> (16 - len)
}
