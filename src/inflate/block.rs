//! DEFLATE block decoding
//!
//! Decodes one compressed block at a time into an output buffer that the
//! caller keeps alive across blocks. For MSZIP folders that buffer is the
//! whole folder's output, so back-references can reach into data produced
//! by earlier data blocks.

use super::bits::BitReader;
use super::huffman::CanonicalCodeTable;
use super::lengths::CodeLengthAlphabetDecoder;
use crate::tables::{
    CODE_LENGTH_CODES, CODE_LENGTH_ORDER, DISTANCE_BASE, DISTANCE_CODES, DISTANCE_EXTRA_BITS,
    END_OF_BLOCK, FIRST_LENGTH_SYMBOL, FIXED_DISTANCE_LENGTHS, FIXED_LITERAL_LENGTHS, LENGTH_BASE,
    LENGTH_CODES, LENGTH_EXTRA_BITS,
};
use crate::{CabError, DecodeStats, Result};
use log::{trace, warn};
use std::sync::OnceLock;

/// Largest HLIT + 257 a dynamic header may announce
const MAX_LITERAL_CODES: usize = 286;
/// Largest HDIST + 1 a dynamic header may announce
const MAX_DISTANCE_CODES: usize = 30;

/// The three usable block types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// 00: raw bytes behind LEN/NLEN
    Stored,
    /// 01: fixed Huffman codes
    FixedHuffman,
    /// 10: Huffman codes transmitted in the block
    DynamicHuffman,
}

/// Parsed 3-bit block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Set on the last block of a stream
    pub is_final: bool,
    /// Block encoding
    pub block_type: BlockType,
}

impl BlockHeader {
    /// Read the final flag and the 2-bit type
    pub fn read(reader: &mut BitReader<'_>) -> Result<Self> {
        let is_final = reader.read_bits(1)? == 1;
        let block_type = match reader.read_bits(2)? {
            0 => BlockType::Stored,
            1 => BlockType::FixedHuffman,
            2 => BlockType::DynamicHuffman,
            _ => return Err(CabError::ReservedBlockType),
        };
        Ok(Self {
            is_final,
            block_type,
        })
    }
}

/// Literal/length and distance tables for one Huffman block
#[derive(Debug)]
struct HuffmanTables {
    literal: CanonicalCodeTable,
    distance: CanonicalCodeTable,
}

/// Fixed tables, built on first use and shared by every decoder
fn fixed_tables() -> &'static HuffmanTables {
    static FIXED: OnceLock<HuffmanTables> = OnceLock::new();
    FIXED.get_or_init(|| HuffmanTables {
        literal: CanonicalCodeTable::build(&FIXED_LITERAL_LENGTHS)
            .unwrap_or_else(|_| unreachable!("fixed literal lengths form a complete code")),
        distance: CanonicalCodeTable::build(&FIXED_DISTANCE_LENGTHS)
            .unwrap_or_else(|_| unreachable!("fixed distance lengths form a complete code")),
    })
}

/// Build a literal/length or distance table, rejecting incomplete codes
/// unless at most one symbol is defined
fn build_alphabet(lengths: &[u8], alphabet: &'static str) -> Result<CanonicalCodeTable> {
    let table = CanonicalCodeTable::build(lengths)?;
    if !table.is_complete() && table.symbol_count() > 1 {
        return Err(CabError::IncompleteCode { alphabet });
    }
    Ok(table)
}

/// DEFLATE block decoder
#[derive(Debug, Default)]
pub struct BlockDecoder {
    stats: DecodeStats,
}

impl BlockDecoder {
    /// Create a new decoder with empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics accumulated over every block decoded so far
    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Take the statistics, resetting them
    pub fn take_stats(&mut self) -> DecodeStats {
        std::mem::take(&mut self.stats)
    }

    /// Decode blocks until one with the final flag has been fully decoded
    pub fn decode_stream(&mut self, reader: &mut BitReader<'_>, output: &mut Vec<u8>) -> Result<()> {
        loop {
            let header = self.decode_block(reader, output)?;
            if header.is_final {
                return Ok(());
            }
        }
    }

    /// Decode exactly one block, appending its bytes to `output`
    ///
    /// Every byte already in `output` is valid history for back-references.
    pub fn decode_block(
        &mut self,
        reader: &mut BitReader<'_>,
        output: &mut Vec<u8>,
    ) -> Result<BlockHeader> {
        let header = BlockHeader::read(reader)?;
        let start = output.len();
        trace!(
            "{:?} block (final: {}) at byte {}",
            header.block_type,
            header.is_final,
            reader.byte_position()
        );

        match header.block_type {
            BlockType::Stored => {
                self.decode_stored(reader, output)?;
                self.stats.stored_blocks += 1;
            }
            BlockType::FixedHuffman => {
                self.decode_body(reader, fixed_tables(), output)?;
                self.stats.fixed_blocks += 1;
            }
            BlockType::DynamicHuffman => {
                let tables = Self::read_dynamic_tables(reader)?;
                self.decode_body(reader, &tables, output)?;
                self.stats.dynamic_blocks += 1;
            }
        }

        self.stats.bytes_out += output.len() - start;
        Ok(header)
    }

    /// Copy a stored block; a bad NLEN is reported but not fatal
    fn decode_stored(&mut self, reader: &mut BitReader<'_>, output: &mut Vec<u8>) -> Result<()> {
        let len = reader.read_aligned_u16()?;
        let nlen = reader.read_aligned_u16()?;
        if nlen != !len {
            warn!(
                "Stored block length check failed: LEN={:#06X}, NLEN={:#06X}",
                len, nlen
            );
            self.stats.stored_length_mismatches += 1;
        }
        reader.read_aligned_bytes(len as usize, output)?;
        self.stats.literal_count += len as usize;
        Ok(())
    }

    /// Read the code-length header of a dynamic block and build its tables
    fn read_dynamic_tables(reader: &mut BitReader<'_>) -> Result<HuffmanTables> {
        let literal_count = reader.read_bits(5)? as usize + 257;
        let distance_count = reader.read_bits(5)? as usize + 1;
        let code_length_count = reader.read_bits(4)? as usize + 4;

        if literal_count > MAX_LITERAL_CODES {
            return Err(CabError::InvalidBlockHeader(format!(
                "{literal_count} literal/length codes"
            )));
        }
        if distance_count > MAX_DISTANCE_CODES {
            return Err(CabError::InvalidBlockHeader(format!(
                "{distance_count} distance codes"
            )));
        }

        let mut meta_lengths = [0u8; CODE_LENGTH_CODES];
        for &symbol in CODE_LENGTH_ORDER.iter().take(code_length_count) {
            meta_lengths[symbol as usize] = reader.read_bits(3)? as u8;
        }
        // The meta-alphabet may leave part of its code space unused
        let meta_table = CanonicalCodeTable::build(&meta_lengths)?;

        // Repeats may run from the literal lengths into the distance lengths,
        // so both arrays are decoded as one sequence
        let lengths = CodeLengthAlphabetDecoder::decode(
            reader,
            literal_count + distance_count,
            &meta_table,
        )?;
        let (literal_lengths, distance_lengths) = lengths.split_at(literal_count);

        if literal_lengths[END_OF_BLOCK as usize] == 0 {
            return Err(CabError::InvalidBlockHeader(
                "no code for end-of-block".to_string(),
            ));
        }

        Ok(HuffmanTables {
            literal: build_alphabet(literal_lengths, "literal/length")?,
            distance: build_alphabet(distance_lengths, "distance")?,
        })
    }

    /// Decode literals and matches until end-of-block
    fn decode_body(
        &mut self,
        reader: &mut BitReader<'_>,
        tables: &HuffmanTables,
        output: &mut Vec<u8>,
    ) -> Result<()> {
        loop {
            let symbol = tables.literal.decode(reader)?;

            if symbol < END_OF_BLOCK {
                output.push(symbol as u8);
                self.stats.literal_count += 1;
                continue;
            }
            if symbol == END_OF_BLOCK {
                return Ok(());
            }

            let length_index = (symbol - FIRST_LENGTH_SYMBOL) as usize;
            if length_index >= LENGTH_CODES {
                return Err(CabError::InvalidLengthSymbol(symbol));
            }
            let length = LENGTH_BASE[length_index] as usize
                + reader.read_bits(LENGTH_EXTRA_BITS[length_index] as u32)? as usize;

            let distance_symbol = tables.distance.decode(reader)?;
            let distance_index = distance_symbol as usize;
            if distance_index >= DISTANCE_CODES {
                return Err(CabError::InvalidDistanceSymbol(distance_symbol));
            }
            let distance = DISTANCE_BASE[distance_index] as usize
                + reader.read_bits(DISTANCE_EXTRA_BITS[distance_index] as u32)? as usize;

            copy_match(output, distance, length)?;
            self.stats.match_count += 1;
            self.stats.longest_match = self.stats.longest_match.max(length);
        }
    }
}

/// Append `length` bytes starting `distance` bytes back from the end of `output`
///
/// When `distance < length` the source overlaps the bytes being written and
/// the copy repeats the last `distance` bytes.
pub fn copy_match(output: &mut Vec<u8>, distance: usize, length: usize) -> Result<()> {
    let available = output.len();
    if distance == 0 || distance > available {
        return Err(CabError::DistanceOutOfRange {
            distance,
            available,
        });
    }

    let start = available - distance;
    if distance >= length {
        output.extend_from_within(start..start + length);
    } else {
        output.reserve(length);
        for i in 0..length {
            let byte = output[start + i];
            output.push(byte);
        }
    }
    Ok(())
}
