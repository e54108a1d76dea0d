//! Raw DEFLATE (inflate) implementation
//!
//! This module provides the codec used by MSZIP data blocks: an LSB-first bit
//! reader, canonical Huffman tables, the code-length alphabet decoder and the
//! block decoder that resolves back-references against a caller-owned window.

pub mod bits;
pub mod block;
pub mod huffman;
pub mod lengths;

pub use bits::BitReader;
pub use block::{copy_match, BlockDecoder, BlockHeader, BlockType};
pub use huffman::{CanonicalCode, CanonicalCodeTable};
pub use lengths::CodeLengthAlphabetDecoder;

use crate::Result;

/// Convenience function to decompress a standalone raw DEFLATE stream
///
/// Decoding stops after the block carrying the final flag; trailing bytes
/// are ignored.
pub fn inflate_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut reader = BitReader::new(data);
    let mut output = Vec::new();
    BlockDecoder::new().decode_stream(&mut reader, &mut output)?;
    Ok(output)
}
