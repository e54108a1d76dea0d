//! Cabinet data-block checksum
//!
//! The checksum XORs the input as little-endian 32-bit words. A trailing
//! partial word is folded in with its first byte most significant.

/// Fold `data` into `seed`
pub fn checksum(data: &[u8], seed: u32) -> u32 {
    let mut sum = seed;
    let mut words = data.chunks_exact(4);
    for word in words.by_ref() {
        sum ^= u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
    }

    let tail = words
        .remainder()
        .iter()
        .fold(0u32, |acc, &byte| (acc << 8) | byte as u32);
    sum ^ tail
}

/// Checksum of a data block as stored in its header
///
/// Covers the payload, then the compressed and uncompressed size fields.
pub fn data_block_checksum(payload: &[u8], compressed_size: u16, uncompressed_size: u16) -> u32 {
    let mut sizes = [0u8; 4];
    sizes[..2].copy_from_slice(&compressed_size.to_le_bytes());
    sizes[2..].copy_from_slice(&uncompressed_size.to_le_bytes());
    checksum(&sizes, checksum(payload, 0))
}
