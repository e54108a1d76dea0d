//! Static DEFLATE tables
//!
//! Length and distance base values with their extra-bit counts (RFC 1951
//! section 3.2.5), the code-length alphabet permutation, and the code lengths
//! of the fixed Huffman codes.

/// First literal/length symbol that encodes a match length
pub const FIRST_LENGTH_SYMBOL: u16 = 257;

/// End-of-block symbol
pub const END_OF_BLOCK: u16 = 256;

/// Number of valid length symbols (257..=285)
pub const LENGTH_CODES: usize = 29;

/// Number of valid distance symbols (0..=29)
pub const DISTANCE_CODES: usize = 30;

/// Base match length for symbols 257..=285
pub const LENGTH_BASE: [u16; LENGTH_CODES] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115,
    131, 163, 195, 227, 258,
];

/// Extra bits following each length symbol
pub const LENGTH_EXTRA_BITS: [u8; LENGTH_CODES] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Base distance for distance codes 0..=29
pub const DISTANCE_BASE: [u16; DISTANCE_CODES] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Extra bits following each distance code
pub const DISTANCE_EXTRA_BITS: [u8; DISTANCE_CODES] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Order in which the code-length alphabet's own lengths are transmitted
pub const CODE_LENGTH_ORDER: [u8; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Size of the code-length (meta) alphabet
pub const CODE_LENGTH_CODES: usize = 19;

/// Literal/length symbols covered by the fixed code (286 and 287 never occur)
pub const FIXED_LITERAL_CODES: usize = 288;

/// Distance symbols covered by the fixed code (30 and 31 never occur)
pub const FIXED_DISTANCE_CODES: usize = 32;

/// Code lengths of the fixed literal/length code
pub const FIXED_LITERAL_LENGTHS: [u8; FIXED_LITERAL_CODES] = fixed_literal_lengths();

/// Code lengths of the fixed distance code
pub const FIXED_DISTANCE_LENGTHS: [u8; FIXED_DISTANCE_CODES] = [5; FIXED_DISTANCE_CODES];

const fn fixed_literal_lengths() -> [u8; FIXED_LITERAL_CODES] {
    let mut lengths = [0u8; FIXED_LITERAL_CODES];
    let mut i = 0;
    while i < FIXED_LITERAL_CODES {
        lengths[i] = match i {
            0..=143 => 8,
            144..=255 => 9,
            256..=279 => 7,
            _ => 8,
        };
        i += 1;
    }
    lengths
}
