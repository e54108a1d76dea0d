//! Common types and constants for MSZIP folder decompression
//!
//! This module defines the core types, constants, and error type shared by the
//! DEFLATE block decoder (inflate) and the per-folder orchestration layer.

use thiserror::Error;

/// Compression method of a cabinet folder
///
/// The container stores the method in the low nibble of a 16-bit tag; the
/// upper bits carry codec parameters (window size, level) that only the
/// unimplemented codecs would need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionType {
    /// Data blocks are stored verbatim
    None = 0,
    /// MSZIP: raw DEFLATE with a "CK" marker per data block
    MsZip = 1,
    /// Quantum (recognized, not implemented)
    Quantum = 2,
    /// LZX (recognized, not implemented)
    Lzx = 3,
}

impl CompressionType {
    /// Mask selecting the method bits of a raw compression tag
    pub const METHOD_MASK: u16 = 0x000F;

    /// Create a CompressionType from a raw container tag
    pub fn from_raw(value: u16) -> Result<Self> {
        match value & Self::METHOD_MASK {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::MsZip),
            2 => Ok(CompressionType::Quantum),
            3 => Ok(CompressionType::Lzx),
            _ => Err(CabError::InvalidCompressionType(value)),
        }
    }

    /// Human-readable codec name
    pub fn name(&self) -> &'static str {
        match self {
            CompressionType::None => "none",
            CompressionType::MsZip => "MSZIP",
            CompressionType::Quantum => "Quantum",
            CompressionType::Lzx => "LZX",
        }
    }
}

impl std::fmt::Display for CompressionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What to do with a data block whose stored checksum does not match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumPolicy {
    /// Never compute checksums
    Skip,
    /// Log mismatches and keep decoding
    #[default]
    Warn,
    /// Fail the folder on a mismatch
    Enforce,
}

/// Error type for MSZIP operations
#[derive(Debug, Error)]
pub enum CabError {
    /// Ran out of input bits before the expected data
    #[error("Unexpected end of input")]
    UnexpectedEof,

    /// MSZIP data block does not start with "CK"
    #[error("Invalid MSZIP signature: expected 0x4B43 (\"CK\"), found {found:#06X}")]
    InvalidSignature {
        /// Little-endian value of the first two payload bytes
        found: u16,
    },

    /// Block header with type 11
    #[error("Reserved DEFLATE block type")]
    ReservedBlockType,

    /// Code lengths describe more codes than the bit space allows
    #[error("Over-subscribed Huffman code")]
    OverSubscribedCode,

    /// Code lengths leave parts of the code space unused
    #[error("Incomplete {alphabet} Huffman code")]
    IncompleteCode {
        /// Which alphabet was being built
        alphabet: &'static str,
    },

    /// Code length outside 0..=15
    #[error("Invalid code length: {0}")]
    InvalidCodeLength(u8),

    /// Bit pattern that no symbol owns
    #[error("Invalid Huffman code")]
    InvalidHuffmanCode,

    /// Bad repeat in the code-length alphabet
    #[error("Invalid code-length repeat symbol {symbol} at position {position}")]
    InvalidRepeatSymbol {
        /// Meta-alphabet symbol (16, 17 or 18)
        symbol: u16,
        /// Index in the code-length array where the repeat started
        position: usize,
    },

    /// Dynamic block header fields out of range
    #[error("Invalid block header: {0}")]
    InvalidBlockHeader(String),

    /// Literal/length symbol 286 or 287
    #[error("Invalid length symbol: {0}")]
    InvalidLengthSymbol(u16),

    /// Distance symbol 30 or 31
    #[error("Invalid distance symbol: {0}")]
    InvalidDistanceSymbol(u16),

    /// Back-reference reaching before the start of the folder
    #[error("Distance {distance} exceeds the {available} bytes decoded so far")]
    DistanceOutOfRange {
        /// Requested distance
        distance: usize,
        /// Bytes decoded since the folder start
        available: usize,
    },

    /// Folder uses a recognized but unimplemented codec
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(CompressionType),

    /// Unknown compression tag
    #[error("Invalid compression type: {0:#06X}")]
    InvalidCompressionType(u16),

    /// Decoded data block size differs from its header
    #[error("Uncompressed size mismatch: expected {expected}, got {actual}")]
    UncompressedSizeMismatch {
        /// Size recorded in the data block header
        expected: usize,
        /// Size actually produced
        actual: usize,
    },

    /// Data block checksum mismatch
    #[error("Checksum mismatch: expected {expected:08X}, got {actual:08X}")]
    ChecksumMismatch {
        /// Stored checksum
        expected: u32,
        /// Computed checksum
        actual: u32,
    },

    /// Malformed data block record
    #[error("Invalid data block: {0}")]
    InvalidDataBlock(String),

    /// File range outside the decoded folder stream
    #[error("Range {offset}+{length} is outside the {available}-byte folder stream")]
    RangeOutOfBounds {
        /// Requested start offset
        offset: usize,
        /// Requested length
        length: usize,
        /// Size of the decoded stream
        available: usize,
    },

    /// Failure while decoding one data block of a folder
    #[error("Folder {folder}, data block {block} (offset {offset}): {source}")]
    Block {
        /// Folder index
        folder: u16,
        /// Data block index within the folder
        block: usize,
        /// Container offset of the failure
        offset: u64,
        /// Underlying error
        #[source]
        source: Box<CabError>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CabError {
    /// Innermost error, skipping folder/block context layers
    pub fn root_cause(&self) -> &CabError {
        let mut err = self;
        while let CabError::Block { source, .. } = err {
            err = source.as_ref();
        }
        err
    }
}

/// Result type alias for MSZIP operations
pub type Result<T> = std::result::Result<T, CabError>;

// MSZIP-specific constants

/// "CK" marker at the start of every MSZIP data block, read little-endian
pub const MSZIP_SIGNATURE: u16 = 0x4B43;

/// Largest uncompressed size of one MSZIP data block
pub const MSZIP_MAX_BLOCK_SIZE: usize = 0x8000; // 32KB

/// DEFLATE history window size
pub const WINDOW_SIZE: usize = 0x8000;

/// Size of the fixed part of a data block record
pub const DATA_BLOCK_HEADER_SIZE: usize = 8;

/// Statistics collected while decoding
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecodeStats {
    /// Stored (type 00) blocks decoded
    pub stored_blocks: usize,
    /// Fixed-Huffman (type 01) blocks decoded
    pub fixed_blocks: usize,
    /// Dynamic-Huffman (type 10) blocks decoded
    pub dynamic_blocks: usize,
    /// Number of literal bytes decoded
    pub literal_count: usize,
    /// Number of back-references resolved
    pub match_count: usize,
    /// Longest back-reference
    pub longest_match: usize,
    /// Stored blocks whose NLEN was not the complement of LEN
    pub stored_length_mismatches: usize,
    /// Data blocks whose checksum did not match
    pub checksum_mismatches: usize,
    /// Total bytes produced
    pub bytes_out: usize,
}

impl DecodeStats {
    /// Total number of DEFLATE blocks decoded
    pub fn blocks(&self) -> usize {
        self.stored_blocks + self.fixed_blocks + self.dynamic_blocks
    }

    /// Fold another set of statistics into this one
    pub fn merge(&mut self, other: &DecodeStats) {
        self.stored_blocks += other.stored_blocks;
        self.fixed_blocks += other.fixed_blocks;
        self.dynamic_blocks += other.dynamic_blocks;
        self.literal_count += other.literal_count;
        self.match_count += other.match_count;
        self.longest_match = self.longest_match.max(other.longest_match);
        self.stored_length_mismatches += other.stored_length_mismatches;
        self.checksum_mismatches += other.checksum_mismatches;
        self.bytes_out += other.bytes_out;
    }
}
