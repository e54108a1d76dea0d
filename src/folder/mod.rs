//! Cabinet folders
//!
//! A folder groups the data blocks that share one compression context. Its
//! blocks decode into a single logical stream from which individual files
//! are sliced by (offset, length).

mod data_block;
mod decompressor;

pub use data_block::DataBlock;
pub use decompressor::FolderDecompressor;

use crate::{CabError, CompressionType, DecodeStats, Result};

/// One logical folder: a compression method and its ordered data blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    /// Position of the folder in the container, used in error reports
    pub index: u16,
    /// Compression method shared by every block
    pub compression: CompressionType,
    /// Data blocks, decoded in ascending `offset` order
    pub blocks: Vec<DataBlock>,
}

impl Folder {
    /// Create folder 0 with the given method and blocks
    pub fn new(compression: CompressionType, blocks: Vec<DataBlock>) -> Self {
        Self {
            index: 0,
            compression,
            blocks,
        }
    }

    /// Set the folder index
    pub fn with_index(mut self, index: u16) -> Self {
        self.index = index;
        self
    }

    /// Sum of the blocks' uncompressed sizes
    pub fn uncompressed_size(&self) -> usize {
        self.blocks
            .iter()
            .map(|block| block.uncompressed_size as usize)
            .sum()
    }
}

/// The decoded bytes of one folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFolderStream {
    data: Vec<u8>,
    block_offsets: Vec<usize>,
    stats: DecodeStats,
}

impl DecodedFolderStream {
    pub(crate) fn new(data: Vec<u8>, block_offsets: Vec<usize>, stats: DecodeStats) -> Self {
        Self {
            data,
            block_offsets,
            stats,
        }
    }

    /// The whole decoded stream
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the stream, returning its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Decoded length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the folder decoded to nothing
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Stream offset at which each data block's output starts, in decode order
    pub fn block_offsets(&self) -> &[usize] {
        &self.block_offsets
    }

    /// Decode statistics for the folder
    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Bytes of one file stored at `offset` with `length` bytes
    pub fn slice(&self, offset: usize, length: usize) -> Result<&[u8]> {
        offset
            .checked_add(length)
            .filter(|&end| end <= self.data.len())
            .map(|end| &self.data[offset..end])
            .ok_or(CabError::RangeOutOfBounds {
                offset,
                length,
                available: self.data.len(),
            })
    }
}

impl AsRef<[u8]> for DecodedFolderStream {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
