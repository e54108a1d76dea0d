//! mszip - Rust decoder for MSZIP-compressed cabinet folders
//!
//! This crate provides a pure Rust implementation of the MSZIP compression method
//! used by Microsoft cabinet (CAB) archives. MSZIP is raw DEFLATE split into data
//! blocks of at most 32KB, each starting with a "CK" marker, where the DEFLATE
//! window carries over from one data block to the next within a folder.
//!
//! # Features
//!
//! - ✅ **Inflate** - stored, fixed-Huffman and dynamic-Huffman blocks
//! - ✅ **Folders** - cross-block window, block ordering, per-file slicing
//! - Data block record parsing and checksum verification
//! - Quantum and LZX folders are recognized and rejected as unsupported
//! - Concurrent multi-folder decoding behind the `async` feature
//!
//! # Example - Folder
//!
//! ```no_run
//! use mszip::{CompressionType, DataBlock, Folder, FolderDecompressor};
//!
//! // Data block records as found in the container
//! let records = std::fs::read("folder0.blocks")?;
//! let blocks = DataBlock::parse_sequence(&records, 3, 0)?;
//! let folder = Folder::new(CompressionType::MsZip, blocks);
//!
//! let decoded = FolderDecompressor::new().decompress(&folder)?;
//! let file = decoded.slice(0, 1024)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Example - Raw DEFLATE
//!
//! ```no_run
//! use mszip::inflate_bytes;
//!
//! let compressed = std::fs::read("data.deflate")?;
//! let decompressed = inflate_bytes(&compressed)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

// Public modules
pub mod checksum;
pub mod common;
pub mod error;
pub mod folder;
pub mod inflate;
pub mod tables;

// Async modules (only available with async feature)
#[cfg(feature = "async")]
pub mod async_batch;

// Re-export commonly used types
pub use common::{
    CabError, ChecksumPolicy, CompressionType, DecodeStats, Result, DATA_BLOCK_HEADER_SIZE,
    MSZIP_MAX_BLOCK_SIZE, MSZIP_SIGNATURE, WINDOW_SIZE,
};
pub use checksum::{checksum, data_block_checksum};
pub use folder::{DataBlock, DecodedFolderStream, Folder, FolderDecompressor};
pub use inflate::{BitReader, BlockDecoder, CanonicalCodeTable, CodeLengthAlphabetDecoder};

// Re-export async types when async feature is enabled
#[cfg(feature = "async")]
pub use async_batch::AsyncFolderProcessor;

// Convenience functions

/// Decompress a standalone raw DEFLATE stream
///
/// # Arguments
/// * `data` - The compressed data
///
/// # Returns
/// A vector containing the decompressed data
pub fn inflate_bytes(data: &[u8]) -> Result<Vec<u8>> {
    inflate::inflate_bytes(data)
}

/// Decompress one folder with the default options
///
/// # Arguments
/// * `folder` - The folder and its data blocks
///
/// # Returns
/// The folder's decoded stream
pub fn decompress_folder(folder: &Folder) -> Result<DecodedFolderStream> {
    FolderDecompressor::new().decompress(folder)
}
