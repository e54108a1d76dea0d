//! Data block records
//!
//! On disk a data block is an 8-byte little-endian header (checksum,
//! compressed size, uncompressed size), an optional per-cabinet reserved
//! area, then the compressed payload.

use crate::checksum::data_block_checksum;
use crate::{CabError, Result, DATA_BLOCK_HEADER_SIZE};

/// One physical chunk of a folder's compressed data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock {
    /// Offset of the record in the container; blocks decode in this order
    pub offset: u64,
    /// Stored checksum (0 when the writer did not compute one)
    pub checksum: u32,
    /// Payload size in bytes
    pub compressed_size: u16,
    /// Size of the payload once decoded
    pub uncompressed_size: u16,
    /// Per-cabinet reserved bytes
    pub reserved: Vec<u8>,
    /// Compressed bytes
    pub payload: Vec<u8>,
}

impl DataBlock {
    /// Create an in-memory block with no stored checksum
    ///
    /// Fails if the payload does not fit the 16-bit size field.
    pub fn new(payload: Vec<u8>, uncompressed_size: u16) -> Result<Self> {
        let compressed_size = u16::try_from(payload.len()).map_err(|_| {
            CabError::InvalidDataBlock(format!("payload of {} bytes", payload.len()))
        })?;
        Ok(Self {
            offset: 0,
            checksum: 0,
            compressed_size,
            uncompressed_size,
            reserved: Vec::new(),
            payload,
        })
    }

    /// Set the container offset
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Compute and store the checksum
    pub fn with_checksum(mut self) -> Self {
        self.checksum = self.compute_checksum();
        self
    }

    /// Parse one record from the start of `input`
    ///
    /// Returns the block and the number of bytes it occupied.
    pub fn parse(input: &[u8], reserve_size: u8, offset: u64) -> Result<(Self, usize)> {
        let header_end = DATA_BLOCK_HEADER_SIZE + reserve_size as usize;
        if input.len() < header_end {
            return Err(CabError::InvalidDataBlock(format!(
                "header needs {header_end} bytes, {} available",
                input.len()
            )));
        }

        let checksum = u32::from_le_bytes([input[0], input[1], input[2], input[3]]);
        let compressed_size = u16::from_le_bytes([input[4], input[5]]);
        let uncompressed_size = u16::from_le_bytes([input[6], input[7]]);
        let reserved = input[DATA_BLOCK_HEADER_SIZE..header_end].to_vec();

        let end = header_end + compressed_size as usize;
        if input.len() < end {
            return Err(CabError::InvalidDataBlock(format!(
                "payload of {compressed_size} bytes truncated to {}",
                input.len() - header_end
            )));
        }

        let block = Self {
            offset,
            checksum,
            compressed_size,
            uncompressed_size,
            reserved,
            payload: input[header_end..end].to_vec(),
        };
        Ok((block, end))
    }

    /// Parse `count` consecutive records; offsets are relative to `input`
    pub fn parse_sequence(input: &[u8], count: usize, reserve_size: u8) -> Result<Vec<Self>> {
        // Every record needs at least a header, so a larger count cannot succeed
        let mut blocks = Vec::with_capacity(count.min(input.len() / DATA_BLOCK_HEADER_SIZE));
        let mut pos = 0usize;
        for _ in 0..count {
            let (block, used) = Self::parse(&input[pos..], reserve_size, pos as u64)?;
            blocks.push(block);
            pos += used;
        }
        Ok(blocks)
    }

    /// Serialize the record in its on-disk layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(DATA_BLOCK_HEADER_SIZE + self.reserved.len() + self.payload.len());
        out.extend_from_slice(&self.checksum.to_le_bytes());
        out.extend_from_slice(&self.compressed_size.to_le_bytes());
        out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        out.extend_from_slice(&self.reserved);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Checksum computed over the payload and size fields
    pub fn compute_checksum(&self) -> u32 {
        data_block_checksum(&self.payload, self.compressed_size, self.uncompressed_size)
    }

    /// True when a checksum is stored
    pub fn has_checksum(&self) -> bool {
        self.checksum != 0
    }

    /// Offset of the payload within the container
    pub fn payload_offset(&self) -> u64 {
        self.offset + (DATA_BLOCK_HEADER_SIZE + self.reserved.len()) as u64
    }
}
