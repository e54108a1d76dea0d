//! Folder decompression
//!
//! Decodes a folder's data blocks in order into one output buffer. For MSZIP
//! that buffer doubles as the DEFLATE window, so a back-reference in one data
//! block may copy bytes produced by any earlier block of the same folder.

use super::{DataBlock, DecodedFolderStream, Folder};
use crate::inflate::{BitReader, BlockDecoder};
use crate::{CabError, ChecksumPolicy, CompressionType, DecodeStats, Result, MSZIP_SIGNATURE};
use log::{debug, trace, warn};

/// Per-folder codec state
#[derive(Debug)]
enum FolderCodec {
    Store,
    MsZip(BlockDecoder),
}

impl FolderCodec {
    /// Select the codec for a folder; Quantum and LZX are not implemented
    fn for_type(compression: CompressionType) -> Result<Self> {
        match compression {
            CompressionType::None => Ok(FolderCodec::Store),
            CompressionType::MsZip => Ok(FolderCodec::MsZip(BlockDecoder::new())),
            CompressionType::Quantum | CompressionType::Lzx => {
                Err(CabError::UnsupportedCodec(compression))
            }
        }
    }

    /// Decode one data block onto the end of `output`
    ///
    /// On failure, also returns the payload position reached.
    fn decode(
        &mut self,
        block: &DataBlock,
        output: &mut Vec<u8>,
    ) -> std::result::Result<(), (CabError, usize)> {
        match self {
            FolderCodec::Store => {
                output.extend_from_slice(&block.payload);
                Ok(())
            }
            FolderCodec::MsZip(decoder) => {
                let mut reader = BitReader::new(&block.payload);
                // Short payloads peek as zero-padded and fail the comparison
                let found = reader.peek_bits(16) as u16;
                if found != MSZIP_SIGNATURE {
                    return Err((CabError::InvalidSignature { found }, 0));
                }
                reader
                    .consume(16)
                    .and_then(|()| decoder.decode_stream(&mut reader, output))
                    .map_err(|err| (err, reader.byte_position()))
            }
        }
    }

    fn take_stats(&mut self) -> DecodeStats {
        match self {
            FolderCodec::Store => DecodeStats::default(),
            FolderCodec::MsZip(decoder) => decoder.take_stats(),
        }
    }
}

/// Decompresses whole folders
#[derive(Debug, Clone, Default)]
pub struct FolderDecompressor {
    checksum_policy: ChecksumPolicy,
}

impl FolderDecompressor {
    /// Create a decompressor that warns about checksum mismatches
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how data block checksums are handled
    pub fn with_checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.checksum_policy = policy;
        self
    }

    /// Current checksum policy
    pub fn checksum_policy(&self) -> ChecksumPolicy {
        self.checksum_policy
    }

    /// Decode every data block of `folder` into one stream
    ///
    /// Either the whole folder decodes or the call fails; there is no
    /// partial output.
    pub fn decompress(&self, folder: &Folder) -> Result<DecodedFolderStream> {
        let mut codec = FolderCodec::for_type(folder.compression)?;

        // Stable sort: blocks sharing an offset keep their list order
        let mut order: Vec<(usize, &DataBlock)> = folder.blocks.iter().enumerate().collect();
        order.sort_by_key(|(_, block)| block.offset);

        debug!(
            "Decompressing folder {} ({}, {} data blocks, {} bytes expected)",
            folder.index,
            folder.compression,
            order.len(),
            folder.uncompressed_size()
        );

        let mut output = Vec::with_capacity(folder.uncompressed_size());
        let mut block_offsets = Vec::with_capacity(order.len());
        let mut stats = DecodeStats::default();

        for (index, block) in order {
            let start = output.len();
            block_offsets.push(start);
            trace!(
                "Folder {} block {}: {} -> {} bytes at offset {}",
                folder.index,
                index,
                block.compressed_size,
                block.uncompressed_size,
                block.offset
            );

            let wrap = |source: CabError, position: usize| CabError::Block {
                folder: folder.index,
                block: index,
                offset: block.payload_offset() + position as u64,
                source: Box::new(source),
            };

            self.verify_checksum(block, &mut stats)
                .map_err(|err| wrap(err, 0))?;
            codec
                .decode(block, &mut output)
                .map_err(|(err, position)| wrap(err, position))?;

            let actual = output.len() - start;
            if actual != block.uncompressed_size as usize {
                return Err(wrap(
                    CabError::UncompressedSizeMismatch {
                        expected: block.uncompressed_size as usize,
                        actual,
                    },
                    block.payload.len(),
                ));
            }
        }

        stats.merge(&codec.take_stats());
        stats.bytes_out = output.len();
        debug!(
            "Folder {} decoded to {} bytes ({} DEFLATE blocks, {} matches)",
            folder.index,
            output.len(),
            stats.blocks(),
            stats.match_count
        );

        Ok(DecodedFolderStream::new(output, block_offsets, stats))
    }

    /// Decode several independent folders one after another
    pub fn decompress_all(&self, folders: &[Folder]) -> Result<Vec<DecodedFolderStream>> {
        folders.iter().map(|folder| self.decompress(folder)).collect()
    }

    fn verify_checksum(&self, block: &DataBlock, stats: &mut DecodeStats) -> Result<()> {
        if self.checksum_policy == ChecksumPolicy::Skip || !block.has_checksum() {
            return Ok(());
        }

        let actual = block.compute_checksum();
        if actual == block.checksum {
            return Ok(());
        }

        match self.checksum_policy {
            ChecksumPolicy::Enforce => Err(CabError::ChecksumMismatch {
                expected: block.checksum,
                actual,
            }),
            _ => {
                warn!(
                    "Data block at offset {} has checksum {:08X}, computed {:08X}",
                    block.offset, block.checksum, actual
                );
                stats.checksum_mismatches += 1;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Final fixed-Huffman block holding only literals
    fn fixed_literals(text: &[u8]) -> Vec<u8> {
        let mut bits: Vec<(u32, u32)> = vec![(1, 1), (1, 2)];
        for &byte in text.iter() {
            bits.push(fixed_code(byte as u16));
        }
        bits.push(fixed_code(256));
        pack(&bits)
    }

    /// Fixed code for literals 0..=143 and end-of-block, already bit-reversed
    fn fixed_code(symbol: u16) -> (u32, u32) {
        let (code, len) = match symbol {
            0..=143 => (0x30 + symbol as u32, 8),
            256 => (0, 7),
            _ => unimplemented!("symbol {symbol}"),
        };
        ((code as u16).reverse_bits() as u32 >> (16 - len), len)
    }

    fn pack(fields: &[(u32, u32)]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut acc = 0u64;
        let mut n = 0u32;
        for &(value, len) in fields {
            acc |= (value as u64) << n;
            n += len;
            while n >= 8 {
                out.push(acc as u8);
                acc >>= 8;
                n -= 8;
            }
        }
        if n > 0 {
            out.push(acc as u8);
        }
        out
    }

    fn mszip_block(text: &[u8]) -> DataBlock {
        let mut payload = b"CK".to_vec();
        payload.extend_from_slice(&fixed_literals(text));
        DataBlock::new(payload, text.len() as u16).unwrap()
    }

    #[test]
    fn test_store_folder() {
        let folder = Folder::new(
            CompressionType::None,
            vec![
                DataBlock::new(b"hello ".to_vec(), 6).unwrap(),
                DataBlock::new(b"world".to_vec(), 5).unwrap(),
            ],
        );
        let decoded = FolderDecompressor::new().decompress(&folder).unwrap();
        assert_eq!(decoded.as_bytes(), b"hello world");
        assert_eq!(decoded.block_offsets(), &[0, 6]);
    }

    #[test]
    fn test_mszip_literal_blocks() {
        let folder = Folder::new(
            CompressionType::MsZip,
            vec![mszip_block(b"abc"), mszip_block(b"def")],
        );
        let decoded = FolderDecompressor::new().decompress(&folder).unwrap();
        assert_eq!(decoded.as_bytes(), b"abcdef");
        assert_eq!(decoded.stats().fixed_blocks, 2);
        assert_eq!(decoded.stats().literal_count, 6);
        assert_eq!(decoded.stats().bytes_out, 6);
    }

    #[test]
    fn test_blocks_follow_offset_order() {
        let folder = Folder::new(
            CompressionType::MsZip,
            vec![
                mszip_block(b"second").with_offset(200),
                mszip_block(b"first ").with_offset(100),
            ],
        );
        let decoded = FolderDecompressor::new().decompress(&folder).unwrap();
        assert_eq!(decoded.as_bytes(), b"first second");
    }

    #[test]
    fn test_missing_signature() {
        let mut block = mszip_block(b"abc");
        block.payload[0] = b'X';
        let folder = Folder::new(CompressionType::MsZip, vec![block]).with_index(3);

        let err = FolderDecompressor::new().decompress(&folder).unwrap_err();
        assert!(matches!(
            err,
            CabError::Block {
                folder: 3,
                block: 0,
                ..
            }
        ));
        assert!(matches!(
            err.root_cause(),
            CabError::InvalidSignature { found: 0x4B58 }
        ));
    }

    #[test]
    fn test_empty_payload_has_no_signature() {
        let folder = Folder::new(
            CompressionType::MsZip,
            vec![DataBlock::new(Vec::new(), 0).unwrap()],
        );
        let err = FolderDecompressor::new().decompress(&folder).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            CabError::InvalidSignature { .. }
        ));
    }

    #[test]
    fn test_size_mismatch() {
        let mut block = mszip_block(b"abc");
        block.uncompressed_size = 4;
        let folder = Folder::new(CompressionType::MsZip, vec![block]);
        let err = FolderDecompressor::new().decompress(&folder).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            CabError::UncompressedSizeMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_unsupported_codecs() {
        for compression in [CompressionType::Quantum, CompressionType::Lzx] {
            let folder = Folder::new(
                compression,
                vec![DataBlock::new(b"opaque".to_vec(), 6).unwrap()],
            );
            let err = FolderDecompressor::new().decompress(&folder).unwrap_err();
            assert!(matches!(err, CabError::UnsupportedCodec(c) if c == compression));
        }
    }

    #[test]
    fn test_checksum_policies() {
        let mut block = mszip_block(b"abc").with_checksum();
        block.checksum ^= 1;
        let folder = Folder::new(CompressionType::MsZip, vec![block]);

        let decoded = FolderDecompressor::new().decompress(&folder).unwrap();
        assert_eq!(decoded.as_bytes(), b"abc");
        assert_eq!(decoded.stats().checksum_mismatches, 1);

        let decoded = FolderDecompressor::new()
            .with_checksum_policy(ChecksumPolicy::Skip)
            .decompress(&folder)
            .unwrap();
        assert_eq!(decoded.stats().checksum_mismatches, 0);

        let err = FolderDecompressor::new()
            .with_checksum_policy(ChecksumPolicy::Enforce)
            .decompress(&folder)
            .unwrap_err();
        assert!(matches!(
            err.root_cause(),
            CabError::ChecksumMismatch { .. }
        ));
    }

    #[test]
    fn test_valid_checksum_enforced() {
        let folder = Folder::new(
            CompressionType::MsZip,
            vec![mszip_block(b"xyz").with_checksum()],
        );
        let decoded = FolderDecompressor::new()
            .with_checksum_policy(ChecksumPolicy::Enforce)
            .decompress(&folder)
            .unwrap();
        assert_eq!(decoded.as_bytes(), b"xyz");
    }

    #[test]
    fn test_error_offset_points_into_payload() {
        // Reserved block type right after the signature
        let payload = vec![b'C', b'K', 0b111];
        let block = DataBlock::new(payload, 1).unwrap().with_offset(1000);
        let folder = Folder::new(CompressionType::MsZip, vec![block]);
        match FolderDecompressor::new().decompress(&folder).unwrap_err() {
            CabError::Block { offset, source, .. } => {
                assert_eq!(offset, 1000 + 8 + 3);
                assert!(matches!(*source, CabError::ReservedBlockType));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_decompress_all() {
        let folders = vec![
            Folder::new(CompressionType::MsZip, vec![mszip_block(b"one")]),
            Folder::new(
                CompressionType::None,
                vec![DataBlock::new(b"two".to_vec(), 3).unwrap()],
            )
            .with_index(1),
        ];
        let decoded = FolderDecompressor::new().decompress_all(&folders).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].as_bytes(), b"one");
        assert_eq!(decoded[1].as_bytes(), b"two");
    }
}
