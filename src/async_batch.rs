//! Async batch processing module
//!
//! Folders share no decoding state, so several of them can be decoded at
//! once. Each folder still decodes sequentially on a blocking worker.

#[cfg(feature = "async")]
/// Concurrent folder decoding with a configurable concurrency limit
pub mod processor {
    use crate::{CabError, ChecksumPolicy, DecodeStats, Folder, FolderDecompressor, Result};
    use bytes::Bytes;
    use futures::stream::{self, StreamExt, TryStreamExt};

    /// Decoded folder produced by the batch processor
    #[derive(Debug, Clone)]
    pub struct DecodedFolder {
        /// Index of the source folder
        pub index: u16,
        /// Decoded bytes, cheap to clone and share
        pub data: Bytes,
        /// Decode statistics
        pub stats: DecodeStats,
    }

    /// Concurrent folder processor
    #[derive(Debug, Clone)]
    pub struct AsyncFolderProcessor {
        concurrency_limit: usize,
        decompressor: FolderDecompressor,
    }

    impl AsyncFolderProcessor {
        /// Create a processor using one worker per CPU
        pub fn new() -> Self {
            Self {
                concurrency_limit: num_cpus::get(),
                decompressor: FolderDecompressor::new(),
            }
        }

        /// Set the concurrency limit
        pub fn with_concurrency(mut self, limit: usize) -> Self {
            self.concurrency_limit = limit.max(1);
            self
        }

        /// Set the checksum policy used for every folder
        pub fn with_checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
            self.decompressor = self.decompressor.with_checksum_policy(policy);
            self
        }

        /// Decode all folders, returning results in input order
        ///
        /// The first failing folder fails the whole batch.
        pub async fn decompress_folders(&self, folders: Vec<Folder>) -> Result<Vec<DecodedFolder>> {
            stream::iter(
                folders
                    .into_iter()
                    .map(move |folder| self.decompress_single(folder)),
            )
            .buffered(self.concurrency_limit)
            .try_collect()
            .await
        }

        /// Stream results as folders finish, in completion order
        pub fn decompress_folders_streaming(
            &self,
            folders: Vec<Folder>,
        ) -> impl futures::Stream<Item = Result<DecodedFolder>> + '_ {
            stream::iter(
                folders
                    .into_iter()
                    .map(move |folder| self.decompress_single(folder)),
            )
            .buffer_unordered(self.concurrency_limit)
        }

        /// Decode one folder on the blocking thread pool
        async fn decompress_single(&self, folder: Folder) -> Result<DecodedFolder> {
            let decompressor = self.decompressor.clone();
            let index = folder.index;
            let decoded = tokio::task::spawn_blocking(move || decompressor.decompress(&folder))
                .await
                .map_err(|e| CabError::Io(std::io::Error::other(e)))??;

            let stats = decoded.stats().clone();
            Ok(DecodedFolder {
                index,
                data: Bytes::from(decoded.into_bytes()),
                stats,
            })
        }
    }

    impl Default for AsyncFolderProcessor {
        fn default() -> Self {
            Self::new()
        }
    }

}

#[cfg(feature = "async")]
pub use processor::{AsyncFolderProcessor, DecodedFolder};
