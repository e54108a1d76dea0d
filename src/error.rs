//! Error handling for MSZIP operations
//!
//! This module defines the error types used throughout the decoder.
//! It uses thiserror for ergonomic error handling and provides context-specific
//! error variants, including the per-block context wrapper used by folders.

pub use crate::common::CabError;
pub use crate::common::Result;
