//! ZIP archive parsing and extraction.
//!
//! Reads one member out of a single-disk archive through a random-access
//! [`ReadAt`](crate::io::ReadAt) source.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCDR, file headers, etc.)
//! - [`parser`]: Locating the EOCDR and walking the Central Directory
//! - [`extractor`]: Store/deflate extraction with CRC-32 verification
//! - [`error`]: [`ZipError`] and its classification helpers
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory Record (EOCDR) at the end
//!
//! The EOCDR is read first, then the Central Directory is scanned until the
//! requested name is found. Only that member's Local File header and data
//! are read afterwards.
//!
//! ## Supported Features
//!
//! - STORED (no compression) method
//! - DEFLATE compression method
//! - Archive comments up to 4096 bytes
//!
//! ## Limitations
//!
//! - No ZIP64
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

mod error;
mod extractor;
mod parser;
mod structures;

pub use error::ZipError;
pub use extractor::{IO_CHUNK_SIZE, ZipExtractor};
pub use parser::{EOCDR_SEARCH_WINDOW, MAX_FILE_NAME_LEN, ZipParser};
pub use structures::*;
