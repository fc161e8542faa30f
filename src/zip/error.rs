use std::io;
use thiserror::Error;

use super::structures::HeaderKind;

/// Every way reading or extracting an archive member can fail.
#[derive(Debug, Error)]
pub enum ZipError {
    #[error("failed to {op}: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to find the End-Of-Central-Dir Record")]
    EocdrNotFound,

    #[error(
        "unsupported multi-disk archive (disk {disk}, central dir on disk {cd_disk}, {entries} of {total_entries} entries on this disk)"
    )]
    MultiDisk {
        disk: u16,
        cd_disk: u16,
        entries: u16,
        total_entries: u16,
    },

    #[error("central directory at offset {offset} with size {size} overlaps the End-Of-Central-Dir Record at {eocdr_offset}")]
    CentralDirOutOfBounds {
        offset: u64,
        size: u64,
        eocdr_offset: u64,
    },

    #[error("bad {header} signature at offset {offset}: {found:#010x}")]
    BadSignature {
        header: HeaderKind,
        offset: u64,
        found: u32,
    },

    #[error("too long file name in Central Dir header: {len} bytes (max {max})")]
    FileNameTooLong { len: usize, max: usize },

    #[error("\"{name}\" is encrypted")]
    Encrypted { name: String },

    #[error("unsupported compression method {method} for \"{name}\"")]
    UnsupportedCompression { name: String, method: u16 },

    #[error("compression method of \"{name}\" differs between Local File header ({local}) and Central Dir header ({central})")]
    MethodMismatch { name: String, local: u16, central: u16 },

    #[error("stored entry \"{name}\" has compressed size {compressed} but uncompressed size {uncompressed}")]
    StoredSizeMismatch {
        name: String,
        compressed: u64,
        uncompressed: u64,
    },

    #[error("inflate failed: {0}")]
    Inflate(#[source] flate2::DecompressError),

    #[error("compressed data ended before the end of the deflate stream")]
    InflateTruncated,

    #[error("deflate stream ended with {remaining} bytes of compressed data unread")]
    InflateTrailing { remaining: u64 },

    #[error("CRC mismatch: expected {expected:08x}, computed {actual:08x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("size mismatch: expected {expected} bytes, extracted {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("failed to write extracted data: {0}")]
    Sink(#[source] io::Error),

    #[error("file not found: \"{name}\"")]
    NotFound { name: String },
}

impl ZipError {
    pub(crate) fn io(op: &'static str, source: io::Error) -> Self {
        ZipError::Io { op, source }
    }

    /// The requested member is absent from the central directory.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ZipError::NotFound { .. })
    }

    /// A fixed bound was exceeded rather than the archive being malformed.
    pub fn is_resource_limit(&self) -> bool {
        matches!(self, ZipError::FileNameTooLong { .. })
    }

    /// The member decoded but its contents failed verification.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            ZipError::CrcMismatch { .. } | ZipError::SizeMismatch { .. }
        )
    }

    /// The archive or the sink could not be read or written.
    pub fn is_io(&self) -> bool {
        matches!(self, ZipError::Io { .. } | ZipError::Sink(_))
    }
}
