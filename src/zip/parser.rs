//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory Record (EOCDR) near the file's end
//! 2. Walk the Central Directory one header at a time
//! 3. For extraction, read the member's Local File Header and data
//!
//! Only the fixed-size part of one header and one file name are held in
//! memory at a time, so archives with very large central directories are
//! scanned in constant space.

use std::ops::ControlFlow;

use log::{debug, trace};

use crate::io::ReadAt;

use super::error::ZipError;
use super::structures::*;

/// Maximum number of trailing bytes searched for the EOCDR.
///
/// Archive comments longer than this are not supported.
pub const EOCDR_SEARCH_WINDOW: u64 = 4096 + EndOfCentralDirectoryRecord::SIZE as u64;

/// Longest file name accepted in a Central Dir header.
pub const MAX_FILE_NAME_LEN: usize = 255;

/// Low-level ZIP file parser.
///
/// Generic over the reader so that a file, an in-memory buffer, or a
/// borrowed reader (`&R`) can back it.
///
/// ## Usage
///
/// Typically used through [`ZipExtractor`](super::ZipExtractor)
/// rather than directly.
///
/// ## Example
///
/// ```ignore
/// let parser = ZipParser::new(reader);
/// let (eocdr, _) = parser.find_eocd()?;
/// let header = parser.find_entry(&eocdr, b"content.xml")?;
/// ```
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: R,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    /// Create a new parser for the given reader.
    pub fn new(reader: R) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Total size of the archive in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Find and parse the End of Central Directory Record.
    ///
    /// The record is located at the end of the ZIP file. This method
    /// handles both the simple case (no comment) and archives with
    /// comments by searching backwards for the signature through the
    /// last [`EOCDR_SEARCH_WINDOW`] bytes. A candidate is only accepted
    /// when its comment length accounts for exactly the bytes after it.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCDR, offset of EOCDR in file).
    ///
    /// # Errors
    ///
    /// [`ZipError::EocdrNotFound`] if no candidate matches,
    /// [`ZipError::MultiDisk`] for split archives, and
    /// [`ZipError::CentralDirOutOfBounds`] if the central directory cannot
    /// lie before the record.
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectoryRecord, u64), ZipError> {
        let (eocdr, offset) = self.locate_eocd()?;
        eocdr.validate_single_disk()?;

        let cd_end = eocdr.cd_offset as u64 + eocdr.cd_size as u64;
        if cd_end > offset {
            return Err(ZipError::CentralDirOutOfBounds {
                offset: eocdr.cd_offset as u64,
                size: eocdr.cd_size as u64,
                eocdr_offset: offset,
            });
        }

        debug!(
            "EOCDR at {offset}: {} entries, central dir {} bytes at {}",
            eocdr.total_entries, eocdr.cd_size, eocdr.cd_offset
        );
        Ok((eocdr, offset))
    }

    fn locate_eocd(&self) -> Result<(EndOfCentralDirectoryRecord, u64), ZipError> {
        const SIZE: usize = EndOfCentralDirectoryRecord::SIZE;
        let signature = EndOfCentralDirectoryRecord::SIGNATURE.to_le_bytes();

        if self.size < SIZE as u64 {
            return Err(ZipError::EocdrNotFound);
        }

        // Common case first: no archive comment.
        let offset = self.size - SIZE as u64;
        let mut buf = [0u8; SIZE];
        self.reader
            .read_exact_at(offset, &mut buf)
            .map_err(|e| ZipError::io("read End-Of-Central-Dir Record", e))?;
        if buf[0..4] == signature && buf[20..22] == [0, 0] {
            let eocdr = EndOfCentralDirectoryRecord::from_bytes(&buf, offset)?;
            return Ok((eocdr, offset));
        }

        let search_size = EOCDR_SEARCH_WINDOW.min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.reader
            .read_exact_at(search_start, &mut buf)
            .map_err(|e| ZipError::io("read archive tail", e))?;

        for i in (0..=buf.len() - SIZE).rev() {
            if buf[i..i + 4] != signature {
                continue;
            }
            let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;
            if comment_len == buf.len() - i - SIZE {
                let offset = search_start + i as u64;
                trace!("EOCDR candidate at {offset} with {comment_len} byte comment");
                let eocdr = EndOfCentralDirectoryRecord::from_bytes(&buf[i..i + SIZE], offset)?;
                return Ok((eocdr, offset));
            }
        }

        Err(ZipError::EocdrNotFound)
    }

    /// Walk the Central Directory, handing each header to `f`.
    ///
    /// Iteration stops early when `f` returns [`ControlFlow::Break`], and the
    /// break value is returned as `Some`. `Ok(None)` means every entry was
    /// visited.
    ///
    /// # Errors
    ///
    /// Fails on a bad header signature, a file name longer than
    /// [`MAX_FILE_NAME_LEN`], or a read error.
    pub fn for_each_entry<T, F>(
        &self,
        eocdr: &EndOfCentralDirectoryRecord,
        mut f: F,
    ) -> Result<Option<T>, ZipError>
    where
        F: FnMut(CentralDirectoryHeader) -> ControlFlow<T>,
    {
        let mut offset = eocdr.cd_offset as u64;
        let mut fixed = [0u8; CentralDirectoryHeader::SIZE];

        for _ in 0..eocdr.total_entries {
            self.reader
                .read_exact_at(offset, &mut fixed)
                .map_err(|e| ZipError::io("read Central Dir header", e))?;
            let mut header = CentralDirectoryHeader::from_bytes(&fixed, offset)?;

            let name_len = header.file_name_len as usize;
            if name_len > MAX_FILE_NAME_LEN {
                return Err(ZipError::FileNameTooLong {
                    len: name_len,
                    max: MAX_FILE_NAME_LEN,
                });
            }

            let mut name = vec![0u8; name_len];
            self.reader
                .read_exact_at(offset + CentralDirectoryHeader::SIZE as u64, &mut name)
                .map_err(|e| ZipError::io("read file name", e))?;
            header.file_name = name;

            offset += header.record_len();
            if let ControlFlow::Break(value) = f(header) {
                return Ok(Some(value));
            }
        }

        Ok(None)
    }

    /// Look up a member by its exact (byte-wise) name.
    pub fn find_entry(
        &self,
        eocdr: &EndOfCentralDirectoryRecord,
        name: &[u8],
    ) -> Result<Option<CentralDirectoryHeader>, ZipError> {
        self.for_each_entry(eocdr, |header| {
            if header.file_name == name {
                ControlFlow::Break(header)
            } else {
                ControlFlow::Continue(())
            }
        })
    }

    /// List all entries in the archive.
    pub fn list_files(&self) -> Result<Vec<ZipFileEntry>, ZipError> {
        let (eocdr, _) = self.find_eocd()?;
        let mut entries = Vec::with_capacity(eocdr.total_entries as usize);
        self.for_each_entry(&eocdr, |header| {
            entries.push(header.to_entry());
            ControlFlow::<()>::Continue(())
        })?;
        Ok(entries)
    }

    /// Read the Local File Header at `offset`.
    pub fn read_local_header(&self, offset: u64) -> Result<LocalFileHeader, ZipError> {
        let mut buf = [0u8; LocalFileHeader::SIZE];
        self.reader
            .read_exact_at(offset, &mut buf)
            .map_err(|e| ZipError::io("read Local File header", e))?;
        LocalFileHeader::from_bytes(&buf, offset)
    }

    /// Get a reference to the underlying reader.
    pub fn reader(&self) -> &R {
        &self.reader
    }
}
