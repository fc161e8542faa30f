use std::io::{self, Write};

use crc32fast::Hasher;
use flate2::{Decompress, FlushDecompress, Status};
use log::{debug, trace};

use crate::diag::Diagnostics;
use crate::io::ReadAt;

use super::error::ZipError;
use super::parser::ZipParser;
use super::structures::{CentralDirectoryHeader, CompressionMethod, ZipFileEntry};

/// Size of the buffers used to copy and inflate member data.
pub const IO_CHUNK_SIZE: usize = 8 * 1024;

/// ZIP member extractor.
///
/// Locates one member through the central directory and streams its
/// decompressed bytes to a sink, verifying the recorded size and CRC-32.
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: R) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all entries in the archive
    pub fn list_files(&self, diag: &mut Diagnostics) -> Result<Vec<ZipFileEntry>, ZipError> {
        report(self.parser.list_files(), diag)
    }

    /// Extract the member named `name`, handing its contents to `sink`.
    ///
    /// `sink` is called with each non-empty chunk of output and then once
    /// with an empty slice after the CRC has been verified. If an error is
    /// returned the data already delivered must be discarded; the empty
    /// call is never made in that case.
    ///
    /// Returns the number of bytes extracted. Errors are also written to
    /// `diag`.
    pub fn extract<F>(&self, name: &str, mut sink: F, diag: &mut Diagnostics) -> Result<u64, ZipError>
    where
        F: FnMut(&[u8]) -> io::Result<()>,
    {
        report(self.try_extract(name, &mut sink), diag)
    }

    /// Extract a member into `writer`, flushing it at the end.
    pub fn extract_to_writer<W: Write>(
        &self,
        name: &str,
        writer: &mut W,
        diag: &mut Diagnostics,
    ) -> Result<u64, ZipError> {
        self.extract(
            name,
            |chunk| {
                if chunk.is_empty() {
                    writer.flush()
                } else {
                    writer.write_all(chunk)
                }
            },
            diag,
        )
    }

    /// Extract a member to memory
    pub fn extract_to_vec(&self, name: &str, diag: &mut Diagnostics) -> Result<Vec<u8>, ZipError> {
        let mut data = Vec::new();
        self.extract_to_writer(name, &mut data, diag)?;
        Ok(data)
    }

    fn try_extract(
        &self,
        name: &str,
        sink: &mut dyn FnMut(&[u8]) -> io::Result<()>,
    ) -> Result<u64, ZipError> {
        let (eocdr, _) = self.parser.find_eocd()?;
        let header = self
            .parser
            .find_entry(&eocdr, name.as_bytes())?
            .ok_or_else(|| ZipError::NotFound {
                name: name.to_string(),
            })?;
        self.extract_entry(&header, sink)
    }

    /// Extract the member described by a Central Dir header.
    ///
    /// Sizes and CRC are taken from the central directory; the Local File
    /// header is only used to locate the data and must agree on the
    /// compression method.
    pub fn extract_entry(
        &self,
        header: &CentralDirectoryHeader,
        sink: &mut dyn FnMut(&[u8]) -> io::Result<()>,
    ) -> Result<u64, ZipError> {
        let name = header.file_name_lossy();
        if header.is_encrypted() {
            return Err(ZipError::Encrypted { name });
        }

        let lfh_offset = header.lfh_offset as u64;
        let local = self.parser.read_local_header(lfh_offset)?;
        if local.compression_method != header.compression_method {
            return Err(ZipError::MethodMismatch {
                name,
                local: local.compression_method,
                central: header.compression_method,
            });
        }

        let data_offset = lfh_offset + local.data_start();
        let compressed = header.compressed_size as u64;
        let expected = header.uncompressed_size as u64;
        debug!(
            "extracting \"{name}\": {:?}, {compressed} -> {expected} bytes at {data_offset}",
            header.method()
        );

        let mut hasher = Hasher::new();
        let mut emit = |chunk: &[u8]| -> Result<(), ZipError> {
            hasher.update(chunk);
            sink(chunk).map_err(ZipError::Sink)
        };

        let written = match header.method() {
            CompressionMethod::Stored => {
                if compressed != expected {
                    return Err(ZipError::StoredSizeMismatch {
                        name,
                        compressed,
                        uncompressed: expected,
                    });
                }
                self.copy_stored(data_offset, compressed, &mut emit)?
            }
            CompressionMethod::Deflate => self.inflate(data_offset, compressed, &mut emit)?,
            CompressionMethod::Unknown(method) => {
                return Err(ZipError::UnsupportedCompression { name, method });
            }
        };

        let actual = hasher.finalize();
        if actual != header.crc32 {
            return Err(ZipError::CrcMismatch {
                expected: header.crc32,
                actual,
            });
        }
        if written != expected {
            return Err(ZipError::SizeMismatch {
                expected,
                actual: written,
            });
        }

        sink(&[]).map_err(ZipError::Sink)?;
        Ok(written)
    }

    fn copy_stored(
        &self,
        mut offset: u64,
        len: u64,
        emit: &mut dyn FnMut(&[u8]) -> Result<(), ZipError>,
    ) -> Result<u64, ZipError> {
        let mut buf = vec![0u8; IO_CHUNK_SIZE];
        let mut remaining = len;
        while remaining > 0 {
            let n = remaining.min(IO_CHUNK_SIZE as u64) as usize;
            self.parser
                .reader()
                .read_exact_at(offset, &mut buf[..n])
                .map_err(|e| ZipError::io("read stored data", e))?;
            emit(&buf[..n])?;
            offset += n as u64;
            remaining -= n as u64;
        }
        Ok(len)
    }

    fn inflate(
        &self,
        mut offset: u64,
        len: u64,
        emit: &mut dyn FnMut(&[u8]) -> Result<(), ZipError>,
    ) -> Result<u64, ZipError> {
        let mut decoder = Decompress::new(false);
        let mut input = vec![0u8; IO_CHUNK_SIZE];
        let mut output = vec![0u8; IO_CHUNK_SIZE];
        let mut remaining = len;
        // Unconsumed bytes at the front of `input`.
        let mut pending = 0..0;

        loop {
            if pending.is_empty() && remaining > 0 {
                let n = remaining.min(IO_CHUNK_SIZE as u64) as usize;
                self.parser
                    .reader()
                    .read_exact_at(offset, &mut input[..n])
                    .map_err(|e| ZipError::io("read compressed data", e))?;
                offset += n as u64;
                remaining -= n as u64;
                pending = 0..n;
            }

            let in_before = decoder.total_in();
            let out_before = decoder.total_out();
            let status = decoder
                .decompress(&input[pending.clone()], &mut output, FlushDecompress::None)
                .map_err(ZipError::Inflate)?;
            let consumed = (decoder.total_in() - in_before) as usize;
            let produced = (decoder.total_out() - out_before) as usize;
            pending.start += consumed;

            if produced > 0 {
                emit(&output[..produced])?;
            }

            match status {
                Status::StreamEnd => {
                    let left = remaining + pending.len() as u64;
                    if left > 0 {
                        return Err(ZipError::InflateTrailing { remaining: left });
                    }
                    trace!("inflate done: {} -> {}", decoder.total_in(), decoder.total_out());
                    return Ok(decoder.total_out());
                }
                Status::Ok | Status::BufError => {
                    // No progress possible: all input is gone and the
                    // output buffer was not the limiting factor.
                    if consumed == 0 && produced == 0 && pending.is_empty() && remaining == 0 {
                        return Err(ZipError::InflateTruncated);
                    }
                }
            }
        }
    }
}

fn report<T>(result: Result<T, ZipError>, diag: &mut Diagnostics) -> Result<T, ZipError> {
    if let Err(e) = &result {
        debug!("zip error: {e:?}");
        diag.add(format_args!("zip: {e}"));
    }
    result
}
