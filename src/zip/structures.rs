use byteorder::{LittleEndian, ReadBytesExt};
use std::fmt;
use std::io::Cursor;

use super::error::ZipError;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// The three record kinds identified by a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    EndOfCentralDirectory,
    CentralDirectory,
    LocalFile,
}

impl fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HeaderKind::EndOfCentralDirectory => "End-Of-Central-Dir Record",
            HeaderKind::CentralDirectory => "Central Dir header",
            HeaderKind::LocalFile => "Local File header",
        })
    }
}

/// General purpose flag bit 0: entry is encrypted.
pub const FLAG_ENCRYPTED: u16 = 0x0001;

fn check_signature(
    cursor: &mut Cursor<&[u8]>,
    expected: u32,
    header: HeaderKind,
    offset: u64,
) -> Result<(), ZipError> {
    let found = cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| ZipError::io("read record signature", e))?;
    if found != expected {
        return Err(ZipError::BadSignature {
            header,
            offset,
            found,
        });
    }
    Ok(())
}

/// End of Central Directory Record (EOCDR) - 22 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectoryRecord {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectoryRecord {
    pub const SIGNATURE: u32 = 0x06054b50;
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8], offset: u64) -> Result<Self, ZipError> {
        let mut cursor = Cursor::new(data);
        check_signature(&mut cursor, Self::SIGNATURE, HeaderKind::EndOfCentralDirectory, offset)?;

        let read = |e| ZipError::io("read End-Of-Central-Dir Record", e);
        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>().map_err(read)?,
            disk_with_cd: cursor.read_u16::<LittleEndian>().map_err(read)?,
            disk_entries: cursor.read_u16::<LittleEndian>().map_err(read)?,
            total_entries: cursor.read_u16::<LittleEndian>().map_err(read)?,
            cd_size: cursor.read_u32::<LittleEndian>().map_err(read)?,
            cd_offset: cursor.read_u32::<LittleEndian>().map_err(read)?,
            comment_len: cursor.read_u16::<LittleEndian>().map_err(read)?,
        })
    }

    /// Only single-disk archives are supported; nothing else in the record
    /// is trusted until this holds.
    pub fn validate_single_disk(&self) -> Result<(), ZipError> {
        if self.disk_entries != self.total_entries || self.disk_number != self.disk_with_cd {
            return Err(ZipError::MultiDisk {
                disk: self.disk_number,
                cd_disk: self.disk_with_cd,
                entries: self.disk_entries,
                total_entries: self.total_entries,
            });
        }
        Ok(())
    }
}

/// Central Directory File Header (CDFH) - 46 bytes plus variable fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_len: u16,
    pub extra_field_len: u16,
    pub comment_len: u16,
    pub disk_number_start: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub lfh_offset: u32,
    /// Raw name bytes, filled in after the fixed part is read.
    pub file_name: Vec<u8>,
}

impl CentralDirectoryHeader {
    pub const SIGNATURE: u32 = 0x02014b50;
    pub const SIZE: usize = 46;

    /// Parse the fixed-size part; `file_name` is left empty.
    pub fn from_bytes(data: &[u8], offset: u64) -> Result<Self, ZipError> {
        let mut cursor = Cursor::new(data);
        check_signature(&mut cursor, Self::SIGNATURE, HeaderKind::CentralDirectory, offset)?;

        let read = |e| ZipError::io("read Central Dir header", e);
        Ok(Self {
            version_made_by: cursor.read_u16::<LittleEndian>().map_err(read)?,
            version_needed: cursor.read_u16::<LittleEndian>().map_err(read)?,
            flags: cursor.read_u16::<LittleEndian>().map_err(read)?,
            compression_method: cursor.read_u16::<LittleEndian>().map_err(read)?,
            last_mod_time: cursor.read_u16::<LittleEndian>().map_err(read)?,
            last_mod_date: cursor.read_u16::<LittleEndian>().map_err(read)?,
            crc32: cursor.read_u32::<LittleEndian>().map_err(read)?,
            compressed_size: cursor.read_u32::<LittleEndian>().map_err(read)?,
            uncompressed_size: cursor.read_u32::<LittleEndian>().map_err(read)?,
            file_name_len: cursor.read_u16::<LittleEndian>().map_err(read)?,
            extra_field_len: cursor.read_u16::<LittleEndian>().map_err(read)?,
            comment_len: cursor.read_u16::<LittleEndian>().map_err(read)?,
            disk_number_start: cursor.read_u16::<LittleEndian>().map_err(read)?,
            internal_attrs: cursor.read_u16::<LittleEndian>().map_err(read)?,
            external_attrs: cursor.read_u32::<LittleEndian>().map_err(read)?,
            lfh_offset: cursor.read_u32::<LittleEndian>().map_err(read)?,
            file_name: Vec::new(),
        })
    }

    /// Bytes from the start of this header to the start of the next one.
    pub fn record_len(&self) -> u64 {
        Self::SIZE as u64
            + self.file_name_len as u64
            + self.extra_field_len as u64
            + self.comment_len as u64
    }

    pub fn method(&self) -> CompressionMethod {
        CompressionMethod::from_u16(self.compression_method)
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Name with invalid UTF-8 replaced, for display.
    pub fn file_name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.file_name).into_owned()
    }

    pub fn to_entry(&self) -> ZipFileEntry {
        let file_name = self.file_name_lossy();
        ZipFileEntry {
            is_directory: file_name.ends_with('/'),
            file_name,
            compression_method: self.method(),
            compressed_size: self.compressed_size as u64,
            uncompressed_size: self.uncompressed_size as u64,
            crc32: self.crc32,
            lfh_offset: self.lfh_offset as u64,
            last_mod_time: self.last_mod_time,
            last_mod_date: self.last_mod_date,
        }
    }
}

/// Local File Header (LFH) - 30 bytes plus name and extra field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_len: u16,
    pub extra_field_len: u16,
}

impl LocalFileHeader {
    pub const SIGNATURE: u32 = 0x04034b50;
    pub const SIZE: usize = 30;

    pub fn from_bytes(data: &[u8], offset: u64) -> Result<Self, ZipError> {
        let mut cursor = Cursor::new(data);
        check_signature(&mut cursor, Self::SIGNATURE, HeaderKind::LocalFile, offset)?;

        let read = |e| ZipError::io("read Local File header", e);
        Ok(Self {
            version_needed: cursor.read_u16::<LittleEndian>().map_err(read)?,
            flags: cursor.read_u16::<LittleEndian>().map_err(read)?,
            compression_method: cursor.read_u16::<LittleEndian>().map_err(read)?,
            last_mod_time: cursor.read_u16::<LittleEndian>().map_err(read)?,
            last_mod_date: cursor.read_u16::<LittleEndian>().map_err(read)?,
            crc32: cursor.read_u32::<LittleEndian>().map_err(read)?,
            compressed_size: cursor.read_u32::<LittleEndian>().map_err(read)?,
            uncompressed_size: cursor.read_u32::<LittleEndian>().map_err(read)?,
            file_name_len: cursor.read_u16::<LittleEndian>().map_err(read)?,
            extra_field_len: cursor.read_u16::<LittleEndian>().map_err(read)?,
        })
    }

    /// Bytes between the start of this header and the entry's data.
    pub fn data_start(&self) -> u64 {
        Self::SIZE as u64 + self.file_name_len as u64 + self.extra_field_len as u64
    }

    pub fn method(&self) -> CompressionMethod {
        CompressionMethod::from_u16(self.compression_method)
    }
}

/// Parsed ZIP file entry information
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub is_directory: bool,
}

impl ZipFileEntry {
    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn eocdr_bytes(disk: u16, cd_disk: u16, entries: u16, total: u16) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(EndOfCentralDirectoryRecord::SIGNATURE).unwrap();
        buf.write_u16::<LittleEndian>(disk).unwrap();
        buf.write_u16::<LittleEndian>(cd_disk).unwrap();
        buf.write_u16::<LittleEndian>(entries).unwrap();
        buf.write_u16::<LittleEndian>(total).unwrap();
        buf.write_u32::<LittleEndian>(120).unwrap();
        buf.write_u32::<LittleEndian>(4000).unwrap();
        buf.write_u16::<LittleEndian>(0).unwrap();
        buf
    }

    #[test]
    fn test_eocdr_fields() {
        let eocdr = EndOfCentralDirectoryRecord::from_bytes(&eocdr_bytes(0, 0, 3, 3), 0).unwrap();
        assert_eq!(eocdr.total_entries, 3);
        assert_eq!(eocdr.cd_size, 120);
        assert_eq!(eocdr.cd_offset, 4000);
        assert!(eocdr.validate_single_disk().is_ok());
    }

    #[test]
    fn test_eocdr_rejects_multi_disk() {
        let eocdr = EndOfCentralDirectoryRecord::from_bytes(&eocdr_bytes(1, 0, 3, 3), 0).unwrap();
        assert!(matches!(eocdr.validate_single_disk(), Err(ZipError::MultiDisk { .. })));

        let eocdr = EndOfCentralDirectoryRecord::from_bytes(&eocdr_bytes(0, 0, 2, 3), 0).unwrap();
        assert!(matches!(eocdr.validate_single_disk(), Err(ZipError::MultiDisk { .. })));
    }

    #[test]
    fn test_signature_mismatch() {
        let mut bytes = eocdr_bytes(0, 0, 1, 1);
        bytes[3] = 0x07;
        let err = LocalFileHeader::from_bytes(&bytes, 64).unwrap_err();
        assert!(matches!(
            err,
            ZipError::BadSignature {
                header: HeaderKind::LocalFile,
                offset: 64,
                found: 0x07054b50,
            }
        ));
    }

    #[test]
    fn test_dos_timestamp() {
        let entry = ZipFileEntry {
            file_name: "content.xml".to_string(),
            compression_method: CompressionMethod::Deflate,
            compressed_size: 0,
            uncompressed_size: 0,
            crc32: 0,
            lfh_offset: 0,
            // 2024-03-15 13:45:30
            last_mod_time: (13 << 11) | (45 << 5) | 15,
            last_mod_date: (44 << 9) | (3 << 5) | 15,
            is_directory: false,
        };
        assert_eq!(entry.mod_date(), (2024, 3, 15));
        assert_eq!(entry.mod_time(), (13, 45, 30));
    }
}
