use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Write};

use super::dos_time::DosDateTime;
use super::error::{ArchiveError, Result};

/// "Version needed to extract" and "version made by" written by this crate (2.0).
pub const ZIP_VERSION: u16 = 20;

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

fn expect_signature(cursor: &mut Cursor<&[u8]>, expected: u32) -> Result<()> {
    let offset = cursor.position();
    let found = cursor.read_u32::<LittleEndian>()?;
    if found != expected {
        return Err(ArchiveError::InvalidSignature {
            expected,
            found,
            offset,
        });
    }
    Ok(())
}

/// Local File Header (LFH) - 30 bytes, followed by the name and the data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    pub const SIGNATURE: u32 = 0x0403_4B50;
    pub const SIZE: usize = 30;

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_u32::<LittleEndian>(Self::SIGNATURE)?;
        out.write_u16::<LittleEndian>(self.version_needed)?;
        out.write_u16::<LittleEndian>(self.flags)?;
        out.write_u16::<LittleEndian>(self.compression_method.as_u16())?;
        out.write_u16::<LittleEndian>(self.modified.time)?;
        out.write_u16::<LittleEndian>(self.modified.date)?;
        out.write_u32::<LittleEndian>(self.crc32)?;
        out.write_u32::<LittleEndian>(self.compressed_size)?;
        out.write_u32::<LittleEndian>(self.uncompressed_size)?;
        out.write_u16::<LittleEndian>(self.file_name_length)?;
        out.write_u16::<LittleEndian>(self.extra_field_length)?;
        Ok(())
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        expect_signature(&mut cursor, Self::SIGNATURE)?;

        Ok(Self {
            version_needed: cursor.read_u16::<LittleEndian>()?,
            flags: cursor.read_u16::<LittleEndian>()?,
            compression_method: CompressionMethod::from_u16(cursor.read_u16::<LittleEndian>()?),
            modified: DosDateTime {
                time: cursor.read_u16::<LittleEndian>()?,
                date: cursor.read_u16::<LittleEndian>()?,
            },
            crc32: cursor.read_u32::<LittleEndian>()?,
            compressed_size: cursor.read_u32::<LittleEndian>()?,
            uncompressed_size: cursor.read_u32::<LittleEndian>()?,
            file_name_length: cursor.read_u16::<LittleEndian>()?,
            extra_field_length: cursor.read_u16::<LittleEndian>()?,
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes, followed by the name,
/// extra field and comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
    pub file_comment_length: u16,
    pub disk_number_start: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub local_header_offset: u32,
}

impl CentralDirectoryHeader {
    pub const SIGNATURE: u32 = 0x0201_4B50;
    pub const SIZE: usize = 46;

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_u32::<LittleEndian>(Self::SIGNATURE)?;
        out.write_u16::<LittleEndian>(self.version_made_by)?;
        out.write_u16::<LittleEndian>(self.version_needed)?;
        out.write_u16::<LittleEndian>(self.flags)?;
        out.write_u16::<LittleEndian>(self.compression_method.as_u16())?;
        out.write_u16::<LittleEndian>(self.modified.time)?;
        out.write_u16::<LittleEndian>(self.modified.date)?;
        out.write_u32::<LittleEndian>(self.crc32)?;
        out.write_u32::<LittleEndian>(self.compressed_size)?;
        out.write_u32::<LittleEndian>(self.uncompressed_size)?;
        out.write_u16::<LittleEndian>(self.file_name_length)?;
        out.write_u16::<LittleEndian>(self.extra_field_length)?;
        out.write_u16::<LittleEndian>(self.file_comment_length)?;
        out.write_u16::<LittleEndian>(self.disk_number_start)?;
        out.write_u16::<LittleEndian>(self.internal_attrs)?;
        out.write_u32::<LittleEndian>(self.external_attrs)?;
        out.write_u32::<LittleEndian>(self.local_header_offset)?;
        Ok(())
    }

    pub fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        expect_signature(cursor, Self::SIGNATURE)?;

        Ok(Self {
            version_made_by: cursor.read_u16::<LittleEndian>()?,
            version_needed: cursor.read_u16::<LittleEndian>()?,
            flags: cursor.read_u16::<LittleEndian>()?,
            compression_method: CompressionMethod::from_u16(cursor.read_u16::<LittleEndian>()?),
            modified: DosDateTime {
                time: cursor.read_u16::<LittleEndian>()?,
                date: cursor.read_u16::<LittleEndian>()?,
            },
            crc32: cursor.read_u32::<LittleEndian>()?,
            compressed_size: cursor.read_u32::<LittleEndian>()?,
            uncompressed_size: cursor.read_u32::<LittleEndian>()?,
            file_name_length: cursor.read_u16::<LittleEndian>()?,
            extra_field_length: cursor.read_u16::<LittleEndian>()?,
            file_comment_length: cursor.read_u16::<LittleEndian>()?,
            disk_number_start: cursor.read_u16::<LittleEndian>()?,
            internal_attrs: cursor.read_u16::<LittleEndian>()?,
            external_attrs: cursor.read_u32::<LittleEndian>()?,
            local_header_offset: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: u32 = 0x0605_4B50;
    pub const SIZE: usize = 22;

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_u32::<LittleEndian>(Self::SIGNATURE)?;
        out.write_u16::<LittleEndian>(self.disk_number)?;
        out.write_u16::<LittleEndian>(self.disk_with_cd)?;
        out.write_u16::<LittleEndian>(self.disk_entries)?;
        out.write_u16::<LittleEndian>(self.total_entries)?;
        out.write_u32::<LittleEndian>(self.cd_size)?;
        out.write_u32::<LittleEndian>(self.cd_offset)?;
        out.write_u16::<LittleEndian>(self.comment_len)?;
        Ok(())
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        expect_signature(&mut cursor, Self::SIGNATURE)?;

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }
}

/// Parsed ZIP file entry information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub modified: DosDateTime,
    pub is_directory: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_header_layout() {
        let header = LocalFileHeader {
            version_needed: ZIP_VERSION,
            flags: 0,
            compression_method: CompressionMethod::Stored,
            modified: DosDateTime {
                time: 0x1234,
                date: 0x5678,
            },
            crc32: 0xCBF4_3926,
            compressed_size: 9,
            uncompressed_size: 9,
            file_name_length: 3,
            extra_field_length: 0,
        };

        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();

        assert_eq!(buf.len(), LocalFileHeader::SIZE);
        assert_eq!(&buf[0..4], b"PK\x03\x04");
        assert_eq!(&buf[4..6], &[20, 0]);
        assert_eq!(&buf[8..10], &[0, 0]);
        assert_eq!(&buf[10..12], &[0x34, 0x12]);
        assert_eq!(&buf[12..14], &[0x78, 0x56]);
        assert_eq!(&buf[14..18], &[0x26, 0x39, 0xF4, 0xCB]);
        assert_eq!(&buf[26..28], &[3, 0]);
        assert_eq!(LocalFileHeader::from_bytes(&buf).unwrap(), header);
    }

    #[test]
    fn eocd_layout() {
        let eocd = EndOfCentralDirectory {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: 2,
            total_entries: 2,
            cd_size: 0x0102,
            cd_offset: 0x0A0B_0C0D,
            comment_len: 0,
        };

        let mut buf = Vec::new();
        eocd.write_to(&mut buf).unwrap();

        assert_eq!(buf.len(), EndOfCentralDirectory::SIZE);
        assert_eq!(&buf[0..4], b"PK\x05\x06");
        assert_eq!(&buf[12..16], &[0x02, 0x01, 0, 0]);
        assert_eq!(&buf[16..20], &[0x0D, 0x0C, 0x0B, 0x0A]);
        assert!(!eocd.is_zip64());
    }

    #[test]
    fn wrong_signature_is_rejected() {
        let buf = [0u8; LocalFileHeader::SIZE];
        let err = LocalFileHeader::from_bytes(&buf).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::InvalidSignature {
                expected,
                found: 0,
                offset: 0,
            } if expected == LocalFileHeader::SIGNATURE
        ));
    }
}
