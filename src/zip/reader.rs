//! In-memory ZIP archive reader.
//!
//! Used to list and verify archives, including the ones produced by
//! [`ZipBuilder`](super::ZipBuilder).
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the buffer's end
//! 2. Read the Central Directory to get metadata for all files
//! 3. For extraction, read each file's Local File Header to find its data

use std::io::Cursor;

use super::crc::crc32;
use super::error::{ArchiveError, Result};
use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: usize = 65535;

/// Reader over a complete archive held in memory.
pub struct ZipReader<'a> {
    data: &'a [u8],
}

impl<'a> ZipReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Handles both the simple case (no comment) and archives with
    /// comments by searching backwards for the signature.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of EOCD in the buffer).
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, usize)> {
        let size = self.data.len();
        if size < EndOfCentralDirectory::SIZE {
            return Err(ArchiveError::EndOfCentralDirectoryNotFound);
        }

        // Common case: no comment, EOCD is the last 22 bytes
        let offset = size - EndOfCentralDirectory::SIZE;
        let tail = &self.data[offset..];
        if tail[0..4] == EndOfCentralDirectory::SIGNATURE.to_le_bytes() && tail[20..22] == [0, 0] {
            return Ok((EndOfCentralDirectory::from_bytes(tail)?, offset));
        }

        // Search backwards, the comment length must match the remaining bytes
        let search_start = size.saturating_sub(MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE);
        for i in (search_start..=offset).rev() {
            if self.data[i..i + 4] != EndOfCentralDirectory::SIGNATURE.to_le_bytes() {
                continue;
            }
            let comment_len = u16::from_le_bytes([self.data[i + 20], self.data[i + 21]]) as usize;
            if comment_len == size - i - EndOfCentralDirectory::SIZE {
                let eocd = EndOfCentralDirectory::from_bytes(&self.data[i..])?;
                return Ok((eocd, i));
            }
        }

        Err(ArchiveError::EndOfCentralDirectoryNotFound)
    }

    /// List all entries in central directory order.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive is invalid, uses ZIP64, or if the
    /// central directory does not fit between the data and the EOCD.
    pub fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        let (eocd, eocd_offset) = self.find_eocd()?;
        if eocd.is_zip64() {
            return Err(ArchiveError::Zip64Unsupported);
        }

        let cd_start = eocd.cd_offset as usize;
        let cd_end = cd_start + eocd.cd_size as usize;
        if cd_end > eocd_offset {
            return Err(ArchiveError::Truncated("central directory".to_string()));
        }

        let mut cursor = Cursor::new(&self.data[cd_start..cd_end]);
        let mut entries = Vec::with_capacity(eocd.total_entries as usize);
        for _ in 0..eocd.total_entries {
            entries.push(self.parse_cdfh(&mut cursor)?);
        }

        Ok(entries)
    }

    /// Parse one Central Directory File Header and the fields after it.
    fn parse_cdfh(&self, cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry> {
        let header = CentralDirectoryHeader::read_from(cursor)?;

        let name_start = cursor.position() as usize;
        let name_end = name_start + header.file_name_length as usize;
        let buf = *cursor.get_ref();
        let file_name_bytes = buf
            .get(name_start..name_end)
            .ok_or_else(|| ArchiveError::Truncated("central directory file name".to_string()))?;
        // Use lossy conversion to handle non-UTF8 filenames gracefully
        let file_name = String::from_utf8_lossy(file_name_bytes).to_string();

        // Skip the name, the extra field and the comment
        let skip = header.file_name_length as u64
            + header.extra_field_length as u64
            + header.file_comment_length as u64;
        cursor.set_position(cursor.position() + skip);

        Ok(ZipFileEntry {
            is_directory: file_name.ends_with('/'),
            file_name,
            compression_method: header.compression_method,
            compressed_size: header.compressed_size as u64,
            uncompressed_size: header.uncompressed_size as u64,
            crc32: header.crc32,
            lfh_offset: header.local_header_offset as u64,
            modified: header.modified,
        })
    }

    /// Offset of the first data byte of `entry`, read from its local header.
    ///
    /// The local header's name and extra field lengths may differ from the
    /// central directory, so they are read from the local header itself.
    pub fn data_offset(&self, entry: &ZipFileEntry) -> Result<usize> {
        let start = entry.lfh_offset as usize;
        let header_bytes = self
            .data
            .get(start..start + LocalFileHeader::SIZE)
            .ok_or_else(|| ArchiveError::Truncated(format!("local header of '{}'", entry.file_name)))?;
        let header = LocalFileHeader::from_bytes(header_bytes).map_err(|e| match e {
            ArchiveError::InvalidSignature {
                expected, found, ..
            } => ArchiveError::InvalidSignature {
                expected,
                found,
                offset: entry.lfh_offset,
            },
            other => other,
        })?;

        Ok(start
            + LocalFileHeader::SIZE
            + header.file_name_length as usize
            + header.extra_field_length as usize)
    }

    /// Borrow the data of a STORED entry after checking its CRC.
    pub fn extract(&self, entry: &ZipFileEntry) -> Result<&'a [u8]> {
        if entry.compression_method != CompressionMethod::Stored {
            return Err(ArchiveError::UnsupportedCompression(
                entry.compression_method.as_u16(),
            ));
        }

        let start = self.data_offset(entry)?;
        let end = start + entry.uncompressed_size as usize;
        let data = self
            .data
            .get(start..end)
            .ok_or_else(|| ArchiveError::Truncated(format!("data of '{}'", entry.file_name)))?;

        let actual = crc32(data);
        if actual != entry.crc32 {
            return Err(ArchiveError::CrcMismatch {
                name: entry.file_name.clone(),
                expected: entry.crc32,
                actual,
            });
        }

        Ok(data)
    }

    /// List every entry and check that its data can be extracted.
    pub fn verify(&self) -> Result<Vec<ZipFileEntry>> {
        let entries = self.list_files()?;
        for entry in &entries {
            self.extract(entry)?;
        }
        Ok(entries)
    }
}
