//! Stored-method ZIP archive writer.
//!
//! The whole archive is assembled in memory. Local blocks (header, name and
//! data of every entry) are written first, in input order, followed by the
//! central directory and the end of central directory record:
//!
//! ```text
//! [LFH 0][name 0][data 0] ... [LFH n][name n][data n] [CDFH 0..n] [EOCD]
//! ```

use bytes::Bytes;
use chrono::NaiveDateTime;

use super::crc::crc32;
use super::dos_time::DosDateTime;
use super::error::{ArchiveError, Result};
use super::structures::{
    CentralDirectoryHeader, CompressionMethod, EndOfCentralDirectory, LocalFileHeader, ZIP_VERSION,
};

/// One file to place in an archive.
///
/// `name` is written verbatim as the entry name, so it should be a relative,
/// forward-slash separated path. Names must be unique within one archive;
/// the writer does not check this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Bytes,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Values computed for an entry while its local block is written, and
/// repeated in its central directory record.
#[derive(Debug, Clone, Copy)]
struct EntryRecord {
    crc32: u32,
    size: u32,
    modified: DosDateTime,
    local_header_offset: u32,
}

impl EntryRecord {
    fn local_header(&self, file_name_length: u16) -> LocalFileHeader {
        LocalFileHeader {
            version_needed: ZIP_VERSION,
            flags: 0,
            compression_method: CompressionMethod::Stored,
            modified: self.modified,
            crc32: self.crc32,
            compressed_size: self.size,
            uncompressed_size: self.size,
            file_name_length,
            extra_field_length: 0,
        }
    }

    fn central_header(&self, file_name_length: u16) -> CentralDirectoryHeader {
        CentralDirectoryHeader {
            version_made_by: ZIP_VERSION,
            version_needed: ZIP_VERSION,
            flags: 0,
            compression_method: CompressionMethod::Stored,
            modified: self.modified,
            crc32: self.crc32,
            compressed_size: self.size,
            uncompressed_size: self.size,
            file_name_length,
            extra_field_length: 0,
            file_comment_length: 0,
            disk_number_start: 0,
            internal_attrs: 0,
            external_attrs: 0,
            local_header_offset: self.local_header_offset,
        }
    }
}

/// Builds complete archives with a fixed modification timestamp.
///
/// Two builds of the same entries with the same builder are byte-identical.
#[derive(Debug, Clone, Copy)]
pub struct ZipBuilder {
    modified: DosDateTime,
}

impl ZipBuilder {
    /// A builder stamping entries with the current local time.
    pub fn new() -> Self {
        Self {
            modified: DosDateTime::now(),
        }
    }

    pub fn with_timestamp(timestamp: &NaiveDateTime) -> Self {
        Self {
            modified: DosDateTime::from_naive(timestamp),
        }
    }

    pub fn modified(&self) -> DosDateTime {
        self.modified
    }

    /// Assemble `entries` into one archive buffer.
    ///
    /// An empty slice produces the 22-byte empty archive. Errors are only
    /// returned for input that cannot be represented without ZIP64.
    pub fn build(&self, entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
        let entry_count = u16::try_from(entries.len()).map_err(|_| ArchiveError::TooManyEntries {
            count: entries.len(),
        })?;

        let data_len: usize = entries
            .iter()
            .map(|e| LocalFileHeader::SIZE + e.name.len() + e.data.len())
            .sum();
        let mut out = Vec::with_capacity(data_len + EndOfCentralDirectory::SIZE);
        let mut central = Vec::new();

        for entry in entries {
            self.encode_entry(entry, &mut out, &mut central)?;
        }

        let cd_offset = u32::try_from(out.len()).map_err(|_| ArchiveError::ArchiveTooLarge {
            offset: out.len() as u64,
        })?;
        let cd_size = u32::try_from(central.len()).map_err(|_| ArchiveError::ArchiveTooLarge {
            offset: out.len() as u64 + central.len() as u64,
        })?;
        if u64::from(cd_offset) + u64::from(cd_size) > u64::from(u32::MAX) {
            return Err(ArchiveError::ArchiveTooLarge {
                offset: u64::from(cd_offset) + u64::from(cd_size),
            });
        }

        out.extend_from_slice(&central);

        EndOfCentralDirectory {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: entry_count,
            total_entries: entry_count,
            cd_size,
            cd_offset,
            comment_len: 0,
        }
        .write_to(&mut out)?;

        Ok(out)
    }

    /// Append the local block of `entry` to `out` and its central directory
    /// record to `central`. The local header offset is `out.len()` on entry.
    fn encode_entry(
        &self,
        entry: &ArchiveEntry,
        out: &mut Vec<u8>,
        central: &mut Vec<u8>,
    ) -> Result<()> {
        let name = entry.name.as_bytes();
        let name_len =
            u16::try_from(name.len()).map_err(|_| ArchiveError::NameTooLong { len: name.len() })?;
        let size = u32::try_from(entry.data.len()).map_err(|_| ArchiveError::EntryTooLarge {
            name: entry.name.clone(),
            size: entry.data.len(),
        })?;
        let local_header_offset =
            u32::try_from(out.len()).map_err(|_| ArchiveError::ArchiveTooLarge {
                offset: out.len() as u64,
            })?;

        let record = EntryRecord {
            crc32: crc32(&entry.data),
            size,
            modified: self.modified,
            local_header_offset,
        };

        record.local_header(name_len).write_to(out)?;
        out.extend_from_slice(name);
        out.extend_from_slice(&entry.data);

        record.central_header(name_len).write_to(central)?;
        central.extend_from_slice(name);

        Ok(())
    }
}

impl Default for ZipBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble `entries` into a complete archive stamped with the current time.
pub fn create_zip_buffer(entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
    ZipBuilder::new().build(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn builder() -> ZipBuilder {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(10, 20, 30)
            .unwrap();
        ZipBuilder::with_timestamp(&ts)
    }

    fn u16_at(buf: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([buf[at], buf[at + 1]])
    }

    fn u32_at(buf: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
    }

    #[test]
    fn empty_archive_is_bare_eocd() {
        let buf = builder().build(&[]).unwrap();
        let mut expected = b"PK\x05\x06".to_vec();
        expected.extend_from_slice(&[0u8; 18]);
        assert_eq!(buf, expected);
    }

    #[test]
    fn single_entry_layout() {
        let buf = builder()
            .build(&[ArchiveEntry::new("a.txt", &b"hello"[..])])
            .unwrap();

        let local_len = LocalFileHeader::SIZE + 5 + 5;
        let central_len = CentralDirectoryHeader::SIZE + 5;
        assert_eq!(buf.len(), local_len + central_len + EndOfCentralDirectory::SIZE);

        assert_eq!(u32_at(&buf, 0), LocalFileHeader::SIGNATURE);
        assert_eq!(u16_at(&buf, 8), 0);
        assert_eq!(u32_at(&buf, 14), crc32(b"hello"));
        assert_eq!(u32_at(&buf, 18), 5);
        assert_eq!(u32_at(&buf, 22), 5);
        assert_eq!(&buf[30..35], b"a.txt");
        assert_eq!(&buf[35..40], b"hello");

        assert_eq!(u32_at(&buf, local_len), CentralDirectoryHeader::SIGNATURE);
        assert_eq!(u16_at(&buf, local_len + 4), 20);
        assert_eq!(u16_at(&buf, local_len + 6), 20);
        assert_eq!(u32_at(&buf, local_len + 42), 0);
        assert_eq!(&buf[local_len + 46..local_len + 51], b"a.txt");

        let eocd = EndOfCentralDirectory::from_bytes(&buf[local_len + central_len..]).unwrap();
        assert_eq!(eocd.disk_entries, 1);
        assert_eq!(eocd.total_entries, 1);
        assert_eq!(eocd.cd_size as usize, central_len);
        assert_eq!(eocd.cd_offset as usize, local_len);
    }

    #[test]
    fn offsets_point_at_local_headers() {
        let entries = vec![
            ArchiveEntry::new("one", &b"1"[..]),
            ArchiveEntry::new("dir/two.bin", vec![7u8; 300]),
            ArchiveEntry::new("three", Bytes::new()),
        ];
        let buf = builder().build(&entries).unwrap();

        let eocd_at = buf.len() - EndOfCentralDirectory::SIZE;
        let eocd = EndOfCentralDirectory::from_bytes(&buf[eocd_at..]).unwrap();
        assert_eq!(eocd.total_entries, 3);
        assert_eq!(eocd.cd_offset as usize + eocd.cd_size as usize, eocd_at);

        let mut expected_offset = 0usize;
        let mut cd = eocd.cd_offset as usize;
        for entry in &entries {
            let offset = u32_at(&buf, cd + 42) as usize;
            assert_eq!(offset, expected_offset);
            assert_eq!(u32_at(&buf, offset), LocalFileHeader::SIGNATURE);

            expected_offset += LocalFileHeader::SIZE + entry.name.len() + entry.data.len();
            cd += CentralDirectoryHeader::SIZE + entry.name.len();
        }
        assert_eq!(expected_offset, eocd.cd_offset as usize);
    }

    #[test]
    fn same_builder_is_deterministic() {
        let entries = [ArchiveEntry::new("x", &b"abc"[..])];
        let b = builder();
        assert_eq!(b.build(&entries).unwrap(), b.build(&entries).unwrap());
    }

    #[test]
    fn overlong_name_is_rejected() {
        let name = "n".repeat(u16::MAX as usize + 1);
        let err = builder()
            .build(&[ArchiveEntry::new(name, Bytes::new())])
            .unwrap_err();
        assert!(matches!(err, ArchiveError::NameTooLong { len } if len == 65536));
    }

    #[test]
    fn too_many_entries_is_rejected() {
        let entries: Vec<_> = (0..=u16::MAX as usize)
            .map(|i| ArchiveEntry::new(i.to_string(), Bytes::new()))
            .collect();
        let err = builder().build(&entries).unwrap_err();
        assert!(matches!(err, ArchiveError::TooManyEntries { count } if count == 65536));
    }
}
