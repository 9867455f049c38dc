use thiserror::Error;

/// Errors raised while writing or reading an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("entry name is {len} bytes, the format allows at most 65535")]
    NameTooLong { len: usize },

    #[error("entry '{name}' is {size} bytes, larger than the 4 GiB format limit")]
    EntryTooLarge { name: String, size: usize },

    #[error("{count} entries exceed the 65535-entry format limit")]
    TooManyEntries { count: usize },

    #[error("archive offset {offset} exceeds the 4 GiB format limit")]
    ArchiveTooLarge { offset: u64 },

    #[error("invalid signature {found:#010x} at offset {offset}, expected {expected:#010x}")]
    InvalidSignature {
        expected: u32,
        found: u32,
        offset: u64,
    },

    #[error("not a valid ZIP file: end of central directory not found")]
    EndOfCentralDirectoryNotFound,

    #[error("ZIP64 archives are not supported")]
    Zip64Unsupported,

    #[error("{0} extends past the end of the archive")]
    Truncated(String),

    #[error("unsupported compression method: {0} (only STORED/uncompressed is supported)")]
    UnsupportedCompression(u16),

    #[error("CRC mismatch for '{name}': header says {expected:#010x}, data hashes to {actual:#010x}")]
    CrcMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
