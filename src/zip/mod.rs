//! ZIP archive construction and verification.
//!
//! This module writes archives from scratch (no compression library) and
//! reads them back for listing and integrity checks.
//!
//! ## Architecture
//!
//! - [`crc`]: CRC-32 as stored in every header
//! - [`dos_time`]: MS-DOS packed timestamps
//! - [`structures`]: Header records and their little-endian encoding
//! - [`writer`]: Archive assembly ([`create_zip_buffer`], [`ZipBuilder`])
//! - [`reader`]: In-memory parsing and CRC verification ([`ZipReader`])
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! ## Limitations
//!
//! - STORED (method 0) only, no compression
//! - No ZIP64, archives and entries are limited to 4 GiB and 65535 entries
//! - No encryption, no multi-disk archives

pub mod crc;
pub mod dos_time;
mod error;
pub mod reader;
pub mod structures;
pub mod writer;

pub use crc::{Crc32, crc32};
pub use dos_time::DosDateTime;
pub use error::{ArchiveError, Result};
pub use reader::ZipReader;
pub use structures::*;
pub use writer::{ArchiveEntry, ZipBuilder, create_zip_buffer};
