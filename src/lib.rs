//! # fundzip
//!
//! Bulk export of funding files as a single stored ZIP archive.
//!
//! The crate has two halves. [`zip`] writes uncompressed (STORED) archives
//! from scratch and reads them back for verification. [`export`] decides
//! which files belong in an export, fetches them, lays them out inside the
//! archive and records an audit entry. [`http`] serves exports over HTTP and
//! [`backend`] provides file-backed collaborators for running stand-alone.
//!
//! ## Features
//!
//! - Byte-exact ZIP output (local headers, central directory, EOCD)
//! - Authorization by team and/or organization scope
//! - Bounded concurrent object fetching that keeps catalog order
//! - Collision-free archive paths grouped by organization and file type
//! - Object storage on the local filesystem or over HTTP
//!
//! ## Example
//!
//! ```no_run
//! use fundzip::{ArchiveEntry, ZipReader, create_zip_buffer};
//!
//! fn main() -> anyhow::Result<()> {
//!     let archive = create_zip_buffer(&[
//!         ArchiveEntry::new("readme.txt", b"hello".to_vec()),
//!         ArchiveEntry::new("docs/a.pdf", b"%PDF-1.7".to_vec()),
//!     ])?;
//!
//!     for entry in ZipReader::new(&archive).verify()? {
//!         println!("{} ({} bytes)", entry.file_name, entry.uncompressed_size);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cli;
pub mod config;
pub mod export;
pub mod http;
pub mod io;
pub mod zip;

pub use cli::{Cli, Command};
pub use config::{ConfigError, ServeConfig};
pub use export::{ExportError, ExportService, PathRegistry};
pub use io::{HttpObjectStore, LocalObjectStore, ObjectStore};
pub use zip::{ArchiveEntry, ZipBuilder, ZipFileEntry, ZipReader, create_zip_buffer};
