//! File-backed collaborators for running the export server stand-alone.
//!
//! - [`JsonCatalog`]: file listing from a JSON manifest
//! - [`TokenPolicy`]: bearer tokens and the scopes each user may export
//! - [`JsonlAuditSink`]: one JSON line per successful export

mod audit;
mod catalog;
mod policy;

pub use audit::JsonlAuditSink;
pub use catalog::{JsonCatalog, ManifestFile};
pub use policy::{PolicyUser, TokenPolicy};
