//! Main entry point for the fundzip CLI application.
//!
//! `serve` runs the HTTP export endpoint; `pack` and `list` drive the ZIP
//! writer and reader directly on local files.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fundzip::export::normalize_segment;
use fundzip::http::start_server;
use fundzip::{ArchiveEntry, Cli, Command, PathRegistry, ServeConfig, ZipReader, create_zip_buffer};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `list` output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(config) => serve(config).await,
        Command::Pack {
            output,
            files,
            quiet,
        } => pack(&output, &files, quiet).await,
        Command::List { archive, verbose } => list(&archive, verbose).await,
    }
}

async fn serve(config: ServeConfig) -> Result<()> {
    tracing::info!(
        "Configuration loaded: HTTP={}, catalog={}, concurrency={}",
        config.http_bind,
        config.catalog.display(),
        config.fetch_concurrency
    );

    config.validate()?;

    let state = config.build_state()?;
    start_server(config.http_bind, Arc::new(state)).await
}

/// Build an archive from local files.
///
/// Entries are named after each file's base name; a repeated name gets a
/// numeric suffix before its extension.
async fn pack(output: &Path, files: &[PathBuf], quiet: bool) -> Result<()> {
    let mut registry = PathRegistry::new();
    let mut entries = Vec::with_capacity(files.len());

    for path in files {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;

        let base = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = normalize_segment(&base);
        let name = registry.claim(name.clone(), |n| numbered_name(&name, n));

        if !quiet {
            println!("  adding: {} ({})", name, format_size(data.len() as u64));
        }
        entries.push(ArchiveEntry::new(name, data));
    }

    let archive = create_zip_buffer(&entries)?;
    tokio::fs::write(output, &archive)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    if !quiet {
        println!(
            "{} files, {} written to {}",
            entries.len(),
            format_size(archive.len() as u64),
            output.display()
        );
    }

    Ok(())
}

/// `report.pdf` becomes `report_2.pdf`; names without an extension get a
/// plain suffix.
fn numbered_name(name: &str, n: u32) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{n}.{ext}"),
        _ => format!("{name}_{n}"),
    }
}

/// List files in the archive.
///
/// Every entry's CRC is checked first, so a listing only appears for an
/// intact archive. Supports two output formats:
/// - Simple format: Just file names, one per line
/// - Verbose format (`-v`): Detailed table with size and timestamps
async fn list(archive: &Path, verbose: bool) -> Result<()> {
    let data = tokio::fs::read(archive)
        .await
        .with_context(|| format!("failed to read {}", archive.display()))?;
    let entries = ZipReader::new(&data)
        .verify()
        .with_context(|| format!("{} failed verification", archive.display()))?;

    if !verbose {
        for entry in &entries {
            println!("{}", entry.file_name);
        }
        return Ok(());
    }

    println!(
        "{:>10}  {:>10}  {:>10}  {:>5}  {:>8}  Name",
        "Length", "CRC-32", "Date", "Time", "Offset"
    );
    println!("{}", "-".repeat(70));

    let mut total = 0u64;
    for entry in &entries {
        let (year, month, day) = entry.modified.ymd();
        let (hour, minute, _second) = entry.modified.hms();
        println!(
            "{:>10}  {:>10}  {:04}-{:02}-{:02}  {:02}:{:02}  {:>8}  {}",
            entry.uncompressed_size,
            format!("{:08x}", entry.crc32),
            year,
            month,
            day,
            hour,
            minute,
            entry.lfh_offset,
            entry.file_name
        );
        total += entry.uncompressed_size;
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:>10}  {:>10}  {:>28}  {} files, {} archive",
        total,
        "",
        "",
        entries.len(),
        format_size(data.len() as u64)
    );

    Ok(())
}

/// Format a byte size into a human-readable string.
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
