use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ServeConfig;

#[derive(Parser, Debug)]
#[command(name = "fundzip")]
#[command(version)]
#[command(about = "Bulk export of funding files as stored ZIP archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  fundzip serve --storage-dir ./objects    serve exports of objects under ./objects\n  \
  fundzip pack -o out.zip a.pdf b.pdf      build an archive from local files\n  \
  fundzip list -v out.zip                  list and verify an archive")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the export endpoint over HTTP
    Serve(ServeConfig),

    /// Build a stored archive from local files
    Pack {
        /// Archive to write
        #[arg(short = 'o', value_name = "ZIPFILE")]
        output: PathBuf,

        /// Files to add, in archive order
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Quiet mode
        #[arg(short = 'q')]
        quiet: bool,
    },

    /// List an archive after verifying every entry's CRC
    List {
        /// Archive to read
        #[arg(value_name = "ZIPFILE")]
        archive: PathBuf,

        /// List verbosely
        #[arg(short = 'v')]
        verbose: bool,
    },
}
