use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "galleria")]
#[command(author, version, about = "Self-hosted image gallery server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory holding blobs and metadata (overrides config)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        #[arg(value_name = "CONFIG")]
        path: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
