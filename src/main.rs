mod cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use gl_core::config::Config;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = Config::load_or_default(config_path).context("Failed to load config")?;

    // Command-line flags win over the config file.
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(dir) = data_dir {
        config.storage.data_dir = dir;
    }

    tracing::info!("Starting galleria");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    gl_server::start(config).await?;
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            Config::load(p).with_context(|| format!("Invalid config {}", p.display()))?
        }
        None => {
            println!("No config file specified, searching default locations");
            Config::load_or_default(None).context("Invalid config")?
        }
    };

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Blob directory: {}", config.storage.blob_path().display());
    println!("  Metadata file: {}", config.storage.metadata_path().display());
    println!(
        "  Upload limit: {} bytes ({})",
        config.upload.max_file_bytes,
        config.upload.allowed_types.join(", ")
    );
    println!(
        "  Listing limit: default {}, max {}",
        config.query.default_limit, config.query.max_limit
    );

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("Warnings:");
        for warning in warnings {
            println!("  - {warning}");
        }
    }

    if config.upload.max_file_bytes == 0 {
        anyhow::bail!("upload.max_file_bytes must be greater than 0");
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "galleria=debug,gl_server=debug,gl_store=debug,gl_core=debug,tower_http=debug"
                .to_string()
        } else {
            "galleria=info,gl_server=info,gl_store=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start {
            host,
            port,
            data_dir,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, data_dir, cli.config.as_deref()))
        }
        Commands::Validate { path } => {
            let path = path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("galleria {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
