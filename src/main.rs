mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use pd_core::config::Config;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "pixdrop=trace,pd_server=trace,pd_store=trace,pd_core=debug,tower_http=debug"
                .to_string()
        } else {
            "pixdrop=info,pd_server=info,pd_store=info,pd_core=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start {
            host,
            port,
            upload_dir,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(
                cli.config.as_deref(),
                host,
                port,
                upload_dir,
            ))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("pixdrop {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn start_server(
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
    upload_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = Config::load_or_default(config_path);
    config.apply_env();

    // CLI flags win over file and environment
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(dir) = upload_dir {
        config.storage.upload_dir = dir;
    }

    tracing::info!("Starting pixdrop");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );
    tracing::info!("Uploads stored in {}", config.storage.upload_dir.display());

    pd_server::start(config).await.context("Server failed")
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let mut config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let content = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read config file: {:?}", p))?;
            Config::from_json(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", p))?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };
    config.apply_env();

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        for warning in &warnings {
            println!("⚠ {warning}");
        }
    }

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Upload dir: {}", config.storage.upload_dir.display());
    println!("  Max upload: {} bytes", config.server.max_upload_bytes);
    if config.keepalive.enabled && config.keepalive.interval_secs > 0 {
        println!(
            "  Keep-alive: {} every {}s",
            config.keepalive_url(),
            config.keepalive.interval_secs
        );
    } else {
        println!("  Keep-alive: disabled");
    }

    Ok(())
}
