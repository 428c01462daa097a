mod audio;
mod catalog;
mod client;
mod config;
mod protocol;
mod server;
mod session;
mod validate;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use crate::audio::{AudioEngine, SymphoniaEngine};
use crate::catalog::Catalog;
use crate::client::Client;
use crate::config::ServerConfig;
use crate::protocol::DEFAULT_PORT;

#[derive(Parser)]
#[command(name = "clipd")]
#[command(about = "Audio excerpt server operations")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long, help = "Config file path")]
    config: Option<String>,

    #[arg(long, help = "Listen address (overrides config)")]
    listen: Option<String>,

    #[arg(long, help = "Audio directory (overrides config)")]
    audio_dir: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Start the server (the default when no subcommand is given)
    Serve,
    /// Scan the audio directory, write the catalog snapshot, and exit
    Scan,
    /// Ask a running server for its catalog
    List {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(long, help = "Print the raw JSON listing")]
        json: bool,
    },
    /// Fetch an excerpt from a running server and save it locally
    Fetch {
        filename: String,
        start: String,
        end: String,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(long, help = "Output path (default: segment_<filename>)")]
        output: Option<PathBuf>,
    },
    /// Write a default TOML config file
    GenerateConfig {
        #[arg(long, default_value = "clipd.toml")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("clipd=info")
        .init();

    let cli = Cli::parse();

    match &cli.command {
        None | Some(Commands::Serve) => {
            let config = load_config(&cli)?;
            serve(config).await
        }
        Some(Commands::Scan) => {
            let config = load_config(&cli)?;
            scan(config).await
        }
        Some(Commands::List { host, port, json }) => list(host, *port, *json).await,
        Some(Commands::Fetch {
            filename,
            start,
            end,
            host,
            port,
            output,
        }) => fetch(filename, start, end, host, *port, output.clone()).await,
        Some(Commands::GenerateConfig { output }) => {
            ServerConfig::default().save(output)?;
            println!("✅ Config written to {}", output);
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<ServerConfig> {
    let mut config = ServerConfig::load_or_create(cli.config.as_deref())?;

    if let Some(listen) = &cli.listen {
        config.listen_address = listen.clone();
    }
    if let Some(audio_dir) = &cli.audio_dir {
        config.audio_directory = audio_dir.clone();
    }

    config.ensure_directories()?;
    Ok(config)
}

async fn serve(config: ServerConfig) -> Result<()> {
    let engine: Arc<dyn AudioEngine> = Arc::new(SymphoniaEngine::new());

    let catalog = Catalog::build(&config.audio_directory, engine.as_ref()).await?;
    catalog.write_snapshot(&config.audio_directory);
    if catalog.is_empty() {
        warn!(
            "no playable files found in {}",
            config.audio_directory.display()
        );
    }
    info!(
        "serving {} files from {}",
        catalog.len(),
        config.audio_directory.display()
    );

    server::run(
        &config.listen_address,
        &config.audio_directory,
        catalog,
        engine,
    )
    .await
}

async fn scan(config: ServerConfig) -> Result<()> {
    let engine = SymphoniaEngine::new();
    let catalog = Catalog::build(&config.audio_directory, &engine).await?;
    catalog.write_snapshot(&config.audio_directory);

    println!("📂 Scanned {}", config.audio_directory.display());
    println!("   Entries: {}", catalog.len());
    for entry in catalog.entries() {
        println!(
            "   {} | {} sec | {}",
            entry.filename, entry.duration_sec, entry.format
        );
    }
    Ok(())
}

async fn list(host: &str, port: u16, json: bool) -> Result<()> {
    let mut client = Client::connect(host, port).await?;
    let entries = client.list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("Available audio files:");
        for entry in &entries {
            println!(
                "- {} | duration: {} sec | format: {}",
                entry.filename, entry.duration_sec, entry.format
            );
        }
    }
    Ok(())
}

async fn fetch(
    filename: &str,
    start: &str,
    end: &str,
    host: &str,
    port: u16,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut client = Client::connect(host, port).await?;
    let bytes = client.fetch(filename, start, end).await?;

    let output = output.unwrap_or_else(|| PathBuf::from(format!("segment_{}", filename)));
    std::fs::write(&output, &bytes)?;
    println!("✅ Saved {} bytes to {}", bytes.len(), output.display());
    Ok(())
}
