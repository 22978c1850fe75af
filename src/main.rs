//! tubefetch - list the streams of a YouTube video and download one of them

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use tubefetch::downloader::tools::ToolManager;
use tubefetch::{DownloadService, DownloaderConfig};

#[derive(Parser)]
#[command(name = "tubefetch", version, about)]
struct Cli {
    /// Config file (TOML). Defaults to the per-user config when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the download folder
    #[arg(long, global = true)]
    download_dir: Option<PathBuf>,

    /// SOCKS5/HTTP proxy for every extractor call
    #[arg(long, global = true)]
    proxy: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Metadata and ranked video/audio streams
    Info { video_id: String },
    /// Download one stream (or "best") through the strategy chain
    Download {
        video_id: String,
        #[arg(long, short, default_value = "best")]
        format: String,
    },
    /// Show which extraction tools are installed
    Tools,
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tubefetch=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize result")?;
    println!("{}", text);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut config = DownloaderConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(dir) = cli.download_dir {
        config = config.with_download_dir(dir);
    }
    if cli.proxy.is_some() {
        config = config.with_proxy(cli.proxy);
    }

    let succeeded = match cli.command {
        Command::Tools => {
            let tools = tokio::task::spawn_blocking(move || ToolManager::new(&config).get_all_tools())
                .await
                .context("tool discovery failed")?;
            print_json(&tools)?;
            true
        }
        Command::Info { video_id } => {
            let service = DownloadService::new(config).await;
            let response = service.get_available_streams(&video_id).await;
            print_json(&response)?;
            response.success
        }
        Command::Download { video_id, format } => {
            let service = DownloadService::new(config).await;
            let response = service.download_video(&video_id, &format).await;
            print_json(&response)?;
            response.success
        }
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
