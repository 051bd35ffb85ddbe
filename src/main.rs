//! Telegram chat history exporter - main entry point

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use telegram_exporter::commands::{self, ExportArgs};
use telegram_exporter::config::Config;

#[derive(Parser)]
#[command(name = "telegram_exporter")]
#[command(about = "Telegram chat history exporter (JSON only)", long_about = None)]
#[command(version)]
struct Cli {
    /// Telegram API ID (falls back to config.yml, then TELEGRAM_API_ID)
    #[arg(long, alias = "api_id")]
    api_id: Option<i32>,

    /// Telegram API hash (falls back to config.yml, then TELEGRAM_API_HASH)
    #[arg(long, alias = "api_hash")]
    api_hash: Option<String>,

    /// Target chat to export: numeric ID or username
    #[arg(long, alias = "chat_id", allow_hyphen_values = true)]
    chat_id: String,

    /// Maximum number of messages to export (0 or negative exports everything)
    #[arg(long, allow_hyphen_values = true)]
    limit: Option<i64>,

    /// Messages requested per history page
    #[arg(long, alias = "batch_size")]
    batch_size: Option<usize>,

    /// Directory for the JSON file
    #[arg(long, alias = "output_dir")]
    output_dir: Option<PathBuf>,

    /// Path to config.yml
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => Ok(Config::load_from_file(path)?),
            None => Ok(Config::new()),
        }
    }

    fn export_args(self) -> ExportArgs {
        ExportArgs {
            api_id: self.api_id,
            api_hash: self.api_hash,
            chat_id: self.chat_id,
            limit: self.limit,
            batch_size: self.batch_size,
            output_dir: self.output_dir,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("telegram_exporter=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    println!("Telegram Chat History Exporter");

    let config = cli.load_config()?;

    let path = commands::export_run(config, cli.export_args()).await?;
    println!("Saved {}", path.display());

    Ok(())
}
