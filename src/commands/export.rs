//! Export command: connect, resolve, page through history, write JSON

use std::path::PathBuf;

use tracing::{error, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::export::{export_with_client, normalize_limit, ExportOptions, LogProgress};
use crate::resolver::ChatIdentifier;
use crate::session::{ensure_authorized, SessionLock, TelegramClient};

/// Command-line overrides for one export run.
#[derive(Debug, Clone, Default)]
pub struct ExportArgs {
    pub api_id: Option<i32>,
    pub api_hash: Option<String>,
    pub chat_id: String,
    pub limit: Option<i64>,
    pub batch_size: Option<usize>,
    pub output_dir: Option<PathBuf>,
}

/// Apply command-line values on top of the loaded configuration.
pub fn merge_config(mut config: Config, args: &ExportArgs) -> Config {
    if let Some(api_id) = args.api_id {
        config.api_id = api_id;
    }
    if let Some(api_hash) = &args.api_hash {
        config.api_hash = api_hash.clone();
    }
    if let Some(limit) = args.limit {
        config.limit = Some(limit);
    }
    if let Some(batch_size) = args.batch_size.filter(|b| *b > 0) {
        config.batch_size = batch_size;
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    config
}

/// Export options derived from the effective configuration.
pub fn export_options(config: &Config) -> ExportOptions {
    ExportOptions {
        limit: normalize_limit(config.limit),
        batch_size: config.batch_size,
        output_dir: config.output_dir.clone(),
    }
}

/// Run a full export and return the written file.
pub async fn run(config: Config, args: ExportArgs) -> Result<PathBuf> {
    if args.chat_id.trim().is_empty() {
        return Err(Error::InvalidArgument(
            "chat id must be a username or numeric id".to_string(),
        ));
    }

    let config = merge_config(config, &args);
    config.validate()?;

    let identifier = ChatIdentifier::from(args.chat_id.as_str());
    let options = export_options(&config);

    let _lock = SessionLock::acquire(config.lock_file())?;
    let client = TelegramClient::connect(&config).await?;

    if let Err(e) = ensure_authorized(&client, &config).await {
        error!("❌ Authorization failed: {}", e);
        if let Err(shutdown_err) = client.shutdown().await {
            error!("Failed to disconnect cleanly: {}", shutdown_err);
        }
        return Err(e);
    }

    let path = export_with_client(&client, &identifier, &options, &mut LogProgress).await?;
    info!("Exported {} to {}", identifier, path.display());
    Ok(path)
}
