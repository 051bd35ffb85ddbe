//! History export pipeline
//!
//! Pages through chat history with an offset cursor, formats every record,
//! and writes the result to a JSON file. Generic over [`ChatClient`].

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{error, info};

use crate::client::{ChatClient, EntityRef, RawMessage};
use crate::error::Result;
use crate::message::{format_message, FormattedMessage};
use crate::output::{output_filename, save_to_json};
use crate::resolver::{resolve, ChatIdentifier};

/// Default number of messages requested per history page.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Receives the running message count after each fetched page.
pub trait ProgressObserver {
    fn on_progress(&mut self, total: usize);
}

impl<F: FnMut(usize)> ProgressObserver for F {
    fn on_progress(&mut self, total: usize) {
        self(total)
    }
}

/// Reports progress through the log.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_progress(&mut self, total: usize) {
        info!("📥 Downloaded {} messages", total);
    }
}

/// Options for one export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Maximum number of messages to keep; `None` exports everything
    pub limit: Option<usize>,
    pub batch_size: usize,
    pub output_dir: PathBuf,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            limit: None,
            batch_size: DEFAULT_BATCH_SIZE,
            output_dir: PathBuf::from("."),
        }
    }
}

/// Treat missing, zero and negative limits as "no limit".
pub fn normalize_limit(limit: Option<i64>) -> Option<usize> {
    limit
        .filter(|l| *l > 0)
        .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
}

/// Fetch one page of history older than `offset_id`.
pub async fn fetch_batch<C: ChatClient>(
    client: &C,
    entity: &EntityRef<C::Handle>,
    offset_id: i32,
    batch_size: usize,
) -> Result<Vec<RawMessage>> {
    client.history_page(entity, offset_id, batch_size).await
}

/// Format a page into `result`. Returns the id of the last raw record,
/// whether or not that record was kept.
fn process_page(page: &[RawMessage], result: &mut Vec<FormattedMessage>) -> Option<i32> {
    result.extend(page.iter().filter_map(format_message));
    page.last().map(|msg| msg.id)
}

/// Page through the whole history (or until `limit` messages are collected).
pub async fn fetch_messages<C, P>(
    client: &C,
    entity: &EntityRef<C::Handle>,
    limit: Option<usize>,
    batch_size: usize,
    progress: &mut P,
) -> Result<Vec<FormattedMessage>>
where
    C: ChatClient,
    P: ProgressObserver + ?Sized,
{
    info!("📥 Starting to fetch messages from chat: {}", entity.display_name());

    let mut messages = Vec::new();
    let mut offset_id = 0;

    loop {
        let page = fetch_batch(client, entity, offset_id, batch_size).await?;
        let Some(last_id) = process_page(&page, &mut messages) else {
            break;
        };
        offset_id = last_id;
        progress.on_progress(messages.len());

        if let Some(limit) = limit {
            if messages.len() >= limit {
                messages.truncate(limit);
                break;
            }
        }
    }

    info!("✅ Successfully fetched {} messages", messages.len());
    Ok(messages)
}

/// Fetch the history of `entity` and save it under `options.output_dir`.
/// Returns the path of the written file.
pub async fn export_chat<C, P>(
    client: &C,
    entity: &EntityRef<C::Handle>,
    options: &ExportOptions,
    progress: &mut P,
) -> Result<PathBuf>
where
    C: ChatClient,
    P: ProgressObserver + ?Sized,
{
    let output_file = options.output_dir.join(output_filename(entity, Utc::now()));
    info!("📤 Starting export to {}", output_file.display());

    match fetch_and_save(client, entity, options, progress, &output_file).await {
        Ok(()) => {
            info!("🎉 Export completed successfully");
            Ok(output_file)
        }
        Err(e) => {
            error!("❌ Export failed: {}", e);
            Err(e)
        }
    }
}

async fn fetch_and_save<C, P>(
    client: &C,
    entity: &EntityRef<C::Handle>,
    options: &ExportOptions,
    progress: &mut P,
    output_file: &Path,
) -> Result<()>
where
    C: ChatClient,
    P: ProgressObserver + ?Sized,
{
    let messages =
        fetch_messages(client, entity, options.limit, options.batch_size, progress).await?;
    save_to_json(&messages, output_file).await
}

/// Resolve `identifier`, export it, and disconnect the client on every path.
///
/// Disconnecting needs the future to run to completion. If it is dropped
/// early (say by `tokio::time::timeout`), teardown falls to the client's own
/// `Drop`; [`TelegramClient`](crate::session::TelegramClient) stops its
/// sender pool there.
pub async fn export_with_client<C, P>(
    client: &C,
    identifier: &ChatIdentifier,
    options: &ExportOptions,
    progress: &mut P,
) -> Result<PathBuf>
where
    C: ChatClient,
    P: ProgressObserver + ?Sized,
{
    let outcome = async {
        let entity = resolve(client, identifier).await?;
        export_chat(client, &entity, options, progress).await
    }
    .await;

    info!("👋 Disconnecting...");
    match client.disconnect().await {
        Ok(()) => info!("✅ Disconnected"),
        Err(e) => error!("Failed to disconnect cleanly: {}", e),
    }

    outcome
}
