//! JSON output file helpers

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::client::EntityRef;
use crate::error::Result;
use crate::message::FormattedMessage;

/// Serialize messages as an indented JSON array. Non-ASCII text stays literal.
pub fn to_json(messages: &[FormattedMessage]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    messages.serialize(&mut serializer)?;
    Ok(buf)
}

/// Write messages to `path`, replacing any existing file.
pub async fn save_to_json(messages: &[FormattedMessage], path: &Path) -> Result<()> {
    info!("💾 Saving {} messages to {}", messages.len(), path.display());

    let json = to_json(messages)?;
    tokio::fs::write(path, json).await?;

    info!("✅ Save completed: {}", path.display());
    Ok(())
}

/// `<chat name>_<YYYYMMDD_HHMMSS>.json` for the given entity and time.
pub fn output_filename<H>(entity: &EntityRef<H>, now: DateTime<Utc>) -> String {
    let safe_name = entity.display_name().replace([' ', '/', '\\'], "_");
    format!("{}_{}.json", safe_name, now.format("%Y%m%d_%H%M%S"))
}
