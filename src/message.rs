//! Flat message records written to the export file

use serde::{Deserialize, Serialize};

use crate::client::{RawMessage, RawSender};

/// Timestamp layout used in exported records.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const UNKNOWN: &str = "Unknown";

/// One exported message. Field order is the JSON key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedMessage {
    pub id: i32,
    pub date: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
}

/// Convert a history record into an export record.
///
/// Records without text (media-only, service messages) yield `None`.
pub fn format_message(raw: &RawMessage) -> Option<FormattedMessage> {
    let text = raw.text.as_deref().filter(|t| !t.is_empty())?;
    let (sender_name, sender_id) = sender_info(raw.sender.as_ref());

    Some(FormattedMessage {
        id: raw.id,
        date: raw.date.format(DATE_FORMAT).to_string(),
        sender_id,
        sender_name,
        text: text.to_string(),
    })
}

/// Returns `(sender_name, sender_id)`, falling back to "Unknown" for each.
fn sender_info(sender: Option<&RawSender>) -> (String, String) {
    let Some(sender) = sender else {
        return (UNKNOWN.to_string(), UNKNOWN.to_string());
    };

    let full_name = format!(
        "{} {}",
        sender.first_name.as_deref().unwrap_or_default(),
        sender.last_name.as_deref().unwrap_or_default()
    );
    let name = match full_name.trim() {
        "" => UNKNOWN.to_string(),
        trimmed => trimmed.to_string(),
    };

    let id = if sender.id == 0 {
        UNKNOWN.to_string()
    } else {
        sender.id.to_string()
    };

    (name, id)
}
